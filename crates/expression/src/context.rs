//! Parse-time context: the location of the current subexpression, the type
//! its caller expects, and the error list shared by the whole parse.

use crate::error::CompileError;
use mapstyle_types::Type;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, Default)]
pub struct ParsingContext {
    path: Vec<usize>,
    errors: Rc<RefCell<Vec<CompileError>>>,
    pub expected: Option<Type>,
}

impl ParsingContext {
    pub fn new(expected: Option<Type>) -> Self {
        Self { path: Vec::new(), errors: Rc::default(), expected }
    }

    /// A context for the child at `index`, sharing this context's errors.
    pub fn concat(&self, index: usize, expected: Option<Type>) -> Self {
        let mut path = self.path.clone();
        path.push(index);
        Self { path, errors: Rc::clone(&self.errors), expected }
    }

    /// Renders the path as `[i][j]...`.
    pub fn key(&self) -> String {
        self.path.iter().map(|index| format!("[{index}]")).collect()
    }

    pub fn key_at(&self, index: usize) -> String {
        format!("{}[{}]", self.key(), index)
    }

    pub fn error(&self, message: impl Into<String>) {
        self.push(CompileError::new(message, self.key()));
    }

    pub fn error_at(&self, message: impl Into<String>, index: usize) {
        self.push(CompileError::new(message, self.key_at(index)));
    }

    pub fn push(&self, error: CompileError) {
        self.errors.borrow_mut().push(error);
    }

    pub fn extend(&self, errors: impl IntoIterator<Item = CompileError>) {
        self.errors.borrow_mut().extend(errors);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.borrow().is_empty()
    }

    pub fn take_errors(&self) -> Vec<CompileError> {
        std::mem::take(&mut *self.errors.borrow_mut())
    }
}
