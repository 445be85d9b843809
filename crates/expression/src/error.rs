use mapstyle_types::{Type, Value, type_of};
use thiserror::Error;

/// A parse or type error, located by the path of array indices from the root.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{key}: {message}")]
pub struct CompileError {
    pub message: String,
    pub key: String,
}

impl CompileError {
    pub fn new(message: impl Into<String>, key: impl Into<String>) -> Self {
        Self { message: message.into(), key: key.into() }
    }
}

/// Every error collected during one parse attempt.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{}", join_errors(.0))]
pub struct CompileErrors(pub Vec<CompileError>);

fn join_errors(errors: &[CompileError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n")
}

impl CompileErrors {
    pub fn iter(&self) -> std::slice::Iter<'_, CompileError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<&CompileError> {
        self.0.first()
    }

    pub fn into_vec(self) -> Vec<CompileError> {
        self.0
    }
}

impl IntoIterator for CompileErrors {
    type Item = CompileError;
    type IntoIter = std::vec::IntoIter<CompileError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// A runtime failure. Carries no location; the tree was already validated.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct EvaluationError {
    pub message: String,
}

impl EvaluationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }

    pub fn type_mismatch(expected: &Type, actual: &Value) -> Self {
        Self::new(format!(
            "Expected value to be of type {}, but found {} instead.",
            expected,
            type_of(actual)
        ))
    }

    pub(crate) fn feature_unavailable() -> Self {
        Self::new("Feature data is unavailable in the current evaluation context.")
    }
}
