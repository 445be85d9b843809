//! Operator signatures and their parameter lists.

use crate::engine::EvaluationContext;
use crate::error::EvaluationError;
use mapstyle_types::{Type, Value};
use std::fmt;

/// Implementation of one signature. Arguments arrive already evaluated.
pub type Evaluator = fn(&EvaluationContext<'_>, &[Value]) -> Result<Value, EvaluationError>;

#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Type(Type),
    /// `types` repeated as often as the argument count requires, at most `max` times.
    Repeat { types: Vec<Type>, max: Option<usize> },
}

#[derive(Clone)]
pub struct Signature {
    pub result: Type,
    pub params: Vec<Param>,
    pub evaluate: Evaluator,
    pub feature_constant: bool,
    pub zoom_constant: bool,
}

impl Signature {
    pub fn new(result: Type, params: Vec<Type>, evaluate: Evaluator) -> Self {
        Self {
            result,
            params: params.into_iter().map(Param::Type).collect(),
            evaluate,
            feature_constant: true,
            zoom_constant: true,
        }
    }

    /// Any number of arguments of type `item`.
    pub fn variadic(result: Type, item: Type, evaluate: Evaluator) -> Self {
        Self {
            result,
            params: vec![Param::Repeat { types: vec![item], max: None }],
            evaluate,
            feature_constant: true,
            zoom_constant: true,
        }
    }

    pub fn with_params(mut self, params: Vec<Param>) -> Self {
        self.params = params;
        self
    }

    pub fn feature_dependent(mut self) -> Self {
        self.feature_constant = false;
        self
    }

    pub fn zoom_dependent(mut self) -> Self {
        self.zoom_constant = false;
        self
    }

    /// Unrolls repeated groups into one parameter type per argument.
    ///
    /// The result may still differ in length from `arg_count`; callers report
    /// that as an arity error.
    pub fn expand_params(&self, arg_count: usize) -> Vec<Type> {
        let fixed = self.params.len().saturating_sub(1);
        let mut expanded = Vec::with_capacity(arg_count);
        for param in &self.params {
            match param {
                Param::Type(ty) => expanded.push(ty.clone()),
                Param::Repeat { types, max } => {
                    let mut count = arg_count.saturating_sub(fixed).div_ceil(types.len().max(1));
                    if let Some(max) = max {
                        count = count.min(*max);
                    }
                    for _ in 0..count {
                        expanded.extend(types.iter().cloned());
                    }
                }
            }
        }
        expanded
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signature")
            .field("result", &self.result)
            .field("params", &self.params)
            .field("feature_constant", &self.feature_constant)
            .field("zoom_constant", &self.zoom_constant)
            .finish_non_exhaustive()
    }
}

/// Renders the parameter list, e.g. `(Number, Number)` or `(Number...)`.
impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|param| match param {
                Param::Type(ty) => ty.to_string(),
                Param::Repeat { types, .. } => {
                    let group: Vec<String> = types.iter().map(ToString::to_string).collect();
                    format!("{}...", group.join(", "))
                }
            })
            .collect();
        write!(f, "({})", params.join(", "))
    }
}

/// All overloads registered under one operator name, in resolution order.
#[derive(Debug, Clone)]
pub struct Definition {
    pub name: String,
    pub signatures: Vec<Signature>,
}

impl Definition {
    pub fn new(name: impl Into<String>, signatures: Vec<Signature>) -> Self {
        Self { name: name.into(), signatures }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &EvaluationContext<'_>, _: &[Value]) -> Result<Value, EvaluationError> {
        Ok(Value::Null)
    }

    #[test]
    fn fixed_params_expand_verbatim() {
        let sig = Signature::new(Type::Number, vec![Type::Number, Type::String], noop);
        assert_eq!(sig.expand_params(5), vec![Type::Number, Type::String]);
    }

    #[test]
    fn repeated_group_fills_remaining_arguments() {
        let sig = Signature::variadic(Type::Number, Type::Number, noop);
        assert_eq!(sig.expand_params(3).len(), 3);
        assert!(sig.expand_params(0).is_empty());
    }

    #[test]
    fn repeated_group_respects_max() {
        let sig = Signature::new(Type::Value, vec![], noop).with_params(vec![
            Param::Type(Type::String),
            Param::Repeat { types: vec![Type::Object], max: Some(1) },
        ]);
        assert_eq!(sig.expand_params(1), vec![Type::String]);
        assert_eq!(sig.expand_params(2), vec![Type::String, Type::Object]);
        assert_eq!(sig.expand_params(4), vec![Type::String, Type::Object]);
    }

    #[test]
    fn displays_parameter_list() {
        let fixed = Signature::new(Type::Number, vec![Type::Number, Type::Number], noop);
        assert_eq!(fixed.to_string(), "(Number, Number)");
        let variadic = Signature::variadic(Type::Boolean, Type::Boolean, noop);
        assert_eq!(variadic.to_string(), "(Boolean...)");
    }
}
