//! Tree-walking evaluation of a checked [`Expression`].

use crate::ast::{Expression, MatchCases, NodeId, NodeKind, integer_label};
use crate::curve;
use crate::error::EvaluationError;
use crate::feature::Feature;
use mapstyle_types::{Color, Object, Type, Value, check_subtype, type_of};
use std::fmt;

/// Inputs available to feature- and zoom-dependent operators.
#[derive(Clone, Copy, Default)]
pub struct EvaluationContext<'a> {
    pub zoom: Option<f64>,
    pub feature: Option<&'a dyn Feature>,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(zoom: f64, feature: &'a dyn Feature) -> Self {
        Self { zoom: Some(zoom), feature: Some(feature) }
    }

    pub fn zoom_only(zoom: f64) -> Self {
        Self { zoom: Some(zoom), feature: None }
    }

    pub fn with_feature(mut self, feature: &'a dyn Feature) -> Self {
        self.feature = Some(feature);
        self
    }

    pub fn zoom(&self) -> Result<f64, EvaluationError> {
        self.zoom.ok_or_else(|| {
            EvaluationError::new(
                "The 'zoom' expression is unavailable in the current evaluation context.",
            )
        })
    }

    pub fn feature(&self) -> Result<&'a dyn Feature, EvaluationError> {
        self.feature.ok_or_else(EvaluationError::feature_unavailable)
    }
}

impl fmt::Debug for EvaluationContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluationContext")
            .field("zoom", &self.zoom)
            .field("feature", &self.feature.map(|_| "<feature>"))
            .finish()
    }
}

impl Expression {
    pub fn evaluate(&self, ctx: &EvaluationContext<'_>) -> Result<Value, EvaluationError> {
        self.evaluate_node(self.root(), ctx)
    }

    /// Evaluates and converts the result to a concrete Rust type.
    pub fn evaluate_as<T: FromValue>(
        &self,
        ctx: &EvaluationContext<'_>,
    ) -> Result<T, EvaluationError> {
        let value = self.evaluate(ctx)?;
        T::from_value(&value)
            .ok_or_else(|| EvaluationError::type_mismatch(&T::expected_type(), &value))
    }

    pub fn evaluate_node(
        &self,
        id: NodeId,
        ctx: &EvaluationContext<'_>,
    ) -> Result<Value, EvaluationError> {
        let node = self.node(id);
        match &node.kind {
            NodeKind::Literal(value) => Ok(value.clone()),
            NodeKind::Compound(compound) => {
                let args = compound
                    .args
                    .iter()
                    .map(|arg| self.evaluate_node(*arg, ctx))
                    .collect::<Result<Vec<_>, _>>()?;
                (compound.signature().evaluate)(ctx, &args)
            }
            NodeKind::Assertion { input } => {
                let value = self.evaluate_node(*input, ctx)?;
                assert_type(&node.ty, value)
            }
            NodeKind::Case { branches, otherwise } => {
                for (condition, output) in branches {
                    let test = self.evaluate_node(*condition, ctx)?;
                    match test {
                        Value::Boolean(true) => return self.evaluate_node(*output, ctx),
                        Value::Boolean(false) => {}
                        other => return Err(EvaluationError::type_mismatch(&Type::Boolean, &other)),
                    }
                }
                self.evaluate_node(*otherwise, ctx)
            }
            NodeKind::Coalesce { args } => {
                let Some((last, rest)) = args.split_last() else {
                    return Ok(Value::Null);
                };
                for arg in rest {
                    match self.evaluate_node(*arg, ctx) {
                        Ok(value) => return Ok(value),
                        Err(err) => {
                            log::trace!("coalesce skipped {}: {}", self.node(*arg).key, err)
                        }
                    }
                }
                self.evaluate_node(*last, ctx)
            }
            NodeKind::Match { input, cases, otherwise, .. } => {
                let value = self.evaluate_node(*input, ctx)?;
                let branch = match (cases, &value) {
                    (MatchCases::Number(cases), Value::Number(n)) => {
                        integer_label(*n).and_then(|label| cases.get(&label))
                    }
                    (MatchCases::String(cases), Value::String(s)) => cases.get(s),
                    (cases, other) => {
                        return Err(EvaluationError::type_mismatch(&cases.input_type(), other));
                    }
                };
                self.evaluate_node(branch.copied().unwrap_or(*otherwise), ctx)
            }
            NodeKind::Curve { interpolation, input, stops } => {
                curve::evaluate(self, *interpolation, *input, stops, ctx)
            }
        }
    }
}

/// Arrays are checked structurally (and `null` passes); any other type must match exactly.
fn assert_type(expected: &Type, value: Value) -> Result<Value, EvaluationError> {
    let conforms = match expected {
        Type::Array(_) => check_subtype(expected, &type_of(&value)).is_ok(),
        Type::Value => true,
        _ => !value.is_null() && check_subtype(expected, &type_of(&value)).is_ok(),
    };
    if conforms {
        Ok(value)
    } else {
        Err(EvaluationError::type_mismatch(expected, &value))
    }
}

// --- Typed results ---

/// Conversion from an evaluated [`Value`] to a concrete Rust type.
pub trait FromValue: Sized {
    fn expected_type() -> Type;
    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for Value {
    fn expected_type() -> Type {
        Type::Value
    }

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl FromValue for f64 {
    fn expected_type() -> Type {
        Type::Number
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_number()
    }
}

impl FromValue for bool {
    fn expected_type() -> Type {
        Type::Boolean
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FromValue for String {
    fn expected_type() -> Type {
        Type::String
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl FromValue for Color {
    fn expected_type() -> Type {
        Type::Color
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Color(color) => Some(*color),
            _ => None,
        }
    }
}

impl FromValue for Object {
    fn expected_type() -> Type {
        Type::Object
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(map.clone()),
            _ => None,
        }
    }
}

impl FromValue for Vec<Value> {
    fn expected_type() -> Type {
        Type::array(Type::Value)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Array(items) => Some(items.clone()),
            _ => None,
        }
    }
}

impl<const N: usize> FromValue for [f64; N] {
    fn expected_type() -> Type {
        Type::array_n(Type::Number, N)
    }

    fn from_value(value: &Value) -> Option<Self> {
        let Value::Array(items) = value else {
            return None;
        };
        if items.len() != N {
            return None;
        }
        let mut out = [0.0; N];
        for (slot, item) in out.iter_mut().zip(items) {
            *slot = item.as_number()?;
        }
        Some(out)
    }
}
