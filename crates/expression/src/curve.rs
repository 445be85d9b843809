//! Stop lookup and interpolation for `curve` expressions.

use crate::ast::{Expression, Interpolation, NodeId};
use crate::engine::EvaluationContext;
use crate::error::EvaluationError;
use mapstyle_types::{Type, Value};

/// Progress of `x` between `lower` and `upper`, shaped by an exponential `base`.
///
/// `base == 1` is linear. Equal bounds yield 0.
pub fn interpolation_factor(base: f64, lower: f64, upper: f64, x: f64) -> f64 {
    let difference = upper - lower;
    let progress = x - lower;
    if difference == 0.0 {
        0.0
    } else if base == 1.0 {
        progress / difference
    } else {
        (base.powf(progress) - 1.0) / (base.powf(difference) - 1.0)
    }
}

/// Whether a non-step curve may produce values of this type.
pub fn is_interpolatable(ty: &Type) -> bool {
    match ty {
        Type::Number | Type::Color => true,
        Type::Array(array) => *array.item == Type::Number && array.n.is_some(),
        _ => false,
    }
}

pub fn not_interpolatable_message(ty: &Type) -> String {
    format!(
        "Type {ty} is not interpolatable, and thus cannot be used as an exponential curve's output type"
    )
}

/// Interpolates numbers, colors channel-wise and numeric arrays element-wise.
pub fn interpolate(from: &Value, to: &Value, t: f64) -> Result<Value, EvaluationError> {
    match (from, to) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + (b - a) * t)),
        (Value::Color(a), Value::Color(b)) => Ok(Value::Color(a.lerp(b, t))),
        (Value::Array(a), Value::Array(b)) if a.len() == b.len() => a
            .iter()
            .zip(b)
            .map(|(x, y)| interpolate(x, y, t))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        _ => Err(EvaluationError::new(format!("Cannot interpolate between {from} and {to}."))),
    }
}

pub(crate) fn evaluate(
    expression: &Expression,
    interpolation: Interpolation,
    input: NodeId,
    stops: &[(f64, NodeId)],
    ctx: &EvaluationContext<'_>,
) -> Result<Value, EvaluationError> {
    let (Some(first), Some(last)) = (stops.first(), stops.last()) else {
        return Err(EvaluationError::new("No stops in curve."));
    };
    let x = match expression.evaluate_node(input, ctx)? {
        Value::Number(x) => x,
        other => return Err(EvaluationError::type_mismatch(&Type::Number, &other)),
    };

    // Index of the first stop strictly above x.
    let upper = stops.partition_point(|(label, _)| *label <= x);
    if upper == 0 {
        return expression.evaluate_node(first.1, ctx);
    }
    if upper == stops.len() {
        return expression.evaluate_node(last.1, ctx);
    }
    let (lower_label, lower_output) = stops[upper - 1];
    let (upper_label, upper_output) = stops[upper];

    match interpolation {
        Interpolation::Step => expression.evaluate_node(lower_output, ctx),
        Interpolation::Exponential { base } => {
            let t = interpolation_factor(base, lower_label, upper_label, x);
            if t == 0.0 {
                return expression.evaluate_node(lower_output, ctx);
            }
            if t == 1.0 {
                return expression.evaluate_node(upper_output, ctx);
            }
            let from = expression.evaluate_node(lower_output, ctx)?;
            let to = expression.evaluate_node(upper_output, ctx)?;
            interpolate(&from, &to, t)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapstyle_types::Color;

    #[test]
    fn linear_factor() {
        assert_eq!(interpolation_factor(1.0, 0.0, 10.0, 5.0), 0.5);
        assert_eq!(interpolation_factor(1.0, 0.0, 10.0, 0.0), 0.0);
        assert_eq!(interpolation_factor(1.0, 3.0, 3.0, 3.0), 0.0);
    }

    #[test]
    fn exponential_factor_bends_towards_upper() {
        let t = interpolation_factor(2.0, 0.0, 2.0, 1.0);
        assert!((t - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(interpolation_factor(2.0, 0.0, 2.0, 2.0), 1.0);
    }

    #[test]
    fn interpolatable_types() {
        assert!(is_interpolatable(&Type::Number));
        assert!(is_interpolatable(&Type::Color));
        assert!(is_interpolatable(&Type::array_n(Type::Number, 2)));
        assert!(!is_interpolatable(&Type::array(Type::Number)));
        assert!(!is_interpolatable(&Type::array_n(Type::String, 2)));
        assert!(!is_interpolatable(&Type::String));
    }

    #[test]
    fn interpolates_values() {
        assert_eq!(
            interpolate(&Value::Number(10.0), &Value::Number(20.0), 0.25).unwrap(),
            Value::Number(12.5)
        );
        let pair = |a: f64, b: f64| Value::Array(vec![Value::Number(a), Value::Number(b)]);
        assert_eq!(interpolate(&pair(0.0, 10.0), &pair(10.0, 0.0), 0.5).unwrap(), pair(5.0, 5.0));
        assert_eq!(
            interpolate(&Value::Color(Color::BLACK), &Value::Color(Color::WHITE), 0.5).unwrap(),
            Value::Color(Color::new(0.5, 0.5, 0.5, 1.0))
        );
        assert!(interpolate(&pair(0.0, 1.0), &Value::Number(1.0), 0.5).is_err());
    }
}
