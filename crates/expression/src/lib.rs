//! A typed expression language for data-driven map styling.
//!
//! Expressions are written as JSON arrays, e.g. `["+", ["get", "height"], 2]`.
//! [`parse`] turns one into an [`Expression`]: every operator is resolved to
//! one of its signatures and every node carries a static [`Type`]. Evaluation
//! then runs the tree against an [`EvaluationContext`] holding the current
//! zoom level and feature.
//!
//! ```
//! use mapstyle_expression::{EvaluationContext, JsonFeature, Type, Value, parse};
//! use serde_json::json;
//!
//! let expr = parse(&json!(["*", ["get", "lanes"], 3]), Some(Type::Number)).unwrap();
//! let road = JsonFeature::new().with_property("lanes", json!(2));
//! let width = expr.evaluate(&EvaluationContext::new(14.0, &road)).unwrap();
//! assert_eq!(width, Value::Number(6.0));
//! ```

pub mod ast;
pub mod context;
pub mod curve;
pub mod definitions;
pub mod engine;
pub mod error;
pub mod feature;
pub mod function;
pub mod parser;
pub mod signature;
mod typecheck;

// --- Public API ---
pub use ast::{Expression, Interpolation, MatchCases, Node, NodeId, NodeKind};
pub use context::ParsingContext;
pub use definitions::Registry;
pub use engine::{EvaluationContext, FromValue};
pub use error::{CompileError, CompileErrors, EvaluationError};
pub use feature::{Feature, GeometryType, JsonFeature};
pub use function::{FunctionError, FunctionKind, StyleFunction, convert_function, is_function};
pub use parser::{Parser, parse};
pub use signature::{Definition, Evaluator, Param, Signature};

pub use mapstyle_types::{Color, Object, Type, Typenames, Value};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn parse_then_evaluate_constant() {
        init();
        let expr = parse(&json!(["+", 1, ["*", 2, 3]]), None).unwrap();
        assert_eq!(expr.ty(), &Type::Number);
        assert!(expr.is_feature_constant());
        assert!(expr.is_zoom_constant());
        assert_eq!(expr.evaluate(&EvaluationContext::default()).unwrap(), Value::Number(7.0));
    }

    #[test]
    fn constancy_flags_follow_dependencies() {
        init();
        let zoom = parse(&json!(["curve", ["linear"], ["zoom"], 0, 0, 10, 10]), None).unwrap();
        assert!(zoom.is_feature_constant());
        assert!(!zoom.is_zoom_constant());

        let feature = parse(&json!(["get", "a"]), None).unwrap();
        assert!(!feature.is_feature_constant());
        assert!(feature.is_zoom_constant());

        let object = parse(&json!(["get", "a", ["literal", {"a": 1}]]), None).unwrap();
        assert!(object.is_feature_constant());
    }

    #[test]
    fn custom_registry_extends_the_language() {
        fn double(_: &EvaluationContext<'_>, args: &[Value]) -> Result<Value, EvaluationError> {
            let n = args[0].as_number().unwrap_or_default();
            Ok(Value::Number(n * 2.0))
        }

        let mut registry = Registry::default();
        registry.define("double", vec![Signature::new(Type::Number, vec![Type::Number], double)]);
        let expr = Parser::new(&registry).parse(&json!(["double", ["+", 1, 2]]), None).unwrap();
        assert_eq!(expr.evaluate_as::<f64>(&EvaluationContext::default()).unwrap(), 6.0);
    }

    #[test]
    fn expressions_are_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Expression>();
    }
}
