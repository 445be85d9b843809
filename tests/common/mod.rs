#![allow(dead_code)]

use mapstyle::{EvaluationContext, EvaluationError, Expression, JsonFeature, Type, Value, parse};
use serde_json::Value as Json;

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// A point feature with the given properties object.
pub fn feature(properties: Json) -> JsonFeature {
    serde_json::from_value(serde_json::json!({
        "type": "Feature",
        "geometry": { "type": "Point", "coordinates": [0, 0] },
        "properties": properties
    }))
    .unwrap_or_default()
}

/// Parses an expression, panicking with the compile errors on failure.
pub fn compile(json: Json, expected: Option<Type>) -> Expression {
    match parse(&json, expected) {
        Ok(expression) => expression,
        Err(errors) => panic!("{json} failed to compile:\n{errors}"),
    }
}

/// Compiles `json` and evaluates it at `zoom` against `feature`.
pub fn evaluate(json: Json, zoom: f64, feature: &JsonFeature) -> Result<Value, EvaluationError> {
    compile(json, None).evaluate(&EvaluationContext::new(zoom, feature))
}

/// The `(key, message)` pairs reported for an expression that must not compile.
pub fn compile_errors(json: Json, expected: Option<Type>) -> Vec<(String, String)> {
    match parse(&json, expected) {
        Ok(expression) => panic!("{json} compiled to {}", expression.ty()),
        Err(errors) => errors.into_iter().map(|e| (e.key, e.message)).collect(),
    }
}
