//! Map style expressions: parsing, type checking and evaluation of the JSON
//! expression language, plus conversion of legacy stop functions.
//!
//! This crate re-exports [`mapstyle_expression`] and adds the helpers shared by
//! the `mapstyle` command line tool.

pub mod error;

pub use error::CliError;
pub use mapstyle_expression::*;
pub use mapstyle_types as types;

use serde_json::{Value as Json, json};

/// Compiles `json` as an expression, or as a legacy function when `legacy` is
/// set or the input is shaped like one.
pub fn compile(json: &Json, expected: Option<&Type>, legacy: bool) -> Result<Expression, CliError> {
    if legacy || is_function(json) {
        let expected = expected.cloned().unwrap_or(Type::Value);
        return Ok(convert_function(json, &expected)?);
    }
    Ok(parse(json, expected.cloned())?)
}

/// Static facts about a compiled expression.
pub fn describe(expression: &Expression) -> Json {
    json!({
        "type": expression.ty().to_string(),
        "featureConstant": expression.is_feature_constant(),
        "zoomConstant": expression.is_zoom_constant(),
        "zoomCurve": expression.find_zoom_curve().is_some(),
    })
}

/// Renders compile errors as `[{"key": ..., "error": ...}]`.
pub fn errors_to_json(errors: &CompileErrors) -> Json {
    errors
        .iter()
        .map(|e| json!({ "key": e.key, "error": e.message }))
        .collect()
}
