//! Conversion of legacy stop functions into expressions.
//!
//! A stop function such as `{"base": 1.5, "stops": [[0, 1], [10, 4]]}` is
//! rewritten into the equivalent expression JSON and parsed like any other
//! expression, so it is checked by the same rules.

use crate::ast::{Expression, integer_label};
use crate::curve::is_interpolatable;
use crate::error::CompileErrors;
use crate::parser::Parser;
use mapstyle_types::Type;
use serde::Deserialize;
use serde_json::{Value as Json, json};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FunctionError {
    #[error("Invalid function: {0}")]
    Invalid(#[from] serde_json::Error),

    #[error("{0}")]
    Unsupported(String),

    #[error(transparent)]
    Compile(#[from] CompileErrors),
}

impl FunctionError {
    fn unsupported(message: impl Into<String>) -> Self {
        FunctionError::Unsupported(message.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionKind {
    Exponential,
    Interval,
    Categorical,
    Identity,
}

/// The domain of a zoom-and-property stop.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CompositeKey {
    pub zoom: f64,
    pub value: Json,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StyleFunction {
    #[serde(rename = "type", default)]
    pub kind: Option<FunctionKind>,
    #[serde(default)]
    pub property: Option<String>,
    #[serde(default)]
    pub base: Option<f64>,
    #[serde(default)]
    pub stops: Vec<(Json, Json)>,
    #[serde(default)]
    pub default: Option<Json>,
}

/// Whether `json` looks like a legacy function rather than an expression or constant.
pub fn is_function(json: &Json) -> bool {
    json.as_object().is_some_and(|object| {
        object.contains_key("stops")
            || object.get("type").and_then(Json::as_str) == Some("identity")
    })
}

/// Parses a legacy function into a checked expression of type `expected`.
pub fn convert_function(json: &Json, expected: &Type) -> Result<Expression, FunctionError> {
    let function = StyleFunction::deserialize(json)?;
    let converted = function.to_expression(expected)?;
    log::debug!("Converted legacy function to {converted}");
    Ok(Parser::default().parse(&converted, Some(expected.clone()))?)
}

impl StyleFunction {
    /// The function's kind, defaulting by whether `expected` can be interpolated.
    pub fn kind_for(&self, expected: &Type) -> FunctionKind {
        self.kind.unwrap_or(if is_interpolatable(expected) {
            FunctionKind::Exponential
        } else {
            FunctionKind::Interval
        })
    }

    /// Rewrites the function as expression JSON.
    pub fn to_expression(&self, expected: &Type) -> Result<Json, FunctionError> {
        let kind = self.kind_for(expected);
        let converted = match (&self.property, kind) {
            (_, FunctionKind::Identity) => {
                let property = self.property.as_deref().ok_or_else(|| {
                    FunctionError::unsupported("Identity functions require a property")
                })?;
                identity(property, expected)
            }
            (None, FunctionKind::Categorical) => {
                return Err(FunctionError::unsupported("Categorical functions require a property"));
            }
            (None, kind) => curve(kind, self.base, json!(["zoom"]), &self.stops, expected)?,
            (Some(property), kind) if self.is_composite() => {
                self.composite(property, kind, expected)?
            }
            (Some(property), FunctionKind::Categorical) => {
                categorical(property, &self.stops, self.default.as_ref(), expected)?
            }
            (Some(property), kind) => {
                curve(kind, self.base, json!(["number", ["get", property]]), &self.stops, expected)?
            }
        };

        Ok(match &self.default {
            // Categorical functions already fall back to the default.
            Some(default) if kind != FunctionKind::Categorical || self.is_composite() => {
                json!(["coalesce", converted, output(default, expected)])
            }
            _ => converted,
        })
    }

    fn is_composite(&self) -> bool {
        self.stops.first().is_some_and(|(key, _)| key.is_object())
    }

    /// Zoom-and-property stops: an outer zoom curve over one property function per zoom level.
    fn composite(
        &self,
        property: &str,
        kind: FunctionKind,
        expected: &Type,
    ) -> Result<Json, FunctionError> {
        let mut levels: Vec<(f64, Vec<(Json, Json)>)> = Vec::new();
        for (key, value) in &self.stops {
            let key = CompositeKey::deserialize(key)?;
            match levels.last_mut() {
                Some((zoom, stops)) if *zoom == key.zoom => stops.push((key.value, value.clone())),
                _ => levels.push((key.zoom, vec![(key.value, value.clone())])),
            }
        }

        let interpolation = match kind {
            FunctionKind::Exponential => json!(["exponential", self.base.unwrap_or(1.0)]),
            _ => json!(["step"]),
        };
        let mut converted = vec![json!("curve"), interpolation, json!(["zoom"])];
        for (zoom, stops) in &levels {
            let inner = match kind {
                FunctionKind::Categorical => {
                    categorical(property, stops, self.default.as_ref(), expected)?
                }
                _ => {
                    let input = json!(["number", ["get", property]]);
                    curve(kind, self.base, input, stops, expected)?
                }
            };
            converted.push(json!(zoom));
            converted.push(inner);
        }
        Ok(Json::Array(converted))
    }
}

/// A stop output as an expression: arrays and objects are quoted, color strings parsed.
fn output(value: &Json, expected: &Type) -> Json {
    match value {
        Json::String(_) if *expected == Type::Color => json!(["parse-color", value]),
        Json::Array(_) | Json::Object(_) => json!(["literal", value]),
        _ => value.clone(),
    }
}

fn curve(
    kind: FunctionKind,
    base: Option<f64>,
    input: Json,
    stops: &[(Json, Json)],
    expected: &Type,
) -> Result<Json, FunctionError> {
    let interpolation = match kind {
        FunctionKind::Exponential => json!(["exponential", base.unwrap_or(1.0)]),
        _ => json!(["step"]),
    };
    let mut converted = vec![json!("curve"), interpolation, input];
    for (key, value) in stops {
        let label = key.as_f64().ok_or_else(|| {
            FunctionError::unsupported(format!("Stop domain values must be numbers, found {key}"))
        })?;
        converted.push(json!(label));
        converted.push(output(value, expected));
    }
    Ok(Json::Array(converted))
}

fn categorical(
    property: &str,
    stops: &[(Json, Json)],
    default: Option<&Json>,
    expected: &Type,
) -> Result<Json, FunctionError> {
    let fallback = default.map_or(Json::Null, |value| output(value, expected));
    let Some((first, _)) = stops.first() else {
        return Ok(fallback);
    };

    let matchable = stops
        .iter()
        .all(|(key, _)| key.is_string() || key.as_f64().and_then(integer_label).is_some());
    let same_kind = stops.iter().all(|(key, _)| key.is_string() == first.is_string());

    if matchable && same_kind {
        let assertion = if first.is_string() { "string" } else { "number" };
        let mut converted = vec![json!("match"), json!([assertion, ["get", property]])];
        let mut seen = Vec::with_capacity(stops.len());
        for (key, value) in stops {
            // The first of duplicate keys wins.
            if seen.contains(&key) {
                continue;
            }
            seen.push(key);
            converted.push(key.clone());
            converted.push(output(value, expected));
        }
        converted.push(fallback);
        return Ok(Json::Array(converted));
    }

    let mut converted = vec![json!("case")];
    for (key, value) in stops {
        if key.is_array() || key.is_object() {
            return Err(FunctionError::unsupported(format!(
                "Unsupported categorical stop domain {key}"
            )));
        }
        converted.push(json!(["==", ["get", property], key]));
        converted.push(output(value, expected));
    }
    converted.push(fallback);
    Ok(Json::Array(converted))
}

fn identity(property: &str, expected: &Type) -> Json {
    let get = json!(["get", property]);
    match expected {
        Type::Number => json!(["number", get]),
        Type::String => json!(["string", get]),
        Type::Boolean => json!(["boolean", get]),
        Type::Color => json!(["parse-color", ["string", get]]),
        Type::Array(array) => match (&*array.item, array.n) {
            (Type::Number, Some(n)) => json!(["array", "number", n, get]),
            (Type::Number, None) => json!(["array", "number", get]),
            (Type::String, Some(n)) => json!(["array", "string", n, get]),
            (Type::String, None) => json!(["array", "string", get]),
            _ => json!(["array", get]),
        },
        _ => get,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EvaluationContext;
    use crate::feature::JsonFeature;
    use mapstyle_types::{Color, Value};

    fn eval(function: Json, expected: Type, zoom: f64, feature: &JsonFeature) -> Value {
        convert_function(&function, &expected)
            .unwrap()
            .evaluate(&EvaluationContext::new(zoom, feature))
            .unwrap()
    }

    #[test]
    fn detects_functions() {
        assert!(is_function(&json!({"stops": [[0, 1]]})));
        assert!(is_function(&json!({"type": "identity", "property": "x"})));
        assert!(!is_function(&json!({"a": 1})));
        assert!(!is_function(&json!(["get", "a"])));
    }

    #[test]
    fn camera_function_defaults_to_exponential_for_numbers() {
        let function = json!({"stops": [[0, 1], [10, 2]]});
        let value = eval(function, Type::Number, 5.0, &JsonFeature::new());
        assert_eq!(value, Value::Number(1.5));
    }

    #[test]
    fn camera_function_defaults_to_interval_for_strings() {
        let function = json!({"stops": [[0, "a"], [10, "b"]]});
        let feature = JsonFeature::new();
        assert_eq!(eval(function.clone(), Type::String, 9.9, &feature), Value::from("a"));
        assert_eq!(eval(function, Type::String, 10.0, &feature), Value::from("b"));
    }

    #[test]
    fn exponential_base_is_used() {
        let function = json!({"type": "exponential", "base": 2, "stops": [[0, 0], [2, 3]]});
        let value = eval(function, Type::Number, 1.0, &JsonFeature::new());
        let n = value.as_number().unwrap();
        assert!((n - 1.0).abs() < 1e-9, "{n}");
    }

    #[test]
    fn color_stops_are_parsed() {
        let function = json!({"stops": [[0, "black"], [10, "white"]]});
        let value = eval(function, Type::Color, 5.0, &JsonFeature::new());
        assert_eq!(value, Value::Color(Color::new(0.5, 0.5, 0.5, 1.0)));
    }

    #[test]
    fn property_function_reads_the_feature() {
        let function = json!({"property": "size", "stops": [[0, 0], [100, 10]]});
        let feature = JsonFeature::new().with_property("size", json!(50));
        assert_eq!(eval(function, Type::Number, 0.0, &feature), Value::Number(5.0));
    }

    #[test]
    fn categorical_string_keys_become_match() {
        let function = json!({
            "type": "categorical",
            "property": "kind",
            "stops": [["road", "#ff0000"], ["rail", "#0000ff"]],
            "default": "black"
        });
        let converted =
            StyleFunction::deserialize(&function).unwrap().to_expression(&Type::Color).unwrap();
        assert_eq!(converted[0], json!("match"));

        let rail = JsonFeature::new().with_property("kind", json!("rail"));
        assert_eq!(
            eval(function.clone(), Type::Color, 0.0, &rail),
            Value::Color(Color::new(0.0, 0.0, 1.0, 1.0))
        );
        let other = JsonFeature::new().with_property("kind", json!("path"));
        assert_eq!(eval(function, Type::Color, 0.0, &other), Value::Color(Color::BLACK));
    }

    #[test]
    fn categorical_boolean_keys_become_case() {
        let function = json!({
            "type": "categorical",
            "property": "oneway",
            "stops": [[true, 2], [false, 1]]
        });
        let converted =
            StyleFunction::deserialize(&function).unwrap().to_expression(&Type::Number).unwrap();
        assert_eq!(converted[0], json!("case"));
        let feature = JsonFeature::new().with_property("oneway", json!(true));
        assert_eq!(eval(function, Type::Number, 0.0, &feature), Value::Number(2.0));
    }

    #[test]
    fn identity_asserts_the_expected_type() {
        let function = json!({"type": "identity", "property": "label"});
        let feature = JsonFeature::new().with_property("label", json!("Main St"));
        assert_eq!(eval(function.clone(), Type::String, 0.0, &feature), Value::from("Main St"));

        let numeric = JsonFeature::new().with_property("label", json!(3));
        let err = convert_function(&function, &Type::String)
            .unwrap()
            .evaluate(&EvaluationContext::new(0.0, &numeric))
            .unwrap_err();
        assert_eq!(err.message, "Expected value to be of type String, but found Number instead.");
    }

    #[test]
    fn default_covers_missing_properties() {
        let function = json!({"property": "size", "stops": [[0, 0], [100, 10]], "default": 7});
        assert_eq!(eval(function, Type::Number, 0.0, &JsonFeature::new()), Value::Number(7.0));
    }

    #[test]
    fn composite_function_interpolates_between_zoom_levels() {
        let function = json!({
            "property": "rank",
            "stops": [
                [{"zoom": 0, "value": 0}, 0],
                [{"zoom": 0, "value": 10}, 10],
                [{"zoom": 10, "value": 0}, 20],
                [{"zoom": 10, "value": 10}, 30]
            ]
        });
        let feature = JsonFeature::new().with_property("rank", json!(5));
        assert_eq!(eval(function, Type::Number, 5.0, &feature), Value::Number(15.0));
    }

    #[test]
    fn rejects_malformed_functions() {
        assert!(matches!(
            convert_function(&json!({"stops": [["a", 1]]}), &Type::Number),
            Err(FunctionError::Unsupported(_))
        ));
        assert!(matches!(
            convert_function(&json!({"type": "categorical", "stops": [["a", 1]]}), &Type::Number),
            Err(FunctionError::Unsupported(_))
        ));
        assert!(matches!(
            convert_function(&json!({"stops": 3}), &Type::Number),
            Err(FunctionError::Invalid(_))
        ));
        assert!(matches!(
            convert_function(&json!({"stops": [[0, "a"], [10, 1]]}), &Type::String),
            Err(FunctionError::Compile(_))
        ));
    }
}
