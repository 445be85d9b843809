//! The operator registry and the built-in operator implementations.

use crate::engine::EvaluationContext;
use crate::error::EvaluationError;
use crate::signature::{Definition, Evaluator, Param, Signature};
use mapstyle_types::{Color, Object, Type, Value, stringify, type_of};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// Operator name to its overloads.
///
/// `Registry::default()` holds every built-in; `Registry::new()` starts empty so
/// tests can register a subset.
#[derive(Debug, Clone)]
pub struct Registry {
    definitions: HashMap<String, Arc<Definition>>,
}

impl Registry {
    /// Creates a new, empty registry.
    pub fn new() -> Self {
        Self { definitions: HashMap::new() }
    }

    /// The shared built-in registry, constructed on first use.
    pub fn builtin() -> &'static Registry {
        static BUILTIN: OnceLock<Registry> = OnceLock::new();
        BUILTIN.get_or_init(Registry::default)
    }

    /// Registers `signatures` under `name`, replacing any previous definition.
    pub fn define(&mut self, name: &str, signatures: Vec<Signature>) {
        self.definitions
            .insert(name.to_string(), Arc::new(Definition::new(name, signatures)));
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Definition>> {
        self.definitions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// A registry restricted to the named operators of `self`.
    pub fn subset(&self, names: &[&str]) -> Registry {
        let definitions = names
            .iter()
            .filter_map(|name| {
                self.definitions
                    .get(*name)
                    .map(|definition| (name.to_string(), Arc::clone(definition)))
            })
            .collect();
        Registry { definitions }
    }
}

// --- Argument helpers ---

fn arg(args: &[Value], index: usize) -> Result<&Value, EvaluationError> {
    args.get(index)
        .ok_or_else(|| EvaluationError::new(format!("Missing argument {}.", index + 1)))
}

fn number(args: &[Value], index: usize) -> Result<f64, EvaluationError> {
    let value = arg(args, index)?;
    value.as_number().ok_or_else(|| EvaluationError::type_mismatch(&Type::Number, value))
}

fn string(args: &[Value], index: usize) -> Result<&str, EvaluationError> {
    let value = arg(args, index)?;
    value.as_str().ok_or_else(|| EvaluationError::type_mismatch(&Type::String, value))
}

fn boolean(args: &[Value], index: usize) -> Result<bool, EvaluationError> {
    let value = arg(args, index)?;
    value.as_bool().ok_or_else(|| EvaluationError::type_mismatch(&Type::Boolean, value))
}

fn object(args: &[Value], index: usize) -> Result<&Object, EvaluationError> {
    match arg(args, index)? {
        Value::Object(map) => Ok(map),
        other => Err(EvaluationError::type_mismatch(&Type::Object, other)),
    }
}

fn array(args: &[Value], index: usize) -> Result<&[Value], EvaluationError> {
    match arg(args, index)? {
        Value::Array(items) => Ok(items),
        other => Err(EvaluationError::type_mismatch(&Type::array(Type::Value), other)),
    }
}

fn numbers(args: &[Value]) -> Result<Vec<f64>, EvaluationError> {
    (0..args.len()).map(|i| number(args, i)).collect()
}

fn booleans(args: &[Value]) -> Result<Vec<bool>, EvaluationError> {
    (0..args.len()).map(|i| boolean(args, i)).collect()
}

// --- Constants & Types ---

fn e(_: &EvaluationContext<'_>, _: &[Value]) -> Result<Value, EvaluationError> {
    Ok(Value::Number(std::f64::consts::E))
}

fn pi(_: &EvaluationContext<'_>, _: &[Value]) -> Result<Value, EvaluationError> {
    Ok(Value::Number(std::f64::consts::PI))
}

fn ln2(_: &EvaluationContext<'_>, _: &[Value]) -> Result<Value, EvaluationError> {
    Ok(Value::Number(std::f64::consts::LN_2))
}

fn type_name(_: &EvaluationContext<'_>, args: &[Value]) -> Result<Value, EvaluationError> {
    Ok(Value::String(type_of(arg(args, 0)?).to_string()))
}

fn assert_number(_: &EvaluationContext<'_>, args: &[Value]) -> Result<Value, EvaluationError> {
    number(args, 0).map(Value::Number)
}

fn assert_string(_: &EvaluationContext<'_>, args: &[Value]) -> Result<Value, EvaluationError> {
    string(args, 0).map(Value::from)
}

fn assert_boolean(_: &EvaluationContext<'_>, args: &[Value]) -> Result<Value, EvaluationError> {
    boolean(args, 0).map(Value::Boolean)
}

// --- Conversions ---

fn to_display_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => stringify(other),
    }
}

fn to_string(_: &EvaluationContext<'_>, args: &[Value]) -> Result<Value, EvaluationError> {
    Ok(Value::String(to_display_string(arg(args, 0)?)))
}

fn to_number(_: &EvaluationContext<'_>, args: &[Value]) -> Result<Value, EvaluationError> {
    let value = arg(args, 0)?;
    let converted = match value {
        Value::Number(n) => Some(*n),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    converted.map(Value::Number).ok_or_else(|| {
        EvaluationError::new(format!("Could not convert {} to number.", stringify(value)))
    })
}

fn to_boolean(_: &EvaluationContext<'_>, args: &[Value]) -> Result<Value, EvaluationError> {
    let truthy = match arg(args, 0)? {
        Value::Number(n) => *n != 0.0 && !n.is_nan(),
        Value::String(s) => !s.is_empty(),
        Value::Boolean(b) => *b,
        Value::Null => false,
        _ => true,
    };
    Ok(Value::Boolean(truthy))
}

fn to_rgba(_: &EvaluationContext<'_>, args: &[Value]) -> Result<Value, EvaluationError> {
    match arg(args, 0)? {
        Value::Color(color) => Ok(Value::Array(
            color.to_array().into_iter().map(Value::Number).collect(),
        )),
        other => Err(EvaluationError::type_mismatch(&Type::Color, other)),
    }
}

fn parse_color(_: &EvaluationContext<'_>, args: &[Value]) -> Result<Value, EvaluationError> {
    Color::parse(string(args, 0)?)
        .map(Value::Color)
        .map_err(|err| EvaluationError::new(err.to_string()))
}

// --- Color Constructors ---

fn color_from_channels(r: f64, g: f64, b: f64, a: f64) -> Result<Value, EvaluationError> {
    let channels = [r, g, b, a]
        .iter()
        .map(|c| stringify(&Value::Number(*c)))
        .collect::<Vec<_>>()
        .join(", ");
    let in_byte_range = |c: f64| (0.0..=255.0).contains(&c);
    if !(in_byte_range(r) && in_byte_range(g) && in_byte_range(b)) {
        return Err(EvaluationError::new(format!(
            "Invalid rgba value [{channels}]: 'r', 'g', and 'b' must be between 0 and 255."
        )));
    }
    if !(0.0..=1.0).contains(&a) {
        return Err(EvaluationError::new(format!(
            "Invalid rgba value [{channels}]: 'a' must be between 0 and 1."
        )));
    }
    Ok(Value::Color(Color::new(r / 255.0, g / 255.0, b / 255.0, a)))
}

fn rgba(_: &EvaluationContext<'_>, args: &[Value]) -> Result<Value, EvaluationError> {
    color_from_channels(number(args, 0)?, number(args, 1)?, number(args, 2)?, number(args, 3)?)
}

fn rgb(_: &EvaluationContext<'_>, args: &[Value]) -> Result<Value, EvaluationError> {
    color_from_channels(number(args, 0)?, number(args, 1)?, number(args, 2)?, 1.0)
}

// --- Feature & Context Access ---

fn zoom(ctx: &EvaluationContext<'_>, _: &[Value]) -> Result<Value, EvaluationError> {
    ctx.zoom().map(Value::Number)
}

fn has_feature_property(
    ctx: &EvaluationContext<'_>,
    args: &[Value],
) -> Result<Value, EvaluationError> {
    let key = string(args, 0)?;
    Ok(Value::Boolean(ctx.feature()?.property(key).is_some()))
}

fn has_object_property(
    _: &EvaluationContext<'_>,
    args: &[Value],
) -> Result<Value, EvaluationError> {
    let key = string(args, 0)?;
    Ok(Value::Boolean(object(args, 1)?.contains_key(key)))
}

fn get_feature_property(
    ctx: &EvaluationContext<'_>,
    args: &[Value],
) -> Result<Value, EvaluationError> {
    let key = string(args, 0)?;
    ctx.feature()?.property(key).ok_or_else(|| {
        EvaluationError::new(format!("Property '{key}' not found in feature.properties"))
    })
}

fn get_object_property(
    _: &EvaluationContext<'_>,
    args: &[Value],
) -> Result<Value, EvaluationError> {
    let key = string(args, 0)?;
    object(args, 1)?
        .get(key)
        .cloned()
        .ok_or_else(|| EvaluationError::new(format!("Property '{key}' not found in object")))
}

fn properties(ctx: &EvaluationContext<'_>, _: &[Value]) -> Result<Value, EvaluationError> {
    Ok(Value::Object(ctx.feature()?.properties()))
}

fn id(ctx: &EvaluationContext<'_>, _: &[Value]) -> Result<Value, EvaluationError> {
    ctx.feature()?
        .id()
        .ok_or_else(|| EvaluationError::new("Property 'id' not found in feature"))
}

fn geometry_type(ctx: &EvaluationContext<'_>, _: &[Value]) -> Result<Value, EvaluationError> {
    Ok(Value::from(ctx.feature()?.geometry_type().as_str()))
}

// --- Arrays & Strings ---

fn at(_: &EvaluationContext<'_>, args: &[Value]) -> Result<Value, EvaluationError> {
    let index = number(args, 0)?;
    let items = array(args, 1)?;
    if index < 0.0 || index.fract() != 0.0 || index >= items.len() as f64 {
        return Err(EvaluationError::new(format!(
            "Array index out of bounds: {} >= {}",
            stringify(&Value::Number(index)),
            items.len()
        )));
    }
    Ok(items[index as usize].clone())
}

fn array_length(_: &EvaluationContext<'_>, args: &[Value]) -> Result<Value, EvaluationError> {
    Ok(Value::Number(array(args, 0)?.len() as f64))
}

fn string_length(_: &EvaluationContext<'_>, args: &[Value]) -> Result<Value, EvaluationError> {
    Ok(Value::Number(string(args, 0)?.chars().count() as f64))
}

fn concat(_: &EvaluationContext<'_>, args: &[Value]) -> Result<Value, EvaluationError> {
    Ok(Value::String(args.iter().map(to_display_string).collect()))
}

fn upcase(_: &EvaluationContext<'_>, args: &[Value]) -> Result<Value, EvaluationError> {
    Ok(Value::String(string(args, 0)?.to_uppercase()))
}

fn downcase(_: &EvaluationContext<'_>, args: &[Value]) -> Result<Value, EvaluationError> {
    Ok(Value::String(string(args, 0)?.to_lowercase()))
}

// --- Arithmetic ---

fn plus(_: &EvaluationContext<'_>, args: &[Value]) -> Result<Value, EvaluationError> {
    Ok(Value::Number(numbers(args)?.into_iter().sum()))
}

fn times(_: &EvaluationContext<'_>, args: &[Value]) -> Result<Value, EvaluationError> {
    Ok(Value::Number(numbers(args)?.into_iter().product()))
}

fn minus(_: &EvaluationContext<'_>, args: &[Value]) -> Result<Value, EvaluationError> {
    Ok(Value::Number(number(args, 0)? - number(args, 1)?))
}

fn negate(_: &EvaluationContext<'_>, args: &[Value]) -> Result<Value, EvaluationError> {
    Ok(Value::Number(-number(args, 0)?))
}

fn divide(_: &EvaluationContext<'_>, args: &[Value]) -> Result<Value, EvaluationError> {
    Ok(Value::Number(number(args, 0)? / number(args, 1)?))
}

fn modulo(_: &EvaluationContext<'_>, args: &[Value]) -> Result<Value, EvaluationError> {
    Ok(Value::Number(number(args, 0)? % number(args, 1)?))
}

fn power(_: &EvaluationContext<'_>, args: &[Value]) -> Result<Value, EvaluationError> {
    Ok(Value::Number(number(args, 0)?.powf(number(args, 1)?)))
}

fn unary(args: &[Value], f: fn(f64) -> f64) -> Result<Value, EvaluationError> {
    Ok(Value::Number(f(number(args, 0)?)))
}

fn abs(_: &EvaluationContext<'_>, args: &[Value]) -> Result<Value, EvaluationError> {
    unary(args, f64::abs)
}

fn ceil(_: &EvaluationContext<'_>, args: &[Value]) -> Result<Value, EvaluationError> {
    unary(args, f64::ceil)
}

fn floor(_: &EvaluationContext<'_>, args: &[Value]) -> Result<Value, EvaluationError> {
    unary(args, f64::floor)
}

fn round(_: &EvaluationContext<'_>, args: &[Value]) -> Result<Value, EvaluationError> {
    unary(args, f64::round)
}

fn sqrt(_: &EvaluationContext<'_>, args: &[Value]) -> Result<Value, EvaluationError> {
    unary(args, f64::sqrt)
}

fn ln(_: &EvaluationContext<'_>, args: &[Value]) -> Result<Value, EvaluationError> {
    unary(args, f64::ln)
}

fn log10(_: &EvaluationContext<'_>, args: &[Value]) -> Result<Value, EvaluationError> {
    unary(args, f64::log10)
}

fn log2(_: &EvaluationContext<'_>, args: &[Value]) -> Result<Value, EvaluationError> {
    unary(args, f64::log2)
}

fn min(_: &EvaluationContext<'_>, args: &[Value]) -> Result<Value, EvaluationError> {
    Ok(Value::Number(numbers(args)?.into_iter().fold(f64::INFINITY, f64::min)))
}

fn max(_: &EvaluationContext<'_>, args: &[Value]) -> Result<Value, EvaluationError> {
    Ok(Value::Number(numbers(args)?.into_iter().fold(f64::NEG_INFINITY, f64::max)))
}

// --- Logic & Comparison ---

fn all(_: &EvaluationContext<'_>, args: &[Value]) -> Result<Value, EvaluationError> {
    Ok(Value::Boolean(booleans(args)?.into_iter().all(|b| b)))
}

fn any(_: &EvaluationContext<'_>, args: &[Value]) -> Result<Value, EvaluationError> {
    Ok(Value::Boolean(booleans(args)?.into_iter().any(|b| b)))
}

fn not(_: &EvaluationContext<'_>, args: &[Value]) -> Result<Value, EvaluationError> {
    Ok(Value::Boolean(!boolean(args, 0)?))
}

fn equal(_: &EvaluationContext<'_>, args: &[Value]) -> Result<Value, EvaluationError> {
    Ok(Value::Boolean(arg(args, 0)? == arg(args, 1)?))
}

fn not_equal(_: &EvaluationContext<'_>, args: &[Value]) -> Result<Value, EvaluationError> {
    Ok(Value::Boolean(arg(args, 0)? != arg(args, 1)?))
}

fn ordering(args: &[Value]) -> Result<Option<std::cmp::Ordering>, EvaluationError> {
    match (arg(args, 0)?, arg(args, 1)?) {
        (Value::Number(a), Value::Number(b)) => Ok(a.partial_cmp(b)),
        (Value::String(a), Value::String(b)) => Ok(Some(a.cmp(b))),
        (a, b) => Err(EvaluationError::new(format!(
            "Cannot compare {} and {}.",
            type_of(a),
            type_of(b)
        ))),
    }
}

fn less(_: &EvaluationContext<'_>, args: &[Value]) -> Result<Value, EvaluationError> {
    Ok(Value::Boolean(ordering(args)?.is_some_and(|o| o.is_lt())))
}

fn less_equal(_: &EvaluationContext<'_>, args: &[Value]) -> Result<Value, EvaluationError> {
    Ok(Value::Boolean(ordering(args)?.is_some_and(|o| o.is_le())))
}

fn greater(_: &EvaluationContext<'_>, args: &[Value]) -> Result<Value, EvaluationError> {
    Ok(Value::Boolean(ordering(args)?.is_some_and(|o| o.is_gt())))
}

fn greater_equal(_: &EvaluationContext<'_>, args: &[Value]) -> Result<Value, EvaluationError> {
    Ok(Value::Boolean(ordering(args)?.is_some_and(|o| o.is_ge())))
}

fn comparison(evaluate: Evaluator) -> Vec<Signature> {
    vec![
        Signature::new(Type::Boolean, vec![Type::Number, Type::Number], evaluate),
        Signature::new(Type::Boolean, vec![Type::String, Type::String], evaluate),
    ]
}

impl Default for Registry {
    /// Creates a new registry populated with all built-in operators.
    fn default() -> Self {
        let t = || Type::typename("T");
        let mut registry = Self::new();

        registry.define("e", vec![Signature::new(Type::Number, vec![], e)]);
        registry.define("pi", vec![Signature::new(Type::Number, vec![], pi)]);
        registry.define("ln2", vec![Signature::new(Type::Number, vec![], ln2)]);

        for (name, result, evaluate) in [
            ("typeof", Type::String, type_name as Evaluator),
            ("number", Type::Number, assert_number),
            ("string", Type::String, assert_string),
            ("boolean", Type::Boolean, assert_boolean),
            ("to-string", Type::String, to_string),
            ("to-number", Type::Number, to_number),
            ("to-boolean", Type::Boolean, to_boolean),
        ] {
            registry.define(name, vec![Signature::new(result, vec![Type::Value], evaluate)]);
        }
        registry.define(
            "to-rgba",
            vec![Signature::new(Type::array_n(Type::Number, 4), vec![Type::Color], to_rgba)],
        );
        registry.define(
            "parse-color",
            vec![Signature::new(Type::Color, vec![Type::String], parse_color)],
        );

        registry.define(
            "rgba",
            vec![Signature::new(Type::Color, vec![Type::Number; 4], rgba)],
        );
        registry.define(
            "rgb",
            vec![Signature::new(Type::Color, vec![Type::Number; 3], rgb)],
        );

        registry.define("zoom", vec![Signature::new(Type::Number, vec![], zoom).zoom_dependent()]);
        registry.define(
            "has",
            vec![
                Signature::new(Type::Boolean, vec![Type::String], has_feature_property)
                    .feature_dependent(),
                Signature::new(
                    Type::Boolean,
                    vec![Type::String, Type::Object],
                    has_object_property,
                ),
            ],
        );
        registry.define(
            "get",
            vec![
                Signature::new(Type::Value, vec![Type::String], get_feature_property)
                    .feature_dependent(),
                Signature::new(Type::Value, vec![Type::String, Type::Object], get_object_property),
            ],
        );
        registry.define("at", vec![Signature::new(t(), vec![Type::Number, Type::array(t())], at)]);
        registry.define(
            "length",
            vec![
                Signature::new(Type::Number, vec![Type::array(t())], array_length),
                Signature::new(Type::Number, vec![Type::String], string_length),
            ],
        );
        registry.define(
            "properties",
            vec![Signature::new(Type::Object, vec![], properties).feature_dependent()],
        );
        registry.define("id", vec![Signature::new(Type::Value, vec![], id).feature_dependent()]);
        registry.define(
            "geometry-type",
            vec![Signature::new(Type::String, vec![], geometry_type).feature_dependent()],
        );

        registry.define("+", vec![Signature::variadic(Type::Number, Type::Number, plus)]);
        registry.define("*", vec![Signature::variadic(Type::Number, Type::Number, times)]);
        registry.define(
            "-",
            vec![
                Signature::new(Type::Number, vec![Type::Number, Type::Number], minus),
                Signature::new(Type::Number, vec![Type::Number], negate),
            ],
        );
        for (name, evaluate) in [("/", divide as Evaluator), ("%", modulo), ("^", power)] {
            registry.define(
                name,
                vec![Signature::new(Type::Number, vec![Type::Number; 2], evaluate)],
            );
        }

        registry.define("&&", vec![Signature::variadic(Type::Boolean, Type::Boolean, all)]);
        registry.define("||", vec![Signature::variadic(Type::Boolean, Type::Boolean, any)]);
        registry.define("!", vec![Signature::new(Type::Boolean, vec![Type::Boolean], not)]);

        registry.define("==", vec![Signature::new(Type::Boolean, vec![t(), t()], equal)]);
        registry.define("!=", vec![Signature::new(Type::Boolean, vec![t(), t()], not_equal)]);
        registry.define("<", comparison(less));
        registry.define("<=", comparison(less_equal));
        registry.define(">", comparison(greater));
        registry.define(">=", comparison(greater_equal));

        for (name, evaluate) in [
            ("abs", abs as Evaluator),
            ("ceil", ceil),
            ("floor", floor),
            ("round", round),
            ("sqrt", sqrt),
            ("ln", ln),
            ("log10", log10),
            ("log2", log2),
        ] {
            registry.define(name, vec![Signature::new(Type::Number, vec![Type::Number], evaluate)]);
        }
        let at_least_one = vec![
            Param::Type(Type::Number),
            Param::Repeat { types: vec![Type::Number], max: None },
        ];
        registry.define(
            "min",
            vec![Signature::new(Type::Number, vec![], min).with_params(at_least_one.clone())],
        );
        registry.define(
            "max",
            vec![Signature::new(Type::Number, vec![], max).with_params(at_least_one)],
        );

        registry.define("concat", vec![Signature::variadic(Type::String, Type::Value, concat)]);
        registry.define("upcase", vec![Signature::new(Type::String, vec![Type::String], upcase)]);
        registry.define(
            "downcase",
            vec![Signature::new(Type::String, vec![Type::String], downcase)],
        );

        log::debug!("Registered {} built-in operators", registry.len());
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::JsonFeature;
    use serde_json::json;

    fn call(
        name: &str,
        signature: usize,
        ctx: &EvaluationContext<'_>,
        args: &[Value],
    ) -> Result<Value, EvaluationError> {
        let definition = Registry::builtin().get(name).unwrap();
        (definition.signatures[signature].evaluate)(ctx, args)
    }

    fn eval(name: &str, args: &[Value]) -> Result<Value, EvaluationError> {
        call(name, 0, &EvaluationContext::default(), args)
    }

    #[test]
    fn registers_the_core_operator_surface() {
        let registry = Registry::default();
        for name in [
            "get", "has", "at", "length", "properties", "id", "geometry-type", "to-string",
            "to-number", "to-boolean", "to-rgba", "parse-color", "rgb", "rgba", "zoom", "e", "pi",
            "ln2", "typeof", "string", "number", "boolean", "+", "-", "*", "/", "%", "^", "&&",
            "||", "!",
        ] {
            assert!(registry.contains(name), "missing {name}");
        }
    }

    #[test]
    fn subset_keeps_only_named_operators() {
        let subset = Registry::builtin().subset(&["+", "get", "nope"]);
        assert_eq!(subset.len(), 2);
        assert!(subset.contains("get"));
        assert!(!subset.contains("-"));
        assert!(Registry::new().is_empty());
    }

    #[test]
    fn conversions() {
        assert_eq!(eval("to-number", &[Value::from(" 12.5 ")]).unwrap(), Value::Number(12.5));
        assert_eq!(
            eval("to-number", &[Value::from("abc")]).unwrap_err().message,
            "Could not convert \"abc\" to number."
        );
        assert_eq!(eval("to-string", &[Value::Number(3.0)]).unwrap(), Value::from("3"));
        assert_eq!(eval("to-string", &[Value::from("x")]).unwrap(), Value::from("x"));
        assert_eq!(eval("to-boolean", &[Value::Number(0.0)]).unwrap(), Value::Boolean(false));
        assert_eq!(eval("to-boolean", &[Value::from("")]).unwrap(), Value::Boolean(false));
        assert_eq!(eval("to-boolean", &[Value::Null]).unwrap(), Value::Boolean(false));
        assert_eq!(eval("to-boolean", &[Value::Array(vec![])]).unwrap(), Value::Boolean(true));
        assert_eq!(
            eval("typeof", &[Value::from_json(&json!([1, 2]))]).unwrap(),
            Value::from("Array<Number, 2>")
        );
    }

    #[test]
    fn assertions_fail_rather_than_coerce() {
        assert_eq!(
            eval("number", &[Value::from("1")]).unwrap_err().message,
            "Expected value to be of type Number, but found String instead."
        );
        assert_eq!(eval("boolean", &[Value::Boolean(true)]).unwrap(), Value::Boolean(true));
    }

    #[test]
    fn color_constructors_validate_bounds() {
        assert_eq!(
            eval("rgb", &[Value::Number(255.0), Value::Number(0.0), Value::Number(0.0)]).unwrap(),
            Value::Color(Color::new(1.0, 0.0, 0.0, 1.0))
        );
        let err = eval(
            "rgba",
            &[Value::Number(300.0), Value::Number(0.0), Value::Number(0.0), Value::Number(1.0)],
        )
        .unwrap_err();
        assert_eq!(
            err.message,
            "Invalid rgba value [300, 0, 0, 1]: 'r', 'g', and 'b' must be between 0 and 255."
        );
        let err = eval(
            "rgba",
            &[Value::Number(0.0), Value::Number(0.0), Value::Number(0.0), Value::Number(1.5)],
        )
        .unwrap_err();
        assert_eq!(err.message, "Invalid rgba value [0, 0, 0, 1.5]: 'a' must be between 0 and 1.");
    }

    #[test]
    fn color_round_trip_through_rgba_array() {
        let color = eval("parse-color", &[Value::from("#ff0000")]).unwrap();
        assert_eq!(
            eval("to-rgba", &[color]).unwrap(),
            Value::from_json(&json!([1, 0, 0, 1]))
        );
        assert_eq!(
            eval("parse-color", &[Value::from("nope")]).unwrap_err().message,
            "Could not parse color from value 'nope'"
        );
    }

    #[test]
    fn feature_access_requires_a_feature() {
        let err =
            call("get", 0, &EvaluationContext::zoom_only(3.0), &[Value::from("a")]).unwrap_err();
        assert_eq!(err.message, "Feature data is unavailable in the current evaluation context.");

        let feature = JsonFeature::new().with_property("a", json!(1));
        let ctx = EvaluationContext::new(3.0, &feature);
        assert_eq!(call("get", 0, &ctx, &[Value::from("a")]).unwrap(), Value::Number(1.0));
        assert_eq!(
            call("get", 0, &ctx, &[Value::from("b")]).unwrap_err().message,
            "Property 'b' not found in feature.properties"
        );
        assert_eq!(call("has", 0, &ctx, &[Value::from("b")]).unwrap(), Value::Boolean(false));
        assert_eq!(
            call("id", 0, &ctx, &[]).unwrap_err().message,
            "Property 'id' not found in feature"
        );
        assert_eq!(call("geometry-type", 0, &ctx, &[]).unwrap(), Value::from("Unknown"));
    }

    #[test]
    fn object_access_without_feature() {
        let obj = Value::from_json(&json!({"k": 2}));
        let ctx = EvaluationContext::default();
        assert_eq!(
            call("get", 1, &ctx, &[Value::from("k"), obj.clone()]).unwrap(),
            Value::Number(2.0)
        );
        assert_eq!(
            call("get", 1, &ctx, &[Value::from("x"), obj.clone()]).unwrap_err().message,
            "Property 'x' not found in object"
        );
        assert_eq!(call("has", 1, &ctx, &[Value::from("k"), obj]).unwrap(), Value::Boolean(true));
    }

    #[test]
    fn at_checks_bounds() {
        let items = Value::from_json(&json!([10, 20, 30]));
        assert_eq!(eval("at", &[Value::Number(2.0), items.clone()]).unwrap(), Value::Number(30.0));
        assert_eq!(
            eval("at", &[Value::Number(3.0), items.clone()]).unwrap_err().message,
            "Array index out of bounds: 3 >= 3"
        );
        assert!(eval("at", &[Value::Number(-1.0), items]).is_err());
    }

    #[test]
    fn arithmetic_and_logic() {
        let n = Value::Number;
        assert_eq!(eval("+", &[n(1.0), n(2.0), n(3.0)]).unwrap(), n(6.0));
        assert_eq!(eval("+", &[]).unwrap(), n(0.0));
        assert_eq!(eval("*", &[n(2.0), n(4.0)]).unwrap(), n(8.0));
        assert_eq!(eval("%", &[n(7.0), n(4.0)]).unwrap(), n(3.0));
        assert_eq!(eval("^", &[n(2.0), n(10.0)]).unwrap(), n(1024.0));
        assert_eq!(call("-", 1, &EvaluationContext::default(), &[n(2.0)]).unwrap(), n(-2.0));
        assert_eq!(eval("min", &[n(3.0), n(1.0), n(2.0)]).unwrap(), n(1.0));
        assert_eq!(
            eval("&&", &[Value::Boolean(true), Value::Boolean(false)]).unwrap(),
            Value::Boolean(false)
        );
        assert_eq!(
            eval("||", &[Value::Boolean(false), Value::Boolean(true)]).unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(eval("<", &[n(1.0), n(2.0)]).unwrap(), Value::Boolean(true));
        assert_eq!(eval("concat", &[Value::from("a"), n(1.0)]).unwrap(), Value::from("a1"));
    }
}
