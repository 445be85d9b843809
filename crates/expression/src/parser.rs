//! Turns the JSON array syntax into a typed [`Expression`].
//!
//! Each operator has its own sub-parser. Children are parsed with the type
//! their parent expects, and a mismatch is reported at the child's location.
//! The finished tree is then passed through the type checker.

use crate::ast::{
    Arena, Compound, Expression, Interpolation, MAX_LABEL, MatchCases, NodeId, NodeKind,
    integer_label,
};
use crate::context::ParsingContext;
use crate::curve::{is_interpolatable, not_interpolatable_message};
use crate::definitions::Registry;
use crate::error::{CompileError, CompileErrors};
use crate::signature::{Definition, Signature};
use crate::typecheck::typecheck;
use mapstyle_types::{
    ArrayType, Type, TypenameScope, Typenames, Value, check_subtype, match_type, type_of,
};
use serde_json::Value as Json;
use std::collections::HashMap;
use std::sync::Arc;

/// Parses and type-checks `json` with the built-in operators.
pub fn parse(json: &Json, expected: Option<Type>) -> Result<Expression, CompileErrors> {
    Parser::default().parse(json, expected)
}

/// Parses expressions against a particular operator registry.
#[derive(Debug, Clone, Copy)]
pub struct Parser<'r> {
    registry: &'r Registry,
}

impl Default for Parser<'static> {
    fn default() -> Self {
        Self { registry: Registry::builtin() }
    }
}

/// A branch label of a `match` expression.
#[derive(Debug, Clone, PartialEq)]
enum Label {
    Number(i64),
    String(String),
}

/// Outcome of checking argument types against one signature.
struct SignatureMatch {
    result: Type,
    /// Arguments of type `Value` that need a runtime assertion to the given type.
    assertions: Vec<Option<Type>>,
    /// A `Value` argument met a generic parameter that no assertion can pin down.
    unresolved: bool,
}

/// Whether a runtime assertion exists for this kind of type.
fn is_assertable(expected: &Type) -> bool {
    matches!(
        expected,
        Type::Number | Type::String | Type::Boolean | Type::Object | Type::Array(_)
    )
}

/// The JavaScript `typeof` name of a JSON value.
fn js_type(json: &Json) -> &'static str {
    match json {
        Json::Null | Json::Array(_) | Json::Object(_) => "object",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
    }
}

impl<'r> Parser<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    /// Parses `json`, then type-checks the tree against `expected` (or `Value`).
    pub fn parse(&self, json: &Json, expected: Option<Type>) -> Result<Expression, CompileErrors> {
        let ctx = ParsingContext::new(expected.clone());
        let mut arena = Arena::default();
        let root = self.parse_expression(json, &ctx, &mut arena);
        let errors = ctx.take_errors();
        let root = match root {
            Some(root) if errors.is_empty() => root,
            _ => {
                log::debug!("Parse failed with {} error(s)", errors.len());
                return Err(CompileErrors(errors));
            }
        };

        typecheck(&expected.unwrap_or(Type::Value), root, &mut arena).map_err(CompileErrors)?;
        let expression = Expression::new(arena, root);
        log::debug!(
            "Parsed expression of type {} (feature constant: {}, zoom constant: {})",
            expression.ty(),
            expression.is_feature_constant(),
            expression.is_zoom_constant()
        );
        Ok(expression)
    }

    /// Parses one subexpression. `None` means errors were recorded in `ctx`.
    pub fn parse_expression(
        &self,
        json: &Json,
        ctx: &ParsingContext,
        arena: &mut Arena,
    ) -> Option<NodeId> {
        let parsed = match json {
            Json::Array(items) => self.parse_operator(items, ctx, arena)?,
            Json::Object(_) => {
                ctx.error(r#"Bare objects invalid. Use ["literal", {...}] instead."#);
                return None;
            }
            scalar => arena.literal(ctx.key(), Value::from_json(scalar)),
        };

        match &ctx.expected {
            Some(expected) => self.conform(parsed, expected, ctx, arena),
            None => Some(parsed),
        }
    }

    fn parse_item(
        &self,
        items: &[Json],
        i: usize,
        expected: Option<Type>,
        ctx: &ParsingContext,
        arena: &mut Arena,
    ) -> Option<NodeId> {
        self.parse_expression(&items[i], &ctx.concat(i, expected), arena)
    }

    /// Checks a parsed child against the expected type, inserting a runtime
    /// assertion when the child only knows it produces a `Value`.
    fn conform(
        &self,
        id: NodeId,
        expected: &Type,
        ctx: &ParsingContext,
        arena: &mut Arena,
    ) -> Option<NodeId> {
        let actual = arena[id].ty.clone();
        match check_subtype(expected, &actual) {
            Ok(()) => Some(id),
            Err(_)
                if actual == Type::Value && !expected.is_generic() && is_assertable(expected) =>
            {
                Some(wrap_assertion(arena, id, expected.clone()))
            }
            Err(mismatch) => {
                ctx.error(mismatch.message);
                None
            }
        }
    }

    fn parse_operator(
        &self,
        items: &[Json],
        ctx: &ParsingContext,
        arena: &mut Arena,
    ) -> Option<NodeId> {
        let Some(first) = items.first() else {
            ctx.error(
                r#"Expected an array with at least one element. If you wanted a literal array, use ["literal", []]."#,
            );
            return None;
        };
        let Json::String(op) = first else {
            ctx.error_at(
                format!(
                    r#"Expression name must be a string, but found {} instead. If you wanted a literal array, use ["literal", [...]]."#,
                    js_type(first)
                ),
                0,
            );
            return None;
        };

        match op.as_str() {
            "literal" => self.parse_literal(items, ctx, arena),
            "match" => self.parse_match(items, ctx, arena),
            "curve" => self.parse_curve(items, ctx, arena),
            "coalesce" => self.parse_coalesce(items, ctx, arena),
            "case" => self.parse_case(items, ctx, arena),
            "array" => self.parse_array_assertion(items, ctx, arena),
            name => match self.registry.get(name) {
                Some(definition) => self.parse_compound(definition, items, ctx, arena),
                None => {
                    ctx.error_at(
                        format!(
                            r#"Unknown expression "{name}". If you wanted a literal array, use ["literal", [...]]."#
                        ),
                        0,
                    );
                    None
                }
            },
        }
    }

    // --- Literal ---

    fn parse_literal(
        &self,
        items: &[Json],
        ctx: &ParsingContext,
        arena: &mut Arena,
    ) -> Option<NodeId> {
        if items.len() != 2 {
            ctx.error(format!(
                "'literal' expression requires exactly one argument, but found {} instead.",
                items.len() - 1
            ));
            return None;
        }
        let value = Value::from_json(&items[1]);
        let mut ty = type_of(&value);

        // An empty array takes the expected array type so `[]` can satisfy `Array<Number, 0>`.
        if let (Some(Type::Array(expected)), Type::Array(actual)) = (&ctx.expected, &ty) {
            if actual.n == Some(0) && matches!(expected.n, None | Some(0)) {
                ty = Type::Array(expected.clone());
            }
        }
        Some(arena.push(ctx.key(), ty, NodeKind::Literal(value)))
    }

    // --- Case ---

    fn parse_case(
        &self,
        items: &[Json],
        ctx: &ParsingContext,
        arena: &mut Arena,
    ) -> Option<NodeId> {
        let len = items.len();
        if len < 4 {
            ctx.error(format!("Expected at least 3 arguments, but found only {}.", len - 1));
            return None;
        }
        if len % 2 != 0 {
            ctx.error("Expected an odd number of arguments");
            return None;
        }

        let mut output_type = output_expectation(ctx);
        let mut branches = Vec::with_capacity(len / 2);
        for i in (1..len - 1).step_by(2) {
            let condition = self.parse_item(items, i, Some(Type::Boolean), ctx, arena)?;
            let output = self.parse_item(items, i + 1, output_type.clone(), ctx, arena)?;
            output_type.get_or_insert_with(|| arena[output].ty.clone());
            branches.push((condition, output));
        }
        let otherwise = self.parse_item(items, len - 1, output_type.clone(), ctx, arena)?;
        let ty = output_type.unwrap_or_else(|| arena[otherwise].ty.clone());
        Some(arena.push(ctx.key(), ty, NodeKind::Case { branches, otherwise }))
    }

    // --- Coalesce ---

    fn parse_coalesce(
        &self,
        items: &[Json],
        ctx: &ParsingContext,
        arena: &mut Arena,
    ) -> Option<NodeId> {
        if items.len() < 2 {
            ctx.error("Expected at least one argument.");
            return None;
        }
        let mut output_type = output_expectation(ctx);
        let mut args = Vec::with_capacity(items.len() - 1);
        for (i, item) in items.iter().enumerate().skip(1) {
            let arg = self.parse_expression(item, &ctx.concat(i, output_type.clone()), arena)?;
            output_type.get_or_insert_with(|| arena[arg].ty.clone());
            args.push(arg);
        }
        let ty = output_type.unwrap_or(Type::Value);
        Some(arena.push(ctx.key(), ty, NodeKind::Coalesce { args }))
    }

    // --- Match ---

    fn parse_match(
        &self,
        items: &[Json],
        ctx: &ParsingContext,
        arena: &mut Arena,
    ) -> Option<NodeId> {
        let len = items.len();
        if len < 5 {
            ctx.error(format!("Expected at least 4 arguments, but found only {}.", len - 1));
            return None;
        }
        if len % 2 != 1 {
            ctx.error("Expected an even number of arguments.");
            return None;
        }

        let mut input_type: Option<Type> = None;
        let mut output_type = output_expectation(ctx);
        let mut branches: Vec<(Vec<Label>, NodeId)> = Vec::with_capacity(len / 2);
        for i in (2..len - 1).step_by(2) {
            let label_ctx = ctx.concat(i, None);
            let labels = match &items[i] {
                Json::Array(group) => {
                    if group.is_empty() {
                        label_ctx.error("Expected at least one branch label.");
                        return None;
                    }
                    group
                        .iter()
                        .map(|label| parse_label(label, &label_ctx, &mut input_type))
                        .collect::<Option<Vec<_>>>()?
                }
                label => vec![parse_label(label, &label_ctx, &mut input_type)?],
            };
            let output = self.parse_item(items, i + 1, output_type.clone(), ctx, arena)?;
            output_type.get_or_insert_with(|| arena[output].ty.clone());
            branches.push((labels, output));
        }

        let input_type = input_type?;
        let input = self.parse_item(items, 1, Some(input_type.clone()), ctx, arena)?;
        let otherwise = self.parse_item(items, len - 1, output_type.clone(), ctx, arena)?;

        let mut numbers = HashMap::new();
        let mut strings = HashMap::new();
        for (branch, (labels, output)) in branches.iter().enumerate() {
            for label in labels {
                let fresh = match label {
                    Label::Number(n) => numbers.insert(*n, *output).is_none(),
                    Label::String(s) => strings.insert(s.clone(), *output).is_none(),
                };
                if !fresh {
                    ctx.error_at("Branch labels must be unique.", 2 + branch * 2);
                    return None;
                }
            }
        }
        let cases = match input_type {
            Type::Number => MatchCases::Number(numbers),
            _ => MatchCases::String(strings),
        };
        let outputs = branches.iter().map(|(_, output)| *output).collect();
        let ty = output_type.unwrap_or(Type::Value);
        Some(arena.push(ctx.key(), ty, NodeKind::Match { input, cases, outputs, otherwise }))
    }

    // --- Curve ---

    fn parse_curve(
        &self,
        items: &[Json],
        ctx: &ParsingContext,
        arena: &mut Arena,
    ) -> Option<NodeId> {
        let len = items.len();
        if len < 4 {
            ctx.error(format!("Expected at least 3 arguments, but found only {}.", len - 1));
            return None;
        }
        if len % 2 != 1 {
            ctx.error(r#"Missing final output value for "curve" expression."#);
            return None;
        }

        let descriptor = match &items[1] {
            Json::Array(descriptor) if !descriptor.is_empty() => descriptor,
            _ => {
                ctx.error_at(r#"Expected an interpolation type expression, e.g. ["linear"]."#, 1);
                return None;
            }
        };
        let interpolation = match descriptor[0].as_str() {
            Some("step") => Interpolation::Step,
            Some("linear") => Interpolation::LINEAR,
            Some("exponential") => match descriptor.get(1).and_then(Json::as_f64) {
                Some(base) if descriptor.len() == 2 => Interpolation::Exponential { base },
                _ => {
                    ctx.error_at("Exponential interpolation requires a numeric base", 1);
                    return None;
                }
            },
            other => {
                ctx.error_at(format!("Unknown interpolation type {}", other.unwrap_or("")), 1);
                return None;
            }
        };

        let input = self.parse_item(items, 2, Some(Type::Number), ctx, arena)?;

        let mut output_type = output_expectation(ctx);
        let mut stops: Vec<(f64, NodeId)> = Vec::with_capacity(len / 2);
        for i in (3..len).step_by(2) {
            let Some(label) = items[i].as_f64() else {
                ctx.error_at(
                    r#"Input/output pairs for "curve" expressions must be defined using literal numeric values (not computed expressions) for the input values."#,
                    i,
                );
                return None;
            };
            if stops.last().is_some_and(|(previous, _)| label <= *previous) {
                ctx.error_at(
                    r#"Input/output pairs for "curve" expressions must be arranged with input values in strictly ascending order."#,
                    i,
                );
                return None;
            }
            let output = self.parse_item(items, i + 1, output_type.clone(), ctx, arena)?;
            output_type.get_or_insert_with(|| arena[output].ty.clone());
            stops.push((label, output));
        }

        let ty = output_type.unwrap_or(Type::Value);
        if matches!(interpolation, Interpolation::Exponential { .. })
            && !ty.is_generic()
            && !is_interpolatable(&ty)
        {
            let key = stops
                .first()
                .map_or_else(|| ctx.key(), |(_, output)| arena[*output].key.clone());
            ctx.push(CompileError::new(not_interpolatable_message(&ty), key));
            return None;
        }
        Some(arena.push(ctx.key(), ty, NodeKind::Curve { interpolation, input, stops }))
    }

    // --- Array assertion ---

    fn parse_array_assertion(
        &self,
        items: &[Json],
        ctx: &ParsingContext,
        arena: &mut Arena,
    ) -> Option<NodeId> {
        let len = items.len();
        if !(2..=4).contains(&len) {
            ctx.error(format!("Expected 1, 2, or 3 arguments, but found {} instead.", len - 1));
            return None;
        }

        let item = if len > 2 {
            match items[1].as_str() {
                Some("string") => Type::String,
                Some("number") => Type::Number,
                Some("boolean") => Type::Boolean,
                _ => {
                    ctx.error_at(
                        r#"The item type argument of "array" must be one of string, number, boolean"#,
                        1,
                    );
                    return None;
                }
            }
        } else {
            Type::Value
        };

        let n = if len > 3 {
            match items[2].as_f64() {
                Some(n) if n >= 0.0 && n == n.ceil() => Some(n as usize),
                _ => {
                    ctx.error_at(
                        r#"The length argument to "array" must be a positive integer literal."#,
                        2,
                    );
                    return None;
                }
            }
        } else {
            None
        };

        let input = self.parse_item(items, len - 1, Some(Type::Value), ctx, arena)?;
        let ty = Type::Array(ArrayType { item: Box::new(item), n });
        Some(arena.push(ctx.key(), ty, NodeKind::Assertion { input }))
    }

    // --- Compound ---

    fn parse_compound(
        &self,
        definition: &Arc<Definition>,
        items: &[Json],
        ctx: &ParsingContext,
        arena: &mut Arena,
    ) -> Option<NodeId> {
        // Arguments are parsed without an expectation: it depends on the overload.
        let mut args = Vec::with_capacity(items.len() - 1);
        for (i, item) in items.iter().enumerate().skip(1) {
            args.push(self.parse_expression(item, &ctx.concat(i, None), arena)?);
        }
        let arg_types: Vec<Type> = args.iter().map(|arg| arena[*arg].ty.clone()).collect();

        let mut last_errors = Vec::new();
        for (index, signature) in definition.signatures.iter().enumerate() {
            match match_signature(signature, &arg_types, false) {
                Ok(matched) => {
                    return Some(build_compound(definition, index, matched, args, ctx, arena));
                }
                Err(errors) => last_errors = errors,
            }
        }

        // Retry allowing `Value` arguments behind runtime assertions.
        // Only an unambiguous match counts.
        let mut lenient: Vec<(usize, SignatureMatch)> = definition
            .signatures
            .iter()
            .enumerate()
            .filter_map(|(index, signature)| {
                match_signature(signature, &arg_types, true).ok().map(|matched| (index, matched))
            })
            .collect();
        if lenient.len() == 1 && !lenient[0].1.unresolved {
            if let Some((index, matched)) = lenient.pop() {
                return Some(build_compound(definition, index, matched, args, ctx, arena));
            }
        }

        if definition.signatures.len() == 1 {
            ctx.extend(last_errors.into_iter().map(|(arg, message)| {
                let key = arg.map_or_else(|| ctx.key(), |i| arena[args[i]].key.clone());
                CompileError::new(message, key)
            }));
        } else {
            let signatures: Vec<String> =
                definition.signatures.iter().map(Signature::to_string).collect();
            let actual: Vec<String> = arg_types.iter().map(Type::to_string).collect();
            ctx.error(format!(
                "Expected arguments of type {}, but found ({}) instead.",
                signatures.join(" | "),
                actual.join(", ")
            ));
        }
        None
    }
}

/// The type branch outputs must share. A `Value` expectation says nothing
/// about them, so the first output decides.
fn output_expectation(ctx: &ParsingContext) -> Option<Type> {
    ctx.expected.clone().filter(|ty| *ty != Type::Value)
}

fn parse_label(json: &Json, ctx: &ParsingContext, input_type: &mut Option<Type>) -> Option<Label> {
    let (label, ty) = match json {
        Json::Number(n) => {
            let n = n.as_f64().unwrap_or(f64::NAN);
            if n == n.ceil() && n.abs() > MAX_LABEL {
                ctx.error(format!("Branch labels must be integers no larger than {MAX_LABEL}."));
                return None;
            }
            let Some(label) = integer_label(n) else {
                ctx.error("Branch labels must be numbers or strings.");
                return None;
            };
            (Label::Number(label), Type::Number)
        }
        Json::String(s) => (Label::String(s.clone()), Type::String),
        _ => {
            ctx.error("Branch labels must be numbers or strings.");
            return None;
        }
    };
    match input_type {
        None => *input_type = Some(ty),
        Some(expected) => {
            if let Err(mismatch) = check_subtype(expected, &ty) {
                ctx.error(mismatch.message);
                return None;
            }
        }
    }
    Some(label)
}

/// Checks argument types against one signature, threading typename bindings
/// left to right. Errors carry the offending argument index, if any.
fn match_signature(
    signature: &Signature,
    arg_types: &[Type],
    lenient: bool,
) -> Result<SignatureMatch, Vec<(Option<usize>, String)>> {
    let params = signature.expand_params(arg_types.len());
    if params.len() != arg_types.len() {
        return Err(vec![(
            None,
            format!(
                "Expected {} arguments, but found {} instead.",
                params.len(),
                arg_types.len()
            ),
        )]);
    }

    let mut typenames = Typenames::new();
    let mut errors = Vec::new();
    let mut assertions = vec![None; arg_types.len()];
    let mut unresolved = false;
    for (i, (param, actual)) in params.iter().zip(arg_types).enumerate() {
        if widen_typename(param, actual, &mut typenames) {
            continue;
        }
        let expected = param.resolve(&typenames);
        match match_type(&expected, actual, &mut typenames, TypenameScope::Expected) {
            Ok(()) => {}
            Err(_) if lenient && *actual == Type::Value && is_assertable(&expected) => {
                if expected.is_generic() {
                    unresolved = true;
                } else {
                    assertions[i] = Some(expected);
                }
            }
            Err(mismatch) => errors.push((Some(i), mismatch.message)),
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }
    Ok(SignatureMatch { result: signature.result.resolve(&typenames), assertions, unresolved })
}

/// A `Value` argument in a bare typename position rebinds the typename to
/// `Value`, so `["==", 1, ["get", "a"]]` types like `["==", ["get", "a"], 1]`.
pub(crate) fn widen_typename(param: &Type, actual: &Type, typenames: &mut Typenames) -> bool {
    match (param, actual) {
        (Type::Typename(name), Type::Value) => {
            typenames.insert(name.clone(), Type::Value);
            true
        }
        _ => false,
    }
}

fn wrap_assertion(arena: &mut Arena, id: NodeId, ty: Type) -> NodeId {
    let key = arena[id].key.clone();
    arena.push(key, ty, NodeKind::Assertion { input: id })
}

fn build_compound(
    definition: &Arc<Definition>,
    signature: usize,
    matched: SignatureMatch,
    args: Vec<NodeId>,
    ctx: &ParsingContext,
    arena: &mut Arena,
) -> NodeId {
    log::trace!(
        "{} {} resolved to {}",
        ctx.key(),
        definition.name,
        definition.signatures[signature]
    );
    let args = args
        .into_iter()
        .zip(matched.assertions)
        .map(|(arg, assertion)| match assertion {
            Some(ty) => wrap_assertion(arena, arg, ty),
            None => arg,
        })
        .collect();
    let compound = Compound { definition: Arc::clone(definition), signature, args };
    arena.push(ctx.key(), matched.result, NodeKind::Compound(compound))
}
