//! Top-down type checking of a parsed tree.
//!
//! Parsing infers types bottom-up. This pass pushes the expected type back
//! down, binds the typenames left open by generic signatures, and may move a
//! compound to a later overload. Updates are collected and only written to the
//! arena once the whole tree checks, so a rejected overload leaves no trace.

use crate::ast::{Arena, Interpolation, NodeId, NodeKind};
use crate::curve::{is_interpolatable, not_interpolatable_message};
use crate::error::CompileError;
use crate::parser::widen_typename;
use mapstyle_types::{Type, TypenameScope, Typenames, match_type};

#[derive(Debug)]
struct Update {
    id: NodeId,
    ty: Type,
    signature: Option<usize>,
}

type Checked = Result<Vec<Update>, Vec<CompileError>>;

pub(crate) fn typecheck(
    expected: &Type,
    root: NodeId,
    arena: &mut Arena,
) -> Result<(), Vec<CompileError>> {
    let updates = check(expected, root, arena)?;
    log::trace!("Type check resolved {} node(s)", updates.len());
    for update in updates {
        let node = arena.get_mut(update.id);
        node.ty = update.ty;
        if let (Some(signature), NodeKind::Compound(compound)) =
            (update.signature, &mut node.kind)
        {
            compound.signature = signature;
        }
    }
    Ok(())
}

/// Accumulates the outcome of checking one child.
#[derive(Default)]
struct Collector {
    updates: Vec<Update>,
    errors: Vec<CompileError>,
}

impl Collector {
    fn add(&mut self, checked: Checked) {
        match checked {
            Ok(updates) => self.updates.extend(updates),
            Err(errors) => self.errors.extend(errors),
        }
    }

    fn finish(mut self, id: NodeId, ty: Type) -> Checked {
        if !self.errors.is_empty() {
            return Err(self.errors);
        }
        self.updates.push(Update { id, ty, signature: None });
        Ok(self.updates)
    }
}

fn check(expected: &Type, id: NodeId, arena: &Arena) -> Checked {
    let node = &arena[id];
    match &node.kind {
        NodeKind::Literal(_) => {
            match_type(expected, &node.ty, &mut Typenames::new(), TypenameScope::Expected)
                .map(|()| Vec::new())
                .map_err(|mismatch| vec![CompileError::new(mismatch.message, node.key.clone())])
        }
        NodeKind::Compound(_) => check_compound(expected, id, arena),
        NodeKind::Assertion { input } => {
            let ty = refine(expected, id, arena)?;
            let mut collector = Collector::default();
            collector.add(check(&Type::Value, *input, arena));
            collector.finish(id, ty)
        }
        NodeKind::Case { branches, otherwise } => {
            let ty = refine(expected, id, arena)?;
            let mut collector = Collector::default();
            for (condition, output) in branches {
                collector.add(check(&Type::Boolean, *condition, arena));
                collector.add(check(&ty, *output, arena));
            }
            collector.add(check(&ty, *otherwise, arena));
            collector.finish(id, ty)
        }
        NodeKind::Coalesce { args } => {
            let ty = refine(expected, id, arena)?;
            let mut collector = Collector::default();
            for arg in args {
                collector.add(check(&ty, *arg, arena));
            }
            collector.finish(id, ty)
        }
        NodeKind::Match { input, cases, outputs, otherwise } => {
            let ty = refine(expected, id, arena)?;
            let mut collector = Collector::default();
            collector.add(check(&cases.input_type(), *input, arena));
            for output in outputs {
                collector.add(check(&ty, *output, arena));
            }
            collector.add(check(&ty, *otherwise, arena));
            collector.finish(id, ty)
        }
        NodeKind::Curve { interpolation, input, stops } => {
            let ty = refine(expected, id, arena)?;
            let mut collector = Collector::default();
            if matches!(interpolation, Interpolation::Exponential { .. })
                && !ty.is_generic()
                && !is_interpolatable(&ty)
            {
                let key = stops
                    .first()
                    .map_or_else(|| node.key.clone(), |(_, output)| arena[*output].key.clone());
                collector.errors.push(CompileError::new(not_interpolatable_message(&ty), key));
            }
            collector.add(check(&Type::Number, *input, arena));
            for (_, output) in stops {
                collector.add(check(&ty, *output, arena));
            }
            collector.finish(id, ty)
        }
    }
}

/// Narrows a node's type with the typenames `expected` binds in it.
fn refine(expected: &Type, id: NodeId, arena: &Arena) -> Result<Type, Vec<CompileError>> {
    let node = &arena[id];
    let mut typenames = Typenames::new();
    match_type(expected, &node.ty, &mut typenames, TypenameScope::Actual)
        .map_err(|mismatch| vec![CompileError::new(mismatch.message, node.key.clone())])?;
    Ok(node.ty.resolve(&typenames))
}

fn check_compound(expected: &Type, id: NodeId, arena: &Arena) -> Checked {
    let node = &arena[id];
    let NodeKind::Compound(compound) = &node.kind else {
        return Ok(Vec::new());
    };

    let mut initial = Typenames::new();
    match_type(expected, &node.ty, &mut initial, TypenameScope::Actual)
        .map_err(|mismatch| vec![CompileError::new(mismatch.message, node.key.clone())])?;

    let args = &compound.args;
    let mut errors = Vec::new();
    for (index, signature) in compound.definition.signatures.iter().enumerate() {
        errors.clear();
        let mut typenames = initial.clone();

        let params = signature.expand_params(args.len());
        if params.len() != args.len() {
            errors.push(CompileError::new(
                format!("Expected {} arguments, but found {} instead.", params.len(), args.len()),
                node.key.clone(),
            ));
            continue;
        }

        for (param, arg) in params.iter().zip(args) {
            let arg = &arena[*arg];
            if widen_typename(param, &arg.ty, &mut typenames) {
                continue;
            }
            let param = param.resolve(&typenames);
            if let Err(mismatch) =
                match_type(&param, &arg.ty, &mut typenames, TypenameScope::Expected)
            {
                errors.push(CompileError::new(mismatch.message, arg.key.clone()));
            }
        }

        let result = signature.result.resolve(&typenames);
        if result.is_generic() {
            errors.push(CompileError::new(
                format!(
                    r#"Could not resolve {}.  This expression must be wrapped in a type conversion, e.g. ["string", ["{}", ...]]."#,
                    node.ty,
                    compound.name()
                ),
                node.key.clone(),
            ));
        }
        if !errors.is_empty() {
            continue;
        }

        let mut collector = Collector::default();
        for (param, arg) in params.iter().zip(args) {
            collector.add(check(&param.resolve(&typenames), *arg, arena));
        }
        if collector.errors.is_empty() {
            log::trace!("{} {} checked against {}", node.key, compound.name(), signature);
            let mut updates = collector.updates;
            updates.push(Update { id, ty: result, signature: Some(index) });
            return Ok(updates);
        }
        errors = collector.errors;
    }
    Err(errors)
}
