//! Structural type compatibility with typename binding.

use crate::ty::{Type, Typenames};
use thiserror::Error;

/// Which side of a comparison may bind typenames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypenameScope {
    Expected,
    Actual,
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct TypeMismatch {
    pub message: String,
}

impl TypeMismatch {
    fn new(expected: &Type, actual: &Type) -> Self {
        Self { message: format!("Expected {expected} but found {actual} instead.") }
    }
}

/// Members of the top type, tried in order.
fn value_members() -> [Type; 7] {
    [
        Type::Null,
        Type::Boolean,
        Type::Number,
        Type::String,
        Type::Color,
        Type::Object,
        Type::array(Type::Value),
    ]
}

/// Checks that `actual` may be used where `expected` is required.
///
/// Typenames are bound into `typenames` from whichever side `scope` names,
/// but only when unbound and the other side is concrete and not `Null`.
pub fn match_type(
    expected: &Type,
    actual: &Type,
    typenames: &mut Typenames,
    scope: TypenameScope,
) -> Result<(), TypeMismatch> {
    if let Type::Typename(name) = expected {
        if scope == TypenameScope::Expected
            && !actual.is_generic()
            && *actual != Type::Null
            && !typenames.contains_key(name)
        {
            typenames.insert(name.clone(), actual.clone());
        }
        return Ok(());
    }

    if let Type::Typename(name) = actual {
        if scope == TypenameScope::Actual
            && !expected.is_generic()
            && *expected != Type::Null
            && !typenames.contains_key(name)
        {
            typenames.insert(name.clone(), expected.clone());
        }
        return Ok(());
    }

    if *actual == Type::Null {
        return Ok(());
    }

    match expected {
        Type::Array(expected_array) => {
            let Type::Array(actual_array) = actual else {
                return Err(TypeMismatch::new(expected, actual));
            };
            if let Err(inner) =
                match_type(&expected_array.item, &actual_array.item, typenames, scope)
            {
                return Err(TypeMismatch {
                    message: format!("{} ({})", TypeMismatch::new(expected, actual), inner),
                });
            }
            if expected_array.n.is_some() && expected_array.n != actual_array.n {
                return Err(TypeMismatch::new(expected, actual));
            }
            Ok(())
        }
        Type::Value => {
            if *actual == Type::Value {
                return Ok(());
            }
            for member in value_members() {
                let mut member_typenames = Typenames::new();
                if match_type(&member, actual, &mut member_typenames, scope).is_ok() {
                    for (name, ty) in member_typenames {
                        typenames.entry(name).or_insert(ty);
                    }
                    return Ok(());
                }
            }
            Err(TypeMismatch::new(expected, actual))
        }
        _ if expected == actual => Ok(()),
        _ => Err(TypeMismatch::new(expected, actual)),
    }
}

/// `match_type` with a throwaway binding table, binding from the expected side.
pub fn check_subtype(expected: &Type, actual: &Type) -> Result<(), TypeMismatch> {
    match_type(expected, actual, &mut Typenames::new(), TypenameScope::Expected)
}
