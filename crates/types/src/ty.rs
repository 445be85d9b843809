//! The static type algebra of the expression language.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{char, multispace0, u64 as nom_u64},
    combinator::{all_consuming, map, opt},
    sequence::{delimited, pair, preceded},
};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Bindings from typename to the concrete type it was resolved to.
pub type Typenames = HashMap<String, Type>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Null,
    Number,
    Boolean,
    String,
    Color,
    Object,
    /// The top type; every value conforms to it.
    Value,
    /// A type variable, resolved during type checking.
    Typename(String),
    Array(ArrayType),
}

/// `Array<item>` with an optional fixed length.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArrayType {
    pub item: Box<Type>,
    pub n: Option<usize>,
}

impl Type {
    pub fn array(item: Type) -> Type {
        Type::Array(ArrayType { item: Box::new(item), n: None })
    }

    pub fn array_n(item: Type, n: usize) -> Type {
        Type::Array(ArrayType { item: Box::new(item), n: Some(n) })
    }

    pub fn typename(name: impl Into<String>) -> Type {
        Type::Typename(name.into())
    }

    /// True for typenames and arrays whose item type is generic.
    pub fn is_generic(&self) -> bool {
        match self {
            Type::Typename(_) => true,
            Type::Array(array) => array.item.is_generic(),
            _ => false,
        }
    }

    /// Substitutes bound typenames; unbound ones are left in place.
    pub fn resolve(&self, typenames: &Typenames) -> Type {
        match self {
            Type::Typename(name) => typenames.get(name).cloned().unwrap_or_else(|| self.clone()),
            Type::Array(array) if array.item.is_generic() => Type::Array(ArrayType {
                item: Box::new(array.item.resolve(typenames)),
                n: array.n,
            }),
            _ => self.clone(),
        }
    }

    /// Replaces every remaining typename with `Value`.
    pub fn erase_typenames(&self) -> Type {
        match self {
            Type::Typename(_) => Type::Value,
            Type::Array(array) => Type::Array(ArrayType {
                item: Box::new(array.item.erase_typenames()),
                n: array.n,
            }),
            _ => self.clone(),
        }
    }

    pub fn as_array(&self) -> Option<&ArrayType> {
        match self {
            Type::Array(array) => Some(array),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Null => f.write_str("Null"),
            Type::Number => f.write_str("Number"),
            Type::Boolean => f.write_str("Boolean"),
            Type::String => f.write_str("String"),
            Type::Color => f.write_str("Color"),
            Type::Object => f.write_str("Object"),
            Type::Value => f.write_str("Value"),
            Type::Typename(name) => f.write_str(name),
            Type::Array(array) => match (array.item.as_ref(), array.n) {
                (Type::Value, None) => f.write_str("Array"),
                (item, None) => write!(f, "Array<{item}>"),
                (item, Some(n)) => write!(f, "Array<{item}, {n}>"),
            },
        }
    }
}

// --- Type name parsing ---

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Invalid type name '{0}'")]
pub struct TypeParseError(pub String);

impl FromStr for Type {
    type Err = TypeParseError;

    /// Parses the names produced by `Display`, e.g. `Array<Number, 2>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        all_consuming(delimited(multispace0, type_name, multispace0))
            .parse(s)
            .map(|(_, ty)| ty)
            .map_err(|_| TypeParseError(s.to_string()))
    }
}

fn identifier(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_').parse(input)
}

fn array_type(input: &str) -> IResult<&str, Type> {
    let (input, _) = tag("Array").parse(input)?;
    let (input, params) = opt(delimited(
        pair(char('<'), multispace0),
        pair(
            type_name,
            opt(preceded(delimited(multispace0, char(','), multispace0), nom_u64)),
        ),
        pair(multispace0, char('>')),
    ))
    .parse(input)?;
    let ty = match params {
        None => Type::array(Type::Value),
        Some((item, None)) => Type::array(item),
        Some((item, Some(n))) => Type::array_n(item, n as usize),
    };
    Ok((input, ty))
}

fn type_name(input: &str) -> IResult<&str, Type> {
    alt((
        array_type,
        map(identifier, |name| match name {
            "Null" | "null" => Type::Null,
            "Number" | "number" => Type::Number,
            "Boolean" | "boolean" => Type::Boolean,
            "String" | "string" => Type::String,
            "Color" | "color" => Type::Color,
            "Object" | "object" => Type::Object,
            "Value" | "value" => Type::Value,
            other => Type::Typename(other.to_string()),
        }),
    ))
    .parse(input)
}
