//! Core value and type model for map style expressions.
//!
//! - [`Value`]: dynamically typed runtime value
//! - [`Type`]: static type, including generic typenames
//! - [`match_type`]: the single compatibility check used by parsing and type checking
//! - [`Color`]: normalised RGBA color with CSS parsing

pub mod color;
pub mod matching;
pub mod ty;
pub mod value;

// --- Public API ---
pub use color::{Color, ColorParseError};
pub use matching::{TypeMismatch, TypenameScope, check_subtype, match_type};
pub use ty::{ArrayType, Type, TypeParseError, Typenames};
pub use value::{Object, Value, stringify, type_of};
