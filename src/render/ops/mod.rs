//! Operators and access steps on values
//!
//! - [`binary`]: arithmetic, equality, and ordering on value pairs
//! - [`unary`]: negation
//! - [`access`]: attribute, item, and call chain steps

pub(crate) mod access;
pub(crate) mod binary;
pub(crate) mod unary;
