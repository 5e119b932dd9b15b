//! Typed module - structural operations on values.
//!
//! A [`TypedValue`] pairs a value with the list-key metadata needed to
//! treat lists of objects as associative. It supports field-set
//! extraction, structural comparison, merging and pruning.

mod comparison;
mod typed_value;

pub use comparison::*;
pub use typed_value::*;
