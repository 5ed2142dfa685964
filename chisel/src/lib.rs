//! Crate for the structural model of JVM classes, as consumed by the `graft` engine.
//!
//! The [`tree`] module holds the class/field/method/instruction tree, the
//! [`tree::descriptor`] module the descriptor grammar, and the [`provider`]
//! module the capability for resolving classes by name.

mod macros;

pub mod tree;
pub mod provider;
