//! A class-merging engine: selectors describe members and instructions of
//! target classes, mixins contribute fields, methods and injected code, and
//! the engine splices everything together on the structural class trees of
//! the `chisel` crate.
//!
//! The usual flow:
//! 1. parse the selectors of every declaration ([`selector::parse`]),
//! 2. resolve them against the active mapping namespace ([`remap::Resolver`]),
//! 3. hand each target class and its mixins to [`context::GraftEngine::transform`].

pub mod selector;
pub mod remap;
pub mod inject;
pub mod context;
pub mod diag;
