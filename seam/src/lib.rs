//! Crate for obfuscation-mapping tables: per-namespace member renaming data,
//! the lookup capability consumed by the `graft` engine, and a reader for the
//! serialized SRG line format (`CL:`/`FD:`/`MD:` lines).
//!
//! Tables are populated once during startup and treated as read-only
//! afterwards; within one namespace an entry is unique per source member.

pub mod tree;
pub mod lookup;
pub mod srg;
