//! Target selectors: parsed, typed descriptions of "this member, this
//! instruction inside that method".
//!
//! A selector is parsed once per declaration (see [`parse`]) and is immutable
//! afterwards; narrowing an existing selector (for example constraining the
//! ordinal) produces a new value via the `with_*` methods.
//!
//! Malformed input never fails the parse. It yields [`Selector::Invalid`]
//! carrying a human-readable cause, which only surfaces once
//! [`Selector::validate`] runs. This keeps parsing lenient while letting
//! callers batch-report every broken declaration in one place.

pub mod parse;
pub mod dynamic;
pub mod matcher;
pub mod query;

use std::fmt::{Display, Formatter};
use anyhow::{bail, Result};
use regex::Regex;
use chisel::tree::class::ClassName;
use chisel::tree::method::MethodDescriptor;

pub use parse::{parse, ParseContext};

#[derive(Debug, Clone)]
pub enum Selector {
	ByName(MemberPattern),
	Regex(RegexPattern),
	Dynamic(DynamicSelector),
	Invalid(InvalidSelector),
}

/// A by-name selector, like `Lfoo/bar/Baz;func_1234_a(III)Z`.
///
/// Each of owner, name and descriptor is independently optional; an absent
/// component matches anything.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberPattern {
	pub owner: Option<ClassName>,
	pub name: Option<String>,
	pub desc: Option<String>,
	pub match_all: bool,
	pub ordinal: Option<usize>,
}

/// A regex selector, like `owner=/^foo/ /render.*/`.
///
/// Patterns are searched, not anchored, against the candidate's fields.
#[derive(Debug, Clone)]
pub struct RegexPattern {
	pub owner: Option<Regex>,
	pub name: Option<Regex>,
	pub desc: Option<Regex>,
}

/// A dynamic selector, like `@Desc(...)`, already resolved by its registered
/// parser into a concrete descriptor plus optional owner and name.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicSelector {
	pub id: String,
	pub owner: Option<ClassName>,
	pub name: Option<String>,
	pub desc: Option<MethodDescriptor>,
	pub min_matches: usize,
	pub max_matches: usize,
}

/// A selector that didn't parse. Carries the cause until [`Selector::validate`] asks.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidSelector {
	pub input: String,
	pub cause: String,
}

impl Selector {
	/// Surfaces a deferred parse failure.
	///
	/// Parsing is lenient; this is the strict half of the contract.
	pub fn validate(&self) -> Result<()> {
		match self {
			Selector::Invalid(invalid) => {
				bail!("invalid selector {:?}: {}", invalid.input, invalid.cause)
			},
			_ => Ok(()),
		}
	}

	/// Returns a copy constrained to the given zero-indexed ordinal.
	///
	/// Only by-name selectors carry ordinals; other variants are returned unchanged.
	pub fn with_ordinal(&self, ordinal: usize) -> Selector {
		match self {
			Selector::ByName(pattern) => {
				let mut pattern = pattern.clone();
				pattern.ordinal = Some(ordinal);
				Selector::ByName(pattern)
			},
			other => other.clone(),
		}
	}

	/// Returns a copy with narrowed match-count bounds.
	///
	/// Only dynamic selectors carry explicit bounds; other variants are returned unchanged.
	pub fn with_match_count(&self, min: usize, max: usize) -> Selector {
		match self {
			Selector::Dynamic(dynamic) => {
				let mut dynamic = dynamic.clone();
				dynamic.min_matches = min;
				dynamic.max_matches = max;
				Selector::Dynamic(dynamic)
			},
			other => other.clone(),
		}
	}

	/// The minimum number of matches required before callers should treat a
	/// query as failed. Advisory: the query engine reports counts, callers enforce.
	pub fn min_match_count(&self) -> usize {
		match self {
			Selector::ByName(_) => 0,
			Selector::Regex(_) => 0,
			Selector::Dynamic(dynamic) => dynamic.min_matches,
			Selector::Invalid(_) => 0,
		}
	}

	/// The maximum number of matches callers should accept. Advisory, like
	/// [`Selector::min_match_count`].
	pub fn max_match_count(&self) -> usize {
		match self {
			Selector::ByName(pattern) if pattern.match_all => usize::MAX,
			Selector::ByName(_) => 1,
			Selector::Regex(_) => usize::MAX,
			Selector::Dynamic(dynamic) => dynamic.max_matches,
			Selector::Invalid(_) => 0,
		}
	}
}

impl Display for Selector {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			Selector::ByName(pattern) => {
				if let Some(owner) = &pattern.owner {
					write!(f, "L{owner};")?;
				}
				if let Some(name) = &pattern.name {
					write!(f, "{name}")?;
				}
				if pattern.match_all {
					write!(f, "*")?;
				}
				if let Some(desc) = &pattern.desc {
					write!(f, "{desc}")?;
				}
				Ok(())
			},
			Selector::Regex(pattern) => {
				let mut first = true;
				let mut group = |f: &mut Formatter<'_>, prefix: &str, regex: &Option<Regex>| {
					if let Some(regex) = regex {
						if !first {
							write!(f, " ")?;
						}
						first = false;
						write!(f, "{prefix}/{}/", regex.as_str())?;
					}
					Ok(())
				};
				group(f, "owner=", &pattern.owner)?;
				group(f, "", &pattern.name)?;
				group(f, "desc=", &pattern.desc)
			},
			Selector::Dynamic(dynamic) => {
				write!(f, "@{}", dynamic.id)?;
				if let Some(owner) = &dynamic.owner {
					write!(f, " owner={owner}")?;
				}
				if let Some(name) = &dynamic.name {
					write!(f, " name={name}")?;
				}
				if let Some(desc) = &dynamic.desc {
					write!(f, " desc={desc}")?;
				}
				Ok(())
			},
			Selector::Invalid(invalid) => {
				write!(f, "{}", invalid.input)
			},
		}
	}
}
