//! The textual selector grammar.
//!
//! Three families, decided by the first characters of the (trimmed) input:
//! - `@id` or `@ns:id`, optionally with a parenthesized argument, is a
//!   dynamic selector, dispatched through the registry;
//! - a string ending in `/` is a regex selector, made of
//!   `owner=/.../`, `name=/.../` and `desc=/.../` groups (a group without a
//!   prefix is a `name=` group);
//! - everything else is a by-name selector: an optional `LOwner;` prefix,
//!   a name, and optionally a trailing `*` (match all) or `(args)ret`
//!   descriptor.
//!
//! This grammar is a stable external contract; see the integration tests for
//! the exact strings accepted.

use indexmap::IndexMap;
use regex::Regex;
use chisel::tree::class::ClassName;
use chisel::tree::descriptor::ParsedMethodDescriptor;
use chisel::tree::method::MethodDescriptor;
use crate::selector::dynamic::{DescDeclaration, DynamicSelectorRegistry};
use crate::selector::{InvalidSelector, MemberPattern, RegexPattern, Selector};

/// Everything the parser may ask about the declaration being parsed: the
/// dynamic-selector registry, the declaration site (for diagnostics), and the
/// widening coordinates toward the declaring class.
///
/// The registry is injected here instead of living in process-wide state, so
/// parsing stays re-entrant and testable.
pub struct ParseContext<'a> {
	registry: &'a DynamicSelectorRegistry,
	site: String,
	coordinates: Vec<String>,
	declarations: IndexMap<String, DescDeclaration>,
}

impl<'a> ParseContext<'a> {
	pub fn new(registry: &'a DynamicSelectorRegistry) -> ParseContext<'a> {
		ParseContext {
			registry,
			site: String::from("<unknown>"),
			coordinates: Vec::new(),
			declarations: IndexMap::new(),
		}
	}

	pub fn with_site(mut self, site: impl Into<String>) -> ParseContext<'a> {
		self.site = site.into();
		self
	}

	pub fn site(&self) -> &str {
		&self.site
	}

	pub fn registry(&self) -> &DynamicSelectorRegistry {
		self.registry
	}

	/// Adds a coordinate to try during implicit resolution. Coordinates are
	/// tried in insertion order, so push them innermost first, walking outward
	/// from the annotation site to the declaring class.
	pub fn push_coordinate(&mut self, coordinate: impl Into<String>) {
		self.coordinates.push(coordinate.into());
	}

	/// Registers a descriptor declaration reachable under the given coordinate.
	pub fn add_declaration(&mut self, coordinate: impl Into<String>, declaration: DescDeclaration) {
		self.declarations.insert(coordinate.into(), declaration);
	}

	pub fn declaration_for(&self, coordinate: &str) -> Option<&DescDeclaration> {
		self.declarations.get(coordinate)
	}

	/// Walks the coordinates outward and returns the first declaration found.
	pub fn find_declaration(&self) -> Option<&DescDeclaration> {
		self.coordinates.iter()
			.find_map(|coordinate| self.declarations.get(coordinate))
	}
}

pub(crate) fn invalid(input: &str, cause: impl Into<String>) -> Selector {
	Selector::Invalid(InvalidSelector {
		input: input.to_owned(),
		cause: cause.into(),
	})
}

/// Parses a textual selector. Never fails: malformed input becomes
/// [`Selector::Invalid`], surfaced later by [`Selector::validate`].
pub fn parse(input: &str, context: &ParseContext) -> Selector {
	let trimmed = input.trim();

	if trimmed.starts_with('@') {
		parse_dynamic(input, trimmed, context)
	} else if trimmed.len() >= 2 && trimmed.ends_with('/') {
		parse_regex(input, trimmed)
	} else {
		parse_by_name(input, trimmed)
	}
}

fn parse_dynamic(input: &str, trimmed: &str, context: &ParseContext) -> Selector {
	let rest = &trimmed[1..];

	let id_end = rest
		.find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == ':'))
		.unwrap_or(rest.len());
	let (id, after) = rest.split_at(id_end);

	if id.is_empty() || id.starts_with(':') || id.ends_with(':') {
		return invalid(input, "expected an identifier (optionally `ns:id`) after `@`");
	}

	let after = after.trim();
	let args = if after.is_empty() {
		None
	} else if let Some(inner) = after.strip_prefix('(').and_then(|a| a.strip_suffix(')')) {
		Some(inner)
	} else {
		return invalid(input, "trailing contents after the dynamic selector id must be a parenthesized argument");
	};

	match context.registry().get(id) {
		Some(parser) => parser.parse_dynamic(input, args, context),
		None => invalid(input, format!("no dynamic selector parser registered for id {id:?}")),
	}
}

fn parse_regex(input: &str, trimmed: &str) -> Selector {
	let mut pattern = RegexPattern { owner: None, name: None, desc: None };
	let mut any = false;

	let mut rest = trimmed;
	loop {
		rest = rest.trim_start();
		if rest.is_empty() {
			break;
		}

		let (component, after_prefix) = if let Some(after) = rest.strip_prefix("owner=") {
			("owner", after)
		} else if let Some(after) = rest.strip_prefix("name=") {
			("name", after)
		} else if let Some(after) = rest.strip_prefix("desc=") {
			("desc", after)
		} else {
			// no prefix defaults to matching the name
			("name", rest)
		};

		let Some(after_open) = after_prefix.strip_prefix('/') else {
			return invalid(input, format!("expected `/` to open the `{component}=` regex group"));
		};
		let Some(end) = after_open.find('/') else {
			return invalid(input, format!("the `{component}=` regex group misses its closing `/`"));
		};
		let (group, after_close) = after_open.split_at(end);
		rest = &after_close[1..];

		let compiled = match Regex::new(group) {
			Ok(compiled) => compiled,
			Err(e) => return invalid(input, format!("cannot compile pattern {group:?}: {e}")),
		};

		let slot = match component {
			"owner" => &mut pattern.owner,
			"desc" => &mut pattern.desc,
			_ => &mut pattern.name,
		};
		if slot.is_some() {
			return invalid(input, format!("duplicate `{component}=` regex group"));
		}
		*slot = Some(compiled);
		any = true;
	}

	if !any {
		return invalid(input, "regex selector declares no pattern");
	}
	Selector::Regex(pattern)
}

fn parse_by_name(input: &str, trimmed: &str) -> Selector {
	let mut rest = trimmed;

	// an owner prefix ends at a `;` that comes before any descriptor
	let owner = match rest.find(';') {
		Some(semi) if rest.find('(').map_or(true, |paren| semi < paren) => {
			let owner_part = &rest[..semi];
			let owner_part = owner_part.strip_prefix('L').unwrap_or(owner_part);
			rest = &rest[semi + 1..];

			if owner_part.is_empty() {
				return invalid(input, "empty owner before `;`");
			}
			let owner = ClassName::from(owner_part.to_owned());
			if !owner.is_valid() {
				return invalid(input, format!("invalid owner {owner_part:?}"));
			}
			Some(owner)
		},
		_ => None,
	};

	let (mut name_part, desc) = match rest.find('(') {
		Some(paren) => {
			let descriptor = MethodDescriptor::from(rest[paren..].to_owned());
			if let Err(e) = ParsedMethodDescriptor::parse(&descriptor) {
				return invalid(input, format!("{e:#}"));
			}
			(&rest[..paren], Some(rest[paren..].to_owned()))
		},
		None => (rest, None),
	};

	let match_all = if let Some(stripped) = name_part.strip_suffix('*') {
		name_part = stripped;
		true
	} else {
		false
	};
	if match_all && desc.is_some() {
		return invalid(input, "a match-all selector cannot carry a descriptor");
	}

	let name = if name_part.is_empty() {
		None
	} else if chisel::tree::names::is_valid_method_name(name_part) {
		Some(name_part.to_owned())
	} else {
		return invalid(input, format!("invalid member name {name_part:?}"));
	};

	Selector::ByName(MemberPattern {
		owner,
		name,
		desc,
		match_all,
		ordinal: None,
	})
}
