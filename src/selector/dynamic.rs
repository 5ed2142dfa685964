//! Dynamic selectors and their registry.
//!
//! A dynamic selector is written `@id(...)` or `@ns:id(...)` and hands the
//! argument to whatever parser is registered under the id. The registry is an
//! explicit object injected into [`ParseContext`], never process-global.

use indexmap::IndexMap;
use chisel::tree::class::ClassName;
use chisel::tree::descriptor::{ParsedMethodDescriptor, Type};
use crate::diag::{DiagnosticCategory, Diagnostics};
use crate::selector::parse::{invalid, ParseContext};
use crate::selector::{DynamicSelector, Selector};

pub trait DynamicSelectorParser {
	/// Turns the argument of a `@id(args)` selector into a concrete selector.
	///
	/// `args` is the contents of the parentheses, or `None` if the selector
	/// was written without an argument. Must not fail: unresolvable input
	/// becomes [`Selector::Invalid`], like everywhere else in the grammar.
	fn parse_dynamic(&self, input: &str, args: Option<&str>, context: &ParseContext) -> Selector;
}

/// Registered dynamic-selector parsers, keyed by (case-insensitive) id.
///
/// A bare id is also found under any namespace, so `desc` resolves a parser
/// registered as `graft:desc`. The last registration for an id wins.
pub struct DynamicSelectorRegistry {
	parsers: IndexMap<String, Box<dyn DynamicSelectorParser>>,
}

impl DynamicSelectorRegistry {
	pub fn new() -> DynamicSelectorRegistry {
		DynamicSelectorRegistry { parsers: IndexMap::new() }
	}

	/// A registry with the built-in parsers: currently only `graft:desc`.
	pub fn with_builtins() -> DynamicSelectorRegistry {
		let mut registry = DynamicSelectorRegistry::new();
		registry.parsers.insert(String::from("graft:desc"), Box::new(DescParser));
		registry
	}

	/// Registers a parser under the (case-insensitive) id. The last
	/// registration for an id wins; replacing an earlier one is reported as a
	/// [`DiagnosticCategory::RegistryOverride`].
	pub fn register(&mut self, id: &str, parser: Box<dyn DynamicSelectorParser>, diag: &Diagnostics) {
		let key = id.to_ascii_lowercase();
		if self.parsers.insert(key.clone(), parser).is_some() {
			diag.report(
				DiagnosticCategory::RegistryOverride,
				&key,
				"dynamic selector parser replaced, last registration wins",
			);
		}
	}

	pub fn get(&self, id: &str) -> Option<&dyn DynamicSelectorParser> {
		let key = id.to_ascii_lowercase();
		if let Some(parser) = self.parsers.get(&key) {
			return Some(parser.as_ref());
		}
		if !key.contains(':') {
			// a bare id resolves into any namespace
			let suffix = format!(":{key}");
			return self.parsers.iter()
				.find(|(registered, _)| registered.ends_with(&suffix))
				.map(|(_, parser)| parser.as_ref());
		}
		None
	}
}

impl Default for DynamicSelectorRegistry {
	fn default() -> Self {
		DynamicSelectorRegistry::with_builtins()
	}
}

/// A descriptor declaration a `@desc` selector resolves against: the member's
/// shape given as types rather than as a descriptor string.
#[derive(Debug, Clone, PartialEq)]
pub struct DescDeclaration {
	pub owner: Option<ClassName>,
	pub name: Option<String>,
	pub args: Vec<Type>,
	/// `None` is `void`.
	pub ret: Option<Type>,
}

impl DescDeclaration {
	fn to_selector(&self) -> Selector {
		let desc = ParsedMethodDescriptor {
			parameters: self.args.clone(),
			return_type: self.ret.clone(),
		}.write();

		Selector::Dynamic(DynamicSelector {
			id: String::from("desc"),
			owner: self.owner.clone(),
			name: self.name.clone(),
			desc: Some(desc),
			min_matches: 1,
			max_matches: 1,
		})
	}
}

/// The built-in `@desc` parser.
///
/// With an argument, the argument is the coordinate of a declaration. Without
/// one, the declaration is found implicitly: the context supplies dotted
/// coordinates walking outward from the annotation site to the declaring
/// class, and the first coordinate with a declaration wins.
pub struct DescParser;

impl DynamicSelectorParser for DescParser {
	fn parse_dynamic(&self, input: &str, args: Option<&str>, context: &ParseContext) -> Selector {
		match args.map(str::trim).filter(|args| !args.is_empty()) {
			Some(coordinate) => match context.declaration_for(coordinate) {
				Some(declaration) => declaration.to_selector(),
				None => invalid(input, format!("no descriptor declaration at coordinate {coordinate:?}")),
			},
			None => match context.find_declaration() {
				Some(declaration) => declaration.to_selector(),
				None => invalid(input, format!(
					"no descriptor declaration found walking outward from {}", context.site(),
				)),
			},
		}
	}
}
