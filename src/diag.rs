//! Diagnostics: categorized, severity-configurable reporting.
//!
//! Everything goes through the `log` facade; what changes per category is the
//! level, and whether the category is emitted at all. Fatal conditions are not
//! diagnostics, they are `Err` returns.

use indexmap::IndexMap;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DiagnosticCategory {
	/// A selector that didn't parse.
	Parse,
	/// An injection point that found no instruction.
	ResolutionMiss,
	/// A query with several candidates and no exact match.
	Ambiguity,
	/// A member with no mapping entry in the requested namespace.
	MappingMiss,
	/// A dynamic-selector parser registration replacing an earlier one.
	RegistryOverride,
}

impl DiagnosticCategory {
	fn default_level(self) -> log::Level {
		match self {
			DiagnosticCategory::Parse => log::Level::Error,
			DiagnosticCategory::ResolutionMiss => log::Level::Warn,
			DiagnosticCategory::Ambiguity => log::Level::Error,
			DiagnosticCategory::MappingMiss => log::Level::Warn,
			DiagnosticCategory::RegistryOverride => log::Level::Warn,
		}
	}

	fn name(self) -> &'static str {
		match self {
			DiagnosticCategory::Parse => "parse",
			DiagnosticCategory::ResolutionMiss => "resolution miss",
			DiagnosticCategory::Ambiguity => "ambiguity",
			DiagnosticCategory::MappingMiss => "mapping miss",
			DiagnosticCategory::RegistryOverride => "registry override",
		}
	}
}

/// Per-category severity configuration.
///
/// A category not present in the overrides reports at its default level; one
/// overridden with `None` is suppressed entirely.
#[derive(Debug, Default)]
pub struct Diagnostics {
	levels: IndexMap<DiagnosticCategory, Option<log::Level>>,
}

impl Diagnostics {
	pub fn new() -> Diagnostics {
		Diagnostics::default()
	}

	/// Overrides the level of one category; `None` suppresses it.
	pub fn set_level(&mut self, category: DiagnosticCategory, level: Option<log::Level>) {
		self.levels.insert(category, level);
	}

	pub fn level(&self, category: DiagnosticCategory) -> Option<log::Level> {
		match self.levels.get(&category) {
			Some(&level) => level,
			None => Some(category.default_level()),
		}
	}

	pub fn report(&self, category: DiagnosticCategory, site: &str, message: &str) {
		if let Some(level) = self.level(category) {
			log::log!(level, "{} [{site}] {message}", category.name());
		}
	}
}

#[cfg(test)]
mod testing {
	use super::*;

	#[test]
	fn levels() {
		let mut diag = Diagnostics::new();
		assert_eq!(diag.level(DiagnosticCategory::Parse), Some(log::Level::Error));
		assert_eq!(diag.level(DiagnosticCategory::MappingMiss), Some(log::Level::Warn));

		diag.set_level(DiagnosticCategory::MappingMiss, Some(log::Level::Debug));
		assert_eq!(diag.level(DiagnosticCategory::MappingMiss), Some(log::Level::Debug));

		diag.set_level(DiagnosticCategory::MappingMiss, None);
		assert_eq!(diag.level(DiagnosticCategory::MappingMiss), None);
	}
}
