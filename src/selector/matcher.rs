//! Matching one selector against one candidate member.
//!
//! Matching is a pure function of the selector, the candidate, and (for
//! ordinal-constrained selectors) the candidate's position among its
//! same-owner matches, which the query engine supplies.

use crate::selector::query::Candidate;
use crate::selector::Selector;

/// The quality of one match, ordered: the first [`MatchResult::ExactMatch`]
/// wins every tie-break across ambiguous candidate sets.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchResult {
	None,
	Weak,
	Match,
	ExactMatch,
}

impl MatchResult {
	pub fn matches(self) -> bool {
		self >= MatchResult::Match
	}
}

/// Matches ignoring any ordinal constraint.
///
/// The query engine uses this to count same-owner matches in declaration
/// order; those counts feed the `position` of [`match_candidate`].
pub fn base_match(selector: &Selector, candidate: &Candidate) -> MatchResult {
	match selector {
		Selector::ByName(pattern) => {
			// absent components don't veto
			if pattern.owner.as_ref().is_some_and(|owner| owner != candidate.owner) {
				return MatchResult::None;
			}
			if pattern.desc.as_deref().is_some_and(|desc| desc != candidate.desc) {
				return MatchResult::None;
			}

			match &pattern.name {
				// a selector without a name accepts every owner/desc match exactly
				None => MatchResult::ExactMatch,
				Some(name) if name == candidate.name => MatchResult::ExactMatch,
				// the case-insensitive tier never reaches exact
				Some(name) if eq_ignore_case(name, candidate.name) => MatchResult::Match,
				Some(_) => MatchResult::None,
			}
		},
		Selector::Regex(pattern) => {
			// patterns are searched, not anchored; any declared-but-failing
			// pattern vetoes, any success is exact
			let components = [
				(&pattern.owner, candidate.owner.as_str()),
				(&pattern.name, candidate.name),
				(&pattern.desc, candidate.desc),
			];
			for (regex, field) in components {
				if regex.as_ref().is_some_and(|regex| !regex.is_match(field)) {
					return MatchResult::None;
				}
			}
			MatchResult::ExactMatch
		},
		Selector::Dynamic(dynamic) => {
			// descriptors are resolved by construction, so there's no partial tier
			if dynamic.owner.as_ref().is_some_and(|owner| owner != candidate.owner) {
				return MatchResult::None;
			}
			if dynamic.name.as_deref().is_some_and(|name| name != candidate.name) {
				return MatchResult::None;
			}
			if dynamic.desc.as_ref().is_some_and(|desc| desc.as_str() != candidate.desc) {
				return MatchResult::None;
			}
			MatchResult::ExactMatch
		},
		Selector::Invalid(_) => MatchResult::None,
	}
}

/// Case-insensitive comparison via Unicode lowercasing, since class files
/// allow (and obfuscators produce) non-ASCII member names.
fn eq_ignore_case(a: &str, b: &str) -> bool {
	a.chars().flat_map(char::to_lowercase).eq(b.chars().flat_map(char::to_lowercase))
}

/// Matches including the ordinal constraint.
///
/// `position` is the candidate's zero-indexed position among the selector's
/// same-owner matches, counted in declaration order; `None` if the candidate
/// isn't a match at all.
pub fn match_candidate(selector: &Selector, candidate: &Candidate, position: Option<usize>) -> MatchResult {
	let result = base_match(selector, candidate);
	if !result.matches() {
		return MatchResult::None;
	}

	if let Selector::ByName(pattern) = selector {
		if let Some(ordinal) = pattern.ordinal {
			if position != Some(ordinal) {
				return MatchResult::None;
			}
		}
	}

	result
}
