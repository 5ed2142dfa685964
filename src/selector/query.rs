//! The query engine: running a batch of selectors over a candidate set.
//!
//! Candidates are enumerated in declaration order (methods and fields as they
//! appear in the class, instructions as they appear in the code). The result
//! preserves that order, deduplicates across selectors, and remembers the
//! first exact match so strict callers can break ties deterministically.

use anyhow::{bail, Result};
use indexmap::{IndexMap, IndexSet};
use chisel::tree::class::{ClassFile, ClassName};
use chisel::tree::code::Code;
use crate::selector::matcher::{base_match, match_candidate, MatchResult};
use crate::selector::Selector;

/// Identifies one candidate inside its enumeration source.
///
/// Indices are positions in the source (`ClassFile::methods`,
/// `ClassFile::fields`, `Code::instructions`) at enumeration time.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MemberId {
	Method(usize),
	Field(usize),
	Instruction(usize),
}

/// One member or instruction a selector may match, flattened into the three
/// fields selectors know how to talk about.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate<'a> {
	pub id: MemberId,
	pub owner: &'a ClassName,
	pub name: &'a str,
	pub desc: &'a str,
}

/// Enumerates the methods of a class, in declaration order.
pub fn methods_of(class: &ClassFile) -> Vec<Candidate<'_>> {
	class.methods.iter().enumerate()
		.map(|(index, method)| Candidate {
			id: MemberId::Method(index),
			owner: &class.name,
			name: method.name.as_str(),
			desc: method.descriptor.as_str(),
		})
		.collect()
}

/// Enumerates the fields of a class, in declaration order.
pub fn fields_of(class: &ClassFile) -> Vec<Candidate<'_>> {
	class.fields.iter().enumerate()
		.map(|(index, field)| Candidate {
			id: MemberId::Field(index),
			owner: &class.name,
			name: field.name.as_str(),
			desc: field.descriptor.as_str(),
		})
		.collect()
}

/// Enumerates the member-referencing instructions of a method body, in code
/// order. The candidate's owner/name/desc are those of the referenced member,
/// not of the enclosing method.
pub fn instructions_of(code: &Code) -> Vec<Candidate<'_>> {
	code.instructions.iter().enumerate()
		.filter_map(|(index, entry)| {
			let (owner, name, desc) = entry.instruction.member_ref()?;
			Some(Candidate {
				id: MemberId::Instruction(index),
				owner,
				name,
				desc,
			})
		})
		.collect()
}

/// The outcome of running selectors over a candidate set.
#[derive(Debug)]
pub struct QueryResult<'a> {
	candidates: Vec<Candidate<'a>>,
	/// Index into `candidates` of the first exact match, across all selectors
	/// in the order they were given.
	exact: Option<usize>,
}

impl<'a> QueryResult<'a> {
	/// Runs every selector over every candidate.
	///
	/// Each selector contributes its matches in candidate order; a candidate
	/// matched by several selectors appears once, at its earliest position.
	/// Ordinals are zero-indexed positions among a selector's same-owner
	/// matches, counted ignoring the ordinal itself.
	pub fn run(selectors: &[&Selector], candidates: &[Candidate<'a>]) -> QueryResult<'a> {
		let mut selected: IndexSet<MemberId> = IndexSet::new();
		let mut exact: Option<MemberId> = None;

		for selector in selectors {
			// position of each candidate among this selector's matches,
			// counted per owner in candidate order
			let mut seen_per_owner: IndexMap<&ClassName, usize> = IndexMap::new();

			for candidate in candidates {
				let position = if base_match(selector, candidate).matches() {
					let counter = seen_per_owner.entry(candidate.owner).or_insert(0);
					let position = *counter;
					*counter += 1;
					Some(position)
				} else {
					None
				};

				let result = match_candidate(selector, candidate, position);
				if result.matches() {
					selected.insert(candidate.id);
					if result == MatchResult::ExactMatch && exact.is_none() {
						exact = Some(candidate.id);
					}
				}
			}
		}

		let candidates: Vec<Candidate<'a>> = candidates.iter()
			.filter(|candidate| selected.contains(&candidate.id))
			.cloned()
			.collect();
		let exact = exact.and_then(|id| candidates.iter().position(|c| c.id == id));

		QueryResult { candidates, exact }
	}

	pub fn candidates(&self) -> &[Candidate<'a>] {
		&self.candidates
	}

	pub fn is_empty(&self) -> bool {
		self.candidates.is_empty()
	}

	pub fn len(&self) -> usize {
		self.candidates.len()
	}

	/// Narrows the result down to one candidate.
	///
	/// An exact match always wins. Otherwise a single candidate is returned
	/// as-is; several candidates are an error in strict mode and resolve to
	/// the first one in lenient mode. No candidate is always an error.
	pub fn single_result(&self, strict: bool) -> Result<&Candidate<'a>> {
		if let Some(exact) = self.exact {
			return Ok(&self.candidates[exact]);
		}

		match self.candidates.as_slice() {
			[] => bail!("no candidate matched"),
			[single] => Ok(single),
			[first, ..] => {
				if strict {
					bail!("ambiguous match, {} candidates and none exact", self.candidates.len());
				}
				Ok(first)
			},
		}
	}
}
