//! Injectors: fragments of code spliced into target method bodies at
//! selector-described instruction positions.

pub mod splice;
pub mod initialiser;

use anyhow::{bail, Context, Result};
use chisel::tree::class::ClassFile;
use chisel::tree::code::{Code, InstructionListEntry};
use crate::diag::{DiagnosticCategory, Diagnostics};
use crate::selector::query::{instructions_of, methods_of, MemberId, QueryResult};
use crate::selector::Selector;

/// A relocatable piece of code.
///
/// Locals with indices below `locals_base` refer to the target frame (the
/// receiver and arguments); locals at or above it are fragment scratch space
/// and get shifted onto freshly reserved slots when spliced.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
	pub instructions: Vec<InstructionListEntry>,
	/// How much operand stack the fragment needs on top of the target's.
	pub max_stack: u16,
	pub locals_base: u16,
	/// How many local slots past `locals_base` the fragment uses.
	pub locals_used: u16,
}

/// Where inside the selected method an injector's fragment lands.
#[derive(Debug, Clone)]
pub enum InjectionPoint {
	/// Before the first instruction.
	Head,
	/// Before the last return.
	Tail,
	/// Before every return.
	Return,
	/// Before every invoke instruction the selector matches.
	Invoke(Selector),
	/// Before every field access instruction the selector matches.
	FieldAccess(Selector),
}

impl InjectionPoint {
	/// All instruction indices this point names in the given body, ascending.
	pub fn find(&self, code: &Code) -> Vec<usize> {
		match self {
			InjectionPoint::Head => vec![0],
			InjectionPoint::Tail => {
				code.instructions.iter()
					.rposition(|entry| entry.instruction.is_return())
					.map(|index| vec![index])
					.unwrap_or_default()
			},
			InjectionPoint::Return => {
				code.instructions.iter().enumerate()
					.filter(|(_, entry)| entry.instruction.is_return())
					.map(|(index, _)| index)
					.collect()
			},
			InjectionPoint::Invoke(selector) => {
				Self::find_member_refs(selector, code, |index| code.instructions[index].instruction.is_invoke())
			},
			InjectionPoint::FieldAccess(selector) => {
				Self::find_member_refs(selector, code, |index| code.instructions[index].instruction.is_field_access())
			},
		}
	}

	fn find_member_refs(selector: &Selector, code: &Code, keep: impl Fn(usize) -> bool) -> Vec<usize> {
		let candidates: Vec<_> = instructions_of(code).into_iter()
			.filter(|candidate| match candidate.id {
				MemberId::Instruction(index) => keep(index),
				_ => false,
			})
			.collect();

		QueryResult::run(&[selector], &candidates).candidates().iter()
			.filter_map(|candidate| match candidate.id {
				MemberId::Instruction(index) => Some(index),
				_ => None,
			})
			.collect()
	}
}

/// One injection declaration: which method, where inside it, and what to splice.
#[derive(Debug, Clone)]
pub struct Injector {
	/// Where the declaration came from, for diagnostics.
	pub site: String,
	/// Lower priorities apply first.
	pub priority: i32,
	pub method: Selector,
	pub point: InjectionPoint,
	pub fragment: Fragment,
	/// The minimum number of splices this injector must achieve.
	pub require: usize,
}

/// Applies every injector to the class.
///
/// Injectors run ordered by priority (stable for equal priorities). An
/// injector whose method selector matches nothing is a resolution miss,
/// reported and skipped; an applied injector achieving fewer splices than
/// its `require` is an error.
pub fn apply_injectors(class: &mut ClassFile, injectors: &[Injector], diag: &Diagnostics) -> Result<()> {
	let mut ordered: Vec<&Injector> = injectors.iter().collect();
	ordered.sort_by_key(|injector| injector.priority);

	for injector in ordered {
		if let Err(e) = injector.method.validate() {
			diag.report(DiagnosticCategory::Parse, &injector.site, &format!("{e:#}"));
			return Err(e).with_context(|| format!("in injector at {}", injector.site));
		}

		let spliced = apply_one(class, injector, diag)?;
		if spliced < injector.require {
			bail!(
				"injector at {} spliced {spliced} times but requires at least {}",
				injector.site, injector.require,
			);
		}
	}

	Ok(())
}

fn apply_one(class: &mut ClassFile, injector: &Injector, diag: &Diagnostics) -> Result<usize> {
	let method_index = {
		let candidates = methods_of(class);
		let result = QueryResult::run(&[&injector.method], &candidates);

		if result.is_empty() {
			diag.report(
				DiagnosticCategory::ResolutionMiss,
				&injector.site,
				&format!("selector {} matches no method in {}", injector.method, class.name),
			);
			return Ok(0);
		}

		let single = match result.single_result(true) {
			Ok(single) => single,
			Err(e) => {
				// only ambiguity remains, the empty case returned above
				diag.report(
					DiagnosticCategory::Ambiguity,
					&injector.site,
					&format!("selector {} in {}: {e:#}", injector.method, class.name),
				);
				return Err(e).with_context(|| format!("in injector at {}", injector.site));
			},
		};
		match single.id {
			MemberId::Method(index) => index,
			_ => bail!("method selector at {} resolved to a non-method", injector.site),
		}
	};

	let method = &mut class.methods[method_index];
	let Some(code) = &mut method.code else {
		diag.report(
			DiagnosticCategory::ResolutionMiss,
			&injector.site,
			&format!("method {}{} has no body", method.name, method.descriptor),
		);
		return Ok(0);
	};

	let mut points = injector.point.find(code);
	if points.is_empty() {
		diag.report(
			DiagnosticCategory::ResolutionMiss,
			&injector.site,
			&format!("no injection point in {}{}", method.name, method.descriptor),
		);
		return Ok(0);
	}

	// splice back-to-front so earlier indices stay valid
	points.sort_unstable();
	for &at in points.iter().rev() {
		splice::splice(code, at, &injector.fragment)
			.with_context(|| format!("in injector at {}", injector.site))?;
	}

	Ok(points.len())
}

#[cfg(test)]
mod testing {
	use pretty_assertions::assert_eq;
	use chisel::tree::class::{ClassAccess, ClassName};
	use chisel::tree::code::{Instruction, InstructionListEntry, LvIndex};
	use chisel::tree::method::{Method, MethodAccess, MethodDescriptor, MethodName, MethodRef};
	use crate::selector::dynamic::DynamicSelectorRegistry;
	use crate::selector::{parse, ParseContext};
	use super::*;

	fn marker(value: Instruction) -> Fragment {
		Fragment {
			instructions: vec![InstructionListEntry::new(value)],
			max_stack: 1,
			locals_base: 0,
			locals_used: 0,
		}
	}

	fn target_class() -> ClassFile {
		let mut code = Code::new();
		code.instructions = vec![
			InstructionListEntry::new(Instruction::ILoad(LvIndex { index: 1 })),
			InstructionListEntry::new(Instruction::InvokeVirtual(MethodRef {
				class: ClassName::from("foo/Helper"),
				name: MethodName::from("help"),
				desc: MethodDescriptor::from("(I)V"),
			})),
			InstructionListEntry::new(Instruction::Return),
		];
		code.max_stack = Some(2);
		code.max_locals = Some(2);

		let mut method = Method::new(
			MethodAccess::default(),
			MethodName::from("run"),
			MethodDescriptor::from("(I)V"),
		);
		method.code = Some(code);

		let mut class = ClassFile::new(
			ClassAccess::default(),
			ClassName::from("foo/Target"),
			Some(ClassName::JAVA_LANG_OBJECT),
			Vec::new(),
		);
		class.methods.push(method);
		class
	}

	fn injector(site: &str, priority: i32, point: InjectionPoint, value: Instruction) -> Injector {
		let registry = DynamicSelectorRegistry::with_builtins();
		let context = ParseContext::new(&registry);
		Injector {
			site: site.to_owned(),
			priority,
			method: parse("run(I)V", &context),
			point,
			fragment: marker(value),
			require: 1,
		}
	}

	#[test]
	fn head_and_priority_order() -> Result<()> {
		let mut class = target_class();
		let diag = Diagnostics::new();

		// the lower priority applies first, so the higher one's head splice
		// ends up in front of it
		let injectors = vec![
			injector("b", 1000, InjectionPoint::Head, Instruction::IConst1),
			injector("a", 0, InjectionPoint::Head, Instruction::IConst0),
		];
		apply_injectors(&mut class, &injectors, &diag)?;

		let code = class.methods[0].code.as_ref().unwrap();
		assert_eq!(code.instructions[0].instruction, Instruction::IConst1);
		assert_eq!(code.instructions[1].instruction, Instruction::IConst0);
		Ok(())
	}

	#[test]
	fn invoke_point() -> Result<()> {
		let mut class = target_class();
		let diag = Diagnostics::new();

		let registry = DynamicSelectorRegistry::with_builtins();
		let context = ParseContext::new(&registry);
		let injectors = vec![Injector {
			site: "test".to_owned(),
			priority: 0,
			method: parse("run(I)V", &context),
			point: InjectionPoint::Invoke(parse("Lfoo/Helper;help(I)V", &context)),
			fragment: marker(Instruction::Nop),
			require: 1,
		}];
		apply_injectors(&mut class, &injectors, &diag)?;

		let code = class.methods[0].code.as_ref().unwrap();
		assert_eq!(code.instructions[1].instruction, Instruction::Nop);
		Ok(())
	}

	#[test]
	fn invalid_selector_is_an_error() {
		let mut class = target_class();
		let diag = Diagnostics::new();

		let registry = DynamicSelectorRegistry::with_builtins();
		let context = ParseContext::new(&registry);
		let injectors = vec![Injector {
			site: "test".to_owned(),
			priority: 0,
			method: parse("run(", &context),
			point: InjectionPoint::Head,
			fragment: marker(Instruction::Nop),
			require: 0,
		}];

		assert!(apply_injectors(&mut class, &injectors, &diag).is_err());
	}

	#[test]
	fn ambiguous_selector_is_an_error() {
		let mut class = target_class();
		// a second case-tier collision, so neither candidate is exact
		let mut other = Method::new(
			MethodAccess::default(),
			MethodName::from("RUN"),
			MethodDescriptor::from("(I)V"),
		);
		other.code = Some(Code::new());
		class.methods.push(other);
		class.methods[0].name = MethodName::from("Run");

		let diag = Diagnostics::new();
		let registry = DynamicSelectorRegistry::with_builtins();
		let context = ParseContext::new(&registry);
		let injectors = vec![Injector {
			site: "test".to_owned(),
			priority: 0,
			method: parse("run(I)V", &context),
			point: InjectionPoint::Head,
			fragment: marker(Instruction::Nop),
			require: 1,
		}];

		assert!(apply_injectors(&mut class, &injectors, &diag).is_err());
	}

	#[test]
	fn unmet_require_is_an_error() {
		let mut class = target_class();
		let diag = Diagnostics::new();

		let registry = DynamicSelectorRegistry::with_builtins();
		let context = ParseContext::new(&registry);
		let injectors = vec![Injector {
			site: "test".to_owned(),
			priority: 0,
			method: parse("missing()V", &context),
			point: InjectionPoint::Head,
			fragment: marker(Instruction::Nop),
			require: 1,
		}];

		assert!(apply_injectors(&mut class, &injectors, &diag).is_err());
	}
}
