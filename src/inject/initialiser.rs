//! Extracting field initialisers from merged-in constructors and replaying
//! them inside the target's constructors.
//!
//! A merged class's constructor usually only exists to initialise its added
//! fields. The bytecode between the superclass delegate call and the final
//! `return` is treated as the initialiser, validated to be free of anything
//! that can't survive relocation, and copied into every target constructor.

use anyhow::{bail, Result};
use indexmap::IndexSet;
use chisel::tree::class::ClassName;
use chisel::tree::code::{Code, Instruction, InstructionListEntry};
use chisel::tree::field::FieldName;

/// Where replayed initialisers land inside a target constructor.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum InitialiserMode {
	/// After the last existing store to any field the initialiser also
	/// stores, so the replayed values win. Falls back to [`InitialiserMode::Safe`]
	/// placement when the constructor stores none of them.
	#[default]
	Default,
	/// Directly after the superclass delegate call.
	Safe,
}

/// Finds the superclass delegate call, the `invokespecial <init>` on the
/// direct superclass.
///
/// Constructors delegating to a sibling constructor of the same class have no
/// such call; for those this returns `None`.
pub fn find_delegate_call(super_class: &ClassName, code: &Code) -> Option<usize> {
	code.instructions.iter()
		.position(|entry| match &entry.instruction {
			Instruction::InvokeSpecial(method, _) =>
				method.name == *"<init>" && &method.class == super_class,
			_ => false,
		})
}

/// Extracts the field-initialiser range of a constructor body: everything
/// after the superclass delegate call, up to (not including) the final
/// `return`.
///
/// The range must be relocatable into a foreign constructor, so anything
/// depending on the enclosing frame beyond `this` is rejected: loads of
/// non-reference locals, all stores to locals, array element accesses, and
/// early returns. The range must end with a `putfield`; a constructor doing
/// more than initialising fields can't be treated as an initialiser.
pub fn extract_initialiser<'a>(super_class: &ClassName, code: &'a Code) -> Result<&'a [InstructionListEntry]> {
	let Some(delegate) = find_delegate_call(super_class, code) else {
		bail!("constructor has no superclass delegate call");
	};

	let Some(last) = code.instructions.iter().rposition(|entry| entry.instruction.is_return()) else {
		bail!("constructor has no return");
	};
	if last < delegate {
		bail!("constructor returns before the superclass delegate call");
	}

	let range = &code.instructions[delegate + 1..last];

	for entry in range {
		use Instruction::*;
		match &entry.instruction {
			ILoad(_) | LLoad(_) | FLoad(_) | DLoad(_) =>
				bail!("initialiser loads a non-reference local, it can't be relocated"),
			IStore(_) | LStore(_) | FStore(_) | DStore(_) | AStore(_) =>
				bail!("initialiser stores into a local, it can't be relocated"),
			IALoad | LALoad | FALoad | DALoad | AALoad | BALoad | CALoad | SALoad |
			IAStore | LAStore | FAStore | DAStore | AAStore | BAStore | CAStore | SAStore =>
				bail!("initialiser accesses an array element, it can't be relocated"),
			i if i.is_return() =>
				bail!("initialiser returns early"),
			_ => {},
		}
	}

	match range.last() {
		Some(entry) if matches!(entry.instruction, Instruction::PutField(_)) => Ok(range),
		Some(_) => bail!("initialiser doesn't end with a field store"),
		None => Ok(range),
	}
}

/// The fields an initialiser range stores.
pub fn initialised_fields(range: &[InstructionListEntry]) -> IndexSet<FieldName> {
	range.iter()
		.filter_map(|entry| match &entry.instruction {
			Instruction::PutField(field) => Some(field.name.clone()),
			_ => None,
		})
		.collect()
}

/// Replays an extracted initialiser range inside one target constructor.
///
/// Constructors without a superclass delegate call (sibling-delegating ones)
/// are skipped: the constructor they delegate to runs the initialiser.
pub fn apply_initialiser(
	super_class: &ClassName,
	target: &mut Code,
	range: &[InstructionListEntry],
	mode: InitialiserMode,
) -> Result<bool> {
	let Some(delegate) = find_delegate_call(super_class, target) else {
		return Ok(false);
	};

	let at = match mode {
		InitialiserMode::Safe => delegate + 1,
		InitialiserMode::Default => {
			let fields = initialised_fields(range);
			let last_store = target.instructions.iter().enumerate()
				.skip(delegate + 1)
				.filter(|(_, entry)| match &entry.instruction {
					Instruction::PutField(field) => fields.contains(&field.name),
					_ => false,
				})
				.map(|(index, _)| index)
				.last();
			match last_store {
				Some(index) => index + 1,
				None => delegate + 1,
			}
		},
	};

	let copied = target.clone_range(range)?;
	target.insert(at, copied);
	Ok(true)
}

#[cfg(test)]
mod testing {
	use pretty_assertions::assert_eq;
	use chisel::tree::field::{FieldDescriptor, FieldRef};
	use chisel::tree::code::LvIndex;
	use chisel::tree::method::{MethodDescriptor, MethodName, MethodRef};
	use super::*;

	fn delegate_call(super_class: &str) -> InstructionListEntry {
		InstructionListEntry::new(Instruction::InvokeSpecial(MethodRef {
			class: ClassName::from(super_class.to_owned()),
			name: MethodName::from("<init>"),
			desc: MethodDescriptor::from("()V"),
		}, false))
	}

	fn put_field(name: &str) -> InstructionListEntry {
		InstructionListEntry::new(Instruction::PutField(FieldRef {
			class: ClassName::from("foo/Target"),
			name: FieldName::from(name.to_owned()),
			desc: FieldDescriptor::from("I"),
		}))
	}

	fn constructor(middle: Vec<InstructionListEntry>) -> Code {
		let mut code = Code::new();
		code.instructions = vec![
			InstructionListEntry::new(Instruction::ALoad(LvIndex { index: 0 })),
			delegate_call("java/lang/Object"),
		];
		code.instructions.extend(middle);
		code.instructions.push(InstructionListEntry::new(Instruction::Return));
		code
	}

	#[test]
	fn accepts_simple_field_store() -> Result<()> {
		let code = constructor(vec![
			InstructionListEntry::new(Instruction::ALoad(LvIndex { index: 0 })),
			InstructionListEntry::new(Instruction::IConst1),
			put_field("a"),
		]);

		let range = extract_initialiser(&ClassName::JAVA_LANG_OBJECT, &code)?;
		assert_eq!(range.len(), 3);
		assert_eq!(initialised_fields(range).len(), 1);
		Ok(())
	}

	#[test]
	fn rejects_non_reference_local_load() {
		let code = constructor(vec![
			InstructionListEntry::new(Instruction::ALoad(LvIndex { index: 0 })),
			InstructionListEntry::new(Instruction::ILoad(LvIndex { index: 1 })),
			put_field("a"),
		]);

		assert!(extract_initialiser(&ClassName::JAVA_LANG_OBJECT, &code).is_err());
	}

	#[test]
	fn rejects_tail_that_is_not_a_field_store() {
		let code = constructor(vec![
			InstructionListEntry::new(Instruction::ALoad(LvIndex { index: 0 })),
			InstructionListEntry::new(Instruction::IConst1),
			put_field("a"),
			InstructionListEntry::new(Instruction::Pop),
		]);

		assert!(extract_initialiser(&ClassName::JAVA_LANG_OBJECT, &code).is_err());
	}

	#[test]
	fn default_mode_lands_after_last_matching_store() -> Result<()> {
		let range = vec![
			InstructionListEntry::new(Instruction::ALoad(LvIndex { index: 0 })),
			InstructionListEntry::new(Instruction::IConst2),
			put_field("a"),
		];

		// the target constructor also stores `a`; the replay must come after it
		let mut target = constructor(vec![
			InstructionListEntry::new(Instruction::ALoad(LvIndex { index: 0 })),
			InstructionListEntry::new(Instruction::IConst1),
			put_field("a"),
		]);

		let applied = apply_initialiser(&ClassName::JAVA_LANG_OBJECT, &mut target, &range, InitialiserMode::Default)?;
		assert!(applied);

		// original store at 2..=4, replay at 5..=7
		assert_eq!(target.instructions[4].instruction, range[2].instruction.clone());
		assert_eq!(target.instructions[5].instruction, Instruction::ALoad(LvIndex { index: 0 }));
		assert_eq!(target.instructions[6].instruction, Instruction::IConst2);
		assert_eq!(target.instructions[7].instruction, range[2].instruction.clone());
		Ok(())
	}

	#[test]
	fn sibling_delegating_constructor_is_skipped() -> Result<()> {
		let mut code = Code::new();
		code.instructions = vec![
			InstructionListEntry::new(Instruction::ALoad(LvIndex { index: 0 })),
			delegate_call("foo/Target"),
			InstructionListEntry::new(Instruction::Return),
		];

		let applied = apply_initialiser(&ClassName::JAVA_LANG_OBJECT, &mut code, &[], InitialiserMode::Safe)?;
		assert!(!applied);
		Ok(())
	}
}
