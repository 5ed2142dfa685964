use anyhow::{bail, Result};
use indexmap::IndexMap;
use crate::tree::class::ClassName;
use crate::tree::field::{FieldDescriptor, FieldRef};
use crate::tree::method::{MethodDescriptor, MethodRef};

/// Represents the code of a method.
///
/// Labels are method-local: every [`Label`] stored in here must come from
/// [`Code::fresh_label`] of this very instance. [`Code::clone_range`] relies
/// on this to keep freshly allocated label ids collision-free.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Code {
	pub max_stack: Option<u16>,
	pub max_locals: Option<u16>,

	pub instructions: Vec<InstructionListEntry>,
	pub exception_table: Vec<Exception>,

	pub local_variables: Option<Vec<Lv>>,

	next_label: u16,
}

impl Code {
	pub fn new() -> Code {
		Code::default()
	}

	/// Allocates a label id unused by this method.
	pub fn fresh_label(&mut self) -> Label {
		let label = Label { id: self.next_label };
		self.next_label += 1;
		label
	}

	/// Deep-copies a fragment of instructions, giving every label defined inside
	/// the fragment a fresh identity in this method.
	///
	/// Branch targets inside the fragment are rewritten through the substitution
	/// map, so jumps within the copy stay within the copy. A branch to a label
	/// the fragment doesn't define is an error: such a fragment can't be
	/// relocated into a foreign method.
	pub fn clone_range(&mut self, fragment: &[InstructionListEntry]) -> Result<Vec<InstructionListEntry>> {
		let mut substitution: IndexMap<Label, Label> = IndexMap::new();

		for entry in fragment {
			if let Some(old) = entry.label {
				let fresh = self.fresh_label();
				if substitution.insert(old, fresh).is_some() {
					bail!("label {old:?} is defined twice in the fragment");
				}
			}
		}

		let mut copied = Vec::with_capacity(fragment.len());
		for entry in fragment {
			let mut instruction = entry.instruction.clone();
			for target in instruction.labels_mut() {
				match substitution.get(target) {
					Some(&fresh) => *target = fresh,
					None => bail!("branch target {target:?} lies outside the copied fragment"),
				}
			}
			copied.push(InstructionListEntry {
				label: entry.label.map(|old| substitution[&old]),
				instruction,
			});
		}

		Ok(copied)
	}

	/// Inserts entries before the instruction at `index`.
	pub fn insert(&mut self, index: usize, entries: Vec<InstructionListEntry>) {
		self.instructions.splice(index..index, entries);
	}

	/// Conservatively raises the operand stack size.
	pub fn raise_max_stack(&mut self, extra: u16) {
		self.max_stack = Some(self.max_stack.unwrap_or(0).saturating_add(extra));
	}

	pub fn ensure_max_locals(&mut self, at_least: u16) {
		self.max_locals = Some(self.max_locals.unwrap_or(0).max(at_least));
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstructionListEntry {
	pub label: Option<Label>,
	pub instruction: Instruction,
}

impl InstructionListEntry {
	pub fn new(instruction: Instruction) -> InstructionListEntry {
		InstructionListEntry { label: None, instruction }
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct Exception {
	pub start: Label,
	pub end: Label,
	pub handler: Label,
	pub catch: Option<ClassName>,
}

/// Represents a position in the instruction list using a method-local id.
///
/// The id stored in the `id` field does **not** correspond to a bytecode
/// offset in any direct way; it only identifies the position. Note that the
/// implementation of [`Eq`] compares identity, not structure.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Label {
	id: u16,
}

/// Represents an index of a local variable.
///
/// If the local variable is of type `double` or `long`, it also occupies
/// the [`LvIndex`] with `index = index + 1`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LvIndex {
	pub index: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lv {
	pub start: Label,
	pub end: Label,
	pub name: String,
	pub descriptor: FieldDescriptor,
	pub index: LvIndex,
}

/// Represents an instruction of the JVM.
///
/// Each instruction can either:
/// - hold no additional data, like [`Instruction::Nop`],
/// - hold some immediate value, like [`Instruction::BiPush`],
/// - hold a [local variable index][LvIndex], like [`Instruction::ILoad`] (note that this also represents the `iload_0` instruction for example),
/// - hold a [`Label`] for jumps, like [`Instruction::IfEq`],
/// - or hold other data the instruction needs.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
	Nop,
	AConstNull,
	IConstM1, IConst0, IConst1, IConst2, IConst3, IConst4, IConst5,
	LConst0, LConst1,
	FConst0, FConst1, FConst2,
	DConst0, DConst1,
	BiPush(i8),
	SiPush(i16),
	Ldc(Loadable),
	ILoad(LvIndex), LLoad(LvIndex), FLoad(LvIndex), DLoad(LvIndex), ALoad(LvIndex),
	IALoad, LALoad, FALoad, DALoad, AALoad, BALoad, CALoad, SALoad,
	IStore(LvIndex), LStore(LvIndex), FStore(LvIndex), DStore(LvIndex), AStore(LvIndex),
	IAStore, LAStore, FAStore, DAStore, AAStore, BAStore, CAStore, SAStore,
	Pop, Pop2,
	Dup, DupX1, DupX2,
	Dup2, Dup2X1, Dup2X2,
	Swap,
	IAdd, LAdd, FAdd, DAdd,
	ISub, LSub, FSub, DSub,
	IMul, LMul, FMul, DMul,
	IDiv, LDiv, FDiv, DDiv,
	IRem, LRem, FRem, DRem,
	INeg, LNeg, FNeg, DNeg,
	IShl, LShl,
	IShr, LShr,
	IUShr, LUShr,
	IAnd, LAnd,
	IOr, LOr,
	IXor, LXor,
	IInc(LvIndex, i16),
	I2L, I2F, I2D,
	L2I, L2F, L2D,
	F2I, F2L, F2D,
	D2I, D2L, D2F,
	I2B, I2C, I2S,
	LCmp,
	FCmpL, FCmpG,
	DCmpL, DCmpG,
	IfEq(Label), IfNe(Label), IfLt(Label), IfGe(Label), IfGt(Label), IfLe(Label),
	IfICmpEq(Label), IfICmpNe(Label), IfICmpLt(Label), IfICmpGe(Label), IfICmpGt(Label), IfICmpLe(Label),
	IfACmpEq(Label), IfACmpNe(Label),
	Goto(Label),
	TableSwitch {
		default: Label,
		low: i32,
		high: i32,
		table: Vec<Label>,
	},
	LookupSwitch {
		default: Label,
		/// Note that these must be ordered.
		pairs: Vec<(i32, Label)>,
	},
	IReturn, LReturn, FReturn, DReturn, AReturn,
	Return,
	GetStatic(FieldRef),
	PutStatic(FieldRef),
	GetField(FieldRef),
	PutField(FieldRef),
	InvokeVirtual(MethodRef),
	/// The bool is `true` iff it's on an interface, so if it referenced an `InterfaceMethodRef` constant pool entry.
	InvokeSpecial(MethodRef, bool),
	/// The bool is `true` iff it's on an interface, so if it referenced an `InterfaceMethodRef` constant pool entry.
	InvokeStatic(MethodRef, bool),
	InvokeInterface(MethodRef),
	New(ClassName),
	ANewArray(ClassName),
	ArrayLength,
	AThrow,
	CheckCast(ClassName),
	InstanceOf(ClassName),
	MonitorEnter, MonitorExit,
	IfNull(Label), IfNonNull(Label),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Loadable {
	Integer(i32),
	Float(f32),
	Long(i64),
	Double(f64),
	Class(ClassName),
	String(String),
	MethodType(MethodDescriptor),
}

impl Instruction {
	/// All labels this instruction jumps to.
	pub fn labels_mut(&mut self) -> Vec<&mut Label> {
		use Instruction::*;
		match self {
			IfEq(l) | IfNe(l) | IfLt(l) | IfGe(l) | IfGt(l) | IfLe(l) |
			IfICmpEq(l) | IfICmpNe(l) | IfICmpLt(l) | IfICmpGe(l) | IfICmpGt(l) | IfICmpLe(l) |
			IfACmpEq(l) | IfACmpNe(l) |
			Goto(l) |
			IfNull(l) | IfNonNull(l) => vec![l],
			TableSwitch { default, table, .. } => {
				let mut labels = vec![default];
				labels.extend(table.iter_mut());
				labels
			},
			LookupSwitch { default, pairs } => {
				let mut labels = vec![default];
				labels.extend(pairs.iter_mut().map(|(_, l)| l));
				labels
			},
			_ => Vec::new(),
		}
	}

	/// The local variable index this instruction reads or writes, if any.
	pub fn local_index_mut(&mut self) -> Option<&mut LvIndex> {
		use Instruction::*;
		match self {
			ILoad(i) | LLoad(i) | FLoad(i) | DLoad(i) | ALoad(i) |
			IStore(i) | LStore(i) | FStore(i) | DStore(i) | AStore(i) |
			IInc(i, _) => Some(i),
			_ => None,
		}
	}

	pub fn is_return(&self) -> bool {
		use Instruction::*;
		matches!(self, IReturn | LReturn | FReturn | DReturn | AReturn | Return)
	}

	/// The member reference this instruction names, for field accesses and invokes.
	///
	/// This is what instruction-level selectors match against.
	pub fn member_ref(&self) -> Option<(&ClassName, &str, &str)> {
		use Instruction::*;
		match self {
			GetStatic(f) | PutStatic(f) | GetField(f) | PutField(f) =>
				Some((&f.class, f.name.as_str(), f.desc.as_str())),
			InvokeVirtual(m) | InvokeSpecial(m, _) | InvokeStatic(m, _) | InvokeInterface(m) =>
				Some((&m.class, m.name.as_str(), m.desc.as_str())),
			_ => None,
		}
	}

	pub fn is_field_access(&self) -> bool {
		use Instruction::*;
		matches!(self, GetStatic(_) | PutStatic(_) | GetField(_) | PutField(_))
	}

	pub fn is_invoke(&self) -> bool {
		use Instruction::*;
		matches!(self, InvokeVirtual(_) | InvokeSpecial(..) | InvokeStatic(..) | InvokeInterface(_))
	}
}
