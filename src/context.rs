//! The per-target merge context and the engine driving it.
//!
//! One [`TargetClassContext`] exists per class being transformed. It owns the
//! class tree for the duration of the merge, applies every registered mixin
//! exactly once, and hands the tree back via [`TargetClassContext::into_class`].

use std::cell::RefCell;
use anyhow::{bail, Context, Result};
use indexmap::IndexSet;
use chisel::tree::class::{ClassFile, ClassName};
use chisel::tree::method::MethodName;
use crate::diag::Diagnostics;
use crate::inject::initialiser::{apply_initialiser, extract_initialiser, InitialiserMode};
use crate::inject::{apply_injectors, Injector};

/// One mixin class and its injection declarations, ready to merge.
#[derive(Debug, Clone)]
pub struct MixinInfo {
	pub name: ClassName,
	/// Lower priorities merge first.
	pub priority: i32,
	pub class: ClassFile,
	pub injectors: Vec<Injector>,
}

#[derive(Debug, Clone)]
pub struct GraftConfig {
	/// Distinguishes the names this engine generates from those of any other
	/// engine run against the same classes.
	pub session_id: String,
	pub initialiser_mode: InitialiserMode,
}

impl Default for GraftConfig {
	fn default() -> Self {
		GraftConfig {
			session_id: String::from("graft"),
			initialiser_mode: InitialiserMode::default(),
		}
	}
}

/// The merge state of one target class.
pub struct TargetClassContext<'a> {
	config: &'a GraftConfig,
	class: ClassFile,
	mixins: Vec<MixinInfo>,
	applied: bool,
	name_counter: usize,
}

impl<'a> TargetClassContext<'a> {
	pub fn new(config: &'a GraftConfig, class: ClassFile, mut mixins: Vec<MixinInfo>) -> TargetClassContext<'a> {
		mixins.sort_by_key(|mixin| mixin.priority);
		TargetClassContext {
			config,
			class,
			mixins,
			applied: false,
			name_counter: 0,
		}
	}

	pub fn class(&self) -> &ClassFile {
		&self.class
	}

	/// A method name no other engine session will generate.
	pub fn unique_name(&mut self, base: &str) -> MethodName {
		let name = format!("{base}${}${}", self.config.session_id, self.name_counter);
		self.name_counter += 1;
		MethodName::from(name)
	}

	/// Runs the whole merge: members, then constructor initialisers, then
	/// injectors, in mixin priority order.
	///
	/// Applying twice is an error; the context is spent afterwards.
	pub fn apply_mixins(&mut self, diag: &Diagnostics) -> Result<()> {
		if self.applied {
			bail!("mixins have already been applied to {}", self.class.name);
		}
		self.applied = true;

		let mixins = std::mem::take(&mut self.mixins);
		for mixin in &mixins {
			self.merge_members(mixin)
				.with_context(|| format!("cannot merge members of {} into {}", mixin.name, self.class.name))?;
		}
		for mixin in &mixins {
			self.merge_initialisers(mixin)
				.with_context(|| format!("cannot merge field initialisers of {} into {}", mixin.name, self.class.name))?;
		}
		for mixin in &mixins {
			apply_injectors(&mut self.class, &mixin.injectors, diag)
				.with_context(|| format!("cannot apply injectors of {} to {}", mixin.name, self.class.name))?;
		}

		Ok(())
	}

	pub fn into_class(self) -> ClassFile {
		self.class
	}

	/// Copies the mixin's fields and non-constructor methods into the target.
	///
	/// A method colliding with an existing one either gets a fresh unique name
	/// (when the mixin marked it synthetic, so nothing outside the mixin calls
	/// it by name) or overwrites the target's body.
	fn merge_members(&mut self, mixin: &MixinInfo) -> Result<()> {
		for field in &mixin.class.fields {
			match self.class.fields.iter().find(|f| f.name == field.name) {
				Some(existing) if existing.descriptor == field.descriptor => {},
				Some(existing) => bail!(
					"field {} exists in the target with descriptor {} but the mixin declares {}",
					field.name, existing.descriptor, field.descriptor,
				),
				None => self.class.fields.push(field.clone()),
			}
		}

		for method in &mixin.class.methods {
			if method.is_constructor() || method.is_class_initialiser() {
				continue;
			}

			if self.class.get_method(&method.name, &method.descriptor).is_some() {
				if method.access.is_synthetic {
					let mut renamed = method.clone();
					renamed.name = self.unique_name(method.name.as_str());
					self.class.methods.push(renamed);
				} else {
					// the mixin's body wins over the target's
					let existing = self.class.get_method_mut(&method.name, &method.descriptor)
						.with_context(|| format!("method {}{} vanished mid-merge", method.name, method.descriptor))?;
					existing.code = method.code.clone();
					log::debug!("method {}{} of {} overwritten by {}", method.name, method.descriptor, self.class.name, mixin.name);
				}
			} else {
				self.class.methods.push(method.clone());
			}
		}

		Ok(())
	}

	/// Extracts the field initialiser of every mixin constructor and replays
	/// it in every target constructor that delegates to the superclass.
	fn merge_initialisers(&mut self, mixin: &MixinInfo) -> Result<()> {
		let mixin_super = mixin.class.super_class.as_ref()
			.unwrap_or(&ClassName::JAVA_LANG_OBJECT);
		let target_super = self.class.super_class.clone()
			.unwrap_or(ClassName::JAVA_LANG_OBJECT);

		let mut ranges = Vec::new();
		for constructor in mixin.class.constructors() {
			let Some(code) = &constructor.code else { continue };
			if code.instructions.is_empty() {
				continue;
			}
			let range = extract_initialiser(mixin_super, code)
				.with_context(|| format!("in constructor {}{} of {}", constructor.name, constructor.descriptor, mixin.name))?;
			if !range.is_empty() {
				ranges.push(range.to_vec());
			}
		}

		for method in &mut self.class.methods {
			if !method.is_constructor() {
				continue;
			}
			let Some(code) = &mut method.code else { continue };
			for range in &ranges {
				apply_initialiser(&target_super, code, range, self.config.initialiser_mode)?;
			}
		}

		Ok(())
	}
}

/// The engine: configuration, diagnostics, and the set of classes currently
/// being transformed.
pub struct GraftEngine {
	config: GraftConfig,
	diag: Diagnostics,
	/// Guards against re-entrant transformation of the same class, which can
	/// happen when loading a mixin's own references triggers the engine again.
	in_flight: RefCell<IndexSet<ClassName>>,
}

impl GraftEngine {
	pub fn new(config: GraftConfig, diag: Diagnostics) -> GraftEngine {
		GraftEngine {
			config,
			diag,
			in_flight: RefCell::new(IndexSet::new()),
		}
	}

	pub fn diagnostics(&self) -> &Diagnostics {
		&self.diag
	}

	/// Transforms one class by applying all given mixins.
	///
	/// A re-entrant call for a class already being transformed returns the
	/// class untouched, with a warning; everything else is a single
	/// [`TargetClassContext`] run.
	pub fn transform(&self, class: ClassFile, mixins: Vec<MixinInfo>) -> Result<ClassFile> {
		let name = class.name.clone();
		if !self.in_flight.borrow_mut().insert(name.clone()) {
			log::warn!("re-entrant transformation of {name}, returning the class untouched");
			return Ok(class);
		}

		let result = self.transform_inner(class, mixins);
		self.in_flight.borrow_mut().swap_remove(&name);
		result
	}

	fn transform_inner(&self, class: ClassFile, mixins: Vec<MixinInfo>) -> Result<ClassFile> {
		let mut context = TargetClassContext::new(&self.config, class, mixins);
		context.apply_mixins(&self.diag)?;
		Ok(context.into_class())
	}
}

#[cfg(test)]
mod testing {
	use chisel::tree::class::ClassAccess;
	use chisel::tree::code::{Code, Instruction, InstructionListEntry, LvIndex};
	use chisel::tree::field::{Field, FieldAccess, FieldDescriptor, FieldName};
	use chisel::tree::method::{Method, MethodAccess, MethodDescriptor, MethodRef};
	use super::*;

	fn empty_class(name: &str) -> ClassFile {
		ClassFile::new(
			ClassAccess::default(),
			ClassName::from(name.to_owned()),
			Some(ClassName::JAVA_LANG_OBJECT),
			Vec::new(),
		)
	}

	fn method(name: &str, desc: &str, instructions: Vec<InstructionListEntry>) -> Method {
		let mut code = Code::new();
		code.instructions = instructions;
		let mut method = Method::new(
			MethodAccess::default(),
			MethodName::from(name.to_owned()),
			MethodDescriptor::from(desc.to_owned()),
		);
		method.code = Some(code);
		method
	}

	fn mixin(name: &str, class: ClassFile) -> MixinInfo {
		MixinInfo {
			name: ClassName::from(name.to_owned()),
			priority: 0,
			class,
			injectors: Vec::new(),
		}
	}

	#[test]
	fn merges_new_members() -> Result<()> {
		let target = empty_class("foo/Target");

		let mut addition = empty_class("foo/Mixin");
		addition.fields.push(Field::new(
			FieldAccess::default(),
			FieldName::from("added"),
			FieldDescriptor::from("I"),
		));
		addition.methods.push(method("extra", "()V", vec![
			InstructionListEntry::new(Instruction::Return),
		]));

		let config = GraftConfig::default();
		let diag = Diagnostics::new();
		let mut context = TargetClassContext::new(&config, target, vec![mixin("foo/Mixin", addition)]);
		context.apply_mixins(&diag)?;

		let merged = context.into_class();
		assert_eq!(merged.fields.len(), 1);
		assert!(merged.get_method(&MethodName::from("extra"), &MethodDescriptor::from("()V")).is_some());
		Ok(())
	}

	#[test]
	fn synthetic_collision_gets_a_unique_name() -> Result<()> {
		let mut target = empty_class("foo/Target");
		target.methods.push(method("helper", "()V", vec![
			InstructionListEntry::new(Instruction::Return),
		]));

		let mut addition = empty_class("foo/Mixin");
		let mut colliding = method("helper", "()V", vec![
			InstructionListEntry::new(Instruction::Return),
		]);
		colliding.access.is_synthetic = true;
		addition.methods.push(colliding);

		let config = GraftConfig::default();
		let diag = Diagnostics::new();
		let mut context = TargetClassContext::new(&config, target, vec![mixin("foo/Mixin", addition)]);
		context.apply_mixins(&diag)?;

		let merged = context.into_class();
		assert_eq!(merged.methods.len(), 2);
		assert_eq!(merged.methods[1].name.as_str(), "helper$graft$0");
		Ok(())
	}

	#[test]
	fn initialiser_is_replayed_into_target_constructors() -> Result<()> {
		let mut target = empty_class("foo/Target");
		target.methods.push(method("<init>", "()V", vec![
			InstructionListEntry::new(Instruction::ALoad(LvIndex { index: 0 })),
			InstructionListEntry::new(Instruction::InvokeSpecial(MethodRef {
				class: ClassName::JAVA_LANG_OBJECT,
				name: MethodName::from("<init>"),
				desc: MethodDescriptor::from("()V"),
			}, false)),
			InstructionListEntry::new(Instruction::Return),
		]));

		let mut addition = empty_class("foo/Mixin");
		addition.methods.push(method("<init>", "()V", vec![
			InstructionListEntry::new(Instruction::ALoad(LvIndex { index: 0 })),
			InstructionListEntry::new(Instruction::InvokeSpecial(MethodRef {
				class: ClassName::JAVA_LANG_OBJECT,
				name: MethodName::from("<init>"),
				desc: MethodDescriptor::from("()V"),
			}, false)),
			InstructionListEntry::new(Instruction::ALoad(LvIndex { index: 0 })),
			InstructionListEntry::new(Instruction::IConst1),
			InstructionListEntry::new(Instruction::PutField(chisel::tree::field::FieldRef {
				class: ClassName::from("foo/Target"),
				name: FieldName::from("added"),
				desc: FieldDescriptor::from("I"),
			})),
			InstructionListEntry::new(Instruction::Return),
		]));

		let config = GraftConfig::default();
		let diag = Diagnostics::new();
		let mut context = TargetClassContext::new(&config, target, vec![mixin("foo/Mixin", addition)]);
		context.apply_mixins(&diag)?;

		let merged = context.into_class();
		let constructor = merged.constructors().next().unwrap();
		let code = constructor.code.as_ref().unwrap();
		assert_eq!(code.instructions.len(), 6);
		assert!(matches!(code.instructions[4].instruction, Instruction::PutField(_)));
		Ok(())
	}

	#[test]
	fn apply_twice_is_an_error() -> Result<()> {
		let config = GraftConfig::default();
		let diag = Diagnostics::new();
		let mut context = TargetClassContext::new(&config, empty_class("foo/Target"), Vec::new());
		context.apply_mixins(&diag)?;
		assert!(context.apply_mixins(&diag).is_err());
		Ok(())
	}

	#[test]
	fn re_entrant_transform_returns_the_class_untouched() -> Result<()> {
		let engine = GraftEngine::new(GraftConfig::default(), Diagnostics::new());
		engine.in_flight.borrow_mut().insert(ClassName::from("foo/Target"));

		let mut addition = empty_class("foo/Mixin");
		addition.methods.push(method("extra", "()V", vec![
			InstructionListEntry::new(Instruction::Return),
		]));

		let unchanged = engine.transform(empty_class("foo/Target"), vec![mixin("foo/Mixin", addition)])?;
		assert!(unchanged.methods.is_empty());
		Ok(())
	}

	#[test]
	fn engine_transforms() -> Result<()> {
		let engine = GraftEngine::new(GraftConfig::default(), Diagnostics::new());

		let mut addition = empty_class("foo/Mixin");
		addition.methods.push(method("extra", "()V", vec![
			InstructionListEntry::new(Instruction::Return),
		]));

		let merged = engine.transform(empty_class("foo/Target"), vec![mixin("foo/Mixin", addition)])?;
		assert!(merged.get_method(&MethodName::from("extra"), &MethodDescriptor::from("()V")).is_some());
		Ok(())
	}
}
