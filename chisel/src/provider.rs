use anyhow::{bail, Result};
use indexmap::IndexMap;
use indexmap::map::Entry;
use crate::tree::class::{ClassFile, ClassName};

/// The capability of resolving a class known by name into its structural tree.
///
/// Implementations must not trigger any class-loading side effects: resolving
/// a name is a plain lookup, so hierarchy walks stay free of re-entrant loads.
pub trait ClassProvider {
	/// Returns the structural tree for the given class name.
	///
	/// An unknown class is `Ok(None)`, not an error: whether a missing class
	/// is fatal depends on the caller.
	fn get_class(&self, name: &ClassName) -> Result<Option<&ClassFile>>;
}

/// An in-memory [`ClassProvider`], keyed by class name.
#[derive(Debug, Default)]
pub struct ClassPool {
	classes: IndexMap<ClassName, ClassFile>,
}

impl ClassPool {
	pub fn new() -> ClassPool {
		ClassPool::default()
	}

	pub fn add(&mut self, class: ClassFile) -> Result<()> {
		match self.classes.entry(class.name.clone()) {
			Entry::Occupied(e) => {
				bail!("cannot add class {:?}, as there's already one with that name", e.key());
			},
			Entry::Vacant(e) => {
				e.insert(class);
			},
		}

		Ok(())
	}
}

impl ClassProvider for ClassPool {
	fn get_class(&self, name: &ClassName) -> Result<Option<&ClassFile>> {
		Ok(self.classes.get(name))
	}
}
