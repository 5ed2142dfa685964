use std::borrow::Cow;
use std::fmt::{Display, Formatter};
use anyhow::{bail, Result};
use indexmap::IndexMap;
use indexmap::map::Entry;
use chisel::tree::class::ClassName;
use chisel::tree::field::FieldName;
use chisel::tree::method::{MethodDescriptor, MethodName, MethodNameAndDesc, MethodRef};

/// Names one obfuscation environment, like `searge` or `notch`.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct NamespaceKey(Cow<'static, str>);

impl From<String> for NamespaceKey {
	fn from(value: String) -> Self {
		NamespaceKey(Cow::Owned(value))
	}
}
impl From<&'static str> for NamespaceKey {
	fn from(value: &'static str) -> Self {
		NamespaceKey(Cow::Borrowed(value))
	}
}

impl NamespaceKey {
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl Display for NamespaceKey {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// A field translated into one namespace.
///
/// SRG field data carries no descriptor, so unlike [`MethodRef`] there's none here.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct MappedField {
	pub class: ClassName,
	pub name: FieldName,
}

/// The mapping data of one class in one namespace.
///
/// Methods are keyed by their [`MethodNameAndDesc`], fields by name alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassMapping {
	/// The class's own translated name. `None` if only members of it are mapped.
	pub name: Option<ClassName>,
	pub fields: IndexMap<FieldName, MappedField>,
	pub methods: IndexMap<MethodNameAndDesc, MethodRef>,
}

/// One namespace's table, keyed by source member.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappingTable {
	pub classes: IndexMap<ClassName, ClassMapping>,
}

impl MappingTable {
	pub fn new() -> MappingTable {
		MappingTable::default()
	}

	pub fn add_class(&mut self, src: ClassName, dst: ClassName) -> Result<()> {
		let class = self.classes.entry(src).or_default();
		if let Some(existing) = &class.name {
			bail!("cannot add class mapping to {dst:?}, as there's already one: {existing:?}");
		}
		class.name = Some(dst);
		Ok(())
	}

	pub fn add_field(&mut self, src_owner: ClassName, src_name: FieldName, dst: MappedField) -> Result<()> {
		let class = self.classes.entry(src_owner).or_default();
		match class.fields.entry(src_name) {
			Entry::Occupied(e) => {
				bail!("cannot add field mapping {dst:?} for key {:?}, as there's already one: {:?}", e.key(), e.get());
			},
			Entry::Vacant(e) => {
				e.insert(dst);
			},
		}
		Ok(())
	}

	pub fn add_method(&mut self, src_owner: ClassName, src: MethodNameAndDesc, dst: MethodRef) -> Result<()> {
		let class = self.classes.entry(src_owner).or_default();
		match class.methods.entry(src) {
			Entry::Occupied(e) => {
				bail!("cannot add method mapping {dst:?} for key {:?}, as there's already one: {:?}", e.key(), e.get());
			},
			Entry::Vacant(e) => {
				e.insert(dst);
			},
		}
		Ok(())
	}

	pub fn get_class(&self, src: &ClassName) -> Option<&ClassName> {
		self.classes.get(src)?.name.as_ref()
	}

	pub fn get_field(&self, src_owner: &ClassName, src_name: &FieldName) -> Option<&MappedField> {
		self.classes.get(src_owner)?.fields.get(src_name)
	}

	pub fn get_method(&self, src_owner: &ClassName, src_name: &MethodName, src_desc: &MethodDescriptor) -> Option<&MethodRef> {
		let key = MethodNameAndDesc { name: src_name.clone(), desc: src_desc.clone() };
		self.classes.get(src_owner)?.methods.get(&key)
	}
}

/// All registered namespaces: one [`MappingTable`] per [`NamespaceKey`].
///
/// Append-only during the startup window, read-only during transformation.
#[derive(Debug, Clone, Default)]
pub struct MappingSet {
	pub tables: IndexMap<NamespaceKey, MappingTable>,
}

impl MappingSet {
	pub fn new() -> MappingSet {
		MappingSet::default()
	}

	pub fn add_table(&mut self, namespace: NamespaceKey, table: MappingTable) -> Result<()> {
		match self.tables.entry(namespace) {
			Entry::Occupied(e) => {
				bail!("cannot add mapping table for namespace {:?}, as there's already one", e.key());
			},
			Entry::Vacant(e) => {
				e.insert(table);
			},
		}
		Ok(())
	}

	pub fn get_table(&self, namespace: &NamespaceKey) -> Result<&MappingTable> {
		match self.tables.get(namespace) {
			Some(table) => Ok(table),
			None => bail!("no mapping table registered for namespace {namespace:?}"),
		}
	}
}
