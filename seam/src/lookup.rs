//! The mapping-lookup capability.
//!
//! A lookup answers the question "what is member X called in namespace Y?".
//! A missing mapping is `Ok(None)`, never an error: whether a miss matters
//! is decided by the caller, based on the kind of member it's resolving.

use anyhow::Result;
use chisel::tree::class::ClassName;
use chisel::tree::field::FieldName;
use chisel::tree::method::{MethodDescriptor, MethodName, MethodRef};
use crate::tree::{MappedField, MappingSet, NamespaceKey};

pub trait MappingLookup {
	/// Translates a class name into the given namespace.
	fn get_class(&self, owner: &ClassName, namespace: &NamespaceKey) -> Result<Option<ClassName>>;

	/// Translates a method's (owner, name, descriptor) triple into the given namespace.
	fn get_method(&self, owner: &ClassName, name: &MethodName, desc: &MethodDescriptor, namespace: &NamespaceKey)
		-> Result<Option<MethodRef>>;

	/// Translates a field's (owner, name) pair into the given namespace.
	fn get_field(&self, owner: &ClassName, name: &FieldName, namespace: &NamespaceKey)
		-> Result<Option<MappedField>>;
}

impl MappingLookup for MappingSet {
	fn get_class(&self, owner: &ClassName, namespace: &NamespaceKey) -> Result<Option<ClassName>> {
		Ok(self.get_table(namespace)?.get_class(owner).cloned())
	}

	fn get_method(&self, owner: &ClassName, name: &MethodName, desc: &MethodDescriptor, namespace: &NamespaceKey)
			-> Result<Option<MethodRef>> {
		Ok(self.get_table(namespace)?.get_method(owner, name, desc).cloned())
	}

	fn get_field(&self, owner: &ClassName, name: &FieldName, namespace: &NamespaceKey)
			-> Result<Option<MappedField>> {
		Ok(self.get_table(namespace)?.get_field(owner, name).cloned())
	}
}
