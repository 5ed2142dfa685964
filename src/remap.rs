//! Bridging selectors to mapping tables.
//!
//! Selectors are written against one namespace but the classes being
//! transformed may carry names from another. The [`Resolver`] answers "what is
//! this member called over there", falling back to the class hierarchy when a
//! member is declared on a supertype rather than on the owner the selector
//! names.

use anyhow::{Context, Result};
use indexmap::IndexSet;
use chisel::provider::ClassProvider;
use chisel::tree::class::ClassName;
use chisel::tree::field::FieldName;
use chisel::tree::method::MethodRef;
use seam::lookup::MappingLookup;
use seam::tree::{MappedField, NamespaceKey};
use crate::diag::{DiagnosticCategory, Diagnostics};

/// A member reference as a resolver input: either a method or a field, with
/// its owner attached.
#[derive(Debug, Clone, PartialEq)]
pub enum Member {
	Method(MethodRef),
	Field { class: ClassName, name: FieldName },
}

impl Member {
	pub fn owner(&self) -> &ClassName {
		match self {
			Member::Method(method) => &method.class,
			Member::Field { class, .. } => class,
		}
	}

	pub fn with_owner(&self, owner: ClassName) -> Member {
		match self {
			Member::Method(method) => Member::Method(MethodRef {
				class: owner,
				name: method.name.clone(),
				desc: method.desc.clone(),
			}),
			Member::Field { name, .. } => Member::Field {
				class: owner,
				name: name.clone(),
			},
		}
	}

	/// Constructors and class initialisers are never renamed by mappings, so a
	/// missing entry for them is expected rather than an error.
	pub fn is_constructor_like(&self) -> bool {
		match self {
			Member::Method(method) => method.name.as_str() == "<init>" || method.name.as_str() == "<clinit>",
			Member::Field { .. } => false,
		}
	}
}

/// What a successful resolution names in the requested namespace.
#[derive(Debug, Clone, PartialEq)]
pub enum MappingEntry {
	Method(MethodRef),
	Field(MappedField),
}

/// Resolves member references through a mapping lookup, walking the class
/// hierarchy of a [`ClassProvider`] when the direct lookup misses.
pub struct Resolver<'a> {
	lookup: &'a dyn MappingLookup,
	provider: &'a dyn ClassProvider,
}

impl<'a> Resolver<'a> {
	pub fn new(lookup: &'a dyn MappingLookup, provider: &'a dyn ClassProvider) -> Resolver<'a> {
		Resolver { lookup, provider }
	}

	/// Looks up a member directly.
	///
	/// On a miss, if the owner itself has a class mapping, the lookup is
	/// retried once under the mapped owner. Mapping tables sometimes key
	/// members under the remapped class name; this catches that without the
	/// cost of the hierarchy walk.
	pub fn resolve(&self, member: &Member, namespace: &NamespaceKey) -> Result<Option<MappingEntry>> {
		if let Some(entry) = self.query(member, namespace)? {
			return Ok(Some(entry));
		}

		if let Some(mapped_owner) = self.lookup.get_class(member.owner(), namespace)? {
			if &mapped_owner != member.owner() {
				return self.query(&member.with_owner(mapped_owner), namespace);
			}
		}

		Ok(None)
	}

	/// Looks up a member, searching the owner's supertypes when the owner
	/// itself has no entry.
	///
	/// Interfaces are searched first, depth-first, then the superclass chain;
	/// at each superclass its own interfaces are searched before moving up.
	/// Every class is visited at most once, so diamonds terminate.
	pub fn resolve_recursive(&self, member: &Member, namespace: &NamespaceKey) -> Result<Option<MappingEntry>> {
		if let Some(entry) = self.resolve(member, namespace)? {
			return Ok(Some(entry));
		}

		let mut visited: IndexSet<ClassName> = IndexSet::new();
		visited.insert(member.owner().clone());

		let Some(class) = self.provider.get_class(member.owner())
			.with_context(|| format!("failed to load class {:?}", member.owner()))?
		else {
			return Ok(None);
		};

		if let Some(entry) = self.search_interfaces(member, namespace, &class.interfaces, &mut visited)? {
			return Ok(Some(entry));
		}

		let mut super_name = class.super_class.clone();
		while let Some(name) = super_name {
			if !visited.insert(name.clone()) {
				break;
			}

			let candidate = member.with_owner(name.clone());
			if let Some(entry) = self.resolve(&candidate, namespace)? {
				return Ok(Some(entry));
			}

			let Some(super_class) = self.provider.get_class(&name)
				.with_context(|| format!("failed to load superclass {name:?} of {:?}", member.owner()))?
			else {
				break;
			};

			if let Some(entry) = self.search_interfaces(member, namespace, &super_class.interfaces, &mut visited)? {
				return Ok(Some(entry));
			}

			super_name = super_class.super_class.clone();
		}

		Ok(None)
	}

	fn search_interfaces(
		&self,
		member: &Member,
		namespace: &NamespaceKey,
		interfaces: &[ClassName],
		visited: &mut IndexSet<ClassName>,
	) -> Result<Option<MappingEntry>> {
		for interface in interfaces {
			if !visited.insert(interface.clone()) {
				continue;
			}

			let candidate = member.with_owner(interface.clone());
			if let Some(entry) = self.resolve(&candidate, namespace)? {
				return Ok(Some(entry));
			}

			// super-interfaces before the next sibling
			if let Some(class) = self.provider.get_class(interface)
				.with_context(|| format!("failed to load interface {interface:?}"))?
			{
				if let Some(entry) = self.search_interfaces(member, namespace, &class.interfaces, visited)? {
					return Ok(Some(entry));
				}
			}
		}
		Ok(None)
	}

	/// Like [`Resolver::resolve_recursive`], but a fatal miss is reported as
	/// a [`DiagnosticCategory::MappingMiss`].
	///
	/// Constructors and class initialisers are expected to miss, so those
	/// stay silent. The miss itself remains `Ok(None)`: how severe it is
	/// is the diagnostics configuration's decision, not the resolver's.
	pub fn resolve_required(
		&self,
		member: &Member,
		namespace: &NamespaceKey,
		diag: &Diagnostics,
		site: &str,
	) -> Result<Option<MappingEntry>> {
		let entry = self.resolve_recursive(member, namespace)?;
		if entry.is_none() && is_fatal_miss(member) {
			diag.report(
				DiagnosticCategory::MappingMiss,
				site,
				&format!("no mapping for {member:?} in namespace {namespace}"),
			);
		}
		Ok(entry)
	}

	fn query(&self, member: &Member, namespace: &NamespaceKey) -> Result<Option<MappingEntry>> {
		match member {
			Member::Method(method) => {
				let mapped = self.lookup.get_method(&method.class, &method.name, &method.desc, namespace)?;
				Ok(mapped.map(MappingEntry::Method))
			},
			Member::Field { class, name } => {
				let mapped = self.lookup.get_field(class, name, namespace)?;
				Ok(mapped.map(MappingEntry::Field))
			},
		}
	}
}

/// Whether failing to resolve this member should be treated as an error by
/// callers that require complete mappings.
pub fn is_fatal_miss(member: &Member) -> bool {
	!member.is_constructor_like()
}

#[cfg(test)]
mod testing {
	use std::cell::RefCell;
	use indexmap::IndexMap;
	use chisel::provider::ClassPool;
	use chisel::tree::class::{ClassAccess, ClassFile, ClassName};
	use chisel::tree::method::{MethodDescriptor, MethodName, MethodNameAndDesc};
	use seam::tree::{MappingSet, MappingTable};
	use super::*;

	/// Counts how often each class is resolved.
	struct CountingPool {
		inner: ClassPool,
		loads: RefCell<IndexMap<ClassName, usize>>,
	}

	impl ClassProvider for CountingPool {
		fn get_class(&self, name: &ClassName) -> Result<Option<&ClassFile>> {
			*self.loads.borrow_mut().entry(name.clone()).or_insert(0) += 1;
			self.inner.get_class(name)
		}
	}

	fn class(name: &str, super_class: Option<&str>, interfaces: &[&str]) -> ClassFile {
		ClassFile::new(
			ClassAccess::default(),
			ClassName::from(name.to_owned()),
			super_class.map(|s| ClassName::from(s.to_owned())),
			interfaces.iter().map(|i| ClassName::from((*i).to_owned())).collect(),
		)
	}

	fn method(owner: &str, name: &str, desc: &str) -> MethodRef {
		MethodRef {
			class: ClassName::from(owner.to_owned()),
			name: MethodName::from(name.to_owned()),
			desc: MethodDescriptor::from(desc.to_owned()),
		}
	}

	#[test]
	fn diamond_hierarchy_terminates() -> Result<()> {
		// A implements B, C; both B and C extend interface D; the method is
		// declared (and mapped) on D
		let mut pool = ClassPool::new();
		pool.add(class("A", Some("java/lang/Object"), &["B", "C"]))?;
		pool.add(class("B", None, &["D"]))?;
		pool.add(class("C", None, &["D"]))?;
		pool.add(class("D", None, &[]))?;

		let namespace = NamespaceKey::from("named");
		let mut table = MappingTable::new();
		table.add_method(
			ClassName::from("D"),
			MethodNameAndDesc {
				name: MethodName::from("m"),
				desc: MethodDescriptor::from("()V"),
			},
			method("D", "mapped", "()V"),
		)?;
		let mut set = MappingSet::new();
		set.add_table(namespace.clone(), table)?;

		let resolver = Resolver::new(&set, &pool);
		let member = Member::Method(method("A", "m", "()V"));
		let entry = resolver.resolve_recursive(&member, &namespace)?;

		assert_eq!(entry, Some(MappingEntry::Method(method("D", "mapped", "()V"))));
		Ok(())
	}

	#[test]
	fn diamond_hierarchy_visits_shared_interface_once() -> Result<()> {
		// same diamond, but nothing is mapped, so the walk is exhaustive
		let mut pool = ClassPool::new();
		pool.add(class("A", Some("java/lang/Object"), &["B", "C"]))?;
		pool.add(class("B", None, &["D"]))?;
		pool.add(class("C", None, &["D"]))?;
		pool.add(class("D", None, &[]))?;
		let pool = CountingPool { inner: pool, loads: RefCell::new(IndexMap::new()) };

		let namespace = NamespaceKey::from("named");
		let mut set = MappingSet::new();
		set.add_table(namespace.clone(), MappingTable::new())?;

		let resolver = Resolver::new(&set, &pool);
		let member = Member::Method(method("A", "m", "()V"));
		let entry = resolver.resolve_recursive(&member, &namespace)?;

		assert_eq!(entry, None);
		// D is reachable through both B and C, but its supertypes are only
		// searched once
		assert_eq!(pool.loads.borrow().get(&ClassName::from("D")), Some(&1));
		Ok(())
	}

	#[test]
	fn fatal_miss_is_reported_but_not_an_error() -> Result<()> {
		let pool = ClassPool::new();

		let namespace = NamespaceKey::from("named");
		let mut set = MappingSet::new();
		set.add_table(namespace.clone(), MappingTable::new())?;

		let resolver = Resolver::new(&set, &pool);
		let diag = Diagnostics::new();

		let member = Member::Method(method("a", "m", "()V"));
		let entry = resolver.resolve_required(&member, &namespace, &diag, "test")?;
		assert_eq!(entry, None);
		Ok(())
	}

	#[test]
	fn owner_remap_fallback() -> Result<()> {
		let pool = ClassPool::new();

		// the member table is keyed under the mapped owner name
		let namespace = NamespaceKey::from("named");
		let mut table = MappingTable::new();
		table.add_class(ClassName::from("a"), ClassName::from("foo/Renamed"))?;
		table.add_method(
			ClassName::from("foo/Renamed"),
			MethodNameAndDesc {
				name: MethodName::from("m"),
				desc: MethodDescriptor::from("()V"),
			},
			method("foo/Renamed", "mapped", "()V"),
		)?;
		let mut set = MappingSet::new();
		set.add_table(namespace.clone(), table)?;

		let resolver = Resolver::new(&set, &pool);
		let member = Member::Method(method("a", "m", "()V"));
		let entry = resolver.resolve(&member, &namespace)?;

		assert_eq!(entry, Some(MappingEntry::Method(method("foo/Renamed", "mapped", "()V"))));
		Ok(())
	}

	#[test]
	fn constructor_misses_are_not_fatal() {
		let init = Member::Method(method("a", "<init>", "()V"));
		let normal = Member::Method(method("a", "m", "()V"));

		assert!(!is_fatal_miss(&init));
		assert!(is_fatal_miss(&normal));
	}
}
