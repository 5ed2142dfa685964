use std::borrow::Cow;
use std::fmt::{Debug, Formatter};
use crate::macros::{from_impl_for_string_and_str, make_display, partial_eq_impl_for_str};
use crate::tree::field::Field;
use crate::tree::method::{Method, MethodDescriptor, MethodName};

/// Represents a class name.
///
/// The class name uses [internal binary names](https://docs.oracle.com/javase/specs/jvms/se22/html/jvms-4.html#jvms-4.2.1),
/// i.e. with the complete path written out and using slashes, like `java/lang/Thread`.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ClassName(Cow<'static, str>);

from_impl_for_string_and_str!(ClassName);
partial_eq_impl_for_str!(ClassName);
make_display!(ClassName);

impl ClassName {
	/// The class name of `Object`, the root of every superclass chain.
	pub const JAVA_LANG_OBJECT: ClassName = ClassName(Cow::Borrowed("java/lang/Object"));

	/// Checks if this is an array class.
	///
	/// Array class names start with `[`.
	pub fn is_array(&self) -> bool {
		self.0.starts_with('[')
	}

	/// Gets the simple name, i.e. the part after the last `/`.
	pub fn simple_name(&self) -> &str {
		self.0.rsplit_once('/')
			.map_or(&self.0, |(_, simple)| simple)
	}

	pub fn is_valid(&self) -> bool {
		crate::tree::names::is_valid_class_name(&self.0)
	}
}

/// Represents the structure of a class, as far as the merging engine needs it.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassFile {
	pub access: ClassAccess,
	pub name: ClassName,
	pub super_class: Option<ClassName>,
	pub interfaces: Vec<ClassName>,

	pub fields: Vec<Field>,
	pub methods: Vec<Method>,
}

impl ClassFile {
	pub fn new(access: ClassAccess, name: ClassName, super_class: Option<ClassName>, interfaces: Vec<ClassName>) -> ClassFile {
		ClassFile {
			access,
			name,
			super_class,
			interfaces,

			fields: Vec::new(),
			methods: Vec::new(),
		}
	}

	/// Finds a method by exact name and descriptor, in declaration order.
	pub fn get_method(&self, name: &MethodName, descriptor: &MethodDescriptor) -> Option<&Method> {
		self.methods.iter()
			.find(|m| &m.name == name && &m.descriptor == descriptor)
	}

	pub fn get_method_mut(&mut self, name: &MethodName, descriptor: &MethodDescriptor) -> Option<&mut Method> {
		self.methods.iter_mut()
			.find(|m| &m.name == name && &m.descriptor == descriptor)
	}

	/// All constructors, i.e. methods named `<init>`, in declaration order.
	pub fn constructors(&self) -> impl Iterator<Item=&Method> {
		self.methods.iter().filter(|m| m.is_constructor())
	}
}

/// Represents the access flags a class can have.
///
/// Take a look at the [Java Virtual Machine Specification](https://docs.oracle.com/javase/specs/jvms/se22/html/jvms-4.html#jvms-4.1-200-E.1), for
/// the meanings of these fields, and what combinations are legal and which not.
#[derive(Copy, Clone, Default, PartialEq)]
pub struct ClassAccess {
	pub is_public: bool,
	pub is_final: bool,
	pub is_super: bool,
	pub is_interface: bool,
	pub is_abstract: bool,
	pub is_synthetic: bool,
	pub is_annotation: bool,
	pub is_enum: bool,
}

impl Debug for ClassAccess {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str("ClassAccess { ")?;
		if self.is_public     { f.write_str("public ")?; }
		if self.is_final      { f.write_str("final ")?; }
		if self.is_super      { f.write_str("super ")?; }
		if self.is_interface  { f.write_str("interface ")?; }
		if self.is_abstract   { f.write_str("abstract ")?; }
		if self.is_synthetic  { f.write_str("synthetic ")?; }
		if self.is_annotation { f.write_str("annotation ")?; }
		if self.is_enum       { f.write_str("enum ")?; }
		f.write_str("}")
	}
}

/// Interprets an `u16` as the `access_flags` item of the `ClassFile` structure of the Java Virtual Machine Specification.
impl From<u16> for ClassAccess {
	fn from(value: u16) -> Self {
		ClassAccess {
			is_public:     value & 0x0001 != 0,
			is_final:      value & 0x0010 != 0,
			is_super:      value & 0x0020 != 0,
			is_interface:  value & 0x0200 != 0,
			is_abstract:   value & 0x0400 != 0,
			is_synthetic:  value & 0x1000 != 0,
			is_annotation: value & 0x2000 != 0,
			is_enum:       value & 0x4000 != 0,
		}
	}
}

/// Creates an `u16` according to the `access_flags` item of the `ClassFile` structure of the Java Virtual Machine Specification.
impl From<ClassAccess> for u16 {
	fn from(value: ClassAccess) -> Self {
		(if value.is_public     { 0x0001 } else { 0 }) |
		(if value.is_final      { 0x0010 } else { 0 }) |
		(if value.is_super      { 0x0020 } else { 0 }) |
		(if value.is_interface  { 0x0200 } else { 0 }) |
		(if value.is_abstract   { 0x0400 } else { 0 }) |
		(if value.is_synthetic  { 0x1000 } else { 0 }) |
		(if value.is_annotation { 0x2000 } else { 0 }) |
		(if value.is_enum       { 0x4000 } else { 0 })
	}
}
