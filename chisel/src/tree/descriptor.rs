use std::fmt::Write as _;
use std::iter::Peekable;
use std::str::Chars;
use anyhow::{anyhow, bail, Context, Result};
use crate::tree::class::ClassName;
use crate::tree::field::FieldDescriptor;
use crate::tree::method::MethodDescriptor;

/// Represents a type.
///
/// In case of an array, use the [`Type::Array`] variant.
///
/// Note: never construct the [`Type::Array`] variant with a dimension of zero,
/// the [`Eq`] and [`PartialEq`] implementations don't respect that.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Type {
	/// A `byte`. In rust, this is a `i8`.
	B,
	/// A `char`.
	C,
	/// A `double`. In rust, this is a `f64`.
	D,
	/// A `float`. In rust, this is a `f32`.
	F,
	/// An `int`. In rust, this is a `i32`.
	I,
	/// A `long`. In rust, this is a `i64`.
	J,
	/// A `short`. In rust, this is a `i16`.
	S,
	/// A `boolean`. In rust, this is a `bool`.
	Z,
	/// An instance of the class specified by [`ClassName`].
	Object(ClassName),
	/// An array type, represented by the dimension and the inner [`ArrayType`].
	Array(u8, ArrayType),
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ArrayType {
	B,
	C,
	D,
	F,
	I,
	J,
	S,
	Z,
	Object(ClassName),
}

impl Type {
	/// The number of local variable slots a value of this type occupies.
	///
	/// `long` and `double` take two slots, everything else takes one.
	pub fn slot_width(&self) -> u16 {
		match self {
			Type::D | Type::J => 2,
			_ => 1,
		}
	}

	/// Writes this type in descriptor form, like `I` or `Ljava/lang/Thread;` or `[[D`.
	pub fn write(&self, s: &mut String) {
		match self {
			Type::B => s.push('B'),
			Type::C => s.push('C'),
			Type::D => s.push('D'),
			Type::F => s.push('F'),
			Type::I => s.push('I'),
			Type::J => s.push('J'),
			Type::S => s.push('S'),
			Type::Z => s.push('Z'),
			Type::Object(class_name) => {
				// ignore: writing to a String can't fail
				let _ = write!(s, "L{class_name};");
			},
			Type::Array(dimension, inner) => {
				for _ in 0..*dimension {
					s.push('[');
				}
				match inner {
					ArrayType::B => s.push('B'),
					ArrayType::C => s.push('C'),
					ArrayType::D => s.push('D'),
					ArrayType::F => s.push('F'),
					ArrayType::I => s.push('I'),
					ArrayType::J => s.push('J'),
					ArrayType::S => s.push('S'),
					ArrayType::Z => s.push('Z'),
					ArrayType::Object(class_name) => {
						let _ = write!(s, "L{class_name};");
					},
				}
			},
		}
	}
}

// The grammar for descriptors is:
//   FieldDescriptor:
//     FieldType
//
//   MethodDescriptor:
//     "(" FieldType* ")" ReturnDescriptor
//
//   ReturnDescriptor:
//     FieldType | "V"
//
//   FieldType:
//     "B" | "C" | "D" | "F" | "I" | "J" | "S" | "Z" |
//     "L" ClassName ";" |
//     "[" FieldType
fn read_field_type(chars: &mut Peekable<Chars>) -> Result<Type> {
	let mut array_dimension: u8 = 0;
	while chars.next_if_eq(&'[').is_some() {
		array_dimension = array_dimension.checked_add(1)
			.ok_or_else(|| anyhow!("more than 255 array dimensions"))?;
	}

	let char = chars.next().ok_or_else(|| anyhow!("unexpected abrupt ending of descriptor"))?;

	let class_name_of = |chars: &mut Peekable<Chars>| -> Result<ClassName> {
		let mut s = String::new();
		loop {
			let char = chars.next().ok_or_else(|| anyhow!("unexpected abrupt ending of descriptor"))?;
			if char == ';' {
				break;
			}
			s.push(char);
		}
		if s.is_empty() {
			bail!("empty class name in descriptor");
		}
		Ok(ClassName::from(s))
	};

	if array_dimension == 0 {
		Ok(match char {
			'B' => Type::B,
			'C' => Type::C,
			'D' => Type::D,
			'F' => Type::F,
			'I' => Type::I,
			'J' => Type::J,
			'S' => Type::S,
			'Z' => Type::Z,
			'L' => Type::Object(class_name_of(chars)?),
			char => bail!("unknown field type {char:?}"),
		})
	} else {
		let inner = match char {
			'B' => ArrayType::B,
			'C' => ArrayType::C,
			'D' => ArrayType::D,
			'F' => ArrayType::F,
			'I' => ArrayType::I,
			'J' => ArrayType::J,
			'S' => ArrayType::S,
			'Z' => ArrayType::Z,
			'L' => ArrayType::Object(class_name_of(chars)?),
			char => bail!("unknown field type {char:?}"),
		};
		Ok(Type::Array(array_dimension, inner))
	}
}

/// A parsed method descriptor: the parameter types and the return type.
///
/// A `None` return type is `void`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ParsedMethodDescriptor {
	pub parameters: Vec<Type>,
	pub return_type: Option<Type>,
}

impl ParsedMethodDescriptor {
	pub fn parse(descriptor: &MethodDescriptor) -> Result<ParsedMethodDescriptor> {
		Self::parse_str(descriptor.as_str())
			.with_context(|| anyhow!("in method descriptor {descriptor:?}"))
	}

	fn parse_str(descriptor: &str) -> Result<ParsedMethodDescriptor> {
		let mut chars = descriptor.chars().peekable();

		if chars.next_if_eq(&'(').is_none() {
			bail!("method descriptor doesn't start with `(`");
		}

		let mut parameters = Vec::new();
		while chars.next_if_eq(&')').is_none() {
			if chars.peek().is_none() {
				bail!("method descriptor misses the closing `)`");
			}
			parameters.push(read_field_type(&mut chars)?);
		}

		let return_type = if chars.next_if_eq(&'V').is_some() {
			None
		} else {
			Some(read_field_type(&mut chars)?)
		};

		if chars.next().is_some() {
			bail!("method descriptor has trailing contents");
		}

		Ok(ParsedMethodDescriptor { parameters, return_type })
	}

	/// Assembles the descriptor string, like `(III)Z`.
	pub fn write(&self) -> MethodDescriptor {
		let mut s = String::from("(");
		for parameter in &self.parameters {
			parameter.write(&mut s);
		}
		s.push(')');
		match &self.return_type {
			Some(return_type) => return_type.write(&mut s),
			None => s.push('V'),
		}
		MethodDescriptor::from(s)
	}

	/// The number of local variable slots the parameters occupy, not counting `this`.
	pub fn parameter_slot_width(&self) -> u16 {
		self.parameters.iter().map(Type::slot_width).sum()
	}
}

/// Parses a field descriptor, like `I` or `[[Ljava/lang/String;`.
pub fn parse_field_descriptor(descriptor: &FieldDescriptor) -> Result<Type> {
	let mut chars = descriptor.as_str().chars().peekable();
	let field_type = read_field_type(&mut chars)
		.with_context(|| anyhow!("in field descriptor {descriptor:?}"))?;
	if chars.next().is_some() {
		bail!("field descriptor {descriptor:?} has trailing contents");
	}
	Ok(field_type)
}
