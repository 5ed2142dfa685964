/// Creates `From` implementations for types wrapping a `Cow<'static, str>`.
macro_rules! from_impl_for_string_and_str {
	($name:ident) => {
		impl From<String> for $name {
			fn from(value: String) -> Self {
				$name(std::borrow::Cow::Owned(value))
			}
		}
		impl From<&'static str> for $name {
			fn from(value: &'static str) -> Self {
				$name(std::borrow::Cow::Borrowed(value))
			}
		}

		impl $name {
			pub fn as_str(&self) -> &str {
				&self.0
			}

			pub fn into_inner(self) -> std::borrow::Cow<'static, str> {
				self.0
			}
		}
	}
}

/// Creates `PartialEq` implementations against [str] for types wrapping a `Cow<'static, str>`.
macro_rules! partial_eq_impl_for_str {
	($name:ident) => {
		impl PartialEq<str> for $name {
			fn eq(&self, other: &str) -> bool {
				self.0 == other
			}
		}
		impl PartialEq<&str> for $name {
			fn eq(&self, other: &&str) -> bool {
				self.0 == *other
			}
		}
		impl PartialEq<$name> for str {
			fn eq(&self, other: &$name) -> bool {
				self == other.0
			}
		}
	}
}

macro_rules! make_display {
	($name:ident) => {
		impl std::fmt::Display for $name {
			fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
				write!(f, "{}", self.0)
			}
		}
	}
}

pub(crate) use {from_impl_for_string_and_str, make_display, partial_eq_impl_for_str};
