//! Canonical native type names.

use std::borrow::{Borrow, Cow};
use std::fmt;

/// Canonical string identifier for a native value type.
///
/// Used as the key into the conversion registry and in every member
/// signature. The builtin names are available as associated constants.
///
/// An empty name is normalized to [`TypeName::VOID`], which is what
/// introspection reports for methods without a return value.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeName(Cow<'static, str>);

impl TypeName {
    /// 32-bit signed integer.
    pub const INT: TypeName = TypeName::from_static("int");
    /// 32-bit float.
    pub const FLOAT: TypeName = TypeName::from_static("float");
    /// 64-bit float.
    pub const DOUBLE: TypeName = TypeName::from_static("double");
    /// UTF-8 string.
    pub const STRING: TypeName = TypeName::from_static("string");
    /// Generic untyped pointer, carried as an address.
    pub const POINTER: TypeName = TypeName::from_static("pointer");
    /// Pointer to a native object.
    pub const OBJECT: TypeName = TypeName::from_static("object");
    /// No value.
    pub const VOID: TypeName = TypeName::from_static("void");

    /// Create a type name from a static string.
    pub const fn from_static(name: &'static str) -> Self {
        TypeName(Cow::Borrowed(name))
    }

    /// Create a type name, normalizing the empty name to `void`.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        let name = name.into();
        if name.is_empty() {
            Self::VOID
        } else {
            TypeName(name)
        }
    }

    /// The name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if this is the `void` type.
    pub fn is_void(&self) -> bool {
        self.as_str() == Self::VOID.as_str()
    }

    /// Check if this is the native object pointer type.
    pub fn is_object(&self) -> bool {
        self.as_str() == Self::OBJECT.as_str()
    }
}

impl Borrow<str> for TypeName {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl AsRef<str> for TypeName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl From<&'static str> for TypeName {
    fn from(name: &'static str) -> Self {
        TypeName::new(name)
    }
}

impl From<String> for TypeName {
    fn from(name: String) -> Self {
        TypeName::new(name)
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeName({:?})", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_name_is_void() {
        assert_eq!(TypeName::new(""), TypeName::VOID);
        assert!(TypeName::new(String::new()).is_void());
    }

    #[test]
    fn owned_and_static_names_compare_equal() {
        assert_eq!(TypeName::new(String::from("int")), TypeName::INT);
        assert!(TypeName::from("object").is_object());
    }

    #[test]
    fn lookup_by_str() {
        let mut map = HashMap::new();
        map.insert(TypeName::DOUBLE, 1);
        assert_eq!(map.get("double"), Some(&1));
    }
}
