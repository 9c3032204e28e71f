//! Conversion traits between native storage types and script values.
//!
//! [`Marshal`] is implemented for every Rust type that backs a builtin
//! registry entry:
//!
//! - `int` → `i32`
//! - `float` → `f32`, `double` → `f64`
//! - `string` → `String`
//! - `pointer` → [`RawPointer`] (script-to-native only)
//!
//! Object pointers and `void` need context the trait cannot express and
//! are handled by dedicated builders in [`crate::builders`].

use std::any::Any;

use metabridge_core::TypeName;

use crate::error::{ConversionError, Direction};
use crate::value::ScriptValue;

/// A native storage type with a canonical type name and script conversions.
pub trait Marshal: Any + Default + Clone + Send + Sync {
    /// Registry key for this type.
    const TYPE_NAME: TypeName;

    /// Convert a script value into the native representation.
    fn from_script(value: &ScriptValue) -> Result<Self, ConversionError>;

    /// Convert the native representation into a script value.
    fn to_script(&self) -> Result<ScriptValue, ConversionError>;
}

// ============================================================================
// Numeric implementations
// ============================================================================

impl Marshal for i32 {
    const TYPE_NAME: TypeName = TypeName::INT;

    fn from_script(value: &ScriptValue) -> Result<Self, ConversionError> {
        match value {
            ScriptValue::Int(v) => i32::try_from(*v).map_err(|_| ConversionError::IntegerOverflow {
                value: *v,
                target_type: Self::TYPE_NAME,
            }),
            ScriptValue::Bool(b) => Ok(*b as i32),
            other => Err(ConversionError::TypeMismatch {
                expected: Self::TYPE_NAME,
                actual: other.type_name(),
            }),
        }
    }

    fn to_script(&self) -> Result<ScriptValue, ConversionError> {
        Ok(ScriptValue::Int(*self as i64))
    }
}

macro_rules! impl_marshal_float {
    ($ty:ty, $name:expr) => {
        impl Marshal for $ty {
            const TYPE_NAME: TypeName = $name;

            fn from_script(value: &ScriptValue) -> Result<Self, ConversionError> {
                match value {
                    ScriptValue::Float(v) => Ok(*v as $ty),
                    // Integers are accepted where the script runtime would coerce them
                    ScriptValue::Int(v) => Ok(*v as $ty),
                    other => Err(ConversionError::TypeMismatch {
                        expected: Self::TYPE_NAME,
                        actual: other.type_name(),
                    }),
                }
            }

            fn to_script(&self) -> Result<ScriptValue, ConversionError> {
                Ok(ScriptValue::Float(*self as f64))
            }
        }
    };
}

impl_marshal_float!(f32, TypeName::FLOAT);
impl_marshal_float!(f64, TypeName::DOUBLE);

// ============================================================================
// String
// ============================================================================

impl Marshal for String {
    const TYPE_NAME: TypeName = TypeName::STRING;

    fn from_script(value: &ScriptValue) -> Result<Self, ConversionError> {
        match value {
            ScriptValue::Str(s) => Ok(s.clone()),
            other => Err(ConversionError::TypeMismatch {
                expected: Self::TYPE_NAME,
                actual: other.type_name(),
            }),
        }
    }

    fn to_script(&self) -> Result<ScriptValue, ConversionError> {
        Ok(ScriptValue::Str(self.clone()))
    }
}

// ============================================================================
// Untyped pointer
// ============================================================================

/// An untyped native address.
///
/// Scripts can pass an address into native code as an integer but never
/// receive one back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RawPointer(pub usize);

impl Marshal for RawPointer {
    const TYPE_NAME: TypeName = TypeName::POINTER;

    fn from_script(value: &ScriptValue) -> Result<Self, ConversionError> {
        match value {
            ScriptValue::Int(v) => usize::try_from(*v).map(RawPointer).map_err(|_| {
                ConversionError::IntegerOverflow {
                    value: *v,
                    target_type: Self::TYPE_NAME,
                }
            }),
            ScriptValue::None => Ok(RawPointer(0)),
            other => Err(ConversionError::TypeMismatch {
                expected: Self::TYPE_NAME,
                actual: other.type_name(),
            }),
        }
    }

    fn to_script(&self) -> Result<ScriptValue, ConversionError> {
        Err(ConversionError::Unsupported {
            type_name: Self::TYPE_NAME,
            direction: Direction::NativeToScript,
        })
    }
}
