//! Stateful argument builders.
//!
//! A builder owns the backing storage for one type-erased slot. The native
//! invocation mechanism writes through the slot, so the storage must live at
//! least as long as the call; the borrow on [`GenericArgument`] enforces it.
//!
//! Registry entries hold builder *prototypes*. Every call clones fresh
//! builders from them so concurrent or nested calls never share storage.

use std::any::Any;

use metabridge_core::{GenericArgument, NativeObjectRef, TypeName};

use crate::convert::Marshal;
use crate::error::{ConversionError, Direction};
use crate::value::ScriptValue;

/// Per-type conversion between script values and a native slot.
pub trait ArgBuilder: Send + Sync {
    /// Registry key this builder converts.
    fn type_name(&self) -> TypeName;

    /// Convert `value` into the builder's storage and hand out a slot.
    fn native_arg(&mut self, value: &ScriptValue) -> Result<GenericArgument<'_>, ConversionError>;

    /// Reset storage to the type's zero value and hand out a slot.
    ///
    /// Used for trailing parameters the script caller did not supply.
    fn default_arg(&mut self) -> GenericArgument<'_>;

    /// Slot that native code writes a return value into.
    ///
    /// An empty slot means the caller expects no value.
    fn return_arg(&mut self) -> GenericArgument<'_>;

    /// Materialize the value most recently written to the return slot.
    fn script_value(&self) -> Result<ScriptValue, ConversionError>;

    /// Materialize a script value from a raw event parameter.
    fn script_value_from_raw(&self, raw: &dyn Any) -> Result<ScriptValue, ConversionError>;

    /// Object-pointer builders return native objects that need wrapping.
    fn is_object_pointer(&self) -> bool {
        false
    }

    /// Native object written to the return slot, for object-pointer builders.
    fn returned_object(&self) -> Option<NativeObjectRef> {
        None
    }

    /// Native object carried by a raw event parameter.
    fn object_from_raw(&self, raw: &dyn Any) -> Result<Option<NativeObjectRef>, ConversionError> {
        let _ = raw;
        Err(ConversionError::RawTypeMismatch {
            expected: TypeName::OBJECT,
        })
    }

    /// New builder with independent storage.
    fn clone_builder(&self) -> Box<dyn ArgBuilder>;
}

// ============================================================================
// Value builder
// ============================================================================

/// Builder for any [`Marshal`] type.
#[derive(Debug, Clone, Default)]
pub struct ValueBuilder<T: Marshal> {
    storage: T,
}

impl<T: Marshal> ValueBuilder<T> {
    pub fn new() -> Self {
        Self {
            storage: T::default(),
        }
    }

    /// Current contents of the backing storage.
    pub fn value(&self) -> &T {
        &self.storage
    }
}

impl<T: Marshal> ArgBuilder for ValueBuilder<T> {
    fn type_name(&self) -> TypeName {
        T::TYPE_NAME
    }

    fn native_arg(&mut self, value: &ScriptValue) -> Result<GenericArgument<'_>, ConversionError> {
        self.storage = T::from_script(value)?;
        Ok(GenericArgument::new(T::TYPE_NAME, &mut self.storage))
    }

    fn default_arg(&mut self) -> GenericArgument<'_> {
        self.storage = T::default();
        GenericArgument::new(T::TYPE_NAME, &mut self.storage)
    }

    fn return_arg(&mut self) -> GenericArgument<'_> {
        self.default_arg()
    }

    fn script_value(&self) -> Result<ScriptValue, ConversionError> {
        self.storage.to_script()
    }

    fn script_value_from_raw(&self, raw: &dyn Any) -> Result<ScriptValue, ConversionError> {
        raw.downcast_ref::<T>()
            .ok_or(ConversionError::RawTypeMismatch {
                expected: T::TYPE_NAME,
            })?
            .to_script()
    }

    fn clone_builder(&self) -> Box<dyn ArgBuilder> {
        Box::new(Self::new())
    }
}

// ============================================================================
// Object pointer builder
// ============================================================================

/// Builder for native object pointers.
///
/// Storage is `Option<NativeObjectRef>`; `None` is the null pointer. Turning
/// a returned object into a script value requires a wrapper type, which the
/// trampoline supplies.
#[derive(Default, Clone)]
pub struct ObjectBuilder {
    storage: Option<NativeObjectRef>,
}

impl ObjectBuilder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ArgBuilder for ObjectBuilder {
    fn type_name(&self) -> TypeName {
        TypeName::OBJECT
    }

    fn native_arg(&mut self, value: &ScriptValue) -> Result<GenericArgument<'_>, ConversionError> {
        self.storage = match value {
            ScriptValue::Object(instance) => Some(instance.object().clone()),
            ScriptValue::None => None,
            other => {
                return Err(ConversionError::TypeMismatch {
                    expected: TypeName::OBJECT,
                    actual: other.type_name(),
                });
            }
        };
        Ok(GenericArgument::new(TypeName::OBJECT, &mut self.storage))
    }

    fn default_arg(&mut self) -> GenericArgument<'_> {
        self.storage = None;
        GenericArgument::new(TypeName::OBJECT, &mut self.storage)
    }

    fn return_arg(&mut self) -> GenericArgument<'_> {
        self.default_arg()
    }

    fn script_value(&self) -> Result<ScriptValue, ConversionError> {
        match self.storage {
            None => Ok(ScriptValue::None),
            Some(_) => Err(ConversionError::Unsupported {
                type_name: TypeName::OBJECT,
                direction: Direction::NativeToScript,
            }),
        }
    }

    fn script_value_from_raw(&self, raw: &dyn Any) -> Result<ScriptValue, ConversionError> {
        match self.object_from_raw(raw)? {
            None => Ok(ScriptValue::None),
            Some(_) => Err(ConversionError::Unsupported {
                type_name: TypeName::OBJECT,
                direction: Direction::NativeToScript,
            }),
        }
    }

    fn is_object_pointer(&self) -> bool {
        true
    }

    fn returned_object(&self) -> Option<NativeObjectRef> {
        self.storage.clone()
    }

    fn object_from_raw(&self, raw: &dyn Any) -> Result<Option<NativeObjectRef>, ConversionError> {
        if let Some(object) = raw.downcast_ref::<NativeObjectRef>() {
            return Ok(Some(object.clone()));
        }
        raw.downcast_ref::<Option<NativeObjectRef>>()
            .cloned()
            .ok_or(ConversionError::RawTypeMismatch {
                expected: TypeName::OBJECT,
            })
    }

    fn clone_builder(&self) -> Box<dyn ArgBuilder> {
        Box::new(Self::new())
    }
}

// ============================================================================
// Void builder
// ============================================================================

/// Return-only builder for `void`.
///
/// Hands out an empty return slot and always yields the script "none" value.
/// It cannot produce an argument.
#[derive(Debug, Default, Clone, Copy)]
pub struct VoidBuilder;

impl ArgBuilder for VoidBuilder {
    fn type_name(&self) -> TypeName {
        TypeName::VOID
    }

    fn native_arg(&mut self, _value: &ScriptValue) -> Result<GenericArgument<'_>, ConversionError> {
        Err(ConversionError::Unsupported {
            type_name: TypeName::VOID,
            direction: Direction::ScriptToNative,
        })
    }

    fn default_arg(&mut self) -> GenericArgument<'_> {
        GenericArgument::empty(TypeName::VOID)
    }

    fn return_arg(&mut self) -> GenericArgument<'_> {
        GenericArgument::empty(TypeName::VOID)
    }

    fn script_value(&self) -> Result<ScriptValue, ConversionError> {
        Ok(ScriptValue::None)
    }

    fn script_value_from_raw(&self, _raw: &dyn Any) -> Result<ScriptValue, ConversionError> {
        Ok(ScriptValue::None)
    }

    fn clone_builder(&self) -> Box<dyn ArgBuilder> {
        Box::new(VoidBuilder)
    }
}
