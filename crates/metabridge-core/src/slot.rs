//! Type-erased argument slots.

use std::any::{Any, type_name};

use crate::{NativeError, TypeName};

/// A type-erased argument or return-value slot handed to native invoke.
///
/// The slot carries the declared [`TypeName`] and a mutable borrow of the
/// storage owned by whichever builder produced it. The borrow ties the
/// slot's lifetime to that builder, so a slot can never outlive the value
/// it points at.
pub struct GenericArgument<'a> {
    type_name: TypeName,
    data: Option<&'a mut dyn Any>,
}

impl<'a> GenericArgument<'a> {
    /// Create a slot pointing at `data`.
    pub fn new(type_name: TypeName, data: &'a mut dyn Any) -> Self {
        Self {
            type_name,
            data: Some(data),
        }
    }

    /// Create an empty slot, used for `void` returns.
    pub fn empty(type_name: TypeName) -> Self {
        Self {
            type_name,
            data: None,
        }
    }

    /// Declared type of this slot.
    pub fn type_name(&self) -> &TypeName {
        &self.type_name
    }

    /// Check if the slot points at storage.
    pub fn is_empty(&self) -> bool {
        self.data.is_none()
    }

    /// Borrow the slot contents as `T`.
    pub fn get<T: Any>(&self) -> Result<&T, NativeError> {
        let data = self
            .data
            .as_deref()
            .ok_or_else(|| NativeError::MissingArgument(0))?;
        data.downcast_ref::<T>()
            .ok_or_else(|| self.mismatch::<T>())
    }

    /// Mutably borrow the slot contents as `T`.
    pub fn get_mut<T: Any>(&mut self) -> Result<&mut T, NativeError> {
        let expected = self.mismatch::<T>();
        let data = self
            .data
            .as_deref_mut()
            .ok_or(NativeError::MissingArgument(0))?;
        data.downcast_mut::<T>().ok_or(expected)
    }

    /// Overwrite the slot contents with `value`.
    ///
    /// Writing into an empty slot is a no-op, matching a native method
    /// whose caller does not want its return value.
    pub fn write<T: Any>(&mut self, value: T) -> Result<(), NativeError> {
        if self.data.is_none() {
            return Ok(());
        }
        *self.get_mut::<T>()? = value;
        Ok(())
    }

    /// Raw view of the storage, used when forwarding to event delivery.
    pub fn as_any(&self) -> Option<&dyn Any> {
        self.data.as_deref()
    }

    fn mismatch<T: Any>(&self) -> NativeError {
        NativeError::ArgumentType {
            expected: self.type_name.clone(),
            actual: TypeName::new(type_name::<T>()),
        }
    }
}

impl std::fmt::Debug for GenericArgument<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenericArgument")
            .field("type_name", &self.type_name)
            .field("empty", &self.is_empty())
            .finish()
    }
}
