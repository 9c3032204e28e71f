//! Native class introspection and native object handles.

use std::any::Any;
use std::sync::Arc;

use crate::{GenericArgument, NativeError, TypeName};

/// Classification of a method exposed through a [`MetaObject`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodKind {
    /// Ordinary callable method.
    Slot,
    /// Event source; invoking it emits the event.
    Signal,
    /// Method marked callable from reflection but not connectable.
    Invokable,
}

/// Introspection record for one method of a native class.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodInfo {
    /// Full signature, e.g. `"SetValue(int)"`.
    pub signature: String,
    /// Parameter types in declaration order.
    pub parameter_types: Vec<TypeName>,
    /// Return type; `void` when there is none.
    pub return_type: TypeName,
    pub kind: MethodKind,
}

impl MethodInfo {
    pub fn new(
        signature: impl Into<String>,
        parameter_types: Vec<TypeName>,
        return_type: TypeName,
        kind: MethodKind,
    ) -> Self {
        Self {
            signature: signature.into(),
            parameter_types,
            return_type,
            kind,
        }
    }

    /// Member name derived from the signature.
    pub fn name(&self) -> &str {
        member_name(&self.signature)
    }
}

/// Introspection record for one constructor of a native class.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConstructorInfo {
    pub parameter_types: Vec<TypeName>,
}

impl ConstructorInfo {
    pub fn new(parameter_types: Vec<TypeName>) -> Self {
        Self { parameter_types }
    }
}

/// Truncate a signature at the first `(` to get the member name.
///
/// ```
/// assert_eq!(metabridge_core::member_name("SetValue(int)"), "SetValue");
/// assert_eq!(metabridge_core::member_name("plain"), "plain");
/// ```
pub fn member_name(signature: &str) -> &str {
    match signature.find('(') {
        Some(pos) => &signature[..pos],
        None => signature,
    }
}

/// Identity of a native class: the address of its metaobject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId(usize);

impl ClassId {
    pub fn of(meta: &'static dyn MetaObject) -> Self {
        ClassId(meta as *const dyn MetaObject as *const () as usize)
    }
}

/// Identity of a native object instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(usize);

impl ObjectId {
    pub fn of(object: &NativeObjectRef) -> Self {
        ObjectId(Arc::as_ptr(object) as *const () as usize)
    }

    pub fn of_dyn(object: &dyn NativeObject) -> Self {
        ObjectId(object as *const dyn NativeObject as *const () as usize)
    }

    /// Raw address, as exposed to scripts.
    pub fn address(self) -> usize {
        self.0
    }
}

/// Shared handle to a native object.
pub type NativeObjectRef = Arc<dyn NativeObject>;

/// Reflective description of a native class.
///
/// Method indices are positions in [`MetaObject::methods`]; constructor
/// indices are positions in [`MetaObject::constructors`].
pub trait MetaObject: Send + Sync {
    /// Name of the native class.
    fn class_name(&self) -> &str;

    fn constructors(&self) -> &[ConstructorInfo];

    fn methods(&self) -> &[MethodInfo];

    /// Find a method by full signature.
    fn index_of_method(&self, signature: &str) -> Option<usize> {
        self.methods().iter().position(|m| m.signature == signature)
    }

    /// Construct a new instance using the constructor at `index`.
    fn construct(
        &self,
        index: usize,
        args: &mut [GenericArgument<'_>],
    ) -> Result<NativeObjectRef, NativeError>;

    /// Invoke the method at `index` on `object`.
    ///
    /// `ret` is `None` for `void` methods. For signals, invoking emits the
    /// event through the event system.
    fn invoke(
        &self,
        object: &dyn NativeObject,
        index: usize,
        ret: Option<&mut GenericArgument<'_>>,
        args: &mut [GenericArgument<'_>],
    ) -> Result<(), NativeError>;
}

/// Instance of the reflective framework's base object type.
pub trait NativeObject: Any + Send + Sync {
    /// The class descriptor of this object.
    fn meta_object(&self) -> &'static dyn MetaObject;

    /// Entry point used by the event system to deliver an event to the
    /// method at `index`. `args` holds raw values in parameter order.
    fn meta_call(&self, index: usize, args: &[&dyn Any]) -> Result<(), NativeError> {
        let _ = args;
        Err(NativeError::NoSuchMethod(index))
    }

    /// Request deferred destruction of the object.
    fn delete_later(&self);

    fn as_any(&self) -> &dyn Any;
}
