//! Metabridge core crate.
//!
//! This crate describes the native side of the bridge: the reflective
//! object framework that the scripting bridge *consumes*. It contains no
//! scripting-side types.
//!
//! - [`TypeName`]: canonical identifier of a native value type
//! - [`GenericArgument`]: type-erased argument / return slot
//! - [`MetaObject`]: introspection of a native class (constructors, methods,
//!   signals) plus invoke-by-index and construct-by-index
//! - [`NativeObject`]: an instance of the reflective framework's base type
//! - [`EventSystem`]: the native signal connect / disconnect primitives
//! - [`NativeError`]: failures raised by native code

mod error;
mod event;
mod meta;
mod slot;
mod type_name;

pub use error::NativeError;
pub use event::EventSystem;
pub use meta::{
    ClassId, ConstructorInfo, MetaObject, MethodInfo, MethodKind, NativeObject, NativeObjectRef,
    ObjectId, member_name,
};
pub use slot::GenericArgument;
pub use type_name::TypeName;
