//! Metabridge: a bidirectional bridge between a reflective native object
//! framework and a dynamically typed scripting runtime.
//!
//! The native side is described by the traits in [`metabridge_core`]. This
//! crate builds the scripting side on top of them:
//!
//! - [`ConversionRegistry`]: per-type converters between script values and
//!   type-erased native slots
//! - [`WrapperType`]: a scripting type generated on demand from a class
//!   metaobject, cached per (class, namespace)
//! - [`trampoline`]: member invocation and construction by index
//! - [`CallbackDispatcher`]: routes native signals to scripting callables
//!   through proxy slots
//! - [`lifecycle`]: ownership transfer between the two runtimes
//! - [`api`]: the module-level functions installed in the scripting runtime
//!
//! All shared state lives in a [`Context`].
//!
//! ## Example
//!
//! ```ignore
//! let ctx = Context::new(events);
//! let app = Namespace::new("app");
//! let widget = ctx.add_type(&WIDGET_META, &app, &TypeOptions::default())?;
//! let instance = ctx.construct(&widget, &[])?;
//! let value = ctx.call_member(&instance, "GetValue", &[])?;
//! ```

pub mod api;
pub mod builders;
pub mod config;
pub mod context;
pub mod convert;
pub mod dispatcher;
pub mod error;
pub mod lifecycle;
pub mod namespace;
pub mod registry;
pub mod trampoline;
pub mod value;
pub mod wrapper;

pub use metabridge_core::{
    ClassId, ConstructorInfo, EventSystem, GenericArgument, MetaObject, MethodInfo, MethodKind,
    NativeError, NativeObject, NativeObjectRef, ObjectId, TypeName,
};

pub use api::{MODULE_FUNCTIONS, ModuleFunction, call, get_attr, set_attr};
pub use builders::{ArgBuilder, ObjectBuilder, ValueBuilder, VoidBuilder};
pub use config::{ContextProperty, MemberKinds, TypeOptions};
pub use context::{Context, PendingEndpoint};
pub use convert::{Marshal, RawPointer};
pub use dispatcher::{CallbackDispatcher, RESERVED_SLOT_COUNT};
pub use error::{BridgeError, BridgeResult, ConversionError, Direction};
pub use lifecycle::Ownership;
pub use namespace::{Namespace, NamespaceId};
pub use registry::{ConversionEntry, ConversionRegistry, Converter, TypeSupport};
pub use value::{
    BoundMember, CallableKey, ReceiverKey, ScriptCallable, ScriptFunction, ScriptValue,
};
pub use wrapper::{ConstructorDescriptor, MemberDescriptor, TypeKey, WrapperInstance, WrapperType};
