//! Bridge context.
//!
//! The context owns every piece of shared state: the conversion registry,
//! the wrapper type cache, the callback dispatcher, the pending endpoint
//! register and the interpreter lock.
//!
//! # Thread safety
//!
//! Registration (`register`, `add_type`, `add_object`) is expected to happen
//! during setup; after that the registry and type cache are only read.
//! Registering while calls are in flight is unsupported and the caller must
//! synchronize. Script-facing calls and native event delivery all hold the
//! interpreter lock, which is reentrant so that native code may emit a
//! signal synchronously from within a scripted call.

use std::sync::Arc;

use metabridge_core::{ClassId, EventSystem, MetaObject, NativeObjectRef, TypeName};
use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard, RwLock, RwLockReadGuard};
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::api;
use crate::config::{ContextProperty, TypeOptions};
use crate::convert::Marshal;
use crate::dispatcher::CallbackDispatcher;
use crate::error::{BridgeError, BridgeResult};
use crate::namespace::Namespace;
use crate::registry::{ConversionRegistry, Converter, TypeSupport};
use crate::trampoline;
use crate::value::ScriptValue;
use crate::wrapper::{TypeKey, WrapperInstance, WrapperType};

/// A member access recorded for the two-argument connect shorthand.
#[derive(Debug, Clone)]
pub struct PendingEndpoint {
    pub instance: Arc<WrapperInstance>,
    /// Native method index of the accessed member.
    pub method: usize,
}

/// Shared state of one bridge between a native framework and a script
/// runtime.
pub struct Context {
    registry: RwLock<ConversionRegistry>,
    types: RwLock<FxHashMap<TypeKey, Arc<WrapperType>>>,
    properties: RwLock<FxHashMap<ContextProperty, usize>>,
    dispatcher: Arc<CallbackDispatcher>,
    events: Arc<dyn EventSystem>,
    interpreter: ReentrantMutex<()>,
    endpoints: Mutex<Vec<PendingEndpoint>>,
}

impl Context {
    /// Create a context with the builtin conversions.
    pub fn new(events: Arc<dyn EventSystem>) -> Arc<Self> {
        Self::with_registry(events, ConversionRegistry::with_defaults())
    }

    pub fn with_registry(events: Arc<dyn EventSystem>, registry: ConversionRegistry) -> Arc<Self> {
        Arc::new_cyclic(|context| Self {
            registry: RwLock::new(registry),
            types: RwLock::new(FxHashMap::default()),
            properties: RwLock::new(FxHashMap::default()),
            dispatcher: Arc::new(CallbackDispatcher::new(context.clone())),
            events,
            interpreter: ReentrantMutex::new(()),
            endpoints: Mutex::new(Vec::new()),
        })
    }

    // ========================================================================
    // Properties
    // ========================================================================

    pub fn property(&self, property: ContextProperty) -> usize {
        self.properties
            .read()
            .get(&property)
            .copied()
            .unwrap_or_else(|| property.default_value())
    }

    pub fn set_property(&self, property: ContextProperty, value: usize) {
        self.properties.write().insert(property, value);
    }

    // ========================================================================
    // Conversion registry
    // ========================================================================

    /// Read access to the conversion registry.
    pub fn registry(&self) -> RwLockReadGuard<'_, ConversionRegistry> {
        self.registry.read()
    }

    /// See [`ConversionRegistry::register`].
    pub fn register(
        &self,
        type_name: impl Into<TypeName>,
        to_native: Converter,
        to_script: Converter,
        overwrite: bool,
    ) -> bool {
        self.registry
            .write()
            .register(type_name.into(), to_native, to_script, overwrite)
    }

    pub fn register_value<T: Marshal>(&self, overwrite: bool) -> bool {
        self.registry.write().register_value::<T>(overwrite)
    }

    pub fn unregister(&self, type_name: &str) -> bool {
        self.registry.write().unregister(type_name)
    }

    pub fn registered_types(&self) -> Vec<TypeSupport> {
        self.registry.read().registered_types()
    }

    pub fn type_support(&self, type_name: &str) -> Option<TypeSupport> {
        self.registry.read().type_support(type_name)
    }

    // ========================================================================
    // Wrapper types
    // ========================================================================

    /// Get or create the wrapper type for `meta` in `namespace`.
    ///
    /// Idempotent per (class, namespace): a second call returns the cached
    /// `Arc`. A new type is bound into `namespace` under its script name; if
    /// that fails the type is dropped from the cache again.
    pub fn add_type(
        &self,
        meta: &'static dyn MetaObject,
        namespace: &Arc<Namespace>,
        options: &TypeOptions,
    ) -> BridgeResult<Arc<WrapperType>> {
        let key = TypeKey {
            class: ClassId::of(meta),
            namespace: namespace.id(),
        };
        if let Some(ty) = self.cached(&key, namespace) {
            return Ok(ty);
        }

        let check_constructor = options
            .check_constructor
            .unwrap_or(self.property(ContextProperty::CheckConstructors) != 0);
        let ty = Arc::new(WrapperType::build(
            &self.registry(),
            meta,
            namespace.clone(),
            options,
            check_constructor,
            self.property(ContextProperty::MaxGenericArguments),
            self.property(ContextProperty::QualifiedTypeNames) != 0,
        )?);

        {
            let mut types = self.types.write();
            if let Some(existing) = types.get(&key).filter(|t| hosted_by(t, namespace)) {
                return Ok(existing.clone());
            }
            // Replaces any entry left behind by a dropped namespace.
            types.insert(key, ty.clone());
        }

        if let Err(err) = namespace.bind(ty.name(), ScriptValue::Type(ty.clone())) {
            self.types.write().remove(&key);
            warn!(
                target: "metabridge::types",
                class = meta.class_name(),
                namespace = namespace.name(),
                %err,
                "type registration rolled back"
            );
            return Err(err);
        }

        debug!(
            target: "metabridge::types",
            class = meta.class_name(),
            full_name = ty.full_name(),
            "registered type"
        );
        Ok(ty)
    }

    /// Cached wrapper type for `meta` in `namespace`, if registered.
    pub fn cached_type(
        &self,
        meta: &'static dyn MetaObject,
        namespace: &Namespace,
    ) -> Option<Arc<WrapperType>> {
        let key = TypeKey {
            class: ClassId::of(meta),
            namespace: namespace.id(),
        };
        self.cached(&key, namespace)
    }

    fn cached(&self, key: &TypeKey, namespace: &Namespace) -> Option<Arc<WrapperType>> {
        self.types
            .read()
            .get(key)
            .filter(|ty| hosted_by(ty, namespace))
            .cloned()
    }

    /// Wrap an existing native object.
    ///
    /// The object's class is registered in `type_namespace` without a
    /// constructor check. With `instance_name`, the new instance is bound
    /// into `target` under that name.
    pub fn add_object(
        &self,
        object: NativeObjectRef,
        target: &Arc<Namespace>,
        type_namespace: &Arc<Namespace>,
        instance_name: Option<&str>,
        script_owned: bool,
    ) -> BridgeResult<Arc<WrapperInstance>> {
        let ty = self.add_type(object.meta_object(), type_namespace, &TypeOptions::unchecked())?;
        let instance = WrapperInstance::new(object, ty, script_owned);
        if let Some(name) = instance_name {
            if let Err(err) = target.bind(name, ScriptValue::Object(instance.clone())) {
                // Ownership stays with the caller.
                instance.set_foreign_owned(true);
                return Err(err);
            }
        }
        Ok(instance)
    }

    // ========================================================================
    // Calls
    // ========================================================================

    /// Construct an instance of `ty`.
    pub fn construct(
        &self,
        ty: &Arc<WrapperType>,
        args: &[ScriptValue],
    ) -> BridgeResult<Arc<WrapperInstance>> {
        let _interpreter = self.interpreter_lock();
        trampoline::construct(self, ty, args)
    }

    /// Call member `name` of `instance`.
    pub fn call_member(
        &self,
        instance: &Arc<WrapperInstance>,
        name: &str,
        args: &[ScriptValue],
    ) -> BridgeResult<ScriptValue> {
        let _interpreter = self.interpreter_lock();
        self.clear_endpoints();
        trampoline::call_member(self, instance, name, args)
    }

    /// Call a module-level function by name.
    pub fn call_function(&self, name: &str, args: &[ScriptValue]) -> BridgeResult<ScriptValue> {
        let function =
            api::find_function(name).ok_or_else(|| BridgeError::NotCallable(name.to_string()))?;
        let _interpreter = self.interpreter_lock();
        (function.call)(self, args)
    }

    // ========================================================================
    // Shared state
    // ========================================================================

    pub fn dispatcher(&self) -> &Arc<CallbackDispatcher> {
        &self.dispatcher
    }

    /// The dispatcher as a native event receiver.
    pub(crate) fn dispatcher_object(&self) -> NativeObjectRef {
        self.dispatcher.clone()
    }

    pub fn events(&self) -> &Arc<dyn EventSystem> {
        &self.events
    }

    /// Take the interpreter lock. Reentrant on the same thread.
    pub fn interpreter_lock(&self) -> ReentrantMutexGuard<'_, ()> {
        self.interpreter.lock()
    }

    pub(crate) fn push_endpoint(&self, endpoint: PendingEndpoint) {
        self.endpoints.lock().push(endpoint);
    }

    pub(crate) fn pop_endpoint(&self) -> Option<PendingEndpoint> {
        self.endpoints.lock().pop()
    }

    /// Remove the most recent endpoint accepted by `matches`.
    pub(crate) fn take_endpoint(
        &self,
        matches: impl Fn(&PendingEndpoint) -> bool,
    ) -> Option<PendingEndpoint> {
        let mut endpoints = self.endpoints.lock();
        let position = endpoints.iter().rposition(matches)?;
        Some(endpoints.remove(position))
    }

    pub(crate) fn clear_endpoints(&self) {
        let drained = std::mem::take(&mut *self.endpoints.lock());
        drop(drained);
    }

    /// Number of member accesses waiting for a connect or disconnect.
    pub fn pending_endpoints(&self) -> usize {
        self.endpoints.lock().len()
    }
}

/// Namespace ids are addresses, so a cached type only matches while its
/// own namespace is still alive.
fn hosted_by(ty: &WrapperType, namespace: &Namespace) -> bool {
    ty.namespace()
        .is_some_and(|hosting| std::ptr::eq(Arc::as_ptr(&hosting), namespace))
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("types", &self.types.read().len())
            .field("proxy_slots", &self.dispatcher.slot_count())
            .finish_non_exhaustive()
    }
}
