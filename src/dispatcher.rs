//! Native event delivery into scripting callables.
//!
//! The dispatcher is itself a native object. Each connection of a scripting
//! callable to a signal allocates a proxy slot in its table, and the native
//! event system is told to deliver the signal to the dispatcher's method at
//! `slot index + RESERVED_SLOT_COUNT`. Delivery subtracts the same offset.
//!
//! Slots are never removed. Disconnecting marks a slot inert and releases
//! its callable, so indices already handed to the event system stay valid.
//!
//! Live slots are looked up by source address. A slot also holds its source
//! weakly and only matches while that object is alive; once it is gone the
//! address may belong to another object, and the stale slot is retired.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, LazyLock, Weak};

use metabridge_core::{
    ConstructorInfo, GenericArgument, MetaObject, MethodInfo, MethodKind, NativeError,
    NativeObject, NativeObjectRef, ObjectId, TypeName,
};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{debug, error, warn};

use crate::context::Context;
use crate::error::{BridgeError, BridgeResult};
use crate::namespace::Namespace;
use crate::value::{CallableKey, ScriptCallable, ScriptValue};
use crate::wrapper::{MemberDescriptor, WrapperInstance};

/// Methods the native framework reserves ahead of the proxy slots.
pub const RESERVED_SLOT_COUNT: usize = 1;

static DISPATCHER_META: LazyLock<DispatcherMeta> = LazyLock::new(|| DispatcherMeta {
    methods: vec![MethodInfo::new(
        "destroyed()",
        Vec::new(),
        TypeName::VOID,
        MethodKind::Signal,
    )],
});

const NO_CONSTRUCTORS: &[ConstructorInfo] = &[];

struct DispatcherMeta {
    methods: Vec<MethodInfo>,
}

impl MetaObject for DispatcherMeta {
    fn class_name(&self) -> &str {
        "CallbackDispatcher"
    }

    fn constructors(&self) -> &[ConstructorInfo] {
        NO_CONSTRUCTORS
    }

    fn methods(&self) -> &[MethodInfo] {
        &self.methods
    }

    fn construct(
        &self,
        index: usize,
        _args: &mut [GenericArgument<'_>],
    ) -> Result<NativeObjectRef, NativeError> {
        Err(NativeError::NoSuchConstructor(index))
    }

    fn invoke(
        &self,
        _object: &dyn NativeObject,
        index: usize,
        _ret: Option<&mut GenericArgument<'_>>,
        _args: &mut [GenericArgument<'_>],
    ) -> Result<(), NativeError> {
        if index < RESERVED_SLOT_COUNT {
            Ok(())
        } else {
            Err(NativeError::NoSuchMethod(index))
        }
    }
}

enum SlotState {
    Connected(ScriptCallable),
    Inert,
}

struct ProxySlot {
    state: SlotState,
    source: Weak<dyn NativeObject>,
    parameter_types: Vec<TypeName>,
    /// Namespace used to wrap object parameters.
    namespace: Arc<Namespace>,
}

type SlotKey = (ObjectId, usize, CallableKey);

#[derive(Default)]
struct SlotTable {
    slots: Vec<ProxySlot>,
    live: FxHashMap<SlotKey, usize>,
}

impl SlotTable {
    /// Check the live slot for `key` against `source`.
    ///
    /// `Ok(index)` if it is connected to this very object. Otherwise any
    /// slot left under `key` by a dropped object is retired and its callable
    /// returned in `Err`, to be dropped outside the lock.
    fn live_slot(
        &mut self,
        key: &SlotKey,
        source: &NativeObjectRef,
    ) -> Result<usize, Option<(usize, ScriptCallable)>> {
        let Some(&index) = self.live.get(key) else {
            return Err(None);
        };
        let alive = self.slots[index]
            .source
            .upgrade()
            .is_some_and(|current| ObjectId::of(&current) == ObjectId::of(source));
        if alive {
            return Ok(index);
        }
        debug!(target: "metabridge::dispatch", slot = index, "retiring slot of dropped source");
        Err(self.retire(key))
    }

    /// Mark the slot for `key` inert. The released callable is returned so
    /// it is dropped outside the table lock.
    fn retire(&mut self, key: &SlotKey) -> Option<(usize, ScriptCallable)> {
        let index = self.live.remove(key)?;
        let slot = self.slots.get_mut(index)?;
        match std::mem::replace(&mut slot.state, SlotState::Inert) {
            SlotState::Connected(callable) => Some((index, callable)),
            SlotState::Inert => None,
        }
    }
}

/// Routes native signals to scripting callables through proxy slots.
pub struct CallbackDispatcher {
    context: Weak<Context>,
    table: Mutex<SlotTable>,
}

impl CallbackDispatcher {
    pub(crate) fn new(context: Weak<Context>) -> Self {
        Self {
            context,
            table: Mutex::new(SlotTable::default()),
        }
    }

    /// Connect `signal` of `source` to `target`.
    ///
    /// Connecting an already connected (source, signal, callable) triple
    /// reuses its slot and returns `true` without a second native connect.
    pub fn connect(
        &self,
        ctx: &Context,
        source: &WrapperInstance,
        signal: &MemberDescriptor,
        target: ScriptCallable,
    ) -> BridgeResult<bool> {
        {
            let registry = ctx.registry();
            for param in &signal.parameter_types {
                registry.script_builder(param)?;
            }
        }

        let ty = source.wrapper_type();
        let namespace = ty.namespace().ok_or_else(|| {
            BridgeError::Configuration(format!("namespace of type '{}' was dropped", ty.name()))
        })?;

        let key = (source.object_id(), signal.index, target.key());
        let (index, stale) = {
            let mut table = self.table.lock();
            let stale = match table.live_slot(&key, source.object()) {
                Ok(index) => {
                    debug!(
                        target: "metabridge::dispatch",
                        slot = index,
                        signal = %signal.signature,
                        "callable already connected"
                    );
                    return Ok(true);
                }
                Err(stale) => stale,
            };
            let index = table.slots.len();
            debug!(
                target: "metabridge::dispatch",
                slot = index,
                signal = %signal.signature,
                callable = target.name(),
                "connecting proxy slot"
            );
            table.slots.push(ProxySlot {
                state: SlotState::Connected(target),
                source: Arc::downgrade(source.object()),
                parameter_types: signal.parameter_types.clone(),
                namespace,
            });
            table.live.insert(key.clone(), index);
            (index, stale)
        };
        drop(stale);

        let receiver = ctx.dispatcher_object();
        let connected = ctx.events().connect(
            source.object(),
            signal.index,
            &receiver,
            index + RESERVED_SLOT_COUNT,
        );
        if !connected {
            warn!(
                target: "metabridge::dispatch",
                slot = index,
                signal = %signal.signature,
                "native connect refused"
            );
            drop(self.retire(&key));
        }
        Ok(connected)
    }

    /// Disconnect `target` from `signal` of `source`.
    ///
    /// Returns `false`, without touching the event system, if the triple
    /// was never connected.
    pub fn disconnect(
        &self,
        ctx: &Context,
        source: &WrapperInstance,
        signal: &MemberDescriptor,
        target: &ScriptCallable,
    ) -> bool {
        let key = (source.object_id(), signal.index, target.key());
        let found = {
            let mut table = self.table.lock();
            match table.live_slot(&key, source.object()) {
                Ok(_) => table.retire(&key),
                Err(stale) => {
                    drop(table);
                    drop(stale);
                    None
                }
            }
        };
        let Some((index, callable)) = found else {
            return false;
        };
        drop(callable);
        debug!(
            target: "metabridge::dispatch",
            slot = index,
            signal = %signal.signature,
            "disconnecting proxy slot"
        );
        let receiver = ctx.dispatcher_object();
        ctx.events().disconnect(
            source.object(),
            signal.index,
            &receiver,
            index + RESERVED_SLOT_COUNT,
        )
    }

    /// Number of slots ever allocated, inert ones included.
    pub fn slot_count(&self) -> usize {
        self.table.lock().slots.len()
    }

    /// Number of slots currently connected. A slot whose source was dropped
    /// counts until its key is reused.
    pub fn connected_count(&self) -> usize {
        self.table.lock().live.len()
    }

    /// Check if the slot at `index` is connected; `None` if unallocated.
    pub fn is_connected(&self, index: usize) -> Option<bool> {
        self.table
            .lock()
            .slots
            .get(index)
            .map(|slot| matches!(slot.state, SlotState::Connected(_)))
    }

    fn retire(&self, key: &SlotKey) -> Option<(usize, ScriptCallable)> {
        self.table.lock().retire(key)
    }

    /// Deliver a native event to the slot at `index`.
    ///
    /// Errors raised while converting parameters or by the callable, panics
    /// included, are logged and dropped; they never reach the native caller.
    fn deliver(&self, index: usize, args: &[&dyn Any]) {
        let Some(ctx) = self.context.upgrade() else {
            return;
        };
        let _interpreter = ctx.interpreter_lock();

        let (callable, parameter_types, namespace) = {
            let table = self.table.lock();
            match table.slots.get(index) {
                Some(ProxySlot {
                    state: SlotState::Connected(callable),
                    parameter_types,
                    namespace,
                    ..
                }) => (callable.clone(), parameter_types.clone(), namespace.clone()),
                _ => {
                    debug!(target: "metabridge::dispatch", slot = index, "event for inactive slot");
                    return;
                }
            }
        };

        let result = event_arguments(&ctx, &parameter_types, &namespace, args).and_then(|script_args| {
            panic::catch_unwind(AssertUnwindSafe(|| callable.call(&script_args)))
                .unwrap_or_else(|_| Err(BridgeError::raised("callable panicked")))
        });
        if let Err(err) = result {
            error!(
                target: "metabridge::dispatch",
                slot = index,
                callable = callable.name(),
                %err,
                "event delivery failed"
            );
        }
    }
}

fn event_arguments(
    ctx: &Context,
    parameter_types: &[TypeName],
    namespace: &Arc<Namespace>,
    raw: &[&dyn Any],
) -> BridgeResult<Vec<ScriptValue>> {
    parameter_types
        .iter()
        .enumerate()
        .map(|(i, ty)| {
            let value = raw.get(i).copied().ok_or_else(|| {
                BridgeError::invalid_arguments(format!(
                    "event carries {} of {} parameters",
                    raw.len(),
                    parameter_types.len()
                ))
            })?;
            let builder = ctx.registry().script_builder(ty)?;
            if builder.is_object_pointer() {
                return match builder.object_from_raw(value)? {
                    Some(object) => ctx
                        .add_object(object, namespace, namespace, None, false)
                        .map(ScriptValue::Object),
                    None => Ok(ScriptValue::None),
                };
            }
            Ok(builder.script_value_from_raw(value)?)
        })
        .collect()
}

impl NativeObject for CallbackDispatcher {
    fn meta_object(&self) -> &'static dyn MetaObject {
        &*DISPATCHER_META
    }

    fn meta_call(&self, index: usize, args: &[&dyn Any]) -> Result<(), NativeError> {
        if index >= RESERVED_SLOT_COUNT {
            self.deliver(index - RESERVED_SLOT_COUNT, args);
        }
        Ok(())
    }

    fn delete_later(&self) {}

    fn as_any(&self) -> &dyn Any {
        self
    }
}
