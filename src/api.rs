//! Module-level functions exposed to the scripting runtime.
//!
//! | function           | arguments                                   |
//! |--------------------|---------------------------------------------|
//! | `acquire`          | instance                                    |
//! | `release`          | instance                                    |
//! | `is_native_object` | any value                                   |
//! | `is_foreign_owned` | instance                                    |
//! | `native_pointer`   | instance                                    |
//! | `connect`          | see below                                   |
//! | `disconnect`       | mirrors `connect`                           |
//!
//! `connect` accepts three shapes:
//!
//! - `(source, signal, callable)` routes the signal to a scripting callable
//! - `(source, signal, target, member)` links two native objects directly
//! - `(source.signal, target)` uses the member values read from the objects;
//!   `target` is a callable or another member. Member accesses are also
//!   recorded in the pending endpoint register, which is drained by the call
//!
//! `signal` and `member` may be a member name or a full signature.

use std::sync::Arc;

use tracing::debug;

use crate::context::{Context, PendingEndpoint};
use crate::error::{BridgeError, BridgeResult};
use crate::lifecycle;
use crate::trampoline;
use crate::value::{BoundMember, ScriptCallable, ScriptValue};
use crate::wrapper::{MemberDescriptor, WrapperInstance};

/// Signature of a module-level function.
pub type ModuleFn = fn(&Context, &[ScriptValue]) -> BridgeResult<ScriptValue>;

/// Entry of [`MODULE_FUNCTIONS`].
#[derive(Debug, Clone, Copy)]
pub struct ModuleFunction {
    pub name: &'static str,
    pub doc: &'static str,
    pub call: ModuleFn,
}

/// Functions installed in the scripting runtime, in registration order.
pub static MODULE_FUNCTIONS: &[ModuleFunction] = &[
    ModuleFunction {
        name: "acquire",
        doc: "Transfer ownership of the native object to the script runtime.",
        call: acquire,
    },
    ModuleFunction {
        name: "release",
        doc: "Transfer ownership of the native object to native code.",
        call: release,
    },
    ModuleFunction {
        name: "is_native_object",
        doc: "Check if a value wraps a native object.",
        call: is_native_object,
    },
    ModuleFunction {
        name: "is_foreign_owned",
        doc: "Check if native code owns the wrapped object.",
        call: is_foreign_owned,
    },
    ModuleFunction {
        name: "native_pointer",
        doc: "Address of the wrapped native object.",
        call: native_pointer,
    },
    ModuleFunction {
        name: "connect",
        doc: "Connect a signal to a callable or to a member of another object.",
        call: connect,
    },
    ModuleFunction {
        name: "disconnect",
        doc: "Disconnect a signal previously connected with connect().",
        call: disconnect,
    },
];

pub fn find_function(name: &str) -> Option<&'static ModuleFunction> {
    MODULE_FUNCTIONS.iter().find(|f| f.name == name)
}

// ============================================================================
// Attribute protocol
// ============================================================================

/// Look up member `name` on `instance`.
///
/// Signal accesses are recorded as pending endpoints, as is any access
/// made while the register is non-empty, so a following two-argument
/// `connect` can see both ends.
pub fn get_attr(
    ctx: &Context,
    instance: &Arc<WrapperInstance>,
    name: &str,
) -> BridgeResult<ScriptValue> {
    let member = resolve_member(instance, name)?;
    if member.is_signal() || ctx.pending_endpoints() > 0 {
        ctx.push_endpoint(PendingEndpoint {
            instance: instance.clone(),
            method: member.index,
        });
    }
    Ok(ScriptValue::Member(BoundMember {
        instance: instance.clone(),
        name: member.name.clone(),
    }))
}

/// Members are read-only.
pub fn set_attr(
    _ctx: &Context,
    _instance: &Arc<WrapperInstance>,
    _name: &str,
    _value: ScriptValue,
) -> BridgeResult<()> {
    Err(BridgeError::invalid_arguments("members are read-only"))
}

/// Call a script value: a member, a callable, or a wrapper type.
pub fn call(ctx: &Context, callee: &ScriptValue, args: &[ScriptValue]) -> BridgeResult<ScriptValue> {
    let _interpreter = ctx.interpreter_lock();
    match callee {
        ScriptValue::Member(member) => {
            ctx.clear_endpoints();
            trampoline::call_member(ctx, &member.instance, &member.name, args)
        }
        ScriptValue::Callable(callable) => callable.call(args),
        ScriptValue::Type(ty) => trampoline::construct(ctx, ty, args).map(ScriptValue::Object),
        other => Err(BridgeError::NotCallable(other.type_name().to_string())),
    }
}

// ============================================================================
// Ownership
// ============================================================================

fn acquire(_ctx: &Context, args: &[ScriptValue]) -> BridgeResult<ScriptValue> {
    lifecycle::acquire(single_instance("acquire", args)?);
    Ok(ScriptValue::None)
}

fn release(_ctx: &Context, args: &[ScriptValue]) -> BridgeResult<ScriptValue> {
    lifecycle::release(single_instance("release", args)?);
    Ok(ScriptValue::None)
}

fn is_native_object(_ctx: &Context, args: &[ScriptValue]) -> BridgeResult<ScriptValue> {
    match args {
        [value] => Ok(ScriptValue::Bool(value.as_object().is_some())),
        _ => Err(arity_error("is_native_object", "1", args.len())),
    }
}

fn is_foreign_owned(_ctx: &Context, args: &[ScriptValue]) -> BridgeResult<ScriptValue> {
    let instance = single_instance("is_foreign_owned", args)?;
    Ok(ScriptValue::Bool(instance.is_foreign_owned()))
}

fn native_pointer(_ctx: &Context, args: &[ScriptValue]) -> BridgeResult<ScriptValue> {
    let instance = single_instance("native_pointer", args)?;
    let address = instance.object_id().address();
    i64::try_from(address).map(ScriptValue::Int).map_err(|_| {
        BridgeError::invalid_arguments(format!("native pointer {address:#x} does not fit in an int"))
    })
}

// ============================================================================
// Connections
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wire {
    Connect,
    Disconnect,
}

fn connect(ctx: &Context, args: &[ScriptValue]) -> BridgeResult<ScriptValue> {
    wire(ctx, Wire::Connect, args)
}

fn disconnect(ctx: &Context, args: &[ScriptValue]) -> BridgeResult<ScriptValue> {
    wire(ctx, Wire::Disconnect, args)
}

fn wire(ctx: &Context, wire: Wire, args: &[ScriptValue]) -> BridgeResult<ScriptValue> {
    let connected = match args {
        [source, target] => shorthand(ctx, wire, source, target)?,
        [source, signal, target] => {
            let source = instance_arg(source)?;
            let signal = resolve_member(source, str_arg(signal)?)?;
            let target = callable_arg(target)?;
            to_callable(ctx, wire, source, signal, target)?
        }
        [source, signal, target, member] => {
            let source = instance_arg(source)?;
            let signal = resolve_member(source, str_arg(signal)?)?;
            let target = instance_arg(target)?;
            let member = resolve_member(target, str_arg(member)?)?;
            to_native(ctx, wire, source, signal, target, member)
        }
        _ => {
            let name = match wire {
                Wire::Connect => "connect",
                Wire::Disconnect => "disconnect",
            };
            return Err(arity_error(name, "2, 3 or 4", args.len()));
        }
    };
    Ok(ScriptValue::Bool(connected))
}

/// Two-argument form. The pending endpoint register is drained whatever
/// the outcome.
fn shorthand(
    ctx: &Context,
    wire: Wire,
    source: &ScriptValue,
    target: &ScriptValue,
) -> BridgeResult<bool> {
    let endpoints = EndpointGuard { ctx };
    match target {
        ScriptValue::Callable(callable) => {
            let (instance, signal) = endpoints.endpoint(source)?;
            to_callable(ctx, wire, &instance, &signal, callable.clone())
        }
        ScriptValue::Member(_) => {
            let (target, member) = endpoints.endpoint(target)?;
            let (source, signal) = endpoints.endpoint(source)?;
            Ok(to_native(ctx, wire, &source, &signal, &target, &member))
        }
        other => Err(BridgeError::invalid_arguments(format!(
            "cannot connect to a {} value",
            other.type_name()
        ))),
    }
}

fn to_callable(
    ctx: &Context,
    wire: Wire,
    source: &WrapperInstance,
    signal: &MemberDescriptor,
    target: ScriptCallable,
) -> BridgeResult<bool> {
    let dispatcher = ctx.dispatcher();
    match wire {
        Wire::Connect => dispatcher.connect(ctx, source, signal, target),
        Wire::Disconnect => Ok(dispatcher.disconnect(ctx, source, signal, &target)),
    }
}

fn to_native(
    ctx: &Context,
    wire: Wire,
    source: &WrapperInstance,
    signal: &MemberDescriptor,
    target: &WrapperInstance,
    member: &MemberDescriptor,
) -> bool {
    debug!(
        target: "metabridge::dispatch",
        ?wire,
        signal = %signal.signature,
        member = %member.signature,
        "native link"
    );
    let events = ctx.events();
    match wire {
        Wire::Connect => events.connect(source.object(), signal.index, target.object(), member.index),
        Wire::Disconnect => {
            events.disconnect(source.object(), signal.index, target.object(), member.index)
        }
    }
}

/// Clears the pending endpoint register when dropped.
struct EndpointGuard<'a> {
    ctx: &'a Context,
}

impl EndpointGuard<'_> {
    /// Endpoint named by `value`.
    ///
    /// A member value takes its own pending access, which records the exact
    /// overload that was read, and resolves by name if there is none. Any
    /// other value takes the most recent pending access.
    fn endpoint(
        &self,
        value: &ScriptValue,
    ) -> BridgeResult<(Arc<WrapperInstance>, MemberDescriptor)> {
        if let ScriptValue::Member(bound) = value {
            let ty = bound.instance.wrapper_type();
            let pending = self.ctx.take_endpoint(|endpoint| {
                Arc::ptr_eq(&endpoint.instance, &bound.instance)
                    && ty
                        .member_by_index(endpoint.method)
                        .is_some_and(|member| member.name == bound.name)
            });
            let member = match pending.and_then(|endpoint| ty.member_by_index(endpoint.method)) {
                Some(member) => member.clone(),
                None => resolve_member(&bound.instance, &bound.name)?.clone(),
            };
            return Ok((bound.instance.clone(), member));
        }

        let endpoint = self.ctx.pop_endpoint().ok_or_else(|| {
            BridgeError::invalid_arguments(format!("expected a member, got {}", value.type_name()))
        })?;
        let ty = endpoint.instance.wrapper_type();
        let member = ty
            .member_by_index(endpoint.method)
            .cloned()
            .ok_or_else(|| BridgeError::MethodNotFound(format!("{}::#{}", ty.name(), endpoint.method)))?;
        Ok((endpoint.instance, member))
    }
}

impl Drop for EndpointGuard<'_> {
    fn drop(&mut self) {
        self.ctx.clear_endpoints();
    }
}

// ============================================================================
// Argument helpers
// ============================================================================

fn resolve_member<'a>(
    instance: &'a WrapperInstance,
    member: &str,
) -> BridgeResult<&'a MemberDescriptor> {
    let ty = instance.wrapper_type();
    ty.resolve(member)
        .ok_or_else(|| BridgeError::MethodNotFound(format!("{}::{}", ty.name(), member)))
}

fn single_instance<'a>(
    function: &str,
    args: &'a [ScriptValue],
) -> BridgeResult<&'a Arc<WrapperInstance>> {
    match args {
        [value] => instance_arg(value),
        _ => Err(arity_error(function, "1", args.len())),
    }
}

fn instance_arg(value: &ScriptValue) -> BridgeResult<&Arc<WrapperInstance>> {
    value
        .as_object()
        .ok_or(BridgeError::NotAWrapperInstance(value.type_name()))
}

fn str_arg(value: &ScriptValue) -> BridgeResult<&str> {
    value.as_str().ok_or_else(|| {
        BridgeError::invalid_arguments(format!("expected a member name, got {}", value.type_name()))
    })
}

fn callable_arg(value: &ScriptValue) -> BridgeResult<ScriptCallable> {
    match value {
        ScriptValue::Callable(callable) => Ok(callable.clone()),
        other => Err(BridgeError::NotCallable(other.type_name().to_string())),
    }
}

fn arity_error(function: &str, expected: &str, provided: usize) -> BridgeError {
    BridgeError::invalid_arguments(format!(
        "{function}() takes {expected} arguments, {provided} provided"
    ))
}
