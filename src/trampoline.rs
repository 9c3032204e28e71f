//! Script-to-native calls.
//!
//! Every call clones fresh builders from the registry, converts the script
//! arguments into their slots, and invokes the native method or constructor
//! by index. Builder lookup happens before any native code runs, so an
//! unregistered type never reaches the native side.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use metabridge_core::{GenericArgument, NativeError};
use tracing::debug;

use crate::builders::ArgBuilder;
use crate::context::Context;
use crate::error::{BridgeError, BridgeResult};
use crate::value::ScriptValue;
use crate::wrapper::{MemberDescriptor, WrapperInstance, WrapperType};

/// Call `name` on `instance`, resolving the overload from the argument
/// count and invoking in one step.
pub fn call_member(
    ctx: &Context,
    instance: &Arc<WrapperInstance>,
    name: &str,
    args: &[ScriptValue],
) -> BridgeResult<ScriptValue> {
    let member = instance.wrapper_type().select_overload(name, args.len())?;
    invoke(ctx, instance, member, args)
}

/// Invoke `member` on `instance`.
///
/// Missing trailing arguments are passed as zero values. A returned object
/// pointer is wrapped in a new foreign-owned instance of the receiver's type.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn invoke(
    ctx: &Context,
    instance: &Arc<WrapperInstance>,
    member: &MemberDescriptor,
    args: &[ScriptValue],
) -> BridgeResult<ScriptValue> {
    let ty = instance.wrapper_type();
    if args.len() > member.parameter_count() {
        return Err(BridgeError::ArgumentCountMismatch {
            member: format!("{}::{}", ty.name(), member.name),
            expected: member.parameter_count(),
            provided: args.len(),
        });
    }

    let (mut params, mut ret) = {
        let registry = ctx.registry();
        let params = member
            .parameter_types
            .iter()
            .map(|param| registry.native_builder(param))
            .collect::<BridgeResult<Vec<_>>>()?;
        (params, registry.script_builder(&member.return_type)?)
    };

    {
        let mut slots = fill_slots(&mut params, args)?;
        let mut ret_slot = ret.return_arg();
        let ret_ref = if ret_slot.is_empty() {
            None
        } else {
            Some(&mut ret_slot)
        };
        let meta = ty.meta_object();
        let object = instance.object();
        call_native(|| meta.invoke(&**object, member.index, ret_ref, &mut slots))?;
    }

    if ret.is_object_pointer() {
        return Ok(match ret.returned_object() {
            Some(object) => ScriptValue::Object(WrapperInstance::new(object, ty.clone(), false)),
            None => ScriptValue::None,
        });
    }
    Ok(ret.script_value()?)
}

/// Construct a new script-owned instance of `ty`.
///
/// The first constructor whose arity equals the argument count is used;
/// parameter types play no part in the choice.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn construct(
    ctx: &Context,
    ty: &Arc<WrapperType>,
    args: &[ScriptValue],
) -> BridgeResult<Arc<WrapperInstance>> {
    let ctor = ty
        .constructors()
        .iter()
        .find(|c| c.parameter_types.len() == args.len())
        .ok_or_else(|| BridgeError::ConstructorNotFound {
            class: ty.name().to_string(),
            provided: args.len(),
        })?;

    let mut params = {
        let registry = ctx.registry();
        ctor.parameter_types
            .iter()
            .map(|param| registry.native_builder(param))
            .collect::<BridgeResult<Vec<_>>>()?
    };

    let object = {
        let mut slots = fill_slots(&mut params, args)?;
        call_native(|| ty.meta_object().construct(ctor.index, &mut slots))?
    };
    debug!(
        target: "metabridge::lifecycle",
        class = ty.name(),
        constructor = ctor.index,
        "constructed native object"
    );
    Ok(WrapperInstance::new(object, ty.clone(), true))
}

fn fill_slots<'b>(
    builders: &'b mut [Box<dyn ArgBuilder>],
    args: &[ScriptValue],
) -> BridgeResult<Vec<GenericArgument<'b>>> {
    builders
        .iter_mut()
        .enumerate()
        .map(|(i, builder)| match args.get(i) {
            Some(value) => builder.native_arg(value).map_err(BridgeError::from),
            None => Ok(builder.default_arg()),
        })
        .collect()
}

/// Run a native call, turning native errors and panics into
/// [`BridgeError::NativeInvocationFailure`].
pub(crate) fn call_native<T>(call: impl FnOnce() -> Result<T, NativeError>) -> BridgeResult<T> {
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(result) => result.map_err(|e| BridgeError::NativeInvocationFailure(e.to_string())),
        Err(_) => Err(BridgeError::NativeInvocationFailure(
            NativeError::Unknown.to_string(),
        )),
    }
}
