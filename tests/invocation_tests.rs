//! Member invocation through the trampoline and the attribute protocol.

mod common;

use std::sync::Arc;

use common::fixture;
use metabridge::{BridgeError, ScriptValue, call, get_attr, set_attr};

// =============================================================================
// Value conversion
// =============================================================================

#[test]
fn builtin_values_cross_the_native_boundary() {
    let f = fixture("Copier");
    let instance = f.ctx.construct(&f.ty, &[]).unwrap();

    let cases = [
        ("copyString", ScriptValue::from("hello"), ScriptValue::from("hello")),
        ("copyDouble", ScriptValue::Float(0.125), ScriptValue::Float(0.125)),
        ("copyFloat", ScriptValue::Float(1.5), ScriptValue::Float(1.5)),
        ("Add", ScriptValue::Int(-3), ScriptValue::Int(-3)),
    ];
    for (member, input, expected) in cases {
        let output = f
            .ctx
            .call_member(&instance, member, std::slice::from_ref(&input))
            .unwrap();
        assert_eq!(output, expected, "{member}");
    }
}

#[test]
fn wrong_argument_type_is_a_conversion_error() {
    let f = fixture("Copier");
    let instance = f.ctx.construct(&f.ty, &[]).unwrap();
    let err = f
        .ctx
        .call_member(&instance, "copyString", &[ScriptValue::Int(1)])
        .unwrap_err();
    assert!(matches!(err, BridgeError::Conversion(_)));
    assert_eq!(f.class.invoked(), 0);
}

// =============================================================================
// Argument counts and overloads
// =============================================================================

#[test]
fn too_many_arguments() {
    let f = fixture("Counter");
    let instance = f.ctx.construct(&f.ty, &[]).unwrap();
    let err = f
        .ctx
        .call_member(&instance, "GetValue", &[ScriptValue::Int(1)])
        .unwrap_err();
    assert_eq!(
        err,
        BridgeError::ArgumentCountMismatch {
            member: "Counter::GetValue".into(),
            expected: 0,
            provided: 1,
        }
    );
}

#[test]
fn missing_trailing_arguments_are_zeroed() {
    let f = fixture("Counter");
    let instance = f.ctx.construct(&f.ty, &[]).unwrap();
    f.ctx
        .call_member(&instance, "SetValue", &[ScriptValue::Int(9)])
        .unwrap();
    f.ctx.call_member(&instance, "SetValue", &[]).unwrap();
    assert_eq!(
        f.ctx.call_member(&instance, "GetValue", &[]).unwrap(),
        ScriptValue::Int(0)
    );
}

#[test]
fn overloads_are_selected_by_arity() {
    let f = fixture("Adder");
    let instance = f.ctx.construct(&f.ty, &[ScriptValue::Int(10), ScriptValue::Int(0), ScriptValue::Int(0)]).unwrap();

    let one = f
        .ctx
        .call_member(&instance, "Add", &[ScriptValue::Int(5)])
        .unwrap();
    let two = f
        .ctx
        .call_member(&instance, "Add", &[ScriptValue::Int(2), ScriptValue::Int(3)])
        .unwrap();

    assert_eq!(one, ScriptValue::Int(15));
    assert_eq!(two, ScriptValue::Int(5));
}

#[test]
fn unknown_member() {
    let f = fixture("Counter");
    let instance = f.ctx.construct(&f.ty, &[]).unwrap();
    let err = f.ctx.call_member(&instance, "Missing", &[]).unwrap_err();
    assert_eq!(err, BridgeError::MethodNotFound("Counter::Missing".into()));
}

// =============================================================================
// Return values
// =============================================================================

#[test]
fn object_return_is_foreign_owned_with_receiver_type() {
    let f = fixture("Node");
    let instance = f.ctx.construct(&f.ty, &[]).unwrap();

    let result = f.ctx.call_member(&instance, "Self", &[]).unwrap();

    let returned = result.as_object().expect("object result");
    assert!(returned.is_foreign_owned());
    assert!(Arc::ptr_eq(returned.wrapper_type(), instance.wrapper_type()));
    assert_eq!(returned.object_id(), instance.object_id());
    assert!(!Arc::ptr_eq(returned, &instance));
}

#[test]
fn null_object_return_is_none() {
    let f = fixture("Node");
    let instance = f.ctx.construct(&f.ty, &[]).unwrap();
    assert_eq!(
        f.ctx.call_member(&instance, "Null", &[]).unwrap(),
        ScriptValue::None
    );
}

#[test]
fn native_errors_become_script_errors() {
    let f = fixture("Faulty");
    let instance = f.ctx.construct(&f.ty, &[]).unwrap();
    let err = f.ctx.call_member(&instance, "Fail", &[]).unwrap_err();
    assert_eq!(
        err,
        BridgeError::NativeInvocationFailure("failure requested".into())
    );
    assert_eq!(err.to_string(), "failure requested");
}

// =============================================================================
// Attribute protocol
// =============================================================================

#[test]
fn member_lookup_then_call() {
    let f = fixture("Counter");
    let instance = f.ctx.construct(&f.ty, &[]).unwrap();

    let setter = get_attr(&f.ctx, &instance, "SetValue").unwrap();
    call(&f.ctx, &setter, &[ScriptValue::Int(4)]).unwrap();
    let getter = get_attr(&f.ctx, &instance, "GetValue").unwrap();

    assert_eq!(call(&f.ctx, &getter, &[]).unwrap(), ScriptValue::Int(4));
}

#[test]
fn calling_a_type_constructs() {
    let f = fixture("Counter");
    let args = [ScriptValue::Int(1), ScriptValue::Int(1), ScriptValue::Int(1)];
    let created = call(&f.ctx, &ScriptValue::Type(f.ty.clone()), &args).unwrap();
    let instance = created.as_object().unwrap();
    assert!(!instance.is_foreign_owned());
    assert_eq!(
        f.ctx.call_member(instance, "GetValue", &[]).unwrap(),
        ScriptValue::Int(3)
    );
}

#[test]
fn plain_values_are_not_callable() {
    let f = fixture("Counter");
    let err = call(&f.ctx, &ScriptValue::Int(1), &[]).unwrap_err();
    assert_eq!(err, BridgeError::NotCallable("int".into()));
}

#[test]
fn members_are_read_only() {
    let f = fixture("Counter");
    let instance = f.ctx.construct(&f.ty, &[]).unwrap();
    let err = set_attr(&f.ctx, &instance, "GetValue", ScriptValue::Int(1)).unwrap_err();
    assert_eq!(
        err,
        BridgeError::InvalidArguments("members are read-only".into())
    );
}

#[test]
fn member_lookups_do_not_interfere() {
    let f = fixture("Counter");
    let a = f.ctx.construct(&f.ty, &[]).unwrap();
    let b = f.ctx.construct(&f.ty, &[]).unwrap();

    let set_a = get_attr(&f.ctx, &a, "SetValue").unwrap();
    let set_b = get_attr(&f.ctx, &b, "SetValue").unwrap();
    call(&f.ctx, &set_a, &[ScriptValue::Int(1)]).unwrap();
    call(&f.ctx, &set_b, &[ScriptValue::Int(2)]).unwrap();

    assert_eq!(f.ctx.call_member(&a, "GetValue", &[]).unwrap(), ScriptValue::Int(1));
    assert_eq!(f.ctx.call_member(&b, "GetValue", &[]).unwrap(), ScriptValue::Int(2));
}
