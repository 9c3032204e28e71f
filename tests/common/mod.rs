//! Mock reflective framework shared by the integration tests.
//!
//! - [`SignalRouter`]: synchronous [`EventSystem`] recording every connect
//!   and disconnect
//! - [`TestClass`]: a metaobject with a fixed method table and configurable
//!   constructors, leaked to `'static` per test
//! - [`TestObject`]: instance type holding one integer value

#![allow(dead_code)]

use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use metabridge::{
    BridgeError, ConstructorInfo, Context, EventSystem, GenericArgument, MetaObject, MethodInfo,
    MethodKind, Namespace, NativeError, NativeObject, NativeObjectRef, ObjectId, ScriptCallable,
    ScriptFunction, ScriptValue, TypeName, TypeOptions, WrapperType,
};
use parking_lot::Mutex;

// =============================================================================
// Method table
// =============================================================================

pub const DESTROYED: usize = 0;
pub const GET_VALUE: usize = 1;
pub const SET_VALUE: usize = 2;
pub const A_SIGNAL: usize = 3;
pub const COPY_STRING: usize = 4;
pub const COPY_FLOAT: usize = 5;
pub const COPY_DOUBLE: usize = 6;
pub const SELF: usize = 7;
pub const OBJECT_SIGNAL: usize = 8;
pub const CATCH_SIGNAL: usize = 9;
pub const SET_DEFAULT_VALUE: usize = 10;
pub const FAIL: usize = 11;
pub const NULL: usize = 12;
pub const ADD_ONE: usize = 13;
pub const ADD_TWO: usize = 14;

fn standard_methods() -> Vec<MethodInfo> {
    use MethodKind::{Signal, Slot};
    let int = || TypeName::INT;
    vec![
        MethodInfo::new("destroyed()", vec![], TypeName::VOID, Signal),
        MethodInfo::new("GetValue()", vec![], int(), Slot),
        MethodInfo::new("SetValue(int)", vec![int()], TypeName::VOID, Slot),
        MethodInfo::new("aSignal(int)", vec![int()], TypeName::VOID, Signal),
        MethodInfo::new("copyString(string)", vec![TypeName::STRING], TypeName::STRING, Slot),
        MethodInfo::new("copyFloat(float)", vec![TypeName::FLOAT], TypeName::FLOAT, Slot),
        MethodInfo::new("copyDouble(double)", vec![TypeName::DOUBLE], TypeName::DOUBLE, Slot),
        MethodInfo::new("Self()", vec![], TypeName::OBJECT, Slot),
        MethodInfo::new("objectSignal(object)", vec![TypeName::OBJECT], TypeName::VOID, Signal),
        MethodInfo::new("catchSignal(int)", vec![int()], TypeName::VOID, Slot),
        MethodInfo::new("SetDefaultValue()", vec![], TypeName::VOID, Slot),
        MethodInfo::new("Fail()", vec![], TypeName::VOID, Slot),
        MethodInfo::new("Null()", vec![], TypeName::OBJECT, Slot),
        MethodInfo::new("Add(int)", vec![int()], int(), Slot),
        MethodInfo::new("Add(int,int)", vec![int(), int()], int(), Slot),
    ]
}

// =============================================================================
// Event system
// =============================================================================

struct Connection {
    source: ObjectId,
    signal: usize,
    receiver: NativeObjectRef,
    method: usize,
}

/// Synchronous event system: `emit` calls every connected receiver on the
/// emitting thread.
#[derive(Default)]
pub struct SignalRouter {
    connections: Mutex<Vec<Connection>>,
    connects: AtomicUsize,
    disconnects: AtomicUsize,
}

impl SignalRouter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn emit(
        &self,
        source: &dyn NativeObject,
        signal: usize,
        args: &[&dyn Any],
    ) -> Result<(), NativeError> {
        let source = ObjectId::of_dyn(source);
        let targets: Vec<_> = self
            .connections
            .lock()
            .iter()
            .filter(|c| c.source == source && c.signal == signal)
            .map(|c| (c.receiver.clone(), c.method))
            .collect();
        for (receiver, method) in targets {
            receiver.meta_call(method, args)?;
        }
        Ok(())
    }

    /// Calls to `connect`, refused or not.
    pub fn connect_calls(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn disconnect_calls(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    /// Receiver method indices connected to `signal` of `source`.
    pub fn receivers(&self, source: &NativeObjectRef, signal: usize) -> Vec<usize> {
        let source = ObjectId::of(source);
        self.connections
            .lock()
            .iter()
            .filter(|c| c.source == source && c.signal == signal)
            .map(|c| c.method)
            .collect()
    }
}

impl EventSystem for SignalRouter {
    fn connect(
        &self,
        source: &NativeObjectRef,
        signal_index: usize,
        receiver: &NativeObjectRef,
        method_index: usize,
    ) -> bool {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.connections.lock().push(Connection {
            source: ObjectId::of(source),
            signal: signal_index,
            receiver: receiver.clone(),
            method: method_index,
        });
        true
    }

    fn disconnect(
        &self,
        source: &NativeObjectRef,
        signal_index: usize,
        receiver: &NativeObjectRef,
        method_index: usize,
    ) -> bool {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        let source = ObjectId::of(source);
        let receiver = ObjectId::of(receiver);
        let mut connections = self.connections.lock();
        match connections.iter().position(|c| {
            c.source == source
                && c.signal == signal_index
                && ObjectId::of(&c.receiver) == receiver
                && c.method == method_index
        }) {
            Some(pos) => {
                connections.remove(pos);
                true
            }
            None => false,
        }
    }
}

// =============================================================================
// Test class
// =============================================================================

/// Metaobject of the test class, with call counters.
pub struct TestClass {
    name: String,
    constructors: Vec<ConstructorInfo>,
    methods: Vec<MethodInfo>,
    router: Arc<SignalRouter>,
    this: OnceLock<&'static TestClass>,
    pub constructed: AtomicUsize,
    pub invoked: AtomicUsize,
    pub deleted: AtomicUsize,
}

impl TestClass {
    /// Class with a zero-argument and a three-`int` constructor.
    pub fn new(name: &str, router: &Arc<SignalRouter>) -> &'static TestClass {
        Self::with_constructors(
            name,
            router,
            vec![vec![], vec![TypeName::INT, TypeName::INT, TypeName::INT]],
        )
    }

    pub fn with_constructors(
        name: &str,
        router: &Arc<SignalRouter>,
        constructors: Vec<Vec<TypeName>>,
    ) -> &'static TestClass {
        Self::build(name, router, constructors, Vec::new())
    }

    /// Standard methods followed by `extra`.
    pub fn with_extra_methods(
        name: &str,
        router: &Arc<SignalRouter>,
        extra: Vec<MethodInfo>,
    ) -> &'static TestClass {
        Self::build(name, router, vec![vec![]], extra)
    }

    fn build(
        name: &str,
        router: &Arc<SignalRouter>,
        constructors: Vec<Vec<TypeName>>,
        extra: Vec<MethodInfo>,
    ) -> &'static TestClass {
        let mut methods = standard_methods();
        methods.extend(extra);
        let class: &'static TestClass = Box::leak(Box::new(TestClass {
            name: name.to_string(),
            constructors: constructors.into_iter().map(ConstructorInfo::new).collect(),
            methods,
            router: router.clone(),
            this: OnceLock::new(),
            constructed: AtomicUsize::new(0),
            invoked: AtomicUsize::new(0),
            deleted: AtomicUsize::new(0),
        }));
        let _ = class.this.set(class);
        class
    }

    /// Create an instance natively, bypassing the constructors.
    pub fn spawn(&'static self, value: i32) -> Arc<TestObject> {
        Arc::new_cyclic(|this| TestObject {
            class: self,
            value: Mutex::new(value),
            deleted: AtomicBool::new(false),
            this: this.clone(),
        })
    }

    pub fn constructed(&self) -> usize {
        self.constructed.load(Ordering::SeqCst)
    }

    pub fn invoked(&self) -> usize {
        self.invoked.load(Ordering::SeqCst)
    }

    pub fn deleted(&self) -> usize {
        self.deleted.load(Ordering::SeqCst)
    }
}

fn arg<'a, T: Any>(args: &'a [GenericArgument<'_>], index: usize) -> Result<&'a T, NativeError> {
    args.get(index)
        .ok_or(NativeError::MissingArgument(index))?
        .get::<T>()
}

fn write_ret<T: Any>(ret: Option<&mut GenericArgument<'_>>, value: T) -> Result<(), NativeError> {
    match ret {
        Some(slot) => slot.write(value),
        None => Ok(()),
    }
}

impl MetaObject for TestClass {
    fn class_name(&self) -> &str {
        &self.name
    }

    fn constructors(&self) -> &[ConstructorInfo] {
        &self.constructors
    }

    fn methods(&self) -> &[MethodInfo] {
        &self.methods
    }

    fn construct(
        &self,
        index: usize,
        args: &mut [GenericArgument<'_>],
    ) -> Result<NativeObjectRef, NativeError> {
        let ctor = self
            .constructors
            .get(index)
            .ok_or(NativeError::NoSuchConstructor(index))?;
        let mut value = 0;
        for i in 0..ctor.parameter_types.len() {
            value += *arg::<i32>(args, i)?;
        }
        self.constructed.fetch_add(1, Ordering::SeqCst);
        let class = self.this.get().ok_or(NativeError::Unknown)?;
        Ok(class.spawn(value))
    }

    fn invoke(
        &self,
        object: &dyn NativeObject,
        index: usize,
        ret: Option<&mut GenericArgument<'_>>,
        args: &mut [GenericArgument<'_>],
    ) -> Result<(), NativeError> {
        let object = object
            .as_any()
            .downcast_ref::<TestObject>()
            .ok_or_else(|| NativeError::exception("not a test object"))?;
        self.invoked.fetch_add(1, Ordering::SeqCst);
        match index {
            DESTROYED => self.router.emit(object, DESTROYED, &[]),
            GET_VALUE => write_ret(ret, object.value()),
            SET_VALUE | CATCH_SIGNAL => {
                object.set_value(*arg::<i32>(args, 0)?);
                Ok(())
            }
            A_SIGNAL => {
                let value = *arg::<i32>(args, 0)?;
                let raw: [&dyn Any; 1] = [&value];
                self.router.emit(object, A_SIGNAL, &raw)
            }
            COPY_STRING => write_ret(ret, arg::<String>(args, 0)?.clone()),
            COPY_FLOAT => write_ret(ret, *arg::<f32>(args, 0)?),
            COPY_DOUBLE => write_ret(ret, *arg::<f64>(args, 0)?),
            SELF => write_ret(ret, Some(object.handle())),
            OBJECT_SIGNAL => {
                let value = arg::<Option<NativeObjectRef>>(args, 0)?.clone();
                let raw: [&dyn Any; 1] = [&value];
                self.router.emit(object, OBJECT_SIGNAL, &raw)
            }
            SET_DEFAULT_VALUE => {
                object.set_value(0);
                Ok(())
            }
            FAIL => Err(NativeError::exception("failure requested")),
            NULL => write_ret::<Option<NativeObjectRef>>(ret, None),
            ADD_ONE => write_ret(ret, object.value() + *arg::<i32>(args, 0)?),
            ADD_TWO => write_ret(ret, *arg::<i32>(args, 0)? + *arg::<i32>(args, 1)?),
            _ => Err(NativeError::NoSuchMethod(index)),
        }
    }
}

// =============================================================================
// Test object
// =============================================================================

pub struct TestObject {
    class: &'static TestClass,
    value: Mutex<i32>,
    deleted: AtomicBool,
    this: Weak<TestObject>,
}

impl TestObject {
    pub fn value(&self) -> i32 {
        *self.value.lock()
    }

    pub fn set_value(&self, value: i32) {
        *self.value.lock() = value;
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted.load(Ordering::SeqCst)
    }

    fn handle(&self) -> NativeObjectRef {
        match self.this.upgrade() {
            Some(this) => this,
            None => unreachable!("object used after drop"),
        }
    }
}

impl NativeObject for TestObject {
    fn meta_object(&self) -> &'static dyn MetaObject {
        self.class
    }

    fn meta_call(&self, index: usize, args: &[&dyn Any]) -> Result<(), NativeError> {
        match index {
            CATCH_SIGNAL | SET_VALUE => {
                let value = args
                    .first()
                    .and_then(|a| a.downcast_ref::<i32>())
                    .ok_or(NativeError::MissingArgument(0))?;
                self.set_value(*value);
                Ok(())
            }
            _ => Err(NativeError::NoSuchMethod(index)),
        }
    }

    fn delete_later(&self) {
        self.deleted.store(true, Ordering::SeqCst);
        self.class.deleted.fetch_add(1, Ordering::SeqCst);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// A context with one registered test class.
pub struct Fixture {
    pub router: Arc<SignalRouter>,
    pub ctx: Arc<Context>,
    pub class: &'static TestClass,
    pub ns: Arc<Namespace>,
    pub ty: Arc<WrapperType>,
}

pub fn fixture(class_name: &str) -> Fixture {
    let router = SignalRouter::new();
    let ctx = Context::new(router.clone());
    let class = TestClass::new(class_name, &router);
    let ns = Namespace::new("app");
    let ty = ctx
        .add_type(class, &ns, &TypeOptions::default())
        .expect("test class registers");
    Fixture {
        router,
        ctx,
        class,
        ns,
        ty,
    }
}

/// Calls received by a recording callable.
pub type Calls = Arc<Mutex<Vec<Vec<ScriptValue>>>>;

/// A callable that records its arguments and returns none.
pub fn recorder(name: &str) -> (ScriptCallable, Calls) {
    let calls: Calls = Arc::default();
    let sink = calls.clone();
    let function = ScriptFunction::new(name, move |args| {
        sink.lock().push(args.to_vec());
        Ok(ScriptValue::None)
    });
    (ScriptCallable::function(function), calls)
}

/// A callable that always raises.
pub fn raising(name: &str) -> ScriptCallable {
    ScriptCallable::function(ScriptFunction::new(name, |_| {
        Err(BridgeError::raised("callback failed"))
    }))
}
