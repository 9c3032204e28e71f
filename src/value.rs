//! Scripting-side value model.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::BridgeResult;
use crate::wrapper::{WrapperInstance, WrapperType};

/// A value as seen by the scripting runtime.
///
/// Cloning is cheap: heap-backed variants share their payload.
#[derive(Clone, Default)]
pub enum ScriptValue {
    /// The script "none" value
    #[default]
    None,
    Bool(bool),
    /// Integer value (all native integer widths widen to i64)
    Int(i64),
    /// Floating point value (f32 and f64 both widen to f64)
    Float(f64),
    Str(String),
    /// Handle to a native object
    Object(Arc<WrapperInstance>),
    /// A generated wrapper type; calling it constructs an instance
    Type(Arc<WrapperType>),
    /// A member looked up on a wrapper instance
    Member(BoundMember),
    Callable(ScriptCallable),
    /// Any other scripting value, compared by identity
    Opaque(Arc<dyn Any + Send + Sync>),
}

impl ScriptValue {
    /// Get a human-readable name for this value's type.
    pub fn type_name(&self) -> &'static str {
        match self {
            ScriptValue::None => "none",
            ScriptValue::Bool(_) => "bool",
            ScriptValue::Int(_) => "int",
            ScriptValue::Float(_) => "float",
            ScriptValue::Str(_) => "str",
            ScriptValue::Object(_) => "object",
            ScriptValue::Type(_) => "type",
            ScriptValue::Member(_) => "member",
            ScriptValue::Callable(_) => "callable",
            ScriptValue::Opaque(_) => "opaque",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, ScriptValue::None)
    }

    /// Borrow the wrapper instance, if this value is one.
    pub fn as_object(&self) -> Option<&Arc<WrapperInstance>> {
        match self {
            ScriptValue::Object(instance) => Some(instance),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ScriptValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScriptValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Identity of heap-backed values; `None` for plain data.
    pub fn identity(&self) -> Option<usize> {
        match self {
            ScriptValue::Object(instance) => Some(Arc::as_ptr(instance) as usize),
            ScriptValue::Type(ty) => Some(Arc::as_ptr(ty) as usize),
            ScriptValue::Callable(callable) => Some(callable.key().function),
            ScriptValue::Opaque(value) => Some(Arc::as_ptr(value) as *const () as usize),
            _ => None,
        }
    }
}

impl From<bool> for ScriptValue {
    fn from(v: bool) -> Self {
        ScriptValue::Bool(v)
    }
}

impl From<i64> for ScriptValue {
    fn from(v: i64) -> Self {
        ScriptValue::Int(v)
    }
}

impl From<i32> for ScriptValue {
    fn from(v: i32) -> Self {
        ScriptValue::Int(v as i64)
    }
}

impl From<f64> for ScriptValue {
    fn from(v: f64) -> Self {
        ScriptValue::Float(v)
    }
}

impl From<&str> for ScriptValue {
    fn from(v: &str) -> Self {
        ScriptValue::Str(v.to_string())
    }
}

impl From<String> for ScriptValue {
    fn from(v: String) -> Self {
        ScriptValue::Str(v)
    }
}

impl From<Arc<WrapperInstance>> for ScriptValue {
    fn from(v: Arc<WrapperInstance>) -> Self {
        ScriptValue::Object(v)
    }
}

impl From<ScriptCallable> for ScriptValue {
    fn from(v: ScriptCallable) -> Self {
        ScriptValue::Callable(v)
    }
}

impl fmt::Debug for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptValue::None => write!(f, "None"),
            ScriptValue::Bool(v) => write!(f, "Bool({})", v),
            ScriptValue::Int(v) => write!(f, "Int({})", v),
            ScriptValue::Float(v) => write!(f, "Float({})", v),
            ScriptValue::Str(s) => write!(f, "Str({:?})", s),
            ScriptValue::Object(i) => write!(f, "Object({})", i.wrapper_type().full_name()),
            ScriptValue::Type(t) => write!(f, "Type({})", t.full_name()),
            ScriptValue::Member(m) => write!(f, "Member({})", m.name()),
            ScriptValue::Callable(c) => write!(f, "Callable({})", c.name()),
            ScriptValue::Opaque(_) => write!(f, "Opaque(...)"),
        }
    }
}

impl PartialEq for ScriptValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ScriptValue::None, ScriptValue::None) => true,
            (ScriptValue::Bool(a), ScriptValue::Bool(b)) => a == b,
            (ScriptValue::Int(a), ScriptValue::Int(b)) => a == b,
            (ScriptValue::Float(a), ScriptValue::Float(b)) => a == b,
            (ScriptValue::Str(a), ScriptValue::Str(b)) => a == b,
            (ScriptValue::Member(a), ScriptValue::Member(b)) => {
                Arc::ptr_eq(&a.instance, &b.instance) && a.name == b.name
            }
            (ScriptValue::Callable(a), ScriptValue::Callable(b)) => a.key() == b.key(),
            (ScriptValue::Object(_), ScriptValue::Object(_))
            | (ScriptValue::Type(_), ScriptValue::Type(_))
            | (ScriptValue::Opaque(_), ScriptValue::Opaque(_)) => {
                self.identity() == other.identity()
            }
            _ => false,
        }
    }
}

// ============================================================================
// Callables
// ============================================================================

type FunctionBody = dyn Fn(&[ScriptValue]) -> BridgeResult<ScriptValue> + Send + Sync;

/// A scripting function.
pub struct ScriptFunction {
    name: String,
    body: Box<FunctionBody>,
}

impl ScriptFunction {
    pub fn new<F>(name: impl Into<String>, body: F) -> Arc<Self>
    where
        F: Fn(&[ScriptValue]) -> BridgeResult<ScriptValue> + Send + Sync + 'static,
    {
        Arc::new(Self {
            name: name.into(),
            body: Box::new(body),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, args: &[ScriptValue]) -> BridgeResult<ScriptValue> {
        (self.body)(args)
    }
}

impl fmt::Debug for ScriptFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptFunction")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// A scripting callable that can be connected to a signal.
#[derive(Clone, Debug)]
pub enum ScriptCallable {
    /// Plain function
    Function(Arc<ScriptFunction>),
    /// Function bound to a receiver, which is passed as the first argument
    BoundMethod {
        receiver: Box<ScriptValue>,
        function: Arc<ScriptFunction>,
    },
}

/// Identity of a callable for proxy slot matching.
///
/// Bound methods are identified by their receiver together with the
/// underlying function, so the same method on two receivers yields two
/// keys while re-binding the same pair yields one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallableKey {
    pub receiver: Option<ReceiverKey>,
    pub function: usize,
}

/// Receiver part of a [`CallableKey`]: heap values by identity, plain data
/// by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReceiverKey {
    Identity(usize),
    None,
    Bool(bool),
    Int(i64),
    /// Bit pattern of the float
    Float(u64),
    Str(String),
    Member { instance: usize, name: String },
}

impl ReceiverKey {
    fn of(value: &ScriptValue) -> Self {
        if let Some(identity) = value.identity() {
            return ReceiverKey::Identity(identity);
        }
        match value {
            ScriptValue::Bool(v) => ReceiverKey::Bool(*v),
            ScriptValue::Int(v) => ReceiverKey::Int(*v),
            ScriptValue::Float(v) => ReceiverKey::Float(v.to_bits()),
            ScriptValue::Str(v) => ReceiverKey::Str(v.clone()),
            ScriptValue::Member(member) => ReceiverKey::Member {
                instance: Arc::as_ptr(&member.instance) as usize,
                name: member.name.clone(),
            },
            _ => ReceiverKey::None,
        }
    }
}

impl ScriptCallable {
    pub fn function(function: Arc<ScriptFunction>) -> Self {
        ScriptCallable::Function(function)
    }

    /// Bind `function` to `receiver`.
    pub fn bound(receiver: ScriptValue, function: Arc<ScriptFunction>) -> Self {
        ScriptCallable::BoundMethod {
            receiver: Box::new(receiver),
            function,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ScriptCallable::Function(f) => f.name(),
            ScriptCallable::BoundMethod { function, .. } => function.name(),
        }
    }

    pub fn key(&self) -> CallableKey {
        match self {
            ScriptCallable::Function(f) => CallableKey {
                receiver: None,
                function: Arc::as_ptr(f) as usize,
            },
            ScriptCallable::BoundMethod { receiver, function } => CallableKey {
                receiver: Some(ReceiverKey::of(receiver)),
                function: Arc::as_ptr(function) as usize,
            },
        }
    }

    pub fn call(&self, args: &[ScriptValue]) -> BridgeResult<ScriptValue> {
        match self {
            ScriptCallable::Function(f) => f.call(args),
            ScriptCallable::BoundMethod { receiver, function } => {
                let mut full = Vec::with_capacity(args.len() + 1);
                full.push((**receiver).clone());
                full.extend_from_slice(args);
                function.call(&full)
            }
        }
    }
}

/// A member selected on a wrapper instance by attribute lookup.
///
/// Holds the receiver and the member name; calling it resolves the overload
/// and invokes in one step.
#[derive(Clone, Debug)]
pub struct BoundMember {
    pub(crate) instance: Arc<WrapperInstance>,
    pub(crate) name: String,
}

impl BoundMember {
    pub fn instance(&self) -> &Arc<WrapperInstance> {
        &self.instance
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
