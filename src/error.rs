//! Error types for the bridge.

use std::fmt;

use metabridge_core::TypeName;
use thiserror::Error;

/// Direction of a value conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Native value to script value (return values, event parameters).
    NativeToScript,
    /// Script value to native slot (arguments).
    ScriptToNative,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::NativeToScript => f.write_str("native-to-script"),
            Direction::ScriptToNative => f.write_str("script-to-native"),
        }
    }
}

/// Errors that can occur when converting between native and script values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    /// Script value has the wrong type for the native slot
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: TypeName,
        actual: &'static str,
    },

    /// Integer does not fit in the native type
    #[error("integer overflow: value {value} does not fit in {target_type}")]
    IntegerOverflow { value: i64, target_type: TypeName },

    /// The registry entry exists but carries no conversion for this direction
    #[error("no {direction} conversion for type '{type_name}'")]
    Unsupported {
        type_name: TypeName,
        direction: Direction,
    },

    /// A raw event parameter did not hold the declared type
    #[error("raw value is not a '{expected}'")]
    RawTypeMismatch { expected: TypeName },
}

/// Errors surfaced to scripting callers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BridgeError {
    /// Type name absent from the registry, or its conversion direction is
    /// unsupported
    #[error("unknown type '{type_name}' ({direction})")]
    UnknownType {
        type_name: TypeName,
        direction: Direction,
    },

    /// No constructor accepts the supplied argument count
    #[error("cannot find constructor for {class} taking {provided} arguments")]
    ConstructorNotFound { class: String, provided: usize },

    /// Member lookup by name or signature failed
    #[error("method '{0}' not found")]
    MethodNotFound(String),

    /// Too many arguments for the selected member
    #[error("method {member} requires {expected} arguments, {provided} provided")]
    ArgumentCountMismatch {
        member: String,
        expected: usize,
        provided: usize,
    },

    /// Operation requires a wrapper instance
    #[error("expected a native object, got {0}")]
    NotAWrapperInstance(&'static str),

    /// Native call raised an error
    #[error("{0}")]
    NativeInvocationFailure(String),

    /// Class registration rejected by configuration
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("conversion error: {0}")]
    Conversion(#[from] ConversionError),

    /// Binding a name into a namespace failed
    #[error("cannot register '{name}' in namespace '{namespace}'")]
    NamespaceRegistration { namespace: String, name: String },

    /// Value cannot be called
    #[error("'{0}' object is not callable")]
    NotCallable(String),

    /// Module function called with an unsupported argument shape
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// Error raised by a scripting callable
    #[error("{0}")]
    Raised(String),
}

impl BridgeError {
    /// Create an [`BridgeError::InvalidArguments`] error.
    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        BridgeError::InvalidArguments(message.into())
    }

    /// Create a [`BridgeError::Raised`] error, as a script callable would.
    pub fn raised(message: impl Into<String>) -> Self {
        BridgeError::Raised(message.into())
    }
}

/// Result type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argument_count_message() {
        let err = BridgeError::ArgumentCountMismatch {
            member: "Widget::SetValue".into(),
            expected: 1,
            provided: 2,
        };
        assert_eq!(
            err.to_string(),
            "method Widget::SetValue requires 1 arguments, 2 provided"
        );
    }

    #[test]
    fn conversion_errors_convert() {
        let err: BridgeError = ConversionError::Unsupported {
            type_name: TypeName::VOID,
            direction: Direction::ScriptToNative,
        }
        .into();
        assert!(matches!(err, BridgeError::Conversion(_)));
        assert!(err.to_string().contains("script-to-native"));
    }
}
