use thiserror::Error;

use crate::TypeName;

/// Failure raised by native code during construct, invoke or slot access.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NativeError {
    /// Native code raised an error carrying a message.
    #[error("{0}")]
    Exception(String),

    /// Native code failed without a message.
    #[error("native call raised an exception")]
    Unknown,

    /// No method exists at the requested index.
    #[error("no method at index {0}")]
    NoSuchMethod(usize),

    /// No constructor exists at the requested index.
    #[error("no constructor at index {0}")]
    NoSuchConstructor(usize),

    /// A slot did not hold the expected Rust type.
    #[error("argument type mismatch: expected {expected}, got {actual}")]
    ArgumentType {
        expected: TypeName,
        actual: TypeName,
    },

    /// A required argument slot was empty or absent.
    #[error("missing argument {0}")]
    MissingArgument(usize),
}

impl NativeError {
    /// Build an [`NativeError::Exception`] from anything displayable.
    pub fn exception(message: impl Into<String>) -> Self {
        NativeError::Exception(message.into())
    }
}
