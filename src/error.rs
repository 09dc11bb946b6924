//! Error types for the Quicksilver object model

use crate::runtime::Value;
use std::fmt;
use thiserror::Error;

/// Main error type for the object model
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    /// Engine-raised error - TypeError, RangeError, etc.
    #[error("{kind}: {message}")]
    RuntimeError { kind: ErrorKind, message: String },

    /// A value thrown by user code (a callback, getter, trap or host handler)
    #[error("Uncaught {value}")]
    Thrown { value: Value },

    /// Host contract violation
    #[error("InternalError: {0}")]
    InternalError(String),
}

/// JavaScript error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::enum_variant_names)]
pub enum ErrorKind {
    /// TypeError - wrong type for operation
    TypeError,
    /// ReferenceError - reserved for callers that resolve bindings
    ReferenceError,
    /// RangeError - value out of range
    RangeError,
    /// SyntaxError - invalid syntax at runtime
    SyntaxError,
    /// Generic Error - user-thrown Error objects
    GenericError,
    /// InternalError - internal engine error
    InternalError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::TypeError => write!(f, "TypeError"),
            ErrorKind::ReferenceError => write!(f, "ReferenceError"),
            ErrorKind::RangeError => write!(f, "RangeError"),
            ErrorKind::SyntaxError => write!(f, "SyntaxError"),
            ErrorKind::GenericError => write!(f, "Error"),
            ErrorKind::InternalError => write!(f, "InternalError"),
        }
    }
}

impl Error {
    /// Create a TypeError
    pub fn type_error(message: impl Into<String>) -> Self {
        Error::RuntimeError {
            kind: ErrorKind::TypeError,
            message: message.into(),
        }
    }

    /// Create a RangeError
    pub fn range_error(message: impl Into<String>) -> Self {
        Error::RuntimeError {
            kind: ErrorKind::RangeError,
            message: message.into(),
        }
    }

    /// Create a ReferenceError
    pub fn reference_error(message: impl Into<String>) -> Self {
        Error::RuntimeError {
            kind: ErrorKind::ReferenceError,
            message: message.into(),
        }
    }

    /// Wrap a value thrown by user code
    pub fn thrown(value: impl Into<Value>) -> Self {
        Error::Thrown {
            value: value.into(),
        }
    }

    /// The JavaScript error kind, if this is an engine-raised error
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Error::RuntimeError { kind, .. } => Some(*kind),
            Error::InternalError(_) => Some(ErrorKind::InternalError),
            Error::Thrown { .. } => None,
        }
    }

    /// The value carried by a user throw
    pub fn thrown_value(&self) -> Option<&Value> {
        match self {
            Error::Thrown { value } => Some(value),
            _ => None,
        }
    }

    /// The bare message, without the kind prefix
    pub fn message(&self) -> String {
        match self {
            Error::RuntimeError { message, .. } => message.clone(),
            Error::Thrown { value } => value.to_string(),
            Error::InternalError(message) => message.clone(),
        }
    }

    /// Check whether this is a TypeError
    pub fn is_type_error(&self) -> bool {
        self.kind() == Some(ErrorKind::TypeError)
    }

    /// Check whether this is a RangeError
    pub fn is_range_error(&self) -> bool {
        self.kind() == Some(ErrorKind::RangeError)
    }
}

/// Result type alias for the object model
pub type Result<T> = std::result::Result<T, Error>;

/// Report a failed operation: raise a TypeError when `throw` is set, otherwise
/// return `Ok(false)`.
pub(crate) fn type_error_result(throw: bool, message: impl Into<String>) -> Result<bool> {
    if throw {
        Err(Error::type_error(message))
    } else {
        Ok(false)
    }
}

/// Standardized error message templates
///
/// Wording matches V8 so host code can match on them.
pub mod messages {
    pub const NOT_A_FUNCTION: &str = "is not a function";
    pub const NOT_A_CONSTRUCTOR: &str = "is not a constructor";

    pub const INVALID_ARRAY_LENGTH: &str = "Invalid array length";
    pub const LENGTH_NOT_WRITABLE: &str = "length is not writable";
    pub const CYCLIC_PROTO: &str = "Cyclic __proto__ value";
    pub const NULL_OR_UNDEFINED_TO_OBJECT: &str = "Cannot convert undefined or null to object";
    pub const OBJECT_TO_PRIMITIVE: &str = "Cannot convert object to primitive value";
    pub const SYMBOL_TO_STRING: &str = "Cannot convert a Symbol value to a string";
    pub const SYMBOL_TO_NUMBER: &str = "Cannot convert a Symbol value to a number";
    pub const SPECIES_NOT_CONSTRUCTOR: &str = "Species is not a constructor";
    pub const BAD_COMPARATOR: &str =
        "The comparison function must be either a function or undefined";
    pub const PROXY_REVOKED: &str = "Proxy already revoked";
    pub const MAXIMUM_CALL_STACK: &str = "Maximum call stack size exceeded";

    pub const DYNAMIC_NO_ACCESSORS: &str = "Dynamic objects do not support accessor properties";
    pub const DYNAMIC_NO_SYMBOLS: &str = "Dynamic objects do not support Symbol properties";
    pub const DYNAMIC_NON_EXTENSIBLE: &str = "Cannot make a dynamic object non-extensible";

    /// Format a "Cannot add property X, object is not extensible" message
    pub fn cannot_add_property(name: &dyn std::fmt::Display) -> String {
        format!("Cannot add property {}, object is not extensible", name)
    }

    /// Format a "Cannot define property X, object is not extensible" message
    pub fn cannot_define_property(name: &dyn std::fmt::Display) -> String {
        format!("Cannot define property {}, object is not extensible", name)
    }

    /// Format a "Cannot redefine property: X" message
    pub fn cannot_redefine(name: &dyn std::fmt::Display) -> String {
        format!("Cannot redefine property: {}", name)
    }

    /// Format a "Cannot assign to read only property 'X'" message
    pub fn read_only(name: &dyn std::fmt::Display) -> String {
        format!("Cannot assign to read only property '{}'", name)
    }

    /// Format a "Cannot delete property 'X' of Y" message
    pub fn cannot_delete(name: &dyn std::fmt::Display, of: &dyn std::fmt::Display) -> String {
        format!("Cannot delete property '{}' of {}", name, of)
    }

    /// Format a "X is not a function" message
    pub fn not_a_function(what: &dyn std::fmt::Display) -> String {
        format!("{} {}", what, NOT_A_FUNCTION)
    }

    /// Format a "X is not a constructor" message
    pub fn not_a_constructor(what: &dyn std::fmt::Display) -> String {
        format!("{} {}", what, NOT_A_CONSTRUCTOR)
    }

    /// Format a "Receiver property X is an accessor" message
    pub fn receiver_accessor(name: &dyn std::fmt::Display) -> String {
        format!("Receiver property {} is an accessor", name)
    }

    /// Format a "X is not extensible" message
    pub fn not_extensible(what: &dyn std::fmt::Display) -> String {
        format!("{} is not extensible", what)
    }

    /// Format a "Cannot set property "X" on a dynamic array" message
    pub fn dynamic_array_property(name: &dyn std::fmt::Display) -> String {
        format!("Cannot set property {:?} on a dynamic array", name.to_string())
    }

    /// Format a dynamic-object attribute rejection
    pub fn dynamic_attribute(name: &dyn std::fmt::Display, what: &str) -> String {
        format!("Dynamic object field {:?} cannot be made {}", name.to_string(), what)
    }
}
