//! Error taxonomy for type lookups, construction, dispatch and synthesis

use crate::class::Visibility;
use crate::value::Value;

/// Result type for reflective operations
pub type ReflectResult<T> = Result<T, ReflectError>;

/// Result of invoking a method body
pub type CallResult = ReflectResult<Value>;

/// Reflective operation errors
///
/// No variant is ever cached as a positive result by the registries, so every
/// failure is retriable by the caller.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ReflectError {
    /// No accessible constructor matched, or the constructor body failed
    #[error("Cannot construct {class}: {reason}")]
    Construction {
        /// Name of the class being constructed
        class: String,
        /// Human readable reason
        reason: String,
        /// Failure raised by the constructor body, if any
        #[source]
        cause: Option<Box<ReflectError>>,
    },

    /// No method with the requested name and parameter types exists
    #[error("No method {class}::{method}({signature})")]
    MethodNotFound {
        /// Class the lookup started from
        class: String,
        /// Requested method name
        method: String,
        /// Rendered parameter types
        signature: String,
    },

    /// The method body failed while being invoked through a handle
    #[error("Invocation of {method} failed")]
    Invocation {
        /// Rendered method descriptor
        method: String,
        /// Failure raised by the body
        #[source]
        source: Box<ReflectError>,
    },

    /// The member is not visible to the caller
    #[error("{member} is {visibility} and cannot be invoked without an access override")]
    Access {
        /// Rendered member descriptor
        member: String,
        /// Declared visibility of the member
        visibility: Visibility,
    },

    /// The forwarding subtype could not be synthesized
    #[error("Cannot synthesize proxy of {target} intercepted by {interceptor}: {reason}")]
    Synthesis {
        /// Target class name
        target: String,
        /// Interceptor class name
        interceptor: String,
        /// Human readable reason
        reason: String,
        /// Underlying failure, if any
        #[source]
        cause: Option<Box<ReflectError>>,
    },

    /// A synthesized type could not be loaded into the type system
    #[error("Cannot load {class}: {reason}")]
    Load {
        /// Name of the class being loaded
        class: String,
        /// Human readable reason
        reason: String,
    },

    /// A value is not assignable to the declared type
    #[error("Type mismatch: expected {expected}, got {found}")]
    TypeMismatch {
        /// Declared type name
        expected: String,
        /// Runtime type name of the offending value
        found: String,
    },

    /// Arguments or receiver do not fit the member being called
    #[error("Illegal argument: {0}")]
    IllegalArgument(String),

    /// Failure raised by user code (method or constructor bodies)
    #[error("{0}")]
    Thrown(String),
}

impl ReflectError {
    /// Failure raised from inside a method or constructor body
    pub fn thrown(message: impl Into<String>) -> Self {
        ReflectError::Thrown(message.into())
    }

    /// Construction failure without an underlying cause
    pub fn construction(class: impl Into<String>, reason: impl Into<String>) -> Self {
        ReflectError::Construction {
            class: class.into(),
            reason: reason.into(),
            cause: None,
        }
    }

    /// Whether this is a `MethodNotFound` failure
    pub fn is_method_not_found(&self) -> bool {
        matches!(self, ReflectError::MethodNotFound { .. })
    }

    /// Innermost failure in the cause chain
    pub fn root_cause(&self) -> &ReflectError {
        let mut current = self;
        loop {
            match current {
                ReflectError::Invocation { source, .. } => current = source,
                ReflectError::Construction { cause: Some(cause), .. }
                | ReflectError::Synthesis { cause: Some(cause), .. } => current = cause,
                _ => return current,
            }
        }
    }
}

impl From<String> for ReflectError {
    fn from(s: String) -> Self {
        ReflectError::Thrown(s)
    }
}

impl From<&str> for ReflectError {
    fn from(s: &str) -> Self {
        ReflectError::Thrown(s.to_string())
    }
}
