use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::resource::ResourceRef;

/// Failure reported by a provider call, already classified.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "class", rename_all = "snake_case")]
pub enum ProviderError {
    /// Throttling, 5xx, or "still in use" while a dependent is being
    /// removed. Worth retrying.
    #[error("{operation} failed (transient): {message}")]
    Transient { operation: String, message: String },

    /// Validation, authorization, or anything else retrying won't fix.
    #[error("{operation} failed: {message}")]
    Permanent { operation: String, message: String },

    /// The resource does not exist. A delete treats this as success.
    #[error("{operation}: resource not found: {message}")]
    NotFound { operation: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    Transient,
    Permanent,
    NotFound,
}

impl ProviderError {
    pub fn transient(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transient {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn permanent(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Permanent {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn not_found(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotFound {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Transient { .. } => ErrorClass::Transient,
            Self::Permanent { .. } => ErrorClass::Permanent,
            Self::NotFound { .. } => ErrorClass::NotFound,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::Transient
    }

    /// Prepend resource identity to the error message.
    pub fn with_resource(self, resource: &ResourceRef) -> Self {
        match self {
            Self::Transient { operation, message } => Self::Transient {
                operation,
                message: format!("{resource}: {message}"),
            },
            Self::Permanent { operation, message } => Self::Permanent {
                operation,
                message: format!("{resource}: {message}"),
            },
            Self::NotFound { operation, message } => Self::NotFound {
                operation,
                message: format!("{resource}: {message}"),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseRefError {
    #[error("unknown resource kind: {0}")]
    UnknownKind(String),

    #[error("malformed resource reference '{0}' (expected kind:instance/id or instance:id)")]
    Malformed(String),
}

/// Walk the full error chain and join all causes into one string.
///
/// AWS SDK errors often have terse `Display` impls (e.g. "service error")
/// but useful detail in the source chain.
pub fn format_err_chain(err: &dyn std::error::Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}
