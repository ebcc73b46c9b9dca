use std::fmt;

use thiserror::Error;

use crate::domain::policy::{entities::OperationKind, value_objects::PolicyRule};

/// Classification of a failure reported by the object store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    NotFound,
    AlreadyExists,
    AccessDenied,
    /// Network, timeout or dispatch failures. The caller decides whether to retry.
    Transient,
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransportErrorKind::NotFound => "not found",
            TransportErrorKind::AlreadyExists => "already exists",
            TransportErrorKind::AccessDenied => "access denied",
            TransportErrorKind::Transient => "transient failure",
            TransportErrorKind::Other => "storage failure",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("policy violation ({rule}): {reason}")]
    PolicyViolation { rule: PolicyRule, reason: String },

    #[error("presigned {operation} URL lifetime of {requested}s exceeds the {ceiling}s limit")]
    ExpiryLimitExceeded {
        operation: OperationKind,
        requested: u64,
        ceiling: u64,
    },

    #[error("{kind} during {operation} on {bucket}/{key}: {message}")]
    Transport {
        kind: TransportErrorKind,
        operation: &'static str,
        bucket: String,
        key: String,
        message: String,
    },

    #[error("invalid security policy: {0}")]
    InvalidPolicy(String),

    #[error("invalid request: {0}")]
    Invalid(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl CoreError {
    pub fn transport_kind(&self) -> Option<TransportErrorKind> {
        match self {
            CoreError::Transport { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Only transient transport failures are worth retrying. Local rejections
    /// never are.
    pub fn is_retryable(&self) -> bool {
        self.transport_kind() == Some(TransportErrorKind::Transient)
    }
}
