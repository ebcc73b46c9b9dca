//! Lifetime limits for presigned URLs.
//!
//! These ceilings hold whether or not a security policy is configured.

use std::time::Duration;

use crate::domain::{
    common::entities::app_errors::CoreError, policy::entities::OperationKind,
};

pub const DEFAULT_PRESIGN_EXPIRY: Duration = Duration::from_secs(3600);

/// Suggested upper bound for upload URLs. Longer lifetimes are accepted but
/// logged.
pub const RECOMMENDED_UPLOAD_EXPIRY: Duration = Duration::from_secs(24 * 3600);

/// Hard limit for URLs that destroy data or change permissions.
pub const DESTRUCTIVE_EXPIRY_CEILING: Duration = Duration::from_secs(3600);

/// SigV4 query signatures are valid for at most seven days.
pub const MAX_PRESIGN_EXPIRY: Duration = Duration::from_secs(7 * 24 * 3600);

/// Hard ceiling for the given operation class, if it has one.
pub fn expiry_ceiling(operation: OperationKind) -> Option<Duration> {
    match operation {
        OperationKind::PresignedDelete | OperationKind::AclWrite => {
            Some(DESTRUCTIVE_EXPIRY_CEILING)
        }
        _ => None,
    }
}

/// Checks a requested URL lifetime. The ceiling is inclusive.
pub fn ensure_expiry(operation: OperationKind, expires_in: Duration) -> Result<(), CoreError> {
    if expires_in.is_zero() {
        return Err(CoreError::Invalid(
            "presigned URL lifetime must be at least one second".to_string(),
        ));
    }

    let ceiling = expiry_ceiling(operation)
        .unwrap_or(MAX_PRESIGN_EXPIRY)
        .min(MAX_PRESIGN_EXPIRY);

    if expires_in > ceiling {
        return Err(CoreError::ExpiryLimitExceeded {
            operation,
            requested: expires_in.as_secs(),
            ceiling: ceiling.as_secs(),
        });
    }

    if operation == OperationKind::PresignedUpload && expires_in > RECOMMENDED_UPLOAD_EXPIRY {
        tracing::warn!(
            expires_in_secs = expires_in.as_secs(),
            recommended_secs = RECOMMENDED_UPLOAD_EXPIRY.as_secs(),
            "Upload URL lifetime exceeds the recommended ceiling"
        );
    }

    Ok(())
}
