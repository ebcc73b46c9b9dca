use aws_sdk_s3::{
    error::ProvideErrorMetadata,
    error::SdkError,
    primitives::DateTime as AwsDateTime,
    types::{Grant as AwsGrant, Object},
};
use chrono::{DateTime, Utc};

use crate::domain::{
    common::entities::app_errors::TransportErrorKind,
    storage::entities::{Grant, Grantee, ObjectEntry},
};

impl From<&Object> for ObjectEntry {
    fn from(object: &Object) -> Self {
        Self {
            object_key: object.key().unwrap_or_default().to_string(),
            size_bytes: object.size().unwrap_or_default().max(0) as u64,
            last_modified: object.last_modified().and_then(to_chrono),
            etag: object.e_tag().map(|etag| etag.trim_matches('"').to_string()),
        }
    }
}

impl From<&AwsGrant> for Grant {
    fn from(grant: &AwsGrant) -> Self {
        let grantee = grant
            .grantee()
            .map(|grantee| {
                let grantee_type = if grantee.uri().is_some() {
                    "Group"
                } else if grantee.email_address().is_some() {
                    "AmazonCustomerByEmail"
                } else {
                    "CanonicalUser"
                };
                Grantee {
                    grantee_type: grantee_type.to_string(),
                    id: grantee.id().map(str::to_string),
                    display_name: grantee.display_name().map(str::to_string),
                    uri: grantee.uri().map(str::to_string),
                    email_address: grantee.email_address().map(str::to_string),
                }
            })
            .unwrap_or_default();

        Self {
            grantee,
            permission: grant
                .permission()
                .map(|permission| permission.as_str().to_string())
                .unwrap_or_default(),
        }
    }
}

fn to_chrono(value: &AwsDateTime) -> Option<DateTime<Utc>> {
    value
        .to_millis()
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
}

/// Maps an S3 error code onto the transport taxonomy.
pub fn classify_code(code: Option<&str>) -> TransportErrorKind {
    match code {
        Some("NoSuchKey" | "NoSuchBucket" | "NotFound" | "NoSuchVersion") => {
            TransportErrorKind::NotFound
        }
        Some("BucketAlreadyExists" | "BucketAlreadyOwnedByYou") => {
            TransportErrorKind::AlreadyExists
        }
        Some(
            "AccessDenied" | "Forbidden" | "AllAccessDisabled" | "InvalidAccessKeyId"
            | "SignatureDoesNotMatch" | "AccessControlListNotSupported",
        ) => TransportErrorKind::AccessDenied,
        Some("SlowDown" | "RequestTimeout" | "InternalError" | "ServiceUnavailable") => {
            TransportErrorKind::Transient
        }
        _ => TransportErrorKind::Other,
    }
}

pub fn classify<E, R>(error: &SdkError<E, R>) -> TransportErrorKind
where
    E: ProvideErrorMetadata,
{
    match error {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => TransportErrorKind::Transient,
        _ => classify_code(error.code()),
    }
}
