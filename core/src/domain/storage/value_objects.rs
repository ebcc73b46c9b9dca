use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::domain::common::entities::app_errors::CoreError;

/// Canned ACLs understood by S3-compatible stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObjectAcl {
    Private,
    PublicRead,
    PublicReadWrite,
    AuthenticatedRead,
    AwsExecRead,
    BucketOwnerRead,
    BucketOwnerFullControl,
}

impl ObjectAcl {
    pub const ALL: [ObjectAcl; 7] = [
        ObjectAcl::Private,
        ObjectAcl::PublicRead,
        ObjectAcl::PublicReadWrite,
        ObjectAcl::AuthenticatedRead,
        ObjectAcl::AwsExecRead,
        ObjectAcl::BucketOwnerRead,
        ObjectAcl::BucketOwnerFullControl,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectAcl::Private => "private",
            ObjectAcl::PublicRead => "public-read",
            ObjectAcl::PublicReadWrite => "public-read-write",
            ObjectAcl::AuthenticatedRead => "authenticated-read",
            ObjectAcl::AwsExecRead => "aws-exec-read",
            ObjectAcl::BucketOwnerRead => "bucket-owner-read",
            ObjectAcl::BucketOwnerFullControl => "bucket-owner-full-control",
        }
    }
}

impl fmt::Display for ObjectAcl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectAcl {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectAcl::ALL
            .iter()
            .copied()
            .find(|acl| acl.as_str() == s)
            .ok_or_else(|| CoreError::Invalid(format!("unknown canned ACL: {s}")))
    }
}

#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    pub role: Option<String>,
    pub metadata: Option<BTreeMap<String, String>>,
    pub bucket: Option<String>,
}

/// Role and bucket override shared by most calls.
#[derive(Debug, Clone, Default)]
pub struct AccessOptions {
    pub role: Option<String>,
    pub bucket: Option<String>,
}

impl AccessOptions {
    pub fn as_role(role: impl Into<String>) -> Self {
        Self {
            role: Some(role.into()),
            bucket: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PresignedUploadOptions {
    pub content_type: Option<String>,
    pub role: Option<String>,
    /// Declared upper bound for the object size, checked at issuance only.
    pub max_size: Option<u64>,
    pub metadata: Option<BTreeMap<String, String>>,
    pub bucket: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PresignedDownloadOptions {
    pub role: Option<String>,
    pub response_content_type: Option<String>,
    pub response_content_disposition: Option<String>,
    pub bucket: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PresignedListOptions {
    pub role: Option<String>,
    pub max_keys: Option<i32>,
    pub delimiter: Option<String>,
    pub bucket: Option<String>,
}

/// Input for a direct object write on the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct PutObjectInput {
    pub bucket: String,
    pub object_key: String,
    pub payload: Bytes,
    pub content_type: Option<String>,
    pub metadata: Option<BTreeMap<String, String>>,
}

/// What a presigned URL will let its holder do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresignTarget {
    Upload {
        content_type: Option<String>,
        metadata: Option<BTreeMap<String, String>>,
    },
    Download {
        response_content_type: Option<String>,
        response_content_disposition: Option<String>,
    },
    Delete,
    List {
        max_keys: Option<i32>,
        delimiter: Option<String>,
    },
    Acl {
        acl: ObjectAcl,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresignRequest {
    pub bucket: String,
    /// Object key, or the listing prefix for [`PresignTarget::List`].
    pub object_key: String,
    pub expires_in: Duration,
    pub target: PresignTarget,
}
