//! Policy-enforcing access layer for S3-compatible object storage.
//!
//! Every object operation, including the issuance of presigned URLs, is
//! checked against an immutable [`SecurityPolicy`] before the store is
//! contacted.
//!
//! [`SecurityPolicy`]: domain::policy::entities::SecurityPolicy

pub mod application;
pub mod domain;
pub mod infrastructure;
