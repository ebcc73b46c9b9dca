use std::future::Future;

use bytes::Bytes;

use crate::domain::common::entities::app_errors::CoreError;

use super::entities::{Grant, ObjectEntry, PresignedUrl};
use super::value_objects::{ObjectAcl, PresignRequest, PutObjectInput};

/// Port for the underlying object store (S3, MinIO, ...).
///
/// Implementations perform no authorization of their own; callers gate every
/// call through the security policy first.
#[cfg_attr(test, mockall::automock)]
pub trait ObjectStoragePort: Send + Sync {
    /// Check whether a bucket exists and is reachable
    fn bucket_exists(&self, bucket: &str) -> impl Future<Output = Result<bool, CoreError>> + Send;

    fn create_bucket(&self, bucket: &str) -> impl Future<Output = Result<(), CoreError>> + Send;

    fn delete_bucket(&self, bucket: &str) -> impl Future<Output = Result<(), CoreError>> + Send;

    /// Upload an object directly to storage
    fn put_object(&self, input: PutObjectInput)
    -> impl Future<Output = Result<(), CoreError>> + Send;

    /// Fetch the full object body
    fn get_object(
        &self,
        bucket: &str,
        object_key: &str,
    ) -> impl Future<Output = Result<Bytes, CoreError>> + Send;

    /// Delete an object from storage
    fn delete_object(
        &self,
        bucket: &str,
        object_key: &str,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;

    /// List every object whose key starts with `prefix`
    fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
    ) -> impl Future<Output = Result<Vec<ObjectEntry>, CoreError>> + Send;

    fn get_object_acl(
        &self,
        bucket: &str,
        object_key: &str,
    ) -> impl Future<Output = Result<Vec<Grant>, CoreError>> + Send;

    fn put_object_acl(
        &self,
        bucket: &str,
        object_key: &str,
        acl: ObjectAcl,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;

    /// Sign a URL for a future operation. Signing is local and has no effect
    /// on the store.
    fn presign(
        &self,
        request: PresignRequest,
    ) -> impl Future<Output = Result<PresignedUrl, CoreError>> + Send;
}
