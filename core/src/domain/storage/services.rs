use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use sha2::{Digest, Sha256};
use tracing::instrument;

use crate::domain::{
    common::{
        entities::app_errors::CoreError,
        policies::{authorize, evaluate},
        services::Service,
    },
    policy::{
        entities::OperationKind,
        value_objects::{Decision, OperationRequest},
    },
    storage::{
        entities::{Grant, ObjectEntry, PresignedUrl, UploadedObject},
        policies::ensure_expiry,
        ports::ObjectStoragePort,
        value_objects::{
            AccessOptions, ObjectAcl, PresignRequest, PresignTarget, PresignedDownloadOptions,
            PresignedListOptions, PresignedUploadOptions, PutObjectInput, UploadOptions,
        },
    },
};

/// Policy-gated storage operations.
///
/// Every object-level call is validated before the store is contacted. A
/// rejected call fails with [`CoreError::PolicyViolation`] and never reaches
/// the transport.
///
/// # Presigned URLs
///
/// The `presigned_*` methods check the policy against the parameters declared
/// at issuance (key, role, content type, size). The store does not run this
/// check again when the URL is redeemed: whoever holds the URL can use it
/// until it expires. Content type and metadata of upload URLs are bound into
/// the signature; the declared `max_size` is not, so it only limits what the
/// caller claims, not what the holder uploads.
pub trait StorageService: Send + Sync {
    fn upload_file(
        &self,
        object_key: &str,
        body: Bytes,
        content_type: Option<&str>,
        options: UploadOptions,
    ) -> impl Future<Output = Result<UploadedObject, CoreError>> + Send;

    fn download_file(
        &self,
        object_key: &str,
        options: AccessOptions,
    ) -> impl Future<Output = Result<Bytes, CoreError>> + Send;

    fn delete_file(
        &self,
        object_key: &str,
        options: AccessOptions,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;

    /// List objects under `prefix`. The prefix is what the policy sees as the
    /// key; no prefix is evaluated as the empty key.
    fn list_files(
        &self,
        prefix: Option<&str>,
        options: AccessOptions,
    ) -> impl Future<Output = Result<Vec<ObjectEntry>, CoreError>> + Send;

    fn presigned_upload_url(
        &self,
        object_key: &str,
        expires_in: Duration,
        options: PresignedUploadOptions,
    ) -> impl Future<Output = Result<PresignedUrl, CoreError>> + Send;

    fn presigned_download_url(
        &self,
        object_key: &str,
        expires_in: Duration,
        options: PresignedDownloadOptions,
    ) -> impl Future<Output = Result<PresignedUrl, CoreError>> + Send;

    /// Lifetime is capped at one hour.
    fn presigned_delete_url(
        &self,
        object_key: &str,
        expires_in: Duration,
        options: AccessOptions,
    ) -> impl Future<Output = Result<PresignedUrl, CoreError>> + Send;

    fn presigned_list_url(
        &self,
        prefix: Option<&str>,
        expires_in: Duration,
        options: PresignedListOptions,
    ) -> impl Future<Output = Result<PresignedUrl, CoreError>> + Send;

    fn update_file_permissions(
        &self,
        object_key: &str,
        acl: ObjectAcl,
        options: AccessOptions,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;

    /// Lifetime is capped at one hour.
    fn presigned_acl_url(
        &self,
        object_key: &str,
        acl: ObjectAcl,
        expires_in: Duration,
        options: AccessOptions,
    ) -> impl Future<Output = Result<PresignedUrl, CoreError>> + Send;

    fn file_permissions(
        &self,
        object_key: &str,
        options: AccessOptions,
    ) -> impl Future<Output = Result<Vec<Grant>, CoreError>> + Send;

    fn check_bucket(
        &self,
        bucket: Option<&str>,
    ) -> impl Future<Output = Result<bool, CoreError>> + Send;

    fn create_bucket(&self, bucket: Option<&str>)
    -> impl Future<Output = Result<(), CoreError>> + Send;

    fn delete_bucket(&self, bucket: Option<&str>)
    -> impl Future<Output = Result<(), CoreError>> + Send;
}

impl<OS> Service<OS> {
    /// Dry run: the decision a call would get, without touching the store.
    /// Returns the request as evaluated, with the default role filled in.
    pub fn evaluate(&self, request: OperationRequest) -> (OperationRequest, Decision) {
        evaluate(self.policy(), request)
    }

    fn authorize(&self, request: OperationRequest) -> Result<OperationRequest, CoreError> {
        authorize(self.policy(), request)
    }
}

impl<OS> StorageService for Service<OS>
where
    OS: ObjectStoragePort,
{
    #[instrument(skip(self, body, options), fields(size = body.len()))]
    async fn upload_file(
        &self,
        object_key: &str,
        body: Bytes,
        content_type: Option<&str>,
        options: UploadOptions,
    ) -> Result<UploadedObject, CoreError> {
        let size_bytes = body.len() as u64;

        let request = self.authorize(
            OperationRequest::new(OperationKind::Write, object_key)
                .with_role(options.role)
                .with_content_type(content_type)
                .with_content_length(Some(size_bytes))
                .with_metadata(options.metadata),
        )?;

        let checksum_sha256 = hex::encode(Sha256::digest(&body));
        let bucket = self.bucket(options.bucket.as_deref()).to_string();

        self.object_storage
            .put_object(PutObjectInput {
                bucket: bucket.clone(),
                object_key: object_key.to_string(),
                payload: body,
                content_type: request.content_type.clone(),
                metadata: request.metadata,
            })
            .await?;

        tracing::info!(
            bucket = %bucket,
            object_key = %object_key,
            size = size_bytes,
            "File uploaded"
        );

        Ok(UploadedObject {
            bucket,
            object_key: object_key.to_string(),
            size_bytes,
            checksum_sha256,
            content_type: request.content_type,
        })
    }

    #[instrument(skip(self, options))]
    async fn download_file(
        &self,
        object_key: &str,
        options: AccessOptions,
    ) -> Result<Bytes, CoreError> {
        self.authorize(
            OperationRequest::new(OperationKind::Read, object_key).with_role(options.role),
        )?;

        let bucket = self.bucket(options.bucket.as_deref());
        self.object_storage.get_object(bucket, object_key).await
    }

    #[instrument(skip(self, options))]
    async fn delete_file(&self, object_key: &str, options: AccessOptions) -> Result<(), CoreError> {
        self.authorize(
            OperationRequest::new(OperationKind::Delete, object_key).with_role(options.role),
        )?;

        let bucket = self.bucket(options.bucket.as_deref());
        self.object_storage.delete_object(bucket, object_key).await?;

        tracing::info!(bucket = %bucket, object_key = %object_key, "File deleted");

        Ok(())
    }

    #[instrument(skip(self, options))]
    async fn list_files(
        &self,
        prefix: Option<&str>,
        options: AccessOptions,
    ) -> Result<Vec<ObjectEntry>, CoreError> {
        let prefix = prefix.unwrap_or_default();
        self.authorize(OperationRequest::new(OperationKind::List, prefix).with_role(options.role))?;

        let bucket = self.bucket(options.bucket.as_deref());
        let entries = self.object_storage.list_objects(bucket, prefix).await?;

        tracing::debug!(count = entries.len(), "Listed files");

        Ok(entries)
    }

    #[instrument(skip(self, options))]
    async fn presigned_upload_url(
        &self,
        object_key: &str,
        expires_in: Duration,
        options: PresignedUploadOptions,
    ) -> Result<PresignedUrl, CoreError> {
        ensure_expiry(OperationKind::PresignedUpload, expires_in)?;
        let request = self.authorize(
            OperationRequest::new(OperationKind::PresignedUpload, object_key)
                .with_role(options.role)
                .with_content_type(options.content_type)
                .with_content_length(options.max_size)
                .with_metadata(options.metadata),
        )?;

        self.issue(
            options.bucket.as_deref(),
            object_key,
            expires_in,
            PresignTarget::Upload {
                content_type: request.content_type,
                metadata: request.metadata,
            },
        )
        .await
    }

    #[instrument(skip(self, options))]
    async fn presigned_download_url(
        &self,
        object_key: &str,
        expires_in: Duration,
        options: PresignedDownloadOptions,
    ) -> Result<PresignedUrl, CoreError> {
        ensure_expiry(OperationKind::PresignedDownload, expires_in)?;
        self.authorize(
            OperationRequest::new(OperationKind::PresignedDownload, object_key)
                .with_role(options.role),
        )?;

        self.issue(
            options.bucket.as_deref(),
            object_key,
            expires_in,
            PresignTarget::Download {
                response_content_type: options.response_content_type,
                response_content_disposition: options.response_content_disposition,
            },
        )
        .await
    }

    #[instrument(skip(self, options))]
    async fn presigned_delete_url(
        &self,
        object_key: &str,
        expires_in: Duration,
        options: AccessOptions,
    ) -> Result<PresignedUrl, CoreError> {
        ensure_expiry(OperationKind::PresignedDelete, expires_in)?;
        self.authorize(
            OperationRequest::new(OperationKind::PresignedDelete, object_key)
                .with_role(options.role),
        )?;

        self.issue(
            options.bucket.as_deref(),
            object_key,
            expires_in,
            PresignTarget::Delete,
        )
        .await
    }

    #[instrument(skip(self, options))]
    async fn presigned_list_url(
        &self,
        prefix: Option<&str>,
        expires_in: Duration,
        options: PresignedListOptions,
    ) -> Result<PresignedUrl, CoreError> {
        let prefix = prefix.unwrap_or_default();
        ensure_expiry(OperationKind::PresignedList, expires_in)?;
        self.authorize(
            OperationRequest::new(OperationKind::PresignedList, prefix).with_role(options.role),
        )?;

        self.issue(
            options.bucket.as_deref(),
            prefix,
            expires_in,
            PresignTarget::List {
                max_keys: options.max_keys,
                delimiter: options.delimiter,
            },
        )
        .await
    }

    #[instrument(skip(self, options))]
    async fn update_file_permissions(
        &self,
        object_key: &str,
        acl: ObjectAcl,
        options: AccessOptions,
    ) -> Result<(), CoreError> {
        self.authorize(
            OperationRequest::new(OperationKind::AclWrite, object_key).with_role(options.role),
        )?;

        let bucket = self.bucket(options.bucket.as_deref());
        self.object_storage
            .put_object_acl(bucket, object_key, acl)
            .await?;

        tracing::info!(
            bucket = %bucket,
            object_key = %object_key,
            acl = %acl,
            "File permissions updated"
        );

        Ok(())
    }

    #[instrument(skip(self, options))]
    async fn presigned_acl_url(
        &self,
        object_key: &str,
        acl: ObjectAcl,
        expires_in: Duration,
        options: AccessOptions,
    ) -> Result<PresignedUrl, CoreError> {
        ensure_expiry(OperationKind::AclWrite, expires_in)?;
        self.authorize(
            OperationRequest::new(OperationKind::AclWrite, object_key).with_role(options.role),
        )?;

        self.issue(
            options.bucket.as_deref(),
            object_key,
            expires_in,
            PresignTarget::Acl { acl },
        )
        .await
    }

    #[instrument(skip(self, options))]
    async fn file_permissions(
        &self,
        object_key: &str,
        options: AccessOptions,
    ) -> Result<Vec<Grant>, CoreError> {
        self.authorize(
            OperationRequest::new(OperationKind::AclRead, object_key).with_role(options.role),
        )?;

        let bucket = self.bucket(options.bucket.as_deref());
        self.object_storage.get_object_acl(bucket, object_key).await
    }

    #[instrument(skip(self))]
    async fn check_bucket(&self, bucket: Option<&str>) -> Result<bool, CoreError> {
        self.object_storage.bucket_exists(self.bucket(bucket)).await
    }

    #[instrument(skip(self))]
    async fn create_bucket(&self, bucket: Option<&str>) -> Result<(), CoreError> {
        let bucket = self.bucket(bucket);
        self.object_storage.create_bucket(bucket).await?;
        tracing::info!(bucket = %bucket, "Bucket created");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_bucket(&self, bucket: Option<&str>) -> Result<(), CoreError> {
        let bucket = self.bucket(bucket);
        self.object_storage.delete_bucket(bucket).await?;
        tracing::info!(bucket = %bucket, "Bucket deleted");
        Ok(())
    }
}

impl<OS> Service<OS>
where
    OS: ObjectStoragePort,
{
    async fn issue(
        &self,
        bucket: Option<&str>,
        object_key: &str,
        expires_in: Duration,
        target: PresignTarget,
    ) -> Result<PresignedUrl, CoreError> {
        let presigned = self
            .object_storage
            .presign(PresignRequest {
                bucket: self.bucket(bucket).to_string(),
                object_key: object_key.to_string(),
                expires_in,
                target,
            })
            .await?;

        tracing::debug!(
            operation = %presigned.operation,
            object_key = %object_key,
            expires_in_secs = presigned.expires_in_seconds,
            "Issued presigned URL"
        );

        Ok(presigned)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::domain::{
        common::entities::app_errors::TransportErrorKind,
        policy::{
            entities::{RolePermissions, SecurityPolicy},
            value_objects::PolicyRule,
        },
        storage::ports::MockObjectStoragePort,
    };

    fn presigned(operation: OperationKind, request: &PresignRequest) -> PresignedUrl {
        PresignedUrl {
            url: format!(
                "https://store.test/{}/{}?X-Amz-Expires={}",
                request.bucket,
                request.object_key,
                request.expires_in.as_secs()
            ),
            method: "GET".to_string(),
            operation,
            expires_in_seconds: request.expires_in.as_secs(),
        }
    }

    fn viewer_policy() -> SecurityPolicy {
        SecurityPolicy::default()
            .with_role(
                "viewer",
                RolePermissions::new([OperationKind::Read, OperationKind::List]),
            )
            .with_role("admin", RolePermissions::new(OperationKind::ALL))
    }

    fn assert_violation(err: CoreError, expected: PolicyRule) {
        match err {
            CoreError::PolicyViolation { rule, .. } => assert_eq!(rule, expected),
            other => panic!("expected policy violation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_denied_upload_never_reaches_store() {
        // No expectations: any transport call panics.
        let storage = MockObjectStoragePort::new();
        let service = Service::new(
            storage,
            Some(SecurityPolicy::default().with_max_file_size(4)),
            "media",
        );

        let err = service
            .upload_file(
                "a.txt",
                Bytes::from_static(b"too long"),
                Some("text/plain"),
                UploadOptions::default(),
            )
            .await
            .unwrap_err();

        assert_violation(err, PolicyRule::FileSize);
    }

    #[tokio::test]
    async fn test_upload_delegates_with_computed_length() {
        let mut storage = MockObjectStoragePort::new();
        storage
            .expect_put_object()
            .withf(|input| {
                input.bucket == "media"
                    && input.object_key == "public/a.txt"
                    && input.payload.as_ref() == b"hello"
                    && input.content_type.as_deref() == Some("text/plain")
                    && input
                        .metadata
                        .as_ref()
                        .is_some_and(|m| m.get("owner").map(String::as_str) == Some("alice"))
            })
            .times(1)
            .returning(|_| Box::pin(async { Ok(()) }));

        let service = Service::new(
            storage,
            Some(SecurityPolicy::default().with_max_file_size(5)),
            "media",
        );

        let uploaded = service
            .upload_file(
                "public/a.txt",
                Bytes::from_static(b"hello"),
                Some("text/plain"),
                UploadOptions {
                    metadata: Some(BTreeMap::from([("owner".to_string(), "alice".to_string())])),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(uploaded.size_bytes, 5);
        assert_eq!(uploaded.bucket, "media");
        assert_eq!(
            uploaded.checksum_sha256,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[tokio::test]
    async fn test_viewer_cannot_write() {
        let service = Service::new(MockObjectStoragePort::new(), Some(viewer_policy()), "media");

        let err = service
            .upload_file(
                "doc.txt",
                Bytes::from_static(b"x"),
                None,
                UploadOptions {
                    role: Some("viewer".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        assert_violation(err, PolicyRule::RoleOperation);
    }

    #[tokio::test]
    async fn test_default_role_applies_to_anonymous_calls() {
        let service = Service::new(
            MockObjectStoragePort::new(),
            Some(viewer_policy().with_default_role("viewer")),
            "media",
        );

        let err = service
            .delete_file("doc.txt", AccessOptions::default())
            .await
            .unwrap_err();
        assert_violation(err, PolicyRule::RoleOperation);
    }

    #[tokio::test]
    async fn test_download_uses_bucket_override() {
        let mut storage = MockObjectStoragePort::new();
        storage
            .expect_get_object()
            .withf(|bucket, key| bucket == "archive" && key == "doc.txt")
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(Bytes::from_static(b"contents")) }));

        let service = Service::new(storage, Some(viewer_policy()), "media");
        let body = service
            .download_file(
                "doc.txt",
                AccessOptions {
                    role: Some("viewer".to_string()),
                    bucket: Some("archive".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(body.as_ref(), b"contents");
    }

    #[tokio::test]
    async fn test_transport_errors_pass_through() {
        let mut storage = MockObjectStoragePort::new();
        storage.expect_delete_object().times(1).returning(|bucket, key| {
            let (bucket, key) = (bucket.to_string(), key.to_string());
            Box::pin(async move {
                Err(CoreError::Transport {
                    kind: TransportErrorKind::AccessDenied,
                    operation: "delete_object",
                    bucket,
                    key,
                    message: "AccessDenied".to_string(),
                })
            })
        });

        let service = Service::new(storage, None, "media");
        let err = service
            .delete_file("doc.txt", AccessOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.transport_kind(), Some(TransportErrorKind::AccessDenied));
    }

    #[tokio::test]
    async fn test_list_checks_prefix_as_key() {
        let mut storage = MockObjectStoragePort::new();
        storage
            .expect_list_objects()
            .withf(|bucket, prefix| bucket == "media" && prefix == "public/")
            .times(1)
            .returning(|_, _| {
                Box::pin(async {
                    Ok(vec![ObjectEntry {
                        object_key: "public/a.png".to_string(),
                        size_bytes: 10,
                        last_modified: None,
                        etag: None,
                    }])
                })
            });

        let service = Service::new(
            storage,
            Some(SecurityPolicy::default().with_allowed_prefixes(["public/"])),
            "media",
        );

        let entries = service
            .list_files(Some("public/"), AccessOptions::default())
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);

        let err = service
            .list_files(None, AccessOptions::default())
            .await
            .unwrap_err();
        assert_violation(err, PolicyRule::AllowedPrefix);
    }

    #[tokio::test]
    async fn test_presigned_upload_checks_declared_attributes() {
        let policy = SecurityPolicy::default()
            .with_allowed_content_types(["image/png"])
            .with_max_file_size(1024);
        let service = Service::new(MockObjectStoragePort::new(), Some(policy), "media");

        let err = service
            .presigned_upload_url(
                "a.png",
                Duration::from_secs(300),
                PresignedUploadOptions {
                    content_type: Some("image/png".to_string()),
                    max_size: Some(2048),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_violation(err, PolicyRule::FileSize);

        let err = service
            .presigned_upload_url(
                "a.gif",
                Duration::from_secs(300),
                PresignedUploadOptions {
                    content_type: Some("image/gif".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_violation(err, PolicyRule::ContentType);
    }

    #[tokio::test]
    async fn test_presigned_upload_signs_content_type() {
        let mut storage = MockObjectStoragePort::new();
        storage
            .expect_presign()
            .withf(|request| {
                request.target
                    == PresignTarget::Upload {
                        content_type: Some("image/png".to_string()),
                        metadata: None,
                    }
            })
            .times(1)
            .returning(|request| {
                let url = presigned(OperationKind::PresignedUpload, &request);
                Box::pin(async move { Ok(url) })
            });

        let service = Service::new(storage, None, "media");
        let url = service
            .presigned_upload_url(
                "a.png",
                Duration::from_secs(600),
                PresignedUploadOptions {
                    content_type: Some("image/png".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(url.expires_in_seconds, 600);
        assert_eq!(url.operation, OperationKind::PresignedUpload);
    }

    #[tokio::test]
    async fn test_presigned_download_requires_presign_permission() {
        let service = Service::new(MockObjectStoragePort::new(), Some(viewer_policy()), "media");

        let err = service
            .presigned_download_url(
                "doc.txt",
                Duration::from_secs(60),
                PresignedDownloadOptions {
                    role: Some("viewer".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_violation(err, PolicyRule::RoleOperation);
    }

    #[tokio::test]
    async fn test_presigned_delete_expiry_boundary() {
        let mut storage = MockObjectStoragePort::new();
        storage
            .expect_presign()
            .withf(|request| request.target == PresignTarget::Delete)
            .times(1)
            .returning(|request| {
                let url = presigned(OperationKind::PresignedDelete, &request);
                Box::pin(async move { Ok(url) })
            });

        let service = Service::new(storage, None, "media");

        let err = service
            .presigned_delete_url("a", Duration::from_secs(3601), AccessOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::ExpiryLimitExceeded { requested: 3601, .. }));

        let url = service
            .presigned_delete_url("a", Duration::from_secs(3600), AccessOptions::default())
            .await
            .unwrap();
        assert_eq!(url.expires_in_seconds, 3600);
    }

    #[tokio::test]
    async fn test_presigned_acl_expiry_boundary() {
        let mut storage = MockObjectStoragePort::new();
        storage
            .expect_presign()
            .withf(|request| {
                request.target
                    == PresignTarget::Acl {
                        acl: ObjectAcl::PublicRead,
                    }
            })
            .times(1)
            .returning(|request| {
                let url = presigned(OperationKind::AclWrite, &request);
                Box::pin(async move { Ok(url) })
            });

        let service = Service::new(storage, Some(viewer_policy()), "media");

        let admin = AccessOptions::as_role("admin");
        let err = service
            .presigned_acl_url(
                "a",
                ObjectAcl::PublicRead,
                Duration::from_secs(3601),
                admin.clone(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::ExpiryLimitExceeded { ceiling: 3600, .. }));

        service
            .presigned_acl_url("a", ObjectAcl::PublicRead, Duration::from_secs(3600), admin)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_presigned_list_passes_options() {
        let mut storage = MockObjectStoragePort::new();
        storage
            .expect_presign()
            .withf(|request| {
                request.object_key == "logs/"
                    && request.target
                        == PresignTarget::List {
                            max_keys: Some(100),
                            delimiter: Some("/".to_string()),
                        }
            })
            .times(1)
            .returning(|request| {
                let url = presigned(OperationKind::PresignedList, &request);
                Box::pin(async move { Ok(url) })
            });

        let service = Service::new(storage, None, "media");
        service
            .presigned_list_url(
                Some("logs/"),
                Duration::from_secs(3 * 3600),
                PresignedListOptions {
                    max_keys: Some(100),
                    delimiter: Some("/".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_acl_operations_are_gated() {
        let mut storage = MockObjectStoragePort::new();
        storage
            .expect_get_object_acl()
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(Vec::new()) }));

        let policy = SecurityPolicy::default().with_role(
            "auditor",
            RolePermissions::new([OperationKind::AclRead]),
        );
        let service = Service::new(storage, Some(policy), "media");

        let grants = service
            .file_permissions("a", AccessOptions::as_role("auditor"))
            .await
            .unwrap();
        assert!(grants.is_empty());

        let err = service
            .update_file_permissions("a", ObjectAcl::PublicRead, AccessOptions::as_role("auditor"))
            .await
            .unwrap_err();
        assert_violation(err, PolicyRule::RoleOperation);
    }

    #[tokio::test]
    async fn test_bucket_operations_use_default_bucket() {
        let mut storage = MockObjectStoragePort::new();
        storage
            .expect_bucket_exists()
            .withf(|bucket| bucket == "media")
            .times(1)
            .returning(|_| Box::pin(async { Ok(false) }));
        storage
            .expect_create_bucket()
            .withf(|bucket| bucket == "other")
            .times(1)
            .returning(|_| Box::pin(async { Ok(()) }));

        let service = Service::new(
            storage,
            Some(SecurityPolicy::default().with_allowed_prefixes(["nothing/"])),
            "media",
        );

        assert!(!service.check_bucket(None).await.unwrap());
        service.create_bucket(Some("other")).await.unwrap();
    }

    #[test]
    fn test_evaluate_reports_effective_role() {
        let service = Service::new(
            MockObjectStoragePort::new(),
            Some(viewer_policy().with_default_role("viewer")),
            "media",
        );

        let (request, decision) =
            service.evaluate(OperationRequest::new(OperationKind::List, "any/"));
        assert_eq!(request.role.as_deref(), Some("viewer"));
        assert!(decision.is_allowed());
    }
}
