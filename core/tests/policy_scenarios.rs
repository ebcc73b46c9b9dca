use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use bucketward_core::domain::{
    common::{
        entities::app_errors::{CoreError, TransportErrorKind},
        services::Service,
    },
    policy::{
        entities::{OperationKind, RolePermissions, SecurityPolicy},
        validator::validate,
        value_objects::{Decision, OperationRequest, PolicyRule},
    },
    storage::{
        entities::{Grant, ObjectEntry, PresignedUrl},
        ports::ObjectStoragePort,
        services::StorageService,
        value_objects::{
            AccessOptions, ObjectAcl, PresignRequest, PutObjectInput, UploadOptions,
        },
    },
};
use bytes::Bytes;

/// In-process store that records how often it was reached.
#[derive(Default)]
struct MemoryStore {
    objects: Mutex<HashMap<(String, String), Bytes>>,
    calls: Mutex<usize>,
}

impl MemoryStore {
    fn touch(&self) {
        *self.calls.lock().unwrap() += 1;
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

fn not_found(bucket: &str, key: &str) -> CoreError {
    CoreError::Transport {
        kind: TransportErrorKind::NotFound,
        operation: "get_object",
        bucket: bucket.to_string(),
        key: key.to_string(),
        message: "NoSuchKey".to_string(),
    }
}

impl ObjectStoragePort for MemoryStore {
    async fn bucket_exists(&self, _bucket: &str) -> Result<bool, CoreError> {
        self.touch();
        Ok(true)
    }

    async fn create_bucket(&self, _bucket: &str) -> Result<(), CoreError> {
        self.touch();
        Ok(())
    }

    async fn delete_bucket(&self, _bucket: &str) -> Result<(), CoreError> {
        self.touch();
        Ok(())
    }

    async fn put_object(&self, input: PutObjectInput) -> Result<(), CoreError> {
        self.touch();
        self.objects
            .lock()
            .unwrap()
            .insert((input.bucket, input.object_key), input.payload);
        Ok(())
    }

    async fn get_object(&self, bucket: &str, object_key: &str) -> Result<Bytes, CoreError> {
        self.touch();
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), object_key.to_string()))
            .cloned()
            .ok_or_else(|| not_found(bucket, object_key))
    }

    async fn delete_object(&self, bucket: &str, object_key: &str) -> Result<(), CoreError> {
        self.touch();
        self.objects
            .lock()
            .unwrap()
            .remove(&(bucket.to_string(), object_key.to_string()));
        Ok(())
    }

    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectEntry>, CoreError> {
        self.touch();
        let mut entries: Vec<ObjectEntry> = self
            .objects
            .lock()
            .unwrap()
            .iter()
            .filter(|((b, k), _)| b == bucket && k.starts_with(prefix))
            .map(|((_, k), body)| ObjectEntry {
                object_key: k.clone(),
                size_bytes: body.len() as u64,
                last_modified: None,
                etag: None,
            })
            .collect();
        entries.sort_by(|a, b| a.object_key.cmp(&b.object_key));
        Ok(entries)
    }

    async fn get_object_acl(&self, _bucket: &str, _object_key: &str) -> Result<Vec<Grant>, CoreError> {
        self.touch();
        Ok(Vec::new())
    }

    async fn put_object_acl(
        &self,
        _bucket: &str,
        _object_key: &str,
        _acl: ObjectAcl,
    ) -> Result<(), CoreError> {
        self.touch();
        Ok(())
    }

    async fn presign(&self, request: PresignRequest) -> Result<PresignedUrl, CoreError> {
        self.touch();
        Ok(PresignedUrl {
            url: format!("memory://{}/{}", request.bucket, request.object_key),
            method: "GET".to_string(),
            operation: OperationKind::PresignedDownload,
            expires_in_seconds: request.expires_in.as_secs(),
        })
    }
}

#[test]
fn scenario_a_key_outside_allowed_prefix() {
    let policy = SecurityPolicy::default().with_allowed_prefixes(["public/"]);
    let decision = validate(
        Some(&policy),
        &OperationRequest::new(OperationKind::Read, "private/x.txt"),
    );

    assert_eq!(decision.rule(), Some(PolicyRule::AllowedPrefix));
    assert!(decision.reason().unwrap().contains("prefix"));
}

#[test]
fn scenario_b_viewer_cannot_write() {
    let policy = SecurityPolicy::default().with_role(
        "viewer",
        RolePermissions::new([OperationKind::Read, OperationKind::List]),
    );
    let decision = validate(
        Some(&policy),
        &OperationRequest::new(OperationKind::Write, "doc.txt").with_role(Some("viewer")),
    );

    assert_eq!(decision.rule(), Some(PolicyRule::RoleOperation));
    assert!(decision.reason().unwrap().contains("not allowed for role"));
}

#[test]
fn scenario_c_no_policy_allows() {
    for kind in OperationKind::ALL {
        assert_eq!(
            validate(None, &OperationRequest::new(kind, "anything")),
            Decision::Allow
        );
    }
}

#[test]
fn scenario_d_size_boundary() {
    let policy = SecurityPolicy::default().with_max_file_size(1000);
    let request = |length| {
        OperationRequest::new(OperationKind::Write, "f").with_content_length(Some(length))
    };

    assert_eq!(
        validate(Some(&policy), &request(1001)).rule(),
        Some(PolicyRule::FileSize)
    );
    assert!(validate(Some(&policy), &request(1000)).is_allowed());
}

#[tokio::test]
async fn denied_calls_never_reach_the_store() {
    let policy = SecurityPolicy::default()
        .with_allowed_prefixes(["public/"])
        .with_denied_prefixes(["public/secret/"])
        .with_role("viewer", RolePermissions::new([OperationKind::Read]))
        .with_default_role("viewer");
    let service = Service::new(MemoryStore::default(), Some(policy), "media");

    let attempts = [
        service
            .upload_file(
                "public/a.txt",
                Bytes::from_static(b"a"),
                None,
                UploadOptions::default(),
            )
            .await
            .map(|_| ()),
        service
            .download_file("private/a.txt", AccessOptions::default())
            .await
            .map(|_| ()),
        service
            .download_file("public/secret/a.txt", AccessOptions::default())
            .await
            .map(|_| ()),
        service
            .delete_file("public/a.txt", AccessOptions::default())
            .await,
        service
            .download_file("public/a.txt", AccessOptions::as_role("ghost"))
            .await
            .map(|_| ()),
        service
            .presigned_delete_url(
                "public/a.txt",
                Duration::from_secs(60),
                AccessOptions::default(),
            )
            .await
            .map(|_| ()),
    ];

    for attempt in attempts {
        assert!(matches!(attempt, Err(CoreError::PolicyViolation { .. })));
    }
    assert_eq!(service_calls(&service), 0);
}

#[tokio::test]
async fn allowed_round_trip() {
    let policy = SecurityPolicy::default()
        .with_allowed_prefixes(["public/"])
        .with_role("editor", RolePermissions::new(OperationKind::ALL))
        .with_role("viewer", RolePermissions::new([OperationKind::Read, OperationKind::List]));
    let service = Service::new(MemoryStore::default(), Some(policy), "media");

    service
        .upload_file(
            "public/a.txt",
            Bytes::from_static(b"hello"),
            Some("text/plain"),
            UploadOptions {
                role: Some("editor".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let body = service
        .download_file("public/a.txt", AccessOptions::as_role("viewer"))
        .await
        .unwrap();
    assert_eq!(body.as_ref(), b"hello");

    let listed = service
        .list_files(Some("public/"), AccessOptions::as_role("viewer"))
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].size_bytes, 5);

    let err = service
        .download_file("public/missing.txt", AccessOptions::as_role("viewer"))
        .await
        .unwrap_err();
    assert_eq!(err.transport_kind(), Some(TransportErrorKind::NotFound));
}

#[tokio::test]
async fn expiry_ceiling_holds_without_policy() {
    let service = Service::new(MemoryStore::default(), None, "media");

    let err = service
        .presigned_acl_url(
            "a",
            ObjectAcl::PublicRead,
            Duration::from_secs(3601),
            AccessOptions::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CoreError::ExpiryLimitExceeded {
            operation: OperationKind::AclWrite,
            ..
        }
    ));
    assert_eq!(service_calls(&service), 0);
}

fn service_calls(service: &Service<MemoryStore>) -> usize {
    service.object_storage().calls()
}
