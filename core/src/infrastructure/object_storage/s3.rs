use std::collections::HashMap;
use std::time::SystemTime;

use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_sdk_s3::{
    Client,
    config::{BehaviorVersion, Credentials, Region},
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    presigning::PresigningConfig,
    primitives::ByteStream,
    types::{BucketLocationConstraint, CreateBucketConfiguration, ObjectCannedAcl},
};
use bytes::Bytes;
use tracing::instrument;

use crate::domain::{
    common::{
        DEFAULT_REGION, StorageConfig,
        entities::app_errors::{CoreError, TransportErrorKind},
    },
    policy::entities::OperationKind,
    storage::{
        entities::{Grant, ObjectEntry, PresignedUrl},
        ports::ObjectStoragePort,
        value_objects::{ObjectAcl, PresignRequest, PresignTarget, PutObjectInput},
    },
};

use super::mappers::classify;
use super::signing::{EndpointResolver, presign_url};

/// [`ObjectStoragePort`] backed by the AWS SDK. Works against AWS S3 and
/// S3-compatible servers such as MinIO.
#[derive(Clone)]
pub struct S3ObjectStorage {
    client: Client,
    region: String,
    endpoints: EndpointResolver,
    credentials: Option<SharedCredentialsProvider>,
}

impl S3ObjectStorage {
    pub async fn new(config: &StorageConfig) -> Result<Self, CoreError> {
        let endpoint = config
            .endpoint
            .as_deref()
            .map(|endpoint| endpoint.trim_end_matches('/'));

        tracing::info!(
            endpoint = endpoint.unwrap_or("aws"),
            region = %config.region,
            force_path_style = config.force_path_style,
            "Initializing object storage client"
        );

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));

        if let Some(static_credentials) = &config.credentials {
            loader = loader.credentials_provider(Credentials::new(
                &static_credentials.access_key,
                &static_credentials.secret_key,
                static_credentials.session_token.clone(),
                None,
                "bucketward",
            ));
        }

        let sdk_config = loader.load().await;

        let mut s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.force_path_style);
        if let Some(endpoint) = endpoint {
            s3_config = s3_config.endpoint_url(endpoint);
        }

        Ok(Self {
            client: Client::from_conf(s3_config.build()),
            region: config.region.clone(),
            endpoints: EndpointResolver::new(endpoint, &config.region, config.force_path_style)?,
            credentials: sdk_config.credentials_provider().map(|provider| provider.clone()),
        })
    }

    async fn resolve_credentials(&self) -> Result<Credentials, CoreError> {
        let provider = self.credentials.as_ref().ok_or_else(|| {
            CoreError::Configuration("no credentials available for signing".to_string())
        })?;

        provider.provide_credentials().await.map_err(|e| {
            CoreError::Configuration(format!(
                "failed to resolve credentials: {}",
                DisplayErrorContext(&e)
            ))
        })
    }

    /// Signs requests the SDK has no presigner for.
    async fn presign_manually(
        &self,
        request: &PresignRequest,
        max_keys: Option<i32>,
        delimiter: Option<&str>,
        acl: Option<ObjectAcl>,
    ) -> Result<(String, &'static str), CoreError> {
        let (mut url, method) = match acl {
            Some(acl) => {
                let mut url = self
                    .endpoints
                    .url(&request.bucket, Some(&request.object_key))?;
                url.set_query(Some("acl"));
                url.query_pairs_mut().append_pair("x-amz-acl", acl.as_str());
                (url, "PUT")
            }
            None => {
                let mut url = self.endpoints.url(&request.bucket, None)?;
                {
                    let mut pairs = url.query_pairs_mut();
                    pairs.append_pair("list-type", "2");
                    if !request.object_key.is_empty() {
                        pairs.append_pair("prefix", &request.object_key);
                    }
                    if let Some(max_keys) = max_keys {
                        pairs.append_pair("max-keys", &max_keys.to_string());
                    }
                    if let Some(delimiter) = delimiter {
                        pairs.append_pair("delimiter", delimiter);
                    }
                }
                (url, "GET")
            }
        };

        let credentials = self.resolve_credentials().await?;
        url = presign_url(
            method,
            url,
            credentials,
            &self.region,
            request.expires_in,
            SystemTime::now(),
        )?;

        Ok((url.to_string(), method))
    }
}

fn transport_error<E, R>(
    operation: &'static str,
    bucket: &str,
    object_key: &str,
    error: SdkError<E, R>,
) -> CoreError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let kind = classify(&error);
    let message = DisplayErrorContext(&error).to_string();

    tracing::error!(
        error = %message,
        error_kind = %kind,
        operation = operation,
        bucket = %bucket,
        object_key = %object_key,
        "Object storage request failed"
    );

    CoreError::Transport {
        kind,
        operation,
        bucket: bucket.to_string(),
        key: object_key.to_string(),
        message,
    }
}

fn presign_error(operation: &'static str, request: &PresignRequest, message: String) -> CoreError {
    tracing::error!(
        error = %message,
        bucket = %request.bucket,
        object_key = %request.object_key,
        "Failed to generate presigned URL"
    );

    CoreError::Transport {
        kind: TransportErrorKind::Other,
        operation,
        bucket: request.bucket.clone(),
        key: request.object_key.clone(),
        message,
    }
}

impl ObjectStoragePort for S3ObjectStorage {
    #[instrument(skip(self))]
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, CoreError> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(e) if classify(&e) == TransportErrorKind::NotFound => Ok(false),
            Err(e) => Err(transport_error("head_bucket", bucket, "", e)),
        }
    }

    #[instrument(skip(self))]
    async fn create_bucket(&self, bucket: &str) -> Result<(), CoreError> {
        let mut request = self.client.create_bucket().bucket(bucket);

        // us-east-1 rejects an explicit location constraint.
        if self.region != DEFAULT_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }

        request
            .send()
            .await
            .map_err(|e| transport_error("create_bucket", bucket, "", e))?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_bucket(&self, bucket: &str) -> Result<(), CoreError> {
        self.client
            .delete_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| transport_error("delete_bucket", bucket, "", e))?;

        Ok(())
    }

    #[instrument(skip(self, input), fields(bucket = %input.bucket, object_key = %input.object_key))]
    async fn put_object(&self, input: PutObjectInput) -> Result<(), CoreError> {
        let payload_size = input.payload.len();

        tracing::debug!(
            size = payload_size,
            content_type = input.content_type.as_deref().unwrap_or("-"),
            "Uploading object to storage"
        );

        self.client
            .put_object()
            .bucket(&input.bucket)
            .key(&input.object_key)
            .set_content_type(input.content_type)
            .set_metadata(input.metadata.map(|metadata| metadata.into_iter().collect()))
            .body(ByteStream::from(input.payload))
            .send()
            .await
            .map_err(|e| transport_error("put_object", &input.bucket, &input.object_key, e))?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_object(&self, bucket: &str, object_key: &str) -> Result<Bytes, CoreError> {
        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(object_key)
            .send()
            .await
            .map_err(|e| transport_error("get_object", bucket, object_key, e))?;

        let body = response.body.collect().await.map_err(|e| CoreError::Transport {
            kind: TransportErrorKind::Transient,
            operation: "get_object",
            bucket: bucket.to_string(),
            key: object_key.to_string(),
            message: format!("failed to read object body: {e}"),
        })?;

        Ok(body.into_bytes())
    }

    #[instrument(skip(self))]
    async fn delete_object(&self, bucket: &str, object_key: &str) -> Result<(), CoreError> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(object_key)
            .send()
            .await
            .map_err(|e| transport_error("delete_object", bucket, object_key, e))?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectEntry>, CoreError> {
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .set_prefix((!prefix.is_empty()).then(|| prefix.to_string()))
            .into_paginator()
            .send();

        let mut entries = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| transport_error("list_objects_v2", bucket, prefix, e))?;
            entries.extend(page.contents().iter().map(ObjectEntry::from));
        }

        Ok(entries)
    }

    #[instrument(skip(self))]
    async fn get_object_acl(&self, bucket: &str, object_key: &str) -> Result<Vec<Grant>, CoreError> {
        let response = self
            .client
            .get_object_acl()
            .bucket(bucket)
            .key(object_key)
            .send()
            .await
            .map_err(|e| transport_error("get_object_acl", bucket, object_key, e))?;

        Ok(response.grants().iter().map(Grant::from).collect())
    }

    #[instrument(skip(self))]
    async fn put_object_acl(
        &self,
        bucket: &str,
        object_key: &str,
        acl: ObjectAcl,
    ) -> Result<(), CoreError> {
        self.client
            .put_object_acl()
            .bucket(bucket)
            .key(object_key)
            .acl(ObjectCannedAcl::from(acl.as_str()))
            .send()
            .await
            .map_err(|e| transport_error("put_object_acl", bucket, object_key, e))?;

        Ok(())
    }

    #[instrument(skip(self, request), fields(bucket = %request.bucket, object_key = %request.object_key))]
    async fn presign(&self, request: PresignRequest) -> Result<PresignedUrl, CoreError> {
        let expires_in_seconds = request.expires_in.as_secs();
        let presigning_config = PresigningConfig::expires_in(request.expires_in)
            .map_err(|e| CoreError::Invalid(format!("Invalid expiration: {e}")))?;

        let (url, method, operation) = match &request.target {
            PresignTarget::Upload {
                content_type,
                metadata,
            } => {
                let presigned = self
                    .client
                    .put_object()
                    .bucket(&request.bucket)
                    .key(&request.object_key)
                    .set_content_type(content_type.clone())
                    .set_metadata(
                        metadata
                            .clone()
                            .map(|metadata| metadata.into_iter().collect::<HashMap<_, _>>()),
                    )
                    .presigned(presigning_config)
                    .await
                    .map_err(|e| presign_error("put_object", &request, e.to_string()))?;
                (
                    presigned.uri().to_string(),
                    presigned.method().to_string(),
                    OperationKind::PresignedUpload,
                )
            }
            PresignTarget::Download {
                response_content_type,
                response_content_disposition,
            } => {
                let presigned = self
                    .client
                    .get_object()
                    .bucket(&request.bucket)
                    .key(&request.object_key)
                    .set_response_content_type(response_content_type.clone())
                    .set_response_content_disposition(response_content_disposition.clone())
                    .presigned(presigning_config)
                    .await
                    .map_err(|e| presign_error("get_object", &request, e.to_string()))?;
                (
                    presigned.uri().to_string(),
                    presigned.method().to_string(),
                    OperationKind::PresignedDownload,
                )
            }
            PresignTarget::Delete => {
                let presigned = self
                    .client
                    .delete_object()
                    .bucket(&request.bucket)
                    .key(&request.object_key)
                    .presigned(presigning_config)
                    .await
                    .map_err(|e| presign_error("delete_object", &request, e.to_string()))?;
                (
                    presigned.uri().to_string(),
                    presigned.method().to_string(),
                    OperationKind::PresignedDelete,
                )
            }
            PresignTarget::List {
                max_keys,
                delimiter,
            } => {
                let (url, method) = self
                    .presign_manually(&request, *max_keys, delimiter.as_deref(), None)
                    .await?;
                (url, method.to_string(), OperationKind::PresignedList)
            }
            PresignTarget::Acl { acl } => {
                let (url, method) = self
                    .presign_manually(&request, None, None, Some(*acl))
                    .await?;
                (url, method.to_string(), OperationKind::AclWrite)
            }
        };

        tracing::debug!(
            method = %method,
            expires_in_secs = expires_in_seconds,
            "Generated presigned URL"
        );

        Ok(PresignedUrl {
            url,
            method,
            operation,
            expires_in_seconds,
        })
    }
}
