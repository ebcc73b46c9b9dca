use crate::{
    domain::common::{StorageConfig, entities::app_errors::CoreError, services::Service},
    infrastructure::object_storage::S3ObjectStorage,
};

pub type BucketwardService = Service<S3ObjectStorage>;

/// Builds the S3-backed facade. The policy, if any, is checked once here and
/// frozen for the lifetime of the service.
pub async fn create_service(config: StorageConfig) -> Result<BucketwardService, CoreError> {
    if config.default_bucket.is_empty() {
        return Err(CoreError::Configuration(
            "a default bucket must be configured".to_string(),
        ));
    }

    if let Some(policy) = &config.security {
        policy.ensure_well_formed()?;
    }

    let object_storage = S3ObjectStorage::new(&config).await?;

    tracing::info!(
        bucket = %config.default_bucket,
        security = config.security.is_some(),
        "Storage service ready"
    );

    Ok(Service::new(
        object_storage,
        config.security,
        config.default_bucket,
    ))
}
