use crate::domain::policy::entities::SecurityPolicy;

pub mod entities;
pub mod policies;
pub mod services;

pub const DEFAULT_REGION: &str = "us-east-1";

#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub region: String,
    pub credentials: Option<StaticCredentials>,
    pub default_bucket: String,
    pub endpoint: Option<String>,
    pub force_path_style: bool,
    pub security: Option<SecurityPolicy>,
}

impl StorageConfig {
    pub fn new(region: impl Into<String>, default_bucket: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            credentials: None,
            default_bucket: default_bucket.into(),
            endpoint: None,
            force_path_style: false,
            security: None,
        }
    }
}

#[derive(Clone)]
pub struct StaticCredentials {
    pub access_key: String,
    pub secret_key: String,
    pub session_token: Option<String>,
}

impl std::fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"** redacted **")
            .field("session_token", &self.session_token.as_ref().map(|_| "** redacted **"))
            .finish()
    }
}
