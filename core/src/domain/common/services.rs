use std::sync::Arc;

use crate::domain::policy::entities::SecurityPolicy;

/// The storage facade: a transport handle plus the immutable policy that
/// gates it.
#[derive(Clone)]
pub struct Service<OS> {
    pub(crate) object_storage: OS,
    pub(crate) policy: Option<Arc<SecurityPolicy>>,
    pub(crate) default_bucket: String,
}

impl<OS> Service<OS> {
    pub fn new(
        object_storage: OS,
        policy: Option<SecurityPolicy>,
        default_bucket: impl Into<String>,
    ) -> Self {
        Self {
            object_storage,
            policy: policy.map(Arc::new),
            default_bucket: default_bucket.into(),
        }
    }

    pub fn policy(&self) -> Option<&SecurityPolicy> {
        self.policy.as_deref()
    }

    pub fn object_storage(&self) -> &OS {
        &self.object_storage
    }

    pub fn default_bucket(&self) -> &str {
        &self.default_bucket
    }

    pub(crate) fn bucket<'a>(&'a self, bucket: Option<&'a str>) -> &'a str {
        bucket.unwrap_or(&self.default_bucket)
    }
}
