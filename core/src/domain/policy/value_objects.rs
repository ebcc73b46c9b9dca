use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::entities::OperationKind;

/// Attributes of a single storage call, as seen by the validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRequest {
    pub operation: OperationKind,
    pub key: String,
    pub role: Option<String>,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub metadata: Option<BTreeMap<String, String>>,
}

impl OperationRequest {
    pub fn new(operation: OperationKind, key: impl Into<String>) -> Self {
        Self {
            operation,
            key: key.into(),
            role: None,
            content_type: None,
            content_length: None,
            metadata: None,
        }
    }

    pub fn with_role(mut self, role: Option<impl Into<String>>) -> Self {
        self.role = role.map(Into::into);
        self
    }

    pub fn with_content_type(mut self, content_type: Option<impl Into<String>>) -> Self {
        self.content_type = content_type.map(Into::into);
        self
    }

    pub fn with_content_length(mut self, content_length: Option<u64>) -> Self {
        self.content_length = content_length;
        self
    }

    pub fn with_metadata(mut self, metadata: Option<BTreeMap<String, String>>) -> Self {
        self.metadata = metadata;
        self
    }
}

/// The constraint that rejected a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyRule {
    ContentType,
    FileSize,
    AllowedPrefix,
    DeniedPrefix,
    RoleNotConfigured,
    RoleOperation,
    RolePrefix,
    RoleContentType,
    RoleFileSize,
}

impl PolicyRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyRule::ContentType => "content_type",
            PolicyRule::FileSize => "file_size",
            PolicyRule::AllowedPrefix => "allowed_prefix",
            PolicyRule::DeniedPrefix => "denied_prefix",
            PolicyRule::RoleNotConfigured => "role_not_configured",
            PolicyRule::RoleOperation => "role_operation",
            PolicyRule::RolePrefix => "role_prefix",
            PolicyRule::RoleContentType => "role_content_type",
            PolicyRule::RoleFileSize => "role_file_size",
        }
    }
}

impl fmt::Display for PolicyRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    Allow,
    Deny { rule: PolicyRule, reason: String },
}

impl Decision {
    pub fn deny(rule: PolicyRule, reason: impl Into<String>) -> Self {
        Decision::Deny {
            rule,
            reason: reason.into(),
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Decision::Allow => None,
            Decision::Deny { reason, .. } => Some(reason),
        }
    }

    pub fn rule(&self) -> Option<PolicyRule> {
        match self {
            Decision::Allow => None,
            Decision::Deny { rule, .. } => Some(*rule),
        }
    }
}
