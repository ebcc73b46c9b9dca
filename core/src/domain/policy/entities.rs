use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::common::entities::app_errors::CoreError;

/// Kind of storage operation a request is evaluated for.
///
/// Presigned variants describe the operation the URL holder will perform
/// later, so a role can be allowed to read directly but not hand out
/// download links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Read,
    Write,
    Delete,
    List,
    AclRead,
    AclWrite,
    PresignedUpload,
    PresignedDownload,
    PresignedDelete,
    PresignedList,
}

impl OperationKind {
    pub const ALL: [OperationKind; 10] = [
        OperationKind::Read,
        OperationKind::Write,
        OperationKind::Delete,
        OperationKind::List,
        OperationKind::AclRead,
        OperationKind::AclWrite,
        OperationKind::PresignedUpload,
        OperationKind::PresignedDownload,
        OperationKind::PresignedDelete,
        OperationKind::PresignedList,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Read => "read",
            OperationKind::Write => "write",
            OperationKind::Delete => "delete",
            OperationKind::List => "list",
            OperationKind::AclRead => "acl_read",
            OperationKind::AclWrite => "acl_write",
            OperationKind::PresignedUpload => "presigned_upload",
            OperationKind::PresignedDownload => "presigned_download",
            OperationKind::PresignedDelete => "presigned_delete",
            OperationKind::PresignedList => "presigned_list",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OperationKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OperationKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CoreError::Invalid(format!("unknown operation kind: {s}")))
    }
}

/// Permissions attached to a named role.
///
/// Every optional field narrows the global policy when set. A `None` and an
/// empty collection are treated the same way: no extra restriction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RolePermissions {
    pub allowed_operations: BTreeSet<OperationKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_prefixes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_file_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_content_types: Option<BTreeSet<String>>,
}

impl RolePermissions {
    pub fn new(operations: impl IntoIterator<Item = OperationKind>) -> Self {
        Self {
            allowed_operations: operations.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn with_allowed_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_prefixes = Some(prefixes.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = Some(max_file_size);
        self
    }

    pub fn with_allowed_content_types<I, S>(mut self, content_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_content_types = Some(content_types.into_iter().map(Into::into).collect());
        self
    }

    pub fn allows(&self, operation: OperationKind) -> bool {
        self.allowed_operations.contains(&operation)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleBasedAccess {
    #[serde(default)]
    pub roles: BTreeMap<String, RolePermissions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_role: Option<String>,
}

impl RoleBasedAccess {
    pub fn role(&self, name: &str) -> Option<&RolePermissions> {
        self.roles.get(name)
    }
}

/// Global security limits applied to every operation.
///
/// Built once when the client is configured and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_file_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_content_types: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_prefixes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub denied_prefixes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_based_access: Option<RoleBasedAccess>,
}

impl SecurityPolicy {
    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = Some(max_file_size);
        self
    }

    pub fn with_allowed_content_types<I, S>(mut self, content_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_content_types = Some(content_types.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_allowed_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_prefixes = Some(prefixes.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_denied_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.denied_prefixes = Some(prefixes.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_role(mut self, name: impl Into<String>, permissions: RolePermissions) -> Self {
        self.role_based_access
            .get_or_insert_with(RoleBasedAccess::default)
            .roles
            .insert(name.into(), permissions);
        self
    }

    pub fn with_default_role(mut self, name: impl Into<String>) -> Self {
        self.role_based_access
            .get_or_insert_with(RoleBasedAccess::default)
            .default_role = Some(name.into());
        self
    }

    pub fn role(&self, name: &str) -> Option<&RolePermissions> {
        self.role_based_access.as_ref()?.role(name)
    }

    pub fn default_role(&self) -> Option<&str> {
        self.role_based_access.as_ref()?.default_role.as_deref()
    }

    /// Rejects role tables that could never be satisfied or that reference
    /// roles which do not exist.
    pub fn ensure_well_formed(&self) -> Result<(), CoreError> {
        let Some(rba) = &self.role_based_access else {
            return Ok(());
        };

        if let Some((name, _)) = rba
            .roles
            .iter()
            .find(|(_, permissions)| permissions.allowed_operations.is_empty())
        {
            return Err(CoreError::InvalidPolicy(format!(
                "role '{name}' must allow at least one operation"
            )));
        }

        if let Some(default_role) = &rba.default_role
            && !rba.roles.contains_key(default_role)
        {
            return Err(CoreError::InvalidPolicy(format!(
                "default role '{default_role}' is not configured"
            )));
        }

        Ok(())
    }

    pub fn from_json_str(raw: &str) -> Result<Self, CoreError> {
        let policy: SecurityPolicy = serde_json::from_str(raw)
            .map_err(|e| CoreError::InvalidPolicy(format!("malformed policy document: {e}")))?;
        policy.ensure_well_formed()?;
        Ok(policy)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CoreError::Configuration(format!("cannot read policy {}: {e}", path.display()))
        })?;
        Self::from_json_str(&raw)
    }
}
