//! Pure evaluation of an [`OperationRequest`] against a [`SecurityPolicy`].
//!
//! Checks run in a fixed order and the first failure is returned. Nothing here
//! touches shared state, so the same inputs always produce the same decision.

use std::collections::BTreeSet;

use super::entities::{RolePermissions, SecurityPolicy};
use super::value_objects::{Decision, OperationRequest, PolicyRule};

/// Evaluates `request` against `policy`.
///
/// A missing policy means security is not configured and everything is
/// allowed. Role defaulting is the caller's job: the request is evaluated
/// exactly as given.
pub fn validate(policy: Option<&SecurityPolicy>, request: &OperationRequest) -> Decision {
    let Some(policy) = policy else {
        return Decision::Allow;
    };

    if let Some(content_type) = &request.content_type
        && !content_type_allowed(policy.allowed_content_types.as_ref(), content_type)
    {
        return Decision::deny(
            PolicyRule::ContentType,
            format!("content type '{content_type}' not allowed"),
        );
    }

    if let (Some(length), Some(max)) = (request.content_length, policy.max_file_size)
        && length > max
    {
        return Decision::deny(
            PolicyRule::FileSize,
            format!("file size {length} bytes exceeds maximum allowed size of {max} bytes"),
        );
    }

    if !key_within(policy.allowed_prefixes.as_deref(), &request.key) {
        return Decision::deny(
            PolicyRule::AllowedPrefix,
            format!("prefix not allowed: key '{}' matches no allowed prefix", request.key),
        );
    }

    if let Some(denied) = matching_prefix(policy.denied_prefixes.as_deref(), &request.key) {
        return Decision::deny(
            PolicyRule::DeniedPrefix,
            format!("prefix denied: key '{}' falls under '{denied}'", request.key),
        );
    }

    match (&request.role, &policy.role_based_access) {
        (Some(role), Some(rba)) => match rba.role(role) {
            Some(permissions) => validate_role(role, permissions, request),
            None => Decision::deny(
                PolicyRule::RoleNotConfigured,
                format!("role '{role}' not configured"),
            ),
        },
        _ => Decision::Allow,
    }
}

fn validate_role(role: &str, permissions: &RolePermissions, request: &OperationRequest) -> Decision {
    if !permissions.allows(request.operation) {
        return Decision::deny(
            PolicyRule::RoleOperation,
            format!(
                "operation '{}' not allowed for role '{role}'",
                request.operation
            ),
        );
    }

    if !key_within(permissions.allowed_prefixes.as_deref(), &request.key) {
        return Decision::deny(
            PolicyRule::RolePrefix,
            format!(
                "prefix not allowed for role '{role}': key '{}' matches no allowed prefix",
                request.key
            ),
        );
    }

    if let Some(content_type) = &request.content_type
        && !content_type_allowed(permissions.allowed_content_types.as_ref(), content_type)
    {
        return Decision::deny(
            PolicyRule::RoleContentType,
            format!("content type '{content_type}' not allowed for role '{role}'"),
        );
    }

    if let (Some(length), Some(max)) = (request.content_length, permissions.max_file_size)
        && length > max
    {
        return Decision::deny(
            PolicyRule::RoleFileSize,
            format!(
                "file size {length} bytes exceeds maximum allowed size of {max} bytes for role '{role}'"
            ),
        );
    }

    Decision::Allow
}

/// Unset or empty allow-list admits every content type.
fn content_type_allowed(allowed: Option<&BTreeSet<String>>, content_type: &str) -> bool {
    match allowed {
        Some(allowed) if !allowed.is_empty() => allowed.contains(content_type),
        _ => true,
    }
}

/// Unset or empty allow-list admits every key.
fn key_within(prefixes: Option<&[String]>, key: &str) -> bool {
    match prefixes {
        Some(prefixes) if !prefixes.is_empty() => {
            prefixes.iter().any(|prefix| key.starts_with(prefix.as_str()))
        }
        _ => true,
    }
}

fn matching_prefix<'a>(prefixes: Option<&'a [String]>, key: &str) -> Option<&'a str> {
    prefixes?
        .iter()
        .find(|prefix| key.starts_with(prefix.as_str()))
        .map(String::as_str)
}
