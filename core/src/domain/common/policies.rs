use crate::domain::{
    common::entities::app_errors::CoreError,
    policy::{
        entities::SecurityPolicy,
        validator::validate,
        value_objects::{Decision, OperationRequest},
    },
};

/// Turns a validator decision into a `Result`, logging the rejection.
pub fn ensure_policy(decision: Decision, request: &OperationRequest) -> Result<(), CoreError> {
    match decision {
        Decision::Allow => Ok(()),
        Decision::Deny { rule, reason } => {
            tracing::warn!(
                operation = %request.operation,
                key = %request.key,
                role = request.role.as_deref().unwrap_or("-"),
                rule = %rule,
                reason = %reason,
                "Operation denied by security policy"
            );
            Err(CoreError::PolicyViolation { rule, reason })
        }
    }
}

/// Fills in the configured default role when the caller did not name one.
pub fn apply_default_role(
    policy: Option<&SecurityPolicy>,
    mut request: OperationRequest,
) -> OperationRequest {
    if request.role.is_none() {
        request.role = policy
            .and_then(SecurityPolicy::default_role)
            .map(str::to_string);
    }
    request
}

/// Default-role substitution followed by validation, without failing.
pub fn evaluate(
    policy: Option<&SecurityPolicy>,
    request: OperationRequest,
) -> (OperationRequest, Decision) {
    let request = apply_default_role(policy, request);
    let decision = validate(policy, &request);
    (request, decision)
}

/// Default-role substitution followed by validation.
pub fn authorize(
    policy: Option<&SecurityPolicy>,
    request: OperationRequest,
) -> Result<OperationRequest, CoreError> {
    let request = apply_default_role(policy, request);
    ensure_policy(validate(policy, &request), &request)?;
    Ok(request)
}
