use super::{ActionDef, ActionKind};
use crate::errors::{Result, UserFacingError};

/// External-process actions allowed on read-only mode, by action name, with the reason they're safe
pub const EXEC_ALLOWLIST: &[(&str, &str)] = &[
    ("login", "Refreshes local credentials, nothing is changed on the account"),
    ("sso-login", "Refreshes local SSO credentials, nothing is changed on the account"),
    ("tail-logs", "Streams log events, read-only"),
    ("view-logs", "Prints recent log events, read-only"),
];

/// Provider-API actions allowed on read-only mode, by operation name, with the reason they're safe
pub const API_ALLOWLIST: &[(&str, &str)] = &[
    ("DryRunInvoke", "Validates the invocation with the dry-run flag, without executing it"),
    ("SwitchProfile", "Local-only switch of the active profile, no provider call mutates anything"),
    ("SwitchRegion", "Local-only switch of the active region, no provider call mutates anything"),
    ("DetectStackDrift", "Triggers a read-only drift detection, resources are never modified"),
    ("GetQueueAttributes", "Reads queue attributes"),
];

/// Returns the reason an action is allowed on read-only mode, or `None` if it's not allowed
pub fn read_only_allowance(action: &ActionDef) -> Option<&'static str> {
    match &action.kind {
        ActionKind::Navigate { .. } => Some("Navigation never changes anything"),
        ActionKind::Exec { .. } => EXEC_ALLOWLIST
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(&action.name))
            .map(|(_, reason)| *reason),
        ActionKind::Api { operation } => operation.as_deref().and_then(|op| {
            API_ALLOWLIST
                .iter()
                .find(|(allowed, _)| *allowed == op)
                .map(|(_, reason)| *reason)
        }),
    }
}

/// Validates the action is properly configured.
///
/// This runs before the read-only gate, so a registration bug is never masked by a policy denial.
pub fn validate(action: &ActionDef) -> Result<()> {
    let reason = match &action.kind {
        ActionKind::Api { operation } if operation.as_deref().is_none_or(|op| op.trim().is_empty()) => {
            "API actions require an operation"
        }
        ActionKind::Exec { command } if command.trim().is_empty() => "external actions require a command",
        ActionKind::Navigate { filter_field, .. } if filter_field.trim().is_empty() => {
            "navigation actions require a filter field"
        }
        _ => return Ok(()),
    };
    Err(UserFacingError::ActionMisconfigured {
        action: action.name.clone(),
        reason: reason.to_owned(),
    }
    .into())
}

/// Evaluates the read-only policy for the action
pub fn check_read_only(action: &ActionDef, read_only: bool) -> Result<()> {
    if !read_only {
        return Ok(());
    }
    match read_only_allowance(action) {
        Some(reason) => {
            tracing::debug!("Action {} allowed on read-only mode: {reason}", action.name);
            Ok(())
        }
        None => {
            tracing::info!("Action {} denied by read-only mode", action.name);
            Err(UserFacingError::ReadOnlyDenied {
                action: action.name.clone(),
            }
            .into())
        }
    }
}
