//! Error taxonomy shared between bootstrap, build tooling, and the dispatcher.
//!
//! Build/bootstrap-time failures ([`RegistrationError`]) halt the process.
//! Per-request failures ([`DispatchError`] and the enums it wraps) are caught
//! at the orchestrator boundary and mapped to structured failure responses —
//! they never escape as raw internals.

use thiserror::Error;

/// Bootstrap-time registration failures. Fail fast; the process should not
/// come up with a partially populated registry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistrationError {
    /// An operation name is already registered with a different signature.
    #[error("operation '{0}' is already registered with a different signature")]
    DuplicateOperation(String),

    /// One or more of the six classification fields is missing or empty.
    #[error("'{name}' classification incomplete: missing {missing:?}")]
    ClassificationIncomplete {
        name: String,
        missing: Vec<String>,
    },

    /// A definition references something that is not registered.
    #[error("'{referrer}' references unknown '{reference}'")]
    UnresolvedReference {
        referrer: String,
        reference: String,
    },
}

/// Policy checks that can reject a request before its handler runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PolicyViolation {
    #[error("operation requires an authenticated caller")]
    AuthRequired,

    #[error("caller lacks required permission '{permission}'")]
    PermissionDenied { permission: String },

    #[error("operation requires an active session")]
    SessionRequired,

    #[error("caller may not access casefile '{casefile_id}'")]
    CasefileAccessDenied { casefile_id: String },

    #[error("casefile '{casefile_id}' is in state '{state}', which this operation does not allow")]
    CasefileStateInvalid { casefile_id: String, state: String },
}

/// Handler execution failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecutionError {
    /// The handler returned an error.
    #[error("handler failed: {0}")]
    HandlerFailure(String),

    /// The handler exceeded the operation's configured timeout. Partial side
    /// effects are not rolled back outside explicit composite rollback steps.
    #[error("handler timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

/// A hook failure. Advisory hook failures are recorded and the request
/// proceeds; blocking failures abort the request.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("hook '{hook}' failed during {stage}: {message}")]
pub struct HookError {
    /// Hook id.
    pub hook: String,
    /// Stage name (`pre` or `post`).
    pub stage: String,
    /// Whether the failure aborts the request.
    pub blocking: bool,
    /// Failure detail.
    pub message: String,
}

/// Request-level failures surfaced by the orchestrator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    /// No handler is registered for the requested operation.
    #[error("unknown operation '{0}'")]
    UnknownOperation(String),

    /// Session/casefile/policy resolution failed before execution.
    #[error("context preparation failed: {0}")]
    ContextPreparationFailure(String),

    /// A policy check rejected the request.
    #[error(transparent)]
    Policy(#[from] PolicyViolation),

    /// The handler failed or timed out.
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// A blocking hook failed.
    #[error(transparent)]
    Hook(#[from] HookError),
}

impl DispatchError {
    /// Stable machine-readable code for failure responses.
    pub fn code(&self) -> &'static str {
        match self {
            DispatchError::UnknownOperation(_) => "unknown_operation",
            DispatchError::ContextPreparationFailure(_) => "context_preparation_failure",
            DispatchError::Policy(PolicyViolation::AuthRequired) => "auth_required",
            DispatchError::Policy(PolicyViolation::PermissionDenied { .. }) => "permission_denied",
            DispatchError::Policy(PolicyViolation::SessionRequired) => "session_required",
            DispatchError::Policy(PolicyViolation::CasefileAccessDenied { .. }) => {
                "casefile_access_denied"
            }
            DispatchError::Policy(PolicyViolation::CasefileStateInvalid { .. }) => {
                "casefile_state_invalid"
            }
            DispatchError::Execution(ExecutionError::HandlerFailure(_)) => "handler_failure",
            DispatchError::Execution(ExecutionError::Timeout { .. }) => "timeout",
            DispatchError::Hook(_) => "hook_failure",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = RegistrationError::ClassificationIncomplete {
            name: "create_casefile".into(),
            missing: vec!["subdomain".into()],
        };
        assert!(err.to_string().contains("create_casefile"));
        assert!(err.to_string().contains("subdomain"));
    }

    #[test]
    fn test_dispatch_error_codes() {
        assert_eq!(
            DispatchError::UnknownOperation("nope".into()).code(),
            "unknown_operation"
        );
        assert_eq!(
            DispatchError::from(PolicyViolation::SessionRequired).code(),
            "session_required"
        );
        assert_eq!(
            DispatchError::from(ExecutionError::Timeout { timeout_ms: 500 }).code(),
            "timeout"
        );
    }

    #[test]
    fn test_hook_error_display() {
        let err = HookError {
            hook: "audit".into(),
            stage: "post".into(),
            blocking: false,
            message: "sink unavailable".into(),
        };
        assert_eq!(
            err.to_string(),
            "hook 'audit' failed during post: sink unavailable"
        );
    }
}
