//! Generic request/response envelopes and the hook event record.
//!
//! The transport layer builds a [`RequestEnvelope`] from the wire request and
//! serializes the [`ResponseEnvelope`] back out. Everything in between is the
//! orchestrator's business.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Hook execution stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookStage {
    Pre,
    Post,
}

impl HookStage {
    /// Stage name for logs and hook error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            HookStage::Pre => "pre",
            HookStage::Post => "post",
        }
    }
}

/// Outcome of one hook execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookOutcome {
    Ok,
    /// The hook failed but was advisory; the request proceeded.
    AdvisoryFailed,
}

/// One entry of the ordered hook event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookEvent {
    /// Hook id (e.g. `metrics`, `audit`, `session_lifecycle`).
    pub hook: String,
    /// Stage the hook ran in.
    pub stage: HookStage,
    /// What the hook did (e.g. `recorded`, `session_created`).
    pub action: String,
    /// Outcome.
    pub outcome: HookOutcome,
    /// When the hook ran.
    pub at: DateTime<Utc>,
}

/// Ordered hook ids per stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HookBindings {
    #[serde(default)]
    pub pre: Vec<String>,
    #[serde(default)]
    pub post: Vec<String>,
}

impl HookBindings {
    /// The same ordered hook ids on both stages.
    pub fn symmetric(hooks: &[&str]) -> Self {
        let ids: Vec<String> = hooks.iter().map(|h| (*h).to_string()).collect();
        Self {
            pre: ids.clone(),
            post: ids,
        }
    }
}

/// What the request needs prepared before its handler runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextRequirements {
    /// The request wants a session resolved (created/resumed per policy).
    #[serde(default)]
    pub session: bool,
    /// The request wants the payload's casefile loaded.
    #[serde(default)]
    pub casefile: bool,
}

/// Caller-supplied hints steering policy resolution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyHints {
    /// Named policy template to resolve against instead of the tool default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_template: Option<String>,
    /// Session to resume, when the caller already holds one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,
}

/// Generic request carrier handed to the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope<P = Value> {
    /// Request id for traceability. The transport layer generates one when
    /// the wire request carries none.
    pub request_id: Uuid,
    /// Requesting user.
    pub user_id: String,
    /// Permissions the transport layer resolved for the user.
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Target operation name.
    pub operation: String,
    /// Operation payload, already shape-validated by the transport layer.
    pub payload: P,
    /// Ordered hook ids per stage.
    #[serde(default)]
    pub hooks: HookBindings,
    /// Context preparation requirements.
    #[serde(default)]
    pub context_requirements: ContextRequirements,
    /// Policy hints.
    #[serde(default)]
    pub policy_hints: PolicyHints,
}

impl RequestEnvelope<Value> {
    /// Convenience constructor with a fresh request id.
    pub fn new(user_id: impl Into<String>, operation: impl Into<String>, payload: Value) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            user_id: user_id.into(),
            permissions: Vec::new(),
            operation: operation.into(),
            payload,
            hooks: HookBindings::default(),
            context_requirements: ContextRequirements::default(),
            policy_hints: PolicyHints::default(),
        }
    }

    /// Attach resolved caller permissions.
    pub fn with_permissions(mut self, permissions: &[&str]) -> Self {
        self.permissions = permissions.iter().map(|p| (*p).to_string()).collect();
        self
    }

    /// Attach symmetric pre/post hooks.
    pub fn with_hooks(mut self, hooks: &[&str]) -> Self {
        self.hooks = HookBindings::symmetric(hooks);
        self
    }

    /// Require a session to be resolved.
    pub fn with_session(mut self) -> Self {
        self.context_requirements.session = true;
        self
    }
}

/// Terminal request status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Completed,
    Failed,
}

/// Structured failure body. Never a raw internal error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseError {
    /// Stable machine-readable code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

/// Response metadata assembled from the execution context without exposing
/// the context structure itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    /// Ordered hook event log.
    #[serde(default)]
    pub hook_events: Vec<HookEvent>,
    /// Whether an expired session was transparently replaced.
    #[serde(default)]
    pub session_recreated: bool,
    /// Session the request ran under, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,
}

/// Generic response carrier returned by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope<P = Value> {
    /// Echoed request id.
    pub request_id: Uuid,
    /// Echoed operation name.
    pub operation: String,
    /// Terminal status.
    pub status: ResponseStatus,
    /// Handler result when the request completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<P>,
    /// Failure body when the request failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,
    /// Hook events and context flags.
    #[serde(default)]
    pub metadata: ResponseMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_builder() {
        let envelope = RequestEnvelope::new(
            "analyst-7",
            "create_casefile",
            json!({"title": "Investigation X"}),
        )
        .with_hooks(&["metrics", "audit"])
        .with_session();

        assert_eq!(envelope.operation, "create_casefile");
        assert_eq!(envelope.hooks.pre, vec!["metrics", "audit"]);
        assert_eq!(envelope.hooks.post, vec!["metrics", "audit"]);
        assert!(envelope.context_requirements.session);
    }

    #[test]
    fn test_envelope_serde_round_trip() {
        let envelope =
            RequestEnvelope::new("analyst-7", "get_casefile", json!({"casefile_id": "cf-1"}));
        let value = serde_json::to_value(&envelope).unwrap();
        let parsed: RequestEnvelope = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, envelope);
    }

    #[test]
    fn test_minimal_envelope_deserializes_with_defaults() {
        let value = json!({
            "request_id": Uuid::new_v4(),
            "user_id": "analyst-7",
            "operation": "create_casefile",
            "payload": {"title": "t"}
        });
        let parsed: RequestEnvelope = serde_json::from_value(value).unwrap();
        assert!(parsed.hooks.pre.is_empty());
        assert!(!parsed.context_requirements.session);
        assert!(parsed.policy_hints.policy_template.is_none());
    }

    #[test]
    fn test_response_metadata_shape() {
        let response: ResponseEnvelope = ResponseEnvelope {
            request_id: Uuid::new_v4(),
            operation: "create_casefile".into(),
            status: ResponseStatus::Failed,
            payload: None,
            error: Some(ResponseError {
                code: "timeout".into(),
                message: "handler timed out after 100ms".into(),
            }),
            metadata: ResponseMetadata::default(),
        };

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["status"], "failed");
        assert_eq!(value["error"]["code"], "timeout");
        assert!(value.get("payload").is_none());
    }
}
