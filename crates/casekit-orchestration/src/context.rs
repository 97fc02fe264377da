//! Per-request execution context and the request state machine.

use std::fmt;

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use casekit_shared::{HookEvent, HookOutcome, HookStage, ResolvedPolicy};

use crate::store::{CasefileRecord, SessionRecord};

/// Request lifecycle states. `Failed` is reachable from every state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Received,
    ContextPrepared,
    PreHooksRun,
    Executing,
    PostHooksRun,
    Completed,
    Failed,
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RequestState::Received => "received",
            RequestState::ContextPrepared => "context_prepared",
            RequestState::PreHooksRun => "pre_hooks_run",
            RequestState::Executing => "executing",
            RequestState::PostHooksRun => "post_hooks_run",
            RequestState::Completed => "completed",
            RequestState::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Ephemeral per-request state assembled by the orchestrator and discarded
/// after response assembly. Never persisted.
#[derive(Debug)]
pub struct ExecutionContext {
    pub request_id: Uuid,
    pub user_id: String,
    pub operation_name: String,
    pub state: RequestState,
    /// Session snapshot, when the request resolved one.
    pub session: Option<SessionRecord>,
    /// Casefile snapshot, when the payload referenced one.
    pub casefile: Option<CasefileRecord>,
    /// Effective policy for this request.
    pub resolved_policy: ResolvedPolicy,
    /// Ordered hook event log.
    pub hook_event_log: Vec<HookEvent>,
    /// Whether an expired session was transparently replaced.
    pub session_recreated: bool,
}

impl ExecutionContext {
    /// Fresh context in the `Received` state.
    pub fn new(
        request_id: Uuid,
        user_id: impl Into<String>,
        operation_name: impl Into<String>,
        resolved_policy: ResolvedPolicy,
    ) -> Self {
        Self {
            request_id,
            user_id: user_id.into(),
            operation_name: operation_name.into(),
            state: RequestState::Received,
            session: None,
            casefile: None,
            resolved_policy,
            hook_event_log: Vec::new(),
            session_recreated: false,
        }
    }

    /// Advance the state machine.
    pub fn transition(&mut self, next: RequestState) {
        debug!(
            request_id = %self.request_id,
            operation = %self.operation_name,
            from = %self.state,
            to = %next,
            "Request state transition"
        );
        self.state = next;
    }

    /// Append an entry to the ordered hook event log.
    pub fn record_hook_event(
        &mut self,
        hook: &str,
        stage: HookStage,
        action: &str,
        outcome: HookOutcome,
    ) {
        self.hook_event_log.push(HookEvent {
            hook: hook.to_string(),
            stage,
            action: action.to_string(),
            outcome,
            at: Utc::now(),
        });
    }

    /// Session id for response metadata, if a session was resolved.
    pub fn session_id(&self) -> Option<Uuid> {
        self.session.as_ref().map(|s| s.session_id)
    }
}
