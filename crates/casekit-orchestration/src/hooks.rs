//! The hook engine and the built-in hooks.
//!
//! Hooks are named, ordered side-effect units executed before and after the
//! handler. Each hook is classified advisory (failure recorded in the event
//! log, request proceeds) or blocking (failure promoted to a
//! [`HookError`], request aborts). Execution order is exactly the declared
//! list order, per stage, on every request.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};

use casekit_shared::{
    HookError, HookOutcome, HookStage, PolicyViolation, RequestEnvelope,
};

use crate::context::ExecutionContext;
use crate::store::{SessionRecord, SessionStore};

/// Failure classification for a hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookMode {
    Advisory,
    Blocking,
}

/// A named side-effect unit.
///
/// `run` returns the actions performed (one event log entry each) or a
/// failure message, which the engine records or promotes according to the
/// hook's mode.
#[async_trait]
pub trait Hook: Send + Sync + std::fmt::Debug {
    /// Hook id as referenced by envelopes.
    fn id(&self) -> &str;

    /// Failure classification.
    fn mode(&self) -> HookMode {
        HookMode::Advisory
    }

    async fn run(
        &self,
        stage: HookStage,
        envelope: &RequestEnvelope,
        context: &mut ExecutionContext,
    ) -> Result<Vec<String>, String>;
}

/// Executes configured hook ids for a stage in declared order.
#[derive(Debug, Default)]
pub struct HookEngine {
    hooks: HashMap<String, Arc<dyn Hook>>,
}

impl HookEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a hook under its id. Later registrations replace earlier ones.
    pub fn register(&mut self, hook: Arc<dyn Hook>) {
        self.hooks.insert(hook.id().to_string(), hook);
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Hook>> {
        self.hooks.get(id).cloned()
    }

    /// Run the declared hook ids for one stage, in order.
    ///
    /// With `swallow_blocking` set (the advisory-mode post-hook pass after a
    /// timeout), blocking failures are downgraded to advisory log entries so
    /// a best-effort pass can never fail the request a second time.
    pub async fn run_stage(
        &self,
        stage: HookStage,
        hook_ids: &[String],
        envelope: &RequestEnvelope,
        context: &mut ExecutionContext,
        swallow_blocking: bool,
    ) -> Result<(), HookError> {
        for hook_id in hook_ids {
            let Some(hook) = self.get(hook_id) else {
                let error = HookError {
                    hook: hook_id.clone(),
                    stage: stage.as_str().to_string(),
                    blocking: !swallow_blocking,
                    message: "hook is not installed".to_string(),
                };
                if swallow_blocking {
                    warn!(hook = %hook_id, stage = stage.as_str(), "Skipping uninstalled hook");
                    context.record_hook_event(
                        hook_id,
                        stage,
                        "failed",
                        HookOutcome::AdvisoryFailed,
                    );
                    continue;
                }
                return Err(error);
            };

            match hook.run(stage, envelope, context).await {
                Ok(actions) => {
                    for action in actions {
                        context.record_hook_event(hook_id, stage, &action, HookOutcome::Ok);
                    }
                }
                Err(message) => {
                    let blocking = hook.mode() == HookMode::Blocking && !swallow_blocking;
                    if blocking {
                        return Err(HookError {
                            hook: hook_id.clone(),
                            stage: stage.as_str().to_string(),
                            blocking: true,
                            message,
                        });
                    }
                    warn!(
                        hook = %hook_id,
                        stage = stage.as_str(),
                        error = %message,
                        "Advisory hook failed; request proceeds"
                    );
                    context.record_hook_event(hook_id, stage, "failed", HookOutcome::AdvisoryFailed);
                }
            }
        }
        Ok(())
    }
}

// ── built-in: metrics ──

/// Counts hook firings per stage. Advisory.
#[derive(Debug, Default)]
pub struct MetricsHook {
    pre_count: AtomicU64,
    post_count: AtomicU64,
}

impl MetricsHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counts(&self) -> (u64, u64) {
        (
            self.pre_count.load(Ordering::Relaxed),
            self.post_count.load(Ordering::Relaxed),
        )
    }
}

#[async_trait]
impl Hook for MetricsHook {
    fn id(&self) -> &str {
        "metrics"
    }

    async fn run(
        &self,
        stage: HookStage,
        envelope: &RequestEnvelope,
        _context: &mut ExecutionContext,
    ) -> Result<Vec<String>, String> {
        match stage {
            HookStage::Pre => self.pre_count.fetch_add(1, Ordering::Relaxed),
            HookStage::Post => self.post_count.fetch_add(1, Ordering::Relaxed),
        };
        debug!(operation = %envelope.operation, stage = stage.as_str(), "Metrics recorded");
        Ok(vec!["recorded".to_string()])
    }
}

// ── built-in: audit ──

/// Emits a structured audit line per stage, honoring the audit overlay.
/// Advisory.
#[derive(Debug, Default)]
pub struct AuditHook;

impl AuditHook {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Hook for AuditHook {
    fn id(&self) -> &str {
        "audit"
    }

    async fn run(
        &self,
        stage: HookStage,
        envelope: &RequestEnvelope,
        context: &mut ExecutionContext,
    ) -> Result<Vec<String>, String> {
        if !context.resolved_policy.audit.enabled {
            return Ok(vec!["skipped".to_string()]);
        }

        if context.resolved_policy.audit.include_payload {
            info!(
                request_id = %context.request_id,
                user_id = %context.user_id,
                operation = %envelope.operation,
                stage = stage.as_str(),
                payload = %envelope.payload,
                "Audit"
            );
        } else {
            info!(
                request_id = %context.request_id,
                user_id = %context.user_id,
                operation = %envelope.operation,
                stage = stage.as_str(),
                "Audit"
            );
        }
        Ok(vec!["recorded".to_string()])
    }
}

// ── built-in: session_lifecycle ──

/// Resolves the request session against the session policy: creates missing
/// sessions, transparently replaces expired ones when resume is allowed, and
/// records activity. The dispatcher runs this during context preparation; it
/// can also be listed explicitly in a hook stage.
#[derive(Debug)]
pub struct SessionLifecycleHook {
    sessions: Arc<dyn SessionStore>,
}

impl SessionLifecycleHook {
    pub fn new(sessions: Arc<dyn SessionStore>) -> Self {
        Self { sessions }
    }

    /// Session resolution with policy semantics. Returns the actions taken,
    /// in order; sets `context.session` and `context.session_recreated`.
    pub async fn resolve_session(
        &self,
        envelope: &RequestEnvelope,
        context: &mut ExecutionContext,
    ) -> Result<Vec<String>, PolicyViolation> {
        let policy = context.resolved_policy.session.clone();
        let wanted = envelope.context_requirements.session || policy.requires_active_session;
        if !wanted {
            return Ok(Vec::new());
        }

        let now = Utc::now();

        let existing = match envelope.policy_hints.session_id {
            Some(session_id) => self
                .sessions
                .get_session(session_id)
                .await
                .map_err(|_| PolicyViolation::SessionRequired)?,
            None => None,
        };

        match existing {
            Some(mut session) if session.is_expired(policy.idle_timeout_secs, now) => {
                if !policy.allow_session_resume {
                    return Err(PolicyViolation::SessionRequired);
                }
                // Transparently close the expired session and hand the
                // request a replacement instead of failing it.
                session.close(now);
                self.sessions
                    .put_session(session)
                    .await
                    .map_err(|_| PolicyViolation::SessionRequired)?;

                let replacement = SessionRecord::open(&context.user_id);
                self.sessions
                    .put_session(replacement.clone())
                    .await
                    .map_err(|_| PolicyViolation::SessionRequired)?;

                info!(
                    request_id = %context.request_id,
                    session_id = %replacement.session_id,
                    "Expired session replaced"
                );

                context.session = Some(replacement);
                context.session_recreated = true;
                Ok(vec![
                    "session_closed".to_string(),
                    "session_created".to_string(),
                ])
            }
            Some(mut session) => {
                session.touch(now);
                self.sessions
                    .put_session(session.clone())
                    .await
                    .map_err(|_| PolicyViolation::SessionRequired)?;
                context.session = Some(session);
                Ok(vec!["activity_updated".to_string()])
            }
            None => {
                if !policy.allow_new_session {
                    return Err(PolicyViolation::SessionRequired);
                }
                let session = SessionRecord::open(&context.user_id);
                self.sessions
                    .put_session(session.clone())
                    .await
                    .map_err(|_| PolicyViolation::SessionRequired)?;

                debug!(
                    request_id = %context.request_id,
                    session_id = %session.session_id,
                    "Session created"
                );

                context.session = Some(session);
                Ok(vec!["session_created".to_string()])
            }
        }
    }
}

#[async_trait]
impl Hook for SessionLifecycleHook {
    fn id(&self) -> &str {
        "session_lifecycle"
    }

    fn mode(&self) -> HookMode {
        HookMode::Blocking
    }

    async fn run(
        &self,
        _stage: HookStage,
        envelope: &RequestEnvelope,
        context: &mut ExecutionContext,
    ) -> Result<Vec<String>, String> {
        self.resolve_session(envelope, context)
            .await
            .map_err(|violation| violation.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use casekit_shared::{BusinessRules, PolicyOverlays, ResolvedPolicy};
    use serde_json::json;
    use uuid::Uuid;

    fn context_with(overlays: &PolicyOverlays) -> ExecutionContext {
        ExecutionContext::new(
            Uuid::new_v4(),
            "analyst-7",
            "create_casefile",
            ResolvedPolicy::resolve(overlays, &BusinessRules::default()),
        )
    }

    fn envelope() -> RequestEnvelope {
        RequestEnvelope::new("analyst-7", "create_casefile", json!({"title": "t"}))
    }

    #[tokio::test]
    async fn test_hooks_run_in_declared_order() {
        let mut engine = HookEngine::new();
        engine.register(Arc::new(MetricsHook::new()));
        engine.register(Arc::new(AuditHook::new()));

        let overlays = PolicyOverlays::default();
        let mut context = context_with(&overlays);
        let envelope = envelope();

        engine
            .run_stage(
                HookStage::Pre,
                &["metrics".to_string(), "audit".to_string()],
                &envelope,
                &mut context,
                false,
            )
            .await
            .unwrap();

        let order: Vec<&str> = context
            .hook_event_log
            .iter()
            .map(|e| e.hook.as_str())
            .collect();
        assert_eq!(order, vec!["metrics", "audit"]);
    }

    #[derive(Debug)]
    struct FailingHook {
        mode: HookMode,
    }

    #[async_trait]
    impl Hook for FailingHook {
        fn id(&self) -> &str {
            "failing"
        }

        fn mode(&self) -> HookMode {
            self.mode
        }

        async fn run(
            &self,
            _stage: HookStage,
            _envelope: &RequestEnvelope,
            _context: &mut ExecutionContext,
        ) -> Result<Vec<String>, String> {
            Err("boom".to_string())
        }
    }

    #[tokio::test]
    async fn test_advisory_failure_is_recorded_and_swallowed() {
        let mut engine = HookEngine::new();
        engine.register(Arc::new(FailingHook {
            mode: HookMode::Advisory,
        }));

        let overlays = PolicyOverlays::default();
        let mut context = context_with(&overlays);

        engine
            .run_stage(
                HookStage::Post,
                &["failing".to_string()],
                &envelope(),
                &mut context,
                false,
            )
            .await
            .unwrap();

        assert_eq!(context.hook_event_log.len(), 1);
        assert_eq!(
            context.hook_event_log[0].outcome,
            HookOutcome::AdvisoryFailed
        );
    }

    #[tokio::test]
    async fn test_blocking_failure_aborts() {
        let mut engine = HookEngine::new();
        engine.register(Arc::new(FailingHook {
            mode: HookMode::Blocking,
        }));

        let overlays = PolicyOverlays::default();
        let mut context = context_with(&overlays);

        let err = engine
            .run_stage(
                HookStage::Pre,
                &["failing".to_string()],
                &envelope(),
                &mut context,
                false,
            )
            .await
            .unwrap_err();

        assert!(err.blocking);
        assert_eq!(err.hook, "failing");
    }

    #[tokio::test]
    async fn test_blocking_failure_swallowed_in_advisory_mode() {
        let mut engine = HookEngine::new();
        engine.register(Arc::new(FailingHook {
            mode: HookMode::Blocking,
        }));

        let overlays = PolicyOverlays::default();
        let mut context = context_with(&overlays);

        engine
            .run_stage(
                HookStage::Post,
                &["failing".to_string()],
                &envelope(),
                &mut context,
                true,
            )
            .await
            .unwrap();

        assert_eq!(
            context.hook_event_log[0].outcome,
            HookOutcome::AdvisoryFailed
        );
    }

    #[tokio::test]
    async fn test_session_created_when_missing() {
        let store = Arc::new(InMemoryStore::new());
        let hook = SessionLifecycleHook::new(store.clone());

        let overlays = PolicyOverlays::template("authenticated_access").unwrap();
        let mut context = context_with(&overlays);
        let envelope = envelope();

        let actions = hook.resolve_session(&envelope, &mut context).await.unwrap();
        assert_eq!(actions, vec!["session_created"]);
        assert!(context.session.is_some());
        assert!(!context.session_recreated);
    }

    #[tokio::test]
    async fn test_expired_session_recreated_when_resume_allowed() {
        let store = Arc::new(InMemoryStore::new());
        let mut expired = SessionRecord::open("analyst-7");
        expired.last_activity_at = Utc::now() - chrono::Duration::seconds(86_400);
        let expired_id = expired.session_id;
        store.put_session(expired).await.unwrap();

        let hook = SessionLifecycleHook::new(store.clone());
        let overlays = PolicyOverlays::template("authenticated_access").unwrap();
        let mut context = context_with(&overlays);

        let mut envelope = envelope();
        envelope.policy_hints.session_id = Some(expired_id);

        let actions = hook.resolve_session(&envelope, &mut context).await.unwrap();
        assert_eq!(actions, vec!["session_closed", "session_created"]);
        assert!(context.session_recreated);
        assert_ne!(context.session_id(), Some(expired_id));

        // The expired record was closed in the store, not deleted.
        let closed = store.get_session(expired_id).await.unwrap().unwrap();
        assert!(closed.is_closed());
    }

    #[tokio::test]
    async fn test_expired_session_rejected_without_resume() {
        let store = Arc::new(InMemoryStore::new());
        let mut expired = SessionRecord::open("analyst-7");
        expired.last_activity_at = Utc::now() - chrono::Duration::seconds(86_400);
        let expired_id = expired.session_id;
        store.put_session(expired).await.unwrap();

        let hook = SessionLifecycleHook::new(store);
        let mut overlays = PolicyOverlays::template("authenticated_access").unwrap();
        overlays.session.allow_session_resume = false;
        let mut context = context_with(&overlays);

        let mut envelope = envelope();
        envelope.policy_hints.session_id = Some(expired_id);

        let err = hook
            .resolve_session(&envelope, &mut context)
            .await
            .unwrap_err();
        assert_eq!(err, PolicyViolation::SessionRequired);
    }

    #[tokio::test]
    async fn test_active_session_touched() {
        let store = Arc::new(InMemoryStore::new());
        let session = SessionRecord::open("analyst-7");
        let session_id = session.session_id;
        store.put_session(session).await.unwrap();

        let hook = SessionLifecycleHook::new(store);
        let overlays = PolicyOverlays::template("authenticated_access").unwrap();
        let mut context = context_with(&overlays);

        let mut envelope = envelope();
        envelope.policy_hints.session_id = Some(session_id);

        let actions = hook.resolve_session(&envelope, &mut context).await.unwrap();
        assert_eq!(actions, vec!["activity_updated"]);
        assert_eq!(context.session_id(), Some(session_id));
    }

    #[tokio::test]
    async fn test_no_session_wanted_is_a_noop() {
        let store = Arc::new(InMemoryStore::new());
        let hook = SessionLifecycleHook::new(store);

        let overlays = PolicyOverlays::default();
        let mut context = context_with(&overlays);

        let actions = hook
            .resolve_session(&envelope(), &mut context)
            .await
            .unwrap();
        assert!(actions.is_empty());
        assert!(context.session.is_none());
    }
}
