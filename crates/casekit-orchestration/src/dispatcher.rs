//! The request orchestrator.
//!
//! Per request the dispatcher walks `RECEIVED → CONTEXT_PREPARED →
//! PRE_HOOKS_RUN → EXECUTING → POST_HOOKS_RUN → COMPLETED`, with `FAILED`
//! reachable from every state. Every per-request error is caught at this
//! boundary and mapped to a structured failure response carrying the
//! operation name and request id — raw internals never leak to callers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use casekit_shared::{
    CompositeStep, DispatchError, ExecutionError, HookOutcome, HookStage, OnError,
    OperationRegistry, PolicyOverlays, PolicyViolation, RequestEnvelope, ResolvedPolicy,
    ResponseEnvelope, ResponseError, ResponseMetadata, ResponseStatus, BusinessRules,
    ToolImplementation, ToolRegistry,
};

use crate::context::{ExecutionContext, RequestState};
use crate::handlers::OperationHandler;
use crate::hooks::{AuditHook, Hook, HookEngine, MetricsHook, SessionLifecycleHook};
use crate::store::{CasefileStore, SessionStore};

/// Dispatcher configuration.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Policy template applied when the envelope carries no hint.
    pub default_policy_template: String,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            default_policy_template: PolicyOverlays::default_template_name().to_string(),
        }
    }
}

/// Dispatch counters snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherStats {
    pub dispatched: u64,
    pub completed: u64,
    pub failed: u64,
}

/// The request orchestrator. Built once at bootstrap; registries and the
/// handler table are immutable afterwards.
#[derive(Debug)]
pub struct Dispatcher {
    operations: Arc<OperationRegistry>,
    tools: Arc<ToolRegistry>,
    handlers: HashMap<String, Arc<dyn OperationHandler>>,
    hook_engine: HookEngine,
    session_lifecycle: SessionLifecycleHook,
    casefiles: Arc<dyn CasefileStore>,
    config: DispatcherConfig,
    dispatched: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
}

impl Dispatcher {
    /// Build a dispatcher with the built-in hooks installed and an empty
    /// handler table. Bootstrap installs the canonical handlers in fixed
    /// order before sealing the dispatcher behind an `Arc`.
    pub fn new(
        operations: Arc<OperationRegistry>,
        tools: Arc<ToolRegistry>,
        sessions: Arc<dyn SessionStore>,
        casefiles: Arc<dyn CasefileStore>,
        config: DispatcherConfig,
    ) -> Self {
        let mut hook_engine = HookEngine::new();
        hook_engine.register(Arc::new(MetricsHook::new()));
        hook_engine.register(Arc::new(AuditHook::new()));
        hook_engine.register(Arc::new(SessionLifecycleHook::new(sessions.clone())));

        Self {
            operations,
            tools,
            handlers: HashMap::new(),
            hook_engine,
            session_lifecycle: SessionLifecycleHook::new(sessions),
            casefiles,
            config,
            dispatched: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// Install a handler under its operation name.
    pub fn install_handler(&mut self, handler: Arc<dyn OperationHandler>) {
        self.handlers.insert(handler.operation().to_string(), handler);
    }

    /// Install an additional hook.
    pub fn install_hook(&mut self, hook: Arc<dyn Hook>) {
        self.hook_engine.register(hook);
    }

    /// Dispatch counters.
    pub fn stats(&self) -> DispatcherStats {
        DispatcherStats {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }

    /// Execute a generic request through context preparation, ordered hooks,
    /// and the target handler. Never returns an error: failures become
    /// structured failure responses.
    #[instrument(skip(self, envelope), fields(request_id = %envelope.request_id, operation = %envelope.operation))]
    pub async fn dispatch(&self, envelope: RequestEnvelope) -> ResponseEnvelope {
        self.dispatched.fetch_add(1, Ordering::Relaxed);

        let Some(operation) = self.operations.lookup(&envelope.operation) else {
            return self.fail_without_context(
                &envelope,
                DispatchError::UnknownOperation(envelope.operation.clone()),
            );
        };
        let Some(handler) = self.handlers.get(&envelope.operation).cloned() else {
            return self.fail_without_context(
                &envelope,
                DispatchError::UnknownOperation(envelope.operation.clone()),
            );
        };

        let overlays = match self.resolve_overlays(&envelope) {
            Ok(overlays) => overlays,
            Err(e) => return self.fail_without_context(&envelope, e),
        };
        let policy = ResolvedPolicy::resolve(&overlays, &operation.business_rules);
        let mut context = ExecutionContext::new(
            envelope.request_id,
            &envelope.user_id,
            &envelope.operation,
            policy,
        );

        let outcome = self.run(&envelope, handler.as_ref(), &mut context).await;
        self.finish(&envelope, &mut context, outcome)
    }

    /// Dispatch through a registered tool, pattern-matching its
    /// implementation variant. Atomic strategies are pass-throughs to the
    /// referenced operation; composites run their steps in order.
    #[instrument(skip(self, envelope), fields(request_id = %envelope.request_id, tool = %tool_name))]
    pub async fn dispatch_tool(&self, tool_name: &str, envelope: RequestEnvelope) -> ResponseEnvelope {
        let Some(tool) = self.tools.lookup(tool_name) else {
            self.dispatched.fetch_add(1, Ordering::Relaxed);
            return self.fail_without_context(
                &envelope,
                DispatchError::UnknownOperation(tool_name.to_string()),
            );
        };

        match &tool.implementation {
            ToolImplementation::Composite { steps } => {
                self.dispatched.fetch_add(1, Ordering::Relaxed);

                let policy =
                    ResolvedPolicy::resolve(&tool.policy_overlays, &BusinessRules::default());
                let mut context = ExecutionContext::new(
                    envelope.request_id,
                    &envelope.user_id,
                    &tool.name,
                    policy,
                );

                let outcome = self.run_composite(&envelope, steps, &mut context).await;
                self.finish(&envelope, &mut context, outcome)
            }
            // Simple, api-call, and data-transform tools all resolve to the
            // referenced operation's handler; their collaborator halves
            // (endpoint, transform) live outside the orchestrator.
            _ => {
                let mut envelope = envelope;
                if let Some(op_ref) = &tool.operation_ref {
                    envelope.operation = op_ref.clone();
                }
                self.dispatch(envelope).await
            }
        }
    }

    /// Copy the ordered hook event log and relevant context flags into the
    /// response metadata without exposing the context structure.
    pub fn attach_hook_metadata(response: &mut ResponseEnvelope, context: &ExecutionContext) {
        response.metadata = ResponseMetadata {
            hook_events: context.hook_event_log.clone(),
            session_recreated: context.session_recreated,
            session_id: context.session_id(),
        };
    }

    // ── request flow ──

    async fn run(
        &self,
        envelope: &RequestEnvelope,
        handler: &dyn OperationHandler,
        context: &mut ExecutionContext,
    ) -> Result<Value, DispatchError> {
        self.prepare_context(envelope, context).await?;
        context.transition(RequestState::ContextPrepared);

        self.hook_engine
            .run_stage(HookStage::Pre, &envelope.hooks.pre, envelope, context, false)
            .await?;
        context.transition(RequestState::PreHooksRun);

        context.transition(RequestState::Executing);
        let payload = self
            .execute_with_timeout(envelope, handler, context)
            .await?;

        self.hook_engine
            .run_stage(HookStage::Post, &envelope.hooks.post, envelope, context, false)
            .await?;
        context.transition(RequestState::PostHooksRun);

        Ok(payload)
    }

    /// Run the handler under the operation's configured timeout. On timeout
    /// the post-hooks still run once, in advisory mode, best effort — there
    /// is no rollback of partial side effects outside explicit composite
    /// rollback steps.
    async fn execute_with_timeout(
        &self,
        envelope: &RequestEnvelope,
        handler: &dyn OperationHandler,
        context: &mut ExecutionContext,
    ) -> Result<Value, DispatchError> {
        let timeout_ms = context.resolved_policy.timeout_ms;
        let deadline = Duration::from_millis(timeout_ms);

        match tokio::time::timeout(deadline, handler.execute(context, &envelope.payload)).await {
            Ok(Ok(payload)) => Ok(payload),
            Ok(Err(execution_error)) => Err(execution_error.into()),
            Err(_elapsed) => {
                warn!(
                    request_id = %context.request_id,
                    timeout_ms,
                    "Handler timed out; running post-hooks in advisory mode"
                );
                if let Err(hook_error) = self
                    .hook_engine
                    .run_stage(HookStage::Post, &envelope.hooks.post, envelope, context, true)
                    .await
                {
                    // Advisory mode swallows everything; this is unreachable
                    // in practice but a secondary failure must never mask the
                    // timeout.
                    warn!(error = %hook_error, "Post-hook pass failed after timeout");
                }
                Err(ExecutionError::Timeout { timeout_ms }.into())
            }
        }
    }

    /// Resolve session, casefile, and policy gates before execution.
    async fn prepare_context(
        &self,
        envelope: &RequestEnvelope,
        context: &mut ExecutionContext,
    ) -> Result<(), DispatchError> {
        if context.resolved_policy.auth_required && envelope.user_id.trim().is_empty() {
            return Err(PolicyViolation::AuthRequired.into());
        }
        for permission in &context.resolved_policy.required_permissions {
            if !envelope.permissions.contains(permission) {
                return Err(PolicyViolation::PermissionDenied {
                    permission: permission.clone(),
                }
                .into());
            }
        }

        let actions = self
            .session_lifecycle
            .resolve_session(envelope, context)
            .await
            .map_err(DispatchError::Policy)?;
        for action in actions {
            context.record_hook_event("session_lifecycle", HookStage::Pre, &action, HookOutcome::Ok);
        }

        let wants_casefile = context.resolved_policy.casefile.casefile_required
            || envelope.context_requirements.casefile;
        if wants_casefile {
            self.load_casefile(envelope, context).await?;
        }

        Ok(())
    }

    async fn load_casefile(
        &self,
        envelope: &RequestEnvelope,
        context: &mut ExecutionContext,
    ) -> Result<(), DispatchError> {
        let raw = envelope
            .payload
            .get("casefile_id")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                DispatchError::ContextPreparationFailure(
                    "payload carries no casefile_id".to_string(),
                )
            })?;
        let casefile_id = Uuid::parse_str(raw).map_err(|e| {
            DispatchError::ContextPreparationFailure(format!("invalid casefile_id: {e}"))
        })?;

        let casefile = self
            .casefiles
            .get_casefile(casefile_id)
            .await
            .map_err(|e| DispatchError::ContextPreparationFailure(e.to_string()))?
            .ok_or_else(|| {
                DispatchError::ContextPreparationFailure(format!(
                    "casefile '{casefile_id}' not found"
                ))
            })?;

        let policy = &context.resolved_policy.casefile;
        if policy.enforce_access && casefile.owner_id != envelope.user_id {
            return Err(PolicyViolation::CasefileAccessDenied {
                casefile_id: raw.to_string(),
            }
            .into());
        }
        if !policy.allowed_states.is_empty() && !policy.allowed_states.contains(&casefile.status) {
            return Err(PolicyViolation::CasefileStateInvalid {
                casefile_id: raw.to_string(),
                state: casefile.status.clone(),
            }
            .into());
        }

        context.casefile = Some(casefile);
        Ok(())
    }

    // ── composite execution ──

    async fn run_composite(
        &self,
        envelope: &RequestEnvelope,
        steps: &[CompositeStep],
        context: &mut ExecutionContext,
    ) -> Result<Value, DispatchError> {
        self.prepare_context(envelope, context).await?;
        context.transition(RequestState::ContextPrepared);

        self.hook_engine
            .run_stage(HookStage::Pre, &envelope.hooks.pre, envelope, context, false)
            .await?;
        context.transition(RequestState::PreHooksRun);

        context.transition(RequestState::Executing);

        let mut exposed: HashMap<String, Map<String, Value>> = HashMap::new();
        let mut composite_result = Map::new();

        for step in steps {
            let payload = self.build_step_payload(envelope, step, &exposed)?;

            match self.run_step(step, context, &payload).await {
                Ok(result) => {
                    let mut outputs = Map::new();
                    for binding in &step.output_mapping {
                        let value = result.get(&binding.field).cloned().unwrap_or(Value::Null);
                        outputs.insert(binding.expose_as.clone(), value.clone());
                        composite_result.insert(binding.expose_as.clone(), value);
                    }
                    exposed.insert(step.step_id.clone(), outputs);
                }
                Err(step_error) => match &step.on_error {
                    OnError::Continue => {
                        warn!(
                            request_id = %context.request_id,
                            step = %step.step_id,
                            error = %step_error,
                            "Composite step failed; continuing per on_error policy"
                        );
                        exposed.insert(step.step_id.clone(), Map::new());
                    }
                    OnError::Abort | OnError::Retry { .. } => return Err(step_error),
                },
            }
        }

        self.hook_engine
            .run_stage(HookStage::Post, &envelope.hooks.post, envelope, context, false)
            .await?;
        context.transition(RequestState::PostHooksRun);

        Ok(Value::Object(composite_result))
    }

    /// Execute one composite step, honoring its retry policy and running the
    /// rollback step best-effort when retries are exhausted.
    async fn run_step(
        &self,
        step: &CompositeStep,
        context: &mut ExecutionContext,
        payload: &Value,
    ) -> Result<Value, DispatchError> {
        let attempts = match &step.on_error {
            OnError::Retry { max_attempts, .. } => (*max_attempts).max(1),
            _ => 1,
        };

        let mut last_error = None;
        for attempt in 1..=attempts {
            match self.execute_operation(&step.operation_ref, context, payload).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    warn!(
                        step = %step.step_id,
                        attempt,
                        attempts,
                        error = %e,
                        "Composite step attempt failed"
                    );
                    last_error = Some(e);
                }
            }
        }

        if let OnError::Retry {
            rollback_step: Some(rollback),
            ..
        } = &step.on_error
        {
            // Best effort: rollback failures are logged, never surfaced.
            if let Err(e) = self.execute_operation(rollback, context, payload).await {
                warn!(step = %step.step_id, rollback = %rollback, error = %e, "Rollback step failed");
            }
        }

        Err(last_error.unwrap_or_else(|| {
            ExecutionError::HandlerFailure("step produced no result".to_string()).into()
        }))
    }

    async fn execute_operation(
        &self,
        operation_ref: &str,
        context: &mut ExecutionContext,
        payload: &Value,
    ) -> Result<Value, DispatchError> {
        let operation = self
            .operations
            .lookup(operation_ref)
            .ok_or_else(|| DispatchError::UnknownOperation(operation_ref.to_string()))?;
        let handler = self
            .handlers
            .get(operation_ref)
            .cloned()
            .ok_or_else(|| DispatchError::UnknownOperation(operation_ref.to_string()))?;

        let deadline = Duration::from_millis(operation.business_rules.timeout_ms);
        match tokio::time::timeout(deadline, handler.execute(context, payload)).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => Err(e.into()),
            Err(_elapsed) => Err(ExecutionError::Timeout {
                timeout_ms: operation.business_rules.timeout_ms,
            }
            .into()),
        }
    }

    /// Assemble one step's payload: original-input fields that match the
    /// referenced operation's parameters, then explicit mappings on top.
    fn build_step_payload(
        &self,
        envelope: &RequestEnvelope,
        step: &CompositeStep,
        exposed: &HashMap<String, Map<String, Value>>,
    ) -> Result<Value, DispatchError> {
        let operation = self
            .operations
            .lookup(&step.operation_ref)
            .ok_or_else(|| DispatchError::UnknownOperation(step.operation_ref.clone()))?;

        let mut payload = Map::new();
        if let Some(input) = envelope.payload.as_object() {
            for parameter in &operation.parameters {
                if let Some(value) = input.get(&parameter.name) {
                    payload.insert(parameter.name.clone(), value.clone());
                }
            }
        }

        for binding in &step.input_mapping {
            let value = match &binding.source {
                casekit_shared::MappingSource::FromInput { field } => envelope
                    .payload
                    .get(field)
                    .cloned()
                    .ok_or_else(|| {
                        DispatchError::ContextPreparationFailure(format!(
                            "composite input field '{field}' is missing from the payload"
                        ))
                    })?,
                casekit_shared::MappingSource::FromStep { step_id, field } => exposed
                    .get(step_id)
                    .and_then(|outputs| outputs.get(field))
                    .cloned()
                    .ok_or_else(|| {
                        DispatchError::ContextPreparationFailure(format!(
                            "step '{}' expects '{field}' from step '{step_id}', which exposed nothing",
                            step.step_id
                        ))
                    })?,
            };
            payload.insert(binding.parameter.clone(), value);
        }

        Ok(Value::Object(payload))
    }

    // ── response assembly ──

    fn finish(
        &self,
        envelope: &RequestEnvelope,
        context: &mut ExecutionContext,
        outcome: Result<Value, DispatchError>,
    ) -> ResponseEnvelope {
        match outcome {
            Ok(payload) => {
                context.transition(RequestState::Completed);
                self.completed.fetch_add(1, Ordering::Relaxed);
                info!(
                    request_id = %context.request_id,
                    operation = %context.operation_name,
                    hook_events = context.hook_event_log.len(),
                    "Request completed"
                );

                let mut response = ResponseEnvelope {
                    request_id: envelope.request_id,
                    operation: context.operation_name.clone(),
                    status: ResponseStatus::Completed,
                    payload: Some(payload),
                    error: None,
                    metadata: ResponseMetadata::default(),
                };
                Self::attach_hook_metadata(&mut response, context);
                response
            }
            Err(dispatch_error) => {
                context.transition(RequestState::Failed);
                self.failed.fetch_add(1, Ordering::Relaxed);
                error!(
                    request_id = %context.request_id,
                    operation = %context.operation_name,
                    code = dispatch_error.code(),
                    error = %dispatch_error,
                    "Request failed"
                );

                let mut response = ResponseEnvelope {
                    request_id: envelope.request_id,
                    operation: context.operation_name.clone(),
                    status: ResponseStatus::Failed,
                    payload: None,
                    error: Some(ResponseError {
                        code: dispatch_error.code().to_string(),
                        message: dispatch_error.to_string(),
                    }),
                    metadata: ResponseMetadata::default(),
                };
                Self::attach_hook_metadata(&mut response, context);
                response
            }
        }
    }

    /// Failure response for errors raised before a context exists.
    fn fail_without_context(
        &self,
        envelope: &RequestEnvelope,
        dispatch_error: DispatchError,
    ) -> ResponseEnvelope {
        self.failed.fetch_add(1, Ordering::Relaxed);
        warn!(
            request_id = %envelope.request_id,
            operation = %envelope.operation,
            code = dispatch_error.code(),
            error = %dispatch_error,
            "Request rejected before context preparation"
        );

        ResponseEnvelope {
            request_id: envelope.request_id,
            operation: envelope.operation.clone(),
            status: ResponseStatus::Failed,
            payload: None,
            error: Some(ResponseError {
                code: dispatch_error.code().to_string(),
                message: dispatch_error.to_string(),
            }),
            metadata: ResponseMetadata::default(),
        }
    }

    fn resolve_overlays(&self, envelope: &RequestEnvelope) -> Result<PolicyOverlays, DispatchError> {
        let template_name = envelope
            .policy_hints
            .policy_template
            .as_deref()
            .unwrap_or(&self.config.default_policy_template);
        PolicyOverlays::template(template_name).ok_or_else(|| {
            DispatchError::ContextPreparationFailure(format!(
                "unknown policy template '{template_name}'"
            ))
        })
    }
}
