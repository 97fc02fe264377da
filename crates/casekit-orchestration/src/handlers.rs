//! The uniform handler contract and the canonical workspace handlers.
//!
//! Every handler implements one `execute(context, payload)` contract and is
//! looked up in the dispatcher's static operation-name table — never invoked
//! through a stored opaque callable.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use casekit_shared::ExecutionError;

use crate::context::ExecutionContext;
use crate::store::{CasefileRecord, CasefileStore, SessionStore};

/// Uniform execution contract for canonical operations.
#[async_trait]
pub trait OperationHandler: Send + Sync + std::fmt::Debug {
    /// Operation name this handler serves.
    fn operation(&self) -> &str;

    async fn execute(
        &self,
        context: &mut ExecutionContext,
        payload: &Value,
    ) -> Result<Value, ExecutionError>;
}

fn required_str<'a>(payload: &'a Value, field: &str) -> Result<&'a str, ExecutionError> {
    payload
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| ExecutionError::HandlerFailure(format!("payload is missing '{field}'")))
}

fn required_uuid(payload: &Value, field: &str) -> Result<Uuid, ExecutionError> {
    let raw = required_str(payload, field)?;
    Uuid::parse_str(raw)
        .map_err(|e| ExecutionError::HandlerFailure(format!("invalid {field}: {e}")))
}

fn casefile_json(casefile: &CasefileRecord) -> Value {
    json!({
        "casefile_id": casefile.casefile_id,
        "owner_id": casefile.owner_id,
        "title": casefile.title,
        "description": casefile.description,
        "status": casefile.status,
        "created_at": casefile.created_at,
        "updated_at": casefile.updated_at,
    })
}

// ── create_casefile ──

/// Creates a casefile owned by the requesting user.
#[derive(Debug)]
pub struct CreateCasefileHandler {
    casefiles: Arc<dyn CasefileStore>,
}

impl CreateCasefileHandler {
    pub fn new(casefiles: Arc<dyn CasefileStore>) -> Self {
        Self { casefiles }
    }
}

#[async_trait]
impl OperationHandler for CreateCasefileHandler {
    fn operation(&self) -> &str {
        "create_casefile"
    }

    async fn execute(
        &self,
        context: &mut ExecutionContext,
        payload: &Value,
    ) -> Result<Value, ExecutionError> {
        let title = required_str(payload, "title")?;
        let description = payload
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("");

        let casefile = CasefileRecord::open(&context.user_id, title, description);
        self.casefiles
            .put_casefile(casefile.clone())
            .await
            .map_err(|e| ExecutionError::HandlerFailure(e.to_string()))?;

        info!(
            request_id = %context.request_id,
            casefile_id = %casefile.casefile_id,
            "Casefile created"
        );

        Ok(casefile_json(&casefile))
    }
}

// ── get_casefile ──

/// Loads a casefile by id.
#[derive(Debug)]
pub struct GetCasefileHandler {
    casefiles: Arc<dyn CasefileStore>,
}

impl GetCasefileHandler {
    pub fn new(casefiles: Arc<dyn CasefileStore>) -> Self {
        Self { casefiles }
    }
}

#[async_trait]
impl OperationHandler for GetCasefileHandler {
    fn operation(&self) -> &str {
        "get_casefile"
    }

    async fn execute(
        &self,
        context: &mut ExecutionContext,
        payload: &Value,
    ) -> Result<Value, ExecutionError> {
        // Prefer the snapshot context preparation already loaded.
        if let Some(casefile) = &context.casefile {
            return Ok(casefile_json(casefile));
        }

        let casefile_id = required_uuid(payload, "casefile_id")?;
        let casefile = self
            .casefiles
            .get_casefile(casefile_id)
            .await
            .map_err(|e| ExecutionError::HandlerFailure(e.to_string()))?
            .ok_or_else(|| {
                ExecutionError::HandlerFailure(format!("casefile '{casefile_id}' not found"))
            })?;

        Ok(casefile_json(&casefile))
    }
}

// ── update_casefile_status ──

/// Updates a casefile's lifecycle status.
#[derive(Debug)]
pub struct UpdateCasefileStatusHandler {
    casefiles: Arc<dyn CasefileStore>,
}

impl UpdateCasefileStatusHandler {
    pub fn new(casefiles: Arc<dyn CasefileStore>) -> Self {
        Self { casefiles }
    }
}

#[async_trait]
impl OperationHandler for UpdateCasefileStatusHandler {
    fn operation(&self) -> &str {
        "update_casefile_status"
    }

    async fn execute(
        &self,
        context: &mut ExecutionContext,
        payload: &Value,
    ) -> Result<Value, ExecutionError> {
        let casefile_id = required_uuid(payload, "casefile_id")?;
        let status = required_str(payload, "status")?;

        let mut casefile = match context.casefile.clone() {
            Some(snapshot) if snapshot.casefile_id == casefile_id => snapshot,
            _ => self
                .casefiles
                .get_casefile(casefile_id)
                .await
                .map_err(|e| ExecutionError::HandlerFailure(e.to_string()))?
                .ok_or_else(|| {
                    ExecutionError::HandlerFailure(format!("casefile '{casefile_id}' not found"))
                })?,
        };

        casefile.status = status.to_string();
        casefile.updated_at = Utc::now();

        self.casefiles
            .put_casefile(casefile.clone())
            .await
            .map_err(|e| ExecutionError::HandlerFailure(e.to_string()))?;

        info!(
            request_id = %context.request_id,
            casefile_id = %casefile.casefile_id,
            status = %casefile.status,
            "Casefile status updated"
        );

        Ok(casefile_json(&casefile))
    }
}

// ── close_session ──

/// Closes the request's session (or an explicitly named one).
#[derive(Debug)]
pub struct CloseSessionHandler {
    sessions: Arc<dyn SessionStore>,
}

impl CloseSessionHandler {
    pub fn new(sessions: Arc<dyn SessionStore>) -> Self {
        Self { sessions }
    }
}

#[async_trait]
impl OperationHandler for CloseSessionHandler {
    fn operation(&self) -> &str {
        "close_session"
    }

    async fn execute(
        &self,
        context: &mut ExecutionContext,
        payload: &Value,
    ) -> Result<Value, ExecutionError> {
        let session_id = match payload.get("session_id").and_then(Value::as_str) {
            Some(raw) => Uuid::parse_str(raw)
                .map_err(|e| ExecutionError::HandlerFailure(format!("invalid session_id: {e}")))?,
            None => context.session_id().ok_or_else(|| {
                ExecutionError::HandlerFailure("no session to close".to_string())
            })?,
        };

        let mut session = self
            .sessions
            .get_session(session_id)
            .await
            .map_err(|e| ExecutionError::HandlerFailure(e.to_string()))?
            .ok_or_else(|| {
                ExecutionError::HandlerFailure(format!("session '{session_id}' not found"))
            })?;

        session.close(Utc::now());
        self.sessions
            .put_session(session)
            .await
            .map_err(|e| ExecutionError::HandlerFailure(e.to_string()))?;

        info!(request_id = %context.request_id, session_id = %session_id, "Session closed");

        Ok(json!({ "session_id": session_id, "closed": true }))
    }
}
