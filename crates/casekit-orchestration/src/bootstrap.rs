//! The explicit bootstrap sequence.
//!
//! No import-time side effects anywhere: the canonical inventory is a plain
//! function, registration happens here in a fixed order, and the registries
//! come out of bootstrap sealed behind `Arc`s. Completeness and ordering are
//! testable because the whole sequence is one call.

use std::sync::Arc;

use serde_json::json;
use tracing::info;

use casekit_shared::{
    BusinessRules, Classification, Complexity, FieldDescriptor, FieldSchema, IntegrationTier,
    Maturity, OperationDefinition, OperationRegistry, RegistrationError, ToolDefinition,
    ToolRegistry, TypeDescriptor,
};

use crate::dispatcher::{Dispatcher, DispatcherConfig};
use crate::handlers::{
    CloseSessionHandler, CreateCasefileHandler, GetCasefileHandler, UpdateCasefileStatusHandler,
};
use crate::store::{CasefileStore, InMemoryStore, SessionStore};

/// A bootstrapped process: sealed registries plus a ready dispatcher.
#[derive(Debug, Clone)]
pub struct Runtime {
    pub operations: Arc<OperationRegistry>,
    pub tools: Arc<ToolRegistry>,
    pub dispatcher: Arc<Dispatcher>,
}

/// The declarative operation inventory, in registration order.
pub fn canonical_operations() -> Vec<OperationDefinition> {
    let workspace = |subdomain: &str, capability: &str, complexity: Complexity| Classification {
        domain: "workspace".to_string(),
        subdomain: subdomain.to_string(),
        capability: capability.to_string(),
        complexity,
        maturity: Maturity::Stable,
        integration_tier: IntegrationTier::Internal,
    };

    vec![
        OperationDefinition::new(
            "create_casefile",
            workspace("casefile", "create", Complexity::Atomic),
            FieldSchema::new(
                "CreateCasefileRequest",
                vec![
                    FieldDescriptor::new("title", TypeDescriptor::String)
                        .with_doc("Casefile title"),
                    FieldDescriptor::new("description", TypeDescriptor::String)
                        .with_default(json!(""))
                        .with_doc("Free-form description"),
                ],
            ),
            "CasefileRecord",
        ),
        OperationDefinition::new(
            "get_casefile",
            workspace("casefile", "read", Complexity::Atomic),
            FieldSchema::new(
                "GetCasefileRequest",
                vec![FieldDescriptor::new("casefile_id", TypeDescriptor::Uuid)],
            ),
            "CasefileRecord",
        ),
        OperationDefinition::new(
            "update_casefile_status",
            workspace("casefile", "update", Complexity::Atomic),
            FieldSchema::new(
                "UpdateCasefileStatusRequest",
                vec![
                    FieldDescriptor::new("casefile_id", TypeDescriptor::Uuid),
                    FieldDescriptor::new("status", TypeDescriptor::String),
                    FieldDescriptor::new(
                        "note",
                        TypeDescriptor::Optional(Box::new(TypeDescriptor::String)),
                    ),
                ],
            ),
            "CasefileRecord",
        )
        .with_business_rules(BusinessRules {
            casefile_required: true,
            ..Default::default()
        }),
        OperationDefinition::new(
            "close_session",
            workspace("session", "terminate", Complexity::Atomic),
            FieldSchema::new(
                "CloseSessionRequest",
                vec![FieldDescriptor::new(
                    "session_id",
                    TypeDescriptor::Optional(Box::new(TypeDescriptor::Uuid)),
                )],
            ),
            "SessionRecord",
        ),
    ]
}

/// Bootstrap with in-memory stores and no pre-generated tools.
pub fn bootstrap() -> Result<Runtime, RegistrationError> {
    let store = Arc::new(InMemoryStore::new());
    bootstrap_with(store.clone(), store, Vec::new(), DispatcherConfig::default())
}

/// Full bootstrap: register the canonical inventory in fixed order, import
/// generated tool definitions, install handlers and built-in hooks, and seal
/// everything.
pub fn bootstrap_with(
    sessions: Arc<dyn SessionStore>,
    casefiles: Arc<dyn CasefileStore>,
    generated_tools: Vec<ToolDefinition>,
    config: DispatcherConfig,
) -> Result<Runtime, RegistrationError> {
    let mut operations = OperationRegistry::new();
    for operation in canonical_operations() {
        operations.register(operation)?;
    }

    let mut tools = ToolRegistry::new();
    for tool in generated_tools {
        tools.register(tool, &operations)?;
    }

    let operations = Arc::new(operations);
    let tools = Arc::new(tools);

    let mut dispatcher = Dispatcher::new(
        operations.clone(),
        tools.clone(),
        sessions.clone(),
        casefiles.clone(),
        config,
    );
    dispatcher.install_handler(Arc::new(CreateCasefileHandler::new(casefiles.clone())));
    dispatcher.install_handler(Arc::new(GetCasefileHandler::new(casefiles.clone())));
    dispatcher.install_handler(Arc::new(UpdateCasefileStatusHandler::new(casefiles)));
    dispatcher.install_handler(Arc::new(CloseSessionHandler::new(sessions)));

    info!(
        operations = operations.len(),
        tools = tools.len(),
        "Bootstrap complete; registries sealed"
    );

    Ok(Runtime {
        operations,
        tools,
        dispatcher: Arc::new(dispatcher),
    })
}
