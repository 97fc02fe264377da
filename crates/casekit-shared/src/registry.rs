//! The operation and tool registries, plus the parameter-derivation engine.
//!
//! Both registries are populated during the explicit bootstrap sequence and
//! wrapped in `Arc` afterward — every accessor takes `&self`, so a sealed
//! registry is read-only by construction.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::error::RegistrationError;
use crate::operation::{OperationDefinition, ParameterDefinition};
use crate::schema::{FieldSchema, TypeDescriptor};
use crate::tool::{ToolDefinition, ToolImplementation};

/// Derive the flat, ordered parameter list for a request schema.
///
/// Walks descriptors in declaration order and unwraps the three wrapper
/// descriptors: `Optional` clears `required`, `Literal` becomes a defaulted
/// string, and `List` keeps its shape with a normalized inner type. The walk
/// is pure — the same schema always yields the same list.
pub fn derive_parameters(schema: &FieldSchema) -> Vec<ParameterDefinition> {
    schema
        .fields
        .iter()
        .map(|field| {
            let (type_descriptor, optional_wrapped, literal_default) =
                normalize(&field.type_descriptor);

            let default = field.default.clone().or(literal_default);
            let required = field.required && !optional_wrapped && default.is_none();

            ParameterDefinition {
                name: field.name.clone(),
                type_descriptor,
                required,
                default,
                constraints: field.constraints.clone(),
                source_field: field.name.clone(),
                source_step: None,
            }
        })
        .collect()
}

/// Unwrap wrapper descriptors into (normalized type, was-optional, literal default).
fn normalize(descriptor: &TypeDescriptor) -> (TypeDescriptor, bool, Option<Value>) {
    match descriptor {
        TypeDescriptor::Optional(inner) => {
            let (normalized, _, literal_default) = normalize(inner);
            (normalized, true, literal_default)
        }
        TypeDescriptor::Literal(value) => (
            TypeDescriptor::String,
            false,
            Some(Value::String(value.clone())),
        ),
        TypeDescriptor::List(inner) => {
            let (normalized, _, _) = normalize(inner);
            (TypeDescriptor::List(Box::new(normalized)), false, None)
        }
        other => (other.clone(), false, None),
    }
}

/// The canonical-operation registry.
///
/// Registration happens once at bootstrap, in a fixed order; afterwards the
/// registry is shared as `Arc<OperationRegistry>` and only read.
#[derive(Debug, Default)]
pub struct OperationRegistry {
    operations: HashMap<String, Arc<OperationDefinition>>,
    /// Registration order, for deterministic discovery listings.
    order: Vec<String>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a canonical operation, deriving and caching its parameters.
    ///
    /// Re-registering a definition with an identical signature is a no-op;
    /// the same name with a different signature is a
    /// [`RegistrationError::DuplicateOperation`]. A definition whose
    /// classification is incomplete is rejected without touching the
    /// registry.
    pub fn register(&mut self, mut def: OperationDefinition) -> Result<(), RegistrationError> {
        let missing = def.classification.missing_fields();
        if !missing.is_empty() {
            return Err(RegistrationError::ClassificationIncomplete {
                name: def.name.clone(),
                missing: missing.into_iter().map(String::from).collect(),
            });
        }

        if let Some(existing) = self.operations.get(&def.name) {
            if existing.signature() == def.signature() {
                return Ok(());
            }
            return Err(RegistrationError::DuplicateOperation(def.name.clone()));
        }

        def.parameters = derive_parameters(&def.request_schema);

        debug!(
            operation = %def.name,
            path = %def.classification.path(),
            parameter_count = def.parameters.len(),
            "Registered operation"
        );

        self.order.push(def.name.clone());
        self.operations.insert(def.name.clone(), Arc::new(def));
        Ok(())
    }

    /// Look up an operation by name.
    pub fn lookup(&self, name: &str) -> Option<Arc<OperationDefinition>> {
        self.operations.get(name).cloned()
    }

    /// All operations in a domain, in registration order.
    pub fn by_domain(&self, domain: &str) -> Vec<Arc<OperationDefinition>> {
        self.in_order()
            .filter(|op| op.classification.domain == domain)
            .collect()
    }

    /// All operations with a capability verb, in registration order.
    pub fn by_capability(&self, capability: &str) -> Vec<Arc<OperationDefinition>> {
        self.in_order()
            .filter(|op| op.classification.capability == capability)
            .collect()
    }

    /// Hierarchical discovery path (`workspace.casefile.create`) for an
    /// operation, if registered.
    pub fn hierarchical_path(&self, name: &str) -> Option<String> {
        self.operations.get(name).map(|op| op.classification.path())
    }

    /// Operation names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    fn in_order(&self) -> impl Iterator<Item = Arc<OperationDefinition>> + '_ {
        self.order
            .iter()
            .filter_map(|name| self.operations.get(name).cloned())
    }
}

/// The tool registry, populated at load time from generated definitions.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<ToolDefinition>>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, verifying classification completeness and that every
    /// operation reference resolves against the operation registry.
    pub fn register(
        &mut self,
        tool: ToolDefinition,
        operations: &OperationRegistry,
    ) -> Result<(), RegistrationError> {
        let missing = tool.classification.missing_fields();
        if !missing.is_empty() {
            return Err(RegistrationError::ClassificationIncomplete {
                name: tool.name.clone(),
                missing: missing.into_iter().map(String::from).collect(),
            });
        }

        if let Some(op_ref) = &tool.operation_ref {
            if operations.lookup(op_ref).is_none() {
                return Err(RegistrationError::UnresolvedReference {
                    referrer: tool.name.clone(),
                    reference: op_ref.clone(),
                });
            }
        }
        if let ToolImplementation::Composite { steps } = &tool.implementation {
            for step in steps {
                if operations.lookup(&step.operation_ref).is_none() {
                    return Err(RegistrationError::UnresolvedReference {
                        referrer: format!("{}#{}", tool.name, step.step_id),
                        reference: step.operation_ref.clone(),
                    });
                }
            }
        }

        if let Some(existing) = self.tools.get(&tool.name) {
            if **existing == tool {
                return Ok(());
            }
            return Err(RegistrationError::DuplicateOperation(tool.name.clone()));
        }

        debug!(tool = %tool.name, kind = tool.implementation.kind(), "Registered tool");

        self.order.push(tool.name.clone());
        self.tools.insert(tool.name.clone(), Arc::new(tool));
        Ok(())
    }

    /// Look up a tool by name.
    pub fn lookup(&self, name: &str) -> Option<Arc<ToolDefinition>> {
        self.tools.get(name).cloned()
    }

    /// All tools in a domain, in registration order.
    pub fn by_domain(&self, domain: &str) -> Vec<Arc<ToolDefinition>> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name).cloned())
            .filter(|tool| tool.classification.domain == domain)
            .collect()
    }

    /// Tool names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::{Classification, Complexity, IntegrationTier, Maturity};
    use crate::schema::FieldDescriptor;
    use serde_json::json;

    fn classification(capability: &str) -> Classification {
        Classification {
            domain: "workspace".into(),
            subdomain: "casefile".into(),
            capability: capability.into(),
            complexity: Complexity::Atomic,
            maturity: Maturity::Stable,
            integration_tier: IntegrationTier::Internal,
        }
    }

    fn create_casefile_def() -> OperationDefinition {
        let schema = FieldSchema::new(
            "CreateCasefileRequest",
            vec![
                FieldDescriptor::new("title", TypeDescriptor::String),
                FieldDescriptor::new("description", TypeDescriptor::String)
                    .with_default(json!("")),
            ],
        );
        OperationDefinition::new(
            "create_casefile",
            classification("create"),
            schema,
            "CasefileRecord",
        )
    }

    #[test]
    fn test_derive_parameters_scenario() {
        // The canonical registration scenario: title required, description
        // optional with empty-string default.
        let params = derive_parameters(&create_casefile_def().request_schema);
        assert_eq!(params.len(), 2);

        assert_eq!(params[0].name, "title");
        assert!(params[0].required);
        assert!(params[0].default.is_none());

        assert_eq!(params[1].name, "description");
        assert!(!params[1].required);
        assert_eq!(params[1].default, Some(json!("")));
    }

    #[test]
    fn test_derive_parameters_is_deterministic() {
        let schema = create_casefile_def().request_schema;
        assert_eq!(derive_parameters(&schema), derive_parameters(&schema));
    }

    #[test]
    fn test_derive_unwraps_optional_wrapper() {
        let schema = FieldSchema::new(
            "R",
            vec![FieldDescriptor::new(
                "assignee",
                TypeDescriptor::Optional(Box::new(TypeDescriptor::Uuid)),
            )],
        );
        let params = derive_parameters(&schema);
        assert_eq!(params[0].type_descriptor, TypeDescriptor::Uuid);
        assert!(!params[0].required);
    }

    #[test]
    fn test_derive_unwraps_literal_into_defaulted_string() {
        let schema = FieldSchema::new(
            "R",
            vec![FieldDescriptor::new(
                "record_kind",
                TypeDescriptor::Literal("casefile".into()),
            )],
        );
        let params = derive_parameters(&schema);
        assert_eq!(params[0].type_descriptor, TypeDescriptor::String);
        assert!(!params[0].required);
        assert_eq!(params[0].default, Some(json!("casefile")));
    }

    #[test]
    fn test_derive_normalizes_list_inner_types() {
        let schema = FieldSchema::new(
            "R",
            vec![FieldDescriptor::new(
                "tags",
                TypeDescriptor::List(Box::new(TypeDescriptor::Optional(Box::new(
                    TypeDescriptor::String,
                )))),
            )],
        );
        let params = derive_parameters(&schema);
        assert_eq!(
            params[0].type_descriptor,
            TypeDescriptor::List(Box::new(TypeDescriptor::String))
        );
        assert!(params[0].required);
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = OperationRegistry::new();
        registry.register(create_casefile_def()).unwrap();

        let op = registry.lookup("create_casefile").unwrap();
        assert_eq!(op.parameters.len(), 2);
        assert_eq!(
            registry.hierarchical_path("create_casefile").as_deref(),
            Some("workspace.casefile.create")
        );
    }

    #[test]
    fn test_identical_reregistration_is_noop() {
        let mut registry = OperationRegistry::new();
        registry.register(create_casefile_def()).unwrap();
        registry.register(create_casefile_def()).unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_conflicting_signature_rejected() {
        let mut registry = OperationRegistry::new();
        registry.register(create_casefile_def()).unwrap();

        let mut conflicting = create_casefile_def();
        conflicting.response_schema_ref = "SomethingElse".into();
        assert_eq!(
            registry.register(conflicting),
            Err(RegistrationError::DuplicateOperation(
                "create_casefile".into()
            ))
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_classification_gate_leaves_registry_unchanged() {
        let mut registry = OperationRegistry::new();
        registry.register(create_casefile_def()).unwrap();

        let mut incomplete = create_casefile_def();
        incomplete.name = "archive_casefile".into();
        incomplete.classification.subdomain = String::new();

        let err = registry.register(incomplete).unwrap_err();
        assert!(matches!(
            err,
            RegistrationError::ClassificationIncomplete { .. }
        ));
        assert_eq!(registry.len(), 1);
        assert!(registry.lookup("archive_casefile").is_none());
    }

    #[test]
    fn test_discovery_queries() {
        let mut registry = OperationRegistry::new();
        registry.register(create_casefile_def()).unwrap();

        let mut other = create_casefile_def();
        other.name = "get_casefile".into();
        other.classification.capability = "read".into();
        registry.register(other).unwrap();

        assert_eq!(registry.by_domain("workspace").len(), 2);
        assert_eq!(registry.by_capability("create").len(), 1);
        assert_eq!(registry.by_domain("billing").len(), 0);
        assert_eq!(registry.names(), vec!["create_casefile", "get_casefile"]);
    }

    #[test]
    fn test_tool_registry_rejects_unresolved_reference() {
        let ops = OperationRegistry::new();
        let mut tools = ToolRegistry::new();

        let tool = ToolDefinition {
            name: "casefile_create".into(),
            description: None,
            classification: classification("create"),
            operation_ref: Some("create_casefile".into()),
            effective_parameters: vec![],
            implementation: ToolImplementation::Simple,
            policy_overlays: Default::default(),
            generated_artifacts: None,
        };

        let err = tools.register(tool, &ops).unwrap_err();
        assert!(matches!(
            err,
            RegistrationError::UnresolvedReference { .. }
        ));
        assert!(tools.is_empty());
    }

    #[test]
    fn test_tool_registry_accepts_resolved_tool() {
        let mut ops = OperationRegistry::new();
        ops.register(create_casefile_def()).unwrap();

        let mut tools = ToolRegistry::new();
        let operation = ops.lookup("create_casefile").unwrap();
        let tool = ToolDefinition {
            name: "casefile_create".into(),
            description: Some("Create a casefile".into()),
            classification: classification("create"),
            operation_ref: Some("create_casefile".into()),
            effective_parameters: operation.parameters.clone(),
            implementation: ToolImplementation::Simple,
            policy_overlays: Default::default(),
            generated_artifacts: None,
        };

        tools.register(tool, &ops).unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools.by_domain("workspace").len(), 1);
    }
}
