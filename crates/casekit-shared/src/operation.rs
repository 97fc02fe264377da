//! Canonical operation definitions and derived parameters.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::classification::Classification;
use crate::schema::{Constraints, FieldSchema, TypeDescriptor};

/// Cross-cutting business rules attached to an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessRules {
    /// The caller must be authenticated.
    #[serde(default = "default_true")]
    pub auth_required: bool,
    /// Permissions the caller must hold.
    #[serde(default)]
    pub required_permissions: Vec<String>,
    /// The request must reference a casefile.
    #[serde(default)]
    pub casefile_required: bool,
    /// Handler timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            auth_required: true,
            required_permissions: Vec::new(),
            casefile_required: false,
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// A derived tool/operation parameter. Always produced by
/// [`derive_parameters`](crate::registry::derive_parameters) — never
/// hand-authored for operation-referencing tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDefinition {
    /// Tool-facing parameter name.
    pub name: String,
    /// Normalized type (wrappers unwrapped).
    pub type_descriptor: TypeDescriptor,
    /// Whether the caller must supply the parameter.
    pub required: bool,
    /// Default applied when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Value constraints carried over from the schema field.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Constraints>,
    /// Schema field this parameter was derived from.
    pub source_field: String,
    /// Composite provenance: which step contributed the parameter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_step: Option<String>,
}

/// A canonical, registered business operation.
///
/// Immutable once registered: the registry owns the definition and fills
/// `parameters` exactly once at registration time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationDefinition {
    /// Unique operation name (e.g. `create_casefile`).
    pub name: String,
    /// The mandatory 6-field classification.
    pub classification: Classification,
    /// Request schema: the described fields parameters derive from.
    pub request_schema: FieldSchema,
    /// Name of the response schema (documentation/tooling reference).
    pub response_schema_ref: String,
    /// Cross-cutting business rules.
    #[serde(default)]
    pub business_rules: BusinessRules,
    /// Derived parameter list, cached at registration. Empty until the
    /// definition has passed through [`OperationRegistry::register`](crate::registry::OperationRegistry::register).
    #[serde(default)]
    pub parameters: Vec<ParameterDefinition>,
}

impl OperationDefinition {
    /// Build an unregistered definition (no derived parameters yet).
    pub fn new(
        name: impl Into<String>,
        classification: Classification,
        request_schema: FieldSchema,
        response_schema_ref: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            classification,
            request_schema,
            response_schema_ref: response_schema_ref.into(),
            business_rules: BusinessRules::default(),
            parameters: Vec::new(),
        }
    }

    /// Attach business rules.
    pub fn with_business_rules(mut self, rules: BusinessRules) -> Self {
        self.business_rules = rules;
        self
    }

    /// Everything that identifies the operation except the derived cache.
    /// Two definitions with equal signatures are interchangeable.
    pub fn signature(&self) -> (&Classification, &FieldSchema, &str, &BusinessRules) {
        (
            &self.classification,
            &self.request_schema,
            self.response_schema_ref.as_str(),
            &self.business_rules,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::{Complexity, IntegrationTier, Maturity};
    use crate::schema::FieldDescriptor;

    fn classification() -> Classification {
        Classification {
            domain: "workspace".into(),
            subdomain: "casefile".into(),
            capability: "create".into(),
            complexity: Complexity::Atomic,
            maturity: Maturity::Stable,
            integration_tier: IntegrationTier::Internal,
        }
    }

    #[test]
    fn test_signature_ignores_derived_parameters() {
        let schema = FieldSchema::new(
            "CreateCasefileRequest",
            vec![FieldDescriptor::new("title", TypeDescriptor::String)],
        );
        let a = OperationDefinition::new(
            "create_casefile",
            classification(),
            schema.clone(),
            "CasefileRecord",
        );
        let mut b = a.clone();
        b.parameters.push(ParameterDefinition {
            name: "title".into(),
            type_descriptor: TypeDescriptor::String,
            required: true,
            default: None,
            constraints: None,
            source_field: "title".into(),
            source_step: None,
        });

        assert_eq!(a.signature(), b.signature());
        assert_ne!(a, b);
    }

    #[test]
    fn test_business_rules_defaults() {
        let rules = BusinessRules::default();
        assert!(rules.auth_required);
        assert!(!rules.casefile_required);
        assert_eq!(rules.timeout_ms, 30_000);
        assert!(rules.required_permissions.is_empty());
    }
}
