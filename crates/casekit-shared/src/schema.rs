//! Field descriptors and the `describe_fields()` capability.
//!
//! Any structured record type that wants its fields derivable into tool
//! parameters implements [`DescribeFields`]. The descriptor list is the only
//! channel through which the registry and the generator learn about request
//! shapes — there is no reflection anywhere else.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Closed, language-agnostic type representation for a described field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeDescriptor {
    String,
    Integer,
    Number,
    Boolean,
    Uuid,
    Timestamp,
    /// Open-content JSON value (dict/map payloads).
    Json,
    /// Wrapper: the inner type, not required.
    Optional(Box<TypeDescriptor>),
    /// Wrapper: homogeneous collection of the inner type.
    List(Box<TypeDescriptor>),
    /// Wrapper: a string field fixed to a single literal value.
    Literal(String),
    /// References a named nested record.
    Object(String),
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::String => write!(f, "string"),
            TypeDescriptor::Integer => write!(f, "integer"),
            TypeDescriptor::Number => write!(f, "number"),
            TypeDescriptor::Boolean => write!(f, "boolean"),
            TypeDescriptor::Uuid => write!(f, "uuid"),
            TypeDescriptor::Timestamp => write!(f, "timestamp"),
            TypeDescriptor::Json => write!(f, "json"),
            TypeDescriptor::Optional(inner) => write!(f, "optional<{inner}>"),
            TypeDescriptor::List(inner) => write!(f, "list<{inner}>"),
            TypeDescriptor::Literal(value) => write!(f, "literal({value})"),
            TypeDescriptor::Object(name) => write!(f, "{name}"),
        }
    }
}

impl TypeDescriptor {
    /// Whether this descriptor is wrapped in `Optional` at the top level.
    pub fn is_optional(&self) -> bool {
        matches!(self, TypeDescriptor::Optional(_))
    }

    /// Rust type rendering used by the artifact templates.
    pub fn rust_type(&self) -> String {
        match self {
            TypeDescriptor::String | TypeDescriptor::Literal(_) => "String".to_string(),
            TypeDescriptor::Integer => "i64".to_string(),
            TypeDescriptor::Number => "f64".to_string(),
            TypeDescriptor::Boolean => "bool".to_string(),
            TypeDescriptor::Uuid => "uuid::Uuid".to_string(),
            TypeDescriptor::Timestamp => "chrono::DateTime<chrono::Utc>".to_string(),
            TypeDescriptor::Json => "serde_json::Value".to_string(),
            TypeDescriptor::Optional(inner) => format!("Option<{}>", inner.rust_type()),
            TypeDescriptor::List(inner) => format!("Vec<{}>", inner.rust_type()),
            TypeDescriptor::Object(name) => name.clone(),
        }
    }
}

/// Value constraints attached to a described field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    /// Minimum numeric value (inclusive).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Maximum numeric value (inclusive).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Minimum string/collection length.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    /// Maximum string/collection length.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Regex pattern for string values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

impl Constraints {
    /// Whether no constraint is set.
    pub fn is_empty(&self) -> bool {
        self.min.is_none()
            && self.max.is_none()
            && self.min_length.is_none()
            && self.max_length.is_none()
            && self.pattern.is_none()
    }
}

/// A single described field: name, type, requiredness, default, constraints, doc.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Field name as declared on the record.
    pub name: String,
    /// Resolved type.
    pub type_descriptor: TypeDescriptor,
    /// Whether the field must be present.
    pub required: bool,
    /// Default value applied when the field is absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Value constraints, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Constraints>,
    /// Documentation line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

impl FieldDescriptor {
    /// A required field of the given type.
    pub fn new(name: impl Into<String>, type_descriptor: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            type_descriptor,
            required: true,
            default: None,
            constraints: None,
            doc: None,
        }
    }

    /// Mark the field optional.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Attach a default value (implies the field is optional).
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self.required = false;
        self
    }

    /// Attach value constraints.
    pub fn with_constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = Some(constraints);
        self
    }

    /// Attach a documentation line.
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }
}

/// A named, ordered field-descriptor list: the schema of one record type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    /// Schema name (e.g. `CreateCasefileRequest`).
    pub name: String,
    /// Fields in declaration order.
    pub fields: Vec<FieldDescriptor>,
}

impl FieldSchema {
    /// Build a schema from a name and ordered descriptors.
    pub fn new(name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }
}

/// Uniform field-description capability for structured record types.
///
/// Implementations must return descriptors in declaration order and must be
/// pure: the same type always describes the same fields.
pub trait DescribeFields {
    /// Stable schema name for registry references.
    fn schema_name() -> &'static str;

    /// Ordered field descriptors.
    fn describe_fields() -> Vec<FieldDescriptor>;

    /// The full schema (name + fields).
    fn field_schema() -> FieldSchema {
        FieldSchema::new(Self::schema_name(), Self::describe_fields())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_type_descriptor_display() {
        assert_eq!(TypeDescriptor::String.to_string(), "string");
        assert_eq!(
            TypeDescriptor::Optional(Box::new(TypeDescriptor::Integer)).to_string(),
            "optional<integer>"
        );
        assert_eq!(
            TypeDescriptor::List(Box::new(TypeDescriptor::Uuid)).to_string(),
            "list<uuid>"
        );
        assert_eq!(
            TypeDescriptor::Literal("casefile".into()).to_string(),
            "literal(casefile)"
        );
    }

    #[test]
    fn test_rust_type_rendering() {
        assert_eq!(
            TypeDescriptor::Optional(Box::new(TypeDescriptor::String)).rust_type(),
            "Option<String>"
        );
        assert_eq!(
            TypeDescriptor::List(Box::new(TypeDescriptor::Number)).rust_type(),
            "Vec<f64>"
        );
        assert_eq!(TypeDescriptor::Json.rust_type(), "serde_json::Value");
    }

    #[test]
    fn test_field_descriptor_builder() {
        let field = FieldDescriptor::new("title", TypeDescriptor::String)
            .with_doc("Casefile title")
            .with_constraints(Constraints {
                max_length: Some(200),
                ..Default::default()
            });

        assert!(field.required);
        assert_eq!(field.doc.as_deref(), Some("Casefile title"));
        assert_eq!(field.constraints.unwrap().max_length, Some(200));
    }

    #[test]
    fn test_default_implies_optional() {
        let field = FieldDescriptor::new("description", TypeDescriptor::String)
            .with_default(json!(""));
        assert!(!field.required);
        assert_eq!(field.default, Some(json!("")));
    }

    #[test]
    fn test_descriptor_serde_round_trip() {
        let schema = FieldSchema::new(
            "CreateCasefileRequest",
            vec![
                FieldDescriptor::new("title", TypeDescriptor::String),
                FieldDescriptor::new(
                    "tags",
                    TypeDescriptor::List(Box::new(TypeDescriptor::String)),
                )
                .optional(),
            ],
        );

        let value = serde_json::to_value(&schema).unwrap();
        let parsed: FieldSchema = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, schema);
    }
}
