//! Raw Tera templates for the two rendered artifacts.
//!
//! Both artifacts render from the same template context, which is what makes
//! drift between implementation and tests impossible: there is exactly one
//! data model per tool, serialized once.

/// Implementation artifact: the tool wrapper source.
pub(crate) const IMPLEMENTATION_TEMPLATE: &str = r#"//! Generated tool wrapper for `{{ name }}`.
//!
//! Rendered by casekit-sdk from `{{ source_name }}`. Do not edit by hand;
//! regenerate from the spec instead.

use serde_json::{json, Map, Value};

/// Tool name.
pub const TOOL_NAME: &str = "{{ name }}";
/// Implementation strategy.
pub const IMPLEMENTATION: &str = "{{ kind }}";
{% if operation_ref %}/// Referenced canonical operation.
pub const OPERATION_REF: &str = "{{ operation_ref }}";
{% endif %}
/// Parameters accepted by `{{ name }}`, inherited from the referenced
/// operation{% if composite %}s of its steps{% endif %}.
#[derive(Debug, Clone)]
pub struct {{ name | pascal_case }}Params {
{% for p in parameters %}{% if p.doc %}    /// {{ p.doc }}
{% endif %}    pub {{ p.field_name }}: {{ p.rust_type }},
{% endfor %}}

impl {{ name | pascal_case }}Params {
    /// Ordered tool-facing parameter names.
    pub fn parameter_names() -> &'static [&'static str] {
        &[{% for p in parameters %}"{{ p.name }}"{% if not loop.last %}, {% endif %}{% endfor %}]
    }

    /// Serialize into the dispatch payload, applying declared defaults.
    pub fn into_payload(self) -> Value {
        let mut payload = Map::new();
{% for p in parameters %}        {{ p.payload_expr }}
{% endfor %}        Value::Object(payload)
    }
}
"#;

/// Test-scaffold artifact.
pub(crate) const TEST_TEMPLATE: &str = r#"//! Generated test scaffold for `{{ name }}`.
//!
//! Rendered by casekit-sdk from the same data model as the implementation
//! artifact, so the two cannot drift from each other.

use super::{{ name | pascal_case }}Params;

#[test]
fn parameter_names_are_stable() {
    assert_eq!(
        {{ name | pascal_case }}Params::parameter_names(),
        &[{% for p in parameters %}"{{ p.name }}"{% if not loop.last %}, {% endif %}{% endfor %}]
    );
}

#[test]
fn required_parameters() {
    let required: &[&str] = &[{% for p in parameters %}{% if p.required %}"{{ p.name }}", {% endif %}{% endfor %}];
    for name in required {
        assert!(
            {{ name | pascal_case }}Params::parameter_names().contains(name),
            "required parameter {name} missing from surface"
        );
    }
}
{% for example in examples %}
#[test]
fn example_{{ loop.index }}_matches_parameter_surface() {
    let example = serde_json::json!({{ example }});
    let object = example.as_object().expect("example seed must be an object");
    for key in object.keys() {
        assert!(
            {{ name | pascal_case }}Params::parameter_names().contains(&key.as_str()),
            "example field '{key}' is not a tool parameter"
        );
    }
}
{% endfor %}"#;
