//! Alignment validation: proving the three layers stay in sync.
//!
//! The validator independently re-derives every referenced operation's
//! parameters straight from the request schema — it does not trust the
//! registry's cache, the tool definition, or the generator — and diffs the
//! result against each tool's `effective_parameters` and against the
//! generated artifact's parameter manifest. The second diff catches generator
//! bugs, not just spec bugs.
//!
//! The validator never mutates anything; it only reports. Its pass state
//! (zero `error`-severity findings) is the single gate used pre-commit and in
//! CI.

use serde::Serialize;
use tracing::debug;

use casekit_shared::{
    derive_parameters, Maturity, OperationRegistry, ParameterDefinition, ToolDefinition,
    ToolImplementation,
};

use crate::generator::{ArtifactManifest, GeneratedTool};

/// Severity level for an alignment finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// A single alignment finding.
#[derive(Debug, Clone, Serialize)]
pub struct AlignmentFinding {
    /// Machine-readable code (e.g. `PARAMETER_MISMATCH`).
    pub code: String,
    /// Severity level.
    pub severity: Severity,
    /// Tool involved.
    pub tool: String,
    /// Operation involved, if applicable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    /// Human-readable message.
    pub message: String,
}

/// Complete alignment report for a generation run.
#[derive(Debug, Clone, Serialize)]
pub struct AlignmentReport {
    /// All findings, in tool order.
    pub findings: Vec<AlignmentFinding>,
    /// Number of tools checked.
    pub checked_tools: usize,
}

impl AlignmentReport {
    /// Pass iff zero error findings.
    pub fn passed(&self) -> bool {
        self.error_count() == 0
    }

    pub fn error_count(&self) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Warning)
            .count()
    }
}

/// Validate a whole generation run.
pub fn scan_all(registry: &OperationRegistry, generated: &[GeneratedTool]) -> AlignmentReport {
    let mut findings = Vec::new();

    for tool in generated {
        findings.extend(scan_tool(
            registry,
            &tool.definition,
            Some(&tool.manifest),
            !tool.spec.examples.is_empty(),
        ));
    }

    debug!(
        checked_tools = generated.len(),
        findings = findings.len(),
        "Alignment scan complete"
    );

    AlignmentReport {
        findings,
        checked_tools: generated.len(),
    }
}

/// Validate a single tool definition against the registry and its manifest.
pub fn scan_tool(
    registry: &OperationRegistry,
    tool: &ToolDefinition,
    manifest: Option<&ArtifactManifest>,
    has_examples: bool,
) -> Vec<AlignmentFinding> {
    let mut findings = Vec::new();

    let Some(expected) = rederive(registry, tool, &mut findings) else {
        return findings;
    };

    check_deprecation(registry, tool, &mut findings);

    diff_parameters(
        tool,
        &expected,
        &tool.effective_parameters,
        "tool definition",
        "PARAMETER_MISMATCH",
        "TYPE_MISMATCH",
        &mut findings,
    );

    match manifest {
        None => findings.push(AlignmentFinding {
            code: "MISSING_MANIFEST".into(),
            severity: Severity::Error,
            tool: tool.name.clone(),
            operation: tool.operation_ref.clone(),
            message: format!("tool '{}' has no generated parameter manifest", tool.name),
        }),
        Some(manifest) => {
            diff_parameters(
                tool,
                &expected,
                &manifest.parameters,
                "generated manifest",
                "MANIFEST_DRIFT",
                "MANIFEST_DRIFT",
                &mut findings,
            );
        }
    }

    if !has_examples {
        findings.push(AlignmentFinding {
            code: "MISSING_EXAMPLE".into(),
            severity: Severity::Info,
            tool: tool.name.clone(),
            operation: tool.operation_ref.clone(),
            message: format!("tool '{}' supplies no example seed data", tool.name),
        });
    }

    findings
}

/// Independently re-derive the expected parameter list from request schemas.
/// Returns `None` (after recording findings) when a reference is missing.
fn rederive(
    registry: &OperationRegistry,
    tool: &ToolDefinition,
    findings: &mut Vec<AlignmentFinding>,
) -> Option<Vec<ParameterDefinition>> {
    match &tool.implementation {
        ToolImplementation::Composite { steps } => {
            let mut union: Vec<ParameterDefinition> = Vec::new();
            let mut complete = true;

            for step in steps {
                let Some(operation) = registry.lookup(&step.operation_ref) else {
                    findings.push(missing_reference(
                        &tool.name,
                        &step.operation_ref,
                        Some(&step.step_id),
                    ));
                    complete = false;
                    continue;
                };

                for parameter in derive_parameters(&operation.request_schema) {
                    if let Some(existing) = union.iter().find(|p| p.name == parameter.name) {
                        if existing.type_descriptor != parameter.type_descriptor {
                            findings.push(AlignmentFinding {
                                code: "TYPE_MISMATCH".into(),
                                severity: Severity::Error,
                                tool: tool.name.clone(),
                                operation: Some(step.operation_ref.clone()),
                                message: format!(
                                    "composite parameter '{}' has conflicting types '{}' and '{}'",
                                    parameter.name,
                                    existing.type_descriptor,
                                    parameter.type_descriptor
                                ),
                            });
                            complete = false;
                        }
                        continue;
                    }
                    let mut inherited = parameter;
                    inherited.source_step = Some(step.step_id.clone());
                    union.push(inherited);
                }
            }

            complete.then_some(union)
        }
        _ => {
            let Some(op_ref) = tool.operation_ref.as_deref() else {
                findings.push(AlignmentFinding {
                    code: "MISSING_REFERENCE".into(),
                    severity: Severity::Error,
                    tool: tool.name.clone(),
                    operation: None,
                    message: format!("atomic tool '{}' has no operation reference", tool.name),
                });
                return None;
            };
            match registry.lookup(op_ref) {
                Some(operation) => Some(derive_parameters(&operation.request_schema)),
                None => {
                    findings.push(missing_reference(&tool.name, op_ref, None));
                    None
                }
            }
        }
    }
}

fn missing_reference(tool: &str, operation: &str, step: Option<&str>) -> AlignmentFinding {
    let message = match step {
        Some(step) => {
            format!("tool '{tool}' step '{step}' references unknown operation '{operation}'")
        }
        None => format!("tool '{tool}' references unknown operation '{operation}'"),
    };
    AlignmentFinding {
        code: "MISSING_REFERENCE".into(),
        severity: Severity::Error,
        tool: tool.to_string(),
        operation: Some(operation.to_string()),
        message,
    }
}

fn check_deprecation(
    registry: &OperationRegistry,
    tool: &ToolDefinition,
    findings: &mut Vec<AlignmentFinding>,
) {
    let mut refs: Vec<&str> = Vec::new();
    if let Some(op_ref) = tool.operation_ref.as_deref() {
        refs.push(op_ref);
    }
    if let ToolImplementation::Composite { steps } = &tool.implementation {
        refs.extend(steps.iter().map(|s| s.operation_ref.as_str()));
    }

    for op_ref in refs {
        let Some(operation) = registry.lookup(op_ref) else {
            continue;
        };
        if operation.classification.maturity == Maturity::Deprecated {
            findings.push(AlignmentFinding {
                code: "DEPRECATED_OPERATION".into(),
                severity: Severity::Warning,
                tool: tool.name.clone(),
                operation: Some(op_ref.to_string()),
                message: format!(
                    "tool '{}' references deprecated operation '{}' with no replacement specified",
                    tool.name, op_ref
                ),
            });
        }
    }
}

/// Diff an expected parameter list against an actual one, pushing findings.
fn diff_parameters(
    tool: &ToolDefinition,
    expected: &[ParameterDefinition],
    actual: &[ParameterDefinition],
    target: &str,
    mismatch_code: &str,
    type_code: &str,
    findings: &mut Vec<AlignmentFinding>,
) {
    let expected_names: Vec<&str> = expected.iter().map(|p| p.name.as_str()).collect();
    let actual_names: Vec<&str> = actual.iter().map(|p| p.name.as_str()).collect();

    if expected_names != actual_names {
        findings.push(AlignmentFinding {
            code: mismatch_code.into(),
            severity: Severity::Error,
            tool: tool.name.clone(),
            operation: tool.operation_ref.clone(),
            message: format!(
                "{target} parameter list {actual_names:?} does not match derived {expected_names:?}"
            ),
        });
        return;
    }

    for (expected_param, actual_param) in expected.iter().zip(actual) {
        if expected_param.type_descriptor != actual_param.type_descriptor {
            findings.push(AlignmentFinding {
                code: type_code.into(),
                severity: Severity::Error,
                tool: tool.name.clone(),
                operation: tool.operation_ref.clone(),
                message: format!(
                    "{target} parameter '{}' is '{}', derived type is '{}'",
                    actual_param.name,
                    actual_param.type_descriptor,
                    expected_param.type_descriptor
                ),
            });
        }
        if expected_param.required != actual_param.required
            || expected_param.default != actual_param.default
        {
            findings.push(AlignmentFinding {
                code: mismatch_code.into(),
                severity: Severity::Error,
                tool: tool.name.clone(),
                operation: tool.operation_ref.clone(),
                message: format!(
                    "{target} parameter '{}' requiredness/default drifted from the derived definition",
                    actual_param.name
                ),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::Generator;
    use crate::spec_loader::load_spec_str;
    use casekit_shared::{
        Classification, Complexity, FieldDescriptor, FieldSchema, IntegrationTier, Maturity,
        OperationDefinition, TypeDescriptor,
    };
    use serde_json::json;

    fn registry() -> OperationRegistry {
        let mut registry = OperationRegistry::new();
        registry
            .register(OperationDefinition::new(
                "create_casefile",
                Classification {
                    domain: "workspace".into(),
                    subdomain: "casefile".into(),
                    capability: "create".into(),
                    complexity: Complexity::Atomic,
                    maturity: Maturity::Stable,
                    integration_tier: IntegrationTier::Internal,
                },
                FieldSchema::new(
                    "CreateCasefileRequest",
                    vec![
                        FieldDescriptor::new("title", TypeDescriptor::String),
                        FieldDescriptor::new("description", TypeDescriptor::String)
                            .with_default(json!("")),
                    ],
                ),
                "CasefileRecord",
            ))
            .unwrap();
        registry
    }

    const CREATE_SPEC: &str = r#"
name: casefile_create
classification:
  domain: workspace
  subdomain: casefile
  capability: create
  complexity: atomic
  maturity: stable
  integration_tier: internal
operation: create_casefile
implementation:
  kind: simple
examples:
  - title: "Investigation X"
"#;

    fn generate_one(registry: &OperationRegistry) -> GeneratedTool {
        let spec = load_spec_str("casefile_create.yaml", CREATE_SPEC).unwrap();
        Generator::new()
            .unwrap()
            .generate(registry, &spec)
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_aligned_tool_passes_cleanly() {
        // The inheritance scenario: a generated tool referencing
        // create_casefile with no parameters block produces zero errors and
        // zero warnings.
        let registry = registry();
        let tool = generate_one(&registry);

        let report = scan_all(&registry, &[tool]);
        assert!(report.passed());
        assert_eq!(report.error_count(), 0);
        assert_eq!(report.warning_count(), 0);
        assert_eq!(report.checked_tools, 1);
    }

    #[test]
    fn test_hand_edited_parameters_flagged() {
        let registry = registry();
        let mut tool = generate_one(&registry);
        // Simulate drift: someone hand-edits the tool's parameter list.
        tool.definition.effective_parameters.remove(1);

        let report = scan_all(&registry, &[tool]);
        assert!(!report.passed());
        assert!(report
            .findings
            .iter()
            .any(|f| f.code == "PARAMETER_MISMATCH" && f.severity == Severity::Error));
    }

    #[test]
    fn test_type_drift_flagged() {
        let registry = registry();
        let mut tool = generate_one(&registry);
        tool.definition.effective_parameters[0].type_descriptor = TypeDescriptor::Integer;

        let report = scan_all(&registry, &[tool]);
        assert!(report
            .findings
            .iter()
            .any(|f| f.code == "TYPE_MISMATCH" && f.severity == Severity::Error));
    }

    #[test]
    fn test_manifest_drift_flagged_independently() {
        // A generator bug that writes a wrong manifest is caught even when
        // the tool definition itself is aligned.
        let registry = registry();
        let mut tool = generate_one(&registry);
        tool.manifest.parameters[1].required = true;

        let report = scan_all(&registry, &[tool]);
        assert!(!report.passed());
        assert!(report.findings.iter().any(|f| f.code == "MANIFEST_DRIFT"));
        assert!(!report
            .findings
            .iter()
            .any(|f| f.code == "PARAMETER_MISMATCH"));
    }

    #[test]
    fn test_missing_manifest_is_an_error() {
        let registry = registry();
        let tool = generate_one(&registry);

        let findings = scan_tool(&registry, &tool.definition, None, true);
        assert!(findings.iter().any(|f| f.code == "MISSING_MANIFEST"));
    }

    #[test]
    fn test_missing_reference_is_an_error() {
        let registry = registry();
        let mut tool = generate_one(&registry);
        tool.definition.operation_ref = Some("archive_casefile".into());

        let report = scan_all(&registry, &[tool]);
        assert!(!report.passed());
        assert!(report.findings.iter().any(|f| f.code == "MISSING_REFERENCE"));
    }

    #[test]
    fn test_deprecated_operation_is_a_warning_only() {
        let mut registry = OperationRegistry::new();
        registry
            .register(OperationDefinition::new(
                "create_casefile",
                Classification {
                    domain: "workspace".into(),
                    subdomain: "casefile".into(),
                    capability: "create".into(),
                    complexity: Complexity::Atomic,
                    maturity: Maturity::Deprecated,
                    integration_tier: IntegrationTier::Internal,
                },
                FieldSchema::new(
                    "CreateCasefileRequest",
                    vec![
                        FieldDescriptor::new("title", TypeDescriptor::String),
                        FieldDescriptor::new("description", TypeDescriptor::String)
                            .with_default(json!("")),
                    ],
                ),
                "CasefileRecord",
            ))
            .unwrap();

        let tool = generate_one(&registry);
        let report = scan_all(&registry, &[tool]);

        assert!(report.passed());
        assert_eq!(report.warning_count(), 1);
        assert!(report
            .findings
            .iter()
            .any(|f| f.code == "DEPRECATED_OPERATION" && f.severity == Severity::Warning));
    }

    #[test]
    fn test_missing_example_is_info() {
        let registry = registry();
        let spec_without_examples = CREATE_SPEC.replace(
            "examples:\n  - title: \"Investigation X\"\n",
            "",
        );
        let spec = load_spec_str("casefile_create.yaml", &spec_without_examples).unwrap();
        let tool = Generator::new()
            .unwrap()
            .generate(&registry, &spec)
            .unwrap()
            .unwrap();

        let report = scan_all(&registry, &[tool]);
        assert!(report.passed());
        assert!(report
            .findings
            .iter()
            .any(|f| f.code == "MISSING_EXAMPLE" && f.severity == Severity::Info));
    }
}
