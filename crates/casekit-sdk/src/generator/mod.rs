//! Spec-to-code generation.
//!
//! For each loaded [`ToolSpec`] the generator resolves the operation
//! reference(s) against the registry, inherits the derived parameters, and
//! renders two artifacts from one data model — implementation and test
//! scaffold — plus a JSON parameter manifest the alignment validator diffs
//! against. Rendering is deterministic: stable field ordering and stable
//! template output mean an unchanged spec re-renders byte-identically.

mod filters;
mod templates;

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tera::{Context, Tera};
use tracing::{debug, info};

use casekit_shared::{
    ArtifactHandles, CompositeStep, MappingSource, OperationRegistry, ParameterDefinition,
    ToolDefinition, ToolImplementation,
};

use crate::error::GenerationError;
use crate::spec_loader::ToolSpec;

/// A rendered output file ready to be written to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedFile {
    /// Relative path for the output file.
    pub path: String,
    /// Rendered content.
    pub content: String,
}

/// The three files rendered for one tool.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedArtifacts {
    pub implementation: RenderedFile,
    pub test: RenderedFile,
    pub manifest: RenderedFile,
}

/// Parameter manifest emitted next to the artifacts. The alignment validator
/// diffs this against an independent re-derivation, which catches generator
/// bugs and not just spec bugs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    /// Tool name.
    pub tool: String,
    /// Referenced operation, absent for composites.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_ref: Option<String>,
    /// Declared parameter list, in order.
    pub parameters: Vec<ParameterDefinition>,
}

/// One generated tool: its definition, manifest, and rendered artifacts.
#[derive(Debug, Clone)]
pub struct GeneratedTool {
    pub spec: ToolSpec,
    pub definition: ToolDefinition,
    pub manifest: ArtifactManifest,
    pub artifacts: RenderedArtifacts,
}

/// A non-fatal per-spec problem collected during a generation run, so one
/// run reports every problem instead of stopping at the first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationFinding {
    /// Machine-readable code (e.g. `UNRESOLVED_OPERATION`).
    pub code: String,
    /// Tool the finding concerns.
    pub tool: String,
    /// Human-readable message.
    pub message: String,
}

/// Result of a batch generation run.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    /// Successfully generated tools, in spec order.
    pub tools: Vec<GeneratedTool>,
    /// Per-spec findings for tools that could not be generated.
    pub findings: Vec<GenerationFinding>,
}

impl GenerationOutcome {
    /// Whether every spec generated cleanly.
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }
}

/// The artifact generator. Template compilation happens once at
/// construction; rendering is pure afterwards.
#[derive(Debug)]
pub struct Generator {
    tera: Tera,
}

impl Generator {
    /// Build a generator with the embedded artifact templates and case
    /// filters registered.
    pub fn new() -> Result<Self, GenerationError> {
        let mut tera = Tera::default();
        tera.register_filter("snake_case", filters::snake_case);
        tera.register_filter("pascal_case", filters::pascal_case);

        tera.add_raw_template("implementation.rs.tera", templates::IMPLEMENTATION_TEMPLATE)
            .map_err(|e| GenerationError::TemplateRenderFailure {
                template: "implementation.rs.tera".into(),
                source: e,
            })?;
        tera.add_raw_template("test.rs.tera", templates::TEST_TEMPLATE)
            .map_err(|e| GenerationError::TemplateRenderFailure {
                template: "test.rs.tera".into(),
                source: e,
            })?;

        Ok(Self { tera })
    }

    /// Generate every spec in order, collecting per-spec findings instead of
    /// failing the batch. Only infrastructure failures (template or i/o
    /// errors) abort the run.
    pub fn generate_all(
        &self,
        registry: &OperationRegistry,
        specs: &[ToolSpec],
    ) -> Result<GenerationOutcome, GenerationError> {
        let mut tools = Vec::new();
        let mut findings = Vec::new();

        for spec in specs {
            match self.generate(registry, spec)? {
                Ok(tool) => tools.push(tool),
                Err(spec_findings) => findings.extend(spec_findings),
            }
        }

        info!(
            generated = tools.len(),
            findings = findings.len(),
            "Generation run complete"
        );

        Ok(GenerationOutcome { tools, findings })
    }

    /// Generate a single spec. The outer `Result` is an infrastructure
    /// failure; the inner `Err` carries the spec's resolution findings.
    pub fn generate(
        &self,
        registry: &OperationRegistry,
        spec: &ToolSpec,
    ) -> Result<Result<GeneratedTool, Vec<GenerationFinding>>, GenerationError> {
        let (parameters, resolution_findings) = inherit_parameters(registry, spec);
        if !resolution_findings.is_empty() {
            return Ok(Err(resolution_findings));
        }

        let manifest = ArtifactManifest {
            tool: spec.name.clone(),
            operation_ref: spec.operation.clone(),
            parameters: parameters.clone(),
        };

        let artifacts = self.render(spec, &parameters, &manifest)?;

        let definition = ToolDefinition {
            name: spec.name.clone(),
            description: spec.description.clone(),
            classification: spec.classification.clone(),
            operation_ref: spec.operation.clone(),
            effective_parameters: parameters,
            implementation: spec.implementation.clone(),
            policy_overlays: spec.policy.clone(),
            generated_artifacts: Some(ArtifactHandles {
                implementation: artifacts.implementation.path.clone(),
                test: artifacts.test.path.clone(),
                manifest: artifacts.manifest.path.clone(),
            }),
        };

        debug!(tool = %spec.name, parameters = definition.effective_parameters.len(), "Generated tool");

        Ok(Ok(GeneratedTool {
            spec: spec.clone(),
            definition,
            manifest,
            artifacts,
        }))
    }

    /// Render the implementation and test artifacts plus the manifest file.
    fn render(
        &self,
        spec: &ToolSpec,
        parameters: &[ParameterDefinition],
        manifest: &ArtifactManifest,
    ) -> Result<RenderedArtifacts, GenerationError> {
        let context = build_context(spec, parameters);

        let implementation =
            self.tera
                .render("implementation.rs.tera", &context)
                .map_err(|e| GenerationError::TemplateRenderFailure {
                    template: "implementation.rs.tera".into(),
                    source: e,
                })?;

        let test = self.tera.render("test.rs.tera", &context).map_err(|e| {
            GenerationError::TemplateRenderFailure {
                template: "test.rs.tera".into(),
                source: e,
            }
        })?;

        // serde_json sorts object keys, so the manifest is byte-stable too.
        let manifest_json =
            serde_json::to_string_pretty(manifest).map_err(|e| GenerationError::Io {
                path: format!("{}.manifest.json", spec.name),
                source: std::io::Error::other(e),
            })?;

        Ok(RenderedArtifacts {
            implementation: RenderedFile {
                path: format!("{0}/{0}.rs", spec.name),
                content: implementation,
            },
            test: RenderedFile {
                path: format!("{0}/{0}_test.rs", spec.name),
                content: test,
            },
            manifest: RenderedFile {
                path: format!("{0}/{0}.manifest.json", spec.name),
                content: format!("{manifest_json}\n"),
            },
        })
    }

    /// Write a generated tool's artifacts under `out_dir`.
    pub fn write_artifacts(
        &self,
        out_dir: &Path,
        tool: &GeneratedTool,
    ) -> Result<(), GenerationError> {
        for file in [
            &tool.artifacts.implementation,
            &tool.artifacts.test,
            &tool.artifacts.manifest,
        ] {
            let path = out_dir.join(&file.path);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| GenerationError::Io {
                    path: parent.display().to_string(),
                    source: e,
                })?;
            }
            std::fs::write(&path, &file.content).map_err(|e| GenerationError::Io {
                path: path.display().to_string(),
                source: e,
            })?;
        }
        Ok(())
    }
}

/// Inherit the effective parameter list for a spec.
///
/// Atomic tools copy the referenced operation's derived list verbatim.
/// Composite tools union parameters across steps in step order, deduplicating
/// by name while keeping `source_step` provenance from the first contributing
/// step; name collisions with differing types are rejected. Structural
/// problems are returned as findings, never panics.
pub fn inherit_parameters(
    registry: &OperationRegistry,
    spec: &ToolSpec,
) -> (Vec<ParameterDefinition>, Vec<GenerationFinding>) {
    match &spec.implementation {
        ToolImplementation::Composite { steps } => union_step_parameters(registry, spec, steps),
        _ => {
            let Some(op_ref) = spec.operation.as_deref() else {
                // The loader rejects this shape; guard anyway.
                return (
                    Vec::new(),
                    vec![finding(
                        "UNRESOLVED_OPERATION",
                        &spec.name,
                        "atomic spec has no operation reference",
                    )],
                );
            };
            match registry.lookup(op_ref) {
                Some(operation) => (operation.parameters.clone(), Vec::new()),
                None => (
                    Vec::new(),
                    vec![finding(
                        "UNRESOLVED_OPERATION",
                        &spec.name,
                        &format!("references unknown operation '{op_ref}'"),
                    )],
                ),
            }
        }
    }
}

fn union_step_parameters(
    registry: &OperationRegistry,
    spec: &ToolSpec,
    steps: &[CompositeStep],
) -> (Vec<ParameterDefinition>, Vec<GenerationFinding>) {
    let mut findings = Vec::new();
    let mut union: Vec<ParameterDefinition> = Vec::new();

    for step in steps {
        let Some(operation) = registry.lookup(&step.operation_ref) else {
            findings.push(finding(
                "UNRESOLVED_OPERATION",
                &spec.name,
                &format!(
                    "step '{}' references unknown operation '{}'",
                    step.step_id, step.operation_ref
                ),
            ));
            continue;
        };

        for parameter in &operation.parameters {
            if let Some(existing) = union.iter().find(|p| p.name == parameter.name) {
                // Same name, same type: the first contributing step keeps
                // provenance. Differing types are an ambiguous collision.
                if existing.type_descriptor != parameter.type_descriptor {
                    findings.push(finding(
                        "AMBIGUOUS_PARAMETER",
                        &spec.name,
                        &format!(
                            "parameter '{}' is '{}' from step '{}' but '{}' from step '{}'",
                            parameter.name,
                            existing.type_descriptor,
                            existing.source_step.as_deref().unwrap_or("?"),
                            parameter.type_descriptor,
                            step.step_id
                        ),
                    ));
                }
                continue;
            }

            let mut inherited = parameter.clone();
            inherited.source_step = Some(step.step_id.clone());
            union.push(inherited);
        }
    }

    findings.extend(check_step_mappings(spec, steps, &union));

    if findings.is_empty() {
        (union, findings)
    } else {
        (Vec::new(), findings)
    }
}

/// Check the composite-acyclicity and referential-integrity invariants:
/// input mappings may reference only the original input or strictly earlier
/// steps, and a step-output reference must name a field the earlier step
/// actually exposes.
fn check_step_mappings(
    spec: &ToolSpec,
    steps: &[CompositeStep],
    union: &[ParameterDefinition],
) -> Vec<GenerationFinding> {
    let mut findings = Vec::new();

    for (index, step) in steps.iter().enumerate() {
        for binding in &step.input_mapping {
            match &binding.source {
                MappingSource::FromInput { field } => {
                    if !union.iter().any(|p| p.name == *field) {
                        findings.push(finding(
                            "UNRESOLVED_REFERENCE",
                            &spec.name,
                            &format!(
                                "step '{}' maps input field '{}' which is not a tool parameter",
                                step.step_id, field
                            ),
                        ));
                    }
                }
                MappingSource::FromStep { step_id, field } => {
                    let earlier = steps[..index].iter().find(|s| s.step_id == *step_id);
                    match earlier {
                        None => {
                            let code = if steps[index..].iter().any(|s| s.step_id == *step_id) {
                                "FORWARD_STEP_REFERENCE"
                            } else {
                                "UNRESOLVED_REFERENCE"
                            };
                            findings.push(finding(
                                code,
                                &spec.name,
                                &format!(
                                    "step '{}' references step '{}', which is not an earlier step",
                                    step.step_id, step_id
                                ),
                            ));
                        }
                        Some(producer) => {
                            let exposed = producer
                                .output_mapping
                                .iter()
                                .any(|binding| binding.expose_as == *field);
                            if !exposed {
                                findings.push(finding(
                                    "UNRESOLVED_REFERENCE",
                                    &spec.name,
                                    &format!(
                                        "step '{}' reads '{}' from step '{}', which does not expose it",
                                        step.step_id, field, step_id
                                    ),
                                ));
                            }
                        }
                    }
                }
            }
        }
    }

    findings
}

fn finding(code: &str, tool: &str, message: &str) -> GenerationFinding {
    GenerationFinding {
        code: code.to_string(),
        tool: tool.to_string(),
        message: message.to_string(),
    }
}

/// Build the shared template context for both artifacts.
fn build_context(spec: &ToolSpec, parameters: &[ParameterDefinition]) -> Context {
    #[derive(Serialize)]
    struct ParamContext {
        name: String,
        field_name: String,
        rust_type: String,
        required: bool,
        doc: Option<String>,
        payload_expr: String,
    }

    let params: Vec<ParamContext> = parameters
        .iter()
        .map(|p| {
            use heck::ToSnakeCase;
            let field_name = p.name.to_snake_case();
            let base_type = p.type_descriptor.rust_type();
            let rust_type = if p.required {
                base_type
            } else {
                format!("Option<{}>", p.type_descriptor.rust_type())
            };
            ParamContext {
                name: p.name.clone(),
                field_name: field_name.clone(),
                rust_type,
                required: p.required,
                doc: p
                    .source_step
                    .as_ref()
                    .map(|step| format!("Inherited from step `{step}`.")),
                payload_expr: payload_expr(&p.name, &field_name, p.required, p.default.as_ref()),
            }
        })
        .collect();

    let examples: Vec<String> = spec
        .examples
        .iter()
        .map(|example| serde_json::to_string(example).unwrap_or_else(|_| "{}".to_string()))
        .collect();

    let mut context = Context::new();
    context.insert("name", &spec.name);
    context.insert("source_name", &spec.source_name);
    context.insert("kind", spec.implementation.kind());
    context.insert("operation_ref", &spec.operation);
    context.insert("composite", &!spec.implementation.is_atomic());
    context.insert("parameters", &params);
    context.insert("examples", &examples);
    context
}

/// The `into_payload` line for one parameter.
fn payload_expr(name: &str, field_name: &str, required: bool, default: Option<&Value>) -> String {
    if required {
        return format!("payload.insert(\"{name}\".to_string(), json!(self.{field_name}));");
    }
    match default {
        Some(default) => {
            let literal = serde_json::to_string(default).unwrap_or_else(|_| "null".to_string());
            format!(
                "payload.insert(\"{name}\".to_string(), match self.{field_name} {{ Some(value) => json!(value), None => json!({literal}) }});"
            )
        }
        None => format!(
            "if let Some(value) = self.{field_name} {{ payload.insert(\"{name}\".to_string(), json!(value)); }}"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec_loader::load_spec_str;
    use casekit_shared::{
        BusinessRules, Classification, Complexity, FieldDescriptor, FieldSchema, IntegrationTier,
        Maturity, OperationDefinition, TypeDescriptor,
    };
    use serde_json::json;

    fn classification(capability: &str, complexity: Complexity) -> Classification {
        Classification {
            domain: "workspace".into(),
            subdomain: "casefile".into(),
            capability: capability.into(),
            complexity,
            maturity: Maturity::Stable,
            integration_tier: IntegrationTier::Internal,
        }
    }

    fn registry() -> OperationRegistry {
        let mut registry = OperationRegistry::new();
        registry
            .register(
                OperationDefinition::new(
                    "create_casefile",
                    classification("create", Complexity::Atomic),
                    FieldSchema::new(
                        "CreateCasefileRequest",
                        vec![
                            FieldDescriptor::new("title", TypeDescriptor::String),
                            FieldDescriptor::new("description", TypeDescriptor::String)
                                .with_default(json!("")),
                        ],
                    ),
                    "CasefileRecord",
                )
                .with_business_rules(BusinessRules::default()),
            )
            .unwrap();
        registry
            .register(OperationDefinition::new(
                "update_casefile_status",
                classification("update", Complexity::Atomic),
                FieldSchema::new(
                    "UpdateCasefileStatusRequest",
                    vec![
                        FieldDescriptor::new("casefile_id", TypeDescriptor::Uuid),
                        FieldDescriptor::new("status", TypeDescriptor::String),
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

    const COMPOSITE_SPEC: &str = r#"
name: casefile_intake
classification:
  domain: workspace
  subdomain: casefile
  capability: intake
  complexity: composite
  maturity: beta
  integration_tier: internal
implementation:
  kind: composite
  steps:
    - step_id: open
      operation_ref: create_casefile
      output_mapping:
        - field: casefile_id
          expose_as: casefile_id
    - step_id: mark_active
      operation_ref: update_casefile_status
      input_mapping:
        - parameter: casefile_id
          source:
            from_step:
              step_id: open
              field: casefile_id
"#;

    #[test]
    fn test_atomic_inheritance_is_verbatim() {
        // A spec with no parameters block inherits the operation's derived
        // list exactly: same names, same order, same requiredness.
        let registry = registry();
        let spec = load_spec_str("casefile_create.yaml", CREATE_SPEC).unwrap();
        let (params, findings) = inherit_parameters(&registry, &spec);

        assert!(findings.is_empty());
        let operation = registry.lookup("create_casefile").unwrap();
        assert_eq!(params, operation.parameters);
    }

    #[test]
    fn test_unresolved_reference_is_a_finding_not_an_error() {
        let registry = OperationRegistry::new();
        let spec = load_spec_str("casefile_create.yaml", CREATE_SPEC).unwrap();

        let generator = Generator::new().unwrap();
        let outcome = generator.generate_all(&registry, &[spec]).unwrap();

        assert!(outcome.tools.is_empty());
        assert_eq!(outcome.findings.len(), 1);
        assert_eq!(outcome.findings[0].code, "UNRESOLVED_OPERATION");
    }

    #[test]
    fn test_composite_union_with_provenance() {
        let registry = registry();
        let spec = load_spec_str("casefile_intake.yaml", COMPOSITE_SPEC).unwrap();
        let (params, findings) = inherit_parameters(&registry, &spec);

        assert!(findings.is_empty(), "unexpected findings: {findings:?}");
        let names: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["title", "description", "casefile_id", "status"]);
        assert_eq!(params[0].source_step.as_deref(), Some("open"));
        assert_eq!(params[2].source_step.as_deref(), Some("mark_active"));
    }

    #[test]
    fn test_composite_type_collision_rejected() {
        let mut registry = registry();
        registry
            .register(OperationDefinition::new(
                "tag_casefile",
                classification("tag", Complexity::Atomic),
                FieldSchema::new(
                    "TagCasefileRequest",
                    vec![FieldDescriptor::new("title", TypeDescriptor::Integer)],
                ),
                "CasefileRecord",
            ))
            .unwrap();

        let yaml = COMPOSITE_SPEC.replace(
            "operation_ref: update_casefile_status",
            "operation_ref: tag_casefile",
        );
        // Drop the mapping that no longer applies to the swapped operation.
        let yaml = yaml.split("      input_mapping:").next().unwrap().to_string();

        let spec = load_spec_str("casefile_intake.yaml", &yaml).unwrap();
        let (params, findings) = inherit_parameters(&registry, &spec);

        assert!(params.is_empty());
        assert!(findings.iter().any(|f| f.code == "AMBIGUOUS_PARAMETER"));
    }

    #[test]
    fn test_removed_output_field_breaks_generation() {
        // Referential integrity: step 'mark_active' reads casefile_id from
        // step 'open'; removing the exposure must fail the run.
        let registry = registry();
        let yaml = COMPOSITE_SPEC.replace(
            "      output_mapping:\n        - field: casefile_id\n          expose_as: casefile_id\n",
            "",
        );
        let spec = load_spec_str("casefile_intake.yaml", &yaml).unwrap();
        let (_, findings) = inherit_parameters(&registry, &spec);

        assert!(
            findings.iter().any(|f| f.code == "UNRESOLVED_REFERENCE"),
            "expected unresolved-reference finding, got {findings:?}"
        );
    }

    #[test]
    fn test_forward_step_reference_rejected() {
        let registry = registry();
        let yaml = r#"
name: casefile_backwards
classification:
  domain: workspace
  subdomain: casefile
  capability: intake
  complexity: composite
  maturity: beta
  integration_tier: internal
implementation:
  kind: composite
  steps:
    - step_id: mark_active
      operation_ref: update_casefile_status
      input_mapping:
        - parameter: casefile_id
          source:
            from_step:
              step_id: open
              field: casefile_id
    - step_id: open
      operation_ref: create_casefile
      output_mapping:
        - field: casefile_id
          expose_as: casefile_id
"#;
        let spec = load_spec_str("casefile_backwards.yaml", yaml).unwrap();
        let (_, findings) = inherit_parameters(&registry, &spec);
        assert!(findings.iter().any(|f| f.code == "FORWARD_STEP_REFERENCE"));
    }

    #[test]
    fn test_generation_is_idempotent() {
        // Re-running the generator on an unchanged spec yields byte-identical
        // artifacts.
        let registry = registry();
        let spec = load_spec_str("casefile_create.yaml", CREATE_SPEC).unwrap();
        let generator = Generator::new().unwrap();

        let first = generator.generate(&registry, &spec).unwrap().unwrap();
        let second = generator.generate(&registry, &spec).unwrap().unwrap();

        assert_eq!(first.artifacts, second.artifacts);
        assert_eq!(
            first.artifacts.implementation.content,
            second.artifacts.implementation.content
        );
    }

    #[test]
    fn test_rendered_implementation_shape() {
        let registry = registry();
        let spec = load_spec_str("casefile_create.yaml", CREATE_SPEC).unwrap();
        let generator = Generator::new().unwrap();
        let tool = generator.generate(&registry, &spec).unwrap().unwrap();

        let implementation = &tool.artifacts.implementation.content;
        assert!(implementation.contains("pub const TOOL_NAME: &str = \"casefile_create\";"));
        assert!(implementation.contains("pub const OPERATION_REF: &str = \"create_casefile\";"));
        assert!(implementation.contains("pub struct CasefileCreateParams {"));
        assert!(implementation.contains("pub title: String,"));
        assert!(implementation.contains("pub description: Option<String>,"));
        // The optional default is applied inside into_payload.
        assert!(implementation.contains("None => json!(\"\")"));

        let test = &tool.artifacts.test.content;
        assert!(test.contains("CasefileCreateParams::parameter_names()"));
        assert!(test.contains("example_1_matches_parameter_surface"));

        assert_eq!(
            tool.artifacts.implementation.path,
            "casefile_create/casefile_create.rs"
        );
    }

    #[test]
    fn test_manifest_matches_effective_parameters() {
        let registry = registry();
        let spec = load_spec_str("casefile_create.yaml", CREATE_SPEC).unwrap();
        let generator = Generator::new().unwrap();
        let tool = generator.generate(&registry, &spec).unwrap().unwrap();

        assert_eq!(
            tool.manifest.parameters,
            tool.definition.effective_parameters
        );
        let parsed: ArtifactManifest =
            serde_json::from_str(&tool.artifacts.manifest.content).unwrap();
        assert_eq!(parsed, tool.manifest);
    }

    #[test]
    fn test_write_artifacts_round_trip() {
        let registry = registry();
        let spec = load_spec_str("casefile_create.yaml", CREATE_SPEC).unwrap();
        let generator = Generator::new().unwrap();
        let tool = generator.generate(&registry, &spec).unwrap().unwrap();

        let dir = tempfile::tempdir().unwrap();
        generator.write_artifacts(dir.path(), &tool).unwrap();

        let written =
            std::fs::read_to_string(dir.path().join("casefile_create/casefile_create.rs")).unwrap();
        assert_eq!(written, tool.artifacts.implementation.content);
        assert!(dir
            .path()
            .join("casefile_create/casefile_create.manifest.json")
            .exists());
    }
}
