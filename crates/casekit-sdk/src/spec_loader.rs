//! Declarative tool-spec loading.
//!
//! A tool spec is a YAML document with a classification block, an
//! implementation-strategy block, an operation reference (for atomic tools),
//! optional policy-overlay blocks, and example seed data. Parameters are
//! deliberately absent for operation-referencing tools — they are inherited,
//! never redeclared.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use casekit_shared::{Classification, PolicyOverlays, ToolImplementation};

use crate::error::GenerationError;

/// A loaded, structurally validated tool spec with its policy overlays
/// resolved (default template merged when the source supplied none).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    pub description: Option<String>,
    /// The mandatory 6-field classification.
    pub classification: Classification,
    /// Referenced canonical operation (atomic tools only).
    pub operation: Option<String>,
    /// Implementation strategy.
    pub implementation: ToolImplementation,
    /// Resolved policy overlays.
    pub policy: PolicyOverlays,
    /// Example seed data consumed by the test-scaffold template.
    pub examples: Vec<Value>,
    /// Where the spec came from, for error messages and reports.
    pub source_name: String,
}

/// Wire shape of a spec source, before validation and policy resolution.
#[derive(Debug, Deserialize)]
struct RawToolSpec {
    name: String,
    #[serde(default)]
    description: Option<String>,
    classification: Classification,
    #[serde(default)]
    operation: Option<String>,
    implementation: ToolImplementation,
    /// Named policy template to apply when no explicit blocks are given.
    #[serde(default)]
    policy_template: Option<String>,
    /// Explicit policy overlay blocks; wins over `policy_template`.
    #[serde(default)]
    policy: Option<PolicyOverlays>,
    #[serde(default)]
    examples: Vec<Value>,
}

/// Parse and validate a spec from a YAML string.
pub fn load_spec_str(source_name: &str, yaml: &str) -> Result<ToolSpec, GenerationError> {
    let raw: RawToolSpec =
        serde_yaml::from_str(yaml).map_err(|e| GenerationError::SpecParseFailure {
            source_name: source_name.to_string(),
            message: e.to_string(),
        })?;

    validate_raw(source_name, &raw)?;

    let policy = resolve_policy(source_name, &raw)?;

    debug!(tool = %raw.name, source = %source_name, "Loaded tool spec");

    Ok(ToolSpec {
        name: raw.name,
        description: raw.description,
        classification: raw.classification,
        operation: raw.operation,
        implementation: raw.implementation,
        policy,
        examples: raw.examples,
        source_name: source_name.to_string(),
    })
}

/// Load a single spec file.
pub fn load_spec(path: &Path) -> Result<ToolSpec, GenerationError> {
    let yaml = std::fs::read_to_string(path).map_err(|e| GenerationError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let source_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    load_spec_str(&source_name, &yaml)
}

/// Load every `*.yaml`/`*.yml` spec in a directory, in lexicographic order so
/// batch generation is deterministic.
pub fn load_spec_dir(dir: &Path) -> Result<Vec<ToolSpec>, GenerationError> {
    let entries = std::fs::read_dir(dir).map_err(|e| GenerationError::Io {
        path: dir.display().to_string(),
        source: e,
    })?;

    let mut paths: Vec<_> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("yaml") | Some("yml")
            )
        })
        .collect();
    paths.sort();

    paths.iter().map(|path| load_spec(path)).collect()
}

/// Structural checks: required sections present and coherent.
fn validate_raw(source_name: &str, raw: &RawToolSpec) -> Result<(), GenerationError> {
    let fail = |message: String| GenerationError::SpecParseFailure {
        source_name: source_name.to_string(),
        message,
    };

    if raw.name.trim().is_empty() {
        return Err(fail("spec is missing a tool name".into()));
    }

    let missing = raw.classification.missing_fields();
    if !missing.is_empty() {
        return Err(fail(format!(
            "classification incomplete: missing {missing:?}"
        )));
    }

    match &raw.implementation {
        ToolImplementation::Composite { steps } => {
            if steps.is_empty() {
                return Err(fail("composite implementation has no steps".into()));
            }
            let mut seen = std::collections::HashSet::new();
            for step in steps {
                if !seen.insert(step.step_id.as_str()) {
                    return Err(fail(format!("duplicate step_id '{}'", step.step_id)));
                }
            }
        }
        _ => {
            if raw.operation.is_none() {
                return Err(fail(format!(
                    "'{}' implementation requires an operation reference",
                    raw.implementation.kind()
                )));
            }
        }
    }

    Ok(())
}

/// Resolve the effective policy overlays: explicit blocks win, then a named
/// template, then the service default template.
fn resolve_policy(source_name: &str, raw: &RawToolSpec) -> Result<PolicyOverlays, GenerationError> {
    if let Some(policy) = &raw.policy {
        return Ok(policy.clone());
    }

    let template_name = raw
        .policy_template
        .as_deref()
        .unwrap_or_else(|| PolicyOverlays::default_template_name());

    PolicyOverlays::template(template_name).ok_or_else(|| GenerationError::SpecParseFailure {
        source_name: source_name.to_string(),
        message: format!("unknown policy template '{template_name}'"),
    })
}
