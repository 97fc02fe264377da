//! Derived tool definitions: the caller-facing wrappers around operations.

use serde::{Deserialize, Serialize};

use crate::classification::Classification;
use crate::operation::ParameterDefinition;
use crate::policy::PolicyOverlays;

/// Where a composite step's input value comes from: the original tool input,
/// or a field produced by a strictly earlier step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingSource {
    FromInput { field: String },
    FromStep { step_id: String, field: String },
}

/// One input binding on a composite step: target parameter ← source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputBinding {
    /// Parameter name on the referenced operation.
    pub parameter: String,
    /// Value source.
    pub source: MappingSource,
}

/// One output binding on a composite step: result field → exposed name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputBinding {
    /// Field name on the step's result.
    pub field: String,
    /// Name under which the field appears in the composite result.
    pub expose_as: String,
}

/// Error handling for a composite step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnError {
    /// Abort the composite; earlier side effects stand.
    Abort,
    /// Record the failure and continue with the next step.
    Continue,
    /// Retry up to `max_attempts`, optionally running a rollback step when
    /// retries are exhausted.
    Retry {
        max_attempts: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        rollback_step: Option<String>,
    },
}

impl Default for OnError {
    fn default() -> Self {
        OnError::Abort
    }
}

/// One step of a composite tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeStep {
    /// Step id, unique within the tool.
    pub step_id: String,
    /// Referenced canonical operation.
    pub operation_ref: String,
    /// Input bindings. May reference only the original input or strictly
    /// earlier steps — checked by the generator.
    #[serde(default)]
    pub input_mapping: Vec<InputBinding>,
    /// Output bindings into the composite result.
    #[serde(default)]
    pub output_mapping: Vec<OutputBinding>,
    /// Error handling.
    #[serde(default)]
    pub on_error: OnError,
}

/// Implementation strategy. A closed variant dispatched by pattern match —
/// never an opaque stored callable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ToolImplementation {
    /// Direct pass-through to the referenced operation's handler.
    Simple,
    /// Pass-through that calls an external endpoint collaborator.
    ApiCall { endpoint: String, method: String },
    /// Pass-through with a named payload transform applied first.
    DataTransform { transform: String },
    /// Ordered multi-operation pipeline.
    Composite { steps: Vec<CompositeStep> },
}

impl ToolImplementation {
    /// Short selector string as it appears in specs.
    pub fn kind(&self) -> &'static str {
        match self {
            ToolImplementation::Simple => "simple",
            ToolImplementation::ApiCall { .. } => "api_call",
            ToolImplementation::DataTransform { .. } => "data_transform",
            ToolImplementation::Composite { .. } => "composite",
        }
    }

    /// Whether this strategy inherits parameters verbatim from a single
    /// referenced operation.
    pub fn is_atomic(&self) -> bool {
        !matches!(self, ToolImplementation::Composite { .. })
    }
}

/// Handles to the artifacts the generator produced for a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactHandles {
    /// Relative path of the implementation artifact.
    pub implementation: String,
    /// Relative path of the test scaffold artifact.
    pub test: String,
    /// Relative path of the parameter manifest the validator diffs against.
    pub manifest: String,
}

/// A derived, caller-facing tool. Created by the generator at build time,
/// loaded into the tool registry at process start. Regenerable: the same spec
/// always produces the same definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The mandatory 6-field classification.
    pub classification: Classification,
    /// Referenced operation; `None` for composite tools.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_ref: Option<String>,
    /// Inherited parameters. Equal to the referenced operation's derived list
    /// for atomic tools; a provenance-tagged union for composites.
    pub effective_parameters: Vec<ParameterDefinition>,
    /// Implementation strategy.
    pub implementation: ToolImplementation,
    /// Session/casefile/audit overlays.
    #[serde(default)]
    pub policy_overlays: PolicyOverlays,
    /// Artifact handles, present once the generator has rendered the tool.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_artifacts: Option<ArtifactHandles>,
}
