//! Build-time tooling for Casekit.
//!
//! Three pieces, run as a batch before the process that serves requests:
//!
//! - [`spec_loader`] — parse declarative tool specs from YAML sources and
//!   merge default policy overlays.
//! - [`generator`] — resolve operation references, inherit derived
//!   parameters, and render implementation + test artifacts via templates.
//! - [`validator`] — independently re-derive parameters and diff the three
//!   layers (registry, tool definitions, generated manifests), producing
//!   categorized findings. Zero `error`-severity findings is the CI gate.
//!
//! Generation is deterministic and idempotent: the same specs against the
//! same registry always render byte-identical artifacts.

pub mod error;
pub mod generator;
pub mod spec_loader;
pub mod validator;

pub use error::GenerationError;
pub use generator::{
    ArtifactManifest, GeneratedTool, GenerationFinding, GenerationOutcome, Generator,
    RenderedArtifacts, RenderedFile,
};
pub use spec_loader::{load_spec, load_spec_dir, load_spec_str, ToolSpec};
pub use validator::{scan_all, AlignmentFinding, AlignmentReport, Severity};
