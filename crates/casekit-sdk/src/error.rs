//! Build-time error taxonomy for the spec loader and the generator.
//!
//! These halt the generation pipeline; they are never raised at request time.

use thiserror::Error;

/// A fatal build-time failure. Per-spec problems that should not stop the
/// batch (unresolved references, ambiguous composite parameters) are
/// collected as [`GenerationFinding`](crate::generator::GenerationFinding)s
/// instead.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// A spec source could not be parsed or is structurally invalid.
    #[error("failed to parse spec '{source_name}': {message}")]
    SpecParseFailure {
        source_name: String,
        message: String,
    },

    /// A template failed to compile or render.
    #[error("template render failed for '{template}': {source}")]
    TemplateRenderFailure {
        template: String,
        #[source]
        source: tera::Error,
    },

    /// Reading a spec source or writing an artifact failed.
    #[error("i/o error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
