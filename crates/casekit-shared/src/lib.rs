//! Shared data model for Casekit.
//!
//! Everything the build-time tooling (`casekit-sdk`) and the runtime
//! dispatcher (`casekit-orchestration`) agree on lives here: field
//! descriptors, the 6-field classification taxonomy, operation and tool
//! definitions, request/response envelopes, policy overlays, the error
//! taxonomy, and the two process-wide registries.
//!
//! Registries are plain structs mutated only during bootstrap; wrapping them
//! in `Arc` afterward makes them read-only for the rest of the process
//! lifetime — there is no interior mutability and no hot reload.

pub mod classification;
pub mod envelope;
pub mod error;
pub mod operation;
pub mod policy;
pub mod registry;
pub mod schema;
pub mod tool;

pub use classification::{Classification, Complexity, IntegrationTier, Maturity};
pub use envelope::{
    ContextRequirements, HookBindings, HookEvent, HookOutcome, HookStage, PolicyHints,
    RequestEnvelope, ResponseEnvelope, ResponseError, ResponseMetadata, ResponseStatus,
};
pub use error::{
    DispatchError, ExecutionError, HookError, PolicyViolation, RegistrationError,
};
pub use operation::{BusinessRules, OperationDefinition, ParameterDefinition};
pub use policy::{AuditPolicy, CasefilePolicy, PolicyOverlays, ResolvedPolicy, SessionPolicy};
pub use registry::{derive_parameters, OperationRegistry, ToolRegistry};
pub use schema::{Constraints, DescribeFields, FieldDescriptor, FieldSchema, TypeDescriptor};
pub use tool::{
    ArtifactHandles, CompositeStep, InputBinding, MappingSource, OnError, OutputBinding,
    ToolDefinition, ToolImplementation,
};
