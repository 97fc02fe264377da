//! Runtime request orchestration for Casekit.
//!
//! The dispatcher executes a generic [`RequestEnvelope`](casekit_shared::RequestEnvelope)
//! through context preparation (session/casefile/policy), ordered pre/post
//! hooks, and the resolved handler, then assembles the response with the hook
//! event log attached. Requests run concurrently; the only shared state is
//! the immutable registries and the store collaborator.
//!
//! Start from [`bootstrap::bootstrap`], which registers the canonical
//! inventory in fixed order and returns sealed registries plus a ready
//! [`Dispatcher`].

pub mod bootstrap;
pub mod context;
pub mod dispatcher;
pub mod handlers;
pub mod hooks;
pub mod store;

pub use bootstrap::{bootstrap, bootstrap_with, canonical_operations, Runtime};
pub use context::{ExecutionContext, RequestState};
pub use dispatcher::{Dispatcher, DispatcherConfig, DispatcherStats};
pub use handlers::OperationHandler;
pub use hooks::{Hook, HookEngine, HookMode, SessionLifecycleHook};
pub use store::{
    CasefileRecord, CasefileStore, InMemoryStore, SessionRecord, SessionStore, StoreError,
};
