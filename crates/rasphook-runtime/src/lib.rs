//! Asynchronous request jobs for single-threaded script engines.
//!
//! Requests run on detached worker threads; their outcomes travel back
//! through a per-engine [`JobRegistry`] and are settled on the engine thread
//! by the completion pump.

pub mod deferred;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod job;
pub mod pump;
pub mod registry;

pub use deferred::{deferred, Deferred, Resolver, Settlement};
pub use dispatcher::Dispatcher;
pub use engine::EngineInstance;
pub use error::{RuntimeError, RuntimeResult, SettleError};
pub use job::{AsyncJob, Completion};
pub use pump::{failure_value, success_value, CompletionPump};
pub use registry::{
    DropPoint, JobId, JobRegistry, Phase, RegistryStats, WorkerDisposition,
};
