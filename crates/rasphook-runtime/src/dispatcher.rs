//! Worker-per-job dispatch.
//!
//! Every request gets its own detached OS thread. There is no pool and no
//! queue in front of the network: a job is registered, its worker spawned,
//! and the outcome comes back through the registry.

use crate::error::RuntimeResult;
use crate::job::{AsyncJob, Completion};
use crate::registry::{JobId, JobRegistry};
use rasphook_core::WorkerSettings;
use rasphook_http::{RequestDescriptor, Transport, TransportError, TransportErrorKind};
use std::sync::Arc;
use std::thread;

#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    settings: WorkerSettings,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>, settings: WorkerSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    /// Register a job and spawn its worker.
    ///
    /// Fails only when the registry refuses the job; no worker exists then.
    pub fn dispatch(
        &self,
        registry: &Arc<JobRegistry>,
        descriptor: RequestDescriptor,
    ) -> RuntimeResult<JobId> {
        let id = registry.register_job()?;

        let span = tracing::debug_span!(
            "job",
            id,
            method = %descriptor.method,
            url = %descriptor.url
        );
        let job = AsyncJob::new(id, descriptor, Arc::downgrade(registry));
        let transport = Arc::clone(&self.transport);

        let mut builder =
            thread::Builder::new().name(format!("{}-{}", self.settings.thread_name_prefix, id));
        if let Some(stack_size) = self.settings.stack_size {
            builder = builder.stack_size(stack_size);
        }

        // The JoinHandle is dropped: workers are never joined.
        match builder.spawn(move || {
            let _entered = span.enter();
            job.run(transport.as_ref());
        }) {
            Ok(_) => {
                tracing::debug!(job = id, "worker spawned");
            }
            Err(err) => {
                tracing::error!(job = id, error = %err, "failed to spawn worker thread");
                registry.worker_finished(Completion::new(
                    id,
                    Err(TransportError::new(
                        TransportErrorKind::InternalError,
                        format!("Failed to spawn worker thread: {}", err),
                    )),
                ));
            }
        }

        Ok(id)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
