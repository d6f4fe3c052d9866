use crate::registry::{JobId, JobRegistry};
use rasphook_http::{HttpOutcome, RequestDescriptor, Transport, TransportError, TransportErrorKind};
use std::sync::Weak;

/// Finished job waiting on the completion queue.
#[derive(Debug)]
pub struct Completion {
    pub job: JobId,
    pub outcome: HttpOutcome,
}

impl Completion {
    pub fn new(job: JobId, outcome: HttpOutcome) -> Self {
        Self { job, outcome }
    }
}

/// One in-flight request, owned by its worker thread.
///
/// The registry is only reachable through a weak reference and is upgraded at
/// the two checkpoints, never across the network call.
#[derive(Debug)]
pub struct AsyncJob {
    id: JobId,
    descriptor: RequestDescriptor,
    registry: Weak<JobRegistry>,
}

impl AsyncJob {
    pub fn new(id: JobId, descriptor: RequestDescriptor, registry: Weak<JobRegistry>) -> Self {
        Self {
            id,
            descriptor,
            registry,
        }
    }

    /// Run the job to its single terminal disposition.
    pub fn run(self, transport: &dyn Transport) {
        let accepting = self
            .registry
            .upgrade()
            .map(|registry| registry.is_accepting())
            .unwrap_or(false);

        let outcome = if accepting {
            tracing::debug!(job = self.id, "executing request");
            transport.execute(&self.descriptor)
        } else {
            tracing::debug!(job = self.id, "engine disposing, skipping network call");
            Err(TransportError::new(
                TransportErrorKind::InternalError,
                "engine instance disposed before dispatch",
            ))
        };

        self.finish(outcome);
    }

    fn finish(self, outcome: HttpOutcome) {
        match self.registry.upgrade() {
            Some(registry) => {
                registry.worker_finished(Completion::new(self.id, outcome));
            }
            None => {
                tracing::warn!(job = self.id, "registry gone, outcome dropped");
            }
        }
    }
}
