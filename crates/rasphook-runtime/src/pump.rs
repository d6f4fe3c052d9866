//! Completion pump: delivers finished jobs to script on the engine thread.

use crate::deferred::Resolver;
use crate::job::Completion;
use crate::registry::{DropPoint, JobId, JobRegistry};
use indexmap::IndexMap;
use rasphook_core::ScriptValue;
use rasphook_http::{HttpResponse, TransportError};

struct PendingRequest {
    config: ScriptValue,
    resolver: Resolver,
}

/// Resolvers of dispatched jobs, keyed by job id.
#[derive(Default)]
pub struct CompletionPump {
    pending: IndexMap<JobId, PendingRequest>,
}

impl CompletionPump {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember how to settle `job` once its outcome arrives.
    pub fn track(&mut self, job: JobId, config: ScriptValue, resolver: Resolver) {
        self.pending.insert(job, PendingRequest { config, resolver });
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Forget every tracked job; their deferred values never settle.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Settle every queued outcome in FIFO order. Returns how many were
    /// delivered.
    pub fn drain(&mut self, registry: &JobRegistry) -> usize {
        let mut delivered = 0;
        while let Some(completion) = registry.pop_completion() {
            if self.deliver(registry, completion) {
                delivered += 1;
            }
        }
        delivered
    }

    fn deliver(&mut self, registry: &JobRegistry, completion: Completion) -> bool {
        let Some(PendingRequest { config, resolver }) = self.pending.shift_remove(&completion.job)
        else {
            registry.record_drop(completion.job, DropPoint::Delivery);
            return false;
        };

        let settled = match completion.outcome {
            Ok(response) => {
                tracing::debug!(job = completion.job, status = response.status, "resolving");
                resolver.resolve(success_value(config, &response))
            }
            Err(error) => {
                tracing::debug!(job = completion.job, code = error.code(), "rejecting");
                resolver.reject(failure_value(config, &error))
            }
        };

        match settled {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(job = completion.job, error = %err, "failed to settle deferred value");
                false
            }
        }
    }
}

impl std::fmt::Debug for CompletionPump {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionPump")
            .field("pending", &self.pending.len())
            .finish()
    }
}

/// `{config, status, data, headers}`
pub fn success_value(config: ScriptValue, response: &HttpResponse) -> ScriptValue {
    let mut headers = IndexMap::new();
    for (name, value) in &response.headers {
        headers.insert(name.clone(), ScriptValue::from(value.as_str()));
    }

    ScriptValue::object([
        ("config", config),
        ("status", ScriptValue::Number(f64::from(response.status))),
        ("data", ScriptValue::String(response.text())),
        ("headers", ScriptValue::Object(headers)),
    ])
}

/// `{config, error: {code, message}}`
pub fn failure_value(config: ScriptValue, error: &TransportError) -> ScriptValue {
    ScriptValue::object([
        ("config", config),
        (
            "error",
            ScriptValue::object([
                ("code", ScriptValue::from(error.code())),
                ("message", ScriptValue::from(error.message.as_str())),
            ]),
        ),
    ])
}
