//! Engine instance: the script-facing entry point.
//!
//! An [`EngineInstance`] lives on the engine thread. Scripts call
//! [`EngineInstance::request`]; the host event loop calls
//! [`EngineInstance::drain`] whenever it is safe to run script reactions, and
//! tears the instance down with [`EngineInstance::dispose`] (or by dropping it).

use crate::deferred::{deferred, Deferred};
use crate::dispatcher::Dispatcher;
use crate::error::{RuntimeError, RuntimeResult};
use crate::pump::CompletionPump;
use crate::registry::{JobRegistry, RegistryStats};
use rasphook_core::{DisposalSettings, RuntimeSettings, ScriptValue};
use rasphook_http::{Compressor, PayloadBuilder, ReqwestTransport, Transport};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub struct EngineInstance {
    registry: Arc<JobRegistry>,
    builder: PayloadBuilder,
    dispatcher: Dispatcher,
    pump: CompletionPump,
    disposal: DisposalSettings,
}

impl EngineInstance {
    pub fn new(settings: &RuntimeSettings, transport: Arc<dyn Transport>) -> Self {
        Self {
            registry: Arc::new(JobRegistry::new()),
            builder: PayloadBuilder::new(settings.request.clone()),
            dispatcher: Dispatcher::new(transport, settings.worker.clone()),
            pump: CompletionPump::new(),
            disposal: settings.disposal.clone(),
        }
    }

    /// Engine backed by the reqwest transport.
    pub fn with_reqwest(settings: &RuntimeSettings) -> Self {
        Self::new(settings, Arc::new(ReqwestTransport::new()))
    }

    /// Use `compressor` for request bodies sent with `deflate: true`.
    pub fn with_compressor(mut self, compressor: Compressor) -> Self {
        self.builder = self.builder.clone().with_compressor(compressor);
        self
    }

    /// Issue one asynchronous request.
    ///
    /// Configuration problems fail here and no job is created. Once the
    /// engine is disposing the returned value never settles.
    pub fn request(&mut self, config: ScriptValue) -> RuntimeResult<Deferred> {
        let descriptor = self.builder.build(&config)?;
        let (deferred, resolver) = deferred();

        match self.dispatcher.dispatch(&self.registry, descriptor) {
            Ok(job) => self.pump.track(job, config, resolver),
            Err(RuntimeError::Disposed) => {
                tracing::warn!("request issued after disposal began; it will never settle");
            }
            Err(err) => return Err(err),
        }

        Ok(deferred)
    }

    /// Deliver every finished job to script.
    pub fn drain(&mut self) -> usize {
        self.pump.drain(&self.registry)
    }

    /// Pump until every tracked request has settled or `timeout` elapses.
    ///
    /// Returns true when nothing is left pending.
    pub fn run_until_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.drain();
            if self.pump.pending() == 0 {
                return true;
            }

            let stats = self.registry.stats();
            if stats.outstanding == 0 && stats.queued == 0 {
                // the rest was dropped and cannot settle anymore
                return false;
            }

            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            self.registry.wait_for_activity(deadline - now);
        }
    }

    /// Wait for every outstanding job, then drop all undelivered results.
    ///
    /// Blocks the engine thread. Idempotent.
    pub fn dispose(&mut self) {
        if !self.registry.is_accepting() {
            return;
        }
        tracing::debug!(outstanding = self.registry.outstanding(), "disposing engine instance");
        let abandoned = self.registry.begin_disposal(self.disposal.warn_after());
        let unsettled = self.pump.pending();
        self.pump.clear();
        tracing::debug!(abandoned, unsettled, "engine instance disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.registry.is_disposed()
    }

    pub fn outstanding(&self) -> usize {
        self.registry.outstanding()
    }

    pub fn stats(&self) -> RegistryStats {
        self.registry.stats()
    }
}

impl Drop for EngineInstance {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for EngineInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineInstance")
            .field("stats", &self.registry.stats())
            .field("pump", &self.pump)
            .finish()
    }
}
