//! Per-engine job registry and disposal protocol.
//!
//! The registry is the only state shared between worker threads and the
//! engine thread. One mutex guards the lifecycle phase, the outstanding job
//! count and the completion queue; the condition variable is signalled
//! whenever an item is enqueued or a worker finishes. The lock is never held
//! across network I/O or while touching script values.

use crate::error::{RuntimeError, RuntimeResult};
use crate::job::Completion;
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

pub type JobId = u64;

/// Lifecycle phase of the owning engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Active,
    Disposing,
    Disposed,
}

/// Where a job was dropped without reaching script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropPoint {
    /// Registration refused after disposal began
    Registration,
    /// Worker finished while the engine was disposing
    Completion,
    /// Queued outcome abandoned by disposal
    Abandoned,
    /// Outcome with nothing left to settle
    Delivery,
}

impl fmt::Display for DropPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DropPoint::Registration => "registration",
            DropPoint::Completion => "completion",
            DropPoint::Abandoned => "abandoned",
            DropPoint::Delivery => "delivery",
        };
        f.write_str(name)
    }
}

/// Whether a finished worker's outcome made it onto the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerDisposition {
    Enqueued,
    Discarded,
}

/// Point-in-time view of a registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub phase: Phase,
    pub outstanding: usize,
    pub queued: usize,
    pub registered: u64,
    pub completed: u64,
    pub dropped: u64,
}

#[derive(Debug)]
struct State {
    phase: Phase,
    outstanding: usize,
    queue: VecDeque<Completion>,
    next_id: JobId,
    completed: u64,
    dropped: u64,
}

#[derive(Debug)]
pub struct JobRegistry {
    state: Mutex<State>,
    signal: Condvar,
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl JobRegistry {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                phase: Phase::Active,
                outstanding: 0,
                queue: VecDeque::new(),
                next_id: 1,
                completed: 0,
                dropped: 0,
            }),
            signal: Condvar::new(),
        }
    }

    // Critical sections never panic, so a poisoned lock still holds
    // consistent state.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count a new job. Refused once disposal has begun.
    pub fn register_job(&self) -> RuntimeResult<JobId> {
        let mut state = self.lock();
        if state.phase != Phase::Active {
            state.dropped += 1;
            tracing::warn!(
                phase = ?state.phase,
                checkpoint = %DropPoint::Registration,
                "job dropped: engine instance is disposing"
            );
            return Err(RuntimeError::Disposed);
        }

        let id = state.next_id;
        state.next_id += 1;
        state.outstanding += 1;
        tracing::debug!(job = id, outstanding = state.outstanding, "job registered");
        Ok(id)
    }

    /// Called exactly once per registered job by its worker.
    ///
    /// The count is always decremented; the outcome is queued only while the
    /// engine is active.
    pub fn worker_finished(&self, completion: Completion) -> WorkerDisposition {
        let mut state = self.lock();
        match state.outstanding.checked_sub(1) {
            Some(remaining) => state.outstanding = remaining,
            None => {
                tracing::error!(job = completion.job, "worker finished with no outstanding jobs");
            }
        }

        let disposition = if state.phase == Phase::Active {
            state.completed += 1;
            tracing::debug!(
                job = completion.job,
                outstanding = state.outstanding,
                "job completed"
            );
            state.queue.push_back(completion);
            WorkerDisposition::Enqueued
        } else {
            state.dropped += 1;
            tracing::warn!(
                job = completion.job,
                checkpoint = %DropPoint::Completion,
                "job dropped: engine instance is disposing"
            );
            WorkerDisposition::Discarded
        };

        self.signal.notify_all();
        disposition
    }

    /// Stop accepting jobs and block until every worker has reported.
    ///
    /// Logs a warning every `warn_after` while still waiting. Queued outcomes
    /// are abandoned once the registry is disposed; their number is returned.
    /// Calling this on a registry that is not active returns 0 immediately.
    pub fn begin_disposal(&self, warn_after: Duration) -> usize {
        let mut state = self.lock();
        if state.phase != Phase::Active {
            return 0;
        }
        state.phase = Phase::Disposing;
        tracing::debug!(outstanding = state.outstanding, "disposal started");

        let started = Instant::now();
        while state.outstanding > 0 {
            let (guard, wait) = self
                .signal
                .wait_timeout(state, warn_after)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
            if wait.timed_out() && state.outstanding > 0 {
                tracing::warn!(
                    outstanding = state.outstanding,
                    waited_ms = started.elapsed().as_millis() as u64,
                    "disposal still waiting on outstanding jobs"
                );
            }
        }

        state.phase = Phase::Disposed;
        let abandoned = state.queue.len();
        for completion in state.queue.drain(..) {
            tracing::warn!(
                job = completion.job,
                checkpoint = %DropPoint::Abandoned,
                "job dropped: engine instance disposed"
            );
        }
        state.dropped += abandoned as u64;
        self.signal.notify_all();

        tracing::debug!(
            abandoned,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "disposal complete"
        );
        abandoned
    }

    /// Next finished job, FIFO. Nothing is handed out once disposal began.
    pub fn pop_completion(&self) -> Option<Completion> {
        let mut state = self.lock();
        if state.phase != Phase::Active {
            return None;
        }
        state.queue.pop_front()
    }

    /// Count a job dropped outside the registry's own checkpoints.
    pub fn record_drop(&self, job: JobId, checkpoint: DropPoint) {
        let mut state = self.lock();
        state.dropped += 1;
        tracing::warn!(job, checkpoint = %checkpoint, "job dropped");
    }

    /// Sleep until an item is queued or no job is outstanding.
    ///
    /// Returns whether that condition holds; false means `timeout` elapsed.
    pub fn wait_for_activity(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        loop {
            if !state.queue.is_empty() || state.outstanding == 0 {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self
                .signal
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
        }
    }

    pub fn is_accepting(&self) -> bool {
        self.lock().phase == Phase::Active
    }

    pub fn is_disposed(&self) -> bool {
        self.lock().phase == Phase::Disposed
    }

    pub fn outstanding(&self) -> usize {
        self.lock().outstanding
    }

    pub fn stats(&self) -> RegistryStats {
        let state = self.lock();
        RegistryStats {
            phase: state.phase,
            outstanding: state.outstanding,
            queued: state.queue.len(),
            registered: state.next_id - 1,
            completed: state.completed,
            dropped: state.dropped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rasphook_http::HttpResponse;
    use std::sync::Arc;
    use std::thread;

    fn ok(job: JobId) -> Completion {
        Completion::new(
            job,
            Ok(HttpResponse {
                status: 200,
                headers: Vec::new(),
                body: Vec::new(),
            }),
        )
    }

    #[test]
    fn test_register_and_finish() {
        let registry = JobRegistry::new();
        let first = registry.register_job().unwrap();
        let second = registry.register_job().unwrap();
        assert_ne!(first, second);
        assert_eq!(registry.outstanding(), 2);

        assert_eq!(registry.worker_finished(ok(second)), WorkerDisposition::Enqueued);
        assert_eq!(registry.worker_finished(ok(first)), WorkerDisposition::Enqueued);
        assert_eq!(registry.outstanding(), 0);

        // first finished, first queued
        assert_eq!(registry.pop_completion().unwrap().job, second);
        assert_eq!(registry.pop_completion().unwrap().job, first);
        assert!(registry.pop_completion().is_none());

        let stats = registry.stats();
        assert_eq!(stats.registered, 2);
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.dropped, 0);
    }

    #[test]
    fn test_registration_refused_after_disposal() {
        let registry = JobRegistry::new();
        assert_eq!(registry.begin_disposal(Duration::from_millis(10)), 0);
        assert!(registry.is_disposed());
        assert!(matches!(registry.register_job(), Err(RuntimeError::Disposed)));
        assert_eq!(registry.stats().dropped, 1);
        assert_eq!(registry.stats().registered, 0);
    }

    #[test]
    fn test_disposal_abandons_queue() {
        let registry = JobRegistry::new();
        let id = registry.register_job().unwrap();
        registry.worker_finished(ok(id));

        assert_eq!(registry.begin_disposal(Duration::from_millis(10)), 1);
        assert!(registry.pop_completion().is_none());
        assert_eq!(registry.stats().queued, 0);
        assert_eq!(registry.stats().dropped, 1);

        // second call is a no-op
        assert_eq!(registry.begin_disposal(Duration::from_millis(10)), 0);
    }

    #[test]
    fn test_disposal_waits_for_workers() {
        let registry = Arc::new(JobRegistry::new());
        let ids: Vec<JobId> = (0..3).map(|_| registry.register_job().unwrap()).collect();

        let workers: Vec<_> = ids
            .into_iter()
            .enumerate()
            .map(|(i, id)| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    thread::sleep(Duration::from_millis(50 + 20 * i as u64));
                    registry.worker_finished(ok(id))
                })
            })
            .collect();

        let started = Instant::now();
        assert_eq!(registry.begin_disposal(Duration::from_millis(20)), 0);
        assert!(started.elapsed() >= Duration::from_millis(50));
        assert_eq!(registry.outstanding(), 0);

        for worker in workers {
            assert_eq!(worker.join().unwrap(), WorkerDisposition::Discarded);
        }
        let stats = registry.stats();
        assert_eq!(stats.phase, Phase::Disposed);
        assert_eq!(stats.completed, 0);
        assert_eq!(stats.dropped, 3);
    }

    #[test]
    fn test_count_never_underflows() {
        let registry = JobRegistry::new();
        registry.worker_finished(ok(42));
        assert_eq!(registry.outstanding(), 0);
    }

    #[test]
    fn test_wait_for_activity() {
        let registry = Arc::new(JobRegistry::new());
        // nothing outstanding
        assert!(registry.wait_for_activity(Duration::from_millis(1)));

        let id = registry.register_job().unwrap();
        assert!(!registry.wait_for_activity(Duration::from_millis(20)));

        let worker = {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                registry.worker_finished(ok(id));
            })
        };
        assert!(registry.wait_for_activity(Duration::from_secs(5)));
        worker.join().unwrap();
        assert_eq!(registry.stats().queued, 1);
    }

    #[test]
    fn test_concurrent_workers_return_count_to_zero() {
        let registry = Arc::new(JobRegistry::new());
        let workers: Vec<_> = (0..64u64)
            .map(|i| {
                let id = registry.register_job().unwrap();
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    thread::sleep(Duration::from_millis((i * 7919) % 23));
                    registry.worker_finished(ok(id));
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(registry.outstanding(), 0);
        let mut seen = 0;
        while registry.pop_completion().is_some() {
            seen += 1;
        }
        assert_eq!(seen, 64);
    }
}
