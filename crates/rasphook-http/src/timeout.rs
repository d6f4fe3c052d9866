//! Timeout handling for one request

use crate::descriptor::RequestDescriptor;
use crate::error::{TransportError, TransportErrorKind};
use reqwest::ClientBuilder;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

/// Applies a descriptor's connect and total timeouts.
///
/// The connect timeout lives on the client; the total timeout wraps the whole
/// exchange, body read included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutManager {
    connect: Option<Duration>,
    total: Option<Duration>,
}

impl TimeoutManager {
    pub fn new(connect: Option<Duration>, total: Option<Duration>) -> Self {
        Self { connect, total }
    }

    pub fn for_descriptor(descriptor: &RequestDescriptor) -> Self {
        Self::new(descriptor.connect_timeout, descriptor.timeout)
    }

    /// Apply connection-level timeouts to a reqwest ClientBuilder
    pub fn apply_to_client_builder(&self, builder: ClientBuilder) -> ClientBuilder {
        match self.connect {
            Some(connect) => builder.connect_timeout(connect),
            None => builder,
        }
    }

    /// Run `operation` under the total timeout.
    pub async fn execute_with_timeout<F, T>(&self, operation: F) -> Result<T, TransportError>
    where
        F: Future<Output = Result<T, TransportError>>,
    {
        let Some(limit) = self.total else {
            return operation.await;
        };

        match timeout(limit, operation).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::new(
                TransportErrorKind::OperationTimedOut,
                format!("Operation timed out after {} milliseconds", limit.as_millis()),
            )),
        }
    }

    pub fn connect(&self) -> Option<Duration> {
        self.connect
    }

    pub fn total(&self) -> Option<Duration> {
        self.total
    }
}
