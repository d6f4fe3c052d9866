//! Network execution of request descriptors.
//!
//! [`Transport`] is the seam between the dispatcher's worker threads and the
//! network. It is blocking on purpose: each job owns a dedicated worker thread
//! and nothing else runs there.

use crate::descriptor::RequestDescriptor;
use crate::error::{TransportError, TransportErrorKind};
use crate::timeout::TimeoutManager;
use reqwest::{redirect, Client, Response, Url};
use std::error::Error as StdError;

/// A response captured in full.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Response headers in wire order
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Body as text, replacing invalid UTF-8 sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Terminal result of one network operation.
pub type HttpOutcome = Result<HttpResponse, TransportError>;

/// Executes one request to completion on the calling thread.
pub trait Transport: Send + Sync + 'static {
    fn execute(&self, descriptor: &RequestDescriptor) -> HttpOutcome;
}

/// reqwest-backed transport.
///
/// Every call builds its own single-threaded I/O runtime and client, so jobs
/// share no connections and no state.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport;

impl ReqwestTransport {
    pub fn new() -> Self {
        Self
    }

    /// Execute the request on the current async runtime.
    pub async fn execute_async(&self, descriptor: &RequestDescriptor) -> HttpOutcome {
        let url = build_url(descriptor)?;
        let timeouts = TimeoutManager::for_descriptor(descriptor);
        let client = build_client(descriptor, &timeouts)?;

        let mut request_builder = client.request(descriptor.method.to_reqwest(), url);
        for (key, value) in &descriptor.headers {
            request_builder = request_builder.header(key.as_str(), value.as_str());
        }
        if let Some(body) = &descriptor.body {
            request_builder = request_builder.body(body.bytes.clone());
        }

        timeouts
            .execute_with_timeout(async move {
                let response = request_builder.send().await.map_err(|e| classify(&e))?;
                process_response(response).await
            })
            .await
    }
}

impl Transport for ReqwestTransport {
    fn execute(&self, descriptor: &RequestDescriptor) -> HttpOutcome {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                TransportError::new(
                    TransportErrorKind::InternalError,
                    format!("Failed to start I/O runtime: {}", e),
                )
            })?;
        runtime.block_on(self.execute_async(descriptor))
    }
}

/// Parse the URL and append query parameters in order.
fn build_url(descriptor: &RequestDescriptor) -> Result<Url, TransportError> {
    let mut url = Url::parse(&descriptor.url).map_err(|e| {
        TransportError::new(
            TransportErrorKind::InvalidUrlFormat,
            format!("Invalid URL '{}': {}", descriptor.url, e),
        )
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(TransportError::new(
            TransportErrorKind::UnsupportedProtocol,
            format!("Protocol \"{}\" not supported", url.scheme()),
        ));
    }

    if !descriptor.params.is_empty() {
        let mut query_pairs = url.query_pairs_mut();
        for (key, value) in &descriptor.params {
            query_pairs.append_pair(key, value);
        }
    }

    Ok(url)
}

fn build_client(
    descriptor: &RequestDescriptor,
    timeouts: &TimeoutManager,
) -> Result<Client, TransportError> {
    let builder = Client::builder()
        .redirect(redirect::Policy::limited(descriptor.max_redirects as usize))
        .danger_accept_invalid_certs(!descriptor.verify_tls)
        .pool_max_idle_per_host(0);

    timeouts
        .apply_to_client_builder(builder)
        .build()
        .map_err(|e| {
            TransportError::new(
                TransportErrorKind::InternalError,
                format!("Failed to build HTTP client: {}", error_chain(&e)),
            )
        })
}

async fn process_response(response: Response) -> HttpOutcome {
    let status = response.status().as_u16();

    let headers = response
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();

    let body = response.bytes().await.map_err(|e| classify(&e))?.to_vec();

    Ok(HttpResponse {
        status,
        headers,
        body,
    })
}

/// Map a reqwest failure onto the transport taxonomy.
fn classify(err: &reqwest::Error) -> TransportError {
    let message = error_chain(err);
    let lowered = message.to_ascii_lowercase();

    let kind = if err.is_timeout() {
        TransportErrorKind::OperationTimedOut
    } else if err.is_redirect() {
        TransportErrorKind::TooManyRedirects
    } else if err.is_connect() {
        if lowered.contains("dns error") || lowered.contains("failed to lookup address") {
            TransportErrorKind::HostResolutionFailure
        } else if lowered.contains("proxy") {
            TransportErrorKind::ProxyResolutionFailure
        } else if lowered.contains("tls") || lowered.contains("certificate") {
            TransportErrorKind::TlsConnectError
        } else {
            TransportErrorKind::ConnectionFailure
        }
    } else if err.is_builder() {
        if lowered.contains("url scheme is not allowed") {
            TransportErrorKind::UnsupportedProtocol
        } else {
            TransportErrorKind::InternalError
        }
    } else if err.is_body() || err.is_decode() {
        TransportErrorKind::NetworkReceiveError
    } else if err.is_request() {
        if lowered.contains("connection closed before message completed") {
            TransportErrorKind::EmptyResponse
        } else {
            TransportErrorKind::NetworkSendFailure
        }
    } else {
        TransportErrorKind::Unknown
    };

    TransportError::new(kind, message)
}

/// The error and all its sources joined with ": ".
fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::PayloadBuilder;
    use httpmock::prelude::*;
    use rasphook_core::ScriptValue;
    use serde_json::json;
    use std::time::Duration;

    fn descriptor(config: serde_json::Value) -> RequestDescriptor {
        PayloadBuilder::default()
            .build(&ScriptValue::from(config))
            .unwrap()
    }

    #[test]
    fn test_post_round_trip() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/y").body("hello");
            then.status(200).header("x-served-by", "mock").body("ok");
        });

        let outcome = ReqwestTransport::new().execute(&descriptor(json!({
            "method": "post",
            "url": server.url("/y"),
            "data": "hello",
            "timeout": 1000
        })));

        mock.assert();
        let response = outcome.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.text(), "ok");
        assert!(response
            .headers
            .iter()
            .any(|(k, v)| k == "x-served-by" && v == "mock"));
    }

    #[test]
    fn test_params_and_headers_are_sent() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/search")
                .query_param("q", "rasp")
                .query_param("page", "2")
                .header("x-probe", "yes");
            then.status(204);
        });

        let outcome = ReqwestTransport::new().execute(&descriptor(json!({
            "url": server.url("/search"),
            "params": {"q": "rasp", "page": 2},
            "headers": {"x-probe": "yes"}
        })));

        mock.assert();
        assert_eq!(outcome.unwrap().status, 204);
    }

    #[test]
    fn test_non_success_status_is_a_response() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(DELETE).path("/gone");
            then.status(404).body("missing");
        });

        let response = ReqwestTransport::new()
            .execute(&descriptor(json!({"method": "DELETE", "url": server.url("/gone")})))
            .unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(response.text(), "missing");
    }

    #[test]
    fn test_deflated_body_carries_encoding_header() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(PUT)
                .path("/upload")
                .header("content-encoding", "deflate")
                .header("content-type", "application/json");
            then.status(201);
        });

        let outcome = ReqwestTransport::new().execute(&descriptor(json!({
            "method": "put",
            "url": server.url("/upload"),
            "data": {"a": 1},
            "deflate": true
        })));

        mock.assert();
        assert_eq!(outcome.unwrap().status, 201);
    }

    #[test]
    fn test_redirect_limit() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.path("/start");
            then.status(302).header("location", server.url("/final"));
        });
        server.mock(|when, then| {
            when.path("/final");
            then.status(200).body("done");
        });

        let followed = ReqwestTransport::new()
            .execute(&descriptor(json!({"url": server.url("/start")})))
            .unwrap();
        assert_eq!(followed.text(), "done");

        let err = ReqwestTransport::new()
            .execute(&descriptor(json!({"url": server.url("/start"), "maxRedirects": 0})))
            .unwrap_err();
        assert_eq!(err.kind, TransportErrorKind::TooManyRedirects);
        assert_eq!(err.code(), 17);
    }

    #[test]
    fn test_total_timeout() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.path("/slow");
            then.status(200).delay(Duration::from_millis(1_500));
        });

        let err = ReqwestTransport::new()
            .execute(&descriptor(json!({"url": server.url("/slow"), "timeout": 100})))
            .unwrap_err();
        assert_eq!(err.kind, TransportErrorKind::OperationTimedOut);
    }

    #[test]
    fn test_invalid_url() {
        let err = ReqwestTransport::new()
            .execute(&descriptor(json!({})))
            .unwrap_err();
        assert_eq!(err.kind, TransportErrorKind::InvalidUrlFormat);
        assert!(!err.message.is_empty());
    }

    #[test]
    fn test_unsupported_scheme() {
        let err = ReqwestTransport::new()
            .execute(&descriptor(json!({"url": "ftp://example.com/"})))
            .unwrap_err();
        assert_eq!(err.kind, TransportErrorKind::UnsupportedProtocol);
        assert_eq!(err.code(), 15);
        assert!(err.message.contains("ftp"));
    }

    #[test]
    fn test_unresolvable_host() {
        let err = ReqwestTransport::new()
            .execute(&descriptor(json!({"url": "http://nonexistent.invalid"})))
            .unwrap_err();
        assert_ne!(err.code(), 0);
        assert!(!err.message.is_empty());
    }
}
