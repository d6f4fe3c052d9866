//! Transport-ready request description.

use crate::method::HttpMethod;
use std::time::Duration;

/// How the body bytes were produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyEncoding {
    /// Serialized from a structured value
    Json,
    /// Passed through from a byte buffer
    Binary,
    /// Passed through from a string
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestBody {
    pub bytes: Vec<u8>,
    pub encoding: BodyEncoding,
    /// Bytes are zlib-deflated
    pub compressed: bool,
}

impl RequestBody {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Everything the worker needs to issue one request.
///
/// Plain data only: a descriptor moves to the worker thread and never refers
/// back into the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub method: HttpMethod,
    pub url: String,
    /// Query parameters in configuration order
    pub params: Vec<(String, String)>,
    pub body: Option<RequestBody>,
    /// Request headers; repeated names are all sent
    pub headers: Vec<(String, String)>,
    pub max_redirects: u32,
    /// Bound on the whole exchange; `None` waits indefinitely
    pub timeout: Option<Duration>,
    pub connect_timeout: Option<Duration>,
    /// Always false for script-issued requests
    pub verify_tls: bool,
}

impl RequestDescriptor {
    /// Values of every header named `name`, compared case-insensitively.
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
            .collect()
    }
}
