//! Payload builder: script request configuration to [`RequestDescriptor`].
//!
//! Parsing is permissive. A field of the wrong type keeps its default; only a
//! missing configuration, an unserializable `data` value or a compression
//! failure abort the request.

use crate::body::{compress, BodyBuilder, Compressor};
use crate::descriptor::RequestDescriptor;
use crate::error::{BuildError, BuildResult};
use crate::method::HttpMethod;
use rasphook_core::{RequestDefaults, ScriptValue};
use std::time::Duration;

/// Builds request descriptors against a set of defaults.
#[derive(Clone)]
pub struct PayloadBuilder {
    defaults: RequestDefaults,
    compressor: Compressor,
}

impl Default for PayloadBuilder {
    fn default() -> Self {
        Self::new(RequestDefaults::default())
    }
}

impl PayloadBuilder {
    pub fn new(defaults: RequestDefaults) -> Self {
        Self {
            defaults,
            compressor: compress,
        }
    }

    /// Replace the zlib compressor used for `deflate: true`.
    pub fn with_compressor(mut self, compressor: Compressor) -> Self {
        self.compressor = compressor;
        self
    }

    pub fn build(&self, config: &ScriptValue) -> BuildResult<RequestDescriptor> {
        if config.is_nullish() {
            return Err(BuildError::InvalidConfig(format!(
                "expected an object, got {}",
                config.to_display_string()
            )));
        }
        let undefined = ScriptValue::Undefined;
        let field = |name: &str| config.get(name).unwrap_or(&undefined);

        let method = field("method")
            .as_str()
            .map(HttpMethod::from_config)
            .unwrap_or_default();
        let url = field("url").as_str().unwrap_or_default().to_string();
        let params = string_pairs(field("params"));

        let mut headers = Vec::new();
        let mut body = None;
        if let Some(built) = BodyBuilder::build(field("data"))? {
            if let Some(content_type) = built.content_type {
                headers.push(("content-type".to_string(), content_type.to_string()));
            }
            if !built.body.is_empty() {
                let mut request_body = built.body;
                if field("deflate").is_true() {
                    request_body = BodyBuilder::deflate(request_body, self.compressor)?;
                    headers.push(("content-encoding".to_string(), "deflate".to_string()));
                }
                body = Some(request_body);
            }
        }

        let max_redirects = non_negative(field("maxRedirects"))
            .map(|n| n as u32)
            .unwrap_or(self.defaults.max_redirects);
        let timeout = millis(field("timeout"), self.defaults.timeout_ms);
        let connect_timeout = millis(field("connectTimeout"), self.defaults.connect_timeout_ms);

        headers.extend(string_pairs(field("headers")));

        tracing::debug!(
            method = %method,
            url = %url,
            params = params.len(),
            headers = headers.len(),
            body_len = body.as_ref().map(|b| b.len()).unwrap_or(0),
            "request descriptor built"
        );

        Ok(RequestDescriptor {
            method,
            url,
            params,
            body,
            headers,
            max_redirects,
            timeout,
            connect_timeout,
            verify_tls: false,
        })
    }
}

impl std::fmt::Debug for PayloadBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayloadBuilder")
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

/// Own properties of an object as (name, string value) pairs.
fn string_pairs(value: &ScriptValue) -> Vec<(String, String)> {
    match value {
        ScriptValue::Object(_) | ScriptValue::Array(_) => value
            .entries()
            .into_iter()
            .map(|(key, val)| (key, val.to_display_string()))
            .collect(),
        _ => Vec::new(),
    }
}

fn non_negative(value: &ScriptValue) -> Option<i32> {
    value.as_int32().filter(|n| *n >= 0)
}

/// Millisecond field with its fallback; 0 disables the limit.
fn millis(value: &ScriptValue, default_ms: u64) -> Option<Duration> {
    let ms = non_negative(value).map(|n| n as u64).unwrap_or(default_ms);
    (ms > 0).then(|| Duration::from_millis(ms))
}
