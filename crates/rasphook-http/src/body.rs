//! Request body construction from script data

use crate::descriptor::{BodyEncoding, RequestBody};
use crate::error::{BuildResult, CompressionError};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use rasphook_core::ScriptValue;
use std::io::{self, Write};

/// Deflate implementation used for `deflate: true` bodies.
pub type Compressor = fn(&[u8]) -> Result<Vec<u8>, CompressionError>;

/// Body bytes plus the content type the data kind implies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltBody {
    pub body: RequestBody,
    pub content_type: Option<&'static str>,
}

/// Body builder for script-supplied `data`
pub struct BodyBuilder;

impl BodyBuilder {
    /// Build a body from the `data` field. Kinds without a body mapping
    /// (numbers, booleans, null, undefined) yield `None`.
    pub fn build(data: &ScriptValue) -> BuildResult<Option<BuiltBody>> {
        let built = match data {
            ScriptValue::Buffer(bytes) => Self::build_binary(bytes),
            ScriptValue::Object(_) | ScriptValue::Array(_) => Self::build_json(data)?,
            ScriptValue::String(text) => Self::build_text(text),
            _ => return Ok(None),
        };
        Ok(Some(built))
    }

    fn build_json(data: &ScriptValue) -> BuildResult<BuiltBody> {
        let json = data.to_json_string()?;
        Ok(BuiltBody {
            body: RequestBody {
                bytes: json.into_bytes(),
                encoding: BodyEncoding::Json,
                compressed: false,
            },
            content_type: Some("application/json"),
        })
    }

    fn build_binary(bytes: &[u8]) -> BuiltBody {
        BuiltBody {
            body: RequestBody {
                bytes: bytes.to_vec(),
                encoding: BodyEncoding::Binary,
                compressed: false,
            },
            content_type: Some("application/octet-stream"),
        }
    }

    fn build_text(text: &str) -> BuiltBody {
        BuiltBody {
            body: RequestBody {
                bytes: text.as_bytes().to_vec(),
                encoding: BodyEncoding::Text,
                compressed: false,
            },
            content_type: None,
        }
    }

    /// Replace the body bytes with their compressed form.
    pub fn deflate(
        body: RequestBody,
        compressor: Compressor,
    ) -> Result<RequestBody, CompressionError> {
        let bytes = compressor(&body.bytes)?;
        Ok(RequestBody {
            bytes,
            compressed: true,
            ..body
        })
    }
}

/// zlib-wrapped deflate at the default level.
pub fn compress(input: &[u8]) -> Result<Vec<u8>, CompressionError> {
    let buffer = Vec::with_capacity(input.len() / 2 + 16);
    let mut encoder = ZlibEncoder::new(buffer, Compression::default());
    encoder.write_all(input).map_err(classify)?;
    encoder.finish().map_err(classify)
}

fn classify(err: io::Error) -> CompressionError {
    match err.kind() {
        io::ErrorKind::OutOfMemory => CompressionError::OutOfMemory,
        io::ErrorKind::WriteZero => CompressionError::BufferOverrun,
        _ => CompressionError::Unknown(err),
    }
}
