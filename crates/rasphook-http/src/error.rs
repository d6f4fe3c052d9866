use std::fmt;

/// Failures turning a script configuration into a request.
///
/// These surface synchronously to the caller; no job exists yet.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Invalid request configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Compression(#[from] CompressionError),
}

pub type BuildResult<T> = Result<T, BuildError>;

#[derive(Debug, thiserror::Error)]
pub enum CompressionError {
    #[error("zlib error: there was not enough memory")]
    OutOfMemory,

    #[error("zlib error: there was not enough room in the output buffer")]
    BufferOverrun,

    #[error("zlib error: unknown error")]
    Unknown(#[source] std::io::Error),
}

/// Transport failure categories and the stable codes scripts receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    ConnectionFailure = 1,
    EmptyResponse = 2,
    HostResolutionFailure = 3,
    InternalError = 4,
    InvalidUrlFormat = 5,
    NetworkReceiveError = 6,
    NetworkSendFailure = 7,
    OperationTimedOut = 8,
    ProxyResolutionFailure = 9,
    TlsConnectError = 10,
    TlsLocalCertificateError = 11,
    TlsRemoteCertificateError = 12,
    TlsCaCertError = 13,
    GenericTlsError = 14,
    UnsupportedProtocol = 15,
    RequestCancelled = 16,
    TooManyRedirects = 17,
    Unknown = 1000,
}

impl TransportErrorKind {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TransportErrorKind::ConnectionFailure => "connection failure",
            TransportErrorKind::EmptyResponse => "empty response",
            TransportErrorKind::HostResolutionFailure => "host resolution failure",
            TransportErrorKind::InternalError => "internal error",
            TransportErrorKind::InvalidUrlFormat => "invalid url format",
            TransportErrorKind::NetworkReceiveError => "network receive error",
            TransportErrorKind::NetworkSendFailure => "network send failure",
            TransportErrorKind::OperationTimedOut => "operation timed out",
            TransportErrorKind::ProxyResolutionFailure => "proxy resolution failure",
            TransportErrorKind::TlsConnectError => "tls connect error",
            TransportErrorKind::TlsLocalCertificateError => "tls local certificate error",
            TransportErrorKind::TlsRemoteCertificateError => "tls remote certificate error",
            TransportErrorKind::TlsCaCertError => "tls ca certificate error",
            TransportErrorKind::GenericTlsError => "generic tls error",
            TransportErrorKind::UnsupportedProtocol => "unsupported protocol",
            TransportErrorKind::RequestCancelled => "request cancelled",
            TransportErrorKind::TooManyRedirects => "too many redirects",
            TransportErrorKind::Unknown => "unknown error",
        }
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A network operation that did not produce a response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn code(&self) -> i32 {
        self.kind.code()
    }
}
