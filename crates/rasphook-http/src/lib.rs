pub mod body;
pub mod builder;
pub mod descriptor;
pub mod error;
pub mod method;
pub mod timeout;
pub mod transport;

// Re-export commonly used types
pub use body::{compress, BodyBuilder, BuiltBody, Compressor};
pub use builder::PayloadBuilder;
pub use descriptor::{BodyEncoding, RequestBody, RequestDescriptor};
pub use error::{
    BuildError, BuildResult, CompressionError, TransportError, TransportErrorKind,
};
pub use method::HttpMethod;
pub use timeout::TimeoutManager;
pub use transport::{HttpOutcome, HttpResponse, ReqwestTransport, Transport};
