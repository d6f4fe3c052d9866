use rasphook_http::BuildError;
use thiserror::Error;

pub type RuntimeResult<T> = Result<T, RuntimeError>;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    #[error("Engine instance is disposed")]
    Disposed,
}

/// Returned when a deferred value is settled a second time.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleError {
    #[error("Deferred value is already settled")]
    AlreadySettled,
}
