use thiserror::Error;

/// Failure raised by the embedded visualization runtime, carried across the
/// engine seam as a plain message (foreign exceptions never cross unconverted).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct EngineError(pub String);

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("runtime not available: initialize has not been called")]
    NotInitialized,

    #[error("runtime already initialized")]
    AlreadyInitialized,

    #[error("runtime not available: bridge has been shut down")]
    ShutDown,

    #[error("no active sink with id {0}")]
    UnknownHandle(i64),

    #[error("sink id {0} is already in use")]
    DuplicateHandle(i64),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("buffer length {actual} does not match volume dimensions (expected {expected} bytes)")]
    BufferSizeMismatch { expected: u64, actual: u64 },

    #[error("runtime exception: {0}")]
    Engine(#[from] EngineError),
}

impl BridgeError {
    /// Message of the underlying runtime exception, if this failure
    /// originated inside the embedded runtime.
    pub fn runtime_exception(&self) -> Option<&str> {
        match self {
            BridgeError::Engine(e) => Some(&e.0),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
