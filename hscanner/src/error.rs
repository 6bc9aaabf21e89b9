//! High-level error types

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Core protocol error: {0}")]
    Core(#[from] hscanner_core::Error),
    
    #[error("Transport error: {0}")]
    Transport(#[from] hscanner_transport::Error),
    
    #[error("Type error: {0}")]
    Types(#[from] hscanner_types::Error),
    
    #[error("Scanner not open")]
    NotOpen,
    
    #[error("No response within {timeout_ms} ms")]
    CommandTimeout {
        timeout_ms: u64,
    },
    
    #[error("Command rejected by scanner: {response:?}")]
    CommandRejected {
        response: String,
    },
    
    #[error("Scanner closed while a command was pending")]
    ShutdownWhilePending,
    
    #[error("Receive stream lost sync while a command was pending")]
    StreamReset,
    
    #[error("Capture succeeded but no image was decoded")]
    NoImage,
}

impl Error {
    /// Check if the same command may succeed when retried
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::CommandTimeout { .. } | Self::StreamReset | Self::NoImage
        )
    }
}
