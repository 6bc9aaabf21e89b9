//! Error types for hscanner-core

/// Result type alias for hscanner-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core protocol errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Menu command text cannot be sent
    #[error("Invalid menu command {command:?}: {reason}")]
    InvalidCommand {
        command: String,
        reason: &'static str,
    },
    
    /// Frame header claims more bytes than the receive buffer may hold
    #[error("Frame too large: header claims {length} bytes (max: {max} bytes)")]
    FrameTooLarge {
        length: usize,
        max: usize,
    },
    
    /// Buffered text grew past the limit without a reply or line boundary
    #[error("Receive buffer overflow: {buffered} bytes without a boundary (max: {max} bytes)")]
    BufferOverflow {
        buffered: usize,
        max: usize,
    },
    
    /// A command is already waiting for its reply
    #[error("A command is already pending ({remaining} sub-responses outstanding)")]
    PendingCommand {
        remaining: usize,
    },
}

impl Error {
    /// Check if error is recoverable (retry might succeed)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::PendingCommand { .. })
    }
    
    /// Check if error means the byte stream lost framing and must be reset
    pub fn requires_reset(&self) -> bool {
        matches!(
            self,
            Self::FrameTooLarge { .. } | Self::BufferOverflow { .. }
        )
    }
}
