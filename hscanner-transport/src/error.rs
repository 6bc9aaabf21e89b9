//! Transport errors

use std::io;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Port not open")]
    NotOpen,
    
    #[error("Port already open")]
    AlreadyOpen,
    
    #[error("Failed to open {port}: {reason}")]
    OpenFailed {
        port: String,
        reason: String,
    },
    
    #[error("Connection closed by device")]
    ConnectionClosed,
    
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}
