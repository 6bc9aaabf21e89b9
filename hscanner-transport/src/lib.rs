//! Transport layer for Honeywell scanners
//!
//! Provides the byte stream the receiver drains and commands are written to.

pub mod error;
pub mod memory;
pub mod serial;

pub use error::{Error, Result};
pub use memory::{DeviceHandle, MemoryTransport};
pub use serial::SerialTransport;

use async_trait::async_trait;

/// Byte stream to a scanner
///
/// `read` must never wait for data: it returns whatever is already available
/// (possibly nothing). The receiver polls it in a loop.
#[async_trait]
pub trait Transport: Send {
    /// Open the underlying device
    async fn open(&mut self) -> Result<()>;
    
    /// Close the device; closing a closed transport is a no-op
    async fn close(&mut self) -> Result<()>;
    
    /// Check if open
    fn is_open(&self) -> bool;
    
    /// Write raw bytes
    async fn write(&mut self, data: &[u8]) -> Result<()>;
    
    /// Read available bytes into `buf` without blocking, returning the count (0 if none)
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize>;
    
    /// Number of bytes ready to be read
    fn bytes_available(&self) -> Result<usize>;
    
    /// Drop any input received but not yet read
    fn discard_input(&mut self) -> Result<()>;
    
    /// Get port identifier
    fn port_name(&self) -> String;
}
