//! Scanner configuration

use std::time::Duration;

use hscanner_core::constants::{
    DEFAULT_BAUD_RATE, DEFAULT_CLOSE_TIMEOUT_MS, DEFAULT_MAX_FRAME_SIZE,
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_READ_BUFFER_SIZE,
};

/// Settings for opening a [`Scanner`](crate::Scanner)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannerConfig {
    /// Serial port name (`COM3`, `/dev/ttyACM0`, ...)
    pub port: String,
    
    /// Line speed
    pub baud_rate: u32,
    
    /// Bytes requested from the transport per read
    pub read_buffer_size: usize,
    
    /// Receiver sleep when no bytes are available
    pub poll_interval: Duration,
    
    /// Bounded wait for the receiver to stop on close
    pub close_timeout: Duration,
    
    /// Largest accepted asynchronous frame or run of unterminated text
    pub max_frame_size: usize,
    
    /// Timeout for the convenience commands; zero waits indefinitely
    pub command_timeout: Duration,
}

impl ScannerConfig {
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            close_timeout: Duration::from_millis(DEFAULT_CLOSE_TIMEOUT_MS),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            command_timeout: Duration::ZERO,
        }
    }
    
    /// Set baud rate
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }
    
    /// Set per-read buffer size
    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.max(1);
        self
    }
    
    /// Set receiver idle sleep
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
    
    /// Set close timeout
    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }
    
    /// Set maximum frame size
    pub fn with_max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }
    
    /// Set default command timeout
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_config_defaults() {
        let config = ScannerConfig::new("COM3");
        assert_eq!(config.port, "COM3");
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.max_frame_size, 600_000);
        assert_eq!(config.poll_interval, Duration::from_millis(1));
        assert_eq!(config.close_timeout, Duration::from_secs(1));
        assert!(config.command_timeout.is_zero());
    }
    
    #[test]
    fn test_config_builders() {
        let config = ScannerConfig::new("/dev/ttyACM0")
            .with_baud_rate(9600)
            .with_read_buffer_size(0)
            .with_command_timeout(Duration::from_millis(500));
        
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.read_buffer_size, 1);
        assert_eq!(config.command_timeout, Duration::from_millis(500));
    }
}
