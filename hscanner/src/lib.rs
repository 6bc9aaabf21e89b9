//! # hscanner
//!
//! Driver for Honeywell barcode scanners and area imagers on a serial line.
//!
//! ## Features
//!
//! - Menu commands with per-sub-command acknowledgement
//! - Barcode, trigger and unsolicited text events
//! - JPEG image capture
//! - Async/await API using Tokio
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use hscanner::{ChannelEvents, Scanner, ScannerConfig, ScannerEvent, TriggerMode};
//!
//! #[tokio::main]
//! async fn main() -> hscanner::Result<()> {
//!     let config = ScannerConfig::new("/dev/ttyACM0")
//!         .with_command_timeout(Duration::from_secs(1));
//!     let scanner = Scanner::open(config).await?;
//!     
//!     let (events, mut rx) = ChannelEvents::new();
//!     scanner.set_event_handler(Arc::new(events));
//!     
//!     scanner.set_trigger_mode(TriggerMode::Manual).await?;
//!     scanner.set_decode_header(true).await?;
//!     
//!     if let Some(ScannerEvent::BarcodeScan(scan)) = rx.recv().await {
//!         println!("{}", scan);
//!     }
//!     
//!     scanner.close().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod events;
mod receiver;
pub mod scanner;

// Re-exports
pub use config::ScannerConfig;
pub use error::{Error, Result};
pub use events::{ChannelEvents, ScannerEvents};
pub use scanner::Scanner;

// Re-export types
pub use hscanner_core::{ImageCapture, MenuCommand, TriggerMode};
pub use hscanner_transport::{MemoryTransport, SerialTransport, Transport};
pub use hscanner_types::{BarcodeScan, CapturedImage, ScannerEvent};
