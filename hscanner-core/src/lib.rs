//! # hscanner-core
//!
//! Core protocol implementation for Honeywell serial scanners.
//!
//! This crate provides the sans-I/O protocol primitives:
//! - Menu command encoding
//! - Asynchronous frame header and message decoding
//! - Receive buffer and stream demultiplexer
//! - Command/response correlation
//! - Protocol constants

pub mod buffer;
pub mod command;
pub mod constants;
pub mod correlator;
pub mod demux;
pub mod error;
pub mod frame;

pub use buffer::ReceiveBuffer;
pub use command::{ImageCapture, MenuCommand, TriggerMode};
pub use correlator::{AbortReason, CommandOutcome, Completion, Correlator, ReplyDisposition};
pub use demux::{Demultiplexer, Segment};
pub use error::{Error, Result};
pub use frame::{AsyncMessage, FrameHeader};

#[cfg(any(test, feature = "test-util"))]
pub use frame::build_frame;
