//! Type definitions for hscanner

pub mod error;
pub mod event;
pub mod image;
pub mod scan;

pub use error::{Error, Result};
pub use event::ScannerEvent;
pub use image::CapturedImage;
pub use scan::BarcodeScan;
