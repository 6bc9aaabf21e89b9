//! Asynchronous notifications raised by the scanner

use crate::scan::BarcodeScan;

/// Event delivered from the receiver's execution context
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScannerEvent {
    /// Trigger pulled (only reported in trigger-notify mode)
    TriggerPull,
    
    /// Barcode decoded
    BarcodeScan(BarcodeScan),
    
    /// Text that is neither a command reply nor an asynchronous frame
    UnsolicitedResponse(String),
}

impl ScannerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::TriggerPull => "trigger_pull",
            Self::BarcodeScan(_) => "barcode_scan",
            Self::UnsolicitedResponse(_) => "unsolicited_response",
        }
    }
}
