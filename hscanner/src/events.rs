//! Event delivery
//!
//! Callbacks run synchronously on the receiver task, in stream order. A slow
//! handler delays every later frame and command reply, so handlers that need
//! another execution context (a UI thread, for instance) should hand the event
//! off, e.g. through [`ChannelEvents`].

use tokio::sync::mpsc;
use tracing::trace;

use hscanner_types::{BarcodeScan, ScannerEvent};

/// Receiver for asynchronous scanner notifications
///
/// Every method has a no-op default; implement only what you need.
pub trait ScannerEvents: Send + Sync {
    /// Trigger pulled (trigger-notify mode only)
    fn on_trigger_pull(&self) {}
    
    /// Barcode decoded (requires decode headers, `DECHDR1`)
    fn on_barcode_scan(&self, _scan: &BarcodeScan) {}
    
    /// Text that is neither a command reply nor a frame, CRLF stripped
    fn on_unsolicited_response(&self, _text: &str) {}
}

/// Forwards every event into an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelEvents {
    tx: mpsc::UnboundedSender<ScannerEvent>,
}

impl ChannelEvents {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ScannerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
    
    fn forward(&self, event: ScannerEvent) {
        if self.tx.send(event).is_err() {
            trace!("Event receiver dropped");
        }
    }
}

impl ScannerEvents for ChannelEvents {
    fn on_trigger_pull(&self) {
        self.forward(ScannerEvent::TriggerPull);
    }
    
    fn on_barcode_scan(&self, scan: &BarcodeScan) {
        self.forward(ScannerEvent::BarcodeScan(scan.clone()));
    }
    
    fn on_unsolicited_response(&self, text: &str) {
        self.forward(ScannerEvent::UnsolicitedResponse(text.to_owned()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_channel_events_forward() {
        let (events, mut rx) = ChannelEvents::new();
        
        events.on_trigger_pull();
        events.on_unsolicited_response("0021B2C3D4E5");
        
        assert_eq!(rx.try_recv().unwrap(), ScannerEvent::TriggerPull);
        assert_eq!(
            rx.try_recv().unwrap(),
            ScannerEvent::UnsolicitedResponse("0021B2C3D4E5".into())
        );
        assert!(rx.try_recv().is_err());
    }
    
    #[test]
    fn test_channel_events_receiver_dropped() {
        let (events, rx) = ChannelEvents::new();
        drop(rx);
        
        // Must not panic
        events.on_trigger_pull();
    }
}
