//! Background receiver
//!
//! Polls the transport, splits the byte stream and routes every unit: command
//! replies to the correlator, frames and unsolicited text to the event handler,
//! shipped images to the last-image slot.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, error, info, trace, warn};

use hscanner_core::{
    AbortReason, AsyncMessage, Correlator, Demultiplexer, ReplyDisposition, Segment,
};
use hscanner_transport::Transport;
use hscanner_types::{BarcodeScan, CapturedImage};

use crate::{config::ScannerConfig, events::ScannerEvents};

pub(crate) type SharedTransport = Arc<Mutex<Box<dyn Transport>>>;

/// State shared between the [`Scanner`](crate::Scanner) and its receiver
#[derive(Default)]
pub(crate) struct ReceiverContext {
    pub stop: AtomicBool,
    /// Set by the receiver itself on exit
    pub stopped: AtomicBool,
    pub last_image: RwLock<Option<CapturedImage>>,
    pub handler: RwLock<Option<Arc<dyn ScannerEvents>>>,
}

impl ReceiverContext {
    fn handler(&self) -> Option<Arc<dyn ScannerEvents>> {
        self.handler.read().clone()
    }
}

pub(crate) struct Receiver {
    transport: SharedTransport,
    correlator: Correlator,
    context: Arc<ReceiverContext>,
    demux: Demultiplexer,
    chunk: Vec<u8>,
    config: ScannerConfig,
}

impl Receiver {
    pub fn new(
        transport: SharedTransport,
        correlator: Correlator,
        context: Arc<ReceiverContext>,
        config: ScannerConfig,
    ) -> Self {
        Self {
            transport,
            correlator,
            context,
            demux: Demultiplexer::new(config.max_frame_size),
            chunk: vec![0u8; config.read_buffer_size.max(1)],
            config,
        }
    }
    
    /// Run until the stop flag is raised or the transport fails
    pub async fn run(mut self) {
        debug!("Receiver started on {}", self.config.port);
        
        while !self.context.stop.load(Ordering::Acquire) {
            let read = {
                let mut transport = self.transport.lock().await;
                transport.read(&mut self.chunk).await
            };
            
            let n = match read {
                Ok(n) => n,
                Err(e) => {
                    error!("Receive failed on {}: {}", self.config.port, e);
                    break;
                }
            };
            
            if n > 0 {
                self.demux.feed(&self.chunk[..n]);
                self.drain().await;
            } else {
                tokio::time::sleep(self.config.poll_interval).await;
            }
        }
        
        // Raised before releasing the waiter so a command that starts later sees it
        self.context.stopped.store(true, Ordering::Release);
        
        if self.correlator.abort(AbortReason::Shutdown) {
            info!("Released pending command on receiver shutdown");
        }
        
        debug!("Receiver stopped");
    }
    
    /// Dispatch every complete unit currently buffered
    async fn drain(&mut self) {
        loop {
            match self.demux.next_segment() {
                Ok(Some(segment)) => self.dispatch(segment),
                Ok(None) => break,
                Err(e) if e.requires_reset() => {
                    warn!("Receive stream lost sync: {}", e);
                    self.resync().await;
                    break;
                }
                Err(e) => {
                    warn!("Demultiplexer error: {}", e);
                    break;
                }
            }
        }
    }
    
    async fn resync(&mut self) {
        self.demux.reset();
        
        if let Err(e) = self.transport.lock().await.discard_input() {
            warn!("Failed to discard input: {}", e);
        }
        
        if self.correlator.abort(AbortReason::StreamReset) {
            warn!("Pending command aborted by stream reset");
        }
    }
    
    fn dispatch(&self, segment: Segment) {
        match segment {
            Segment::Reply { text, success } => {
                match self.correlator.on_reply(&text, success) {
                    ReplyDisposition::Accumulated { remaining } => {
                        trace!("Sub-response received, {} remaining", remaining);
                    }
                    ReplyDisposition::Completed => {}
                    ReplyDisposition::Discarded => {
                        debug!("Dropped reply with no command pending: {}", hex::encode(&text));
                    }
                }
            }
            Segment::Unsolicited(text) => {
                debug!("Unsolicited response: {:?}", text);
                if let Some(handler) = self.context.handler() {
                    handler.on_unsolicited_response(&text);
                }
            }
            Segment::Frame(message) => self.on_frame(message),
        }
    }
    
    fn on_frame(&self, message: AsyncMessage) {
        trace!("Frame: {:?}", message);
        
        match message {
            AsyncMessage::TriggerEvent => {
                if let Some(handler) = self.context.handler() {
                    handler.on_trigger_pull();
                }
            }
            AsyncMessage::BarcodeScan { aim_id, aim_modifier, data } => {
                let Some(handler) = self.context.handler() else {
                    return;
                };
                let scan = BarcodeScan::new(
                    aim_id,
                    aim_modifier,
                    String::from_utf8_lossy(&data).into_owned(),
                );
                debug!("Barcode scan {}", scan.aim_identifier());
                handler.on_barcode_scan(&scan);
            }
            AsyncMessage::ImageFrame { jpeg } => {
                let mut last_image = self.context.last_image.write();
                *last_image = None;
                
                let Some(jpeg) = jpeg else {
                    warn!("Image frame without payload");
                    return;
                };
                
                match CapturedImage::decode(jpeg) {
                    Ok(image) => {
                        info!("Captured {}", image);
                        *last_image = Some(image);
                    }
                    Err(e) => warn!("Failed to decode shipped image: {}", e),
                }
            }
            AsyncMessage::Unknown { tag } => {
                debug!("Ignoring frame with tag {:?}", tag);
            }
        }
    }
}
