//! High-level scanner interface

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use hscanner_core::{
    AbortReason, Completion, Correlator, ImageCapture, MenuCommand, TriggerMode,
};
use hscanner_transport::{SerialTransport, Transport};
use hscanner_types::CapturedImage;

use crate::{
    config::ScannerConfig,
    error::{Error, Result},
    events::ScannerEvents,
    receiver::{Receiver, ReceiverContext, SharedTransport},
};

/// Honeywell scanner on a serial line
///
/// Owns the transport and a background receiver task. Commands are
/// serialised: a second [`send_command`](Self::send_command) waits until the
/// first has returned. All methods take `&self`, so the scanner can be shared
/// behind an `Arc` and closed from another task while a command is pending.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use hscanner::{Scanner, ScannerConfig};
///
/// #[tokio::main]
/// async fn main() -> hscanner::Result<()> {
///     let scanner = Scanner::open(ScannerConfig::new("/dev/ttyACM0")).await?;
///     
///     let response = scanner.send_command("TRGMOD0;DECHDR1", Duration::from_secs(1)).await?;
///     println!("{:?}", response);
///     
///     scanner.close().await?;
///     Ok(())
/// }
/// ```
pub struct Scanner {
    config: ScannerConfig,
    port_name: String,
    transport: SharedTransport,
    correlator: Correlator,
    context: Arc<ReceiverContext>,
    receiver: parking_lot::Mutex<Option<JoinHandle<()>>>,
    command_gate: tokio::sync::Mutex<()>,
    open: AtomicBool,
}

impl Scanner {
    /// Open the serial port named in `config`
    pub async fn open(config: ScannerConfig) -> Result<Self> {
        let transport = SerialTransport::new(config.port.clone()).with_baud_rate(config.baud_rate);
        Self::open_with(Box::new(transport), config).await
    }
    
    /// Open an arbitrary transport
    ///
    /// Stale input is discarded and the receiver task is started. Must be
    /// called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns the transport error if the device cannot be opened; no task is
    /// left running in that case.
    pub async fn open_with(mut transport: Box<dyn Transport>, config: ScannerConfig) -> Result<Self> {
        let port_name = transport.port_name();
        info!("Opening scanner on {}...", port_name);
        
        transport.open().await?;
        if let Err(e) = transport.discard_input() {
            let _ = transport.close().await;
            return Err(e.into());
        }
        
        let transport: SharedTransport = Arc::new(tokio::sync::Mutex::new(transport));
        let correlator = Correlator::new();
        let context = Arc::new(ReceiverContext::default());
        
        let receiver = Receiver::new(
            transport.clone(),
            correlator.clone(),
            context.clone(),
            config.clone(),
        );
        let handle = tokio::spawn(receiver.run());
        
        info!("Scanner open on {}", port_name);
        
        Ok(Self {
            config,
            port_name,
            transport,
            correlator,
            context,
            receiver: parking_lot::Mutex::new(Some(handle)),
            command_gate: tokio::sync::Mutex::new(()),
            open: AtomicBool::new(true),
        })
    }
    
    /// Check if open
    ///
    /// Turns `false` on [`close`](Self::close) and when the receiver stops
    /// after a transport failure.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire) && !self.context.stopped.load(Ordering::Acquire)
    }
    
    pub fn port_name(&self) -> &str {
        &self.port_name
    }
    
    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }
    
    /// Stop the receiver and close the transport
    ///
    /// Waits up to the configured close timeout for the receiver to finish,
    /// then aborts it. A pending command fails with
    /// [`Error::ShutdownWhilePending`]. Closing twice is a no-op.
    pub async fn close(&self) -> Result<()> {
        let Some(mut handle) = self.receiver.lock().take() else {
            return Ok(());
        };
        
        info!("Closing scanner on {}...", self.port_name);
        
        self.context.stop.store(true, Ordering::Release);
        self.open.store(false, Ordering::Release);
        
        if tokio::time::timeout(self.config.close_timeout, &mut handle).await.is_err() {
            warn!("Receiver did not stop within {:?}, aborting", self.config.close_timeout);
            handle.abort();
        }
        
        self.correlator.abort(AbortReason::Shutdown);
        self.transport.lock().await.close().await?;
        
        info!("Scanner closed");
        Ok(())
    }
    
    /// Send a menu command and wait for every sub-response
    ///
    /// `command` is the bare command text (`TRGMOD0;DECHDR1`); it is sent as
    /// a temporary (`!`) command. A zero `timeout` waits indefinitely.
    ///
    /// Returns the concatenated sub-responses, status bytes included.
    ///
    /// # Errors
    ///
    /// - [`Error::NotOpen`] if the scanner is closed
    /// - [`Error::Core`] if the command text is not a valid menu command
    /// - [`Error::CommandTimeout`] if the sub-responses did not all arrive in time
    /// - [`Error::CommandRejected`] if any sub-response was NAK or ENQ
    /// - [`Error::ShutdownWhilePending`] / [`Error::StreamReset`] if the receiver
    ///   released the command
    pub async fn send_command(&self, command: &str, timeout: Duration) -> Result<String> {
        let command = MenuCommand::new(command)?;
        self.send_menu_command(&command, timeout).await
    }
    
    /// Like [`send_command`](Self::send_command) with a prepared command
    pub async fn send_menu_command(&self, command: &MenuCommand, timeout: Duration) -> Result<String> {
        if !self.is_open() {
            return Err(Error::NotOpen);
        }
        
        let _gate = self.command_gate.lock().await;
        
        let completion = self.correlator.begin(command.sub_command_count())?;
        let _pending = PendingGuard(&self.correlator);
        
        self.exchange(command, completion, timeout).await
    }
    
    async fn exchange(
        &self,
        command: &MenuCommand,
        completion: tokio::sync::oneshot::Receiver<Completion>,
        timeout: Duration,
    ) -> Result<String> {
        debug!("Sending {} ({} sub-commands)", command, command.sub_command_count());
        
        let frame = command.encode();
        {
            let mut transport = self.transport.lock().await;
            
            // Closed while this command was queued; nobody is left to release it
            if !self.is_open() {
                return Err(Error::ShutdownWhilePending);
            }
            transport.write(&frame).await?;
        }
        
        let completion = if timeout.is_zero() {
            completion.await
        } else {
            match tokio::time::timeout(timeout, completion).await {
                Ok(completion) => completion,
                Err(_) => {
                    warn!("No response to {} within {:?}", command, timeout);
                    return Err(Error::CommandTimeout {
                        timeout_ms: timeout.as_millis() as u64,
                    });
                }
            }
        };
        
        match completion {
            Ok(Ok(outcome)) if outcome.success => Ok(outcome.response),
            Ok(Ok(outcome)) => {
                warn!("{} rejected: {:?}", command, outcome.response);
                Err(Error::CommandRejected {
                    response: outcome.response,
                })
            }
            Ok(Err(AbortReason::StreamReset)) => Err(Error::StreamReset),
            Ok(Err(AbortReason::Shutdown)) | Err(_) => Err(Error::ShutdownWhilePending),
        }
    }
    
    /// Send a command and report `(success, response)` instead of an error
    ///
    /// A rejected command yields `(false, response)`; any other failure yields
    /// `(false, "")`.
    pub async fn send_command_status(&self, command: &str, timeout: Duration) -> (bool, String) {
        match self.send_command(command, timeout).await {
            Ok(response) => (true, response),
            Err(Error::CommandRejected { response }) => (false, response),
            Err(e) => {
                debug!("Command {:?} failed: {}", command, e);
                (false, String::new())
            }
        }
    }
    
    /// Register the handler for asynchronous events, replacing any previous one
    pub fn set_event_handler(&self, handler: Arc<dyn ScannerEvents>) {
        *self.context.handler.write() = Some(handler);
    }
    
    /// Stop delivering events
    pub fn clear_event_handler(&self) {
        *self.context.handler.write() = None;
    }
    
    /// Most recently shipped image that decoded successfully
    ///
    /// Cleared whenever a new image frame arrives, so a frame that fails to
    /// decode leaves nothing here.
    pub fn last_image(&self) -> Option<CapturedImage> {
        self.context.last_image.read().clone()
    }
    
    /// Select manual (`TRGMOD0`) or trigger-notify (`TRGMOD5`) mode
    pub async fn set_trigger_mode(&self, mode: TriggerMode) -> Result<()> {
        let command = MenuCommand::trigger_mode(mode);
        self.send_menu_command(&command, self.config.command_timeout).await?;
        Ok(())
    }
    
    /// Enable or disable decode headers (required for barcode events)
    pub async fn set_decode_header(&self, enabled: bool) -> Result<()> {
        let command = MenuCommand::decode_header(enabled);
        self.send_menu_command(&command, self.config.command_timeout).await?;
        Ok(())
    }
    
    /// Take a picture and wait for it to be shipped
    ///
    /// # Errors
    ///
    /// [`Error::NoImage`] if the scanner acknowledged the capture but no image
    /// could be decoded.
    pub async fn capture_image(&self, capture: &ImageCapture, timeout: Duration) -> Result<CapturedImage> {
        *self.context.last_image.write() = None;
        
        self.send_menu_command(&capture.to_command(), timeout).await?;
        
        self.last_image().ok_or(Error::NoImage)
    }
}

/// Forgets the pending command when the caller stops waiting
///
/// Runs on every exit from a command, including a dropped future, so late
/// replies never leak into the next command.
struct PendingGuard<'a>(&'a Correlator);

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

impl Drop for Scanner {
    fn drop(&mut self) {
        let Some(handle) = self.receiver.get_mut().take() else {
            return;
        };
        
        warn!("Scanner on {} dropped without close", self.port_name);
        
        self.context.stop.store(true, Ordering::Release);
        handle.abort();
        self.correlator.abort(AbortReason::Shutdown);
    }
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("port", &self.port_name)
            .field("open", &self.is_open())
            .field("pending", &self.correlator.is_pending())
            .finish()
    }
}
