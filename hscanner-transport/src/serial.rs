//! Serial transport
//!
//! Scanners in USB serial emulation or RS-232 mode show up as a COM port or
//! `/dev/ttyACM*` device. The factory line settings are 115200 8-N-1.

use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use async_trait::async_trait;
use serialport::{ClearBuffer, SerialPort};
use tracing::{debug, trace, warn};

use hscanner_core::constants::DEFAULT_BAUD_RATE;

use crate::{error::*, Transport};

/// Serial port transport
pub struct SerialTransport {
    port_name: String,
    baud_rate: u32,
    port: Option<Box<dyn SerialPort>>,
    read_timeout: Duration,
}

impl SerialTransport {
    /// Create new serial transport at the default baud rate
    pub fn new(port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            port: None,
            read_timeout: Duration::from_millis(1),
        }
    }

    /// Set baud rate
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Set the driver-level read timeout
    ///
    /// Reads only request bytes already reported as available, so this only
    /// bounds a read racing with a port that vanishes.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    fn port_mut(&mut self) -> Result<&mut Box<dyn SerialPort>> {
        self.port.as_mut().ok_or(Error::NotOpen)
    }

    /// Run a blocking port operation on the blocking thread pool
    ///
    /// The port is moved into the blocking task and put back afterwards. If
    /// the calling future is dropped meanwhile, the port is closed when the
    /// task finishes and the transport reports `NotOpen` from then on.
    async fn blocking<T, F>(&mut self, op: F) -> Result<T>
    where
        F: FnOnce(&mut Box<dyn SerialPort>) -> std::io::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let mut port = self.port.take().ok_or(Error::NotOpen)?;

        let (port, result) = tokio::task::spawn_blocking(move || {
            let result = op(&mut port);
            (port, result)
        })
        .await
        .map_err(|e| {
            warn!("Serial I/O task on {} failed: {}", self.port_name, e);
            Error::ConnectionClosed
        })?;

        self.port = Some(port);
        Ok(result?)
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn open(&mut self) -> Result<()> {
        if self.is_open() {
            return Err(Error::AlreadyOpen);
        }

        debug!("Opening {} at {} baud...", self.port_name, self.baud_rate);

        let port = serialport::new(&self.port_name, self.baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(self.read_timeout)
            .open()
            .map_err(|e| Error::OpenFailed {
                port: self.port_name.clone(),
                reason: e.to_string(),
            })?;

        debug!("Opened {}", self.port_name);

        self.port = Some(port);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut port) = self.port.take() {
            debug!("Closing {}...", self.port_name);

            let _ = port.flush();
        }

        Ok(())
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    async fn write(&mut self, data: &[u8]) -> Result<()> {
        if !self.is_open() {
            return Err(Error::NotOpen);
        }

        trace!("Sending {} bytes: {:02X?}", data.len(), &data[..data.len().min(32)]);

        let data = data.to_vec();
        self.blocking(move |port| {
            port.write_all(&data)?;
            port.flush()
        })
        .await
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let available = self.port_mut()?.bytes_to_read()? as usize;
        if available == 0 || buf.is_empty() {
            return Ok(0);
        }

        let want = available.min(buf.len());
        let received = self
            .blocking(move |port| {
                let mut chunk = vec![0u8; want];
                match port.read(&mut chunk) {
                    Ok(n) => chunk.truncate(n),
                    Err(e) if e.kind() == ErrorKind::TimedOut => chunk.clear(),
                    Err(e) => return Err(e),
                }
                Ok(chunk)
            })
            .await;

        let chunk = match received {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!("Read error on {}: {}", self.port_name, e);
                return Err(e);
            }
        };

        let n = chunk.len();
        buf[..n].copy_from_slice(&chunk);
        trace!("Received {} bytes: {:02X?}", n, &buf[..n.min(32)]);

        Ok(n)
    }

    fn bytes_available(&self) -> Result<usize> {
        let port = self.port.as_ref().ok_or(Error::NotOpen)?;
        Ok(port.bytes_to_read()? as usize)
    }

    fn discard_input(&mut self) -> Result<()> {
        let port = self.port_mut()?;
        port.clear(ClearBuffer::Input)?;
        Ok(())
    }

    fn port_name(&self) -> String {
        self.port_name.clone()
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        if self.is_open() {
            warn!("Serial transport dropped while still open");
        }
    }
}
