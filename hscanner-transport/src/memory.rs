//! In-memory transport
//!
//! Stands in for a serial port in tests and demos. The transport side is
//! handed to the scanner; the [`DeviceHandle`] side plays the device: it
//! injects bytes into the input stream and inspects what was written. An
//! optional responder produces the device's reply to every write.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::trace;

use crate::{error::*, Transport};

type Responder = Box<dyn FnMut(&[u8]) -> Vec<u8> + Send>;

#[derive(Default)]
struct Shared {
    /// Bytes sent by the device, not yet read
    inbound: VecDeque<u8>,

    /// Everything written by the host
    written: Vec<u8>,

    responder: Option<Responder>,

    /// Device unplugged: reads and writes fail
    disconnected: bool,
}

/// Host side of an in-memory duplex byte stream
pub struct MemoryTransport {
    name: String,
    open: bool,
    available: bool,
    shared: Arc<Mutex<Shared>>,
    written: Arc<Notify>,
}

/// Device side of a [`MemoryTransport`]
#[derive(Clone)]
pub struct DeviceHandle {
    shared: Arc<Mutex<Shared>>,
    written: Arc<Notify>,
}

impl MemoryTransport {
    /// Create a connected transport/device pair
    pub fn pair(name: impl Into<String>) -> (Self, DeviceHandle) {
        let shared = Arc::new(Mutex::new(Shared::default()));
        let written = Arc::new(Notify::new());

        let transport = Self {
            name: name.into(),
            open: false,
            available: true,
            shared: shared.clone(),
            written: written.clone(),
        };

        (transport, DeviceHandle { shared, written })
    }

    /// A transport whose `open` always fails, like a missing port
    pub fn unavailable(name: impl Into<String>) -> Self {
        let (mut transport, _) = Self::pair(name);
        transport.available = false;
        transport
    }

    /// Reply to every write with the bytes returned by `responder`
    pub fn with_responder<F>(self, responder: F) -> Self
    where
        F: FnMut(&[u8]) -> Vec<u8> + Send + 'static,
    {
        self.shared.lock().responder = Some(Box::new(responder));
        self
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn open(&mut self) -> Result<()> {
        if self.open {
            return Err(Error::AlreadyOpen);
        }
        if !self.available {
            return Err(Error::OpenFailed {
                port: self.name.clone(),
                reason: "no such device".into(),
            });
        }

        self.open = true;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.open = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    async fn write(&mut self, data: &[u8]) -> Result<()> {
        if !self.open {
            return Err(Error::NotOpen);
        }

        trace!("Memory write {} bytes", data.len());

        {
            let mut guard = self.shared.lock();
            let shared = &mut *guard;
            if shared.disconnected {
                return Err(Error::ConnectionClosed);
            }
            shared.written.extend_from_slice(data);

            if let Some(responder) = shared.responder.as_mut() {
                shared.inbound.extend(responder(data));
            }
        }

        self.written.notify_waiters();
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if !self.open {
            return Err(Error::NotOpen);
        }

        let mut shared = self.shared.lock();
        if shared.disconnected {
            return Err(Error::ConnectionClosed);
        }
        let n = buf.len().min(shared.inbound.len());
        for (slot, byte) in buf.iter_mut().zip(shared.inbound.drain(..n)) {
            *slot = byte;
        }

        Ok(n)
    }

    fn bytes_available(&self) -> Result<usize> {
        if !self.open {
            return Err(Error::NotOpen);
        }
        Ok(self.shared.lock().inbound.len())
    }

    fn discard_input(&mut self) -> Result<()> {
        if !self.open {
            return Err(Error::NotOpen);
        }
        self.shared.lock().inbound.clear();
        Ok(())
    }

    fn port_name(&self) -> String {
        self.name.clone()
    }
}

impl DeviceHandle {
    /// Queue bytes as if sent by the device
    pub fn send(&self, data: &[u8]) {
        self.shared.lock().inbound.extend(data.iter().copied());
    }

    /// Simulate the device going away; every later read or write fails
    pub fn disconnect(&self) {
        self.shared.lock().disconnected = true;
    }

    /// Everything the host has written so far
    pub fn written(&self) -> Vec<u8> {
        self.shared.lock().written.clone()
    }

    /// Take and clear what the host has written
    pub fn take_written(&self) -> Vec<u8> {
        std::mem::take(&mut self.shared.lock().written)
    }

    /// Bytes sent by the device that the host has not read yet
    pub fn pending_input(&self) -> usize {
        self.shared.lock().inbound.len()
    }

    /// Wait until the host has written at least `len` bytes in total
    pub async fn wait_for_written(&self, len: usize) {
        loop {
            let notified = self.written.notified();
            if self.shared.lock().written.len() >= len {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_round_trip() {
        let (mut transport, device) = MemoryTransport::pair("mem0");
        transport.open().await.unwrap();

        device.send(b"hello");
        assert_eq!(transport.bytes_available().unwrap(), 5);

        let mut buf = [0u8; 3];
        assert_eq!(transport.read(&mut buf).await.unwrap(), 3);
        assert_eq!(&buf, b"hel");
        assert_eq!(transport.read(&mut buf).await.unwrap(), 2);
        assert_eq!(&buf[..2], b"lo");
        assert_eq!(transport.read(&mut buf).await.unwrap(), 0);

        transport.write(b"out").await.unwrap();
        assert_eq!(device.take_written(), b"out");
        assert!(device.written().is_empty());
    }

    #[tokio::test]
    async fn test_memory_discard_input() {
        let (mut transport, device) = MemoryTransport::pair("mem0");
        device.send(b"stale");

        transport.open().await.unwrap();
        transport.discard_input().unwrap();
        assert_eq!(device.pending_input(), 0);
    }

    #[tokio::test]
    async fn test_memory_responder() {
        let (transport, device) = MemoryTransport::pair("mem0");
        let mut transport = transport.with_responder(|data| {
            let mut echo = data.to_vec();
            echo.reverse();
            echo
        });
        transport.open().await.unwrap();

        transport.write(b"abc").await.unwrap();
        assert_eq!(device.pending_input(), 3);

        let mut buf = [0u8; 8];
        let n = transport.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"cba");
    }

    #[tokio::test]
    async fn test_memory_unavailable() {
        let mut transport = MemoryTransport::unavailable("COM9");
        assert!(matches!(transport.open().await, Err(Error::OpenFailed { .. })));
    }

    #[tokio::test]
    async fn test_memory_disconnect() {
        let (mut transport, device) = MemoryTransport::pair("mem0");
        transport.open().await.unwrap();

        device.disconnect();

        let mut buf = [0u8; 4];
        assert!(matches!(transport.read(&mut buf).await, Err(Error::ConnectionClosed)));
        assert!(matches!(transport.write(b"x").await, Err(Error::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_memory_closed() {
        let (mut transport, _device) = MemoryTransport::pair("mem0");
        let mut buf = [0u8; 4];
        assert!(matches!(transport.read(&mut buf).await, Err(Error::NotOpen)));

        transport.open().await.unwrap();
        transport.close().await.unwrap();
        transport.close().await.unwrap();
        assert!(!transport.is_open());
    }
}
