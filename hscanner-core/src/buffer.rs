//! Receive buffer for accumulating partial reads
//!
//! Bytes are appended at the back as they arrive from the transport and
//! complete units are split off the front. Splitting advances the start of the
//! underlying `BytesMut`, so whatever follows a consumed unit is immediately at
//! offset zero without copying, and no byte is lost or duplicated.

use std::ops::Deref;

use bytes::{Bytes, BytesMut};

/// Growable byte accumulator bounded by the largest accepted frame
#[derive(Debug)]
pub struct ReceiveBuffer {
    buf: BytesMut,
    max_size: usize,
}

impl ReceiveBuffer {
    /// Initial allocation; the buffer grows on demand up to `max_size`
    const INITIAL_CAPACITY: usize = 4 * 1024;

    pub fn new(max_size: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(Self::INITIAL_CAPACITY.min(max_size)),
            max_size,
        }
    }

    /// Largest number of bytes the buffer is expected to hold
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Append newly received bytes
    pub fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Remove the first `len` bytes and return them
    ///
    /// # Panics
    ///
    /// Panics if `len` exceeds the buffered length.
    pub fn consume(&mut self, len: usize) -> Bytes {
        self.buf.split_to(len).freeze()
    }

    /// Buffered bytes exceed the configured maximum
    pub fn is_overfull(&self) -> bool {
        self.buf.len() > self.max_size
    }

    /// Drop everything buffered
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

impl Deref for ReceiveBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_consume_front() {
        let mut buffer = ReceiveBuffer::new(64);
        buffer.extend(b"DECHDR1\x06!rest");

        let unit = buffer.consume(9);
        assert_eq!(&unit[..], b"DECHDR1\x06!");
        assert_eq!(&buffer[..], b"rest");
    }

    #[test]
    fn test_overfull() {
        let mut buffer = ReceiveBuffer::new(4);
        buffer.extend(b"1234");
        assert!(!buffer.is_overfull());
        buffer.extend(b"5");
        assert!(buffer.is_overfull());

        buffer.clear();
        assert!(buffer.is_empty());
    }

    proptest! {
        #[test]
        fn prop_consume_preserves_remaining(
            data in proptest::collection::vec(any::<u8>(), 0..512),
            split in any::<prop::sample::Index>(),
        ) {
            let mut buffer = ReceiveBuffer::new(1024);
            buffer.extend(&data);

            let m = if data.is_empty() { 0 } else { split.index(data.len() + 1) };
            let unit = buffer.consume(m);

            prop_assert_eq!(&unit[..], &data[..m]);
            prop_assert_eq!(&buffer[..], &data[m..]);
        }

        #[test]
        fn prop_interleaved_extend_and_consume(
            chunks in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..64), 1..16),
        ) {
            let mut buffer = ReceiveBuffer::new(4096);
            let mut expected: Vec<u8> = Vec::new();

            for chunk in &chunks {
                buffer.extend(chunk);
                expected.extend_from_slice(chunk);

                let m = expected.len() / 2;
                let unit = buffer.consume(m);
                prop_assert_eq!(&unit[..], &expected[..m]);
                expected.drain(..m);
                prop_assert_eq!(&buffer[..], &expected[..]);
            }
        }
    }
}
