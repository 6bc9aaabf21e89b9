//! Byte stream demultiplexer
//!
//! The scanner interleaves two kinds of traffic on one serial line:
//!
//! - **Asynchronous frames** start with `SYN` and carry a length-prefixed
//!   header (barcode scans, trigger events, shipped images).
//! - **Synchronous text**: command echoes ended by a status byte and a
//!   terminator (`ACK ;`, `NAK !`, ...), and unsolicited CRLF-terminated lines.
//!
//! [`Demultiplexer`] is sans-I/O: feed it whatever the transport returned and
//! pull [`Segment`]s until it reports that it needs more bytes.

use bytes::{Bytes, BytesMut};
use tracing::{debug, trace};

use crate::{
    buffer::ReceiveBuffer,
    constants::{control, menu},
    error::{Error, Result},
    frame::{AsyncMessage, FrameHeader},
};

/// One complete unit extracted from the front of the stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Sub-response to a menu command
    ///
    /// `text` holds every byte before the terminator, including the status
    /// byte; the terminator itself is dropped.
    Reply { text: Bytes, success: bool },

    /// Text line that is not a command reply, CRLF stripped
    Unsolicited(String),

    /// Decoded asynchronous frame
    Frame(AsyncMessage),
}

/// Accumulation of multi-line unsolicited replies
///
/// A reply that opens with an empty line (bare CRLF) spans two further lines,
/// which are delivered together as one response.
#[derive(Debug, Default)]
enum LineState {
    #[default]
    Idle,
    AwaitingFirst,
    Holding(BytesMut),
}

/// Splits the incoming byte stream into frames, replies and text lines
#[derive(Debug)]
pub struct Demultiplexer {
    buffer: ReceiveBuffer,
    lines: LineState,
}

impl Demultiplexer {
    pub fn new(max_frame_size: usize) -> Self {
        Self {
            buffer: ReceiveBuffer::new(max_frame_size),
            lines: LineState::Idle,
        }
    }

    /// Append bytes read from the transport
    pub fn feed(&mut self, data: &[u8]) {
        trace!("Buffered {} bytes: {}", data.len(), hex::encode(&data[..data.len().min(32)]));
        self.buffer.extend(data);
    }

    /// Number of bytes waiting to be framed
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Discard buffered bytes and any partial multi-line reply
    pub fn reset(&mut self) {
        debug!("Resetting demultiplexer, dropping {} bytes", self.buffer.len());
        self.buffer.clear();
        self.lines = LineState::Idle;
    }

    /// Extract the next complete unit from the front of the buffer
    ///
    /// Returns `Ok(None)` when more bytes are needed. Units that produce no
    /// segment (a trigger release, the opening line of a multi-line reply)
    /// are consumed silently.
    ///
    /// # Errors
    ///
    /// [`Error::FrameTooLarge`] if a frame header claims more than the maximum
    /// frame size, [`Error::BufferOverflow`] if that many bytes of text arrive
    /// without a boundary. The stream has lost sync in both cases; call
    /// [`reset`](Self::reset) before feeding more bytes.
    pub fn next_segment(&mut self) -> Result<Option<Segment>> {
        loop {
            let Some(&first) = self.buffer.first() else {
                return Ok(None);
            };

            let step = if first == control::SYN {
                self.take_frame()?
            } else {
                self.take_text()?
            };

            match step {
                Step::Segment(segment) => return Ok(Some(segment)),
                Step::Consumed => continue,
                Step::Incomplete => return Ok(None),
            }
        }
    }

    fn take_frame(&mut self) -> Result<Step> {
        let Some(header) = FrameHeader::parse(&self.buffer) else {
            return Ok(Step::Incomplete);
        };

        let len = header.frame_len();
        if len > self.buffer.max_size() {
            return Err(Error::FrameTooLarge {
                length: len,
                max: self.buffer.max_size(),
            });
        }
        if self.buffer.len() < len {
            return Ok(Step::Incomplete);
        }

        let frame = self.buffer.consume(len);
        trace!("Frame ({} bytes): {}", len, hex::encode(&frame[..len.min(32)]));

        match AsyncMessage::decode(&frame) {
            Some(message) => {
                debug!("Async frame {:?}", message);
                Ok(Step::Segment(Segment::Frame(message)))
            }
            None => Ok(Step::Consumed),
        }
    }

    fn take_text(&mut self) -> Result<Step> {
        for i in 1..self.buffer.len() {
            let byte = self.buffer[i];
            let previous = self.buffer[i - 1];

            if menu::TERMINATORS.contains(&byte) {
                let success = match previous {
                    control::ACK => true,
                    control::NAK | control::ENQ => false,
                    // Terminator character inside the echoed text
                    _ => continue,
                };

                let mut unit = self.buffer.consume(i + 1);
                unit.truncate(i);
                trace!("Reply {:?} (success={})", String::from_utf8_lossy(&unit), success);

                return Ok(Step::Segment(Segment::Reply {
                    text: unit,
                    success,
                }));
            }

            if previous == control::CR && byte == control::LF {
                let line = self.buffer.consume(i + 1);
                return Ok(self.take_line(line));
            }
        }

        if self.buffer.is_overfull() {
            return Err(Error::BufferOverflow {
                buffered: self.buffer.len(),
                max: self.buffer.max_size(),
            });
        }

        Ok(Step::Incomplete)
    }

    /// Handle one CRLF-terminated line
    fn take_line(&mut self, line: Bytes) -> Step {
        // Line content without its CRLF
        let content = &line[..line.len() - 2];

        if content.is_empty() {
            self.lines = LineState::AwaitingFirst;
            return Step::Consumed;
        }

        match std::mem::take(&mut self.lines) {
            LineState::AwaitingFirst => {
                self.lines = LineState::Holding(BytesMut::from(&line[..]));
                Step::Consumed
            }
            LineState::Holding(mut held) => {
                held.extend_from_slice(content);
                Step::Segment(Segment::Unsolicited(
                    String::from_utf8_lossy(&held).into_owned(),
                ))
            }
            LineState::Idle => Step::Segment(Segment::Unsolicited(
                String::from_utf8_lossy(content).into_owned(),
            )),
        }
    }
}

enum Step {
    Segment(Segment),
    Consumed,
    Incomplete,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::tags;
    use crate::frame::build_frame;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn drain(demux: &mut Demultiplexer) -> Vec<Segment> {
        let mut segments = Vec::new();
        while let Some(segment) = demux.next_segment().unwrap() {
            segments.push(segment);
        }
        segments
    }

    fn reply(text: &[u8], success: bool) -> Segment {
        Segment::Reply {
            text: Bytes::copy_from_slice(text),
            success,
        }
    }

    #[test]
    fn test_ack_reply() {
        let mut demux = Demultiplexer::new(1024);
        demux.feed(b"DECHDR1\x06!");

        assert_eq!(drain(&mut demux), vec![reply(b"DECHDR1\x06", true)]);
        assert_eq!(demux.buffered(), 0);
    }

    #[test]
    fn test_batch_replies() {
        let mut demux = Demultiplexer::new(1024);
        demux.feed(b"TRGMOD0\x06;DECHDR1\x06.");

        assert_eq!(
            drain(&mut demux),
            vec![reply(b"TRGMOD0\x06", true), reply(b"DECHDR1\x06", true)]
        );
    }

    #[test]
    fn test_nak_and_enq_replies() {
        let mut demux = Demultiplexer::new(1024);
        demux.feed(b"BADCMD\x15!VALUE9\x05.");

        assert_eq!(
            drain(&mut demux),
            vec![reply(b"BADCMD\x15", false), reply(b"VALUE9\x05", false)]
        );
    }

    #[test]
    fn test_terminator_inside_text_is_skipped() {
        let mut demux = Demultiplexer::new(1024);
        demux.feed(b"A.B;C\x06!");

        assert_eq!(drain(&mut demux), vec![reply(b"A.B;C\x06", true)]);
    }

    #[test]
    fn test_partial_reply_waits() {
        let mut demux = Demultiplexer::new(1024);
        demux.feed(b"DECHDR1\x06");
        assert_eq!(demux.next_segment().unwrap(), None);
        assert_eq!(demux.buffered(), 8);

        demux.feed(b"!");
        assert_eq!(drain(&mut demux), vec![reply(b"DECHDR1\x06", true)]);
    }

    #[test]
    fn test_unsolicited_line() {
        let mut demux = Demultiplexer::new(1024);
        demux.feed(b"0021B2C3D4E5\r\n");

        assert_eq!(
            drain(&mut demux),
            vec![Segment::Unsolicited("0021B2C3D4E5".into())]
        );
    }

    #[test]
    fn test_multiline_unsolicited() {
        let mut demux = Demultiplexer::new(1024);
        demux.feed(b"\r\nScanner 1: 0021B2C3D4E5\r\nScanner 2: none\r\nnext\r\n");

        assert_eq!(
            drain(&mut demux),
            vec![
                Segment::Unsolicited("Scanner 1: 0021B2C3D4E5\r\nScanner 2: none".into()),
                Segment::Unsolicited("next".into()),
            ]
        );
    }

    #[test]
    fn test_frames_and_text_interleaved() {
        let mut demux = Demultiplexer::new(1024);
        demux.feed(&build_frame(tags::TRIGGER, b"1T"));
        demux.feed(b"IMGSNP1L\x06;");
        demux.feed(&build_frame(tags::BARCODE, b"0000A0\x1dHELLO"));
        demux.feed(b"IMGSHP2P6F\x06!");

        assert_eq!(
            drain(&mut demux),
            vec![
                Segment::Frame(AsyncMessage::TriggerEvent),
                reply(b"IMGSNP1L\x06", true),
                Segment::Frame(AsyncMessage::BarcodeScan {
                    aim_id: 'A',
                    aim_modifier: '0',
                    data: Bytes::from_static(b"HELLO"),
                }),
                reply(b"IMGSHP2P6F\x06", true),
            ]
        );
    }

    #[test]
    fn test_trigger_release_consumed_silently() {
        let mut demux = Demultiplexer::new(1024);
        demux.feed(&build_frame(tags::TRIGGER, b"0T"));
        demux.feed(b"OK\x06!");

        assert_eq!(drain(&mut demux), vec![reply(b"OK\x06", true)]);
    }

    #[test]
    fn test_frame_split_across_reads() {
        let frame = build_frame(tags::TRIGGER, b"1T");
        let mut demux = Demultiplexer::new(1024);

        demux.feed(&frame[..4]);
        assert_eq!(demux.next_segment().unwrap(), None);
        demux.feed(&frame[4..10]);
        assert_eq!(demux.next_segment().unwrap(), None);
        demux.feed(&frame[10..]);
        assert_eq!(
            demux.next_segment().unwrap(),
            Some(Segment::Frame(AsyncMessage::TriggerEvent))
        );
    }

    #[test]
    fn test_frame_too_large() {
        let mut demux = Demultiplexer::new(64);
        demux.feed(b"\x16\xfe\xff\xff\x00\x00\r");

        let result = demux.next_segment();
        assert!(matches!(result, Err(Error::FrameTooLarge { .. })));

        demux.reset();
        demux.feed(b"OK\x06!");
        assert_eq!(drain(&mut demux), vec![reply(b"OK\x06", true)]);
    }

    #[test]
    fn test_text_overflow() {
        let mut demux = Demultiplexer::new(16);
        demux.feed(&[b'x'; 17]);

        let result = demux.next_segment();
        assert!(matches!(result, Err(Error::BufferOverflow { buffered: 17, max: 16 })));
    }

    #[test]
    fn test_reset_clears_multiline_state() {
        let mut demux = Demultiplexer::new(1024);
        demux.feed(b"\r\nfirst\r\n");
        assert_eq!(drain(&mut demux), vec![]);

        demux.reset();
        demux.feed(b"single\r\n");
        assert_eq!(drain(&mut demux), vec![Segment::Unsolicited("single".into())]);
    }

    fn sample_stream() -> Vec<u8> {
        let mut stream = Vec::new();
        stream.extend_from_slice(b"TRGMOD5\x06;DECHDR1\x06!");
        stream.extend_from_slice(&build_frame(tags::TRIGGER, b"1T"));
        stream.extend_from_slice(&build_frame(tags::TRIGGER, b"0T"));
        stream.extend_from_slice(b"\r\nline one\r\nline two\r\n");
        stream.extend_from_slice(&build_frame(tags::BARCODE, b"0000E0\x1d5012345678900"));
        let mut image = b"2P6F\x1d".to_vec();
        image.extend_from_slice(&[0xFF, 0xD8, 0x16, 0x0D, 0x0A, 0x06, 0x21, 0xFF, 0xD9]);
        stream.extend_from_slice(&build_frame(tags::IMAGE, &image));
        stream.extend_from_slice(b"BADCMD\x15.status\r\n");
        stream
    }

    proptest! {
        #[test]
        fn prop_chunking_does_not_change_segments(
            cuts in proptest::collection::vec(any::<prop::sample::Index>(), 0..12),
        ) {
            let stream = sample_stream();

            let mut whole = Demultiplexer::new(4096);
            whole.feed(&stream);
            let expected = drain(&mut whole);

            let mut points: Vec<usize> = cuts.iter().map(|c| c.index(stream.len())).collect();
            points.push(0);
            points.push(stream.len());
            points.sort_unstable();
            points.dedup();

            let mut chunked = Demultiplexer::new(4096);
            let mut actual = Vec::new();
            for window in points.windows(2) {
                chunked.feed(&stream[window[0]..window[1]]);
                actual.extend(drain(&mut chunked));
            }

            prop_assert_eq!(actual, expected);
            prop_assert_eq!(chunked.buffered(), 0);
        }
    }
}
