//! Asynchronous frame structure and message decoding

use std::fmt;

use byteorder::{ByteOrder, LittleEndian};
use bytes::Bytes;

use crate::constants::{control, frame as layout, tags};

/// Header of an asynchronous frame
///
/// # Frame Structure
///
/// ```text
/// ┌───────┬───────┬──────────────┬───────┬──────────┬──────────────────┐
/// │  SYN  │   ?   │ Payload len  │   ?   │   Tag    │       Body       │
/// │ 1 byte│ 1 byte│ 3 bytes (LE) │ 1 byte│ 6 bytes  │ len - 6 bytes    │
/// └───────┴───────┴──────────────┴───────┴──────────┴──────────────────┘
/// ```
///
/// The frame occupies `payload_len + 7` bytes in total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Value of the length field
    pub payload_len: usize,
}

impl FrameHeader {
    /// Parse the header at the start of `buf`
    ///
    /// Returns `None` until at least [`HEADER_SIZE`](crate::constants::frame::HEADER_SIZE) bytes are present.
    ///
    /// # Examples
    ///
    /// ```
    /// use hscanner_core::FrameHeader;
    ///
    /// let header = FrameHeader::parse(b"\x16\xfe\x10\x00\x00\x00\r").unwrap();
    /// assert_eq!(header.frame_len(), 0x10 + 7);
    /// ```
    pub fn parse(buf: &[u8]) -> Option<Self> {
        if buf.len() < layout::HEADER_SIZE {
            return None;
        }

        let start = layout::LENGTH_OFFSET;
        let payload_len = LittleEndian::read_u24(&buf[start..start + 3]) as usize;

        Some(Self { payload_len })
    }

    /// Total number of bytes occupied by the frame
    pub fn frame_len(&self) -> usize {
        self.payload_len + layout::HEADER_SIZE
    }
}

/// Message carried by a complete asynchronous frame
#[derive(Clone, PartialEq, Eq)]
pub enum AsyncMessage {
    /// Trigger pulled
    TriggerEvent,

    /// Barcode decoded by the scanner
    BarcodeScan {
        aim_id: char,
        aim_modifier: char,
        data: Bytes,
    },

    /// Shipped image; `None` when the frame carried no payload marker
    ImageFrame { jpeg: Option<Bytes> },

    /// Frame with a tag this driver does not handle
    Unknown { tag: String },
}

impl AsyncMessage {
    /// Decode a complete frame
    ///
    /// `frame` must hold exactly one frame as delimited by its header. Returns
    /// `None` for recognised frames that carry no event: a trigger release,
    /// or a barcode frame without a group separator.
    pub fn decode(frame: &Bytes) -> Option<Self> {
        let body = layout::BODY_OFFSET;

        if frame.len() < body {
            let tag = frame.get(layout::TAG_OFFSET..).unwrap_or_default();
            return Some(Self::Unknown {
                tag: String::from_utf8_lossy(tag).into_owned(),
            });
        }

        let tag = &frame[layout::TAG_OFFSET..body];

        if tag == tags::BARCODE {
            let gs = find_separator(frame)?;
            Some(Self::BarcodeScan {
                aim_id: frame[gs - 2] as char,
                aim_modifier: frame[gs - 1] as char,
                data: frame.slice(gs + 1..),
            })
        } else if tag == tags::TRIGGER {
            // Only a 'T' whose state flag is not '0' marks a pull
            (body..frame.len())
                .any(|i| frame[i] == b'T' && frame[i - 1] != b'0')
                .then_some(Self::TriggerEvent)
        } else if tag == tags::IMAGE {
            Some(Self::ImageFrame {
                jpeg: find_separator(frame).map(|gs| frame.slice(gs + 1..)),
            })
        } else {
            Some(Self::Unknown {
                tag: String::from_utf8_lossy(tag).into_owned(),
            })
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::TriggerEvent => "TRGEVT",
            Self::BarcodeScan { .. } => "MSGGET",
            Self::ImageFrame { .. } => "IMGSHP",
            Self::Unknown { .. } => "UNKNOWN",
        }
    }
}

/// Position of the first group separator in the frame body
fn find_separator(frame: &[u8]) -> Option<usize> {
    frame
        .iter()
        .skip(layout::BODY_OFFSET)
        .position(|&b| b == control::GS)
        .map(|i| i + layout::BODY_OFFSET)
}

impl fmt::Debug for AsyncMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TriggerEvent => f.write_str("TriggerEvent"),
            Self::BarcodeScan {
                aim_id,
                aim_modifier,
                data,
            } => f
                .debug_struct("BarcodeScan")
                .field("aim_id", aim_id)
                .field("aim_modifier", aim_modifier)
                .field("data", &String::from_utf8_lossy(data))
                .finish(),
            Self::ImageFrame { jpeg } => f
                .debug_struct("ImageFrame")
                .field("jpeg_len", &jpeg.as_ref().map(Bytes::len))
                .finish(),
            Self::Unknown { tag } => f.debug_struct("Unknown").field("tag", tag).finish(),
        }
    }
}

/// Build a frame around `tag` and `body`, as the scanner would send it
#[cfg(any(test, feature = "test-util"))]
pub fn build_frame(tag: &[u8; 6], body: &[u8]) -> Bytes {
    use bytes::{BufMut, BytesMut};

    let payload_len = tag.len() + body.len();
    let mut buf = BytesMut::with_capacity(payload_len + layout::HEADER_SIZE);
    buf.put_u8(control::SYN);
    buf.put_u8(0xFE);
    buf.put_uint_le(payload_len as u64, 3);
    buf.put_u8(0x00);
    buf.put_u8(control::CR);
    buf.put_slice(tag);
    buf.put_slice(body);
    buf.freeze()
}
