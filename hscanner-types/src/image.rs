//! Captured images
//!
//! The scanner ships snapshots as baseline or progressive JPEG. Pixel data is
//! never decompressed here; the frame header is parsed to validate the payload
//! and to expose its geometry, and the encoded bytes are kept as-is.

use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::error::{Error, Result};

const MARKER_PREFIX: u8 = 0xFF;
const SOI: u8 = 0xD8;
const EOI: u8 = 0xD9;
const SOS: u8 = 0xDA;
const TEM: u8 = 0x01;

/// JPEG image received in an image-ship frame
#[derive(Clone, PartialEq, Eq)]
pub struct CapturedImage {
    /// Image width in pixels
    pub width: u16,

    /// Image height in pixels
    pub height: u16,

    /// Number of colour components (1 = greyscale)
    pub components: u8,

    /// Progressive (SOF2/6/10/14) rather than sequential encoding
    pub progressive: bool,

    /// Encoded JPEG bytes, exactly as shipped by the device
    pub data: Bytes,

    /// Time the frame was parsed
    pub captured_at: DateTime<Utc>,
}

impl CapturedImage {
    /// Decode the JPEG frame header of `data`
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedJpeg`] if the payload is not delimited by SOI
    /// and EOI markers or reaches the scan data without a frame header, and
    /// [`Error::InvalidGeometry`] for a zero-width or componentless frame.
    pub fn decode(data: impl Into<Bytes>) -> Result<Self> {
        let data = data.into();

        if data.len() < 4 || data[0] != MARKER_PREFIX || data[1] != SOI {
            return Err(Error::MalformedJpeg("missing start-of-image marker".into()));
        }
        // A transfer cut short still carries a valid frame header
        if !data.ends_with(&[MARKER_PREFIX, EOI]) {
            return Err(Error::MalformedJpeg("missing end-of-image marker".into()));
        }

        let mut pos = 2;
        loop {
            if pos >= data.len() || data[pos] != MARKER_PREFIX {
                return Err(Error::MalformedJpeg(format!("expected marker at offset {}", pos)));
            }
            // Skip fill bytes preceding the marker code
            while pos < data.len() && data[pos] == MARKER_PREFIX {
                pos += 1;
            }
            if pos >= data.len() {
                return Err(Error::MalformedJpeg("truncated marker".into()));
            }

            let marker = data[pos];
            pos += 1;

            // Standalone markers carry no length field
            if marker == TEM || (0xD0..=0xD7).contains(&marker) {
                continue;
            }
            if marker == EOI || marker == SOS {
                return Err(Error::MalformedJpeg("no frame header before image data".into()));
            }

            if pos + 2 > data.len() {
                return Err(Error::MalformedJpeg("truncated segment length".into()));
            }
            let length = u16::from_be_bytes([data[pos], data[pos + 1]]) as usize;
            if length < 2 || pos + length > data.len() {
                return Err(Error::MalformedJpeg(format!(
                    "segment 0x{:02X} length {} out of bounds",
                    marker, length
                )));
            }

            if is_start_of_frame(marker) {
                let segment = &data[pos + 2..pos + length];
                if segment.len() < 6 {
                    return Err(Error::MalformedJpeg("frame header too short".into()));
                }
                let height = u16::from_be_bytes([segment[1], segment[2]]);
                let width = u16::from_be_bytes([segment[3], segment[4]]);
                let components = segment[5];

                if width == 0 || components == 0 {
                    return Err(Error::InvalidGeometry {
                        width,
                        height,
                        components,
                    });
                }

                return Ok(Self {
                    width,
                    height,
                    components,
                    progressive: matches!(marker, 0xC2 | 0xC6 | 0xCA | 0xCE),
                    data,
                    captured_at: Utc::now(),
                });
            }

            pos += length;
        }
    }

    /// Size of the encoded image in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// SOF0..SOF15, excluding DHT (C4), JPG (C8) and DAC (CC)
fn is_start_of_frame(marker: u8) -> bool {
    (0xC0..=0xCF).contains(&marker) && !matches!(marker, 0xC4 | 0xC8 | 0xCC)
}

impl fmt::Debug for CapturedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapturedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("components", &self.components)
            .field("progressive", &self.progressive)
            .field("len", &self.data.len())
            .finish()
    }
}

impl fmt::Display for CapturedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Image[{}x{}, {} bytes]",
            self.width,
            self.height,
            self.data.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Minimal JPEG: SOI, APP0 stub, SOF0 for a `width`x`height` greyscale image, SOS, EOI
    fn sample_jpeg(width: u16, height: u16, sof: u8) -> Vec<u8> {
        let mut out = vec![0xFF, SOI];
        out.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x06, b'J', b'F', b'I', b'F']);
        out.extend_from_slice(&[0xFF, sof, 0x00, 0x0B, 0x08]);
        out.extend_from_slice(&height.to_be_bytes());
        out.extend_from_slice(&width.to_be_bytes());
        out.extend_from_slice(&[0x01, 0x01, 0x11, 0x00]);
        out.extend_from_slice(&[0xFF, SOS, 0x00, 0x02, 0x12, 0x34]);
        out.extend_from_slice(&[0xFF, EOI]);
        out
    }

    #[test]
    fn test_decode_baseline() {
        let jpeg = sample_jpeg(640, 480, 0xC0);
        let image = CapturedImage::decode(jpeg.clone()).unwrap();

        assert_eq!(image.width, 640);
        assert_eq!(image.height, 480);
        assert_eq!(image.components, 1);
        assert!(!image.progressive);
        assert_eq!(image.data.as_ref(), jpeg.as_slice());
    }

    #[test]
    fn test_decode_progressive() {
        let image = CapturedImage::decode(sample_jpeg(832, 640, 0xC2)).unwrap();
        assert!(image.progressive);
        assert_eq!(image.to_string(), format!("Image[832x640, {} bytes]", image.len()));
    }

    #[test]
    fn test_decode_rejects_non_jpeg() {
        let result = CapturedImage::decode(&b"BM\x00\x00\x00\x00"[..]);
        assert!(matches!(result, Err(Error::MalformedJpeg(_))));
    }

    #[test]
    fn test_decode_rejects_truncated() {
        let mut jpeg = sample_jpeg(640, 480, 0xC0);
        jpeg.truncate(12);
        assert!(CapturedImage::decode(jpeg).is_err());
    }

    #[test]
    fn test_decode_rejects_missing_end_marker() {
        let mut jpeg = sample_jpeg(640, 480, 0xC0);
        // Cut off inside the scan data, after a valid frame header
        jpeg.truncate(jpeg.len() - 4);

        let result = CapturedImage::decode(jpeg);
        assert!(matches!(result, Err(Error::MalformedJpeg(msg)) if msg.contains("end-of-image")));
    }

    #[test]
    fn test_decode_rejects_empty_geometry() {
        let result = CapturedImage::decode(sample_jpeg(0, 480, 0xC0));
        assert!(matches!(
            result,
            Err(Error::InvalidGeometry { width: 0, height: 480, components: 1 })
        ));
    }

    #[test]
    fn test_decode_rejects_scan_without_frame() {
        let jpeg = vec![0xFF, SOI, 0xFF, SOS, 0x00, 0x02, 0xFF, EOI];
        assert!(CapturedImage::decode(jpeg).is_err());
    }
}
