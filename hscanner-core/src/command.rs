//! Menu command encoding
//!
//! A menu command is one or more short ASCII mnemonics (`TRGMOD0`, `DECHDR1`,
//! `IMGSNP1L`, ...) separated by `;`. On the wire it is framed as
//!
//! ```text
//! SYN 'M' CR <command text> <terminator>
//! ```
//!
//! where the terminator is `.` to commit the setting to flash or `!` to apply it
//! only until power-down. The device echoes every sub-command followed by a
//! status byte and the sub-command's own terminator.

use std::fmt;

use bytes::{BufMut, BytesMut};

use crate::{
    constants::{control, menu},
    error::{Error, Result},
};

/// Validated menu command ready to be written to the scanner
///
/// # Examples
///
/// ```
/// use hscanner_core::MenuCommand;
///
/// let command = MenuCommand::new("TRGMOD0;DECHDR1").unwrap();
/// assert_eq!(command.sub_command_count(), 2);
/// assert_eq!(&command.encode()[..], b"\x16M\rTRGMOD0;DECHDR1!");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MenuCommand {
    text: String,
    persist: bool,
}

impl MenuCommand {
    /// Create a temporary (`!`-terminated) command
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCommand`] if the text is empty, contains
    /// non-printable or non-ASCII bytes, contains a terminator character, or
    /// has an empty sub-command.
    pub fn new(text: impl Into<String>) -> Result<Self> {
        let text = text.into();

        let reason = if text.is_empty() {
            Some("command is empty")
        } else if !text.bytes().all(|b| b.is_ascii_graphic() || b == b' ') {
            Some("command must be printable ASCII")
        } else if text.bytes().any(|b| b == menu::COMMIT || b == menu::TEMPORARY) {
            Some("command must not contain '.' or '!'")
        } else if text.split(menu::SEPARATOR as char).any(str::is_empty) {
            Some("empty sub-command")
        } else {
            None
        };

        if let Some(reason) = reason {
            return Err(Error::InvalidCommand {
                command: text,
                reason,
            });
        }

        Ok(Self {
            text,
            persist: false,
        })
    }

    /// Commit the setting to flash (`.` terminator)
    pub fn persistent(mut self) -> Self {
        self.persist = true;
        self
    }

    /// Choose between flash (`.`) and temporary (`!`) storage
    pub fn with_persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }

    /// Command text without framing
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_persistent(&self) -> bool {
        self.persist
    }

    /// Number of sub-responses the device will send back
    pub fn sub_command_count(&self) -> usize {
        1 + self
            .text
            .bytes()
            .filter(|&b| b == menu::SEPARATOR)
            .count()
    }

    /// Individual mnemonics of the batch
    pub fn sub_commands(&self) -> impl Iterator<Item = &str> {
        self.text.split(menu::SEPARATOR as char)
    }

    /// Final terminator byte
    pub fn terminator(&self) -> u8 {
        if self.persist {
            menu::COMMIT
        } else {
            menu::TEMPORARY
        }
    }

    /// Encode the framed command
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(self.text.len() + 4);

        buf.put_u8(control::SYN);
        buf.put_u8(menu::MENU_PREFIX);
        buf.put_u8(control::CR);
        buf.put_slice(self.text.as_bytes());
        buf.put_u8(self.terminator());

        buf
    }

    /// `TRGMOD<n>`
    pub fn trigger_mode(mode: TriggerMode) -> Self {
        Self {
            text: format!("TRGMOD{}", mode.code()),
            persist: false,
        }
    }

    /// `DECHDR1` prefixes decoded data with an asynchronous frame header,
    /// `DECHDR0` restores plain serial output
    pub fn decode_header(enabled: bool) -> Self {
        Self {
            text: format!("DECHDR{}", u8::from(enabled)),
            persist: false,
        }
    }
}

impl fmt::Display for MenuCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.text, self.terminator() as char)
    }
}

/// Trigger operating modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TriggerMode {
    /// Default hand-held mode; a pull starts a scan
    Manual = 0,

    /// Pulls are reported as `TRGEVT` frames instead of starting a scan
    Notify = 5,
}

impl TriggerMode {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Snap-and-ship image capture batch
///
/// Builds `IMGSNP<illum>L[1T];IMGSHP2P6F[<n>S]`. The ship part always selects
/// JPEG output (`6F`), the only format the receiver decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImageCapture {
    /// Turn on the illumination LEDs for the snap
    pub illumination: bool,

    /// Hold the snap until the trigger is pulled
    pub wait_for_trigger: bool,

    /// Ship every n-th pixel (`1` = full size, `2` = half size, ...)
    pub subsample: Option<u8>,
}

impl ImageCapture {
    /// Full-size capture taken immediately
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_illumination(mut self, illumination: bool) -> Self {
        self.illumination = illumination;
        self
    }

    pub fn with_trigger_wait(mut self, wait: bool) -> Self {
        self.wait_for_trigger = wait;
        self
    }

    pub fn with_subsample(mut self, subsample: u8) -> Self {
        self.subsample = Some(subsample.clamp(1, 10));
        self
    }

    pub fn to_command(&self) -> MenuCommand {
        let mut text = format!("IMGSNP{}L", u8::from(self.illumination));
        if self.wait_for_trigger {
            text.push_str("1T");
        }
        text.push_str(";IMGSHP2P6F");
        if let Some(n) = self.subsample {
            text.push_str(&format!("{}S", n));
        }

        MenuCommand {
            text,
            persist: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_encode_temporary() {
        let command = MenuCommand::new("DECHDR1").unwrap();
        assert_eq!(&command.encode()[..], b"\x16M\rDECHDR1!");
    }

    #[test]
    fn test_encode_persistent() {
        let command = MenuCommand::new("TRGMOD0").unwrap().persistent();
        assert!(command.is_persistent());
        assert_eq!(&command.encode()[..], b"\x16M\rTRGMOD0.");
        assert_eq!(command.to_string(), "TRGMOD0.");
    }

    #[test]
    fn test_sub_command_count() {
        assert_eq!(MenuCommand::new("TRGMOD0").unwrap().sub_command_count(), 1);
        assert_eq!(MenuCommand::new("TRGMOD0;DECHDR1").unwrap().sub_command_count(), 2);

        let batch = MenuCommand::new("A1;B2;C3").unwrap();
        assert_eq!(batch.sub_command_count(), 3);
        assert_eq!(batch.sub_commands().collect::<Vec<_>>(), vec!["A1", "B2", "C3"]);
    }

    #[test]
    fn test_invalid_commands() {
        for text in ["", "TRGMOD0.", "TRG!", ";DECHDR1", "A;;B", "DEC\rHDR", "CAFÉ"] {
            let result = MenuCommand::new(text);
            assert!(
                matches!(result, Err(Error::InvalidCommand { .. })),
                "{:?} should be rejected",
                text
            );
        }
    }

    #[test]
    fn test_query_commands_allowed() {
        assert!(MenuCommand::new("TRGMOD?").is_ok());
        assert!(MenuCommand::new("REVINF").is_ok());
    }

    #[test]
    fn test_trigger_and_header_commands() {
        assert_eq!(MenuCommand::trigger_mode(TriggerMode::Manual).text(), "TRGMOD0");
        assert_eq!(MenuCommand::trigger_mode(TriggerMode::Notify).text(), "TRGMOD5");
        assert_eq!(MenuCommand::decode_header(true).text(), "DECHDR1");
        assert_eq!(MenuCommand::decode_header(false).text(), "DECHDR0");
    }

    #[test]
    fn test_image_capture_commands() {
        let blocking = ImageCapture::new()
            .with_illumination(true)
            .with_trigger_wait(true)
            .to_command();
        assert_eq!(blocking.text(), "IMGSNP1L1T;IMGSHP2P6F");
        assert_eq!(blocking.sub_command_count(), 2);

        let preview = ImageCapture::new().with_subsample(2).to_command();
        assert_eq!(preview.text(), "IMGSNP0L;IMGSHP2P6F2S");
    }
}
