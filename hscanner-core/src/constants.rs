//! Protocol constants

/// Control bytes used on the wire
pub mod control {
    /// Command prefix and asynchronous frame marker
    pub const SYN: u8 = 0x16;
    
    /// Command accepted
    pub const ACK: u8 = 0x06;
    
    /// Command not accepted (invalid value or range)
    pub const ENQ: u8 = 0x05;
    
    /// Command not accepted (unknown tag)
    pub const NAK: u8 = 0x15;
    
    /// Group separator preceding barcode text and image payloads
    pub const GS: u8 = 0x1D;
    
    pub const CR: u8 = b'\r';
    pub const LF: u8 = b'\n';
}

/// Menu command framing
pub mod menu {
    /// Separator between sub-commands of a batch
    pub const SEPARATOR: u8 = b';';
    
    /// Terminator that stores the setting in non-volatile memory
    pub const COMMIT: u8 = b'.';
    
    /// Terminator that applies the setting until power-down
    pub const TEMPORARY: u8 = b'!';
    
    /// All bytes that may end a sub-response
    pub const TERMINATORS: [u8; 3] = [SEPARATOR, COMMIT, TEMPORARY];
    
    /// Byte following SYN in an outgoing menu command
    pub const MENU_PREFIX: u8 = b'M';
}

/// Asynchronous frame layout
pub mod frame {
    /// Fixed header size; also added to the length field to get the frame size
    pub const HEADER_SIZE: usize = 7;
    
    /// Offset of the 3-byte little-endian payload length
    pub const LENGTH_OFFSET: usize = 2;
    
    /// Offset of the 6-character message tag
    pub const TAG_OFFSET: usize = 7;
    
    pub const TAG_SIZE: usize = 6;
    
    /// First byte scanned for message-specific markers
    pub const BODY_OFFSET: usize = TAG_OFFSET + TAG_SIZE;
}

/// Asynchronous message tags
pub mod tags {
    /// Decoded barcode
    pub const BARCODE: &[u8; 6] = b"MSGGET";
    
    /// Trigger state change
    pub const TRIGGER: &[u8; 6] = b"TRGEVT";
    
    /// Shipped image
    pub const IMAGE: &[u8; 6] = b"IMGSHP";
}

/// Default serial baud rate
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default largest accepted frame; must hold one full-resolution JPEG
pub const DEFAULT_MAX_FRAME_SIZE: usize = 600_000;

/// Default transport read buffer size
pub const DEFAULT_READ_BUFFER_SIZE: usize = 50_000;

/// Idle sleep of the receiver loop (milliseconds)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1;

/// Bounded wait for the receiver to stop on close (milliseconds)
pub const DEFAULT_CLOSE_TIMEOUT_MS: u64 = 1_000;
