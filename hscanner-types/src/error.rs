//! Errors raised while validating payloads shipped by the scanner

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Image payload is not a complete JPEG stream
    #[error("Malformed JPEG payload: {0}")]
    MalformedJpeg(String),
    
    /// Frame header describes an image without pixels
    #[error("Invalid JPEG geometry {width}x{height} with {components} components")]
    InvalidGeometry {
        width: u16,
        height: u16,
        components: u8,
    },
}
