//! The crate-wide error type.

use alloc::string::String;

use crate::pixel::ImageType;
use crate::registry::FormatId;

/// Errors from plugin dispatch and pixel processing.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ImageError {
    #[error("unknown format id {0}")]
    UnknownFormat(FormatId),

    #[error("plugin does not implement {0}")]
    NotImplemented(&'static str),

    #[error("format {format} does not support {operation}")]
    UnsupportedOperation {
        format: FormatId,
        operation: &'static str,
    },

    #[error("plugin registration rejected: {0}")]
    RegistrationRejected(String),

    #[error("bitmap has no pixel data (header only)")]
    NoPixels,

    #[error("unsupported pixel format: {image_type:?} at {bpp} bpp")]
    UnsupportedPixelFormat { image_type: ImageType, bpp: u32 },

    #[error("dimensions too large: {width}x{height}")]
    DimensionsTooLarge { width: u32, height: u32 },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("buffer too small: need {needed} entries, got {actual}")]
    BufferTooSmall { needed: usize, actual: usize },

    #[error("unexpected end of stream")]
    UnexpectedEof,

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("i/o error: {0}")]
    Io(String),

    #[error("plugin registry is not initialised")]
    NotInitialised,
}

impl ImageError {
    pub(crate) fn unsupported_pixels(image_type: ImageType, bpp: u32) -> Self {
        ImageError::UnsupportedPixelFormat { image_type, bpp }
    }
}

#[cfg(feature = "std")]
impl From<std::io::Error> for ImageError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::UnexpectedEof => ImageError::UnexpectedEof,
            _ => ImageError::Io(alloc::format!("{e}")),
        }
    }
}
