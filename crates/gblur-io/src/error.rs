//! Error types for image decode and encode.

use std::io;
use thiserror::Error;

/// I/O operation error.
#[derive(Debug, Error)]
pub enum IoError {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// File contents match no supported format.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Decoding error.
    #[error("decode error: {0}")]
    DecodeError(String),

    /// Encoding error.
    #[error("encode error: {0}")]
    EncodeError(String),

    /// Unsupported colour type or bit depth.
    #[error("unsupported pixel layout: {0}")]
    UnsupportedPixels(String),

    /// Decoded pixels rejected by the image model.
    #[error(transparent)]
    Image(#[from] gblur_core::Error),
}

/// Result type for I/O operations.
pub type IoResult<T> = Result<T, IoError>;
