//! Error types for gblur-core operations.
//!
//! Parameter sanitization (radius, lightness, saturation) never produces an
//! error: those values are clamped. The variants here cover malformed data
//! handed across a boundary, such as a packed kernel buffer read back from a
//! shader interface or a pixel buffer whose length disagrees with its size.
//!
//! # Usage
//!
//! ```rust
//! use gblur_core::{Error, Result};
//!
//! fn check(width: u32, height: u32) -> Result<()> {
//!     if width == 0 || height == 0 {
//!         return Err(Error::InvalidDimensions { width, height });
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by kernel packing and image model validation.
#[derive(Debug, Error)]
pub enum Error {
    /// A kernel layout whose offset and weight regions overlap or overflow.
    ///
    /// The offset region is `[1, 1+radius)` and the weight region is
    /// `[half, half+radius)`. A layout is valid only when both fit inside
    /// `capacity` for at least the minimum radius.
    #[error("invalid kernel layout: capacity {capacity}, midpoint {half}")]
    InvalidLayout {
        /// Total slot count.
        capacity: usize,
        /// Index of the first weight slot.
        half: usize,
    },

    /// Packed data length does not match the layout.
    #[error("packed kernel size mismatch: expected {expected}, got {actual}")]
    PackedSizeMismatch {
        /// Expected length (slots or bytes).
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// Slot 0 of a packed kernel does not hold a usable radius.
    #[error("packed kernel radius {radius} outside 1..={max}")]
    PackedRadius {
        /// Value found in slot 0.
        radius: f32,
        /// Largest radius the layout can hold.
        max: usize,
    },

    /// A packer was asked to unpack data produced by a different layout.
    #[error("packed kernel layout mismatch: expected {expected}, got {actual}")]
    LayoutMismatch {
        /// Layout the packer handles.
        expected: &'static str,
        /// Layout of the packed data.
        actual: &'static str,
    },

    /// Zero-sized image.
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },

    /// Channel count other than 3 (RGB) or 4 (RGBA).
    #[error("unsupported channel count: {0}")]
    UnsupportedChannels(u8),

    /// Pixel buffer length disagrees with `width * height * channels`.
    #[error("pixel buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch {
        /// Expected byte count.
        expected: usize,
        /// Actual byte count.
        actual: usize,
    },
}
