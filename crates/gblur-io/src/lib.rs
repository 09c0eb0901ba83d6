//! # gblur-io
//!
//! Image decode and encode for the blur tool.
//!
//! - **PNG** - read any colour type, write RGB/RGBA
//! - **JPEG** - read RGB/grey/CMYK, write RGB
//!
//! [`read`] detects the input format from magic bytes, then the extension.
//! [`write`] picks the output format from the extension and falls back to
//! JPEG when the extension is missing or unknown.
//!
//! ```rust,ignore
//! let image = gblur_io::read("input.png")?;
//! // ... render ...
//! gblur_io::write("output", &rendered)?; // JPEG
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod detect;
mod error;
pub mod jpeg;
pub mod png;

pub use detect::Format;
pub use error::{IoError, IoResult};

use gblur_core::{RenderedImage, SourceImage};
use std::path::Path;
use tracing::{debug, trace};

/// Reads an image, auto-detecting the format.
pub fn read<P: AsRef<Path>>(path: P) -> IoResult<SourceImage> {
    let path = path.as_ref();
    trace!(path = %path.display(), "io::read");

    let format = Format::detect(path)?
        .ok_or_else(|| IoError::UnsupportedFormat(path.display().to_string()))?;
    let image = match format {
        Format::Png => png::read(path)?,
        Format::Jpeg => jpeg::read(path)?,
    };

    debug!(
        format = format.name(),
        width = image.width(),
        height = image.height(),
        channels = image.channels(),
        "decoded"
    );
    Ok(image)
}

/// Writes an image in the format implied by `path`.
pub fn write<P: AsRef<Path>>(path: P, image: &RenderedImage) -> IoResult<Format> {
    let path = path.as_ref();
    let format = Format::for_output(path);
    trace!(path = %path.display(), format = format.name(), "io::write");

    match format {
        Format::Png => png::write(path, image)?,
        Format::Jpeg => jpeg::write(path, image)?,
    }
    Ok(format)
}
