//! Format detection from file extensions and magic bytes.

use crate::IoResult;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// PNG format.
    Png,
    /// JPEG format.
    Jpeg,
}

impl Format {
    /// Detects the format of an existing file.
    ///
    /// Magic bytes win; the extension is the fallback.
    pub fn detect<P: AsRef<Path>>(path: P) -> IoResult<Option<Self>> {
        let path = path.as_ref();
        if let Some(format) = Self::from_magic_bytes(path)? {
            return Ok(Some(format));
        }
        Ok(Self::from_extension(path))
    }

    /// Detects format from the file extension only.
    ///
    /// `jpg` is an alias of `jpeg`. Case is ignored.
    pub fn from_extension<P: AsRef<Path>>(path: P) -> Option<Self> {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some("png") => Some(Format::Png),
            Some("jpg") | Some("jpeg") | Some("jpe") => Some(Format::Jpeg),
            _ => None,
        }
    }

    /// Output format for `path`: from the extension, JPEG when absent or
    /// unrecognized.
    pub fn for_output<P: AsRef<Path>>(path: P) -> Self {
        Self::from_extension(path).unwrap_or(Format::Jpeg)
    }

    /// Detects format from the first bytes of the file.
    pub fn from_magic_bytes<P: AsRef<Path>>(path: P) -> IoResult<Option<Self>> {
        let mut file = File::open(path)?;
        let mut header = [0u8; 8];
        let n = file.read(&mut header)?;
        Ok(Self::from_header(&header[..n]))
    }

    /// Detects format from an in-memory header.
    pub fn from_header(header: &[u8]) -> Option<Self> {
        if header.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            Some(Format::Png)
        } else if header.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Format::Jpeg)
        } else {
            None
        }
    }

    /// Lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            Format::Png => "png",
            Format::Jpeg => "jpeg",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_defaults_to_jpeg() {
        assert_eq!(Format::for_output("out.png"), Format::Png);
        assert_eq!(Format::for_output("out.PNG"), Format::Png);
        assert_eq!(Format::for_output("out.jpg"), Format::Jpeg);
        assert_eq!(Format::for_output("out"), Format::Jpeg);
        assert_eq!(Format::for_output("out.webp"), Format::Jpeg);
    }

    #[test]
    fn test_header_magic() {
        assert_eq!(Format::from_header(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(Format::Jpeg));
        assert_eq!(Format::from_header(b"\x89PNG\r\n\x1a\n"), Some(Format::Png));
        assert_eq!(Format::from_header(b"GIF89a"), None);
        assert_eq!(Format::from_header(&[]), None);
    }
}
