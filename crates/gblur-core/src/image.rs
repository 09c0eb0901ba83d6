//! 8-bit pixel buffers exchanged with the codec and the renderer.

use crate::error::{Error, Result};

/// Decoded input image, 3 (RGB) or 4 (RGBA) interleaved channels.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceImage {
    width: u32,
    height: u32,
    channels: u8,
    data: Vec<u8>,
}

impl SourceImage {
    /// Wraps a pixel buffer after checking its size.
    pub fn new(width: u32, height: u32, channels: u8, data: Vec<u8>) -> Result<Self> {
        validate(width, height, channels, data.len())?;
        Ok(Self { width, height, channels, data })
    }

    /// Solid-colour image, handy for tests and previews.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4], channels: u8) -> Result<Self> {
        let px = &rgba[..channels.min(4) as usize];
        let data = px.repeat(width as usize * height as usize);
        Self::new(width, height, channels, data)
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// 3 or 4.
    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// True for RGBA input.
    pub fn has_alpha(&self) -> bool {
        self.channels == 4
    }

    /// Interleaved pixel bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Pixels as RGBA, alpha 255 for RGB input.
    pub fn to_rgba8(&self) -> Vec<u8> {
        if self.channels == 4 {
            return self.data.clone();
        }
        self.data.chunks_exact(3).flat_map(|p| [p[0], p[1], p[2], 255]).collect()
    }
}

/// Pixels read back from the output surface.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedImage {
    width: u32,
    height: u32,
    channels: u8,
    data: Vec<u8>,
}

impl RenderedImage {
    /// Builds from a tightly packed RGBA readback, keeping `channels`
    /// channels (3 drops alpha).
    pub fn from_rgba8(width: u32, height: u32, rgba: Vec<u8>, channels: u8) -> Result<Self> {
        validate(width, height, 4, rgba.len())?;
        let data = match channels {
            4 => rgba,
            3 => rgba.chunks_exact(4).flat_map(|p| [p[0], p[1], p[2]]).collect(),
            n => return Err(Error::UnsupportedChannels(n)),
        };
        Ok(Self { width, height, channels, data })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// 3 or 4.
    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Interleaved pixel bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the image, returning its bytes.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// RGB bytes, alpha dropped if present.
    pub fn to_rgb8(&self) -> Vec<u8> {
        if self.channels == 3 {
            return self.data.clone();
        }
        self.data.chunks_exact(4).flat_map(|p| [p[0], p[1], p[2]]).collect()
    }
}

fn validate(width: u32, height: u32, channels: u8, len: usize) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(Error::InvalidDimensions { width, height });
    }
    if channels != 3 && channels != 4 {
        return Err(Error::UnsupportedChannels(channels));
    }
    let expected = width as usize * height as usize * channels as usize;
    if len != expected {
        return Err(Error::BufferSizeMismatch { expected, actual: len });
    }
    Ok(())
}
