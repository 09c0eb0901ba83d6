//! JPEG format support.
//!
//! JPEG has no alpha channel: RGBA images lose alpha on write, and every
//! decoded image is RGB. Greyscale and CMYK input are converted to RGB.

use crate::{IoError, IoResult};
use gblur_core::{RenderedImage, SourceImage};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Default encoder quality, 1-100.
pub const DEFAULT_QUALITY: u8 = 90;

/// Reads a JPEG file from the given path.
pub fn read<P: AsRef<Path>>(path: P) -> IoResult<SourceImage> {
    let file = File::open(path.as_ref())?;
    let mut decoder = jpeg_decoder::Decoder::new(BufReader::new(file));
    let pixels = decoder
        .decode()
        .map_err(|e| IoError::DecodeError(e.to_string()))?;
    let info = decoder
        .info()
        .ok_or_else(|| IoError::DecodeError("missing JPEG info".into()))?;

    let data: Vec<u8> = match info.pixel_format {
        jpeg_decoder::PixelFormat::RGB24 => pixels,
        jpeg_decoder::PixelFormat::L8 => pixels.iter().flat_map(|&g| [g, g, g]).collect(),
        jpeg_decoder::PixelFormat::L16 => {
            // high byte of each big-endian sample
            pixels.chunks_exact(2).flat_map(|l| [l[0], l[0], l[0]]).collect()
        }
        jpeg_decoder::PixelFormat::CMYK32 => pixels
            .chunks_exact(4)
            .flat_map(|cmyk| {
                let k = 1.0 - cmyk[3] as f32 / 255.0;
                let ch = |v: u8| ((1.0 - v as f32 / 255.0) * k * 255.0) as u8;
                [ch(cmyk[0]), ch(cmyk[1]), ch(cmyk[2])]
            })
            .collect(),
    };

    Ok(SourceImage::new(info.width as u32, info.height as u32, 3, data)?)
}

/// Writes an image as baseline JPEG at `quality`.
pub fn write_with_quality<P: AsRef<Path>>(path: P, image: &RenderedImage, quality: u8) -> IoResult<()> {
    let (width, height) = (image.width(), image.height());
    if width > u16::MAX as u32 || height > u16::MAX as u32 {
        return Err(IoError::EncodeError(format!("{}x{} exceeds JPEG limits", width, height)));
    }

    let rgb = image.to_rgb8();
    let encoder = jpeg_encoder::Encoder::new_file(path.as_ref(), quality.clamp(1, 100))
        .map_err(|e| IoError::EncodeError(e.to_string()))?;
    encoder
        .encode(&rgb, width as u16, height as u16, jpeg_encoder::ColorType::Rgb)
        .map_err(|e: jpeg_encoder::EncodingError| IoError::EncodeError(e.to_string()))?;
    Ok(())
}

/// Writes an image with [`DEFAULT_QUALITY`].
pub fn write<P: AsRef<Path>>(path: P, image: &RenderedImage) -> IoResult<()> {
    write_with_quality(path, image, DEFAULT_QUALITY)
}
