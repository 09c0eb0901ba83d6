//! PNG format support.
//!
//! Reads 8-bit and 16-bit PNGs of any colour type into an 8-bit RGB or RGBA
//! [`SourceImage`]. Palette and low-bit greys are expanded by the decoder;
//! 16-bit samples keep their high byte. Writes RGB or RGBA, 8 bits.

use crate::{IoError, IoResult};
use gblur_core::{RenderedImage, SourceImage};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Reads a PNG file from the given path.
pub fn read<P: AsRef<Path>>(path: P) -> IoResult<SourceImage> {
    let file = File::open(path.as_ref())?;
    let mut decoder = png::Decoder::new(BufReader::new(file));
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder
        .read_info()
        .map_err(|e: png::DecodingError| IoError::DecodeError(e.to_string()))?;

    let buf_size = reader
        .output_buffer_size()
        .ok_or_else(|| IoError::DecodeError("cannot determine output buffer size".into()))?;
    let mut buf = vec![0u8; buf_size];
    let info = reader
        .next_frame(&mut buf)
        .map_err(|e: png::DecodingError| IoError::DecodeError(e.to_string()))?;
    let pixels = &buf[..info.buffer_size()];

    let (channels, data) = match info.color_type {
        png::ColorType::Rgb => (3, pixels.to_vec()),
        png::ColorType::Rgba => (4, pixels.to_vec()),
        png::ColorType::Grayscale => (3, pixels.iter().flat_map(|&g| [g, g, g]).collect()),
        png::ColorType::GrayscaleAlpha => {
            (4, pixels.chunks_exact(2).flat_map(|ga| [ga[0], ga[0], ga[0], ga[1]]).collect())
        }
        other => return Err(IoError::UnsupportedPixels(format!("{:?} {:?}", other, info.bit_depth))),
    };

    Ok(SourceImage::new(info.width, info.height, channels, data)?)
}

/// Writes an image to a PNG file.
pub fn write<P: AsRef<Path>>(path: P, image: &RenderedImage) -> IoResult<()> {
    let file = File::create(path.as_ref())?;
    let writer = BufWriter::new(file);

    let color_type = match image.channels() {
        3 => png::ColorType::Rgb,
        4 => png::ColorType::Rgba,
        n => return Err(IoError::EncodeError(format!("unsupported channel count: {}", n))),
    };

    let mut encoder = png::Encoder::new(writer, image.width(), image.height());
    encoder.set_color(color_type);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_compression(png::Compression::default());
    encoder.set_source_srgb(png::SrgbRenderingIntent::Perceptual);

    let mut png_writer = encoder
        .write_header()
        .map_err(|e| IoError::EncodeError(e.to_string()))?;
    png_writer
        .write_image_data(image.data())
        .map_err(|e| IoError::EncodeError(e.to_string()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> Vec<u8> {
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&[(x * 8) as u8, (y * 8) as u8, 128, 200]);
            }
        }
        data
    }

    #[test]
    fn test_roundtrip_rgb() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rgb.png");
        let image = RenderedImage::from_rgba8(32, 16, gradient(32, 16), 3).unwrap();

        write(&path, &image).expect("Failed to write PNG");
        let loaded = read(&path).expect("Failed to read PNG");

        assert_eq!(loaded.width(), 32);
        assert_eq!(loaded.height(), 16);
        assert_eq!(loaded.channels(), 3);
        assert_eq!(loaded.data(), image.data());
    }

    #[test]
    fn test_roundtrip_rgba() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rgba.png");
        let image = RenderedImage::from_rgba8(16, 16, gradient(16, 16), 4).unwrap();

        write(&path, &image).expect("Failed to write PNG");
        let loaded = read(&path).expect("Failed to read PNG");

        assert_eq!(loaded.channels(), 4);
        assert_eq!(loaded.data(), image.data());
    }
}
