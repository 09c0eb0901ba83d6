//! CPU backend using rayon for parallelization.
//!
//! A software rasteriser for the same full-screen passes the wgpu backend
//! draws. Sampling follows the GPU rules: texel centres at half-integer
//! coordinates, clamp-to-edge addressing, bilinear filtering within a level
//! and linear blending between levels. Every render target stores 8-bit
//! values, so each written texel is quantised.

use rayon::prelude::*;
use tracing::trace;

use gblur_core::color::{Rgb, adjust_hsl, brightness};
use gblur_core::{KernelPacker, PackedKernel};

use super::gpu_primitives::{BlurAxis, GpuPrimitives, SurfaceHandle, mip_level_count, mip_size};
use crate::{GpuError, GpuResult};

/// Largest surface edge the CPU renderer accepts.
pub const CPU_MAX_DIMENSION: u32 = 32768;

type Texel = [f32; 4];

struct Level {
    width: u32,
    height: u32,
    texels: Vec<Texel>,
}

impl Level {
    fn new(width: u32, height: u32) -> Self {
        Self { width, height, texels: vec![[0.0; 4]; width as usize * height as usize] }
    }

    fn fetch(&self, x: i64, y: i64) -> Texel {
        let x = x.clamp(0, self.width as i64 - 1) as usize;
        let y = y.clamp(0, self.height as i64 - 1) as usize;
        self.texels[y * self.width as usize + x]
    }

    fn sample(&self, [u, v]: [f32; 2]) -> Texel {
        let x = u * self.width as f32 - 0.5;
        let y = v * self.height as f32 - 0.5;
        let (x0, y0) = (x.floor(), y.floor());
        let (fx, fy) = (x - x0, y - y0);
        let (x0, y0) = (x0 as i64, y0 as i64);

        let top = lerp(self.fetch(x0, y0), self.fetch(x0 + 1, y0), fx);
        let bottom = lerp(self.fetch(x0, y0 + 1), self.fetch(x0 + 1, y0 + 1), fx);
        lerp(top, bottom, fy)
    }
}

/// CPU surface: an RGBA `f32` mip chain holding 8-bit values.
pub struct CpuSurface {
    levels: Vec<Level>,
}

impl CpuSurface {
    fn new(width: u32, height: u32, mip_levels: u32) -> Self {
        let levels = (0..mip_levels)
            .map(|l| {
                let (w, h) = mip_size(width, height, l);
                Level::new(w, h)
            })
            .collect();
        Self { levels }
    }

    fn sample_lod(&self, uv: [f32; 2], lod: f32) -> Texel {
        let max = (self.levels.len() - 1) as f32;
        let lod = if lod.is_finite() { lod.clamp(0.0, max) } else { 0.0 };
        let base = lod.floor() as usize;
        let t = lod - base as f32;

        let near = self.levels[base].sample(uv);
        match self.levels.get(base + 1) {
            Some(next) if t > 0.0 => lerp(near, next.sample(uv), t),
            _ => near,
        }
    }

    /// Texel of level 0 as 8-bit RGBA.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        to_u8(self.levels[0].fetch(x as i64, y as i64))
    }
}

impl SurfaceHandle for CpuSurface {
    fn dimensions(&self) -> (u32, u32) {
        (self.levels[0].width, self.levels[0].height)
    }

    fn mip_levels(&self) -> u32 {
        self.levels.len() as u32
    }
}

/// CPU primitives implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpuPrimitives;

impl CpuPrimitives {
    /// Creates the CPU renderer.
    pub fn new() -> Self {
        Self
    }
}

/// Runs `shade` for every texel centre of level 0 of `dst`.
fn draw<F>(dst: &mut CpuSurface, shade: F)
where
    F: Fn([f32; 2]) -> Texel + Sync,
{
    draw_level(&mut dst.levels[0], shade);
}

fn draw_level<F>(level: &mut Level, shade: F)
where
    F: Fn([f32; 2]) -> Texel + Sync,
{
    let (w, h) = (level.width as usize, level.height as f32);
    level.texels.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        let v = (y as f32 + 0.5) / h;
        for (x, out) in row.iter_mut().enumerate() {
            let u = (x as f32 + 0.5) / w as f32;
            *out = quantize(shade([u, v]));
        }
    });
}

impl GpuPrimitives for CpuPrimitives {
    type Surface = CpuSurface;

    fn upload(&self, rgba: &[u8], width: u32, height: u32) -> GpuResult<Self::Surface> {
        self.check_dimensions(width, height)?;
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(gblur_core::Error::BufferSizeMismatch { expected, actual: rgba.len() }.into());
        }
        trace!(width, height, "cpu::upload");

        let mut surface = CpuSurface::new(width, height, mip_level_count(width, height));
        surface.levels[0]
            .texels
            .par_iter_mut()
            .zip(rgba.par_chunks_exact(4))
            .for_each(|(t, p)| *t = [p[0], p[1], p[2], p[3]].map(|c| c as f32 / 255.0));
        self.generate_mips(&mut surface)?;
        Ok(surface)
    }

    fn allocate(&self, width: u32, height: u32, mipmapped: bool) -> GpuResult<Self::Surface> {
        self.check_dimensions(width, height)?;
        trace!(width, height, mipmapped, "cpu::allocate");
        let levels = if mipmapped { mip_level_count(width, height) } else { 1 };
        Ok(CpuSurface::new(width, height, levels))
    }

    fn generate_mips(&self, surface: &mut Self::Surface) -> GpuResult<()> {
        for i in 1..surface.levels.len() {
            let (above, rest) = surface.levels.split_at_mut(i);
            let prev = &above[i - 1];
            draw_level(&mut rest[0], |uv| prev.sample(uv));
        }
        Ok(())
    }

    fn exec_blur(
        &self,
        src: &Self::Surface,
        dst: &mut Self::Surface,
        axis: BlurAxis,
        kernel: &PackedKernel,
        lod: f32,
    ) -> GpuResult<()> {
        let (taps, resolution) = match kernel {
            PackedKernel::Flat { layout, .. } => layout.unpack(kernel)?,
            PackedKernel::Block { layout, .. } => layout.unpack(kernel)?,
        };
        if taps.weights.is_empty() {
            return Err(GpuError::OperationFailed("empty kernel".into()));
        }
        let [ax, ay] = axis.direction();
        let texel = [ax / resolution[0], ay / resolution[1]];

        draw(dst, |[u, v]| {
            let mut color = scale(src.sample_lod([u, v], lod), taps.weights[0]);
            for i in 1..taps.radius {
                let (dx, dy) = (texel[0] * taps.offsets[i], texel[1] * taps.offsets[i]);
                let w = taps.weights[i];
                color = add(color, scale(src.sample_lod([u + dx, v + dy], lod), w));
                color = add(color, scale(src.sample_lod([u - dx, v - dy], lod), w));
            }
            color
        });
        Ok(())
    }

    fn exec_hsl(&self, src: &Self::Surface, dst: &mut Self::Surface, lightness: f32, saturation: f32)
        -> GpuResult<()>
    {
        draw(dst, |uv| {
            let [r, g, b, a] = src.sample_lod(uv, 0.0);
            let c = adjust_hsl(Rgb::new(r, g, b), lightness, saturation);
            [c.r, c.g, c.b, a]
        });
        Ok(())
    }

    fn exec_brightness_map(&self, src: &Self::Surface, dst: &mut Self::Surface) -> GpuResult<()> {
        draw(dst, |uv| {
            let [r, g, b, _] = src.sample_lod(uv, 0.0);
            [r, g, b, brightness(Rgb::new(r, g, b))]
        });
        Ok(())
    }

    fn exec_darken(&self, src: &Self::Surface, dst: &mut Self::Surface, factor: f32) -> GpuResult<()> {
        draw(dst, |uv| {
            let [r, g, b, a] = src.sample_lod(uv, 0.0);
            [r * factor, g * factor, b * factor, a]
        });
        Ok(())
    }

    fn exec_blit(&self, src: &Self::Surface, dst: &mut Self::Surface) -> GpuResult<()> {
        draw(dst, |uv| src.sample_lod(uv, 0.0));
        Ok(())
    }

    fn download(&self, surface: &Self::Surface) -> GpuResult<Vec<u8>> {
        Ok(surface.levels[0].texels.par_iter().flat_map_iter(|&t| to_u8(t)).collect())
    }

    fn max_dimension(&self) -> u32 {
        CPU_MAX_DIMENSION
    }

    fn name(&self) -> &'static str {
        "cpu"
    }
}

// ============================================================================
// Texel math
// ============================================================================

fn lerp(a: Texel, b: Texel, t: f32) -> Texel {
    std::array::from_fn(|i| a[i] + (b[i] - a[i]) * t)
}

fn add(a: Texel, b: Texel) -> Texel {
    std::array::from_fn(|i| a[i] + b[i])
}

fn scale(a: Texel, s: f32) -> Texel {
    a.map(|c| c * s)
}

fn quantize(t: Texel) -> Texel {
    t.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() / 255.0)
}

fn to_u8(t: Texel) -> [u8; 4] {
    t.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gblur_core::GaussianKernel;
    use gblur_core::packing::{FLAT_101, STD140_BLOCK};

    fn ramp(width: u32, height: u32) -> Vec<u8> {
        (0..width * height)
            .flat_map(|i| {
                let x = (i % width) as u8;
                [x.wrapping_mul(16), 128, 255 - x.wrapping_mul(16), 255]
            })
            .collect()
    }

    #[test]
    fn test_upload_download() {
        let prims = CpuPrimitives::new();
        let rgba = ramp(8, 4);
        let surface = prims.upload(&rgba, 8, 4).unwrap();
        assert_eq!(surface.mip_levels(), 4);
        assert_eq!(prims.download(&surface).unwrap(), rgba);
    }

    #[test]
    fn test_upload_checks_size() {
        let prims = CpuPrimitives::new();
        assert!(prims.upload(&[0; 12], 2, 2).is_err());
        assert!(matches!(prims.allocate(0, 4, false), Err(GpuError::InvalidDimensions(0, 4))));
        assert!(matches!(
            prims.allocate(CPU_MAX_DIMENSION + 1, 4, false),
            Err(GpuError::ImageTooLarge { .. })
        ));
    }

    #[test]
    fn test_blit_same_size_is_copy() {
        let prims = CpuPrimitives::new();
        let rgba = ramp(16, 3);
        let src = prims.upload(&rgba, 16, 3).unwrap();
        let mut dst = prims.allocate(16, 3, false).unwrap();
        prims.exec_blit(&src, &mut dst).unwrap();
        assert_eq!(prims.download(&dst).unwrap(), rgba);
    }

    #[test]
    fn test_mips_of_solid_are_solid() {
        let prims = CpuPrimitives::new();
        let rgba = [10u8, 200, 30, 255].repeat(37 * 21);
        let surface = prims.upload(&rgba, 37, 21).unwrap();
        for level in &surface.levels {
            assert!(level.texels.iter().all(|&t| to_u8(t) == [10, 200, 30, 255]));
        }
    }

    #[test]
    fn test_blur_layouts_agree() {
        let prims = CpuPrimitives::new();
        let src = prims.upload(&ramp(16, 16), 16, 16).unwrap();
        let kernel = GaussianKernel::build(7, 1.0);

        let mut flat = prims.allocate(16, 16, false).unwrap();
        let mut block = prims.allocate(16, 16, false).unwrap();
        let packed_flat = FLAT_101.pack(&kernel, [16.0, 16.0]);
        let packed_block = STD140_BLOCK.pack(&kernel, [16.0, 16.0]);
        prims.exec_blur(&src, &mut flat, BlurAxis::Horizontal, &packed_flat, 0.0).unwrap();
        prims.exec_blur(&src, &mut block, BlurAxis::Horizontal, &packed_block, 0.0).unwrap();

        assert_eq!(prims.download(&flat).unwrap(), prims.download(&block).unwrap());
    }

    #[test]
    fn test_vertical_blur_keeps_columns() {
        // every column is constant, so a vertical pass changes nothing
        let prims = CpuPrimitives::new();
        let rgba = ramp(16, 8);
        let src = prims.upload(&rgba, 16, 8).unwrap();
        let mut dst = prims.allocate(16, 8, false).unwrap();
        let packed = FLAT_101.pack(&GaussianKernel::build(9, 1.0), [16.0, 8.0]);
        prims.exec_blur(&src, &mut dst, BlurAxis::Vertical, &packed, 0.0).unwrap();
        assert_eq!(prims.download(&dst).unwrap(), rgba);
    }

    #[test]
    fn test_darken_and_brightness_map() {
        let prims = CpuPrimitives::new();
        let src = prims.upload(&[200u8, 100, 50, 255].repeat(4), 2, 2).unwrap();

        let mut dark = prims.allocate(2, 2, false).unwrap();
        prims.exec_darken(&src, &mut dark, 0.5).unwrap();
        assert_eq!(dark.pixel(1, 1), [100, 50, 25, 255]);

        let mut map = prims.allocate(2, 2, false).unwrap();
        prims.exec_brightness_map(&src, &mut map).unwrap();
        let expected = brightness(Rgb::new(200.0 / 255.0, 100.0 / 255.0, 50.0 / 255.0));
        let [r, g, b, a] = map.pixel(0, 0);
        assert_eq!([r, g, b], [200, 100, 50]);
        assert_eq!(a, (expected * 255.0).round() as u8);
    }
}
