//! GPU primitives abstraction for unified backend implementation.
//!
//! Every `exec_*` call is one full-screen pass: it reads `src` through a
//! clamp-to-edge linear sampler and overwrites level 0 of `dst`. Passes are
//! queued in call order; only [`GpuPrimitives::download`] waits for them.

use gblur_core::PackedKernel;

use crate::{GpuError, GpuResult};

/// Handle to an RGBA8 surface owned by a backend.
///
/// Dropping the handle releases the surface.
pub trait SurfaceHandle: Send + Sync {
    /// Width and height of level 0.
    fn dimensions(&self) -> (u32, u32);

    /// Width.
    fn width(&self) -> u32 {
        self.dimensions().0
    }

    /// Height.
    fn height(&self) -> u32 {
        self.dimensions().1
    }

    /// Number of mip levels, 1 when not mipmapped.
    fn mip_levels(&self) -> u32;

    /// Size in bytes of level 0.
    fn size_bytes(&self) -> u64 {
        let (w, h) = self.dimensions();
        w as u64 * h as u64 * 4
    }
}

/// Direction of one blur pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlurAxis {
    /// Along x.
    Horizontal,
    /// Along y.
    Vertical,
}

impl BlurAxis {
    /// Unit step in uv space before dividing by the resolution.
    pub fn direction(self) -> [f32; 2] {
        match self {
            Self::Horizontal => [1.0, 0.0],
            Self::Vertical => [0.0, 1.0],
        }
    }
}

/// Core render operations.
pub trait GpuPrimitives: Send + Sync {
    /// Backend-specific surface type.
    type Surface: SurfaceHandle;

    /// Uploads tightly packed RGBA8 pixels into a mipmapped surface and
    /// builds its mip chain.
    fn upload(&self, rgba: &[u8], width: u32, height: u32) -> GpuResult<Self::Surface>;

    /// Allocates a render target. Contents are undefined until drawn.
    fn allocate(&self, width: u32, height: u32, mipmapped: bool) -> GpuResult<Self::Surface>;

    /// Rebuilds levels 1.. of `surface` from level 0.
    fn generate_mips(&self, surface: &mut Self::Surface) -> GpuResult<()>;

    /// One separable blur pass sampling `src` at `lod`.
    fn exec_blur(
        &self,
        src: &Self::Surface,
        dst: &mut Self::Surface,
        axis: BlurAxis,
        kernel: &PackedKernel,
        lod: f32,
    ) -> GpuResult<()>;

    /// Scales HSL saturation and lightness.
    fn exec_hsl(&self, src: &Self::Surface, dst: &mut Self::Surface, lightness: f32, saturation: f32)
        -> GpuResult<()>;

    /// Copies RGB and writes brightness to alpha.
    fn exec_brightness_map(&self, src: &Self::Surface, dst: &mut Self::Surface) -> GpuResult<()>;

    /// Multiplies RGB by `factor`, alpha untouched.
    fn exec_darken(&self, src: &Self::Surface, dst: &mut Self::Surface, factor: f32) -> GpuResult<()>;

    /// Bilinear resample of `src` into `dst`.
    fn exec_blit(&self, src: &Self::Surface, dst: &mut Self::Surface) -> GpuResult<()>;

    /// Reads level 0 back as tightly packed RGBA8, waiting for queued passes.
    fn download(&self, surface: &Self::Surface) -> GpuResult<Vec<u8>>;

    /// Largest width or height a surface may have.
    fn max_dimension(&self) -> u32;

    /// Backend name.
    fn name(&self) -> &'static str;

    /// Rejects sizes the backend cannot allocate.
    fn check_dimensions(&self, width: u32, height: u32) -> GpuResult<()> {
        if width == 0 || height == 0 {
            return Err(GpuError::InvalidDimensions(width, height));
        }
        let limit = self.max_dimension();
        if width > limit || height > limit {
            return Err(GpuError::ImageTooLarge { width, height, limit });
        }
        Ok(())
    }
}

/// Mip levels in a full chain for `width` x `height`.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// Size of level `level`, never below 1x1.
pub fn mip_size(width: u32, height: u32, level: u32) -> (u32, u32) {
    ((width >> level).max(1), (height >> level).max(1))
}
