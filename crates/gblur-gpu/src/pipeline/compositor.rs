//! Final upsample and readback.

use tracing::debug;

use gblur_core::RenderedImage;

use crate::backend::{GpuPrimitives, SurfaceHandle};
use crate::GpuResult;

/// Blits a working surface to full resolution and reads it back.
pub struct Compositor<'a, P: GpuPrimitives> {
    prims: &'a P,
}

impl<'a, P: GpuPrimitives> Compositor<'a, P> {
    /// Compositor drawing with `prims`.
    pub fn new(prims: &'a P) -> Self {
        Self { prims }
    }

    /// Draws `last` into a `width` x `height` target and returns the pixels
    /// with `channels` channels (3 drops alpha). Alpha is always opaque.
    pub fn composite(&self, last: &P::Surface, width: u32, height: u32, channels: u8) -> GpuResult<RenderedImage> {
        let mut target = self.prims.allocate(width, height, false)?;
        self.prims.exec_blit(last, &mut target)?;
        let mut rgba = self.prims.download(&target)?;
        rgba.chunks_exact_mut(4).for_each(|p| p[3] = u8::MAX);
        debug!(from = ?last.dimensions(), to = ?(width, height), "composited");
        Ok(RenderedImage::from_rgba8(width, height, rgba, channels)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CpuPrimitives;

    #[test]
    fn test_upsample_solid() {
        let prims = CpuPrimitives::new();
        let small = prims.upload(&[12u8, 34, 56, 255].repeat(4), 2, 2).unwrap();
        let image = Compositor::new(&prims).composite(&small, 8, 8, 3).unwrap();
        assert_eq!((image.width(), image.height(), image.channels()), (8, 8, 3));
        assert!(image.data().chunks_exact(3).all(|p| p == [12, 34, 56]));
    }

    #[test]
    fn test_alpha_forced_opaque() {
        let prims = CpuPrimitives::new();
        let small = prims.upload(&[12u8, 34, 56, 7].repeat(4), 2, 2).unwrap();
        let image = Compositor::new(&prims).composite(&small, 4, 4, 4).unwrap();
        assert!(image.data().chunks_exact(4).all(|p| p == [12, 34, 56, 255]));
    }
}
