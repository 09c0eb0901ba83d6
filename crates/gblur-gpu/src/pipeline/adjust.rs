//! Colour passes around the blur.
//!
//! HSL grading runs on the full-resolution source before the first round.
//! Brightness correction runs on the blurred working surface: a brightness
//! map is rendered and read back, and when its mean is above the policy
//! threshold a darkened copy replaces the blurred surface.

use tracing::{debug, info};

use gblur_core::{AdjustmentState, BlurConfig, BrightnessPolicy};

use crate::backend::{GpuPrimitives, SurfaceHandle};
use crate::GpuResult;

/// Outcome of the brightness measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrightnessReport {
    /// Mean brightness, 0..255.
    pub mean: u32,
    /// Whether the darken pass ran.
    pub darkened: bool,
}

/// Optional HSL and brightness passes.
pub struct PostAdjustPipeline<'a, P: GpuPrimitives> {
    prims: &'a P,
    adjust: AdjustmentState,
    policy: BrightnessPolicy,
}

impl<'a, P: GpuPrimitives> PostAdjustPipeline<'a, P> {
    /// Pipeline for the adjustments in `config`.
    pub fn new(prims: &'a P, config: &BlurConfig) -> Self {
        Self { prims, adjust: config.adjust, policy: config.brightness }
    }

    /// Adjustment flags and multipliers.
    pub fn adjustments(&self) -> &AdjustmentState {
        &self.adjust
    }

    /// Applies the HSL grade when enabled.
    ///
    /// The graded surface is mipmapped like the source it replaces. With HSL
    /// off, `source` is returned untouched.
    pub fn grade(&self, source: P::Surface) -> GpuResult<P::Surface> {
        if !self.adjust.adjust_hsl {
            return Ok(source);
        }
        let (w, h) = source.dimensions();
        let mut graded = self.prims.allocate(w, h, true)?;
        self.prims.exec_hsl(&source, &mut graded, self.adjust.lightness(), self.adjust.saturation())?;
        self.prims.generate_mips(&mut graded)?;
        info!(lightness = self.adjust.lightness(), saturation = self.adjust.saturation(), "hsl graded");
        Ok(graded)
    }

    /// Measures mean brightness of `blurred` and darkens it if too bright.
    ///
    /// Returns the darkened copy when the darken pass ran.
    pub fn correct_brightness(&self, blurred: &P::Surface) -> GpuResult<(BrightnessReport, Option<P::Surface>)> {
        let (w, h) = blurred.dimensions();
        let mut map = self.prims.allocate(w, h, false)?;
        self.prims.exec_brightness_map(blurred, &mut map)?;
        let mean = mean_alpha(&self.prims.download(&map)?);
        debug!(mean, threshold = self.policy.threshold, "brightness measured");

        if !self.policy.should_darken(mean) {
            return Ok((BrightnessReport { mean, darkened: false }, None));
        }

        // reuse the map surface as the darken target
        self.prims.exec_darken(blurred, &mut map, self.policy.factor)?;
        info!(mean, factor = self.policy.factor, "darkened");
        Ok((BrightnessReport { mean, darkened: true }, Some(map)))
    }
}

/// Integer mean of the alpha bytes of an RGBA8 buffer; 0 when empty.
pub fn mean_alpha(rgba: &[u8]) -> u32 {
    let count = (rgba.len() / 4) as u64;
    if count == 0 {
        return 0;
    }
    let sum: u64 = rgba.chunks_exact(4).map(|p| p[3] as u64).sum();
    (sum / count) as u32
}
