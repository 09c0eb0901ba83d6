//! Pipeline configuration.
//!
//! [`BlurConfig`] is built once from user input and passed by reference to
//! every stage. Nothing reads global state.

use crate::color::{ADJUST_RANGE, clamp_lightness, clamp_saturation};
use crate::kernel::{GaussianKernel, MIN_RADIUS, clamp_radius};
use crate::packing::KernelLayout;

/// Radius used when none is given.
pub const DEFAULT_RADIUS: i32 = 19;

/// Working surfaces are this fraction of the source size.
pub const DOWNSAMPLE_FACTOR: f32 = 0.25;

/// Mean brightness (0..255) above which the darken pass runs.
pub const BRIGHTNESS_THRESHOLD: u32 = 100;

/// RGB multiplier of the darken pass.
pub const DARKEN_FACTOR: f32 = 0.8;

/// Optional colour adjustments.
///
/// The HSL multipliers are always stored clamped. Setting either one turns
/// the HSL stage on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjustmentState {
    /// Measure brightness after the blur and darken if too bright.
    pub adjust_brightness: bool,
    /// Run the HSL grading pass before the blur.
    pub adjust_hsl: bool,
    lightness: f32,
    saturation: f32,
}

impl Default for AdjustmentState {
    fn default() -> Self {
        Self { adjust_brightness: false, adjust_hsl: false, lightness: 1.0, saturation: 1.0 }
    }
}

impl AdjustmentState {
    /// Enables the brightness stage.
    pub fn with_brightness(mut self, enabled: bool) -> Self {
        self.adjust_brightness = enabled;
        self
    }

    /// Enables HSL and sets the lightness multiplier.
    pub fn with_lightness(mut self, lightness: f32) -> Self {
        let (lo, hi) = ADJUST_RANGE;
        self.adjust_hsl = true;
        self.lightness = clamp_lightness(lightness, lo, hi);
        self
    }

    /// Enables HSL and sets the saturation multiplier.
    pub fn with_saturation(mut self, saturation: f32) -> Self {
        let (lo, hi) = ADJUST_RANGE;
        self.adjust_hsl = true;
        self.saturation = clamp_saturation(saturation, lo, hi);
        self
    }

    /// Clamped lightness multiplier.
    pub fn lightness(&self) -> f32 {
        self.lightness
    }

    /// Clamped saturation multiplier.
    pub fn saturation(&self) -> f32 {
        self.saturation
    }
}

/// Brightness correction policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrightnessPolicy {
    /// Darken when the mean exceeds this (0..255 scale).
    pub threshold: u32,
    /// RGB multiplier applied when darkening.
    pub factor: f32,
}

impl Default for BrightnessPolicy {
    fn default() -> Self {
        Self { threshold: BRIGHTNESS_THRESHOLD, factor: DARKEN_FACTOR }
    }
}

impl BrightnessPolicy {
    /// True when `mean` calls for darkening.
    pub fn should_darken(&self, mean: u32) -> bool {
        mean > self.threshold
    }
}

/// Everything one blur run needs.
#[derive(Debug, Clone, PartialEq)]
pub struct BlurConfig {
    /// Requested radius, sanitized by [`radius`](Self::radius).
    pub radius: i32,
    /// Sample spacing.
    pub sigma: f32,
    /// Requested rounds, sanitized by [`rounds`](Self::rounds).
    pub rounds: u32,
    /// Blur program variant.
    pub layout: KernelLayout,
    /// Working size as a fraction of the source.
    pub downsample: f32,
    /// Level of detail the blur passes sample at.
    pub source_lod: f32,
    /// Optional adjustments.
    pub adjust: AdjustmentState,
    /// Brightness correction constants.
    pub brightness: BrightnessPolicy,
}

impl Default for BlurConfig {
    fn default() -> Self {
        Self {
            radius: DEFAULT_RADIUS,
            sigma: 1.0,
            rounds: 1,
            layout: KernelLayout::default(),
            downsample: DOWNSAMPLE_FACTOR,
            source_lod: 0.0,
            adjust: AdjustmentState::default(),
            brightness: BrightnessPolicy::default(),
        }
    }
}

impl BlurConfig {
    /// Odd radius within the layout's bounds.
    pub fn radius(&self) -> i32 {
        clamp_radius(self.radius, MIN_RADIUS, self.layout.max_radius())
    }

    /// Rounds, at least one.
    pub fn rounds(&self) -> u32 {
        self.rounds.max(1)
    }

    /// Builds the kernel for the current radius and sigma.
    pub fn build_kernel(&self) -> GaussianKernel {
        GaussianKernel::build_bounded(self.radius, self.sigma, MIN_RADIUS, self.layout.max_radius())
    }

    /// Working surface size for a `width` x `height` source, at least 1x1.
    pub fn working_size(&self, width: u32, height: u32) -> (u32, u32) {
        let scale = |v: u32| ((v as f32 * self.downsample) as u32).max(1);
        (scale(width), scale(height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = BlurConfig::default();
        assert_eq!(cfg.radius(), 19);
        assert_eq!(cfg.rounds(), 1);
        assert!(!cfg.adjust.adjust_hsl);
        assert!(!cfg.adjust.adjust_brightness);
    }

    #[test]
    fn test_radius_follows_layout() {
        let mut cfg = BlurConfig { radius: 40, ..Default::default() };
        assert_eq!(cfg.radius(), 41);
        cfg.layout = KernelLayout::Flat41;
        assert_eq!(cfg.radius(), 19);
        assert_eq!(cfg.build_kernel().radius(), 19);
    }

    #[test]
    fn test_rounds_at_least_one() {
        let cfg = BlurConfig { rounds: 0, ..Default::default() };
        assert_eq!(cfg.rounds(), 1);
    }

    #[test]
    fn test_working_size() {
        let cfg = BlurConfig::default();
        assert_eq!(cfg.working_size(100, 100), (25, 25));
        assert_eq!(cfg.working_size(1921, 1081), (480, 270));
        assert_eq!(cfg.working_size(2, 3), (1, 1));
    }

    #[test]
    fn test_hsl_multipliers_enable_and_clamp() {
        let adj = AdjustmentState::default().with_lightness(300.0);
        assert!(adj.adjust_hsl);
        assert_eq!(adj.lightness(), 255.0);
        assert_eq!(adj.saturation(), 1.0);

        let adj = AdjustmentState::default().with_saturation(-2.0);
        assert!(adj.adjust_hsl);
        assert_eq!(adj.saturation(), 0.0);
    }

    #[test]
    fn test_brightness_policy() {
        let p = BrightnessPolicy::default();
        assert!(!p.should_darken(100));
        assert!(p.should_darken(101));
    }
}
