//! Binomial approximation of a 1-D Gaussian kernel.
//!
//! Weights come from a row of Pascal's triangle: for an odd radius `r` the
//! row index is `N = 2r + 2` and tap `i` gets `C(N, r + 1 - i)`. The two
//! outermost coefficient pairs (`C(N,0)` and `C(N,1)` on each side) are dropped
//! and the normalizer shrinks by the same amount, so
//! `weight[0] + 2 * sum(weight[1..r])` equals 1 up to float rounding.
//!
//! Offsets are a plain texel-distance table, `offset[i] = i * sigma`. `sigma`
//! is a sample spacing, not a statistical standard deviation.
//!
//! # Example
//!
//! ```rust
//! use gblur_core::kernel::GaussianKernel;
//!
//! let k = GaussianKernel::build(4, 1.0);
//! assert_eq!(k.radius(), 5);
//! assert_eq!(k.offsets()[2], 2.0);
//! ```

use tracing::{debug, warn};

/// Smallest radius any layout accepts.
pub const MIN_RADIUS: i32 = 3;

/// Largest radius the 101-slot layouts can hold.
pub const MAX_RADIUS: i32 = 49;

/// Sample spacing used when the caller passes something unusable.
pub const DEFAULT_SIGMA: f32 = 1.0;

/// Clamps `radius` into `[min, max]` and forces it odd.
///
/// Even values round up to the next odd number. If that overshoots `max`
/// (possible when `max` is even), the result steps back down by two.
///
/// ```rust
/// use gblur_core::kernel::clamp_radius;
///
/// assert_eq!(clamp_radius(0, 3, 49), 3);
/// assert_eq!(clamp_radius(4, 3, 49), 5);
/// assert_eq!(clamp_radius(1000, 3, 49), 49);
/// assert_eq!(clamp_radius(10, 5, 20), 11);
/// ```
pub fn clamp_radius(radius: i32, min: i32, max: i32) -> i32 {
    let clamped = radius.min(max).max(min);
    let odd = ((clamped >> 1) << 1) + 1;
    if odd > max { odd - 2 } else { odd }
}

/// One sample point of the kernel, applied at `+offset` and `-offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tap {
    /// Distance from the center in texels.
    pub offset: f32,
    /// Normalized weight.
    pub weight: f32,
}

/// Symmetric 1-D Gaussian kernel.
///
/// Element 0 is the center tap (offset 0). Elements `1..radius` are applied on
/// both sides of the center. Immutable once built; rebuild to change radius
/// or sigma.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianKernel {
    radius: usize,
    sigma: f32,
    offsets: Vec<f32>,
    weights: Vec<f32>,
}

impl GaussianKernel {
    /// Builds a kernel with radius bounds `[MIN_RADIUS, MAX_RADIUS]`.
    pub fn build(radius: i32, sigma: f32) -> Self {
        Self::build_bounded(radius, sigma, MIN_RADIUS, MAX_RADIUS)
    }

    /// Builds a kernel after clamping `radius` into `[min, max]`.
    pub fn build_bounded(radius: i32, sigma: f32, min: i32, max: i32) -> Self {
        let radius = clamp_radius(radius, min, max) as usize;
        let sigma = sanitize_sigma(sigma);

        let n = 2 * radius + 2;
        // Descending walk along row N, from C(N,0) at index r+1 to the
        // center C(N, r+1) at index 0.
        let mut row = vec![0f64; radius + 2];
        row[radius + 1] = 1.0;
        for i in 1..radius + 2 {
            row[radius + 1 - i] = row[radius + 2 - i] * (n - i + 1) as f64 / i as f64;
        }
        let sum = 2f64.powi(n as i32) - 2.0 * (row[radius + 1] + row[radius]);

        let weights: Vec<f32> = row[..radius].iter().map(|w| (w / sum) as f32).collect();
        let offsets: Vec<f32> = (0..radius).map(|i| i as f32 * sigma).collect();

        debug!(radius, n, sum, center = weights[0], "built gaussian kernel");

        Self { radius, sigma, offsets, weights }
    }

    /// Odd radius actually used.
    pub fn radius(&self) -> usize {
        self.radius
    }

    /// Sample spacing.
    pub fn sigma(&self) -> f32 {
        self.sigma
    }

    /// `radius` offsets, `offset[i] = i * sigma`.
    pub fn offsets(&self) -> &[f32] {
        &self.offsets
    }

    /// `radius` weights, center first.
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Weight of the center tap.
    pub fn center_weight(&self) -> f32 {
        self.weights[0]
    }

    /// Iterates over all taps, center first.
    pub fn taps(&self) -> impl Iterator<Item = Tap> + '_ {
        self.offsets
            .iter()
            .zip(&self.weights)
            .map(|(&offset, &weight)| Tap { offset, weight })
    }

    /// Center weight plus both sides of every outer tap.
    pub fn total_weight(&self) -> f32 {
        self.weights[0] + 2.0 * self.weights[1..].iter().sum::<f32>()
    }
}

fn sanitize_sigma(sigma: f32) -> f32 {
    if sigma.is_finite() && sigma > 0.0 {
        sigma
    } else {
        warn!(sigma, fallback = DEFAULT_SIGMA, "unusable sample spacing");
        DEFAULT_SIGMA
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_clamp_radius_boundaries() {
        assert_eq!(clamp_radius(0, MIN_RADIUS, MAX_RADIUS), 3);
        assert_eq!(clamp_radius(4, MIN_RADIUS, MAX_RADIUS), 5);
        assert_eq!(clamp_radius(1000, MIN_RADIUS, MAX_RADIUS), 49);
        assert_eq!(clamp_radius(10, 5, 20), 11);
        assert_eq!(clamp_radius(-5, MIN_RADIUS, MAX_RADIUS), 3);
        assert_eq!(clamp_radius(48, MIN_RADIUS, MAX_RADIUS), 49);
        assert_eq!(clamp_radius(50, MIN_RADIUS, MAX_RADIUS), 49);
    }

    #[test]
    fn test_clamp_radius_even_max() {
        assert_eq!(clamp_radius(25, 5, 20), 19);
        assert_eq!(clamp_radius(20, 5, 20), 19);
        assert_eq!(clamp_radius(2, 5, 20), 5);
    }

    #[test]
    fn test_radius_three_weights() {
        // N = 8: C(8,4)=70, C(8,3)=56, C(8,2)=28; sum = 256 - 2*(1+8) = 238
        let k = GaussianKernel::build(3, 1.0);
        assert_eq!(k.radius(), 3);
        assert_relative_eq!(k.weights()[0], 70.0 / 238.0, epsilon = 1e-7);
        assert_relative_eq!(k.weights()[1], 56.0 / 238.0, epsilon = 1e-7);
        assert_relative_eq!(k.weights()[2], 28.0 / 238.0, epsilon = 1e-7);
    }

    #[test]
    fn test_even_radius_rounds_up() {
        assert_eq!(GaussianKernel::build(6, 1.0).radius(), 7);
        assert_eq!(GaussianKernel::build(7, 1.0).radius(), 7);
    }

    #[test]
    fn test_normalized_for_every_radius() {
        for r in 1..=100 {
            let k = GaussianKernel::build(r, 1.5);
            assert!(
                (k.total_weight() - 1.0).abs() < 1e-3,
                "radius {} sums to {}",
                k.radius(),
                k.total_weight()
            );
        }
    }

    #[test]
    fn test_center_is_max_weight() {
        for r in [3, 9, 19, 49] {
            let k = GaussianKernel::build(r, 1.0);
            assert!(k.weights().iter().all(|&w| w >= 0.0));
            assert!(k.weights().iter().all(|&w| w <= k.center_weight()));
        }
    }

    #[test]
    fn test_offsets_scale_with_sigma() {
        let k = GaussianKernel::build(9, 2.5);
        for (i, tap) in k.taps().enumerate() {
            assert_eq!(tap.offset, i as f32 * 2.5);
        }
    }

    #[test]
    fn test_bad_sigma_falls_back() {
        assert_eq!(GaussianKernel::build(5, 0.0).sigma(), DEFAULT_SIGMA);
        assert_eq!(GaussianKernel::build(5, f32::NAN).sigma(), DEFAULT_SIGMA);
        assert_eq!(GaussianKernel::build(5, -2.0).sigma(), DEFAULT_SIGMA);
    }
}
