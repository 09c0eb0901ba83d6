//! RGB/HSL conversion and the brightness measure.
//!
//! These are the host-side counterparts of the adjustment shaders. The GPU
//! programs and the CPU renderer both follow the same formulas, so tests here
//! pin the behaviour of both.
//!
//! All channels are normalized to `0.0..=1.0`. Hue is a fraction of a full
//! turn; achromatic colours report [`HUE_UNDEFINED`].

/// Hue reported for greys, where hue has no meaning.
pub const HUE_UNDEFINED: f32 = -1.0;

/// Chroma at or below this is treated as grey.
pub const ACHROMATIC_EPSILON: f32 = 1e-5;

/// Per-channel weights of the brightness measure.
pub const BRIGHTNESS_WEIGHTS: [f32; 3] = [0.241, 0.691, 0.068];

/// Default clamp range for the lightness and saturation multipliers.
pub const ADJUST_RANGE: (f32, f32) = (0.0, 255.0);

/// Linear RGB triple.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rgb {
    /// Red.
    pub r: f32,
    /// Green.
    pub g: f32,
    /// Blue.
    pub b: f32,
}

/// Hue, saturation, lightness.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Hsl {
    /// Hue in `[0, 1)`, or [`HUE_UNDEFINED`].
    pub h: f32,
    /// Saturation.
    pub s: f32,
    /// Lightness.
    pub l: f32,
}

impl Rgb {
    /// Creates a colour.
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Grey with every channel at `v`.
    pub const fn gray(v: f32) -> Self {
        Self { r: v, g: v, b: v }
    }
}

impl Hsl {
    /// Creates an HSL triple.
    pub const fn new(h: f32, s: f32, l: f32) -> Self {
        Self { h, s, l }
    }
}

/// Converts RGB to HSL.
///
/// Greys (max - min <= [`ACHROMATIC_EPSILON`]) return hue
/// [`HUE_UNDEFINED`] and saturation 0.
pub fn rgb_to_hsl(c: Rgb) -> Hsl {
    let max = c.r.max(c.g).max(c.b);
    let min = c.r.min(c.g).min(c.b);
    let l = (max + min) / 2.0;
    let d = max - min;

    if d <= ACHROMATIC_EPSILON {
        return Hsl::new(HUE_UNDEFINED, 0.0, l);
    }

    let s = if l > 0.5 { d / (2.0 - max - min) } else { d / (max + min) };

    let mut h = if c.r == max {
        (c.g - c.b) / d + if c.g < c.b { 6.0 } else { 0.0 }
    } else if c.g == max {
        (c.b - c.r) / d + 2.0
    } else {
        (c.r - c.g) / d + 4.0
    };
    h /= 6.0;
    if h < 0.0 {
        h += 1.0;
    }

    Hsl::new(h, s, l)
}

/// One channel of the HSL to RGB conversion.
pub fn hue_to_rgb(f1: f32, f2: f32, hue: f32) -> f32 {
    let hue = if hue < 0.0 {
        hue + 1.0
    } else if hue > 1.0 {
        hue - 1.0
    } else {
        hue
    };

    if 6.0 * hue < 1.0 {
        f1 + (f2 - f1) * 6.0 * hue
    } else if 2.0 * hue < 1.0 {
        f2
    } else if 3.0 * hue < 2.0 {
        f1 + (f2 - f1) * (2.0 / 3.0 - hue) * 6.0
    } else {
        f1
    }
}

/// Converts HSL to RGB.
///
/// Zero lightness yields black and zero saturation yields grey, whatever the
/// hue, so the [`HUE_UNDEFINED`] sentinel is safe to feed back in.
pub fn hsl_to_rgb(c: Hsl) -> Rgb {
    if c.l <= ACHROMATIC_EPSILON {
        return Rgb::gray(0.0);
    }
    if c.s <= ACHROMATIC_EPSILON {
        return Rgb::gray(c.l);
    }

    let f2 = if c.l < 0.5 { c.l * (1.0 + c.s) } else { c.l + c.s - c.s * c.l };
    let f1 = 2.0 * c.l - f2;

    Rgb::new(
        hue_to_rgb(f1, f2, c.h + 1.0 / 3.0),
        hue_to_rgb(f1, f2, c.h),
        hue_to_rgb(f1, f2, c.h - 1.0 / 3.0),
    )
}

/// Scales saturation and lightness, clamps both into `[0, 1]` and converts
/// back. Mirrors the HSL grading pass.
pub fn adjust_hsl(c: Rgb, lightness: f32, saturation: f32) -> Rgb {
    let hsl = rgb_to_hsl(c);
    hsl_to_rgb(Hsl::new(
        hsl.h,
        (hsl.s * saturation).clamp(0.0, 1.0),
        (hsl.l * lightness).clamp(0.0, 1.0),
    ))
}

/// `sqrt(dot(c*c, BRIGHTNESS_WEIGHTS))`.
///
/// Squares the input and takes the root of the weighted sum. This is kept
/// as-is rather than replaced with a textbook luma.
pub fn brightness(c: Rgb) -> f32 {
    let [wr, wg, wb] = BRIGHTNESS_WEIGHTS;
    (c.r * c.r * wr + c.g * c.g * wg + c.b * c.b * wb).sqrt()
}

/// Clamps a lightness multiplier into `[min, max]`. Non-finite means "unchanged".
pub fn clamp_lightness(lightness: f32, min: f32, max: f32) -> f32 {
    clamp_multiplier(lightness, min, max)
}

/// Clamps a saturation multiplier into `[min, max]`. Non-finite means "unchanged".
pub fn clamp_saturation(saturation: f32, min: f32, max: f32) -> f32 {
    clamp_multiplier(saturation, min, max)
}

fn clamp_multiplier(value: f32, min: f32, max: f32) -> f32 {
    let value = if value.is_finite() { value } else { 1.0 };
    value.min(max).max(min)
}
