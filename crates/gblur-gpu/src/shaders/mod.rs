//! WGSL render programs.
//!
//! Every program is a full-screen triangle plus one fragment stage. Sources
//! are templates with `{{NAME}}` markers filled by [`render_stage`]; kernel
//! array sizes and adjustment constants are baked into the text before
//! compilation. Inputs are validated before formatting.

use gblur_core::color::BRIGHTNESS_WEIGHTS;
use gblur_core::config::DARKEN_FACTOR;
use gblur_core::packing::{FLAT_101, FlatLayout};
use thiserror::Error;

/// Template filling errors.
#[derive(Debug, Error)]
pub enum ShaderError {
    /// A marker survived substitution.
    #[error("unfilled placeholder {{{{{0}}}}}")]
    Unfilled(String),

    /// A float constant cannot be written as a WGSL literal.
    #[error("constant {name} is not finite: {value}")]
    NonFinite {
        /// Placeholder name.
        name: &'static str,
        /// Rejected value.
        value: f32,
    },

    /// Kernel slot geometry rejected.
    #[error(transparent)]
    Layout(#[from] gblur_core::Error),
}

/// One fragment program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramStage {
    /// Blur along x.
    BlurHorizontal,
    /// Blur along y.
    BlurVertical,
    /// Bilinear copy; also builds mip levels.
    Blit,
    /// RGB plus brightness in alpha.
    BrightnessMap,
    /// RGB times a constant factor.
    Darken,
    /// Lightness/saturation grade.
    Hsl,
}

impl ProgramStage {
    /// Debug label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::BlurHorizontal => "blur_h",
            Self::BlurVertical => "blur_v",
            Self::Blit => "blit",
            Self::BrightnessMap => "brightness_map",
            Self::Darken => "darken",
            Self::Hsl => "hsl",
        }
    }
}

/// How the blur stages receive the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelBinding {
    /// Read-only storage `array<f32, N>`.
    Storage,
    /// Uniform block of `vec4<f32>` elements plus resolution.
    Uniform,
}

/// Values substituted into the templates.
#[derive(Debug, Clone, Copy)]
pub struct TemplateParams {
    /// Kernel slot geometry.
    pub slots: FlatLayout,
    /// Kernel binding kind.
    pub binding: KernelBinding,
    /// HSL lightness multiplier.
    pub lightness: f32,
    /// HSL saturation multiplier.
    pub saturation: f32,
    /// Darken multiplier.
    pub darken_factor: f32,
}

impl Default for TemplateParams {
    fn default() -> Self {
        Self {
            slots: FLAT_101,
            binding: KernelBinding::Storage,
            lightness: 1.0,
            saturation: 1.0,
            darken_factor: DARKEN_FACTOR,
        }
    }
}

/// Fills the template for `stage`.
pub fn render_stage(stage: ProgramStage, params: &TemplateParams) -> Result<String, ShaderError> {
    let source = match stage {
        ProgramStage::BlurHorizontal | ProgramStage::BlurVertical => {
            params.slots.validate()?;
            let axis = if stage == ProgramStage::BlurHorizontal {
                "vec2<f32>(1.0, 0.0)"
            } else {
                "vec2<f32>(0.0, 1.0)"
            };
            let access = match params.binding {
                KernelBinding::Storage => KERNEL_STORAGE,
                KernelBinding::Uniform => KERNEL_UNIFORM,
            };
            let body = [COMMON, access, BLUR].concat();
            fill(&body, &[
                ("KERNEL_CAPACITY", params.slots.capacity.to_string()),
                ("KERNEL_HALF", params.slots.half.to_string()),
                ("AXIS", axis.to_string()),
            ])?
        }
        ProgramStage::Blit => [COMMON, BLIT].concat(),
        ProgramStage::BrightnessMap => {
            let [r, g, b] = BRIGHTNESS_WEIGHTS;
            fill(&[COMMON, BRIGHTNESS_MAP].concat(), &[
                ("WEIGHT_R", float_literal("WEIGHT_R", r)?),
                ("WEIGHT_G", float_literal("WEIGHT_G", g)?),
                ("WEIGHT_B", float_literal("WEIGHT_B", b)?),
            ])?
        }
        ProgramStage::Darken => fill(&[COMMON, DARKEN].concat(), &[
            ("DARKEN_FACTOR", float_literal("DARKEN_FACTOR", params.darken_factor)?),
        ])?,
        ProgramStage::Hsl => fill(&[COMMON, HSL].concat(), &[
            ("LIGHTNESS", float_literal("LIGHTNESS", params.lightness)?),
            ("SATURATION", float_literal("SATURATION", params.saturation)?),
        ])?,
    };

    if let Some(name) = first_placeholder(&source) {
        return Err(ShaderError::Unfilled(name));
    }
    Ok(source)
}

/// Replaces each `{{NAME}}` with its value.
pub fn fill(template: &str, values: &[(&str, String)]) -> Result<String, ShaderError> {
    let mut out = template.to_string();
    for (name, value) in values {
        out = out.replace(&format!("{{{{{}}}}}", name), value);
    }
    match first_placeholder(&out) {
        Some(name) => Err(ShaderError::Unfilled(name)),
        None => Ok(out),
    }
}

fn first_placeholder(source: &str) -> Option<String> {
    let start = source.find("{{")? + 2;
    let len = source[start..].find("}}").unwrap_or(0);
    Some(source[start..start + len].to_string())
}

/// Formats `value` as a WGSL float literal.
pub fn float_literal(name: &'static str, value: f32) -> Result<String, ShaderError> {
    if !value.is_finite() {
        return Err(ShaderError::NonFinite { name, value });
    }
    // Debug always keeps a fractional part or exponent ("1.0", "1e-7").
    Ok(format!("{:?}", value))
}

// ============================================================================
// Sources
// ============================================================================

/// Full-screen triangle. `uv` has its origin at the top-left texel.
const COMMON: &str = r#"
struct VsOut {
    @builtin(position) pos: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(@builtin(vertex_index) vi: u32) -> VsOut {
    let x = f32((vi << 1u) & 2u);
    let y = f32(vi & 2u);
    var out: VsOut;
    out.pos = vec4<f32>(x * 2.0 - 1.0, 1.0 - y * 2.0, 0.0, 1.0);
    out.uv = vec2<f32>(x, y);
    return out;
}

@group(0) @binding(0) var src_tex: texture_2d<f32>;
@group(0) @binding(1) var src_samp: sampler;
"#;

const KERNEL_STORAGE: &str = r#"
struct PassParams {
    resolution: vec2<f32>,
    lod: f32,
    pad: f32,
};

@group(0) @binding(2) var<uniform> params: PassParams;
@group(0) @binding(3) var<storage, read> kernel: array<f32, {{KERNEL_CAPACITY}}>;

fn slot(i: u32) -> f32 {
    return kernel[i];
}

fn resolution() -> vec2<f32> {
    return params.resolution;
}
"#;

const KERNEL_UNIFORM: &str = r#"
struct PassParams {
    resolution: vec2<f32>,
    lod: f32,
    pad: f32,
};

struct KernelBlock {
    kernel: array<vec4<f32>, {{KERNEL_CAPACITY}}>,
    resolution: vec2<f32>,
};

@group(0) @binding(2) var<uniform> params: PassParams;
@group(0) @binding(3) var<uniform> kernel_block: KernelBlock;

fn slot(i: u32) -> f32 {
    return kernel_block.kernel[i].x;
}

fn resolution() -> vec2<f32> {
    return kernel_block.resolution;
}
"#;

const BLUR: &str = r#"
const HALF: u32 = {{KERNEL_HALF}}u;
const AXIS: vec2<f32> = {{AXIS}};

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    let texel = AXIS / resolution();
    var color = textureSampleLevel(src_tex, src_samp, in.uv, params.lod) * slot(HALF);
    let limit = u32(slot(0u));
    for (var i = 1u; i < limit; i = i + 1u) {
        let d = texel * slot(1u + i);
        let w = slot(HALF + i);
        color += textureSampleLevel(src_tex, src_samp, in.uv + d, params.lod) * w;
        color += textureSampleLevel(src_tex, src_samp, in.uv - d, params.lod) * w;
    }
    return color;
}
"#;

const BLIT: &str = r#"
@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    return textureSampleLevel(src_tex, src_samp, in.uv, 0.0);
}
"#;

const BRIGHTNESS_MAP: &str = r#"
const WEIGHTS: vec3<f32> = vec3<f32>({{WEIGHT_R}}, {{WEIGHT_G}}, {{WEIGHT_B}});

fn brightness(c: vec4<f32>) -> f32 {
    return sqrt(dot(c.rgb * c.rgb, WEIGHTS));
}

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    let c = textureSampleLevel(src_tex, src_samp, in.uv, 0.0);
    return vec4<f32>(c.rgb, brightness(c));
}
"#;

const DARKEN: &str = r#"
const FACTOR: f32 = {{DARKEN_FACTOR}};

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    let c = textureSampleLevel(src_tex, src_samp, in.uv, 0.0);
    return vec4<f32>(c.rgb * FACTOR, c.a);
}
"#;

const HSL: &str = r#"
const LIGHTNESS: f32 = {{LIGHTNESS}};
const SATURATION: f32 = {{SATURATION}};

fn rgb_to_hsl(c: vec3<f32>) -> vec3<f32> {
    let mx = max(max(c.r, c.g), c.b);
    let mn = min(min(c.r, c.g), c.b);
    let l = (mx + mn) * 0.5;
    let d = mx - mn;
    if (d <= 0.00001) {
        return vec3<f32>(-1.0, 0.0, l);
    }
    var s: f32;
    if (l > 0.5) {
        s = d / (2.0 - mx - mn);
    } else {
        s = d / (mx + mn);
    }
    var h: f32;
    if (c.r == mx) {
        h = (c.g - c.b) / d;
        if (c.g < c.b) {
            h = h + 6.0;
        }
    } else if (c.g == mx) {
        h = (c.b - c.r) / d + 2.0;
    } else {
        h = (c.r - c.g) / d + 4.0;
    }
    h = h / 6.0;
    if (h < 0.0) {
        h = h + 1.0;
    }
    return vec3<f32>(h, s, l);
}

fn hue_to_rgb(f1: f32, f2: f32, hue_in: f32) -> f32 {
    var hue = hue_in;
    if (hue < 0.0) {
        hue = hue + 1.0;
    } else if (hue > 1.0) {
        hue = hue - 1.0;
    }
    if (6.0 * hue < 1.0) {
        return f1 + (f2 - f1) * 6.0 * hue;
    }
    if (2.0 * hue < 1.0) {
        return f2;
    }
    if (3.0 * hue < 2.0) {
        return f1 + (f2 - f1) * (2.0 / 3.0 - hue) * 6.0;
    }
    return f1;
}

fn hsl_to_rgb(hsl: vec3<f32>) -> vec3<f32> {
    if (hsl.z <= 0.00001) {
        return vec3<f32>(0.0);
    }
    if (hsl.y <= 0.00001) {
        return vec3<f32>(hsl.z);
    }
    var f2: f32;
    if (hsl.z < 0.5) {
        f2 = hsl.z * (1.0 + hsl.y);
    } else {
        f2 = hsl.z + hsl.y - hsl.y * hsl.z;
    }
    let f1 = 2.0 * hsl.z - f2;
    return vec3<f32>(
        hue_to_rgb(f1, f2, hsl.x + 1.0 / 3.0),
        hue_to_rgb(f1, f2, hsl.x),
        hue_to_rgb(f1, f2, hsl.x - 1.0 / 3.0)
    );
}

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    let c = textureSampleLevel(src_tex, src_samp, in.uv, 0.0);
    let hsl = rgb_to_hsl(c.rgb);
    let graded = vec3<f32>(hsl.x, clamp(hsl.y * SATURATION, 0.0, 1.0), clamp(hsl.z * LIGHTNESS, 0.0, 1.0));
    return vec4<f32>(hsl_to_rgb(graded), c.a);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use gblur_core::packing::FLAT_41;

    #[test]
    fn test_kernel_size_substitution() {
        let params = TemplateParams { slots: FLAT_41, ..Default::default() };
        let src = render_stage(ProgramStage::BlurVertical, &params).unwrap();
        assert!(src.contains("array<f32, 41>"));
        assert!(src.contains("const HALF: u32 = 21u;"));
        assert!(src.contains("vec2<f32>(0.0, 1.0)"));
        assert!(!src.contains("{{"));
    }

    #[test]
    fn test_block_binding() {
        let params = TemplateParams { binding: KernelBinding::Uniform, ..Default::default() };
        let src = render_stage(ProgramStage::BlurHorizontal, &params).unwrap();
        assert!(src.contains("array<vec4<f32>, 101>"));
        assert!(src.contains("var<uniform> kernel_block"));
    }

    #[test]
    fn test_adjust_constants_substituted() {
        let params = TemplateParams { lightness: 0.8, saturation: 1.2, ..Default::default() };
        let src = render_stage(ProgramStage::Hsl, &params).unwrap();
        assert!(src.contains("const LIGHTNESS: f32 = 0.8;"));
        assert!(src.contains("const SATURATION: f32 = 1.2;"));

        let src = render_stage(ProgramStage::Darken, &TemplateParams::default()).unwrap();
        assert!(src.contains("const FACTOR: f32 = 0.8;"));
    }

    #[test]
    fn test_rejects_bad_inputs() {
        let params = TemplateParams { lightness: f32::NAN, ..Default::default() };
        assert!(matches!(render_stage(ProgramStage::Hsl, &params), Err(ShaderError::NonFinite { .. })));

        let params = TemplateParams { slots: FlatLayout { capacity: 10, half: 9 }, ..Default::default() };
        assert!(matches!(render_stage(ProgramStage::BlurHorizontal, &params), Err(ShaderError::Layout(_))));
    }

    #[test]
    fn test_fill_reports_missing_marker() {
        let err = fill("a {{ONE}} b {{TWO}}", &[("ONE", "1".into())]).unwrap_err();
        assert!(matches!(err, ShaderError::Unfilled(ref n) if n == "TWO"));
        assert_eq!(fill("x{{A}}x", &[("A", "y".into())]).unwrap(), "xyx");
    }

    #[test]
    fn test_float_literal_form() {
        assert_eq!(float_literal("X", 1.0).unwrap(), "1.0");
        assert_eq!(float_literal("X", 255.0).unwrap(), "255.0");
        assert_eq!(float_literal("X", 0.241).unwrap(), "0.241");
    }
}
