//! gblur - headless GPU Gaussian blur
//!
//! Reads one image, blurs it on the GPU at quarter resolution and writes the
//! upsampled result.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use gblur_core::config::DEFAULT_RADIUS;
use gblur_core::kernel::DEFAULT_SIGMA;
use gblur_core::{AdjustmentState, BlurConfig, KernelLayout};
use gblur_gpu::Backend;
use gblur_gpu::device::PREFERRED_DRIVER;

mod blur;
mod logging;

#[derive(Parser, Debug)]
#[command(name = "gblur")]
#[command(author, version, about = "Separable Gaussian blur on the GPU")]
#[command(long_about = "
Blurs a PNG or JPEG image with a two-pass separable Gaussian kernel at
quarter resolution, then upsamples back to the source size.

Examples:
  gblur photo.jpg -o soft.jpg                 # radius 19, one round
  gblur photo.png -o soft.png -r 9 -p 3       # three rounds of radius 9
  gblur photo.jpg -o soft -b                  # darken if too bright (JPEG out)
  gblur photo.jpg -o soft.png -s 0.5 -l 1.2   # grade before blurring
  gblur photo.jpg -o soft.png --backend cpu   # software renderer
")]
struct Cli {
    /// Input image
    input: PathBuf,

    /// Output image; JPEG unless the extension says otherwise
    #[arg(short, long)]
    output: PathBuf,

    /// Blur radius, forced odd and clamped to [3, 49] (19 for flat41)
    #[arg(short, long, default_value_t = DEFAULT_RADIUS, allow_negative_numbers = true)]
    radius: i32,

    /// Sample spacing in texels
    #[arg(short = 'S', long, default_value_t = DEFAULT_SIGMA, allow_negative_numbers = true)]
    sigma: f32,

    /// Blur rounds, at least 1
    #[arg(short = 'p', long = "passes", default_value_t = 1, allow_negative_numbers = true)]
    rounds: i32,

    /// Darken the result when its mean brightness exceeds 100/255
    #[arg(short = 'b', long)]
    brightness: bool,

    /// Lightness multiplier; enables HSL grading
    #[arg(short, long, allow_negative_numbers = true)]
    lightness: Option<f32>,

    /// Saturation multiplier; enables HSL grading
    #[arg(short, long, allow_negative_numbers = true)]
    saturation: Option<f32>,

    /// Render device node, e.g. /dev/dri/card0
    #[arg(short, long)]
    device: Option<PathBuf>,

    /// Render backend: wgpu, cpu
    #[arg(long, env = "GBLUR_BACKEND", default_value = "wgpu")]
    backend: Backend,

    /// Kernel layout: flat41, flat101, block
    #[arg(long, default_value = "flat101")]
    layout: KernelLayout,

    /// Level of detail the blur passes sample the source at
    #[arg(long, default_value_t = 0.0)]
    lod: f32,

    /// Driver preferred when auto-selecting a render device
    #[arg(long, env = "GBLUR_PREFERRED_DRIVER", default_value = PREFERRED_DRIVER)]
    preferred_driver: String,

    /// Verbosity (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Also write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn blur_config(&self) -> BlurConfig {
        let mut adjust = AdjustmentState::default().with_brightness(self.brightness);
        if let Some(l) = self.lightness {
            adjust = adjust.with_lightness(l);
        }
        if let Some(s) = self.saturation {
            adjust = adjust.with_saturation(s);
        }

        BlurConfig {
            radius: self.radius,
            sigma: self.sigma,
            rounds: self.rounds.max(1) as u32,
            layout: self.layout,
            source_lod: self.lod,
            adjust,
            ..Default::default()
        }
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            let msg = e.to_string();
            eprintln!("gblur: {}", msg.lines().next().unwrap_or("invalid arguments").trim_start_matches("error: "));
            return ExitCode::FAILURE;
        }
    };

    let _guard = match logging::init(cli.verbose, cli.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("gblur: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    match blur::run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "run failed");
            eprintln!("gblur: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("gblur").chain(args.iter().copied()))
    }

    #[test]
    fn test_output_required() {
        assert!(parse(&["in.png"]).is_err());
        assert!(parse(&["-o", "out.jpg"]).is_err());
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&["in.png", "-o", "out.jpg", "--backend", "cpu"]).unwrap();
        let config = cli.blur_config();
        assert_eq!(config.radius(), 19);
        assert_eq!(config.sigma, 1.0);
        assert_eq!(config.rounds(), 1);
        assert_eq!(config.layout, KernelLayout::Flat101);
        assert!(!config.adjust.adjust_brightness);
        assert!(!config.adjust.adjust_hsl);
        assert_eq!(cli.backend, Backend::Cpu);
        assert!(cli.device.is_none());
    }

    #[test]
    fn test_all_short_flags() {
        let cli = parse(&[
            "-o", "out.png", "-r", "8", "-S", "1.5", "-p", "3", "-b", "-l", "1.2", "-s", "0.4", "-d",
            "/dev/dri/card1", "in.jpg",
        ])
        .unwrap();
        let config = cli.blur_config();
        assert_eq!(config.radius(), 9);
        assert_eq!(config.sigma, 1.5);
        assert_eq!(config.rounds(), 3);
        assert!(config.adjust.adjust_brightness);
        assert!(config.adjust.adjust_hsl);
        assert_eq!(config.adjust.lightness(), 1.2);
        assert_eq!(config.adjust.saturation(), 0.4);
        assert_eq!(cli.device, Some(PathBuf::from("/dev/dri/card1")));
        assert_eq!(cli.input, PathBuf::from("in.jpg"));
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let cli = parse(&["in.png", "-o", "o", "-r", "1000", "-p", "-2", "-l", "-1", "-s", "300"]).unwrap();
        let config = cli.blur_config();
        assert_eq!(config.radius(), 49);
        assert_eq!(config.rounds(), 1);
        assert_eq!(config.adjust.lightness(), 0.0);
        assert_eq!(config.adjust.saturation(), 255.0);

        let cli = parse(&["in.png", "-o", "o", "-r", "30", "--layout", "flat41"]).unwrap();
        assert_eq!(cli.blur_config().radius(), 19);
    }

    #[test]
    fn test_nan_multipliers_leave_colours_alone() {
        let cli = parse(&["in.png", "-o", "o", "-l", "nan", "-s", "inf"]).unwrap();
        let config = cli.blur_config();
        assert!(config.adjust.adjust_hsl);
        assert_eq!(config.adjust.lightness(), 1.0);
        assert_eq!(config.adjust.saturation(), 1.0);
    }

    #[test]
    fn test_bad_values_rejected() {
        assert!(parse(&["in.png", "-o", "o", "--backend", "metal"]).is_err());
        assert!(parse(&["in.png", "-o", "o", "--layout", "ssbo"]).is_err());
        assert!(parse(&["in.png", "-o", "o", "-r", "big"]).is_err());
    }

    #[test]
    fn test_verbosity_counts() {
        let cli = parse(&["in.png", "-o", "o", "-vvv"]).unwrap();
        assert_eq!(cli.verbose, 3);
    }
}
