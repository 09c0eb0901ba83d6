//! The blur run: read, select device, render, write.

use anyhow::{Context, Result};
use tracing::{info, trace};

use gblur_gpu::{Backend, SysfsProbe, render_image, select_render_device};

use crate::Cli;

pub fn run(cli: &Cli) -> Result<()> {
    trace!(input = %cli.input.display(), output = %cli.output.display(), "blur::run");

    let image = gblur_io::read(&cli.input).with_context(|| format!("cannot read {}", cli.input.display()))?;
    let config = cli.blur_config();
    info!(
        w = image.width(),
        h = image.height(),
        radius = config.radius(),
        rounds = config.rounds(),
        layout = config.layout.name(),
        backend = cli.backend.name(),
        "Applying blur"
    );

    let device = match cli.backend {
        Backend::Wgpu => select_render_device(cli.device.as_deref(), &SysfsProbe::new(), &cli.preferred_driver),
        Backend::Cpu => None,
    };

    let rendered = render_image(&image, &config, cli.backend, device.as_ref()).context("render failed")?;

    let format = gblur_io::write(&cli.output, &rendered)
        .with_context(|| format!("cannot write {}", cli.output.display()))?;
    info!(path = %cli.output.display(), format = format.name(), "Done");

    Ok(())
}
