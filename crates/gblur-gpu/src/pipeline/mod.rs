//! Pipeline orchestration.
//!
//! [`Renderer`] runs the stages in order on one backend:
//!
//! 1. upload the source with its mip chain
//! 2. HSL grade (optional)
//! 3. blur rounds at working resolution
//! 4. brightness measure and darken (optional)
//! 5. blit to full resolution and read back

mod adjust;
mod blur;
mod compositor;

pub use adjust::{BrightnessReport, PostAdjustPipeline, mean_alpha};
pub use blur::{BlurPipeline, BlurState};
pub use compositor::Compositor;

use tracing::{info, trace};

use gblur_core::{BlurConfig, RenderedImage, SourceImage};

use crate::backend::{Backend, CpuPrimitives, GpuPrimitives};
use crate::device::RenderDevice;
use crate::GpuResult;

/// Runs the whole pipeline on one set of primitives.
pub struct Renderer<P: GpuPrimitives> {
    prims: P,
}

impl<P: GpuPrimitives> Renderer<P> {
    /// Renderer over `prims`.
    pub fn new(prims: P) -> Self {
        Self { prims }
    }

    /// Backend primitives.
    pub fn primitives(&self) -> &P {
        &self.prims
    }

    /// Blurs `image` as configured.
    pub fn render(&self, image: &SourceImage, config: &BlurConfig) -> GpuResult<RenderedImage> {
        let (width, height) = (image.width(), image.height());
        trace!(width, height, backend = self.prims.name(), "render");
        self.prims.check_dimensions(width, height)?;

        let source = self.prims.upload(&image.to_rgba8(), width, height)?;
        let adjust = PostAdjustPipeline::new(&self.prims, config);
        let source = adjust.grade(source)?;

        let mut blur = BlurPipeline::new(&self.prims, config, width, height)?;
        blur.run(&source)?;
        drop(source);

        let darkened = if config.adjust.adjust_brightness {
            let (report, surface) = adjust.correct_brightness(blur.output())?;
            info!(mean = report.mean, darkened = report.darkened, "brightness checked");
            surface
        } else {
            None
        };
        let last = darkened.as_ref().unwrap_or_else(|| blur.output());

        Compositor::new(&self.prims).composite(last, width, height, image.channels())
    }
}

/// Renders `image` on `backend`.
///
/// `device` steers wgpu adapter choice and is ignored by the CPU backend.
pub fn render_image(
    image: &SourceImage,
    config: &BlurConfig,
    backend: Backend,
    device: Option<&RenderDevice>,
) -> GpuResult<RenderedImage> {
    match backend {
        Backend::Cpu => Renderer::new(CpuPrimitives::new()).render(image, config),
        Backend::Wgpu => {
            #[cfg(feature = "wgpu")]
            {
                let ctx = crate::context::GpuContext::for_device(device)?;
                let program = crate::program::program_for(config.layout);
                let prims = crate::backend::WgpuPrimitives::new(ctx, program.as_ref())?;
                Renderer::new(prims).render(image, config)
            }
            #[cfg(not(feature = "wgpu"))]
            {
                let _ = device;
                Err(crate::GpuError::BackendNotAvailable("wgpu feature not enabled".to_string()))
            }
        }
    }
}
