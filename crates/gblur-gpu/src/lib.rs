//! Separable Gaussian blur on the GPU.
//!
//! Draws full-screen passes into render targets: an optional HSL grade of
//! the source, `rounds` horizontal/vertical blur pairs at working
//! resolution, an optional brightness check with darkening, and a final
//! upsampling blit to full resolution.
//!
//! # Architecture
//!
//! ```text
//! Renderer
//!     ├── PostAdjustPipeline (HSL before, brightness after)
//!     ├── BlurPipeline (ping-pong working surfaces)
//!     ├── Compositor (blit + readback)
//!     └── GpuPrimitives trait
//!             ├── CpuPrimitives (rayon reference renderer)
//!             └── WgpuPrimitives (render pipelines)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use gblur_core::BlurConfig;
//! use gblur_gpu::{Backend, render_image};
//!
//! let out = render_image(&image, &BlurConfig::default(), Backend::Wgpu, None)?;
//! ```

pub mod backend;
pub mod device;
pub mod pipeline;
pub mod program;
pub mod shaders;

#[cfg(feature = "wgpu")]
pub mod context;

pub use backend::{Backend, BlurAxis, CpuPrimitives, GpuPrimitives, SurfaceHandle};
pub use device::{DriverProbe, RenderDevice, SysfsProbe, choose_best_card, select_render_device};
pub use pipeline::{BlurPipeline, BlurState, BrightnessReport, Compositor, PostAdjustPipeline, Renderer, render_image};
pub use program::{BlurProgram, program_for};
pub use shaders::{ProgramStage, ShaderError};

#[cfg(feature = "wgpu")]
pub use backend::WgpuPrimitives;
#[cfg(feature = "wgpu")]
pub use context::GpuContext;

use thiserror::Error;

/// GPU operation errors
#[derive(Error, Debug)]
pub enum GpuError {
    #[error("No suitable GPU adapter found")]
    NoAdapter,

    #[error("Backend not available: {0}")]
    BackendNotAvailable(String),

    #[error("Failed to create device: {0}")]
    DeviceCreation(String),

    #[error("Failed to compile shader: {0}")]
    ShaderCompilation(String),

    #[error("Shader template: {0}")]
    Template(#[from] ShaderError),

    #[error("Failed to allocate surface: {0}")]
    SurfaceAllocation(String),

    #[error("Image too large: {width}x{height} exceeds GPU limit {limit}")]
    ImageTooLarge { width: u32, height: u32, limit: u32 },

    #[error("Invalid dimensions: {0}x{1}")]
    InvalidDimensions(u32, u32),

    #[error(transparent)]
    Image(#[from] gblur_core::Error),

    #[error("GPU operation failed: {0}")]
    OperationFailed(String),
}

pub type GpuResult<T> = Result<T, GpuError>;
