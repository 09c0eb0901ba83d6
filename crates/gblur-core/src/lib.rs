//! # gblur-core
//!
//! Host-side math and data model for separable Gaussian blur.
//!
//! - [`kernel`] - binomial Gaussian weights and offsets, radius clamping
//! - [`packing`] - flat and uniform-block kernel layouts, pack/unpack pairs
//! - [`color`] - RGB/HSL conversion and the brightness measure
//! - [`config`] - [`BlurConfig`] and [`AdjustmentState`]
//! - [`image`] - [`SourceImage`] and [`RenderedImage`] byte buffers
//!
//! Nothing here touches a GPU. The render backends in `gblur-gpu` consume
//! these types.
//!
//! ```text
//! gblur-core (this crate)
//!    ^
//!    +-- gblur-io  (decode/encode)
//!    +-- gblur-gpu (passes, pipelines)
//!    +-- gblur-cli
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod color;
pub mod config;
pub mod error;
pub mod image;
pub mod kernel;
pub mod packing;

pub use config::{AdjustmentState, BlurConfig, BrightnessPolicy};
pub use error::{Error, Result};
pub use image::{RenderedImage, SourceImage};
pub use kernel::{GaussianKernel, MAX_RADIUS, MIN_RADIUS, clamp_radius};
pub use packing::{KernelLayout, KernelPacker, KernelTaps, PackedKernel};
