//! Blur program variants.
//!
//! A [`BlurProgram`] pairs a kernel layout with the shader text that reads
//! it. The variant is chosen once at setup; every pass of a run goes
//! through the same program.

use gblur_core::packing::{FLAT_41, FLAT_101, STD140_BLOCK};
use gblur_core::{GaussianKernel, KernelLayout, KernelPacker, PackedKernel};

use crate::backend::BlurAxis;
use crate::shaders::{self, KernelBinding, ProgramStage, ShaderError, TemplateParams};

/// Kernel layout plus the matching blur shaders.
pub trait BlurProgram: Send + Sync {
    /// Layout the kernel is packed in.
    fn layout(&self) -> KernelLayout;

    /// How the shader binds the kernel.
    fn binding(&self) -> KernelBinding;

    /// Packer for this layout.
    fn packer(&self) -> &'static dyn KernelPacker;

    /// Packs `kernel` for a pass rendering at `resolution`.
    fn pack(&self, kernel: &GaussianKernel, resolution: [f32; 2]) -> PackedKernel {
        self.packer().pack(kernel, resolution)
    }

    /// Largest radius the program supports.
    fn max_radius(&self) -> usize {
        self.packer().max_radius()
    }

    /// WGSL source for one axis.
    fn source(&self, axis: BlurAxis) -> Result<String, ShaderError> {
        let params = TemplateParams {
            slots: self.layout().slots(),
            binding: self.binding(),
            ..Default::default()
        };
        shaders::render_stage(axis.stage(), &params)
    }
}

/// Flat `array<f32, N>` in a storage buffer.
#[derive(Debug, Clone, Copy)]
pub struct FlatProgram {
    layout: KernelLayout,
}

impl BlurProgram for FlatProgram {
    fn layout(&self) -> KernelLayout {
        self.layout
    }

    fn binding(&self) -> KernelBinding {
        KernelBinding::Storage
    }

    fn packer(&self) -> &'static dyn KernelPacker {
        match self.layout {
            KernelLayout::Flat41 => &FLAT_41,
            _ => &FLAT_101,
        }
    }
}

/// std140 uniform block with the resolution appended.
#[derive(Debug, Clone, Copy)]
pub struct BlockProgram;

impl BlurProgram for BlockProgram {
    fn layout(&self) -> KernelLayout {
        KernelLayout::Block
    }

    fn binding(&self) -> KernelBinding {
        KernelBinding::Uniform
    }

    fn packer(&self) -> &'static dyn KernelPacker {
        &STD140_BLOCK
    }
}

/// Program for `layout`.
pub fn program_for(layout: KernelLayout) -> Box<dyn BlurProgram> {
    match layout {
        KernelLayout::Flat41 | KernelLayout::Flat101 => Box::new(FlatProgram { layout }),
        KernelLayout::Block => Box::new(BlockProgram),
    }
}

impl BlurAxis {
    /// Shader stage drawing this axis.
    pub fn stage(self) -> ProgramStage {
        match self {
            Self::Horizontal => ProgramStage::BlurHorizontal,
            Self::Vertical => ProgramStage::BlurVertical,
        }
    }
}
