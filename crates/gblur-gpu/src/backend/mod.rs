//! Render backends.
//!
//! The wgpu backend draws with render pipelines on a real adapter. The CPU
//! backend is a rayon reference renderer with the same sampling and
//! quantisation rules, used for tests and machines without a GPU. There is
//! no silent fallback: the caller picks one.

mod cpu_backend;
mod gpu_primitives;

#[cfg(feature = "wgpu")]
mod wgpu_backend;

pub use cpu_backend::{CPU_MAX_DIMENSION, CpuPrimitives, CpuSurface};
pub use gpu_primitives::{BlurAxis, GpuPrimitives, SurfaceHandle};

#[cfg(feature = "wgpu")]
pub use wgpu_backend::{WgpuPrimitives, WgpuSurface};

/// Available render backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// wgpu (Vulkan/Metal/DX12/GL).
    #[default]
    Wgpu,
    /// rayon reference renderer.
    Cpu,
}

impl Backend {
    /// Check if this backend is available on current system.
    pub fn is_available(&self) -> bool {
        match self {
            Self::Cpu => true,
            #[cfg(feature = "wgpu")]
            Self::Wgpu => WgpuPrimitives::is_available(),
            #[cfg(not(feature = "wgpu"))]
            Self::Wgpu => false,
        }
    }

    /// Lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Wgpu => "wgpu",
            Self::Cpu => "cpu",
        }
    }
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wgpu" | "gpu" => Ok(Self::Wgpu),
            "cpu" => Ok(Self::Cpu),
            other => Err(format!("unknown backend '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("cpu".parse::<Backend>().unwrap(), Backend::Cpu);
        assert_eq!("WGPU".parse::<Backend>().unwrap(), Backend::Wgpu);
        assert!("metal".parse::<Backend>().is_err());
        assert!(Backend::Cpu.is_available());
    }
}
