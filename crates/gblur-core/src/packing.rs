//! Serialization of a [`GaussianKernel`] into shader-facing memory.
//!
//! Two layouts exist:
//!
//! - **Flat**: one `f32` array of fixed capacity. Slot 0 holds the radius,
//!   slots `[1, 1+radius)` hold offsets, slots `[half, half+radius)` hold
//!   weights. The shader reads the center weight from `slot[half]` and tap
//!   `i` from `slot[1+i]` / `slot[half+i]`.
//! - **Block**: the same slot content in a standard-layout uniform block.
//!   Every array element is padded to a 16-byte stride and the `vec2`
//!   resolution follows the array.
//!
//! ```text
//! flat 101:  [r][o0 o1 .. o48][pad][w0 w1 .. w48][pad]
//!             0  1             50   51            100
//! block:     [r...][o0...]...[w0...]...  (16 bytes each)  [res.x res.y]
//! ```
//!
//! Each layout comes with a pack/unpack pair through [`KernelPacker`].

use crate::error::{Error, Result};
use crate::kernel::{GaussianKernel, MIN_RADIUS};

// ============================================================================
// Flat layout
// ============================================================================

/// Flat slot array geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatLayout {
    /// Total number of `f32` slots.
    pub capacity: usize,
    /// Index of the center weight.
    pub half: usize,
}

/// 41 slots, radius up to 19.
pub const FLAT_41: FlatLayout = FlatLayout { capacity: 41, half: 21 };

/// 101 slots, radius up to 49.
pub const FLAT_101: FlatLayout = FlatLayout { capacity: 101, half: 51 };

impl FlatLayout {
    /// Checks that both regions fit for at least the minimum radius.
    pub fn validate(&self) -> Result<()> {
        if self.largest_fit() < MIN_RADIUS as usize {
            return Err(Error::InvalidLayout { capacity: self.capacity, half: self.half });
        }
        Ok(())
    }

    /// Largest odd radius whose regions neither overlap nor overflow.
    pub fn max_radius(&self) -> usize {
        let fit = self.largest_fit();
        if fit % 2 == 0 { fit.saturating_sub(1) } else { fit }
    }

    fn largest_fit(&self) -> usize {
        if self.half == 0 || self.half > self.capacity {
            return 0;
        }
        (self.half - 1).min(self.capacity - self.half)
    }

    /// Writes `kernel` into a fresh slot array.
    ///
    /// # Panics
    ///
    /// If the kernel radius exceeds [`max_radius`](Self::max_radius). Callers
    /// size kernels by the layout's maximum, so this is a contract violation.
    pub fn pack_slots(&self, kernel: &GaussianKernel) -> Vec<f32> {
        let radius = kernel.radius();
        assert!(
            radius <= self.max_radius(),
            "radius {} does not fit a {}-slot kernel",
            radius,
            self.capacity
        );

        let mut slots = vec![0.0f32; self.capacity];
        slots[0] = radius as f32;
        slots[1..1 + radius].copy_from_slice(kernel.offsets());
        slots[self.half..self.half + radius].copy_from_slice(kernel.weights());
        slots
    }

    /// Reads a slot array back into taps.
    pub fn unpack_slots(&self, slots: &[f32]) -> Result<KernelTaps> {
        if slots.len() != self.capacity {
            return Err(Error::PackedSizeMismatch { expected: self.capacity, actual: slots.len() });
        }
        let max = self.max_radius();
        let raw = slots[0];
        // Shaders truncate slot 0 with int(), so do the same here.
        let radius = raw as usize;
        if !raw.is_finite() || raw < 1.0 || radius > max {
            return Err(Error::PackedRadius { radius: raw, max });
        }
        Ok(KernelTaps {
            radius,
            offsets: slots[1..1 + radius].to_vec(),
            weights: slots[self.half..self.half + radius].to_vec(),
        })
    }
}

// ============================================================================
// Block layout
// ============================================================================

/// Standard-layout uniform block geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLayout {
    /// Logical slot layout inside the array.
    pub slots: FlatLayout,
    /// Bytes per array element.
    pub stride: usize,
}

/// 101 slots at the portable 16-byte array stride.
pub const STD140_BLOCK: BlockLayout = BlockLayout { slots: FLAT_101, stride: 16 };

/// Size of the trailing `vec2` resolution.
pub const RESOLUTION_BYTES: usize = 8;

impl BlockLayout {
    /// Array elements in the block.
    pub fn array_count(&self) -> usize {
        self.slots.capacity
    }

    /// `array_count * stride + resolution`.
    pub fn byte_size(&self) -> usize {
        self.array_count() * self.stride + RESOLUTION_BYTES
    }

    /// Block size rounded up to the 16-byte struct alignment.
    pub fn buffer_size(&self) -> usize {
        self.byte_size().div_ceil(16) * 16
    }

    /// Byte offset of the resolution vector.
    pub fn resolution_offset(&self) -> usize {
        self.array_count() * self.stride
    }

    /// Writes `kernel` and `resolution` into a zeroed buffer of
    /// [`buffer_size`](Self::buffer_size) bytes.
    pub fn pack_bytes(&self, kernel: &GaussianKernel, resolution: [f32; 2]) -> Vec<u8> {
        let slots = self.slots.pack_slots(kernel);
        let mut bytes = vec![0u8; self.buffer_size()];
        for (i, value) in slots.iter().enumerate() {
            let at = i * self.stride;
            bytes[at..at + 4].copy_from_slice(&value.to_le_bytes());
        }
        let at = self.resolution_offset();
        bytes[at..at + 4].copy_from_slice(&resolution[0].to_le_bytes());
        bytes[at + 4..at + 8].copy_from_slice(&resolution[1].to_le_bytes());
        bytes
    }

    /// Reads a block back into taps and resolution.
    pub fn unpack_bytes(&self, bytes: &[u8]) -> Result<(KernelTaps, [f32; 2])> {
        if bytes.len() < self.byte_size() {
            return Err(Error::PackedSizeMismatch { expected: self.byte_size(), actual: bytes.len() });
        }
        let read = |at: usize| f32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
        let slots: Vec<f32> = (0..self.array_count()).map(|i| read(i * self.stride)).collect();
        let taps = self.slots.unpack_slots(&slots)?;
        let at = self.resolution_offset();
        Ok((taps, [read(at), read(at + 4)]))
    }
}

// ============================================================================
// Packed kernel and packers
// ============================================================================

/// Kernel contents recovered from a packed buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct KernelTaps {
    /// Radius read from slot 0.
    pub radius: usize,
    /// `radius` offsets.
    pub offsets: Vec<f32>,
    /// `radius` weights, center first.
    pub weights: Vec<f32>,
}

/// Kernel ready for upload, together with the working resolution the pass
/// samples at.
#[derive(Debug, Clone, PartialEq)]
pub enum PackedKernel {
    /// Flat slot array. The resolution travels in a separate uniform.
    Flat {
        /// Geometry of `slots`.
        layout: FlatLayout,
        /// `layout.capacity` floats.
        slots: Vec<f32>,
        /// Target width and height in texels.
        resolution: [f32; 2],
    },
    /// Uniform block bytes, resolution included.
    Block {
        /// Geometry of `bytes`.
        layout: BlockLayout,
        /// `layout.buffer_size()` bytes.
        bytes: Vec<u8>,
    },
}

impl PackedKernel {
    /// Raw bytes as they go into a GPU buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Flat { slots, .. } => slots.iter().flat_map(|v| v.to_le_bytes()).collect(),
            Self::Block { bytes, .. } => bytes.clone(),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Flat { .. } => "flat",
            Self::Block { .. } => "block",
        }
    }
}

/// Pack/unpack pair for one layout.
pub trait KernelPacker: Send + Sync {
    /// Serializes a kernel for a pass that renders at `resolution`.
    fn pack(&self, kernel: &GaussianKernel, resolution: [f32; 2]) -> PackedKernel;

    /// Recovers the taps and resolution a shader would see.
    fn unpack(&self, packed: &PackedKernel) -> Result<(KernelTaps, [f32; 2])>;

    /// Largest radius this packer accepts.
    fn max_radius(&self) -> usize;
}

impl KernelPacker for FlatLayout {
    fn pack(&self, kernel: &GaussianKernel, resolution: [f32; 2]) -> PackedKernel {
        PackedKernel::Flat { layout: *self, slots: self.pack_slots(kernel), resolution }
    }

    fn unpack(&self, packed: &PackedKernel) -> Result<(KernelTaps, [f32; 2])> {
        match packed {
            PackedKernel::Flat { layout, slots, resolution } if layout == self => {
                Ok((self.unpack_slots(slots)?, *resolution))
            }
            other => Err(Error::LayoutMismatch { expected: "flat", actual: other.kind() }),
        }
    }

    fn max_radius(&self) -> usize {
        FlatLayout::max_radius(self)
    }
}

impl KernelPacker for BlockLayout {
    fn pack(&self, kernel: &GaussianKernel, resolution: [f32; 2]) -> PackedKernel {
        PackedKernel::Block { layout: *self, bytes: self.pack_bytes(kernel, resolution) }
    }

    fn unpack(&self, packed: &PackedKernel) -> Result<(KernelTaps, [f32; 2])> {
        match packed {
            PackedKernel::Block { layout, bytes } if layout == self => self.unpack_bytes(bytes),
            other => Err(Error::LayoutMismatch { expected: "block", actual: other.kind() }),
        }
    }

    fn max_radius(&self) -> usize {
        self.slots.max_radius()
    }
}

/// Blur program variant, chosen once at setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KernelLayout {
    /// 41-slot flat array, radius up to 19.
    Flat41,
    /// 101-slot flat array, radius up to 49.
    #[default]
    Flat101,
    /// Standard-layout uniform block, radius up to 49.
    Block,
}

impl KernelLayout {
    /// Packer for this variant.
    pub fn packer(self) -> &'static dyn KernelPacker {
        match self {
            Self::Flat41 => &FLAT_41,
            Self::Flat101 => &FLAT_101,
            Self::Block => &STD140_BLOCK,
        }
    }

    /// Slot geometry shared by the shader template.
    pub fn slots(self) -> FlatLayout {
        match self {
            Self::Flat41 => FLAT_41,
            Self::Flat101 | Self::Block => FLAT_101,
        }
    }

    /// Largest radius the variant accepts.
    pub fn max_radius(self) -> i32 {
        self.packer().max_radius() as i32
    }

    /// Short name for logs and CLI values.
    pub fn name(self) -> &'static str {
        match self {
            Self::Flat41 => "flat41",
            Self::Flat101 => "flat101",
            Self::Block => "block",
        }
    }
}

impl std::str::FromStr for KernelLayout {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "flat41" => Ok(Self::Flat41),
            "flat101" | "flat" => Ok(Self::Flat101),
            "block" | "ubo" => Ok(Self::Block),
            other => Err(format!("unknown kernel layout '{}'", other)),
        }
    }
}
