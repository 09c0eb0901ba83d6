//! GPU context and device management

use std::sync::Arc;
use tracing::{debug, info, warn};
use wgpu::{Adapter, Device, DeviceDescriptor, Features, Instance, Queue};

use crate::device::RenderDevice;
use crate::{GpuError, GpuResult};

/// GPU context holding device and queue
pub struct GpuContext {
    pub(crate) device: Arc<Device>,
    pub(crate) queue: Arc<Queue>,
    adapter_info: wgpu::AdapterInfo,
    max_texture_dimension: u32,
}

impl GpuContext {
    /// Create context on wgpu's high-performance default adapter
    pub fn new() -> GpuResult<Self> {
        Self::for_device(None)
    }

    /// Create context on the adapter backing `card`, if one matches
    pub fn for_device(card: Option<&RenderDevice>) -> GpuResult<Self> {
        pollster::block_on(Self::new_async(card))
    }

    /// Async context creation
    async fn new_async(card: Option<&RenderDevice>) -> GpuResult<Self> {
        let instance = Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = match card.and_then(|c| match_adapter(&instance, c)) {
            Some(adapter) => adapter,
            None => {
                if let Some(card) = card {
                    warn!(path = %card.path.display(), "no adapter matches render device, using default");
                }
                instance
                    .request_adapter(&wgpu::RequestAdapterOptions {
                        power_preference: wgpu::PowerPreference::HighPerformance,
                        compatible_surface: None,
                        force_fallback_adapter: false,
                    })
                    .await
                    .ok_or(GpuError::NoAdapter)?
            }
        };

        let adapter_info = adapter.get_info();
        let adapter_limits = adapter.limits();
        info!(name = %adapter_info.name, backend = ?adapter_info.backend, "adapter selected");

        let (device, queue) = adapter
            .request_device(
                &DeviceDescriptor {
                    label: Some("gblur"),
                    required_features: Features::empty(),
                    required_limits: adapter_limits.clone(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .map_err(|e| GpuError::DeviceCreation(e.to_string()))?;

        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            adapter_info,
            max_texture_dimension: adapter_limits.max_texture_dimension_2d,
        })
    }

    /// Get adapter info (GPU name, vendor, etc.)
    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.adapter_info
    }

    /// Get device name
    pub fn device_name(&self) -> &str {
        &self.adapter_info.name
    }

    /// Get backend type (Vulkan, DX12, Metal, etc.)
    pub fn backend(&self) -> wgpu::Backend {
        self.adapter_info.backend
    }

    /// Largest texture edge the device accepts
    pub fn max_texture_dimension(&self) -> u32 {
        self.max_texture_dimension
    }

    /// Compile WGSL, turning validation errors into `ShaderCompilation`
    pub(crate) fn create_shader(&self, label: &str, source: &str) -> GpuResult<wgpu::ShaderModule> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(err) => Err(GpuError::ShaderCompilation(format!("{label}: {err}"))),
            None => Ok(module),
        }
    }

    /// Run `f` inside validation and out-of-memory error scopes
    pub(crate) fn scoped<T>(&self, what: &str, f: impl FnOnce() -> T) -> GpuResult<T> {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = f();
        let validation = pollster::block_on(self.device.pop_error_scope());
        let oom = pollster::block_on(self.device.pop_error_scope());
        match (validation, oom) {
            (Some(err), _) => Err(GpuError::OperationFailed(format!("{what}: {err}"))),
            (None, Some(err)) => Err(GpuError::SurfaceAllocation(format!("{what}: {err}"))),
            (None, None) => Ok(value),
        }
    }
}

/// Adapter whose PCI vendor id matches the card's.
fn match_adapter(instance: &Instance, card: &RenderDevice) -> Option<Adapter> {
    let vendor = card.vendor_id?;
    let adapter = instance
        .enumerate_adapters(wgpu::Backends::all())
        .into_iter()
        .find(|a| a.get_info().vendor == vendor)?;
    debug!(vendor = %format!("{vendor:#06x}"), name = %adapter.get_info().name, "adapter matched card");
    Some(adapter)
}

impl std::fmt::Debug for GpuContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuContext")
            .field("device", &self.adapter_info.name)
            .field("backend", &self.adapter_info.backend)
            .finish()
    }
}
