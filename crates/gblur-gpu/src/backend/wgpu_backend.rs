//! wgpu backend implementation.
//!
//! Each pass is one render pipeline drawing a full-screen triangle into an
//! `Rgba8Unorm` texture. Blur, blit and brightness pipelines are built up
//! front; HSL and darken bake their constants into the shader text and are
//! built when first needed for a run.

use bytemuck::{Pod, Zeroable};
use tracing::{debug, trace};
use wgpu::util::DeviceExt;

use gblur_core::{KernelLayout, PackedKernel};

use super::gpu_primitives::{BlurAxis, GpuPrimitives, SurfaceHandle, mip_level_count};
use crate::context::GpuContext;
use crate::program::BlurProgram;
use crate::shaders::{self, ProgramStage, TemplateParams};
use crate::{GpuError, GpuResult};

const SURFACE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

// =============================================================================
// Uniform Buffers
// =============================================================================

/// Per-pass uniform of the blur programs.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct PassParams {
    resolution: [f32; 2],
    lod: f32,
    _pad: f32,
}

// =============================================================================
// WgpuSurface Handle
// =============================================================================

/// Render-target texture with an optional mip chain.
pub struct WgpuSurface {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
    mip_levels: u32,
}

impl WgpuSurface {
    /// View of a single level, for rendering into or sampling from.
    fn level_view(&self, level: u32) -> wgpu::TextureView {
        self.texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("surface_level"),
            base_mip_level: level,
            mip_level_count: Some(1),
            ..Default::default()
        })
    }
}

impl SurfaceHandle for WgpuSurface {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn mip_levels(&self) -> u32 {
        self.mip_levels
    }
}

// =============================================================================
// Pipelines
// =============================================================================

struct Pipelines {
    blur_h: wgpu::RenderPipeline,
    blur_v: wgpu::RenderPipeline,
    blit: wgpu::RenderPipeline,
    brightness: wgpu::RenderPipeline,
}

// =============================================================================
// WgpuPrimitives
// =============================================================================

/// wgpu render primitives.
pub struct WgpuPrimitives {
    ctx: GpuContext,
    layout: KernelLayout,
    sampler: wgpu::Sampler,
    pipelines: Pipelines,
}

impl WgpuPrimitives {
    /// Check if wgpu is available.
    pub fn is_available() -> bool {
        pollster::block_on(async {
            let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
                backends: wgpu::Backends::all(),
                ..Default::default()
            });
            instance
                .request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference: wgpu::PowerPreference::HighPerformance,
                    compatible_surface: None,
                    force_fallback_adapter: false,
                })
                .await
                .is_some()
        })
    }

    /// Builds the pipelines for `program` on `ctx`.
    pub fn new(ctx: GpuContext, program: &dyn BlurProgram) -> GpuResult<Self> {
        let sampler = ctx.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("linear_clamp"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let plain = TemplateParams::default();
        let pipelines = Pipelines {
            blur_h: create_pipeline(&ctx, "blur_h", &program.source(BlurAxis::Horizontal)?)?,
            blur_v: create_pipeline(&ctx, "blur_v", &program.source(BlurAxis::Vertical)?)?,
            blit: create_pipeline(&ctx, "blit", &shaders::render_stage(ProgramStage::Blit, &plain)?)?,
            brightness: create_pipeline(
                &ctx,
                "brightness_map",
                &shaders::render_stage(ProgramStage::BrightnessMap, &plain)?,
            )?,
        };
        debug!(layout = program.layout().name(), device = ctx.device_name(), "wgpu pipelines ready");

        Ok(Self { ctx, layout: program.layout(), sampler, pipelines })
    }

    /// Context the primitives render on.
    pub fn context(&self) -> &GpuContext {
        &self.ctx
    }

    fn texture_entries<'a>(&'a self, view: &'a wgpu::TextureView) -> [wgpu::BindGroupEntry<'a>; 2] {
        [
            wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(view) },
            wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::Sampler(&self.sampler) },
        ]
    }

    /// Records and submits one full-screen draw into `target`.
    fn draw(
        &self,
        label: &str,
        pipeline: &wgpu::RenderPipeline,
        entries: &[wgpu::BindGroupEntry<'_>],
        target: &wgpu::TextureView,
    ) -> GpuResult<()> {
        trace!(pass = label, "wgpu::draw");
        self.ctx.scoped(label, || {
            let layout = pipeline.get_bind_group_layout(0);
            let bind_group = self.ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &layout,
                entries,
            });

            let mut encoder = self.ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(label),
            });
            {
                let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some(label),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: target,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                });
                pass.set_pipeline(pipeline);
                pass.set_bind_group(0, &bind_group, &[]);
                pass.draw(0..3, 0..1);
            }
            self.ctx.queue.submit(std::iter::once(encoder.finish()));
        })
    }

    /// Pipeline for a stage whose constants change between runs.
    fn templated(&self, stage: ProgramStage, params: &TemplateParams) -> GpuResult<wgpu::RenderPipeline> {
        let source = shaders::render_stage(stage, params)?;
        create_pipeline(&self.ctx, stage.label(), &source)
    }
}

fn create_pipeline(ctx: &GpuContext, label: &str, source: &str) -> GpuResult<wgpu::RenderPipeline> {
    let module = ctx.create_shader(label, source)?;
    ctx.device.push_error_scope(wgpu::ErrorFilter::Validation);
    let pipeline = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: None, // Auto layout
        vertex: wgpu::VertexState {
            module: &module,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[],
        },
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: &module,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: SURFACE_FORMAT,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        multiview: None,
        cache: None,
    });
    match pollster::block_on(ctx.device.pop_error_scope()) {
        Some(err) => Err(GpuError::ShaderCompilation(format!("{label}: {err}"))),
        None => Ok(pipeline),
    }
}

impl GpuPrimitives for WgpuPrimitives {
    type Surface = WgpuSurface;

    fn upload(&self, rgba: &[u8], width: u32, height: u32) -> GpuResult<Self::Surface> {
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(gblur_core::Error::BufferSizeMismatch { expected, actual: rgba.len() }.into());
        }
        let mut surface = self.allocate(width, height, true)?;

        self.ctx.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &surface.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
        );

        self.generate_mips(&mut surface)?;
        Ok(surface)
    }

    fn allocate(&self, width: u32, height: u32, mipmapped: bool) -> GpuResult<Self::Surface> {
        self.check_dimensions(width, height)?;
        let mip_levels = if mipmapped { mip_level_count(width, height) } else { 1 };
        trace!(width, height, mip_levels, "wgpu::allocate");

        let texture = self.ctx.scoped("allocate", || {
            self.ctx.device.create_texture(&wgpu::TextureDescriptor {
                label: Some("surface"),
                size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
                mip_level_count: mip_levels,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: SURFACE_FORMAT,
                usage: wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::COPY_SRC
                    | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            })
        })?;
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Ok(WgpuSurface { texture, view, width, height, mip_levels })
    }

    fn generate_mips(&self, surface: &mut Self::Surface) -> GpuResult<()> {
        for level in 1..surface.mip_levels {
            let src = surface.level_view(level - 1);
            let dst = surface.level_view(level);
            self.draw("mip", &self.pipelines.blit, &self.texture_entries(&src), &dst)?;
        }
        Ok(())
    }

    fn exec_blur(
        &self,
        src: &Self::Surface,
        dst: &mut Self::Surface,
        axis: BlurAxis,
        kernel: &PackedKernel,
        lod: f32,
    ) -> GpuResult<()> {
        // rejects kernels packed for another program
        let (_, resolution) = self.layout.packer().unpack(kernel)?;

        let params = PassParams { resolution, lod, _pad: 0.0 };
        let params_buf = self.ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("pass_params"),
            contents: bytemuck::bytes_of(&params),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let usage = match kernel {
            PackedKernel::Flat { .. } => wgpu::BufferUsages::STORAGE,
            PackedKernel::Block { .. } => wgpu::BufferUsages::UNIFORM,
        };
        let kernel_buf = self.ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("kernel"),
            contents: &kernel.to_bytes(),
            usage,
        });

        let (pipeline, label) = match axis {
            BlurAxis::Horizontal => (&self.pipelines.blur_h, "blur_h"),
            BlurAxis::Vertical => (&self.pipelines.blur_v, "blur_v"),
        };
        let [tex, samp] = self.texture_entries(&src.view);
        let entries = [
            tex,
            samp,
            wgpu::BindGroupEntry { binding: 2, resource: params_buf.as_entire_binding() },
            wgpu::BindGroupEntry { binding: 3, resource: kernel_buf.as_entire_binding() },
        ];
        self.draw(label, pipeline, &entries, &dst.level_view(0))
    }

    fn exec_hsl(&self, src: &Self::Surface, dst: &mut Self::Surface, lightness: f32, saturation: f32)
        -> GpuResult<()>
    {
        let params = TemplateParams { lightness, saturation, ..Default::default() };
        let pipeline = self.templated(ProgramStage::Hsl, &params)?;
        self.draw("hsl", &pipeline, &self.texture_entries(&src.view), &dst.level_view(0))
    }

    fn exec_brightness_map(&self, src: &Self::Surface, dst: &mut Self::Surface) -> GpuResult<()> {
        self.draw(
            "brightness_map",
            &self.pipelines.brightness,
            &self.texture_entries(&src.view),
            &dst.level_view(0),
        )
    }

    fn exec_darken(&self, src: &Self::Surface, dst: &mut Self::Surface, factor: f32) -> GpuResult<()> {
        let params = TemplateParams { darken_factor: factor, ..Default::default() };
        let pipeline = self.templated(ProgramStage::Darken, &params)?;
        self.draw("darken", &pipeline, &self.texture_entries(&src.view), &dst.level_view(0))
    }

    fn exec_blit(&self, src: &Self::Surface, dst: &mut Self::Surface) -> GpuResult<()> {
        self.draw("blit", &self.pipelines.blit, &self.texture_entries(&src.view), &dst.level_view(0))
    }

    fn download(&self, surface: &Self::Surface) -> GpuResult<Vec<u8>> {
        let (width, height) = (surface.width, surface.height);
        let unpadded = 4 * width;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded = unpadded.div_ceil(align) * align;

        // Create staging buffer
        let staging = self.ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("staging_buffer"),
            size: padded as u64 * height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        // Copy to staging
        let mut encoder = self.ctx.device.create_command_encoder(&Default::default());
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &surface.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
        );
        self.ctx.queue.submit(std::iter::once(encoder.finish()));

        // Map and read
        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |r| {
            let _ = tx.send(r);
        });
        self.ctx.device.poll(wgpu::Maintain::Wait);

        rx.recv()
            .map_err(|_| GpuError::OperationFailed("Map channel closed".into()))?
            .map_err(|e| GpuError::OperationFailed(format!("Map failed: {e}")))?;

        let data = slice.get_mapped_range();
        let mut result = Vec::with_capacity(unpadded as usize * height as usize);
        for row in data.chunks_exact(padded as usize) {
            result.extend_from_slice(&row[..unpadded as usize]);
        }
        drop(data);
        staging.unmap();

        Ok(result)
    }

    fn max_dimension(&self) -> u32 {
        self.ctx.max_texture_dimension()
    }

    fn name(&self) -> &'static str {
        "wgpu"
    }
}
