//! Main renderer managing wgpu state and rendering.

use crate::{
    camera::{Camera, FrameUniform},
    lighting::Lighting,
    mesh::Mesh,
    pipeline::{
        create_frame_bind_group_layout, create_mesh_pipeline, create_output_bind_group_layout,
        create_output_pipeline, DEPTH_FORMAT,
    },
    scene::{MeshId, Scene},
    vertex::InstanceData,
};
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use wgpu::util::DeviceExt;
use winit::window::Window;

const INITIAL_INSTANCE_CAPACITY: u32 = 256;

/// Low-resolution color + depth target the scene is drawn into before
/// being upscaled onto the swap chain.
struct SceneTarget {
    color_view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
    bind_group: wgpu::BindGroup,
    width: u32,
    height: u32,
}

impl SceneTarget {
    fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        width: u32,
        height: u32,
    ) -> Self {
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let color = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Scene Color"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let depth = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Scene Depth"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let color_view = color.create_view(&wgpu::TextureViewDescriptor::default());
        let depth_view = depth.create_view(&wgpu::TextureViewDescriptor::default());

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Output Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&color_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });

        Self {
            color_view,
            depth_view,
            bind_group,
            width,
            height,
        }
    }
}

/// Size of the scene target for a window of `width`×`height` at `pixel_size`.
pub fn scaled_extent(width: u32, height: u32, pixel_size: u32) -> (u32, u32) {
    let pixel_size = pixel_size.max(1);
    ((width / pixel_size).max(1), (height / pixel_size).max(1))
}

pub struct Renderer {
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub size: winit::dpi::PhysicalSize<u32>,
    pub window: Arc<Window>,
    pub lighting: Lighting,

    mesh_pipeline: wgpu::RenderPipeline,
    output_pipeline: wgpu::RenderPipeline,

    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,

    output_bind_group_layout: wgpu::BindGroupLayout,
    output_sampler: wgpu::Sampler,
    target: SceneTarget,
    pixel_size: u32,

    instance_buffer: wgpu::Buffer,
    max_instances: u32,

    meshes: HashMap<MeshId, Mesh>,
}

impl Renderer {
    /// Create a new renderer for the given window. Every `pixel_size`×`pixel_size`
    /// block of screen pixels shows one scene pixel.
    pub async fn new(window: Arc<Window>, vsync: bool, pixel_size: u32) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow::anyhow!("Failed to find suitable GPU adapter"))?;

        log::info!("Using GPU: {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Main Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| anyhow::anyhow!("Surface reports no supported formats"))?;

        let present_mode = if vsync {
            wgpu::PresentMode::AutoVsync
        } else {
            wgpu::PresentMode::AutoNoVsync
        };

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 1,
        };
        surface.configure(&device, &config);

        let lighting = Lighting::default();
        let frame_uniform = FrameUniform::new(&Camera::default(), &lighting);
        let frame_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Frame Buffer"),
            contents: bytemuck::cast_slice(&[frame_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let frame_layout = create_frame_bind_group_layout(&device);
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame Bind Group"),
            layout: &frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });

        let output_bind_group_layout = create_output_bind_group_layout(&device);
        // Nearest filtering keeps the upscaled pixels hard-edged.
        let output_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Output Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let pixel_size = pixel_size.max(1);
        let (width, height) = scaled_extent(config.width, config.height, pixel_size);
        let target = SceneTarget::new(
            &device,
            surface_format,
            &output_bind_group_layout,
            &output_sampler,
            width,
            height,
        );

        let mesh_pipeline = create_mesh_pipeline(&device, surface_format, &frame_layout);
        let output_pipeline =
            create_output_pipeline(&device, surface_format, &output_bind_group_layout);

        let max_instances = INITIAL_INSTANCE_CAPACITY;
        let instance_buffer = create_instance_buffer(&device, max_instances);

        log::info!(
            "Renderer ready: {}x{} surface, scene target {}x{} (pixel size {})",
            config.width,
            config.height,
            width,
            height,
            pixel_size
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            window,
            lighting,
            mesh_pipeline,
            output_pipeline,
            frame_buffer,
            frame_bind_group,
            output_bind_group_layout,
            output_sampler,
            target,
            pixel_size,
            instance_buffer,
            max_instances,
            meshes: HashMap::new(),
        })
    }

    /// Upload meshes added to the scene since the last call and destroy the
    /// GPU buffers of meshes it released.
    pub fn prepare(&mut self, scene: &mut Scene) {
        for (id, data) in scene.take_uploads() {
            if data.is_empty() {
                log::warn!("Skipping upload of empty mesh {id:?}");
                continue;
            }
            self.meshes.insert(id, data.upload(&self.device));
        }
        for id in scene.take_releases() {
            if let Some(mesh) = self.meshes.remove(&id) {
                mesh.destroy();
            }
        }
    }

    /// Draw the scene from `camera` and present. A lost or outdated surface
    /// is reconfigured and the frame skipped.
    pub fn render(&mut self, scene: &Scene, camera: &Camera) -> Result<()> {
        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("Surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Surface timeout, skipping frame");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        let output_view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let frame = FrameUniform::new(camera, &self.lighting);
        self.queue
            .write_buffer(&self.frame_buffer, 0, bytemuck::cast_slice(&[frame]));

        // Lay every batch out back to back in the instance buffer.
        let batches = scene.instances();
        let mut instances: Vec<InstanceData> = Vec::new();
        let mut draws: Vec<(MeshId, std::ops::Range<u32>)> = Vec::with_capacity(batches.len());
        for (mesh, batch) in batches {
            let start = instances.len() as u32;
            instances.extend(batch);
            draws.push((mesh, start..instances.len() as u32));
        }
        self.ensure_instance_capacity(instances.len() as u32);
        if !instances.is_empty() {
            self.queue
                .write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&instances));
        }

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.target.color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.lighting.clear_color()),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.target.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_pipeline(&self.mesh_pipeline);
            pass.set_bind_group(0, &self.frame_bind_group, &[]);
            pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
            for (id, range) in draws {
                let Some(mesh) = self.meshes.get(&id) else {
                    continue;
                };
                pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..mesh.num_indices, 0, range);
            }
        }

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Pixelate Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &output_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.output_pipeline);
            pass.set_bind_group(0, &self.target.bind_group, &[]);
            pass.draw(0..3, 0..1);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    fn ensure_instance_capacity(&mut self, needed: u32) {
        if needed <= self.max_instances {
            return;
        }
        self.max_instances = needed.next_power_of_two();
        self.instance_buffer.destroy();
        self.instance_buffer = create_instance_buffer(&self.device, self.max_instances);
        log::debug!("Instance buffer grown to {} instances", self.max_instances);
    }

    /// Handle window resize.
    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.rebuild_target();
        }
    }

    fn rebuild_target(&mut self) {
        let (width, height) = scaled_extent(self.config.width, self.config.height, self.pixel_size);
        if width == self.target.width && height == self.target.height {
            return;
        }
        self.target = SceneTarget::new(
            &self.device,
            self.config.format,
            &self.output_bind_group_layout,
            &self.output_sampler,
            width,
            height,
        );
    }

    /// Get window dimensions.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }
}

fn create_instance_buffer(device: &wgpu::Device, capacity: u32) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Instance Buffer"),
        size: capacity as u64 * std::mem::size_of::<InstanceData>() as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaled_extent_divides_and_never_hits_zero() {
        assert_eq!(scaled_extent(1280, 720, 1), (1280, 720));
        assert_eq!(scaled_extent(1280, 720, 4), (320, 180));
        assert_eq!(scaled_extent(3, 3, 8), (1, 1));
        assert_eq!(scaled_extent(1280, 720, 0), (1280, 720));
    }
}
