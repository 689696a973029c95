//! wgpu renderer that draws the scene's poses as instanced batches.
//!
//! Solid shapes go through a lit flat-colour pipeline. Photos and captions
//! are textured quads, one batch per uploaded image, drawn afterwards with
//! alpha blending.

use std::collections::HashMap;
use std::sync::Arc;

use image::RgbaImage;

use crate::blend::Pose;
use crate::error::RenderError;
use crate::gfx::camera::camera_utils::CameraUniform;
use crate::gfx::geometry::generate_quad;
use crate::gfx::globals::{GlobalBindings, LightConfig};
use crate::gfx::instanced::{InstanceBatch, InstanceData, ShapeMesh, TexturedBatch};
use crate::gfx::shader::{SCENE_SHADER, TEXTURED_SHADER};
use crate::gfx::texture::{DepthTexture, ImageTexture};
use crate::gfx::vertex::Vertex3D;
use crate::scene::{ObjectId, RenderSurface, Shape, TextureKey};

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.0,
    g: 0.012,
    b: 0.006,
    a: 1.0,
};

pub struct RenderEngine {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    pipeline: wgpu::RenderPipeline,
    textured_pipeline: wgpu::RenderPipeline,
    image_layout: wgpu::BindGroupLayout,
    depth_texture: DepthTexture,
    globals: GlobalBindings,
    light: LightConfig,
    // Indexed by `Shape as usize`, in `Shape::ALL` order
    batches: Vec<InstanceBatch>,
    quad: ShapeMesh,
    textured: HashMap<TextureKey, TexturedBatch>,
}

impl RenderEngine {
    /// Creates the device, surface and pipeline for `window`.
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
    ) -> Result<RenderEngine, RenderError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;
        log::info!("Using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("WGPU Device"),
                required_features: wgpu::Features::default(),
                required_limits: wgpu::Limits {
                    max_texture_dimension_2d: 4096,
                    ..wgpu::Limits::downlevel_defaults()
                },
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;

        let surface_capabilities = surface.get_capabilities(&adapter);
        let format = surface_capabilities
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_capabilities.formats.first().copied())
            .ok_or(RenderError::NoSurfaceFormat)?;
        let alpha_mode = surface_capabilities
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let depth_texture = DepthTexture::new(&device, &config, "depth_texture");
        let globals = GlobalBindings::new(&device);

        let image_layout = ImageTexture::bind_group_layout(&device);

        let pipeline = create_pipeline(
            &device,
            "Scene",
            SCENE_SHADER,
            &[&globals.layout],
            format,
            wgpu::BlendState::REPLACE,
        );
        let textured_pipeline = create_pipeline(
            &device,
            "Textured",
            TEXTURED_SHADER,
            &[&globals.layout, &image_layout],
            format,
            wgpu::BlendState::ALPHA_BLENDING,
        );

        let batches = Shape::ALL
            .iter()
            .map(|shape| InstanceBatch::new(&device, *shape))
            .collect();
        let quad = ShapeMesh::new(&device, &generate_quad(), "Quad");

        Ok(RenderEngine {
            device: Arc::new(device),
            queue: Arc::new(queue),
            surface,
            config,
            pipeline,
            textured_pipeline,
            image_layout,
            depth_texture,
            globals,
            light: LightConfig::default(),
            batches,
            quad,
            textured: HashMap::new(),
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }

        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_texture = DepthTexture::new(&self.device, &self.config, "depth_texture");
    }

    /// Uploads this frame's instances and draws them.
    ///
    /// A lost or outdated surface is reconfigured and a timed-out frame is
    /// skipped; both return `Ok`. Anything else is reported to the caller.
    pub fn render(&mut self, camera: &CameraUniform) -> Result<(), RenderError> {
        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(err @ (wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                log::warn!("Surface {err}, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::debug!("Surface timed out, skipping frame");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        self.globals.update(&self.queue, camera, &self.light);
        for batch in &mut self.batches {
            batch.update_instances(&self.device, &self.queue);
        }
        for batch in self.textured.values_mut() {
            batch.update_instances(&self.device, &self.queue);
        }

        let surface_texture_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Main Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &surface_texture_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_pipeline(&self.pipeline);
            render_pass.set_bind_group(0, &self.globals.bind_group, &[]);
            for batch in &self.batches {
                batch.render(&mut render_pass);
            }

            if self.textured.values().any(|batch| !batch.is_empty()) {
                render_pass.set_pipeline(&self.textured_pipeline);
                render_pass.set_bind_group(0, &self.globals.bind_group, &[]);
                for batch in self.textured.values() {
                    batch.render(&mut render_pass, &self.quad);
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();
        Ok(())
    }
}

impl RenderSurface for RenderEngine {
    fn begin_frame(&mut self) {
        for batch in &mut self.batches {
            batch.clear();
        }
        for batch in self.textured.values_mut() {
            batch.clear();
        }
    }

    fn set_pose(&mut self, _id: ObjectId, shape: Shape, pose: &Pose, color: [f32; 4]) {
        if let Some(batch) = self.batches.get_mut(shape as usize) {
            batch.push(InstanceData::from_pose(pose, color));
        }
    }

    fn has_texture(&self, key: TextureKey) -> bool {
        self.textured.contains_key(&key)
    }

    fn upload_texture(&mut self, key: TextureKey, image: &RgbaImage) {
        let label = format!("{key:?}");
        let texture =
            ImageTexture::from_rgba(&self.device, &self.queue, &self.image_layout, image, &label);
        match self.textured.get_mut(&key) {
            Some(batch) => batch.set_texture(texture),
            None => {
                let batch = TexturedBatch::new(&self.device, texture, &label);
                self.textured.insert(key, batch);
            }
        }
        log::debug!("Uploaded {label} ({}x{})", image.width(), image.height());
    }

    fn set_textured_pose(&mut self, _id: ObjectId, key: TextureKey, pose: &Pose, tint: [f32; 4]) {
        if let Some(batch) = self.textured.get_mut(&key) {
            batch.push(InstanceData::from_pose(pose, tint));
        }
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    label: &str,
    source: &str,
    bind_group_layouts: &[&wgpu::BindGroupLayout],
    format: wgpu::TextureFormat,
    blend: wgpu::BlendState,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(&format!("{label} Shader")),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(&format!("{label} Pipeline Layout")),
        bind_group_layouts,
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(&format!("{label} Pipeline")),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[Vertex3D::desc(), InstanceData::vertex_buffer_layout()],
            compilation_options: Default::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
            unclipped_depth: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DepthTexture::FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(blend),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        multiview: None,
        cache: None,
    })
}
