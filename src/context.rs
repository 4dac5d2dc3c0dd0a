//! The wgpu backend: device, surface and the GPU copies of the scene.
//!
//! [`Context::render`] consumes a backend-neutral [`Frame`] and issues one
//! render pass: every 3D draw in pass order, then the overlay.

use std::{mem, ops::Range, path::Path, sync::Arc};

use anyhow::Context as _;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::{
    data_structures::{
        scene::Scene,
        texture::{self, TextureTable},
    },
    pick::Viewport,
    pipelines::{
        self, geometry_vertices, mesh_vertices,
        overlay::{mk_overlay_pipeline, overlay_vertices},
        DrawUniform, FrameUniform, SceneVertex, ScenePipelines,
    },
    render::{DrawCommand, Frame, Geometry},
    resources::{TextureHandle, TextureLoader},
};

const INITIAL_DRAW_CAPACITY: u64 = 64;

/// Vertex buffer of one entity mesh.
#[derive(Debug)]
struct GpuMesh {
    buffer: wgpu::Buffer,
    vertex_count: u32,
}

/// Dynamic-offset uniform buffer holding one [`DrawUniform`] per draw.
#[derive(Debug)]
struct DrawBuffer {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    capacity: u64,
    stride: u64,
}

impl DrawBuffer {
    fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, capacity: u64, stride: u64) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Draw Buffer"),
            size: capacity * stride,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(mem::size_of::<DrawUniform>() as u64),
                }),
            }],
            label: Some("draw_bind_group"),
        });
        Self {
            buffer,
            bind_group,
            capacity,
            stride,
        }
    }

    fn offset(&self, index: usize) -> u32 {
        (index as u64 * self.stride) as u32
    }
}

#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub(crate) depth_texture: texture::Texture,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    textures: TextureTable,
    pipelines: ScenePipelines,
    overlay_pipeline: wgpu::RenderPipeline,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    draws: DrawBuffer,
    meshes: Vec<Option<GpuMesh>>,
    is_surface_configured: bool,
}

impl Context {
    pub async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let size = window.inner_size();

        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("creating window surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no suitable graphics adapter")?;
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("requesting graphics device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        // Colours are authored in sRGB.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("surface reports no formats")?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let depth_texture =
            texture::Texture::create_depth_texture(&device, [config.width, config.height], "depth_texture");
        let textures = TextureTable::new(&device, &queue);
        let pipelines = ScenePipelines::new(&device, config.format, &textures.layout);
        let overlay_pipeline = mk_overlay_pipeline(&device, config.format, &textures.layout);

        let frame_uniform: FrameUniform = bytemuck::Zeroable::zeroed();
        let frame_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Frame Buffer"),
            contents: bytemuck::cast_slice(&[frame_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &pipelines.frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
            label: Some("frame_bind_group"),
        });

        let stride = wgpu::util::align_to(
            mem::size_of::<DrawUniform>() as u64,
            u64::from(device.limits().min_uniform_buffer_offset_alignment),
        );
        let draws = DrawBuffer::new(&device, &pipelines.draw_layout, INITIAL_DRAW_CAPACITY, stride);

        Ok(Self {
            window,
            depth_texture,
            surface,
            device,
            queue,
            config,
            textures,
            pipelines,
            overlay_pipeline,
            frame_buffer,
            frame_bind_group,
            draws,
            meshes: Vec::new(),
            is_surface_configured: size.width > 0 && size.height > 0,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            self.is_surface_configured = false;
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_texture = texture::Texture::create_depth_texture(&self.device, [width, height], "depth_texture");
        self.is_surface_configured = true;
    }

    /// Uploads one vertex buffer per entity. Entities without triangles get none.
    pub fn upload_scene(&mut self, scene: &Scene) {
        self.meshes = scene
            .entities
            .iter()
            .map(|entity| {
                let vertices = mesh_vertices(&entity.mesh);
                if vertices.is_empty() {
                    return None;
                }
                let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&entity.mesh_path),
                    contents: bytemuck::cast_slice(&vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                });
                Some(GpuMesh {
                    buffer,
                    vertex_count: vertices.len() as u32,
                })
            })
            .collect();
        log::info!("Uploaded {} meshes", self.meshes.len());
    }

    fn ensure_draw_capacity(&mut self, draws: usize) {
        let needed = draws as u64;
        if needed <= self.draws.capacity {
            return;
        }
        let capacity = needed.next_power_of_two();
        log::debug!("Growing draw buffer to {} slots", capacity);
        self.draws = DrawBuffer::new(&self.device, &self.pipelines.draw_layout, capacity, self.draws.stride);
    }

    fn write_draws(&mut self, commands: &[&DrawCommand]) {
        self.ensure_draw_capacity(commands.len());
        let stride = self.draws.stride as usize;
        let mut bytes = vec![0u8; commands.len() * stride];
        for (slot, command) in bytes.chunks_exact_mut(stride).zip(commands) {
            let uniform = DrawUniform::from_command(command);
            let raw = bytemuck::bytes_of(&uniform);
            slot[..raw.len()].copy_from_slice(raw);
        }
        if !bytes.is_empty() {
            self.queue.write_buffer(&self.draws.buffer, 0, &bytes);
        }
    }

    /// Draws `frame` into `viewport` and presents it.
    pub fn render(&mut self, frame: &Frame, viewport: Viewport) -> Result<(), wgpu::SurfaceError> {
        self.window.request_redraw();
        if !self.is_surface_configured || viewport.is_empty() {
            return Ok(());
        }

        let frame_uniform = FrameUniform::new(frame.view, frame.projection, frame.eye, &frame.lighting);
        self.queue
            .write_buffer(&self.frame_buffer, 0, bytemuck::cast_slice(&[frame_uniform]));

        let mut commands: Vec<&DrawCommand> = frame.commands.iter().collect();
        commands.sort_by_key(|command| command.pass);
        self.write_draws(&commands);
        self.pipelines
            .prepare(&self.device, commands.iter().map(|command| &command.state));

        // Quads and fans change every frame, so they share one transient buffer.
        let mut transient: Vec<SceneVertex> = Vec::new();
        let ranges: Vec<Option<Range<u32>>> = commands
            .iter()
            .map(|command| match command.geometry {
                Geometry::Entity(_) => None,
                ref geometry => {
                    let start = transient.len() as u32;
                    transient.extend(geometry_vertices(geometry));
                    Some(start..transient.len() as u32)
                }
            })
            .collect();
        let transient_buffer = (!transient.is_empty()).then(|| {
            self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Transient Vertex Buffer"),
                contents: bytemuck::cast_slice(&transient),
                usage: wgpu::BufferUsages::VERTEX,
            })
        });

        let window = (self.config.width, self.config.height);
        let (overlay, batches) = overlay_vertices(&frame.overlay, window);
        let overlay_buffer = (!overlay.is_empty()).then(|| {
            self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Overlay Vertex Buffer"),
                contents: bytemuck::cast_slice(&overlay),
                usage: wgpu::BufferUsages::VERTEX,
            })
        });

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let [r, g, b, a] = frame.clear_colour.map(f64::from);
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(0),
                        store: wgpu::StoreOp::Store,
                    }),
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            // The letterbox bars keep the clear colour.
            render_pass.set_viewport(
                viewport.x as f32,
                viewport.y as f32,
                viewport.width as f32,
                viewport.height as f32,
                0.0,
                1.0,
            );
            render_pass.set_bind_group(0, &self.frame_bind_group, &[]);

            for (i, (command, range)) in commands.iter().zip(&ranges).enumerate() {
                let Some(pipeline) = self.pipelines.get(&command.state) else {
                    continue;
                };
                let (buffer, vertices) = match (&command.geometry, range) {
                    (Geometry::Entity(index), _) => match self.meshes.get(*index) {
                        Some(Some(mesh)) => (&mesh.buffer, 0..mesh.vertex_count),
                        _ => continue,
                    },
                    (_, Some(range)) if !range.is_empty() => match &transient_buffer {
                        Some(buffer) => (buffer, range.clone()),
                        None => continue,
                    },
                    _ => continue,
                };
                render_pass.set_pipeline(pipeline);
                render_pass.set_stencil_reference(pipelines::stencil_reference(command.state.stencil));
                render_pass.set_bind_group(1, &self.draws.bind_group, &[self.draws.offset(i)]);
                render_pass.set_bind_group(2, self.textures.bind_group(command.texture), &[]);
                render_pass.set_vertex_buffer(0, buffer.slice(..));
                render_pass.draw(vertices, 0..1);
            }

            if let Some(buffer) = &overlay_buffer {
                render_pass.set_viewport(0.0, 0.0, window.0 as f32, window.1 as f32, 0.0, 1.0);
                render_pass.set_pipeline(&self.overlay_pipeline);
                render_pass.set_vertex_buffer(0, buffer.slice(..));
                for batch in &batches {
                    render_pass.set_bind_group(0, self.textures.bind_group(batch.texture), &[]);
                    render_pass.draw(batch.vertices.clone(), 0..1);
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

impl TextureLoader for Context {
    fn load_texture(&mut self, path: &Path) -> TextureHandle {
        self.textures.load(&self.device, &self.queue, path)
    }
}
