//! Render pipelines and the GPU-side layouts they share.
//!
//! The 3D passes all run the same shader. What differs between them is fixed
//! function state (blending, depth writes, culling, stencil, depth bias), so
//! one pipeline is built per distinct [`RenderState`] and cached.
//!
//! Bind groups:
//! - group 0: [`FrameUniform`] (camera and lights)
//! - group 1: [`DrawUniform`] at a dynamic offset per draw
//! - group 2: texture and sampler

use std::{collections::HashMap, mem};

use cgmath::Matrix4;

use crate::{
    camera::CameraUniform,
    data_structures::{mesh::Mesh, scene::MAX_LIGHTS, texture::Texture, transform::TransformRaw},
    render::{DrawCommand, Geometry, Lighting, RenderState, StencilMode},
};

pub mod overlay;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SceneVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
}

impl SceneVertex {
    const ATTRIBS: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2, 2 => Float32x3];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<SceneVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// Non-indexed triangle list for a mesh. Bad indices resolve to the default slot.
pub fn mesh_vertices(mesh: &Mesh) -> Vec<SceneVertex> {
    mesh.resolved_triangles()
        .flat_map(|triangle| {
            triangle.map(|p| SceneVertex {
                position: [p.position.x, p.position.y, p.position.z],
                tex_coords: [p.tex_coord.u, p.tex_coord.v],
                normal: [p.normal.x, p.normal.y, p.normal.z],
            })
        })
        .collect()
}

/// Triangles for quads and fans. Entity geometry lives in per-entity buffers instead.
pub fn geometry_vertices(geometry: &Geometry) -> Vec<SceneVertex> {
    match geometry {
        Geometry::Entity(_) => Vec::new(),
        Geometry::Quad {
            corners,
            normal,
            repeat: [u, v],
        } => {
            let uv = [[0.0, 0.0], [*u, 0.0], [*u, *v], [0.0, *v]];
            let vertex = |i: usize| SceneVertex {
                position: corners[i].into(),
                tex_coords: uv[i],
                normal: (*normal).into(),
            };
            [0, 1, 2, 0, 2, 3].map(vertex).to_vec()
        }
        Geometry::Fan { centre, rim } => {
            let vertex = |p: &cgmath::Point3<f32>| SceneVertex {
                position: (*p).into(),
                tex_coords: [0.0, 0.0],
                normal: [0.0, 0.0, 1.0],
            };
            rim.windows(2)
                .flat_map(|edge| [vertex(centre), vertex(&edge[0]), vertex(&edge[1])])
                .collect()
        }
    }
}

/// Camera and lights for one frame.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniform {
    camera: CameraUniform,
    light_positions: [[f32; 4]; MAX_LIGHTS],
    /// Ambient, diffuse, specular and global ambient light levels.
    light_terms: [f32; 4],
    /// Constant, linear and quadratic attenuation, then the light count.
    attenuation: [f32; 4],
}

impl FrameUniform {
    pub fn new(view: Matrix4<f32>, projection: Matrix4<f32>, eye: cgmath::Point3<f32>, lighting: &Lighting) -> Self {
        let mut camera = CameraUniform::new();
        camera.update_view_proj(view, projection, eye);
        let mut light_positions = [[0.0; 4]; MAX_LIGHTS];
        for (slot, p) in light_positions.iter_mut().zip(&lighting.positions) {
            *slot = [p.x, p.y, p.z, 1.0];
        }
        let [c, l, q] = lighting.attenuation;
        Self {
            camera,
            light_positions,
            light_terms: [
                lighting.ambient,
                lighting.diffuse,
                lighting.specular,
                lighting.global_ambient,
            ],
            attenuation: [c, l, q, lighting.positions.len().min(MAX_LIGHTS) as f32],
        }
    }
}

/// Per-draw transform, colour and material.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawUniform {
    transform: TransformRaw,
    colour: [f32; 4],
    ambient: [f32; 4],
    diffuse: [f32; 4],
    specular: [f32; 4],
    emission: [f32; 4],
    /// Shininess, lighting on, texturing on, unused.
    params: [f32; 4],
}

impl DrawUniform {
    pub fn from_command(command: &DrawCommand) -> Self {
        let flag = |on: bool| if on { 1.0 } else { 0.0 };
        let surface = &command.surface;
        Self {
            transform: TransformRaw::from_matrix(command.transform),
            colour: command.colour,
            ambient: surface.ambient,
            diffuse: surface.diffuse,
            specular: surface.specular,
            emission: surface.emission,
            params: [
                surface.shininess,
                flag(command.state.lighting),
                flag(command.state.texturing && !command.texture.is_none()),
                0.0,
            ],
        }
    }
}

pub fn uniform_layout(device: &wgpu::Device, label: &str, dynamic: bool) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: dynamic,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some(label),
    })
}

fn stencil_state(mode: StencilMode) -> wgpu::StencilState {
    let face = |compare, pass_op| wgpu::StencilFaceState {
        compare,
        fail_op: wgpu::StencilOperation::Keep,
        depth_fail_op: wgpu::StencilOperation::Keep,
        pass_op,
    };
    match mode {
        StencilMode::Ignore => wgpu::StencilState::default(),
        StencilMode::Write(_) => {
            let face = face(wgpu::CompareFunction::Always, wgpu::StencilOperation::Replace);
            wgpu::StencilState {
                front: face,
                back: face,
                read_mask: 0xff,
                write_mask: 0xff,
            }
        }
        StencilMode::NotEqual(_) => {
            let face = face(wgpu::CompareFunction::NotEqual, wgpu::StencilOperation::Keep);
            wgpu::StencilState {
                front: face,
                back: face,
                read_mask: 0xff,
                write_mask: 0,
            }
        }
    }
}

pub fn stencil_reference(mode: StencilMode) -> u32 {
    match mode {
        StencilMode::Ignore => 0,
        StencilMode::Write(reference) | StencilMode::NotEqual(reference) => reference,
    }
}

/// Builds the pipeline for one combination of fixed function state.
pub fn mk_render_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    color_format: wgpu::TextureFormat,
    state: RenderState,
    shader: &wgpu::ShaderModule,
) -> wgpu::RenderPipeline {
    let blend = if state.blend {
        wgpu::BlendState::ALPHA_BLENDING
    } else {
        wgpu::BlendState::REPLACE
    };
    let bias = if state.depth_bias {
        wgpu::DepthBiasState {
            constant: -2,
            slope_scale: -2.0,
            clamp: 0.0,
        }
    } else {
        wgpu::DepthBiasState::default()
    };

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some("Scene Pipeline"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[SceneVertex::desc()],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend: Some(blend),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: state.cull_back.then_some(wgpu::Face::Back),
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: Texture::DEPTH_FORMAT,
            depth_write_enabled: state.depth_write,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: stencil_state(state.stencil),
            bias,
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}

/// The scene shader plus one pipeline per [`RenderState`] seen so far.
#[derive(Debug)]
pub struct ScenePipelines {
    pub frame_layout: wgpu::BindGroupLayout,
    pub draw_layout: wgpu::BindGroupLayout,
    layout: wgpu::PipelineLayout,
    shader: wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    pipelines: HashMap<RenderState, wgpu::RenderPipeline>,
}

impl ScenePipelines {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat, texture_layout: &wgpu::BindGroupLayout) -> Self {
        let frame_layout = uniform_layout(device, "frame_bind_group_layout", false);
        let draw_layout = uniform_layout(device, "draw_bind_group_layout", true);
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&frame_layout, &draw_layout, texture_layout],
            push_constant_ranges: &[],
        });
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("scene.wgsl").into()),
        });
        Self {
            frame_layout,
            draw_layout,
            layout,
            shader,
            format,
            pipelines: HashMap::new(),
        }
    }

    /// Builds any pipeline `states` needs that does not exist yet.
    pub fn prepare<'a>(&mut self, device: &wgpu::Device, states: impl IntoIterator<Item = &'a RenderState>) {
        for state in states {
            if !self.pipelines.contains_key(state) {
                log::debug!("Creating pipeline for {:?}", state);
                let pipeline = mk_render_pipeline(device, &self.layout, self.format, *state, &self.shader);
                self.pipelines.insert(*state, pipeline);
            }
        }
    }

    pub fn get(&self, state: &RenderState) -> Option<&wgpu::RenderPipeline> {
        self.pipelines.get(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::mesh::{FacePoint, MeshCounts, Triangle, Vertex};
    use cgmath::{Point3, Vector3};

    #[test]
    fn quads_split_into_two_triangles_with_tiling() {
        let quad = Geometry::Quad {
            corners: [
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            normal: Vector3::new(0.0, 0.0, 1.0),
            repeat: [5.0, 13.0],
        };
        let vertices = geometry_vertices(&quad);
        assert_eq!(vertices.len(), 6);
        assert_eq!(vertices[2].tex_coords, [5.0, 13.0]);
        assert_eq!(vertices[5].position, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn fans_cover_every_rim_edge() {
        let rim: Vec<Point3<f32>> = (0..=4).map(|i| Point3::new(i as f32, 1.0, 0.0)).collect();
        let fan = Geometry::Fan {
            centre: Point3::new(0.0, 0.0, 0.0),
            rim,
        };
        assert_eq!(geometry_vertices(&fan).len(), 4 * 3);
        assert!(geometry_vertices(&Geometry::Entity(0)).is_empty());
    }

    #[test]
    fn mesh_vertices_survive_bad_indices() {
        let mut mesh = Mesh::with_counts(MeshCounts {
            vertices: 1,
            triangles: 1,
            ..Default::default()
        });
        mesh.vertices.push(Vertex { x: 1.0, y: 2.0, z: 3.0 });
        let point = |vertex| FacePoint {
            vertex,
            tex_coord: 9,
            normal: -4,
        };
        mesh.triangles.push(Triangle {
            points: [point(1), point(7), point(-1)],
        });
        let vertices = mesh_vertices(&mesh);
        assert_eq!(vertices.len(), 3);
        assert_eq!(vertices[0].position, [1.0, 2.0, 3.0]);
        assert_eq!(vertices[1].position, [0.0, 0.0, 0.0]);
        assert_eq!(vertices[2].normal, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn draw_uniform_fits_one_dynamic_slot() {
        assert!(mem::size_of::<DrawUniform>() <= 256);
        assert_eq!(mem::size_of::<DrawUniform>() % 16, 0);
        assert_eq!(mem::size_of::<FrameUniform>() % 16, 0);
    }
}
