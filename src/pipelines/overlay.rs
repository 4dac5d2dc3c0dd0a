//! Pipeline and vertex building for the 2D overlay drawn on top of the scene.

use std::{mem, ops::Range};

use crate::{
    data_structures::texture::Texture,
    render::{OverlayCommand, OverlayRect},
    resources::TextureHandle,
};

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct OverlayVertex {
    pub position: [f32; 2],
    pub tex_coords: [f32; 2],
    pub colour: [f32; 4],
}

impl OverlayVertex {
    const ATTRIBS: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2, 2 => Float32x4];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<OverlayVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// A run of overlay vertices sharing one texture.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayBatch {
    pub texture: TextureHandle,
    pub vertices: Range<u32>,
}

fn rect_vertices(rect: &OverlayRect, window: (u32, u32), colour: [f32; 4]) -> [OverlayVertex; 6] {
    let (w, h) = (window.0.max(1) as f32, window.1.max(1) as f32);
    let ndc = |x: f32, y: f32| [2.0 * x / w - 1.0, 1.0 - 2.0 * y / h];
    let (left, top) = (rect.x, rect.y);
    let (right, bottom) = (rect.x + rect.width, rect.y + rect.height);
    let corner = |x, y, u, v| OverlayVertex {
        position: ndc(x, y),
        tex_coords: [u, v],
        colour,
    };
    let tl = corner(left, top, 0.0, 0.0);
    let tr = corner(right, top, 1.0, 0.0);
    let br = corner(right, bottom, 1.0, 1.0);
    let bl = corner(left, bottom, 0.0, 1.0);
    [tl, bl, br, tl, br, tr]
}

/// Vertices for every panel and image, in window pixels mapped to clip space.
///
/// Text has no glyph source on this backend and is skipped.
pub fn overlay_vertices(commands: &[OverlayCommand], window: (u32, u32)) -> (Vec<OverlayVertex>, Vec<OverlayBatch>) {
    let mut vertices = Vec::new();
    let mut batches: Vec<OverlayBatch> = Vec::new();
    for command in commands {
        let (rect, colour, texture) = match command {
            OverlayCommand::Panel { rect, colour } => (rect, *colour, TextureHandle::NONE),
            OverlayCommand::Image { rect, texture } => (rect, [1.0; 4], *texture),
            OverlayCommand::Text { .. } => continue,
        };
        let start = vertices.len() as u32;
        vertices.extend(rect_vertices(rect, window, colour));
        let end = vertices.len() as u32;
        match batches.last_mut() {
            Some(batch) if batch.texture == texture => batch.vertices.end = end,
            _ => batches.push(OverlayBatch {
                texture,
                vertices: start..end,
            }),
        }
    }
    (vertices, batches)
}

pub fn mk_overlay_pipeline(
    device: &wgpu::Device,
    color_format: wgpu::TextureFormat,
    texture_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Overlay Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("overlay.wgsl").into()),
    });
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Overlay Pipeline Layout"),
        bind_group_layouts: &[texture_layout],
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some("Overlay Pipeline"),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[OverlayVertex::desc()],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: Texture::DEPTH_FORMAT,
            depth_write_enabled: false,
            depth_compare: wgpu::CompareFunction::Always,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: f32, y: f32, width: f32, height: f32) -> OverlayRect {
        OverlayRect { x, y, width, height }
    }

    #[test]
    fn full_window_rect_spans_clip_space() {
        let commands = [OverlayCommand::Panel {
            rect: rect(0.0, 0.0, 800.0, 600.0),
            colour: [0.0, 0.0, 0.0, 0.5],
        }];
        let (vertices, batches) = overlay_vertices(&commands, (800, 600));
        assert_eq!(vertices.len(), 6);
        assert_eq!(vertices[0].position, [-1.0, 1.0]);
        assert_eq!(vertices[2].position, [1.0, -1.0]);
        assert_eq!(vertices[0].colour, [0.0, 0.0, 0.0, 0.5]);
        assert_eq!(batches, vec![OverlayBatch { texture: TextureHandle::NONE, vertices: 0..6 }]);
    }

    #[test]
    fn batches_split_on_texture_change_and_skip_text() {
        let commands = [
            OverlayCommand::Panel { rect: rect(0.0, 0.0, 10.0, 10.0), colour: [1.0; 4] },
            OverlayCommand::Text { x: 5.0, y: 5.0, lines: vec!["hi".into()] },
            OverlayCommand::Panel { rect: rect(20.0, 0.0, 10.0, 10.0), colour: [1.0; 4] },
            OverlayCommand::Image { rect: rect(0.0, 0.0, 100.0, 100.0), texture: TextureHandle(3) },
        ];
        let (vertices, batches) = overlay_vertices(&commands, (200, 200));
        assert_eq!(vertices.len(), 18);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].vertices, 0..12);
        assert_eq!(batches[1].texture, TextureHandle(3));
        assert_eq!(batches[1].vertices, 12..18);
    }
}
