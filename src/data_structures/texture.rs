//! GPU textures and the texture table behind [`TextureHandle`]s.
//!
//! [`Texture`] wraps a wgpu texture with its view and sampler. [`TextureTable`]
//! owns every texture loaded for the scene and hands out handles; handle 0 is
//! a 1×1 white texture so untextured draws can sample like textured ones.

use std::path::Path;

use anyhow::Context as _;
use image::GenericImageView;

use crate::resources::TextureHandle;

/// A GPU texture with a view and optional sampler.
#[derive(Clone, Debug)]
pub struct Texture {
    #[allow(unused)]
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: Option<wgpu::Sampler>,
}

impl Texture {
    /// Depth plus the stencil the selection outline needs.
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;

    /// Create a depth-stencil texture matching the surface size.
    pub fn create_depth_texture(device: &wgpu::Device, size: [u32; 2], label: &str) -> Self {
        let size = wgpu::Extent3d {
            width: size[0].max(1),
            height: size[1].max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            sampler: None,
        }
    }

    /// A single white texel. Sampling it leaves the vertex colour unchanged.
    pub fn create_white(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let image = image::DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            1,
            1,
            image::Rgba([255, 255, 255, 255]),
        ));
        Self::from_image(device, queue, &image, Some("white texture"))
    }

    /// Decode an image file into an sRGB texture.
    pub fn from_path(device: &wgpu::Device, queue: &wgpu::Queue, path: &Path) -> anyhow::Result<Self> {
        let img = image::open(path).with_context(|| format!("decoding {}", path.display()))?;
        let label = path.to_string_lossy();
        Ok(Self::from_image(device, queue, &img, Some(&label)))
    }

    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        img: &image::DynamicImage,
        label: Option<&str>,
    ) -> Self {
        let dimensions = img.dimensions();
        let rgba = img.to_rgba8();

        let size = wgpu::Extent3d {
            width: dimensions.0,
            height: dimensions.1,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            &rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * dimensions.0),
                rows_per_image: Some(dimensions.1),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = Some(create_default_sampler(device));

        Self {
            texture,
            view,
            sampler,
        }
    }
}

/// Repeat-wrapped linear sampler so room surfaces can tile.
pub fn create_default_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    })
}

/// Texture plus sampler as one bind group.
pub fn texture_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("texture_bind_group_layout"),
    })
}

fn mk_bind_group(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, texture: &Texture) -> wgpu::BindGroup {
    let fallback;
    let sampler = match &texture.sampler {
        Some(sampler) => sampler,
        None => {
            fallback = create_default_sampler(device);
            &fallback
        }
    };
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
        label: Some("texture_bind_group"),
    })
}

/// Every loaded texture, indexed by handle. Slot 0 is the white fallback.
#[derive(Debug)]
pub struct TextureTable {
    pub layout: wgpu::BindGroupLayout,
    textures: Vec<(Texture, wgpu::BindGroup)>,
}

impl TextureTable {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let layout = texture_layout(device);
        let white = Texture::create_white(device, queue);
        let bind_group = mk_bind_group(device, &layout, &white);
        Self {
            layout,
            textures: vec![(white, bind_group)],
        }
    }

    /// Loads `path`, or logs a warning and returns [`TextureHandle::NONE`].
    pub fn load(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, path: &Path) -> TextureHandle {
        match Texture::from_path(device, queue, path) {
            Ok(texture) => {
                let bind_group = mk_bind_group(device, &self.layout, &texture);
                self.textures.push((texture, bind_group));
                log::info!("Loaded texture {}", path.display());
                TextureHandle((self.textures.len() - 1) as u32)
            }
            Err(e) => {
                log::warn!("Texture load failed, drawing untextured: {:#}", e);
                TextureHandle::NONE
            }
        }
    }

    /// Bind group for `handle`. Unknown handles get the white fallback.
    pub fn bind_group(&self, handle: TextureHandle) -> &wgpu::BindGroup {
        let (_, fallback) = &self.textures[0];
        self.textures
            .get(handle.0 as usize)
            .map(|(_, bind_group)| bind_group)
            .unwrap_or(fallback)
    }
}
