//! Loading of external assets: meshes, scene tables and textures.
//!
//! The scene model never touches the file system or the GPU directly. It asks
//! a [`MeshSource`] for meshes and a [`TextureLoader`] for texture handles, so
//! the whole runtime can be driven headless in tests and by the wgpu backend
//! in the application.

use std::path::Path;

use crate::data_structures::mesh::Mesh;

pub mod csv;
pub mod obj;

pub use obj::LoadError;

/// Opaque texture handle. [`TextureHandle::NONE`] stands for "no texture" and draws untextured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextureHandle(pub u32);

impl TextureHandle {
    pub const NONE: TextureHandle = TextureHandle(0);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

/// Turns an image path into a texture handle. Failures are not errors, they yield [`TextureHandle::NONE`].
pub trait TextureLoader {
    fn load_texture(&mut self, path: &Path) -> TextureHandle;
}

/// Texture loader for headless runs. Hands out no textures at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTextures;

impl TextureLoader for NullTextures {
    fn load_texture(&mut self, _path: &Path) -> TextureHandle {
        TextureHandle::NONE
    }
}

pub trait MeshSource {
    fn load_mesh(&mut self, path: &Path) -> Result<Mesh, LoadError>;
}

/// Reads meshes straight from disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileMeshes;

impl MeshSource for FileMeshes {
    fn load_mesh(&mut self, path: &Path) -> Result<Mesh, LoadError> {
        obj::load_mesh(path)
    }
}
