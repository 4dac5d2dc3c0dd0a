#![allow(dead_code)]

use std::path::{Path, PathBuf};

use flow_gallery::{
    config::Config,
    data_structures::{
        entity::{Entity, EntityKind},
        mesh::{Mesh, MeshCounts, Vertex},
        transform::Transform,
    },
    flow::Gallery,
    resources::{FileMeshes, TextureHandle, TextureLoader},
};

pub const WINDOW: (u32, u32) = (800, 600);

pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Hands out a fresh handle per texture and remembers what was asked for.
#[derive(Debug, Default)]
pub struct RecordingTextures {
    pub requested: Vec<PathBuf>,
}

impl TextureLoader for RecordingTextures {
    fn load_texture(&mut self, path: &Path) -> TextureHandle {
        self.requested.push(path.to_path_buf());
        TextureHandle(self.requested.len() as u32)
    }
}

pub fn config_for(csv: &str) -> Config {
    let mut config = Config::default();
    config.scene.csv = fixture(csv);
    config
}

/// A session on the scene in `csv` with meshes read from disk.
pub fn load_gallery(csv: &str) -> (Gallery, RecordingTextures) {
    let mut textures = RecordingTextures::default();
    let gallery = Gallery::load(config_for(csv), &mut FileMeshes, &mut textures, WINDOW);
    (gallery, textures)
}

/// Axis-aligned box mesh with the given local corners.
pub fn block(min: [f32; 3], max: [f32; 3]) -> Mesh {
    let mut mesh = Mesh::with_counts(MeshCounts {
        vertices: 2,
        ..Default::default()
    });
    mesh.vertices.push(Vertex { x: min[0], y: min[1], z: min[2] });
    mesh.vertices.push(Vertex { x: max[0], y: max[1], z: max[2] });
    mesh
}

pub fn entity_at(kind: EntityKind, position: [f32; 3]) -> Entity {
    let transform = Transform {
        position: position.into(),
        ..Transform::new()
    };
    Entity::new(kind, "inline", block([-0.5; 3], [0.5; 3]), transform)
}

pub fn centre_of(gallery: &Gallery) -> (f64, f64) {
    let viewport = gallery.viewport();
    (
        f64::from(viewport.x) + f64::from(viewport.width) / 2.0,
        f64::from(viewport.y) + f64::from(viewport.height) / 2.0,
    )
}
