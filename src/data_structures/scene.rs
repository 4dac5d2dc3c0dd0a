//! The flat list of exhibits and the scene-wide state around it.
//!
//! A [`Scene`] is built once from the rows of the scene description. Each row
//! becomes an [`Entity`] with its own mesh, after which statues are snapped
//! onto their nearest pedestal. Per frame only the animation angles of
//! spinning statues change.
//!
//! # Key types
//!
//! - [`Scene`] owns the entities, the selection and the lighting/animation/shadow toggles
//! - [`Material`] is the surface material shared by all exhibits
//! - [`RoomTextures`] are the handles for floor, walls and ceiling

use std::{path::Path, time::Duration};

use cgmath::{Point3, Vector3};

use crate::{
    camera::wrap_degrees,
    config::{Config, LightingConfig, SceneConfig},
    data_structures::{
        entity::{Entity, EntityKind},
        mesh::Mesh,
        transform::Transform,
    },
    resources::{MeshSource, TextureHandle, TextureLoader, csv::SceneRow},
};

/// Lights are placed this far below their lamp fixture.
const LAMP_DROP: f32 = 0.20;
/// The fallback light hangs this far below the ceiling.
const FALLBACK_DROP: f32 = 0.25;
pub const MAX_LIGHTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub ambient: [f32; 3],
    pub diffuse: [f32; 3],
    pub specular: [f32; 3],
    pub shininess: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            ambient: [0.0, 0.0, 0.0],
            diffuse: [0.4, 0.8, 0.8],
            specular: [1.0, 1.0, 1.0],
            shininess: 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoomTextures {
    pub floor: TextureHandle,
    pub wall: TextureHandle,
    pub ceiling: TextureHandle,
}

#[derive(Debug, Clone)]
pub struct Scene {
    pub entities: Vec<Entity>,
    selected: Option<usize>,
    pub material: Material,
    light_intensity: f32,
    /// Seconds since the scene was loaded.
    pub time: f64,
    pub animation_enabled: bool,
    pub shadows_enabled: bool,
    pub room_textures: RoomTextures,
    room_height: f32,
    settings: SceneConfig,
    lighting: LightingConfig,
}

impl Scene {
    /// An empty scene with the toggles and limits from `config`.
    pub fn new(config: &Config) -> Self {
        Self {
            entities: Vec::with_capacity(config.scene.max_entities),
            selected: None,
            material: Material::default(),
            light_intensity: config
                .lighting
                .initial_intensity
                .clamp(0.0, config.lighting.max_intensity),
            time: 0.0,
            animation_enabled: true,
            shadows_enabled: true,
            room_textures: RoomTextures::default(),
            room_height: config.room.height,
            settings: config.scene.clone(),
            lighting: config.lighting.clone(),
        }
    }

    /// Builds every entity from `rows` in order, then snaps statues onto pedestals.
    ///
    /// A row whose mesh fails to load is logged and skipped; the rest of the scene still loads.
    pub fn load(
        config: &Config,
        rows: &[SceneRow],
        meshes: &mut impl MeshSource,
        textures: &mut impl TextureLoader,
    ) -> Self {
        let mut scene = Self::new(config);
        scene.room_textures = RoomTextures {
            floor: textures.load_texture(&config.scene.floor_texture),
            wall: textures.load_texture(&config.scene.wall_texture),
            ceiling: textures.load_texture(&config.scene.ceiling_texture),
        };

        for row in rows {
            if scene.entities.len() >= scene.settings.max_entities {
                log::warn!(
                    "Scene is full ({} entities), ignoring the remaining rows",
                    scene.settings.max_entities
                );
                break;
            }
            match meshes.load_mesh(Path::new(&row.mesh)) {
                Ok(mesh) => {
                    let mut entity = scene.entity_from_row(row, mesh);
                    entity.texture = textures.load_texture(Path::new(&row.texture));
                    log::info!(
                        "Loaded entity: {} | model={} | tex={}",
                        entity.kind,
                        row.mesh,
                        row.texture
                    );
                    scene.entities.push(entity);
                }
                Err(e) => {
                    log::error!("Skipping {} entity, could not load {}: {}", row.kind, row.mesh, e);
                }
            }
        }

        scene.snap_statues_to_pedestals();
        scene
    }

    fn entity_from_row(&self, row: &SceneRow, mesh: Mesh) -> Entity {
        let transform = Transform {
            position: row.position.into(),
            rotation: row.rotation.into(),
            scale: row.scale.into(),
        };
        let mut entity = Entity::new(EntityKind::parse(&row.kind), row.mesh.clone(), mesh, transform);
        if entity.animated && self.is_kept_static(&row.mesh) {
            entity.animated = false;
        }
        entity
    }

    fn is_kept_static(&self, mesh_path: &str) -> bool {
        self.settings
            .keep_static
            .iter()
            .any(|needle| mesh_path.contains(needle.as_str()))
    }

    /// Index of the pedestal closest to `entity` in the XY plane. Ties go to the earlier one.
    fn nearest_pedestal(&self, entity: &Entity) -> Option<usize> {
        let at = entity.transform.position;
        self.entities
            .iter()
            .enumerate()
            .filter(|(_, e)| e.kind.rests_statues())
            .map(|(i, e)| {
                let d = e.transform.position - at;
                (i, d.x * d.x + d.y * d.y)
            })
            .fold(None, |best: Option<(usize, f32)>, (i, d)| match best {
                Some((_, best_d)) if best_d <= d => best,
                _ => Some((i, d)),
            })
            .map(|(i, _)| i)
    }

    /// Puts every statue on top of its nearest pedestal. Pedestal meshes are taken as unit height.
    pub fn snap_statues_to_pedestals(&mut self) {
        for i in 0..self.entities.len() {
            if self.entities[i].kind != EntityKind::Statue {
                continue;
            }
            let Some(p) = self.nearest_pedestal(&self.entities[i]) else {
                continue;
            };
            let pedestal = &self.entities[p].transform;
            let top = pedestal.position.z + 0.5 * pedestal.scale.z;
            self.entities[i].transform.position.z = top;
        }
    }

    pub fn update(&mut self, dt: Duration) {
        let dt = dt.as_secs_f64();
        self.time += dt;
        if !self.animation_enabled {
            return;
        }
        let step = self.settings.animation_rate * dt as f32;
        for entity in self.entities.iter_mut().filter(|e| e.animated) {
            entity.anim_angle = wrap_degrees(entity.anim_angle + step);
            entity.transform.rotation.z = entity.anim_angle;
        }
    }

    pub fn toggle_animation(&mut self) -> bool {
        self.animation_enabled = !self.animation_enabled;
        log::info!("Animation: {}", on_off(self.animation_enabled));
        self.animation_enabled
    }

    pub fn toggle_shadows(&mut self) -> bool {
        self.shadows_enabled = !self.shadows_enabled;
        log::info!("Shadows: {}", on_off(self.shadows_enabled));
        self.shadows_enabled
    }

    pub fn light_intensity(&self) -> f32 {
        self.light_intensity
    }

    /// Adds `delta` to the light intensity, clamped to `[0, max_intensity]`.
    pub fn change_light(&mut self, delta: f32) -> f32 {
        self.light_intensity = (self.light_intensity + delta).clamp(0.0, self.lighting.max_intensity);
        log::info!("Light intensity: {:.1}", self.light_intensity);
        self.light_intensity
    }

    pub fn brighten(&mut self) -> f32 {
        self.change_light(self.lighting.step)
    }

    pub fn dim(&mut self) -> f32 {
        self.change_light(-self.lighting.step)
    }

    pub fn max_intensity(&self) -> f32 {
        self.lighting.max_intensity
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_entity(&self) -> Option<&Entity> {
        self.selected.and_then(|i| self.entities.get(i))
    }

    /// Selects `index`. An index past the end clears the selection.
    pub fn select(&mut self, index: Option<usize>) -> Option<usize> {
        self.selected = index.filter(|&i| i < self.entities.len());
        self.selected
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Up to three lamp positions, or one light under the middle of the ceiling.
    pub fn lights(&self) -> Vec<Point3<f32>> {
        let lamps: Vec<Point3<f32>> = self
            .entities
            .iter()
            .filter(|e| e.kind == EntityKind::Lamp)
            .take(MAX_LIGHTS)
            .map(|e| {
                let p = e.transform.position - Vector3::new(0.0, 0.0, LAMP_DROP);
                Point3::new(p.x, p.y, p.z)
            })
            .collect();
        if lamps.is_empty() {
            vec![Point3::new(0.0, 0.0, self.room_height - FALLBACK_DROP)]
        } else {
            lamps
        }
    }
}

fn on_off(value: bool) -> &'static str {
    if value { "ON" } else { "OFF" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::mesh::{MeshCounts, Vertex};

    fn cube() -> Mesh {
        let mut mesh = Mesh::with_counts(MeshCounts {
            vertices: 2,
            ..Default::default()
        });
        mesh.vertices.push(Vertex { x: -0.5, y: -0.5, z: -0.5 });
        mesh.vertices.push(Vertex { x: 0.5, y: 0.5, z: 0.5 });
        mesh
    }

    fn place(scene: &mut Scene, kind: EntityKind, path: &str, position: [f32; 3], scale: [f32; 3]) {
        let transform = Transform {
            position: position.into(),
            scale: scale.into(),
            ..Transform::new()
        };
        let mut entity = Entity::new(kind, path, cube(), transform);
        if entity.animated && scene.is_kept_static(path) {
            entity.animated = false;
        }
        scene.entities.push(entity);
    }

    fn scene() -> Scene {
        Scene::new(&Config::default())
    }

    #[test]
    fn statue_snaps_to_nearest_pedestal() {
        let mut scene = scene();
        place(&mut scene, EntityKind::Pedestal, "far.obj", [5.0, 5.0, 0.0], [1.0, 1.0, 4.0]);
        place(&mut scene, EntityKind::Pedestal, "near.obj", [0.1, 0.0, 0.5], [1.0, 1.0, 1.0]);
        place(&mut scene, EntityKind::Statue, "s.obj", [0.0, 0.0, 7.0], [1.0, 1.0, 1.0]);
        scene.snap_statues_to_pedestals();
        assert_eq!(scene.entities[2].transform.position.z, 1.0);
    }

    #[test]
    fn statue_without_pedestal_keeps_its_height() {
        let mut scene = scene();
        place(&mut scene, EntityKind::Statue, "s.obj", [0.0, 0.0, 2.5], [1.0, 1.0, 1.0]);
        scene.snap_statues_to_pedestals();
        assert_eq!(scene.entities[0].transform.position.z, 2.5);
    }

    #[test]
    fn keep_static_list_stops_animation() {
        let mut scene = scene();
        place(&mut scene, EntityKind::Statue, "models/fairy.obj", [0.0; 3], [1.0; 3]);
        place(&mut scene, EntityKind::Statue, "models/venus.obj", [0.0; 3], [1.0; 3]);
        assert!(!scene.entities[0].animated);
        assert!(scene.entities[1].animated);
    }

    #[test]
    fn animation_advances_and_wraps() {
        let mut scene = scene();
        place(&mut scene, EntityKind::Statue, "s.obj", [0.0; 3], [1.0; 3]);
        scene.entities[0].anim_angle = 350.0;
        scene.update(Duration::from_secs(1));
        assert!((scene.entities[0].anim_angle - 10.0).abs() < 1e-3);
        assert_eq!(scene.entities[0].transform.rotation.z, scene.entities[0].anim_angle);
        assert!((scene.time - 1.0).abs() < 1e-9);
    }

    #[test]
    fn paused_animation_holds_its_angle() {
        let mut scene = scene();
        place(&mut scene, EntityKind::Statue, "s.obj", [0.0; 3], [1.0; 3]);
        scene.update(Duration::from_millis(2250));
        assert!((scene.entities[0].anim_angle - 45.0).abs() < 1e-3);
        scene.toggle_animation();
        scene.update(Duration::from_secs(100));
        assert!((scene.entities[0].anim_angle - 45.0).abs() < 1e-3);
        scene.toggle_animation();
        scene.update(Duration::from_millis(500));
        assert!((scene.entities[0].anim_angle - 55.0).abs() < 1e-3);
    }

    #[test]
    fn light_intensity_is_clamped() {
        let mut scene = scene();
        assert_eq!(scene.light_intensity(), 1.0);
        scene.change_light(10.0);
        assert_eq!(scene.light_intensity(), 3.0);
        scene.change_light(-10.0);
        assert_eq!(scene.light_intensity(), 0.0);
        scene.brighten();
        assert!((scene.light_intensity() - 0.1).abs() < 1e-6);
        scene.dim();
        scene.dim();
        assert_eq!(scene.light_intensity(), 0.0);
    }

    #[test]
    fn selection_stays_in_range() {
        let mut scene = scene();
        place(&mut scene, EntityKind::Painting, "p.obj", [0.0; 3], [1.0; 3]);
        assert_eq!(scene.select(Some(0)), Some(0));
        assert!(scene.selected_entity().is_some());
        assert_eq!(scene.select(Some(1)), None);
        scene.select(Some(0));
        scene.clear_selection();
        assert_eq!(scene.selected(), None);
    }

    #[test]
    fn lamps_light_the_room_or_fall_back_to_the_ceiling() {
        let mut scene = scene();
        assert_eq!(scene.lights(), vec![Point3::new(0.0, 0.0, 3.75)]);
        for y in [-8.0, -4.0, 0.0, 4.0] {
            place(&mut scene, EntityKind::Lamp, "lamp.obj", [0.0, y, 3.9], [1.0; 3]);
        }
        let lights = scene.lights();
        assert_eq!(lights.len(), MAX_LIGHTS);
        assert_eq!(lights[0].y, -8.0);
        assert!((lights[0].z - 3.7).abs() < 1e-5);
    }
}
