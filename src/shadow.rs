//! Planar floor shadows from a single key light.
//!
//! Every shadow caster is drawn a second time squashed onto the floor plane
//! through [`shadow_matrix`], dark and translucent. Meshes above the proxy
//! threshold are replaced by a flat disc under their bounding sphere.

use std::f32::consts::TAU;

use cgmath::{Matrix4, Point3, Vector4};

use crate::{
    config::ShadowConfig,
    data_structures::{entity::Entity, scene::Scene},
    render::{DrawCommand, Geometry, Pass, RenderState, Surface},
    resources::TextureHandle,
};

/// Below this intensity the lights count as off and nothing is cast.
pub const LIGHT_OFF_THRESHOLD: f32 = 0.001;
/// Lifts the proxy disc off the mesh's lowest point.
const PROXY_LIFT: f32 = 0.002;

/// Projects geometry onto `plane` (`ax + by + cz + d = 0`) as seen from `light`.
///
/// `light.w` is 1 for a point light and 0 for a directional one.
pub fn shadow_matrix(plane: Vector4<f32>, light: Vector4<f32>) -> Matrix4<f32> {
    let dot = plane.x * light.x + plane.y * light.y + plane.z * light.z + plane.w * light.w;
    let column = |c: usize| {
        let delta = |r: usize| if r == c { dot } else { 0.0 };
        Vector4::new(
            delta(0) - light.x * plane[c],
            delta(1) - light.y * plane[c],
            delta(2) - light.z * plane[c],
            delta(3) - light.w * plane[c],
        )
    };
    Matrix4::from_cols(column(0), column(1), column(2), column(3))
}

/// The light closest to the long axis of the room. Ties go to the earlier light.
pub fn key_light(lights: &[Point3<f32>]) -> Option<Point3<f32>> {
    lights
        .iter()
        .copied()
        .fold(None, |best: Option<Point3<f32>>, light| match best {
            Some(b) if b.y.abs() <= light.y.abs() => Some(b),
            _ => Some(light),
        })
}

/// Shadow opacity for the current light intensity, before the per-kind factor.
pub fn shadow_alpha(intensity: f32, max_intensity: f32, max_alpha: f32) -> f32 {
    if max_intensity <= 0.0 {
        return 0.0;
    }
    max_alpha * (intensity / max_intensity).clamp(0.0, 1.0)
}

/// Closed fan rim in local space at the base of the bounding sphere.
pub fn proxy_fan(entity: &Entity, segments: usize) -> Geometry {
    let segments = segments.max(3);
    let Point3 { x: cx, y: cy, .. } = entity.bounds.centre;
    let z = entity.min_z + PROXY_LIFT;
    let r = entity.bounds.radius;
    let rim = (0..=segments)
        .map(|i| {
            let a = i as f32 * TAU / segments as f32;
            Point3::new(cx + a.cos() * r, cy + a.sin() * r, z)
        })
        .collect();
    Geometry::Fan {
        centre: Point3::new(cx, cy, z),
        rim,
    }
}

/// Floor shadow draws for every caster, or none when the lights are off.
pub fn shadow_commands(scene: &Scene, lights: &[Point3<f32>], config: &ShadowConfig) -> Vec<DrawCommand> {
    let intensity = scene.light_intensity();
    if intensity <= LIGHT_OFF_THRESHOLD {
        return Vec::new();
    }
    let Some(light) = key_light(lights) else {
        return Vec::new();
    };

    let floor = Vector4::new(0.0, 0.0, 1.0, 0.0);
    let projection = Matrix4::from_translation([0.0, 0.0, config.plane_offset].into())
        * shadow_matrix(floor, light.to_homogeneous());
    let alpha = shadow_alpha(intensity, scene.max_intensity(), config.max_alpha);

    scene
        .entities
        .iter()
        .enumerate()
        .filter(|(_, e)| e.kind.casts_shadow())
        .map(|(i, e)| {
            let colour = [0.0, 0.0, 0.0, alpha * e.kind.shadow_alpha_factor(config.pedestal_factor)];
            let geometry = if e.vertex_count() > config.proxy_vertex_threshold {
                proxy_fan(e, config.proxy_segments)
            } else {
                Geometry::Entity(i)
            };
            DrawCommand {
                pass: Pass::Shadow,
                geometry,
                transform: projection * e.model_matrix(),
                texture: TextureHandle::NONE,
                colour,
                surface: Surface::flat(colour),
                state: RenderState::SHADOW,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Config,
        data_structures::{
            entity::EntityKind,
            mesh::{Mesh, MeshCounts, Vertex},
            transform::Transform,
        },
    };
    use cgmath::{Transform as _, Vector3};

    const EPS: f32 = 1e-5;

    fn column_mesh(vertices: usize) -> Mesh {
        let mut mesh = Mesh::with_counts(MeshCounts {
            vertices,
            ..Default::default()
        });
        for i in 0..vertices {
            let z = if i % 2 == 0 { 0.0 } else { 1.0 };
            mesh.vertices.push(Vertex { x: 0.0, y: 0.0, z });
        }
        mesh
    }

    fn scene_with(kinds: &[EntityKind]) -> Scene {
        let mut scene = Scene::new(&Config::default());
        for kind in kinds {
            scene
                .entities
                .push(Entity::new(kind.clone(), "m.obj", column_mesh(2), Transform::new()));
        }
        scene
    }

    #[test]
    fn points_land_on_the_floor_along_the_light_ray() {
        let light = Vector4::new(0.0, 0.0, 4.0, 1.0);
        let m = shadow_matrix(Vector4::new(0.0, 0.0, 1.0, 0.0), light);
        let p = m.transform_point(Point3::new(1.0, 0.0, 2.0));
        assert!(p.z.abs() < EPS);
        assert!((p.x - 2.0).abs() < EPS);
        assert!(p.y.abs() < EPS);
    }

    #[test]
    fn directional_light_shears_instead_of_spreading() {
        let light = Vector4::new(1.0, 0.0, 1.0, 0.0);
        let m = shadow_matrix(Vector4::new(0.0, 0.0, 1.0, 0.0), light);
        let p = m.transform_point(Point3::new(0.0, 0.0, 2.0));
        assert!((p.x + 2.0).abs() < EPS);
        assert!(p.z.abs() < EPS);
    }

    #[test]
    fn key_light_is_closest_to_the_centre_line() {
        let lights = [
            Point3::new(0.0, -6.0, 3.8),
            Point3::new(0.0, 1.0, 3.8),
            Point3::new(0.0, -1.0, 3.8),
        ];
        assert_eq!(key_light(&lights), Some(lights[1]));
        assert_eq!(key_light(&[]), None);
    }

    #[test]
    fn alpha_follows_intensity() {
        assert_eq!(shadow_alpha(0.0, 3.0, 0.72), 0.0);
        assert!((shadow_alpha(1.5, 3.0, 0.72) - 0.36).abs() < EPS);
        assert!((shadow_alpha(9.0, 3.0, 0.72) - 0.72).abs() < EPS);
    }

    #[test]
    fn only_casters_get_shadows_and_pedestals_are_lighter() {
        let scene = scene_with(&[
            EntityKind::Statue,
            EntityKind::Pedestal,
            EntityKind::Painting,
            EntityKind::CaseGlass,
            EntityKind::Lamp,
        ]);
        let lights = scene.lights();
        let commands = shadow_commands(&scene, &lights, &ShadowConfig::default());
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].geometry, Geometry::Entity(0));
        assert_eq!(commands[1].geometry, Geometry::Entity(1));
        let full = commands[0].colour[3];
        assert!((commands[1].colour[3] - full * 0.75).abs() < EPS);
        assert!(commands.iter().all(|c| c.state == RenderState::SHADOW));
    }

    #[test]
    fn lights_off_cast_nothing() {
        let mut scene = scene_with(&[EntityKind::Statue]);
        scene.change_light(-10.0);
        let lights = scene.lights();
        assert!(shadow_commands(&scene, &lights, &ShadowConfig::default()).is_empty());
    }

    #[test]
    fn heavy_meshes_use_a_disc() {
        let mut scene = Scene::new(&Config::default());
        let transform = Transform {
            position: Vector3::new(1.0, 1.0, 0.0),
            ..Transform::new()
        };
        scene
            .entities
            .push(Entity::new(EntityKind::Other("bust".into()), "bust.obj", column_mesh(12), transform));
        let config = ShadowConfig {
            proxy_vertex_threshold: 10,
            ..ShadowConfig::default()
        };
        let lights = scene.lights();
        let commands = shadow_commands(&scene, &lights, &config);
        match &commands[0].geometry {
            Geometry::Fan { centre, rim } => {
                assert_eq!(rim.len(), config.proxy_segments + 1);
                assert!((centre.z - PROXY_LIFT).abs() < EPS);
                assert!((rim[0].x - (centre.x + 0.5)).abs() < EPS);
                let last = rim[rim.len() - 1];
                assert!((last.x - rim[0].x).abs() < EPS && (last.y - rim[0].y).abs() < EPS);
            }
            other => panic!("expected a fan, got {:?}", other),
        }
    }

    #[test]
    fn shadows_sit_just_above_the_floor() {
        let scene = scene_with(&[EntityKind::Statue]);
        let lights = scene.lights();
        let config = ShadowConfig::default();
        let commands = shadow_commands(&scene, &lights, &config);
        let top = commands[0].transform.transform_point(Point3::new(0.0, 0.0, 1.0));
        assert!((top.z - config.plane_offset).abs() < EPS);
    }
}
