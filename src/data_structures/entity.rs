//! Placed exhibits and their kinds.
//!
//! Every behavioural difference between exhibit types (does it cast a shadow,
//! is it glass, does it spin) lives in the capability methods of
//! [`EntityKind`] instead of string comparisons spread across the renderer.

use std::fmt;

use cgmath::{Matrix4, Point3, Vector3};

use crate::{
    data_structures::{mesh::Mesh, transform::Transform},
    resources::TextureHandle,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Statue,
    Pedestal,
    Painting,
    Lamp,
    CaseGlass,
    Plane,
    Other(String),
}

impl EntityKind {
    pub fn parse(tag: &str) -> Self {
        match tag {
            "statue" => Self::Statue,
            "pedestal" => Self::Pedestal,
            "painting" => Self::Painting,
            "lamp" => Self::Lamp,
            "case_glass" => Self::CaseGlass,
            "plane" => Self::Plane,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            Self::Statue => "statue",
            Self::Pedestal => "pedestal",
            Self::Painting => "painting",
            Self::Lamp => "lamp",
            Self::CaseGlass => "case_glass",
            Self::Plane => "plane",
            Self::Other(tag) => tag,
        }
    }

    /// Flat or emissive things throw no floor shadow.
    pub fn casts_shadow(&self) -> bool {
        !matches!(
            self,
            Self::Painting | Self::Plane | Self::Lamp | Self::CaseGlass
        )
    }

    pub fn is_transparent(&self) -> bool {
        matches!(self, Self::CaseGlass)
    }

    /// Spins on its pedestal unless listed as static.
    pub fn animates(&self) -> bool {
        matches!(self, Self::Statue)
    }

    /// Lowest mesh point is lifted to the authored height.
    pub fn auto_grounds(&self) -> bool {
        matches!(self, Self::Statue)
    }

    /// Statues get snapped onto the top of these.
    pub fn rests_statues(&self) -> bool {
        matches!(self, Self::Pedestal)
    }

    /// Drawn without back-face culling.
    pub fn two_sided(&self) -> bool {
        matches!(self, Self::Statue | Self::CaseGlass)
    }

    pub fn shadow_alpha_factor(&self, pedestal_factor: f32) -> f32 {
        match self {
            Self::Pedestal => pedestal_factor,
            _ => 1.0,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Local-space bounding sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub centre: Point3<f32>,
    pub radius: f32,
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub kind: EntityKind,
    pub mesh_path: String,
    pub mesh: Mesh,
    pub texture: TextureHandle,
    pub transform: Transform,
    pub animated: bool,
    /// Degrees, persisted across animation pauses.
    pub anim_angle: f32,
    pub bounds: Bounds,
    pub min_z: f32,
    /// Added to the position's Z when drawing so the mesh base sits at the authored height.
    pub ground_offset: f32,
}

impl Entity {
    /// Builds an entity around a loaded mesh and precomputes its bounds.
    pub fn new(kind: EntityKind, mesh_path: impl Into<String>, mesh: Mesh, transform: Transform) -> Self {
        let (centre, radius) = mesh.bounding_sphere();
        let min_z = mesh.min_z();
        let ground_offset = if kind.auto_grounds() {
            -min_z * transform.scale.z
        } else {
            0.0
        };
        Self {
            animated: kind.animates(),
            kind,
            mesh_path: mesh_path.into(),
            mesh,
            texture: TextureHandle::NONE,
            anim_angle: transform.rotation.z,
            transform,
            bounds: Bounds { centre, radius },
            min_z,
            ground_offset,
        }
    }

    /// The transform actually drawn: position lifted by the grounding offset.
    pub fn placed_transform(&self) -> Transform {
        Transform {
            position: self.transform.position + Vector3::new(0.0, 0.0, self.ground_offset),
            ..self.transform
        }
    }

    pub fn model_matrix(&self) -> Matrix4<f32> {
        self.placed_transform().to_matrix()
    }

    /// Bounding sphere in world space. The radius is scaled by the largest scale component.
    pub fn world_sphere(&self) -> (Point3<f32>, f32) {
        let placed = self.placed_transform();
        (
            placed.apply(self.bounds.centre),
            self.bounds.radius * placed.max_scale(),
        )
    }

    pub fn vertex_count(&self) -> usize {
        self.mesh.vertex_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::mesh::{MeshCounts, Vertex};

    fn unit_column() -> Mesh {
        let mut mesh = Mesh::with_counts(MeshCounts {
            vertices: 2,
            ..Default::default()
        });
        mesh.vertices.push(Vertex { x: -0.5, y: -0.5, z: -1.0 });
        mesh.vertices.push(Vertex { x: 0.5, y: 0.5, z: 1.0 });
        mesh
    }

    #[test]
    fn tags_round_trip_through_kinds() {
        for tag in ["statue", "pedestal", "painting", "lamp", "case_glass", "plane", "bench"] {
            assert_eq!(EntityKind::parse(tag).tag(), tag);
        }
        assert_eq!(EntityKind::parse("bench"), EntityKind::Other("bench".into()));
    }

    #[test]
    fn capability_table() {
        assert!(EntityKind::Statue.casts_shadow());
        assert!(EntityKind::Pedestal.casts_shadow());
        assert!(EntityKind::Other("bench".into()).casts_shadow());
        for exempt in [EntityKind::Painting, EntityKind::Plane, EntityKind::Lamp, EntityKind::CaseGlass] {
            assert!(!exempt.casts_shadow());
        }
        assert!(EntityKind::CaseGlass.is_transparent());
        assert!(!EntityKind::Statue.is_transparent());
        assert_eq!(EntityKind::Pedestal.shadow_alpha_factor(0.75), 0.75);
        assert_eq!(EntityKind::Statue.shadow_alpha_factor(0.75), 1.0);
    }

    #[test]
    fn statues_are_grounded_by_their_lowest_point() {
        let transform = Transform {
            scale: Vector3::new(1.0, 1.0, 2.0),
            rotation: Vector3::new(0.0, 0.0, 30.0),
            ..Transform::new()
        };
        let statue = Entity::new(EntityKind::Statue, "venus.obj", unit_column(), transform);
        assert_eq!(statue.ground_offset, 2.0);
        assert_eq!(statue.anim_angle, 30.0);
        assert!(statue.animated);

        let pedestal = Entity::new(EntityKind::Pedestal, "pedestal.obj", unit_column(), transform);
        assert_eq!(pedestal.ground_offset, 0.0);
        assert!(!pedestal.animated);
    }

    #[test]
    fn world_sphere_uses_placed_transform() {
        let transform = Transform {
            position: Vector3::new(1.0, 0.0, 0.0),
            scale: Vector3::new(1.0, 3.0, 1.0),
            ..Transform::new()
        };
        let statue = Entity::new(EntityKind::Statue, "s.obj", unit_column(), transform);
        let (centre, radius) = statue.world_sphere();
        assert_eq!(centre, Point3::new(1.0, 0.0, 1.0));
        assert!((radius - 1.5f32.sqrt() * 3.0).abs() < 1e-5);
    }
}
