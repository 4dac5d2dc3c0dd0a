//! Indexed triangle meshes.
//!
//! A [`Mesh`] stores its vertices, texture coordinates and normals in arrays
//! whose slot 0 always holds a safe default. Element indices coming from a
//! mesh file are 1-based, so a well formed file never touches slot 0, while a
//! zero, negative or out-of-range index resolves to that default instead of
//! reading past the end of the array.
//!
//! # Key types
//!
//! - [`Mesh`] owns the element arrays and the triangle list
//! - [`MeshCounts`] is the sizing contract produced by the loader's counting pass
//! - [`FacePoint`] and [`Triangle`] reference elements by raw file index
//! - [`ResolvedPoint`] is a triangle corner after index resolution

use cgmath::{Point3, Vector3};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vertex {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TexCoord {
    pub u: f32,
    pub v: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normal {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Default for Normal {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 1.0,
        }
    }
}

/// One corner of a face as written in the file. An index of 0 means "not given".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FacePoint {
    pub vertex: i32,
    pub tex_coord: i32,
    pub normal: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Triangle {
    pub points: [FacePoint; 3],
}

/// Element totals found by the counting pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MeshCounts {
    pub vertices: usize,
    pub tex_coords: usize,
    pub normals: usize,
    pub triangles: usize,
}

/// A triangle corner with every index replaced by the element it refers to.
///
/// The texture `v` coordinate is flipped so that image rows map top to bottom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedPoint {
    pub position: Vertex,
    pub tex_coord: TexCoord,
    pub normal: Normal,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub tex_coords: Vec<TexCoord>,
    pub normals: Vec<Normal>,
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    /// Allocates exact-size storage for `counts` and populates slot 0 with defaults.
    pub fn with_counts(counts: MeshCounts) -> Self {
        let mut vertices = Vec::with_capacity(counts.vertices + 1);
        vertices.push(Vertex::default());
        let mut tex_coords = Vec::with_capacity(counts.tex_coords + 1);
        tex_coords.push(TexCoord::default());
        let mut normals = Vec::with_capacity(counts.normals + 1);
        normals.push(Normal::default());
        Self {
            vertices,
            tex_coords,
            normals,
            triangles: Vec::with_capacity(counts.triangles),
        }
    }

    /// Number of real vertices, not counting the default slot.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len().saturating_sub(1)
    }

    pub fn tex_coord_count(&self) -> usize {
        self.tex_coords.len().saturating_sub(1)
    }

    pub fn normal_count(&self) -> usize {
        self.normals.len().saturating_sub(1)
    }

    pub fn counts(&self) -> MeshCounts {
        MeshCounts {
            vertices: self.vertex_count(),
            tex_coords: self.tex_coord_count(),
            normals: self.normal_count(),
            triangles: self.triangles.len(),
        }
    }

    pub fn vertex(&self, index: i32) -> Vertex {
        resolve(&self.vertices, index)
    }

    pub fn tex_coord(&self, index: i32) -> TexCoord {
        resolve(&self.tex_coords, index)
    }

    pub fn normal(&self, index: i32) -> Normal {
        resolve(&self.normals, index)
    }

    pub fn resolve_point(&self, point: FacePoint) -> ResolvedPoint {
        let tex_coord = self.tex_coord(point.tex_coord);
        ResolvedPoint {
            position: self.vertex(point.vertex),
            tex_coord: TexCoord {
                u: tex_coord.u,
                v: 1.0 - tex_coord.v,
            },
            normal: self.normal(point.normal),
        }
    }

    /// Every triangle with its indices resolved. Never panics, whatever the indices are.
    pub fn resolved_triangles(&self) -> impl Iterator<Item = [ResolvedPoint; 3]> + '_ {
        self.triangles
            .iter()
            .map(|t| t.points.map(|p| self.resolve_point(p)))
    }

    fn real_vertices(&self) -> &[Vertex] {
        self.vertices.get(1..).unwrap_or(&[])
    }

    /// Midpoint and half diagonal of the axis-aligned extents of the real vertices.
    ///
    /// A mesh without vertices gets a unit sphere at the origin.
    pub fn bounding_sphere(&self) -> (Point3<f32>, f32) {
        let vertices = self.real_vertices();
        let Some(first) = vertices.first() else {
            return (Point3::new(0.0, 0.0, 0.0), 1.0);
        };
        let start = Vector3::new(first.x, first.y, first.z);
        let (min, max) = vertices.iter().fold((start, start), |(min, max), v| {
            (
                Vector3::new(min.x.min(v.x), min.y.min(v.y), min.z.min(v.z)),
                Vector3::new(max.x.max(v.x), max.y.max(v.y), max.z.max(v.z)),
            )
        });
        let centre = (min + max) * 0.5;
        let radius = cgmath::InnerSpace::magnitude((max - min) * 0.5).max(MIN_RADIUS);
        (Point3::new(centre.x, centre.y, centre.z), radius)
    }

    /// Lowest local Z of the real vertices, 0 for an empty mesh.
    pub fn min_z(&self) -> f32 {
        self.real_vertices()
            .iter()
            .map(|v| v.z)
            .reduce(f32::min)
            .unwrap_or(0.0)
    }
}

const MIN_RADIUS: f32 = 0.001;

fn resolve<T: Copy + Default>(items: &[T], index: i32) -> T {
    if index <= 0 {
        return items.first().copied().unwrap_or_default();
    }
    items
        .get(index as usize)
        .or_else(|| items.first())
        .copied()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle_mesh() -> Mesh {
        let mut mesh = Mesh::with_counts(MeshCounts {
            vertices: 3,
            tex_coords: 1,
            normals: 1,
            triangles: 1,
        });
        mesh.vertices.extend([
            Vertex { x: 0.0, y: 0.0, z: 1.0 },
            Vertex { x: 2.0, y: 0.0, z: 1.0 },
            Vertex { x: 0.0, y: 2.0, z: 3.0 },
        ]);
        mesh.tex_coords.push(TexCoord { u: 0.25, v: 0.75 });
        mesh.normals.push(Normal { x: 1.0, y: 0.0, z: 0.0 });
        mesh.triangles.push(Triangle {
            points: [
                FacePoint { vertex: 1, tex_coord: 1, normal: 1 },
                FacePoint { vertex: 2, tex_coord: 0, normal: 0 },
                FacePoint { vertex: 3, tex_coord: 0, normal: 0 },
            ],
        });
        mesh
    }

    #[test]
    fn slot_zero_holds_defaults() {
        let mesh = Mesh::with_counts(MeshCounts::default());
        assert_eq!(mesh.vertices, vec![Vertex::default()]);
        assert_eq!(mesh.tex_coords, vec![TexCoord { u: 0.0, v: 0.0 }]);
        assert_eq!(mesh.normals, vec![Normal { x: 0.0, y: 0.0, z: 1.0 }]);
        assert_eq!(mesh.vertex_count(), 0);
    }

    #[test]
    fn out_of_range_indices_resolve_to_defaults() {
        let mesh = triangle_mesh();
        for index in [0, -1, -40, 4, 9999, i32::MAX, i32::MIN] {
            assert_eq!(mesh.vertex(index), Vertex::default());
            assert_eq!(mesh.tex_coord(index), TexCoord::default());
            assert_eq!(mesh.normal(index), Normal::default());
        }
        assert_eq!(mesh.vertex(2), Vertex { x: 2.0, y: 0.0, z: 1.0 });
    }

    #[test]
    fn resolved_triangles_flip_v_and_fill_defaults() {
        let mesh = triangle_mesh();
        let [a, b, _] = mesh.resolved_triangles().next().unwrap();
        assert_eq!(a.tex_coord, TexCoord { u: 0.25, v: 0.25 });
        assert_eq!(a.normal, Normal { x: 1.0, y: 0.0, z: 0.0 });
        assert_eq!(b.tex_coord, TexCoord { u: 0.0, v: 1.0 });
        assert_eq!(b.normal, Normal::default());
    }

    #[test]
    fn bounding_sphere_spans_extents() {
        let mesh = triangle_mesh();
        let (centre, radius) = mesh.bounding_sphere();
        assert_eq!(centre, Point3::new(1.0, 1.0, 2.0));
        assert!((radius - 3f32.sqrt()).abs() < 1e-6);
        assert_eq!(mesh.min_z(), 1.0);
    }

    #[test]
    fn empty_mesh_has_unit_sphere() {
        let mesh = Mesh::with_counts(MeshCounts::default());
        assert_eq!(mesh.bounding_sphere(), (Point3::new(0.0, 0.0, 0.0), 1.0));
        assert_eq!(mesh.min_z(), 0.0);
    }

    #[test]
    fn single_point_mesh_keeps_minimum_radius() {
        let mut mesh = Mesh::with_counts(MeshCounts {
            vertices: 1,
            ..Default::default()
        });
        mesh.vertices.push(Vertex { x: 1.0, y: 1.0, z: 1.0 });
        let (_, radius) = mesh.bounding_sphere();
        assert_eq!(radius, MIN_RADIUS);
    }
}
