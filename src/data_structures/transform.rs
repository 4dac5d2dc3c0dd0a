//! Placement of an exhibit in the world.
//!
//! Rotations are Euler angles in degrees applied X, then Y, then Z in the
//! local frame, the same composition rendering, shadows and picking use.

use cgmath::{Deg, Matrix, Matrix3, Matrix4, Point3, SquareMatrix, Transform as _, Vector3};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vector3<f32>,
    /// Degrees about X, Y and Z.
    pub rotation: Vector3<f32>,
    pub scale: Vector3<f32>,
}

impl Transform {
    /// Identity transformation (no move, rotate, or scale).
    pub fn new() -> Self {
        Self {
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation: Vector3::new(0.0, 0.0, 0.0),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn rotation_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_angle_x(Deg(self.rotation.x))
            * Matrix4::from_angle_y(Deg(self.rotation.y))
            * Matrix4::from_angle_z(Deg(self.rotation.z))
    }

    /// translate · Rx · Ry · Rz · scale
    pub fn to_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.position)
            * self.rotation_matrix()
            * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    /// Maps a local point through scale, rotation and translation.
    pub fn apply(&self, point: Point3<f32>) -> Point3<f32> {
        self.to_matrix().transform_point(point)
    }

    /// Largest absolute scale component, used to bound radii under non-uniform scale.
    pub fn max_scale(&self) -> f32 {
        self.scale.x.abs().max(self.scale.y.abs()).max(self.scale.z.abs())
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

/// The raw transform is the actual data stored on the GPU per draw.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TransformRaw {
    pub model: [[f32; 4]; 4],
    /// Inverse transpose of the model matrix, padded to three vec4 columns.
    pub normal: [[f32; 4]; 3],
}

impl TransformRaw {
    pub fn from_matrix(model: Matrix4<f32>) -> Self {
        let linear = Matrix3::from_cols(model.x.truncate(), model.y.truncate(), model.z.truncate());
        let normal = linear
            .invert()
            .map(|inverse| inverse.transpose())
            .unwrap_or(linear);
        Self {
            model: model.into(),
            normal: [
                normal.x.extend(0.0).into(),
                normal.y.extend(0.0).into(),
                normal.z.extend(0.0).into(),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn close(a: Point3<f32>, b: Point3<f32>) -> bool {
        (a.x - b.x).abs() < EPS && (a.y - b.y).abs() < EPS && (a.z - b.z).abs() < EPS
    }

    #[test]
    fn scale_rotate_then_translate() {
        let transform = Transform {
            position: Vector3::new(1.0, 2.0, 3.0),
            rotation: Vector3::new(0.0, 0.0, 90.0),
            scale: Vector3::new(2.0, 1.0, 1.0),
        };
        // (1,0,0) -> scaled (2,0,0) -> rotated (0,2,0) -> moved (1,4,3)
        assert!(close(transform.apply(Point3::new(1.0, 0.0, 0.0)), Point3::new(1.0, 4.0, 3.0)));
    }

    #[test]
    fn x_rotation_is_applied_outermost() {
        let transform = Transform {
            rotation: Vector3::new(90.0, 0.0, 90.0),
            ..Transform::new()
        };
        // Rz first: (1,0,0) -> (0,1,0), then Rx: (0,1,0) -> (0,0,1)
        assert!(close(transform.apply(Point3::new(1.0, 0.0, 0.0)), Point3::new(0.0, 0.0, 1.0)));
    }

    #[test]
    fn max_scale_ignores_sign() {
        let transform = Transform {
            scale: Vector3::new(1.0, -3.0, 2.0),
            ..Transform::new()
        };
        assert_eq!(transform.max_scale(), 3.0);
    }
}
