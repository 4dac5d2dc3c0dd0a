//! Mouse picking against exhibit bounding spheres.
//!
//! A click inside the viewport is unprojected through the inverse of the
//! frame's projection-view matrix into a world-space ray. Every entity is
//! tested as a sphere (its local bounds placed by its drawn transform) and the
//! nearest hit in front of the camera wins.
//!
//! The projection used here is the one the frame was drawn with, so a click
//! lands on what is visible in both fly and walk mode.

use cgmath::{InnerSpace, Matrix4, Point3, SquareMatrix, Vector3, Vector4};

use crate::{
    camera::{Camera, Projection},
    data_structures::scene::Scene,
};

/// Drawable rectangle inside the window, in pixels with the origin at the top left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// Largest centred rectangle of aspect `ratio` that fits the window.
    pub fn letterbox(window_width: u32, window_height: u32, ratio: f32) -> Self {
        if window_width == 0 || window_height == 0 || ratio <= 0.0 {
            return Self {
                x: 0,
                y: 0,
                width: window_width,
                height: window_height,
            };
        }
        let ratio = f64::from(ratio);
        let window_ratio = f64::from(window_width) / f64::from(window_height);
        if window_ratio > ratio {
            let width = (f64::from(window_height) * ratio) as u32;
            Self {
                x: (window_width - width) / 2,
                y: 0,
                width,
                height: window_height,
            }
        } else {
            let height = ((f64::from(window_width) / ratio) as u32).min(window_height);
            Self {
                x: 0,
                y: (window_height - height) / 2,
                width: window_width,
                height,
            }
        }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        let (left, top) = (f64::from(self.x), f64::from(self.y));
        x >= left && x < left + f64::from(self.width) && y >= top && y < top + f64::from(self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Point3<f32>,
    /// Unit length.
    pub direction: Vector3<f32>,
}

/// Smallest `w` an unprojected point may have before the matrix counts as degenerate.
const MIN_W: f32 = 1e-12;

fn unproject(inverse: &Matrix4<f32>, x: f32, y: f32, z: f32) -> Option<Point3<f32>> {
    let p = inverse * Vector4::new(x, y, z, 1.0);
    if p.w.abs() < MIN_W || !p.w.is_finite() {
        return None;
    }
    Some(Point3::new(p.x / p.w, p.y / p.w, p.z / p.w))
}

/// World-space ray from the near plane through the window position `(x, y)`.
///
/// Returns `None` outside the viewport or when the projection-view matrix cannot be inverted.
pub fn screen_ray(camera: &Camera, projection: &Projection, viewport: &Viewport, x: f64, y: f64) -> Option<Ray> {
    if viewport.is_empty() || !viewport.contains(x, y) {
        return None;
    }
    let view_proj = projection.calc_matrix(camera.walk_mode()) * camera.view_matrix();
    let inverse = view_proj.invert()?;

    let ndc_x = 2.0 * (x - f64::from(viewport.x)) / f64::from(viewport.width) - 1.0;
    let ndc_y = 1.0 - 2.0 * (y - f64::from(viewport.y)) / f64::from(viewport.height);
    let near = unproject(&inverse, ndc_x as f32, ndc_y as f32, -1.0)?;
    let far = unproject(&inverse, ndc_x as f32, ndc_y as f32, 1.0)?;

    let direction = far - near;
    let length = direction.magnitude();
    if length <= f32::EPSILON || !length.is_finite() {
        return None;
    }
    Some(Ray {
        origin: near,
        direction: direction / length,
    })
}

/// Distance along `ray` to the first intersection with the sphere in front of the origin.
///
/// From inside the sphere this is the exit point.
pub fn ray_sphere(ray: &Ray, centre: Point3<f32>, radius: f32) -> Option<f32> {
    let oc = ray.origin - centre;
    let b = oc.dot(ray.direction);
    let c = oc.magnitude2() - radius * radius;
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let s = disc.sqrt();
    [-b - s, -b + s].into_iter().find(|t| *t >= 0.0)
}

/// Index of the nearest entity under the window position, if any.
pub fn pick_entity(
    scene: &Scene,
    camera: &Camera,
    projection: &Projection,
    viewport: &Viewport,
    x: f64,
    y: f64,
) -> Option<usize> {
    let ray = screen_ray(camera, projection, viewport, x, y)?;
    let hit = scene
        .entities
        .iter()
        .enumerate()
        .filter_map(|(i, entity)| {
            let (centre, radius) = entity.world_sphere();
            ray_sphere(&ray, centre, radius).map(|t| (i, t))
        })
        .fold(None, |best: Option<(usize, f32)>, (i, t)| match best {
            Some((_, best_t)) if best_t <= t => best,
            _ => Some((i, t)),
        })
        .map(|(i, _)| i);

    if let Some(i) = hit {
        log::info!("Picked #{} ({})", i, scene.entities[i].kind);
    }
    hit
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CameraConfig, Config, RoomConfig};
    use cgmath::Deg;

    const EPS: f32 = 1e-3;

    fn camera_looking_along_x() -> Camera {
        Camera::from_config(&RoomConfig::default(), &CameraConfig::default())
    }

    fn setup() -> (Camera, Projection, Viewport) {
        let config = Config::default();
        let viewport = Viewport::letterbox(800, 600, config.camera.viewport_ratio);
        let projection = Projection::new(viewport.width, viewport.height, &config.camera);
        (camera_looking_along_x(), projection, viewport)
    }

    #[test]
    fn letterbox_centres_the_viewport() {
        let wide = Viewport::letterbox(1000, 600, 4.0 / 3.0);
        assert_eq!(wide, Viewport { x: 100, y: 0, width: 800, height: 600 });
        let tall = Viewport::letterbox(800, 1000, 4.0 / 3.0);
        assert_eq!(tall, Viewport { x: 0, y: 200, width: 800, height: 600 });
        assert!(tall.contains(10.0, 200.0));
        assert!(!tall.contains(10.0, 199.0));
        assert!(!tall.contains(800.0, 300.0));
    }

    #[test]
    fn centre_ray_points_along_the_view_direction() {
        let (camera, projection, viewport) = setup();
        let ray = screen_ray(&camera, &projection, &viewport, 400.0, 300.0).unwrap();
        assert!((ray.direction - Vector3::new(1.0, 0.0, 0.0)).magnitude() < EPS);
        assert!((ray.origin.y - camera.position.y).abs() < EPS);
        assert!((ray.origin.z - camera.position.z).abs() < EPS);
    }

    #[test]
    fn upper_left_click_points_up_and_left() {
        let (camera, projection, viewport) = setup();
        let ray = screen_ray(&camera, &projection, &viewport, 10.0, 10.0).unwrap();
        // Facing +X, left is +Y.
        assert!(ray.direction.y > 0.0);
        assert!(ray.direction.z > 0.0);
    }

    #[test]
    fn empty_viewport_yields_no_ray() {
        let (camera, projection, _) = setup();
        let empty = Viewport::default();
        assert_eq!(screen_ray(&camera, &projection, &empty, 0.0, 0.0), None);
    }

    #[test]
    fn sphere_hits_report_the_near_side() {
        let ray = Ray {
            origin: Point3::new(0.0, 0.0, 0.0),
            direction: Vector3::new(1.0, 0.0, 0.0),
        };
        let t = ray_sphere(&ray, Point3::new(5.0, 0.0, 0.0), 1.0).unwrap();
        assert!((t - 4.0).abs() < EPS);
        let inside = ray_sphere(&ray, Point3::new(0.5, 0.0, 0.0), 1.0).unwrap();
        assert!((inside - 1.5).abs() < EPS);
        assert_eq!(ray_sphere(&ray, Point3::new(-5.0, 0.0, 0.0), 1.0), None);
        assert_eq!(ray_sphere(&ray, Point3::new(5.0, 3.0, 0.0), 1.0), None);
    }

    #[test]
    fn turned_camera_rays_follow_yaw() {
        let (mut camera, projection, viewport) = setup();
        camera.yaw = Deg(90.0);
        let ray = screen_ray(&camera, &projection, &viewport, 400.0, 300.0).unwrap();
        assert!((ray.direction - Vector3::new(0.0, 1.0, 0.0)).magnitude() < EPS);
    }
}
