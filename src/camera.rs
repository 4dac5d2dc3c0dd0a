//! First-person camera, its motion model and the projection.
//!
//! The world is Z-up. The camera keeps a yaw (around Z) and a pitch (around
//! the camera's X axis) in degrees, and its position is clamped to the inside
//! of the room after every move. In walk mode the eye stays at standing
//! height and a small sinusoidal bob is added to the rendered eye only.
//!
//! # Key types
//!
//! - [`Camera`] is the viewer pose plus the walk-mode state
//! - [`CameraController`] integrates held movement keys and mouse look
//! - [`RoomBounds`] is the box the camera position is clamped into
//! - [`Projection`] builds the perspective frustum shared by rendering and picking

use std::time::Duration;

use cgmath::{Deg, Matrix4, Point3, Rad, Vector3};

use crate::config::{CameraConfig, RoomConfig};

/// Converts cgmath's OpenGL clip space (z in -1..1) to wgpu's (z in 0..1).
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Axis-aligned limits for the camera position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoomBounds {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
    /// Lowest eye height while flying.
    pub fly_floor: f32,
    /// Lowest eye height while walking.
    pub walk_floor: f32,
    pub ceiling: f32,
}

impl RoomBounds {
    pub fn new(room: &RoomConfig, camera: &CameraConfig) -> Self {
        let half_w = (room.width * 0.5 - room.wall_padding).max(0.0);
        let half_l = (room.length * 0.5 - room.wall_padding).max(0.0);
        let ceiling = room.height - camera.ceiling_clearance;
        Self {
            min_x: -half_w,
            max_x: half_w,
            min_y: -half_l,
            max_y: half_l,
            fly_floor: camera.fly_floor,
            walk_floor: camera.eye_height.min(ceiling),
            ceiling,
        }
    }

    pub fn clamp(&self, position: Point3<f32>, walk_mode: bool) -> Point3<f32> {
        let floor = if walk_mode {
            self.walk_floor
        } else {
            self.fly_floor
        };
        Point3::new(
            position.x.clamp(self.min_x, self.max_x),
            position.y.clamp(self.min_y, self.max_y),
            position.z.clamp(floor, self.ceiling.max(floor)),
        )
    }
}

impl Default for RoomBounds {
    fn default() -> Self {
        Self::new(&RoomConfig::default(), &CameraConfig::default())
    }
}

/// Wraps an angle in degrees into `[0, 360)`.
pub fn wrap_degrees(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub yaw: Deg<f32>,
    pub pitch: Deg<f32>,
    pub bounds: RoomBounds,
    walk_mode: bool,
    eye_height: f32,
    walk_phase: f32,
    bob_offset: f32,
}

impl Camera {
    pub fn new<V: Into<Point3<f32>>, Y: Into<Deg<f32>>, P: Into<Deg<f32>>>(
        position: V,
        yaw: Y,
        pitch: P,
        bounds: RoomBounds,
    ) -> Self {
        Self {
            position: position.into(),
            yaw: yaw.into(),
            pitch: pitch.into(),
            bounds,
            walk_mode: false,
            eye_height: bounds.walk_floor,
            walk_phase: 0.0,
            bob_offset: 0.0,
        }
    }

    pub fn from_config(room: &RoomConfig, camera: &CameraConfig) -> Self {
        let mut cam = Self::new(camera.start, Deg(0.0), Deg(0.0), RoomBounds::new(room, camera));
        cam.eye_height = camera.eye_height;
        cam.clamp_to_room();
        cam
    }

    pub fn walk_mode(&self) -> bool {
        self.walk_mode
    }

    pub fn walk_phase(&self) -> f32 {
        self.walk_phase
    }

    pub fn bob_offset(&self) -> f32 {
        self.bob_offset
    }

    /// Adds mouse deltas to yaw and pitch, wrapping both into `[0, 360)`.
    pub fn rotate(&mut self, horizontal: f32, vertical: f32) {
        self.yaw = Deg(wrap_degrees(self.yaw.0 + horizontal));
        self.pitch = Deg(wrap_degrees(self.pitch.0 + vertical));
    }

    /// Entering walk mode puts the eye at standing height and resets the bob.
    pub fn set_walk_mode(&mut self, enabled: bool) {
        self.walk_mode = enabled;
        self.walk_phase = 0.0;
        self.bob_offset = 0.0;
        if enabled {
            self.position.z = self.eye_height;
        }
        self.clamp_to_room();
    }

    pub fn toggle_walk_mode(&mut self) -> bool {
        self.set_walk_mode(!self.walk_mode);
        self.walk_mode
    }

    pub fn clamp_to_room(&mut self) {
        self.position = self.bounds.clamp(self.position, self.walk_mode);
    }

    /// Advances the cosmetic bob. Only the rendered eye moves, never [`Camera::position`].
    pub fn advance_bob(&mut self, moving: bool, dt: f32, rate: f32, amplitude: f32) {
        if self.walk_mode && moving {
            self.walk_phase = (self.walk_phase + rate * dt) % std::f32::consts::TAU;
            self.bob_offset = amplitude * self.walk_phase.sin();
        } else {
            self.bob_offset = 0.0;
        }
    }

    /// Rendered eye position, including the bob.
    pub fn eye(&self) -> Point3<f32> {
        Point3::new(
            self.position.x,
            self.position.y,
            self.position.z + self.bob_offset,
        )
    }

    /// Horizontal unit vector the camera walks along.
    pub fn forward(&self) -> Vector3<f32> {
        let (sin, cos) = Rad::from(self.yaw).0.sin_cos();
        Vector3::new(cos, sin, 0.0)
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        let eye = self.eye();
        Matrix4::from_angle_x(Deg(-(self.pitch.0 + 90.0)))
            * Matrix4::from_angle_z(Deg(-(self.yaw.0 - 90.0)))
            * Matrix4::from_translation(Vector3::new(-eye.x, -eye.y, -eye.z))
    }
}

#[derive(Debug, Clone)]
pub struct CameraController {
    forward: f32,
    strafe: f32,
    vertical: f32,
    rotate_horizontal: f32,
    rotate_vertical: f32,
    speed: f32,
    sensitivity: f32,
    bob_rate: f32,
    bob_amplitude: f32,
}

impl CameraController {
    pub fn new(speed: f32, sensitivity: f32) -> Self {
        let defaults = CameraConfig::default();
        Self {
            forward: 0.0,
            strafe: 0.0,
            vertical: 0.0,
            rotate_horizontal: 0.0,
            rotate_vertical: 0.0,
            speed,
            sensitivity,
            bob_rate: defaults.bob_rate,
            bob_amplitude: defaults.bob_amplitude,
        }
    }

    pub fn from_config(config: &CameraConfig) -> Self {
        Self {
            bob_rate: config.bob_rate,
            bob_amplitude: config.bob_amplitude,
            ..Self::new(config.move_speed, config.look_sensitivity)
        }
    }

    /// Forward speed factor, positive walks forward.
    pub fn set_forward(&mut self, amount: f32) {
        self.forward = amount;
    }

    /// Strafe speed factor, positive steps to the left.
    pub fn set_strafe(&mut self, amount: f32) {
        self.strafe = amount;
    }

    /// Vertical speed factor, positive rises.
    pub fn set_vertical(&mut self, amount: f32) {
        self.vertical = amount;
    }

    /// Queues a mouse-look delta in pixels. Moving right turns right, moving down looks down.
    pub fn handle_mouse(&mut self, dx: f64, dy: f64) {
        self.rotate_horizontal -= dx as f32;
        self.rotate_vertical -= dy as f32;
    }

    pub fn is_moving_horizontally(&self) -> bool {
        self.forward != 0.0 || self.strafe != 0.0
    }

    pub fn update(&mut self, camera: &mut Camera, dt: Duration) {
        let dt = dt.as_secs_f32();

        camera.rotate(
            self.rotate_horizontal * self.sensitivity,
            self.rotate_vertical * self.sensitivity,
        );
        self.rotate_horizontal = 0.0;
        self.rotate_vertical = 0.0;

        let forward = camera.forward();
        let side = Vector3::new(-forward.y, forward.x, 0.0);
        camera.position += forward * self.forward * self.speed * dt;
        camera.position += side * self.strafe * self.speed * dt;
        if !camera.walk_mode() {
            camera.position.z += self.vertical * self.speed * dt;
        }
        camera.clamp_to_room();

        camera.advance_bob(
            self.is_moving_horizontally(),
            dt,
            self.bob_rate,
            self.bob_amplitude,
        );
    }
}

/// Perspective frustum. The near plane's half height depends on walk mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    aspect: f32,
    fly_half_height: f32,
    walk_half_height: f32,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new(width: u32, height: u32, config: &CameraConfig) -> Self {
        let mut projection = Self {
            aspect: config.viewport_ratio,
            fly_half_height: config.fly_half_height,
            walk_half_height: config.walk_half_height,
            znear: config.near,
            zfar: config.far,
        };
        projection.resize(width, height);
        projection
    }

    /// Takes the aspect ratio from the viewport size. A zero sized viewport keeps the old ratio.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn half_height(&self, walk_mode: bool) -> f32 {
        if walk_mode {
            self.walk_half_height
        } else {
            self.fly_half_height
        }
    }

    /// OpenGL-style projection matrix. Picking unprojects through this one.
    pub fn calc_matrix(&self, walk_mode: bool) -> Matrix4<f32> {
        let top = self.half_height(walk_mode);
        let right = top * self.aspect;
        cgmath::frustum(-right, right, -top, top, self.znear, self.zfar)
    }
}

/// The matrices the GPU needs for one frame.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, view: Matrix4<f32>, projection: Matrix4<f32>, eye: Point3<f32>) {
        self.view_position = [eye.x, eye.y, eye.z, 1.0];
        self.view_proj = (OPENGL_TO_WGPU_MATRIX * projection * view).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}
