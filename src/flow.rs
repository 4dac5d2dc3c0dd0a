//! The gallery session and, with the `window` feature, its event loop.
//!
//! [`Gallery`] holds the whole interactive state: camera, controller,
//! projection, scene and UI. It consumes backend-neutral
//! [`Command`]s, advances with [`Gallery::update`] and describes each frame
//! with [`Gallery::frame`]. The winit application in this module only maps
//! window events to commands and hands frames to the GPU [`crate::context::Context`].
//!
//! # Lifecycle
//!
//! Each redraw follows the same pattern:
//! 1. Collect window events and turn them into commands
//! 2. `Gallery::handle` applies each command
//! 3. `Gallery::update` integrates camera motion and statue animation
//! 4. `Gallery::frame` builds the ordered draw list
//! 5. The backend renders and presents it

use std::time::Duration;

use crate::{
    camera::{Camera, CameraController, Projection},
    config::Config,
    data_structures::{entity::EntityKind, scene::Scene},
    input::{Axis, Command},
    pick::{Viewport, pick_entity},
    render::{Frame, UiState, build_frame},
    resources::{MeshSource, TextureLoader, csv::load_scene_rows},
};

pub const WINDOW_TITLE: &str = "Virtual Gallery - Interactive Museum Room";

/// Lines logged when the help overlay opens.
pub const CONTROLS_HELP: [&str; 6] = [
    "=== MUSEUM CONTROLS (F1 to hide) ===",
    "WASD: move | Mouse: look",
    "B: human mode (walk + eye height)",
    "+ / - : light intensity",
    "F1: help",
    "ESC: quit",
];

/// What the event loop should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Exit,
}

#[derive(Debug, Clone)]
pub struct Gallery {
    pub camera: Camera,
    pub controller: CameraController,
    pub projection: Projection,
    pub scene: Scene,
    pub ui: UiState,
    viewport: Viewport,
    window_size: (u32, u32),
    config: Config,
}

impl Gallery {
    pub fn new(config: Config, scene: Scene, window_size: (u32, u32)) -> Self {
        let viewport = Viewport::letterbox(window_size.0, window_size.1, config.camera.viewport_ratio);
        Self {
            camera: Camera::from_config(&config.room, &config.camera),
            controller: CameraController::from_config(&config.camera),
            projection: Projection::new(viewport.width, viewport.height, &config.camera),
            scene,
            ui: UiState::default(),
            viewport,
            window_size,
            config,
        }
    }

    /// Reads the scene description named in `config` and builds the session around it.
    ///
    /// An unreadable scene description is logged and leaves the room empty.
    pub fn load(
        config: Config,
        meshes: &mut impl MeshSource,
        textures: &mut impl TextureLoader,
        window_size: (u32, u32),
    ) -> Self {
        let rows = match load_scene_rows(&config.scene.csv, config.scene.max_entities) {
            Ok(rows) => rows,
            Err(e) => {
                log::error!("Could not load scene csv {}: {}", config.scene.csv.display(), e);
                Vec::new()
            }
        };
        let scene = Scene::load(&config, &rows, meshes, textures);
        let mut gallery = Self::new(config, scene, window_size);
        gallery.ui.help_texture = textures.load_texture(&gallery.config.scene.help_texture);
        log::info!("Scene ready with {} entities", gallery.scene.entities.len());
        gallery
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn window_size(&self) -> (u32, u32) {
        self.window_size
    }

    pub fn handle(&mut self, command: Command) -> Control {
        match command {
            Command::Move(Axis::Forward, motion) => self.controller.set_forward(motion.factor()),
            Command::Move(Axis::Strafe, motion) => self.controller.set_strafe(motion.factor()),
            Command::Move(Axis::Vertical, motion) => {
                if !self.camera.walk_mode() {
                    self.controller.set_vertical(motion.factor());
                }
            }
            Command::Look { dx, dy } => self.controller.handle_mouse(dx, dy),
            Command::Pick { x, y } => self.pick(x, y),
            Command::ToggleAnimation => {
                self.scene.toggle_animation();
            }
            Command::ToggleShadows => {
                self.scene.toggle_shadows();
            }
            Command::ToggleWalkMode => {
                let walking = self.camera.toggle_walk_mode();
                self.controller.set_vertical(0.0);
                log::info!("Walk mode: {}", if walking { "ON" } else { "OFF" });
            }
            Command::ToggleHelp => self.toggle_help(),
            Command::BrightenLight => {
                self.scene.brighten();
            }
            Command::DimLight => {
                self.scene.dim();
            }
            Command::Quit => return Control::Exit,
        }
        Control::Continue
    }

    /// Selects what is under `(x, y)`. Clicking a statue also starts or stops the animation.
    fn pick(&mut self, x: f64, y: f64) {
        let hit = pick_entity(&self.scene, &self.camera, &self.projection, &self.viewport, x, y);
        self.scene.select(hit);
        if self
            .scene
            .selected_entity()
            .is_some_and(|e| e.kind == EntityKind::Statue)
        {
            self.scene.toggle_animation();
        }
    }

    fn toggle_help(&mut self) {
        self.ui.help_visible = !self.ui.help_visible;
        if self.ui.help_visible {
            CONTROLS_HELP.iter().for_each(|line| log::info!("{}", line));
        }
    }

    pub fn update(&mut self, dt: Duration) {
        self.controller.update(&mut self.camera, dt);
        self.scene.update(dt);
    }

    pub fn frame(&self) -> Frame {
        build_frame(
            &self.scene,
            &self.camera,
            &self.projection,
            &self.ui,
            &self.config,
            self.window_size,
        )
    }

    /// Recomputes the letterboxed viewport. A zero sized window keeps the previous projection ratio.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.window_size = (width, height);
        self.viewport = Viewport::letterbox(width, height, self.config.camera.viewport_ratio);
        self.projection.resize(self.viewport.width, self.viewport.height);
    }

    pub fn window_title(&self) -> String {
        match self.scene.selected().zip(self.scene.selected_entity()) {
            Some((index, entity)) => format!("{} | Selected: {} (#{})", WINDOW_TITLE, entity.kind, index),
            None => WINDOW_TITLE.to_string(),
        }
    }
}

#[cfg(feature = "window")]
pub use app::run;

#[cfg(feature = "window")]
mod app {
    use std::sync::Arc;

    use instant::Instant;
    use winit::{
        application::ApplicationHandler,
        event::{ElementState, KeyEvent, MouseButton, WindowEvent},
        event_loop::{ActiveEventLoop, EventLoop},
        keyboard::PhysicalKey,
        window::Window,
    };

    use super::{Control, Gallery, WINDOW_TITLE};
    use crate::{
        config::Config,
        context::Context,
        input::{Command, InputState, key_command},
        resources::FileMeshes,
    };

    /// GPU context plus the session it draws.
    struct AppState {
        ctx: Context,
        gallery: Gallery,
        input: InputState,
    }

    impl AppState {
        /// Applies a command and keeps the window title in sync with the selection.
        fn apply(&mut self, command: Command, event_loop: &ActiveEventLoop) {
            if self.gallery.handle(command) == Control::Exit {
                event_loop.exit();
            }
            if let Command::Pick { .. } = command {
                self.ctx.window.set_title(&self.gallery.window_title());
            }
        }

        fn resize(&mut self, width: u32, height: u32) {
            self.ctx.resize(width, height);
            self.gallery.resize(width, height);
        }
    }

    pub struct App {
        async_runtime: tokio::runtime::Runtime,
        config: Option<Config>,
        state: Option<AppState>,
        last_time: Instant,
    }

    impl App {
        fn new(config: Config) -> anyhow::Result<Self> {
            Ok(Self {
                async_runtime: tokio::runtime::Runtime::new()?,
                config: Some(config),
                state: None,
                last_time: Instant::now(),
            })
        }
    }

    impl ApplicationHandler for App {
        fn resumed(&mut self, event_loop: &ActiveEventLoop) {
            let Some(config) = self.config.take() else {
                return;
            };
            let attributes = Window::default_attributes().with_title(WINDOW_TITLE);
            let window = match event_loop.create_window(attributes) {
                Ok(window) => Arc::new(window),
                Err(e) => {
                    log::error!("Could not create the window: {}", e);
                    event_loop.exit();
                    return;
                }
            };

            let mut ctx = match self.async_runtime.block_on(Context::new(window)) {
                Ok(ctx) => ctx,
                Err(e) => {
                    log::error!("App initialization failed. Cannot create the main context: {}", e);
                    event_loop.exit();
                    return;
                }
            };

            let size = ctx.window.inner_size();
            let input = InputState::new(config.input.click_threshold);
            let gallery = Gallery::load(config, &mut FileMeshes, &mut ctx, (size.width, size.height));
            ctx.upload_scene(&gallery.scene);
            let mut state = AppState { ctx, gallery, input };
            state.resize(size.width, size.height);
            state.ctx.window.request_redraw();
            self.last_time = Instant::now();
            self.state = Some(state);
        }

        fn window_event(
            &mut self,
            event_loop: &ActiveEventLoop,
            _window_id: winit::window::WindowId,
            event: WindowEvent,
        ) {
            let state = match &mut self.state {
                Some(state) => state,
                None => return,
            };

            match event {
                WindowEvent::CloseRequested => event_loop.exit(),
                WindowEvent::Resized(size) => state.resize(size.width, size.height),
                WindowEvent::KeyboardInput {
                    event:
                        KeyEvent {
                            physical_key: PhysicalKey::Code(code),
                            state: key_state,
                            repeat: false,
                            ..
                        },
                    ..
                } => {
                    if let Some(command) = key_command(code, key_state == ElementState::Pressed) {
                        state.apply(command, event_loop);
                    }
                }
                WindowEvent::CursorMoved { position, .. } => {
                    if let Some(command) = state.input.cursor_moved(position.x, position.y) {
                        state.apply(command, event_loop);
                    }
                }
                WindowEvent::MouseInput {
                    state: button_state,
                    button,
                    ..
                } => match button {
                    MouseButton::Right => state.input.look_button(button_state.is_pressed()),
                    MouseButton::Left => {
                        if let Some(command) = state.input.select_button(button_state.is_pressed()) {
                            state.apply(command, event_loop);
                        }
                    }
                    _ => {}
                },
                WindowEvent::RedrawRequested => {
                    let dt = self.last_time.elapsed();
                    self.last_time = Instant::now();
                    state.gallery.update(dt);
                    let frame = state.gallery.frame();

                    match state.ctx.render(&frame, state.gallery.viewport()) {
                        Ok(()) => {}
                        // Reconfigure the surface if it's lost or outdated
                        Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                            let size = state.ctx.window.inner_size();
                            state.resize(size.width, size.height);
                        }
                        Err(e) => {
                            log::error!("Unable to render {}", e);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    /// Opens the gallery window and runs until it is closed.
    pub fn run(config: Config) -> anyhow::Result<()> {
        if let Err(e) = env_logger::try_init() {
            eprintln!("Warning: Could not initialize logger: {}", e);
        };

        let event_loop = EventLoop::new()?;
        let mut app = App::new(config)?;
        event_loop.run_app(&mut app)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data_structures::{
            entity::Entity,
            mesh::{Mesh, MeshCounts, Vertex},
            transform::Transform,
        },
        input::Motion,
    };
    use cgmath::Vector3;

    fn ball() -> Mesh {
        let mut mesh = Mesh::with_counts(MeshCounts {
            vertices: 2,
            ..Default::default()
        });
        mesh.vertices.push(Vertex { x: -0.5, y: -0.5, z: -0.5 });
        mesh.vertices.push(Vertex { x: 0.5, y: 0.5, z: 0.5 });
        mesh
    }

    /// A gallery with one exhibit of `kind` three metres straight ahead at eye height.
    fn gallery_with(kind: EntityKind) -> Gallery {
        let config = Config::default();
        let mut scene = Scene::new(&config);
        let transform = Transform {
            position: Vector3::new(3.0, 0.0, 1.6),
            ..Transform::new()
        };
        scene.entities.push(Entity::new(kind, "ball.obj", ball(), transform));
        Gallery::new(config, scene, (800, 600))
    }

    #[test]
    fn clicking_a_statue_selects_it_and_toggles_animation() {
        let mut gallery = gallery_with(EntityKind::Statue);
        let pick = Command::Pick { x: 400.0, y: 300.0 };
        assert_eq!(gallery.handle(pick), Control::Continue);
        assert_eq!(gallery.scene.selected(), Some(0));
        assert!(!gallery.scene.animation_enabled);
        assert!(gallery.window_title().ends_with("Selected: statue (#0)"));
    }

    #[test]
    fn clicking_empty_space_clears_the_selection() {
        let mut gallery = gallery_with(EntityKind::Pedestal);
        gallery.handle(Command::Pick { x: 400.0, y: 300.0 });
        assert_eq!(gallery.scene.selected(), Some(0));
        assert!(gallery.scene.animation_enabled);
        gallery.handle(Command::Pick { x: 5.0, y: 5.0 });
        assert_eq!(gallery.scene.selected(), None);
        assert_eq!(gallery.window_title(), WINDOW_TITLE);
    }

    #[test]
    fn vertical_moves_are_ignored_while_walking() {
        let mut gallery = gallery_with(EntityKind::Painting);
        gallery.handle(Command::ToggleWalkMode);
        let height = gallery.camera.position.z;
        gallery.handle(Command::Move(Axis::Vertical, Motion::Positive));
        for _ in 0..30 {
            gallery.update(Duration::from_millis(100));
        }
        assert_eq!(gallery.camera.position.z, height);
    }

    #[test]
    fn flying_rises_with_vertical_moves() {
        let mut gallery = gallery_with(EntityKind::Painting);
        let height = gallery.camera.position.z;
        gallery.handle(Command::Move(Axis::Vertical, Motion::Positive));
        gallery.update(Duration::from_millis(500));
        assert!(gallery.camera.position.z > height);
        gallery.handle(Command::Move(Axis::Vertical, Motion::Stop));
        let height = gallery.camera.position.z;
        gallery.update(Duration::from_millis(500));
        assert_eq!(gallery.camera.position.z, height);
    }

    #[test]
    fn help_and_quit() {
        let mut gallery = gallery_with(EntityKind::Painting);
        gallery.handle(Command::ToggleHelp);
        assert!(gallery.ui.help_visible);
        gallery.handle(Command::ToggleHelp);
        assert!(!gallery.ui.help_visible);
        assert_eq!(gallery.handle(Command::Quit), Control::Exit);
    }

    #[test]
    fn light_commands_step_the_intensity() {
        let mut gallery = gallery_with(EntityKind::Painting);
        gallery.handle(Command::BrightenLight);
        assert!((gallery.scene.light_intensity() - 1.1).abs() < 1e-5);
        gallery.handle(Command::DimLight);
        gallery.handle(Command::DimLight);
        assert!((gallery.scene.light_intensity() - 0.9).abs() < 1e-5);
    }

    #[test]
    fn resize_letterboxes_the_viewport() {
        let mut gallery = gallery_with(EntityKind::Painting);
        gallery.resize(1000, 600);
        assert_eq!(gallery.viewport(), Viewport { x: 100, y: 0, width: 800, height: 600 });
        assert!((gallery.projection.aspect() - 4.0 / 3.0).abs() < 1e-5);
        gallery.resize(0, 0);
        assert!((gallery.projection.aspect() - 4.0 / 3.0).abs() < 1e-5);
    }
}
