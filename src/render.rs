//! Frame composition as a retained list of draw commands.
//!
//! [`build_frame`] turns the scene, the camera and the UI state into a
//! [`Frame`]: the view and projection for this frame, the light set, and an
//! ordered list of [`DrawCommand`]s. The order of that list is the contract
//! with the rasterizing backend and must be kept as is:
//!
//! 1. room surfaces (floor, ceiling, four walls)
//! 2. floor shadows, when enabled
//! 3. opaque exhibits that are not selected
//! 4. glass exhibits that are not selected
//! 5. the selected exhibit, writing the stencil
//! 6. its outline where the stencil was not written
//!
//! Screen-space overlay panels are kept apart in [`Frame::overlay`] and drawn last.
//!
//! # Key types
//!
//! - [`Frame`] is everything the backend needs to draw one frame
//! - [`DrawCommand`] is one draw with its geometry, transform, surface and [`RenderState`]
//! - [`Pass`] tags the stage a command belongs to
//! - [`OverlayCommand`] is a 2D panel, image or text line in window pixels

use cgmath::{Matrix4, Point3, SquareMatrix, Vector3};

use crate::{
    camera::{Camera, Projection},
    config::{Config, RoomConfig},
    data_structures::{
        entity::Entity,
        scene::{Material, Scene},
    },
    resources::TextureHandle,
    shadow,
};

pub const CLEAR_COLOUR: [f32; 4] = [1.0, 1.0, 1.0, 1.0];
pub const OUTLINE_SCALE: f32 = 1.05;
pub const OUTLINE_COLOUR: [f32; 4] = [1.0, 0.85, 0.20, 1.0];
pub const SELECTION_STENCIL: u32 = 1;
pub const GLASS_ALPHA: f32 = 0.18;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Pass {
    Room,
    Shadow,
    Opaque,
    Glass,
    Selection,
    Outline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StencilMode {
    Ignore,
    /// Always passes and replaces the stencil with the reference.
    Write(u32),
    /// Passes only where the stencil differs from the reference.
    NotEqual(u32),
}

/// Fixed-function state a draw needs. Also the key the backend builds pipelines by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderState {
    pub blend: bool,
    pub depth_write: bool,
    pub cull_back: bool,
    pub stencil: StencilMode,
    pub lighting: bool,
    pub texturing: bool,
    /// Pull the draw towards the viewer to win depth ties with the surface below.
    pub depth_bias: bool,
}

impl RenderState {
    pub const ROOM: RenderState = RenderState {
        blend: false,
        depth_write: true,
        cull_back: false,
        stencil: StencilMode::Ignore,
        lighting: true,
        texturing: true,
        depth_bias: false,
    };

    pub const SHADOW: RenderState = RenderState {
        blend: true,
        depth_write: false,
        cull_back: false,
        stencil: StencilMode::Ignore,
        lighting: false,
        texturing: false,
        depth_bias: true,
    };

    pub const GLASS: RenderState = RenderState {
        blend: true,
        depth_write: false,
        cull_back: false,
        stencil: StencilMode::Ignore,
        lighting: true,
        texturing: false,
        depth_bias: false,
    };

    pub const OUTLINE: RenderState = RenderState {
        blend: false,
        depth_write: true,
        cull_back: false,
        stencil: StencilMode::NotEqual(SELECTION_STENCIL),
        lighting: false,
        texturing: false,
        depth_bias: false,
    };

    pub fn opaque(two_sided: bool) -> Self {
        Self {
            cull_back: !two_sided,
            ..Self::ROOM
        }
    }

    pub fn with_stencil(self, stencil: StencilMode) -> Self {
        Self { stencil, ..self }
    }
}

/// Material constants of one draw. RGBA colours.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Surface {
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    pub emission: [f32; 4],
    pub shininess: f32,
}

impl Surface {
    /// Ambient and diffuse follow the draw colour; specular and shininess come from `material`.
    pub fn tracked(material: &Material, colour: [f32; 4]) -> Self {
        let [r, g, b] = material.specular;
        Self {
            ambient: colour,
            diffuse: colour,
            specular: [r, g, b, 1.0],
            emission: [0.0, 0.0, 0.0, 1.0],
            shininess: material.shininess,
        }
    }

    /// Brighter fixed material so the walls read the same in low light.
    pub fn wall(material: &Material) -> Self {
        Self {
            ambient: [0.18, 0.18, 0.18, 1.0],
            diffuse: [0.95, 0.95, 0.95, 1.0],
            ..Self::tracked(material, [1.0; 4])
        }
    }

    pub fn glass() -> Self {
        Self {
            ambient: [0.10, 0.10, 0.12, GLASS_ALPHA],
            diffuse: [0.22, 0.24, 0.26, GLASS_ALPHA],
            specular: [0.90, 0.90, 0.90, 1.0],
            emission: [0.03, 0.03, 0.04, 1.0],
            shininess: 96.0,
        }
    }

    /// For unlit draws; the colour is used as is.
    pub fn flat(colour: [f32; 4]) -> Self {
        Self {
            ambient: colour,
            diffuse: colour,
            specular: [0.0, 0.0, 0.0, 1.0],
            emission: [0.0, 0.0, 0.0, 1.0],
            shininess: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// The mesh of the entity at this index.
    Entity(usize),
    /// World-space quad. Texture coordinates run from 0 to `repeat` across it.
    Quad {
        corners: [Point3<f32>; 4],
        normal: Vector3<f32>,
        repeat: [f32; 2],
    },
    /// Triangle fan around `centre` through the closed `rim`.
    Fan {
        centre: Point3<f32>,
        rim: Vec<Point3<f32>>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawCommand {
    pub pass: Pass,
    pub geometry: Geometry,
    pub transform: Matrix4<f32>,
    pub texture: TextureHandle,
    pub colour: [f32; 4],
    pub surface: Surface,
    pub state: RenderState,
}

/// Light colours for the current intensity plus the light positions.
#[derive(Debug, Clone, PartialEq)]
pub struct Lighting {
    pub positions: Vec<Point3<f32>>,
    pub ambient: f32,
    pub diffuse: f32,
    pub specular: f32,
    pub global_ambient: f32,
    /// Constant, linear and quadratic attenuation.
    pub attenuation: [f32; 3],
}

impl Lighting {
    /// Maps an intensity in `[0, max_intensity]` to light colours. Even 0 keeps some ambient.
    pub fn new(positions: Vec<Point3<f32>>, intensity: f32, max_intensity: f32) -> Self {
        let t = if max_intensity > 0.0 {
            (intensity / max_intensity).clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            positions,
            ambient: 0.12 + 0.18 * t,
            diffuse: 0.95 * t,
            specular: 0.25 * t,
            global_ambient: 0.12 + 0.10 * t,
            attenuation: [0.8, 0.02, 0.002],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Screen-space drawing in window pixels, origin at the top left.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayCommand {
    Panel { rect: OverlayRect, colour: [f32; 4] },
    Image { rect: OverlayRect, texture: TextureHandle },
    Text { x: f32, y: f32, lines: Vec<String> },
}

/// Interface state that is not part of the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UiState {
    pub help_visible: bool,
    pub help_texture: TextureHandle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub clear_colour: [f32; 4],
    pub view: Matrix4<f32>,
    /// OpenGL-style projection, see [`Projection::calc_matrix`].
    pub projection: Matrix4<f32>,
    pub eye: Point3<f32>,
    pub lighting: Lighting,
    pub commands: Vec<DrawCommand>,
    pub overlay: Vec<OverlayCommand>,
}

impl Frame {
    pub fn commands_in(&self, pass: Pass) -> impl Iterator<Item = &DrawCommand> {
        self.commands.iter().filter(move |c| c.pass == pass)
    }
}

/// Floor, ceiling and the four walls with their inward normals and tiling.
pub fn room_quads(room: &RoomConfig, scene: &Scene) -> Vec<DrawCommand> {
    let hw = room.width * 0.5;
    let hl = room.length * 0.5;
    let h = room.height;
    let tile = if room.tile_size > 0.0 { room.tile_size } else { 1.0 };
    let (rep_w, rep_l, rep_h) = (room.width / tile, room.length / tile, room.height / tile);
    let p = Point3::new;
    let textures = scene.room_textures;
    let lit = Surface::tracked(&scene.material, [1.0; 4]);
    let wall = Surface::wall(&scene.material);

    let quad = |corners, normal: [f32; 3], repeat, texture, surface| DrawCommand {
        pass: Pass::Room,
        geometry: Geometry::Quad {
            corners,
            normal: normal.into(),
            repeat,
        },
        transform: Matrix4::identity(),
        texture,
        colour: [1.0; 4],
        surface,
        state: RenderState::ROOM,
    };

    vec![
        quad(
            [p(-hw, -hl, 0.0), p(hw, -hl, 0.0), p(hw, hl, 0.0), p(-hw, hl, 0.0)],
            [0.0, 0.0, 1.0],
            [rep_w, rep_l],
            textures.floor,
            lit,
        ),
        quad(
            [p(-hw, -hl, h), p(-hw, hl, h), p(hw, hl, h), p(hw, -hl, h)],
            [0.0, 0.0, -1.0],
            [rep_w, rep_l],
            textures.ceiling,
            lit,
        ),
        quad(
            [p(-hw, -hl, 0.0), p(hw, -hl, 0.0), p(hw, -hl, h), p(-hw, -hl, h)],
            [0.0, 1.0, 0.0],
            [rep_w, rep_h],
            textures.wall,
            wall,
        ),
        quad(
            [p(-hw, hl, 0.0), p(-hw, hl, h), p(hw, hl, h), p(hw, hl, 0.0)],
            [0.0, -1.0, 0.0],
            [rep_w, rep_h],
            textures.wall,
            wall,
        ),
        quad(
            [p(-hw, -hl, 0.0), p(-hw, -hl, h), p(-hw, hl, h), p(-hw, hl, 0.0)],
            [1.0, 0.0, 0.0],
            [rep_l, rep_h],
            textures.wall,
            wall,
        ),
        quad(
            [p(hw, -hl, 0.0), p(hw, hl, 0.0), p(hw, hl, h), p(hw, -hl, h)],
            [-1.0, 0.0, 0.0],
            [rep_l, rep_h],
            textures.wall,
            wall,
        ),
    ]
}

fn opaque_command(pass: Pass, index: usize, entity: &Entity, material: &Material) -> DrawCommand {
    DrawCommand {
        pass,
        geometry: Geometry::Entity(index),
        transform: entity.model_matrix(),
        texture: entity.texture,
        colour: [1.0; 4],
        surface: Surface::tracked(material, [1.0; 4]),
        state: RenderState::opaque(entity.kind.two_sided()),
    }
}

fn glass_command(pass: Pass, index: usize, entity: &Entity) -> DrawCommand {
    DrawCommand {
        pass,
        geometry: Geometry::Entity(index),
        transform: entity.model_matrix(),
        texture: TextureHandle::NONE,
        colour: [1.0, 1.0, 1.0, GLASS_ALPHA],
        surface: Surface::glass(),
        state: RenderState::GLASS,
    }
}

/// Draws for one entity outside the selection passes.
fn entity_command(index: usize, entity: &Entity, material: &Material) -> DrawCommand {
    if entity.kind.is_transparent() {
        glass_command(Pass::Glass, index, entity)
    } else {
        opaque_command(Pass::Opaque, index, entity, material)
    }
}

/// The selected entity drawn normally while writing the stencil, then its outline for opaque kinds.
pub fn selection_commands(scene: &Scene) -> Vec<DrawCommand> {
    let Some(index) = scene.selected() else {
        return Vec::new();
    };
    let Some(entity) = scene.entities.get(index) else {
        return Vec::new();
    };

    let mut selected = entity_command(index, entity, &scene.material);
    selected.pass = Pass::Selection;
    selected.state = selected.state.with_stencil(StencilMode::Write(SELECTION_STENCIL));
    let mut commands = vec![selected];

    if !entity.kind.is_transparent() {
        commands.push(DrawCommand {
            pass: Pass::Outline,
            geometry: Geometry::Entity(index),
            transform: entity.model_matrix() * Matrix4::from_scale(OUTLINE_SCALE),
            texture: TextureHandle::NONE,
            colour: OUTLINE_COLOUR,
            surface: Surface::flat(OUTLINE_COLOUR),
            state: RenderState::OUTLINE,
        });
    }
    commands
}

pub const PANEL_MARGIN: f32 = 12.0;
pub const PANEL_BOTTOM_OFFSET: f32 = 72.0;
pub const PANEL_WIDTH: f32 = 340.0;
pub const PANEL_HEIGHT: f32 = 58.0;
pub const PANEL_COLOUR: [f32; 4] = [0.0, 0.0, 0.0, 0.45];
/// Share of the window the help image may cover.
pub const HELP_COVERAGE: f32 = 0.82;
const HELP_ASPECT: f32 = 1024.0 / 768.0;

/// The two lines of the selection panel.
pub fn selection_text(scene: &Scene) -> Vec<String> {
    match scene.selected().zip(scene.selected_entity()) {
        Some((index, entity)) => vec![
            format!("Selected: {} (#{})", entity.kind, index),
            "LMB pick | R anim (statue)".to_string(),
        ],
        None => vec![
            "Click to pick".to_string(),
            "Objects will highlight".to_string(),
        ],
    }
}

/// Centred 4:3 rectangle covering at most [`HELP_COVERAGE`] of the window in each direction.
pub fn help_rect(width: f32, height: f32) -> OverlayRect {
    let mut panel_w = width * HELP_COVERAGE;
    let mut panel_h = panel_w / HELP_ASPECT;
    if panel_h > height * HELP_COVERAGE {
        panel_h = height * HELP_COVERAGE;
        panel_w = panel_h * HELP_ASPECT;
    }
    OverlayRect {
        x: (width - panel_w) * 0.5,
        y: (height - panel_h) * 0.5,
        width: panel_w,
        height: panel_h,
    }
}

pub fn overlay_commands(scene: &Scene, ui: &UiState, window: (u32, u32)) -> Vec<OverlayCommand> {
    let (width, height) = (window.0 as f32, window.1 as f32);
    let panel = OverlayRect {
        x: PANEL_MARGIN,
        y: height - PANEL_BOTTOM_OFFSET,
        width: PANEL_WIDTH,
        height: PANEL_HEIGHT,
    };
    let mut overlay = vec![
        OverlayCommand::Panel {
            rect: panel,
            colour: PANEL_COLOUR,
        },
        OverlayCommand::Text {
            x: panel.x + 10.0,
            y: panel.y + 10.0,
            lines: selection_text(scene),
        },
    ];
    if ui.help_visible {
        overlay.push(OverlayCommand::Image {
            rect: help_rect(width, height),
            texture: ui.help_texture,
        });
    }
    overlay
}

/// Builds the complete, ordered draw list for one frame.
pub fn build_frame(
    scene: &Scene,
    camera: &Camera,
    projection: &Projection,
    ui: &UiState,
    config: &Config,
    window: (u32, u32),
) -> Frame {
    let lights = scene.lights();
    let mut commands = room_quads(&config.room, scene);

    if scene.shadows_enabled {
        commands.extend(shadow::shadow_commands(scene, &lights, &config.shadow));
    }

    let unselected = || {
        scene
            .entities
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != scene.selected())
    };
    commands.extend(
        unselected()
            .filter(|(_, e)| !e.kind.is_transparent())
            .map(|(i, e)| opaque_command(Pass::Opaque, i, e, &scene.material)),
    );
    commands.extend(
        unselected()
            .filter(|(_, e)| e.kind.is_transparent())
            .map(|(i, e)| glass_command(Pass::Glass, i, e)),
    );
    commands.extend(selection_commands(scene));

    Frame {
        clear_colour: CLEAR_COLOUR,
        view: camera.view_matrix(),
        projection: projection.calc_matrix(camera.walk_mode()),
        eye: camera.eye(),
        lighting: Lighting::new(lights, scene.light_intensity(), scene.max_intensity()),
        commands,
        overlay: overlay_commands(scene, ui, window),
    }
}
