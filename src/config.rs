//! Runtime configuration.
//!
//! Every tunable of the gallery lives in [`Config`], which is read from a TOML
//! file. Missing sections and fields fall back to the built-in defaults, so an
//! empty file (or no file at all) yields the stock corridor room.
//!
//! # Key types
//!
//! - [`Config`] is the root document
//! - [`RoomConfig`], [`CameraConfig`], [`SceneConfig`], [`LightingConfig`],
//!   [`ShadowConfig`] and [`InputConfig`] are its sections

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Default location of the configuration file, relative to the working directory.
pub const CONFIG_FILE: &str = "gallery.toml";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub room: RoomConfig,
    pub camera: CameraConfig,
    pub scene: SceneConfig,
    pub lighting: LightingConfig,
    pub shadow: ShadowConfig,
    pub input: InputConfig,
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Loads `path` if it exists, otherwise returns the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            log::info!("Loading configuration from {}", path.display());
            Self::load(path)
        } else {
            log::info!("No {} found, using default configuration", path.display());
            Ok(Self::default())
        }
    }
}

/// Dimensions of the corridor room. X spans the width, Y the length, Z is up.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    pub width: f32,
    pub length: f32,
    pub height: f32,
    pub tile_size: f32,
    pub wall_padding: f32,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            width: 10.0,
            length: 26.0,
            height: 4.0,
            tile_size: 2.0,
            wall_padding: 0.25,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub start: [f32; 3],
    pub move_speed: f32,
    pub look_sensitivity: f32,
    pub eye_height: f32,
    pub fly_floor: f32,
    pub ceiling_clearance: f32,
    pub bob_amplitude: f32,
    /// Bob phase advance in radians per second.
    pub bob_rate: f32,
    pub near: f32,
    pub far: f32,
    /// Half height of the near plane while flying.
    pub fly_half_height: f32,
    /// Half height of the near plane while walking.
    pub walk_half_height: f32,
    /// Width over height of the letterboxed viewport.
    pub viewport_ratio: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            start: [0.0, 0.0, 1.6],
            move_speed: 1.0,
            look_sensitivity: 1.0,
            eye_height: 1.6,
            fly_floor: 0.20,
            ceiling_clearance: 0.30,
            bob_amplitude: 0.04,
            bob_rate: 8.0,
            near: 0.1,
            far: 200.0,
            fly_half_height: 0.06,
            walk_half_height: 0.045,
            viewport_ratio: 4.0 / 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub csv: PathBuf,
    pub floor_texture: PathBuf,
    pub wall_texture: PathBuf,
    pub ceiling_texture: PathBuf,
    pub help_texture: PathBuf,
    /// Statues whose mesh path contains one of these stay still.
    pub keep_static: Vec<String>,
    pub max_entities: usize,
    /// Statue spin in degrees per second.
    pub animation_rate: f32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            csv: PathBuf::from("assets/config/scene.csv"),
            floor_texture: PathBuf::from("assets/textures/floor.png"),
            wall_texture: PathBuf::from("assets/textures/wall.png"),
            ceiling_texture: PathBuf::from("assets/textures/ceiling.png"),
            help_texture: PathBuf::from("assets/textures/help.png"),
            keep_static: vec!["fairy".to_string(), "trophy".to_string()],
            max_entities: 64,
            animation_rate: 20.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    pub initial_intensity: f32,
    pub step: f32,
    pub max_intensity: f32,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            initial_intensity: 1.0,
            step: 0.1,
            max_intensity: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ShadowConfig {
    /// Distance the flattened caster is lifted off the floor.
    pub plane_offset: f32,
    pub max_alpha: f32,
    pub pedestal_factor: f32,
    pub proxy_vertex_threshold: usize,
    pub proxy_segments: usize,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            plane_offset: 0.003,
            max_alpha: 0.72,
            pedestal_factor: 0.75,
            proxy_vertex_threshold: 50_000,
            proxy_segments: 24,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Largest Manhattan distance in pixels between press and release that still counts as a click.
    pub click_threshold: f64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            click_threshold: 3.0,
        }
    }
}
