//! flow-gallery
//!
//! A first-person walkthrough of a small virtual museum room. Exhibits are
//! listed in a CSV scene table and loaded from Wavefront OBJ meshes; the room
//! is lit by up to three point lights, exhibits cast planar shadows onto the
//! floor and can be picked with the mouse.
//!
//! Everything up to the draw list is backend-neutral and runs headless. The
//! `window` feature (on by default) adds the winit event loop and the wgpu
//! renderer that consumes the draw list.
//!
//! High-level modules
//! - `camera`: first-person camera, controller and projection
//! - `config`: gallery settings loaded from TOML
//! - `context`: GPU device, surface and scene buffers (`window` only)
//! - `data_structures`: meshes, exhibits, the scene and textures
//! - `flow`: the gallery session and its event loop
//! - `input`: user commands and pointer bookkeeping
//! - `pick`: mouse picking against exhibit bounding spheres
//! - `pipelines`: render pipelines and shaders (`window` only)
//! - `render`: the ordered draw list for one frame
//! - `resources`: OBJ and CSV loaders, texture and mesh sources
//! - `shadow`: planar shadow projection
//!

pub mod camera;
pub mod config;
#[cfg(feature = "window")]
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod input;
pub mod pick;
#[cfg(feature = "window")]
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod shadow;

pub use cgmath;
