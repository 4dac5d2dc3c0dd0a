//! Gallery data structures: meshes, exhibits, the scene and textures.
//!
//! - `mesh` holds indexed triangle meshes with safe-default element slots
//! - `transform` is the position/rotation/scale placement of an exhibit
//! - `entity` is a placed exhibit and the capability table of its kind
//! - `scene` owns the exhibit list, selection and lighting/animation state
//! - `texture` wraps GPU textures (only with the `window` feature)

pub mod entity;
pub mod mesh;
pub mod scene;
#[cfg(feature = "window")]
pub mod texture;
pub mod transform;
