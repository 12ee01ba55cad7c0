//! Parameter definitions with units and documented semantics.
//!
//! All constants of the scene live here with:
//! - World units, radians, degrees or pixels as noted
//! - Defaults matching the authored scene
//! - Type safety where possible

mod boat;
mod camera;
mod render;
mod sea;

// Re-export all types
pub use boat::{BoatParams, DriftMode};
pub use camera::CameraParams;
pub use render::{AssetPaths, FogParams, LightParams, RenderConfig, CUBE_FACE_NAMES};
pub use sea::SeaParams;
