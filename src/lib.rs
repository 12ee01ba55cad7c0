//! Seaboat library - a boat bobbing on a shader-animated sea

pub mod animation;
pub mod assets;
pub mod boat;
pub mod camera;
pub mod cli;
pub mod color;
pub mod debug;
pub mod error;
pub mod frame;
pub mod params;
pub mod rendering;
pub mod scene;
pub mod sea;
