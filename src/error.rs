//! Error types for asset loading, rendering and configuration.

use std::path::PathBuf;

use thiserror::Error;

/// Failure while loading the boat model or the environment cube map
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to import glTF model {}: {source}", .path.display())]
    Gltf {
        path: PathBuf,
        #[source]
        source: gltf::Error,
    },

    #[error("failed to decode image {}: {source}", .path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("model {} contains no triangle meshes", .path.display())]
    EmptyModel { path: PathBuf },

    #[error("cube face {} is {width}x{height}, expected a square image", .path.display())]
    NonSquareFace {
        path: PathBuf,
        width: u32,
        height: u32,
    },

    #[error("cube face {} is {found}px wide, expected {expected}px like the first face", .path.display())]
    FaceSizeMismatch {
        path: PathBuf,
        expected: u32,
        found: u32,
    },

    #[error("failed to start asset loader thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Failure while setting up or driving the GPU
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("failed to find suitable GPU adapter")]
    NoAdapter,

    #[error("surface reports no supported {0}")]
    IncompatibleSurface(&'static str),

    #[error("failed to request device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error(transparent)]
    Surface(#[from] wgpu::SurfaceError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected a color like #rrggbb, got {0:?}")]
pub struct ParseColorError(pub String);
