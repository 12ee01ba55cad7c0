//! Application context: everything the frame loop reads and mutates.

use std::fmt;

use glam::Mat4;

use crate::boat::Boat;
use crate::camera::{PerspectiveCamera, Viewport};
use crate::params::{BoatParams, CameraParams, SeaParams};
use crate::sea::{SurfaceMesh, WaveUniforms};

/// Progress of an asynchronously loaded asset
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadStatus {
    #[default]
    Pending,
    Loaded,
    Failed(String),
}

impl fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "loading"),
            Self::Loaded => write!(f, "loaded"),
            Self::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Scene state owned by the application and borrowed by each frame
#[derive(Debug)]
pub struct Scene {
    pub uniforms: WaveUniforms,
    pub sea_transform: Mat4,
    pub camera: PerspectiveCamera,

    /// `None` until the boat model finishes loading
    pub boat: Option<Boat>,

    pub boat_status: LoadStatus,
    pub environment_status: LoadStatus,
}

impl Scene {
    pub fn new(sea: &SeaParams, camera: &CameraParams, aspect: f32) -> Self {
        Self {
            uniforms: WaveUniforms::new(sea),
            sea_transform: SurfaceMesh::world_transform(sea),
            camera: PerspectiveCamera::new(camera, aspect),
            boat: None,
            boat_status: LoadStatus::Pending,
            environment_status: LoadStatus::Pending,
        }
    }

    /// Add the boat once its model is available
    pub fn place_boat(&mut self, params: &BoatParams, triangle_count: usize) {
        self.boat = Some(Boat::new(params, triangle_count));
        self.boat_status = LoadStatus::Loaded;
    }

    pub fn boat_failed(&mut self, reason: impl Into<String>) {
        self.boat_status = LoadStatus::Failed(reason.into());
    }

    pub fn environment_loaded(&mut self) {
        self.environment_status = LoadStatus::Loaded;
    }

    pub fn environment_failed(&mut self, reason: impl Into<String>) {
        self.environment_status = LoadStatus::Failed(reason.into());
    }

    /// Match the camera to a resized output surface
    pub fn resize(&mut self, viewport: &Viewport) {
        self.camera.aspect = viewport.aspect();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn test_scene() -> Scene {
        Scene::new(&SeaParams::default(), &CameraParams::default(), 16.0 / 9.0)
    }

    #[test]
    fn test_new_scene_has_no_boat() {
        let scene = test_scene();
        assert!(scene.boat.is_none());
        assert_eq!(scene.boat_status, LoadStatus::Pending);
        assert_eq!(scene.environment_status, LoadStatus::Pending);
    }

    #[test]
    fn test_place_boat() {
        let mut scene = test_scene();
        scene.place_boat(&BoatParams::default(), 128);

        assert_eq!(scene.boat_status, LoadStatus::Loaded);
        assert_eq!(scene.boat.as_ref().map(|b| b.triangle_count), Some(128));
    }

    #[test]
    fn test_failure_is_observable() {
        let mut scene = test_scene();
        scene.boat_failed("no such file");

        assert!(scene.boat.is_none());
        assert_eq!(scene.boat_status.to_string(), "failed: no such file");
    }

    #[test]
    fn test_resize_sets_aspect() {
        let mut scene = test_scene();
        scene.resize(&Viewport::new(1000.0, 500.0, 1.0, 2.0));
        assert_eq!(scene.camera.aspect, 2.0);
    }
}
