//! Perspective camera, damped orbit controls and viewport sizing.

use std::f32::consts::{PI, TAU};

use glam::{Mat4, Vec2, Vec3};

use crate::frame::CameraControl;
use crate::params::CameraParams;

/// Right-handed perspective camera looking at a target, Y up
#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveCamera {
    pub fov_y_rad: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub target: Vec3,
}

impl PerspectiveCamera {
    pub fn new(params: &CameraParams, aspect: f32) -> Self {
        Self {
            fov_y_rad: params.fov_degrees.to_radians(),
            aspect,
            near: params.near_plane_m,
            far: params.far_plane_m,
            position: Vec3::from_array(params.position),
            target: Vec3::from_array(params.target),
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        // Always keep Y as up vector (camera never rolls)
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y_rad, self.aspect, self.near, self.far)
    }

    pub fn view_proj(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

/// Output surface sizing derived from a window resize
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Window width in logical pixels
    pub width: f32,

    /// Window height in logical pixels
    pub height: f32,

    /// Device pixel ratio after capping
    pub pixel_ratio: f32,
}

impl Viewport {
    /// Size in logical pixels with the device ratio capped at `max_pixel_ratio`
    pub fn new(width: f32, height: f32, device_pixel_ratio: f32, max_pixel_ratio: f32) -> Self {
        Self {
            width,
            height,
            pixel_ratio: device_pixel_ratio.min(max_pixel_ratio),
        }
    }

    /// From a physical window size and the window's scale factor
    pub fn from_physical(
        physical_width: u32,
        physical_height: u32,
        scale_factor: f64,
        max_pixel_ratio: f32,
    ) -> Self {
        let scale = scale_factor.max(f64::EPSILON);
        Self::new(
            (physical_width as f64 / scale) as f32,
            (physical_height as f64 / scale) as f32,
            scale_factor as f32,
            max_pixel_ratio,
        )
    }

    /// Camera aspect ratio W/H
    pub fn aspect(&self) -> f32 {
        self.width / self.height.max(f32::EPSILON)
    }

    /// Render surface size in physical pixels (never zero)
    pub fn surface_size(&self) -> (u32, u32) {
        let scale = |logical: f32| ((logical * self.pixel_ratio).round() as u32).max(1);
        (scale(self.width), scale(self.height))
    }

    pub fn is_empty(&self) -> bool {
        self.width < 1.0 || self.height < 1.0
    }
}

/// Orbit controls: drag to rotate around the target, scroll to dolly
///
/// Motion requested by input accumulates into a pending delta. Each update applies a
/// `damping_factor` share of it and decays the rest, so the camera glides to a stop.
#[derive(Debug, Clone)]
pub struct OrbitControls {
    damping_factor: f32,
    rotate_speed: f32,
    zoom_speed: f32,
    min_distance: f32,
    max_distance: f32,

    /// Pending (azimuth, polar) change in radians
    pending: Vec2,

    /// Pending radius multiplier
    scale: f32,

    dragging: bool,
    last_pointer: Option<Vec2>,
}

impl OrbitControls {
    const POLAR_EPSILON: f32 = 1e-6;

    pub fn new(params: &CameraParams) -> Self {
        Self {
            damping_factor: params.damping_factor.clamp(0.0, 1.0),
            rotate_speed: params.rotate_speed,
            zoom_speed: params.zoom_speed,
            min_distance: params.min_distance_m,
            max_distance: params.max_distance_m,
            pending: Vec2::ZERO,
            scale: 1.0,
            dragging: false,
            last_pointer: None,
        }
    }

    /// Begin or end a rotate drag
    pub fn set_dragging(&mut self, dragging: bool) {
        self.dragging = dragging;
        if !dragging {
            self.last_pointer = None;
        }
    }

    /// Feed a pointer position (physical pixels); rotates while dragging
    pub fn pointer_moved(&mut self, position: Vec2, viewport_height: f32) {
        if self.dragging {
            if let Some(last) = self.last_pointer {
                self.rotate_by_pixels(position - last, viewport_height);
            }
        }
        self.last_pointer = Some(position);
    }

    /// Rotate by a pointer delta: a full viewport height of drag is one full turn
    pub fn rotate_by_pixels(&mut self, delta: Vec2, viewport_height: f32) {
        let height = viewport_height.max(1.0);
        self.pending.x -= TAU * delta.x / height * self.rotate_speed;
        self.pending.y -= TAU * delta.y / height * self.rotate_speed;
    }

    /// Dolly by scroll lines (positive = toward the target)
    pub fn scroll(&mut self, lines: f32) {
        let step = 0.95_f32.powf(self.zoom_speed * lines.abs());
        if lines > 0.0 {
            self.scale *= step;
        } else if lines < 0.0 {
            self.scale /= step;
        }
    }

    fn apply(&mut self, camera: &mut PerspectiveCamera) {
        let offset = camera.position - camera.target;
        let radius = offset.length().max(f32::EPSILON);

        let mut azimuth = offset.x.atan2(offset.z);
        let mut polar = (offset.y / radius).clamp(-1.0, 1.0).acos();

        let share = if self.damping_factor > 0.0 {
            self.damping_factor
        } else {
            1.0
        };
        azimuth += self.pending.x * share;
        polar = (polar + self.pending.y * share).clamp(Self::POLAR_EPSILON, PI - Self::POLAR_EPSILON);

        let radius = (radius * self.scale).clamp(self.min_distance, self.max_distance);

        let sin_polar = polar.sin();
        camera.position = camera.target
            + Vec3::new(
                radius * sin_polar * azimuth.sin(),
                radius * polar.cos(),
                radius * sin_polar * azimuth.cos(),
            );

        if self.damping_factor > 0.0 {
            self.pending *= 1.0 - self.damping_factor;
        } else {
            self.pending = Vec2::ZERO;
        }
        self.scale = 1.0;
    }
}

impl CameraControl for OrbitControls {
    fn update(&mut self, camera: &mut PerspectiveCamera) {
        self.apply(camera);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> PerspectiveCamera {
        PerspectiveCamera::new(&CameraParams::default(), 16.0 / 9.0)
    }

    #[test]
    fn test_camera_defaults() {
        let camera = camera();
        assert!((camera.fov_y_rad - 75f32.to_radians()).abs() < 1e-6);
        assert_eq!(camera.position, Vec3::new(2.87, 2.87, -0.57));
        assert_eq!(camera.target, Vec3::ZERO);
    }

    #[test]
    fn test_view_proj_matrix_generation() {
        let view_proj = camera().view_proj();

        // Matrix should not be identity or zero
        assert_ne!(view_proj, Mat4::IDENTITY);
        assert_ne!(view_proj, Mat4::ZERO);

        // Target projects to the centre of the screen
        let clip = view_proj * Vec3::ZERO.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
        assert!((0.0..=1.0).contains(&ndc.z));
    }

    #[test]
    fn test_resize_updates_aspect_and_surface() {
        let viewport = Viewport::new(1920.0, 1080.0, 1.0, 2.0);
        assert_eq!(viewport.aspect(), 1920.0 / 1080.0);
        assert_eq!(viewport.surface_size(), (1920, 1080));

        // Pixel ratio is capped at 2
        let retina = Viewport::new(800.0, 600.0, 3.0, 2.0);
        assert_eq!(retina.pixel_ratio, 2.0);
        assert_eq!(retina.aspect(), 800.0 / 600.0);
        assert_eq!(retina.surface_size(), (1600, 1200));

        let hidpi = Viewport::new(800.0, 600.0, 1.5, 2.0);
        assert_eq!(hidpi.surface_size(), (1200, 900));
    }

    #[test]
    fn test_viewport_from_physical() {
        let viewport = Viewport::from_physical(2400, 1800, 3.0, 2.0);
        assert_eq!(viewport.width, 800.0);
        assert_eq!(viewport.height, 600.0);
        assert_eq!(viewport.surface_size(), (1600, 1200));

        let minimized = Viewport::from_physical(0, 0, 1.0, 2.0);
        assert!(minimized.is_empty());
        assert_eq!(minimized.surface_size(), (1, 1));
    }

    #[test]
    fn test_update_without_input_keeps_camera() {
        let mut camera = camera();
        let before = camera.position;
        let mut controls = OrbitControls::new(&CameraParams::default());

        controls.update(&mut camera);
        assert!((camera.position - before).length() < 1e-4);
    }

    #[test]
    fn test_rotation_preserves_distance() {
        let mut camera = camera();
        let distance = camera.position.distance(camera.target);
        let mut controls = OrbitControls::new(&CameraParams::default());

        controls.rotate_by_pixels(Vec2::new(120.0, -40.0), 720.0);
        for _ in 0..30 {
            controls.update(&mut camera);
            assert!((camera.position.distance(camera.target) - distance).abs() < 1e-3);
        }
    }

    #[test]
    fn test_damping_converges() {
        let mut camera = camera();
        let mut controls = OrbitControls::new(&CameraParams::default());

        controls.rotate_by_pixels(Vec2::new(200.0, 0.0), 720.0);
        let mut last_step = f32::MAX;
        let mut previous = camera.position;
        for _ in 0..200 {
            controls.update(&mut camera);
            let step = camera.position.distance(previous);
            assert!(step <= last_step + 1e-5);
            last_step = step;
            previous = camera.position;
        }
        assert!(last_step < 1e-3);
    }

    #[test]
    fn test_scroll_dollies_within_limits() {
        let params = CameraParams::default();
        let mut camera = camera();
        let mut controls = OrbitControls::new(&params);
        let start = camera.position.length();

        controls.scroll(1.0);
        controls.update(&mut camera);
        assert!(camera.position.length() < start);

        for _ in 0..500 {
            controls.scroll(10.0);
            controls.update(&mut camera);
        }
        assert!((camera.position.length() - params.min_distance_m).abs() < 1e-3);
    }

    #[test]
    fn test_pointer_drag_only_rotates_while_dragging() {
        let mut camera = camera();
        let before = camera.position;
        let mut controls = OrbitControls::new(&CameraParams {
            damping_factor: 0.0,
            ..CameraParams::default()
        });

        controls.pointer_moved(Vec2::new(10.0, 10.0), 720.0);
        controls.pointer_moved(Vec2::new(200.0, 10.0), 720.0);
        controls.update(&mut camera);
        assert!((camera.position - before).length() < 1e-4);

        // Press where the pointer rests, then drag away from it
        controls.set_dragging(true);
        controls.pointer_moved(Vec2::new(10.0, 10.0), 720.0);
        controls.update(&mut camera);
        let dragged = camera.position;
        assert!((dragged - before).length() > 0.1);

        // Released: hover motion no longer rotates
        controls.set_dragging(false);
        controls.pointer_moved(Vec2::new(300.0, 10.0), 720.0);
        controls.pointer_moved(Vec2::new(20.0, 10.0), 720.0);
        controls.update(&mut camera);
        assert!((camera.position - dragged).length() < 1e-4);
    }
}
