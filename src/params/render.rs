//! Rendering, lighting and asset location configuration.

use std::path::{Path, PathBuf};

use glam::{Mat4, Vec3};

use crate::color::Color;

/// Linear distance fog (applied to lit materials only)
#[derive(Debug, Clone)]
pub struct FogParams {
    pub color: Color,

    /// Distance where fog starts (world units)
    pub near_m: f32,

    /// Distance where fog fully covers the surface (world units)
    pub far_m: f32,
}

/// Single directional light
#[derive(Debug, Clone)]
pub struct LightParams {
    pub color: Color,

    /// Irradiance multiplier
    pub intensity: f32,

    /// Light position; the light shines from here toward the origin
    pub position: [f32; 3],

    /// Shadow map edge length (texels)
    pub shadow_map_size: u32,

    /// Half-width of the orthographic shadow frustum (world units)
    pub shadow_extent_m: f32,

    /// Shadow frustum near plane, measured from the light position (world units)
    pub shadow_near_m: f32,

    /// Shadow frustum far plane (world units)
    pub shadow_far_m: f32,

    /// Offset along the surface normal before the shadow lookup (world units)
    pub shadow_normal_bias_m: f32,
}

impl LightParams {
    /// Unit vector from the origin toward the light
    pub fn direction(&self) -> Vec3 {
        Vec3::from_array(self.position).normalize_or_zero()
    }

    /// Orthographic view-projection of the shadow camera (at the light, looking at the origin)
    pub fn shadow_view_proj(&self) -> Mat4 {
        let view = Mat4::look_at_rh(Vec3::from_array(self.position), Vec3::ZERO, Vec3::Y);
        let e = self.shadow_extent_m;
        let proj = Mat4::orthographic_rh(-e, e, -e, e, self.shadow_near_m, self.shadow_far_m);
        proj * view
    }
}

/// Rendering configuration
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Window width (logical pixels)
    pub window_width: u32,

    /// Window height (logical pixels)
    pub window_height: u32,

    /// Upper bound on the device pixel ratio used for the output surface
    pub max_pixel_ratio: f32,

    /// Background clear color
    pub clear_color: Color,

    pub fog: FogParams,

    pub light: LightParams,

    /// ACES filmic tone mapping exposure
    pub exposure: f32,

    /// Show the debug panel
    pub show_panel: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        let sea_blue = Color::rgb(0x5d as f32 / 255.0, 0xa4 as f32 / 255.0, 0xcb as f32 / 255.0);
        Self {
            window_width: 1280,
            window_height: 720,
            max_pixel_ratio: 2.0,
            clear_color: sea_blue,
            fog: FogParams {
                color: sea_blue,
                near_m: 30.0,
                far_m: 50.0,
            },
            light: LightParams {
                color: Color::WHITE,
                intensity: 3.0,
                position: [0.25, 2.0, -2.25],
                shadow_map_size: 1024,
                shadow_extent_m: 5.0,
                shadow_near_m: 0.5,
                shadow_far_m: 15.0,
                shadow_normal_bias_m: 0.05,
            },
            exposure: 1.0,
            show_panel: true,
        }
    }
}

/// Environment cube faces in upload order (+X, -X, +Y, -Y, +Z, -Z)
pub const CUBE_FACE_NAMES: [&str; 6] = ["px", "nx", "py", "ny", "pz", "nz"];

/// Static asset locations
#[derive(Debug, Clone)]
pub struct AssetPaths {
    /// Directory containing `models/` and `textures/`
    pub root: PathBuf,
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self::new("static")
    }
}

impl AssetPaths {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Boat model path
    pub fn boat_model(&self) -> PathBuf {
        self.root.join("models").join("boat.glb")
    }

    /// Directory holding the six environment cube faces
    pub fn environment_dir(&self) -> PathBuf {
        self.root.join("textures").join("environmentMaps").join("0")
    }

    /// Paths of the six cube faces in upload order
    pub fn environment_faces(&self) -> [PathBuf; 6] {
        let dir = self.environment_dir();
        CUBE_FACE_NAMES.map(|name| dir.join(format!("{}.jpg", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shadow_camera_frames_the_origin() {
        let light = RenderConfig::default().light;
        let view_proj = light.shadow_view_proj();

        // Target sits on the light axis at distance |position|, inside near..far
        let origin = view_proj.project_point3(Vec3::ZERO);
        assert!(origin.x.abs() < 1e-5 && origin.y.abs() < 1e-5);
        let distance = Vec3::from_array(light.position).length();
        let expected_depth = (distance - light.shadow_near_m) / (light.shadow_far_m - light.shadow_near_m);
        assert!((origin.z - expected_depth).abs() < 1e-5);

        // Points nearer the light have smaller depth
        let toward_light = view_proj.project_point3(light.direction());
        assert!(toward_light.z < origin.z);
    }

    #[test]
    fn test_asset_layout() {
        let paths = AssetPaths::new("assets");
        assert_eq!(paths.boat_model(), PathBuf::from("assets/models/boat.glb"));
        assert_eq!(
            paths.environment_faces()[3],
            PathBuf::from("assets/textures/environmentMaps/0/ny.jpg")
        );
    }
}
