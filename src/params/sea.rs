//! Sea surface geometry and wave shader parameters.

use std::f32::consts::FRAC_PI_2;

use crate::color::Color;

/// Sea plane and wave shader parameters
#[derive(Debug, Clone)]
pub struct SeaParams {
    /// Plane extent along local X (world units)
    pub width_m: f32,

    /// Plane extent along local Y (world units)
    pub height_m: f32,

    /// Grid subdivisions per side (5 = 36 vertices)
    pub segments: u32,

    /// Rotation about world X applied to the plane (radians)
    /// -π/2 lays the local XY plane flat with +Z pointing up
    pub rotation_x_rad: f32,

    /// Vertical offset of the plane (world units)
    pub offset_y_m: f32,

    /// Color reached where the displaced surface sits at local z = 1
    pub depth_color: Color,

    /// Color of the undisplaced surface (local z = 0)
    pub surface_color: Color,

    /// Wave height multiplier (dimensionless)
    pub intensity: f32,
}

impl Default for SeaParams {
    fn default() -> Self {
        Self {
            width_m: 400.0,
            height_m: 400.0,
            segments: 5,
            rotation_x_rad: -FRAC_PI_2,
            offset_y_m: -0.3,
            depth_color: Color::rgb(0x5d as f32 / 255.0, 0xa4 as f32 / 255.0, 0xcb as f32 / 255.0),
            surface_color: Color::rgb(0x4d as f32 / 255.0, 0x8b as f32 / 255.0, 0xb3 as f32 / 255.0),
            intensity: 2.0,
        }
    }
}
