//! CPU reference of the sea shader math.
//!
//! `sea.wgsl` evaluates the same functions per vertex and per fragment; keep the two in step.

use glam::{Vec2, Vec3};

use crate::color::Color;

/// Spatial frequency of both wave terms (radians per unit of u or v)
pub const WAVE_NUMBER: f32 = 10.0;

/// Relative strength of the v-driven wave term
pub const SECONDARY_WAVE_SCALE: f32 = 0.5;

/// Displace a rest position by the two sine waves.
///
/// ```text
/// d  = p + (0, 0, sin(10·u + t)) · k
/// d' = d + p + (0, 0, sin(10·v + t)) · k · 0.5
/// ```
///
/// Only z is perturbed. The rest position is added twice, so x and y come out doubled.
pub fn displace(rest: Vec3, uv: Vec2, time_s: f32, intensity: f32) -> Vec3 {
    let primary = rest + Vec3::Z * (uv.x * WAVE_NUMBER + time_s).sin() * intensity;
    primary
        + rest
        + Vec3::Z * (uv.y * WAVE_NUMBER + time_s).sin() * intensity * SECONDARY_WAVE_SCALE
}

/// Fragment color for an interpolated displaced position: `mix(surface, depth, z)`
///
/// Blends the authored sRGB values directly; z outside [0, 1] extrapolates.
pub fn blend_color(displaced: Vec3, surface: Color, depth: Color) -> Color {
    surface.mix(depth, displaced.z)
}

/// What `fs_main` writes to the sRGB target: the blend, clamped and decoded to linear light
///
/// The target re-encodes on store, so the displayed value is `blend_color` clamped to [0, 1].
pub fn fragment_output(displaced: Vec3, surface: Color, depth: Color) -> Color {
    blend_color(displaced, surface, depth).to_linear()
}
