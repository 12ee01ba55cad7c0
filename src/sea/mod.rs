//! Shader-animated sea surface: mesh, wave math and uniform state.

pub mod mesh;
pub mod wave;

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::color::Color;
use crate::params::SeaParams;

pub use mesh::{SurfaceMesh, Vertex};

/// Per-frame inputs of the sea shader pair
///
/// The animation driver is the only writer of `elapsed_time`; the debug panel writes the colors.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveUniforms {
    pub elapsed_time: f32,
    pub depth_color: Color,
    pub surface_color: Color,
    pub intensity: f32,
}

impl WaveUniforms {
    pub fn new(params: &SeaParams) -> Self {
        Self {
            elapsed_time: 0.0,
            depth_color: params.depth_color,
            surface_color: params.surface_color,
            intensity: params.intensity,
        }
    }

    /// Pack for upload alongside the camera and plane transforms
    pub fn to_gpu(&self, view_proj: Mat4, model: Mat4) -> SeaUniformsGpu {
        SeaUniformsGpu {
            view_proj: view_proj.to_cols_array_2d(),
            model: model.to_cols_array_2d(),
            // Blended as authored (sRGB); the shader decodes the result
            depth_color: self.depth_color.to_array(),
            time: self.elapsed_time,
            surface_color: self.surface_color.to_array(),
            intensity: self.intensity,
        }
    }
}

/// Uniform buffer layout of `sea.wgsl`
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct SeaUniformsGpu {
    pub view_proj: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub depth_color: [f32; 3],
    pub time: f32,
    pub surface_color: [f32; 3],
    pub intensity: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniforms_start_at_time_zero() {
        let params = SeaParams::default();
        let uniforms = WaveUniforms::new(&params);

        assert_eq!(uniforms.elapsed_time, 0.0);
        assert_eq!(uniforms.intensity, 2.0);
        assert_eq!(uniforms.depth_color.to_string(), "#5da4cb");
        assert_eq!(uniforms.surface_color.to_string(), "#4d8bb3");
    }

    #[test]
    fn test_gpu_layout_is_std140_sized() {
        // Two mat4 + two (vec3, f32) rows
        assert_eq!(std::mem::size_of::<SeaUniformsGpu>(), 160);

        let mut uniforms = WaveUniforms::new(&SeaParams::default());
        uniforms.elapsed_time = 3.5;
        let gpu = uniforms.to_gpu(Mat4::IDENTITY, Mat4::IDENTITY);
        assert_eq!(gpu.time, 3.5);
        assert_eq!(gpu.intensity, 2.0);
        // Colors go up unconverted so the blend matches `wave::blend_color`
        assert_eq!(gpu.depth_color, uniforms.depth_color.to_array());
        assert_eq!(gpu.surface_color, uniforms.surface_color.to_array());
    }
}
