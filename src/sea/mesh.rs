//! Flat sea plane mesh with parametric (u, v) coordinates.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::params::SeaParams;

/// Vertex data for the sea mesh (rest position + UV coordinates)
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

/// Immutable sea plane in local XY space (z = 0 at rest)
pub struct SurfaceMesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl SurfaceMesh {
    /// Create the plane grid described by `params`
    ///
    /// Rows run from +Y (v = 1) down to -Y (v = 0); columns from -X (u = 0) to +X (u = 1).
    pub fn new(params: &SeaParams) -> Self {
        let segments = params.segments.max(1) as usize;
        let half_width = params.width_m / 2.0;
        let half_height = params.height_m / 2.0;
        let segment_width = params.width_m / segments as f32;
        let segment_height = params.height_m / segments as f32;

        let mut vertices = Vec::with_capacity((segments + 1).pow(2));
        let mut indices = Vec::with_capacity(segments.pow(2) * 6);

        for row in 0..=segments {
            let y = half_height - row as f32 * segment_height;
            for col in 0..=segments {
                let x = col as f32 * segment_width - half_width;

                vertices.push(Vertex {
                    position: [x, y, 0.0],
                    uv: [
                        col as f32 / segments as f32,
                        1.0 - row as f32 / segments as f32,
                    ],
                });
            }
        }

        // Counter-clockwise when viewed from +Z
        let stride = segments + 1;
        for row in 0..segments {
            for col in 0..segments {
                let top_left = (row * stride + col) as u32;
                let top_right = top_left + 1;
                let bottom_left = ((row + 1) * stride + col) as u32;
                let bottom_right = bottom_left + 1;

                indices.extend_from_slice(&[
                    top_left,
                    bottom_left,
                    top_right,
                    bottom_left,
                    bottom_right,
                    top_right,
                ]);
            }
        }

        Self { vertices, indices }
    }

    /// Placement of the plane in the world: rotate about X, then lift by the offset
    pub fn world_transform(params: &SeaParams) -> Mat4 {
        Mat4::from_translation(Vec3::new(0.0, params.offset_y_m, 0.0))
            * Mat4::from_rotation_x(params.rotation_x_rad)
    }
}
