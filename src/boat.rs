//! Boat transform and the periodic bob/roll animation.

use glam::{EulerRot, Mat4, Quat, Vec3};

use crate::params::{BoatParams, DriftMode};

/// Position and Euler XYZ rotation of the boat's scene node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoatTransform {
    pub position: Vec3,
    pub rotation: Vec3,
}

impl BoatTransform {
    pub fn new(params: &BoatParams) -> Self {
        Self {
            position: Vec3::from_array(params.start_position),
            rotation: Vec3::from_array(params.start_rotation),
        }
    }

    /// `T · Rx · Ry · Rz`
    pub fn model_matrix(&self) -> Mat4 {
        let rotation = Quat::from_euler(
            EulerRot::XYZ,
            self.rotation.x,
            self.rotation.y,
            self.rotation.z,
        );
        Mat4::from_rotation_translation(rotation, self.position)
    }
}

/// A loaded boat in the scene
#[derive(Debug, Clone)]
pub struct Boat {
    pub transform: BoatTransform,

    /// Height the boat was placed at; the bounded bob oscillates above it
    pub rest_y: f32,

    /// Triangles in the uploaded mesh (for the debug panel)
    pub triangle_count: usize,
}

impl Boat {
    pub fn new(params: &BoatParams, triangle_count: usize) -> Self {
        let transform = BoatTransform::new(params);
        Self {
            rest_y: transform.position.y,
            transform,
            triangle_count,
        }
    }
}

/// Drives the boat's bob and roll from elapsed time
#[derive(Debug, Clone)]
pub struct BoatAnimator {
    pace_amplitude: f32,
    pace_scale: f32,
    roll_factor: f32,
    bounded_height: f32,
    drift: DriftMode,
}

impl BoatAnimator {
    pub fn new(params: &BoatParams) -> Self {
        Self {
            pace_amplitude: params.pace_amplitude,
            pace_scale: params.pace_scale,
            roll_factor: params.roll_factor,
            bounded_height: params.bounded_bob_height_m(),
            drift: params.drift,
        }
    }

    /// `sin(t) · 2 · 0.008` with the default parameters
    pub fn pace(&self, time_s: f32) -> f32 {
        time_s.sin() * self.pace_amplitude * self.pace_scale
    }

    /// Apply one frame of motion
    ///
    /// Roll is set outright. Height either accumulates the pace (frame-rate dependent drift)
    /// or follows the bounded closed form, depending on the drift mode.
    pub fn animate(&self, boat: &mut Boat, time_s: f32) {
        let pace = self.pace(time_s);

        match self.drift {
            DriftMode::Accumulate => boat.transform.position.y += pace,
            DriftMode::Bounded => {
                boat.transform.position.y =
                    boat.rest_y + self.bounded_height * (1.0 - time_s.cos());
            }
        }

        boat.transform.rotation.z = pace * self.roll_factor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn boat(params: &BoatParams) -> Boat {
        Boat::new(params, 12)
    }

    #[test]
    fn test_initial_placement() {
        let params = BoatParams::default();
        let boat = boat(&params);

        assert_eq!(boat.transform.position, Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(boat.transform.rotation, Vec3::new(0.0, FRAC_PI_2, 0.0));
        assert_eq!(boat.rest_y, 0.0);
    }

    #[test]
    fn test_no_motion_at_time_zero() {
        let params = BoatParams::default();
        let animator = BoatAnimator::new(&params);
        let mut boat = boat(&params);
        let before = boat.transform;

        assert_eq!(animator.pace(0.0), 0.0);
        animator.animate(&mut boat, 0.0);

        assert_eq!(boat.transform.position, before.position);
        assert_eq!(boat.transform.rotation.z, 0.0);
    }

    #[test]
    fn test_accumulating_drift() {
        let params = BoatParams::default();
        let animator = BoatAnimator::new(&params);
        let mut boat = boat(&params);

        // Same time twice: height advances twice, roll is set (not summed)
        animator.animate(&mut boat, FRAC_PI_2);
        animator.animate(&mut boat, FRAC_PI_2);

        let pace = 2.0 * 0.008;
        assert!((boat.transform.position.y - 2.0 * pace).abs() < 1e-6);
        assert!((boat.transform.rotation.z - pace * 5.0).abs() < 1e-6);
        assert_eq!(boat.transform.position.x, 5.0);
    }

    #[test]
    fn test_bounded_bob_stays_bounded() {
        let params = BoatParams {
            drift: DriftMode::Bounded,
            ..BoatParams::default()
        };
        let animator = BoatAnimator::new(&params);
        let mut boat = boat(&params);
        let limit = 2.0 * params.bounded_bob_height_m() + 1e-4;

        for frame in 0..10_000 {
            animator.animate(&mut boat, frame as f32 / 60.0);
            let offset = boat.transform.position.y - boat.rest_y;
            assert!((0.0..=limit).contains(&offset), "offset {} at frame {}", offset, frame);
        }
    }

    #[test]
    fn test_model_matrix_applies_yaw_and_translation() {
        let transform = BoatTransform::new(&BoatParams::default());
        let m = transform.model_matrix();

        // Yaw of π/2 about Y turns local +Z into world +X
        let bow = m.transform_vector3(Vec3::Z);
        assert!((bow - Vec3::X).length() < 1e-5, "bow {:?}", bow);
        assert!((m.transform_point3(Vec3::ZERO) - Vec3::new(5.0, 0.0, 0.0)).length() < 1e-6);
    }
}
