//! Boat placement, bobbing motion and material parameters.

use std::f32::consts::FRAC_PI_2;

/// How the bobbing pace is applied to the boat's height
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriftMode {
    /// Add the pace to the height every frame (integrates a sine, drifts with frame rate)
    #[default]
    Accumulate,

    /// Set the height from a closed-form bounded oscillation around the rest height
    Bounded,
}

/// Boat placement and motion parameters
#[derive(Debug, Clone)]
pub struct BoatParams {
    /// Position once the model has loaded (world units)
    pub start_position: [f32; 3],

    /// Euler XYZ rotation once the model has loaded (radians)
    /// Yaw of π/2 points the bow along +X
    pub start_rotation: [f32; 3],

    /// Amplitude of the pace sine (dimensionless)
    pub pace_amplitude: f32,

    /// Per-frame scale applied to the pace sine (world units)
    pub pace_scale: f32,

    /// Roll angle per unit of pace (radians)
    pub roll_factor: f32,

    /// Refresh rate the bounded variant assumes when matching the accumulated motion (Hz)
    pub nominal_refresh_hz: f32,

    pub drift: DriftMode,

    /// Multiplier for the environment map contribution to the boat material
    pub env_map_intensity: f32,
}

impl Default for BoatParams {
    fn default() -> Self {
        Self {
            start_position: [5.0, 0.0, 0.0],
            start_rotation: [0.0, FRAC_PI_2, 0.0],
            pace_amplitude: 2.0,
            pace_scale: 0.008,
            roll_factor: 5.0,
            nominal_refresh_hz: 60.0,
            drift: DriftMode::Accumulate,
            env_map_intensity: 1.0,
        }
    }
}

impl BoatParams {
    /// Scale `h` of the bounded bob `y = rest + h·(1 − cos t)`
    ///
    /// Matches what the accumulated per-frame sum converges to at the nominal refresh rate.
    pub fn bounded_bob_height_m(&self) -> f32 {
        self.pace_amplitude * self.pace_scale * self.nominal_refresh_hz
    }
}
