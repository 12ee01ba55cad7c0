//! Per-frame animation: wave time and boat motion.

use crate::boat::BoatAnimator;
use crate::scene::Scene;

/// Advances everything in the scene that depends on elapsed time
#[derive(Debug, Clone)]
pub struct AnimationDriver {
    boat: BoatAnimator,
}

impl AnimationDriver {
    pub fn new(boat: BoatAnimator) -> Self {
        Self { boat }
    }

    /// Write `time_s` into the wave uniforms and move the boat if it has loaded.
    ///
    /// Elapsed time never decreases: an earlier `time_s` is held at the last written value.
    pub fn update(&self, scene: &mut Scene, time_s: f32) {
        let previous = scene.uniforms.elapsed_time;
        if time_s < previous {
            log::warn!("Elapsed time went backwards ({} -> {}), holding", previous, time_s);
        }
        let time_s = time_s.max(previous);
        scene.uniforms.elapsed_time = time_s;

        if let Some(boat) = scene.boat.as_mut() {
            self.boat.animate(boat, time_s);
        }
    }
}
