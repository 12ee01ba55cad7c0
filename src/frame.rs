//! Frame loop and the collaborator seams it drives.

use std::time::Instant;

use winit::window::Window;

use crate::animation::AnimationDriver;
use crate::camera::PerspectiveCamera;
use crate::scene::Scene;

/// Monotonic time source
pub trait Clock {
    /// Seconds since the clock started
    fn elapsed_s(&self) -> f32;
}

/// Wall clock started at construction
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    fn elapsed_s(&self) -> f32 {
        self.start.elapsed().as_secs_f32()
    }
}

/// Requests another frame from the host
pub trait Scheduler {
    fn schedule_next(&mut self);
}

/// Schedules frames through winit's redraw requests
pub struct RedrawScheduler<'a>(pub &'a Window);

impl Scheduler for RedrawScheduler<'_> {
    fn schedule_next(&mut self) {
        self.0.request_redraw();
    }
}

/// Adjusts the camera once per frame (e.g. damped orbit controls)
pub trait CameraControl {
    fn update(&mut self, camera: &mut PerspectiveCamera);
}

/// Draws the scene as seen from its camera
pub trait SceneRenderer {
    type Error;

    fn render(&mut self, scene: &Scene) -> Result<(), Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// No frame has run yet
    Idle,
    /// Steady per-frame cycle
    Running,
}

/// Runs one frame per tick: sample time, animate, update controls, render, schedule
pub struct FrameLoop<C: Clock> {
    clock: C,
    driver: AnimationDriver,
    state: LoopState,
    frame_count: u64,
}

impl<C: Clock> FrameLoop<C> {
    pub fn new(clock: C, driver: AnimationDriver) -> Self {
        Self {
            clock,
            driver,
            state: LoopState::Idle,
            frame_count: 0,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Run one frame and return the elapsed time it animated to
    ///
    /// A render failure is returned before the next frame is scheduled; the caller decides
    /// whether to recover and reschedule.
    pub fn tick<R, K, S>(
        &mut self,
        scene: &mut Scene,
        controls: &mut K,
        renderer: &mut R,
        scheduler: &mut S,
    ) -> Result<f32, R::Error>
    where
        R: SceneRenderer,
        K: CameraControl,
        S: Scheduler,
    {
        self.state = LoopState::Running;

        let time_s = self.clock.elapsed_s();
        self.driver.update(scene, time_s);
        controls.update(&mut scene.camera);
        renderer.render(scene)?;

        self.frame_count += 1;
        log::trace!("frame {} at {:.3}s", self.frame_count, time_s);

        scheduler.schedule_next();
        Ok(time_s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use crate::boat::BoatAnimator;
    use crate::params::BoatParams;
    use crate::scene::tests::test_scene;

    type Log = Rc<RefCell<Vec<String>>>;

    struct StepClock {
        now: Cell<f32>,
        step: f32,
    }

    impl Clock for StepClock {
        fn elapsed_s(&self) -> f32 {
            let t = self.now.get();
            self.now.set(t + self.step);
            t
        }
    }

    struct RecordingControls(Log);

    impl CameraControl for RecordingControls {
        fn update(&mut self, _camera: &mut PerspectiveCamera) {
            self.0.borrow_mut().push("controls".to_string());
        }
    }

    struct RecordingRenderer {
        log: Log,
        fail: bool,
    }

    impl SceneRenderer for RecordingRenderer {
        type Error = String;

        fn render(&mut self, scene: &Scene) -> Result<(), String> {
            self.log
                .borrow_mut()
                .push(format!("render t={}", scene.uniforms.elapsed_time));
            if self.fail {
                Err("surface lost".to_string())
            } else {
                Ok(())
            }
        }
    }

    struct CountingScheduler {
        log: Log,
        count: usize,
    }

    impl Scheduler for CountingScheduler {
        fn schedule_next(&mut self) {
            self.count += 1;
            self.log.borrow_mut().push("schedule".to_string());
        }
    }

    fn frame_loop(step: f32) -> FrameLoop<StepClock> {
        FrameLoop::new(
            StepClock {
                now: Cell::new(0.0),
                step,
            },
            AnimationDriver::new(BoatAnimator::new(&BoatParams::default())),
        )
    }

    #[test]
    fn test_idle_until_first_tick() {
        let log = Log::default();
        let mut frames = frame_loop(0.5);
        let mut scene = test_scene();
        assert_eq!(frames.state(), LoopState::Idle);

        frames
            .tick(
                &mut scene,
                &mut RecordingControls(log.clone()),
                &mut RecordingRenderer {
                    log: log.clone(),
                    fail: false,
                },
                &mut CountingScheduler {
                    log: log.clone(),
                    count: 0,
                },
            )
            .unwrap();

        assert_eq!(frames.state(), LoopState::Running);
        assert_eq!(frames.frame_count(), 1);
    }

    #[test]
    fn test_tick_order_and_time() {
        let log = Log::default();
        let mut frames = frame_loop(0.5);
        let mut scene = test_scene();
        let mut controls = RecordingControls(log.clone());
        let mut renderer = RecordingRenderer {
            log: log.clone(),
            fail: false,
        };
        let mut scheduler = CountingScheduler {
            log: log.clone(),
            count: 0,
        };

        let mut times = Vec::new();
        for _ in 0..3 {
            times.push(
                frames
                    .tick(&mut scene, &mut controls, &mut renderer, &mut scheduler)
                    .unwrap(),
            );
        }

        assert_eq!(times, vec![0.0, 0.5, 1.0]);
        assert_eq!(scheduler.count, 3);
        assert_eq!(
            log.borrow()[..3],
            [
                "controls".to_string(),
                "render t=0".to_string(),
                "schedule".to_string()
            ]
        );
        // Renderer sees the time written this frame
        assert_eq!(log.borrow()[7], "render t=1");
        assert_eq!(frames.state(), LoopState::Running);
    }

    #[test]
    fn test_render_failure_skips_scheduling() {
        let log = Log::default();
        let mut frames = frame_loop(0.1);
        let mut scene = test_scene();
        let mut scheduler = CountingScheduler {
            log: log.clone(),
            count: 0,
        };

        let result = frames.tick(
            &mut scene,
            &mut RecordingControls(log.clone()),
            &mut RecordingRenderer {
                log: log.clone(),
                fail: true,
            },
            &mut scheduler,
        );

        assert_eq!(result, Err("surface lost".to_string()));
        assert_eq!(scheduler.count, 0);
        assert_eq!(frames.frame_count(), 0);
        // Still running: the loop never returns to idle
        assert_eq!(frames.state(), LoopState::Running);
    }

    #[test]
    fn test_boat_animates_once_loaded() {
        let log = Log::default();
        let mut frames = frame_loop(1.0);
        let mut scene = test_scene();
        let mut controls = RecordingControls(log.clone());
        let mut renderer = RecordingRenderer {
            log: log.clone(),
            fail: false,
        };
        let mut scheduler = CountingScheduler {
            log: log.clone(),
            count: 0,
        };

        frames
            .tick(&mut scene, &mut controls, &mut renderer, &mut scheduler)
            .unwrap();
        scene.place_boat(&BoatParams::default(), 1);
        frames
            .tick(&mut scene, &mut controls, &mut renderer, &mut scheduler)
            .unwrap();

        let boat = scene.boat.as_ref().unwrap();
        assert!((boat.transform.rotation.z - 1f32.sin() * 0.016 * 5.0).abs() < 1e-6);
    }
}
