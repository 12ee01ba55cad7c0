//! Debug panel: live editing of sea colors, boat position and camera position.
//!
//! The panel edits a [`PanelSnapshot`] of the scene; differences against the scene become
//! [`PanelEdit`]s which are applied before the next frame animates.

mod ui;

use std::ops::RangeInclusive;

use crate::color::Color;
use crate::scene::{LoadStatus, Scene};

pub use ui::{DebugUi, OverlayFrame};

/// Allowed range for position fields (world units)
pub const AXIS_RANGE: RangeInclusive<f32> = -10.0..=10.0;

/// Drag step for position fields (world units)
pub const AXIS_STEP: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }
}

/// One field changed in the panel
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PanelEdit {
    DepthColor(Color),
    SurfaceColor(Color),
    BoatPosition(Axis, f32),
    CameraPosition(Axis, f32),
}

impl PanelEdit {
    /// Write the edit into the scene; boat edits are dropped while the boat is absent.
    ///
    /// Positions snap to [`AXIS_STEP`] and are clamped to [`AXIS_RANGE`].
    pub fn apply(self, scene: &mut Scene) {
        let steps = (1.0 / AXIS_STEP).round() as f32;
        let clamp = |value: f32| {
            ((value * steps).round() / steps).clamp(*AXIS_RANGE.start(), *AXIS_RANGE.end())
        };

        match self {
            PanelEdit::DepthColor(color) => scene.uniforms.depth_color = color,
            PanelEdit::SurfaceColor(color) => scene.uniforms.surface_color = color,
            PanelEdit::BoatPosition(axis, value) => {
                if let Some(boat) = scene.boat.as_mut() {
                    boat.transform.position[axis.index()] = clamp(value);
                }
            }
            PanelEdit::CameraPosition(axis, value) => {
                scene.camera.position[axis.index()] = clamp(value);
            }
        }
    }
}

/// Editable copy of the panel's fields
#[derive(Debug, Clone, PartialEq)]
pub struct PanelSnapshot {
    pub depth_color: [u8; 3],
    pub surface_color: [u8; 3],
    /// `None` while the boat has not loaded
    pub boat_position: Option<[f32; 3]>,
    pub boat_triangles: Option<usize>,
    pub camera_position: [f32; 3],
    pub elapsed_time: f32,
    pub boat_status: LoadStatus,
    pub environment_status: LoadStatus,
}

impl PanelSnapshot {
    pub fn capture(scene: &Scene) -> Self {
        Self {
            depth_color: scene.uniforms.depth_color.to_rgb8(),
            surface_color: scene.uniforms.surface_color.to_rgb8(),
            boat_position: scene
                .boat
                .as_ref()
                .map(|boat| boat.transform.position.to_array()),
            boat_triangles: scene.boat.as_ref().map(|boat| boat.triangle_count),
            camera_position: scene.camera.position.to_array(),
            elapsed_time: scene.uniforms.elapsed_time,
            boat_status: scene.boat_status.clone(),
            environment_status: scene.environment_status.clone(),
        }
    }

    /// Edits that turn `self` (as captured) into `edited` (as left by the widgets)
    pub fn diff(&self, edited: &PanelSnapshot) -> Vec<PanelEdit> {
        let mut edits = Vec::new();

        if edited.depth_color != self.depth_color {
            edits.push(PanelEdit::DepthColor(Color::from_rgb8(edited.depth_color)));
        }
        if edited.surface_color != self.surface_color {
            edits.push(PanelEdit::SurfaceColor(Color::from_rgb8(edited.surface_color)));
        }

        if let (Some(before), Some(after)) = (self.boat_position, edited.boat_position) {
            for axis in Axis::ALL {
                if after[axis.index()] != before[axis.index()] {
                    edits.push(PanelEdit::BoatPosition(axis, after[axis.index()]));
                }
            }
        }

        for axis in Axis::ALL {
            let (before, after) = (
                self.camera_position[axis.index()],
                edited.camera_position[axis.index()],
            );
            if after != before {
                edits.push(PanelEdit::CameraPosition(axis, after));
            }
        }

        edits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::BoatParams;
    use crate::scene::tests::test_scene;

    #[test]
    fn test_unchanged_snapshot_has_no_edits() {
        let scene = test_scene();
        let snapshot = PanelSnapshot::capture(&scene);
        assert!(snapshot.diff(&snapshot.clone()).is_empty());
    }

    #[test]
    fn test_color_edit_updates_uniforms() {
        let mut scene = test_scene();
        let before = PanelSnapshot::capture(&scene);
        let mut edited = before.clone();
        edited.depth_color = [0x11, 0x22, 0x33];

        let edits = before.diff(&edited);
        assert_eq!(edits.len(), 1);
        for edit in edits {
            edit.apply(&mut scene);
        }

        assert_eq!(scene.uniforms.depth_color.to_string(), "#112233");
        assert_eq!(scene.uniforms.surface_color.to_string(), "#4d8bb3");
    }

    #[test]
    fn test_boat_fields_absent_until_loaded() {
        let mut scene = test_scene();
        assert_eq!(PanelSnapshot::capture(&scene).boat_position, None);

        // Edits aimed at a missing boat are ignored
        PanelEdit::BoatPosition(Axis::X, 1.0).apply(&mut scene);
        assert!(scene.boat.is_none());

        scene.place_boat(&BoatParams::default(), 1);
        let before = PanelSnapshot::capture(&scene);
        assert_eq!(before.boat_position, Some([5.0, 0.0, 0.0]));
        assert_eq!(before.boat_triangles, Some(1));

        let mut edited = before.clone();
        edited.boat_position = Some([5.0, 0.0, -3.5]);
        let edits = before.diff(&edited);
        assert_eq!(edits, vec![PanelEdit::BoatPosition(Axis::Z, -3.5)]);

        edits[0].apply(&mut scene);
        assert_eq!(scene.boat.as_ref().unwrap().transform.position.z, -3.5);
    }

    #[test]
    fn test_position_edits_are_clamped() {
        let mut scene = test_scene();
        PanelEdit::CameraPosition(Axis::Y, 42.0).apply(&mut scene);
        assert_eq!(scene.camera.position.y, 10.0);

        PanelEdit::CameraPosition(Axis::X, -42.0).apply(&mut scene);
        assert_eq!(scene.camera.position.x, -10.0);
    }

    #[test]
    fn test_position_edits_snap_to_step() {
        let mut scene = test_scene();
        PanelEdit::CameraPosition(Axis::Z, 1.234567).apply(&mut scene);
        assert!((scene.camera.position.z - 1.23).abs() < 1e-6);

        scene.place_boat(&BoatParams::default(), 1);
        PanelEdit::BoatPosition(Axis::Y, -0.4449).apply(&mut scene);
        assert!((scene.boat.as_ref().unwrap().transform.position.y + 0.44).abs() < 1e-6);

        PanelEdit::BoatPosition(Axis::X, 9.996).apply(&mut scene);
        assert_eq!(scene.boat.as_ref().unwrap().transform.position.x, 10.0);
    }
}
