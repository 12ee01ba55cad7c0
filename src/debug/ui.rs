//! egui presentation of the debug panel.

use egui::{Context as EguiCtx, DragValue, ViewportId};
use egui_winit::State as EguiWinit;
use winit::event::WindowEvent;
use winit::window::Window;

use super::{Axis, PanelEdit, PanelSnapshot, AXIS_STEP};
use crate::scene::LoadStatus;
use crate::scene::Scene;

/// Tessellated panel ready for the render pass
pub struct OverlayFrame {
    pub paint_jobs: Vec<egui::ClippedPrimitive>,
    pub textures_delta: egui::TexturesDelta,
    pub pixels_per_point: f32,
}

/// egui context and winit input state for the panel
pub struct DebugUi {
    ctx: EguiCtx,
    state: EguiWinit,
}

impl DebugUi {
    pub fn new(window: &Window) -> Self {
        let ctx = EguiCtx::default();
        let state = EguiWinit::new(
            ctx.clone(),
            ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        Self { ctx, state }
    }

    /// Forward a window event; returns true when the panel consumed it
    pub fn on_window_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        self.state.on_window_event(window, event).consumed
    }

    /// Whether the pointer is over (or dragging) a panel widget
    pub fn wants_pointer(&self) -> bool {
        self.ctx.wants_pointer_input()
    }

    /// Lay out the panel for this frame and collect the fields the user changed
    pub fn run(
        &mut self,
        window: &Window,
        scene: &Scene,
        pixels_per_point: f32,
    ) -> (Vec<PanelEdit>, OverlayFrame) {
        let captured = PanelSnapshot::capture(scene);
        let mut edited = captured.clone();

        let input = self.state.take_egui_input(window);
        let full_output = self.ctx.run(input, |ctx| {
            egui::Window::new("Debug")
                .default_pos([12.0, 12.0])
                .resizable(false)
                .show(ctx, |ui| panel_contents(ui, &captured, &mut edited));
        });
        self.state
            .handle_platform_output(window, full_output.platform_output);

        let paint_jobs = self.ctx.tessellate(full_output.shapes, pixels_per_point);
        let overlay = OverlayFrame {
            paint_jobs,
            textures_delta: full_output.textures_delta,
            pixels_per_point,
        };

        (captured.diff(&edited), overlay)
    }
}

fn panel_contents(ui: &mut egui::Ui, captured: &PanelSnapshot, edited: &mut PanelSnapshot) {
    ui.label(format!("t = {:.2}s", captured.elapsed_time));
    ui.separator();

    ui.horizontal(|ui| {
        let mut color = captured.depth_color;
        if ui.color_edit_button_srgb(&mut color).changed() {
            edited.depth_color = color;
        }
        ui.label("depthColor");
    });
    ui.horizontal(|ui| {
        let mut color = captured.surface_color;
        if ui.color_edit_button_srgb(&mut color).changed() {
            edited.surface_color = color;
        }
        ui.label("surfaceColor");
    });

    ui.collapsing("Boat", |ui| {
        match (captured.boat_position, edited.boat_position.as_mut()) {
            (Some(position), Some(target)) => {
                if let Some(triangles) = captured.boat_triangles {
                    ui.label(format!("{} triangles", triangles));
                }
                axis_fields(ui, position, target);
            }
            _ => status_line(ui, &captured.boat_status),
        }
    });

    ui.collapsing("Camera", |ui| {
        axis_fields(ui, captured.camera_position, &mut edited.camera_position);
    });

    if !matches!(captured.environment_status, LoadStatus::Loaded) {
        ui.separator();
        ui.horizontal(|ui| {
            ui.label("Environment:");
            status_line(ui, &captured.environment_status);
        });
    }
}

fn axis_fields(ui: &mut egui::Ui, current: [f32; 3], target: &mut [f32; 3]) {
    for axis in Axis::ALL {
        let mut value = current[axis.index()];
        let response = ui.add(
            DragValue::new(&mut value)
                .speed(AXIS_STEP)
                .fixed_decimals(2)
                .prefix(format!("{}: ", axis.label())),
        );
        if response.changed() {
            target[axis.index()] = value;
        }
    }
}

fn status_line(ui: &mut egui::Ui, status: &LoadStatus) {
    match status {
        LoadStatus::Failed(_) => {
            ui.colored_label(egui::Color32::from_rgb(220, 100, 100), status.to_string());
        }
        _ => {
            ui.label(status.to_string());
        }
    }
}
