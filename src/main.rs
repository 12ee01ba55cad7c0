//! Seaboat - a boat bobbing on a shader-animated sea
//!
//! Drag to orbit, scroll to zoom, ESC to quit.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use glam::Vec2;
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use seaboat::animation::AnimationDriver;
use seaboat::assets::{AssetLoader, LoadEvent};
use seaboat::boat::BoatAnimator;
use seaboat::camera::{OrbitControls, Viewport};
use seaboat::cli::Args;
use seaboat::debug::DebugUi;
use seaboat::error::RenderError;
use seaboat::frame::{FrameLoop, MonotonicClock, RedrawScheduler};
use seaboat::params::*;
use seaboat::rendering::RenderSystem;
use seaboat::scene::Scene;
use seaboat::sea::SurfaceMesh;

/// Scroll distance treated as one wheel line for touchpads (physical pixels)
const PIXELS_PER_SCROLL_LINE: f32 = 50.0;

/// Everything that exists once the window is up
struct Session {
    window: Arc<Window>,
    render_system: RenderSystem,
    debug_ui: Option<DebugUi>,
    loader: AssetLoader,
    frames: FrameLoop<MonotonicClock>,
    scene: Scene,
    controls: OrbitControls,
    viewport: Viewport,
}

/// Main application state
struct App {
    // Configuration
    sea_params: SeaParams,
    boat_params: BoatParams,
    camera_params: CameraParams,
    render_config: RenderConfig,
    asset_paths: AssetPaths,

    session: Option<Session>,

    /// Startup failure reported after the event loop exits
    fatal: Option<anyhow::Error>,
}

impl App {
    fn new(args: &Args) -> Self {
        Self {
            sea_params: args.sea_params(),
            boat_params: args.boat_params(),
            camera_params: args.camera_params(),
            render_config: args.render_config(),
            asset_paths: args.asset_paths(),
            session: None,
            fatal: None,
        }
    }

    fn start(&self, event_loop: &ActiveEventLoop) -> anyhow::Result<Session> {
        let window_attributes = Window::default_attributes()
            .with_title("Seaboat")
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.render_config.window_width,
                self.render_config.window_height,
            ));
        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .context("failed to create window")?,
        );

        let size = window.inner_size();
        let viewport = Viewport::from_physical(
            size.width,
            size.height,
            window.scale_factor(),
            self.render_config.max_pixel_ratio,
        );

        let mesh = SurfaceMesh::new(&self.sea_params);
        let render_system = pollster::block_on(RenderSystem::new(
            Arc::clone(&window),
            viewport.surface_size(),
            &mesh,
            &self.render_config,
            &self.boat_params,
        ))
        .context("failed to initialize renderer")?;

        let loader = AssetLoader::spawn(self.asset_paths.clone())
            .context("failed to start asset loader")?;

        let debug_ui = self
            .render_config
            .show_panel
            .then(|| DebugUi::new(&window));

        let scene = Scene::new(&self.sea_params, &self.camera_params, viewport.aspect());
        let frames = FrameLoop::new(
            MonotonicClock::start(),
            AnimationDriver::new(BoatAnimator::new(&self.boat_params)),
        );

        log::info!(
            "Sea: {} vertices, {} triangles",
            mesh.vertices.len(),
            mesh.indices.len() / 3
        );

        Ok(Session {
            window,
            render_system,
            debug_ui,
            loader,
            frames,
            scene,
            controls: OrbitControls::new(&self.camera_params),
            viewport,
        })
    }
}

impl Session {
    /// Hand completed asset loads to the renderer and the scene
    fn receive_assets(&mut self, boat_params: &BoatParams) {
        for event in self.loader.poll() {
            match event {
                LoadEvent::Boat(Ok(model)) => {
                    log::info!("Boat loaded ({} triangles)", model.triangle_count());
                    self.render_system.upload_boat(&model);
                    self.scene.place_boat(boat_params, model.triangle_count());
                }
                LoadEvent::Boat(Err(e)) => {
                    log::error!("Boat unavailable: {}", e);
                    self.scene.boat_failed(e.to_string());
                }
                LoadEvent::Environment(Ok(images)) => {
                    log::info!("Environment map loaded ({}px faces)", images.size);
                    self.render_system.upload_environment(&images);
                    self.scene.environment_loaded();
                }
                LoadEvent::Environment(Err(e)) => {
                    log::warn!("Environment map unavailable: {}", e);
                    self.scene.environment_failed(e.to_string());
                }
            }
        }
    }

    fn resize(&mut self, max_pixel_ratio: f32) {
        let size = self.window.inner_size();
        let viewport = Viewport::from_physical(
            size.width,
            size.height,
            self.window.scale_factor(),
            max_pixel_ratio,
        );
        if viewport.is_empty() {
            return; // Minimized
        }

        self.viewport = viewport;
        self.scene.resize(&viewport);
        let (width, height) = viewport.surface_size();
        self.render_system.resize(width, height);
        log::info!(
            "Resized to {}x{} ({}x{} px)",
            viewport.width,
            viewport.height,
            width,
            height
        );
    }

    /// Orbit input; presses and scrolls aimed at the panel are left to it
    fn handle_pointer(&mut self, event: &WindowEvent, consumed_by_panel: bool) {
        let panel_has_pointer = consumed_by_panel
            || self
                .debug_ui
                .as_ref()
                .is_some_and(|ui| ui.wants_pointer());

        match event {
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => match state {
                ElementState::Pressed if !panel_has_pointer => self.controls.set_dragging(true),
                ElementState::Pressed => {}
                ElementState::Released => self.controls.set_dragging(false),
            },
            WindowEvent::CursorMoved { position, .. } => {
                let height = self.window.inner_size().height as f32;
                self.controls
                    .pointer_moved(Vec2::new(position.x as f32, position.y as f32), height);
            }
            WindowEvent::MouseWheel { delta, .. } if !panel_has_pointer => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / PIXELS_PER_SCROLL_LINE,
                };
                self.controls.scroll(lines);
            }
            _ => {}
        }
    }

    /// Run one frame; returns false when the app should exit
    fn redraw(&mut self, boat_params: &BoatParams) -> bool {
        self.receive_assets(boat_params);

        if let Some(ui) = self.debug_ui.as_mut() {
            let (edits, overlay) = ui.run(&self.window, &self.scene, self.viewport.pixel_ratio);
            for edit in edits {
                log::debug!("Panel edit: {:?}", edit);
                edit.apply(&mut self.scene);
            }
            self.render_system.set_overlay(overlay);
        }

        let window = Arc::clone(&self.window);
        let result = self.frames.tick(
            &mut self.scene,
            &mut self.controls,
            &mut self.render_system,
            &mut RedrawScheduler(&window),
        );

        match result {
            Ok(_) => true,
            Err(RenderError::Surface(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                log::warn!("Surface lost, reconfiguring");
                self.render_system.reconfigure();
                window.request_redraw();
                true
            }
            Err(RenderError::Surface(wgpu::SurfaceError::OutOfMemory)) => {
                log::error!("Out of GPU memory");
                false
            }
            Err(e) => {
                log::warn!("Frame skipped: {}", e);
                window.request_redraw();
                true
            }
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.session.is_some() {
            return; // Already initialized
        }

        match self.start(event_loop) {
            Ok(session) => {
                log::info!("Seaboat is running (ESC to quit)");
                session.window.request_redraw();
                self.session = Some(session);
            }
            Err(e) => {
                self.fatal = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        let consumed = match session.debug_ui.as_mut() {
            Some(ui) => ui.on_window_event(&session.window, &event),
            None => false,
        };

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        ..
                    },
                ..
            } => event_loop.exit(),
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                session.resize(self.render_config.max_pixel_ratio);
            }
            WindowEvent::RedrawRequested => {
                if !session.redraw(&self.boat_params) {
                    event_loop.exit();
                }
            }
            ref pointer => session.handle_pointer(pointer, consumed),
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut app = App::new(&args);

    let event_loop = EventLoop::new().context("failed to create event loop")?;
    event_loop
        .run_app(&mut app)
        .context("event loop terminated abnormally")?;

    match app.fatal.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
