//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::color::Color;
use crate::params::{AssetPaths, BoatParams, CameraParams, DriftMode, RenderConfig, SeaParams};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "seaboat")]
#[command(about = "A boat bobbing on a shader-animated sea", long_about = None)]
pub struct Args {
    /// Directory containing models/boat.glb and textures/environmentMaps/0/
    #[arg(long, value_name = "DIR", default_value = "static")]
    pub assets: PathBuf,

    /// Initial window width (logical pixels)
    #[arg(long, value_name = "PIXELS", default_value = "1280")]
    pub width: u32,

    /// Initial window height (logical pixels)
    #[arg(long, value_name = "PIXELS", default_value = "720")]
    pub height: u32,

    /// Wave height multiplier
    #[arg(long, value_name = "K", default_value = "2")]
    pub intensity: f32,

    /// Sea color at the wave crests
    #[arg(long, value_name = "HEX")]
    pub depth_color: Option<Color>,

    /// Sea color of the undisturbed surface
    #[arg(long, value_name = "HEX")]
    pub surface_color: Option<Color>,

    /// Bob the boat around its rest height instead of accumulating the pace every frame
    #[arg(long)]
    pub bounded_bob: bool,

    /// Hide the debug panel
    #[arg(long)]
    pub no_panel: bool,
}

impl Args {
    pub fn sea_params(&self) -> SeaParams {
        let defaults = SeaParams::default();
        SeaParams {
            depth_color: self.depth_color.unwrap_or(defaults.depth_color),
            surface_color: self.surface_color.unwrap_or(defaults.surface_color),
            intensity: self.intensity,
            ..defaults
        }
    }

    pub fn boat_params(&self) -> BoatParams {
        BoatParams {
            drift: if self.bounded_bob {
                DriftMode::Bounded
            } else {
                DriftMode::Accumulate
            },
            ..BoatParams::default()
        }
    }

    pub fn camera_params(&self) -> CameraParams {
        CameraParams::default()
    }

    pub fn render_config(&self) -> RenderConfig {
        RenderConfig {
            window_width: self.width.max(1),
            window_height: self.height.max(1),
            show_panel: !self.no_panel,
            ..RenderConfig::default()
        }
    }

    pub fn asset_paths(&self) -> AssetPaths {
        AssetPaths::new(&self.assets)
    }
}
