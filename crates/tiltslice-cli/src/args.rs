//! Command-line arguments and their mapping onto [`Settings`].

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use tiltslice_math::Point3;
use tiltslice_slicer::{Settings, Strategy};
use tracing::debug;

/// Feed rates are given in mm/s on the command line and written in mm/min.
const SECONDS_PER_MINUTE: u32 = 60;

#[derive(Args, Debug)]
pub struct SliceArgs {
    /// Input STL file
    #[arg(short, long)]
    pub stl: PathBuf,

    /// Output G-code file
    #[arg(short = 'o', long, default_value = "out.gcode")]
    pub gcode: PathBuf,

    /// Center of the model along X
    #[arg(short = 'x', long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub originx: f64,

    /// Center of the model along Y
    #[arg(short = 'y', long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub originy: f64,

    /// Height of the model's lowest point
    #[arg(short = 'z', long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub originz: f64,

    /// Rotation center of the bed (X)
    #[arg(long, allow_negative_numbers = true)]
    pub rotcx: Option<f64>,

    /// Rotation center of the bed (Y)
    #[arg(long, allow_negative_numbers = true)]
    pub rotcy: Option<f64>,

    /// Rotation center of the bed (Z)
    #[arg(long, allow_negative_numbers = true)]
    pub rotcz: Option<f64>,

    /// Path simplification tolerance (mm)
    #[arg(short, long)]
    pub epsilon: Option<f64>,

    /// Layer height (mm)
    #[arg(short = 't', long)]
    pub thickness: Option<f64>,

    /// Total wall thickness (mm)
    #[arg(long, alias = "wall_thickness")]
    pub wall_thickness: Option<f64>,

    /// Fill density (percent)
    #[arg(long, alias = "fill_density")]
    pub fill_density: Option<f64>,

    /// Bed temperature (°C)
    #[arg(long, alias = "bed_temperature")]
    pub bed_temperature: Option<u32>,

    /// Extruder temperature (°C)
    #[arg(long, alias = "extruder_temperature")]
    pub extruder_temperature: Option<u32>,

    /// Fill speed (mm/s)
    #[arg(long, alias = "print_speed")]
    pub print_speed: Option<u32>,

    /// First layer speed (mm/s)
    #[arg(long, alias = "print_speed_layer1")]
    pub print_speed_layer1: Option<u32>,

    /// Wall speed (mm/s)
    #[arg(long, alias = "print_speed_wall")]
    pub print_speed_wall: Option<u32>,

    /// Keep the fan off during the first layer
    #[arg(long, alias = "fan_off_layer1")]
    pub fan_off_layer1: bool,

    /// Nozzle diameter (mm)
    #[arg(long)]
    pub nozzle: Option<f64>,

    /// Planes-description file for 5axes_by_profile and vip
    #[arg(long, alias = "planes_file")]
    pub planes_file: Option<PathBuf>,

    /// Slicing strategy: 3axes, 5axes_by_profile, 5axes or vip
    #[arg(long, alias = "slicing_type", default_value = "vip")]
    pub slicing_type: Strategy,

    /// Maximum number of incline brackets for vip
    #[arg(long, alias = "rotation_budget")]
    pub rotation_budget: Option<usize>,

    /// Header template file
    #[arg(long)]
    pub header: Option<PathBuf>,

    /// Footer template file
    #[arg(long)]
    pub footer: Option<PathBuf>,

    /// TOML settings file; flags given on the command line win
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write a JSON summary of the run here
    #[arg(long)]
    pub report: Option<PathBuf>,
}

impl SliceArgs {
    /// Target for the model's bounding-box center in X/Y and its bottom in Z.
    pub fn origin(&self) -> Point3 {
        Point3::new(self.originx, self.originy, self.originz)
    }

    /// Settings from the config file (or defaults) with flags applied on top.
    pub fn settings(&self) -> Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => load_config(path)?,
            None => Settings::default(),
        };

        if let Some(v) = self.thickness {
            settings.layer_height = v;
        }
        if let Some(v) = self.wall_thickness {
            settings.wall_thickness = v;
        }
        if let Some(v) = self.fill_density {
            settings.fill_density = v;
        }
        if let Some(v) = self.epsilon {
            settings.epsilon = v;
        }
        if let Some(v) = self.nozzle {
            settings.nozzle = v;
        }
        if let Some(v) = self.bed_temperature {
            settings.bed_temperature = v;
        }
        if let Some(v) = self.extruder_temperature {
            settings.extruder_temperature = v;
        }
        if let Some(v) = self.print_speed {
            settings.print_speed = v.saturating_mul(SECONDS_PER_MINUTE);
        }
        if let Some(v) = self.print_speed_layer1 {
            settings.print_speed_layer1 = v.saturating_mul(SECONDS_PER_MINUTE);
        }
        if let Some(v) = self.print_speed_wall {
            settings.print_speed_wall = v.saturating_mul(SECONDS_PER_MINUTE);
        }
        if self.fan_off_layer1 {
            settings.fan_off_layer1 = true;
        }
        if let Some(v) = self.rotcx {
            settings.rotation_center.x = v;
        }
        if let Some(v) = self.rotcy {
            settings.rotation_center.y = v;
        }
        if let Some(v) = self.rotcz {
            settings.rotation_center.z = v;
        }
        if let Some(path) = &self.planes_file {
            settings.planes_file = path.clone();
        }
        if let Some(v) = self.rotation_budget {
            settings.rotation_budget = v;
        }

        settings.date_time = chrono::Local::now().to_rfc2822();
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Args, Debug)]
pub struct SimplifyArgs {
    /// Input STL file
    #[arg(short, long)]
    pub stl: PathBuf,

    /// Output STL file
    #[arg(short = 'o', long, default_value = "out.stl")]
    pub output: PathBuf,

    /// Exact triangle count of the result
    #[arg(short = 't', long, default_value_t = 800)]
    pub triangles: usize,
}

/// Read a TOML settings file. Missing keys keep their defaults.
///
/// Feed rates in the file are mm/min, as stored.
pub fn load_config(path: &Path) -> Result<Settings> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let settings: Settings = toml::from_str(&text)
        .with_context(|| format!("Failed to parse config {}", path.display()))?;
    debug!(path = %path.display(), "Loaded config");
    Ok(settings)
}
