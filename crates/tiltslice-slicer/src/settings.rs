//! Print settings shared by every stage of the pipeline.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tiltslice_math::Point3;

use crate::error::{Result, SlicerError};

/// Immutable print configuration.
///
/// Feed rates are stored in mm/min, the unit written to G-code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Slice thickness (mm).
    pub layer_height: f64,
    /// Total wall thickness (mm); divided by the nozzle gives the wall count.
    pub wall_thickness: f64,
    /// Fill density in percent (0 = hollow, 100 = solid).
    pub fill_density: f64,
    /// Path simplification tolerance (mm).
    pub epsilon: f64,
    /// Nozzle diameter (mm), also the extrusion width.
    pub nozzle: f64,
    /// Bed temperature (°C).
    pub bed_temperature: u32,
    /// Extruder temperature (°C).
    pub extruder_temperature: u32,
    /// Fill feed rate (mm/min).
    pub print_speed: u32,
    /// Feed rate for every path of the first layer (mm/min).
    pub print_speed_layer1: u32,
    /// Wall feed rate (mm/min).
    pub print_speed_wall: u32,
    /// Keep the part-cooling fan off during the first layer.
    pub fan_off_layer1: bool,
    /// Pivot of the rotating bed.
    pub rotation_center: Point3,
    /// Planes-description file for the multi-axis strategies.
    pub planes_file: PathBuf,
    /// Maximum number of incline brackets the optimized strategy may use.
    pub rotation_budget: usize,
    /// Timestamp for templates, filled in by the front end.
    #[serde(skip)]
    pub date_time: String,
    /// Final layer count, known only after slicing.
    #[serde(skip)]
    pub layer_count: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            layer_height: 0.2,
            wall_thickness: 1.2,
            fill_density: 20.0,
            epsilon: 0.05,
            nozzle: 0.4,
            bed_temperature: 60,
            extruder_temperature: 200,
            print_speed: 3000,
            print_speed_layer1: 3000,
            print_speed_wall: 3000,
            fan_off_layer1: false,
            rotation_center: Point3::origin(),
            planes_file: PathBuf::from("planes_file.txt"),
            rotation_budget: 2,
            date_time: String::new(),
            layer_count: 0,
        }
    }
}

impl Settings {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if !(self.layer_height > 0.0 && self.layer_height <= 10.0) {
            return Err(SlicerError::InvalidSettings(
                "layer_height must be in (0, 10] mm".into(),
            ));
        }
        if !(self.nozzle > 0.0) {
            return Err(SlicerError::InvalidSettings("nozzle must be positive".into()));
        }
        if !(self.wall_thickness >= 0.0) {
            return Err(SlicerError::InvalidSettings(
                "wall_thickness must not be negative".into(),
            ));
        }
        if !(0.0..=100.0).contains(&self.fill_density) {
            return Err(SlicerError::InvalidSettings(
                "fill_density must be between 0 and 100 percent".into(),
            ));
        }
        if !(self.epsilon >= 0.0) {
            return Err(SlicerError::InvalidSettings(
                "epsilon must not be negative".into(),
            ));
        }
        for (name, value) in [
            ("print_speed", self.print_speed),
            ("print_speed_layer1", self.print_speed_layer1),
            ("print_speed_wall", self.print_speed_wall),
        ] {
            if value == 0 {
                return Err(SlicerError::InvalidSettings(format!(
                    "{name} must be positive"
                )));
            }
        }
        if !self.rotation_center.iter().all(|c| c.is_finite()) {
            return Err(SlicerError::InvalidSettings(
                "rotation_center must be finite".into(),
            ));
        }
        Ok(())
    }

    /// Number of closed walls per contour.
    pub fn wall_count(&self) -> usize {
        ((self.wall_thickness / self.nozzle).round() as usize).max(1)
    }

    /// A copy carrying the final layer count.
    pub fn with_layer_count(&self, layer_count: usize) -> Self {
        Self {
            layer_count,
            ..self.clone()
        }
    }

    /// Key/value view used to fill header and footer templates.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        let c = &self.rotation_center;
        [
            ("date_time", self.date_time.clone()),
            ("layer_height", self.layer_height.to_string()),
            ("wall_thickness", self.wall_thickness.to_string()),
            ("fill_density", self.fill_density.to_string()),
            ("epsilon", self.epsilon.to_string()),
            ("nozzle", self.nozzle.to_string()),
            ("bed_temperature", self.bed_temperature.to_string()),
            ("extruder_temperature", self.extruder_temperature.to_string()),
            ("print_speed", self.print_speed.to_string()),
            ("print_speed_layer1", self.print_speed_layer1.to_string()),
            ("print_speed_wall", self.print_speed_wall.to_string()),
            ("fan_off_layer1", self.fan_off_layer1.to_string()),
            ("rotation_center_x", c.x.to_string()),
            ("rotation_center_y", c.y.to_string()),
            ("rotation_center_z", c.z.to_string()),
            ("planes_file", self.planes_file.display().to_string()),
            ("rotation_budget", self.rotation_budget.to_string()),
            ("layer_count", self.layer_count.to_string()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        settings.validate().unwrap();
        assert_eq!(settings.wall_count(), 3);
    }

    #[test]
    fn test_invalid_settings() {
        let bad = [
            Settings {
                layer_height: -0.1,
                ..Default::default()
            },
            Settings {
                nozzle: 0.0,
                ..Default::default()
            },
            Settings {
                fill_density: 120.0,
                ..Default::default()
            },
            Settings {
                epsilon: f64::NAN,
                ..Default::default()
            },
            Settings {
                print_speed_wall: 0,
                ..Default::default()
            },
        ];
        for settings in bad {
            assert!(settings.validate().is_err(), "{settings:?}");
        }
    }

    #[test]
    fn test_wall_count_never_zero() {
        let settings = Settings {
            wall_thickness: 0.0,
            ..Default::default()
        };
        assert_eq!(settings.wall_count(), 1);
    }

    #[test]
    fn test_map_carries_layer_count() {
        let map = Settings::default().with_layer_count(50).to_map();
        assert_eq!(map["layer_count"], "50");
        assert_eq!(map["extruder_temperature"], "200");
        assert_eq!(map["print_speed"], "3000");
    }
}
