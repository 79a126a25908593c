use std::hash::{Hash, Hasher};
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{CoverageError, Result};
use crate::geo::LatLon;
use crate::physics::los::SamplingParams;
use crate::physics::refraction::RefractionParams;
use crate::terrain::ElevationGrid;

/// Flight levels evaluated when a scenario does not list any:
/// 500, 1 000, 2 000, 5 000, 10 000, 20 000, 30 000 and 40 000 ft.
pub const DEFAULT_FLIGHT_LEVELS_M: [f64; 8] =
    [152.0, 305.0, 610.0, 1524.0, 3048.0, 6096.0, 9144.0, 12192.0];

fn default_flight_levels() -> Vec<f64> {
    DEFAULT_FLIGHT_LEVELS_M.to_vec()
}

/// Radar placement as written in a scenario file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadarSite {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub height_above_terrain: f64, // meters
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub radar: RadarSite,
    #[serde(default = "default_flight_levels")]
    pub flight_levels: Vec<f64>,
    #[serde(default)]
    pub sampling: SamplingParams,
    #[serde(default)]
    pub refraction: RefractionParams,
}

impl ScenarioConfig {
    pub fn new(radar: RadarSite, flight_levels: Vec<f64>) -> Self {
        Self {
            radar,
            flight_levels,
            sampling: SamplingParams::default(),
            refraction: RefractionParams::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_flight_levels(&self.flight_levels)?;
        self.sampling.validate()?;
        self.refraction.validate()
    }
}

pub fn validate_flight_levels(levels: &[f64]) -> Result<()> {
    if levels.is_empty() {
        return Err(CoverageError::NoFlightLevels);
    }
    if let Some(index) = levels.iter().position(|v| !v.is_finite()) {
        return Err(CoverageError::InvalidFlightLevel { index, value: levels[index] });
    }
    Ok(())
}

pub fn load_scenario_from_json(path: impl AsRef<Path>) -> anyhow::Result<ScenarioConfig> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let reader = std::io::BufReader::new(file);
    let scenario: ScenarioConfig = serde_json::from_reader(reader)
        .with_context(|| format!("Failed to parse scenario {:?}", path))?;
    Ok(scenario)
}

/// A radar placed on a terrain grid. The absolute altitude is the terrain
/// height at the nearest grid node plus the mast height.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RadarStation {
    pub name: String,
    pub location: LatLon,
    pub ground_elevation: f64,
    pub height_above_terrain: f64,
    pub grid_index: (usize, usize),
}

impl RadarStation {
    pub fn place(site: &RadarSite, terrain: &ElevationGrid) -> Result<Self> {
        if !terrain.bounds().contains(site.latitude, site.longitude) {
            return Err(CoverageError::RadarOutsideGrid {
                latitude: site.latitude,
                longitude: site.longitude,
            });
        }
        if !site.height_above_terrain.is_finite() {
            return Err(CoverageError::InvalidRadarHeight(site.height_above_terrain));
        }

        let row = terrain.latitudes().nearest_index(site.latitude);
        let col = terrain.longitudes().nearest_index(site.longitude);
        let ground_elevation = terrain.get_height(row, col);

        Ok(Self {
            name: site.name.clone(),
            location: LatLon {
                latitude: site.latitude,
                longitude: site.longitude,
                altitude: ground_elevation + site.height_above_terrain,
            },
            ground_elevation,
            height_above_terrain: site.height_above_terrain,
            grid_index: (row, col),
        })
    }

    pub fn altitude(&self) -> f64 {
        self.location.altitude
    }

    pub(crate) fn hash_into<H: Hasher>(&self, hasher: &mut H) {
        self.name.hash(hasher);
        self.location.latitude.to_bits().hash(hasher);
        self.location.longitude.to_bits().hash(hasher);
        self.location.altitude.to_bits().hash(hasher);
    }
}
