use itertools::Itertools;

use crate::error::{CoverageError, Result};
use crate::geo::GeoBounds;
use crate::physics::los::TerrainProvider;

mod loader;

pub use loader::{SRTM1_SIZE, SRTM3_SIZE, TerrainLoader};

/// Largest deviation of a single axis step from the mean step, and of any
/// node from its ideal position `min + k * step`, as a fraction of the mean
/// step. Terrain products often store coordinates as f32.
pub const UNIFORM_SPACING_TOLERANCE: f64 = 0.01;

/// A strictly ascending, uniformly spaced coordinate axis (degrees).
#[derive(Debug, Clone, PartialEq)]
pub struct GridAxis {
    values: Vec<f64>,
    step: f64,
}

// Construction guarantees at least two nodes.
#[allow(clippy::len_without_is_empty)]
impl GridAxis {
    pub fn new(axis: &'static str, values: Vec<f64>) -> Result<Self> {
        if values.len() < 2 {
            return Err(CoverageError::AxisTooShort { axis, len: values.len() });
        }
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(CoverageError::NonFiniteCoordinate { axis, index });
        }

        let step = (values[values.len() - 1] - values[0]) / (values.len() - 1) as f64;
        if let Some(index) = values.iter().tuple_windows().position(|(a, b)| b <= a) {
            return Err(CoverageError::AxisNotAscending { axis, index: index + 1 });
        }
        for (index, (a, b)) in values.iter().tuple_windows().enumerate() {
            let delta = b - a;
            if (delta - step).abs() > step * UNIFORM_SPACING_TOLERANCE {
                return Err(CoverageError::AxisNotUniform {
                    axis,
                    index: index + 1,
                    step: delta,
                    expected: step,
                });
            }
        }
        // Steps inside the tolerance can still add up to a shifted node.
        let origin = values[0];
        if let Some(index) = values
            .iter()
            .enumerate()
            .position(|(k, v)| (v - (origin + k as f64 * step)).abs() > step * UNIFORM_SPACING_TOLERANCE)
        {
            return Err(CoverageError::AxisDrift {
                axis,
                index,
                offset: values[index] - (origin + index as f64 * step),
                step,
            });
        }

        Ok(Self { values, step })
    }

    pub fn min(&self) -> f64 {
        self.values[0]
    }

    pub fn max(&self) -> f64 {
        self.values[self.values.len() - 1]
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Index of the node closest to `value`; the first one wins a tie.
    pub fn nearest_index(&self, value: f64) -> usize {
        self.values
            .iter()
            .position_min_by(|a, b| (*a - value).abs().total_cmp(&(*b - value).abs()))
            .unwrap_or(0)
    }

    /// Lower node of the cell containing `value` and the fractional offset
    /// inside that cell. Caller guarantees `min() <= value <= max()`.
    #[inline(always)]
    fn cell(&self, value: f64) -> (usize, f64) {
        let last = self.values.len() - 2;
        let mut i = (((value - self.values[0]) / self.step) as usize).min(last);
        // Nodes may sit up to the tolerance off the ideal lattice.
        if value < self.values[i] && i > 0 {
            i -= 1;
        } else if value > self.values[i + 1] && i < last {
            i += 1;
        }
        let (lo, hi) = (self.values[i], self.values[i + 1]);
        (i, (value - lo) / (hi - lo))
    }
}

/// Terrain elevations in meters, row-major with rows along latitude and
/// columns along longitude. Static for the lifetime of a coverage run.
#[derive(Debug, Clone, PartialEq)]
pub struct ElevationGrid {
    latitudes: GridAxis,
    longitudes: GridAxis,
    data: Vec<f64>,
}

impl ElevationGrid {
    pub fn new(latitudes: Vec<f64>, longitudes: Vec<f64>, data: Vec<f64>) -> Result<Self> {
        let latitudes = GridAxis::new("latitude", latitudes)?;
        let longitudes = GridAxis::new("longitude", longitudes)?;

        let (rows, cols) = (latitudes.len(), longitudes.len());
        if data.len() != rows * cols {
            return Err(CoverageError::ShapeMismatch { rows, cols, actual: data.len() });
        }
        if let Some(idx) = data.iter().position(|h| !h.is_finite()) {
            return Err(CoverageError::NonFiniteElevation {
                row: idx / cols,
                col: idx % cols,
            });
        }

        Ok(Self { latitudes, longitudes, data })
    }

    /// Build from nested rows, `rows[i][j]` being the elevation at
    /// `(latitudes[i], longitudes[j])`.
    pub fn from_rows(latitudes: Vec<f64>, longitudes: Vec<f64>, rows: Vec<Vec<f64>>) -> Result<Self> {
        let cols = longitudes.len();
        if let Some(bad) = rows.iter().find(|r| r.len() != cols) {
            return Err(CoverageError::ShapeMismatch {
                rows: latitudes.len(),
                cols,
                actual: bad.len() * rows.len(),
            });
        }
        Self::new(latitudes, longitudes, rows.into_iter().flatten().collect())
    }

    pub fn rows(&self) -> usize {
        self.latitudes.len()
    }

    pub fn cols(&self) -> usize {
        self.longitudes.len()
    }

    pub fn latitudes(&self) -> &GridAxis {
        &self.latitudes
    }

    pub fn longitudes(&self) -> &GridAxis {
        &self.longitudes
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    #[inline(always)]
    pub fn get_height(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols() + col]
    }

    pub fn bounds(&self) -> GeoBounds {
        GeoBounds {
            south: self.latitudes.min(),
            north: self.latitudes.max(),
            west: self.longitudes.min(),
            east: self.longitudes.max(),
        }
    }

    /// Bilinear elevation at an arbitrary point. Points outside the grid, and
    /// NaN coordinates, return `f64::INFINITY` so unknown terrain always
    /// blocks a ray.
    #[inline]
    pub fn sample(&self, latitude: f64, longitude: f64) -> f64 {
        self.sample_within(&self.bounds(), latitude, longitude)
    }

    #[inline(always)]
    fn sample_within(&self, bounds: &GeoBounds, latitude: f64, longitude: f64) -> f64 {
        if !bounds.contains(latitude, longitude) {
            return f64::INFINITY;
        }

        let (i, lat_w) = self.latitudes.cell(latitude);
        let (j, lon_w) = self.longitudes.cell(longitude);

        let h00 = self.get_height(i, j);
        let h10 = self.get_height(i + 1, j);
        let h01 = self.get_height(i, j + 1);
        let h11 = self.get_height(i + 1, j + 1);

        let h0 = h00 * (1.0 - lat_w) + h10 * lat_w;
        let h1 = h01 * (1.0 - lat_w) + h11 * lat_w;

        h0 * (1.0 - lon_w) + h1 * lon_w
    }
}

impl TerrainProvider for ElevationGrid {
    fn elevation_at(&self, latitude: f64, longitude: f64) -> f64 {
        self.sample(latitude, longitude)
    }

    fn sample_batch(&self, latitudes: &[f64], longitudes: &[f64], out: &mut [f64]) {
        debug_assert_eq!(latitudes.len(), longitudes.len());
        debug_assert_eq!(latitudes.len(), out.len());

        let bounds = self.bounds();
        for ((h, &lat), &lon) in out.iter_mut().zip(latitudes).zip(longitudes) {
            *h = self.sample_within(&bounds, lat, lon);
        }
    }
}
