use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use super::ElevationGrid;

pub const SRTM3_SIZE: usize = 1201;
pub const SRTM1_SIZE: usize = 3601;

const HGT_VOID: i16 = -32768;

/// Reads terrain products from a directory into an [`ElevationGrid`].
pub struct TerrainLoader {
    pub assets_path: PathBuf,
}

impl TerrainLoader {
    pub fn new(assets_path: PathBuf) -> Self {
        Self { assets_path }
    }

    /// Load one SRTM `.hgt` tile whose south-west corner is `(lat, lon)`.
    ///
    /// HGT rows run north to south; they are flipped so row 0 is the
    /// southern edge and latitudes ascend.
    pub fn load_tile(&self, lat: i32, lon: i32) -> Result<ElevationGrid> {
        let filename = format!("{}{:02}{}{:03}.hgt",
            if lat >= 0 { "N" } else { "S" }, lat.abs(),
            if lon >= 0 { "E" } else { "W" }, lon.abs()
        );
        let path = self.assets_path.join(&filename);

        let mut file = File::open(&path).with_context(|| format!("Failed to open {:?}", path))?;
        let metadata = file.metadata()?;
        let size = match metadata.len() {
            2884802 => SRTM3_SIZE,
            25934402 => SRTM1_SIZE,
            len => anyhow::bail!("Unknown HGT file size: {}", len),
        };

        let mut buffer = Vec::with_capacity(size * size * 2);
        file.read_to_end(&mut buffer)?;

        let raw: Vec<i16> = buffer
            .chunks_exact(2)
            .map(|chunk| i16::from_be_bytes([chunk[0], chunk[1]]))
            .collect();

        let mut data: Vec<f64> = raw
            .chunks_exact(size)
            .rev()
            .flatten()
            .map(|&h| if h == HGT_VOID { f64::NAN } else { h as f64 })
            .collect();

        let voids = data.iter().filter(|h| h.is_nan()).count();
        if voids > 0 {
            let passes = fill_voids(&mut data, size)
                .with_context(|| format!("Cannot fill voids in {:?}", path))?;
            warn!(tile = %filename, voids, passes, "Filled HGT void samples from neighbours");
        }

        let spacing = 1.0 / (size - 1) as f64;
        let latitudes = (0..size).map(|i| lat as f64 + i as f64 * spacing).collect();
        let longitudes = (0..size).map(|j| lon as f64 + j as f64 * spacing).collect();

        let grid = ElevationGrid::new(latitudes, longitudes, data)
            .with_context(|| format!("Invalid terrain in {:?}", path))?;
        info!(tile = %filename, size, "Loaded HGT tile");
        Ok(grid)
    }

    /// Load a grid stored as three header-less CSV files: one record per
    /// latitude row (ascending) for the elevations, and a single column of
    /// values for each axis.
    pub fn load_csv(
        &self,
        elevation_file: impl AsRef<Path>,
        latitude_file: impl AsRef<Path>,
        longitude_file: impl AsRef<Path>,
    ) -> Result<ElevationGrid> {
        let latitudes = read_csv_values(&self.assets_path.join(latitude_file))?;
        let longitudes = read_csv_values(&self.assets_path.join(longitude_file))?;
        let rows = read_csv_rows(&self.assets_path.join(elevation_file))?;

        let grid = ElevationGrid::from_rows(latitudes, longitudes, rows)
            .context("Invalid terrain in CSV grid")?;
        info!(rows = grid.rows(), cols = grid.cols(), "Loaded CSV terrain grid");
        Ok(grid)
    }
}

/// Replace void (NaN) samples of a square tile with the mean of their valid
/// 4-neighbours. Each pass fills the outer ring of every void region, so
/// large holes close from the edges inwards. Returns the number of passes.
fn fill_voids(data: &mut [f64], size: usize) -> Result<usize> {
    let mut holes: Vec<usize> = (0..data.len()).filter(|&i| data[i].is_nan()).collect();
    let mut passes = 0;

    while !holes.is_empty() {
        let filled: Vec<(usize, f64)> = holes
            .iter()
            .filter_map(|&idx| {
                let (row, col) = (idx / size, idx % size);
                let (sum, n) = [
                    (row > 0).then(|| idx - size),
                    (row + 1 < size).then(|| idx + size),
                    (col > 0).then(|| idx - 1),
                    (col + 1 < size).then(|| idx + 1),
                ]
                .into_iter()
                .flatten()
                .map(|i| data[i])
                .filter(|h| !h.is_nan())
                .fold((0.0, 0usize), |(sum, n), h| (sum + h, n + 1));
                (n > 0).then(|| (idx, sum / n as f64))
            })
            .collect();

        if filled.is_empty() {
            anyhow::bail!("tile has no valid elevation samples");
        }
        for (idx, h) in filled {
            data[idx] = h;
        }
        holes.retain(|&idx| data[idx].is_nan());
        passes += 1;
    }
    Ok(passes)
}

fn csv_reader(path: &Path) -> Result<csv::Reader<File>> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open {:?}", path))
}

fn parse_field(field: &str, path: &Path, line: usize) -> Result<f64> {
    field
        .parse::<f64>()
        .with_context(|| format!("Bad number {:?} in {:?} at record {}", field, path, line + 1))
}

fn read_csv_rows(path: &Path) -> Result<Vec<Vec<f64>>> {
    let mut reader = csv_reader(path)?;
    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Failed to read {:?}", path))?;
        let row = record
            .iter()
            .filter(|f| !f.is_empty())
            .map(|f| parse_field(f, path, line))
            .collect::<Result<Vec<_>>>()?;
        rows.push(row);
    }
    Ok(rows)
}

fn read_csv_values(path: &Path) -> Result<Vec<f64>> {
    Ok(read_csv_rows(path)?.into_iter().flatten().collect())
}
