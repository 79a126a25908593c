use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::cache::{CoverageCache, CoverageKey, CoverageMetrics};
use crate::error::{CoverageError, Result};
use crate::geo::{GeoBounds, LatLon, LocalProjector, LocalXY};
use crate::io::{validate_flight_levels, RadarSite, RadarStation, ScenarioConfig};
use crate::physics::los::{LosSystem, RayScratch, RayTrace, SamplingParams};
use crate::physics::refraction::RefractionParams;
use crate::terrain::ElevationGrid;

/// Per-flight-level visibility, same shape as the terrain grid.
/// Row 0 is the southernmost latitude.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibilityMask {
    rows: usize,
    cols: usize,
    data: Vec<bool>,
}

impl VisibilityMask {
    /// `None` when `data` does not hold exactly `rows * cols` cells.
    pub fn from_cells(rows: usize, cols: usize, data: Vec<bool>) -> Option<Self> {
        (data.len() == rows * cols).then_some(Self { rows, cols, data })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline(always)]
    pub fn get(&self, row: usize, col: usize) -> bool {
        self.data[row * self.cols + col]
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.data
    }

    pub fn visible_count(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    pub fn visible_fraction(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.visible_count() as f64 / self.data.len() as f64
    }
}

/// One finished flight level, the unit handed to exporters.
#[derive(Debug, Clone)]
pub struct CoverageLayer {
    pub flight_level_m: f64,
    pub mask: Arc<VisibilityMask>,
    pub radar: RadarStation,
    pub bounds: GeoBounds,
}

/// Shared between a running sweep and whoever watches it. Cancellation is
/// only honoured between flight levels.
#[derive(Debug, Default)]
pub struct SweepProgress {
    completed: AtomicU32,
    cancelled: AtomicBool,
}

impl SweepProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn completed(&self) -> u32 {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Everything a sweep reads: terrain, the radar-centred projection of every
/// grid node, the placed radar and the ray settings. Built once, then only
/// borrowed.
#[derive(Debug)]
pub struct CoverageContext {
    terrain: ElevationGrid,
    projector: LocalProjector,
    planar: Vec<LocalXY>,
    radar: RadarStation,
    los: LosSystem,
    fingerprint: u64,
}

impl CoverageContext {
    pub fn new(
        terrain: ElevationGrid,
        site: &RadarSite,
        sampling: SamplingParams,
        refraction: RefractionParams,
    ) -> Result<Self> {
        sampling.validate()?;
        refraction.validate()?;
        let radar = RadarStation::place(site, &terrain)?;

        let projector = LocalProjector::new(LatLon {
            latitude: site.latitude,
            longitude: site.longitude,
            altitude: radar.altitude(),
        });
        let longitudes = terrain.longitudes().values();
        let planar = terrain
            .latitudes()
            .values()
            .iter()
            .flat_map(|&lat| longitudes.iter().map(move |&lon| projector.forward(lat, lon)))
            .collect();

        let los = LosSystem::new(refraction, sampling);
        let fingerprint = fingerprint(&terrain, &radar, &sampling, &refraction);

        info!(
            radar = %radar.name,
            rows = terrain.rows(),
            cols = terrain.cols(),
            ground_m = radar.ground_elevation,
            radar_alt_m = radar.altitude(),
            "Coverage context ready"
        );

        Ok(Self { terrain, projector, planar, radar, los, fingerprint })
    }

    /// Validates the whole scenario, flight levels included.
    pub fn from_scenario(terrain: ElevationGrid, scenario: &ScenarioConfig) -> Result<Self> {
        scenario.validate()?;
        Self::new(terrain, &scenario.radar, scenario.sampling, scenario.refraction)
    }

    pub fn terrain(&self) -> &ElevationGrid {
        &self.terrain
    }

    pub fn radar(&self) -> &RadarStation {
        &self.radar
    }

    pub fn projector(&self) -> &LocalProjector {
        &self.projector
    }

    pub fn los(&self) -> &LosSystem {
        &self.los
    }

    /// Hash of every input that changes a mask, flight level excluded.
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    pub fn cell_offset(&self, row: usize, col: usize) -> LocalXY {
        self.planar[row * self.terrain.cols() + col]
    }

    /// The radar's own cell is visible at every flight level, wherever the
    /// radar sits inside it.
    pub fn trace_cell(&self, row: usize, col: usize, flight_alt: f64) -> RayTrace {
        if (row, col) == self.radar.grid_index {
            return RayTrace { visible: true, samples: 0, obstruction: None };
        }
        self.los.trace(
            &self.terrain,
            &self.projector,
            self.radar.altitude(),
            self.cell_offset(row, col),
            flight_alt,
        )
    }

    /// Visibility of every grid cell at one flight altitude. Rows are spread
    /// over the current rayon pool; each row owns its slice of the output
    /// and its own ray buffers.
    pub fn compute_mask(&self, flight_alt: f64) -> VisibilityMask {
        let rows = self.terrain.rows();
        let cols = self.terrain.cols();
        let radar_alt = self.radar.altitude();
        let mut data = vec![false; rows * cols];

        data.par_chunks_mut(cols)
            .enumerate()
            .for_each_init(RayScratch::default, |scratch, (row, out)| {
                let offsets = &self.planar[row * cols..(row + 1) * cols];
                for (cell, &target) in out.iter_mut().zip(offsets) {
                    *cell = self.los.is_visible(
                        &self.terrain,
                        &self.projector,
                        radar_alt,
                        target,
                        flight_alt,
                        scratch,
                    );
                }
            });

        let (radar_row, radar_col) = self.radar.grid_index;
        data[radar_row * cols + radar_col] = true;

        VisibilityMask { rows, cols, data }
    }

    fn layer(&self, flight_level_m: f64, mask: Arc<VisibilityMask>) -> CoverageLayer {
        CoverageLayer {
            flight_level_m,
            mask,
            radar: self.radar.clone(),
            bounds: self.terrain.bounds(),
        }
    }

    fn timed_mask(&self, flight_alt: f64) -> (VisibilityMask, u64) {
        let start = Instant::now();
        let mask = self.compute_mask(flight_alt);
        let elapsed_ms = start.elapsed().as_millis() as u64;
        info!(
            flight_level_m = flight_alt,
            visible = mask.visible_count(),
            cells = mask.as_slice().len(),
            elapsed_ms,
            "Completed flight level"
        );
        (mask, elapsed_ms)
    }

    /// One layer per flight level, in the order given.
    pub fn sweep(&self, flight_levels: &[f64]) -> Result<Vec<CoverageLayer>> {
        self.sweep_with_progress(flight_levels, &SweepProgress::new())
    }

    pub fn sweep_with_progress(
        &self,
        flight_levels: &[f64],
        progress: &SweepProgress,
    ) -> Result<Vec<CoverageLayer>> {
        validate_flight_levels(flight_levels)?;

        let mut layers = Vec::with_capacity(flight_levels.len());
        for (completed, &alt) in flight_levels.iter().enumerate() {
            if progress.is_cancelled() {
                info!(completed, "Sweep cancelled");
                return Err(CoverageError::Cancelled { completed });
            }
            let (mask, _) = self.timed_mask(alt);
            layers.push(self.layer(alt, Arc::new(mask)));
            progress.completed.fetch_add(1, Ordering::Relaxed);
        }
        Ok(layers)
    }

    /// Run [`sweep`](Self::sweep) on a dedicated pool of `threads` workers.
    pub fn sweep_with_threads(&self, flight_levels: &[f64], threads: usize) -> Result<Vec<CoverageLayer>> {
        let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()?;
        pool.install(|| self.sweep(flight_levels))
    }

    /// Like [`sweep`](Self::sweep), reusing masks already in `cache`.
    pub fn sweep_cached(
        &self,
        flight_levels: &[f64],
        cache: &CoverageCache,
        metrics: &mut CoverageMetrics,
    ) -> Result<Vec<CoverageLayer>> {
        validate_flight_levels(flight_levels)?;

        let mut layers = Vec::with_capacity(flight_levels.len());
        for &alt in flight_levels {
            let key = CoverageKey::new(self.fingerprint, alt);
            let mask = match cache.get(&key) {
                Some(mask) => {
                    debug!(flight_level_m = alt, "Mask cache hit");
                    metrics.cache_hits += 1;
                    mask
                }
                None => {
                    let (mask, elapsed_ms) = self.timed_mask(alt);
                    let mask = Arc::new(mask);
                    cache.insert(key, mask.clone());
                    metrics.layers_computed += 1;
                    metrics.last_compute_time_ms = elapsed_ms;
                    mask
                }
            };
            layers.push(self.layer(alt, mask));
        }
        Ok(layers)
    }
}

fn fingerprint(
    terrain: &ElevationGrid,
    radar: &RadarStation,
    sampling: &SamplingParams,
    refraction: &RefractionParams,
) -> u64 {
    let mut hasher = DefaultHasher::new();
    for axis in [terrain.latitudes(), terrain.longitudes()] {
        axis.len().hash(&mut hasher);
        axis.min().to_bits().hash(&mut hasher);
        axis.step().to_bits().hash(&mut hasher);
    }
    for h in terrain.data() {
        h.to_bits().hash(&mut hasher);
    }
    radar.hash_into(&mut hasher);
    sampling.samples_per_km.to_bits().hash(&mut hasher);
    sampling.min_samples.hash(&mut hasher);
    sampling.max_samples.hash(&mut hasher);
    refraction.k_factor.to_bits().hash(&mut hasher);
    hasher.finish()
}
