use serde::{Deserialize, Serialize};

use crate::error::{CoverageError, Result};
use crate::geo::{LocalProjector, LocalXY};
use crate::physics::refraction::{curvature_drop, effective_earth_radius, RefractionParams};

/// Terrain height lookup in meters AMSL. Anything the provider does not
/// cover must come back as `f64::INFINITY`.
pub trait TerrainProvider {
    fn elevation_at(&self, latitude: f64, longitude: f64) -> f64;

    /// Fill `out[k]` with the elevation at `(latitudes[k], longitudes[k])`.
    fn sample_batch(&self, latitudes: &[f64], longitudes: &[f64], out: &mut [f64]) {
        for ((h, &lat), &lon) in out.iter_mut().zip(latitudes).zip(longitudes) {
            *h = self.elevation_at(lat, lon);
        }
    }
}

fn default_samples_per_km() -> f64 {
    50.0
}

fn default_min_samples() -> usize {
    20
}

fn default_max_samples() -> usize {
    1_000_000
}

/// How densely a ray is probed: `samples_per_km` along its length, bounded
/// by `[min_samples, max_samples]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    #[serde(default = "default_samples_per_km")]
    pub samples_per_km: f64,
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
    #[serde(default = "default_max_samples")]
    pub max_samples: usize,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            samples_per_km: default_samples_per_km(),
            min_samples: default_min_samples(),
            max_samples: default_max_samples(),
        }
    }
}

impl SamplingParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.samples_per_km.is_finite() && self.samples_per_km > 0.0) {
            return Err(CoverageError::InvalidSampling(format!(
                "samples_per_km must be finite and positive, got {}",
                self.samples_per_km
            )));
        }
        if self.min_samples == 0 {
            return Err(CoverageError::InvalidSampling("min_samples must be at least 1".into()));
        }
        if self.max_samples < self.min_samples {
            return Err(CoverageError::InvalidSampling(format!(
                "max_samples ({}) is below min_samples ({})",
                self.max_samples, self.min_samples
            )));
        }
        Ok(())
    }

    /// `clamp(floor(dist_km · samples_per_km), min_samples, max_samples)`
    #[inline]
    pub fn sample_count(&self, dist_m: f64) -> usize {
        // float -> usize casts truncate toward zero and saturate
        let n = ((dist_m / 1000.0) * self.samples_per_km) as usize;
        n.min(self.max_samples).max(self.min_samples)
    }
}

/// Per-worker buffers reused from one ray to the next.
#[derive(Debug, Default, Clone)]
pub struct RayScratch {
    latitudes: Vec<f64>,
    longitudes: Vec<f64>,
    terrain: Vec<f64>,
}

impl RayScratch {
    fn resize(&mut self, n: usize) {
        self.latitudes.resize(n, 0.0);
        self.longitudes.resize(n, 0.0);
        self.terrain.resize(n, 0.0);
    }
}

/// First sample along a ray where terrain reaches the line of sight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstruction {
    pub distance_m: f64,
    pub terrain_m: f64,
    pub los_altitude_m: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayTrace {
    pub visible: bool,
    pub samples: usize,
    pub obstruction: Option<Obstruction>,
}

/// Geometry of one ray: radar at the origin, target at `target` and
/// `target_alt` after the curvature correction.
#[derive(Debug, Clone, Copy)]
struct Ray {
    target: LocalXY,
    radar_alt: f64,
    target_alt: f64,
    samples: usize,
}

impl Ray {
    #[inline(always)]
    fn t(&self, k: usize) -> f64 {
        (k + 1) as f64 / (self.samples + 1) as f64
    }

    #[inline(always)]
    fn altitude(&self, t: f64) -> f64 {
        self.radar_alt + t * (self.target_alt - self.radar_alt)
    }
}

/// Binary line-of-sight test between the radar and one target point.
#[derive(Clone, Copy, Debug)]
pub struct LosSystem {
    pub refraction: RefractionParams,
    pub sampling: SamplingParams,
    r_eff: f64,
}

impl LosSystem {
    pub fn new(refraction: RefractionParams, sampling: SamplingParams) -> Self {
        Self {
            refraction,
            sampling,
            r_eff: effective_earth_radius(refraction),
        }
    }

    pub fn effective_radius(&self) -> f64 {
        self.r_eff
    }

    /// `None` for a zero-length ray, which is always visible.
    fn build_ray(&self, target: LocalXY, flight_alt: f64, radar_alt: f64) -> Option<Ray> {
        let dist = target.distance();
        if dist == 0.0 {
            return None;
        }
        Some(Ray {
            target,
            radar_alt,
            target_alt: flight_alt - curvature_drop(target.x, target.y, self.r_eff),
            samples: self.sampling.sample_count(dist),
        })
    }

    /// Sample terrain under every interior point of the ray into
    /// `scratch.terrain`.
    fn sample_terrain<T: TerrainProvider + ?Sized>(
        &self,
        ray: &Ray,
        terrain: &T,
        projector: &LocalProjector,
        scratch: &mut RayScratch,
    ) {
        scratch.resize(ray.samples);
        for k in 0..ray.samples {
            let t = ray.t(k);
            let (lat, lon) = projector.inverse(t * ray.target.x, t * ray.target.y);
            scratch.latitudes[k] = lat;
            scratch.longitudes[k] = lon;
        }
        terrain.sample_batch(&scratch.latitudes, &scratch.longitudes, &mut scratch.terrain);
    }

    /// True when no interior sample of the ray has terrain at or above the
    /// line of sight. Radar and target points themselves are not tested.
    pub fn is_visible<T: TerrainProvider + ?Sized>(
        &self,
        terrain: &T,
        projector: &LocalProjector,
        radar_alt: f64,
        target: LocalXY,
        flight_alt: f64,
        scratch: &mut RayScratch,
    ) -> bool {
        let Some(ray) = self.build_ray(target, flight_alt, radar_alt) else {
            return true;
        };
        self.sample_terrain(&ray, terrain, projector, scratch);

        !scratch
            .terrain
            .iter()
            .enumerate()
            .any(|(k, &h)| h >= ray.altitude(ray.t(k)))
    }

    /// Same test as [`is_visible`](Self::is_visible), reporting where the
    /// ray was first blocked.
    pub fn trace<T: TerrainProvider + ?Sized>(
        &self,
        terrain: &T,
        projector: &LocalProjector,
        radar_alt: f64,
        target: LocalXY,
        flight_alt: f64,
    ) -> RayTrace {
        let Some(ray) = self.build_ray(target, flight_alt, radar_alt) else {
            return RayTrace { visible: true, samples: 0, obstruction: None };
        };
        let mut scratch = RayScratch::default();
        self.sample_terrain(&ray, terrain, projector, &mut scratch);

        let dist = target.distance();
        let obstruction = scratch.terrain.iter().enumerate().find_map(|(k, &h)| {
            let t = ray.t(k);
            let los = ray.altitude(t);
            (h >= los).then_some(Obstruction {
                distance_m: t * dist,
                terrain_m: h,
                los_altitude_m: los,
            })
        });

        RayTrace {
            visible: obstruction.is_none(),
            samples: ray.samples,
            obstruction,
        }
    }
}
