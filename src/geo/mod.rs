use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the local projection, in meters.
pub const EARTH_RADIUS: f64 = 6_371_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatLon {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64, // AMSL
}

/// Planar offset from the projection origin, meters east / north.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LocalXY {
    pub x: f64,
    pub y: f64,
}

impl LocalXY {
    pub fn distance(&self) -> f64 {
        self.x.hypot(self.y)
    }
}

/// Equirectangular projection centred on the radar.
///
/// `x = R·cos(lat0)·Δlon`, `y = R·Δlat`. The scale error grows with the
/// square of the distance from the origin, so it is only meant for regional
/// extents (tens to a few hundred km). It is not a geodesic projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalProjector {
    origin: LatLon,
    cos_lat0: f64,
}

impl LocalProjector {
    pub fn new(origin: LatLon) -> Self {
        Self {
            origin,
            cos_lat0: origin.latitude.to_radians().cos(),
        }
    }

    pub fn origin(&self) -> LatLon {
        self.origin
    }

    #[inline(always)]
    pub fn forward(&self, latitude: f64, longitude: f64) -> LocalXY {
        LocalXY {
            x: (longitude - self.origin.longitude).to_radians() * EARTH_RADIUS * self.cos_lat0,
            y: (latitude - self.origin.latitude).to_radians() * EARTH_RADIUS,
        }
    }

    /// Inverse of [`forward`](Self::forward), returns `(latitude, longitude)`.
    #[inline(always)]
    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let latitude = self.origin.latitude + (y / EARTH_RADIUS).to_degrees();
        let longitude = self.origin.longitude + (x / (EARTH_RADIUS * self.cos_lat0)).to_degrees();
        (latitude, longitude)
    }
}

/// Lat/lon bounding box, as handed to overlay renderers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub south: f64,
    pub north: f64,
    pub west: f64,
    pub east: f64,
}

impl GeoBounds {
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        // NaN fails every comparison and lands outside
        latitude >= self.south
            && latitude <= self.north
            && longitude >= self.west
            && longitude <= self.east
    }
}
