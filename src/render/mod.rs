use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use image::RgbaImage;
use serde::Serialize;
use tracing::info;

use crate::coverage::{CoverageLayer, VisibilityMask};
use crate::geo::GeoBounds;

/// Overlay colours, cycled per flight level. Red then orange at 70 % alpha.
pub const LAYER_PALETTE: [[u8; 4]; 2] = [[255, 0, 0, 179], [255, 166, 0, 179]];

pub fn layer_color(index: usize) -> [u8; 4] {
    LAYER_PALETTE[index % LAYER_PALETTE.len()]
}

/// Receives finished layers one at a time, in flight-level order.
pub trait LayerSink {
    fn accept(&mut self, index: usize, layer: &CoverageLayer) -> Result<()>;

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

pub fn publish<S: LayerSink + ?Sized>(layers: &[CoverageLayer], sink: &mut S) -> Result<()> {
    for (index, layer) in layers.iter().enumerate() {
        sink.accept(index, layer)?;
    }
    sink.finish()
}

/// RGBA8 pixels for a mask, north-up (first pixel row is the northernmost
/// grid row). Visible cells get `color`, the rest stay transparent.
pub fn overlay_rgba(mask: &VisibilityMask, color: [u8; 4]) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(mask.rows() * mask.cols() * 4);

    for row in (0..mask.rows()).rev() {
        for col in 0..mask.cols() {
            if mask.get(row, col) {
                pixels.extend_from_slice(&color);
            } else {
                pixels.extend_from_slice(&[0, 0, 0, 0]);
            }
        }
    }
    pixels
}

#[derive(Debug, Clone, Serialize)]
pub struct RadarMarker {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ManifestLayer {
    pub name: String,
    pub flight_level_m: f64,
    pub image: String,
    pub bounds: GeoBounds,
    pub color: [u8; 4],
    pub visible_fraction: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BundleManifest {
    pub radar: Option<RadarMarker>,
    pub layers: Vec<ManifestLayer>,
}

/// Writes one PNG ground overlay per layer plus a `manifest.json` that
/// places each image on the map and marks the radar.
pub struct OverlayBundleWriter {
    dir: PathBuf,
    manifest: BundleManifest,
}

impl OverlayBundleWriter {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).with_context(|| format!("Failed to create {:?}", dir))?;
        Ok(Self { dir, manifest: BundleManifest::default() })
    }

    pub fn manifest(&self) -> &BundleManifest {
        &self.manifest
    }
}

impl LayerSink for OverlayBundleWriter {
    fn accept(&mut self, index: usize, layer: &CoverageLayer) -> Result<()> {
        let mask = &layer.mask;
        let color = layer_color(index);
        let image_name = format!("vis_overlay_{:02}_FL{}.png", index, layer.flight_level_m);
        let path = self.dir.join(&image_name);

        let image = RgbaImage::from_raw(mask.cols() as u32, mask.rows() as u32, overlay_rgba(mask, color))
            .ok_or_else(|| anyhow!("Overlay buffer does not match {}x{}", mask.cols(), mask.rows()))?;
        image.save(&path).with_context(|| format!("Failed to write {:?}", path))?;

        if self.manifest.radar.is_none() {
            self.manifest.radar = Some(RadarMarker {
                name: layer.radar.name.clone(),
                latitude: layer.radar.location.latitude,
                longitude: layer.radar.location.longitude,
                altitude: layer.radar.location.altitude,
            });
        }
        self.manifest.layers.push(ManifestLayer {
            name: format!("Flight Level {}m", layer.flight_level_m),
            flight_level_m: layer.flight_level_m,
            image: image_name,
            bounds: layer.bounds,
            color,
            visible_fraction: mask.visible_fraction(),
        });
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let path = self.dir.join("manifest.json");
        let file = File::create(&path).with_context(|| format!("Failed to create {:?}", path))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &self.manifest)
            .with_context(|| format!("Failed to write {:?}", path))?;
        info!(layers = self.manifest.layers.len(), dir = ?self.dir, "Overlay bundle written");
        Ok(())
    }
}
