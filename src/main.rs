//! Radar line-of-sight coverage over a terrain grid.
//!
//! Loads a scenario and a terrain grid, sweeps every flight level and writes
//! one PNG overlay per level plus a manifest for map viewers.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use radar_visibility::coverage::CoverageContext;
use radar_visibility::io::load_scenario_from_json;
use radar_visibility::render::{publish, OverlayBundleWriter};
use radar_visibility::terrain::{ElevationGrid, TerrainLoader};

#[derive(Parser, Debug)]
#[command(name = "radar-visibility")]
#[command(about = "Radar line-of-sight coverage masks over terrain")]
struct Args {
    /// Scenario JSON (radar, flight levels, sampling, refraction)
    #[arg(short, long)]
    scenario: PathBuf,

    /// Elevation grid CSV, one row per latitude (ascending)
    #[arg(long, conflicts_with = "hgt_dir")]
    terrain_csv: Option<PathBuf>,

    /// Latitude axis CSV
    #[arg(long)]
    lat_csv: Option<PathBuf>,

    /// Longitude axis CSV
    #[arg(long)]
    lon_csv: Option<PathBuf>,

    /// Directory holding SRTM .hgt tiles
    #[arg(long, requires = "tile")]
    hgt_dir: Option<PathBuf>,

    /// South-west corner of the tile to load, "LAT,LON"
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
    tile: Option<Vec<i32>>,

    /// Override the scenario's flight levels (meters, comma separated)
    #[arg(long, value_delimiter = ',')]
    flight_levels: Option<Vec<f64>>,

    /// Output directory for overlays and manifest
    #[arg(short, long, default_value = "coverage")]
    out: PathBuf,

    /// Worker threads (default: one per core)
    #[arg(long)]
    threads: Option<usize>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,
}

fn init_tracing(args: &Args) -> Result<()> {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    if args.json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

fn load_terrain(args: &Args) -> Result<ElevationGrid> {
    let loader = TerrainLoader::new(PathBuf::new());
    match (&args.terrain_csv, &args.hgt_dir) {
        (Some(grid), None) => {
            let (Some(lat), Some(lon)) = (&args.lat_csv, &args.lon_csv) else {
                bail!("--terrain-csv needs --lat-csv and --lon-csv");
            };
            loader.load_csv(grid, lat, lon)
        }
        (None, Some(dir)) => {
            let Some([lat, lon]) = args.tile.as_deref().and_then(|t| <[i32; 2]>::try_from(t).ok()) else {
                bail!("--hgt-dir needs --tile LAT,LON");
            };
            TerrainLoader::new(dir.clone()).load_tile(lat, lon)
        }
        _ => bail!("Pass either --terrain-csv or --hgt-dir"),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args)?;

    let mut scenario = load_scenario_from_json(&args.scenario)?;
    if let Some(levels) = &args.flight_levels {
        scenario.flight_levels = levels.clone();
    }
    info!(radar = %scenario.radar.name, levels = ?scenario.flight_levels, "Loaded scenario");

    let terrain = load_terrain(&args)?;
    let context = CoverageContext::from_scenario(terrain, &scenario)
        .context("Invalid coverage configuration")?;

    let start = Instant::now();
    let layers = match args.threads {
        Some(threads) => context.sweep_with_threads(&scenario.flight_levels, threads)?,
        None => context.sweep(&scenario.flight_levels)?,
    };
    info!(elapsed_ms = start.elapsed().as_millis() as u64, "Sweep finished");

    let mut writer = OverlayBundleWriter::new(&args.out)?;
    publish(&layers, &mut writer)?;

    Ok(())
}
