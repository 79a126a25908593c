use criterion::{criterion_group, criterion_main, Criterion};
use radar_visibility::coverage::CoverageContext;
use radar_visibility::io::RadarSite;
use radar_visibility::physics::los::SamplingParams;
use radar_visibility::physics::refraction::RefractionParams;
use radar_visibility::terrain::ElevationGrid;
use std::hint::black_box;

// ~90 m spacing, 121x121 nodes, ~11 km across
const SIZE: usize = 121;
const STEP: f64 = 1.0 / 1200.0;

fn ridge_terrain() -> ElevationGrid {
    let lat: Vec<f64> = (0..SIZE).map(|i| 43.6 + i as f64 * STEP).collect();
    let lon: Vec<f64> = (0..SIZE).map(|j| 7.05 + j as f64 * STEP).collect();
    let data = (0..SIZE * SIZE)
        .map(|k| {
            let (i, j) = ((k / SIZE) as f64, (k % SIZE) as f64);
            200.0 + 150.0 * (i / 9.0).sin() * (j / 13.0).cos() + 2.0 * i
        })
        .collect();
    ElevationGrid::new(lat, lon, data).unwrap()
}

fn coverage_benchmark(c: &mut Criterion) {
    let radar = RadarSite {
        name: "Bench Radar".to_string(),
        latitude: 43.65,
        longitude: 7.10,
        height_above_terrain: 30.0,
    };
    let context = CoverageContext::new(
        ridge_terrain(),
        &radar,
        SamplingParams::default(),
        RefractionParams::default(),
    )
    .unwrap();

    c.bench_function("compute_mask", |b| {
        b.iter(|| context.compute_mask(black_box(610.0)))
    });

    c.bench_function("sweep_three_levels", |b| {
        b.iter(|| context.sweep(black_box(&[152.0, 1524.0, 9144.0])).unwrap())
    });
}

criterion_group!(benches, coverage_benchmark);
criterion_main!(benches);
