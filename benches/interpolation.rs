use climazin::{
    interpolate_linear, interpolate_wind, square_grid, GridSettings, GridSpec, LatLon, WindVector,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_interpolation(c: &mut Criterion) {
    let center = LatLon(-15.79, -47.88);
    let points = square_grid(center, GridSettings::new(15, 5.0));
    let temperatures: Vec<(LatLon, f64)> = points
        .iter()
        .map(|p| (*p, 22.0 + 0.3 * (p.lat() - center.lat()) - 0.1 * (p.lon() - center.lon())))
        .collect();
    let winds: Vec<(LatLon, WindVector)> = points
        .iter()
        .map(|p| {
            let u = 2.0 + 0.2 * (p.lat() - center.lat());
            (*p, WindVector { u, v: -1.0 })
        })
        .collect();
    let spec = GridSpec::around(center, 5.0, 100);

    c.bench_function("interpolate_linear_15x15_to_100x100", |b| {
        b.iter(|| interpolate_linear(black_box(&temperatures), black_box(&spec)))
    });
    c.bench_function("interpolate_wind_15x15_to_100x100", |b| {
        b.iter(|| interpolate_wind(black_box(&winds), black_box(&spec)))
    });
}

criterion_group!(benches, bench_interpolation);
criterion_main!(benches);
