use crate::config::GridSettings;
use crate::types::location::LatLon;

/// `n` evenly spaced values from `start` to `end`, both ends included.
///
/// # Examples
///
/// ```
/// use climazin::linspace;
///
/// assert_eq!(linspace(0.0, 1.0, 5), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
/// assert_eq!(linspace(3.0, 9.0, 1), vec![3.0]);
/// assert!(linspace(0.0, 1.0, 0).is_empty());
/// ```
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| {
                    // Pin the last value to avoid accumulated rounding
                    if i == n - 1 {
                        end
                    } else {
                        start + step * i as f64
                    }
                })
                .collect()
        }
    }
}

/// Square lattice of `points_per_side²` points centred on `center`, spanning
/// `±half_span_deg` in both latitude and longitude. Latitude-major order.
pub fn square_grid(center: LatLon, settings: GridSettings) -> Vec<LatLon> {
    let n = settings.points_per_side;
    let span = settings.half_span_deg;
    let lats = linspace(center.lat() - span, center.lat() + span, n);
    let lons = linspace(center.lon() - span, center.lon() + span, n);

    lats.iter()
        .flat_map(|&lat| lons.iter().map(move |&lon| LatLon(lat, lon)))
        .collect()
}
