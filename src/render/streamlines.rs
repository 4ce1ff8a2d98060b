//! Streamline tracing through an interpolated wind field.
//!
//! Seeds are taken from a coarse occupancy lattice over the field. Each line
//! is integrated forward and backward along the normalised flow direction
//! (midpoint rule) and stops when it leaves the defined part of the field,
//! stalls, or runs into a lattice cell already claimed by another line.

use crate::interpolation::Surface;

#[derive(Debug, Clone, Copy)]
pub struct StreamlineOptions {
    /// Occupancy cells per axis; higher values give more, shorter lines.
    pub density: usize,
    /// Integration step as a fraction of one occupancy cell.
    pub step_fraction: f64,
    pub max_steps: usize,
    /// Lines with fewer points are discarded.
    pub min_points: usize,
}

impl Default for StreamlineOptions {
    fn default() -> Self {
        Self {
            density: 30,
            step_fraction: 0.25,
            max_steps: 400,
            min_points: 4,
        }
    }
}

/// A traced line in `(lon, lat)` with the flow speed at every point.
#[derive(Debug, Clone, PartialEq)]
pub struct Streamline {
    pub points: Vec<(f64, f64)>,
    pub speeds: Vec<f64>,
}

struct Occupancy {
    n: usize,
    lon0: f64,
    lat0: f64,
    cell_lon: f64,
    cell_lat: f64,
    owner: Vec<Option<usize>>,
}

impl Occupancy {
    fn cell(&self, lon: f64, lat: f64) -> Option<usize> {
        let ix = ((lon - self.lon0) / self.cell_lon).floor();
        let iy = ((lat - self.lat0) / self.cell_lat).floor();
        let n = self.n as f64;
        if ix < 0.0 || iy < 0.0 || ix > n || iy > n {
            return None;
        }
        // Points on the far edge belong to the last cell
        let ix = (ix as usize).min(self.n - 1);
        let iy = (iy as usize).min(self.n - 1);
        Some(iy * self.n + ix)
    }
}

/// Traces streamlines of the `(u, v)` field. Both surfaces must share a grid.
pub fn trace_streamlines(u: &Surface, v: &Surface, options: StreamlineOptions) -> Vec<Streamline> {
    let (Some(&lon0), Some(&lon1), Some(&lat0), Some(&lat1)) =
        (u.lons.first(), u.lons.last(), u.lats.first(), u.lats.last())
    else {
        return Vec::new();
    };
    if options.density == 0 || lon1 <= lon0 || lat1 <= lat0 {
        return Vec::new();
    }

    let n = options.density;
    let mut grid = Occupancy {
        n,
        lon0,
        lat0,
        cell_lon: (lon1 - lon0) / n as f64,
        cell_lat: (lat1 - lat0) / n as f64,
        owner: vec![None; n * n],
    };

    let mut lines = Vec::new();
    for iy in 0..n {
        for ix in 0..n {
            if grid.owner[iy * n + ix].is_some() {
                continue;
            }
            let seed = (
                lon0 + (ix as f64 + 0.5) * grid.cell_lon,
                lat0 + (iy as f64 + 0.5) * grid.cell_lat,
            );
            let id = lines.len();
            let backward = integrate(u, v, seed, -1.0, id, &mut grid, options);
            let forward = integrate(u, v, seed, 1.0, id, &mut grid, options);

            let mut points: Vec<(f64, f64)> = backward.iter().rev().map(|(p, _)| *p).collect();
            let mut speeds: Vec<f64> = backward.iter().rev().map(|(_, s)| *s).collect();
            // Both halves start at the seed
            let skip = usize::from(!points.is_empty());
            points.extend(forward.iter().skip(skip).map(|(p, _)| *p));
            speeds.extend(forward.iter().skip(skip).map(|(_, s)| *s));

            if points.len() >= options.min_points {
                lines.push(Streamline { points, speeds });
            } else {
                // Release the cells so another seed can use them
                for owner in grid.owner.iter_mut() {
                    if *owner == Some(id) {
                        *owner = None;
                    }
                }
                // Keep the seed cell claimed so it is not retried
                if let Some(cell) = grid.cell(seed.0, seed.1) {
                    grid.owner[cell] = Some(usize::MAX);
                }
            }
        }
    }
    lines
}

fn direction(u: &Surface, v: &Surface, lon: f64, lat: f64) -> Option<(f64, f64, f64)> {
    let du = u.sample(lon, lat)?;
    let dv = v.sample(lon, lat)?;
    let speed = du.hypot(dv);
    if speed < 1e-9 {
        return None;
    }
    Some((du / speed, dv / speed, speed))
}

fn integrate(
    u: &Surface,
    v: &Surface,
    seed: (f64, f64),
    sign: f64,
    id: usize,
    grid: &mut Occupancy,
    options: StreamlineOptions,
) -> Vec<((f64, f64), f64)> {
    let step_lon = grid.cell_lon * options.step_fraction * sign;
    let step_lat = grid.cell_lat * options.step_fraction * sign;
    let mut out = Vec::new();
    let (mut lon, mut lat) = seed;

    for _ in 0..options.max_steps {
        let Some((dx, dy, speed)) = direction(u, v, lon, lat) else {
            break;
        };
        let Some(cell) = grid.cell(lon, lat) else {
            break;
        };
        match grid.owner[cell] {
            Some(owner) if owner != id => break,
            _ => grid.owner[cell] = Some(id),
        }
        out.push(((lon, lat), speed));

        let mid_lon = lon + 0.5 * dx * step_lon;
        let mid_lat = lat + 0.5 * dy * step_lat;
        let Some((mx, my, _)) = direction(u, v, mid_lon, mid_lat) else {
            break;
        };
        lon += mx * step_lon;
        lat += my * step_lat;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpolation::GridSpec;

    fn constant(value: f64) -> Surface {
        let spec = GridSpec {
            lon_min: 0.0,
            lon_max: 1.0,
            lat_min: 0.0,
            lat_max: 1.0,
            nx: 11,
            ny: 11,
        };
        let mut surface = Surface::undefined(&spec);
        surface.values.iter_mut().for_each(|v| *v = value);
        surface
    }

    #[test]
    fn eastward_flow_gives_horizontal_lines() {
        let lines = trace_streamlines(&constant(5.0), &constant(0.0), StreamlineOptions {
            density: 5,
            ..Default::default()
        });
        assert!(!lines.is_empty());
        for line in &lines {
            let lat = line.points[0].1;
            assert!(line.points.iter().all(|p| (p.1 - lat).abs() < 1e-9));
            assert!(line.points.windows(2).all(|w| w[1].0 > w[0].0));
            assert!(line.speeds.iter().all(|s| (s - 5.0).abs() < 1e-9));
        }
        // One line per occupancy row
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn undefined_field_has_no_streamlines() {
        let spec = GridSpec {
            lon_min: 0.0,
            lon_max: 1.0,
            lat_min: 0.0,
            lat_max: 1.0,
            nx: 11,
            ny: 11,
        };
        let undefined = Surface::undefined(&spec);
        assert!(trace_streamlines(&undefined, &undefined, StreamlineOptions::default()).is_empty());
    }

    #[test]
    fn calm_field_has_no_streamlines() {
        let lines = trace_streamlines(&constant(0.0), &constant(0.0), StreamlineOptions::default());
        assert!(lines.is_empty());
    }
}
