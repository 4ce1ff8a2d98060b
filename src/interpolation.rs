//! Linear interpolation of scattered samples onto a regular grid.
//!
//! Samples are triangulated (Delaunay, Bowyer-Watson) and every grid node
//! inside a triangle gets the barycentric blend of its three corners. Nodes
//! outside the convex hull of the samples are `NaN`, and so is every node
//! when fewer than three non-collinear samples are available.

use crate::sampling::grid::linspace;
use crate::types::location::LatLon;
use crate::types::series::WindVector;
use log::{debug, warn};
use ordered_float::OrderedFloat;
use std::collections::HashMap;

/// Relative slack for "inside triangle" and "inside circumcircle" tests.
const EPSILON: f64 = 1e-9;

/// Regular lon/lat lattice the samples are interpolated onto.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    pub lon_min: f64,
    pub lon_max: f64,
    pub lat_min: f64,
    pub lat_max: f64,
    /// Nodes along the longitude axis.
    pub nx: usize,
    /// Nodes along the latitude axis.
    pub ny: usize,
}

impl GridSpec {
    /// A `resolution × resolution` grid spanning `±half_span_deg` around `center`.
    pub fn around(center: LatLon, half_span_deg: f64, resolution: usize) -> Self {
        Self {
            lon_min: center.lon() - half_span_deg,
            lon_max: center.lon() + half_span_deg,
            lat_min: center.lat() - half_span_deg,
            lat_max: center.lat() + half_span_deg,
            nx: resolution,
            ny: resolution,
        }
    }

    pub fn lons(&self) -> Vec<f64> {
        linspace(self.lon_min, self.lon_max, self.nx)
    }

    pub fn lats(&self) -> Vec<f64> {
        linspace(self.lat_min, self.lat_max, self.ny)
    }
}

/// Interpolated values on a [`GridSpec`], row-major with latitude rows.
///
/// Undefined nodes hold `NaN`.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    pub lons: Vec<f64>,
    pub lats: Vec<f64>,
    pub values: Vec<f64>,
}

impl Surface {
    /// A surface where every node is undefined.
    pub fn undefined(spec: &GridSpec) -> Self {
        Self {
            lons: spec.lons(),
            lats: spec.lats(),
            values: vec![f64::NAN; spec.nx * spec.ny],
        }
    }

    /// Value at longitude index `ix` and latitude index `iy`.
    pub fn get(&self, ix: usize, iy: usize) -> f64 {
        if ix >= self.lons.len() || iy >= self.lats.len() {
            return f64::NAN;
        }
        self.values[iy * self.lons.len() + ix]
    }

    pub fn defined_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_finite()).count()
    }

    pub fn is_undefined(&self) -> bool {
        self.defined_count() == 0
    }

    /// Smallest and largest defined value.
    pub fn min_max(&self) -> Option<(f64, f64)> {
        let defined = self
            .values
            .iter()
            .filter(|v| v.is_finite())
            .map(|v| OrderedFloat(*v));
        let min = defined.clone().min()?;
        let max = defined.max()?;
        Some((min.0, max.0))
    }

    /// Bilinear sample at an arbitrary position. `None` outside the grid or
    /// when one of the surrounding nodes is undefined.
    pub fn sample(&self, lon: f64, lat: f64) -> Option<f64> {
        let (ix, fx) = cell_of(&self.lons, lon)?;
        let (iy, fy) = cell_of(&self.lats, lat)?;
        let ix1 = (ix + 1).min(self.lons.len() - 1);
        let iy1 = (iy + 1).min(self.lats.len() - 1);

        let v00 = self.get(ix, iy);
        let v10 = self.get(ix1, iy);
        let v01 = self.get(ix, iy1);
        let v11 = self.get(ix1, iy1);
        if ![v00, v10, v01, v11].iter().all(|v| v.is_finite()) {
            return None;
        }
        let bottom = v00 * (1.0 - fx) + v10 * fx;
        let top = v01 * (1.0 - fx) + v11 * fx;
        Some(bottom * (1.0 - fy) + top * fy)
    }
}

/// Index of the axis cell containing `x` and the fractional offset inside it.
fn cell_of(axis: &[f64], x: f64) -> Option<(usize, f64)> {
    let first = *axis.first()?;
    let last = *axis.last()?;
    if !x.is_finite() || x < first.min(last) || x > first.max(last) {
        return None;
    }
    if axis.len() == 1 {
        return Some((0, 0.0));
    }
    let step = (last - first) / (axis.len() - 1) as f64;
    let pos = (x - first) / step;
    let ix = (pos.floor() as usize).min(axis.len() - 2);
    Some((ix, pos - ix as f64))
}

#[derive(Debug, Clone, Copy)]
struct Triangle {
    v: [usize; 3],
    cx: f64,
    cy: f64,
    r2: f64,
}

impl Triangle {
    fn new(points: &[(f64, f64)], v: [usize; 3]) -> Option<Self> {
        let (ax, ay) = points[v[0]];
        let (bx, by) = points[v[1]];
        let (cx, cy) = points[v[2]];
        let d = 2.0 * (ax * (by - cy) + bx * (cy - ay) + cx * (ay - by));
        if d.abs() < f64::EPSILON {
            return None;
        }
        let a2 = ax * ax + ay * ay;
        let b2 = bx * bx + by * by;
        let c2 = cx * cx + cy * cy;
        let ux = (a2 * (by - cy) + b2 * (cy - ay) + c2 * (ay - by)) / d;
        let uy = (a2 * (cx - bx) + b2 * (ax - cx) + c2 * (bx - ax)) / d;
        let r2 = (ax - ux).powi(2) + (ay - uy).powi(2);
        Some(Self {
            v,
            cx: ux,
            cy: uy,
            r2,
        })
    }

    fn in_circumcircle(&self, x: f64, y: f64) -> bool {
        let d2 = (x - self.cx).powi(2) + (y - self.cy).powi(2);
        d2 <= self.r2 * (1.0 + EPSILON)
    }
}

/// Delaunay triangulation of a set of sample positions.
#[derive(Debug, Clone)]
pub struct Triangulation {
    /// `(lon, lat)` of each kept vertex.
    points: Vec<(f64, f64)>,
    /// Index of each kept vertex in the caller's slice.
    source: Vec<usize>,
    triangles: Vec<[usize; 3]>,
}

impl Triangulation {
    /// Triangulates `positions`. Duplicates are merged (first one wins).
    /// Returns `None` for fewer than three distinct or only collinear positions.
    pub fn new(positions: &[LatLon]) -> Option<Self> {
        let mut points = Vec::with_capacity(positions.len());
        let mut source = Vec::with_capacity(positions.len());
        let mut seen = HashMap::new();
        for (i, p) in positions.iter().enumerate() {
            if !p.lat().is_finite() || !p.lon().is_finite() {
                continue;
            }
            let key = (OrderedFloat(p.lon()), OrderedFloat(p.lat()));
            if seen.insert(key, i).is_none() {
                points.push((p.lon(), p.lat()));
                source.push(i);
            }
        }

        if points.len() < 3 || all_collinear(&points) {
            debug!(
                "Cannot triangulate {} distinct positions (collinear or too few)",
                points.len()
            );
            return None;
        }

        let triangles = bowyer_watson(&points);
        if triangles.is_empty() {
            return None;
        }
        Some(Self {
            points,
            source,
            triangles,
        })
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Linear interpolation of `values` (indexed like the positions given to
    /// [`Triangulation::new`]) at every node of `spec`.
    pub fn interpolate(&self, values: &[f64], spec: &GridSpec) -> Surface {
        let mut surface = Surface::undefined(spec);
        let mut last_hit = 0;
        for (iy, &lat) in surface.lats.iter().enumerate() {
            for (ix, &lon) in surface.lons.iter().enumerate() {
                if let Some((t, weights)) = self.locate(lon, lat, last_hit) {
                    last_hit = t;
                    let tri = self.triangles[t];
                    let value: f64 = (0..3)
                        .map(|k| {
                            weights[k]
                                * values
                                    .get(self.source[tri[k]])
                                    .copied()
                                    .unwrap_or(f64::NAN)
                        })
                        .sum();
                    surface.values[iy * spec.nx + ix] = value;
                }
            }
        }
        surface
    }

    /// Triangle containing `(x, y)` and the barycentric weights of its corners.
    /// Tries `hint` first since neighbouring grid nodes usually share a triangle.
    fn locate(&self, x: f64, y: f64, hint: usize) -> Option<(usize, [f64; 3])> {
        if let Some(w) = self.triangles.get(hint).and_then(|t| self.weights(t, x, y)) {
            return Some((hint, w));
        }
        self.triangles
            .iter()
            .enumerate()
            .find_map(|(i, t)| self.weights(t, x, y).map(|w| (i, w)))
    }

    fn weights(&self, tri: &[usize; 3], x: f64, y: f64) -> Option<[f64; 3]> {
        let (ax, ay) = self.points[tri[0]];
        let (bx, by) = self.points[tri[1]];
        let (cx, cy) = self.points[tri[2]];
        let det = (by - cy) * (ax - cx) + (cx - bx) * (ay - cy);
        if det.abs() < f64::EPSILON {
            return None;
        }
        let l1 = ((by - cy) * (x - cx) + (cx - bx) * (y - cy)) / det;
        let l2 = ((cy - ay) * (x - cx) + (ax - cx) * (y - cy)) / det;
        let l3 = 1.0 - l1 - l2;
        if l1 < -EPSILON || l2 < -EPSILON || l3 < -EPSILON {
            return None;
        }
        Some([l1, l2, l3])
    }
}

fn all_collinear(points: &[(f64, f64)]) -> bool {
    let (x0, y0) = points[0];
    let Some(&(x1, y1)) = points.iter().skip(1).find(|p| **p != (x0, y0)) else {
        return true;
    };
    let scale = points
        .iter()
        .map(|(x, y)| (x - x0).abs().max((y - y0).abs()))
        .fold(0.0, f64::max);
    points.iter().all(|&(x, y)| {
        let cross = (x1 - x0) * (y - y0) - (y1 - y0) * (x - x0);
        cross.abs() <= EPSILON * scale * scale
    })
}

fn bowyer_watson(points: &[(f64, f64)]) -> Vec<[usize; 3]> {
    let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
    let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for &(x, y) in points {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }
    let span = (max_x - min_x).max(max_y - min_y).max(f64::EPSILON);
    let (mid_x, mid_y) = ((min_x + max_x) / 2.0, (min_y + max_y) / 2.0);

    // Super triangle vertices live after the real points
    let n = points.len();
    let mut all = points.to_vec();
    all.push((mid_x - 20.0 * span, mid_y - span));
    all.push((mid_x, mid_y + 20.0 * span));
    all.push((mid_x + 20.0 * span, mid_y - span));

    let mut triangles: Vec<Triangle> = Triangle::new(&all, [n, n + 1, n + 2])
        .into_iter()
        .collect();

    for i in 0..n {
        let (x, y) = all[i];
        let (bad, good): (Vec<Triangle>, Vec<Triangle>) =
            triangles.into_iter().partition(|t| t.in_circumcircle(x, y));
        triangles = good;

        // Boundary of the cavity: edges used by exactly one bad triangle
        let mut edges: HashMap<(usize, usize), u32> = HashMap::new();
        for t in &bad {
            for (a, b) in [(t.v[0], t.v[1]), (t.v[1], t.v[2]), (t.v[2], t.v[0])] {
                *edges.entry((a.min(b), a.max(b))).or_insert(0) += 1;
            }
        }
        for ((a, b), count) in edges {
            if count == 1 {
                if let Some(t) = Triangle::new(&all, [a, b, i]) {
                    triangles.push(t);
                }
            }
        }
    }

    triangles
        .into_iter()
        .filter(|t| t.v.iter().all(|&v| v < n))
        .map(|t| t.v)
        .collect()
}

/// Interpolates `samples` linearly onto `spec`.
///
/// Non-finite sample values are ignored. When the remaining samples cannot
/// be triangulated the returned surface is entirely undefined.
///
/// # Examples
///
/// ```
/// use climazin::{interpolate_linear, GridSpec, LatLon};
///
/// let samples = vec![
///     (LatLon(0.0, 0.0), 0.0),
///     (LatLon(0.0, 2.0), 2.0),
///     (LatLon(2.0, 0.0), 0.0),
///     (LatLon(2.0, 2.0), 2.0),
/// ];
/// let spec = GridSpec::around(LatLon(1.0, 1.0), 1.0, 3);
/// let surface = interpolate_linear(&samples, &spec);
/// assert!((surface.get(1, 1) - 1.0).abs() < 1e-9);
/// ```
pub fn interpolate_linear(samples: &[(LatLon, f64)], spec: &GridSpec) -> Surface {
    let usable: Vec<&(LatLon, f64)> = samples.iter().filter(|(_, v)| v.is_finite()).collect();
    let positions: Vec<LatLon> = usable.iter().map(|(p, _)| *p).collect();
    let values: Vec<f64> = usable.iter().map(|(_, v)| *v).collect();

    match Triangulation::new(&positions) {
        Some(triangulation) => triangulation.interpolate(&values, spec),
        None => {
            warn!(
                "Only {} usable samples, surface left undefined",
                positions.len()
            );
            Surface::undefined(spec)
        }
    }
}

/// Interpolated wind components and the speed derived from them.
#[derive(Debug, Clone, PartialEq)]
pub struct WindField {
    /// Eastward component, m/s.
    pub u: Surface,
    /// Northward component, m/s.
    pub v: Surface,
    pub speed: Surface,
}

impl WindField {
    pub fn undefined(spec: &GridSpec) -> Self {
        Self {
            u: Surface::undefined(spec),
            v: Surface::undefined(spec),
            speed: Surface::undefined(spec),
        }
    }

    pub fn is_undefined(&self) -> bool {
        self.speed.is_undefined()
    }
}

/// Interpolates both wind components over one shared triangulation. The
/// speed surface is the magnitude of the interpolated vector at each node.
pub fn interpolate_wind(samples: &[(LatLon, WindVector)], spec: &GridSpec) -> WindField {
    let usable: Vec<&(LatLon, WindVector)> = samples
        .iter()
        .filter(|(_, w)| w.u.is_finite() && w.v.is_finite())
        .collect();
    let positions: Vec<LatLon> = usable.iter().map(|(p, _)| *p).collect();

    let Some(triangulation) = Triangulation::new(&positions) else {
        warn!(
            "Only {} usable wind samples, wind field left undefined",
            positions.len()
        );
        return WindField::undefined(spec);
    };

    let us: Vec<f64> = usable.iter().map(|(_, w)| w.u).collect();
    let vs: Vec<f64> = usable.iter().map(|(_, w)| w.v).collect();
    let u = triangulation.interpolate(&us, spec);
    let v = triangulation.interpolate(&vs, spec);
    let speed = Surface {
        lons: u.lons.clone(),
        lats: u.lats.clone(),
        values: u
            .values
            .iter()
            .zip(&v.values)
            .map(|(a, b)| a.hypot(*b))
            .collect(),
    };
    WindField { u, v, speed }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> GridSpec {
        GridSpec {
            lon_min: 0.0,
            lon_max: 1.0,
            lat_min: 0.0,
            lat_max: 1.0,
            nx: 3,
            ny: 3,
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn corners_are_reproduced_and_midpoints_blend() {
        // f(lon, lat) = 1 + lon + 2 * lat
        let samples = vec![
            (LatLon(0.0, 0.0), 1.0),
            (LatLon(0.0, 1.0), 2.0),
            (LatLon(1.0, 0.0), 3.0),
            (LatLon(1.0, 1.0), 4.0),
        ];
        let surface = interpolate_linear(&samples, &unit_square());

        assert!(close(surface.get(0, 0), 1.0));
        assert!(close(surface.get(2, 0), 2.0));
        assert!(close(surface.get(0, 2), 3.0));
        assert!(close(surface.get(2, 2), 4.0));
        assert!(close(surface.get(1, 0), 1.5));
        assert!(close(surface.get(1, 1), 2.5));
        assert_eq!(surface.defined_count(), 9);
    }

    #[test]
    fn nodes_outside_the_hull_are_nan() {
        let samples = vec![
            (LatLon(0.0, 0.0), 1.0),
            (LatLon(0.0, 1.0), 1.0),
            (LatLon(1.0, 0.0), 1.0),
        ];
        let surface = interpolate_linear(&samples, &unit_square());
        // Upper right corner lies beyond the hypotenuse
        assert!(surface.get(2, 2).is_nan());
        assert!(close(surface.get(0, 0), 1.0));
        assert!(close(surface.get(1, 1), 1.0));
        assert_eq!(surface.defined_count(), 6);
    }

    #[test]
    fn too_few_points_give_an_undefined_surface() {
        let samples = vec![(LatLon(0.0, 0.0), 1.0), (LatLon(1.0, 1.0), 2.0)];
        let surface = interpolate_linear(&samples, &unit_square());
        assert!(surface.is_undefined());
        assert_eq!(surface.values.len(), 9);
        assert_eq!(surface.min_max(), None);

        assert!(interpolate_linear(&[], &unit_square()).is_undefined());
    }

    #[test]
    fn collinear_points_give_an_undefined_surface() {
        let samples: Vec<(LatLon, f64)> = (0..5)
            .map(|i| (LatLon(i as f64 * 0.25, i as f64 * 0.25), i as f64))
            .collect();
        assert!(interpolate_linear(&samples, &unit_square()).is_undefined());
    }

    #[test]
    fn duplicates_and_nan_values_are_ignored() {
        let samples = vec![
            (LatLon(0.0, 0.0), 1.0),
            (LatLon(0.0, 0.0), 100.0),
            (LatLon(0.0, 1.0), 1.0),
            (LatLon(1.0, 1.0), f64::NAN),
        ];
        // Two usable distinct points remain
        assert!(interpolate_linear(&samples, &unit_square()).is_undefined());
    }

    #[test]
    fn regular_grid_triangulates_fully() {
        let positions: Vec<LatLon> = (0..5)
            .flat_map(|i| (0..5).map(move |j| LatLon(i as f64, j as f64)))
            .collect();
        let triangulation = Triangulation::new(&positions).expect("triangulable");
        // A convex n-gon interior with h hull points: 2n - h - 2 triangles
        assert_eq!(triangulation.triangle_count(), 2 * 25 - 16 - 2);

        let values: Vec<f64> = positions.iter().map(|p| 2.0 * p.lat() - p.lon()).collect();
        let spec = GridSpec {
            lon_min: 0.0,
            lon_max: 4.0,
            lat_min: 0.0,
            lat_max: 4.0,
            nx: 9,
            ny: 9,
        };
        let surface = triangulation.interpolate(&values, &spec);
        assert_eq!(surface.defined_count(), 81);
        for (iy, lat) in surface.lats.iter().enumerate() {
            for (ix, lon) in surface.lons.iter().enumerate() {
                assert!(close(surface.get(ix, iy), 2.0 * lat - lon));
            }
        }
    }

    #[test]
    fn wind_components_share_one_triangulation() {
        let samples = vec![
            (LatLon(0.0, 0.0), WindVector { u: 3.0, v: 0.0 }),
            (LatLon(0.0, 1.0), WindVector { u: 3.0, v: 4.0 }),
            (LatLon(1.0, 0.0), WindVector { u: 3.0, v: 0.0 }),
            (LatLon(1.0, 1.0), WindVector { u: 3.0, v: 4.0 }),
        ];
        let field = interpolate_wind(&samples, &unit_square());

        assert!(close(field.u.get(1, 1), 3.0));
        assert!(close(field.v.get(1, 1), 2.0));
        assert!(close(field.speed.get(2, 0), 5.0));
        assert!(close(field.speed.get(1, 1), 13f64.sqrt()));
        assert_eq!(field.speed.defined_count(), 9);
    }

    #[test]
    fn too_few_wind_samples_leave_the_field_undefined() {
        let samples = vec![
            (LatLon(0.0, 0.0), WindVector { u: 1.0, v: 1.0 }),
            (LatLon(1.0, 1.0), WindVector { u: f64::NAN, v: 1.0 }),
            (LatLon(0.0, 1.0), WindVector { u: 1.0, v: 1.0 }),
        ];
        let field = interpolate_wind(&samples, &unit_square());
        assert!(field.is_undefined());
        assert!(field.u.is_undefined() && field.v.is_undefined());
    }

    #[test]
    fn bilinear_sampling_between_nodes() {
        let samples = vec![
            (LatLon(0.0, 0.0), 1.0),
            (LatLon(0.0, 1.0), 2.0),
            (LatLon(1.0, 0.0), 3.0),
            (LatLon(1.0, 1.0), 4.0),
        ];
        let surface = interpolate_linear(&samples, &unit_square());
        let value = surface.sample(0.25, 0.75).expect("inside the grid");
        assert!(close(value, 1.0 + 0.25 + 1.5));
        assert_eq!(surface.sample(1.5, 0.5), None);
    }
}
