//! Coastline and border line work read from a GeoJSON file.
//!
//! Only the line geometry matters: polygons contribute their rings, points
//! are ignored. Coordinates are `[lon, lat]` as GeoJSON prescribes.

use crate::render::error::RenderError;
use log::info;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum Geometry {
    LineString {
        coordinates: Vec<Vec<f64>>,
    },
    MultiLineString {
        coordinates: Vec<Vec<Vec<f64>>>,
    },
    Polygon {
        coordinates: Vec<Vec<Vec<f64>>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Vec<f64>>>>,
    },
    GeometryCollection {
        geometries: Vec<Geometry>,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum Document {
    FeatureCollection { features: Vec<Feature> },
    Feature { geometry: Option<Geometry> },
}

/// Polylines in `(lon, lat)` drawn on top of the maps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overlay {
    pub lines: Vec<Vec<(f64, f64)>>,
}

impl Overlay {
    pub async fn load(path: &Path) -> Result<Self, RenderError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| RenderError::OverlayRead(path.to_path_buf(), e))?;
        let overlay =
            Self::parse(&text).map_err(|e| RenderError::OverlayParse(path.to_path_buf(), e))?;
        info!(
            "Loaded {} overlay lines from {}",
            overlay.lines.len(),
            path.display()
        );
        Ok(overlay)
    }

    /// Parses a FeatureCollection, a single Feature or a bare geometry.
    pub fn parse(geojson: &str) -> Result<Self, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_str(geojson)?;
        let is_feature = matches!(
            value.get("type").and_then(|t| t.as_str()),
            Some("FeatureCollection") | Some("Feature")
        );

        let mut lines = Vec::new();
        if is_feature {
            match serde_json::from_value(value)? {
                Document::FeatureCollection { features } => {
                    for geometry in features.into_iter().filter_map(|f| f.geometry) {
                        collect_lines(geometry, &mut lines);
                    }
                }
                Document::Feature { geometry } => {
                    if let Some(geometry) = geometry {
                        collect_lines(geometry, &mut lines);
                    }
                }
            }
        } else {
            collect_lines(serde_json::from_value(value)?, &mut lines);
        }
        Ok(Self { lines })
    }

    /// Parts of the lines that fall inside the lon/lat box. Segments crossing
    /// the box edge are cut at the edge, and a line is split where it leaves
    /// the box.
    pub fn clipped(
        &self,
        lon_range: (f64, f64),
        lat_range: (f64, f64),
    ) -> Vec<Vec<(f64, f64)>> {
        let mut out = Vec::new();
        for line in &self.lines {
            let mut run: Vec<(f64, f64)> = Vec::new();
            for segment in line.windows(2) {
                match clip_segment(segment[0], segment[1], lon_range, lat_range) {
                    Some((start, end)) => {
                        if run.last() != Some(&start) {
                            flush_run(&mut run, &mut out);
                            run.push(start);
                        }
                        run.push(end);
                    }
                    None => flush_run(&mut run, &mut out),
                }
            }
            flush_run(&mut run, &mut out);
        }
        out
    }
}

fn flush_run(run: &mut Vec<(f64, f64)>, out: &mut Vec<Vec<(f64, f64)>>) {
    if run.len() > 1 {
        out.push(std::mem::take(run));
    } else {
        run.clear();
    }
}

/// Liang-Barsky clipping of the segment `p`-`q` against the box. Endpoints
/// already inside the box are returned unchanged.
fn clip_segment(
    p: (f64, f64),
    q: (f64, f64),
    lon_range: (f64, f64),
    lat_range: (f64, f64),
) -> Option<((f64, f64), (f64, f64))> {
    let (dx, dy) = (q.0 - p.0, q.1 - p.1);
    let (mut t0, mut t1) = (0.0_f64, 1.0_f64);
    let edges = [
        (-dx, p.0 - lon_range.0),
        (dx, lon_range.1 - p.0),
        (-dy, p.1 - lat_range.0),
        (dy, lat_range.1 - p.1),
    ];
    for (direction, distance) in edges {
        if direction == 0.0 {
            if distance < 0.0 {
                return None;
            }
            continue;
        }
        let t = distance / direction;
        if direction < 0.0 {
            if t > t1 {
                return None;
            }
            t0 = t0.max(t);
        } else {
            if t < t0 {
                return None;
            }
            t1 = t1.min(t);
        }
    }
    let at = |t: f64| match t {
        t if t == 0.0 => p,
        t if t == 1.0 => q,
        t => (p.0 + t * dx, p.1 + t * dy),
    };
    Some((at(t0), at(t1)))
}

fn to_line(coordinates: Vec<Vec<f64>>) -> Vec<(f64, f64)> {
    coordinates
        .into_iter()
        .filter_map(|c| match c.as_slice() {
            [lon, lat, ..] => Some((*lon, *lat)),
            _ => None,
        })
        .collect()
}

fn collect_lines(geometry: Geometry, lines: &mut Vec<Vec<(f64, f64)>>) {
    match geometry {
        Geometry::LineString { coordinates } => lines.push(to_line(coordinates)),
        Geometry::MultiLineString { coordinates } | Geometry::Polygon { coordinates } => {
            lines.extend(coordinates.into_iter().map(to_line))
        }
        Geometry::MultiPolygon { coordinates } => {
            lines.extend(coordinates.into_iter().flatten().map(to_line))
        }
        Geometry::GeometryCollection { geometries } => {
            for g in geometries {
                collect_lines(g, lines);
            }
        }
        Geometry::Unsupported => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_lines_and_polygon_rings() -> Result<(), serde_json::Error> {
        let overlay = Overlay::parse(
            r#"{
                "type": "FeatureCollection",
                "features": [
                    { "type": "Feature", "properties": {}, "geometry": {
                        "type": "LineString", "coordinates": [[-35.0, -8.0], [-34.9, -8.1]] } },
                    { "type": "Feature", "properties": {}, "geometry": {
                        "type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]] } },
                    { "type": "Feature", "properties": {}, "geometry": {
                        "type": "Point", "coordinates": [5, 5] } },
                    { "type": "Feature", "properties": {}, "geometry": null }
                ]
            }"#,
        )?;
        assert_eq!(overlay.lines.len(), 2);
        assert_eq!(overlay.lines[0], vec![(-35.0, -8.0), (-34.9, -8.1)]);
        assert_eq!(overlay.lines[1].len(), 4);
        Ok(())
    }

    #[test]
    fn accepts_a_bare_geometry() -> Result<(), serde_json::Error> {
        let overlay = Overlay::parse(
            r#"{ "type": "MultiLineString", "coordinates": [[[0, 0], [1, 1]], [[2, 2], [3, 3, 10]]] }"#,
        )?;
        assert_eq!(overlay.lines, vec![vec![(0.0, 0.0), (1.0, 1.0)], vec![(2.0, 2.0), (3.0, 3.0)]]);
        Ok(())
    }

    #[test]
    fn rejects_invalid_json() {
        assert!(Overlay::parse("not json").is_err());
    }

    fn assert_lines_close(actual: &[Vec<(f64, f64)>], expected: &[Vec<(f64, f64)>]) {
        assert_eq!(actual.len(), expected.len(), "{:?}", actual);
        for (a, e) in actual.iter().zip(expected) {
            assert_eq!(a.len(), e.len(), "{:?}", actual);
            for (p, q) in a.iter().zip(e) {
                assert!(
                    (p.0 - q.0).abs() < 1e-9 && (p.1 - q.1).abs() < 1e-9,
                    "{:?} != {:?}",
                    a,
                    e
                );
            }
        }
    }

    #[test]
    fn clipping_cuts_lines_at_the_box_edge() {
        let overlay = Overlay {
            lines: vec![vec![(0.0, 0.0), (1.0, 0.0), (5.0, 0.0), (1.5, 0.5), (1.8, 0.2), (9.0, 9.0)]],
        };
        let clipped = overlay.clipped((0.0, 2.0), (-1.0, 1.0));
        assert_lines_close(
            &clipped,
            &[
                vec![(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)],
                vec![(2.0, 0.5 * 3.0 / 3.5), (1.5, 0.5), (1.8, 0.2), (2.0, 0.2 + 8.8 * 0.2 / 7.2)],
            ],
        );
    }

    #[test]
    fn segments_crossing_the_whole_box_are_kept() {
        let overlay = Overlay {
            lines: vec![
                vec![(-1.0, 0.5), (3.0, 0.5)],
                vec![(-1.0, 5.0), (3.0, 5.0)],
                vec![(0.5, 0.5)],
            ],
        };
        let clipped = overlay.clipped((0.0, 2.0), (-1.0, 1.0));
        assert_lines_close(&clipped, &[vec![(0.0, 0.5), (2.0, 0.5)]]);
    }

    #[tokio::test]
    async fn missing_file_is_a_read_error() {
        let result = Overlay::load(Path::new("/nonexistent/coast.geojson")).await;
        assert!(matches!(result, Err(RenderError::OverlayRead(..))));
    }

    #[tokio::test]
    async fn loads_lines_from_a_file() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("coast.geojson");
        tokio::fs::write(
            &path,
            r#"{ "type": "LineString", "coordinates": [[-35.2, -5.8], [-35.1, -5.9]] }"#,
        )
        .await?;
        let overlay = Overlay::load(&path).await?;
        assert_eq!(overlay.lines, vec![vec![(-35.2, -5.8), (-35.1, -5.9)]]);

        tokio::fs::write(&path, "{ broken").await?;
        assert!(matches!(
            Overlay::load(&path).await,
            Err(RenderError::OverlayParse(..))
        ));
        Ok(())
    }
}
