//! Plate carrée maps of an interpolated surface around a city.

use crate::interpolation::{Surface, WindField};
use crate::render::colors::{normalize, Gradient, COOLWARM, OVERLAY_LINE, PLASMA};
use crate::render::error::RenderError;
use crate::render::overlay::Overlay;
use crate::render::streamlines::{trace_streamlines, StreamlineOptions};
use crate::render::{render_svg, DrawError, Figure};
use crate::types::location::LatLon;
use crate::types::series::WindVector;
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

/// Number of discrete colour bands of the filled surfaces.
const LEVELS: usize = 10;
/// Position of the compass rose relative to the city, in degrees (lon, lat).
pub const COMPASS_OFFSET_DEG: (f64, f64) = (1.5, -1.5);
const COMPASS_ARROW_DEG: f64 = 0.3;

type MapChart<'a, 'b> = ChartContext<'a, SVGBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

/// Visible area of a map and the line work drawn over it.
#[derive(Debug, Clone, Copy)]
pub struct MapFrame<'a> {
    pub center: LatLon,
    pub half_span_deg: f64,
    pub overlay: Option<&'a Overlay>,
}

impl MapFrame<'_> {
    fn lon_range(&self) -> (f64, f64) {
        (
            self.center.lon() - self.half_span_deg,
            self.center.lon() + self.half_span_deg,
        )
    }

    fn lat_range(&self) -> (f64, f64) {
        (
            self.center.lat() - self.half_span_deg,
            self.center.lat() + self.half_span_deg,
        )
    }

    fn contains(&self, lon: f64, lat: f64) -> bool {
        let (lon0, lon1) = self.lon_range();
        let (lat0, lat1) = self.lat_range();
        lon >= lon0 && lon <= lon1 && lat >= lat0 && lat <= lat1
    }
}

pub fn temperature_title(city: &str, year: i32) -> String {
    format!("Temperature map of {} ({})", city, year)
}

pub fn wind_title(city: &str, year: i32) -> String {
    format!("Mean annual wind in {} ({})", city, year)
}

/// Filled temperature surface with a colour bar, the sampled grid points and
/// the city marker. Undefined cells stay blank.
pub fn temperature_map(
    surface: &Surface,
    samples: &[(LatLon, f64)],
    frame: &MapFrame,
    city: &str,
    year: i32,
) -> Result<Figure, RenderError> {
    let title = temperature_title(city, year);
    render_svg(&title, (900, 800), |root| {
        root.fill(&WHITE)?;
        let (map_area, bar_area) = root.split_horizontally(780);
        let mut chart = map_chart(&map_area, &title, frame)?;

        match surface.min_max() {
            Some(range) => {
                draw_surface(&mut chart, surface, frame, COOLWARM, range, 1.0)?;
                draw_colorbar(&bar_area, COOLWARM, range, "Mean annual temperature (°C)")?;
            }
            None => draw_notice(&mut chart, frame, "Not enough sampled points to interpolate")?,
        }
        draw_overlay(&mut chart, frame)?;
        chart.draw_series(
            samples
                .iter()
                .map(|(p, _)| Circle::new((p.lon(), p.lat()), 2, BLACK.filled())),
        )?;
        draw_city(&mut chart, frame, city)?;
        Ok(())
    })
}

/// Wind speed surface with streamlines of the interpolated flow, the sampled
/// points coloured by intensity and a compass rose.
pub fn wind_map(
    field: &WindField,
    samples: &[(LatLon, WindVector)],
    frame: &MapFrame,
    city: &str,
    year: i32,
) -> Result<Figure, RenderError> {
    let title = wind_title(city, year);
    let speed_range = speed_range(field, samples);

    render_svg(&title, (1000, 800), |root| {
        root.fill(&WHITE)?;
        let (map_area, bar_area) = root.split_horizontally(880);
        let mut chart = map_chart(&map_area, &title, frame)?;

        match speed_range {
            Some(range) => {
                draw_surface(&mut chart, &field.speed, frame, PLASMA, range, 0.35)?;
                draw_streamlines(&mut chart, field, frame, range)?;
                draw_colorbar(&bar_area, PLASMA, range, "Wind speed (m/s)")?;
            }
            None => draw_notice(&mut chart, frame, "No wind samples available")?,
        }
        draw_overlay(&mut chart, frame)?;

        let (low, high) = speed_range.unwrap_or((0.0, 1.0));
        chart.draw_series(samples.iter().map(|(p, w)| {
            let color = PLASMA.at(normalize(w.speed(), low, high));
            Circle::new((p.lon(), p.lat()), 5, color.mix(0.8).filled())
        }))?;
        draw_compass(&mut chart, frame)?;
        draw_city(&mut chart, frame, city)?;
        Ok(())
    })
}

fn speed_range(field: &WindField, samples: &[(LatLon, WindVector)]) -> Option<(f64, f64)> {
    let sample_speeds = samples.iter().map(|(_, w)| w.speed()).filter(|s| s.is_finite());
    let surface = field.speed.min_max();
    let (mut low, mut high) = surface.unwrap_or((f64::INFINITY, f64::NEG_INFINITY));
    for s in sample_speeds {
        low = low.min(s);
        high = high.max(s);
    }
    (low <= high).then_some((low, high))
}

fn map_chart<'a, 'b>(
    area: &'a DrawingArea<SVGBackend<'b>, Shift>,
    title: &str,
    frame: &MapFrame,
) -> Result<MapChart<'a, 'b>, DrawError> {
    let (lon0, lon1) = frame.lon_range();
    let (lat0, lat1) = frame.lat_range();
    let mut chart = ChartBuilder::on(area)
        .caption(title, ("sans-serif", 20))
        .margin(15)
        .x_label_area_size(35)
        .y_label_area_size(55)
        .build_cartesian_2d(lon0..lon1, lat0..lat1)?;
    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("Longitude")
        .y_desc("Latitude")
        .x_label_formatter(&|x| format!("{:.1}°", x))
        .y_label_formatter(&|y| format!("{:.1}°", y))
        .draw()?;
    Ok(chart)
}

fn band_color(gradient: Gradient, value: f64, (min, max): (f64, f64)) -> RGBColor {
    let t = normalize(value, min, max);
    let band = ((t * LEVELS as f64).floor().max(0.0) as usize).min(LEVELS - 1);
    gradient.at((band as f64 + 0.5) / LEVELS as f64)
}

fn draw_surface(
    chart: &mut MapChart,
    surface: &Surface,
    frame: &MapFrame,
    gradient: Gradient,
    range: (f64, f64),
    opacity: f64,
) -> Result<(), DrawError> {
    let (nx, ny) = (surface.lons.len(), surface.lats.len());
    if nx < 2 || ny < 2 {
        return Ok(());
    }
    let half_dx = (surface.lons[nx - 1] - surface.lons[0]) / (nx - 1) as f64 / 2.0;
    let half_dy = (surface.lats[ny - 1] - surface.lats[0]) / (ny - 1) as f64 / 2.0;
    let (lon0, lon1) = frame.lon_range();
    let (lat0, lat1) = frame.lat_range();

    let mut cells = Vec::new();
    for (iy, &lat) in surface.lats.iter().enumerate() {
        for (ix, &lon) in surface.lons.iter().enumerate() {
            let value = surface.get(ix, iy);
            if !value.is_finite() {
                continue;
            }
            let x0 = (lon - half_dx).max(lon0);
            let x1 = (lon + half_dx).min(lon1);
            let y0 = (lat - half_dy).max(lat0);
            let y1 = (lat + half_dy).min(lat1);
            if x1 <= x0 || y1 <= y0 {
                continue;
            }
            let color = band_color(gradient, value, range);
            cells.push(Rectangle::new(
                [(x0, y0), (x1, y1)],
                color.mix(opacity).filled(),
            ));
        }
    }
    chart.draw_series(cells)?;
    Ok(())
}

fn draw_streamlines(
    chart: &mut MapChart,
    field: &WindField,
    frame: &MapFrame,
    (low, high): (f64, f64),
) -> Result<(), DrawError> {
    let lines = trace_streamlines(&field.u, &field.v, StreamlineOptions::default());
    let head = frame.half_span_deg * 0.03;

    let mut segments = Vec::new();
    for line in &lines {
        for (pair, speed) in line.points.windows(2).zip(&line.speeds) {
            if !frame.contains(pair[0].0, pair[0].1) || !frame.contains(pair[1].0, pair[1].1) {
                continue;
            }
            let color = PLASMA.at(normalize(*speed, low, high));
            segments.push(PathElement::new(
                vec![pair[0], pair[1]],
                color.stroke_width(2),
            ));
        }

        // Arrow head half way along the line
        let mid = line.points.len() / 2;
        if mid + 1 < line.points.len() {
            let (tip, prev) = (line.points[mid + 1], line.points[mid]);
            let (dx, dy) = (tip.0 - prev.0, tip.1 - prev.1);
            let len = dx.hypot(dy);
            if len > 0.0 && frame.contains(tip.0, tip.1) {
                let (ux, uy) = (dx / len, dy / len);
                let back = (tip.0 - ux * head, tip.1 - uy * head);
                let side = (-uy * head * 0.5, ux * head * 0.5);
                segments.push(PathElement::new(
                    vec![
                        (back.0 + side.0, back.1 + side.1),
                        tip,
                        (back.0 - side.0, back.1 - side.1),
                    ],
                    BLACK.stroke_width(1),
                ));
            }
        }
    }
    chart.draw_series(segments)?;
    Ok(())
}

fn draw_colorbar(
    area: &DrawingArea<SVGBackend, Shift>,
    gradient: Gradient,
    (min, max): (f64, f64),
    label: &str,
) -> Result<(), DrawError> {
    let (low, high) = if max > min { (min, max) } else { (min - 0.5, max + 0.5) };
    let mut bar = ChartBuilder::on(area)
        .margin_top(60)
        .margin_bottom(50)
        .margin_right(10)
        .y_label_area_size(0)
        .right_y_label_area_size(55)
        .build_cartesian_2d(0.0f64..1.0f64, low..high)?;
    bar.configure_mesh()
        .disable_mesh()
        .disable_x_axis()
        .y_desc(label)
        .y_label_formatter(&|v| format!("{:.1}", v))
        .draw()?;

    let step = (high - low) / LEVELS as f64;
    bar.draw_series((0..LEVELS).map(|i| {
        let y0 = low + step * i as f64;
        let color = gradient.at((i as f64 + 0.5) / LEVELS as f64);
        Rectangle::new([(0.0, y0), (1.0, y0 + step)], color.filled())
    }))?;
    Ok(())
}

fn draw_overlay(chart: &mut MapChart, frame: &MapFrame) -> Result<(), DrawError> {
    let Some(overlay) = frame.overlay else {
        return Ok(());
    };
    let style = OVERLAY_LINE.stroke_width(1);
    chart.draw_series(
        overlay
            .clipped(frame.lon_range(), frame.lat_range())
            .into_iter()
            .map(|line| PathElement::new(line, style)),
    )?;
    Ok(())
}

fn draw_city(chart: &mut MapChart, frame: &MapFrame, city: &str) -> Result<(), DrawError> {
    let (lon, lat) = (frame.center.lon(), frame.center.lat());
    chart.draw_series(std::iter::once(Cross::new((lon, lat), 6, RED.stroke_width(2))))?;
    let offset = frame.half_span_deg * 0.02;
    chart.draw_series(std::iter::once(Text::new(
        city.to_string(),
        (lon + offset, lat + offset),
        ("sans-serif", 14).into_font().color(&BLACK),
    )))?;
    Ok(())
}

fn draw_notice(chart: &mut MapChart, frame: &MapFrame, text: &str) -> Result<(), DrawError> {
    chart.draw_series(std::iter::once(Text::new(
        text.to_string(),
        (frame.center.lon(), frame.center.lat() + frame.half_span_deg * 0.5),
        ("sans-serif", 18)
            .into_font()
            .color(&BLACK)
            .pos(Pos::new(HPos::Center, VPos::Center)),
    )))?;
    Ok(())
}

fn draw_compass(chart: &mut MapChart, frame: &MapFrame) -> Result<(), DrawError> {
    // Pulled inwards when the map is too small for the usual offset
    let limit = frame.half_span_deg * 0.75;
    let cx = frame.center.lon() + COMPASS_OFFSET_DEG.0.clamp(-limit, limit);
    let cy = frame.center.lat() + COMPASS_OFFSET_DEG.1.clamp(-limit, limit);
    let arrow = COMPASS_ARROW_DEG.min(frame.half_span_deg * 0.15);
    let label_at = arrow + arrow * 0.4;

    let points = [("N", 0.0, 1.0), ("E", 1.0, 0.0), ("S", 0.0, -1.0), ("W", -1.0, 0.0)];
    chart.draw_series(points.iter().map(|(_, dx, dy)| {
        PathElement::new(
            vec![(cx, cy), (cx + dx * arrow, cy + dy * arrow)],
            BLACK.stroke_width(2),
        )
    }))?;
    chart.draw_series(points.iter().map(|(label, dx, dy)| {
        Text::new(
            label.to_string(),
            (cx + dx * label_at, cy + dy * label_at),
            ("sans-serif", 14)
                .into_font()
                .color(&BLACK)
                .pos(Pos::new(HPos::Center, VPos::Center)),
        )
    }))?;
    chart.draw_series(std::iter::once(Circle::new((cx, cy), 3, BLACK.filled())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpolation::{interpolate_linear, interpolate_wind, GridSpec};
    use crate::sampling::grid::square_grid;
    use crate::config::GridSettings;

    /// True when some `<text>` element holds exactly `label`.
    fn has_text(svg: &str, label: &str) -> bool {
        svg.split("<text").skip(1).any(|chunk| {
            chunk
                .split_once('>')
                .and_then(|(_, rest)| rest.split("</text>").next())
                .is_some_and(|content| content.trim() == label)
        })
    }

    fn frame(overlay: Option<&Overlay>) -> MapFrame<'_> {
        MapFrame {
            center: LatLon(-8.05, -34.9),
            half_span_deg: 5.0,
            overlay,
        }
    }

    #[test]
    fn temperature_map_draws_surface_and_title() -> Result<(), RenderError> {
        let center = LatLon(-8.05, -34.9);
        let samples: Vec<(LatLon, f64)> = square_grid(center, GridSettings::new(5, 5.0))
            .into_iter()
            .map(|p| (p, 25.0 + p.lat() - center.lat()))
            .collect();
        let surface = interpolate_linear(&samples, &GridSpec::around(center, 5.0, 20));
        let figure = temperature_map(&surface, &samples, &frame(None), "Recife", 2018)?;

        assert_eq!(figure.title, "Temperature map of Recife (2018)");
        assert!(figure.svg.contains("Temperature map of Recife (2018)"));
        assert!(figure.svg.contains("Mean annual temperature"));
        assert!(figure.svg.contains("<rect"));
        Ok(())
    }

    #[test]
    fn undefined_surface_still_renders_with_notice() -> Result<(), RenderError> {
        let surface = Surface::undefined(&GridSpec::around(LatLon(-8.05, -34.9), 5.0, 10));
        let overlay = Overlay {
            lines: vec![vec![(-35.0, -9.0), (-34.8, -7.0)]],
        };
        let figure = temperature_map(&surface, &[], &frame(Some(&overlay)), "Recife", 2018)?;
        assert!(figure.svg.contains("Not enough sampled points"));
        Ok(())
    }

    #[test]
    fn wind_map_has_compass_and_streamlines() -> Result<(), RenderError> {
        let center = LatLon(-30.03, -51.23);
        let samples: Vec<(LatLon, WindVector)> = square_grid(center, GridSettings::new(5, 1.0))
            .into_iter()
            .map(|p| (p, WindVector { u: 2.0 + p.lon() - center.lon(), v: 1.0 }))
            .collect();
        let field = interpolate_wind(&samples, &GridSpec::around(center, 1.0, 30));
        let frame = MapFrame {
            center,
            half_span_deg: 2.0,
            overlay: None,
        };
        let figure = wind_map(&field, &samples, &frame, "Porto Alegre", 2022)?;

        assert!(figure.svg.contains("Mean annual wind in Porto Alegre (2022)"));
        for label in ["N", "E", "S", "W"] {
            assert!(has_text(&figure.svg, label), "missing compass label {}", label);
        }
        assert!(figure.svg.contains("<polyline") || figure.svg.contains("<path"));
        Ok(())
    }

    #[test]
    fn wind_map_without_samples_renders() -> Result<(), RenderError> {
        let center = LatLon(-30.03, -51.23);
        let field = interpolate_wind(&[], &GridSpec::around(center, 1.0, 10));
        let frame = MapFrame {
            center,
            half_span_deg: 2.0,
            overlay: None,
        };
        let figure = wind_map(&field, &[], &frame, "Porto Alegre", 2022)?;
        assert!(figure.svg.contains("No wind samples available"));
        Ok(())
    }

    #[test]
    fn band_colors_are_discrete() {
        let range = (0.0, 10.0);
        assert_eq!(band_color(COOLWARM, 0.1, range), band_color(COOLWARM, 0.9, range));
        assert_ne!(band_color(COOLWARM, 0.1, range), band_color(COOLWARM, 9.9, range));
        // The maximum falls into the last band
        assert_eq!(band_color(COOLWARM, 10.0, range), band_color(COOLWARM, 9.5, range));
    }
}
