use crate::render::colors::{COOLWARM, SKY_BLUE};
use crate::render::error::RenderError;
use crate::render::{render_svg, DrawError, Figure};
use crate::types::series::{MonthlySeries, MONTH_LABELS};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

/// Precipitation charts never use a y axis shorter than this, in mm.
pub const PRECIPITATION_AXIS_MM: f64 = 450.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    /// Monthly mean temperature, bars coloured by relative temperature.
    Temperature,
    /// Monthly precipitation sum, sky blue bars.
    Precipitation,
}

impl ChartKind {
    pub fn title(&self, city: &str, year: i32) -> String {
        match self {
            ChartKind::Temperature => format!("Monthly mean temperature in {} ({})", city, year),
            ChartKind::Precipitation => format!("Monthly precipitation in {} ({})", city, year),
        }
    }

    fn y_desc(&self) -> &'static str {
        match self {
            ChartKind::Temperature => "Mean temperature (°C)",
            ChartKind::Precipitation => "Total precipitation (mm)",
        }
    }

    fn bar_width(&self) -> f64 {
        match self {
            ChartKind::Temperature => 0.8,
            ChartKind::Precipitation => 0.5,
        }
    }

    fn y_range(&self, series: &MonthlySeries) -> (f64, f64) {
        let (min, max) = series.min_max().unwrap_or((0.0, 0.0));
        match self {
            ChartKind::Temperature => {
                let low = min.min(0.0);
                let high = if max > 0.0 { max * 1.1 } else { 1.0 };
                (low, high)
            }
            ChartKind::Precipitation => (0.0, PRECIPITATION_AXIS_MM.max(max * 1.05)),
        }
    }
}

fn month_label(x: &f64) -> String {
    let rounded = x.round();
    if (x - rounded).abs() > 1e-6 || !(1.0..=12.0).contains(&rounded) {
        return String::new();
    }
    MONTH_LABELS[rounded as usize - 1].to_string()
}

/// Bar chart of a monthly series. Months without data are left as gaps.
pub fn monthly_bar_chart(
    kind: ChartKind,
    series: &MonthlySeries,
    city: &str,
    year: i32,
) -> Result<Figure, RenderError> {
    let title = kind.title(city, year);
    render_svg(&title, (600, 600), |root| draw_bars(root, kind, series, &title))
}

fn draw_bars(
    root: &DrawingArea<SVGBackend, Shift>,
    kind: ChartKind,
    series: &MonthlySeries,
    title: &str,
) -> Result<(), DrawError> {
    root.fill(&WHITE)?;
    let (y_min, y_max) = kind.y_range(series);

    let mut chart = ChartBuilder::on(root)
        .caption(title, ("sans-serif", 20))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0.5f64..12.5f64, y_min..y_max)?;

    let mut mesh = chart.configure_mesh();
    mesh.x_labels(12)
        .x_label_formatter(&month_label)
        .x_desc("Month")
        .y_desc(kind.y_desc())
        .disable_x_mesh();
    if kind == ChartKind::Precipitation {
        mesh.disable_y_mesh();
    }
    mesh.draw()?;

    let (low, high) = series.min_max().unwrap_or((0.0, 0.0));
    let half = kind.bar_width() / 2.0;
    chart.draw_series(series.iter().filter_map(|(month, value)| {
        let value = value?;
        let color = match kind {
            ChartKind::Temperature => COOLWARM.scaled(value, low, high),
            ChartKind::Precipitation => SKY_BLUE,
        };
        let x = month as f64;
        Some(Rectangle::new(
            [(x - half, 0.0), (x + half, value)],
            color.filled(),
        ))
    }))?;

    if series.is_empty() {
        chart.draw_series(std::iter::once(Text::new(
            "No data",
            (6.5, (y_min + y_max) / 2.0),
            ("sans-serif", 18).into_font().color(&BLACK).pos(Pos::new(HPos::Center, VPos::Center)),
        )))?;
    }
    Ok(())
}
