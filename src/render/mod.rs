pub mod chart;
pub mod colors;
pub mod error;
pub mod map;
pub mod overlay;
pub mod streamlines;

use crate::render::error::RenderError;
use plotters::prelude::*;

/// A rendered chart or map.
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub title: String,
    /// Complete SVG document.
    pub svg: String,
}

/// Renders onto an in-memory SVG of `size` pixels and wraps the result.
pub(crate) fn render_svg<F>(title: &str, size: (u32, u32), draw: F) -> Result<Figure, RenderError>
where
    F: FnOnce(&DrawingArea<SVGBackend, plotters::coord::Shift>) -> Result<(), DrawError>,
{
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
        draw(&root)
            .and_then(|_| root.present().map_err(DrawError::from))
            .map_err(|source| RenderError::Draw {
                figure: title.to_string(),
                source,
            })?;
    }
    Ok(Figure {
        title: title.to_string(),
        svg,
    })
}

pub(crate) type DrawError = Box<dyn std::error::Error + Send + Sync>;
