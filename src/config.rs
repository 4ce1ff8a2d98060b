//! Runtime configuration for the [`crate::Climazin`] client.
//!
//! Every field has a default matching the public Open-Meteo endpoints, so
//! `ClimateConfig::default()` is enough for normal use. Tests and the CLI
//! override individual fields through the builder.

use bon::Builder;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";
pub const DEFAULT_ARCHIVE_URL: &str = "https://archive-api.open-meteo.com/v1/archive";
pub const DEFAULT_TIMEZONE: &str = "America/Sao_Paulo";

/// How the point sampler reacts to HTTP 429 (rate limited) answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts per point, including the first one.
    pub attempts: u32,
    /// Fixed pause before the next attempt.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(5),
        }
    }
}

/// Shape of the sampling lattice around a city center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSettings {
    /// Number of points along each axis; the lattice has `n * n` points.
    pub points_per_side: usize,
    /// Half width of the square bounding box, in degrees.
    pub half_span_deg: f64,
}

impl GridSettings {
    pub fn new(points_per_side: usize, half_span_deg: f64) -> Self {
        Self {
            points_per_side,
            half_span_deg,
        }
    }
}

/// Configuration for [`crate::Climazin`].
///
/// # Examples
///
/// ```
/// use climazin::{ClimateConfig, RetryPolicy};
/// use std::time::Duration;
///
/// let config = ClimateConfig::builder()
///     .cache_dir("/tmp/climazin")
///     .workers(4)
///     .retry(RetryPolicy { attempts: 5, delay: Duration::from_secs(1) })
///     .build();
///
/// assert_eq!(config.workers, 4);
/// assert_eq!(config.temperature_grid.points_per_side, 15);
/// ```
#[derive(Debug, Clone, Builder)]
pub struct ClimateConfig {
    /// Cache root. `None` resolves to the platform cache directory.
    #[builder(into)]
    pub cache_dir: Option<PathBuf>,

    #[builder(default = DEFAULT_GEOCODING_URL.to_string(), into)]
    pub geocoding_url: String,

    #[builder(default = DEFAULT_ARCHIVE_URL.to_string(), into)]
    pub archive_url: String,

    /// Timezone passed to the archive; determines where day boundaries fall.
    #[builder(default = DEFAULT_TIMEZONE.to_string(), into)]
    pub timezone: String,

    #[builder(default)]
    pub retry: RetryPolicy,

    /// Maximum number of grid points fetched concurrently.
    #[builder(default = 2)]
    pub workers: usize,

    #[builder(default = GridSettings::new(15, 5.0))]
    pub temperature_grid: GridSettings,

    #[builder(default = GridSettings::new(5, 1.0))]
    pub wind_grid: GridSettings,

    /// Half width of the rendered wind map, in degrees.
    #[builder(default = 2.0)]
    pub wind_map_half_span_deg: f64,

    /// Nodes per axis of the dense interpolation grid.
    #[builder(default = 100)]
    pub surface_resolution: usize,

    /// Wind direction sectors with fewer hourly observations are dropped.
    #[builder(default = 300)]
    pub min_sector_hours: u32,

    /// GeoJSON file with coastline/border line work drawn over the maps.
    #[builder(into)]
    pub overlay_path: Option<PathBuf>,
}

impl Default for ClimateConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}
