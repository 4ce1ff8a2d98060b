mod climazin;
mod config;
mod dashboard;
mod error;
mod geocoding;
mod interpolation;
mod render;
mod sampling;
mod types;
mod utils;
mod weather_data;

pub use climazin::Climazin;
pub use config::{ClimateConfig, GridSettings, RetryPolicy};
pub use dashboard::{
    Dashboard, Measure, Panel, Route, Selection, View, CITIES, DEFAULT_MEMO_CAPACITY, YEARS,
};
pub use error::ClimateError;

pub use geocoding::error::GeocodeError;
pub use geocoding::geocoder::Geocoder;

pub use types::cache_key::{CacheKey, Subject};
pub use types::dataset::Dataset;
pub use types::location::{LatLon, Location};
pub use types::series::{MonthlySeries, SectorMean, WindVector, MONTH_LABELS};

pub use weather_data::archive::ArchiveClient;
pub use weather_data::cache::DiskCache;
pub use weather_data::data_loader::WeatherDataLoader;
pub use weather_data::error::WeatherDataError;
pub use weather_data::frames::{DailyFrame, WindFrame, SECTOR_WIDTH_DEG};

pub use sampling::grid::{linspace, square_grid};
pub use sampling::sampler::{PointOutcome, PointSampler, SampleReport};

pub use interpolation::{interpolate_linear, interpolate_wind, GridSpec, Surface, Triangulation, WindField};

pub use render::chart::{monthly_bar_chart, ChartKind, PRECIPITATION_AXIS_MM};
pub use render::error::RenderError;
pub use render::map::{temperature_map, wind_map, MapFrame, COMPASS_OFFSET_DEG};
pub use render::overlay::Overlay;
pub use render::streamlines::{trace_streamlines, Streamline, StreamlineOptions};
pub use render::Figure;
