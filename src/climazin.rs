//! The main entry point: ties geocoding, the disk cache, point sampling,
//! interpolation and rendering together for one city and year at a time.

use crate::config::{ClimateConfig, GridSettings};
use crate::error::ClimateError;
use crate::geocoding::geocoder::Geocoder;
use crate::interpolation::{interpolate_linear, interpolate_wind, GridSpec};
use crate::render::chart::{monthly_bar_chart, ChartKind};
use crate::render::map::{temperature_map, temperature_title, wind_map, MapFrame};
use crate::render::overlay::Overlay;
use crate::render::Figure;
use crate::sampling::grid::square_grid;
use crate::sampling::sampler::{PointSampler, SampleReport};
use crate::types::cache_key::CacheKey;
use crate::types::dataset::Dataset;
use crate::types::location::{LatLon, Location};
use crate::types::series::WindVector;
use crate::utils::{ensure_cache_dir_exists, get_cache_dir};
use crate::weather_data::archive::ArchiveClient;
use crate::weather_data::cache::DiskCache;
use crate::weather_data::data_loader::WeatherDataLoader;
use crate::weather_data::frames::DailyFrame;
use bon::bon;
use log::info;
use reqwest::Client;
use std::path::Path;

/// Name of a cached temperature map. Maps drawn from different grids or
/// surface resolutions are cached separately.
fn temperature_figure(grid: GridSettings, resolution: usize) -> String {
    format!(
        "temperature_{}x{:.2}_{}",
        grid.points_per_side, grid.half_span_deg, resolution
    )
}

/// Client for yearly climate charts and maps of a city.
///
/// One instance shares a single HTTP client and cache directory across all
/// requests. Create it with [`Climazin::new()`] for the defaults or
/// [`Climazin::with_config()`] to point it at another cache, endpoint or grid.
///
/// # Examples
///
/// ```rust,no_run
/// # use climazin::{Climazin, ClimateError, ChartKind};
/// # #[tokio::main]
/// # async fn main() -> Result<(), ClimateError> {
/// let client = Climazin::new().await?;
/// let chart = client.chart(ChartKind::Precipitation, "Belém", 2019).await?;
/// std::fs::write("belem_2019.svg", &chart.svg).ok();
///
/// let map = client.temperature_map().city("Belém").year(2019).call().await?;
/// assert!(map.svg.contains("Temperature map of Belém (2019)"));
/// # Ok(())
/// # }
/// ```
pub struct Climazin {
    config: ClimateConfig,
    loader: WeatherDataLoader,
    sampler: PointSampler,
    overlay: Option<Overlay>,
}

#[bon]
impl Climazin {
    /// Creates a client with [`ClimateConfig::default()`].
    ///
    /// # Errors
    ///
    /// Returns [`ClimateError::CacheDirResolution`] if the platform cache
    /// directory is unknown and [`ClimateError::CacheDirCreation`] if it
    /// cannot be created.
    pub async fn new() -> Result<Self, ClimateError> {
        Self::with_config(ClimateConfig::default()).await
    }

    /// Creates a client from an explicit configuration.
    ///
    /// The cache directory is created when missing and the overlay file, if
    /// configured, is read once here.
    pub async fn with_config(config: ClimateConfig) -> Result<Self, ClimateError> {
        let cache_dir = match &config.cache_dir {
            Some(dir) => dir.clone(),
            None => get_cache_dir().map_err(ClimateError::CacheDirResolution)?,
        };
        ensure_cache_dir_exists(&cache_dir)
            .await
            .map_err(|e| ClimateError::CacheDirCreation(cache_dir.clone(), e))?;

        let overlay = match &config.overlay_path {
            Some(path) => Some(Overlay::load(path).await?),
            None => None,
        };

        let client = Client::new();
        let loader = WeatherDataLoader::new(
            DiskCache::new(&cache_dir),
            ArchiveClient::new(client.clone(), &config.archive_url, &config.timezone),
            Geocoder::new(client, &config.geocoding_url),
        );
        info!("Using cache directory {}", cache_dir.display());

        Ok(Self {
            sampler: PointSampler::new(config.workers, config.retry),
            config,
            loader,
            overlay,
        })
    }

    pub fn config(&self) -> &ClimateConfig {
        &self.config
    }

    pub fn cache_dir(&self) -> &Path {
        self.loader.cache().root()
    }

    /// Geocodes `city`. Every call issues one request.
    pub async fn locate(&self, city: &str) -> Result<Location, ClimateError> {
        Ok(self.loader.geocoder().locate(city).await?)
    }

    /// Daily records of `city` for `year`, from the cache or the archive.
    pub async fn daily(&self, city: &str, year: i32) -> Result<DailyFrame, ClimateError> {
        Ok(self
            .loader
            .daily(&CacheKey::city(city, year, Dataset::Daily))
            .await?)
    }

    /// Monthly bar chart of `city` in `year`.
    pub async fn chart(&self, kind: ChartKind, city: &str, year: i32) -> Result<Figure, ClimateError> {
        let daily = self.daily(city, year).await?;
        Self::chart_from(kind, &daily, city, year)
    }

    /// Renders a monthly chart from an already loaded daily frame.
    pub fn chart_from(
        kind: ChartKind,
        daily: &DailyFrame,
        city: &str,
        year: i32,
    ) -> Result<Figure, ClimateError> {
        let series = match kind {
            ChartKind::Temperature => daily.monthly_mean_temperature()?,
            ChartKind::Precipitation => daily.monthly_precipitation()?,
        };
        Ok(monthly_bar_chart(kind, &series, city, year)?)
    }

    /// Mean annual temperature of every point of the sampling grid around `center`.
    pub async fn sample_temperatures(
        &self,
        center: LatLon,
        year: i32,
        grid: GridSettings,
    ) -> SampleReport<f64> {
        let points = square_grid(center, grid);
        self.sampler
            .sample(&points, |point| async move {
                let daily = self
                    .loader
                    .daily(&CacheKey::point(point, year, Dataset::Daily))
                    .await?;
                daily.mean_temperature()
            })
            .await
    }

    /// Mean wind vector of every point of the sampling grid around `center`.
    /// Points without a direction sector reaching `min_sector_hours` have no sample.
    pub async fn sample_winds(
        &self,
        center: LatLon,
        year: i32,
        grid: GridSettings,
    ) -> SampleReport<WindVector> {
        let points = square_grid(center, grid);
        let min_hours = self.config.min_sector_hours;
        self.sampler
            .sample(&points, |point| async move {
                let wind = self
                    .loader
                    .wind(&CacheKey::point(point, year, Dataset::Wind))
                    .await?;
                wind.mean_vector(min_hours)
            })
            .await
    }

    /// Interpolated mean annual temperature around `city`.
    ///
    /// A previously rendered map for the same city, year and grid is returned
    /// from the cache unless `refresh` is set. Maps whose surface has no defined
    /// cell are not cached, so a later call can try again.
    ///
    /// # Arguments
    ///
    /// * `.city(&str)`: **Required.**
    /// * `.year(i32)`: **Required.**
    /// * `.grid(GridSettings)`: Optional. Defaults to the configured temperature grid.
    /// * `.refresh(bool)`: Optional. Ignore a cached map. Defaults to `false`.
    #[builder]
    pub async fn temperature_map(
        &self,
        city: &str,
        year: i32,
        grid: Option<GridSettings>,
        refresh: Option<bool>,
    ) -> Result<Figure, ClimateError> {
        let grid = grid.unwrap_or(self.config.temperature_grid);
        let cache = self.loader.cache();
        let figure_name = temperature_figure(grid, self.config.surface_resolution);
        let figure_path = cache.figure_path(&figure_name, city, year);
        if !refresh.unwrap_or(false) {
            if let Some(svg) = cache.load_figure(&figure_path).await? {
                info!("Temperature map for {} ({}) served from cache", city, year);
                return Ok(Figure {
                    title: temperature_title(city, year),
                    svg,
                });
            }
        }

        let center = self.locate(city).await?.coordinates;
        let report = self.sample_temperatures(center, year, grid).await;
        let samples: Vec<(LatLon, f64)> = report.samples().map(|(p, v)| (p, *v)).collect();

        let spec = GridSpec::around(center, grid.half_span_deg, self.config.surface_resolution);
        let surface = interpolate_linear(&samples, &spec);
        let frame = MapFrame {
            center,
            half_span_deg: grid.half_span_deg,
            overlay: self.overlay.as_ref(),
        };
        let figure = temperature_map(&surface, &samples, &frame, city, year)?;

        if !surface.is_undefined() {
            cache.store_figure(&figure_path, figure.svg.clone()).await?;
        }
        Ok(figure)
    }

    /// Streamlines of the mean annual wind around `city`.
    ///
    /// # Arguments
    ///
    /// * `.city(&str)`: **Required.**
    /// * `.year(i32)`: **Required.**
    /// * `.grid(GridSettings)`: Optional. Defaults to the configured wind grid.
    #[builder]
    pub async fn wind_map(
        &self,
        city: &str,
        year: i32,
        grid: Option<GridSettings>,
    ) -> Result<Figure, ClimateError> {
        let center = self.locate(city).await?.coordinates;
        let grid = grid.unwrap_or(self.config.wind_grid);
        let report = self.sample_winds(center, year, grid).await;
        let samples: Vec<(LatLon, WindVector)> = report.samples().map(|(p, w)| (p, *w)).collect();

        let spec = GridSpec::around(center, grid.half_span_deg, self.config.surface_resolution);
        let field = interpolate_wind(&samples, &spec);
        let frame = MapFrame {
            center,
            half_span_deg: self.config.wind_map_half_span_deg,
            overlay: self.overlay.as_ref(),
        };
        Ok(wind_map(&field, &samples, &frame, city, year)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryPolicy;
    use crate::render::error::RenderError;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer, cache_dir: &Path) -> ClimateConfig {
        ClimateConfig::builder()
            .cache_dir(cache_dir)
            .geocoding_url(format!("{}/v1/search", server.uri()))
            .archive_url(format!("{}/v1/archive", server.uri()))
            .retry(RetryPolicy {
                attempts: 2,
                delay: Duration::from_millis(10),
            })
            .workers(3)
            .temperature_grid(GridSettings::new(3, 1.0))
            .wind_grid(GridSettings::new(3, 1.0))
            .surface_resolution(12)
            .min_sector_hours(2)
            .build()
    }

    async fn mount_geocoder(server: &MockServer, expected_calls: u64) {
        Mock::given(method("GET"))
            .and(path("/v1/search"))
            .and(query_param("name", "Natal"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{ "name": "Natal", "latitude": -5.79, "longitude": -35.21, "country": "Brazil" }]
            })))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    async fn mount_daily(server: &MockServer, expected_calls: u64) {
        Mock::given(method("GET"))
            .and(path("/v1/archive"))
            .and(query_param("daily", Dataset::Daily.archive_variables()))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "daily": {
                    "time": ["2018-01-01", "2018-01-02", "2018-07-01"],
                    "temperature_2m_max": [31.0, 30.0, 27.0],
                    "temperature_2m_min": [25.0, 24.0, 21.0],
                    "precipitation_sum": [3.0, 0.0, 80.0]
                }
            })))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn charts_share_one_cached_download() -> Result<(), ClimateError> {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().map_err(ClimateError::CacheDirResolution)?;
        mount_geocoder(&server, 1).await;
        mount_daily(&server, 1).await;

        let client = Climazin::with_config(config_for(&server, dir.path())).await?;
        let temperature = client.chart(ChartKind::Temperature, "Natal", 2018).await?;
        let precipitation = client.chart(ChartKind::Precipitation, "Natal", 2018).await?;

        assert_eq!(temperature.title, "Monthly mean temperature in Natal (2018)");
        assert!(precipitation.svg.contains("Monthly precipitation in Natal (2018)"));
        Ok(())
    }

    #[tokio::test]
    async fn temperature_map_is_cached_after_the_first_render() -> Result<(), ClimateError> {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().map_err(ClimateError::CacheDirResolution)?;
        mount_geocoder(&server, 1).await;
        // One download per grid point, none on the second call
        mount_daily(&server, 9).await;

        let client = Climazin::with_config(config_for(&server, dir.path())).await?;
        let first = client.temperature_map().city("Natal").year(2018).call().await?;
        assert_eq!(first.title, "Temperature map of Natal (2018)");
        assert!(first.svg.contains("Mean annual temperature"));

        let second = client.temperature_map().city("Natal").year(2018).call().await?;
        assert_eq!(first, second);
        assert!(client
            .cache_dir()
            .join("maps/Natal/2018/temperature_3x1.00_12.svg")
            .is_file());
        Ok(())
    }

    #[tokio::test]
    async fn grid_override_renders_a_new_map() -> Result<(), ClimateError> {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().map_err(ClimateError::CacheDirResolution)?;
        // Default grid once, then the override: a cached map must not stand in for it
        mount_geocoder(&server, 2).await;
        // 3x3 points, then 2x2 points at ±0.5° that share no cache entry with them
        mount_daily(&server, 13).await;

        let client = Climazin::with_config(config_for(&server, dir.path())).await?;
        client.temperature_map().city("Natal").year(2018).call().await?;
        let before = server.received_requests().await.map(|r| r.len());
        assert_eq!(before, Some(10));

        let fine = GridSettings::new(2, 0.5);
        client
            .temperature_map()
            .city("Natal")
            .year(2018)
            .grid(fine)
            .call()
            .await?;
        let after = server.received_requests().await.map(|r| r.len());
        assert_eq!(after, Some(15));

        // Both maps are now cached side by side
        client.temperature_map().city("Natal").year(2018).grid(fine).call().await?;
        client.temperature_map().city("Natal").year(2018).call().await?;
        assert_eq!(server.received_requests().await.map(|r| r.len()), Some(15));
        let maps = client.cache_dir().join("maps/Natal/2018");
        assert!(maps.join("temperature_3x1.00_12.svg").is_file());
        assert!(maps.join("temperature_2x0.50_12.svg").is_file());
        Ok(())
    }

    #[tokio::test]
    async fn temperature_sampling_reports_every_grid_point() -> Result<(), ClimateError> {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().map_err(ClimateError::CacheDirResolution)?;
        mount_daily(&server, 9).await;

        let client = Climazin::with_config(config_for(&server, dir.path())).await?;
        let report = client
            .sample_temperatures(LatLon(-5.79, -35.21), 2018, GridSettings::new(3, 1.0))
            .await;
        assert_eq!(report.outcomes.len(), 9);
        assert_eq!(report.sampled(), 9);
        // (28 + 27 + 24) / 3
        assert!(report.samples().all(|(_, t)| (t - 79.0 / 3.0).abs() < 1e-9));
        Ok(())
    }

    #[tokio::test]
    async fn wind_map_draws_the_sampled_flow() -> Result<(), ClimateError> {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().map_err(ClimateError::CacheDirResolution)?;
        mount_geocoder(&server, 1).await;
        Mock::given(method("GET"))
            .and(path("/v1/archive"))
            .and(query_param("hourly", Dataset::Wind.archive_variables()))
            .and(query_param("wind_speed_unit", "ms"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "hourly": {
                    "time": ["2018-01-01T00:00", "2018-01-01T01:00", "2018-01-01T02:00"],
                    "wind_speed_10m": [4.0, 4.0, 9.0],
                    "wind_direction_10m": [90.0, 95.0, 300.0]
                }
            })))
            .expect(9)
            .mount(&server)
            .await;

        let client = Climazin::with_config(config_for(&server, dir.path())).await?;
        let figure = client.wind_map().city("Natal").year(2018).call().await?;
        assert_eq!(figure.title, "Mean annual wind in Natal (2018)");
        assert!(figure.svg.contains("Wind speed (m/s)"));
        Ok(())
    }

    #[tokio::test]
    async fn unknown_city_is_reported_as_missing_data() -> Result<(), ClimateError> {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().map_err(ClimateError::CacheDirResolution)?;
        Mock::given(method("GET"))
            .and(path("/v1/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let client = Climazin::with_config(config_for(&server, dir.path())).await?;
        let chart = client.chart(ChartKind::Temperature, "Atlantis", 2018).await;
        assert!(chart.is_err_and(|e| e.is_data_not_found()));
        let map = client.temperature_map().city("Atlantis").year(2018).call().await;
        assert!(map.is_err_and(|e| e.is_data_not_found()));
        Ok(())
    }

    #[tokio::test]
    async fn missing_overlay_file_fails_construction() -> Result<(), ClimateError> {
        let dir = tempfile::tempdir().map_err(ClimateError::CacheDirResolution)?;
        let config = ClimateConfig::builder()
            .cache_dir(dir.path())
            .overlay_path(dir.path().join("coast.geojson"))
            .build();
        let result = Climazin::with_config(config).await;
        assert!(matches!(
            result,
            Err(ClimateError::Render(RenderError::OverlayRead(..)))
        ));
        Ok(())
    }
}
