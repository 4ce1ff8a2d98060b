//! Client for the historical weather archive.
//!
//! One call fetches a full calendar year of either daily aggregates or hourly
//! wind for a single coordinate, and normalises the column-oriented JSON
//! answer into a polars `DataFrame` with the schema of the requested
//! [`Dataset`].

use crate::types::dataset::Dataset;
use crate::types::location::LatLon;
use crate::weather_data::error::WeatherDataError;
use chrono::{NaiveDate, NaiveDateTime};
use log::{debug, info, warn};
use polars::prelude::*;
use reqwest::Client;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct ArchiveResponse {
    daily: Option<DailyBlock>,
    hourly: Option<HourlyBlock>,
}

/// Column-oriented daily block. Missing variables deserialize as empty and
/// are treated as all-null.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct DailyBlock {
    #[serde(default)]
    time: Vec<String>,
    #[serde(default)]
    temperature_2m_max: Vec<Option<f64>>,
    #[serde(default)]
    temperature_2m_min: Vec<Option<f64>>,
    #[serde(default)]
    precipitation_sum: Vec<Option<f64>>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct HourlyBlock {
    #[serde(default)]
    time: Vec<String>,
    #[serde(default)]
    wind_speed_10m: Vec<Option<f64>>,
    #[serde(default)]
    wind_direction_10m: Vec<Option<f64>>,
}

#[derive(Debug, Clone)]
pub struct ArchiveClient {
    client: Client,
    base_url: String,
    timezone: String,
}

impl ArchiveClient {
    pub fn new(client: Client, base_url: &str, timezone: &str) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
            timezone: timezone.to_string(),
        }
    }

    /// Downloads one year of `dataset` for `coordinates` and returns it as a
    /// `DataFrame` with the dataset's cache schema.
    ///
    /// # Errors
    ///
    /// * [`WeatherDataError::HttpStatus`] for any non-2xx answer (429 included,
    ///   retrying is the caller's decision).
    /// * [`WeatherDataError::DataNotFound`] when the answer lacks the
    ///   `daily`/`hourly` block or the block holds no timestamps.
    pub async fn fetch(
        &self,
        dataset: Dataset,
        coordinates: LatLon,
        year: i32,
    ) -> Result<DataFrame, WeatherDataError> {
        let url = self.base_url.clone();
        let start_date = format!("{:04}-01-01", year);
        let end_date = format!("{:04}-12-31", year);
        let latitude = coordinates.lat().to_string();
        let longitude = coordinates.lon().to_string();

        let mut query = vec![
            ("latitude", latitude.as_str()),
            ("longitude", longitude.as_str()),
            ("start_date", start_date.as_str()),
            ("end_date", end_date.as_str()),
            (dataset.response_field(), dataset.archive_variables()),
            ("timezone", self.timezone.as_str()),
        ];
        if dataset == Dataset::Wind {
            query.push(("wind_speed_unit", "ms"));
        }

        info!(
            "Downloading {} data for {} ({}) from {}",
            dataset, coordinates, year, url
        );
        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| WeatherDataError::NetworkRequest(url.clone(), e))?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                warn!("HTTP error for {}: {:?}", url, e);
                return Err(if let Some(status) = e.status() {
                    WeatherDataError::HttpStatus {
                        url,
                        status,
                        source: e,
                    }
                } else {
                    WeatherDataError::NetworkRequest(url, e)
                });
            }
        };

        let body: ArchiveResponse = response
            .json()
            .await
            .map_err(|e| WeatherDataError::JsonParse(url.clone(), e))?;

        let not_found = || WeatherDataError::DataNotFound {
            field: dataset.response_field(),
            dataset,
            year,
        };

        let df = match dataset {
            Dataset::Daily => {
                let block = body.daily.filter(|b| !b.time.is_empty()).ok_or_else(not_found)?;
                daily_frame(&block)?
            }
            Dataset::Wind => {
                let block = body.hourly.filter(|b| !b.time.is_empty()).ok_or_else(not_found)?;
                wind_frame(&block, coordinates)?
            }
        };
        debug!("Normalised {} rows of {} data", df.height(), dataset);
        Ok(df)
    }
}

/// Value at `idx`, or null when the variable is shorter than the time axis.
fn value_at(values: &[Option<f64>], idx: usize) -> Option<f64> {
    values.get(idx).copied().flatten()
}

/// Mean of the available values, skipping nulls.
fn mean_of(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some((a + b) / 2.0),
        (Some(x), None) | (None, Some(x)) => Some(x),
        (None, None) => None,
    }
}

pub(crate) fn daily_frame(block: &DailyBlock) -> Result<DataFrame, WeatherDataError> {
    // 1970-01-01
    let epoch = NaiveDate::default();
    let days = block
        .time
        .iter()
        .map(|t| {
            NaiveDate::parse_from_str(t, "%Y-%m-%d")
                .map(|d| d.signed_duration_since(epoch).num_days() as i32)
                .map_err(|source| WeatherDataError::InvalidTimestamp {
                    value: t.clone(),
                    source,
                })
        })
        .collect::<Result<Vec<i32>, _>>()?;

    let n = days.len();
    let temp_max: Vec<Option<f64>> = (0..n).map(|i| value_at(&block.temperature_2m_max, i)).collect();
    let temp_min: Vec<Option<f64>> = (0..n).map(|i| value_at(&block.temperature_2m_min, i)).collect();
    let temp: Vec<Option<f64>> = temp_max
        .iter()
        .zip(&temp_min)
        .map(|(max, min)| mean_of(*max, *min))
        .collect();
    let precipitation: Vec<Option<f64>> =
        (0..n).map(|i| value_at(&block.precipitation_sum, i)).collect();

    let df = df!(
        "date" => days,
        "temp_max" => temp_max,
        "temp_min" => temp_min,
        "temp" => temp,
        "precipitation" => precipitation,
    )?;

    // Days since epoch -> Date
    let df = df
        .lazy()
        .with_column(col("date").cast(DataType::Date))
        .collect()?;
    Ok(df)
}

pub(crate) fn wind_frame(
    block: &HourlyBlock,
    coordinates: LatLon,
) -> Result<DataFrame, WeatherDataError> {
    let millis = block
        .time
        .iter()
        .map(|t| {
            NaiveDateTime::parse_from_str(t, "%Y-%m-%dT%H:%M")
                .map(|dt| dt.and_utc().timestamp_millis())
                .map_err(|source| WeatherDataError::InvalidTimestamp {
                    value: t.clone(),
                    source,
                })
        })
        .collect::<Result<Vec<i64>, _>>()?;

    let n = millis.len();
    let speed: Vec<Option<f64>> = (0..n).map(|i| value_at(&block.wind_speed_10m, i)).collect();
    let direction: Vec<Option<f64>> =
        (0..n).map(|i| value_at(&block.wind_direction_10m, i)).collect();

    // Meteorological convention: direction is where the wind blows *from*
    let (u, v): (Vec<Option<f64>>, Vec<Option<f64>>) = speed
        .iter()
        .zip(&direction)
        .map(|(s, d)| match (s, d) {
            (Some(s), Some(d)) => {
                let rad = d.to_radians();
                (Some(-s * rad.sin()), Some(-s * rad.cos()))
            }
            _ => (None, None),
        })
        .unzip();

    let df = df!(
        "time" => millis,
        "speed" => speed,
        "direction" => direction,
        "u" => u,
        "v" => v,
        "latitude" => vec![coordinates.lat(); n],
        "longitude" => vec![coordinates.lon(); n],
    )?;

    let df = df
        .lazy()
        .with_column(col("time").cast(DataType::Datetime(TimeUnit::Milliseconds, None)))
        .collect()?;
    Ok(df)
}
