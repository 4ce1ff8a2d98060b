use crate::geocoding::error::GeocodeError;
use crate::types::dataset::Dataset;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WeatherDataError {
    #[error(transparent)]
    Geocode(#[from] GeocodeError),

    #[error("Failed to create cache directory '{0}'")]
    CacheDirCreation(PathBuf, #[source] std::io::Error),

    // Errors during parquet/manifest writing (inside blocking task)
    #[error("I/O error writing cache file '{0}'")]
    CacheWriteIo(PathBuf, #[source] std::io::Error),
    #[error("Encoding error writing parquet cache file '{0}'")]
    ParquetWritePolars(PathBuf, #[source] PolarsError),
    #[error("Failed to encode cache manifest '{0}'")]
    ManifestEncode(PathBuf, #[source] serde_json::Error),

    #[error("Failed to scan parquet cache file '{0}'")]
    ParquetScan(PathBuf, #[source] PolarsError),

    #[error("Failed to read cached figure '{0}'")]
    FigureRead(PathBuf, #[source] std::io::Error),

    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to parse archive response from {0}")]
    JsonParse(String, #[source] reqwest::Error),

    // The upstream answered, but without the block we asked for
    #[error("No '{field}' data found in the archive response for {dataset} data ({year})")]
    DataNotFound {
        field: &'static str,
        dataset: Dataset,
        year: i32,
    },

    #[error("Invalid timestamp '{value}' in archive response")]
    InvalidTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("Failed processing DataFrame: {0}")]
    DataFrameProcessing(#[from] PolarsError),
}

impl WeatherDataError {
    /// True for an HTTP 429 answer, the only error the point sampler retries.
    pub fn is_rate_limited(&self) -> bool {
        matches!(
            self,
            WeatherDataError::HttpStatus { status, .. } if *status == reqwest::StatusCode::TOO_MANY_REQUESTS
        )
    }

    /// True when the upstream had nothing for the request: an unknown city
    /// or an archive response without the expected top-level field.
    pub fn is_data_not_found(&self) -> bool {
        matches!(
            self,
            WeatherDataError::DataNotFound { .. }
                | WeatherDataError::Geocode(GeocodeError::LocationNotFound(_))
        )
    }
}
