use crate::geocoding::error::GeocodeError;
use crate::render::error::RenderError;
use crate::weather_data::error::WeatherDataError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClimateError {
    #[error(transparent)]
    WeatherData(#[from] WeatherDataError),

    #[error(transparent)]
    Geocode(#[from] GeocodeError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("Failed to create cache directory '{0}'")]
    CacheDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to determine cache directory")]
    CacheDirResolution(#[source] std::io::Error),

    #[error("Invalid selection: {0}")]
    InvalidSelection(String),
}

impl ClimateError {
    /// True when the failure means "upstream has no data for this request"
    /// rather than a transport, cache or rendering problem.
    pub fn is_data_not_found(&self) -> bool {
        match self {
            ClimateError::WeatherData(e) => e.is_data_not_found(),
            ClimateError::Geocode(GeocodeError::LocationNotFound(_)) => true,
            _ => false,
        }
    }
}
