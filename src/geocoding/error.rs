use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("No coordinates found for city '{0}'")]
    LocationNotFound(String),

    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to parse geocoding response from {0}")]
    JsonParse(String, #[source] reqwest::Error),
}
