//! Resolves a free-text city name to coordinates with a single HTTP GET.
//!
//! Results are deliberately not cached: every call issues one request and
//! uses the best (first) match.

use crate::geocoding::error::GeocodeError;
use crate::types::location::{LatLon, Location};
use log::{debug, info, warn};
use reqwest::Client;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    // Absent (not empty) when nothing matches
    results: Option<Vec<GeocodedPlace>>,
}

#[derive(Debug, Deserialize)]
struct GeocodedPlace {
    name: String,
    latitude: f64,
    longitude: f64,
    country: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Geocoder {
    client: Client,
    base_url: String,
}

impl Geocoder {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
        }
    }

    /// Looks up `city` and returns the best match.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::LocationNotFound`] when the service answers
    /// without results, and the network/HTTP/JSON variants otherwise.
    pub async fn locate(&self, city: &str) -> Result<Location, GeocodeError> {
        let url = self.base_url.clone();
        debug!("Geocoding '{}' via {}", city, url);

        let response = self
            .client
            .get(&url)
            .query(&[("name", city), ("count", "1")])
            .send()
            .await
            .map_err(|e| GeocodeError::NetworkRequest(url.clone(), e))?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                warn!("HTTP error geocoding '{}': {:?}", city, e);
                return Err(if let Some(status) = e.status() {
                    GeocodeError::HttpStatus {
                        url,
                        status,
                        source: e,
                    }
                } else {
                    GeocodeError::NetworkRequest(url, e)
                });
            }
        };

        let body: GeocodingResponse = response
            .json()
            .await
            .map_err(|e| GeocodeError::JsonParse(url.clone(), e))?;

        let place = body
            .results
            .and_then(|results| results.into_iter().next())
            .ok_or_else(|| GeocodeError::LocationNotFound(city.to_string()))?;

        info!(
            "Geocoded '{}' to {} ({}, {})",
            city, place.name, place.latitude, place.longitude
        );
        Ok(Location {
            name: place.name,
            country: place.country,
            coordinates: LatLon(place.latitude, place.longitude),
        })
    }
}
