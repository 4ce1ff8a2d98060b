//! Geographic coordinate types shared by the geocoder, the cache and the samplers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents a geographical coordinate using latitude and longitude.
///
/// Latitude is the first element (index 0), and longitude is the second (index 1).
/// Both values are degrees as `f64`.
///
/// # Examples
///
/// ```
/// use climazin::LatLon;
///
/// let recife = LatLon(-8.05389, -34.88111);
/// assert_eq!(recife.lat(), -8.05389);
/// assert_eq!(recife.lon(), -34.88111);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon(pub f64, pub f64);

impl LatLon {
    pub fn lat(self) -> f64 {
        self.0
    }

    pub fn lon(self) -> f64 {
        self.1
    }

    /// Label used in cache paths. Coordinates are rounded to 4 decimals (~11 m)
    /// so that grid points generated from the same center map onto the same file.
    pub(crate) fn cache_label(self) -> String {
        format!("{:.4}_{:.4}", self.0, self.1)
    }
}

impl fmt::Display for LatLon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4})", self.0, self.1)
    }
}

/// A geocoded city: the best match returned for a free-text name.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    /// Name as returned by the geocoding service.
    pub name: String,
    pub country: Option<String>,
    /// The city center used as anchor for charts and sampling grids.
    pub coordinates: LatLon,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_label_rounds_to_four_decimals() {
        assert_eq!(LatLon(-23.550520, -46.633308).cache_label(), "-23.5505_-46.6333");
        assert_eq!(LatLon(1.0, 2.0).cache_label(), "1.0000_2.0000");
    }
}
