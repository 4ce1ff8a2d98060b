//! Defines the kinds of tabular data the archive provides and the schema each
//! one is cached with.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Version of the on-disk column layout. Bump whenever a schema below changes
/// so that older cache entries are rebuilt instead of being trusted.
pub(crate) const SCHEMA_VERSION: u32 = 1;

/// The kind of data requested from the weather archive for one year.
///
/// Each variant maps onto one archive request (`daily=` or `hourly=` fields)
/// and one cached parquet file with a fixed column layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dataset {
    /// One row per day: max/min/mean temperature and precipitation sum.
    Daily,
    /// One row per hour: wind speed, direction and the derived (u, v) components.
    Wind,
}

impl Dataset {
    /// File stem used for both the parquet data file and its manifest.
    pub(crate) fn file_stem(&self) -> &'static str {
        match self {
            Dataset::Daily => "daily",
            Dataset::Wind => "wind",
        }
    }

    /// Name of the top-level field the archive response must contain.
    pub(crate) fn response_field(&self) -> &'static str {
        match self {
            Dataset::Daily => "daily",
            Dataset::Wind => "hourly",
        }
    }

    /// Comma separated list of archive variables requested for this dataset.
    pub(crate) fn archive_variables(&self) -> &'static str {
        match self {
            Dataset::Daily => "temperature_2m_max,temperature_2m_min,precipitation_sum",
            Dataset::Wind => "wind_speed_10m,wind_direction_10m",
        }
    }

    pub(crate) fn schema_column_names(&self) -> Vec<&'static str> {
        match self {
            Dataset::Daily => vec!["date", "temp_max", "temp_min", "temp", "precipitation"],
            Dataset::Wind => vec![
                "time",
                "speed",
                "direction",
                "u",
                "v",
                "latitude",
                "longitude",
            ],
        }
    }
}

/// Allows formatting a `Dataset` variant using its file stem.
///
/// # Examples
///
/// ```
/// use climazin::Dataset;
///
/// assert_eq!(Dataset::Daily.to_string(), "daily");
/// assert_eq!(format!("{}", Dataset::Wind), "wind");
/// ```
impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file_stem())
    }
}
