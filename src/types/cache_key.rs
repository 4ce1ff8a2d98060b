use crate::types::dataset::Dataset;
use crate::types::location::LatLon;
use std::fmt;
use std::path::PathBuf;

/// What a cache entry describes: a named city (resolved through the geocoder
/// on a miss) or a bare grid point whose coordinates are already known.
#[derive(Debug, Clone, PartialEq)]
pub enum Subject {
    City(String),
    Point(LatLon),
}

/// The (subject, year, dataset) tuple that determines where a cache entry lives.
///
/// # Examples
///
/// ```
/// use climazin::{CacheKey, Dataset};
///
/// let key = CacheKey::city("Porto Alegre", 2015, Dataset::Daily);
/// assert_eq!(key.to_string(), "daily data for Porto Alegre in 2015");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CacheKey {
    pub subject: Subject,
    pub year: i32,
    pub dataset: Dataset,
}

impl CacheKey {
    pub fn city(name: &str, year: i32, dataset: Dataset) -> Self {
        Self {
            subject: Subject::City(name.to_string()),
            year,
            dataset,
        }
    }

    pub fn point(point: LatLon, year: i32, dataset: Dataset) -> Self {
        Self {
            subject: Subject::Point(point),
            year,
            dataset,
        }
    }

    /// Directory of the entry, relative to the cache root.
    pub(crate) fn relative_dir(&self) -> PathBuf {
        match &self.subject {
            Subject::City(name) => PathBuf::from("cities")
                .join(path_safe_name(name))
                .join(self.year.to_string()),
            Subject::Point(point) => PathBuf::from("points")
                .join(point.cache_label())
                .join(self.year.to_string()),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.subject {
            Subject::City(name) => write!(f, "{} data for {} in {}", self.dataset, name, self.year),
            Subject::Point(point) => {
                write!(f, "{} data for point {} in {}", self.dataset, point, self.year)
            }
        }
    }
}

/// Turns a free-text city name into a single path component.
pub(crate) fn path_safe_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' | ':' => '_',
            c => c,
        })
        .collect()
}
