use crate::geocoding::geocoder::Geocoder;
use crate::types::cache_key::{CacheKey, Subject};
use crate::types::location::LatLon;
use crate::weather_data::archive::ArchiveClient;
use crate::weather_data::cache::DiskCache;
use crate::weather_data::error::WeatherDataError;
use crate::weather_data::frames::{DailyFrame, WindFrame};
use log::{info, warn};
use polars::prelude::*;

/// Cache-or-fetch access to yearly archive data.
///
/// A valid cache entry is returned without touching the network. On a miss
/// the subject is resolved to coordinates (geocoding a city, using a grid
/// point as is), one year is downloaded, written to the cache and then read
/// back from disk, so a hit and a miss return identical content.
pub struct WeatherDataLoader {
    cache: DiskCache,
    archive: ArchiveClient,
    geocoder: Geocoder,
}

impl WeatherDataLoader {
    pub fn new(cache: DiskCache, archive: ArchiveClient, geocoder: Geocoder) -> Self {
        Self {
            cache,
            archive,
            geocoder,
        }
    }

    pub fn cache(&self) -> &DiskCache {
        &self.cache
    }

    pub fn geocoder(&self) -> &Geocoder {
        &self.geocoder
    }

    /// Loads the frame for `key`, downloading it on a cache miss.
    ///
    /// A failed download leaves no cache entry behind, so the next call
    /// simply tries again.
    pub async fn get_frame(&self, key: &CacheKey) -> Result<LazyFrame, WeatherDataError> {
        let parquet_path = match self.cache.lookup(key).await {
            Some(path) => {
                info!("Cache hit for {} at {:?}", key, path);
                path
            }
            None => {
                warn!("Cache miss for {}. Downloading and processing.", key);
                let coordinates = self.resolve(key).await?;
                let df = self
                    .archive
                    .fetch(key.dataset, coordinates, key.year)
                    .await?;
                self.cache.store(key, df, Some(coordinates)).await?
            }
        };

        LazyFrame::scan_parquet(&parquet_path, Default::default())
            .map_err(|e| WeatherDataError::ParquetScan(parquet_path.clone(), e))
    }

    pub async fn daily(&self, key: &CacheKey) -> Result<DailyFrame, WeatherDataError> {
        Ok(DailyFrame::new(self.get_frame(key).await?))
    }

    pub async fn wind(&self, key: &CacheKey) -> Result<WindFrame, WeatherDataError> {
        Ok(WindFrame::new(self.get_frame(key).await?))
    }

    async fn resolve(&self, key: &CacheKey) -> Result<LatLon, WeatherDataError> {
        match &key.subject {
            Subject::City(name) => Ok(self.geocoder.locate(name).await?.coordinates),
            Subject::Point(point) => Ok(*point),
        }
    }
}
