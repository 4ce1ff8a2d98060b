//! Flat-file cache for archive data and rendered figures.
//!
//! Every tabular entry is a parquet file plus a small JSON manifest next to
//! it. The manifest is written last and acts as the commit marker: an entry
//! without a manifest, with a manifest for another dataset, another schema
//! version or another column layout is treated as a miss and rebuilt.
//! There is no expiry; a valid entry is authoritative until deleted.

use crate::types::cache_key::{path_safe_name, CacheKey};
use crate::types::dataset::{Dataset, SCHEMA_VERSION};
use crate::types::location::LatLon;
use crate::weather_data::error::WeatherDataError;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::{fs, task};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct CacheManifest {
    pub dataset: Dataset,
    pub schema_version: u32,
    pub columns: Vec<String>,
    pub rows: usize,
    pub location: Option<LatLon>,
    pub written_at: DateTime<Utc>,
}

impl CacheManifest {
    /// Reason the manifest can not be trusted for `dataset`, if any.
    fn stale_reason(&self, dataset: Dataset) -> Option<String> {
        if self.dataset != dataset {
            return Some(format!("manifest describes {} data", self.dataset));
        }
        if self.schema_version != SCHEMA_VERSION {
            return Some(format!(
                "schema version {} (current is {})",
                self.schema_version, SCHEMA_VERSION
            ));
        }
        let expected = dataset.schema_column_names();
        if self.columns.iter().map(String::as_str).ne(expected.iter().copied()) {
            return Some(format!("columns {:?} (expected {:?})", self.columns, expected));
        }
        None
    }
}

#[derive(Debug, Clone)]
pub struct DiskCache {
    root: PathBuf,
}

impl DiskCache {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn data_path(&self, key: &CacheKey) -> PathBuf {
        self.root
            .join(key.relative_dir())
            .join(format!("{}.parquet", key.dataset.file_stem()))
    }

    pub fn manifest_path(&self, key: &CacheKey) -> PathBuf {
        self.root
            .join(key.relative_dir())
            .join(format!("{}.meta.json", key.dataset.file_stem()))
    }

    /// Path of a previously rendered figure for a city and year.
    pub fn figure_path(&self, figure: &str, city: &str, year: i32) -> PathBuf {
        self.root
            .join("maps")
            .join(path_safe_name(city))
            .join(year.to_string())
            .join(format!("{}.svg", figure))
    }

    /// Returns the parquet path of a valid entry for `key`, or `None` when the
    /// entry is missing or stale.
    pub async fn lookup(&self, key: &CacheKey) -> Option<PathBuf> {
        let manifest_path = self.manifest_path(key);
        let bytes = match fs::read(&manifest_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No manifest for {} at {:?}", key, manifest_path);
                return None;
            }
            Err(e) => {
                warn!("Failed to read manifest {:?}: {}", manifest_path, e);
                return None;
            }
        };

        let manifest: CacheManifest = match serde_json::from_slice(&bytes) {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!("Unreadable manifest for {}, rebuilding: {}", key, e);
                return None;
            }
        };
        if let Some(reason) = manifest.stale_reason(key.dataset) {
            warn!("Stale cache entry for {}: {}. Rebuilding.", key, reason);
            return None;
        }

        let data_path = self.data_path(key);
        if fs::metadata(&data_path).await.is_err() {
            warn!("Manifest for {} has no data file at {:?}", key, data_path);
            return None;
        }
        Some(data_path)
    }

    /// Writes `df` and its manifest for `key`, replacing any previous entry.
    /// Both files go through a temporary file in the target directory so an
    /// interrupted write never leaves a valid-looking entry behind.
    pub async fn store(
        &self,
        key: &CacheKey,
        df: DataFrame,
        location: Option<LatLon>,
    ) -> Result<PathBuf, WeatherDataError> {
        let dir = self.root.join(key.relative_dir());
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| WeatherDataError::CacheDirCreation(dir.clone(), e))?;

        let manifest = CacheManifest {
            dataset: key.dataset,
            schema_version: SCHEMA_VERSION,
            columns: df
                .get_column_names()
                .iter()
                .map(|c| c.to_string())
                .collect(),
            rows: df.height(),
            location,
            written_at: Utc::now(),
        };

        let data_path = self.data_path(key);
        let manifest_path = self.manifest_path(key);
        let written = data_path.clone();
        task::spawn_blocking(move || {
            write_parquet(df, &dir, &data_path)?;
            let json = serde_json::to_vec_pretty(&manifest)
                .map_err(|e| WeatherDataError::ManifestEncode(manifest_path.clone(), e))?;
            write_atomically(&dir, &manifest_path, &json)
        })
        .await??;

        info!("Cached {} to {:?}", key, written);
        Ok(written)
    }

    /// Reads a cached figure, `None` when it has not been rendered yet.
    pub async fn load_figure(&self, path: &Path) -> Result<Option<String>, WeatherDataError> {
        match fs::read_to_string(path).await {
            Ok(svg) => Ok(Some(svg)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(WeatherDataError::FigureRead(path.to_path_buf(), e)),
        }
    }

    pub async fn store_figure(&self, path: &Path, svg: String) -> Result<(), WeatherDataError> {
        let dir = match path.parent() {
            Some(dir) => dir.to_path_buf(),
            None => self.root.clone(),
        };
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| WeatherDataError::CacheDirCreation(dir.clone(), e))?;
        let path_buf = path.to_path_buf();
        task::spawn_blocking(move || write_atomically(&dir, &path_buf, svg.as_bytes())).await??;
        info!("Cached figure to {:?}", path);
        Ok(())
    }
}

fn write_parquet(mut df: DataFrame, dir: &Path, path: &Path) -> Result<(), WeatherDataError> {
    let mut temp = NamedTempFile::new_in(dir)
        .map_err(|e| WeatherDataError::CacheWriteIo(path.to_path_buf(), e))?;
    ParquetWriter::new(temp.as_file_mut())
        .with_compression(ParquetCompression::Snappy)
        .finish(&mut df)
        .map_err(|e| WeatherDataError::ParquetWritePolars(path.to_path_buf(), e))?;
    temp.persist(path)
        .map_err(|e| WeatherDataError::CacheWriteIo(path.to_path_buf(), e.error))?;
    Ok(())
}

fn write_atomically(dir: &Path, path: &Path, bytes: &[u8]) -> Result<(), WeatherDataError> {
    let mut temp = NamedTempFile::new_in(dir)
        .map_err(|e| WeatherDataError::CacheWriteIo(path.to_path_buf(), e))?;
    temp.write_all(bytes)
        .and_then(|_| temp.flush())
        .map_err(|e| WeatherDataError::CacheWriteIo(path.to_path_buf(), e))?;
    temp.persist(path)
        .map_err(|e| WeatherDataError::CacheWriteIo(path.to_path_buf(), e.error))?;
    Ok(())
}
