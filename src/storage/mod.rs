//! Storage backends for the time-series archive.
//!
//! The retrieval engine only talks to the archive through [`SeriesStore`]: resolve a
//! series, scan an ordered range of samples under a version mode, count that range,
//! and list or count catalog entries. The write-side operations exist so an archive
//! can be populated and maintained through the same handle.
//!
//! Backends:
//! - `duckdb`: embedded DuckDB database, in memory or on disk

pub mod duckdb;

use self::duckdb::DuckDbStore;
use crate::config::StorageConfig;
use crate::error::{Error, Result};
use crate::series_id::{Interval, SeriesIdentifier};
use crate::version::VersionMode;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Quality code reported for a slot with no recorded sample.
pub const QUALITY_MISSING: i32 = 5;

/// One row of a trace. `value` is `None` where nothing is recorded under the selected version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Sample {
    pub date_time: DateTime<Utc>,
    pub value: Option<f64>,
    #[serde(default)]
    pub quality_code: i32,
}

impl Sample {
    pub fn new(date_time: DateTime<Utc>, value: f64) -> Self {
        Self {
            date_time,
            value: Some(value),
            quality_code: 0,
        }
    }

    pub fn missing(date_time: DateTime<Utc>) -> Self {
        Self {
            date_time,
            value: None,
            quality_code: QUALITY_MISSING,
        }
    }
}

/// A catalog listing row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct CatalogEntry {
    pub office: String,
    pub name: String,
    pub units: String,
}

/// A resolved series as the store knows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesHandle {
    pub office_id: String,
    pub series_id: String,
    pub storage_unit: String,
    pub interval: Interval,
    pub versioned: bool,
}

impl SeriesHandle {
    pub fn base_parameter(&self) -> String {
        self.series_id
            .parse::<SeriesIdentifier>()
            .map(|id| id.base_parameter().to_string())
            .unwrap_or_default()
    }
}

/// What is needed to register a new series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesDefinition {
    pub office_id: String,
    pub series_id: String,
    pub storage_unit: String,
    pub versioned: bool,
}

/// Storage backend trait for the versioned time-series archive.
#[async_trait]
pub trait SeriesStore: Send + Sync + 'static {
    /// Initialize the storage backend.
    async fn init(&self) -> Result<()>;

    /// Look a series up case-insensitively. Without an office the first office holding
    /// the identifier wins.
    async fn resolve_series(&self, series_id: &str, office: Option<&str>) -> Result<SeriesHandle>;

    /// Samples in `[lower, upper]` in ascending time order, in `unit`, at most `limit` rows.
    async fn query_samples(
        &self,
        series: &SeriesHandle,
        unit: &str,
        mode: &VersionMode,
        lower: DateTime<Utc>,
        upper: DateTime<Utc>,
        limit: Option<usize>,
    ) -> Result<Vec<Sample>>;

    /// Number of rows `query_samples` would return without a limit.
    async fn count_samples(
        &self,
        series: &SeriesHandle,
        unit: &str,
        mode: &VersionMode,
        lower: DateTime<Utc>,
        upper: DateTime<Utc>,
    ) -> Result<u64>;

    /// Catalog rows ordered by identifier, case-insensitively, strictly after `after`.
    async fn list_catalog_entries(
        &self,
        office: Option<&str>,
        after: Option<&str>,
        limit: usize,
    ) -> Result<Vec<CatalogEntry>>;

    async fn count_catalog_entries(&self, office: Option<&str>) -> Result<u64>;

    async fn series_exists(&self, series_id: &str, office: Option<&str>) -> Result<bool>;

    async fn create_series(&self, definition: &SeriesDefinition) -> Result<SeriesHandle>;

    /// Replace the samples of one version between the first and last incoming timestamps.
    ///
    /// Samples of a regular series must sit on its interval grid; the first write to the
    /// series fixes where that grid lies.
    async fn store_samples(
        &self,
        series: &SeriesHandle,
        unit: &str,
        version_date: Option<DateTime<Utc>>,
        samples: &[Sample],
    ) -> Result<usize>;

    /// Blank out recorded samples of one version in `[lower, upper]`.
    async fn delete_samples(
        &self,
        series: &SeriesHandle,
        version_date: Option<DateTime<Utc>>,
        lower: DateTime<Utc>,
        upper: DateTime<Utc>,
    ) -> Result<usize>;
}

/// Open the backend named in the storage configuration.
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn SeriesStore>> {
    let store: Arc<dyn SeriesStore> = match config.engine.as_str() {
        "duckdb" => Arc::new(DuckDbStore::new_with_options(
            &config.connection,
            &config.options,
        )?),
        other => {
            return Err(Error::Config(format!(
                "Unsupported storage engine '{}' (supported: duckdb)",
                other
            )))
        }
    };
    store.init().await?;
    Ok(store)
}
