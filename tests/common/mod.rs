//! Common test utilities for tidewater integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tidewater_core::config::PagingConfig;
use tidewater_core::series_id::Interval;
use tidewater_core::storage::duckdb::DuckDbStore;
use tidewater_core::storage::{
    CatalogEntry, Sample, SeriesDefinition, SeriesHandle, SeriesStore,
};
use tidewater_core::{Error, Result, TimeSeriesService, VersionMode};

pub const OFFICE: &str = "SWT";

/// 2008-05-01 at the given UTC hour and minute.
pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2008, 5, 1, hour, minute, 0).unwrap()
}

pub fn memory_store() -> Arc<DuckDbStore> {
    Arc::new(DuckDbStore::new_in_memory().expect("in-memory DuckDB"))
}

pub fn service_over(store: Arc<dyn SeriesStore>) -> TimeSeriesService {
    TimeSeriesService::new(store, PagingConfig::default())
}

pub async fn create_series(
    store: &DuckDbStore,
    name: &str,
    unit: &str,
    versioned: bool,
) -> SeriesHandle {
    store
        .create_series(&SeriesDefinition {
            office_id: OFFICE.to_string(),
            series_id: name.to_string(),
            storage_unit: unit.to_string(),
            versioned,
        })
        .await
        .expect("create series")
}

/// Store consecutive samples `step` apart starting at `start`.
pub async fn seed(
    store: &DuckDbStore,
    series: &SeriesHandle,
    version_date: Option<DateTime<Utc>>,
    start: DateTime<Utc>,
    step: Duration,
    values: &[Option<f64>],
) {
    let samples: Vec<Sample> = values
        .iter()
        .enumerate()
        .map(|(i, value)| {
            let date_time = start + step * i as i32;
            match value {
                Some(v) => Sample::new(date_time, *v),
                None => Sample::missing(date_time),
            }
        })
        .collect();
    store
        .store_samples(series, &series.storage_unit, version_date, &samples)
        .await
        .expect("store samples");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Nothing,
    Everything,
    /// Resolve succeeds, the count fails.
    CountQuery,
    /// Resolve and count succeed, the value query fails.
    ValueQuery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Lookup,
    Count,
    Rows,
}

/// A store that records how often it is called and fails on demand.
pub struct MockStore {
    calls: AtomicUsize,
    row_queries: AtomicUsize,
    failure: Failure,
}

impl MockStore {
    pub fn new(failure: Failure) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            row_queries: AtomicUsize::new(0),
            failure,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Calls that fetch or write rows, as opposed to lookups and counts.
    pub fn row_queries(&self) -> usize {
        self.row_queries.load(Ordering::SeqCst)
    }

    fn enter(&self, stage: Stage) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if stage == Stage::Rows {
            self.row_queries.fetch_add(1, Ordering::SeqCst);
        }
        match (self.failure, stage) {
            (Failure::Everything, _) => Err(Error::StoreUnavailable("connection refused".into())),
            (Failure::CountQuery, Stage::Count) => {
                Err(Error::StoreUnavailable("count timed out".into()))
            }
            (Failure::ValueQuery, Stage::Rows) => {
                Err(Error::StoreUnavailable("query timed out".into()))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl SeriesStore for MockStore {
    async fn init(&self) -> Result<()> {
        Ok(())
    }

    async fn resolve_series(&self, series_id: &str, office: Option<&str>) -> Result<SeriesHandle> {
        self.enter(Stage::Lookup)?;
        Ok(SeriesHandle {
            office_id: office.unwrap_or(OFFICE).to_string(),
            series_id: series_id.to_string(),
            storage_unit: "cfs".to_string(),
            interval: Interval::Minutes(60),
            versioned: false,
        })
    }

    async fn query_samples(
        &self,
        _series: &SeriesHandle,
        _unit: &str,
        _mode: &VersionMode,
        lower: DateTime<Utc>,
        _upper: DateTime<Utc>,
        limit: Option<usize>,
    ) -> Result<Vec<Sample>> {
        self.enter(Stage::Rows)?;
        let rows = limit.unwrap_or(10).min(10);
        Ok((0..rows)
            .map(|i| Sample::new(lower + Duration::hours(i as i64), 1.0))
            .collect())
    }

    async fn count_samples(
        &self,
        _series: &SeriesHandle,
        _unit: &str,
        _mode: &VersionMode,
        _lower: DateTime<Utc>,
        _upper: DateTime<Utc>,
    ) -> Result<u64> {
        self.enter(Stage::Count)?;
        Ok(10)
    }

    async fn list_catalog_entries(
        &self,
        _office: Option<&str>,
        _after: Option<&str>,
        _limit: usize,
    ) -> Result<Vec<CatalogEntry>> {
        self.enter(Stage::Rows)?;
        Ok(Vec::new())
    }

    async fn count_catalog_entries(&self, _office: Option<&str>) -> Result<u64> {
        self.enter(Stage::Count)?;
        Ok(0)
    }

    async fn series_exists(&self, _series_id: &str, _office: Option<&str>) -> Result<bool> {
        self.enter(Stage::Lookup)?;
        Ok(true)
    }

    async fn create_series(&self, _definition: &SeriesDefinition) -> Result<SeriesHandle> {
        self.enter(Stage::Lookup)?;
        Err(Error::Validation("read-only mock".into()))
    }

    async fn store_samples(
        &self,
        _series: &SeriesHandle,
        _unit: &str,
        _version_date: Option<DateTime<Utc>>,
        _samples: &[Sample],
    ) -> Result<usize> {
        self.enter(Stage::Rows)?;
        Ok(0)
    }

    async fn delete_samples(
        &self,
        _series: &SeriesHandle,
        _version_date: Option<DateTime<Utc>>,
        _lower: DateTime<Utc>,
        _upper: DateTime<Utc>,
    ) -> Result<usize> {
        self.enter(Stage::Rows)?;
        Ok(0)
    }
}
