//! Request-level entry points.
//!
//! [`TimeSeriesService`] accepts raw caller parameters, runs them through window
//! resolution, version selection and cursor decoding, and hands the result to the
//! query layer. All parameter validation happens before the store is touched.

use crate::config::{PagingConfig, ServiceConfig};
use crate::cursor::{self, PageCursor};
use crate::error::{Error, Result};
use crate::series_id::SeriesIdentifier;
use crate::query::{CatalogPage, CatalogPager, PagedQueryAssembler, TimeSeriesResult};
use crate::storage::{self, Sample, SeriesDefinition, SeriesHandle, SeriesStore};
use crate::time_window::{self, parse_instant};
use crate::units::UnitRequest;
use crate::version;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Caller parameters for a trace retrieval.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct TimeSeriesParams {
    pub name: String,
    pub office: Option<String>,
    /// A concrete unit, or `SI` / `EN`. Defaults to `EN`.
    pub units: Option<String>,
    pub begin: Option<String>,
    pub end: Option<String>,
    pub timezone: Option<String>,
    pub version_date: Option<String>,
    pub version_type: Option<String>,
    /// Token from a previous page's `next-page`.
    pub page: Option<String>,
    pub page_size: Option<u32>,
}

/// Caller parameters for a catalog listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CatalogParams {
    pub office: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<u32>,
}

/// A batch of values for one version of a series, as loaded from JSON.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StoreValues {
    pub name: String,
    pub office: String,
    pub units: String,
    #[serde(default)]
    pub version_date: Option<String>,
    /// Only consulted when the series has to be created.
    #[serde(default)]
    pub versioned: bool,
    pub values: Vec<Sample>,
}

/// Caller parameters for blanking out a range of values.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DeleteParams {
    pub name: String,
    pub office: String,
    pub begin: Option<String>,
    pub end: Option<String>,
    pub timezone: Option<String>,
    pub version_date: Option<String>,
}

#[derive(Clone)]
pub struct TimeSeriesService {
    store: Arc<dyn SeriesStore>,
    paging: PagingConfig,
    assembler: PagedQueryAssembler,
    catalog: CatalogPager,
}

impl TimeSeriesService {
    pub fn new(store: Arc<dyn SeriesStore>, paging: PagingConfig) -> Self {
        Self {
            assembler: PagedQueryAssembler::new(store.clone()),
            catalog: CatalogPager::new(store.clone()),
            store,
            paging,
        }
    }

    /// Open the configured store and build a service around it.
    pub async fn from_config(config: &ServiceConfig) -> Result<Self> {
        let store = storage::open_store(&config.storage).await?;
        info!(
            engine = %config.storage.engine,
            default_page_size = config.paging.default_page_size,
            max_page_size = config.paging.max_page_size,
            "Time-series service ready"
        );
        Ok(Self::new(store, config.paging.clone()))
    }

    pub fn store(&self) -> &Arc<dyn SeriesStore> {
        &self.store
    }

    /// Retrieve one page of a trace. `now` anchors the default window.
    #[instrument(skip(self, params), fields(name = %params.name, office = ?params.office))]
    pub async fn retrieve(
        &self,
        params: &TimeSeriesParams,
        now: DateTime<Utc>,
    ) -> Result<TimeSeriesResult> {
        let name = required("name", &params.name)?;
        let window = time_window::resolve(
            params.begin.as_deref(),
            params.end.as_deref(),
            params.timezone.as_deref(),
            now,
        )?;
        let mode = version::select(params.version_date.as_deref(), params.version_type.as_deref())?;
        let page_size = params.page_size.unwrap_or(self.paging.default_page_size);
        let cursor = self.bounded(cursor::decode(params.page.as_deref(), page_size)?);

        self.assembler
            .fetch_page(
                name,
                params.office.as_deref(),
                params.units.as_deref().unwrap_or("EN"),
                &window,
                &mode,
                &cursor,
            )
            .await
    }

    /// List one page of the catalog.
    #[instrument(skip(self, params), fields(office = ?params.office))]
    pub async fn catalog(&self, params: &CatalogParams) -> Result<CatalogPage> {
        let page_size = params.page_size.unwrap_or(self.paging.catalog_page_size);
        let cursor = self.bounded(cursor::decode(params.page.as_deref(), page_size)?);
        self.catalog
            .fetch_catalog_page(params.office.as_deref(), &cursor)
            .await
    }

    /// Write a version of a series, creating the series when it does not exist yet.
    /// Returns the number of samples written.
    #[instrument(skip(self, request), fields(name = %request.name, office = %request.office, rows = request.values.len()))]
    pub async fn store_values(&self, request: &StoreValues) -> Result<usize> {
        let name = required("name", &request.name)?;
        let office = required("office", &request.office)?;
        let version_date = request
            .version_date
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(parse_instant)
            .transpose()?;

        let series = match self.store.resolve_series(name, Some(office)).await {
            Ok(series) => series,
            Err(Error::SeriesNotFound(_)) => self.create(request, name, office).await?,
            Err(e) => return Err(e),
        };
        let unit = UnitRequest::parse(&request.units)
            .resolve(&series.base_parameter(), &series.storage_unit);

        let written = self
            .store
            .store_samples(&series, &unit, version_date, &request.values)
            .await?;
        info!(written, series = %series.series_id, "Stored values");
        Ok(written)
    }

    /// Blank out the values of one version inside a window. Returns the number of
    /// samples that held a value.
    #[instrument(skip(self, params), fields(name = %params.name, office = %params.office))]
    pub async fn delete_values(&self, params: &DeleteParams, now: DateTime<Utc>) -> Result<usize> {
        let name = required("name", &params.name)?;
        let office = required("office", &params.office)?;
        let window = time_window::resolve(
            params.begin.as_deref(),
            params.end.as_deref(),
            params.timezone.as_deref(),
            now,
        )?;
        let version_date = params
            .version_date
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(parse_instant)
            .transpose()?;

        let series = self.store.resolve_series(name, Some(office)).await?;
        let deleted = self
            .store
            .delete_samples(&series, version_date, window.start_utc(), window.end_utc())
            .await?;
        info!(deleted, series = %series.series_id, "Deleted values");
        Ok(deleted)
    }

    async fn create(&self, request: &StoreValues, name: &str, office: &str) -> Result<SeriesHandle> {
        let identifier: SeriesIdentifier = name.parse()?;
        let storage_unit = match UnitRequest::parse(&request.units) {
            UnitRequest::Concrete(unit) => unit,
            UnitRequest::System(_) => {
                return Err(Error::Validation(format!(
                    "{} does not exist; a concrete storage unit is needed to create it, not '{}'",
                    identifier, request.units
                )))
            }
        };
        self.store
            .create_series(&SeriesDefinition {
                office_id: office.to_string(),
                series_id: name.to_string(),
                storage_unit,
                versioned: request.versioned || request.version_date.is_some(),
            })
            .await
    }

    fn bounded(&self, mut cursor: PageCursor) -> PageCursor {
        if cursor.page_size > self.paging.max_page_size {
            warn!(
                requested = cursor.page_size,
                max = self.paging.max_page_size,
                "Page size capped"
            );
            cursor.page_size = self.paging.max_page_size;
        }
        cursor
    }
}

fn required<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::Validation(format!("{} is required", field)));
    }
    Ok(value)
}
