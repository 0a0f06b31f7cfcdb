use crate::cursor::PageCursor;
use crate::error::{Error, Result};
use crate::storage::{Sample, SeriesStore};
use crate::time_window::TimeWindow;
use crate::units::{self, UnitRequest};
use crate::version::VersionMode;
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, instrument};

/// One page of a trace.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TimeSeriesResult {
    pub name: String,
    pub office_id: String,
    pub units: String,
    /// Minutes between samples, 0 for irregular series.
    pub interval_minutes: i64,
    pub window: TimeWindow,
    #[serde(flatten)]
    pub version_mode: VersionMode,
    pub total: u64,
    pub page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page: Option<String>,
    pub values: Vec<Sample>,
}

impl TimeSeriesResult {
    pub fn has_more(&self) -> bool {
        self.next_page.is_some()
    }
}

/// Builds and runs the store queries for one page of a trace.
#[derive(Clone)]
pub struct PagedQueryAssembler {
    store: Arc<dyn SeriesStore>,
}

impl PagedQueryAssembler {
    pub fn new(store: Arc<dyn SeriesStore>) -> Self {
        Self { store }
    }

    /// Fetch the page of `series_id` described by `cursor`.
    ///
    /// The total is counted once, on the first page, and carried in every later token.
    /// Rows are requested with one row of lookahead; when it comes back the page is cut
    /// to `page_size` and the next token starts at the lookahead row.
    #[instrument(skip(self, window, cursor), fields(page_size = cursor.page_size))]
    pub async fn fetch_page(
        &self,
        series_id: &str,
        office: Option<&str>,
        units: &str,
        window: &TimeWindow,
        version_mode: &VersionMode,
        cursor: &PageCursor,
    ) -> Result<TimeSeriesResult> {
        let position = cursor.position.as_deref().map(parse_position).transpose()?;

        let series = self.store.resolve_series(series_id, office).await?;
        let unit = UnitRequest::parse(units).resolve(&series.base_parameter(), &series.storage_unit);
        units::check_convertible(&series.storage_unit, &unit)?;

        let lower = match position {
            Some(position) if position > window.start_utc() => position,
            _ => window.start_utc(),
        };
        let upper = window.end_utc();

        let total = match cursor.total {
            Some(total) => total,
            None => {
                self.store
                    .count_samples(&series, &unit, version_mode, window.start_utc(), upper)
                    .await?
            }
        };

        let page_size = cursor.page_size as usize;
        let mut values = Vec::new();
        let mut next_page = None;
        if page_size > 0 {
            values = self
                .store
                .query_samples(&series, &unit, version_mode, lower, upper, Some(page_size + 1))
                .await?;
            if values.len() > page_size {
                let next_position = values[page_size].date_time.timestamp_millis().to_string();
                values.truncate(page_size);
                next_page = Some(cursor.advance(next_position, total).encode());
            }
        }

        debug!(
            series = %series.series_id,
            office = %series.office_id,
            total,
            rows = values.len(),
            has_more = next_page.is_some(),
            "Assembled page"
        );

        Ok(TimeSeriesResult {
            name: series.series_id,
            office_id: series.office_id,
            units: unit,
            interval_minutes: series.interval.minutes(),
            window: window.clone(),
            version_mode: *version_mode,
            total,
            page_size: cursor.page_size,
            page: (!cursor.is_first_page()).then(|| cursor.encode()),
            next_page,
            values,
        })
    }
}

/// A value-page position is the epoch-millisecond timestamp of the first row of the page.
fn parse_position(position: &str) -> Result<DateTime<Utc>> {
    let millis: i64 = position
        .parse()
        .map_err(|_| Error::MalformedCursor(format!("invalid page position '{}'", position)))?;
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| Error::MalformedCursor(format!("page position {} is out of range", millis)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_position() {
        let at = parse_position("1209654000000").unwrap();
        assert_eq!(at, Utc.with_ymd_and_hms(2008, 5, 1, 15, 0, 0).unwrap());
        assert!(matches!(parse_position("CWMS.Flow"), Err(Error::MalformedCursor(_))));
        assert!(matches!(
            parse_position(&i64::MAX.to_string()),
            Err(Error::MalformedCursor(_))
        ));
    }
}
