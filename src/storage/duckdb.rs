use crate::error::{Error, Result};
use crate::series_id::{Interval, SeriesIdentifier};
use crate::storage::{
    CatalogEntry, Sample, SeriesDefinition, SeriesHandle, SeriesStore, QUALITY_MISSING,
};
use crate::units;
use crate::version::VersionMode;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use duckdb::{params, params_from_iter, Config, Connection};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Version date under which unversioned samples are kept.
const NON_VERSIONED: i64 = i64::MIN;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS ts_catalog (
    office_id VARCHAR NOT NULL,
    ts_id VARCHAR NOT NULL,
    storage_unit VARCHAR NOT NULL,
    interval_minutes BIGINT NOT NULL,
    versioned BOOLEAN NOT NULL,
    -- first sample time ever written; fixes the grid of a regular series
    interval_anchor BIGINT,
    PRIMARY KEY (office_id, ts_id)
);
CREATE TABLE IF NOT EXISTS ts_values (
    office_id VARCHAR NOT NULL,
    ts_id VARCHAR NOT NULL,
    version_date BIGINT NOT NULL,
    date_time BIGINT NOT NULL,
    value DOUBLE,
    quality_code INTEGER NOT NULL,
    data_entry_date BIGINT NOT NULL,
    PRIMARY KEY (office_id, ts_id, version_date, date_time)
);
"#;

/// DuckDB-based archive
#[derive(Clone)]
pub struct DuckDbStore {
    conn: Arc<Mutex<Connection>>,
}

impl DuckDbStore {
    pub fn new_with_options(
        connection_string: &str,
        options: &HashMap<String, String>,
    ) -> Result<Self> {
        let mut config = Config::default();
        if let Some(threads) = options.get("threads") {
            let threads: i64 = threads.parse().map_err(|_| {
                Error::Config(format!("storage option threads='{}' is not a number", threads))
            })?;
            config = config.threads(threads)?;
        }

        let conn = if connection_string.is_empty() || connection_string == ":memory:" {
            Connection::open_in_memory_with_flags(config)?
        } else {
            Connection::open_with_flags(connection_string, config)?
        };

        conn.execute_batch(SCHEMA)
            .map_err(|e| Error::StoreUnavailable(format!("Failed to create tables: {e}")))?;

        debug!(connection = %connection_string, "Opened DuckDB archive");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn new_in_memory() -> Result<Self> {
        Self::new_with_options(":memory:", &HashMap::new())
    }
}

fn to_millis(instant: DateTime<Utc>) -> i64 {
    instant.timestamp_millis()
}

fn from_millis(millis: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| Error::StoreUnavailable(format!("invalid stored timestamp {millis}")))
}

fn version_key(series: &SeriesHandle, version_date: Option<DateTime<Utc>>) -> Result<i64> {
    match (series.versioned, version_date) {
        (true, Some(date)) => Ok(to_millis(date)),
        (false, None) => Ok(NON_VERSIONED),
        (true, None) => Err(Error::Validation(format!(
            "{} is versioned; a version date is required",
            series.series_id
        ))),
        (false, Some(_)) => Err(Error::Validation(format!(
            "{} is not versioned; it cannot take a version date",
            series.series_id
        ))),
    }
}

fn interval_anchor(conn: &Connection, series: &SeriesHandle) -> Result<Option<DateTime<Utc>>> {
    let anchor: Option<i64> = conn.query_row(
        "SELECT interval_anchor FROM ts_catalog WHERE office_id = ? AND ts_id = ?",
        params![series.office_id, series.series_id],
        |row| row.get(0),
    )?;
    anchor.map(from_millis).transpose()
}

/// SQL returning `(date_time, value, quality_code)` for one series and version mode.
///
/// Per timestamp the newest version holding a value wins, falling back to the newest
/// blank. Regular series are joined against the interval grid through `anchor` so every
/// slot in the bounds yields a row. A series never written to has no grid.
fn trace_sql(
    series: &SeriesHandle,
    mode: &VersionMode,
    anchor: Option<DateTime<Utc>>,
    lower: DateTime<Utc>,
    upper: DateTime<Utc>,
) -> String {
    let (lower_ms, upper_ms) = (to_millis(lower), to_millis(upper));
    let version_filter = match mode {
        VersionMode::SingleVersion { version_date } => {
            format!("AND version_date = {}", to_millis(*version_date))
        }
        VersionMode::Unversioned if !series.versioned => {
            format!("AND version_date = {NON_VERSIONED}")
        }
        // a versioned series read without a version is read as its max aggregate
        VersionMode::Unversioned | VersionMode::MaxAggregate => String::new(),
    };

    let picked = format!(
        "SELECT date_time, value, quality_code FROM (
             SELECT date_time, value, quality_code,
                    row_number() OVER (
                        PARTITION BY date_time
                        ORDER BY (value IS NULL), version_date DESC
                    ) AS rn
             FROM ts_values
             WHERE office_id = ? AND ts_id = ?
               AND date_time >= {lower_ms} AND date_time <= {upper_ms}
               {version_filter}
         ) WHERE rn = 1"
    );

    let Some(anchor) = anchor else {
        return picked;
    };
    let slots = match series.interval {
        Interval::Irregular => return picked,
        Interval::Minutes(minutes) => {
            let (Some(step), Some(first_slot)) = (
                minutes.checked_mul(60_000),
                series.interval.first_slot_at_or_after(anchor, lower),
            ) else {
                return picked;
            };
            format!(
                "SELECT range AS date_time FROM range({}, {}, {step})",
                to_millis(first_slot),
                upper_ms.saturating_add(1)
            )
        }
        // calendar steps are listed out; a window holds few of them
        Interval::Months(_) => {
            let slots = series.interval.slots_between(anchor, lower, upper);
            if slots.is_empty() {
                return picked;
            }
            let list = slots
                .iter()
                .map(|slot| to_millis(*slot).to_string())
                .collect::<Vec<_>>()
                .join(", ");
            format!("SELECT unnest([{list}]::BIGINT[]) AS date_time")
        }
    };
    format!(
        "WITH picked AS ({picked}),
              slots AS ({slots})
         SELECT COALESCE(slots.date_time, picked.date_time) AS date_time,
                picked.value AS value,
                COALESCE(picked.quality_code, {QUALITY_MISSING}) AS quality_code
         FROM slots FULL OUTER JOIN picked ON slots.date_time = picked.date_time"
    )
}

#[async_trait]
impl SeriesStore for DuckDbStore {
    async fn init(&self) -> Result<()> {
        // Tables are already created in new_with_options()
        Ok(())
    }

    async fn resolve_series(&self, series_id: &str, office: Option<&str>) -> Result<SeriesHandle> {
        let mut sql = String::from(
            "SELECT office_id, ts_id, storage_unit, versioned
             FROM ts_catalog WHERE upper(ts_id) = upper(?)",
        );
        let mut args = vec![series_id.to_string()];
        if let Some(office) = office {
            sql.push_str(" AND upper(office_id) = upper(?)");
            args.push(office.to_string());
        }
        sql.push_str(" ORDER BY office_id LIMIT 1");

        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query_map(params_from_iter(args.iter()), |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, bool>(3)?,
            ))
        })?;

        match rows.next() {
            Some(row) => {
                let (office_id, series_id, storage_unit, versioned) = row?;
                let interval = series_id.parse::<SeriesIdentifier>()?.interval()?;
                Ok(SeriesHandle {
                    office_id,
                    series_id,
                    storage_unit,
                    interval,
                    versioned,
                })
            }
            None => Err(Error::SeriesNotFound(match office {
                Some(office) => format!("{series_id} (office {office})"),
                None => series_id.to_string(),
            })),
        }
    }

    async fn query_samples(
        &self,
        series: &SeriesHandle,
        unit: &str,
        mode: &VersionMode,
        lower: DateTime<Utc>,
        upper: DateTime<Utc>,
        limit: Option<usize>,
    ) -> Result<Vec<Sample>> {
        units::check_convertible(&series.storage_unit, unit)?;

        let conn = self.conn.lock().await;
        let anchor = interval_anchor(&conn, series)?;
        let mut sql = format!(
            "SELECT * FROM ({}) ORDER BY date_time",
            trace_sql(series, mode, anchor, lower, upper)
        );
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        debug!(series = %series.series_id, mode = %mode, ?limit, "Querying samples");

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![series.office_id, series.series_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, Option<f64>>(1)?,
                row.get::<_, i32>(2)?,
            ))
        })?;

        let mut samples = Vec::new();
        for row in rows {
            let (millis, value, quality_code) = row?;
            let value = value
                .map(|v| units::convert(v, &series.storage_unit, unit))
                .transpose()?;
            samples.push(Sample {
                date_time: from_millis(millis)?,
                value,
                quality_code,
            });
        }
        Ok(samples)
    }

    async fn count_samples(
        &self,
        series: &SeriesHandle,
        unit: &str,
        mode: &VersionMode,
        lower: DateTime<Utc>,
        upper: DateTime<Utc>,
    ) -> Result<u64> {
        units::check_convertible(&series.storage_unit, unit)?;

        let conn = self.conn.lock().await;
        let anchor = interval_anchor(&conn, series)?;
        let sql = format!(
            "SELECT count(*) FROM ({})",
            trace_sql(series, mode, anchor, lower, upper)
        );
        let count: i64 = conn.query_row(&sql, params![series.office_id, series.series_id], |row| {
            row.get(0)
        })?;
        Ok(count.max(0) as u64)
    }

    async fn list_catalog_entries(
        &self,
        office: Option<&str>,
        after: Option<&str>,
        limit: usize,
    ) -> Result<Vec<CatalogEntry>> {
        let mut clauses = Vec::new();
        let mut args = Vec::new();
        if let Some(office) = office {
            clauses.push("upper(office_id) = upper(?)");
            args.push(office.to_string());
        }
        if let Some(after) = after {
            clauses.push("upper(ts_id) > upper(?)");
            args.push(after.to_string());
        }
        let mut sql = String::from("SELECT office_id, ts_id, storage_unit FROM ts_catalog");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(&format!(" ORDER BY upper(ts_id), office_id LIMIT {limit}"));

        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args.iter()), |row| {
            Ok(CatalogEntry {
                office: row.get(0)?,
                name: row.get(1)?,
                units: row.get(2)?,
            })
        })?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    async fn count_catalog_entries(&self, office: Option<&str>) -> Result<u64> {
        let conn = self.conn.lock().await;
        let count: i64 = match office {
            Some(office) => conn.query_row(
                "SELECT count(*) FROM ts_catalog WHERE upper(office_id) = upper(?)",
                params![office],
                |row| row.get(0),
            )?,
            None => conn.query_row("SELECT count(*) FROM ts_catalog", params![], |row| row.get(0))?,
        };
        Ok(count.max(0) as u64)
    }

    async fn series_exists(&self, series_id: &str, office: Option<&str>) -> Result<bool> {
        match self.resolve_series(series_id, office).await {
            Ok(_) => Ok(true),
            Err(Error::SeriesNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn create_series(&self, definition: &SeriesDefinition) -> Result<SeriesHandle> {
        let identifier: SeriesIdentifier = definition.series_id.parse()?;
        let interval = identifier.interval()?;

        if self
            .series_exists(&definition.series_id, Some(&definition.office_id))
            .await?
        {
            return Err(Error::Validation(format!(
                "{} already exists in office {}",
                definition.series_id, definition.office_id
            )));
        }

        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO ts_catalog VALUES (?, ?, ?, ?, ?, NULL)",
            params![
                definition.office_id,
                definition.series_id,
                definition.storage_unit,
                interval.minutes(),
                definition.versioned
            ],
        )?;
        debug!(series = %definition.series_id, office = %definition.office_id, "Created series");

        Ok(SeriesHandle {
            office_id: definition.office_id.clone(),
            series_id: definition.series_id.clone(),
            storage_unit: definition.storage_unit.clone(),
            interval,
            versioned: definition.versioned,
        })
    }

    async fn store_samples(
        &self,
        series: &SeriesHandle,
        unit: &str,
        version_date: Option<DateTime<Utc>>,
        samples: &[Sample],
    ) -> Result<usize> {
        let version = version_key(series, version_date)?;
        let times = samples.iter().map(|s| s.date_time);
        let (Some(first), Some(last)) = (times.clone().min(), times.max()) else {
            return Ok(0);
        };
        let mut converted = Vec::with_capacity(samples.len());
        for sample in samples {
            let value = sample
                .value
                .map(|v| units::convert(v, unit, &series.storage_unit))
                .transpose()?;
            converted.push((to_millis(sample.date_time), value, sample.quality_code));
        }
        let entered = to_millis(Utc::now());

        let mut conn = self.conn.lock().await;
        let stored_anchor = interval_anchor(&conn, series)?;
        let anchor = stored_anchor.unwrap_or(first);
        if let Some(off_grid) = samples
            .iter()
            .find(|s| !series.interval.is_aligned(anchor, s.date_time))
        {
            return Err(Error::Validation(format!(
                "{} is not on the interval grid of {} (slots fall on {})",
                off_grid.date_time.to_rfc3339(),
                series.series_id,
                anchor.to_rfc3339()
            )));
        }

        let tx = conn.transaction()?;
        if series.interval.is_regular() && stored_anchor.is_none() {
            tx.execute(
                "UPDATE ts_catalog SET interval_anchor = ? WHERE office_id = ? AND ts_id = ?",
                params![to_millis(anchor), series.office_id, series.series_id],
            )?;
        }
        // Rows being replaced are upserted below, only the others in the range are removed
        let incoming = converted
            .iter()
            .map(|(date_time, _, _)| date_time.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        tx.execute(
            &format!(
                "DELETE FROM ts_values
                 WHERE office_id = ? AND ts_id = ? AND version_date = ?
                   AND date_time >= ? AND date_time <= ?
                   AND date_time NOT IN ({incoming})"
            ),
            params![
                series.office_id,
                series.series_id,
                version,
                to_millis(first),
                to_millis(last)
            ],
        )?;
        {
            let mut stmt = tx.prepare("INSERT OR REPLACE INTO ts_values VALUES (?, ?, ?, ?, ?, ?, ?)")?;
            for (date_time, value, quality_code) in &converted {
                stmt.execute(params![
                    series.office_id,
                    series.series_id,
                    version,
                    date_time,
                    value,
                    quality_code,
                    entered
                ])?;
            }
        }
        tx.commit()?;

        debug!(
            series = %series.series_id,
            rows = converted.len(),
            versioned = series.versioned,
            "Stored samples"
        );
        Ok(converted.len())
    }

    async fn delete_samples(
        &self,
        series: &SeriesHandle,
        version_date: Option<DateTime<Utc>>,
        lower: DateTime<Utc>,
        upper: DateTime<Utc>,
    ) -> Result<usize> {
        let version = version_key(series, version_date)?;
        let conn = self.conn.lock().await;
        let changed = conn.execute(
            &format!(
                "UPDATE ts_values SET value = NULL, quality_code = {QUALITY_MISSING}, data_entry_date = ?
                 WHERE office_id = ? AND ts_id = ? AND version_date = ?
                   AND date_time >= ? AND date_time <= ? AND value IS NOT NULL"
            ),
            params![
                to_millis(Utc::now()),
                series.office_id,
                series.series_id,
                version,
                to_millis(lower),
                to_millis(upper)
            ],
        )?;
        debug!(series = %series.series_id, rows = changed, "Deleted samples");
        Ok(changed)
    }
}
