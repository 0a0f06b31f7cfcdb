//! Query window resolution.
//!
//! Callers hand in begin, end and timezone as loosely formatted strings. Any of
//! them may be missing, a timestamp may or may not carry its own zone, and the
//! zone may be a region (`America/Chicago`), UTC, or a bare offset. This module
//! turns that into a [`TimeWindow`] with both bounds pinned to instants and a
//! single zone of record used for presenting them.
//!
//! Accepted timestamp forms:
//! - zoned: `2008-05-01T15:00:00Z`, `2008-05-01T08:00:00-07:00`,
//!   `2021-06-21T08:00:00-0000[UTC]`, `2008-05-01T10:00:00-05:00[America/Chicago]`
//! - local: `2008-05-01T15:00:00`, `2008-05-01T15:00:00.250`, `2008-05-01T15:00`

use crate::error::{Error, Result};
use chrono::{
    DateTime, Duration, FixedOffset, LocalResult, NaiveDateTime, Offset, TimeZone, Utc,
};
use chrono_tz::Tz;
use serde::{Serialize, Serializer};
use std::fmt;

const ZONED_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%dT%H:%M%z"];
const LOCAL_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Length of the window used when `begin` is not supplied.
pub fn default_lookback() -> Duration {
    Duration::hours(24)
}

/// A zone of record for a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Utc,
    /// A bare offset with no region attached.
    Fixed(FixedOffset),
    /// An IANA region.
    Named(Tz),
}

impl Zone {
    /// Parse a timezone parameter: `UTC`, `Z`, an offset such as `+05:30`, or an IANA name.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if text == "Z" || text.eq_ignore_ascii_case("UTC") {
            return Ok(Zone::Utc);
        }
        if text.starts_with('+') || text.starts_with('-') {
            return parse_offset(text)
                .map(Zone::Fixed)
                .ok_or_else(|| Error::InvalidTimeFormat(format!("invalid UTC offset '{}'", text)));
        }
        text.parse::<Tz>()
            .map(Zone::Named)
            .map_err(|_| Error::InvalidTimeFormat(format!("unknown time zone '{}'", text)))
    }

    /// True when the zone is only an offset, so it says nothing about daylight saving rules.
    pub fn is_offset_only(&self) -> bool {
        matches!(self, Zone::Fixed(_))
    }

    /// Express an instant in this zone.
    pub fn at(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        match self {
            Zone::Utc => instant.fixed_offset(),
            Zone::Fixed(offset) => instant.with_timezone(offset),
            Zone::Named(tz) => {
                let local = instant.with_timezone(tz);
                local.with_timezone(&local.offset().fix())
            }
        }
    }

    /// Anchor a wall-clock value in this zone.
    ///
    /// Overlapping local times resolve to the earlier offset. Local times that fall in a
    /// daylight-saving gap are moved forward by the length of the gap.
    pub fn localize(&self, local: NaiveDateTime) -> DateTime<FixedOffset> {
        match self {
            Zone::Utc => Utc.from_utc_datetime(&local).fixed_offset(),
            Zone::Fixed(offset) => {
                let instant = local - Duration::seconds(offset.local_minus_utc() as i64);
                Utc.from_utc_datetime(&instant).with_timezone(offset)
            }
            Zone::Named(tz) => match tz.from_local_datetime(&local) {
                LocalResult::Single(dt) => dt.fixed_offset(),
                LocalResult::Ambiguous(earlier, _) => earlier.fixed_offset(),
                LocalResult::None => {
                    let before = tz
                        .offset_from_utc_datetime(&(local - Duration::hours(12)))
                        .fix();
                    let instant = local - Duration::seconds(before.local_minus_utc() as i64);
                    self.at(Utc.from_utc_datetime(&instant))
                }
            },
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Zone::Utc => f.write_str("UTC"),
            Zone::Fixed(offset) => write!(f, "{}", offset),
            Zone::Named(tz) => f.write_str(tz.name()),
        }
    }
}

impl Serialize for Zone {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A resolved query window. Both bounds are inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub zone: Zone,
}

impl TimeWindow {
    /// Build a window from two instants, presenting them in `zone`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, zone: Zone) -> Result<Self> {
        if end < start {
            return Err(Error::InvalidTimeWindow(format!(
                "end {} is before begin {}",
                end.to_rfc3339(),
                start.to_rfc3339()
            )));
        }
        Ok(Self {
            start: zone.at(start),
            end: zone.at(end),
            zone,
        })
    }

    pub fn start_utc(&self) -> DateTime<Utc> {
        self.start.with_timezone(&Utc)
    }

    pub fn end_utc(&self) -> DateTime<Utc> {
        self.end.with_timezone(&Utc)
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start_utc() && instant <= self.end_utc()
    }
}

/// A timestamp as written by the caller, before a zone has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParsedTime {
    Zoned(DateTime<FixedOffset>, Zone),
    Local(NaiveDateTime),
    /// A default bound, taken as the wall clock of this instant in whatever zone anchors it.
    Default(DateTime<Utc>),
}

impl ParsedTime {
    fn anchor(self, zone: &Zone) -> DateTime<FixedOffset> {
        match self {
            ParsedTime::Zoned(dt, _) => dt,
            ParsedTime::Local(local) => zone.localize(local),
            ParsedTime::Default(instant) => zone.at(instant),
        }
    }

    fn zone(&self) -> Option<Zone> {
        match self {
            ParsedTime::Zoned(_, zone) => Some(*zone),
            _ => None,
        }
    }
}

/// Resolve raw begin/end/timezone parameters into a window.
///
/// Zone of record: the explicit `timezone` when given, else the zone written into `begin`,
/// else UTC. A zone-less `end` is read in the same zone as `begin`.
pub fn resolve(
    begin: Option<&str>,
    end: Option<&str>,
    timezone: Option<&str>,
    now: DateTime<Utc>,
) -> Result<TimeWindow> {
    let explicit = non_empty(timezone).map(Zone::parse).transpose()?;
    let fallback = explicit.unwrap_or(Zone::Utc);

    let begin_parsed = match non_empty(begin) {
        Some(text) => parse_time(text)?,
        None => ParsedTime::Default(now - default_lookback()),
    };
    let end_parsed = match non_empty(end) {
        Some(text) => parse_time(text)?,
        None => ParsedTime::Default(now),
    };

    let begin_zone = begin_parsed.zone();
    if explicit.is_none() {
        if let Some(zone) = begin_zone.filter(Zone::is_offset_only) {
            return Err(Error::AmbiguousTimezone(format!(
                "begin time carries only the offset {} and no timezone was given",
                zone
            )));
        }
    }

    let begin_anchor = begin_zone.unwrap_or(fallback);
    let start = begin_parsed.anchor(&begin_anchor);
    let end = end_parsed.anchor(&begin_anchor);
    let zone = explicit.or(begin_zone).unwrap_or(Zone::Utc);

    tracing::trace!(
        start = %start,
        end = %end,
        zone = %zone,
        "Resolved query window"
    );

    TimeWindow::new(start.with_timezone(&Utc), end.with_timezone(&Utc), zone)
}

/// Parse a single timestamp into an instant. Zone-less values are read as UTC.
pub fn parse_instant(text: &str) -> Result<DateTime<Utc>> {
    let parsed = parse_time(text)?;
    Ok(parsed.anchor(&Zone::Utc).with_timezone(&Utc))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_time(text: &str) -> Result<ParsedTime> {
    let text = text.trim();
    let invalid = || Error::InvalidTimeFormat(format!("cannot parse '{}' as a date-time", text));

    // Region suffix, e.g. `2021-06-21T08:00:00-0000[UTC]`
    if let Some(open) = text.find('[') {
        let region = text[open + 1..].strip_suffix(']').ok_or_else(invalid)?;
        let zone = Zone::parse(region)?;
        let stamp = &text[..open];
        return match parse_zoned(stamp) {
            Some(dt) => Ok(ParsedTime::Zoned(zone.at(dt.with_timezone(&Utc)), zone)),
            None => {
                let local = parse_local(stamp).ok_or_else(invalid)?;
                Ok(ParsedTime::Zoned(zone.localize(local), zone))
            }
        };
    }

    if let Some(dt) = parse_zoned(text) {
        let zone = if text.ends_with('Z') || text.ends_with('z') {
            Zone::Utc
        } else {
            Zone::Fixed(*dt.offset())
        };
        return Ok(ParsedTime::Zoned(dt, zone));
    }

    parse_local(text).map(ParsedTime::Local).ok_or_else(invalid)
}

fn parse_zoned(text: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt);
    }
    let normalized = match text.strip_suffix('Z').or_else(|| text.strip_suffix('z')) {
        Some(stripped) => format!("{}+00:00", stripped),
        None => text.to_string(),
    };
    ZONED_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(&normalized, fmt).ok())
}

fn parse_local(text: &str) -> Option<NaiveDateTime> {
    LOCAL_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
}

fn parse_offset(text: &str) -> Option<FixedOffset> {
    let (sign, digits) = match text.as_bytes().first()? {
        b'+' => (1, &text[1..]),
        b'-' => (-1, &text[1..]),
        _ => return None,
    };
    let digits: String = digits.chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = match digits.len() {
        1 | 2 => (digits.parse::<i32>().ok()?, 0),
        4 => (digits[..2].parse::<i32>().ok()?, digits[2..].parse::<i32>().ok()?),
        _ => return None,
    };
    if hours > 18 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
