//! Time-series identifiers.
//!
//! Identifiers have six dot-separated parts:
//! `Location.Parameter.ParameterType.Interval.Duration.Version`, for example
//! `Keystone.Flow-Out.Inst.1Hour.0.raw`. The interval part decides whether the
//! series is regular (one slot per interval) or irregular (`0` or a `~` prefix).

use crate::error::{Error, Result};
use chrono::{DateTime, Datelike, Duration, Months, Utc};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesIdentifier {
    pub location: String,
    pub parameter: String,
    pub parameter_type: String,
    pub interval: String,
    pub duration: String,
    pub version: String,
}

impl SeriesIdentifier {
    /// The parameter without its sub-parameter, e.g. `Flow` for `Flow-Out`.
    pub fn base_parameter(&self) -> &str {
        self.parameter
            .split_once('-')
            .map(|(base, _)| base)
            .unwrap_or(&self.parameter)
    }

    pub fn interval(&self) -> Result<Interval> {
        Interval::parse(&self.interval).ok_or_else(|| {
            Error::Validation(format!("unrecognised interval '{}'", self.interval))
        })
    }

    /// Interval length in minutes, 0 for irregular series.
    pub fn interval_minutes(&self) -> Result<i64> {
        self.interval().map(|interval| interval.minutes())
    }
}

impl FromStr for SeriesIdentifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 6 || parts.iter().any(|p| p.is_empty()) {
            return Err(Error::Validation(format!(
                "'{}' is not a time series identifier (Location.Parameter.Type.Interval.Duration.Version)",
                s
            )));
        }
        Ok(Self {
            location: parts[0].to_string(),
            parameter: parts[1].to_string(),
            parameter_type: parts[2].to_string(),
            interval: parts[3].to_string(),
            duration: parts[4].to_string(),
            version: parts[5].to_string(),
        })
    }
}

impl fmt::Display for SeriesIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}.{}.{}",
            self.location,
            self.parameter,
            self.parameter_type,
            self.interval,
            self.duration,
            self.version
        )
    }
}

/// Spacing of a series, taken from the interval part of its identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interval {
    Irregular,
    /// Fixed length in minutes.
    Minutes(i64),
    /// Calendar months. A year is twelve.
    Months(u32),
}

const MILLIS_PER_MINUTE: i64 = 60_000;
const MINUTES_PER_MONTH: i64 = 60 * 24 * 30;

impl Interval {
    /// Parse an interval token such as `15Minutes`, `1Hour`, `1Month`, `~1Day` or `0`.
    ///
    /// Lengths that cannot be expressed in epoch milliseconds are rejected.
    pub fn parse(token: &str) -> Option<Self> {
        if token == "0" || token.starts_with('~') {
            return Some(Interval::Irregular);
        }
        let split = token.find(|c: char| !c.is_ascii_digit())?;
        let (count, unit) = token.split_at(split);
        let count: u32 = count.parse().ok()?;
        if count == 0 {
            return None;
        }
        let minutes = |per_unit: i64| i64::from(count).checked_mul(per_unit).map(Interval::Minutes);
        let interval = match unit.to_ascii_lowercase().as_str() {
            "minute" | "minutes" => minutes(1)?,
            "hour" | "hours" => minutes(60)?,
            "day" | "days" => minutes(60 * 24)?,
            "week" | "weeks" => minutes(60 * 24 * 7)?,
            "month" | "months" => Interval::Months(count),
            "year" | "years" => Interval::Months(count.checked_mul(12)?),
            _ => return None,
        };
        interval.checked_minutes()?.checked_mul(MILLIS_PER_MINUTE)?;
        Some(interval)
    }

    pub fn is_regular(&self) -> bool {
        !matches!(self, Interval::Irregular)
    }

    fn checked_minutes(&self) -> Option<i64> {
        match *self {
            Interval::Irregular => Some(0),
            Interval::Minutes(minutes) => Some(minutes),
            Interval::Months(months) => i64::from(months).checked_mul(MINUTES_PER_MONTH),
        }
    }

    /// Nominal length in minutes with months counted as 30 days; 0 when irregular.
    pub fn minutes(&self) -> i64 {
        self.checked_minutes().unwrap_or(i64::MAX)
    }

    /// The `k`-th slot counted from `anchor`; `k` may be negative.
    pub fn slot(&self, anchor: DateTime<Utc>, k: i64) -> Option<DateTime<Utc>> {
        match *self {
            Interval::Irregular => None,
            Interval::Minutes(minutes) => {
                let offset = minutes.checked_mul(MILLIS_PER_MINUTE)?.checked_mul(k)?;
                anchor.checked_add_signed(Duration::try_milliseconds(offset)?)
            }
            Interval::Months(months) => {
                let span = k.unsigned_abs().checked_mul(u64::from(months))?;
                let span = Months::new(u32::try_from(span).ok()?);
                if k >= 0 {
                    anchor.checked_add_months(span)
                } else {
                    anchor.checked_sub_months(span)
                }
            }
        }
    }

    /// Index of a slot at or just before `t`.
    fn index_before(&self, anchor: DateTime<Utc>, t: DateTime<Utc>) -> Option<i64> {
        match *self {
            Interval::Irregular => None,
            Interval::Minutes(minutes) => {
                let step = minutes.checked_mul(MILLIS_PER_MINUTE)?;
                Some((t - anchor).num_milliseconds().div_euclid(step))
            }
            Interval::Months(months) => {
                let month_index = |d: DateTime<Utc>| i64::from(d.year()) * 12 + i64::from(d.month0());
                // one slot back covers an anchor late in its month
                Some((month_index(t) - month_index(anchor)).div_euclid(i64::from(months)) - 1)
            }
        }
    }

    /// First slot at or after `t` on the grid through `anchor`.
    pub fn first_slot_at_or_after(
        &self,
        anchor: DateTime<Utc>,
        t: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        let mut k = self.index_before(anchor, t)?;
        loop {
            let slot = self.slot(anchor, k)?;
            if slot >= t {
                return Some(slot);
            }
            k = k.checked_add(1)?;
        }
    }

    /// Whether `t` falls on the grid through `anchor`. Irregular series accept any time.
    pub fn is_aligned(&self, anchor: DateTime<Utc>, t: DateTime<Utc>) -> bool {
        !self.is_regular() || self.first_slot_at_or_after(anchor, t) == Some(t)
    }

    /// Slots of the grid through `anchor` within `[lower, upper]`.
    pub fn slots_between(
        &self,
        anchor: DateTime<Utc>,
        lower: DateTime<Utc>,
        upper: DateTime<Utc>,
    ) -> Vec<DateTime<Utc>> {
        let mut slots = Vec::new();
        let Some(first) = self.first_slot_at_or_after(anchor, lower) else {
            return slots;
        };
        let Some(mut k) = self.index_before(anchor, first) else {
            return slots;
        };
        while let Some(slot) = self.slot(anchor, k) {
            if slot > upper {
                break;
            }
            if slot >= lower {
                slots.push(slot);
            }
            k += 1;
        }
        slots
    }
}

/// Nominal interval length in minutes for a token, 0 for irregular series.
pub fn interval_minutes(token: &str) -> Option<i64> {
    Interval::parse(token).map(|interval| interval.minutes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_identifier() {
        let id: SeriesIdentifier = "TsVersionedTestLoc.Flow-In.Inst.1Hour.0.raw".parse().unwrap();
        assert_eq!(id.location, "TsVersionedTestLoc");
        assert_eq!(id.base_parameter(), "Flow");
        assert_eq!(id.interval_minutes().unwrap(), 60);
        assert_eq!(id.to_string(), "TsVersionedTestLoc.Flow-In.Inst.1Hour.0.raw");
    }

    #[test]
    fn test_rejects_short_identifiers() {
        assert!("Loc.Flow.Inst".parse::<SeriesIdentifier>().is_err());
        assert!("Loc..Inst.1Hour.0.raw".parse::<SeriesIdentifier>().is_err());
    }

    #[test]
    fn test_interval_tokens() {
        assert_eq!(interval_minutes("0"), Some(0));
        assert_eq!(interval_minutes("~1Day"), Some(0));
        assert_eq!(interval_minutes("15Minutes"), Some(15));
        assert_eq!(interval_minutes("6Hours"), Some(360));
        assert_eq!(interval_minutes("1Day"), Some(1440));
        assert_eq!(interval_minutes("1Fortnight"), None);
        assert_eq!(interval_minutes("Hour"), None);
        assert_eq!(Interval::parse("1Month"), Some(Interval::Months(1)));
        assert_eq!(Interval::parse("1Year"), Some(Interval::Months(12)));
    }

    #[test]
    fn test_oversized_intervals_are_rejected() {
        assert_eq!(interval_minutes("99999999999999Years"), None);
        assert_eq!(interval_minutes("4000000000Years"), None);
        assert_eq!(interval_minutes("4000000000Months"), None);
        assert_eq!(interval_minutes("0Hours"), None);
        assert!(interval_minutes("4000000000Weeks").is_some());

        let id: SeriesIdentifier = "L.Flow.Inst.99999999999999Years.0.raw".parse().unwrap();
        assert!(matches!(id.interval(), Err(Error::Validation(_))));
    }

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_grid_follows_its_anchor() {
        let hourly = Interval::Minutes(60);
        let anchor = utc(2008, 5, 1, 15, 30);
        assert_eq!(
            hourly.slots_between(anchor, utc(2008, 5, 1, 15, 0), utc(2008, 5, 1, 17, 0)),
            vec![utc(2008, 5, 1, 15, 30), utc(2008, 5, 1, 16, 30)]
        );
        // slots before the anchor are on the grid too
        assert!(hourly.is_aligned(anchor, utc(2008, 4, 30, 2, 30)));
        assert!(!hourly.is_aligned(anchor, utc(2008, 5, 1, 16, 0)));
    }

    #[test]
    fn test_monthly_grid_steps_on_the_calendar() {
        let monthly = Interval::Months(1);
        let anchor = utc(2008, 5, 1, 0, 0);
        assert_eq!(
            monthly.slots_between(anchor, utc(2008, 4, 15, 0, 0), utc(2008, 8, 1, 0, 0)),
            vec![
                utc(2008, 5, 1, 0, 0),
                utc(2008, 6, 1, 0, 0),
                utc(2008, 7, 1, 0, 0),
                utc(2008, 8, 1, 0, 0)
            ]
        );
        assert!(monthly.is_aligned(anchor, utc(2007, 12, 1, 0, 0)));
        assert!(!monthly.is_aligned(anchor, utc(2008, 5, 31, 0, 0)));

        // month ends clamp without drifting
        let end_of_month = utc(2008, 1, 31, 0, 0);
        assert_eq!(monthly.slot(end_of_month, 1), Some(utc(2008, 2, 29, 0, 0)));
        assert_eq!(monthly.slot(end_of_month, 2), Some(utc(2008, 3, 31, 0, 0)));

        let yearly = Interval::Months(12);
        assert_eq!(
            yearly.first_slot_at_or_after(anchor, utc(2010, 5, 2, 0, 0)),
            Some(utc(2011, 5, 1, 0, 0))
        );
    }
}
