//! Version selection for versioned series.
//!
//! A series can hold several versions of the same trace, each keyed by a version date.
//! A request either ignores versions, pins one version date, or asks for the
//! max-aggregate view in which each timestamp takes the value of the newest version
//! that has one.

use crate::error::{Error, Result};
use crate::time_window::parse_instant;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// The caller-facing `version-type` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionType {
    Unversioned,
    SingleVersion,
    MaxAggregate,
}

impl VersionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VersionType::Unversioned => "unversioned",
            VersionType::SingleVersion => "single-version",
            VersionType::MaxAggregate => "max-aggregate",
        }
    }
}

impl FromStr for VersionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unversioned" => Ok(VersionType::Unversioned),
            "single-version" => Ok(VersionType::SingleVersion),
            "max-aggregate" => Ok(VersionType::MaxAggregate),
            other => Err(Error::ConflictingVersionParameters(format!(
                "unknown version type '{}', expected unversioned, single-version or max-aggregate",
                other
            ))),
        }
    }
}

impl fmt::Display for VersionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for VersionType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Which version of a series the store should read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "date-version-type", rename_all = "kebab-case")]
pub enum VersionMode {
    Unversioned,
    SingleVersion {
        #[serde(rename = "version-date")]
        version_date: DateTime<Utc>,
    },
    MaxAggregate,
}

impl VersionMode {
    pub fn version_type(&self) -> VersionType {
        match self {
            VersionMode::Unversioned => VersionType::Unversioned,
            VersionMode::SingleVersion { .. } => VersionType::SingleVersion,
            VersionMode::MaxAggregate => VersionType::MaxAggregate,
        }
    }

    pub fn version_date(&self) -> Option<DateTime<Utc>> {
        match self {
            VersionMode::SingleVersion { version_date } => Some(*version_date),
            _ => None,
        }
    }
}

impl fmt::Display for VersionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionMode::SingleVersion { version_date } => {
                write!(f, "single-version@{}", version_date.to_rfc3339())
            }
            other => f.write_str(other.version_type().as_str()),
        }
    }
}

/// Derive the version mode from the raw `version-date` and `version-type` parameters.
pub fn select(version_date: Option<&str>, version_type: Option<&str>) -> Result<VersionMode> {
    let version_date = version_date
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(parse_instant)
        .transpose()?;
    let version_type = version_type
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(VersionType::from_str)
        .transpose()?;

    match (version_type, version_date) {
        (None, Some(version_date)) | (Some(VersionType::SingleVersion), Some(version_date)) => {
            Ok(VersionMode::SingleVersion { version_date })
        }
        (None, None) | (Some(VersionType::Unversioned), None) => Ok(VersionMode::Unversioned),
        (Some(VersionType::MaxAggregate), None) => Ok(VersionMode::MaxAggregate),
        (Some(VersionType::SingleVersion), None) => Err(Error::ConflictingVersionParameters(
            "single-version requires a version-date".to_string(),
        )),
        (Some(VersionType::MaxAggregate), Some(_)) => Err(Error::ConflictingVersionParameters(
            "max-aggregate cannot be combined with a version-date".to_string(),
        )),
        (Some(VersionType::Unversioned), Some(_)) => Err(Error::ConflictingVersionParameters(
            "unversioned cannot be combined with a version-date".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_inferred_modes() {
        assert_eq!(select(None, None).unwrap(), VersionMode::Unversioned);
        assert_eq!(
            select(Some("2021-06-21T08:00:00Z"), None).unwrap(),
            VersionMode::SingleVersion {
                version_date: Utc.with_ymd_and_hms(2021, 6, 21, 8, 0, 0).unwrap()
            }
        );
    }

    #[test]
    fn test_explicit_modes() {
        assert_eq!(
            select(None, Some("max-aggregate")).unwrap(),
            VersionMode::MaxAggregate
        );
        assert_eq!(
            select(None, Some("UNVERSIONED")).unwrap(),
            VersionMode::Unversioned
        );
        let mode = select(Some("2021-06-21T08:00:00-0000[UTC]"), Some("single-version")).unwrap();
        assert_eq!(mode.version_type(), VersionType::SingleVersion);
    }

    #[test]
    fn test_conflicts() {
        let err = select(None, Some("single-version")).unwrap_err();
        assert!(matches!(err, Error::ConflictingVersionParameters(_)));

        let err = select(Some("2021-06-21T08:00:00Z"), Some("max-aggregate")).unwrap_err();
        assert!(matches!(err, Error::ConflictingVersionParameters(_)));

        let err = select(Some("2021-06-21T08:00:00Z"), Some("unversioned")).unwrap_err();
        assert!(matches!(err, Error::ConflictingVersionParameters(_)));

        let err = select(None, Some("newest")).unwrap_err();
        assert!(matches!(err, Error::ConflictingVersionParameters(_)));
    }

    #[test]
    fn test_bad_version_date() {
        let err = select(Some("last tuesday"), Some("single-version")).unwrap_err();
        assert!(matches!(err, Error::InvalidTimeFormat(_)));
    }

    #[test]
    fn test_serialized_shape() {
        let mode = VersionMode::SingleVersion {
            version_date: Utc.with_ymd_and_hms(2021, 6, 21, 8, 0, 0).unwrap(),
        };
        let json = serde_json::to_value(mode).unwrap();
        assert_eq!(json["date-version-type"], "single-version");
        assert_eq!(json["version-date"], "2021-06-21T08:00:00Z");
    }
}
