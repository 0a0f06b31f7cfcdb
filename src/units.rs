//! Unit systems, default units and value conversion.
//!
//! Callers may ask for a concrete unit (`cfs`, `ft`) or a unit system (`SI`, `EN`).
//! A unit system resolves to the default unit of the series' base parameter; a
//! concrete unit passes through verbatim.

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitSystem {
    Si,
    En,
}

/// What the caller asked for in the `units` parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitRequest {
    System(UnitSystem),
    Concrete(String),
}

impl UnitRequest {
    pub fn parse(units: &str) -> Self {
        let units = units.trim();
        if units.eq_ignore_ascii_case("SI") {
            UnitRequest::System(UnitSystem::Si)
        } else if units.eq_ignore_ascii_case("EN") {
            UnitRequest::System(UnitSystem::En)
        } else {
            UnitRequest::Concrete(units.to_string())
        }
    }

    /// Resolve to a concrete unit for a series with the given base parameter and storage unit.
    pub fn resolve(&self, base_parameter: &str, storage_unit: &str) -> String {
        match self {
            UnitRequest::Concrete(unit) => unit.clone(),
            UnitRequest::System(system) => default_unit(base_parameter, *system)
                .unwrap_or(storage_unit)
                .to_string(),
        }
    }
}

/// Default unit of a base parameter in a unit system.
pub fn default_unit(base_parameter: &str, system: UnitSystem) -> Option<&'static str> {
    let (si, en) = match base_parameter {
        "Flow" => ("cms", "cfs"),
        "Stage" | "Elev" | "Depth" | "Height" | "Dist" => ("m", "ft"),
        "Precip" => ("mm", "in"),
        "Temp" => ("C", "F"),
        "Stor" => ("m3", "ac-ft"),
        "Opening" | "%" => ("%", "%"),
        "Speed" => ("m/s", "mph"),
        _ => return None,
    };
    Some(match system {
        UnitSystem::Si => si,
        UnitSystem::En => en,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dimension {
    Length,
    Flow,
    Volume,
    Temperature,
    Ratio,
    Speed,
}

/// `(dimension, scale, offset)` such that `base = value * scale + offset`.
fn linear(unit: &str) -> Option<(Dimension, f64, f64)> {
    use Dimension::*;
    Some(match unit {
        "m" => (Length, 1.0, 0.0),
        "ft" => (Length, 0.3048, 0.0),
        "in" => (Length, 0.0254, 0.0),
        "mm" => (Length, 0.001, 0.0),
        "km" => (Length, 1000.0, 0.0),
        "mi" => (Length, 1609.344, 0.0),
        "cms" => (Flow, 1.0, 0.0),
        "cfs" => (Flow, 0.028_316_846_592, 0.0),
        "kcfs" => (Flow, 28.316_846_592, 0.0),
        "m3" => (Volume, 1.0, 0.0),
        "ac-ft" => (Volume, 1_233.481_837_547_52, 0.0),
        "kaf" => (Volume, 1_233_481.837_547_52, 0.0),
        "C" => (Temperature, 1.0, 0.0),
        "F" => (Temperature, 5.0 / 9.0, -160.0 / 9.0),
        "%" => (Ratio, 1.0, 0.0),
        "m/s" => (Speed, 1.0, 0.0),
        "mph" => (Speed, 0.447_04, 0.0),
        "kph" => (Speed, 1.0 / 3.6, 0.0),
        _ => return None,
    })
}

/// Convert `value` from one unit to another.
pub fn convert(value: f64, from: &str, to: &str) -> Result<f64> {
    if from == to {
        return Ok(value);
    }
    let incompatible = || Error::Validation(format!("cannot convert from '{}' to '{}'", from, to));
    let (from_dim, from_scale, from_offset) = linear(from).ok_or_else(incompatible)?;
    let (to_dim, to_scale, to_offset) = linear(to).ok_or_else(incompatible)?;
    if from_dim != to_dim {
        return Err(incompatible());
    }
    let base = value * from_scale + from_offset;
    Ok((base - to_offset) / to_scale)
}

/// Check a conversion is possible without converting anything.
pub fn check_convertible(from: &str, to: &str) -> Result<()> {
    convert(0.0, from, to).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_unit_requests() {
        assert_eq!(UnitRequest::parse("si"), UnitRequest::System(UnitSystem::Si));
        assert_eq!(UnitRequest::parse("EN"), UnitRequest::System(UnitSystem::En));
        assert_eq!(UnitRequest::parse("cfs"), UnitRequest::Concrete("cfs".into()));
        assert_eq!(UnitRequest::parse("EN").resolve("Flow", "cms"), "cfs");
        assert_eq!(UnitRequest::parse("SI").resolve("Widgets", "wd"), "wd");
        assert_eq!(UnitRequest::parse("kcfs").resolve("Flow", "cms"), "kcfs");
    }

    #[test]
    fn test_conversions() {
        assert!(close(convert(1.0, "m", "ft").unwrap(), 3.280_839_895));
        assert!(close(convert(100.0, "C", "F").unwrap(), 212.0));
        assert!(close(convert(32.0, "F", "C").unwrap(), 0.0));
        assert!(close(convert(1.0, "cms", "cfs").unwrap(), 35.314_666_721));
        assert_eq!(convert(7.5, "furlongs", "furlongs").unwrap(), 7.5);
    }

    #[test]
    fn test_incompatible_units() {
        assert!(matches!(convert(1.0, "cfs", "ft"), Err(Error::Validation(_))));
        assert!(matches!(convert(1.0, "cfs", "gallons"), Err(Error::Validation(_))));
    }
}
