//! Unit and equivalency handling
//!
//! Motors speak in steps, drives are configured in revolutions and users
//! think in physical lengths. A [`Unit`] tags a value with one of those
//! dimensions plus a time order (position, rate, acceleration), and an
//! [`EquivalenceTable`] carries the per-axis scalars that relate the
//! otherwise incompatible dimensions.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::{Result, ValidationError};

/// Category used to reject conversions between unrelated units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhysicalType {
    /// Motor steps
    Steps,
    /// Rotation (revolutions, degrees, radians)
    Angle,
    /// Linear distance
    Length,
}

impl fmt::Display for PhysicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Steps => write!(f, "steps"),
            Self::Angle => write!(f, "angle"),
            Self::Length => write!(f, "length"),
        }
    }
}

/// Time derivative carried by a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum TimeOrder {
    /// Plain position, e.g. `cm`
    #[default]
    Position,
    /// First derivative, e.g. `cm/s`
    Rate,
    /// Second derivative, e.g. `cm/s2`
    Acceleration,
}

impl TimeOrder {
    fn suffix(self) -> &'static str {
        match self {
            Self::Position => "",
            Self::Rate => "/s",
            Self::Acceleration => "/s2",
        }
    }

    fn from_count(count: u8) -> Option<Self> {
        match count {
            0 => Some(Self::Position),
            1 => Some(Self::Rate),
            2 => Some(Self::Acceleration),
            _ => None,
        }
    }
}

struct BaseUnit {
    symbol: &'static str,
    aliases: &'static [&'static str],
    physical_type: PhysicalType,
    scale: f64,
}

// scale is relative to the first entry of each physical type
const BASE_UNITS: &[BaseUnit] = &[
    BaseUnit {
        symbol: "steps",
        aliases: &["step"],
        physical_type: PhysicalType::Steps,
        scale: 1.0,
    },
    BaseUnit {
        symbol: "rev",
        aliases: &["revs", "revolution", "revolutions"],
        physical_type: PhysicalType::Angle,
        scale: 1.0,
    },
    BaseUnit {
        symbol: "deg",
        aliases: &["degree", "degrees"],
        physical_type: PhysicalType::Angle,
        scale: 1.0 / 360.0,
    },
    BaseUnit {
        symbol: "rad",
        aliases: &["radian", "radians"],
        physical_type: PhysicalType::Angle,
        scale: 1.0 / (2.0 * PI),
    },
    BaseUnit {
        symbol: "m",
        aliases: &["meter", "meters"],
        physical_type: PhysicalType::Length,
        scale: 1.0,
    },
    BaseUnit {
        symbol: "cm",
        aliases: &["centimeter", "centimeters"],
        physical_type: PhysicalType::Length,
        scale: 1e-2,
    },
    BaseUnit {
        symbol: "mm",
        aliases: &["millimeter", "millimeters"],
        physical_type: PhysicalType::Length,
        scale: 1e-3,
    },
    BaseUnit {
        symbol: "um",
        aliases: &["micron", "microns"],
        physical_type: PhysicalType::Length,
        scale: 1e-6,
    },
    BaseUnit {
        symbol: "in",
        aliases: &["inch", "inches"],
        physical_type: PhysicalType::Length,
        scale: 0.0254,
    },
    BaseUnit {
        symbol: "ft",
        aliases: &["foot", "feet"],
        physical_type: PhysicalType::Length,
        scale: 0.3048,
    },
];

/// An immutable physical unit tag
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(into = "String")]
pub struct Unit {
    symbol: &'static str,
    physical_type: PhysicalType,
    scale: f64,
    time_order: TimeOrder,
}

impl Unit {
    fn from_base(base: &BaseUnit, time_order: TimeOrder) -> Self {
        Self {
            symbol: base.symbol,
            physical_type: base.physical_type,
            scale: base.scale,
            time_order,
        }
    }

    /// Motor steps
    pub fn steps() -> Self {
        Self::from_base(&BASE_UNITS[0], TimeOrder::Position)
    }

    /// Motor revolutions
    pub fn rev() -> Self {
        Self::from_base(&BASE_UNITS[1], TimeOrder::Position)
    }

    /// Parse a unit string such as `cm`, `steps/s` or `rev/s2`
    pub fn parse(s: &str) -> Result<Self> {
        Ok(s.parse()?)
    }

    /// Base symbol without any time suffix
    pub fn symbol(&self) -> &'static str {
        self.symbol
    }

    /// Physical category of the unit
    pub fn physical_type(&self) -> PhysicalType {
        self.physical_type
    }

    /// Time derivative of the unit
    pub fn time_order(&self) -> TimeOrder {
        self.time_order
    }

    /// Same base unit with a different time order
    pub fn with_time_order(self, time_order: TimeOrder) -> Self {
        Self { time_order, ..self }
    }

    /// `self / s`
    pub fn per_second(self) -> Self {
        self.with_time_order(TimeOrder::Rate)
    }

    /// `self / s^2`
    pub fn per_second_squared(self) -> Self {
        self.with_time_order(TimeOrder::Acceleration)
    }

    /// True when the two units differ only by a scale factor
    pub fn is_commensurable(&self, other: &Unit) -> bool {
        self.physical_type == other.physical_type && self.time_order == other.time_order
    }

    /// Factor that converts a value in `self` into `other`
    pub fn scale_to(&self, other: &Unit) -> Result<f64> {
        if !self.is_commensurable(other) {
            return Err(incompatible(self, other));
        }
        Ok(self.scale / other.scale)
    }
}

impl PartialEq for Unit {
    fn eq(&self, other: &Self) -> bool {
        self.symbol == other.symbol && self.time_order == other.time_order
    }
}

impl Eq for Unit {}

impl Hash for Unit {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.symbol.hash(state);
        self.time_order.hash(state);
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.symbol, self.time_order.suffix())
    }
}

impl FromStr for Unit {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let unknown = || ValidationError::UnknownUnit { unit: s.to_string() };

        let lowered = s.trim().to_lowercase();
        let mut parts = lowered.split('/').map(str::trim);
        let head = parts.next().ok_or_else(unknown)?;
        let base = BASE_UNITS
            .iter()
            .find(|b| b.symbol == head || b.aliases.contains(&head))
            .ok_or_else(unknown)?;

        let mut order = 0u8;
        for part in parts {
            order += match part {
                "s" | "sec" => 1,
                "s2" | "s^2" | "s**2" => 2,
                _ => return Err(unknown()),
            };
        }
        let time_order = TimeOrder::from_count(order).ok_or_else(unknown)?;

        Ok(Self::from_base(base, time_order))
    }
}

impl<'de> Deserialize<'de> for Unit {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

impl From<Unit> for String {
    fn from(unit: Unit) -> Self {
        unit.to_string()
    }
}

fn incompatible(from: &Unit, to: &Unit) -> crate::error::Error {
    ValidationError::IncompatibleUnits {
        from: from.to_string(),
        to: to.to_string(),
    }
    .into()
}

/// A value tagged with a unit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    /// Magnitude
    pub value: f64,
    /// Unit of `value`
    pub unit: Unit,
}

impl Quantity {
    /// Create a new quantity
    pub fn new(value: f64, unit: Unit) -> Self {
        Self { value, unit }
    }

    /// Express this quantity in `unit`, consulting `equivalencies` when
    /// the physical types differ.
    pub fn to(&self, unit: Unit, equivalencies: &EquivalenceTable) -> Result<Quantity> {
        let value = equivalencies.convert(self.value, &self.unit, &unit)?;
        Ok(Quantity::new(value, unit))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}

/// One multiplicative relation, `b = a * factor`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Equivalence {
    /// Source unit
    pub a: Unit,
    /// Target unit
    pub b: Unit,
    /// Factor taking a value in `a` to a value in `b`
    pub factor: f64,
}

/// Set of equivalencies relating otherwise incompatible units
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EquivalenceTable {
    entries: Vec<Equivalence>,
}

impl EquivalenceTable {
    /// Table with no cross-type relations
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build the table for one axis.
    ///
    /// `units_per_rev` is expressed in `axis_unit` per revolution. Every
    /// relation is repeated for the rate and acceleration variants with
    /// the same factor.
    pub fn for_axis(steps_per_rev: f64, units_per_rev: f64, axis_unit: Unit) -> Result<Self> {
        if !(steps_per_rev.is_finite() && steps_per_rev > 0.0) {
            return Err(ValidationError::invalid(
                "steps_per_rev",
                format!("must be a positive number, got {steps_per_rev}"),
            )
            .into());
        }
        if !(units_per_rev.is_finite() && units_per_rev != 0.0) {
            return Err(ValidationError::invalid(
                "units_per_rev",
                format!("must be a non-zero number, got {units_per_rev}"),
            )
            .into());
        }

        let axis_unit = axis_unit.with_time_order(TimeOrder::Position);
        let base = [
            Equivalence {
                a: Unit::rev(),
                b: Unit::steps(),
                factor: steps_per_rev,
            },
            Equivalence {
                a: Unit::rev(),
                b: axis_unit,
                factor: units_per_rev,
            },
            Equivalence {
                a: Unit::steps(),
                b: axis_unit,
                factor: units_per_rev / steps_per_rev,
            },
        ];

        let mut entries = Vec::with_capacity(base.len() * 3);
        for order in [TimeOrder::Position, TimeOrder::Rate, TimeOrder::Acceleration] {
            entries.extend(base.iter().map(|eq| Equivalence {
                a: eq.a.with_time_order(order),
                b: eq.b.with_time_order(order),
                factor: eq.factor,
            }));
        }

        Ok(Self { entries })
    }

    /// All relations in the table
    pub fn entries(&self) -> &[Equivalence] {
        &self.entries
    }

    /// Convert `value` from `from` into `to`
    pub fn convert(&self, value: f64, from: &Unit, to: &Unit) -> Result<f64> {
        if from.is_commensurable(to) {
            return Ok(value * from.scale_to(to)?);
        }
        if from.time_order != to.time_order {
            return Err(incompatible(from, to));
        }

        for eq in &self.entries {
            if eq.a.time_order != from.time_order {
                continue;
            }
            if from.physical_type == eq.a.physical_type && to.physical_type == eq.b.physical_type {
                let in_a = value * from.scale_to(&eq.a)?;
                return Ok(in_a * eq.factor * eq.b.scale_to(to)?);
            }
            if from.physical_type == eq.b.physical_type && to.physical_type == eq.a.physical_type {
                let in_b = value * from.scale_to(&eq.b)?;
                return Ok(in_b / eq.factor * eq.a.scale_to(to)?);
            }
        }

        Err(incompatible(from, to))
    }
}

/// Motor-native and axis-facing unit pairs used when forwarding commands
pub fn conversion_pairs(axis_unit: Unit) -> Vec<(Unit, Unit)> {
    let axis_unit = axis_unit.with_time_order(TimeOrder::Position);
    vec![
        (Unit::steps(), axis_unit),
        (Unit::steps().per_second(), axis_unit.per_second()),
        (
            Unit::steps().per_second_squared(),
            axis_unit.per_second_squared(),
        ),
        (Unit::rev().per_second(), axis_unit.per_second()),
        (
            Unit::rev().per_second_squared(),
            axis_unit.per_second_squared(),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cm() -> Unit {
        Unit::parse("cm").unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(Unit::parse("cm").unwrap().to_string(), "cm");
        assert_eq!(Unit::parse("Steps/s").unwrap().to_string(), "steps/s");
        assert_eq!(Unit::parse("rev/s/s").unwrap().to_string(), "rev/s2");
        assert_eq!(Unit::parse("rev/s^2").unwrap(), Unit::rev().per_second_squared());
        assert_eq!(Unit::parse("inch").unwrap().symbol(), "in");
        assert!(Unit::parse("furlong").is_err());
        assert!(Unit::parse("cm/s2/s").is_err());
    }

    #[test]
    fn test_same_type_scaling() {
        let table = EquivalenceTable::empty();
        let mm = Unit::parse("mm").unwrap();
        assert!((table.convert(2.5, &cm(), &mm).unwrap() - 25.0).abs() < 1e-12);
        let deg = Unit::parse("deg").unwrap();
        assert!((table.convert(0.5, &Unit::rev(), &deg).unwrap() - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_axis_equivalencies() {
        // 20000 steps per rev, 0.254 cm per rev
        let table = EquivalenceTable::for_axis(20000.0, 0.254, cm()).unwrap();

        let steps = table.convert(0.254, &cm(), &Unit::steps()).unwrap();
        assert!((steps - 20000.0).abs() < 1e-6);

        let rev = table.convert(40000.0, &Unit::steps(), &Unit::rev()).unwrap();
        assert!((rev - 2.0).abs() < 1e-12);

        let mm = Unit::parse("mm").unwrap();
        let steps = table.convert(2.54, &mm, &Unit::steps()).unwrap();
        assert!((steps - 20000.0).abs() < 1e-6);

        let rate = table
            .convert(1.0, &Unit::rev().per_second(), &cm().per_second())
            .unwrap();
        assert!((rate - 0.254).abs() < 1e-12);
    }

    #[test]
    fn test_incompatible_time_orders() {
        let table = EquivalenceTable::for_axis(20000.0, 0.254, cm()).unwrap();
        let err = table
            .convert(1.0, &Unit::steps(), &cm().per_second())
            .unwrap_err();
        assert!(err.is_validation_error());

        let err = EquivalenceTable::empty()
            .convert(1.0, &Unit::steps(), &cm())
            .unwrap_err();
        assert!(err.is_validation_error());
    }

    #[test]
    fn test_quantity_to() {
        let table = EquivalenceTable::for_axis(200.0, 0.5, cm()).unwrap();
        let q = Quantity::new(400.0, Unit::steps()).to(cm(), &table).unwrap();
        assert_eq!(q.unit, cm());
        assert!((q.value - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&cm().per_second()).unwrap();
        assert_eq!(json, "\"cm/s\"");
        let unit: Unit = serde_json::from_str("\"steps/s2\"").unwrap();
        assert_eq!(unit, Unit::steps().per_second_squared());
        assert!(serde_json::from_str::<Unit>("\"parsec\"").is_err());
    }

    #[test]
    fn test_quantity_from_json() {
        let q: Quantity = serde_json::from_str(r#"{"value": 2.5, "unit": "rev/s"}"#).unwrap();
        assert_eq!(q, Quantity::new(2.5, Unit::rev().per_second()));

        let owned = String::from(r#"{"value": 1.0, "unit": "furlong"}"#);
        assert!(serde_json::from_str::<Quantity>(&owned).is_err());
    }

    #[test]
    fn test_conversion_pairs() {
        let pairs = conversion_pairs(cm());
        assert_eq!(pairs.len(), 5);
        assert_eq!(pairs[0], (Unit::steps(), cm()));
        assert_eq!(pairs[3], (Unit::rev().per_second(), cm().per_second()));
    }
}
