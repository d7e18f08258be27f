//! # Typed Values — Field Types and Coerced Scalars
//!
//! Defines the closed set of warehouse column types and the value each raw
//! token is coerced into.
//!
//! ## Precision Invariant
//!
//! `NUMERIC` measurements (inches of rain, for example) are held as a
//! [`Decimal`]: a scaled `i128` mantissa that keeps every digit and the scale
//! exactly as written. They are never routed through `f64`, so `3.20`
//! serializes back as `3.20`.
//!
//! ## Geography
//!
//! A [`GeoPoint`] is accepted either as WKT `POINT(lon lat)` or as a bare
//! `lat,lon` pair. Note the axis order differs between the two spellings.
//! Output is always WKT.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

/// Maximum number of significant digits in a `NUMERIC` value.
pub const NUMERIC_MAX_DIGITS: usize = 38;

/// Maximum number of fractional digits in a `NUMERIC` value.
pub const NUMERIC_MAX_SCALE: usize = 9;

/// The recognized column types of an output record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldType {
    /// A point on the earth's surface.
    Geography,
    /// 64-bit signed integer.
    Integer,
    /// UTF-8 text, empty allowed.
    String,
    /// Exact decimal.
    Numeric,
    /// `true` or `false`.
    Boolean,
    /// Calendar date without time zone.
    Date,
}

impl FieldType {
    /// Returns all field types in declaration order.
    pub fn all() -> &'static [FieldType] {
        &[
            Self::Geography,
            Self::Integer,
            Self::String,
            Self::Numeric,
            Self::Boolean,
            Self::Date,
        ]
    }

    /// Returns the canonical upper-case name used in schema documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Geography => "GEOGRAPHY",
            Self::Integer => "INTEGER",
            Self::String => "STRING",
            Self::Numeric => "NUMERIC",
            Self::Boolean => "BOOLEAN",
            Self::Date => "DATE",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A type name outside the recognized set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown field type: {0:?}")]
pub struct UnknownFieldType(pub String);

impl FromStr for FieldType {
    type Err = UnknownFieldType;

    /// Parse a field type name, ignoring ASCII case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownFieldType(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Decimal
// ---------------------------------------------------------------------------

/// Why a token is not a valid decimal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecimalParseError {
    /// Nothing to parse.
    #[error("empty number")]
    Empty,
    /// A character other than a sign, digit, or a single point.
    #[error("invalid decimal syntax")]
    InvalidSyntax,
    /// More fractional digits than `NUMERIC` allows.
    #[error("more than 9 fractional digits")]
    ScaleTooLarge,
    /// More significant digits than `NUMERIC` allows.
    #[error("more than 38 significant digits")]
    TooManyDigits,
}

/// An exact base-10 decimal: `mantissa * 10^-scale`.
///
/// Equality is on the written form: `3.2` and `3.20` are different values
/// because they carry different scales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Decimal {
    mantissa: i128,
    scale: u8,
}

impl Decimal {
    /// Build a decimal from its parts.
    pub fn new(mantissa: i128, scale: u8) -> Self {
        Self { mantissa, scale }
    }

    /// The unscaled integer value.
    pub fn mantissa(&self) -> i128 {
        self.mantissa
    }

    /// Number of digits after the decimal point.
    pub fn scale(&self) -> u8 {
        self.scale
    }
}

impl FromStr for Decimal {
    type Err = DecimalParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(DecimalParseError::Empty);
        }
        let (negative, unsigned) = match s.as_bytes()[0] {
            b'-' => (true, &s[1..]),
            b'+' => (false, &s[1..]),
            _ => (false, s),
        };
        let (int_part, frac_part) = match unsigned.split_once('.') {
            Some((i, f)) => (i, f),
            None => (unsigned, ""),
        };
        let all_digits = |p: &str| p.bytes().all(|b| b.is_ascii_digit());
        if int_part.is_empty()
            || !all_digits(int_part)
            || !all_digits(frac_part)
            || (unsigned.contains('.') && frac_part.is_empty())
        {
            return Err(DecimalParseError::InvalidSyntax);
        }
        if frac_part.len() > NUMERIC_MAX_SCALE {
            return Err(DecimalParseError::ScaleTooLarge);
        }

        let significant = int_part.trim_start_matches('0').len() + frac_part.len();
        if significant > NUMERIC_MAX_DIGITS {
            return Err(DecimalParseError::TooManyDigits);
        }

        let mut mantissa: i128 = 0;
        for b in int_part.bytes().chain(frac_part.bytes()) {
            mantissa = mantissa * 10 + i128::from(b - b'0');
        }
        if negative {
            mantissa = -mantissa;
        }
        Ok(Self {
            mantissa,
            scale: frac_part.len() as u8,
        })
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.mantissa.unsigned_abs().to_string();
        let scale = usize::from(self.scale);
        if self.mantissa < 0 {
            f.write_str("-")?;
        }
        if scale == 0 {
            return f.write_str(&digits);
        }
        let padded = format!("{digits:0>width$}", width = scale + 1);
        let (int_part, frac_part) = padded.split_at(padded.len() - scale);
        write!(f, "{int_part}.{frac_part}")
    }
}

impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ---------------------------------------------------------------------------
// GeoPoint
// ---------------------------------------------------------------------------

/// Why a token is not a valid point.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeoParseError {
    /// Neither `POINT(lon lat)` nor `lat,lon`.
    #[error("expected POINT(lon lat) or lat,lon")]
    UnrecognizedShape,
    /// A coordinate is not a finite number.
    #[error("invalid coordinate {0:?}")]
    InvalidCoordinate(String),
    /// Latitude outside [-90, 90] or longitude outside [-180, 180].
    #[error("coordinate out of range: lat {latitude}, lon {longitude}")]
    OutOfRange {
        /// Parsed latitude.
        latitude: f64,
        /// Parsed longitude.
        longitude: f64,
    },
}

/// A WGS84 point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    longitude: f64,
    latitude: f64,
}

impl GeoPoint {
    /// Build a point, checking coordinate ranges.
    pub fn new(longitude: f64, latitude: f64) -> Result<Self, GeoParseError> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(GeoParseError::OutOfRange {
                latitude,
                longitude,
            });
        }
        Ok(Self {
            longitude,
            latitude,
        })
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Render as WKT, e.g. `POINT(-122.4194 37.7749)`.
    pub fn to_wkt(&self) -> String {
        format!("POINT({} {})", self.longitude, self.latitude)
    }
}

fn parse_coordinate(s: &str) -> Result<f64, GeoParseError> {
    let s = s.trim();
    s.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| GeoParseError::InvalidCoordinate(s.to_string()))
}

impl FromStr for GeoPoint {
    type Err = GeoParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        let is_wkt = s.get(..5).is_some_and(|p| p.eq_ignore_ascii_case("POINT"));
        if is_wkt {
            let body = s[5..]
                .trim()
                .strip_prefix('(')
                .and_then(|b| b.strip_suffix(')'))
                .ok_or(GeoParseError::UnrecognizedShape)?;
            let mut parts = body.split_whitespace();
            let (Some(lon), Some(lat), None) = (parts.next(), parts.next(), parts.next()) else {
                return Err(GeoParseError::UnrecognizedShape);
            };
            return Self::new(parse_coordinate(lon)?, parse_coordinate(lat)?);
        }

        let (lat, lon) = s.split_once(',').ok_or(GeoParseError::UnrecognizedShape)?;
        if lon.contains(',') {
            return Err(GeoParseError::UnrecognizedShape);
        }
        Self::new(parse_coordinate(lon)?, parse_coordinate(lat)?)
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wkt())
    }
}

impl Serialize for GeoPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ---------------------------------------------------------------------------
// TypedValue
// ---------------------------------------------------------------------------

/// A token after coercion to its declared field type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Geography(GeoPoint),
    Integer(i64),
    String(String),
    Numeric(Decimal),
    Boolean(bool),
    Date(NaiveDate),
    /// No value: an empty token for a non-STRING field.
    Null,
}

impl TypedValue {
    /// The field type this value belongs to, or `None` for `Null`.
    pub fn field_type(&self) -> Option<FieldType> {
        match self {
            Self::Geography(_) => Some(FieldType::Geography),
            Self::Integer(_) => Some(FieldType::Integer),
            Self::String(_) => Some(FieldType::String),
            Self::Numeric(_) => Some(FieldType::Numeric),
            Self::Boolean(_) => Some(FieldType::Boolean),
            Self::Date(_) => Some(FieldType::Date),
            Self::Null => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// Serializes to the shape a warehouse JSON load expects: NUMERIC as a
/// string, DATE as `YYYY-MM-DD`, GEOGRAPHY as WKT.
impl Serialize for TypedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Geography(p) => p.serialize(serializer),
            Self::Integer(i) => serializer.serialize_i64(*i),
            Self::String(s) => serializer.serialize_str(s),
            Self::Numeric(d) => d.serialize(serializer),
            Self::Boolean(b) => serializer.serialize_bool(*b),
            Self::Date(d) => serializer.collect_str(&d.format("%Y-%m-%d")),
            Self::Null => serializer.serialize_unit(),
        }
    }
}
