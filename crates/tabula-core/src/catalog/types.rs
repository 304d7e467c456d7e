//! Core type definitions for the catalog.

use crate::error::Error;
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Logical column kinds.
///
/// The set is closed: every column in every table carries exactly one of
/// these tags, and the tag decides both the physical SQL type and the value
/// substituted when an existing value cannot be cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TypeTag {
    /// Non-negative whole number (`UI`).
    UnsignedInteger,
    /// Whole number (`SI`).
    SignedInteger,
    /// Non-negative fixed-scale number (`UD`).
    UnsignedDecimal,
    /// Fixed-scale number (`SD`).
    SignedDecimal,
    /// Calendar date stored as a CCYYMMDD integer (`D1`).
    Date,
    /// Alphanumeric text (`NA`).
    Alpha,
    /// Alphanumeric text folded to upper case (`UA`).
    UpperAlpha,
    /// Alphanumeric text folded to lower case (`LA`).
    LowerAlpha,
    /// Large free-form text (`TX`).
    Text,
    /// Binary data (`BL`).
    Blob,
}

/// Broad storage class of a [`TypeTag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// Stored as an SQL INTEGER.
    Integer,
    /// Stored as an SQL REAL.
    Decimal,
    /// Stored as a CCYYMMDD INTEGER.
    Date,
    /// Stored as SQL TEXT.
    Text,
    /// Stored as an SQL BLOB.
    Blob,
}

/// What a column falls back to when a value cannot be cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultPolicy {
    /// Empty string (or empty blob).
    Blank,
    /// Numeric zero.
    Zero,
}

impl TypeTag {
    /// Every tag, in code order.
    pub const ALL: [TypeTag; 10] = [
        TypeTag::UnsignedInteger,
        TypeTag::SignedInteger,
        TypeTag::UnsignedDecimal,
        TypeTag::SignedDecimal,
        TypeTag::Date,
        TypeTag::Alpha,
        TypeTag::UpperAlpha,
        TypeTag::LowerAlpha,
        TypeTag::Text,
        TypeTag::Blob,
    ];

    /// Two-letter code stored in the field metadata table.
    pub fn code(&self) -> &'static str {
        match self {
            TypeTag::UnsignedInteger => "UI",
            TypeTag::SignedInteger => "SI",
            TypeTag::UnsignedDecimal => "UD",
            TypeTag::SignedDecimal => "SD",
            TypeTag::Date => "D1",
            TypeTag::Alpha => "NA",
            TypeTag::UpperAlpha => "UA",
            TypeTag::LowerAlpha => "LA",
            TypeTag::Text => "TX",
            TypeTag::Blob => "BL",
        }
    }

    /// Storage class of this tag.
    pub fn kind(&self) -> TypeKind {
        match self {
            TypeTag::UnsignedInteger | TypeTag::SignedInteger => TypeKind::Integer,
            TypeTag::UnsignedDecimal | TypeTag::SignedDecimal => TypeKind::Decimal,
            TypeTag::Date => TypeKind::Date,
            TypeTag::Alpha | TypeTag::UpperAlpha | TypeTag::LowerAlpha | TypeTag::Text => {
                TypeKind::Text
            }
            TypeTag::Blob => TypeKind::Blob,
        }
    }

    /// Default-value policy used when coercion fails.
    pub fn default_policy(&self) -> DefaultPolicy {
        match self.kind() {
            TypeKind::Integer | TypeKind::Decimal | TypeKind::Date => DefaultPolicy::Zero,
            TypeKind::Text | TypeKind::Blob => DefaultPolicy::Blank,
        }
    }

    /// The concrete default value for this tag.
    pub fn default_value(&self) -> Value {
        match self.kind() {
            TypeKind::Integer | TypeKind::Date => Value::Integer(0),
            TypeKind::Decimal => Value::Real(0.0),
            TypeKind::Text => Value::Text(String::new()),
            TypeKind::Blob => Value::Blob(Vec::new()),
        }
    }

    /// SQL column type used by the DDL creator.
    pub fn sql_type(&self) -> &'static str {
        match self.kind() {
            TypeKind::Integer | TypeKind::Date => "INTEGER",
            TypeKind::Decimal => "REAL",
            TypeKind::Text => "TEXT",
            TypeKind::Blob => "BLOB",
        }
    }

    /// Whether negative values are rejected.
    pub fn is_unsigned(&self) -> bool {
        matches!(self, TypeTag::UnsignedInteger | TypeTag::UnsignedDecimal)
    }

    /// Large-text or binary columns cannot be indexed by the storage engine.
    pub fn is_large(&self) -> bool {
        matches!(self, TypeTag::Text | TypeTag::Blob)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for TypeTag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        TypeTag::ALL
            .into_iter()
            .find(|tag| tag.code().eq_ignore_ascii_case(code))
            .ok_or_else(|| Error::UnknownTypeTag(s.to_string()))
    }
}

impl TryFrom<String> for TypeTag {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TypeTag> for String {
    fn from(tag: TypeTag) -> Self {
        tag.code().to_string()
    }
}

/// Declared width of a column: total digits (or characters) and decimal places.
///
/// Written as `7` or `7.2`. Decimal places are a single digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "RawSize", into = "String")]
pub struct FieldSize {
    /// Total width.
    pub width: u16,
    /// Digits after the decimal point.
    pub places: u8,
}

impl FieldSize {
    /// A size with no decimal places.
    pub const fn new(width: u16) -> Self {
        Self { width, places: 0 }
    }

    /// A size with decimal places.
    pub const fn decimal(width: u16, places: u8) -> Self {
        Self { width, places }
    }
}

impl fmt::Display for FieldSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.places == 0 {
            write!(f, "{}", self.width)
        } else {
            write!(f, "{}.{}", self.width, self.places)
        }
    }
}

impl FromStr for FieldSize {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidSize(s.to_string());
        let text = s.trim();
        let (width, places) = match text.split_once('.') {
            Some((w, p)) => (w, p),
            None => (text, "0"),
        };
        let width: u16 = width.parse().map_err(|_| invalid())?;
        let places: u8 = if places.is_empty() {
            0
        } else {
            places.parse().map_err(|_| invalid())?
        };
        if places > 9 {
            return Err(invalid());
        }
        Ok(Self { width, places })
    }
}

impl From<FieldSize> for String {
    fn from(size: FieldSize) -> Self {
        size.to_string()
    }
}

/// Sizes arrive either as `"7.2"` or as the number `7.2`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawSize {
    Text(String),
    Number(f64),
}

impl TryFrom<RawSize> for FieldSize {
    type Error = Error;

    fn try_from(raw: RawSize) -> Result<Self, Self::Error> {
        match raw {
            RawSize::Text(text) => text.parse(),
            RawSize::Number(n) => n.to_string().parse(),
        }
    }
}
