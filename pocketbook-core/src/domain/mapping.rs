//! Column mapping and date format selection

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::result::Error;

/// Sentinel used in saved profiles and the CLI for an unmapped field
pub const NOT_MAPPED: &str = "NOT_MAPPED";

/// Semantic fields a CSV column can feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Amount,
    Description,
    Category,
    Date,
}

impl Field {
    pub const ALL: [Field; 4] = [Field::Amount, Field::Description, Field::Category, Field::Date];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Amount => "amount",
            Field::Description => "description",
            Field::Category => "category",
            Field::Date => "date",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to a raw column, or the explicit "not mapped" choice
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum ColumnRef {
    Column(String),
    #[default]
    NotMapped,
}

impl ColumnRef {
    pub fn column(name: impl Into<String>) -> Self {
        Self::Column(name.into())
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Column(name) => Some(name),
            Self::NotMapped => None,
        }
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self, Self::Column(_))
    }
}

impl From<Option<String>> for ColumnRef {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(name) if name != NOT_MAPPED => Self::Column(name),
            _ => Self::NotMapped,
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Column(name) => f.write_str(name),
            Self::NotMapped => f.write_str(NOT_MAPPED),
        }
    }
}

// Profiles store the sentinel string so settings.json stays readable
impl Serialize for ColumnRef {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ColumnRef {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(Self::from(Some(value)))
    }
}

/// Which raw column feeds which semantic field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    #[serde(default)]
    pub amount: ColumnRef,
    #[serde(default)]
    pub description: ColumnRef,
    #[serde(default)]
    pub category: ColumnRef,
    #[serde(default)]
    pub date: ColumnRef,
}

impl ColumnMapping {
    pub fn get(&self, field: Field) -> &ColumnRef {
        match field {
            Field::Amount => &self.amount,
            Field::Description => &self.description,
            Field::Category => &self.category,
            Field::Date => &self.date,
        }
    }

    pub fn set(&mut self, field: Field, column: ColumnRef) {
        match field {
            Field::Amount => self.amount = column,
            Field::Description => self.description = column,
            Field::Category => self.category = column,
            Field::Date => self.date = column,
        }
    }

    /// At least one field must be mapped before a preview can be built
    pub fn has_any_mapped(&self) -> bool {
        Field::ALL.iter().any(|f| self.get(*f).is_mapped())
    }

    /// True if any field reads from the given header
    pub fn references(&self, header: &str) -> bool {
        Field::ALL.iter().any(|f| self.get(*f).name() == Some(header))
    }
}

/// Date formats a user can pin instead of auto-detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DateFormat {
    /// dd.MM.yy
    #[serde(rename = "dd.MM.yy")]
    DayMonthShortYear,
    /// dd.MM.yyyy
    #[serde(rename = "dd.MM.yyyy")]
    DayMonthYear,
    /// MM/dd/yyyy
    #[serde(rename = "MM/dd/yyyy")]
    UsSlash,
    /// yyyy-MM-dd
    #[serde(rename = "yyyy-MM-dd")]
    Iso,
}

impl DateFormat {
    pub const ALL: [DateFormat; 4] = [
        DateFormat::DayMonthShortYear,
        DateFormat::DayMonthYear,
        DateFormat::UsSlash,
        DateFormat::Iso,
    ];

    pub fn pattern(&self) -> &'static str {
        match self {
            DateFormat::DayMonthShortYear => "dd.MM.yy",
            DateFormat::DayMonthYear => "dd.MM.yyyy",
            DateFormat::UsSlash => "MM/dd/yyyy",
            DateFormat::Iso => "yyyy-MM-dd",
        }
    }
}

/// Date format selection: auto-detect or one pinned format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DateFormatHint {
    #[default]
    Auto,
    Explicit(DateFormat),
}

impl fmt::Display for DateFormatHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateFormatHint::Auto => f.write_str("auto"),
            DateFormatHint::Explicit(format) => f.write_str(format.pattern()),
        }
    }
}

impl FromStr for DateFormatHint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("auto") {
            return Ok(DateFormatHint::Auto);
        }
        DateFormat::ALL
            .iter()
            .find(|f| f.pattern() == s)
            .map(|f| DateFormatHint::Explicit(*f))
            .ok_or_else(|| {
                Error::validation(format!(
                    "Unknown date format '{}' (expected auto, dd.MM.yy, dd.MM.yyyy, MM/dd/yyyy or yyyy-MM-dd)",
                    s
                ))
            })
    }
}

impl Serialize for DateFormatHint {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for DateFormatHint {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}
