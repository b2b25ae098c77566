// ABOUTME: Raw and resolved feature flag value types
// ABOUTME: RawFlagValue is what providers return, FlagValue is what the service hands out
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Unvalidated flag value as read from a source
///
/// Absence is modelled by the key missing from the [`FeatureFlagRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawFlagValue {
    /// Explicit `null`
    Null,
    /// `true` / `false`
    Bool(bool),
    /// Any JavaScript-style numeric literal
    Number(f64),
    /// Anything else, quotes removed
    Text(String),
}

impl RawFlagValue {
    /// Short type name for log fields
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::Text(_) => "string",
        }
    }
}

impl From<bool> for RawFlagValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for RawFlagValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for RawFlagValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<&str> for RawFlagValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for RawFlagValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl fmt::Display for RawFlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(value) => write!(f, "{value:?}"),
        }
    }
}

/// Flag key to raw value, produced fresh by each provider fetch
pub type FeatureFlagRecord = BTreeMap<String, RawFlagValue>;

/// Validated flag value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    /// Boolean flag value
    Boolean(bool),
    /// Numeric flag value, always finite and within the flag's bounds
    Number(f64),
}

impl FlagValue {
    /// Boolean payload, `None` for numeric values
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(value) => Some(*value),
            Self::Number(_) => None,
        }
    }

    /// Numeric payload, `None` for boolean values
    #[must_use]
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Boolean(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_value_kinds() {
        assert_eq!(RawFlagValue::Null.kind(), "null");
        assert_eq!(RawFlagValue::from(true).kind(), "boolean");
        assert_eq!(RawFlagValue::from(3).kind(), "number");
        assert_eq!(RawFlagValue::from("on").kind(), "string");
    }
}
