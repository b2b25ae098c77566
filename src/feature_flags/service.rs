// ABOUTME: Feature flag evaluation service validating raw provider values against definitions
// ABOUTME: Invalid or out-of-range values degrade to defaults with a warning, never an error
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::definitions::{FeatureFlag, FlagDefinition};
use super::parser::parse_js_number;
use super::providers::FlagProvider;
use super::types::{FlagValue, RawFlagValue};
use crate::errors::{AppError, AppResult};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Stateless facade over one flag provider
///
/// Every call fetches the provider's current record, so flag changes take
/// effect on the next request.
#[derive(Clone)]
pub struct FeatureFlagService {
    provider: Arc<dyn FlagProvider>,
}

impl FeatureFlagService {
    /// Create a service reading from `provider`
    #[must_use]
    pub fn new(provider: Arc<dyn FlagProvider>) -> Self {
        Self { provider }
    }

    /// Name of the underlying provider
    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Current validated value of `flag`
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot produce flags
    pub async fn get(&self, flag: FeatureFlag) -> AppResult<FlagValue> {
        let record = self.provider.get_flags().await?;
        Ok(resolve_flag(flag, record.get(flag.key())))
    }

    /// Current validated value of the flag named `key`
    ///
    /// # Errors
    ///
    /// Returns an invalid input error for unknown keys, or a provider error
    pub async fn get_by_key(&self, key: &str) -> AppResult<FlagValue> {
        let flag: FeatureFlag = key.parse()?;
        self.get(flag).await
    }

    /// Whether a boolean flag is on
    ///
    /// # Errors
    ///
    /// Returns an invalid input error for numeric flags, or a provider error
    pub async fn is_enabled(&self, flag: FeatureFlag) -> AppResult<bool> {
        if !flag.is_boolean() {
            return Err(AppError::invalid_input(format!(
                "Feature flag {flag} is not a boolean flag"
            )));
        }
        self.get(flag).await?.as_bool().ok_or_else(|| {
            AppError::internal(format!("Feature flag {flag} resolved to a number"))
        })
    }

    /// Value of a numeric flag
    ///
    /// # Errors
    ///
    /// Returns an invalid input error for boolean flags, or a provider error
    pub async fn get_number(&self, flag: FeatureFlag) -> AppResult<f64> {
        if flag.is_boolean() {
            return Err(AppError::invalid_input(format!(
                "Feature flag {flag} is not a numeric flag"
            )));
        }
        self.get(flag).await?.as_number().ok_or_else(|| {
            AppError::internal(format!("Feature flag {flag} resolved to a boolean"))
        })
    }

    /// Value of a numeric flag truncated to a count
    ///
    /// # Errors
    ///
    /// Same as [`Self::get_number`]
    pub async fn get_usize(&self, flag: FeatureFlag) -> AppResult<usize> {
        let value = self.get_number(flag).await?;
        Ok(value.trunc().max(0.0) as usize)
    }

    /// Validated value of every recognized flag from a single provider fetch
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot produce flags
    pub async fn snapshot(&self) -> AppResult<BTreeMap<String, FlagValue>> {
        let record = self.provider.get_flags().await?;
        Ok(FeatureFlag::ALL
            .into_iter()
            .map(|flag| {
                (
                    flag.key().to_owned(),
                    resolve_flag(flag, record.get(flag.key())),
                )
            })
            .collect())
    }
}

/// Validate and coerce one raw value against the flag's definition
#[must_use]
pub fn resolve_flag(flag: FeatureFlag, raw: Option<&RawFlagValue>) -> FlagValue {
    match flag.definition() {
        FlagDefinition::Boolean { default } => FlagValue::Boolean(resolve_boolean(flag, raw, default)),
        definition @ FlagDefinition::Number { default, .. } => {
            FlagValue::Number(resolve_number(flag, raw, &definition, default))
        }
    }
}

fn resolve_boolean(flag: FeatureFlag, raw: Option<&RawFlagValue>, default: bool) -> bool {
    match raw {
        Some(RawFlagValue::Bool(value)) => *value,
        Some(RawFlagValue::Number(value)) => *value != 0.0,
        Some(RawFlagValue::Text(text)) => match text.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => true,
            "false" | "0" | "no" | "off" => false,
            _ => {
                warn!(flag = %flag, value = %text, default, "Invalid boolean flag value, using default");
                default
            }
        },
        Some(RawFlagValue::Null) | None => {
            warn!(flag = %flag, default, "Boolean flag has no value, using default");
            default
        }
    }
}

fn resolve_number(
    flag: FeatureFlag,
    raw: Option<&RawFlagValue>,
    definition: &FlagDefinition,
    default: f64,
) -> f64 {
    let parsed = match raw {
        None | Some(RawFlagValue::Null) => {
            debug!(flag = %flag, default, "Numeric flag not set, using default");
            return default;
        }
        Some(RawFlagValue::Text(text)) if text.trim().is_empty() => {
            debug!(flag = %flag, default, "Numeric flag is empty, using default");
            return default;
        }
        Some(RawFlagValue::Number(value)) => Some(*value),
        Some(RawFlagValue::Text(text)) => parse_js_number(text),
        Some(RawFlagValue::Bool(_)) => None,
    };

    let Some(value) = parsed.filter(|value| value.is_finite()) else {
        warn!(
            flag = %flag,
            value = ?raw,
            kind = raw.map_or("unset", RawFlagValue::kind),
            default,
            "Invalid numeric flag value, using default"
        );
        return default;
    };

    if !definition.in_range(value) {
        warn!(flag = %flag, value, default, "Numeric flag out of range, using default");
        return default;
    }
    value
}
