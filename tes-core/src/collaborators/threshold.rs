//! Threshold string validation backing `/api/validate/threshold`: malformed
//! input is a typed `Validation` error rather than a panic.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThresholdResult {
    pub value: f64,
    pub unit: ThresholdUnit,
    pub normalized: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdUnit {
    Percent,
    Absolute,
}

pub trait ThresholdValidator: Send + Sync {
    fn validate_threshold(&self, raw: &str) -> Result<ThresholdResult>;
}

pub struct DefaultThresholdValidator;

impl ThresholdValidator for DefaultThresholdValidator {
    fn validate_threshold(&self, raw: &str) -> Result<ThresholdResult> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::validation("threshold", raw, "a non-empty numeric string"));
        }

        let (numeric_part, unit) = if let Some(stripped) = trimmed.strip_suffix('%') {
            (stripped, ThresholdUnit::Percent)
        } else {
            (trimmed, ThresholdUnit::Absolute)
        };

        let value: f64 = numeric_part
            .parse()
            .map_err(|_| Error::validation("threshold", raw, "a number, optionally suffixed with `%`"))?;

        if !value.is_finite() {
            return Err(Error::validation("threshold", raw, "a finite number"));
        }

        let normalized = match unit {
            ThresholdUnit::Percent => value / 100.0,
            ThresholdUnit::Absolute => value,
        };

        Ok(ThresholdResult { value, unit, normalized })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_percent_threshold() {
        let validator = DefaultThresholdValidator;
        let result = validator.validate_threshold("42%").unwrap();
        assert_eq!(result.value, 42.0);
        assert_eq!(result.unit, ThresholdUnit::Percent);
        assert!((result.normalized - 0.42).abs() < 1e-9);
    }

    #[test]
    fn parses_absolute_threshold() {
        let validator = DefaultThresholdValidator;
        let result = validator.validate_threshold("3.5").unwrap();
        assert_eq!(result.unit, ThresholdUnit::Absolute);
        assert_eq!(result.normalized, 3.5);
    }

    #[test]
    fn empty_string_is_an_error() {
        let validator = DefaultThresholdValidator;
        assert!(validator.validate_threshold("").is_err());
    }

    #[test]
    fn garbage_is_an_error() {
        let validator = DefaultThresholdValidator;
        assert!(validator.validate_threshold("not-a-number").is_err());
    }

    #[test]
    fn nan_literal_is_rejected() {
        let validator = DefaultThresholdValidator;
        assert!(validator.validate_threshold("NaN").is_err());
    }
}
