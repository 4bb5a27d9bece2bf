//! Field-level validation rules
//!
//! Small, deterministic checks shared by the request and response
//! validators. Each check yields at most one finding.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::contracts::UnknownVariant;

/// Categories of validation rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    /// Field must be present and non-empty
    Required,
    /// Field must name a member of an enumerated set
    Enum,
    /// Numeric field must lie within bounds
    Bounds,
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleCategory::Required => write!(f, "required"),
            RuleCategory::Enum => write!(f, "enum"),
            RuleCategory::Bounds => write!(f, "bounds"),
        }
    }
}

/// A single issue detected during validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationFinding {
    pub category: RuleCategory,
    pub field_path: String,
    pub message: String,
}

impl ValidationFinding {
    pub fn new(category: RuleCategory, field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            category,
            field_path: field_path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Require a non-blank string
pub fn require_text<'a>(field: &str, value: Option<&'a str>) -> Result<&'a str, ValidationFinding> {
    match value {
        None => Err(missing(field)),
        Some(s) if s.trim().is_empty() => Err(ValidationFinding::new(
            RuleCategory::Required,
            field,
            format!("{} must not be empty", field),
        )),
        Some(s) => Ok(s),
    }
}

/// Require a value to be present (empty collections are allowed)
pub fn require_present<'a, T>(field: &str, value: Option<&'a T>) -> Result<&'a T, ValidationFinding> {
    value.ok_or_else(|| missing(field))
}

/// Parse an enumerated field
pub fn require_enum<T>(field: &str, value: &str) -> Result<T, ValidationFinding>
where
    T: FromStr<Err = UnknownVariant>,
{
    value
        .parse::<T>()
        .map_err(|e| ValidationFinding::new(RuleCategory::Enum, field, e.to_string()))
}

fn missing(field: &str) -> ValidationFinding {
    ValidationFinding::new(RuleCategory::Required, field, format!("{} is required", field))
}

/// Numeric bounds specification (inclusive)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericBounds {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl NumericBounds {
    pub const SCORE: NumericBounds = NumericBounds {
        min: Some(0.0),
        max: Some(100.0),
    };

    pub const NON_NEGATIVE: NumericBounds = NumericBounds {
        min: Some(0.0),
        max: None,
    };

    /// Check a value, producing a finding for the named field when out of bounds
    pub fn check(&self, field: &str, value: f64) -> Result<f64, ValidationFinding> {
        let below = self.min.map_or(false, |min| value < min);
        let above = self.max.map_or(false, |max| value > max);
        if !value.is_finite() || below || above {
            return Err(ValidationFinding::new(
                RuleCategory::Bounds,
                field,
                format!("{} must be {}, got {}", field, self.describe(), value),
            ));
        }
        Ok(value)
    }

    fn describe(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("within [{}, {}]", min, max),
            (Some(min), None) => format!(">= {}", min),
            (None, Some(max)) => format!("<= {}", max),
            (None, None) => "a finite number".to_string(),
        }
    }
}
