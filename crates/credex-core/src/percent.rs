//! Decimal percentage values carried as fixed two-decimal strings.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// A percentage in [0.00, 100.00], normalized to two decimal places.
///
/// Percentages cross the analysis-provider boundary as strings; this type
/// validates the range once at the edge and keeps a canonical rendering so
/// the same value always hashes identically.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Percent(String);

impl Percent {
    /// Parse and normalize a percent string.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let value: f64 = s
            .trim()
            .parse()
            .map_err(|_| CoreError::InvalidPercent(s.to_string()))?;
        if !value.is_finite() || !(0.0..=100.0).contains(&value) {
            return Err(CoreError::InvalidPercent(s.to_string()));
        }
        Ok(Self(format!("{:.2}", value)))
    }

    /// The canonical string rendering, e.g. `"85.50"`.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The numeric value.
    pub fn value(&self) -> f64 {
        // Infallible by construction: only `parse` builds this type.
        self.0.parse().unwrap_or(0.0)
    }

    /// Whether this percent meets or exceeds a threshold.
    pub fn at_least(&self, threshold: &Percent) -> bool {
        self.value() >= threshold.value()
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Percent({})", self.0)
    }
}
