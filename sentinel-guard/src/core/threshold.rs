//! Numeric bounds used to classify a check's measured value.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An inclusive numeric range.
///
/// A missing bound means the range is open on that side; a threshold with no
/// bounds accepts every value. A threshold is immutable once constructed.
///
/// # Examples
///
/// ```rust
/// use sentinel_guard::core::Threshold;
///
/// let range = Threshold::between(3.0, 10.0);
/// assert!(range.is_within(3.0));
/// assert!(range.is_within(10.0));
/// assert!(!range.is_within(10.001));
///
/// assert!(Threshold::at_least(100.0).is_within(150.0));
/// assert!(Threshold::unbounded().is_within(-42.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "ThresholdSpec")]
pub struct Threshold {
    lower: Option<f64>,
    upper: Option<f64>,
}

/// Wire shape accepted when deserializing: either `value` or `lower`/`upper`.
#[derive(Deserialize)]
struct ThresholdSpec {
    #[serde(default)]
    value: Option<f64>,
    #[serde(default)]
    lower: Option<f64>,
    #[serde(default)]
    upper: Option<f64>,
}

impl From<ThresholdSpec> for Threshold {
    fn from(spec: ThresholdSpec) -> Self {
        match spec.value {
            Some(value) => Threshold::exact(value),
            None => Threshold::new(spec.lower, spec.upper),
        }
    }
}

impl Threshold {
    /// Creates a threshold from optional bounds.
    pub fn new(lower: Option<f64>, upper: Option<f64>) -> Self {
        Self { lower, upper }
    }

    /// A threshold that accepts every value.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// The `value` shorthand: both bounds set to the same number.
    pub fn exact(value: f64) -> Self {
        Self::new(Some(value), Some(value))
    }

    /// `value >= lower`
    pub fn at_least(lower: f64) -> Self {
        Self::new(Some(lower), None)
    }

    /// `value <= upper`
    pub fn at_most(upper: f64) -> Self {
        Self::new(None, Some(upper))
    }

    /// `lower <= value <= upper`
    pub fn between(lower: f64, upper: f64) -> Self {
        Self::new(Some(lower), Some(upper))
    }

    /// Returns the lower bound, if any.
    pub fn lower(&self) -> Option<f64> {
        self.lower
    }

    /// Returns the upper bound, if any.
    pub fn upper(&self) -> Option<f64> {
        self.upper
    }

    /// Returns true when neither bound is set.
    pub fn is_unbounded(&self) -> bool {
        self.lower.is_none() && self.upper.is_none()
    }

    /// Inclusive containment test.
    pub fn is_within(&self, value: f64) -> bool {
        if let Some(lower) = self.lower {
            if value < lower {
                return false;
            }
        }
        if let Some(upper) = self.upper {
            if value > upper {
                return false;
            }
        }
        true
    }

    /// Human-readable description used in result messages.
    pub fn describe(&self) -> String {
        match (self.lower, self.upper) {
            (None, None) => "no threshold".to_string(),
            (Some(lower), Some(upper)) if lower == upper => format!("threshold = {lower}"),
            (lower, upper) => {
                let lower = lower.map_or_else(|| "-∞".to_string(), |v| v.to_string());
                let upper = upper.map_or_else(|| "+∞".to_string(), |v| v.to_string());
                format!("range [{lower}, {upper}]")
            }
        }
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_is_inclusive() {
        let threshold = Threshold::between(3.0, 10.0);
        for v in [3.0, 5.0, 10.0] {
            assert!(threshold.is_within(v), "{v} should be within");
        }
        for v in [2.999, 10.001] {
            assert!(!threshold.is_within(v), "{v} should be outside");
        }
    }

    #[test]
    fn test_unbounded_accepts_everything() {
        let threshold = Threshold::unbounded();
        assert!(threshold.is_unbounded());
        assert!(threshold.is_within(0.0));
        assert!(threshold.is_within(-1.0e9));
        assert!(threshold.is_within(f64::MAX));
    }

    #[test]
    fn test_one_sided_bounds() {
        assert!(Threshold::at_least(100.0).is_within(150.0));
        assert!(!Threshold::at_least(100.0).is_within(50.0));
        assert!(Threshold::at_most(0.0).is_within(-3.0));
        assert!(!Threshold::at_most(0.0).is_within(0.5));
    }

    #[test]
    fn test_zero_bound_is_a_real_bound() {
        let threshold = Threshold::exact(0.0);
        assert!(threshold.is_within(0.0));
        assert!(!threshold.is_within(1.0));
        assert_eq!(threshold.describe(), "threshold = 0");
    }

    #[test]
    fn test_describe() {
        assert_eq!(Threshold::exact(5.0).describe(), "threshold = 5");
        assert_eq!(Threshold::between(0.9, 1.1).describe(), "range [0.9, 1.1]");
        assert_eq!(Threshold::at_least(100.0).describe(), "range [100, +∞]");
        assert_eq!(Threshold::at_most(2.5).describe(), "range [-∞, 2.5]");
        assert_eq!(Threshold::unbounded().describe(), "no threshold");
    }

    #[test]
    fn test_deserialize_value_shorthand() {
        let threshold: Threshold = serde_json::from_str(r#"{"value": 5}"#).unwrap();
        assert_eq!(threshold, Threshold::exact(5.0));

        let threshold: Threshold = serde_json::from_str(r#"{"lower": 1.5}"#).unwrap();
        assert_eq!(threshold.lower(), Some(1.5));
        assert_eq!(threshold.upper(), None);

        let threshold: Threshold = serde_json::from_str("{}").unwrap();
        assert!(threshold.is_unbounded());
    }

    #[test]
    fn test_serialize_bounds() {
        let json = serde_json::to_value(Threshold::between(1.0, 2.0)).unwrap();
        assert_eq!(json, serde_json::json!({"lower": 1.0, "upper": 2.0}));
    }
}
