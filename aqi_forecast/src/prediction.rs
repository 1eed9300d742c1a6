//! Forecast output records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A one-step-ahead AQI forecast.
///
/// `confidence` is a dispersion heuristic over the most recent samples
/// (`1 - coefficient of variation`, floored), not a calibrated probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AqiPrediction {
    /// Forecast rounded to the nearest integer
    pub predicted_value: i64,
    /// Stability of the recent readings, within `[floor, 1]`
    pub confidence: f64,
    /// When the forecast was produced
    pub timestamp: DateTime<Utc>,
}

impl AqiPrediction {
    /// Health category of the forecast value
    pub fn category(&self) -> AqiCategory {
        AqiCategory::from_value(self.predicted_value as f64)
    }

    /// Serialize to a JSON object
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl fmt::Display for AqiPrediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AQI {} ({}), confidence {:.2} at {}",
            self.predicted_value,
            self.category(),
            self.confidence,
            self.timestamp.to_rfc3339()
        )
    }
}

/// Health band of an AQI reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AqiCategory {
    Good,
    Moderate,
    UnhealthyForSensitiveGroups,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

impl AqiCategory {
    /// Band containing `value`; upper bounds are inclusive
    pub fn from_value(value: f64) -> Self {
        match value {
            v if v <= 50.0 => AqiCategory::Good,
            v if v <= 100.0 => AqiCategory::Moderate,
            v if v <= 150.0 => AqiCategory::UnhealthyForSensitiveGroups,
            v if v <= 200.0 => AqiCategory::Unhealthy,
            v if v <= 300.0 => AqiCategory::VeryUnhealthy,
            _ => AqiCategory::Hazardous,
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            AqiCategory::Good => "Good",
            AqiCategory::Moderate => "Moderate",
            AqiCategory::UnhealthyForSensitiveGroups => "Unhealthy for Sensitive Groups",
            AqiCategory::Unhealthy => "Unhealthy",
            AqiCategory::VeryUnhealthy => "Very Unhealthy",
            AqiCategory::Hazardous => "Hazardous",
        }
    }
}

impl fmt::Display for AqiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, AqiCategory::Good)]
    #[case(50.0, AqiCategory::Good)]
    #[case(51.0, AqiCategory::Moderate)]
    #[case(150.0, AqiCategory::UnhealthyForSensitiveGroups)]
    #[case(155.0, AqiCategory::Unhealthy)]
    #[case(300.0, AqiCategory::VeryUnhealthy)]
    #[case(301.0, AqiCategory::Hazardous)]
    fn test_category_bands(#[case] value: f64, #[case] expected: AqiCategory) {
        assert_eq!(AqiCategory::from_value(value), expected);
    }

    #[test]
    fn test_json_uses_camel_case_keys() {
        let prediction = AqiPrediction {
            predicted_value: 142,
            confidence: 0.87,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap(),
        };

        let json: serde_json::Value = serde_json::from_str(&prediction.to_json().unwrap()).unwrap();
        assert_eq!(json["predictedValue"], 142);
        assert_eq!(json["confidence"], 0.87);
        assert_eq!(json["timestamp"], "2024-01-15T08:00:00Z");
    }

    #[test]
    fn test_display() {
        let prediction = AqiPrediction {
            predicted_value: 42,
            confidence: 1.0,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap(),
        };
        assert!(prediction.to_string().starts_with("AQI 42 (Good), confidence 1.00"));
    }
}
