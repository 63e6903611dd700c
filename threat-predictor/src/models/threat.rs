//! Threat record and prediction wire models

use serde::{Deserialize, Serialize};
use validator::Validate;

/// One observed event count for a threat category
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ThreatRecord {
    #[serde(rename = "type")]
    #[validate(length(min = 1))]
    pub threat_type: String,

    pub count: u64,

    /// Calendar date, normally `YYYY-MM-DD`; may be malformed
    pub date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PredictRequest {
    #[validate(length(min = 1))]
    pub data: Vec<ThreatRecord>,

    #[serde(rename = "forecastDays")]
    #[validate(range(min = 1))]
    pub forecast_days: i64,
}

/// Forecasted total for one threat type over the horizon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastResult {
    #[serde(rename = "type")]
    pub threat_type: String,
    pub forecast: u64,
}

#[cfg(test)]
impl ThreatRecord {
    pub fn new(threat_type: impl Into<String>, count: u64, date: impl Into<String>) -> Self {
        Self {
            threat_type: threat_type.into(),
            count,
            date: date.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_names() {
        let raw = r#"{"data":[{"type":"phishing","count":10,"date":"2024-01-01"}],"forecastDays":5}"#;
        let req: PredictRequest = serde_json::from_str(raw).unwrap();

        assert_eq!(req.forecast_days, 5);
        assert_eq!(req.data[0].threat_type, "phishing");
        assert_eq!(req.data[0].count, 10);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_negative_count_rejected() {
        let raw = r#"{"data":[{"type":"ddos","count":-1,"date":"2024-01-01"}],"forecastDays":5}"#;
        assert!(serde_json::from_str::<PredictRequest>(raw).is_err());
    }

    #[test]
    fn test_validation_bounds() {
        let req = PredictRequest { data: vec![], forecast_days: 3 };
        assert!(req.validate().is_err());

        let req = PredictRequest {
            data: vec![ThreatRecord::new("malware", 1, "2024-01-01")],
            forecast_days: 0,
        };
        assert!(req.validate().is_err());

        assert!(ThreatRecord::new("", 1, "2024-01-01").validate().is_err());
    }

    #[test]
    fn test_result_serializes_type_key() {
        let result = ForecastResult { threat_type: "ddos".into(), forecast: 15 };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "ddos", "forecast": 15 }));
    }
}
