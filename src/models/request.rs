//! 行程请求：用户想去哪里、什么时候、花多少钱

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// 预算偏好：总预算（0 表示未设置）、币种与各类开销档位
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BudgetPreference {
    #[serde(default)]
    pub total_budget: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    /// budget / midrange / luxury / ultra_luxury
    #[serde(default = "default_comfort")]
    pub accommodation: String,
    #[serde(default = "default_comfort")]
    pub food: String,
    /// local / moderate / premium
    #[serde(default = "default_transport_comfort")]
    pub transportation: String,
    #[serde(default = "default_comfort")]
    pub activities: String,
}

impl Default for BudgetPreference {
    fn default() -> Self {
        Self {
            total_budget: 0.0,
            currency: default_currency(),
            accommodation: default_comfort(),
            food: default_comfort(),
            transportation: default_transport_comfort(),
            activities: default_comfort(),
        }
    }
}

pub(crate) fn default_currency() -> String {
    "USD".to_string()
}

fn default_comfort() -> String {
    "midrange".to_string()
}

fn default_transport_comfort() -> String {
    "moderate".to_string()
}

/// 住宿偏好
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AccommodationPreference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price_per_night: Option<f64>,
    #[serde(default)]
    pub amenities: Vec<String>,
}

/// 一次行程规划请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TripRequest {
    /// 目的地城市
    pub destination: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default = "default_travelers")]
    pub travelers: u32,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub preferred_activities: Vec<String>,
    #[serde(default)]
    pub budget: BudgetPreference,
    #[serde(default)]
    pub accommodation: AccommodationPreference,
}

fn default_travelers() -> u32 {
    1
}

/// 单次规划允许的最长天数
pub const MAX_TRIP_DAYS: u32 = 30;

impl TripRequest {
    pub fn new(destination: impl Into<String>, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            destination: destination.into(),
            country: None,
            start_date,
            end_date,
            travelers: 1,
            interests: Vec::new(),
            preferred_activities: Vec::new(),
            budget: BudgetPreference::default(),
            accommodation: AccommodationPreference::default(),
        }
    }

    /// 行程天数（首尾两天都计入）
    pub fn duration_days(&self) -> u32 {
        ((self.end_date - self.start_date).num_days() + 1).max(0) as u32
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.start_date
            .iter_days()
            .take(self.duration_days() as usize)
            .collect()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.destination.trim().is_empty() {
            return Err("destination must not be empty".to_string());
        }
        if self.end_date < self.start_date {
            return Err(format!(
                "end_date {} is before start_date {}",
                self.end_date, self.start_date
            ));
        }
        if self.duration_days() > MAX_TRIP_DAYS {
            return Err(format!(
                "trip of {} days is longer than the {MAX_TRIP_DAYS}-day maximum",
                self.duration_days()
            ));
        }
        if self.travelers == 0 {
            return Err("travelers must be at least 1".to_string());
        }
        if self.budget.total_budget < 0.0 {
            return Err("total_budget must not be negative".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_is_inclusive() {
        let start = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 5, 3).unwrap();
        let req = TripRequest::new("Paris", start, end);
        assert_eq!(req.duration_days(), 3);
        assert_eq!(req.dates().last(), Some(&end));
    }

    #[test]
    fn test_minimal_json_gets_defaults() {
        let req: TripRequest = serde_json::from_value(serde_json::json!({
            "destination": "Tokyo",
            "start_date": "2026-04-01",
            "end_date": "2026-04-02"
        }))
        .unwrap();
        assert_eq!(req.travelers, 1);
        assert_eq!(req.budget.currency, "USD");
        assert_eq!(req.budget.total_budget, 0.0);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_reversed_dates_rejected() {
        let start = NaiveDate::from_ymd_opt(2026, 5, 3).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        assert!(TripRequest::new("Paris", start, end).validate().is_err());
    }

    #[test]
    fn test_trip_length_is_capped() {
        let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let longest = TripRequest::new("Paris", start, start + chrono::Duration::days(29));
        assert_eq!(longest.duration_days(), MAX_TRIP_DAYS);
        assert!(longest.validate().is_ok());

        let too_long = TripRequest::new("Paris", start, start + chrono::Duration::days(30));
        assert!(too_long.validate().unwrap_err().contains("30-day maximum"));

        let absurd = TripRequest::new("Paris", start, NaiveDate::from_ymd_opt(9999, 12, 31).unwrap());
        assert!(absurd.validate().is_err());
    }
}
