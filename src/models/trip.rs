//! 行程计划：按天的停留点、交通段、酒店与预算字段

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::request::TripRequest;

pub const MIN_STOP_MINUTES: u32 = 5;
pub const MAX_STOP_MINUTES: u32 = 480;

/// 地点类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoiCategory {
    Attraction,
    Restaurant,
    Shopping,
    Entertainment,
    Cultural,
    Outdoor,
    Religious,
    Accommodation,
    Transportation,
    Other,
}

impl PoiCategory {
    /// 将地图返回的 place type 映射为类别
    pub fn from_place_type(place_type: &str) -> Option<Self> {
        let category = match place_type {
            "restaurant" | "cafe" | "bar" | "bakery" | "food" => Self::Restaurant,
            "museum" | "art_gallery" | "library" | "aquarium" | "zoo" => Self::Cultural,
            "park" | "natural_feature" | "campground" | "amusement_park" => Self::Outdoor,
            "shopping_mall" | "store" | "clothing_store" | "department_store" | "market" => {
                Self::Shopping
            }
            "night_club" | "movie_theater" | "casino" | "stadium" => Self::Entertainment,
            "church" | "mosque" | "hindu_temple" | "synagogue" | "place_of_worship" => {
                Self::Religious
            }
            "lodging" => Self::Accommodation,
            "train_station" | "subway_station" | "airport" => Self::Transportation,
            "tourist_attraction" | "point_of_interest" | "landmark" => Self::Attraction,
            _ => return None,
        };
        Some(category)
    }

    /// 取第一个可识别的 type，都不认识则为 Other
    pub fn from_place_types<S: AsRef<str>>(types: &[S]) -> Self {
        types
            .iter()
            .find_map(|t| Self::from_place_type(t.as_ref()))
            .unwrap_or(Self::Other)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// 地点推荐结果（Location 智能体输出）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointOfInterest {
    pub id: String,
    pub name: String,
    pub category: PoiCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_ratings_total: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_level: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<f64>,
    #[serde(default)]
    pub opening_hours: Vec<String>,
    #[serde(default)]
    pub reviews: Vec<serde_json::Value>,
}

/// 某天行程中的一个停留点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_id: Option<String>,
    pub name: String,
    pub category: PoiCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub estimated_duration_minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(default)]
    pub opening_hours: Vec<String>,
    #[serde(default)]
    pub tips: Vec<String>,
}

impl Stop {
    pub fn from_poi(id: impl Into<String>, poi: &PointOfInterest, duration_minutes: u32) -> Self {
        Self {
            id: id.into(),
            place_id: Some(poi.id.clone()),
            name: poi.name.clone(),
            category: poi.category,
            address: poi.address.clone(),
            location: poi.location,
            description: poi.description.clone(),
            estimated_duration_minutes: clamp_stop_minutes(duration_minutes),
            cost: poi.estimated_cost,
            opening_hours: poi.opening_hours.clone(),
            tips: Vec::new(),
        }
    }
}

pub fn clamp_stop_minutes(minutes: u32) -> u32 {
    minutes.clamp(MIN_STOP_MINUTES, MAX_STOP_MINUTES)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    Walking,
    Bicycling,
    Transit,
    Driving,
}

impl TransportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Walking => "walking",
            Self::Bicycling => "bicycling",
            Self::Transit => "transit",
            Self::Driving => "driving",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "walking" => Some(Self::Walking),
            "bicycling" | "cycling" => Some(Self::Bicycling),
            "transit" => Some(Self::Transit),
            "driving" => Some(Self::Driving),
            _ => None,
        }
    }
}

/// 两个停留点之间的一段交通
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteLeg {
    pub from_stop_id: String,
    pub to_stop_id: String,
    pub mode: TransportMode,
    pub duration_minutes: u32,
    pub distance_meters: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(default)]
    pub instructions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayPlan {
    pub date: NaiveDate,
    #[serde(default)]
    pub stops: Vec<Stop>,
    #[serde(default)]
    pub transportation: Vec<RouteLeg>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl DayPlan {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            stops: Vec::new(),
            transportation: Vec::new(),
            notes: None,
        }
    }

    /// 停留时长 + 交通时长（分钟）
    pub fn total_duration_minutes(&self) -> u32 {
        let stops: u32 = self.stops.iter().map(|s| s.estimated_duration_minutes).sum();
        let legs: u32 = self.transportation.iter().map(|l| l.duration_minutes).sum();
        stops + legs
    }

    /// 停留与交通的已知费用之和
    pub fn total_cost(&self) -> f64 {
        let stops: f64 = self.stops.iter().filter_map(|s| s.cost).sum();
        let legs: f64 = self.transportation.iter().filter_map(|l| l.cost).sum();
        stops + legs
    }

    pub fn date_key(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotelOption {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    pub price_per_night: f64,
    #[serde(default = "super::request::default_currency")]
    pub currency: String,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub free_cancellation: bool,
}

/// 省钱建议（超预算时生成）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetRecommendation {
    pub category: String,
    pub current_cost: f64,
    pub potential_savings_min: f64,
    pub potential_savings_max: f64,
    pub suggestions: Vec<String>,
}

/// 预算判定结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetStatus {
    /// no_budget_set / over_budget / close_to_budget / within_budget
    pub status: String,
    pub total_budget: f64,
    pub total_estimated_cost: f64,
    pub amount_over_budget: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage_of_budget: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining: Option<f64>,
}

/// 共享的行程计划，在一个回合的各个步骤间逐步填充
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripPlan {
    pub destination: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub days: Vec<DayPlan>,
    #[serde(default)]
    pub hotels: Vec<HotelOption>,
    #[serde(default)]
    pub recommended_hotel: Option<HotelOption>,
    /// None 表示预算步骤尚未执行
    #[serde(default)]
    pub estimated_total_cost: Option<f64>,
    pub currency: String,
    #[serde(default)]
    pub budget_status: Option<String>,
    #[serde(default)]
    pub budget_remaining: Option<f64>,
    #[serde(default)]
    pub budget_recommendations: Vec<BudgetRecommendation>,
}

impl TripPlan {
    pub fn from_request(request: &TripRequest) -> Self {
        Self {
            destination: request.destination.clone(),
            country: request.country.clone(),
            start_date: request.start_date,
            end_date: request.end_date,
            days: Vec::new(),
            hotels: Vec::new(),
            recommended_hotel: None,
            estimated_total_cost: None,
            currency: request.budget.currency.clone(),
            budget_status: None,
            budget_remaining: None,
            budget_recommendations: Vec::new(),
        }
    }

    pub fn duration_days(&self) -> u32 {
        ((self.end_date - self.start_date).num_days() + 1).max(0) as u32
    }

    pub fn total_stops(&self) -> usize {
        self.days.iter().map(|d| d.stops.len()).sum()
    }

    /// "City, Country" 或仅城市名
    pub fn display_destination(&self) -> String {
        match &self.country {
            Some(country) if !country.is_empty() => format!("{}, {}", self.destination, country),
            _ => self.destination.clone(),
        }
    }
}
