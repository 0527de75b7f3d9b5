//! 领域模型：行程请求、行程计划、停留点、交通段、酒店

pub mod request;
pub mod trip;

pub use request::{AccommodationPreference, BudgetPreference, TripRequest, MAX_TRIP_DAYS};
pub use trip::{
    clamp_stop_minutes, BudgetRecommendation, BudgetStatus, DayPlan, GeoPoint, HotelOption,
    PoiCategory, PointOfInterest, RouteLeg, Stop, TransportMode, TripPlan, MAX_STOP_MINUTES,
    MIN_STOP_MINUTES,
};
