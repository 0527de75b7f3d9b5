//! 把各智能体的成功结果合并进 PlanState
//!
//! 只有当前阶段等待的 (智能体, 动作) 才会被合并，合并成功后阶段前进一步。
//! 成功载荷缺字段或格式不对返回 TripError::Merge，整轮失败。

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::core::state::PlanState;
use crate::core::TripError;
use crate::models::{
    BudgetRecommendation, DayPlan, HotelOption, PointOfInterest, RouteLeg, Stop, TripPlan,
};

pub const STOPS_PER_DAY: usize = 3;
pub const DEFAULT_STOP_MINUTES: u32 = 120;
pub const MAX_HOTELS: usize = 5;

fn field<T: DeserializeOwned>(agent: &str, content: &Value, pointer: &str) -> Result<T, TripError> {
    let value = content
        .pointer(pointer)
        .ok_or_else(|| TripError::merge(agent, format!("missing {pointer}")))?;
    serde_json::from_value(value.clone())
        .map_err(|e| TripError::merge(agent, format!("invalid {pointer}: {e}")))
}

/// 第 day（从 1 开始）天分到的推荐：不超过 3 条时全部，否则从 (day-1)*3 mod n 起连续取 3 条并回绕
pub fn recommendations_for_day(recommendations: &[PointOfInterest], day: usize) -> Vec<&PointOfInterest> {
    let n = recommendations.len();
    if n <= STOPS_PER_DAY {
        return recommendations.iter().collect();
    }
    let start = (day.saturating_sub(1) * STOPS_PER_DAY) % n;
    (0..STOPS_PER_DAY)
        .map(|i| &recommendations[(start + i) % n])
        .collect()
}

fn merge_locations(state: &mut PlanState, content: &Value) -> Result<(), TripError> {
    let recommendations: Vec<PointOfInterest> = field("location", content, "/recommendations")?;
    let destination = state.plan.destination.clone();
    state.plan.days = state
        .request
        .dates()
        .into_iter()
        .enumerate()
        .map(|(i, date)| {
            let day = i + 1;
            let mut plan = DayPlan::new(date);
            plan.stops = recommendations_for_day(&recommendations, day)
                .into_iter()
                .enumerate()
                .map(|(j, poi)| Stop::from_poi(format!("stop_{day}_{}", j + 1), poi, DEFAULT_STOP_MINUTES))
                .collect();
            plan.notes = Some(format!("Day {day} of your trip to {destination}"));
            plan
        })
        .collect();
    Ok(())
}

fn merge_hotels(plan: &mut TripPlan, content: &Value) -> Result<(), TripError> {
    let mut hotels: Vec<HotelOption> = field("stay", content, "/hotels")?;
    hotels.truncate(MAX_HOTELS);
    plan.recommended_hotel = hotels.first().cloned();
    plan.hotels = hotels;
    Ok(())
}

/// 某一天的路线更新；字段缺失表示保持原值
struct DayRouteUpdate {
    stops: Option<Vec<Stop>>,
    transportation: Option<Vec<RouteLeg>>,
    notes: Option<String>,
}

fn parse_day_route(entry: &Value) -> Result<DayRouteUpdate, TripError> {
    let present = |key: &str| entry.get(key).is_some_and(|v| !v.is_null());
    Ok(DayRouteUpdate {
        stops: if present("stops") {
            Some(field("route", entry, "/stops")?)
        } else {
            None
        },
        transportation: if present("transportation") {
            Some(field("route", entry, "/transportation")?)
        } else {
            None
        },
        notes: entry.get("notes").and_then(Value::as_str).map(String::from),
    })
}

/// 先解析全部日期的更新，全部成功后才写入计划
fn merge_routes(plan: &mut TripPlan, content: &Value) -> Result<(), TripError> {
    let by_date = content
        .pointer("/optimized_itinerary/by_date")
        .and_then(Value::as_object)
        .ok_or_else(|| TripError::merge("route", "missing /optimized_itinerary/by_date"))?;

    let mut updates = Vec::new();
    for (index, day) in plan.days.iter().enumerate() {
        if let Some(entry) = by_date.get(&day.date_key()) {
            updates.push((index, parse_day_route(entry)?));
        }
    }

    for (index, update) in updates {
        let day = &mut plan.days[index];
        if let Some(stops) = update.stops {
            day.stops = stops;
        }
        if let Some(transportation) = update.transportation {
            day.transportation = transportation;
        }
        if let Some(notes) = update.notes {
            day.notes = Some(notes);
        }
    }
    Ok(())
}

fn merge_budget(plan: &mut TripPlan, content: &Value) -> Result<(), TripError> {
    let cost: f64 = field("budget", content, "/budget_adjustments/estimated_total_cost")?;
    let status: Option<String> = field("budget", content, "/budget_adjustments/budget_status")?;
    let remaining: Option<f64> = content
        .pointer("/budget_adjustments/budget_remaining")
        .and_then(Value::as_f64);
    let recommendations: Vec<BudgetRecommendation> = match content
        .pointer("/budget_adjustments/recommendations")
    {
        Some(Value::Null) | None => Vec::new(),
        Some(_) => field("budget", content, "/budget_adjustments/recommendations")?,
    };

    plan.estimated_total_cost = Some(cost);
    plan.budget_status = status;
    plan.budget_remaining = remaining;
    plan.budget_recommendations.extend(recommendations);
    Ok(())
}

/// 合并一步结果；返回是否发生了合并（即阶段是否前进）
pub fn fold_step_result(
    state: &mut PlanState,
    agent: &str,
    action: &str,
    content: &Value,
) -> Result<bool, TripError> {
    if state.phase.expected_step() != Some((agent, action)) {
        return Ok(false);
    }
    match agent {
        "location" => merge_locations(state, content)?,
        "stay" => merge_hotels(&mut state.plan, content)?,
        "route" => merge_routes(&mut state.plan, content)?,
        "budget" => merge_budget(&mut state.plan, content)?,
        _ => return Ok(false),
    }
    let from = state.phase;
    state.phase = state.phase.next();
    tracing::debug!(agent, from = from.as_str(), to = state.phase.as_str(), "phase advanced");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::Phase;
    use crate::models::{PoiCategory, TripRequest};
    use chrono::NaiveDate;
    use serde_json::json;

    fn state(days: i64) -> PlanState {
        let start = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();
        PlanState::fresh(TripRequest::new(
            "Paris",
            start,
            start + chrono::Duration::days(days - 1),
        ))
    }

    fn poi(id: &str) -> PointOfInterest {
        PointOfInterest {
            id: id.into(),
            name: id.to_uppercase(),
            category: PoiCategory::Attraction,
            address: None,
            location: None,
            rating: Some(4.5),
            user_ratings_total: None,
            price_level: None,
            description: None,
            estimated_cost: Some(10.0),
            opening_hours: vec![],
            reviews: vec![],
        }
    }

    #[test]
    fn test_day_slices_wrap_around() {
        let recs: Vec<PointOfInterest> = ["a", "b", "c", "d", "e"].iter().map(|id| poi(id)).collect();
        let ids = |day| -> Vec<String> {
            recommendations_for_day(&recs, day).iter().map(|p| p.id.clone()).collect()
        };
        assert_eq!(ids(1), vec!["a", "b", "c"]);
        assert_eq!(ids(2), vec!["d", "e", "a"]);
        assert_eq!(ids(3), vec!["b", "c", "d"]);
        assert_eq!(recommendations_for_day(&recs[..2], 4).len(), 2);
    }

    #[test]
    fn test_location_merge_builds_one_day_per_date() {
        let mut state = state(3);
        let recs: Vec<PointOfInterest> = ["a", "b", "c", "d"].iter().map(|id| poi(id)).collect();
        let merged = fold_step_result(
            &mut state,
            "location",
            "get_recommendations",
            &json!({ "recommendations": recs }),
        )
        .unwrap();
        assert!(merged);
        assert_eq!(state.phase, Phase::AwaitingLodging);
        assert_eq!(state.plan.days.len(), 3);
        assert_eq!(state.plan.days[2].date, NaiveDate::from_ymd_opt(2026, 7, 3).unwrap());
        let day2 = &state.plan.days[1];
        assert_eq!(day2.stops[0].id, "stop_2_1");
        assert_eq!(day2.stops[0].place_id.as_deref(), Some("d"));
        assert_eq!(day2.stops[0].estimated_duration_minutes, 120);
        assert_eq!(day2.notes.as_deref(), Some("Day 2 of your trip to Paris"));
    }

    #[test]
    fn test_empty_recommendations_still_create_days() {
        let mut state = state(2);
        fold_step_result(&mut state, "location", "get_recommendations", &json!({ "recommendations": [] }))
            .unwrap();
        assert_eq!(state.plan.days.len(), 2);
        assert!(state.plan.days.iter().all(|d| d.stops.is_empty()));
    }

    #[test]
    fn test_stay_merge_keeps_top_five_and_recommends_first() {
        let mut state = state(1);
        state.phase = Phase::AwaitingLodging;
        let hotels: Vec<Value> = (1..=7)
            .map(|i| json!({"id": format!("h{i}"), "name": format!("Hotel {i}"), "price_per_night": 100.0 + f64::from(i)}))
            .collect();
        fold_step_result(&mut state, "stay", "search_accommodations", &json!({ "hotels": hotels })).unwrap();
        assert_eq!(state.plan.hotels.len(), 5);
        assert_eq!(state.plan.recommended_hotel.as_ref().unwrap().id, "h1");
        assert_eq!(state.plan.hotels[0].currency, "USD");
        assert_eq!(state.phase, Phase::AwaitingRouting);
    }

    #[test]
    fn test_route_merge_matches_days_by_date() {
        let mut state = state(2);
        fold_step_result(&mut state, "location", "get_recommendations", &json!({ "recommendations": [poi("a"), poi("b")] }))
            .unwrap();
        state.phase = Phase::AwaitingRouting;
        let content = json!({
            "optimized_itinerary": { "by_date": { "2026-07-02": {
                "transportation": [{
                    "from_stop_id": "stop_2_2", "to_stop_id": "stop_2_1", "mode": "walking",
                    "duration_minutes": 12, "distance_meters": 900, "cost": 0.0, "instructions": []
                }],
                "notes": "2 stops, total travel time: 12 minutes"
            }}}
        });
        fold_step_result(&mut state, "route", "optimize_itinerary", &content).unwrap();
        assert!(state.plan.days[0].transportation.is_empty());
        assert_eq!(state.plan.days[1].transportation.len(), 1);
        assert_eq!(
            state.plan.days[1].notes.as_deref(),
            Some("2 stops, total travel time: 12 minutes")
        );
        assert_eq!(state.phase, Phase::AwaitingBudget);
    }

    #[test]
    fn test_route_merge_failure_leaves_every_day_untouched() {
        let mut state = state(2);
        fold_step_result(&mut state, "location", "get_recommendations", &json!({ "recommendations": [poi("a"), poi("b")] }))
            .unwrap();
        state.phase = Phase::AwaitingRouting;
        let before = state.plan.clone();
        let content = json!({
            "optimized_itinerary": { "by_date": {
                "2026-07-01": {
                    "transportation": [{
                        "from_stop_id": "stop_1_1", "to_stop_id": "stop_1_2", "mode": "walking",
                        "duration_minutes": 7, "distance_meters": 500, "cost": 0.0, "instructions": []
                    }],
                    "notes": "2 stops, total travel time: 7 minutes"
                },
                "2026-07-02": { "transportation": "not a list" }
            }}
        });
        let err = fold_step_result(&mut state, "route", "optimize_itinerary", &content).unwrap_err();
        assert!(matches!(err, TripError::Merge { .. }));
        assert_eq!(state.plan, before);
        assert_eq!(state.phase, Phase::AwaitingRouting);
    }

    #[test]
    fn test_budget_merge_overwrites_and_appends() {
        let mut state = state(1);
        state.phase = Phase::AwaitingBudget;
        let content = json!({ "budget_adjustments": {
            "estimated_total_cost": 0.0,
            "budget_status": "no_budget_set",
            "budget_remaining": null,
            "recommendations": []
        }});
        fold_step_result(&mut state, "budget", "check_budget", &content).unwrap();
        assert_eq!(state.plan.estimated_total_cost, Some(0.0));
        assert_eq!(state.plan.budget_status.as_deref(), Some("no_budget_set"));
        assert_eq!(state.phase, Phase::Done);
    }

    #[test]
    fn test_unexpected_step_is_not_merged() {
        let mut state = state(1);
        let merged = fold_step_result(&mut state, "location", "get_poi_details", &json!({})).unwrap();
        assert!(!merged);
        let merged = fold_step_result(&mut state, "budget", "check_budget", &json!({})).unwrap();
        assert!(!merged);
        assert_eq!(state.phase, Phase::AwaitingLocations);
    }

    #[test]
    fn test_malformed_payload_is_merge_error() {
        let mut state = state(1);
        let err = fold_step_result(&mut state, "location", "get_recommendations", &json!({"recommendations": "x"}))
            .unwrap_err();
        assert!(matches!(err, TripError::Merge { .. }));
        assert_eq!(state.phase, Phase::AwaitingLocations);
    }
}
