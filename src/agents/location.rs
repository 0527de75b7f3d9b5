//! Location 智能体：景点推荐与地点详情

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::agents::base::{required_param, Agent, AgentContext, AgentReply};
use crate::agents::toolkit::AgentToolkit;
use crate::core::AgentError;
use crate::models::{GeoPoint, PoiCategory, PointOfInterest, TripRequest};
use crate::tools::{PlaceDetailsTool, ReviewsTool, SearchPlacesTool, Tool};

const RESULTS_PER_QUERY: usize = 5;
const MAX_RECOMMENDATIONS: usize = 15;
const REVIEWS_PER_POI: usize = 3;

const DEFAULT_QUERIES: &[&str] = &["top tourist attractions", "museums", "restaurants"];

fn activity_queries(activity: &str) -> Vec<String> {
    let canned: &[&str] = match activity.to_lowercase().as_str() {
        "sightseeing" => &["tourist attractions", "landmarks", "viewpoints"],
        "dining" => &["restaurants", "cafes", "local food"],
        "shopping" => &["shopping malls", "markets", "boutiques"],
        "nightlife" => &["bars", "night clubs", "live music"],
        "outdoors" => &["parks", "gardens", "hiking trails"],
        "culture" => &["museums", "art galleries", "historical sites"],
        _ => return vec![activity.to_string()],
    };
    canned.iter().map(|q| q.to_string()).collect()
}

/// 兴趣 → "top {interest} in area"，活动 → 预置查询；两者都空时用默认查询
pub fn build_queries(request: &TripRequest) -> Vec<String> {
    let mut queries: Vec<String> = request
        .interests
        .iter()
        .filter(|i| !i.trim().is_empty())
        .map(|i| format!("top {} in area", i.trim()))
        .collect();
    for activity in &request.preferred_activities {
        queries.extend(activity_queries(activity));
    }
    if queries.is_empty() {
        queries = DEFAULT_QUERIES.iter().map(|q| q.to_string()).collect();
    }
    queries
}

/// 地图返回的地点 JSON → PointOfInterest
pub fn poi_from_place(place: &Value) -> Option<PointOfInterest> {
    let id = place.get("place_id")?.as_str()?.to_string();
    let name = place.get("name")?.as_str()?.to_string();
    let types: Vec<String> = place
        .get("types")
        .and_then(|t| serde_json::from_value(t.clone()).ok())
        .unwrap_or_default();
    let location = place.pointer("/geometry/location").and_then(|loc| {
        Some(GeoPoint {
            lat: loc.get("lat")?.as_f64()?,
            lng: loc.get("lng")?.as_f64()?,
        })
    });
    Some(PointOfInterest {
        id,
        name,
        category: PoiCategory::from_place_types(&types),
        address: place
            .get("formatted_address")
            .and_then(Value::as_str)
            .map(String::from),
        location,
        rating: place.get("rating").and_then(Value::as_f64),
        user_ratings_total: place
            .get("user_ratings_total")
            .and_then(Value::as_u64)
            .map(|n| n as u32),
        price_level: place
            .get("price_level")
            .and_then(Value::as_u64)
            .map(|n| n as u8),
        description: place
            .get("description")
            .and_then(Value::as_str)
            .map(String::from),
        estimated_cost: place.get("estimated_cost").and_then(Value::as_f64),
        opening_hours: place
            .get("opening_hours")
            .and_then(|h| serde_json::from_value(h.clone()).ok())
            .unwrap_or_default(),
        reviews: Vec::new(),
    })
}

/// 按 ID 去重（保留首次出现），再按评分降序稳定排序，最多 15 条
pub fn rank_recommendations(pois: Vec<PointOfInterest>) -> Vec<PointOfInterest> {
    let mut seen = HashSet::new();
    let mut unique: Vec<PointOfInterest> =
        pois.into_iter().filter(|p| seen.insert(p.id.clone())).collect();
    unique.sort_by(|a, b| {
        b.rating
            .unwrap_or(0.0)
            .total_cmp(&a.rating.unwrap_or(0.0))
    });
    unique.truncate(MAX_RECOMMENDATIONS);
    unique
}

pub struct LocationAgent {
    toolkit: AgentToolkit,
}

impl LocationAgent {
    pub fn new(toolkit: AgentToolkit) -> Self {
        Self { toolkit }
    }

    async fn get_recommendations(
        &self,
        params: &Value,
        ctx: &mut AgentContext,
    ) -> Result<AgentReply, AgentError> {
        let request: TripRequest = required_param(params, "trip_request")?;
        let queries = build_queries(&request);

        let mut found = Vec::new();
        for query in &queries {
            let data = self
                .toolkit
                .require_tool(
                    ctx,
                    self.name(),
                    "maps.search_places",
                    json!({
                        "query": query,
                        "location": request.destination,
                        "limit": RESULTS_PER_QUERY,
                    }),
                )
                .await?;
            let results = data
                .get("results")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            found.extend(results.iter().filter_map(poi_from_place));
        }

        let recommendations = rank_recommendations(found);
        tracing::info!(
            destination = %request.destination,
            queries = queries.len(),
            found = recommendations.len(),
            "recommendations ready"
        );
        Ok(AgentReply::new(json!({
            "status": "success",
            "destination": request.destination,
            "queries": queries,
            "total_found": recommendations.len(),
            "recommendations": recommendations,
        }))
        .with_context("destination", request.destination.clone()))
    }

    async fn get_poi_details(
        &self,
        params: &Value,
        ctx: &mut AgentContext,
    ) -> Result<AgentReply, AgentError> {
        let place_id: String = required_param(params, "place_id")?;
        let details = self
            .toolkit
            .require_tool(ctx, self.name(), "maps.place_details", json!({ "place_id": place_id }))
            .await?;
        let place = details.get("result").unwrap_or(&details);
        let mut poi = poi_from_place(place)
            .ok_or_else(|| AgentError::NotFound(format!("Place not found: {place_id}")))?;

        let reviews = self
            .toolkit
            .require_tool(
                ctx,
                self.name(),
                "reviews.get",
                json!({ "place_id": place_id, "limit": REVIEWS_PER_POI }),
            )
            .await?;
        poi.reviews = reviews
            .get("reviews")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        Ok(AgentReply::new(json!({
            "status": "success",
            "poi": poi,
            "website": place.get("website"),
            "rating_stats": reviews.get("rating_stats"),
            "sentiment": reviews.get("sentiment"),
        })))
    }
}

#[async_trait]
impl Agent for LocationAgent {
    fn name(&self) -> &'static str {
        "location"
    }

    fn display_name(&self) -> &'static str {
        "Location Scout"
    }

    fn description(&self) -> &'static str {
        "Finds attractions, restaurants and other points of interest for a destination."
    }

    fn actions(&self) -> &'static [&'static str] {
        &["get_recommendations", "get_poi_details"]
    }

    fn declare_tools(&self) -> Vec<Arc<dyn Tool>> {
        vec![
            Arc::new(SearchPlacesTool),
            Arc::new(PlaceDetailsTool),
            Arc::new(ReviewsTool),
        ]
    }

    async fn handle(
        &self,
        action: &str,
        params: &Value,
        ctx: &mut AgentContext,
    ) -> Result<AgentReply, AgentError> {
        match action {
            "get_recommendations" => self.get_recommendations(params, ctx).await,
            "get_poi_details" => self.get_poi_details(params, ctx).await,
            other => Err(AgentError::UnknownAction {
                agent: self.name().to_string(),
                action: other.to_string(),
            }),
        }
    }
}
