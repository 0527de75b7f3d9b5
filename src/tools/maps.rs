//! 地图工具（模拟）：地点搜索、地点详情、距离矩阵、路线
//!
//! 距离完全确定：两端都有坐标时用球面距离乘道路系数，否则由端点名称的稳定哈希导出。

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::models::{GeoPoint, TransportMode};
use crate::tools::mock_data::{self, Place};
use crate::tools::schema::{parse_args, schema_of};
use crate::tools::{Tool, ToolCallContext};

const ROAD_FACTOR: f64 = 1.25;
const EARTH_RADIUS_M: f64 = 6_371_000.0;
const MAX_MATRIX_SIDE: usize = 25;

/// 距离矩阵 / 路线的端点：坐标，或地点 ID / 地址文本
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Endpoint {
    Point {
        lat: f64,
        lng: f64,
        #[serde(default)]
        name: Option<String>,
    },
    Named(String),
}

struct Resolved {
    key: String,
    label: String,
    point: Option<GeoPoint>,
}

fn resolve(endpoint: &Endpoint) -> Resolved {
    match endpoint {
        Endpoint::Point { lat, lng, name } => Resolved {
            key: format!("{lat:.5},{lng:.5}"),
            label: name.clone().unwrap_or_else(|| format!("{lat:.5},{lng:.5}")),
            point: Some(GeoPoint { lat: *lat, lng: *lng }),
        },
        Endpoint::Named(text) => match mock_data::find_place(text) {
            Some(place) => Resolved {
                key: place.id.clone(),
                label: place.name.clone(),
                point: Some(place.location),
            },
            None => Resolved {
                key: text.to_lowercase(),
                label: text.clone(),
                point: None,
            },
        },
    }
}

pub fn haversine_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = lat2 - lat1;
    let dlng = (b.lng - a.lng).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

fn road_distance(a: &Resolved, b: &Resolved) -> f64 {
    if a.key == b.key {
        return 0.0;
    }
    match (a.point, b.point) {
        (Some(pa), Some(pb)) => (haversine_meters(pa, pb) * ROAD_FACTOR).round(),
        _ => {
            // 无坐标：对称的伪距离 800m ~ 15km
            let (first, second) = if a.key <= b.key {
                (&a.key, &b.key)
            } else {
                (&b.key, &a.key)
            };
            let h = mock_data::stable_hash(&format!("{first}|{second}"));
            800.0 + (h % 14_200) as f64
        }
    }
}

/// 各出行方式的平均速度（km/h）
fn speed_kmh(mode: TransportMode) -> f64 {
    match mode {
        TransportMode::Walking => 5.0,
        TransportMode::Bicycling => 15.0,
        TransportMode::Transit => 20.0,
        TransportMode::Driving => 25.0,
    }
}

pub fn travel_seconds(distance_m: f64, mode: TransportMode) -> f64 {
    (distance_m / (speed_kmh(mode) * 1000.0 / 3600.0)).round()
}

pub fn distance_text(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{} m", meters.round() as u64)
    } else {
        format!("{:.1} km", meters / 1000.0)
    }
}

pub fn duration_text(seconds: f64) -> String {
    let minutes = (seconds / 60.0).round() as u64;
    match minutes {
        0 | 1 => "1 min".to_string(),
        m if m < 60 => format!("{m} mins"),
        m => {
            let hours = m / 60;
            let rest = m % 60;
            let unit = if hours == 1 { "hour" } else { "hours" };
            if rest == 0 {
                format!("{hours} {unit}")
            } else {
                format!("{hours} {unit} {rest} mins")
            }
        }
    }
}

fn parse_mode(mode: Option<&str>) -> Result<TransportMode, String> {
    match mode {
        None => Ok(TransportMode::Driving),
        Some(m) => TransportMode::parse(m).ok_or_else(|| format!("Unsupported travel mode: {m}")),
    }
}

fn place_json(place: &Place) -> Value {
    json!({
        "place_id": place.id,
        "name": place.name,
        "types": place.types,
        "formatted_address": place.address,
        "geometry": { "location": { "lat": place.location.lat, "lng": place.location.lng } },
        "rating": place.rating,
        "user_ratings_total": place.ratings_total,
        "price_level": place.price_level,
        "estimated_cost": place.cost,
        "description": place.description,
        "opening_hours": place.opening_hours,
    })
}

const STOPWORDS: &[&str] = &[
    "top", "best", "the", "and", "area", "local", "popular", "famous", "near", "with", "for",
];

/// 查询词（去停用词、去复数 s）
fn query_terms(query: &str) -> Vec<String> {
    query
        .split(|c: char| !c.is_alphanumeric())
        .map(|w| w.to_lowercase())
        .filter(|w| w.len() > 2 && !STOPWORDS.contains(&w.as_str()))
        .map(|w| w.strip_suffix('s').map(String::from).unwrap_or(w))
        .collect()
}

fn matches_terms(place: &Place, terms: &[String]) -> bool {
    let haystack = format!(
        "{} {} {}",
        place.name,
        place.description,
        place.types.join(" ").replace('_', " ")
    )
    .to_lowercase();
    terms.iter().any(|t| haystack.contains(t.as_str()))
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchPlacesArgs {
    /// 查询文本，如 "museums"
    pub query: String,
    /// 城市名
    pub location: String,
    /// 只返回包含该 type 的地点
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// maps.search_places：按查询词匹配城市内的地点；无匹配时返回全城地点
pub struct SearchPlacesTool;

#[async_trait]
impl Tool for SearchPlacesTool {
    fn name(&self) -> &str {
        "maps.search_places"
    }

    fn description(&self) -> &str {
        "Search for places of interest in a city. Args: query, location, optional category and limit."
    }

    fn parameters_schema(&self) -> Value {
        schema_of::<SearchPlacesArgs>()
    }

    async fn execute(&self, args: Value, _ctx: &ToolCallContext) -> Result<Value, String> {
        let args: SearchPlacesArgs = parse_args(self.name(), args)?;
        if args.location.trim().is_empty() {
            return Err("location must not be empty".to_string());
        }
        let limit = args.limit.unwrap_or(10).clamp(1, 20);
        let mut places = mock_data::places_for(&args.location);
        if let Some(category) = &args.category {
            places.retain(|p| p.types.iter().any(|t| t == category));
        }

        let terms = query_terms(&args.query);
        let matched: Vec<&Place> = places.iter().filter(|p| matches_terms(p, &terms)).collect();
        let selected: Vec<&Place> = if matched.is_empty() {
            places.iter().collect()
        } else {
            matched
        };

        let results: Vec<Value> = selected.into_iter().take(limit).map(place_json).collect();
        Ok(json!({
            "status": if results.is_empty() { "ZERO_RESULTS" } else { "OK" },
            "query": args.query,
            "results": results,
        }))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PlaceDetailsArgs {
    pub place_id: String,
}

/// maps.place_details
pub struct PlaceDetailsTool;

#[async_trait]
impl Tool for PlaceDetailsTool {
    fn name(&self) -> &str {
        "maps.place_details"
    }

    fn description(&self) -> &str {
        "Get details for a place by place_id."
    }

    fn parameters_schema(&self) -> Value {
        schema_of::<PlaceDetailsArgs>()
    }

    async fn execute(&self, args: Value, _ctx: &ToolCallContext) -> Result<Value, String> {
        let args: PlaceDetailsArgs = parse_args(self.name(), args)?;
        let place = mock_data::find_place(&args.place_id)
            .ok_or_else(|| format!("Place not found: {}", args.place_id))?;
        let mut result = place_json(&place);
        result["website"] = json!(format!("https://example.com/places/{}", place.id));
        Ok(json!({ "status": "OK", "result": result }))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DistanceMatrixArgs {
    pub origins: Vec<Endpoint>,
    pub destinations: Vec<Endpoint>,
    /// walking / bicycling / transit / driving，默认 driving
    #[serde(default)]
    pub mode: Option<String>,
}

/// maps.distance_matrix：rows[i].elements[j] = origins[i] → destinations[j]
pub struct DistanceMatrixTool;

#[async_trait]
impl Tool for DistanceMatrixTool {
    fn name(&self) -> &str {
        "maps.distance_matrix"
    }

    fn description(&self) -> &str {
        "Travel distance and time between every origin and destination. Args: origins, destinations, optional mode."
    }

    fn parameters_schema(&self) -> Value {
        schema_of::<DistanceMatrixArgs>()
    }

    async fn execute(&self, args: Value, _ctx: &ToolCallContext) -> Result<Value, String> {
        let args: DistanceMatrixArgs = parse_args(self.name(), args)?;
        if args.origins.is_empty() || args.destinations.is_empty() {
            return Err("origins and destinations must not be empty".to_string());
        }
        if args.origins.len() > MAX_MATRIX_SIDE || args.destinations.len() > MAX_MATRIX_SIDE {
            return Err(format!("at most {MAX_MATRIX_SIDE} origins and destinations"));
        }
        let mode = parse_mode(args.mode.as_deref())?;
        let origins: Vec<Resolved> = args.origins.iter().map(resolve).collect();
        let destinations: Vec<Resolved> = args.destinations.iter().map(resolve).collect();

        let rows: Vec<Value> = origins
            .iter()
            .map(|o| {
                let elements: Vec<Value> = destinations
                    .iter()
                    .map(|d| {
                        let meters = road_distance(o, d);
                        let seconds = travel_seconds(meters, mode);
                        json!({
                            "status": "OK",
                            "distance": { "value": meters, "text": distance_text(meters) },
                            "duration": { "value": seconds, "text": duration_text(seconds) },
                        })
                    })
                    .collect();
                json!({ "elements": elements })
            })
            .collect();

        Ok(json!({
            "status": "OK",
            "mode": mode.as_str(),
            "origin_addresses": origins.iter().map(|o| o.label.clone()).collect::<Vec<_>>(),
            "destination_addresses": destinations.iter().map(|d| d.label.clone()).collect::<Vec<_>>(),
            "rows": rows,
        }))
    }
}

fn heading(from: Option<GeoPoint>, to: Option<GeoPoint>) -> &'static str {
    let (Some(a), Some(b)) = (from, to) else {
        return "out";
    };
    let angle = (b.lat - a.lat).atan2(b.lng - a.lng).to_degrees();
    match angle {
        deg if (-22.5..22.5).contains(&deg) => "east",
        deg if (22.5..67.5).contains(&deg) => "north-east",
        deg if (67.5..112.5).contains(&deg) => "north",
        deg if (112.5..157.5).contains(&deg) => "north-west",
        deg if (-67.5..-22.5).contains(&deg) => "south-east",
        deg if (-112.5..-67.5).contains(&deg) => "south",
        deg if (-157.5..-112.5).contains(&deg) => "south-west",
        _ => "west",
    }
}

fn mode_verb(mode: TransportMode) -> &'static str {
    match mode {
        TransportMode::Walking => "Walk",
        TransportMode::Bicycling => "Cycle",
        TransportMode::Transit => "Take public transit",
        TransportMode::Driving => "Drive",
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DirectionsArgs {
    pub origin: Endpoint,
    pub destination: Endpoint,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub waypoints: Vec<Endpoint>,
}

/// maps.directions：途经 waypoints 的分段路线与逐步说明
pub struct DirectionsTool;

#[async_trait]
impl Tool for DirectionsTool {
    fn name(&self) -> &str {
        "maps.directions"
    }

    fn description(&self) -> &str {
        "Turn-by-turn directions between two points, optionally through waypoints."
    }

    fn parameters_schema(&self) -> Value {
        schema_of::<DirectionsArgs>()
    }

    async fn execute(&self, args: Value, _ctx: &ToolCallContext) -> Result<Value, String> {
        let args: DirectionsArgs = parse_args(self.name(), args)?;
        let mode = parse_mode(args.mode.as_deref())?;

        let mut points = vec![resolve(&args.origin)];
        points.extend(args.waypoints.iter().map(resolve));
        points.push(resolve(&args.destination));

        let mut total_m = 0.0;
        let mut total_s = 0.0;
        let legs: Vec<Value> = points
            .windows(2)
            .map(|pair| {
                let (from, to) = (&pair[0], &pair[1]);
                let meters = road_distance(from, to);
                let seconds = travel_seconds(meters, mode);
                total_m += meters;
                total_s += seconds;
                let steps = vec![
                    json!({
                        "instruction": format!("Head {} from {}", heading(from.point, to.point), from.label),
                        "distance": { "value": 0, "text": "0 m" },
                    }),
                    json!({
                        "instruction": format!("{} for {}", mode_verb(mode), distance_text(meters)),
                        "distance": { "value": meters, "text": distance_text(meters) },
                        "duration": { "value": seconds, "text": duration_text(seconds) },
                    }),
                    json!({
                        "instruction": format!("Arrive at {}", to.label),
                        "distance": { "value": 0, "text": "0 m" },
                    }),
                ];
                json!({
                    "start_address": from.label,
                    "end_address": to.label,
                    "distance": { "value": meters, "text": distance_text(meters) },
                    "duration": { "value": seconds, "text": duration_text(seconds) },
                    "steps": steps,
                })
            })
            .collect();

        Ok(json!({
            "status": "OK",
            "mode": mode.as_str(),
            "routes": [{
                "summary": format!("{} to {}", mode.as_str(), points.last().map(|p| p.label.as_str()).unwrap_or("")),
                "legs": legs,
                "distance": { "value": total_m, "text": distance_text(total_m) },
                "duration": { "value": total_s, "text": duration_text(total_s) },
            }],
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ToolCallContext {
        ToolCallContext::new("corr", "test")
    }

    #[tokio::test]
    async fn test_search_matches_query_terms() {
        let out = SearchPlacesTool
            .execute(json!({"query": "museums", "location": "Paris", "limit": 5}), &ctx())
            .await
            .unwrap();
        let names: Vec<&str> = out["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["name"].as_str().unwrap())
            .collect();
        assert!(names.contains(&"Louvre Museum"));
        assert!(!names.contains(&"Café de Flore"));
    }

    #[tokio::test]
    async fn test_search_without_match_returns_city() {
        let out = SearchPlacesTool
            .execute(json!({"query": "zzzz qqqq", "location": "Tokyo", "limit": 3}), &ctx())
            .await
            .unwrap();
        assert_eq!(out["results"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_matrix_is_symmetric_with_zero_diagonal() {
        let stops = json!(["paris_louvre", "paris_eiffel_tower", "unknown spot"]);
        let out = DistanceMatrixTool
            .execute(json!({"origins": stops, "destinations": stops, "mode": "walking"}), &ctx())
            .await
            .unwrap();
        let value = |i: usize, j: usize| out["rows"][i]["elements"][j]["distance"]["value"].as_f64().unwrap();
        assert_eq!(value(0, 0), 0.0);
        assert_eq!(value(0, 1), value(1, 0));
        assert_eq!(value(0, 2), value(2, 0));
        assert!(value(0, 1) > 2000.0);
    }

    #[tokio::test]
    async fn test_directions_rejects_unknown_mode() {
        let err = DirectionsTool
            .execute(
                json!({"origin": "paris_louvre", "destination": "paris_orsay", "mode": "teleport"}),
                &ctx(),
            )
            .await
            .unwrap_err();
        assert!(err.contains("Unsupported travel mode"));
    }

    #[test]
    fn test_duration_text() {
        assert_eq!(duration_text(30.0), "1 min");
        assert_eq!(duration_text(600.0), "10 mins");
        assert_eq!(duration_text(3900.0), "1 hour 5 mins");
    }
}
