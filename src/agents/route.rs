//! Route 智能体：每日停留点排序、交通段规划、路线查询
//!
//! 排序用最近邻启发式：从第 0 个停留点出发，每次走向行驶时间最短的未访问点（并列取下标最小）。

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::agents::base::{optional_param, required_param, Agent, AgentContext, AgentReply};
use crate::agents::toolkit::AgentToolkit;
use crate::core::AgentError;
use crate::models::{DayPlan, RouteLeg, Stop, TransportMode, TripPlan};
use crate::tools::maps::travel_seconds;
use crate::tools::{DirectionsTool, DistanceMatrixTool, Tool};

/// 起点固定为 0；None 视为不可达
pub fn nearest_neighbor_order(durations: &[Vec<Option<f64>>]) -> Vec<usize> {
    let n = durations.len();
    if n == 0 {
        return Vec::new();
    }
    let mut visited = vec![false; n];
    let mut order = Vec::with_capacity(n);
    visited[0] = true;
    order.push(0);

    while order.len() < n {
        let current = order[order.len() - 1];
        let mut best: Option<(usize, f64)> = None;
        for (j, seen) in visited.iter().enumerate() {
            if *seen {
                continue;
            }
            let cost = durations[current]
                .get(j)
                .copied()
                .flatten()
                .unwrap_or(f64::INFINITY);
            match best {
                Some((_, best_cost)) if cost >= best_cost => {}
                _ => best = Some((j, cost)),
            }
        }
        let Some((next, _)) = best else { break };
        visited[next] = true;
        order.push(next);
    }
    order
}

pub fn select_mode(distance_km: f64) -> TransportMode {
    if distance_km <= 1.5 {
        TransportMode::Walking
    } else if distance_km <= 5.0 {
        TransportMode::Bicycling
    } else if distance_km <= 50.0 {
        TransportMode::Transit
    } else {
        TransportMode::Driving
    }
}

/// 每公里费用
pub fn leg_cost(distance_km: f64, mode: TransportMode) -> f64 {
    let per_km = match mode {
        TransportMode::Walking => 0.0,
        TransportMode::Bicycling => 0.1,
        TransportMode::Transit => 0.2,
        TransportMode::Driving => 0.5,
    };
    (distance_km * per_km * 100.0).round() / 100.0
}

pub fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        return "Less than a minute".to_string();
    }
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(format!("{hours} hour{}", if hours == 1 { "" } else { "s" }));
    }
    if minutes > 0 {
        parts.push(format!("{minutes} minute{}", if minutes == 1 { "" } else { "s" }));
    }
    parts.join(" ")
}

/// 停留点 → 地图端点：有坐标用坐标，否则用地点 ID 或名称
fn endpoint(stop: &Stop) -> Value {
    match (stop.location, &stop.place_id) {
        (Some(point), _) => json!({ "lat": point.lat, "lng": point.lng, "name": stop.name }),
        (None, Some(place_id)) => json!(place_id),
        (None, None) => json!(stop.name),
    }
}

/// 距离矩阵中的 (秒, 米)
struct TravelMatrix {
    seconds: Vec<Vec<Option<f64>>>,
    meters: Vec<Vec<Option<f64>>>,
}

impl TravelMatrix {
    fn parse(data: &Value, n: usize) -> Option<Self> {
        let rows = data.get("rows")?.as_array()?;
        if rows.len() != n {
            return None;
        }
        let mut seconds = Vec::with_capacity(n);
        let mut meters = Vec::with_capacity(n);
        for row in rows {
            let elements = row.get("elements")?.as_array()?;
            if elements.len() != n {
                return None;
            }
            seconds.push(
                elements
                    .iter()
                    .map(|e| e.pointer("/duration/value").and_then(Value::as_f64))
                    .collect(),
            );
            meters.push(
                elements
                    .iter()
                    .map(|e| e.pointer("/distance/value").and_then(Value::as_f64))
                    .collect(),
            );
        }
        Some(Self { seconds, meters })
    }

    fn meters(&self, from: usize, to: usize) -> Option<f64> {
        self.meters.get(from)?.get(to).copied().flatten()
    }
}

fn route_instructions(data: &Value) -> Vec<String> {
    data.pointer("/routes/0/legs")
        .and_then(Value::as_array)
        .map(|legs| {
            legs.iter()
                .filter_map(|leg| leg.get("steps").and_then(Value::as_array))
                .flatten()
                .filter_map(|step| step.get("instruction").and_then(Value::as_str))
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn route_distance(data: &Value) -> Option<f64> {
    data.pointer("/routes/0/distance/value").and_then(Value::as_f64)
}

pub struct RouteAgent {
    toolkit: AgentToolkit,
}

impl RouteAgent {
    pub fn new(toolkit: AgentToolkit) -> Self {
        Self { toolkit }
    }

    async fn order_stops(&self, day: &DayPlan, ctx: &mut AgentContext) -> (Vec<Stop>, Option<TravelMatrix>) {
        let points: Vec<Value> = day.stops.iter().map(endpoint).collect();
        let result = self
            .toolkit
            .execute_tool(
                ctx,
                self.name(),
                "maps.distance_matrix",
                json!({ "origins": points, "destinations": points, "mode": "driving" }),
            )
            .await;
        let matrix = result
            .data
            .as_ref()
            .filter(|_| result.success)
            .and_then(|data| TravelMatrix::parse(data, day.stops.len()));

        match matrix {
            Some(matrix) => {
                let order = nearest_neighbor_order(&matrix.seconds);
                let stops = order.iter().map(|&i| day.stops[i].clone()).collect();
                // 矩阵按原顺序索引，排序后重建
                let reorder = |m: &Vec<Vec<Option<f64>>>| -> Vec<Vec<Option<f64>>> {
                    order
                        .iter()
                        .map(|&i| order.iter().map(|&j| m[i][j]).collect())
                        .collect()
                };
                let matrix = TravelMatrix {
                    seconds: reorder(&matrix.seconds),
                    meters: reorder(&matrix.meters),
                };
                (stops, Some(matrix))
            }
            None => {
                tracing::warn!(
                    date = %day.date_key(),
                    error = result.error.as_deref().unwrap_or("malformed matrix"),
                    "distance matrix unavailable, keeping original stop order"
                );
                (day.stops.clone(), None)
            }
        }
    }

    async fn plan_leg(
        &self,
        from: &Stop,
        to: &Stop,
        known_meters: Option<f64>,
        ctx: &mut AgentContext,
    ) -> RouteLeg {
        let meters = match known_meters {
            Some(m) => m,
            None => {
                let probe = self
                    .toolkit
                    .execute_tool(
                        ctx,
                        self.name(),
                        "maps.directions",
                        json!({ "origin": endpoint(from), "destination": endpoint(to), "mode": "driving" }),
                    )
                    .await;
                probe.data.as_ref().and_then(route_distance).unwrap_or(0.0)
            }
        };
        let km = meters / 1000.0;
        let mode = select_mode(km);

        let directions = self
            .toolkit
            .execute_tool(
                ctx,
                self.name(),
                "maps.directions",
                json!({ "origin": endpoint(from), "destination": endpoint(to), "mode": mode.as_str() }),
            )
            .await;
        let instructions = match (directions.success, directions.data.as_ref()) {
            (true, Some(data)) => route_instructions(data),
            _ => {
                tracing::debug!(from = %from.id, to = %to.id, "directions unavailable");
                Vec::new()
            }
        };

        let seconds = travel_seconds(meters, mode) as u64;
        RouteLeg {
            from_stop_id: from.id.clone(),
            to_stop_id: to.id.clone(),
            mode,
            duration_minutes: seconds.div_ceil(60) as u32,
            distance_meters: meters.round() as u64,
            cost: Some(leg_cost(km, mode)),
            instructions,
        }
    }

    async fn optimize_day(&self, day: &DayPlan, ctx: &mut AgentContext) -> DayPlan {
        let mut optimized = DayPlan::new(day.date);
        if day.stops.len() < 2 {
            optimized.stops = day.stops.clone();
            optimized.notes = Some(format!(
                "{} stop(s), no transportation needed",
                day.stops.len()
            ));
            return optimized;
        }

        let (stops, matrix) = self.order_stops(day, ctx).await;
        let mut legs = Vec::with_capacity(stops.len() - 1);
        for i in 0..stops.len() - 1 {
            let known = matrix.as_ref().and_then(|m| m.meters(i, i + 1));
            legs.push(self.plan_leg(&stops[i], &stops[i + 1], known, ctx).await);
        }

        let travel_secs: u64 = legs.iter().map(|l| u64::from(l.duration_minutes) * 60).sum();
        optimized.notes = Some(format!(
            "{} stops, total travel time: {}",
            stops.len(),
            format_duration(travel_secs)
        ));
        optimized.stops = stops;
        optimized.transportation = legs;
        optimized
    }

    async fn optimize_itinerary(
        &self,
        params: &Value,
        ctx: &mut AgentContext,
    ) -> Result<AgentReply, AgentError> {
        let plan: TripPlan = required_param(params, "trip_plan")?;

        let mut days = Vec::with_capacity(plan.days.len());
        for day in &plan.days {
            days.push(self.optimize_day(day, ctx).await);
        }

        let mut by_date = Map::new();
        let mut modes: BTreeMap<&'static str, usize> = BTreeMap::new();
        let mut travel_minutes: u64 = 0;
        for day in &days {
            for leg in &day.transportation {
                *modes.entry(leg.mode.as_str()).or_default() += 1;
                travel_minutes += u64::from(leg.duration_minutes);
            }
            by_date.insert(
                day.date_key(),
                json!({
                    "stops": day.stops,
                    "transportation": day.transportation,
                    "notes": day.notes,
                }),
            );
        }
        let total_stops: usize = days.iter().map(|d| d.stops.len()).sum();

        tracing::info!(
            correlation_id = %ctx.correlation_id,
            days = days.len(),
            total_stops,
            "itinerary optimized"
        );
        Ok(AgentReply::new(json!({
            "status": "success",
            "optimized_itinerary": { "days": days, "by_date": by_date },
            "summary": {
                "total_days": days.len(),
                "total_stops": total_stops,
                "total_transportation_time": format_duration(travel_minutes * 60),
                "transportation_modes": modes,
            },
        })))
    }

    async fn get_directions(
        &self,
        params: &Value,
        ctx: &mut AgentContext,
    ) -> Result<AgentReply, AgentError> {
        let origin: Value = required_param(params, "origin")?;
        let destination: Value = required_param(params, "destination")?;
        let mode: String = optional_param(params, "mode")?.unwrap_or_else(|| "driving".to_string());
        let waypoints: Vec<Value> = optional_param(params, "waypoints")?.unwrap_or_default();

        let data = self
            .toolkit
            .require_tool(
                ctx,
                self.name(),
                "maps.directions",
                json!({ "origin": origin, "destination": destination, "mode": mode, "waypoints": waypoints }),
            )
            .await?;
        Ok(AgentReply::new(json!({
            "status": "success",
            "mode": data.get("mode"),
            "route": data.pointer("/routes/0"),
            "instructions": route_instructions(&data),
        })))
    }

    async fn calculate_route(
        &self,
        params: &Value,
        ctx: &mut AgentContext,
    ) -> Result<AgentReply, AgentError> {
        let waypoints: Vec<Value> = required_param(params, "waypoints")?;
        if waypoints.len() < 2 {
            return Err(AgentError::validation("At least two waypoints are required"));
        }
        let mode: String = optional_param(params, "mode")?.unwrap_or_else(|| "driving".to_string());
        let (origin, rest) = waypoints.split_first().ok_or_else(|| {
            AgentError::validation("At least two waypoints are required")
        })?;
        let (destination, middle) = rest.split_last().ok_or_else(|| {
            AgentError::validation("At least two waypoints are required")
        })?;

        let data = self
            .toolkit
            .require_tool(
                ctx,
                self.name(),
                "maps.directions",
                json!({ "origin": origin, "destination": destination, "mode": mode, "waypoints": middle }),
            )
            .await?;
        let total_seconds = data
            .pointer("/routes/0/duration/value")
            .and_then(Value::as_f64)
            .unwrap_or(0.0);
        Ok(AgentReply::new(json!({
            "status": "success",
            "mode": data.get("mode"),
            "total_distance_meters": route_distance(&data).unwrap_or(0.0),
            "total_duration_seconds": total_seconds,
            "total_duration": format_duration(total_seconds as u64),
            "legs": data.pointer("/routes/0/legs"),
        })))
    }
}

#[async_trait]
impl Agent for RouteAgent {
    fn name(&self) -> &'static str {
        "route"
    }

    fn display_name(&self) -> &'static str {
        "Route Optimizer"
    }

    fn description(&self) -> &'static str {
        "Orders each day's stops and plans the transportation between them."
    }

    fn actions(&self) -> &'static [&'static str] {
        &["optimize_itinerary", "get_directions", "calculate_route"]
    }

    fn declare_tools(&self) -> Vec<Arc<dyn Tool>> {
        vec![Arc::new(DistanceMatrixTool), Arc::new(DirectionsTool)]
    }

    async fn handle(
        &self,
        action: &str,
        params: &Value,
        ctx: &mut AgentContext,
    ) -> Result<AgentReply, AgentError> {
        match action {
            "optimize_itinerary" => self.optimize_itinerary(params, ctx).await,
            "get_directions" => self.get_directions(params, ctx).await,
            "calculate_route" => self.calculate_route(params, ctx).await,
            other => Err(AgentError::UnknownAction {
                agent: self.name().to_string(),
                action: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::test_support::{register_tools, test_toolkit};
    use crate::agents::AgentMessage;
    use crate::models::{GeoPoint, PoiCategory, TripRequest};
    use chrono::NaiveDate;

    fn stop(id: &str, name: &str, lat: f64, lng: f64) -> Stop {
        Stop {
            id: id.into(),
            place_id: None,
            name: name.into(),
            category: PoiCategory::Attraction,
            address: None,
            location: Some(GeoPoint { lat, lng }),
            description: None,
            estimated_duration_minutes: 120,
            cost: None,
            opening_hours: vec![],
            tips: vec![],
        }
    }

    fn agent() -> RouteAgent {
        let toolkit = test_toolkit();
        let agent = RouteAgent::new(toolkit.clone());
        register_tools(&toolkit, &agent);
        agent
    }

    #[test]
    fn test_nearest_neighbor_tour() {
        let m = |rows: [[f64; 4]; 4]| -> Vec<Vec<Option<f64>>> {
            rows.iter().map(|r| r.iter().map(|v| Some(*v)).collect()).collect()
        };
        let durations = m([
            [0.0, 10.0, 5.0, 20.0],
            [10.0, 0.0, 7.0, 3.0],
            [5.0, 7.0, 0.0, 12.0],
            [20.0, 3.0, 12.0, 0.0],
        ]);
        assert_eq!(nearest_neighbor_order(&durations), vec![0, 2, 1, 3]);
    }

    #[test]
    fn test_nearest_neighbor_ties_pick_lowest_index() {
        let durations = vec![
            vec![Some(0.0), Some(4.0), Some(4.0)],
            vec![Some(4.0), Some(0.0), None],
            vec![Some(4.0), None, Some(0.0)],
        ];
        assert_eq!(nearest_neighbor_order(&durations), vec![0, 1, 2]);
        assert!(nearest_neighbor_order(&[]).is_empty());
    }

    #[test]
    fn test_mode_cost_and_duration_formatting() {
        assert_eq!(select_mode(1.5), TransportMode::Walking);
        assert_eq!(select_mode(4.0), TransportMode::Bicycling);
        assert_eq!(select_mode(50.0), TransportMode::Transit);
        assert_eq!(select_mode(51.0), TransportMode::Driving);
        assert_eq!(leg_cost(10.0, TransportMode::Driving), 5.0);
        assert_eq!(leg_cost(3.0, TransportMode::Walking), 0.0);
        assert_eq!(format_duration(30), "Less than a minute");
        assert_eq!(format_duration(3900), "1 hour 5 minutes");
        assert_eq!(format_duration(7200), "2 hours");
        assert_eq!(format_duration(60), "1 minute");
    }

    #[tokio::test]
    async fn test_optimize_itinerary_orders_stops_and_plans_legs() {
        let date = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        let mut plan = TripPlan::from_request(&TripRequest::new("Paris", date, date));
        let mut day = DayPlan::new(date);
        day.stops = vec![
            stop("stop_1_1", "Eiffel Tower", 48.8584, 2.2945),
            stop("stop_1_2", "Louvre Museum", 48.8606, 2.3376),
            stop("stop_1_3", "Musée d'Orsay", 48.8600, 2.3266),
        ];
        plan.days.push(day);

        let mut ctx = AgentContext::new("c", None, "c_0");
        let reply = agent()
            .process(
                AgentMessage::new(
                    "planner",
                    "route",
                    json!({"action": "optimize_itinerary", "parameters": {"trip_plan": plan}}),
                ),
                &mut ctx,
            )
            .await;
        assert!(!reply.is_error(), "{}", reply.content);

        let day = &reply.content["optimized_itinerary"]["by_date"]["2026-05-01"];
        let order: Vec<&str> = day["stops"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["id"].as_str().unwrap())
            .collect();
        assert_eq!(order, vec!["stop_1_1", "stop_1_3", "stop_1_2"]);

        let legs = day["transportation"].as_array().unwrap();
        assert_eq!(legs.len(), 2);
        assert_eq!(legs[0]["mode"], "bicycling");
        assert_eq!(legs[1]["mode"], "walking");
        assert_eq!(legs[1]["cost"], 0.0);
        assert!(!legs[0]["instructions"].as_array().unwrap().is_empty());
        assert_eq!(reply.content["summary"]["total_stops"], 3);
        assert_eq!(reply.content["summary"]["transportation_modes"]["walking"], 1);
    }

    #[tokio::test]
    async fn test_missing_matrix_keeps_original_order() {
        // 只注册 directions：距离矩阵调用失败，降级为原顺序
        let toolkit = test_toolkit();
        let agent = RouteAgent::new(toolkit.clone());
        toolkit.executor().registry().register(Arc::new(DirectionsTool));

        let date = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        let mut day = DayPlan::new(date);
        day.stops = vec![
            stop("a", "Eiffel Tower", 48.8584, 2.2945),
            stop("b", "Louvre Museum", 48.8606, 2.3376),
            stop("c", "Musée d'Orsay", 48.8600, 2.3266),
        ];
        let mut ctx = AgentContext::new("c", None, "c_0");
        let optimized = agent.optimize_day(&day, &mut ctx).await;
        let ids: Vec<&str> = optimized.stops.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(optimized.transportation.len(), 2);
        assert!(optimized.transportation.iter().all(|l| l.distance_meters > 0));
    }

    #[tokio::test]
    async fn test_calculate_route_requires_two_waypoints() {
        let mut ctx = AgentContext::new("c", None, "c_0");
        let reply = agent()
            .process(
                AgentMessage::new(
                    "planner",
                    "route",
                    json!({"action": "calculate_route", "parameters": {"waypoints": ["paris_louvre"]}}),
                ),
                &mut ctx,
            )
            .await;
        assert_eq!(reply.metadata["error_type"], "ValidationError");

        let reply = agent()
            .process(
                AgentMessage::new(
                    "planner",
                    "route",
                    json!({"action": "calculate_route", "parameters": {
                        "waypoints": ["paris_louvre", "paris_orsay", "paris_eiffel_tower"], "mode": "walking"
                    }}),
                ),
                &mut ctx,
            )
            .await;
        assert!(!reply.is_error(), "{}", reply.content);
        assert_eq!(reply.content["legs"].as_array().unwrap().len(), 2);
    }
}
