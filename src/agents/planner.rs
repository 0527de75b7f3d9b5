//! Planner：决定下一步交给哪个智能体
//!
//! 新消息先解析出行程请求（结构化 → 文本启发式 → 已保存计划 → LLM），之后按阶段瀑布
//! （地点 → 住宿 → 路线 → 预算 → 完成）给出 {target_agent, action, parameters}，全部完成时返回 finish。

use std::sync::OnceLock;

use async_trait::async_trait;
use chrono::{Duration, Local, NaiveDate};
use regex::Regex;
use serde_json::{json, Value};

use crate::agents::base::{Agent, AgentContext, AgentReply};
use crate::agents::toolkit::AgentToolkit;
use crate::core::state::{Phase, PlanState};
use crate::core::AgentError;
use crate::llm::LlmResponse;
use crate::models::{BudgetPreference, TripRequest};
use crate::tools::ToolDescriptor;

const DEFAULT_DAYS: i64 = 3;
const MAX_DAYS: i64 = 10;

const EXTRACTION_PROMPT: &str = "You are a travel planning assistant. Extract the trip the user wants \
to plan by calling extract_trip_request. Dates are ISO 8601 (YYYY-MM-DD). If no start date is given, \
start today. If the message does not describe a trip, answer in plain text.";

/// 编排器续步消息中的 instruction
pub const CONTINUE_INSTRUCTION: &str = "Continue planning based on the latest context.";

fn destination_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(?:[Tt]o|[Ii]n)\s+(\p{Lu}[\p{L}'\-]*(?:\s+\p{Lu}[\p{L}'\-]*)*)")
            .expect("valid regex")
    })
}

fn destination_fallback_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(?:to|in)\s+([\p{L}][\p{L}'\-]+)").expect("valid regex"))
}

/// 明确表示要规划行程的词：天数、trip、visit 等
fn trip_cue_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:trips?|travel(?:l?ing)?|visit(?:ing)?|vacation|holiday|weekend|getaway|itinerary|journey|\d+\s*-?\s*(?:days?|nights?))\b",
        )
        .expect("valid regex")
    })
}

pub fn has_trip_cue(text: &str) -> bool {
    trip_cue_re().is_match(text)
}

fn days_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\d+)\s*-?\s*days?\b").expect("valid regex"))
}

fn dollar_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\s*(\d[\d,]*(?:\.\d+)?)").expect("valid regex"))
}

fn budget_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)budget\s+(?:of\s+)?(\d[\d,]*(?:\.\d+)?)\s*([a-z]{3})?\b").expect("valid regex")
    })
}

fn travelers_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\bfor\s+(\d+)\s+(?:people|persons|travell?ers|adults|guests)\b")
            .expect("valid regex")
    })
}

/// 小写兜底匹配时不当作地名的词
const NOT_PLACES: &[&str] = &[
    "go", "the", "a", "an", "visit", "see", "travel", "plan", "take", "make", "be", "have", "get",
    "stay", "explore", "my", "our",
];

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn parse_amount(raw: &str) -> Option<f64> {
    raw.replace(',', "").parse().ok()
}

/// 从自由文本解析行程请求；找不到目的地时返回 None
///
/// 小写地名只在文本带有行程提示词时才认，避免 "want to eat" 被当成目的地。
pub fn parse_trip_text(text: &str, today: NaiveDate) -> Option<TripRequest> {
    let destination = destination_re()
        .captures_iter(text)
        .map(|c| c[1].trim().to_string())
        .next()
        .or_else(|| {
            if !has_trip_cue(text) {
                return None;
            }
            destination_fallback_re()
                .captures_iter(text)
                .map(|c| c[1].to_lowercase())
                .filter(|w| !NOT_PLACES.contains(&w.as_str()))
                .last()
                .map(|w| title_case(&w))
        })?;

    let days = days_re()
        .captures(text)
        .and_then(|c| c[1].parse::<i64>().ok())
        .unwrap_or(DEFAULT_DAYS)
        .clamp(1, MAX_DAYS);

    let mut request = TripRequest::new(destination, today, today + Duration::days(days - 1));

    if let Some(c) = dollar_re().captures(text) {
        if let Some(amount) = parse_amount(&c[1]) {
            request.budget = BudgetPreference {
                total_budget: amount,
                currency: "USD".to_string(),
                ..BudgetPreference::default()
            };
        }
    } else if let Some(c) = budget_re().captures(text) {
        if let Some(amount) = parse_amount(&c[1]) {
            request.budget = BudgetPreference {
                total_budget: amount,
                currency: c
                    .get(2)
                    .map(|m| m.as_str().to_uppercase())
                    .unwrap_or_else(|| "USD".to_string()),
                ..BudgetPreference::default()
            };
        }
    }

    if let Some(n) = travelers_re()
        .captures(text)
        .and_then(|c| c[1].parse::<u32>().ok())
    {
        request.travelers = n.max(1);
    }

    Some(request)
}

/// 当前阶段对应的指令，或 finish 内容
pub fn next_directive(state: &PlanState) -> Value {
    let request = &state.request;
    match state.phase {
        Phase::AwaitingLocations => json!({
            "target_agent": "location",
            "action": "get_recommendations",
            "parameters": { "trip_request": request },
        }),
        Phase::AwaitingLodging => {
            // 单日行程也至少住一晚
            let check_out = if request.end_date > request.start_date {
                request.end_date
            } else {
                request.start_date + Duration::days(1)
            };
            let mut parameters = json!({
                "location": request.destination,
                "check_in": request.start_date,
                "check_out": check_out,
                "guests": request.travelers,
                "rooms": request.travelers.div_ceil(2),
            });
            let prefs = &request.accommodation;
            if let Some(min_rating) = prefs.min_rating {
                parameters["min_rating"] = json!(min_rating);
            }
            if let Some(price_max) = prefs.max_price_per_night {
                parameters["price_max"] = json!(price_max);
            }
            if !prefs.amenities.is_empty() {
                parameters["amenities"] = json!(prefs.amenities);
            }
            json!({
                "target_agent": "stay",
                "action": "search_accommodations",
                "parameters": parameters,
            })
        }
        Phase::AwaitingRouting => json!({
            "target_agent": "route",
            "action": "optimize_itinerary",
            "parameters": { "trip_plan": state.plan },
        }),
        Phase::AwaitingBudget => json!({
            "target_agent": "budget",
            "action": "check_budget",
            "parameters": {
                "trip_plan": state.plan,
                "budget": request.budget,
                "travelers": request.travelers,
            },
        }),
        Phase::Done => finish_content(state),
    }
}

fn finish_content(state: &PlanState) -> Value {
    let plan = &state.plan;
    let estimated_cost = plan
        .estimated_total_cost
        .map(|cost| format!("{cost:.2} {}", plan.currency))
        .unwrap_or_else(|| "Not calculated".to_string());
    json!({
        "action": "finish",
        "status": "success",
        "phase": Phase::Done.as_str(),
        "trip_plan": plan,
        "summary": {
            "destination": plan.display_destination(),
            "duration": format!("{} days", plan.duration_days()),
            "total_stops": plan.total_stops(),
            "recommended_hotel": plan
                .recommended_hotel
                .as_ref()
                .map(|h| h.name.clone())
                .unwrap_or_else(|| "None".to_string()),
            "estimated_cost": estimated_cost,
            "budget_status": plan.budget_status.clone().unwrap_or_else(|| "unknown".to_string()),
        },
    })
}

fn is_continuation(params: &Value) -> bool {
    params.get("instruction").and_then(Value::as_str) == Some(CONTINUE_INSTRUCTION)
}

fn message_text(params: &Value) -> Option<&str> {
    match params {
        Value::String(s) => Some(s.as_str()),
        Value::Object(map) => ["message", "text", "query"]
            .iter()
            .find_map(|k| map.get(*k).and_then(Value::as_str)),
        _ => None,
    }
}

fn extraction_tool() -> ToolDescriptor {
    ToolDescriptor {
        name: "extract_trip_request".to_string(),
        description: "Record the destination, dates, travelers, interests and budget of the trip."
            .to_string(),
        parameters: crate::tools::schema::schema_of::<TripRequest>(),
    }
}

pub struct PlannerAgent {
    toolkit: AgentToolkit,
}

impl PlannerAgent {
    pub fn new(toolkit: AgentToolkit) -> Self {
        Self { toolkit }
    }

    /// 按顺序尝试各来源；返回 None 表示沿用已保存的计划
    async fn resolve_request(
        &self,
        params: &Value,
        ctx: &AgentContext,
    ) -> Result<Option<TripRequest>, AgentError> {
        if let Some(raw) = params.get("trip_request").filter(|v| v.is_object()) {
            let request = serde_json::from_value(raw.clone())
                .map_err(|e| AgentError::validation(format!("Invalid trip_request: {e}")))?;
            return Ok(Some(request));
        }
        if params.get("destination").is_some() && params.get("start_date").is_some() {
            let request = serde_json::from_value(params.clone())
                .map_err(|e| AgentError::validation(format!("Invalid trip request: {e}")))?;
            return Ok(Some(request));
        }

        let text = message_text(params);
        // 已有计划时，只有明确的新行程才会替换它
        if ctx.plan.is_some() && !text.is_some_and(has_trip_cue) {
            return Ok(None);
        }
        let today = Local::now().date_naive();
        if let Some(request) = text.and_then(|t| parse_trip_text(t, today)) {
            return Ok(Some(request));
        }
        if ctx.plan.is_some() {
            return Ok(None);
        }

        let text = text.ok_or_else(|| {
            AgentError::validation("Message does not contain a trip request")
        })?;
        let prompt = format!("Today is {today}. User message: {text}");
        match self
            .toolkit
            .generate_response(ctx, self.name(), EXTRACTION_PROMPT, &prompt, &[extraction_tool()])
            .await?
        {
            LlmResponse::ToolCall { tool_args, .. } => serde_json::from_value(tool_args)
                .map(Some)
                .map_err(|e| AgentError::validation(format!("Could not extract trip details: {e}"))),
            LlmResponse::FinalAnswer { content } => Err(AgentError::validation(format!(
                "Could not determine trip details from the message ({content})"
            ))),
        }
    }
}

#[async_trait]
impl Agent for PlannerAgent {
    fn name(&self) -> &'static str {
        "planner"
    }

    fn display_name(&self) -> &'static str {
        "Trip Planner"
    }

    fn description(&self) -> &'static str {
        "Coordinates the other agents and decides the next planning step."
    }

    fn actions(&self) -> &'static [&'static str] {
        &["plan"]
    }

    fn default_action(&self) -> Option<&'static str> {
        Some("plan")
    }

    async fn handle(
        &self,
        action: &str,
        params: &Value,
        ctx: &mut AgentContext,
    ) -> Result<AgentReply, AgentError> {
        if action != "plan" {
            return Err(AgentError::UnknownAction {
                agent: self.name().to_string(),
                action: action.to_string(),
            });
        }

        if !is_continuation(params) {
            if let Some(request) = self.resolve_request(params, ctx).await? {
                request.validate().map_err(AgentError::Validation)?;
                tracing::info!(
                    correlation_id = %ctx.correlation_id,
                    destination = %request.destination,
                    days = request.duration_days(),
                    "new trip request"
                );
                ctx.plan = Some(PlanState::fresh(request));
            }
        }

        let state = ctx
            .plan
            .as_ref()
            .ok_or_else(|| AgentError::validation("No trip plan in progress"))?;
        let directive = next_directive(state);
        tracing::debug!(phase = state.phase.as_str(), "planner directive");
        Ok(AgentReply::new(directive))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::AgentMessage;
    use crate::llm::MockLlmClient;
    use crate::models::{DayPlan, HotelOption, RouteLeg, TransportMode, TripPlan};
    use crate::tools::{ToolExecutor, ToolRegistry};
    use std::sync::Arc;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
    }

    fn planner(llm: MockLlmClient) -> PlannerAgent {
        let executor = Arc::new(ToolExecutor::new(Arc::new(ToolRegistry::new()), 5));
        PlannerAgent::new(AgentToolkit::new(executor, Arc::new(llm)))
    }

    #[test]
    fn test_parse_trip_text() {
        let request = parse_trip_text("Plan a trip to Paris for 3 days", today()).unwrap();
        assert_eq!(request.destination, "Paris");
        assert_eq!(request.start_date, today());
        assert_eq!(request.end_date, NaiveDate::from_ymd_opt(2026, 3, 12).unwrap());

        let request = parse_trip_text(
            "I want to go to New York for 2 people, 30 days, budget of 2,500 eur",
            today(),
        )
        .unwrap();
        assert_eq!(request.destination, "New York");
        assert_eq!(request.duration_days(), 10);
        assert_eq!(request.travelers, 2);
        assert_eq!(request.budget.total_budget, 2500.0);
        assert_eq!(request.budget.currency, "EUR");

        let request = parse_trip_text("weekend in lisbon with $800", today()).unwrap();
        assert_eq!(request.destination, "Lisbon");
        assert_eq!(request.duration_days(), 3);
        assert_eq!(request.budget.total_budget, 800.0);

        assert!(parse_trip_text("hello there", today()).is_none());
        assert!(parse_trip_text("I'd like to eat more", today()).is_none());
        assert!(parse_trip_text("Thanks, I want to relax", today()).is_none());
    }

    fn hotel() -> HotelOption {
        HotelOption {
            id: "h1".into(),
            name: "Hotel One".into(),
            address: None,
            rating: Some(4.5),
            price_per_night: 100.0,
            currency: "USD".into(),
            amenities: vec![],
            location: None,
            free_cancellation: true,
        }
    }

    #[test]
    fn test_waterfall_prefers_routing_over_budget() {
        let request = TripRequest::new("Paris", today(), today());
        let mut plan = TripPlan::from_request(&request);
        plan.days.push(DayPlan::new(today()));
        plan.hotels.push(hotel());
        plan.estimated_total_cost = Some(250.0);
        let state = PlanState::resume(request, plan);
        let directive = next_directive(&state);
        assert_eq!(directive["target_agent"], "route");
        assert_eq!(directive["action"], "optimize_itinerary");
    }

    #[test]
    fn test_finish_summary() {
        let request = TripRequest::new("Paris", today(), today() + Duration::days(1));
        let mut plan = TripPlan::from_request(&request);
        plan.country = Some("France".into());
        let mut day = DayPlan::new(today());
        day.transportation.push(RouteLeg {
            from_stop_id: "a".into(),
            to_stop_id: "b".into(),
            mode: TransportMode::Walking,
            duration_minutes: 5,
            distance_meters: 400,
            cost: Some(0.0),
            instructions: vec![],
        });
        plan.days.push(day);
        plan.hotels.push(hotel());
        plan.recommended_hotel = Some(hotel());
        plan.estimated_total_cost = Some(512.5);
        plan.budget_status = Some("within_budget".into());
        let state = PlanState::resume(request, plan);
        assert_eq!(state.phase, Phase::Done);

        let content = next_directive(&state);
        assert_eq!(content["action"], "finish");
        assert_eq!(content["summary"]["destination"], "Paris, France");
        assert_eq!(content["summary"]["duration"], "2 days");
        assert_eq!(content["summary"]["recommended_hotel"], "Hotel One");
        assert_eq!(content["summary"]["estimated_cost"], "512.50 USD");
    }

    #[tokio::test]
    async fn test_text_message_starts_fresh_plan() {
        let mut ctx = AgentContext::new("c", None, "c_0");
        let reply = planner(MockLlmClient::new())
            .process(
                AgentMessage::new("orchestrator", "planner", json!("Plan a trip to Rome for 2 days")),
                &mut ctx,
            )
            .await;
        assert!(!reply.is_error());
        assert_eq!(reply.target_agent(), Some("location"));
        assert_eq!(ctx.plan.unwrap().request.destination, "Rome");
    }

    #[tokio::test]
    async fn test_stay_parameters_include_preferences() {
        let mut request = TripRequest::new("Paris", today(), today() + Duration::days(2));
        request.travelers = 3;
        request.accommodation.min_rating = Some(4.5);
        let mut state = PlanState::fresh(request);
        state.phase = Phase::AwaitingLodging;
        let directive = next_directive(&state);
        assert_eq!(directive["parameters"]["rooms"], 2);
        assert_eq!(directive["parameters"]["min_rating"], 4.5);
        assert!(directive["parameters"].get("price_max").is_none());
    }

    #[tokio::test]
    async fn test_llm_tool_call_is_used_as_last_resort() {
        let scripted = MockLlmClient::scripted([
            r#"{"tool": "extract_trip_request", "args": {"destination": "Kyoto", "start_date": "2026-04-01", "end_date": "2026-04-03"}}"#,
        ]);
        let mut ctx = AgentContext::new("c", None, "c_0");
        let reply = planner(scripted)
            .process(
                AgentMessage::new("orchestrator", "planner", json!("somewhere with temples please")),
                &mut ctx,
            )
            .await;
        assert!(!reply.is_error(), "{:?}", reply.content);
        assert_eq!(ctx.plan.unwrap().request.destination, "Kyoto");
    }

    #[tokio::test]
    async fn test_unparseable_message_without_plan_is_validation_error() {
        let mut ctx = AgentContext::new("c", None, "c_0");
        let reply = planner(MockLlmClient::new())
            .process(AgentMessage::new("orchestrator", "planner", json!("hello")), &mut ctx)
            .await;
        assert!(reply.is_error());
        assert_eq!(reply.metadata["error_type"], "ValidationError");
        assert!(ctx.plan.is_none());
    }

    fn finished_paris_context() -> AgentContext {
        let mut ctx = AgentContext::new("c", None, "c_4");
        let mut state = PlanState::fresh(TripRequest::new("Paris", today(), today() + Duration::days(2)));
        state.phase = Phase::Done;
        ctx.plan = Some(state);
        ctx
    }

    #[tokio::test]
    async fn test_chatty_follow_up_keeps_stored_plan() {
        let planner = planner(MockLlmClient::new());
        for text in ["I'd like to eat more", "Thanks, I want to relax", "Can we go to the Louvre?"] {
            let mut ctx = finished_paris_context();
            let reply = planner
                .process(AgentMessage::new("orchestrator", "planner", json!(text)), &mut ctx)
                .await;
            assert!(!reply.is_error(), "{text}: {:?}", reply.content);
            assert_eq!(reply.action(), Some("finish"), "{text}");
            let state = ctx.plan.unwrap();
            assert_eq!(state.request.destination, "Paris", "{text}");
            assert_eq!(state.phase, Phase::Done);
        }
    }

    #[tokio::test]
    async fn test_explicit_new_trip_replaces_stored_plan() {
        let mut ctx = finished_paris_context();
        let reply = planner(MockLlmClient::new())
            .process(
                AgentMessage::new("orchestrator", "planner", json!("Now plan a 2 day trip to Rome")),
                &mut ctx,
            )
            .await;
        assert_eq!(reply.target_agent(), Some("location"));
        let state = ctx.plan.unwrap();
        assert_eq!(state.request.destination, "Rome");
        assert_eq!(state.phase, Phase::AwaitingLocations);
    }

    #[tokio::test]
    async fn test_overlong_structured_request_is_rejected() {
        let mut ctx = AgentContext::new("c", None, "c_0");
        let message = json!({ "trip_request": {
            "destination": "Paris",
            "start_date": "2026-01-01",
            "end_date": "2031-06-30"
        }});
        let reply = planner(MockLlmClient::new())
            .process(AgentMessage::new("orchestrator", "planner", message), &mut ctx)
            .await;
        assert!(reply.is_error());
        assert_eq!(reply.metadata["error_type"], "ValidationError");
        assert!(ctx.plan.is_none());
    }
}
