//! Stay 智能体：酒店搜索、详情、预订、取消、预订查询

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::agents::base::{optional_param, required_param, Agent, AgentContext, AgentReply};
use crate::agents::toolkit::AgentToolkit;
use crate::core::AgentError;
use crate::tools::{
    BookHotelTool, BookingDetailsTool, BookingLedger, CancelBookingTool, HotelDetailsTool,
    HotelSearchTool, Tool,
};

#[derive(Debug, Deserialize, Serialize)]
struct SearchParams {
    location: String,
    check_in: NaiveDate,
    check_out: NaiveDate,
    #[serde(default = "one")]
    guests: u32,
    #[serde(default = "one")]
    rooms: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    min_rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    price_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    price_max: Option<f64>,
    #[serde(default)]
    amenities: Vec<String>,
}

fn one() -> u32 {
    1
}

const BOOKING_FIELDS: &[&str] = &[
    "hotel_id",
    "room_type_id",
    "check_in",
    "check_out",
    "guest_name",
    "email",
    "phone",
    "payment_method",
];

pub struct StayAgent {
    toolkit: AgentToolkit,
    ledger: Arc<BookingLedger>,
}

impl StayAgent {
    pub fn new(toolkit: AgentToolkit) -> Self {
        Self {
            toolkit,
            ledger: Arc::new(BookingLedger::new()),
        }
    }

    async fn search_accommodations(
        &self,
        params: &Value,
        ctx: &mut AgentContext,
    ) -> Result<AgentReply, AgentError> {
        let search: SearchParams = serde_json::from_value(params.clone())
            .map_err(|e| AgentError::validation(format!("Invalid search parameters: {e}")))?;
        if search.location.trim().is_empty() {
            return Err(AgentError::validation("location is required"));
        }
        if search.check_out <= search.check_in {
            return Err(AgentError::validation("check_out must be after check_in"));
        }

        let args = serde_json::to_value(&search)
            .map_err(|e| AgentError::Internal(e.to_string()))?;
        let data = self
            .toolkit
            .require_tool(ctx, self.name(), "hotels.search", args)
            .await?;
        let hotels = data
            .get("results")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut reply = AgentReply::new(json!({
            "status": "success",
            "hotels": hotels,
            "total_results": data.get("total_results"),
            "search_parameters": data.get("search_parameters"),
        }));
        if let Some(id) = hotels.first().and_then(|h| h.get("id")).cloned() {
            reply = reply.with_context("recommended_hotel_id", id);
        }
        Ok(reply)
    }

    async fn get_accommodation_details(
        &self,
        params: &Value,
        ctx: &mut AgentContext,
    ) -> Result<AgentReply, AgentError> {
        let hotel_id: String = required_param(params, "hotel_id")?;
        let hotel = self
            .toolkit
            .require_tool(ctx, self.name(), "hotels.get_details", json!({ "hotel_id": hotel_id }))
            .await?;
        Ok(AgentReply::new(json!({ "status": "success", "hotel": hotel })))
    }

    async fn book_accommodation(
        &self,
        params: &Value,
        ctx: &mut AgentContext,
    ) -> Result<AgentReply, AgentError> {
        let missing: Vec<&str> = BOOKING_FIELDS
            .iter()
            .copied()
            .filter(|f| match params.get(*f) {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) => s.trim().is_empty(),
                Some(_) => false,
            })
            .collect();
        if !missing.is_empty() {
            return Err(AgentError::validation(format!(
                "Missing required booking fields: {}",
                missing.join(", ")
            )));
        }
        let booking = self
            .toolkit
            .require_tool(ctx, self.name(), "hotels.book", params.clone())
            .await?;
        let booking_id = booking
            .get("booking_id")
            .and_then(Value::as_str)
            .unwrap_or_default();
        tracing::info!(
            correlation_id = %ctx.correlation_id,
            booking_id = %booking_id,
            "accommodation booked"
        );
        Ok(AgentReply::new(json!({ "status": "success", "booking": booking })))
    }

    async fn cancel_booking(
        &self,
        params: &Value,
        ctx: &mut AgentContext,
    ) -> Result<AgentReply, AgentError> {
        let booking_id: String = required_param(params, "booking_id")?;
        let reason: String = optional_param(params, "reason")?
            .unwrap_or_else(|| "No reason provided".to_string());
        let booking = self
            .toolkit
            .require_tool(
                ctx,
                self.name(),
                "hotels.cancel_booking",
                json!({ "booking_id": booking_id, "reason": reason }),
            )
            .await?;
        Ok(AgentReply::new(json!({ "status": "success", "booking": booking })))
    }

    async fn get_booking_details(
        &self,
        params: &Value,
        ctx: &mut AgentContext,
    ) -> Result<AgentReply, AgentError> {
        let booking_id: String = required_param(params, "booking_id")?;
        let booking = self
            .toolkit
            .require_tool(
                ctx,
                self.name(),
                "hotels.get_booking_details",
                json!({ "booking_id": booking_id }),
            )
            .await?;
        Ok(AgentReply::new(json!({ "status": "success", "booking": booking })))
    }
}

#[async_trait]
impl Agent for StayAgent {
    fn name(&self) -> &'static str {
        "stay"
    }

    fn display_name(&self) -> &'static str {
        "Stay Finder"
    }

    fn description(&self) -> &'static str {
        "Searches, books and manages hotel accommodation."
    }

    fn actions(&self) -> &'static [&'static str] {
        &[
            "search_accommodations",
            "get_accommodation_details",
            "book_accommodation",
            "cancel_booking",
            "get_booking_details",
        ]
    }

    fn declare_tools(&self) -> Vec<Arc<dyn Tool>> {
        vec![
            Arc::new(HotelSearchTool),
            Arc::new(HotelDetailsTool),
            Arc::new(BookHotelTool::new(self.ledger.clone())),
            Arc::new(CancelBookingTool::new(self.ledger.clone())),
            Arc::new(BookingDetailsTool::new(self.ledger.clone())),
        ]
    }

    async fn handle(
        &self,
        action: &str,
        params: &Value,
        ctx: &mut AgentContext,
    ) -> Result<AgentReply, AgentError> {
        match action {
            "search_accommodations" => self.search_accommodations(params, ctx).await,
            "get_accommodation_details" => self.get_accommodation_details(params, ctx).await,
            "book_accommodation" => self.book_accommodation(params, ctx).await,
            "cancel_booking" => self.cancel_booking(params, ctx).await,
            "get_booking_details" => self.get_booking_details(params, ctx).await,
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
    use chrono::{Duration, Local};

    fn agent() -> StayAgent {
        let toolkit = test_toolkit();
        let agent = StayAgent::new(toolkit.clone());
        register_tools(&toolkit, &agent);
        agent
    }

    async fn call(agent: &StayAgent, action: &str, parameters: Value) -> AgentMessage {
        let mut ctx = AgentContext::new("c", None, "c_0");
        agent
            .process(
                AgentMessage::new("planner", "stay", json!({"action": action, "parameters": parameters})),
                &mut ctx,
            )
            .await
    }

    #[tokio::test]
    async fn test_search_sets_recommended_hotel_context() {
        let reply = call(
            &agent(),
            "search_accommodations",
            json!({"location": "Bangalore", "check_in": "2026-02-01", "check_out": "2026-02-04", "guests": 2}),
        )
        .await;
        assert!(!reply.is_error(), "{}", reply.content);
        assert_eq!(reply.content["hotels"][0]["id"], "hotel_3");
        assert_eq!(reply.context_updates["recommended_hotel_id"], "hotel_3");
    }

    #[tokio::test]
    async fn test_search_validates_dates() {
        let reply = call(
            &agent(),
            "search_accommodations",
            json!({"location": "Paris", "check_in": "2026-02-04", "check_out": "2026-02-04"}),
        )
        .await;
        assert!(reply.is_error());
        assert_eq!(reply.metadata["error_type"], "ValidationError");
    }

    #[tokio::test]
    async fn test_booking_lifecycle() {
        let agent = agent();
        let check_in = Local::now().date_naive() + Duration::days(10);
        let booked = call(
            &agent,
            "book_accommodation",
            json!({
                "hotel_id": "hotel_1", "room_type_id": "deluxe",
                "check_in": check_in, "check_out": check_in + Duration::days(1),
                "guest_name": "Ravi", "email": "ravi@example.com", "phone": "+91 80 0000",
                "payment_method": "upi"
            }),
        )
        .await;
        assert!(!booked.is_error(), "{}", booked.content);
        let booking_id = booked.content["booking"]["booking_id"].as_str().unwrap().to_string();
        assert!(booking_id.ends_with("-HOTE"));
        assert_eq!(booked.content["booking"]["total_price"], 18_025.0);

        let cancelled = call(&agent, "cancel_booking", json!({"booking_id": booking_id})).await;
        assert_eq!(cancelled.content["booking"]["status"], "cancelled");
        assert_eq!(cancelled.content["booking"]["cancellation"]["reason"], "No reason provided");

        let details = call(&agent, "get_booking_details", json!({"booking_id": booking_id})).await;
        assert_eq!(details.content["booking"]["status"], "cancelled");
    }

    #[tokio::test]
    async fn test_booking_requires_guest_fields() {
        let reply = call(&agent(), "book_accommodation", json!({"hotel_id": "hotel_1"})).await;
        assert!(reply.is_error());
        assert!(reply.content["error"].as_str().unwrap().contains("guest_name"));
    }
}
