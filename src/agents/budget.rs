//! Budget 智能体：费用估算、预算检查、记账与支出汇总

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::agents::base::{optional_param, required_param, Agent, AgentContext, AgentReply};
use crate::agents::toolkit::AgentToolkit;
use crate::core::AgentError;
use crate::models::{BudgetPreference, BudgetRecommendation, BudgetStatus, TripPlan};
use crate::tools::{AddExpenseTool, CurrencyConvertTool, ExpenseLedger, GetExpensesTool, Tool};

const SOUVENIRS_PER_DAY: f64 = 20.0;
const MISCELLANEOUS_PER_DAY: f64 = 15.0;
const MAX_RECOMMENDATIONS: usize = 3;

/// 各类别、各档位的每日默认费用
pub fn default_daily_cost(category: &str, level: &str) -> f64 {
    match (category, level) {
        ("accommodation", "budget") => 30.0,
        ("accommodation", "luxury") => 250.0,
        ("accommodation", "ultra_luxury") => 500.0,
        ("accommodation", _) => 100.0,
        ("food", "budget") => 15.0,
        ("food", "luxury") => 100.0,
        ("food", "ultra_luxury") => 200.0,
        ("food", _) => 40.0,
        ("transportation", "local") => 10.0,
        ("transportation", "premium") => 75.0,
        ("transportation", _) => 30.0,
        ("activities", "budget") => 10.0,
        ("activities", "luxury") => 75.0,
        ("activities", "ultra_luxury") => 150.0,
        ("activities", _) => 30.0,
        ("souvenirs", _) => SOUVENIRS_PER_DAY,
        _ => MISCELLANEOUS_PER_DAY,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// 预算判定：0 预算为 no_budget_set；超出为 over_budget；达到 90% 为 close_to_budget
pub fn classify_budget(total_estimated_cost: f64, total_budget: f64) -> BudgetStatus {
    let cost = round2(total_estimated_cost);
    if total_budget <= 0.0 {
        return BudgetStatus {
            status: "no_budget_set".to_string(),
            total_budget,
            total_estimated_cost: cost,
            amount_over_budget: 0.0,
            percentage_of_budget: None,
            remaining: None,
        };
    }
    let status = if cost > total_budget {
        "over_budget"
    } else if cost * 10.0 >= total_budget * 9.0 {
        "close_to_budget"
    } else {
        "within_budget"
    };
    BudgetStatus {
        status: status.to_string(),
        total_budget,
        total_estimated_cost: cost,
        amount_over_budget: round2((cost - total_budget).max(0.0)),
        percentage_of_budget: Some((cost / total_budget * 1000.0).round() / 10.0),
        remaining: Some(round2(total_budget - cost)),
    }
}

fn canned_suggestions(category: &str) -> Vec<String> {
    let suggestions: &[&str] = match category {
        "accommodation" => &[
            "Consider a mid-range hotel or a well-rated guesthouse",
            "Look for stays with free cancellation and watch for price drops",
            "Share a room or book an apartment for larger groups",
        ],
        "food" => &[
            "Eat at local markets and street food stalls",
            "Pick hotels with breakfast included",
            "Have your main meal at lunch when set menus are cheaper",
        ],
        "transportation" => &[
            "Use public transit passes instead of taxis",
            "Walk or cycle between nearby stops",
            "Group stops by neighbourhood to cut travel",
        ],
        "activities" => &[
            "Look for free museum days and walking tours",
            "Buy a city pass if visiting several paid attractions",
            "Mix paid attractions with parks and viewpoints",
        ],
        "souvenirs" => &["Set a fixed souvenir allowance", "Shop at local markets rather than tourist shops"],
        _ => &["Keep a small contingency and track daily spending"],
    };
    suggestions.iter().map(|s| s.to_string()).collect()
}

/// 超预算时，针对花费最高的三个类别给出 10%~20% 的节省区间
pub fn saving_recommendations(breakdown: &[(String, f64)]) -> Vec<BudgetRecommendation> {
    let mut ranked: Vec<&(String, f64)> = breakdown.iter().filter(|(_, c)| *c > 0.0).collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked
        .into_iter()
        .take(MAX_RECOMMENDATIONS)
        .map(|(category, cost)| BudgetRecommendation {
            category: category.clone(),
            current_cost: *cost,
            potential_savings_min: round2(cost * 0.10),
            potential_savings_max: round2(cost * 0.20),
            suggestions: canned_suggestions(category),
        })
        .collect()
}

/// 按类别的估算结果（保持固定类别顺序）
#[derive(Debug, Clone)]
struct CostEstimate {
    currency: String,
    days: u32,
    breakdown: Vec<(String, f64)>,
}

impl CostEstimate {
    fn total(&self) -> f64 {
        round2(self.breakdown.iter().map(|(_, c)| c).sum())
    }

    fn breakdown_json(&self) -> Value {
        let map: Map<String, Value> = self
            .breakdown
            .iter()
            .map(|(k, v)| (k.clone(), json!(v)))
            .collect();
        Value::Object(map)
    }
}

pub struct BudgetAgent {
    toolkit: AgentToolkit,
    ledger: Arc<ExpenseLedger>,
}

impl BudgetAgent {
    pub fn new(toolkit: AgentToolkit) -> Self {
        Self {
            toolkit,
            ledger: Arc::new(ExpenseLedger::new()),
        }
    }

    async fn convert(
        &self,
        ctx: &mut AgentContext,
        amount: f64,
        from: &str,
        to: &str,
    ) -> Result<f64, AgentError> {
        if from.eq_ignore_ascii_case(to) {
            return Ok(amount);
        }
        let data = self
            .toolkit
            .require_tool(
                ctx,
                self.name(),
                "currency.convert",
                json!({ "amount": amount, "from": from, "to": to }),
            )
            .await?;
        data.get("converted_amount")
            .and_then(Value::as_f64)
            .ok_or_else(|| AgentError::Internal("currency.convert returned no amount".to_string()))
    }

    async fn exchange_rate(
        &self,
        ctx: &mut AgentContext,
        from: &str,
        to: &str,
    ) -> Result<f64, AgentError> {
        if from.eq_ignore_ascii_case(to) {
            return Ok(1.0);
        }
        let data = self
            .toolkit
            .require_tool(
                ctx,
                self.name(),
                "currency.convert",
                json!({ "amount": 1.0, "from": from, "to": to }),
            )
            .await?;
        data.get("rate")
            .and_then(Value::as_f64)
            .ok_or_else(|| AgentError::Internal("currency.convert returned no rate".to_string()))
    }

    async fn estimate(
        &self,
        plan: &TripPlan,
        prefs: &BudgetPreference,
        travelers: u32,
        ctx: &mut AgentContext,
    ) -> Result<CostEstimate, AgentError> {
        let days = plan.duration_days().max(1);
        let days_f = f64::from(days);
        let nights = f64::from(days.saturating_sub(1).max(1));
        let travelers = f64::from(travelers.max(1));
        let rooms = (travelers / 2.0).ceil();
        let currency = prefs.currency.clone();

        let accommodation = match &plan.recommended_hotel {
            Some(hotel) => {
                let price = self
                    .convert(ctx, hotel.price_per_night, &hotel.currency, &currency)
                    .await?;
                price * rooms * nights
            }
            None => default_daily_cost("accommodation", &prefs.accommodation) * rooms * nights,
        };
        let food = default_daily_cost("food", &prefs.food) * days_f * travelers;

        let legs: Vec<_> = plan.days.iter().flat_map(|d| &d.transportation).collect();
        let transportation = if legs.is_empty() {
            default_daily_cost("transportation", &prefs.transportation) * days_f
        } else {
            legs.iter().filter_map(|l| l.cost).sum::<f64>()
        };

        let stop_costs: Vec<f64> = plan
            .days
            .iter()
            .flat_map(|d| &d.stops)
            .filter_map(|s| s.cost)
            .collect();
        let activities = if stop_costs.is_empty() {
            2.0 * default_daily_cost("activities", &prefs.activities) * days_f * travelers
        } else {
            stop_costs.iter().sum::<f64>() * travelers
        };

        let breakdown = vec![
            ("accommodation".to_string(), round2(accommodation)),
            ("food".to_string(), round2(food)),
            ("transportation".to_string(), round2(transportation)),
            ("activities".to_string(), round2(activities)),
            ("souvenirs".to_string(), round2(SOUVENIRS_PER_DAY * days_f)),
            ("miscellaneous".to_string(), round2(MISCELLANEOUS_PER_DAY * days_f)),
        ];
        Ok(CostEstimate {
            currency,
            days,
            breakdown,
        })
    }

    async fn check_budget(
        &self,
        params: &Value,
        ctx: &mut AgentContext,
    ) -> Result<AgentReply, AgentError> {
        let plan: TripPlan = required_param(params, "trip_plan")?;
        let budget: BudgetPreference = required_param(params, "budget")?;
        let travelers: u32 = optional_param(params, "travelers")?.unwrap_or(1);

        let estimate = self.estimate(&plan, &budget, travelers, ctx).await?;
        let total = estimate.total();
        let status = classify_budget(total, budget.total_budget);
        let recommendations = if status.status == "over_budget" {
            saving_recommendations(&estimate.breakdown)
        } else {
            Vec::new()
        };

        tracing::info!(
            correlation_id = %ctx.correlation_id,
            total_estimated_cost = total,
            budget = budget.total_budget,
            status = %status.status,
            "budget checked"
        );
        Ok(AgentReply::new(json!({
            "status": "success",
            "budget_adjustments": {
                "estimated_total_cost": total,
                "budget_status": status.status,
                "budget_remaining": status.remaining,
                "recommendations": recommendations,
            },
            "currency": estimate.currency,
            "cost_breakdown": estimate.breakdown_json(),
            "budget_analysis": status,
        })))
    }

    async fn estimate_costs(
        &self,
        params: &Value,
        ctx: &mut AgentContext,
    ) -> Result<AgentReply, AgentError> {
        let plan: TripPlan = required_param(params, "trip_plan")?;
        let prefs: BudgetPreference =
            optional_param(params, "budget_preferences")?.unwrap_or_default();
        let travelers: u32 = optional_param(params, "travelers")?.unwrap_or(1);

        let estimate = self.estimate(&plan, &prefs, travelers, ctx).await?;
        let total = estimate.total();
        Ok(AgentReply::new(json!({
            "status": "success",
            "currency": estimate.currency,
            "total_estimated_cost": total,
            "per_day": round2(total / f64::from(estimate.days)),
            "breakdown": estimate.breakdown_json(),
        })))
    }

    async fn track_expense(
        &self,
        params: &Value,
        ctx: &mut AgentContext,
    ) -> Result<AgentReply, AgentError> {
        let trip_id: String = required_param(params, "trip_id")?;
        let category: String = required_param(params, "category")?;
        let amount: f64 = required_param(params, "amount")?;
        let mut args = json!({ "trip_id": trip_id, "category": category, "amount": amount });
        for key in ["currency", "description", "date"] {
            if let Some(value) = params.get(key).filter(|v| !v.is_null()) {
                args[key] = value.clone();
            }
        }
        let data = self
            .toolkit
            .require_tool(ctx, self.name(), "expense_tracker.add_expense", args)
            .await?;
        Ok(AgentReply::new(json!({
            "status": "success",
            "expense": data.get("expense"),
        })))
    }

    async fn get_budget_summary(
        &self,
        params: &Value,
        ctx: &mut AgentContext,
    ) -> Result<AgentReply, AgentError> {
        let trip_id: String = required_param(params, "trip_id")?;
        let total_budget: Option<f64> = optional_param(params, "total_budget")?;
        let currency: String = optional_param(params, "currency")?
            .unwrap_or_else(|| BudgetPreference::default().currency);

        let data = self
            .toolkit
            .require_tool(
                ctx,
                self.name(),
                "expense_tracker.get_expenses",
                json!({ "trip_id": trip_id }),
            )
            .await?;

        // 每种币种换算一次汇率
        let mut rates: HashMap<String, f64> = HashMap::new();
        let mut by_category = Map::new();
        let mut total_spent = 0.0;
        if let Some(categories) = data.get("totals_by_category").and_then(Value::as_object) {
            for (category, amounts) in categories {
                let mut category_total = 0.0;
                for (from, amount) in amounts.as_object().into_iter().flatten() {
                    let amount = amount.as_f64().unwrap_or(0.0);
                    let rate = match rates.get(from).copied() {
                        Some(rate) => rate,
                        None => {
                            let rate = self.exchange_rate(ctx, from, &currency).await?;
                            rates.insert(from.clone(), rate);
                            rate
                        }
                    };
                    category_total += amount * rate;
                }
                total_spent += category_total;
                by_category.insert(category.clone(), json!(round2(category_total)));
            }
        }
        let total_spent = round2(total_spent);

        let mut summary = json!({
            "status": "success",
            "trip_id": trip_id,
            "currency": currency,
            "expense_count": data.get("count"),
            "total_spent": total_spent,
            "by_category": by_category,
        });
        if let Some(budget) = total_budget {
            let status = classify_budget(total_spent, budget);
            summary["budget_status"] = json!(status.status);
            summary["remaining"] = json!(status.remaining);
        }
        Ok(AgentReply::new(summary))
    }
}

#[async_trait]
impl Agent for BudgetAgent {
    fn name(&self) -> &'static str {
        "budget"
    }

    fn display_name(&self) -> &'static str {
        "Budget Advisor"
    }

    fn description(&self) -> &'static str {
        "Estimates trip costs, checks them against the budget and tracks expenses."
    }

    fn actions(&self) -> &'static [&'static str] {
        &["check_budget", "estimate_costs", "track_expense", "get_budget_summary"]
    }

    fn declare_tools(&self) -> Vec<Arc<dyn Tool>> {
        vec![
            Arc::new(CurrencyConvertTool),
            Arc::new(AddExpenseTool::new(self.ledger.clone())),
            Arc::new(GetExpensesTool::new(self.ledger.clone())),
        ]
    }

    async fn handle(
        &self,
        action: &str,
        params: &Value,
        ctx: &mut AgentContext,
    ) -> Result<AgentReply, AgentError> {
        match action {
            "check_budget" => self.check_budget(params, ctx).await,
            "estimate_costs" => self.estimate_costs(params, ctx).await,
            "track_expense" => self.track_expense(params, ctx).await,
            "get_budget_summary" => self.get_budget_summary(params, ctx).await,
            other => Err(AgentError::UnknownAction {
                agent: self.name().to_string(),
                action: other.to_string(),
            }),
        }
    }
}
