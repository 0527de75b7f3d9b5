//! 规划阶段状态机
//!
//! Phase 与 TripPlan 一起保存，每次合并成功后显式前进一步；
//! 只有在拿到一个不带阶段信息的行程计划时，才用 `Phase::infer` 根据数据形状推断。

use serde::{Deserialize, Serialize};

use crate::models::{TripPlan, TripRequest};

/// 行程规划阶段（固定顺序：地点 → 住宿 → 路线 → 预算 → 完成）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    AwaitingLocations,
    AwaitingLodging,
    AwaitingRouting,
    AwaitingBudget,
    Done,
}

impl Phase {
    /// 根据计划数据形状推断阶段，按顺序取第一个未满足的条件
    pub fn infer(plan: &TripPlan) -> Self {
        if plan.days.is_empty() {
            Self::AwaitingLocations
        } else if plan.hotels.is_empty() {
            Self::AwaitingLodging
        } else if plan
            .days
            .first()
            .map(|d| d.transportation.is_empty())
            .unwrap_or(true)
        {
            Self::AwaitingRouting
        } else if plan.estimated_total_cost.is_none() {
            Self::AwaitingBudget
        } else {
            Self::Done
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::AwaitingLocations => Self::AwaitingLodging,
            Self::AwaitingLodging => Self::AwaitingRouting,
            Self::AwaitingRouting => Self::AwaitingBudget,
            Self::AwaitingBudget | Self::Done => Self::Done,
        }
    }

    /// 本阶段等待的 (智能体, 动作)；Done 没有
    pub fn expected_step(self) -> Option<(&'static str, &'static str)> {
        match self {
            Self::AwaitingLocations => Some(("location", "get_recommendations")),
            Self::AwaitingLodging => Some(("stay", "search_accommodations")),
            Self::AwaitingRouting => Some(("route", "optimize_itinerary")),
            Self::AwaitingBudget => Some(("budget", "check_budget")),
            Self::Done => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::AwaitingLocations => "awaiting_locations",
            Self::AwaitingLodging => "awaiting_lodging",
            Self::AwaitingRouting => "awaiting_routing",
            Self::AwaitingBudget => "awaiting_budget",
            Self::Done => "done",
        }
    }
}

/// 一次规划的完整状态：原始请求、逐步填充的计划、当前阶段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanState {
    pub request: TripRequest,
    pub plan: TripPlan,
    pub phase: Phase,
}

impl PlanState {
    pub fn fresh(request: TripRequest) -> Self {
        let plan = TripPlan::from_request(&request);
        Self {
            request,
            plan,
            phase: Phase::AwaitingLocations,
        }
    }

    /// 使用外部给出的计划，阶段由数据形状推断
    pub fn resume(request: TripRequest, plan: TripPlan) -> Self {
        let phase = Phase::infer(&plan);
        Self {
            request,
            plan,
            phase,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DayPlan, HotelOption};
    use chrono::NaiveDate;

    fn request() -> TripRequest {
        TripRequest::new(
            "Paris",
            NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 6, 2).unwrap(),
        )
    }

    fn hotel() -> HotelOption {
        HotelOption {
            id: "h1".into(),
            name: "Hotel".into(),
            address: None,
            rating: Some(4.0),
            price_per_night: 100.0,
            currency: "USD".into(),
            amenities: vec![],
            location: None,
            free_cancellation: true,
        }
    }

    #[test]
    fn test_fresh_plan_awaits_locations() {
        let state = PlanState::fresh(request());
        assert_eq!(state.phase, Phase::AwaitingLocations);
        assert_eq!(state.plan.estimated_total_cost, None);
    }

    #[test]
    fn test_infer_follows_fixed_order() {
        let mut plan = TripPlan::from_request(&request());
        assert_eq!(Phase::infer(&plan), Phase::AwaitingLocations);

        plan.days.push(DayPlan::new(plan.start_date));
        assert_eq!(Phase::infer(&plan), Phase::AwaitingLodging);

        plan.hotels.push(hotel());
        // 费用已非空，但第一天没有交通段，仍应先做路线
        plan.estimated_total_cost = Some(250.0);
        assert_eq!(Phase::infer(&plan), Phase::AwaitingRouting);
    }

    #[test]
    fn test_zero_cost_counts_as_budgeted() {
        let mut plan = TripPlan::from_request(&request());
        plan.days.push(DayPlan::new(plan.start_date));
        plan.hotels.push(hotel());
        plan.days[0].transportation.push(crate::models::RouteLeg {
            from_stop_id: "a".into(),
            to_stop_id: "b".into(),
            mode: crate::models::TransportMode::Walking,
            duration_minutes: 5,
            distance_meters: 300,
            cost: Some(0.0),
            instructions: vec![],
        });
        assert_eq!(Phase::infer(&plan), Phase::AwaitingBudget);
        plan.estimated_total_cost = Some(0.0);
        assert_eq!(Phase::infer(&plan), Phase::Done);
    }

    #[test]
    fn test_next_saturates_at_done() {
        assert_eq!(Phase::AwaitingBudget.next(), Phase::Done);
        assert_eq!(Phase::Done.next(), Phase::Done);
        assert_eq!(Phase::Done.expected_step(), None);
    }
}
