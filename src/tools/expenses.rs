//! 费用记账工具（模拟）：expense_tracker.add_expense / expense_tracker.get_expenses
//!
//! 按 trip_id 存在进程内；两个工具共享一个 ExpenseLedger。

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::tools::schema::{parse_args, schema_of};
use crate::tools::{Tool, ToolCallContext};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Expense {
    pub id: String,
    pub trip_id: String,
    pub category: String,
    pub amount: f64,
    pub currency: String,
    pub description: Option<String>,
    pub date: NaiveDate,
}

#[derive(Default)]
pub struct ExpenseLedger {
    inner: Mutex<LedgerInner>,
}

#[derive(Default)]
struct LedgerInner {
    next_id: u64,
    by_trip: HashMap<String, Vec<Expense>>,
}

impl ExpenseLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn add(&self, mut expense: Expense) -> Expense {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.next_id += 1;
        expense.id = format!("exp_{}", inner.next_id);
        inner
            .by_trip
            .entry(expense.trip_id.clone())
            .or_default()
            .push(expense.clone());
        expense
    }

    fn list(&self, trip_id: &str) -> Vec<Expense> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .by_trip
            .get(trip_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AddExpenseArgs {
    pub trip_id: String,
    /// accommodation / food / transportation / activities / souvenirs / miscellaneous
    pub category: String,
    pub amount: f64,
    #[serde(default = "crate::models::request::default_currency")]
    pub currency: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

pub struct AddExpenseTool {
    ledger: Arc<ExpenseLedger>,
}

impl AddExpenseTool {
    pub fn new(ledger: Arc<ExpenseLedger>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl Tool for AddExpenseTool {
    fn name(&self) -> &str {
        "expense_tracker.add_expense"
    }

    fn description(&self) -> &str {
        "Record an expense against a trip."
    }

    fn parameters_schema(&self) -> Value {
        schema_of::<AddExpenseArgs>()
    }

    async fn execute(&self, args: Value, _ctx: &ToolCallContext) -> Result<Value, String> {
        let args: AddExpenseArgs = parse_args(self.name(), args)?;
        if args.trip_id.trim().is_empty() {
            return Err("trip_id must not be empty".to_string());
        }
        if !(args.amount > 0.0) || !args.amount.is_finite() {
            return Err("amount must be a positive number".to_string());
        }
        let expense = self.ledger.add(Expense {
            id: String::new(),
            trip_id: args.trip_id,
            category: args.category.to_lowercase(),
            amount: args.amount,
            currency: args.currency.to_uppercase(),
            description: args.description,
            date: args.date.unwrap_or_else(|| Local::now().date_naive()),
        });
        Ok(json!({ "status": "recorded", "expense": expense }))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetExpensesArgs {
    pub trip_id: String,
    #[serde(default)]
    pub category: Option<String>,
}

pub struct GetExpensesTool {
    ledger: Arc<ExpenseLedger>,
}

impl GetExpensesTool {
    pub fn new(ledger: Arc<ExpenseLedger>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl Tool for GetExpensesTool {
    fn name(&self) -> &str {
        "expense_tracker.get_expenses"
    }

    fn description(&self) -> &str {
        "List recorded expenses for a trip with totals by currency and category."
    }

    fn parameters_schema(&self) -> Value {
        schema_of::<GetExpensesArgs>()
    }

    async fn execute(&self, args: Value, _ctx: &ToolCallContext) -> Result<Value, String> {
        let args: GetExpensesArgs = parse_args(self.name(), args)?;
        let mut expenses = self.ledger.list(&args.trip_id);
        if let Some(category) = &args.category {
            expenses.retain(|e| e.category.eq_ignore_ascii_case(category));
        }

        let mut by_currency: BTreeMap<String, f64> = BTreeMap::new();
        let mut by_category: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
        for e in &expenses {
            *by_currency.entry(e.currency.clone()).or_default() += e.amount;
            *by_category
                .entry(e.category.clone())
                .or_default()
                .entry(e.currency.clone())
                .or_default() += e.amount;
        }

        Ok(json!({
            "trip_id": args.trip_id,
            "count": expenses.len(),
            "totals_by_currency": by_currency,
            "totals_by_category": by_category,
            "expenses": expenses,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_and_total_expenses() {
        let ledger = Arc::new(ExpenseLedger::new());
        let add = AddExpenseTool::new(ledger.clone());
        let ctx = ToolCallContext::default();
        let first = add
            .execute(json!({"trip_id": "t1", "category": "Food", "amount": 12.5, "currency": "eur"}), &ctx)
            .await
            .unwrap();
        assert_eq!(first["expense"]["id"], "exp_1");
        add.execute(json!({"trip_id": "t1", "category": "food", "amount": 7.5, "currency": "EUR"}), &ctx)
            .await
            .unwrap();
        add.execute(json!({"trip_id": "t1", "category": "activities", "amount": 30.0}), &ctx)
            .await
            .unwrap();

        let out = GetExpensesTool::new(ledger)
            .execute(json!({"trip_id": "t1"}), &ctx)
            .await
            .unwrap();
        assert_eq!(out["count"], 3);
        assert_eq!(out["totals_by_currency"]["EUR"], 20.0);
        assert_eq!(out["totals_by_currency"]["USD"], 30.0);
        assert_eq!(out["totals_by_category"]["food"]["EUR"], 20.0);
    }

    #[tokio::test]
    async fn test_non_positive_amount_rejected() {
        let add = AddExpenseTool::new(Arc::new(ExpenseLedger::new()));
        let err = add
            .execute(json!({"trip_id": "t1", "category": "food", "amount": 0}), &ToolCallContext::default())
            .await
            .unwrap_err();
        assert!(err.contains("positive"));
    }
}
