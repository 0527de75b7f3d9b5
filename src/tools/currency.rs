//! 货币换算工具（模拟）：currency.convert，固定以 USD 为基准的汇率表

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::tools::schema::{parse_args, schema_of};
use crate::tools::{Tool, ToolCallContext};

/// 1 USD 可兑换的数量
const USD_RATES: &[(&str, f64)] = &[
    ("USD", 1.0),
    ("EUR", 0.92),
    ("GBP", 0.79),
    ("JPY", 151.0),
    ("INR", 83.2),
    ("AUD", 1.52),
    ("CAD", 1.36),
    ("CHF", 0.88),
    ("CNY", 7.2),
    ("SGD", 1.34),
];

fn usd_rate(code: &str) -> Option<f64> {
    USD_RATES
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, rate)| *rate)
}

/// from → to 的汇率
pub fn exchange_rate(from: &str, to: &str) -> Result<f64, String> {
    let from_rate = usd_rate(from).ok_or_else(|| format!("Unsupported currency: {from}"))?;
    let to_rate = usd_rate(to).ok_or_else(|| format!("Unsupported currency: {to}"))?;
    Ok(to_rate / from_rate)
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ConvertArgs {
    pub amount: f64,
    /// ISO 4217 代码，如 EUR
    pub from: String,
    pub to: String,
}

pub struct CurrencyConvertTool;

#[async_trait]
impl Tool for CurrencyConvertTool {
    fn name(&self) -> &str {
        "currency.convert"
    }

    fn description(&self) -> &str {
        "Convert an amount between currencies using a fixed rate table."
    }

    fn parameters_schema(&self) -> Value {
        schema_of::<ConvertArgs>()
    }

    async fn execute(&self, args: Value, _ctx: &ToolCallContext) -> Result<Value, String> {
        let args: ConvertArgs = parse_args(self.name(), args)?;
        if !args.amount.is_finite() {
            return Err("amount must be a finite number".to_string());
        }
        let rate = exchange_rate(&args.from, &args.to)?;
        let converted = (args.amount * rate * 100.0).round() / 100.0;
        Ok(json!({
            "amount": args.amount,
            "from": args.from.to_uppercase(),
            "to": args.to.to_uppercase(),
            "rate": rate,
            "converted_amount": converted,
        }))
    }
}
