//! 智能体统一接口
//!
//! 编排器只认识 `Agent::process(message, ctx) -> message`。具体智能体实现 `handle(action, params, ctx)`，
//! process 负责日志、记录步骤、以及把错误和 panic 统一转换成带 error 标记、回给发送方的消息。

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::core::state::PlanState;
use crate::core::AgentError;
use crate::tools::Tool;

/// 智能体间通信的信封
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMessage {
    pub id: String,
    pub sender: String,
    pub receiver: String,
    /// 纯文本或结构化：{action, parameters} / {target_agent, action, parameters}
    pub content: Value,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub context_updates: Map<String, Value>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    pub timestamp: DateTime<Utc>,
}

impl AgentMessage {
    pub fn new(sender: impl Into<String>, receiver: impl Into<String>, content: Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sender: sender.into(),
            receiver: receiver.into(),
            content,
            context_updates: Map::new(),
            metadata: Map::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn action(&self) -> Option<&str> {
        self.content.get("action").and_then(Value::as_str)
    }

    pub fn target_agent(&self) -> Option<&str> {
        self.content.get("target_agent").and_then(Value::as_str)
    }

    /// content.parameters；没有时为整个 content
    pub fn parameters(&self) -> &Value {
        self.content.get("parameters").unwrap_or(&self.content)
    }

    pub fn is_error(&self) -> bool {
        self.metadata
            .get("error")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// 处理失败时回给发送方的消息
    pub fn error(sender: &str, receiver: &str, err: &AgentError) -> Self {
        let mut message = Self::new(
            sender,
            receiver,
            json!({
                "status": "error",
                "error": err.to_string(),
                "message": format!("I encountered an error while processing your request: {err}"),
            }),
        );
        message.metadata.insert("error".into(), Value::Bool(true));
        message
            .metadata
            .insert("error_type".into(), Value::String(err.kind().to_string()));
        message
            .metadata
            .insert("error_details".into(), Value::String(format!("{err:?}")));
        message
    }
}

/// handle 的返回：响应内容 + 需要合并进会话 context 的键值
#[derive(Debug, Clone, Default)]
pub struct AgentReply {
    pub content: Value,
    pub context_updates: Map<String, Value>,
}

impl AgentReply {
    pub fn new(content: Value) -> Self {
        Self {
            content,
            context_updates: Map::new(),
        }
    }

    pub fn with_context(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.context_updates.insert(key.to_string(), value.into());
        self
    }
}

/// 对外公布的智能体描述
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentCard {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub version: String,
    pub actions: Vec<String>,
    pub tools: Vec<String>,
}

/// 一次 process 的记录
#[derive(Debug, Clone, Serialize)]
pub struct AgentStep {
    pub agent: String,
    pub action: String,
    pub tool_calls: Vec<String>,
    pub ok: bool,
    pub started_at: DateTime<Utc>,
}

/// 单轮执行上下文；会话 context/state 在回合结束时写回
#[derive(Debug, Clone, Default)]
pub struct AgentContext {
    pub conversation_id: String,
    pub user_id: Option<String>,
    pub correlation_id: String,
    pub context: Map<String, Value>,
    pub state: Map<String, Value>,
    /// 当前规划状态，由 Planner 建立、编排器合并推进
    pub plan: Option<PlanState>,
    pub steps: Vec<AgentStep>,
    pub errors: Vec<String>,
}

impl AgentContext {
    pub fn new(
        conversation_id: impl Into<String>,
        user_id: Option<String>,
        correlation_id: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            user_id,
            correlation_id: correlation_id.into(),
            ..Default::default()
        }
    }

    pub fn begin_step(&mut self, agent: &str, action: &str) {
        self.steps.push(AgentStep {
            agent: agent.to_string(),
            action: action.to_string(),
            tool_calls: Vec::new(),
            ok: true,
            started_at: Utc::now(),
        });
    }

    pub fn end_step(&mut self, ok: bool) {
        if let Some(step) = self.steps.last_mut() {
            step.ok = ok;
        }
    }

    pub fn record_tool_call(&mut self, tool: &str) {
        if let Some(step) = self.steps.last_mut() {
            step.tool_calls.push(tool.to_string());
        }
    }

    pub fn record_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    /// 合并智能体附带的 context 更新
    pub fn apply_context_updates(&mut self, updates: &Map<String, Value>) {
        for (k, v) in updates {
            self.context.insert(k.clone(), v.clone());
        }
    }
}

/// 智能体 trait：固定的动作表 + 声明的工具
#[async_trait]
pub trait Agent: Send + Sync {
    /// 目录中的键，如 "location"
    fn name(&self) -> &'static str;

    fn display_name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// 可识别的动作
    fn actions(&self) -> &'static [&'static str];

    /// 消息不带可识别动作时使用的动作（Planner 只有一个入口）
    fn default_action(&self) -> Option<&'static str> {
        None
    }

    /// 构造时声明、装配期注册进 ToolRegistry 的工具
    fn declare_tools(&self) -> Vec<Arc<dyn Tool>> {
        Vec::new()
    }

    fn card(&self) -> AgentCard {
        AgentCard {
            name: self.name().to_string(),
            display_name: self.display_name().to_string(),
            description: self.description().to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            actions: self.actions().iter().map(|a| a.to_string()).collect(),
            tools: self
                .declare_tools()
                .iter()
                .map(|t| t.name().to_string())
                .collect(),
        }
    }

    /// 具体动作处理；未识别的动作返回 UnknownAction
    async fn handle(
        &self,
        action: &str,
        params: &Value,
        ctx: &mut AgentContext,
    ) -> Result<AgentReply, AgentError>;

    /// 统一入口：错误与 panic 都变成回给发送方的错误消息
    async fn process(&self, message: AgentMessage, ctx: &mut AgentContext) -> AgentMessage {
        let action = match (message.action(), self.default_action()) {
            (Some(a), Some(default)) if !self.actions().iter().any(|known| *known == a) => {
                default.to_string()
            }
            (Some(a), _) => a.to_string(),
            (None, Some(default)) => default.to_string(),
            (None, None) => {
                let err = AgentError::validation("Missing action in message content");
                ctx.record_error(err.to_string());
                return AgentMessage::error(self.name(), &message.sender, &err);
            }
        };

        tracing::info!(
            agent = %self.name(),
            action = %action,
            correlation_id = %ctx.correlation_id,
            "processing message"
        );
        ctx.begin_step(self.name(), &action);

        let outcome = AssertUnwindSafe(self.handle(&action, message.parameters(), ctx))
            .catch_unwind()
            .await;
        let result = match outcome {
            Ok(result) => result,
            Err(_) => Err(AgentError::Internal(format!(
                "agent {} panicked while handling {action}",
                self.name()
            ))),
        };

        match result {
            Ok(reply) => {
                ctx.end_step(true);
                let mut response = AgentMessage::new(self.name(), &message.sender, reply.content);
                response.context_updates = reply.context_updates;
                response
            }
            Err(err) => {
                tracing::warn!(
                    agent = %self.name(),
                    action = %action,
                    correlation_id = %ctx.correlation_id,
                    error_type = err.kind(),
                    "agent step failed: {err}"
                );
                ctx.end_step(false);
                ctx.record_error(err.to_string());
                AgentMessage::error(self.name(), &message.sender, &err)
            }
        }
    }
}

/// 从参数中取必填字段并反序列化
pub fn required_param<T: serde::de::DeserializeOwned>(
    params: &Value,
    key: &str,
) -> Result<T, AgentError> {
    let value = params
        .get(key)
        .filter(|v| !v.is_null())
        .ok_or_else(|| AgentError::validation(format!("Missing required parameter: {key}")))?;
    serde_json::from_value(value.clone())
        .map_err(|e| AgentError::validation(format!("Invalid parameter {key}: {e}")))
}

/// 可选字段；存在但格式不对时报错
pub fn optional_param<T: serde::de::DeserializeOwned>(
    params: &Value,
    key: &str,
) -> Result<Option<T>, AgentError> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|e| AgentError::validation(format!("Invalid parameter {key}: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl Agent for Echo {
        fn name(&self) -> &'static str {
            "echo"
        }
        fn display_name(&self) -> &'static str {
            "Echo"
        }
        fn description(&self) -> &'static str {
            "Echoes parameters"
        }
        fn actions(&self) -> &'static [&'static str] {
            &["echo", "explode"]
        }
        async fn handle(
            &self,
            action: &str,
            params: &Value,
            _ctx: &mut AgentContext,
        ) -> Result<AgentReply, AgentError> {
            match action {
                "echo" => Ok(AgentReply::new(params.clone()).with_context("echoed", true)),
                "explode" => panic!("kaboom"),
                other => Err(AgentError::UnknownAction {
                    agent: self.name().into(),
                    action: other.into(),
                }),
            }
        }
    }

    fn ctx() -> AgentContext {
        AgentContext::new("conv_1", None, "conv_1_0")
    }

    #[tokio::test]
    async fn test_reply_goes_back_to_sender_with_context_updates() {
        let mut ctx = ctx();
        let msg = AgentMessage::new("planner", "echo", json!({"action": "echo", "parameters": {"x": 1}}));
        let reply = Echo.process(msg, &mut ctx).await;
        assert_eq!(reply.receiver, "planner");
        assert_eq!(reply.content, json!({"x": 1}));
        assert_eq!(reply.context_updates["echoed"], true);
        assert!(!reply.is_error());
        assert_eq!(ctx.steps.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_action_is_error_message() {
        let mut ctx = ctx();
        let msg = AgentMessage::new("planner", "echo", json!({"action": "fly"}));
        let reply = Echo.process(msg, &mut ctx).await;
        assert!(reply.is_error());
        assert_eq!(reply.receiver, "planner");
        assert_eq!(reply.metadata["error_type"], "UnknownAction");
        assert_eq!(reply.content["status"], "error");
    }

    #[tokio::test]
    async fn test_unknown_action_leaves_plan_untouched() {
        use crate::core::state::{Phase, PlanState};
        use crate::models::TripRequest;

        let mut ctx = ctx();
        let start = chrono::NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();
        let mut state = PlanState::fresh(TripRequest::new("Paris", start, start));
        state.phase = Phase::AwaitingRouting;
        ctx.plan = Some(state.clone());

        let msg = AgentMessage::new("planner", "echo", json!({"action": "fly", "parameters": {"x": 1}}));
        let reply = Echo.process(msg, &mut ctx).await;
        assert!(reply.is_error());
        assert_eq!(ctx.plan.as_ref(), Some(&state));
        assert_eq!(ctx.plan.unwrap().phase, Phase::AwaitingRouting);
    }

    #[tokio::test]
    async fn test_panic_becomes_internal_error() {
        let mut ctx = ctx();
        let msg = AgentMessage::new("planner", "echo", json!({"action": "explode"}));
        let reply = Echo.process(msg, &mut ctx).await;
        assert!(reply.is_error());
        assert_eq!(reply.metadata["error_type"], "InternalError");
        assert!(!ctx.steps[0].ok);
    }

    #[tokio::test]
    async fn test_missing_action_is_validation_error() {
        let mut ctx = ctx();
        let reply = Echo.process(AgentMessage::new("planner", "echo", json!("hi")), &mut ctx).await;
        assert_eq!(reply.metadata["error_type"], "ValidationError");
    }
}
