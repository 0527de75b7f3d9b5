//! 工具注册表
//!
//! 所有工具实现 Tool trait（name / description / parameters_schema / execute），由 ToolRegistry 按名注册与查找；
//! 每次调用无论成败都归一化为 ToolResult，只有「工具不存在」以 ToolError::NotFound 返回。

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// 工具调用上下文：关联 ID 与调用方智能体，用于日志关联
#[derive(Debug, Clone, Default)]
pub struct ToolCallContext {
    pub correlation_id: String,
    pub caller_agent: String,
}

impl ToolCallContext {
    pub fn new(correlation_id: impl Into<String>, caller_agent: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            caller_agent: caller_agent.into(),
        }
    }
}

/// 工具 trait：名称、描述（供 LLM 理解）、参数 schema、异步执行（args 为 JSON）
#[async_trait]
pub trait Tool: Send + Sync {
    /// 工具名称，如 maps.search_places
    fn name(&self) -> &str;

    /// 工具描述（供 LLM 理解功能）
    fn description(&self) -> &str;

    /// 参数 JSON Schema；默认不限参数
    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    /// 执行工具，成功返回数据载荷，失败返回错误描述
    async fn execute(&self, args: Value, ctx: &ToolCallContext) -> Result<Value, String>;
}

/// 工具描述符：告诉 LLM 有哪些工具可用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolDescriptor {
    pub fn of(tool: &dyn Tool) -> Self {
        Self {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            parameters: tool.parameters_schema(),
        }
    }
}

/// 统一的工具调用结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl ToolResult {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            metadata: Map::new(),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            success: false,
            data: Some(serde_json::json!({ "error": error })),
            error: Some(error),
            metadata: Map::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),
}

/// 工具注册表：按名称存储 Arc<dyn Tool>；注册发生在装配期，之后只读
#[derive(Default)]
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<dyn Tool>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册工具；同名工具已存在时保留先注册的并返回 false
    pub fn register(&self, tool: Arc<dyn Tool>) -> bool {
        let name = tool.name().to_string();
        let mut tools = self.tools.write().unwrap_or_else(|e| e.into_inner());
        if tools.contains_key(&name) {
            tracing::debug!(tool = %name, "tool already registered, keeping first");
            return false;
        }
        tools.insert(name, tool);
        true
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
    }

    /// 调用工具：未注册返回 NotFound；工具自身的错误归一化为失败的 ToolResult
    pub async fn call(
        &self,
        name: &str,
        args: Value,
        ctx: &ToolCallContext,
    ) -> Result<ToolResult, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        let result = match tool.execute(args, ctx).await {
            Ok(data) => ToolResult::ok(data),
            Err(e) => ToolResult::failure(e),
        };
        Ok(result
            .with_metadata("tool", name)
            .with_metadata("caller_agent", ctx.caller_agent.as_str())
            .with_metadata("correlation_id", ctx.correlation_id.as_str()))
    }

    /// 已注册工具名（排序后）
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tools
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// 全部工具描述符（按名称排序）
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        let tools = self.tools.read().unwrap_or_else(|e| e.into_inner());
        let mut descriptors: Vec<ToolDescriptor> =
            tools.values().map(|t| ToolDescriptor::of(t.as_ref())).collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }

    /// 指定名称的描述符，未注册的名字跳过
    pub fn descriptors_for(&self, names: &[&str]) -> Vec<ToolDescriptor> {
        names
            .iter()
            .filter_map(|n| self.get(n))
            .map(|t| ToolDescriptor::of(t.as_ref()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Upper;

    #[async_trait]
    impl Tool for Upper {
        fn name(&self) -> &str {
            "text.upper"
        }
        fn description(&self) -> &str {
            "Uppercase a string"
        }
        async fn execute(&self, args: Value, _ctx: &ToolCallContext) -> Result<Value, String> {
            let text = args
                .get("text")
                .and_then(|v| v.as_str())
                .ok_or("text is required")?;
            Ok(json!({ "text": text.to_uppercase() }))
        }
    }

    #[tokio::test]
    async fn test_call_success_and_failure_normalized() {
        let registry = ToolRegistry::new();
        assert!(registry.register(Arc::new(Upper)));
        let ctx = ToolCallContext::new("corr-1", "tester");

        let ok = registry.call("text.upper", json!({"text": "abc"}), &ctx).await.unwrap();
        assert!(ok.success);
        assert_eq!(ok.data.unwrap()["text"], "ABC");
        assert_eq!(ok.metadata["caller_agent"], "tester");

        let failed = registry.call("text.upper", json!({}), &ctx).await.unwrap();
        assert!(!failed.success);
        assert_eq!(failed.error.as_deref(), Some("text is required"));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_not_found() {
        let registry = ToolRegistry::new();
        let err = registry
            .call("missing", json!({}), &ToolCallContext::default())
            .await
            .unwrap_err();
        assert_eq!(err, ToolError::NotFound("missing".into()));
        assert_eq!(err.to_string(), "Tool not found: missing");
    }

    #[test]
    fn test_duplicate_registration_keeps_first() {
        let registry = ToolRegistry::new();
        assert!(registry.register(Arc::new(Upper)));
        assert!(!registry.register(Arc::new(Upper)));
        assert_eq!(registry.tool_names(), vec!["text.upper".to_string()]);
        assert_eq!(registry.descriptors_for(&["text.upper", "nope"]).len(), 1);
    }
}
