//! 工具执行器
//!
//! 持有 ToolRegistry 与统一超时；execute 永远返回 ToolResult：
//! 未注册、工具报错、超时、panic 都转为 success=false，并输出一条结构化审计日志（JSON）。

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::time::timeout;

use crate::tools::{Tool, ToolCallContext, ToolRegistry, ToolResult};

/// 工具执行器：对每次调用施加超时并归一化结果
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    timeout: Duration,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>, timeout_secs: u64) -> Self {
        Self {
            registry,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// 执行指定工具；任何失败都以 "Error executing tool {name}: ..." 形式写入 error
    pub async fn execute(&self, tool_name: &str, args: Value, ctx: &ToolCallContext) -> ToolResult {
        let start = Instant::now();
        let args_preview = args_preview(&args);

        let (result, outcome) = match self.registry.get(tool_name) {
            None => (
                ToolResult::failure(format!(
                    "Error executing tool {tool_name}: Tool not found: {tool_name}"
                )),
                "not_found",
            ),
            Some(tool) => self.run_guarded(tool, tool_name, args, ctx).await,
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": tool_name,
            "agent": ctx.caller_agent,
            "correlation_id": ctx.correlation_id,
            "ok": result.success,
            "outcome": outcome,
            "duration_ms": duration_ms,
            "args_preview": args_preview,
        });
        tracing::info!(audit = %audit.to_string(), "tool");

        result
            .with_metadata("tool", tool_name)
            .with_metadata("caller_agent", ctx.caller_agent.as_str())
            .with_metadata("correlation_id", ctx.correlation_id.as_str())
            .with_metadata("duration_ms", duration_ms)
    }

    /// 在独立任务中执行，超时与 panic 都不会越过这里
    async fn run_guarded(
        &self,
        tool: Arc<dyn Tool>,
        tool_name: &str,
        args: Value,
        ctx: &ToolCallContext,
    ) -> (ToolResult, &'static str) {
        let owned_ctx = ctx.clone();
        let mut handle = tokio::spawn(async move { tool.execute(args, &owned_ctx).await });

        match timeout(self.timeout, &mut handle).await {
            Ok(Ok(Ok(data))) => (ToolResult::ok(data), "ok"),
            Ok(Ok(Err(e))) => (
                ToolResult::failure(format!("Error executing tool {tool_name}: {e}")),
                "error",
            ),
            Ok(Err(join_error)) => {
                tracing::error!(tool = %tool_name, "tool task panicked: {join_error}");
                (
                    ToolResult::failure(format!(
                        "Error executing tool {tool_name}: tool panicked"
                    )),
                    "panic",
                )
            }
            Err(_) => {
                handle.abort();
                (
                    ToolResult::failure(format!(
                        "Error executing tool {tool_name}: timed out after {}s",
                        self.timeout.as_secs()
                    )),
                    "timeout",
                )
            }
        }
    }
}

fn args_preview(args: &Value) -> String {
    let s = args.to_string();
    if s.len() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    struct Failing;

    #[async_trait]
    impl Tool for Failing {
        fn name(&self) -> &str {
            "test.failing"
        }
        fn description(&self) -> &str {
            "Always fails"
        }
        async fn execute(&self, _args: Value, _ctx: &ToolCallContext) -> Result<Value, String> {
            Err("upstream unavailable".to_string())
        }
    }

    struct Panicking;

    #[async_trait]
    impl Tool for Panicking {
        fn name(&self) -> &str {
            "test.panicking"
        }
        fn description(&self) -> &str {
            "Panics"
        }
        async fn execute(&self, _args: Value, _ctx: &ToolCallContext) -> Result<Value, String> {
            panic!("boom");
        }
    }

    struct Slow;

    #[async_trait]
    impl Tool for Slow {
        fn name(&self) -> &str {
            "test.slow"
        }
        fn description(&self) -> &str {
            "Sleeps"
        }
        async fn execute(&self, _args: Value, _ctx: &ToolCallContext) -> Result<Value, String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(json!({}))
        }
    }

    fn executor(timeout_secs: u64) -> ToolExecutor {
        let registry = Arc::new(ToolRegistry::new());
        registry.register(Arc::new(Failing));
        registry.register(Arc::new(Panicking));
        registry.register(Arc::new(Slow));
        ToolExecutor::new(registry, timeout_secs)
    }

    #[tokio::test]
    async fn test_error_is_normalized() {
        let ctx = ToolCallContext::new("c1", "tester");
        let result = executor(5).execute("test.failing", json!({}), &ctx).await;
        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("Error executing tool test.failing: upstream unavailable")
        );
        assert_eq!(result.metadata["tool"], "test.failing");
    }

    #[tokio::test]
    async fn test_panic_is_normalized() {
        let ctx = ToolCallContext::new("c1", "tester");
        let result = executor(5).execute("test.panicking", json!({}), &ctx).await;
        assert!(!result.success);
        assert!(!result.error.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_tool_is_normalized() {
        let ctx = ToolCallContext::new("c1", "tester");
        let result = executor(5).execute("nope", json!({}), &ctx).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("Tool not found: nope"));
    }

    #[tokio::test]
    async fn test_timeout_is_normalized() {
        let ctx = ToolCallContext::new("c1", "tester");
        let result = executor(1).execute("test.slow", json!({}), &ctx).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("timed out"));
    }
}
