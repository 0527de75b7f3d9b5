//! 智能体访问工具与 LLM 的唯一通道
//!
//! execute_tool 永不失败（失败归一化为 ToolResult）；generate_response 的错误直接向上传播。

use std::sync::Arc;

use serde_json::Value;

use crate::agents::base::AgentContext;
use crate::core::AgentError;
use crate::llm::{LlmClient, LlmResponse};
use crate::tools::{ToolCallContext, ToolDescriptor, ToolExecutor, ToolResult};

#[derive(Clone)]
pub struct AgentToolkit {
    executor: Arc<ToolExecutor>,
    llm: Arc<dyn LlmClient>,
}

impl AgentToolkit {
    pub fn new(executor: Arc<ToolExecutor>, llm: Arc<dyn LlmClient>) -> Self {
        Self { executor, llm }
    }

    pub fn executor(&self) -> &Arc<ToolExecutor> {
        &self.executor
    }

    pub fn llm(&self) -> &Arc<dyn LlmClient> {
        &self.llm
    }

    pub async fn execute_tool(
        &self,
        ctx: &mut AgentContext,
        caller: &str,
        tool_name: &str,
        args: Value,
    ) -> ToolResult {
        tracing::debug!(agent = %caller, tool = %tool_name, args = %args, "tool request");
        ctx.record_tool_call(tool_name);
        let call_ctx = ToolCallContext::new(ctx.correlation_id.clone(), caller);
        let result = self.executor.execute(tool_name, args, &call_ctx).await;
        if result.success {
            tracing::debug!(agent = %caller, tool = %tool_name, "tool ok");
        } else {
            tracing::debug!(
                agent = %caller,
                tool = %tool_name,
                error = result.error.as_deref().unwrap_or(""),
                "tool failed"
            );
        }
        result
    }

    /// 失败即 ToolFailure；成功返回 data
    pub async fn require_tool(
        &self,
        ctx: &mut AgentContext,
        caller: &str,
        tool_name: &str,
        args: Value,
    ) -> Result<Value, AgentError> {
        let result = self.execute_tool(ctx, caller, tool_name, args).await;
        if result.success {
            Ok(result.data.unwrap_or(Value::Null))
        } else {
            Err(AgentError::ToolFailure {
                tool: tool_name.to_string(),
                message: result.error.unwrap_or_else(|| "unknown error".to_string()),
            })
        }
    }

    pub async fn generate_response(
        &self,
        ctx: &AgentContext,
        caller: &str,
        system_prompt: &str,
        user_prompt: &str,
        tools: &[ToolDescriptor],
    ) -> Result<LlmResponse, AgentError> {
        tracing::debug!(
            agent = %caller,
            correlation_id = %ctx.correlation_id,
            tools = tools.len(),
            "llm request"
        );
        self.llm
            .generate(system_prompt, user_prompt, tools)
            .await
            .map_err(|e| AgentError::Llm(e.to_string()))
    }

    pub fn descriptors_for(&self, names: &[&str]) -> Vec<ToolDescriptor> {
        self.executor.registry().descriptors_for(names)
    }
}
