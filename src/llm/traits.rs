//! LLM 客户端抽象
//!
//! 后端只需实现 complete（消息列表 → 文本）；generate 在其上组装工具说明并把输出解析为
//! 工具调用或最终回答。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::memory::Message;
use crate::tools::ToolDescriptor;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    #[error("LLM request failed: {0}")]
    Request(String),

    #[error("LLM output could not be parsed: {0}")]
    Parse(String),
}

/// generate 的结果：工具调用或直接回答
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LlmResponse {
    ToolCall { tool_name: String, tool_args: Value },
    FinalAnswer { content: String },
}

/// 模型输出的简化工具调用格式：{"tool": "...", "args": {...}}
#[derive(Debug, Deserialize)]
struct RawToolCall {
    #[serde(default)]
    tool: String,
    #[serde(default)]
    args: Value,
}

/// 解析 LLM 输出：含 JSON 且 tool 非空为工具调用，否则为最终回答
pub fn parse_llm_output(output: &str, offered: &[ToolDescriptor]) -> Result<LlmResponse, LlmError> {
    let trimmed = output.trim();

    let json_str = if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        rest.find("```")
            .map(|end| rest[..end].trim())
            .unwrap_or(rest.trim())
    } else if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            &trimmed[start..=end]
        } else {
            return Ok(LlmResponse::FinalAnswer {
                content: trimmed.to_string(),
            });
        }
    } else {
        return Ok(LlmResponse::FinalAnswer {
            content: trimmed.to_string(),
        });
    };

    let parsed: RawToolCall = serde_json::from_str(json_str)
        .map_err(|e| LlmError::Parse(format!("{e}: {json_str}")))?;

    if parsed.tool.is_empty() {
        return Ok(LlmResponse::FinalAnswer {
            content: trimmed.to_string(),
        });
    }
    if !offered.iter().any(|t| t.name == parsed.tool) {
        return Err(LlmError::Parse(format!("unknown tool requested: {}", parsed.tool)));
    }
    Ok(LlmResponse::ToolCall {
        tool_name: parsed.tool,
        tool_args: if parsed.args.is_null() {
            Value::Object(Default::default())
        } else {
            parsed.args
        },
    })
}

/// 把工具描述拼进 system prompt
fn compose_system_prompt(system: &str, tools: &[ToolDescriptor]) -> String {
    if tools.is_empty() {
        return system.to_string();
    }
    let schema = serde_json::to_string_pretty(tools).unwrap_or_default();
    format!(
        "{system}\n\n## Available tools\n{schema}\n\n\
         To call a tool, reply with only JSON: {{\"tool\": \"<name>\", \"args\": {{...}}}}. \
         Otherwise reply in plain text."
    )
}

/// LLM 客户端 trait
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 非流式完成
    async fn complete(&self, messages: &[Message]) -> Result<String, String>;

    /// 累计 token 使用：(prompt_tokens, completion_tokens, total_tokens)
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }

    /// system/user prompt + 可用工具 → 工具调用或最终回答
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        tools: &[ToolDescriptor],
    ) -> Result<LlmResponse, LlmError> {
        let messages = vec![
            Message::system(compose_system_prompt(system_prompt, tools)),
            Message::user(user_prompt),
        ];
        let output = self.complete(&messages).await.map_err(LlmError::Request)?;
        parse_llm_output(&output, tools)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn offered() -> Vec<ToolDescriptor> {
        vec![ToolDescriptor {
            name: "extract_trip_request".into(),
            description: "Extract".into(),
            parameters: json!({}),
        }]
    }

    #[test]
    fn test_plain_text_is_final_answer() {
        let out = parse_llm_output("Sure, where to?", &offered()).unwrap();
        assert_eq!(
            out,
            LlmResponse::FinalAnswer {
                content: "Sure, where to?".into()
            }
        );
    }

    #[test]
    fn test_fenced_json_is_tool_call() {
        let text = "```json\n{\"tool\": \"extract_trip_request\", \"args\": {\"destination\": \"Rome\"}}\n```";
        match parse_llm_output(text, &offered()).unwrap() {
            LlmResponse::ToolCall { tool_name, tool_args } => {
                assert_eq!(tool_name, "extract_trip_request");
                assert_eq!(tool_args["destination"], "Rome");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_unoffered_tool_is_parse_error() {
        let err = parse_llm_output(r#"{"tool": "rm", "args": {}}"#, &offered()).unwrap_err();
        assert!(matches!(err, LlmError::Parse(_)));
    }

    #[test]
    fn test_response_serializes_with_type_tag() {
        let value = serde_json::to_value(LlmResponse::FinalAnswer {
            content: "hi".into(),
        })
        .unwrap();
        assert_eq!(value, json!({"type": "final_answer", "content": "hi"}));
    }
}
