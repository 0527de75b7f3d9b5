//! Mock LLM 客户端（用于测试，无需 API）
//!
//! 有预置输出时按顺序弹出；用完后回显最后一条 User 消息（纯文本，即 final_answer）。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::LlmClient;
use crate::memory::{Message, Role};

#[derive(Debug, Default)]
pub struct MockLlmClient {
    scripted: Mutex<VecDeque<String>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 依次返回给定输出
    pub fn scripted<I, S>(outputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            scripted: Mutex::new(outputs.into_iter().map(Into::into).collect()),
        }
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        if let Some(next) = self
            .scripted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
        {
            return Ok(next);
        }
        let last_user = messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, Role::User))
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");
        Ok(format!("Mock response: {last_user}"))
    }
}
