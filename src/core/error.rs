//! 错误类型
//!
//! - AgentError：智能体内部（处理器、工具、LLM）产生的错误；在智能体边界被转成带 error 标记的消息，不会向外传播。
//! - TripError：编排器自身的错误（未知目标智能体、结果合并失败等），导致整轮失败并返回通用错误载荷。

use thiserror::Error;

/// 智能体处理器内部错误
#[derive(Error, Debug)]
pub enum AgentError {
    /// 参数缺失或格式不对
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Tool {tool} failed: {message}")]
    ToolFailure { tool: String, message: String },

    #[error("Unknown action '{action}' for agent {agent}")]
    UnknownAction { agent: String, action: String },

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AgentError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// 写入错误消息 metadata.error_type 的稳定名称
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "ValidationError",
            Self::ToolFailure { .. } => "ToolFailure",
            Self::UnknownAction { .. } => "UnknownAction",
            Self::Llm(_) => "LlmError",
            Self::NotFound(_) => "NotFound",
            Self::Internal(_) => "InternalError",
        }
    }
}

/// 编排器（回合级）错误
#[derive(Error, Debug)]
pub enum TripError {
    #[error("Invalid target agent: {0}")]
    UnknownTargetAgent(String),

    #[error("Failed to merge {agent} result: {message}")]
    Merge { agent: String, message: String },

    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TripError {
    pub fn merge(agent: &str, message: impl Into<String>) -> Self {
        Self::Merge {
            agent: agent.to_string(),
            message: message.into(),
        }
    }
}
