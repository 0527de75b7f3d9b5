//! Trip Planner - 多智能体行程规划助手
//!
//! 模块划分：
//! - **agents**: 智能体契约与五个智能体（planner、location、stay、route、budget）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误分类、规划阶段、结果合并、编排主循环
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock）
//! - **memory**: 会话存储与 LLM 消息
//! - **models**: 行程请求与行程计划
//! - **observability**: tracing 初始化
//! - **tools**: 模拟外部服务的工具与执行器
//! - **server**: HTTP 接口（feature `web`）

pub mod agents;
pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod models;
pub mod observability;
#[cfg(feature = "web")]
pub mod server;
pub mod tools;

pub use crate::core::{TripOrchestrator, TurnRequest, TurnResponse};
