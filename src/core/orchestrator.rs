//! 行程编排器：主控循环
//!
//! 每个用户消息是一个回合：反复询问 Planner 下一步 → 分派给目标智能体 → 把结果合并进计划，
//! 直到 Planner 返回 finish 或步数耗尽。同一会话的回合由会话锁串行化。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::agents::planner::CONTINUE_INSTRUCTION;
use crate::agents::{AgentCard, AgentContext, AgentDirectory, AgentMessage, AgentToolkit, PLANNER};
use crate::config::{AppConfig, OrchestratorSection};
use crate::core::merge::fold_step_result;
use crate::core::state::PlanState;
use crate::core::TripError;
use crate::llm::{LlmClient, MockLlmClient, OpenAiClient};
use crate::memory::{Conversation, ConversationHistory, ConversationStore, TurnRecord};
use crate::tools::{ToolExecutor, ToolRegistry};

const ORCHESTRATOR: &str = "orchestrator";
const PLAN_STATE_KEY: &str = "trip_plan";

pub const MAX_STEPS_MESSAGE: &str = "Max steps reached without completion.";
pub const TURN_ERROR_MESSAGE: &str = "An error occurred while processing your request.";

/// 根据配置选择 LLM 后端（OpenAI 兼容 / Mock）
pub(crate) fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    let provider = cfg.llm.provider.to_lowercase();
    let api_key = std::env::var("OPENAI_API_KEY").ok();

    match (provider.as_str(), api_key) {
        ("openai", Some(key)) => {
            tracing::info!("Using OpenAI-compatible LLM ({})", cfg.llm.model);
            Arc::new(OpenAiClient::new(
                cfg.llm.base_url.as_deref(),
                &cfg.llm.model,
                Some(&key),
                cfg.llm.timeouts.request,
            ))
        }
        ("openai", None) => {
            tracing::warn!("provider = openai but OPENAI_API_KEY is not set, using Mock LLM");
            Arc::new(MockLlmClient::new())
        }
        _ => {
            tracing::info!("Using Mock LLM");
            Arc::new(MockLlmClient::new())
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub max_steps: usize,
    pub history_limit: usize,
    pub max_history_records: usize,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from(&OrchestratorSection::default())
    }
}

impl From<&OrchestratorSection> for OrchestratorSettings {
    fn from(section: &OrchestratorSection) -> Self {
        Self {
            max_steps: section.max_steps.max(1),
            history_limit: section.history_limit,
            max_history_records: section.max_history_records,
        }
    }
}

/// 一个回合的输入
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TurnRequest {
    /// 纯文本或结构化内容
    pub message: Value,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub context: Option<Map<String, Value>>,
}

impl TurnRequest {
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            message: Value::String(message.into()),
            ..Default::default()
        }
    }

    pub fn in_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnMetadata {
    pub conversation_id: String,
    pub steps: usize,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub error: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnResponse {
    pub response: Value,
    pub metadata: TurnMetadata,
}

impl TurnResponse {
    pub fn conversation_id(&self) -> &str {
        &self.metadata.conversation_id
    }
}

pub struct TripOrchestrator {
    agents: AgentDirectory,
    conversations: ConversationStore,
    settings: OrchestratorSettings,
}

impl TripOrchestrator {
    pub fn new(agents: AgentDirectory, settings: OrchestratorSettings) -> Self {
        Self {
            conversations: ConversationStore::new(settings.max_history_records),
            agents,
            settings,
        }
    }

    /// 按配置装配：工具注册表、执行器、LLM、五个智能体
    pub fn from_config(cfg: &AppConfig) -> Self {
        let llm = create_llm_from_config(cfg);
        Self::with_llm(cfg, llm)
    }

    pub fn with_llm(cfg: &AppConfig, llm: Arc<dyn LlmClient>) -> Self {
        let registry = Arc::new(ToolRegistry::new());
        let executor = Arc::new(ToolExecutor::new(registry, cfg.tools.tool_timeout_secs));
        let agents = AgentDirectory::standard(AgentToolkit::new(executor, llm));
        Self::new(agents, OrchestratorSettings::from(&cfg.orchestrator))
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    pub fn agent_cards(&self) -> Vec<AgentCard> {
        self.agents.cards()
    }

    /// 处理一条用户消息；任何失败都体现在返回的载荷里
    pub async fn process_message(&self, request: TurnRequest) -> TurnResponse {
        let (conversation_id, handle) = self
            .conversations
            .open(request.conversation_id.as_deref(), request.user_id.as_deref())
            .await;
        let mut conversation = handle.lock().await;

        if conversation.user_id.is_none() {
            conversation.user_id = request.user_id.clone();
        }
        if let Some(extra) = &request.context {
            for (k, v) in extra {
                conversation.context.insert(k.clone(), v.clone());
            }
        }

        let correlation_id = format!("{conversation_id}_{}", conversation.history().len());
        conversation.push(TurnRecord::user(request.message.clone()));

        let mut ctx = AgentContext::new(
            conversation_id.clone(),
            conversation.user_id.clone(),
            correlation_id.clone(),
        );
        ctx.context = conversation.context.clone();
        ctx.state = conversation.state.clone();
        ctx.plan = restore_plan(&conversation);

        tracing::info!(
            conversation_id = %conversation_id,
            correlation_id = %correlation_id,
            "turn started"
        );

        let outcome = self
            .run_steps(request.message, &mut ctx, &mut conversation)
            .await;

        conversation.context = std::mem::take(&mut ctx.context);
        conversation.state = std::mem::take(&mut ctx.state);
        if let Some(plan) = &ctx.plan {
            match serde_json::to_value(plan) {
                Ok(value) => {
                    conversation.state.insert(PLAN_STATE_KEY.to_string(), value);
                }
                Err(e) => tracing::warn!(conversation_id = %conversation_id, "trip plan not saved: {e}"),
            }
        }

        let (response, steps, error) = match outcome {
            Ok((response, steps)) => (response, steps, false),
            Err(err) => {
                let error_id = uuid::Uuid::new_v4().to_string();
                tracing::error!(
                    conversation_id = %conversation_id,
                    correlation_id = %correlation_id,
                    error_id = %error_id,
                    "turn failed: {err}"
                );
                let response = json!({
                    "status": "error",
                    "message": TURN_ERROR_MESSAGE,
                    "error_id": error_id,
                });
                let steps = ctx.steps.iter().filter(|s| s.agent == PLANNER).count();
                (response, steps, true)
            }
        };

        conversation.push(TurnRecord::assistant(
            response.clone(),
            ORCHESTRATOR,
            response.get("action").and_then(Value::as_str),
            steps,
        ));
        tracing::info!(
            conversation_id = %conversation_id,
            steps,
            error,
            "turn finished"
        );

        TurnResponse {
            response,
            metadata: TurnMetadata {
                conversation_id,
                steps,
                timestamp: Utc::now(),
                phase: ctx.plan.as_ref().map(|p| p.phase.as_str().to_string()),
                error,
            },
        }
    }

    /// 步骤循环：返回 (最终内容, 已执行步数)
    async fn run_steps(
        &self,
        message: Value,
        ctx: &mut AgentContext,
        conversation: &mut Conversation,
    ) -> Result<(Value, usize), TripError> {
        let planner = self
            .agents
            .planner()
            .ok_or_else(|| TripError::Internal("planner agent is not registered".to_string()))?;

        let mut planner_input = message;
        for step in 1..=self.settings.max_steps {
            let directive = planner
                .process(
                    AgentMessage::new(ORCHESTRATOR, PLANNER, planner_input),
                    ctx,
                )
                .await;
            ctx.apply_context_updates(&directive.context_updates);

            let target = directive.target_agent().map(String::from);
            let action = directive.action().map(String::from);
            let (target, action) = match (target, action) {
                (Some(target), Some(action)) if !directive.is_error() && action != "finish" => {
                    (target, action)
                }
                _ => return Ok((directive.content, step)),
            };

            let agent = self
                .agents
                .get(&target)
                .ok_or_else(|| TripError::UnknownTargetAgent(target.clone()))?;
            tracing::debug!(step, agent = %target, action = %action, "dispatching");

            let request = AgentMessage::new(
                PLANNER,
                target.as_str(),
                json!({ "action": action, "parameters": directive.parameters() }),
            );
            let result = agent.process(request, ctx).await;
            ctx.apply_context_updates(&result.context_updates);

            if !result.is_error() {
                if let Some(state) = ctx.plan.as_mut() {
                    fold_step_result(state, &target, &action, &result.content)?;
                }
            }
            conversation.push(TurnRecord::assistant(
                result.content.clone(),
                &target,
                Some(&action),
                step,
            ));

            planner_input = json!({
                "instruction": CONTINUE_INSTRUCTION,
                "last_agent": target,
                "last_step_result": result.content,
            });
        }

        tracing::warn!(
            correlation_id = %ctx.correlation_id,
            max_steps = self.settings.max_steps,
            "max steps reached without completion"
        );
        Ok((
            json!({ "status": "error", "message": MAX_STEPS_MESSAGE }),
            self.settings.max_steps,
        ))
    }

    /// 分页读取会话历史；limit 缺省取配置值
    pub async fn get_history(
        &self,
        conversation_id: &str,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<ConversationHistory, TripError> {
        self.conversations
            .history(
                conversation_id,
                limit.unwrap_or(self.settings.history_limit),
                offset.unwrap_or(0),
            )
            .await
    }

    pub async fn end_conversation(&self, conversation_id: &str) -> bool {
        self.conversations.end(conversation_id).await
    }

    pub async fn conversation_count(&self) -> usize {
        self.conversations.len().await
    }
}

fn restore_plan(conversation: &Conversation) -> Option<PlanState> {
    let value = conversation.state.get(PLAN_STATE_KEY)?;
    match serde_json::from_value(value.clone()) {
        Ok(state) => Some(state),
        Err(e) => {
            tracing::warn!(conversation_id = %conversation.id, "stored trip plan ignored: {e}");
            None
        }
    }
}
