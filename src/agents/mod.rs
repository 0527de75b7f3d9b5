//! 智能体层：统一接口、工具通道与五个具体智能体
//!
//! - **planner**: 解析行程请求，按阶段瀑布给出下一步
//! - **location**: 景点推荐
//! - **stay**: 酒店搜索与预订
//! - **route**: 行程排序与交通
//! - **budget**: 费用估算与预算检查

pub mod base;
pub mod budget;
pub mod location;
pub mod planner;
pub mod route;
pub mod stay;
pub mod toolkit;

use std::collections::HashMap;
use std::sync::Arc;

pub use base::{Agent, AgentCard, AgentContext, AgentMessage, AgentReply, AgentStep};
pub use budget::BudgetAgent;
pub use location::LocationAgent;
pub use planner::PlannerAgent;
pub use route::RouteAgent;
pub use stay::StayAgent;
pub use toolkit::AgentToolkit;

pub const PLANNER: &str = "planner";

/// 名称 → 智能体；由装配代码显式构造后交给编排器
#[derive(Clone, Default)]
pub struct AgentDirectory {
    agents: HashMap<String, Arc<dyn Agent>>,
}

impl AgentDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// 五个标准智能体，并把它们声明的工具注册进 toolkit 的 ToolRegistry
    pub fn standard(toolkit: AgentToolkit) -> Self {
        let mut directory = Self::new();
        directory.insert(Arc::new(PlannerAgent::new(toolkit.clone())));
        directory.insert(Arc::new(LocationAgent::new(toolkit.clone())));
        directory.insert(Arc::new(StayAgent::new(toolkit.clone())));
        directory.insert(Arc::new(RouteAgent::new(toolkit.clone())));
        directory.insert(Arc::new(BudgetAgent::new(toolkit.clone())));

        let registry = toolkit.executor().registry();
        for agent in directory.agents.values() {
            for tool in agent.declare_tools() {
                registry.register(tool);
            }
        }
        tracing::info!(
            agents = directory.len(),
            tools = registry.len(),
            "agent directory ready"
        );
        directory
    }

    /// 以 agent.name() 为键；同名覆盖
    pub fn insert(&mut self, agent: Arc<dyn Agent>) {
        self.agents.insert(agent.name().to_string(), agent);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Agent>> {
        self.agents.get(name).cloned()
    }

    pub fn planner(&self) -> Option<Arc<dyn Agent>> {
        self.get(PLANNER)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.agents.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn cards(&self) -> Vec<AgentCard> {
        let mut cards: Vec<AgentCard> = self.agents.values().map(|a| a.card()).collect();
        cards.sort_by(|a, b| a.name.cmp(&b.name));
        cards
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use super::{Agent, AgentToolkit};
    use crate::llm::MockLlmClient;
    use crate::tools::{ToolExecutor, ToolRegistry};

    pub fn test_toolkit() -> AgentToolkit {
        let registry = Arc::new(ToolRegistry::new());
        AgentToolkit::new(
            Arc::new(ToolExecutor::new(registry, 5)),
            Arc::new(MockLlmClient::new()),
        )
    }

    pub fn register_tools(toolkit: &AgentToolkit, agent: &dyn Agent) {
        for tool in agent.declare_tools() {
            toolkit.executor().registry().register(tool);
        }
    }
}
