//! 核心编排层：错误分类、规划阶段、结果合并、主控循环

pub mod error;
pub mod merge;
pub mod orchestrator;
pub mod state;

pub use error::{AgentError, TripError};
pub use merge::fold_step_result;
pub use orchestrator::{
    OrchestratorSettings, TripOrchestrator, TurnMetadata, TurnRequest, TurnResponse,
    MAX_STEPS_MESSAGE, TURN_ERROR_MESSAGE,
};
pub use state::{Phase, PlanState};
