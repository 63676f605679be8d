//! 流水线层：结果类型、依赖图、编排器

pub mod graph;
pub mod orchestrator;
pub mod types;

pub use graph::PipelineGraph;
pub use orchestrator::{Orchestrator, CANCELLED_REASON};
pub use types::{AgentName, AgentPayload, AgentResult, AgentStatus, PipelineError, RunState};
