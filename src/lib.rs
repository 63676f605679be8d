//! Hive - Rust 多智能体销售数据分析系统
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **observability**: 日志初始化
//! - **backend**: 推理后端适配层（OpenAI 兼容 / Mock），重试与超时
//! - **data**: 销售记录、CSV 装载、确定性数据上下文
//! - **agents**: 四个推理智能体与 Prompt 构建
//! - **pipeline**: 依赖图、编排器、RunState
//! - **query**: 针对已完成运行的临时问答路由
//! - **report**: 最终邮件产物拼装（可降级）

pub mod agents;
pub mod backend;
pub mod config;
pub mod data;
pub mod observability;
pub mod pipeline;
pub mod query;
pub mod report;

pub use pipeline::{Orchestrator, RunState};
pub use query::QueryRouter;
pub use report::ReportComposer;
