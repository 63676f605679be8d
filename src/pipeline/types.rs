//! 流水线类型定义
//!
//! 智能体结果（kind 标签负载 + 状态）、一次运行的累积状态 RunState、流水线错误。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::{PeriodStat, ProductStat};

/// 智能体名（RunState 的唯一键）
pub type AgentName = String;

/// 智能体结果状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AgentStatus {
    /// 成功，payload 可用
    Succeeded,
    /// 执行失败（后端拒绝 / 重试耗尽 / 结果不可解析）
    Failed { reason: String },
    /// 未执行（上游失败或运行被取消），带原因
    Skipped { reason: String },
}

/// kind 标签的结构化负载
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AgentPayload {
    /// 数字表 + 叙述（Data Analyst）；ranking/trend 可直接交给制图协作者
    NumericTable {
        ranking: Vec<ProductStat>,
        trend: Vec<PeriodStat>,
        narrative: String,
    },
    /// 要点列表（Summarizer）
    Bullets(Vec<String>),
    /// 策略清单（Business Strategy）
    Strategies(Vec<String>),
    /// 成文报告（Email Reporter）
    Report { subject: String, body: String },
    /// 自由文本
    Text(String),
}

impl AgentPayload {
    /// 负载的纯文本视图，供下游 Prompt 与报告拼装使用
    pub fn as_text(&self) -> String {
        match self {
            AgentPayload::NumericTable { narrative, .. } => narrative.clone(),
            AgentPayload::Bullets(items) | AgentPayload::Strategies(items) => items
                .iter()
                .map(|s| format!("- {}", s))
                .collect::<Vec<_>>()
                .join("\n"),
            AgentPayload::Report { subject, body } => format!("{}\n\n{}", subject, body),
            AgentPayload::Text(text) => text.clone(),
        }
    }
}

/// 一个智能体的最终结果：状态 + 负载 + 耗时
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResult {
    pub agent: AgentName,
    pub status: AgentStatus,
    /// 仅 Succeeded 时存在
    pub payload: Option<AgentPayload>,
    pub elapsed_ms: u64,
}

impl AgentResult {
    pub fn succeeded(agent: impl Into<AgentName>, payload: AgentPayload, elapsed_ms: u64) -> Self {
        Self {
            agent: agent.into(),
            status: AgentStatus::Succeeded,
            payload: Some(payload),
            elapsed_ms,
        }
    }

    pub fn failed(agent: impl Into<AgentName>, reason: impl Into<String>, elapsed_ms: u64) -> Self {
        Self {
            agent: agent.into(),
            status: AgentStatus::Failed {
                reason: reason.into(),
            },
            payload: None,
            elapsed_ms,
        }
    }

    pub fn skipped(agent: impl Into<AgentName>, reason: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            status: AgentStatus::Skipped {
                reason: reason.into(),
            },
            payload: None,
            elapsed_ms: 0,
        }
    }

    pub fn is_succeeded(&self) -> bool {
        matches!(self.status, AgentStatus::Succeeded)
    }
}

/// 一次流水线运行的累积状态：智能体名 -> 结果，只增不改
///
/// 运行期间编排器是唯一写者；运行结束后整体移交给问答路由与报告拼装器只读消费。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    pub run_id: String,
    pub started_at: i64,
    pub finished_at: Option<i64>,
    results: BTreeMap<AgentName, AgentResult>,
}

impl RunState {
    pub fn new() -> Self {
        Self {
            run_id: format!("run_{}", uuid::Uuid::new_v4()),
            started_at: chrono::Utc::now().timestamp_millis(),
            finished_at: None,
            results: BTreeMap::new(),
        }
    }

    /// 记录一个结果；每个智能体恰好写入一次
    pub(crate) fn record(&mut self, result: AgentResult) {
        debug_assert!(!self.results.contains_key(&result.agent));
        self.results.insert(result.agent.clone(), result);
    }

    pub(crate) fn finish(&mut self) {
        self.finished_at = Some(chrono::Utc::now().timestamp_millis());
    }

    pub fn get(&self, agent: &str) -> Option<&AgentResult> {
        self.results.get(agent)
    }

    /// 仅当该智能体成功时返回其负载
    pub fn succeeded_payload(&self, agent: &str) -> Option<&AgentPayload> {
        self.results
            .get(agent)
            .filter(|r| r.is_succeeded())
            .and_then(|r| r.payload.as_ref())
    }

    pub fn results(&self) -> impl Iterator<Item = &AgentResult> {
        self.results.values()
    }

    pub fn succeeded_count(&self) -> usize {
        self.results.values().filter(|r| r.is_succeeded()).count()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

/// 流水线配置错误：图非法（未知依赖 / 重名 / 环），在任何智能体运行前检出
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid pipeline graph: {0}")]
    InvalidGraph(String),
}
