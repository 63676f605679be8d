//! 智能体层：推理步骤抽象与四个具体智能体
//!
//! 每个智能体是 (数据上下文, 上游成功负载) -> 结构化负载 的纯推理步骤，
//! 经推理后端执行；依赖集静态声明，由编排器强制执行。业务数据层面的
//! 「没有结果」不是错误，必须表达为有效的低置信负载，避免毒化依赖图。

pub mod analyst;
pub mod prompt;
pub mod reporter;
pub mod strategy;
pub mod summarizer;

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::backend::BackendError;
use crate::data::DatasetContext;
use crate::pipeline::{AgentName, AgentPayload};

pub use analyst::DataAnalyst;
pub use reporter::EmailReporter;
pub use strategy::BusinessStrategy;
pub use summarizer::Summarizer;

/// 固定的智能体名（RunState 键）
pub const DATA_ANALYST: &str = "data_analyst";
pub const SUMMARIZER: &str = "summarizer";
pub const BUSINESS_STRATEGY: &str = "business_strategy";
pub const EMAIL_REPORTER: &str = "email_reporter";

/// 上游成功结果的负载，键为智能体名；编排器只放入 Succeeded 的条目
pub type AgentInputs = BTreeMap<AgentName, AgentPayload>;

/// 智能体执行错误
#[derive(Error, Debug)]
pub enum AgentError {
    /// 后端失败（Unavailable 已在适配层重试耗尽 / Refused）
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// 后端文本无法整形为该智能体的负载形状，不重试，降级为 Failed
    #[error("Malformed backend result: {0}")]
    Malformed(String),

    /// 编排器契约被破坏：声明的依赖不在输入中（直接调用 run 时才可能出现）
    #[error("Missing declared input: {0}")]
    MissingInput(String),
}

/// 一个推理步骤：名字 + 静态依赖声明 + run
///
/// run 不得修改 ctx 与 inputs（签名即只读借用）。
#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &'static str;

    /// 声明依赖的智能体名；编排器据此排序并强制执行
    fn dependencies(&self) -> &'static [&'static str];

    async fn run(
        &self,
        ctx: &DatasetContext,
        inputs: &AgentInputs,
    ) -> Result<AgentPayload, AgentError>;
}

/// 将后端自由文本整形为条目列表：取非空行，剥掉行首的 -、*、•、"1." 等列表标记
pub(crate) fn parse_list_items(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| {
            let line = line.trim();
            let line = line
                .trim_start_matches(['-', '*', '•'])
                .trim_start();
            // "1." / "2)" 之类的编号前缀
            let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
            if digits > 0 && digits <= 2 {
                let rest = &line[digits..];
                if let Some(stripped) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
                    return stripped.trim().to_string();
                }
            }
            line.to_string()
        })
        .filter(|line| !line.is_empty())
        .collect()
}

/// 从 inputs 取出声明依赖的负载文本；缺失即契约错误
pub(crate) fn require_input<'a>(
    inputs: &'a AgentInputs,
    name: &str,
) -> Result<&'a AgentPayload, AgentError> {
    inputs
        .get(name)
        .ok_or_else(|| AgentError::MissingInput(name.to_string()))
}
