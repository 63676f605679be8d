//! 推理后端抽象
//!
//! 所有后端（OpenAI 兼容 / Mock）实现 ReasoningBackend：complete 接收指令与上下文，返回原始文本。
//! 远端协议细节（鉴权、消息格式）对流水线完全不透明。

use async_trait::async_trait;
use thiserror::Error;

/// 单次补全请求：指令 + 上下文 + 输出上限
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// 本次推理步骤的任务指令（"As a Data Analyst Agent..."）
    pub instruction: String,
    /// 数据上下文与上游结果拼成的有界文本
    pub context: String,
    /// 输出字符数上限：远端折算为补全 token 上限，Mock 直接截断
    pub max_output_chars: usize,
}

impl CompletionRequest {
    pub fn new(instruction: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            context: context.into(),
            max_output_chars: 4000,
        }
    }

    /// 请求总字符数（用于本地超限拒绝）
    pub fn total_chars(&self) -> usize {
        self.instruction.len() + self.context.len()
    }
}

/// 补全响应：原始文本
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub text: String,
}

/// 后端调用错误
#[derive(Error, Debug, Clone)]
pub enum BackendError {
    /// 瞬态错误（网络、超时、限流），可重试
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// 永久拒绝（请求格式错误、超限），不重试
    #[error("Backend refused request: {0}")]
    Refused(String),
}

impl BackendError {
    /// 是否可重试（仅瞬态错误）
    pub fn is_transient(&self) -> bool {
        matches!(self, BackendError::Unavailable(_))
    }
}

/// 推理后端 trait：一次指令 + 上下文 -> 原始文本
#[async_trait]
pub trait ReasoningBackend: Send + Sync {
    async fn complete(&self, req: &CompletionRequest) -> Result<CompletionResponse, BackendError>;
}
