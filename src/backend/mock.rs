//! Mock 推理后端（用于测试，无需 API）
//!
//! 按脚本顺序弹出预设响应，并记录调用次数；脚本耗尽后回显指令首行，便于无网络跑通整条流水线。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::backend::{BackendError, CompletionRequest, CompletionResponse, ReasoningBackend};

/// 脚本化 Mock 后端：规则匹配优先，其次按先进先出消费脚本，记录每次调用
#[derive(Debug, Default)]
pub struct MockBackend {
    scripted: Mutex<Vec<Result<String, BackendError>>>,
    /// (指令包含的子串, 固定响应)；并发波次下可按智能体指令精确定向
    rules: Vec<(String, Result<String, BackendError>)>,
    calls: AtomicUsize,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预设一批响应，按先进先出顺序消费
    pub fn with_script(responses: Vec<Result<String, BackendError>>) -> Self {
        let mut scripted = responses;
        scripted.reverse(); // pop 从尾部取
        Self {
            scripted: Mutex::new(scripted),
            ..Self::default()
        }
    }

    /// 追加持久规则：指令包含 pattern 即返回 response（不消耗）
    pub fn with_rule(mut self, pattern: &str, response: Result<String, BackendError>) -> Self {
        self.rules.push((pattern.to_string(), response));
        self
    }

    /// 累计调用次数
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// 与真实后端一样尊重请求声明的输出上限
    fn clip(text: String, max_chars: usize) -> String {
        if text.chars().count() <= max_chars {
            text
        } else {
            text.chars().take(max_chars).collect()
        }
    }
}

#[async_trait]
impl ReasoningBackend for MockBackend {
    async fn complete(&self, req: &CompletionRequest) -> Result<CompletionResponse, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        for (pattern, response) in &self.rules {
            if req.instruction.contains(pattern) {
                return response.clone().map(|text| CompletionResponse {
                    text: Self::clip(text, req.max_output_chars),
                });
            }
        }

        let next = self
            .scripted
            .lock()
            .map_err(|_| BackendError::Unavailable("mock poisoned".to_string()))?
            .pop();

        match next {
            Some(Ok(text)) => Ok(CompletionResponse {
                text: Self::clip(text, req.max_output_chars),
            }),
            Some(Err(e)) => Err(e),
            None => {
                let first_line = req.instruction.lines().next().unwrap_or("(no instruction)");
                Ok(CompletionResponse {
                    text: Self::clip(
                        format!("- Echo from Mock: {}", first_line),
                        req.max_output_chars,
                    ),
                })
            }
        }
    }
}
