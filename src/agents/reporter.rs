//! Email Reporter 智能体
//!
//! 依赖 Summarizer 与 Business Strategy；产出正式邮件报告（主题 + 正文）。
//! 后端未按 "Subject: ..." 开头时合成默认主题，整段文本作正文。

use std::sync::Arc;

use async_trait::async_trait;

use crate::agents::{
    prompt, require_input, Agent, AgentError, AgentInputs, BUSINESS_STRATEGY, EMAIL_REPORTER,
    SUMMARIZER,
};
use crate::backend::{CompletionRequest, ReasoningBackend};
use crate::data::DatasetContext;
use crate::pipeline::AgentPayload;

pub const DEFAULT_SUBJECT: &str = "Monthly Sales Performance Report";

pub struct EmailReporter {
    backend: Arc<dyn ReasoningBackend>,
}

impl EmailReporter {
    pub fn new(backend: Arc<dyn ReasoningBackend>) -> Self {
        Self { backend }
    }

    /// 将后端文本拆为 (主题, 正文)
    fn split_subject(text: &str) -> (String, String) {
        let trimmed = text.trim();
        if let Some(first_line) = trimmed.lines().next() {
            if let Some(subject) = first_line.trim().strip_prefix("Subject:") {
                let body = trimmed
                    .lines()
                    .skip(1)
                    .collect::<Vec<_>>()
                    .join("\n")
                    .trim()
                    .to_string();
                return (subject.trim().to_string(), body);
            }
        }
        (DEFAULT_SUBJECT.to_string(), trimmed.to_string())
    }
}

#[async_trait]
impl Agent for EmailReporter {
    fn name(&self) -> &'static str {
        EMAIL_REPORTER
    }

    fn dependencies(&self) -> &'static [&'static str] {
        &[SUMMARIZER, BUSINESS_STRATEGY]
    }

    async fn run(
        &self,
        _ctx: &DatasetContext,
        inputs: &AgentInputs,
    ) -> Result<AgentPayload, AgentError> {
        let summary = require_input(inputs, SUMMARIZER)?.as_text();
        let strategy = require_input(inputs, BUSINESS_STRATEGY)?.as_text();

        let today = chrono::Utc::now().format("%B %d, %Y").to_string();
        let req = CompletionRequest::new(
            prompt::reporter_instruction(&today),
            prompt::reporter_context(&summary, &strategy),
        );
        let resp = self.backend.complete(&req).await?;

        let (subject, body) = Self::split_subject(&resp.text);
        if body.is_empty() {
            return Err(AgentError::Malformed(
                "backend returned empty report body".to_string(),
            ));
        }

        Ok(AgentPayload::Report { subject, body })
    }
}
