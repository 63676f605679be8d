//! 报告拼装器
//!
//! 从完成的 RunState 确定性拼出最终邮件产物：Email Reporter 成功则直接采用其
//! 主题与正文；否则用 Summarizer / Business Strategy 的可用结果降级拼装并打上
//! 显式标记。拼装不可失败：上游全军覆没也产出说明性产物，交付层据此决定措辞。

use serde::{Deserialize, Serialize};

use crate::agents::{reporter::DEFAULT_SUBJECT, BUSINESS_STRATEGY, EMAIL_REPORTER, SUMMARIZER};
use crate::pipeline::{AgentPayload, RunState};

/// 降级产物正文首行的标记
pub const DEGRADED_MARKER: &str = "[generated without full report agent]";

/// 交给邮件交付协作者的最终产物
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailReport {
    pub subject: String,
    pub body: String,
    pub recipient_class: String,
    /// Email Reporter 未成功、由上游碎片拼装时为 true
    pub degraded: bool,
}

/// 报告拼装器：只读消费 RunState
pub struct ReportComposer {
    recipient_class: String,
}

impl ReportComposer {
    pub fn new(recipient_class: impl Into<String>) -> Self {
        Self {
            recipient_class: recipient_class.into(),
        }
    }

    /// 拼装最终产物；永不失败，最多降级
    pub fn compose(&self, run: &RunState) -> EmailReport {
        if let Some(AgentPayload::Report { subject, body }) = run.succeeded_payload(EMAIL_REPORTER)
        {
            return EmailReport {
                subject: subject.clone(),
                body: body.clone(),
                recipient_class: self.recipient_class.clone(),
                degraded: false,
            };
        }

        tracing::warn!("Email reporter unavailable, composing degraded report");
        let mut sections = vec![DEGRADED_MARKER.to_string()];

        if let Some(summary) = run.succeeded_payload(SUMMARIZER) {
            sections.push(format!("Key Insights:\n{}", summary.as_text()));
        }
        if let Some(strategy) = run.succeeded_payload(BUSINESS_STRATEGY) {
            sections.push(format!("Strategic Recommendations:\n{}", strategy.as_text()));
        }
        if sections.len() == 1 {
            sections.push(
                "No analysis results are available for this period; the pipeline did not \
                 produce any succeeded agent output."
                    .to_string(),
            );
        }

        EmailReport {
            subject: format!("{} (partial)", DEFAULT_SUBJECT),
            body: sections.join("\n\n"),
            recipient_class: self.recipient_class.clone(),
            degraded: true,
        }
    }
}
