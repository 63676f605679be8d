//! Summarizer 智能体
//!
//! 依赖 Data Analyst；将详细分析压缩为 4-5 条要点。后端文本按行整形为要点，
//! 完全无法整形时降级为 Malformed。

use std::sync::Arc;

use async_trait::async_trait;

use crate::agents::{
    parse_list_items, prompt, require_input, Agent, AgentError, AgentInputs, DATA_ANALYST,
    SUMMARIZER,
};
use crate::backend::{CompletionRequest, ReasoningBackend};
use crate::data::DatasetContext;
use crate::pipeline::AgentPayload;

pub struct Summarizer {
    backend: Arc<dyn ReasoningBackend>,
}

impl Summarizer {
    pub fn new(backend: Arc<dyn ReasoningBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Agent for Summarizer {
    fn name(&self) -> &'static str {
        SUMMARIZER
    }

    fn dependencies(&self) -> &'static [&'static str] {
        &[DATA_ANALYST]
    }

    async fn run(
        &self,
        ctx: &DatasetContext,
        inputs: &AgentInputs,
    ) -> Result<AgentPayload, AgentError> {
        let analysis = require_input(inputs, DATA_ANALYST)?.as_text();

        let req = CompletionRequest::new(
            prompt::summarizer_instruction(),
            prompt::summarizer_context(ctx, &analysis),
        );
        let resp = self.backend.complete(&req).await?;

        let bullets = parse_list_items(&resp.text);
        if bullets.is_empty() {
            return Err(AgentError::Malformed(
                "no bullet points in backend text".to_string(),
            ));
        }

        Ok(AgentPayload::Bullets(bullets))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use crate::data::SalesRecord;
    use chrono::NaiveDate;

    fn ctx() -> DatasetContext {
        DatasetContext::build(&[SalesRecord {
            period: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            product: "Widget".to_string(),
            revenue: 100.0,
            cost: 40.0,
            customers: None,
        }])
        .unwrap()
    }

    fn analyst_input() -> AgentInputs {
        let mut inputs = AgentInputs::new();
        inputs.insert(
            DATA_ANALYST.to_string(),
            AgentPayload::Text("Revenue grew steadily.".to_string()),
        );
        inputs
    }

    #[tokio::test]
    async fn test_parses_bullet_lines() {
        let backend = Arc::new(MockBackend::with_script(vec![Ok(
            "- Revenue up 20%\n- Widget leads\n* Margins stable".to_string(),
        )]));
        let agent = Summarizer::new(backend);

        let payload = agent.run(&ctx(), &analyst_input()).await.unwrap();
        match payload {
            AgentPayload::Bullets(items) => {
                assert_eq!(items.len(), 3);
                assert_eq!(items[0], "Revenue up 20%");
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_blank_text_malformed() {
        let backend = Arc::new(MockBackend::with_script(vec![Ok("\n  \n".to_string())]));
        let agent = Summarizer::new(backend);
        let err = agent.run(&ctx(), &analyst_input()).await.unwrap_err();
        assert!(matches!(err, AgentError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_missing_dependency_input() {
        let backend = Arc::new(MockBackend::new());
        let agent = Summarizer::new(backend);
        let err = agent.run(&ctx(), &AgentInputs::new()).await.unwrap_err();
        assert!(matches!(err, AgentError::MissingInput(_)));
    }
}
