//! Business Strategy 智能体
//!
//! 依赖 Data Analyst（与 Summarizer 平行，可并发执行）；产出可落地的策略清单。

use std::sync::Arc;

use async_trait::async_trait;

use crate::agents::{
    parse_list_items, prompt, require_input, Agent, AgentError, AgentInputs, BUSINESS_STRATEGY,
    DATA_ANALYST,
};
use crate::backend::{CompletionRequest, ReasoningBackend};
use crate::data::DatasetContext;
use crate::pipeline::AgentPayload;

pub struct BusinessStrategy {
    backend: Arc<dyn ReasoningBackend>,
}

impl BusinessStrategy {
    pub fn new(backend: Arc<dyn ReasoningBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Agent for BusinessStrategy {
    fn name(&self) -> &'static str {
        BUSINESS_STRATEGY
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
            prompt::strategy_instruction(),
            prompt::strategy_context(ctx, &analysis),
        );
        let resp = self.backend.complete(&req).await?;

        let strategies = parse_list_items(&resp.text);
        if strategies.is_empty() {
            return Err(AgentError::Malformed(
                "no strategy items in backend text".to_string(),
            ));
        }

        Ok(AgentPayload::Strategies(strategies))
    }
}
