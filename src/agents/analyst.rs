//! Data Analyst 智能体
//!
//! 无依赖，只读数据上下文；产出数字表（排名 + 趋势，可直接交给制图协作者）与叙述洞察。

use std::sync::Arc;

use async_trait::async_trait;

use crate::agents::{prompt, Agent, AgentError, AgentInputs, DATA_ANALYST};
use crate::backend::{CompletionRequest, ReasoningBackend};
use crate::data::DatasetContext;
use crate::pipeline::AgentPayload;

pub struct DataAnalyst {
    backend: Arc<dyn ReasoningBackend>,
}

impl DataAnalyst {
    pub fn new(backend: Arc<dyn ReasoningBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Agent for DataAnalyst {
    fn name(&self) -> &'static str {
        DATA_ANALYST
    }

    fn dependencies(&self) -> &'static [&'static str] {
        &[]
    }

    async fn run(
        &self,
        ctx: &DatasetContext,
        _inputs: &AgentInputs,
    ) -> Result<AgentPayload, AgentError> {
        let req = CompletionRequest::new(prompt::analyst_instruction(), prompt::analyst_context(ctx));
        let resp = self.backend.complete(&req).await?;

        let narrative = resp.text.trim().to_string();
        if narrative.is_empty() {
            return Err(AgentError::Malformed(
                "backend returned empty analysis text".to_string(),
            ));
        }

        Ok(AgentPayload::NumericTable {
            ranking: ctx.product_ranking.clone(),
            trend: ctx.trend.clone(),
            narrative,
        })
    }
}
