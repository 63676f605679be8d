//! 问答路由
//!
//! 用数据上下文 + 已完成运行的成功结果回答临时问题：不重跑任何智能体、不修改
//! RunState，只发一次后端调用。上下文窗口有界：数据事实在前，成功结果按与问题
//! 的关键词重合度排序截断。全部智能体失败时退回纯数据事实，并标记答案未经验证。

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::agents::prompt;
use crate::backend::{BackendError, CompletionRequest, ReasoningBackend};
use crate::data::DatasetContext;
use crate::pipeline::RunState;

/// 无任何成功分析可引用时加在答案前的标记
pub const UNVERIFIED_MARKER: &str = "[unverified - no prior analysis available]";

/// 一次问答的结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    /// 是否有成功的智能体结果佐证
    pub verified: bool,
    /// 拼入上下文的智能体结果条数
    pub context_items: usize,
}

/// 问答失败（后端重试与超时已在适配层处理）
#[derive(Error, Debug)]
pub enum QueryError {
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// 问答路由器：持有后端与上下文条数上限
pub struct QueryRouter {
    backend: Arc<dyn ReasoningBackend>,
    max_context_items: usize,
}

impl QueryRouter {
    pub fn new(backend: Arc<dyn ReasoningBackend>, max_context_items: usize) -> Self {
        Self {
            backend,
            max_context_items,
        }
    }

    /// 回答一个自由文本问题
    pub async fn answer(
        &self,
        question: &str,
        ctx: &DatasetContext,
        run: &RunState,
    ) -> Result<Answer, QueryError> {
        let selected = self.select_results(question, run);
        let verified = !selected.is_empty();

        let mut sections = vec![
            format!("Question: {}", question),
            prompt::dataset_overview(ctx),
            prompt::product_table(ctx),
        ];
        for (agent, text) in &selected {
            sections.push(format!("Prior analysis ({}):\n{}", agent, text));
        }
        let context = prompt::truncate(&sections.join("\n\n"), prompt::SECTION_LIMIT * 2);

        let req = CompletionRequest::new(prompt::support_instruction(), context);
        let resp = self.backend.complete(&req).await?;

        let text = if verified {
            resp.text.trim().to_string()
        } else {
            tracing::warn!("Answering without any succeeded analysis");
            format!("{} {}", UNVERIFIED_MARKER, resp.text.trim())
        };

        Ok(Answer {
            text,
            verified,
            context_items: selected.len(),
        })
    }

    /// 成功结果按与问题的关键词重合度降序（同分按名升序），截断到上限
    fn select_results(&self, question: &str, run: &RunState) -> Vec<(String, String)> {
        let keywords: Vec<String> = question
            .to_lowercase()
            .split_whitespace()
            .filter(|w| w.len() > 3)
            .map(String::from)
            .collect();

        let mut scored: Vec<(usize, String, String)> = run
            .results()
            .filter(|r| r.is_succeeded())
            .filter_map(|r| r.payload.as_ref().map(|p| (r.agent.clone(), p.as_text())))
            .map(|(agent, text)| {
                let haystack = text.to_lowercase();
                let score = keywords.iter().filter(|k| haystack.contains(*k)).count();
                (score, agent, text)
            })
            .collect();

        scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        scored
            .into_iter()
            .take(self.max_context_items)
            .map(|(_, agent, text)| (agent, text))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use crate::data::SalesRecord;
    use crate::pipeline::{AgentPayload, AgentResult};
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

    fn run_with(results: Vec<AgentResult>) -> RunState {
        let mut run = RunState::new();
        for r in results {
            run.record(r);
        }
        run
    }

    #[tokio::test]
    async fn test_empty_run_marks_unverified() {
        let backend = Arc::new(MockBackend::with_script(vec![Ok(
            "Revenue was $100.".to_string(),
        )]));
        let router = QueryRouter::new(backend, 8);

        let answer = router
            .answer("What was total revenue?", &ctx(), &run_with(vec![]))
            .await
            .unwrap();
        assert!(!answer.verified);
        assert!(answer.text.starts_with(UNVERIFIED_MARKER));
        assert_eq!(answer.context_items, 0);
    }

    #[tokio::test]
    async fn test_succeeded_results_bound_by_limit() {
        let backend = Arc::new(MockBackend::with_script(vec![Ok("answer".to_string())]));
        let router = QueryRouter::new(backend, 1);

        let run = run_with(vec![
            AgentResult::succeeded("a", AgentPayload::Text("widget revenue detail".to_string()), 1),
            AgentResult::succeeded("b", AgentPayload::Text("unrelated".to_string()), 1),
        ]);
        let answer = router
            .answer("widget revenue?", &ctx(), &run)
            .await
            .unwrap();
        assert!(answer.verified);
        assert_eq!(answer.context_items, 1);
    }

    #[tokio::test]
    async fn test_failed_results_never_selected() {
        let backend = Arc::new(MockBackend::with_script(vec![Ok("answer".to_string())]));
        let router = QueryRouter::new(backend, 8);

        let run = run_with(vec![AgentResult::failed("a", "boom", 1)]);
        let answer = router.answer("anything?", &ctx(), &run).await.unwrap();
        assert!(!answer.verified);
    }
}
