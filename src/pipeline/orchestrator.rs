//! 流水线编排器
//!
//! 按依赖图分波执行：同一波内无未满足依赖的智能体并发跑；编排器是 RunState 的
//! 唯一写者，每个智能体恰好记录一次。单个智能体失败被隔离为 Failed，下游级联记
//! 为 Skipped（带原因），运行总是完整收尾并返回覆盖全部已声明智能体的 RunState。

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::agents::{
    Agent, AgentError, AgentInputs, BusinessStrategy, DataAnalyst, EmailReporter, Summarizer,
};
use crate::backend::ReasoningBackend;
use crate::data::DatasetContext;
use crate::pipeline::graph::PipelineGraph;
use crate::pipeline::types::{AgentName, AgentPayload, AgentResult, PipelineError, RunState};

/// 运行取消时的 Skipped 原因
pub const CANCELLED_REASON: &str = "run cancelled";

/// 多智能体流水线编排器：持有智能体集合与校验过的依赖图
pub struct Orchestrator {
    agents: BTreeMap<AgentName, Arc<dyn Agent>>,
    graph: PipelineGraph,
}

impl Orchestrator {
    /// 从智能体集合构建；依赖图在此一次性校验（重名 / 未知依赖 / 环）
    pub fn new(agents: Vec<Arc<dyn Agent>>) -> Result<Self, PipelineError> {
        let declarations: Vec<(AgentName, Vec<AgentName>)> = agents
            .iter()
            .map(|a| {
                (
                    a.name().to_string(),
                    a.dependencies().iter().map(|d| d.to_string()).collect(),
                )
            })
            .collect();
        let graph = PipelineGraph::new(&declarations)?;

        let agents = agents
            .into_iter()
            .map(|a| (a.name().to_string(), a))
            .collect();

        Ok(Self { agents, graph })
    }

    /// 标准四智能体流水线：analyst -> {summarizer, strategy} -> reporter
    pub fn standard(backend: Arc<dyn ReasoningBackend>) -> Result<Self, PipelineError> {
        let agents: Vec<Arc<dyn Agent>> = vec![
            Arc::new(DataAnalyst::new(backend.clone())),
            Arc::new(Summarizer::new(backend.clone())),
            Arc::new(BusinessStrategy::new(backend.clone())),
            Arc::new(EmailReporter::new(backend)),
        ];
        Self::new(agents)
    }

    /// 执行整条流水线；返回的 RunState 覆盖每一个已声明的智能体
    ///
    /// cancel 触发后：在飞的后端调用被放弃，已记录的条目保留，
    /// 未开始的智能体记为 Skipped("run cancelled")。
    pub async fn run(&self, ctx: &DatasetContext, cancel: CancellationToken) -> RunState {
        let mut run = RunState::new();
        let mut done: BTreeSet<AgentName> = BTreeSet::new();
        let total = self.agents.len();

        tracing::info!(run_id = %run.run_id, agents = total, "Pipeline run started");

        while done.len() < total {
            if cancel.is_cancelled() {
                self.skip_remaining(&mut run, &mut done, CANCELLED_REASON);
                break;
            }

            let ready = self.graph.ready(&done);
            if ready.is_empty() {
                // 图已验证无环，不应出现；防御性收尾避免死循环
                debug_assert!(false, "no ready agents but run incomplete");
                self.skip_remaining(&mut run, &mut done, "scheduler stalled");
                break;
            }

            let mut wave: JoinSet<(AgentName, Result<AgentPayload, AgentError>, u64)> =
                JoinSet::new();
            // 任务 id -> 智能体名：panic 的任务拿不到闭包返回值，靠这张表归因
            let mut task_names: BTreeMap<tokio::task::Id, AgentName> = BTreeMap::new();

            for name in ready {
                let unmet = self.unmet_dependencies(&run, &name);
                if !unmet.is_empty() {
                    let reason = format!("upstream failure: {}", unmet.join(", "));
                    tracing::warn!(agent = %name, %reason, "Agent skipped");
                    run.record(AgentResult::skipped(name.clone(), reason));
                    done.insert(name);
                    continue;
                }

                let agent = Arc::clone(&self.agents[&name]);
                let inputs = self.collect_inputs(&run, &name);
                let ctx = ctx.clone();
                tracing::info!(agent = %name, "Agent started");
                let handle = wave.spawn(async move {
                    let started = Instant::now();
                    let result = agent.run(&ctx, &inputs).await;
                    (
                        agent.name().to_string(),
                        result,
                        started.elapsed().as_millis() as u64,
                    )
                });
                task_names.insert(handle.id(), name);
            }

            // 收割本波；取消时放弃在飞任务
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        wave.abort_all();
                        break;
                    }
                    joined = wave.join_next() => {
                        match joined {
                            Some(Ok((name, result, elapsed_ms))) => {
                                self.record_outcome(&mut run, &name, result, elapsed_ms);
                                done.insert(name);
                            }
                            Some(Err(e)) => {
                                // 任务 panic：按 id 归因记为 Failed，防止该智能体被重新调度
                                tracing::error!("Agent task join failed: {}", e);
                                if let Some(name) = task_names.remove(&e.id()) {
                                    run.record(AgentResult::failed(
                                        name.clone(),
                                        format!("agent task panicked: {}", e),
                                        0,
                                    ));
                                    done.insert(name);
                                }
                            }
                            None => break,
                        }
                    }
                }
            }
        }

        if done.len() < total {
            self.skip_remaining(&mut run, &mut done, CANCELLED_REASON);
        }

        run.finish();
        tracing::info!(
            run_id = %run.run_id,
            succeeded = run.succeeded_count(),
            total,
            "Pipeline run finished"
        );
        run
    }

    /// 声明依赖中未成功（Failed / Skipped）的名字，升序排列保证原因文本确定
    fn unmet_dependencies(&self, run: &RunState, name: &str) -> Vec<AgentName> {
        let mut unmet: Vec<AgentName> = self
            .graph
            .dependencies_of(name)
            .iter()
            .filter(|dep| run.get(dep).map(|r| !r.is_succeeded()).unwrap_or(true))
            .cloned()
            .collect();
        unmet.sort();
        unmet
    }

    /// 收集声明依赖的成功负载（调用前提：依赖全部成功）
    fn collect_inputs(&self, run: &RunState, name: &str) -> AgentInputs {
        let mut inputs = AgentInputs::new();
        for dep in self.graph.dependencies_of(name) {
            if let Some(payload) = run.succeeded_payload(dep) {
                inputs.insert(dep.clone(), payload.clone());
            }
        }
        inputs
    }

    fn record_outcome(
        &self,
        run: &mut RunState,
        name: &str,
        result: Result<AgentPayload, AgentError>,
        elapsed_ms: u64,
    ) {
        match result {
            Ok(payload) => {
                tracing::info!(agent = %name, elapsed_ms, "Agent succeeded");
                run.record(AgentResult::succeeded(name, payload, elapsed_ms));
            }
            Err(e) => {
                tracing::error!(agent = %name, elapsed_ms, "Agent failed: {}", e);
                run.record(AgentResult::failed(name, e.to_string(), elapsed_ms));
            }
        }
    }

    /// 将所有尚未记录的智能体记为 Skipped(reason)
    fn skip_remaining(&self, run: &mut RunState, done: &mut BTreeSet<AgentName>, reason: &str) {
        for name in self.graph.agents() {
            if !done.contains(name) {
                run.record(AgentResult::skipped(name.clone(), reason));
                done.insert(name.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, MockBackend};
    use crate::data::SalesRecord;
    use crate::pipeline::{AgentPayload, AgentStatus};
    use async_trait::async_trait;
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

    struct FakeAgent {
        name: &'static str,
        deps: &'static [&'static str],
        fail: bool,
    }

    #[async_trait]
    impl Agent for FakeAgent {
        fn name(&self) -> &'static str {
            self.name
        }

        fn dependencies(&self) -> &'static [&'static str] {
            self.deps
        }

        async fn run(
            &self,
            _ctx: &DatasetContext,
            _inputs: &AgentInputs,
        ) -> Result<AgentPayload, AgentError> {
            if self.fail {
                Err(AgentError::Malformed("scripted failure".to_string()))
            } else {
                Ok(AgentPayload::Text(format!("{} ok", self.name)))
            }
        }
    }

    #[test]
    fn test_cyclic_agents_rejected() {
        let agents: Vec<Arc<dyn Agent>> = vec![
            Arc::new(FakeAgent { name: "a", deps: &["b"], fail: false }),
            Arc::new(FakeAgent { name: "b", deps: &["a"], fail: false }),
        ];
        assert!(Orchestrator::new(agents).is_err());
    }

    #[tokio::test]
    async fn test_failure_cascades_to_skips() {
        let agents: Vec<Arc<dyn Agent>> = vec![
            Arc::new(FakeAgent { name: "root", deps: &[], fail: true }),
            Arc::new(FakeAgent { name: "mid", deps: &["root"], fail: false }),
            Arc::new(FakeAgent { name: "leaf", deps: &["mid"], fail: false }),
        ];
        let orch = Orchestrator::new(agents).unwrap();
        let run = orch.run(&ctx(), CancellationToken::new()).await;

        assert_eq!(run.len(), 3);
        assert!(matches!(run.get("root").unwrap().status, AgentStatus::Failed { .. }));
        match &run.get("mid").unwrap().status {
            AgentStatus::Skipped { reason } => assert_eq!(reason, "upstream failure: root"),
            other => panic!("unexpected status: {:?}", other),
        }
        match &run.get("leaf").unwrap().status {
            AgentStatus::Skipped { reason } => assert_eq!(reason, "upstream failure: mid"),
            other => panic!("unexpected status: {:?}", other),
        }
    }

    struct PanickingAgent;

    #[async_trait]
    impl Agent for PanickingAgent {
        fn name(&self) -> &'static str {
            "boom"
        }

        fn dependencies(&self) -> &'static [&'static str] {
            &[]
        }

        async fn run(
            &self,
            _ctx: &DatasetContext,
            _inputs: &AgentInputs,
        ) -> Result<AgentPayload, AgentError> {
            panic!("scripted panic");
        }
    }

    #[tokio::test]
    async fn test_panicking_agent_recorded_as_failed() {
        let agents: Vec<Arc<dyn Agent>> = vec![
            Arc::new(PanickingAgent),
            Arc::new(FakeAgent { name: "after", deps: &["boom"], fail: false }),
        ];
        let orch = Orchestrator::new(agents).unwrap();

        // 运行必须收尾，panic 的智能体记为 Failed 而不是被反复重新调度
        let run = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            orch.run(&ctx(), CancellationToken::new()),
        )
        .await
        .expect("run must complete even when an agent panics");

        assert_eq!(run.len(), 2);
        match &run.get("boom").unwrap().status {
            AgentStatus::Failed { reason } => assert!(reason.contains("panicked")),
            other => panic!("unexpected status: {:?}", other),
        }
        match &run.get("after").unwrap().status {
            AgentStatus::Skipped { reason } => assert_eq!(reason, "upstream failure: boom"),
            other => panic!("unexpected status: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_standard_pipeline_all_succeed() {
        let backend = Arc::new(MockBackend::with_script(vec![
            Ok("Detailed analysis narrative.".to_string()),
            Ok("- point one\n- point two".to_string()),
            Ok("- strategy one".to_string()),
            Ok("Subject: Report\n\nDear Boss".to_string()),
        ]));
        let orch = Orchestrator::standard(backend).unwrap();
        let run = orch.run(&ctx(), CancellationToken::new()).await;

        assert_eq!(run.len(), 4);
        assert_eq!(run.succeeded_count(), 4);
    }

    #[tokio::test]
    async fn test_pre_cancelled_run_skips_everything() {
        let backend = Arc::new(MockBackend::new());
        let orch = Orchestrator::standard(backend).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let run = orch.run(&ctx(), cancel).await;

        assert_eq!(run.len(), 4);
        for result in run.results() {
            match &result.status {
                AgentStatus::Skipped { reason } => assert_eq!(reason, CANCELLED_REASON),
                other => panic!("unexpected status: {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_refused_backend_fails_analyst_and_cascades() {
        let backend = Arc::new(MockBackend::with_script(vec![Err(BackendError::Refused(
            "bad request".to_string(),
        ))]));
        let orch = Orchestrator::standard(backend).unwrap();
        let run = orch.run(&ctx(), CancellationToken::new()).await;

        assert!(matches!(
            run.get(crate::agents::DATA_ANALYST).unwrap().status,
            AgentStatus::Failed { .. }
        ));
        // reporter 的原因同时点名两个直接上游
        match &run.get(crate::agents::EMAIL_REPORTER).unwrap().status {
            AgentStatus::Skipped { reason } => {
                assert!(reason.contains(crate::agents::SUMMARIZER));
                assert!(reason.contains(crate::agents::BUSINESS_STRATEGY));
            }
            other => panic!("unexpected status: {:?}", other),
        }
    }
}
