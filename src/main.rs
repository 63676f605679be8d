//! Hive - Rust 多智能体销售数据分析系统
//!
//! 入口：初始化日志与配置、装载销售数据、构建数据上下文与流水线，
//! 然后进入命令循环：analyze 跑全流程并打印报告，ask <问题> 走问答路由，quit 退出。

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use hive::backend::{OpenAiBackend, ReasoningBackend, RetryPolicy, RetryingBackend};
use hive::config::load_config;
use hive::data::{load_sales_csv, DatasetContext};
use hive::pipeline::AgentStatus;
use hive::{Orchestrator, QueryRouter, ReportComposer, RunState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    hive::observability::init();

    let cfg = load_config(None).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        hive::config::AppConfig::default()
    });

    // 数据：配置 > 当前目录下的 company_sales.csv
    let csv_path = cfg
        .app
        .sales_csv
        .clone()
        .unwrap_or_else(|| PathBuf::from("company_sales.csv"));
    let records = load_sales_csv(&csv_path)
        .with_context(|| format!("Failed to load sales data from {}", csv_path.display()))?;
    let ctx = DatasetContext::build(&records).context("Failed to build dataset context")?;

    let backend: Arc<dyn ReasoningBackend> = Arc::new(RetryingBackend::new(
        Arc::new(OpenAiBackend::new(
            cfg.llm.base_url.as_deref(),
            &cfg.llm.model,
            None,
            cfg.pipeline.max_context_chars,
        )),
        RetryPolicy::new(cfg.pipeline.max_retries, cfg.pipeline.backend_timeout_ms),
    ));

    let orchestrator = Orchestrator::standard(backend.clone()).context("Invalid pipeline graph")?;
    let router = QueryRouter::new(backend, cfg.pipeline.max_question_context_items);
    let composer = ReportComposer::new(cfg.report.recipient_class.clone());

    println!("Hive multi-agent sales analysis");
    println!("Commands: analyze | ask <question> | quit");

    let stdin = std::io::stdin();
    let mut last_run: Option<RunState> = None;

    loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();

        if input == "quit" {
            break;
        } else if input == "analyze" {
            let run = orchestrator.run(&ctx, CancellationToken::new()).await;
            print_statuses(&run);

            let report = composer.compose(&run);
            println!("\n=== {} ===\n{}\n", report.subject, report.body);
            last_run = Some(run);
        } else if let Some(question) = input.strip_prefix("ask ") {
            let run = last_run.clone().unwrap_or_default();
            match router.answer(question, &ctx, &run).await {
                Ok(answer) => println!("\n{}\n", answer.text),
                Err(e) => println!("Query failed: {}", e),
            }
        } else if !input.is_empty() {
            println!("Unknown command. Use: analyze | ask <question> | quit");
        }
    }

    Ok(())
}

fn print_statuses(run: &RunState) {
    for result in run.results() {
        let status = match &result.status {
            AgentStatus::Succeeded => "ok".to_string(),
            AgentStatus::Failed { reason } => format!("failed: {}", reason),
            AgentStatus::Skipped { reason } => format!("skipped: {}", reason),
        };
        println!("[{}] {}", result.agent, status);
    }
}
