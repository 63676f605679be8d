//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `HIVE__*` 覆盖（双下划线表示嵌套，如 `HIVE__LLM__MODEL=llama3-8b-8192`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub pipeline: PipelineSection,
    #[serde(default)]
    pub report: ReportSection,
}

/// [app] 段：应用名、销售数据 CSV 路径
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppSection {
    pub name: Option<String>,
    /// 销售数据文件，未设置时用 ./company_sales.csv
    pub sales_csv: Option<PathBuf>,
}

/// [llm] 段：推理后端选择（OpenAI 兼容端点，如 Groq / OpenAI / 自建代理）
#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmSection {
    #[serde(default = "default_model")]
    pub model: String,
    /// OpenAI 兼容端点地址；未设置时用官方默认
    pub base_url: Option<String>,
}

fn default_model() -> String {
    "llama3-8b-8192".to_string()
}

/// [pipeline] 段：重试上限、后端超时、问答上下文条数上限
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSection {
    /// 单次后端调用的总尝试次数上限（含首次；硬上限，不可关闭）
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// 单次后端调用超时（毫秒），超时视为 BackendUnavailable
    #[serde(default = "default_backend_timeout_ms")]
    pub backend_timeout_ms: u64,
    /// 问答路由拼入上下文的智能体结果条数上限
    #[serde(default = "default_max_question_context_items")]
    pub max_question_context_items: usize,
    /// 单次请求上下文字符数上限，超出在本地直接拒绝（BackendRefused）
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
}

fn default_max_retries() -> u32 {
    3
}

fn default_backend_timeout_ms() -> u64 {
    60_000
}

fn default_max_question_context_items() -> usize {
    8
}

fn default_max_context_chars() -> usize {
    24_000
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backend_timeout_ms: default_backend_timeout_ms(),
            max_question_context_items: default_max_question_context_items(),
            max_context_chars: default_max_context_chars(),
        }
    }
}

/// [report] 段：报告收件人类别
#[derive(Debug, Clone, Deserialize)]
pub struct ReportSection {
    #[serde(default = "default_recipient_class")]
    pub recipient_class: String,
}

fn default_recipient_class() -> String {
    "executive".to_string()
}

impl Default for ReportSection {
    fn default() -> Self {
        Self {
            recipient_class: default_recipient_class(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app: AppSection::default(),
            llm: LlmSection::default(),
            pipeline: PipelineSection::default(),
            report: ReportSection::default(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 HIVE__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 HIVE__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("HIVE")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
