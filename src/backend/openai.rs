//! OpenAI 兼容推理后端
//!
//! 通过 async_openai 调用任意 OpenAI 兼容端点（可配置 base_url）；原系统使用 Groq 的
//! OpenAI 风格 chat 接口（llama3-8b-8192），同样的配置方式也覆盖 OpenAI 与自建代理。

use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;

use crate::backend::{BackendError, CompletionRequest, CompletionResponse, ReasoningBackend};

/// OpenAI 兼容客户端：持有 Client 与 model 名；指令作为 system 消息，上下文作为 user 消息
pub struct OpenAiBackend {
    client: Client<OpenAIConfig>,
    model: String,
    /// 请求总字符数硬上限，超出在本地直接拒绝
    max_context_chars: usize,
}

impl OpenAiBackend {
    pub fn new(
        base_url: Option<&str>,
        model: &str,
        api_key: Option<&str>,
        max_context_chars: usize,
    ) -> Self {
        let api_key = api_key
            .map(String::from)
            .or_else(|| std::env::var("GROQ_API_KEY").ok())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .unwrap_or_else(|| "sk-placeholder".to_string());

        let config = if let Some(url) = base_url {
            OpenAIConfig::new().with_api_base(url).with_api_key(api_key)
        } else {
            OpenAIConfig::new().with_api_key(api_key)
        };

        Self {
            client: Client::with_config(config),
            model: model.to_string(),
            max_context_chars,
        }
    }

    fn to_messages(
        &self,
        req: &CompletionRequest,
    ) -> Result<Vec<ChatCompletionRequestMessage>, BackendError> {
        let system = ChatCompletionRequestSystemMessageArgs::default()
            .content(req.instruction.clone())
            .build()
            .map_err(|e| BackendError::Refused(e.to_string()))?;
        let user = ChatCompletionRequestUserMessageArgs::default()
            .content(req.context.clone())
            .build()
            .map_err(|e| BackendError::Refused(e.to_string()))?;

        Ok(vec![
            ChatCompletionRequestMessage::System(system),
            ChatCompletionRequestMessage::User(user),
        ])
    }

    fn classify(e: OpenAIError) -> BackendError {
        match e {
            // 请求本身被判定非法：不重试
            OpenAIError::ApiError(api) => BackendError::Refused(api.message),
            OpenAIError::InvalidArgument(msg) => BackendError::Refused(msg),
            // 传输层与其余错误视为瞬态
            other => BackendError::Unavailable(other.to_string()),
        }
    }
}

#[async_trait]
impl ReasoningBackend for OpenAiBackend {
    async fn complete(&self, req: &CompletionRequest) -> Result<CompletionResponse, BackendError> {
        if req.total_chars() > self.max_context_chars {
            return Err(BackendError::Refused(format!(
                "request of {} chars exceeds limit {}",
                req.total_chars(),
                self.max_context_chars
            )));
        }

        // 输出字符上限按约 4 字符/token 折算成补全 token 上限
        let max_completion_tokens = (req.max_output_chars / 4).max(1) as u32;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .max_completion_tokens(max_completion_tokens)
            .messages(self.to_messages(req)?)
            .build()
            .map_err(|e| BackendError::Refused(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(Self::classify)?;

        let text = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        Ok(CompletionResponse { text })
    }
}
