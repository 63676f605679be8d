//! 推理后端层：调用契约抽象与实现（OpenAI 兼容 / Mock），重试与超时住在这里

pub mod mock;
pub mod openai;
pub mod retry;
pub mod traits;

pub use mock::MockBackend;
pub use openai::OpenAiBackend;
pub use retry::{RetryPolicy, RetryingBackend};
pub use traits::{BackendError, CompletionRequest, CompletionResponse, ReasoningBackend};
