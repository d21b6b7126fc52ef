pub mod error;
pub mod pool;
pub mod provider;
pub mod providers;
pub mod types;

pub use error::ProviderError;
pub use pool::LlmPool;
pub use provider::LlmProvider;
pub use providers::{AnthropicProvider, OpenAiCompatibleProvider};
pub use types::{ChatRequest, ChatResponse, StreamEvent};
