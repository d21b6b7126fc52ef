pub mod anthropic;
pub mod openai_compatible;
pub mod sse;

pub use anthropic::AnthropicProvider;
pub use openai_compatible::OpenAiCompatibleProvider;
