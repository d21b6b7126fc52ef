use async_trait::async_trait;

/// Narrow seam the Memory Manager needs from the LLM Pool: one completion
/// call, no streaming, no tool calls. Kept here rather than depending on
/// `squidbot-llm` directly so this crate stays a leaf; the gateway wires a
/// concrete adapter over the real pool at composition time.
#[async_trait]
pub trait ConsolidationLlm: Send + Sync {
    async fn complete(&self, prompt: &str) -> anyhow::Result<String>;
}
