use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::ProviderError;
use crate::types::{ChatRequest, StreamEvent};

/// A single named model adapter. `send_stream` forwards `StreamEvent`s to
/// `tx` as they arrive; the caller (the pool) owns fallback/commitment
/// semantics across providers.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn send_stream(
        &self,
        req: &ChatRequest,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<(), ProviderError>;
}
