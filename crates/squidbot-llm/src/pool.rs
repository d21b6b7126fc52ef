use tokio::sync::mpsc;
use tracing::warn;

use crate::error::ProviderError;
use crate::provider::LlmProvider;
use crate::types::{ChatRequest, StreamEvent};

const INNER_BUFFER: usize = 32;

/// Ordered list of single-model adapters tried in sequence. For each call,
/// the first provider is attempted; on failure it is logged and the next is
/// tried. Exhaustion re-raises the last error. Once a provider has emitted
/// any streamed content the pool is committed to it for the rest of the
/// call — a later failure from that provider is propagated rather than
/// falling back, since already-forwarded chunks can't be un-sent.
pub struct LlmPool {
    providers: Vec<Box<dyn LlmProvider>>,
}

impl LlmPool {
    pub fn new(providers: Vec<Box<dyn LlmProvider>>) -> Self {
        assert!(!providers.is_empty(), "LlmPool requires at least one provider");
        Self { providers }
    }

    pub async fn chat(&self, req: &ChatRequest, tx: mpsc::Sender<StreamEvent>) -> Result<(), ProviderError> {
        let mut last_err: Option<ProviderError> = None;

        for provider in &self.providers {
            let (inner_tx, mut inner_rx) = mpsc::channel(INNER_BUFFER);
            let send_fut = provider.send_stream(req, inner_tx);
            tokio::pin!(send_fut);

            let mut committed = false;
            let mut provider_result: Option<Result<(), ProviderError>> = None;

            loop {
                if let Some(result) = provider_result.take() {
                    match inner_rx.recv().await {
                        Some(event) => {
                            committed = true;
                            if tx.send(event).await.is_err() {
                                return Err(ProviderError::Cancelled);
                            }
                            provider_result = Some(result);
                        }
                        None => {
                            provider_result = Some(result);
                            break;
                        }
                    }
                    continue;
                }

                tokio::select! {
                    event = inner_rx.recv() => {
                        match event {
                            Some(event) => {
                                committed = true;
                                if tx.send(event).await.is_err() {
                                    return Err(ProviderError::Cancelled);
                                }
                            }
                            None => {
                                // `inner_tx` is owned solely by `send_fut` and is only
                                // dropped as part of that future returning, so it cannot
                                // close before the `send_fut` branch below has already
                                // resolved and recorded a result.
                                unreachable!("inner channel closed before provider future resolved");
                            }
                        }
                    }
                    result = &mut send_fut => {
                        provider_result = Some(result);
                    }
                }
            }

            match provider_result.expect("loop only exits once a result is recorded") {
                Ok(()) => return Ok(()),
                Err(err) => {
                    if let ProviderError::AuthFailed { model, .. } = &err {
                        warn!(provider = provider.name(), model, "provider authentication failed");
                    } else {
                        warn!(provider = provider.name(), error = %err, "provider failed");
                    }

                    if committed {
                        return Err(err);
                    }
                    last_err = Some(err);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| ProviderError::Unavailable("all providers failed".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use squidbot_types::Message;

    struct AlwaysFail;

    #[async_trait]
    impl LlmProvider for AlwaysFail {
        fn name(&self) -> &str {
            "always-fail"
        }
        async fn send_stream(&self, _req: &ChatRequest, _tx: mpsc::Sender<StreamEvent>) -> Result<(), ProviderError> {
            Err(ProviderError::Unavailable("intentional failure".into()))
        }
    }

    struct AlwaysOk;

    #[async_trait]
    impl LlmProvider for AlwaysOk {
        fn name(&self) -> &str {
            "always-ok"
        }
        async fn send_stream(&self, _req: &ChatRequest, tx: mpsc::Sender<StreamEvent>) -> Result<(), ProviderError> {
            tx.send(StreamEvent::TextDelta("hi".into())).await.ok();
            tx.send(StreamEvent::Done { stop_reason: "stop".into() }).await.ok();
            Ok(())
        }
    }

    struct FailsAfterContent;

    #[async_trait]
    impl LlmProvider for FailsAfterContent {
        fn name(&self) -> &str {
            "fails-after-content"
        }
        async fn send_stream(&self, _req: &ChatRequest, tx: mpsc::Sender<StreamEvent>) -> Result<(), ProviderError> {
            tx.send(StreamEvent::TextDelta("partial".into())).await.ok();
            Err(ProviderError::Unavailable("dropped mid-stream".into()))
        }
    }

    fn dummy_request() -> ChatRequest {
        ChatRequest {
            model: "test-model".into(),
            messages: vec![Message::user("hi")],
            tools: vec![],
            stream: true,
        }
    }

    #[tokio::test]
    async fn falls_back_to_second_provider_on_failure_before_content() {
        let pool = LlmPool::new(vec![Box::new(AlwaysFail), Box::new(AlwaysOk)]);
        let (tx, mut rx) = mpsc::channel(16);
        let result = pool.chat(&dummy_request(), tx).await;
        assert!(result.is_ok());
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(events.len(), 2);
    }

    #[tokio::test]
    async fn exhaustion_reraises_last_error() {
        let pool = LlmPool::new(vec![Box::new(AlwaysFail), Box::new(AlwaysFail)]);
        let (tx, _rx) = mpsc::channel(16);
        let result = pool.chat(&dummy_request(), tx).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn committed_provider_failure_does_not_fall_back() {
        let pool = LlmPool::new(vec![Box::new(FailsAfterContent), Box::new(AlwaysOk)]);
        let (tx, mut rx) = mpsc::channel(16);
        let result = pool.chat(&dummy_request(), tx).await;
        assert!(result.is_err());
        let first = rx.try_recv().unwrap();
        matches!(first, StreamEvent::TextDelta(ref s) if s == "partial");
        assert!(rx.try_recv().is_err());
    }
}
