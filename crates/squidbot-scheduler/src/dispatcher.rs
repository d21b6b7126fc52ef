use async_trait::async_trait;
use squidbot_types::CronJob;

/// Delivers a fired job to the Agent Loop. Kept as a narrow trait, the same
/// way `squidbot-memory::ConsolidationLlm` decouples the memory crate from
/// `squidbot-llm`, so the scheduler never depends on `squidbot-agent`.
#[async_trait]
pub trait JobDispatcher: Send + Sync {
    async fn dispatch(&self, job: CronJob);
}
