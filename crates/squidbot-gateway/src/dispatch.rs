use std::sync::Arc;

use async_trait::async_trait;
use squidbot_agent::AgentLoop;
use squidbot_channels::TerminalChannel;
use squidbot_scheduler::JobDispatcher;
use squidbot_tools::Tool;
use squidbot_types::{CronJob, Session};
use tracing::warn;

/// Bridges a fired `CronJob` into the Agent Loop. `job.channel` is the
/// session id (`"<channel>:<sender_id>"`, matching `Session::id()`) the
/// reply should be delivered on; only the terminal channel is wired up in
/// this workspace, so every job currently surfaces there.
pub struct AgentJobDispatcher {
    agent: Arc<AgentLoop>,
    memory_write_tool: Arc<dyn Tool>,
}

impl AgentJobDispatcher {
    pub fn new(agent: Arc<AgentLoop>, memory_write_tool: Arc<dyn Tool>) -> Self {
        Self { agent, memory_write_tool }
    }
}

#[async_trait]
impl JobDispatcher for AgentJobDispatcher {
    async fn dispatch(&self, job: CronJob) {
        let session = parse_session(&job.channel);
        let channel = TerminalChannel::new(session.clone());
        let extra_tools = [self.memory_write_tool.clone()];
        self.agent.run(&session, &job.message, &channel, None, &extra_tools).await;
    }
}

fn parse_session(channel_id: &str) -> Session {
    match channel_id.split_once(':') {
        Some((channel, sender)) => Session::new(channel, sender),
        None => {
            warn!(channel_id, "cron job channel is not a '<channel>:<sender>' id, defaulting to cli:local");
            Session::new("cli", "local")
        }
    }
}
