use std::sync::Arc;

use squidbot_agent::AgentLoop;
use squidbot_channels::TerminalChannel;
use squidbot_llm::{AnthropicProvider, LlmPool, LlmProvider, OpenAiCompatibleProvider};
use squidbot_memory::{MemoryManager, MemoryStore, OwnerAliasIndex};
use squidbot_scheduler::SchedulerEngine;
use squidbot_skills::SkillsLoader;
use squidbot_tools::{MemoryWriteTool, ReadFileTool, ShellTool, Tool, ToolRegistry, WebFetchTool, WriteFileTool};

use crate::config::Config;
use crate::dispatch::AgentJobDispatcher;
use crate::memory_sink::MemoryDocSink;

/// Everything the CLI subcommands need, wired once at startup. Mirrors the
/// reference gateway's `AppState`, minus the HTTP/WS surface that is out of
/// scope here.
pub struct Squidbot {
    pub config: Config,
    pub memory: Arc<MemoryManager>,
    pub agent: Arc<AgentLoop>,
    pub scheduler: SchedulerEngine,
    pub skills: Arc<SkillsLoader>,
    pub terminal_channel: Arc<TerminalChannel>,
}

impl Squidbot {
    /// Builds the `memory_write` tool bound to this session's Memory
    /// Manager store. Passed as an `extra_tools` entry at every
    /// `AgentLoop::run` call site, per the gateway's per-session tool
    /// lookup.
    pub fn memory_write_tool(&self) -> Arc<dyn Tool> {
        let sink = MemoryDocSink::new(self.memory.store().clone());
        Arc::new(MemoryWriteTool::new(sink))
    }
}

pub fn build(config: Config, base_dir: &std::path::Path) -> anyhow::Result<Squidbot> {
    let store = MemoryStore::new(base_dir.join("memory"));
    let aliases = OwnerAliasIndex::default();
    let memory = Arc::new(MemoryManager::new(store.clone(), aliases));

    let tools = Arc::new(ToolRegistry::new());
    tools.register(Arc::new(ShellTool::default()));
    tools.register(Arc::new(ReadFileTool));
    tools.register(Arc::new(WriteFileTool));
    tools.register(Arc::new(WebFetchTool::default()));

    let skills_dirs = vec![base_dir.join("skills")];
    let skills = Arc::new(SkillsLoader::new(skills_dirs));

    let providers = build_providers(&config)?;
    let llm = Arc::new(LlmPool::new(providers));

    let agent = Arc::new(AgentLoop::new(
        memory.clone(),
        tools,
        skills.clone(),
        llm,
        config.system_prompt.clone(),
        config.model.clone(),
    ));

    let scheduler_store = MemoryStore::new(base_dir.join("memory"));
    let cron_memory_write_tool: Arc<dyn Tool> = Arc::new(MemoryWriteTool::new(MemoryDocSink::new(store.clone())));
    let dispatcher = Arc::new(AgentJobDispatcher::new(agent.clone(), cron_memory_write_tool));
    let scheduler = SchedulerEngine::new(scheduler_store, dispatcher);

    let session = squidbot_types::Session::new("cli", "local");
    let terminal_channel = Arc::new(TerminalChannel::new(session));

    Ok(Squidbot { config, memory, agent, scheduler, skills, terminal_channel })
}

fn build_providers(config: &Config) -> anyhow::Result<Vec<Box<dyn LlmProvider>>> {
    let mut providers: Vec<Box<dyn LlmProvider>> = Vec::new();

    if let Some(anthropic) = &config.providers.anthropic {
        providers.push(Box::new(AnthropicProvider::new(config.model.clone(), anthropic.api_key.clone())));
    }
    for entry in &config.providers.openai_compat {
        providers.push(Box::new(OpenAiCompatibleProvider::new(
            entry.name.clone(),
            entry.model.clone(),
            entry.base_url.clone(),
            entry.api_key.clone(),
        )));
    }

    if providers.is_empty() {
        anyhow::bail!("no LLM provider configured; set providers.anthropic or providers.openai_compat in config.toml");
    }
    Ok(providers)
}
