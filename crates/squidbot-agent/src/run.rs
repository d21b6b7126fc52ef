use std::sync::Arc;

use squidbot_channels::Channel;
use squidbot_llm::{ChatRequest, LlmPool, StreamEvent};
use squidbot_memory::MemoryManager;
use squidbot_skills::{build_skills_block, SkillsLoader};
use squidbot_tools::{Tool, ToolRegistry};
use squidbot_types::{format_call, Message, Session, ToolCall};
use tokio::sync::mpsc;
use tracing::warn;

use crate::error::format_llm_error;

/// Hard bound on tool-calling rounds within a single turn, matching the
/// reference agent's runaway-loop guard.
const MAX_TOOL_ROUNDS: usize = 20;
const TOOL_RESULT_TRUNCATE_CHARS: usize = 2000;
const STREAM_BUFFER: usize = 32;

/// Wires the Memory Manager, Tool Registry, Skills Loader, and LLM Pool into
/// the per-turn conversation algorithm. One `AgentLoop` is shared across all
/// sessions and channels; `run` takes the session-specific state as
/// arguments rather than storing it.
pub struct AgentLoop {
    memory: Arc<MemoryManager>,
    tools: Arc<ToolRegistry>,
    skills: Arc<SkillsLoader>,
    llm: Arc<LlmPool>,
    base_system_prompt: String,
    default_model: String,
}

impl AgentLoop {
    pub fn new(
        memory: Arc<MemoryManager>,
        tools: Arc<ToolRegistry>,
        skills: Arc<SkillsLoader>,
        llm: Arc<LlmPool>,
        base_system_prompt: impl Into<String>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            memory,
            tools,
            skills,
            llm,
            base_system_prompt: base_system_prompt.into(),
            default_model: default_model.into(),
        }
    }

    /// Runs one full turn: builds context, drives the tool-calling loop
    /// against the LLM pool, dispatches tool calls, persists the exchange,
    /// and delivers the reply through `channel`. Returns the final
    /// assistant text that was delivered.
    pub async fn run(
        &self,
        session: &Session,
        user_message: &str,
        channel: &dyn Channel,
        model_override: Option<&str>,
        extra_tools: &[Arc<dyn Tool>],
    ) -> String {
        let skills_block = build_skills_block(&self.skills).await;
        let system_prompt = format!("{}{skills_block}", self.base_system_prompt);
        let mut messages = self.memory.build_messages(session, &system_prompt, user_message).await;

        let mut tool_definitions = self.tools.get_definitions();
        tool_definitions.extend(ToolRegistry::extra_definitions(extra_tools));

        let model = model_override.unwrap_or(&self.default_model).to_string();

        for _round in 0..MAX_TOOL_ROUNDS {
            let request = ChatRequest {
                model: model.clone(),
                messages: messages.clone(),
                tools: tool_definitions.clone(),
                stream: channel.streaming(),
            };

            let (tx, rx) = mpsc::channel(STREAM_BUFFER);
            let send_fut = self.llm.chat(&request, tx);
            let drain_fut = drain_events(rx, channel, session);
            let (chat_result, (accumulated_text, tool_calls)) = tokio::join!(send_fut, drain_fut);

            if let Err(err) = chat_result {
                let reply = format_llm_error(&err);
                self.deliver_final(channel, session, &reply).await;
                self.persist_exchange(session, user_message, &reply);
                return reply;
            }

            if tool_calls.is_empty() {
                self.deliver_final(channel, session, &accumulated_text).await;
                self.persist_exchange(session, user_message, &accumulated_text);
                return accumulated_text;
            }

            messages.push(Message::assistant_with_tool_calls(tool_calls.clone()));

            for call in &tool_calls {
                let result = self
                    .tools
                    .dispatch(&call.name, &call.id, serde_json::Value::Object(call.arguments.clone()), extra_tools)
                    .await;

                messages.push(Message::tool_result(&result.tool_call_id, &result.content));

                let call_text = format_call(&call.name, &call.arguments);
                let result_text = truncate(&result.content, TOOL_RESULT_TRUNCATE_CHARS);
                if let Err(err) = self.memory.append_tool_event(&call_text, &result_text) {
                    warn!(error = %err, tool = %call.name, "failed to persist tool event");
                }
            }
        }

        let reply = format!(
            "I reached the limit of {MAX_TOOL_ROUNDS} tool calls for this turn without finishing. \
             Please try narrowing the request."
        );
        self.deliver_final(channel, session, &reply).await;
        self.persist_exchange(session, user_message, &reply);
        reply
    }

    async fn deliver_final(&self, channel: &dyn Channel, session: &Session, text: &str) {
        if channel.streaming() {
            if let Err(err) = channel.send(session, "", true).await {
                warn!(error = %err, "failed to deliver stream-completion signal");
            }
        } else if let Err(err) = channel.send(session, text, true).await {
            warn!(error = %err, "failed to deliver final reply");
        }
    }

    fn persist_exchange(&self, session: &Session, user_message: &str, assistant_reply: &str) {
        if let Err(err) = self.memory.persist_exchange(session, user_message, assistant_reply) {
            warn!(error = %err, "failed to persist exchange");
        }
    }
}

struct PendingToolCall {
    id: String,
    name: Option<String>,
    arguments_buf: String,
}

/// Drains one round's stream events: forwards text chunks live when the
/// channel is streaming, always accumulates the full text for persistence,
/// and aggregates tool-call deltas by id in first-seen order.
async fn drain_events(mut rx: mpsc::Receiver<StreamEvent>, channel: &dyn Channel, session: &Session) -> (String, Vec<ToolCall>) {
    let mut accumulated_text = String::new();
    let mut order: Vec<String> = Vec::new();
    let mut pending: Vec<PendingToolCall> = Vec::new();

    while let Some(event) = rx.recv().await {
        match event {
            StreamEvent::TextDelta(chunk) => {
                if channel.streaming() {
                    if let Err(err) = channel.send(session, &chunk, false).await {
                        warn!(error = %err, "failed to forward streamed chunk");
                    }
                }
                accumulated_text.push_str(&chunk);
            }
            StreamEvent::ToolCallDelta { id, name, arguments_fragment } => {
                let idx = match order.iter().position(|existing| existing == &id) {
                    Some(idx) => idx,
                    None => {
                        order.push(id.clone());
                        pending.push(PendingToolCall { id: id.clone(), name: None, arguments_buf: String::new() });
                        pending.len() - 1
                    }
                };
                if let Some(name) = name {
                    pending[idx].name = Some(name);
                }
                if let Some(fragment) = arguments_fragment {
                    pending[idx].arguments_buf.push_str(&fragment);
                }
            }
            StreamEvent::Done { .. } => break,
        }
    }

    let tool_calls = pending
        .into_iter()
        .map(|p| {
            let arguments = if p.arguments_buf.trim().is_empty() {
                serde_json::Map::new()
            } else {
                match serde_json::from_str::<serde_json::Value>(&p.arguments_buf) {
                    Ok(serde_json::Value::Object(map)) => map,
                    _ => {
                        warn!(tool_call_id = %p.id, "failed to parse tool call arguments, using empty object");
                        serde_json::Map::new()
                    }
                }
            };
            ToolCall { id: p.id, name: p.name.unwrap_or_default(), arguments }
        })
        .collect();

    (accumulated_text, tool_calls)
}

/// Truncates to at most `max_chars` characters, appending a marker if
/// anything was cut. Operates on chars, not bytes, to stay UTF-8 safe.
fn truncate(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        return content.to_string();
    }
    let mut truncated: String = content.chars().take(max_chars).collect();
    truncated.push_str("\n[truncated]");
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use squidbot_channels::InboundMessage;
    use squidbot_llm::{ChatRequest as Req, LlmProvider, ProviderError};
    use squidbot_memory::{MemoryStore, OwnerAliasIndex};
    use std::pin::Pin;
    use std::sync::Mutex as StdMutex;
    use tokio_stream::Stream;

    #[test]
    fn truncate_appends_marker_only_when_cut() {
        assert_eq!(truncate("short", 10), "short");
        let long = "a".repeat(20);
        let out = truncate(&long, 5);
        assert!(out.ends_with("[truncated]"));
        assert_eq!(out.chars().filter(|c| *c == 'a').count(), 5);
    }

    struct RecordingChannel {
        streaming: bool,
        sent: StdMutex<Vec<(String, bool)>>,
    }

    #[async_trait]
    impl Channel for RecordingChannel {
        fn name(&self) -> &str {
            "test"
        }
        fn streaming(&self) -> bool {
            self.streaming
        }
        fn receive(&self) -> Pin<Box<dyn Stream<Item = InboundMessage> + Send + '_>> {
            Box::pin(tokio_stream::empty())
        }
        async fn send(&self, _session: &Session, text: &str, final_chunk: bool) -> Result<(), squidbot_channels::ChannelError> {
            self.sent.lock().unwrap().push((text.to_string(), final_chunk));
            Ok(())
        }
    }

    struct EchoProvider;

    #[async_trait]
    impl LlmProvider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }
        async fn send_stream(&self, _req: &Req, tx: mpsc::Sender<StreamEvent>) -> Result<(), ProviderError> {
            tx.send(StreamEvent::TextDelta("hello ".into())).await.ok();
            tx.send(StreamEvent::TextDelta("world".into())).await.ok();
            tx.send(StreamEvent::Done { stop_reason: "stop".into() }).await.ok();
            Ok(())
        }
    }

    fn loop_with(provider: impl LlmProvider + 'static, dir: &std::path::Path) -> AgentLoop {
        let store = MemoryStore::new(dir);
        let memory = Arc::new(MemoryManager::new(store, OwnerAliasIndex::default()));
        let tools = Arc::new(ToolRegistry::new());
        let skills = Arc::new(SkillsLoader::new(vec![]));
        let llm = Arc::new(LlmPool::new(vec![Box::new(provider)]));
        AgentLoop::new(memory, tools, skills, llm, "you are squidbot", "test-model")
    }

    #[tokio::test]
    async fn terminal_round_without_tool_calls_delivers_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let agent = loop_with(EchoProvider, dir.path());
        let channel = RecordingChannel { streaming: false, sent: StdMutex::new(Vec::new()) };
        let session = Session::new("cli", "local");

        let reply = agent.run(&session, "hi", &channel, None, &[]).await;
        assert_eq!(reply, "hello world");

        let sent = channel.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0], ("hello world".to_string(), true));

        let history = agent.memory.store().load_history(None).unwrap();
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn streaming_channel_receives_each_chunk_then_completion_signal() {
        let dir = tempfile::tempdir().unwrap();
        let agent = loop_with(EchoProvider, dir.path());
        let channel = RecordingChannel { streaming: true, sent: StdMutex::new(Vec::new()) };
        let session = Session::new("cli", "local");

        agent.run(&session, "hi", &channel, None, &[]).await;

        let sent = channel.sent.lock().unwrap();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[0], ("hello ".to_string(), false));
        assert_eq!(sent[1], ("world".to_string(), false));
        assert_eq!(sent[2], (String::new(), true));
    }

    struct FailingProvider;

    #[async_trait]
    impl LlmProvider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }
        async fn send_stream(&self, _req: &Req, _tx: mpsc::Sender<StreamEvent>) -> Result<(), ProviderError> {
            Err(ProviderError::AuthFailed { model: "test-model".into(), message: "bad key".into() })
        }
    }

    #[tokio::test]
    async fn llm_failure_delivers_human_readable_error_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let agent = loop_with(FailingProvider, dir.path());
        let channel = RecordingChannel { streaming: false, sent: StdMutex::new(Vec::new()) };
        let session = Session::new("cli", "local");

        let reply = agent.run(&session, "hi", &channel, None, &[]).await;
        assert!(reply.contains("API key"));

        let history = agent.memory.store().load_history(None).unwrap();
        assert_eq!(history.len(), 2);
    }

    struct ToolCallingProvider {
        calls: StdMutex<usize>,
    }

    #[async_trait]
    impl LlmProvider for ToolCallingProvider {
        fn name(&self) -> &str {
            "tool-calling"
        }
        async fn send_stream(&self, _req: &Req, tx: mpsc::Sender<StreamEvent>) -> Result<(), ProviderError> {
            let call_count = {
                let mut calls = self.calls.lock().unwrap();
                *calls += 1;
                *calls
            };
            if call_count == 1 {
                tx.send(StreamEvent::ToolCallDelta {
                    id: "tc_1".into(),
                    name: Some("echo".into()),
                    arguments_fragment: Some(r#"{"text":"#.into()),
                })
                .await
                .ok();
                tx.send(StreamEvent::ToolCallDelta { id: "tc_1".into(), name: None, arguments_fragment: Some(r#""hi"}"#.into()) })
                    .await
                    .ok();
                tx.send(StreamEvent::Done { stop_reason: "tool_use".into() }).await.ok();
            } else {
                tx.send(StreamEvent::TextDelta("done".into())).await.ok();
                tx.send(StreamEvent::Done { stop_reason: "stop".into() }).await.ok();
            }
            Ok(())
        }
    }

    struct EchoArgTool;

    #[async_trait]
    impl Tool for EchoArgTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "echoes the text argument"
        }
        fn parameters(&self) -> serde_json::Value {
            serde_json::json!({"type": "object"})
        }
        async fn execute(&self, arguments: serde_json::Value) -> Result<String, String> {
            Ok(arguments.get("text").and_then(|v| v.as_str()).unwrap_or_default().to_string())
        }
    }

    #[tokio::test]
    async fn tool_call_round_dispatches_then_continues_to_final_round() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new(dir.path());
        let memory = Arc::new(MemoryManager::new(store, OwnerAliasIndex::default()));
        let tools = Arc::new(ToolRegistry::new());
        tools.register(Arc::new(EchoArgTool));
        let skills = Arc::new(SkillsLoader::new(vec![]));
        let llm = Arc::new(LlmPool::new(vec![Box::new(ToolCallingProvider { calls: StdMutex::new(0) })]));
        let agent = AgentLoop::new(memory, tools, skills, llm, "sys", "test-model");

        let channel = RecordingChannel { streaming: false, sent: StdMutex::new(Vec::new()) };
        let session = Session::new("cli", "local");
        let reply = agent.run(&session, "say hi", &channel, None, &[]).await;
        assert_eq!(reply, "done");

        let history = agent.memory.store().load_history(None).unwrap();
        assert!(history.iter().any(|m| m.role.is_internal_event() && m.content.contains("echo(text='hi')")));
    }
}
