use std::sync::Arc;

use squidbot_types::{format_call, Message, Role, Session};
use tracing::warn;

use crate::consolidation::ConsolidationLlm;
use crate::error::Result;
use crate::owner_alias::OwnerAliasIndex;
use crate::store::MemoryStore;

const DEFAULT_CONSOLIDATION_THRESHOLD: i64 = 40;
const DEFAULT_KEEP_RECENT_RATIO: f64 = 0.5;
const META_CONSOLIDATION_WORD_LIMIT: usize = 600;

/// Builds the per-turn message list, persists exchanges and tool events,
/// and runs history consolidation with a global cursor.
pub struct MemoryManager {
    store: MemoryStore,
    aliases: OwnerAliasIndex,
    llm: Option<Arc<dyn ConsolidationLlm>>,
    consolidation_threshold: i64,
    keep_recent_ratio: f64,
}

impl MemoryManager {
    pub fn new(store: MemoryStore, aliases: OwnerAliasIndex) -> Self {
        Self {
            store,
            aliases,
            llm: None,
            consolidation_threshold: DEFAULT_CONSOLIDATION_THRESHOLD,
            keep_recent_ratio: DEFAULT_KEEP_RECENT_RATIO,
        }
    }

    pub fn with_llm(mut self, llm: Arc<dyn ConsolidationLlm>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Builds the full conversation list for the next LLM call. `system_prompt`
    /// is the effective system prompt already assembled by the caller (base
    /// prompt + skills block); this method appends the Memory/Summary blocks
    /// from its own store, runs consolidation if due, applies owner-alias
    /// labelling, and appends the new user turn.
    ///
    /// On any internal failure this degrades to `[system, user]` only.
    pub async fn build_messages(
        &self,
        session: &Session,
        system_prompt: &str,
        user_message: &str,
    ) -> Vec<Message> {
        match self.build_messages_inner(session, system_prompt, user_message).await {
            Ok(messages) => messages,
            Err(err) => {
                warn!(error = %err, "memory manager failed to build messages, falling back to minimal context");
                vec![Message::system(system_prompt), Message::user(user_message)]
            }
        }
    }

    async fn build_messages_inner(
        &self,
        session: &Session,
        system_prompt: &str,
        user_message: &str,
    ) -> Result<Vec<Message>> {
        let full_history = self.store.load_history(None)?;
        let mut filtered: Vec<Message> = full_history
            .into_iter()
            .filter(|m| !m.role.is_internal_event())
            .collect();

        if self.llm.is_some() {
            let cursor = self.store.load_consolidated_cursor()?;
            if (filtered.len() as i64) - cursor > self.consolidation_threshold {
                self.consolidate(&filtered, cursor).await;
            }
        }

        let memory_doc = self.store.load_memory_doc()?;
        let summary = self.store.load_summary()?;
        let effective_system_prompt = self.assemble_system_prompt(system_prompt, &memory_doc, &summary);

        self.apply_owner_alias_labelling(&mut filtered, session);

        let mut messages = Vec::with_capacity(filtered.len() + 2);
        messages.push(Message::system(effective_system_prompt));
        messages.extend(filtered);
        messages.push(Message::user(user_message));
        Ok(messages)
    }

    fn assemble_system_prompt(&self, base: &str, memory_doc: &str, summary: &str) -> String {
        let mut out = base.to_string();
        if !memory_doc.trim().is_empty() {
            out.push_str("\n\n## Your Memory\n");
            out.push_str(memory_doc.trim());
        }
        if !summary.trim().is_empty() {
            out.push_str("\n\n## Prior Conversation Summary\n");
            out.push_str(summary.trim());
        }
        out
    }

    /// Prepends `[channel / label]` to user-role contents when the
    /// message's recorded sender resolves to a known alias. Sender address
    /// and channel are read from the message's preserved `extra` fields
    /// (`sender_id`/`channel`), stamped there by `persist_exchange`.
    fn apply_owner_alias_labelling(&self, messages: &mut [Message], _current_session: &Session) {
        for message in messages.iter_mut() {
            if message.role != Role::User {
                continue;
            }
            let address = message.extra.get("sender_id").and_then(|v| v.as_str());
            let channel = message.extra.get("channel").and_then(|v| v.as_str());
            if let (Some(address), Some(channel)) = (address, channel) {
                if let Some(label) = self.aliases.label_for(address, channel) {
                    message.content = format!("[{channel} / {label}] {}", message.content);
                }
            }
        }
    }

    /// Appends both turns of an exchange, stamping the sender address used
    /// for owner-alias labelling. Callers at the Agent Loop boundary are
    /// expected to swallow errors from this.
    pub fn persist_exchange(&self, session: &Session, user_message: &str, assistant_reply: &str) -> Result<()> {
        let mut user_msg = Message::user(user_message);
        user_msg.extra.insert("sender_id".into(), session.sender_id.clone().into());
        user_msg.extra.insert("channel".into(), session.channel.clone().into());
        self.store.append_message(&user_msg)?;
        self.store.append_message(&Message::assistant(assistant_reply))?;
        Ok(())
    }

    /// Appends one `tool_call` then one `tool_result` message.
    pub fn append_tool_event(&self, call_text: &str, result_text: &str) -> Result<()> {
        self.store.append_message(&Message::tool_call_event(call_text))?;
        self.store.append_message(&Message::tool_result_event(result_text))?;
        Ok(())
    }

    async fn consolidate(&self, filtered_history: &[Message], cursor: i64) {
        let Some(llm) = self.llm.clone() else { return };

        let keep_recent = ((self.consolidation_threshold as f64) * self.keep_recent_ratio)
            .floor()
            .max(1.0) as usize;
        let cursor = cursor.max(0) as usize;
        let total = filtered_history.len();
        if cursor >= total {
            return;
        }
        let end = total.saturating_sub(keep_recent);
        if end <= cursor {
            return;
        }
        let to_summarize = &filtered_history[cursor..end];
        if to_summarize.is_empty() {
            return;
        }

        let prompt = build_consolidation_prompt(to_summarize);
        match llm.complete(&prompt).await {
            Ok(summary_chunk) => {
                if let Err(err) = self.store.append_summary(summary_chunk.trim()) {
                    warn!(error = %err, "failed to persist consolidation summary, cursor left unchanged");
                    return;
                }
                if let Err(err) = self.store.save_consolidated_cursor(end as i64) {
                    warn!(error = %err, "failed to persist consolidation cursor");
                    return;
                }
                self.meta_consolidate_if_needed().await;
            }
            Err(err) => {
                warn!(error = %err, "consolidation LLM call failed, skipping without advancing cursor");
            }
        }
    }

    async fn meta_consolidate_if_needed(&self) {
        let Some(llm) = self.llm.clone() else { return };
        let summary = match self.store.load_summary() {
            Ok(s) => s,
            Err(_) => return,
        };
        if summary.split_whitespace().count() <= META_CONSOLIDATION_WORD_LIMIT {
            return;
        }
        let prompt = format!(
            "Summarize the following notes into a more concise version, preserving all distinct facts:\n\n{summary}"
        );
        match llm.complete(&prompt).await {
            Ok(recompressed) => {
                if let Err(err) = self.store.replace_summary(recompressed.trim()) {
                    warn!(error = %err, "failed to persist recompressed summary");
                }
            }
            Err(err) => {
                warn!(error = %err, "meta-consolidation LLM call failed, leaving summary untouched");
            }
        }
    }
}

fn build_consolidation_prompt(messages: &[Message]) -> String {
    let mut prompt = String::new();
    for message in messages {
        if matches!(message.role, Role::User | Role::Assistant) {
            prompt.push_str(&format!("{}: {}\n", message.role, message.content));
        }
    }
    prompt
}

/// Re-exported for the Agent Loop, which needs the same call-text rendering
/// used when appending tool events.
pub fn render_tool_call(name: &str, arguments: &serde_json::Map<String, serde_json::Value>) -> String {
    format_call(name, arguments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::owner_alias::OwnerAlias;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct StubLlm {
        response: String,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ConsolidationLlm for StubLlm {
        async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
            self.calls.lock().unwrap().push(prompt.to_string());
            Ok(self.response.clone())
        }
    }

    struct FailingLlm;

    #[async_trait]
    impl ConsolidationLlm for FailingLlm {
        async fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
            anyhow::bail!("provider unavailable")
        }
    }

    fn manager(dir: &tempfile::TempDir) -> MemoryManager {
        let store = MemoryStore::new(dir.path());
        MemoryManager::new(store, OwnerAliasIndex::default())
    }

    #[tokio::test]
    async fn build_messages_falls_back_when_history_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = manager(&dir);
        let session = Session::new("cli", "local");
        let messages = mgr.build_messages(&session, "base prompt", "hi there").await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "base prompt");
        assert_eq!(messages[1].content, "hi there");
    }

    #[tokio::test]
    async fn persist_exchange_then_build_messages_includes_history() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = manager(&dir);
        let session = Session::new("cli", "local");
        mgr.persist_exchange(&session, "first question", "first answer").unwrap();

        let messages = mgr.build_messages(&session, "base", "second question").await;
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[1].content, "first question");
        assert_eq!(messages[2].content, "first answer");
        assert_eq!(messages[3].content, "second question");
    }

    #[tokio::test]
    async fn tool_events_are_excluded_from_built_messages() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = manager(&dir);
        let session = Session::new("cli", "local");
        mgr.persist_exchange(&session, "question", "answer").unwrap();
        mgr.append_tool_event("shell(cmd='ls')", "total 0").unwrap();

        let messages = mgr.build_messages(&session, "base", "next").await;
        assert!(messages.iter().all(|m| !m.role.is_internal_event()));
    }

    #[tokio::test]
    async fn owner_alias_label_is_prepended_for_known_sender() {
        let dir = tempfile::tempdir().unwrap();
        let aliases = OwnerAliasIndex::new(&[OwnerAlias {
            address: "local".into(),
            channel: Some("cli".into()),
            label: "Owner".into(),
        }]);
        let store = MemoryStore::new(dir.path());
        let mgr = MemoryManager::new(store, aliases);
        let session = Session::new("cli", "local");
        mgr.persist_exchange(&session, "question", "answer").unwrap();

        let messages = mgr.build_messages(&session, "base", "next").await;
        assert_eq!(messages[1].content, "[cli / Owner] question");
    }

    #[tokio::test]
    async fn consolidation_runs_above_threshold_and_advances_cursor() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new(dir.path());
        let llm = Arc::new(StubLlm { response: "summary text".into(), calls: Mutex::new(Vec::new()) });
        let mgr = MemoryManager::new(store, OwnerAliasIndex::default())
            .with_llm(llm.clone());
        let mgr = MemoryManager { consolidation_threshold: 4, keep_recent_ratio: 0.5, ..mgr };

        let session = Session::new("cli", "local");
        for i in 0..10 {
            mgr.persist_exchange(&session, &format!("q{i}"), &format!("a{i}")).unwrap();
        }

        let _ = mgr.build_messages(&session, "base", "final").await;

        assert!(!llm.calls.lock().unwrap().is_empty());
        assert!(mgr.store().load_consolidated_cursor().unwrap() > 0);
        assert!(!mgr.store().load_summary().unwrap().is_empty());
    }

    #[tokio::test]
    async fn consolidation_failure_does_not_advance_cursor() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new(dir.path());
        let mgr = MemoryManager::new(store, OwnerAliasIndex::default())
            .with_llm(Arc::new(FailingLlm));
        let mgr = MemoryManager { consolidation_threshold: 4, keep_recent_ratio: 0.5, ..mgr };

        let session = Session::new("cli", "local");
        for i in 0..10 {
            mgr.persist_exchange(&session, &format!("q{i}"), &format!("a{i}")).unwrap();
        }

        let _ = mgr.build_messages(&session, "base", "final").await;
        assert_eq!(mgr.store().load_consolidated_cursor().unwrap(), 0);
    }
}
