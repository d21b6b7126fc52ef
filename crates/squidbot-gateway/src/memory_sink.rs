use async_trait::async_trait;
use squidbot_memory::MemoryStore;
use squidbot_tools::MemoryWriteSink;

/// Bridges the Tool Registry's narrow `MemoryWriteSink` seam onto the
/// Memory Manager's `MEMORY.md` document, so the `memory_write` tool can be
/// bound in as an extra tool for a turn without `squidbot-tools` depending
/// on `squidbot-memory` directly.
pub struct MemoryDocSink {
    store: MemoryStore,
}

impl MemoryDocSink {
    pub fn new(store: MemoryStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl MemoryWriteSink for MemoryDocSink {
    async fn append_note(&self, text: &str) -> Result<(), String> {
        let existing = self.store.load_memory_doc().map_err(|e| e.to_string())?;
        let combined = if existing.trim().is_empty() {
            text.trim().to_string()
        } else {
            format!("{}\n{}", existing.trim_end(), text.trim())
        };
        self.store.save_memory_doc(&combined).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn append_note_writes_through_to_the_memory_doc() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new(dir.path());
        let sink = MemoryDocSink::new(store.clone());

        sink.append_note("remember the coffee order").await.unwrap();
        sink.append_note("remember the wifi password").await.unwrap();

        let doc = store.load_memory_doc().unwrap();
        assert_eq!(doc, "remember the coffee order\nremember the wifi password");
    }
}
