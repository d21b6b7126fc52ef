use async_trait::async_trait;

use crate::tool::Tool;

/// Narrow seam to the Memory Manager's `MEMORY.md` document, so this crate
/// does not need to depend on `squidbot-memory` (C3 sits below C5 in
/// dependency order). The gateway binds a concrete sink per session and
/// passes the tool in as an `extra_tools` entry for that one agent run.
#[async_trait]
pub trait MemoryWriteSink: Send + Sync {
    async fn append_note(&self, text: &str) -> Result<(), String>;
}

pub struct MemoryWriteTool<S: MemoryWriteSink> {
    sink: S,
}

impl<S: MemoryWriteSink> MemoryWriteTool<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl<S: MemoryWriteSink + 'static> Tool for MemoryWriteTool<S> {
    fn name(&self) -> &str {
        "memory_write"
    }

    fn description(&self) -> &str {
        "Append a durable note to the agent's cross-session memory (MEMORY.md)."
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "note": { "type": "string", "description": "The note to remember." }
            },
            "required": ["note"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<String, String> {
        let note = arguments
            .get("note")
            .and_then(|v| v.as_str())
            .ok_or("missing required parameter: note")?;
        self.sink.append_note(note).await?;
        Ok("noted".to_string())
    }
}
