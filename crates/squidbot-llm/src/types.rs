use squidbot_types::{Message, ToolCall, ToolDefinition};

/// A chat completion request sent to a single provider.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
    pub stream: bool,
}

/// One unit of a streamed response. Tool-call deltas arrive fragmented by
/// id across the stream; aggregation keyed by id (preserving first-seen
/// order) happens at the Agent Loop, not here.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    TextDelta(String),
    ToolCallDelta {
        id: String,
        name: Option<String>,
        arguments_fragment: Option<String>,
    },
    Done { stop_reason: String },
}

/// The fully aggregated, non-streaming form of a response. Providers that
/// only expose request/response (no SSE) return this directly; the pool's
/// streaming seam wraps it into `StreamEvent`s for uniform consumption.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub stop_reason: String,
}
