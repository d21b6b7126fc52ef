use async_trait::async_trait;
use serde_json::Value;

/// A single callable tool. `execute` receives the arguments the LLM
/// supplied and returns raw content plus an error flag; the registry, not
/// the tool, stamps `tool_call_id` onto the final `ToolResult`.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters(&self) -> Value;
    async fn execute(&self, arguments: Value) -> Result<String, String>;
}
