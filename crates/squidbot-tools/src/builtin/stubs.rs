use async_trait::async_trait;

use crate::tool::Tool;

/// Narrow boundary for an external tool server reached over some
/// subprocess/MCP transport. The transport itself is out of scope (§1); this
/// tool exists so the registry's dispatch/extras contract has a real
/// external-capability shape to exercise.
#[async_trait]
pub trait McpTransport: Send + Sync {
    async fn call(&self, method: &str, arguments: serde_json::Value) -> Result<String, String>;
}

pub struct McpTool<T: McpTransport> {
    transport: T,
}

impl<T: McpTransport> McpTool<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl<T: McpTransport + 'static> Tool for McpTool<T> {
    fn name(&self) -> &str {
        "mcp_call"
    }

    fn description(&self) -> &str {
        "Invoke a method on an external MCP-compatible tool server."
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "method": { "type": "string" },
                "arguments": { "type": "object" }
            },
            "required": ["method"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<String, String> {
        let method = arguments
            .get("method")
            .and_then(|v| v.as_str())
            .ok_or("missing required parameter: method")?;
        let inner_args = arguments.get("arguments").cloned().unwrap_or(serde_json::json!({}));
        self.transport.call(method, inner_args).await
    }
}

/// Narrow boundary for spawning a bounded sub-agent run. The sub-agent's
/// own loop lives in `squidbot-agent`; this tool only needs to call it and
/// return the final text.
#[async_trait]
pub trait SubAgentSpawner: Send + Sync {
    async fn spawn(&self, task: &str) -> Result<String, String>;
}

pub struct SubAgentTool<S: SubAgentSpawner> {
    spawner: S,
}

impl<S: SubAgentSpawner> SubAgentTool<S> {
    pub fn new(spawner: S) -> Self {
        Self { spawner }
    }
}

#[async_trait]
impl<S: SubAgentSpawner + 'static> Tool for SubAgentTool<S> {
    fn name(&self) -> &str {
        "spawn_subagent"
    }

    fn description(&self) -> &str {
        "Spawn a bounded sub-agent run for a single delegated task and return its final reply."
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "task": { "type": "string", "description": "The task to delegate." }
            },
            "required": ["task"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<String, String> {
        let task = arguments
            .get("task")
            .and_then(|v| v.as_str())
            .ok_or("missing required parameter: task")?;
        self.spawner.spawn(task).await
    }
}
