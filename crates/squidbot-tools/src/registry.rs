use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use squidbot_types::{ToolDefinition, ToolResult};
use tracing::warn;

use crate::tool::Tool;

/// Registered tools plus a memoized definition list. The registry is the
/// only place that writes `tool_call_id` into a dispatched `ToolResult`.
pub struct ToolRegistry {
    tools: Mutex<HashMap<String, Arc<dyn Tool>>>,
    definitions: Mutex<Option<Vec<ToolDefinition>>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Mutex::new(HashMap::new()),
            definitions: Mutex::new(None),
        }
    }

    /// Registers a tool, invalidating any cached definition list.
    pub fn register(&self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.lock().unwrap().insert(name, tool);
        *self.definitions.lock().unwrap() = None;
    }

    /// Returns a defensive copy of all registered tool definitions, memoized
    /// until the next `register` call.
    pub fn get_definitions(&self) -> Vec<ToolDefinition> {
        let mut cache = self.definitions.lock().unwrap();
        if let Some(defs) = cache.as_ref() {
            return defs.clone();
        }
        let tools = self.tools.lock().unwrap();
        let defs: Vec<ToolDefinition> = tools
            .values()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters(),
            })
            .collect();
        *cache = Some(defs.clone());
        defs
    }

    /// Runs the matching tool, consulting `extras` before the registry.
    /// Unknown names and tool errors both yield an error `ToolResult`;
    /// this is the only place that stamps `tool_call_id`.
    pub async fn dispatch(
        &self,
        name: &str,
        tool_call_id: &str,
        arguments: serde_json::Value,
        extras: &[Arc<dyn Tool>],
    ) -> ToolResult {
        if let Some(tool) = extras.iter().find(|t| t.name() == name) {
            return Self::run(tool.as_ref(), tool_call_id, arguments).await;
        }

        let tool = {
            let tools = self.tools.lock().unwrap();
            tools.get(name).cloned()
        };

        match tool {
            Some(tool) => Self::run(tool.as_ref(), tool_call_id, arguments).await,
            None => ToolResult::error(tool_call_id, format!("Error: unknown tool '{name}'")),
        }
    }

    async fn run(tool: &dyn Tool, tool_call_id: &str, arguments: serde_json::Value) -> ToolResult {
        match tool.execute(arguments).await {
            Ok(content) => ToolResult::success(tool_call_id, content),
            Err(err) => {
                warn!(tool = tool.name(), error = %err, "tool execution failed");
                ToolResult::error(tool_call_id, format!("Error: {err}"))
            }
        }
    }

    pub fn extra_definitions(extras: &[Arc<dyn Tool>]) -> Vec<ToolDefinition> {
        extras
            .iter()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "echoes input"
        }
        fn parameters(&self) -> serde_json::Value {
            serde_json::json!({"type": "object"})
        }
        async fn execute(&self, arguments: serde_json::Value) -> Result<String, String> {
            Ok(arguments.to_string())
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "fail"
        }
        fn description(&self) -> &str {
            "always fails"
        }
        fn parameters(&self) -> serde_json::Value {
            serde_json::json!({"type": "object"})
        }
        async fn execute(&self, _arguments: serde_json::Value) -> Result<String, String> {
            Err("boom".to_string())
        }
    }

    #[tokio::test]
    async fn dispatch_returns_tool_output_with_call_id_stamped() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        let result = registry.dispatch("echo", "tc_1", serde_json::json!({"a": 1}), &[]).await;
        assert_eq!(result.tool_call_id, "tc_1");
        assert!(!result.is_error);
    }

    #[tokio::test]
    async fn dispatch_unknown_tool_yields_error_result() {
        let registry = ToolRegistry::new();
        let result = registry.dispatch("missing", "tc_2", serde_json::json!({}), &[]).await;
        assert!(result.is_error);
        assert!(result.content.contains("missing"));
    }

    #[tokio::test]
    async fn dispatch_failing_tool_yields_error_result() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(FailingTool));
        let result = registry.dispatch("fail", "tc_3", serde_json::json!({}), &[]).await;
        assert!(result.is_error);
        assert!(result.content.starts_with("Error:"));
    }

    struct RenamedEcho;

    #[async_trait]
    impl Tool for RenamedEcho {
        fn name(&self) -> &str {
            "fail"
        }
        fn description(&self) -> &str {
            "shadows the registered fail tool"
        }
        fn parameters(&self) -> serde_json::Value {
            serde_json::json!({"type": "object"})
        }
        async fn execute(&self, _arguments: serde_json::Value) -> Result<String, String> {
            Ok("shadowed".to_string())
        }
    }

    #[tokio::test]
    async fn extras_shadow_registry_tool_of_same_name() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(FailingTool));
        let extras = vec![Arc::new(RenamedEcho) as Arc<dyn Tool>];
        let result = registry.dispatch("fail", "tc_5", serde_json::json!({}), &extras).await;
        assert!(!result.is_error);
        assert_eq!(result.content, "shadowed");
    }

    #[test]
    fn get_definitions_is_memoized_until_register() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        let first = registry.get_definitions();
        let second = registry.get_definitions();
        assert_eq!(first.len(), second.len());
        registry.register(Arc::new(FailingTool));
        let third = registry.get_definitions();
        assert_eq!(third.len(), 2);
    }
}
