use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool invocation requested by the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Map<String, Value>,
}

/// The outcome of executing a `ToolCall`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_call_id: String,
    pub content: String,
    #[serde(default)]
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
            is_error: true,
        }
    }
}

/// Schema advertised to the LLM for a registered tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Renders a tool call the way it is persisted to history and shown to a
/// human: `name(key=repr(value), ...)` with arguments in insertion order.
pub fn format_call(name: &str, arguments: &serde_json::Map<String, Value>) -> String {
    let args = arguments
        .iter()
        .map(|(k, v)| format!("{k}={}", repr(v)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{name}({args})")
}

/// A `repr`-style rendering of a JSON value: bare for numbers/bools/null,
/// single-quoted for strings, compact JSON for arrays/objects.
pub fn repr(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
        Value::Number(_) | Value::Bool(_) | Value::Null => value.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn formats_call_with_ordered_args() {
        let mut args = serde_json::Map::new();
        args.insert("path".into(), json!("/tmp/x"));
        args.insert("count".into(), json!(3));
        assert_eq!(format_call("read_file", &args), "read_file(path='/tmp/x', count=3)");
    }

    #[test]
    fn repr_escapes_quotes_in_strings() {
        assert_eq!(repr(&json!("it's")), "'it\\'s'");
        assert_eq!(repr(&json!(true)), "true");
        assert_eq!(repr(&json!(null)), "null");
    }
}
