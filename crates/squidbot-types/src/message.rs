use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::tool::ToolCall;

/// Role of a single conversation turn.
///
/// `ToolCall` and `ToolResult` are internal bookkeeping roles: they are
/// persisted to history and are searchable, but must never be sent to the
/// LLM. `Tool` is the wire-level tool-response role that *is* sent back to
/// the LLM after a tool executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
    ToolCall,
    ToolResult,
}

impl Role {
    /// True for the two internal bookkeeping roles that never reach the LLM.
    pub fn is_internal_event(self) -> bool {
        matches!(self, Role::ToolCall | Role::ToolResult)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
            Role::ToolCall => "tool_call",
            Role::ToolResult => "tool_result",
        };
        write!(f, "{s}")
    }
}

/// A single persisted conversation message.
///
/// `extra` captures any JSON fields the reader doesn't recognise so that a
/// read-then-write round trip doesn't silently drop data written by a future
/// version of this type (see §6 "Unknown fields must be preserved").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            timestamp: Some(Utc::now()),
            extra: serde_json::Map::new(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn assistant_with_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::new(Role::Assistant, String::new())
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::new(Role::Tool, content)
        }
    }

    pub fn tool_call_event(content: impl Into<String>) -> Self {
        Self::new(Role::ToolCall, content)
    }

    pub fn tool_result_event(content: impl Into<String>) -> Self {
        Self::new(Role::ToolResult, content)
    }
}
