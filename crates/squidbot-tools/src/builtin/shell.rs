use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::{timeout, Duration};

use crate::tool::Tool;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Executes a one-shot shell command via `sh -c`, enforcing a fixed timeout.
/// The concrete sub-process transport for external tool servers is out of
/// scope; this is a direct local command runner.
pub struct ShellTool {
    timeout: Duration,
}

impl Default for ShellTool {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

#[async_trait]
impl Tool for ShellTool {
    fn name(&self) -> &str {
        "shell"
    }

    fn description(&self) -> &str {
        "Execute a shell command via `sh -c` and return its stdout and stderr."
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The shell command to execute."
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<String, String> {
        let command = arguments
            .get("command")
            .and_then(|v| v.as_str())
            .ok_or("missing required parameter: command")?;

        let run = Command::new("sh").arg("-c").arg(command).output();
        let output = timeout(self.timeout, run)
            .await
            .map_err(|_| "command timed out".to_string())?
            .map_err(|e| e.to_string())?;

        let mut rendered = String::new();
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stdout.is_empty() {
            rendered.push_str(&stdout);
        }
        if !stderr.is_empty() {
            if !rendered.is_empty() {
                rendered.push('\n');
            }
            rendered.push_str("[stderr]\n");
            rendered.push_str(&stderr);
        }
        if !output.status.success() {
            rendered.push_str(&format!("\n[exit code: {}]", output.status.code().unwrap_or(-1)));
        }
        if rendered.is_empty() {
            rendered = "(no output)".to_string();
        }
        Ok(rendered)
    }
}
