use async_trait::async_trait;

use crate::tool::Tool;

pub struct ReadFileTool;

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a file at the given path."
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "Path to the file." }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<String, String> {
        let path = arguments
            .get("path")
            .and_then(|v| v.as_str())
            .ok_or("missing required parameter: path")?;
        tokio::fs::read_to_string(path).await.map_err(|e| e.to_string())
    }
}

pub struct WriteFileTool;

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write content to a file at the given path, creating parent directories as needed."
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "Path to the file." },
                "content": { "type": "string", "description": "Content to write." }
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<String, String> {
        let path = arguments
            .get("path")
            .and_then(|v| v.as_str())
            .ok_or("missing required parameter: path")?;
        let content = arguments
            .get("content")
            .and_then(|v| v.as_str())
            .ok_or("missing required parameter: content")?;

        if let Some(parent) = std::path::Path::new(path).parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| e.to_string())?;
        }
        tokio::fs::write(path, content).await.map_err(|e| e.to_string())?;
        Ok(format!("wrote {} bytes to {path}", content.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.txt");
        let write = WriteFileTool;
        write
            .execute(serde_json::json!({"path": path.to_str().unwrap(), "content": "hello"}))
            .await
            .unwrap();

        let read = ReadFileTool;
        let result = read.execute(serde_json::json!({"path": path.to_str().unwrap()})).await.unwrap();
        assert_eq!(result, "hello");
    }

    #[tokio::test]
    async fn read_missing_file_is_an_error() {
        let read = ReadFileTool;
        let result = read.execute(serde_json::json!({"path": "/nonexistent/path/x"})).await;
        assert!(result.is_err());
    }
}
