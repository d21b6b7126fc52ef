use std::sync::Arc;

use async_trait::async_trait;

use crate::loader::SkillsLoader;

/// Tool that retrieves the full body of a named skill. Registered globally
/// (not per-session) since skill bodies carry no session-specific state.
pub struct SkillReadTool {
    loader: Arc<SkillsLoader>,
}

impl SkillReadTool {
    pub fn new(loader: Arc<SkillsLoader>) -> Self {
        Self { loader }
    }
}

#[async_trait]
impl squidbot_tools::Tool for SkillReadTool {
    fn name(&self) -> &str {
        "skill_read"
    }

    fn description(&self) -> &str {
        "Read the full instructions for a named skill."
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "name": { "type": "string", "description": "The skill's name." }
            },
            "required": ["name"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<String, String> {
        let name = arguments
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or("missing required parameter: name")?;

        match self.loader.load_skill_body(name).await {
            Ok(body) => Ok(body),
            Err(_) => {
                let available = self
                    .loader
                    .list_skills()
                    .into_iter()
                    .map(|s| s.name)
                    .collect::<Vec<_>>()
                    .join(", ");
                Err(format!("no skill named '{name}'. Available: {available}"))
            }
        }
    }
}
