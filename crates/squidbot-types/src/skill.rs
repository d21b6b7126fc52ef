use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Metadata parsed from a skill's `SKILL.md` YAML front-matter.
///
/// Skills with `always = true` are injected in full into every system
/// prompt; others only contribute their metadata to the skill index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillMetadata {
    pub name: String,
    pub description: String,
    pub path: PathBuf,
    #[serde(default)]
    pub always: bool,
    #[serde(default)]
    pub requires: serde_json::Value,
}
