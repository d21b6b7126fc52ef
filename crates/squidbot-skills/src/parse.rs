use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use squidbot_types::SkillMetadata;

/// Gating requirements parsed out of a skill's YAML frontmatter. Stored
/// separately from `SkillMetadata.requires` (which keeps the raw JSON
/// mapping per the data model) so gating checks have typed fields.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Requirements {
    #[serde(default)]
    pub bins: Vec<String>,
    #[serde(default)]
    pub env: Vec<String>,
    #[serde(default)]
    pub os: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Frontmatter {
    name: String,
    description: String,
    #[serde(default)]
    always: bool,
    #[serde(default)]
    requires: Requirements,
}

/// Extracts YAML frontmatter between `---` delimiters and the markdown body
/// after the closing delimiter.
pub fn parse_skill_md(content: &str, path: &Path) -> Option<(SkillMetadata, Requirements, String)> {
    let trimmed = content.trim_start();
    if !trimmed.starts_with("---") {
        return None;
    }
    let after_first = &trimmed[3..];
    let closing_idx = after_first.find("\n---")?;
    let yaml_block = &after_first[..closing_idx];
    let body_start = closing_idx + 4;
    let body = if body_start < after_first.len() {
        after_first[body_start..].trim_start_matches('\n').to_string()
    } else {
        String::new()
    };

    let frontmatter: Frontmatter = serde_yaml::from_str(yaml_block).ok()?;
    let requires_json = serde_json::to_value(&frontmatter.requires).ok()?;
    let metadata = SkillMetadata {
        name: frontmatter.name,
        description: frontmatter.description,
        path: path.to_path_buf(),
        always: frontmatter.always,
        requires: requires_json,
    };
    Some((metadata, frontmatter.requires, body))
}

/// True if every gating requirement is satisfied on the current host.
pub fn check_requirements(req: &Requirements) -> bool {
    if !req.os.is_empty() {
        let current_os = std::env::consts::OS;
        if !req.os.iter().any(|os| os.to_lowercase() == current_os) {
            return false;
        }
    }
    for var in &req.env {
        if std::env::var(var).is_err() {
            return false;
        }
    }
    for bin in &req.bins {
        if which(bin).is_none() {
            return false;
        }
    }
    true
}

fn which(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var("PATH").ok()?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}
