use crate::loader::SkillsLoader;

/// Renders the `SkillsBlock` of the system prompt: a compact index of every
/// discovered skill plus the full body of every `always = true` skill.
pub async fn build_skills_block(loader: &SkillsLoader) -> String {
    let skills = loader.list_skills();
    if skills.is_empty() {
        return String::new();
    }

    let mut out = String::from("\n\n## Available skills (use skill_read for full instructions)\n");
    for skill in &skills {
        out.push_str(&format!("- {}: {}\n", skill.name, skill.description));
    }

    for skill in skills.iter().filter(|s| s.always) {
        if let Ok(body) = loader.load_skill_body(&skill.name).await {
            out.push_str(&format!("\n### {}\n{}\n", skill.name, body.trim()));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_skill(dir: &std::path::Path, name: &str, description: &str, always: bool) {
        let skill_dir = dir.join(name);
        std::fs::create_dir_all(&skill_dir).unwrap();
        let mut f = std::fs::File::create(skill_dir.join("SKILL.md")).unwrap();
        write!(
            f,
            "---\nname: {name}\ndescription: {description}\nalways: {always}\n---\nBody for {name}\n"
        )
        .unwrap();
    }

    #[tokio::test]
    async fn empty_skills_produce_empty_block() {
        let dir = tempfile::tempdir().unwrap();
        let loader = SkillsLoader::new(vec![dir.path().to_path_buf()]);
        assert!(build_skills_block(&loader).await.is_empty());
    }

    #[tokio::test]
    async fn always_skill_body_is_inlined() {
        let dir = tempfile::tempdir().unwrap();
        write_skill(dir.path(), "gmail-setup", "configure gmail", true);
        let loader = SkillsLoader::new(vec![dir.path().to_path_buf()]);
        let block = build_skills_block(&loader).await;
        assert!(block.contains("gmail-setup: configure gmail"));
        assert!(block.contains("Body for gmail-setup"));
    }

    #[tokio::test]
    async fn non_always_skill_contributes_only_metadata() {
        let dir = tempfile::tempdir().unwrap();
        write_skill(dir.path(), "optional", "not always on", false);
        let loader = SkillsLoader::new(vec![dir.path().to_path_buf()]);
        let block = build_skills_block(&loader).await;
        assert!(block.contains("optional: not always on"));
        assert!(!block.contains("Body for optional"));
    }
}
