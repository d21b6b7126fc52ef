use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Instant, SystemTime};

use squidbot_types::SkillMetadata;
use tracing::debug;

use crate::error::{Result, SkillsError};
use crate::parse::{check_requirements, parse_skill_md};

const LIST_TTL: std::time::Duration = std::time::Duration::from_secs(2);

struct ListCache {
    skills: Vec<SkillMetadata>,
    computed_at: Instant,
    known_mtimes: HashMap<PathBuf, SystemTime>,
}

/// Discovers `SKILL.md` documents across an ordered list of search
/// directories (later directories override earlier ones by name), with a
/// 2s TTL list cache that also short-circuits on any watched file's mtime
/// changing, and a body cache keyed by `(path, mtime)`.
pub struct SkillsLoader {
    search_dirs: Vec<PathBuf>,
    list_cache: Mutex<Option<ListCache>>,
    body_cache: Mutex<HashMap<PathBuf, (SystemTime, String)>>,
}

impl SkillsLoader {
    /// `search_dirs` are scanned in order; a skill found in a later
    /// directory with the same name as one already found replaces it (last
    /// wins), so callers should list the lowest-priority directory first
    /// (e.g. bundled/workspace skills before user skills).
    pub fn new(search_dirs: Vec<PathBuf>) -> Self {
        Self {
            search_dirs,
            list_cache: Mutex::new(None),
            body_cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn list_skills(&self) -> Vec<SkillMetadata> {
        let mut cache = self.list_cache.lock().unwrap();
        if let Some(existing) = cache.as_ref() {
            let ttl_fresh = existing.computed_at.elapsed() < LIST_TTL;
            let mtimes_unchanged = existing
                .known_mtimes
                .iter()
                .all(|(path, mtime)| current_mtime(path) == Some(*mtime));
            if ttl_fresh && mtimes_unchanged {
                return existing.skills.clone();
            }
        }

        let (skills, known_mtimes) = self.scan();
        let result = skills.clone();
        *cache = Some(ListCache {
            skills,
            computed_at: Instant::now(),
            known_mtimes,
        });
        result
    }

    fn scan(&self) -> (Vec<SkillMetadata>, HashMap<PathBuf, SystemTime>) {
        let mut positions = HashMap::new();
        let mut skills = Vec::new();
        let mut known_mtimes = HashMap::new();

        for dir in &self.search_dirs {
            self.scan_dir(dir, &mut positions, &mut skills, &mut known_mtimes);
        }
        (skills, known_mtimes)
    }

    fn scan_dir(
        &self,
        dir: &Path,
        positions: &mut HashMap<String, usize>,
        skills: &mut Vec<SkillMetadata>,
        known_mtimes: &mut HashMap<PathBuf, SystemTime>,
    ) {
        if !dir.is_dir() {
            return;
        }
        let entries = match std::fs::read_dir(dir) {
            Ok(e) => e,
            Err(_) => return,
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let skill_file = path.join("SKILL.md");
            if !skill_file.is_file() {
                continue;
            }

            if let Ok(mtime) = mtime_of(&skill_file) {
                known_mtimes.insert(skill_file.clone(), mtime);
            }

            let raw = match std::fs::read_to_string(&skill_file) {
                Ok(s) => s,
                Err(_) => continue,
            };

            let (meta, requires, _body) = match parse_skill_md(&raw, &skill_file) {
                Some(parsed) => parsed,
                None => {
                    debug!(path = %skill_file.display(), "skipping skill: invalid frontmatter");
                    continue;
                }
            };

            if !check_requirements(&requires) {
                debug!(name = %meta.name, "skipping skill: requirements not met");
                continue;
            }

            match positions.get(&meta.name) {
                Some(&idx) => skills[idx] = meta,
                None => {
                    positions.insert(meta.name.clone(), skills.len());
                    skills.push(meta);
                }
            }
        }
    }

    /// Reads a skill's full body, honoring the mtime-keyed body cache.
    /// Performed on a blocking-safe path (`tokio::task::spawn_blocking`) so
    /// large skill documents don't stall the async reactor.
    pub async fn load_skill_body(&self, name: &str) -> Result<String> {
        let metadata = self
            .list_skills()
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| SkillsError::NotFound { name: name.to_string() })?;

        let path = metadata.path.clone();
        let mtime = mtime_of(&path).map_err(|e| SkillsError::Io { path: path.display().to_string(), source: e })?;

        {
            let cache = self.body_cache.lock().unwrap();
            if let Some((cached_mtime, body)) = cache.get(&path) {
                if *cached_mtime == mtime {
                    return Ok(body.clone());
                }
            }
        }

        let read_path = path.clone();
        let raw = tokio::task::spawn_blocking(move || std::fs::read_to_string(&read_path))
            .await
            .map_err(|e| SkillsError::Io { path: path.display().to_string(), source: std::io::Error::other(e) })?
            .map_err(|e| SkillsError::Io { path: path.display().to_string(), source: e })?;

        let (_meta, _requires, body) = parse_skill_md(&raw, &path)
            .ok_or_else(|| SkillsError::NotFound { name: name.to_string() })?;

        self.body_cache.lock().unwrap().insert(path, (mtime, body.clone()));
        Ok(body)
    }
}

fn mtime_of(path: &Path) -> std::io::Result<SystemTime> {
    std::fs::metadata(path)?.modified()
}

fn current_mtime(path: &Path) -> Option<SystemTime> {
    mtime_of(path).ok()
}
