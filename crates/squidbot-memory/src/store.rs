use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use fs4::fs_std::FileExt;
use squidbot_types::Message;
use tracing::warn;

use crate::atomic::{read_or_empty, write_atomic};
use crate::error::Result;

const TAIL_BLOCK_SIZE: u64 = 64 * 1024;

/// The append-only JSON-lines history plus the small set of plain-file
/// documents that live alongside it, rooted at a single base directory.
///
/// Layout (frozen):
/// ```text
/// <base>/history.jsonl
/// <base>/history.meta.json
/// <base>/memory/summary.md
/// <base>/workspace/MEMORY.md
/// <base>/cron/jobs.json
/// <base>/sessions/<safe-id>.meta.json   (legacy, read-only fallback)
/// ```
#[derive(Debug, Clone)]
pub struct MemoryStore {
    base: PathBuf,
}

impl MemoryStore {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn history_path(&self) -> PathBuf {
        self.base.join("history.jsonl")
    }

    fn history_meta_path(&self) -> PathBuf {
        self.base.join("history.meta.json")
    }

    fn memory_doc_path(&self) -> PathBuf {
        self.base.join("workspace").join("MEMORY.md")
    }

    fn summary_path(&self) -> PathBuf {
        self.base.join("memory").join("summary.md")
    }

    fn cron_jobs_path(&self) -> PathBuf {
        self.base.join("cron").join("jobs.json")
    }

    fn legacy_session_meta_path(&self, session_id: &str) -> PathBuf {
        let safe = session_id.replace(':', "__");
        self.base.join("sessions").join(format!("{safe}.meta.json"))
    }

    /// Appends one JSON line under an exclusive advisory lock held across
    /// the whole write, then flushes. The lock is best-effort: if the
    /// platform refuses it the write still proceeds, matching readers'
    /// own best-effort posture.
    pub fn append_message(&self, message: &Message) -> Result<()> {
        let path = self.history_path();
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| crate::error::MemoryError::io(dir.display().to_string(), e))?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| crate::error::MemoryError::io(path.display().to_string(), e))?;

        if let Err(e) = FileExt::lock_exclusive(&file) {
            warn!(path = %path.display(), error = %e, "failed to acquire exclusive lock on history.jsonl, writing unlocked");
        }

        let line = serde_json::to_string(message)?;
        let result = (|| -> std::io::Result<()> {
            file.write_all(line.as_bytes())?;
            file.write_all(b"\n")?;
            file.flush()
        })();

        let _ = FileExt::unlock(&file);
        result.map_err(|e| crate::error::MemoryError::io(path.display().to_string(), e))?;
        Ok(())
    }

    /// Loads history. `last_n = None` returns the full stream; `Some(n)` with
    /// `n <= 0` returns empty; `Some(n)` with `n > 0` tail-reads backward in
    /// 64 KiB blocks until at least `n` valid messages (or BOF) are found.
    pub fn load_history(&self, last_n: Option<i64>) -> Result<Vec<Message>> {
        match last_n {
            None => self.load_history_full(),
            Some(n) if n <= 0 => Ok(Vec::new()),
            Some(n) => self.load_history_tail(n as usize),
        }
    }

    fn load_history_full(&self) -> Result<Vec<Message>> {
        let path = self.history_path();
        let mut file = match std::fs::File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(crate::error::MemoryError::io(path.display().to_string(), e)),
        };

        let _ = FileExt::lock_shared(&file);
        let mut raw = Vec::new();
        let result = file.read_to_end(&mut raw);
        let _ = FileExt::unlock(&file);

        result.map_err(|e| crate::error::MemoryError::io(path.display().to_string(), e))?;
        Ok(parse_lines(&raw))
    }

    fn load_history_tail(&self, n: usize) -> Result<Vec<Message>> {
        let path = self.history_path();
        let mut file = match std::fs::File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(crate::error::MemoryError::io(path.display().to_string(), e)),
        };

        let _ = FileExt::lock_shared(&file);

        let file_len = file
            .metadata()
            .map_err(|e| crate::error::MemoryError::io(path.display().to_string(), e))?
            .len();

        let mut collected: Vec<Message> = Vec::new();
        let mut offset = file_len;
        loop {
            let block_start = offset.saturating_sub(TAIL_BLOCK_SIZE);
            let read_len = (offset - block_start) as usize;
            let mut buf = vec![0u8; read_len];
            file.seek(SeekFrom::Start(block_start))
                .map_err(|e| crate::error::MemoryError::io(path.display().to_string(), e))?;
            file.read_exact(&mut buf)
                .map_err(|e| crate::error::MemoryError::io(path.display().to_string(), e))?;

            collected = parse_lines(&buf);
            offset = block_start;

            if collected.len() >= n || offset == 0 {
                break;
            }
        }

        let _ = FileExt::unlock(&file);

        if collected.len() > n {
            let skip = collected.len() - n;
            collected.drain(0..skip);
        }
        Ok(collected)
    }

    pub fn load_memory_doc(&self) -> Result<String> {
        read_or_empty(&self.memory_doc_path())
    }

    pub fn save_memory_doc(&self, text: &str) -> Result<()> {
        write_atomic(&self.memory_doc_path(), text)
    }

    pub fn load_summary(&self) -> Result<String> {
        read_or_empty(&self.summary_path())
    }

    /// Appends a blank-line-separated block to the summary document via an
    /// atomic rewrite of the whole file.
    pub fn append_summary(&self, chunk: &str) -> Result<()> {
        let existing = self.load_summary()?;
        let combined = if existing.trim().is_empty() {
            chunk.to_string()
        } else {
            format!("{}\n\n{}", existing.trim_end(), chunk)
        };
        write_atomic(&self.summary_path(), &combined)
    }

    /// Replaces the summary document wholesale, used by meta-consolidation.
    pub fn replace_summary(&self, text: &str) -> Result<()> {
        write_atomic(&self.summary_path(), text)
    }

    pub fn load_cron_jobs(&self) -> Result<Vec<squidbot_types::CronJob>> {
        let path = self.cron_jobs_path();
        let raw = match std::fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(crate::error::MemoryError::io(path.display().to_string(), e)),
        };
        match serde_json::from_str(&raw) {
            Ok(jobs) => Ok(jobs),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cron jobs file is corrupt, treating as empty");
                Ok(Vec::new())
            }
        }
    }

    pub fn save_cron_jobs(&self, jobs: &[squidbot_types::CronJob]) -> Result<()> {
        let json = serde_json::to_string_pretty(jobs)?;
        write_atomic(&self.cron_jobs_path(), &json)
    }

    pub fn load_consolidated_cursor(&self) -> Result<i64> {
        let path = self.history_meta_path();
        let raw = match std::fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(crate::error::MemoryError::io(path.display().to_string(), e)),
        };
        #[derive(serde::Deserialize)]
        struct Meta {
            last_consolidated: i64,
        }
        match serde_json::from_str::<Meta>(&raw) {
            Ok(m) => Ok(m.last_consolidated),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "history.meta.json is corrupt, defaulting cursor to 0");
                Ok(0)
            }
        }
    }

    pub fn save_consolidated_cursor(&self, cursor: i64) -> Result<()> {
        let json = serde_json::json!({ "last_consolidated": cursor }).to_string();
        write_atomic(&self.history_meta_path(), &json)
    }

    /// One-time fallback read of a legacy per-session cursor file, used
    /// only if `history.meta.json` is absent.
    pub fn load_legacy_session_cursor(&self, session_id: &str) -> Result<Option<i64>> {
        let path = self.legacy_session_meta_path(session_id);
        let raw = match std::fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(crate::error::MemoryError::io(path.display().to_string(), e)),
        };
        #[derive(serde::Deserialize)]
        struct LegacyMeta {
            last_consolidated: i64,
        }
        match serde_json::from_str::<LegacyMeta>(&raw) {
            Ok(m) => Ok(Some(m.last_consolidated)),
            Err(_) => Ok(None),
        }
    }
}

/// Parses newline-separated JSON messages, skipping malformed or
/// invalid-UTF-8 lines rather than failing the whole read. Returns a single
/// summarized warning with a preview of the first skipped line.
fn parse_lines(raw: &[u8]) -> Vec<Message> {
    let text = String::from_utf8_lossy(raw);
    let mut out = Vec::new();
    let mut skipped = 0usize;
    let mut first_bad_preview: Option<String> = None;

    for line in text.split('\n') {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Message>(line) {
            Ok(msg) => out.push(msg),
            Err(_) => {
                skipped += 1;
                if first_bad_preview.is_none() {
                    first_bad_preview = Some(line.chars().take(120).collect());
                }
            }
        }
    }

    if skipped > 0 {
        warn!(
            skipped,
            preview = first_bad_preview.as_deref().unwrap_or(""),
            "skipped malformed history lines"
        );
    }

    out
}
