use chrono::{Duration, Utc};
use squidbot_types::{Message, Role};

use crate::error::Result;
use crate::store::MemoryStore;

const MAX_LINE_CHARS: usize = 300;
const SEARCHABLE_ROLES: [Role; 4] = [Role::User, Role::Assistant, Role::ToolCall, Role::ToolResult];

/// One search hit with up to one message of surrounding context.
#[derive(Debug, Clone)]
pub struct SearchMatch {
    pub before: Option<Message>,
    pub hit: Message,
    pub after: Option<Message>,
}

/// Single pass over history: records each case-insensitive substring match
/// in the searchable role set with ±1 message of context, skipping
/// messages older than `days` when set. Stops once `max_results` matches
/// are recorded and the trailing context slot has been filled.
pub fn search_stream(
    store: &MemoryStore,
    query: &str,
    days: Option<i64>,
    max_results: usize,
) -> Result<Vec<SearchMatch>> {
    let history = store.load_history(None)?;
    let cutoff = days.map(|d| Utc::now() - Duration::days(d));
    let query_lower = query.to_lowercase();

    let mut matches: Vec<SearchMatch> = Vec::new();
    let mut prev: Option<Message> = None;
    let mut capture_next = false;

    for message in history {
        if let Some(cutoff) = cutoff {
            if let Some(ts) = message.timestamp {
                if ts < cutoff {
                    prev = Some(message);
                    continue;
                }
            }
        }

        if is_searchable(message.role) && message.content.to_lowercase().contains(&query_lower) {
            matches.push(SearchMatch {
                before: prev.clone(),
                hit: message.clone(),
                after: None,
            });
            capture_next = true;
        } else if capture_next {
            if let Some(last) = matches.last_mut() {
                last.after = Some(message.clone());
            }
            capture_next = false;
        }

        prev = Some(message);

        if matches.len() >= max_results && !capture_next {
            break;
        }
    }

    Ok(matches)
}

fn is_searchable(role: Role) -> bool {
    SEARCHABLE_ROLES.contains(&role)
}

fn role_label(role: Role) -> &'static str {
    match role {
        Role::User => "USER",
        Role::Assistant => "ASSISTANT",
        Role::ToolCall => "TOOL CALL",
        Role::ToolResult => "TOOL RESULT",
        Role::Tool => "TOOL",
        Role::System => "SYSTEM",
    }
}

fn truncate_line(content: &str) -> String {
    if content.chars().count() <= MAX_LINE_CHARS {
        content.to_string()
    } else {
        let truncated: String = content.chars().take(MAX_LINE_CHARS).collect();
        format!("{truncated}…")
    }
}

fn render_context_line(message: &Message) -> Option<String> {
    if !is_searchable(message.role) || message.content.is_empty() {
        return None;
    }
    Some(format!("{}: {}", role_label(message.role), truncate_line(&message.content)))
}

/// Renders matches into the human-readable text block returned by history
/// search, bolding the hit line with markdown emphasis.
pub fn render_matches(matches: &[SearchMatch]) -> String {
    if matches.is_empty() {
        return "No matches found.".to_string();
    }

    let mut blocks = Vec::with_capacity(matches.len());
    for m in matches {
        let mut lines = Vec::new();
        if let Some(before) = &m.before {
            if let Some(line) = render_context_line(before) {
                lines.push(line);
            }
        }
        lines.push(format!("**{}: {}**", role_label(m.hit.role), truncate_line(&m.hit.content)));
        if let Some(after) = &m.after {
            if let Some(line) = render_context_line(after) {
                lines.push(line);
            }
        }
        blocks.push(lines.join("\n"));
    }
    blocks.join("\n---\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, MemoryStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn finds_case_insensitive_match_with_context() {
        let (_dir, store) = store();
        store.append_message(&Message::user("tell me about rust")).unwrap();
        store.append_message(&Message::assistant("Rust is a systems language")).unwrap();
        store.append_message(&Message::user("thanks")).unwrap();

        let matches = search_stream(&store, "RUST", None, 5).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].hit.content, "tell me about rust");
        assert!(matches[0].after.is_some());
        assert_eq!(matches[0].after.as_ref().unwrap().content, "Rust is a systems language");
    }

    #[test]
    fn stops_after_max_results() {
        let (_dir, store) = store();
        for i in 0..10 {
            store.append_message(&Message::user(format!("match {i}"))).unwrap();
        }
        let matches = search_stream(&store, "match", None, 3).unwrap();
        assert_eq!(matches.len(), 3);
    }

    #[test]
    fn tool_events_are_searchable() {
        let (_dir, store) = store();
        store.append_message(&Message::tool_call_event("shell(cmd='ls -la')")).unwrap();
        let matches = search_stream(&store, "shell", None, 5).unwrap();
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn render_bolds_hit_line_and_truncates() {
        let long = "x".repeat(400);
        let matches = vec![SearchMatch {
            before: None,
            hit: Message::user(long),
            after: None,
        }];
        let rendered = render_matches(&matches);
        assert!(rendered.starts_with("**USER: "));
        assert!(rendered.contains('…'));
    }

    #[test]
    fn no_matches_renders_friendly_message() {
        assert_eq!(render_matches(&[]), "No matches found.");
    }
}
