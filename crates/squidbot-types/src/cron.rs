use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A scheduled dispatch into the agent loop.
///
/// `schedule` is either five-field cron (`m h dom mon dow`) or the interval
/// form `every N` (N seconds); parsing and due-evaluation live in
/// `squidbot-scheduler`, this type is pure data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CronJob {
    pub id: String,
    pub name: String,
    pub schedule: String,
    pub message: String,
    pub channel: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub last_run: Option<DateTime<Utc>>,
}

fn default_enabled() -> bool {
    true
}

fn default_timezone() -> String {
    "UTC".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_last_run_defaults_to_none_on_load() {
        let json = r#"{"id":"j1","name":"morning","schedule":"0 9 * * *","message":"hi","channel":"cli:local"}"#;
        let job: CronJob = serde_json::from_str(json).unwrap();
        assert!(job.last_run.is_none());
        assert!(job.enabled);
        assert_eq!(job.timezone, "UTC");
    }
}
