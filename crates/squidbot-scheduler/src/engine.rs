use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use squidbot_memory::MemoryStore;
use squidbot_types::CronJob;
use tokio::sync::watch;
use tracing::{error, warn};
use uuid::Uuid;

use crate::dispatcher::JobDispatcher;
use crate::error::{Result, SchedulerError};
use crate::schedule::{is_due, parse_schedule, parse_timezone};

const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Persists `CronJob`s to the memory store's `cron/jobs.json` and drives a
/// 1-second tick loop that dispatches due jobs without awaiting them.
pub struct SchedulerEngine {
    store: MemoryStore,
    dispatcher: Arc<dyn JobDispatcher>,
}

impl SchedulerEngine {
    pub fn new(store: MemoryStore, dispatcher: Arc<dyn JobDispatcher>) -> Self {
        Self { store, dispatcher }
    }

    pub fn list_jobs(&self) -> Result<Vec<CronJob>> {
        Ok(self.store.load_cron_jobs()?)
    }

    /// Validates the schedule expression, assigns an id if absent, and
    /// appends the job. Returns the stored job.
    pub fn add_job(&self, mut job: CronJob) -> Result<CronJob> {
        parse_schedule(&job.schedule).map_err(|_| SchedulerError::InvalidSchedule {
            expr: job.schedule.clone(),
            reason: "could not parse cron or interval expression".to_string(),
        })?;
        if job.id.is_empty() {
            job.id = Uuid::new_v4().to_string();
        }
        let mut jobs = self.store.load_cron_jobs()?;
        jobs.push(job.clone());
        self.store.save_cron_jobs(&jobs)?;
        Ok(job)
    }

    pub fn remove_job(&self, id: &str) -> Result<()> {
        let mut jobs = self.store.load_cron_jobs()?;
        let before = jobs.len();
        jobs.retain(|j| j.id != id);
        if jobs.len() == before {
            return Err(SchedulerError::JobNotFound { id: id.to_string() });
        }
        self.store.save_cron_jobs(&jobs)?;
        Ok(())
    }

    pub fn set_enabled(&self, id: &str, enabled: bool) -> Result<()> {
        let mut jobs = self.store.load_cron_jobs()?;
        let job = jobs.iter_mut().find(|j| j.id == id).ok_or_else(|| SchedulerError::JobNotFound { id: id.to_string() })?;
        job.enabled = enabled;
        self.store.save_cron_jobs(&jobs)?;
        Ok(())
    }

    /// Runs until `shutdown` broadcasts `true`. One tick every second;
    /// errors inside a tick are logged and never stop the loop.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(TICK_PERIOD);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(err) = self.tick() {
                        error!(error = %err, "scheduler tick failed");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    }

    /// Reloads jobs, fires any that are due, persists updated `last_run`s in
    /// one atomic rewrite, and hands dispatch off without awaiting it.
    fn tick(&self) -> Result<()> {
        let mut jobs = self.store.load_cron_jobs()?;
        let now = Utc::now();
        let mut changed = false;

        for job in jobs.iter_mut() {
            if !job.enabled {
                continue;
            }
            let schedule = match parse_schedule(&job.schedule) {
                Ok(s) => s,
                Err(err) => {
                    warn!(job_id = %job.id, error = %err, "skipping job with invalid schedule");
                    continue;
                }
            };
            let timezone = parse_timezone(&job.timezone);
            if !is_due(&schedule, now, job.last_run, timezone) {
                continue;
            }

            job.last_run = Some(now);
            changed = true;

            let dispatcher = self.dispatcher.clone();
            let fired = job.clone();
            tokio::spawn(async move {
                dispatcher.dispatch(fired).await;
            });
        }

        if changed {
            self.store.save_cron_jobs(&jobs)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingDispatcher {
        fired: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl JobDispatcher for RecordingDispatcher {
        async fn dispatch(&self, job: CronJob) {
            self.fired.lock().unwrap().push(job.id);
        }
    }

    fn job(id: &str, schedule: &str) -> CronJob {
        CronJob {
            id: id.to_string(),
            name: "test job".to_string(),
            schedule: schedule.to_string(),
            message: "good morning".to_string(),
            channel: "cli:local".to_string(),
            enabled: true,
            timezone: "UTC".to_string(),
            last_run: None,
        }
    }

    #[test]
    fn add_job_rejects_invalid_schedule() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new(dir.path());
        let dispatcher = Arc::new(RecordingDispatcher { fired: Mutex::new(Vec::new()) });
        let engine = SchedulerEngine::new(store, dispatcher);
        let result = engine.add_job(job("j1", "not a cron"));
        assert!(result.is_err());
    }

    #[test]
    fn add_list_remove_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new(dir.path());
        let dispatcher = Arc::new(RecordingDispatcher { fired: Mutex::new(Vec::new()) });
        let engine = SchedulerEngine::new(store, dispatcher);

        engine.add_job(job("j1", "0 9 * * *")).unwrap();
        assert_eq!(engine.list_jobs().unwrap().len(), 1);

        engine.set_enabled("j1", false).unwrap();
        assert!(!engine.list_jobs().unwrap()[0].enabled);

        engine.remove_job("j1").unwrap();
        assert!(engine.list_jobs().unwrap().is_empty());
        assert!(engine.remove_job("missing").is_err());
    }

    #[tokio::test]
    async fn tick_dispatches_due_job_and_persists_last_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new(dir.path());
        let dispatcher = Arc::new(RecordingDispatcher { fired: Mutex::new(Vec::new()) });
        let engine = SchedulerEngine::new(store, dispatcher.clone());
        engine.add_job(job("j1", "* * * * *")).unwrap();

        engine.tick().unwrap();
        tokio::task::yield_now().await;

        assert_eq!(dispatcher.fired.lock().unwrap().len(), 1);
        let jobs = engine.list_jobs().unwrap();
        assert!(jobs[0].last_run.is_some());
    }

    #[tokio::test]
    async fn tick_does_not_refire_within_the_same_minute() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new(dir.path());
        let dispatcher = Arc::new(RecordingDispatcher { fired: Mutex::new(Vec::new()) });
        let engine = SchedulerEngine::new(store, dispatcher.clone());
        engine.add_job(job("j1", "* * * * *")).unwrap();

        engine.tick().unwrap();
        engine.tick().unwrap();
        tokio::task::yield_now().await;

        assert_eq!(dispatcher.fired.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn disabled_job_never_fires() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new(dir.path());
        let dispatcher = Arc::new(RecordingDispatcher { fired: Mutex::new(Vec::new()) });
        let engine = SchedulerEngine::new(store, dispatcher.clone());
        engine.add_job(job("j1", "* * * * *")).unwrap();
        engine.set_enabled("j1", false).unwrap();

        engine.tick().unwrap();
        tokio::task::yield_now().await;

        assert!(dispatcher.fired.lock().unwrap().is_empty());
    }
}
