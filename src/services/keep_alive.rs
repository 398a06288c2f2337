use chrono::{DateTime, Duration, NaiveTime, Utc};
use futures::future::{BoxFuture, FutureExt};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::backend::Row;
use crate::services::data_service::{DataError, DataService};

pub const KEEP_ALIVE_JOB: &str = "keep_alive";

pub type JobTask = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Writes an empty row so the hosted backend does not idle down.
#[derive(Clone)]
pub struct KeepAliveService {
    data: DataService,
    table: String,
}

impl KeepAliveService {
    pub fn new(data: DataService, table: impl Into<String>) -> Self {
        Self {
            data,
            table: table.into(),
        }
    }

    pub async fn ping(&self) -> Result<(), DataError> {
        match self.data.insert(&self.table, Row::new()).await {
            Ok(_) => {
                tracing::info!(table = %self.table, "Keep-alive executed");
                Ok(())
            }
            Err(e) => {
                tracing::error!(table = %self.table, error = %e, details = ?e.details(), "Keep-alive failed");
                Err(e)
            }
        }
    }

    /// Task for the scheduler; failures are already logged by `ping`.
    pub fn task(&self) -> JobTask {
        let service = self.clone();
        Arc::new(move || {
            let service = service.clone();
            async move {
                let _ = service.ping().await;
            }
            .boxed()
        })
    }
}

struct ScheduledJob {
    at: NaiveTime,
    handle: JoinHandle<()>,
}

/// Named daily jobs, each on its own tokio task.
#[derive(Default)]
pub struct Scheduler {
    jobs: RwLock<HashMap<String, ScheduledJob>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` without touching anything if `name` is already scheduled.
    pub async fn schedule_daily(&self, name: &str, at: NaiveTime, task: JobTask) -> bool {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(name) {
            tracing::debug!(job = %name, "Job already scheduled");
            return false;
        }

        let job_name = name.to_string();
        let handle = tokio::spawn(async move {
            let mut next = next_daily_run(Utc::now(), at);
            loop {
                // tokio sleeps on the monotonic clock; re-check the wall clock on wake
                if let Some(wait) = time_until(Utc::now(), next) {
                    tracing::debug!(job = %job_name, next_run = %next, "Waiting for next run");
                    tokio::time::sleep(wait).await;
                    continue;
                }

                tracing::info!(job = %job_name, "Running scheduled job");
                task().await;
                next = following_run(Utc::now(), next, at);
            }
        });

        jobs.insert(name.to_string(), ScheduledJob { at, handle });
        tracing::info!(job = %name, at = %at, "Scheduled daily job");
        true
    }

    pub async fn next_run(&self, name: &str) -> Option<DateTime<Utc>> {
        let jobs = self.jobs.read().await;
        jobs.get(name).map(|job| next_daily_run(Utc::now(), job.at))
    }

    pub async fn shutdown(&self) {
        let mut jobs = self.jobs.write().await;
        for (name, job) in jobs.drain() {
            job.handle.abort();
            tracing::info!(job = %name, "Stopped scheduled job");
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        for job in self.jobs.get_mut().values() {
            job.handle.abort();
        }
    }
}

/// First instant strictly after `now` whose UTC time of day is `at`.
pub fn next_daily_run(now: DateTime<Utc>, at: NaiveTime) -> DateTime<Utc> {
    let today = now.date_naive().and_time(at).and_utc();
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

/// `None` once `next` has been reached by the wall clock.
fn time_until(now: DateTime<Utc>, next: DateTime<Utc>) -> Option<std::time::Duration> {
    if now >= next {
        None
    } else {
        Some((next - now).to_std().unwrap_or_default())
    }
}

/// Target after a run of `previous`; always later than `previous`, even if the clock lags.
fn following_run(now: DateTime<Utc>, previous: DateTime<Utc>, at: NaiveTime) -> DateTime<Utc> {
    next_daily_run(now.max(previous), at)
}
