//! Foreground cron scheduler
//!
//! Runs are executed one at a time inside a single task, so a pipeline is
//! never run twice concurrently from here. A failed run raises an alert and
//! the scheduler moves on to the next fire time.

use std::future::Future;
use std::time::Duration;

use chrono::Local;
use eyre::Result;
use tracing::{debug, info, warn};

use crate::config::ScheduleConfig;
use crate::monitoring::alert_on_failure;
use crate::pipeline::PipelineKind;

mod job;

pub use job::{ScheduledJob, next_due, normalize_cron};

pub struct Scheduler {
    jobs: Vec<ScheduledJob>,
}

impl Scheduler {
    pub fn new(jobs: Vec<ScheduledJob>) -> Self {
        debug!(jobs = jobs.len(), "Scheduler::new: called");
        Self { jobs }
    }

    /// Build from config entries; any invalid expression is an error
    pub fn from_config(entries: &[ScheduleConfig]) -> Result<Self> {
        let jobs = entries.iter().map(ScheduledJob::from_config).collect::<Result<Vec<_>>>()?;
        Ok(Self::new(jobs))
    }

    pub fn jobs(&self) -> &[ScheduledJob] {
        &self.jobs
    }

    /// Fire jobs until `shutdown` completes or no job has a future fire time
    ///
    /// `shutdown` is only observed between runs.
    pub async fn run<F, Fut, S>(&self, mut run_pipeline: F, shutdown: S) -> Result<()>
    where
        F: FnMut(PipelineKind) -> Fut,
        Fut: Future<Output = Result<()>>,
        S: Future<Output = ()>,
    {
        for job in &self.jobs {
            info!(pipeline = %job.pipeline, cron = %job.expression, "Scheduled");
        }
        tokio::pin!(shutdown);

        loop {
            let now = Local::now();
            let Some((when, due)) = next_due(&self.jobs, &now) else {
                warn!("No upcoming fire times, scheduler stopping");
                return Ok(());
            };
            let wait = (when - now).to_std().unwrap_or(Duration::ZERO);
            debug!(%when, wait_secs = wait.as_secs(), "Scheduler::run: sleeping");

            tokio::select! {
                _ = &mut shutdown => {
                    info!("Scheduler shutting down");
                    return Ok(());
                }
                _ = tokio::time::sleep(wait) => {}
            }

            for idx in due {
                let pipeline = self.jobs[idx].pipeline;
                info!(%pipeline, "Scheduled run starting");
                match run_pipeline(pipeline).await {
                    Ok(()) => info!(%pipeline, "Scheduled run finished"),
                    Err(e) => alert_on_failure(pipeline.name(), &format!("{:#}", e)),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_from_config() {
        let entries = vec![ScheduleConfig {
            pipeline: PipelineKind::Rads,
            cron: "0 2 * * 1".to_string(),
        }];
        let scheduler = Scheduler::from_config(&entries).unwrap();
        assert_eq!(scheduler.jobs().len(), 1);
        assert_eq!(scheduler.jobs()[0].pipeline, PipelineKind::Rads);

        let bad = vec![ScheduleConfig {
            pipeline: PipelineKind::Rads,
            cron: "whenever".to_string(),
        }];
        assert!(Scheduler::from_config(&bad).is_err());
    }

    #[tokio::test]
    async fn test_no_jobs_returns() {
        let scheduler = Scheduler::new(vec![]);
        scheduler
            .run(|_| async { Ok(()) }, std::future::pending::<()>())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_before_first_fire() {
        let job = ScheduledJob::new(PipelineKind::Operations, "0 0 1 1 *").unwrap();
        let scheduler = Scheduler::new(vec![job]);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        scheduler
            .run(
                move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async { Ok(()) }
                },
                async {},
            )
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_every_second_fires_and_survives_failures() {
        let job = ScheduledJob::new(PipelineKind::Rads, "* * * * * *").unwrap();
        let scheduler = Scheduler::new(vec![job]);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        scheduler
            .run(
                move |pipeline| {
                    assert_eq!(pipeline, PipelineKind::Rads);
                    counter.fetch_add(1, Ordering::SeqCst);
                    async { Err(eyre::eyre!("boom")) }
                },
                tokio::time::sleep(Duration::from_millis(2500)),
            )
            .await
            .unwrap();
        assert!(calls.load(Ordering::SeqCst) >= 1);
    }
}
