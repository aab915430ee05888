//! Cron-triggered pipeline jobs

use std::str::FromStr;

use chrono::{DateTime, Local};
use cron::Schedule;
use eyre::{Context, Result};

use crate::config::ScheduleConfig;
use crate::pipeline::PipelineKind;

/// One pipeline bound to a cron schedule
#[derive(Debug, Clone)]
pub struct ScheduledJob {
    pub pipeline: PipelineKind,
    /// Expression as configured
    pub expression: String,
    schedule: Schedule,
}

impl ScheduledJob {
    pub fn new(pipeline: PipelineKind, expression: &str) -> Result<Self> {
        let normalized = normalize_cron(expression);
        let schedule = Schedule::from_str(&normalized)
            .map_err(|e| eyre::eyre!("{}", e))
            .context(format!("Invalid cron expression '{}' for {}", expression, pipeline))?;
        Ok(Self {
            pipeline,
            expression: expression.to_string(),
            schedule,
        })
    }

    pub fn from_config(entry: &ScheduleConfig) -> Result<Self> {
        Self::new(entry.pipeline, &entry.cron)
    }

    /// First fire time strictly after `after`
    pub fn next_after(&self, after: &DateTime<Local>) -> Option<DateTime<Local>> {
        self.schedule.after(after).next()
    }
}

/// Crontab's five fields get a leading seconds field of `0`
pub fn normalize_cron(expression: &str) -> String {
    let expression = expression.trim();
    if expression.split_whitespace().count() == 5 {
        format!("0 {}", expression)
    } else {
        expression.to_string()
    }
}

/// Earliest fire time across `jobs` and the indices of every job due then
pub fn next_due(jobs: &[ScheduledJob], now: &DateTime<Local>) -> Option<(DateTime<Local>, Vec<usize>)> {
    let fires: Vec<(usize, DateTime<Local>)> = jobs
        .iter()
        .enumerate()
        .filter_map(|(idx, job)| job.next_after(now).map(|at| (idx, at)))
        .collect();
    let earliest = fires.iter().map(|(_, at)| *at).min()?;
    let due = fires
        .into_iter()
        .filter(|(_, at)| *at == earliest)
        .map(|(idx, _)| idx)
        .collect();
    Some((earliest, due))
}
