//! Periodic snapshot refresh on fixed Asia/Seoul cron schedules.

use crate::cache::MacroSnapshotCache;
use crate::domain::snapshot::MacroSnapshot;
use crate::error::{MacroError, Result};
use crate::ingest::SnapshotSource;
use crate::publish::DailyPublisher;
use crate::time::kst::kst;
use chrono::{DateTime, Utc};
use cron::Schedule;
use std::str::FromStr;
use std::sync::Arc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScheduledTrigger {
    /// Every day at 08:05 KST.
    DailyMorning,
    /// Thursdays 21:40 KST, after US weekly claims.
    WeeklyClaims,
    /// First Friday of the month 21:40 KST, after US payrolls.
    MonthlyPayroll,
}

impl ScheduledTrigger {
    pub const ALL: [ScheduledTrigger; 3] = [
        ScheduledTrigger::DailyMorning,
        ScheduledTrigger::WeeklyClaims,
        ScheduledTrigger::MonthlyPayroll,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ScheduledTrigger::DailyMorning => "daily_morning",
            ScheduledTrigger::WeeklyClaims => "weekly_claims",
            ScheduledTrigger::MonthlyPayroll => "monthly_payroll",
        }
    }

    /// sec min hour day-of-month month day-of-week, evaluated in KST.
    pub fn cron_expr(self) -> &'static str {
        match self {
            ScheduledTrigger::DailyMorning => "0 5 8 * * *",
            ScheduledTrigger::WeeklyClaims => "0 40 21 * * Thu",
            // Day-of-month and day-of-week must both match.
            ScheduledTrigger::MonthlyPayroll => "0 40 21 1-7 * Fri",
        }
    }

    pub fn schedule(self) -> Result<Schedule> {
        Schedule::from_str(self.cron_expr()).map_err(|e| {
            MacroError::validation(format!("invalid cron for {}: {e}", self.name()))
        })
    }

    /// Next fire time strictly after `now`.
    pub fn next_fire_after(self, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>> {
        let schedule = self.schedule()?;
        Ok(schedule
            .after(&now.with_timezone(&kst()))
            .next()
            .map(|t| t.with_timezone(&Utc)))
    }
}

/// Runs snapshot assembly on each trigger and stores the result in the cache.
/// With a publisher attached, every successful refresh also republishes the
/// day's artifacts from the cache.
pub struct MacroScheduler {
    source: Arc<dyn SnapshotSource>,
    cache: Arc<MacroSnapshotCache>,
    publisher: Option<Arc<DailyPublisher>>,
}

impl MacroScheduler {
    pub fn new(source: Arc<dyn SnapshotSource>, cache: Arc<MacroSnapshotCache>) -> Self {
        Self {
            source,
            cache,
            publisher: None,
        }
    }

    pub fn with_publisher(mut self, publisher: Arc<DailyPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// One scheduled run. Failures are logged and the cache keeps its last
    /// good value; returns whether the cache was updated.
    pub async fn run_once(&self, trigger: &str) -> bool {
        match self.source.build_snapshot().await {
            Ok(snapshot) => {
                let as_of = snapshot.as_of;
                self.cache.put(snapshot);
                tracing::info!(trigger, as_of = ?as_of, "macro cache updated");
                self.publish(trigger).await;
                true
            }
            Err(err) => {
                tracing::error!(trigger, error = %err, "macro ingest failed");
                false
            }
        }
    }

    async fn publish(&self, trigger: &str) {
        let Some(publisher) = &self.publisher else {
            return;
        };
        if let Err(err) = publisher.publish_latest().await {
            tracing::error!(trigger, error = %err, "daily publish failed");
        }
    }

    /// Manual refresh. Same path as a scheduled run, but the caller sees the
    /// outcome.
    pub async fn trigger_now(&self) -> Result<MacroSnapshot> {
        let snapshot = self.source.build_snapshot().await?;
        self.cache.put(snapshot.clone());
        tracing::info!(trigger = "manual", as_of = ?snapshot.as_of, "macro cache updated");
        Ok(snapshot)
    }

    /// Starts one task per trigger. Each task sleeps until its next fire time.
    pub fn spawn(self: &Arc<Self>) -> Result<SchedulerHandle> {
        let mut tasks = Vec::with_capacity(ScheduledTrigger::ALL.len());
        for trigger in ScheduledTrigger::ALL {
            let schedule = trigger.schedule()?;
            let this = Arc::clone(self);
            tasks.push(tokio::spawn(async move {
                this.trigger_loop(trigger, schedule).await;
            }));
            tracing::info!(trigger = trigger.name(), cron = trigger.cron_expr(), "trigger started");
        }
        Ok(SchedulerHandle { tasks })
    }

    async fn trigger_loop(&self, trigger: ScheduledTrigger, schedule: Schedule) {
        loop {
            let now = Utc::now();
            let Some(next) = schedule.after(&now.with_timezone(&kst())).next() else {
                tracing::warn!(trigger = trigger.name(), "schedule has no future fire time");
                return;
            };
            let next = next.with_timezone(&Utc);
            let wait = (next - now).to_std().unwrap_or_default();
            tracing::debug!(trigger = trigger.name(), %next, ?wait, "sleeping until next fire");

            tokio::time::sleep(wait).await;
            self.run_once(trigger.name()).await;
        }
    }
}

pub struct SchedulerHandle {
    tasks: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    pub fn shutdown(self) {
        for task in &self.tasks {
            task.abort();
        }
        tracing::info!(tasks = self.tasks.len(), "scheduler stopped");
    }
}
