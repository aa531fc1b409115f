//! Recurring jobs at independent intervals inside one cooperative loop.
//!
//! Jobs never overlap: each due job is awaited before the next is checked.
//! Between iterations the loop sleeps exactly until the earliest due time.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use gleaner::scheduler::Scheduler;
//!
//! let mut scheduler = Scheduler::new();
//! scheduler.schedule(subscription_detector, Duration::from_secs(300), false)?;
//! scheduler.schedule(user_detector, Duration::from_secs(3600), true)?;
//! let handle = scheduler.handle();
//! tokio::spawn(async move { scheduler.start().await });
//! // later
//! handle.stop();
//! ```

mod clock;
mod error;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::Notify;
use uuid::Uuid;

use crate::sync::epoch;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Result, SchedulerError};

/// A unit of recurring work.
///
/// `run` has no error channel: a job logs its own failures so one bad tick
/// never stops the loop.
#[async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self);
}

struct ScheduledTask {
    id: Uuid,
    interval: TimeDelta,
    job: Arc<dyn Job>,
    latest_executed: DateTime<Utc>,
}

/// Cloneable stop switch for a running [`Scheduler`].
#[derive(Clone, Default)]
pub struct SchedulerHandle {
    inner: Arc<HandleInner>,
}

#[derive(Default)]
struct HandleInner {
    stopped: AtomicBool,
    wake: Notify,
}

impl SchedulerHandle {
    /// Prevent further ticks and wake a sleeping loop.
    ///
    /// A job that is already running is allowed to finish.
    pub fn stop(&self) {
        self.inner.stopped.store(true, Ordering::SeqCst);
        self.inner.wake.notify_one();
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    async fn stopped(&self) {
        self.inner.wake.notified().await;
    }
}

pub struct Scheduler {
    clock: Arc<dyn Clock>,
    tasks: Vec<ScheduledTask>,
    handle: SchedulerHandle,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            tasks: Vec::new(),
            handle: SchedulerHandle::default(),
        }
    }

    /// Register `job` to run every `interval`.
    ///
    /// With `skip_first` the first run happens one interval from now instead
    /// of on the first iteration.
    pub fn schedule(
        &mut self,
        job: Arc<dyn Job>,
        interval: Duration,
        skip_first: bool,
    ) -> Result<Uuid> {
        let delta = TimeDelta::from_std(interval)
            .ok()
            .filter(|d| *d > TimeDelta::zero())
            .ok_or_else(|| SchedulerError::InvalidInterval {
                job: job.name().to_string(),
                interval,
            })?;

        let id = Uuid::new_v4();
        tracing::debug!(task_id = %id, job = job.name(), ?interval, skip_first, "Scheduled job");
        self.tasks.push(ScheduledTask {
            id,
            interval: delta,
            job,
            latest_executed: if skip_first { self.clock.now() } else { epoch() },
        });
        Ok(id)
    }

    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Run due jobs until [`SchedulerHandle::stop`] is called.
    pub async fn start(&mut self) {
        tracing::info!(tasks = self.tasks.len(), "Scheduler started");

        while !self.handle.is_stopped() {
            let mut next_wait: Option<TimeDelta> = None;

            for task in &mut self.tasks {
                if self.handle.is_stopped() {
                    break;
                }

                let now = self.clock.now();
                if task.latest_executed + task.interval <= now {
                    tracing::debug!(task_id = %task.id, job = task.job.name(), "Running job");
                    task.job.run().await;
                    task.latest_executed = now;
                }

                let remaining = task.latest_executed + task.interval - self.clock.now();
                next_wait = Some(next_wait.map_or(remaining, |w| w.min(remaining)));
            }

            if self.handle.is_stopped() {
                break;
            }

            match next_wait {
                // Something is already due again.
                Some(wait) if wait <= TimeDelta::zero() => continue,
                Some(wait) => {
                    let wait = wait.to_std().unwrap_or(Duration::ZERO);
                    tokio::select! {
                        () = self.clock.sleep(wait) => {}
                        () = self.handle.stopped() => {}
                    }
                }
                None => self.handle.stopped().await,
            }
        }

        tracing::info!("Scheduler stopped");
    }
}
