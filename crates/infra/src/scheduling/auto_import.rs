//! Cron-backed scheduler that fires the nightly import at the configured
//! time of day.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use super::error::SchedulerError;

/// The work the scheduler triggers. Implemented by the application layer
/// so the scheduler stays ignorant of coordinator wiring.
#[async_trait]
pub trait ImportJob: Send + Sync {
    async fn run(&self);
}

/// Build a six-field cron expression firing daily at `time` (`HH:MM`).
pub fn cron_from_time(time: &str) -> Result<String, SchedulerError> {
    let invalid = || SchedulerError::InvalidTime(time.to_string());

    let (hour, minute) = time.split_once(':').ok_or_else(invalid)?;
    let hour: u8 = hour.parse().map_err(|_| invalid())?;
    let minute: u8 = minute.parse().map_err(|_| invalid())?;
    if hour > 23 || minute > 59 {
        return Err(invalid());
    }
    Ok(format!("0 {minute} {hour} * * *"))
}

/// Daily auto-import trigger with an explicit start/stop lifecycle.
/// Rescheduling means stop then start with the new time.
pub struct AutoImportScheduler {
    job: Arc<dyn ImportJob>,
    scheduler: Arc<RwLock<Option<JobScheduler>>>,
}

impl AutoImportScheduler {
    pub fn new(job: Arc<dyn ImportJob>) -> Self {
        Self { job, scheduler: Arc::new(RwLock::new(None)) }
    }

    pub async fn is_running(&self) -> bool {
        self.scheduler.read().await.is_some()
    }

    /// Start firing the import job daily at `time` (`HH:MM`).
    pub async fn start(&self, time: &str) -> Result<(), SchedulerError> {
        let cron = cron_from_time(time)?;

        let mut guard = self.scheduler.write().await;
        if guard.is_some() {
            return Err(SchedulerError::AlreadyRunning);
        }

        let scheduler = JobScheduler::new().await.map_err(SchedulerError::CreationFailed)?;

        let job_impl = self.job.clone();
        let job = Job::new_async(cron.as_str(), move |_uuid, _lock| {
            let job_impl = job_impl.clone();
            Box::pin(async move {
                info!("auto-import fired");
                job_impl.run().await;
            })
        })
        .map_err(SchedulerError::JobRegistrationFailed)?;

        scheduler.add(job).await.map_err(SchedulerError::JobRegistrationFailed)?;
        scheduler.start().await.map_err(SchedulerError::StartFailed)?;

        info!(time, %cron, "auto-import scheduler started");
        *guard = Some(scheduler);
        Ok(())
    }

    /// Shut the scheduler down. Pending job runs are abandoned.
    pub async fn stop(&self) -> Result<(), SchedulerError> {
        let mut guard = self.scheduler.write().await;
        let Some(mut scheduler) = guard.take() else {
            return Err(SchedulerError::NotRunning);
        };

        if let Err(err) = scheduler.shutdown().await {
            error!(%err, "scheduler shutdown failed");
            return Err(SchedulerError::StopFailed(err));
        }
        info!("auto-import scheduler stopped");
        Ok(())
    }
}
