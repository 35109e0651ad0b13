use esusync_domain::SyncError;
use thiserror::Error;
use tokio_cron_scheduler::JobSchedulerError;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("auto-import scheduler is already running")]
    AlreadyRunning,

    #[error("auto-import scheduler is not running")]
    NotRunning,

    #[error("invalid schedule time {0:?}; expected HH:MM")]
    InvalidTime(String),

    #[error("failed to create scheduler: {0}")]
    CreationFailed(JobSchedulerError),

    #[error("failed to register job: {0}")]
    JobRegistrationFailed(JobSchedulerError),

    #[error("failed to start scheduler: {0}")]
    StartFailed(JobSchedulerError),

    #[error("failed to stop scheduler: {0}")]
    StopFailed(JobSchedulerError),
}

impl From<SchedulerError> for SyncError {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::InvalidTime(_) => SyncError::InvalidInput(err.to_string()),
            other => SyncError::Internal(other.to_string()),
        }
    }
}
