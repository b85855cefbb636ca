//! Worker scheduler.
//!
//! A single polling loop per worker process: claim the oldest pending job,
//! enforce the retry ceiling, and drive the orchestrator.  One job failing
//! never terminates the loop; uncaught errors are logged and followed by a
//! cool-down sleep.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use rf_core::config::WorkerConfig;
use rf_core::{JobId, Result};
use rf_db::models::JobStatus;
use rf_db::pool::DbPool;
use rf_db::queries::video_jobs;

use crate::orchestrator::JobExecutor;

/// Identity of this worker process, recorded on every claimed job for
/// diagnostics.  Resolved once at startup and passed in explicitly rather
/// than read from ambient process globals.
#[derive(Debug, Clone)]
pub struct WorkerIdentity {
    pub hostname: String,
    pub pid: u32,
}

impl WorkerIdentity {
    /// Detect the current host name and process id.
    pub fn detect() -> Self {
        let hostname = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown-host".to_string());
        Self {
            hostname,
            pid: std::process::id(),
        }
    }

    /// The tag written into `worker_host`.
    pub fn tag(&self) -> String {
        format!("{}:{}", self.hostname, self.pid)
    }
}

/// What one scheduler cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No pending job was available.
    Idle,
    /// A job was executed and completed.
    Completed(JobId),
    /// A job was executed and failed; the failure is persisted.
    Failed(JobId),
    /// A job at the retry ceiling was failed without execution.
    MaxRetriesExceeded(JobId),
}

/// Run one scheduler cycle: claim, retry-check, execute.
pub async fn run_cycle(
    pool: &DbPool,
    executor: &dyn JobExecutor,
    identity: &WorkerIdentity,
    max_retries: u32,
) -> Result<CycleOutcome> {
    let job = {
        let conn = rf_db::pool::get_conn(pool)?;
        let Some(job) = video_jobs::claim_next_pending(&conn, &identity.tag())? else {
            return Ok(CycleOutcome::Idle);
        };

        if job.retry_count >= i64::from(max_retries) {
            tracing::error!(
                job_id = %job.id,
                retry_count = job.retry_count,
                "job exceeded max retries, marking as failed"
            );
            video_jobs::update_status(
                &conn,
                job.id,
                JobStatus::Failed,
                Some("Max retry count exceeded"),
            )?;
            return Ok(CycleOutcome::MaxRetriesExceeded(job.id));
        }

        job
    };

    tracing::info!(job_id = %job.id, input = %job.input_path, "claimed pending job");

    if executor.execute(&job).await? {
        Ok(CycleOutcome::Completed(job.id))
    } else {
        Ok(CycleOutcome::Failed(job.id))
    }
}

/// Run the scheduler loop until the cancellation token fires.
pub async fn run_worker(
    pool: DbPool,
    executor: Arc<dyn JobExecutor>,
    identity: WorkerIdentity,
    config: WorkerConfig,
    cancel: CancellationToken,
) {
    tracing::info!(worker = %identity.tag(), "conversion worker started");

    let poll_interval = Duration::from_secs(config.poll_interval_secs);
    let cycle_delay = Duration::from_millis(config.cycle_delay_ms);

    loop {
        if cancel.is_cancelled() {
            break;
        }

        match run_cycle(&pool, executor.as_ref(), &identity, config.max_retries).await {
            Ok(CycleOutcome::Idle) => {
                tracing::debug!("no pending jobs, sleeping {}s", poll_interval.as_secs());
                if sleep_or_cancel(poll_interval, &cancel).await {
                    break;
                }
                continue;
            }
            Ok(CycleOutcome::Completed(id)) => {
                tracing::info!(job_id = %id, "job completed");
            }
            Ok(CycleOutcome::Failed(id)) => {
                tracing::warn!(job_id = %id, "job failed; left for inspection");
            }
            Ok(CycleOutcome::MaxRetriesExceeded(_)) => {}
            Err(e) => {
                // Store-level trouble: cool down before the next attempt so
                // a dead database does not turn into a busy loop.
                tracing::error!("worker cycle error: {e}");
                if sleep_or_cancel(poll_interval, &cancel).await {
                    break;
                }
            }
        }

        // Small fixed delay between cycles bounds CPU usage when jobs
        // complete quickly.
        if sleep_or_cancel(cycle_delay, &cancel).await {
            break;
        }
    }

    tracing::info!(worker = %identity.tag(), "conversion worker stopped");
}

/// Sleep for `duration`, returning true when cancellation fired instead.
async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => false,
        _ = cancel.cancelled() => true,
    }
}
