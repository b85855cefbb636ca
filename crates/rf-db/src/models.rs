//! Rust structs mapping to database tables.
//!
//! Each model implements `from_row` for constructing itself from a
//! `rusqlite::Row`.

use rf_core::JobId;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// helpers
// ---------------------------------------------------------------------------

/// Parse a UUID-based ID from a text column.
fn parse_id<T: From<Uuid>>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T> {
    let s: String = row.get(idx)?;
    let uuid = Uuid::parse_str(&s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(T::from(uuid))
}

// ---------------------------------------------------------------------------
// JobStatus
// ---------------------------------------------------------------------------

/// Lifecycle state of a conversion job.
///
/// Transitions are monotonic: pending -> processing -> completed | failed.
/// A failed job is never moved back to pending automatically; re-submission
/// is a new job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "processing" => Some(JobStatus::Processing),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    /// Whether the job has reached a terminal state.
    pub fn is_finished(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn parse_status(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<JobStatus> {
    let s: String = row.get(idx)?;
    JobStatus::parse(&s).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unknown job status: {s}").into(),
        )
    })
}

// ---------------------------------------------------------------------------
// VideoJob
// ---------------------------------------------------------------------------

/// A queued or executed conversion job.
#[derive(Debug, Clone)]
pub struct VideoJob {
    pub id: JobId,
    /// Identity of the requesting user (opaque to the engine).
    pub owner_id: String,
    /// Display name of the source media.
    pub source_ref: String,
    /// Virtual path of the source file, resolved at execution time.
    pub input_path: String,
    /// Serialized `JobConfig` blob: the encoding profile plus derived
    /// fields added during planning. Append-only within one execution.
    pub config: String,
    pub status: JobStatus,
    /// 0-100; capped at 99 until completion is confirmed.
    pub progress: i64,
    /// Incremented on every failed execution attempt; never reset.
    pub retry_count: i64,
    pub error_message: Option<String>,
    /// Identity of the worker process that last claimed this job.
    pub worker_host: Option<String>,
    pub created_at: String,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
}

impl VideoJob {
    /// Build from a row selected as:
    /// id, owner_id, source_ref, input_path, config, status, progress,
    /// retry_count, error_message, worker_host, created_at, started_at,
    /// finished_at
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            owner_id: row.get(1)?,
            source_ref: row.get(2)?,
            input_path: row.get(3)?,
            config: row.get(4)?,
            status: parse_status(row, 5)?,
            progress: row.get(6)?,
            retry_count: row.get(7)?,
            error_message: row.get(8)?,
            worker_host: row.get(9)?,
            created_at: row.get(10)?,
            started_at: row.get(11)?,
            finished_at: row.get(12)?,
        })
    }
}
