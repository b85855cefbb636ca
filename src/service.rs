//! Job submission and retention service.
//!
//! The thin boundary consumed by submission callers (HTTP layer, CLI):
//! create jobs in `pending`, look them up, delete them, and sweep old
//! finished ones.  Execution is exclusively the worker's business.

use rf_core::{Error, JobId, Result};
use rf_db::models::VideoJob;
use rf_db::pool::DbPool;
use rf_db::queries::video_jobs;
use rf_plan::JobConfig;

/// Submission-side operations over the job store.
pub struct JobService {
    pool: DbPool,
}

impl JobService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a job from a raw config blob, stored verbatim.
    ///
    /// The blob is parsed once to reject malformed JSON up front, but the
    /// caller's exact bytes are what lands in the store so unknown keys
    /// round-trip untouched.
    pub fn submit(
        &self,
        owner_id: &str,
        source_ref: &str,
        input_path: &str,
        config_json: &str,
    ) -> Result<VideoJob> {
        if owner_id.trim().is_empty() {
            return Err(Error::Validation("owner id is required".into()));
        }
        if input_path.trim().is_empty() {
            return Err(Error::Validation("input path is required".into()));
        }
        JobConfig::from_json(config_json)?;

        let conn = rf_db::pool::get_conn(&self.pool)?;
        let job = video_jobs::insert_job(&conn, owner_id, source_ref, input_path, config_json)?;
        tracing::info!(job_id = %job.id, owner = owner_id, input = input_path, "job submitted");
        Ok(job)
    }

    pub fn get(&self, id: JobId) -> Result<Option<VideoJob>> {
        let conn = rf_db::pool::get_conn(&self.pool)?;
        video_jobs::get_job(&conn, id)
    }

    pub fn list_for_owner(&self, owner_id: &str) -> Result<Vec<VideoJob>> {
        let conn = rf_db::pool::get_conn(&self.pool)?;
        video_jobs::find_jobs_for_owner(&conn, owner_id)
    }

    pub fn list_all(&self) -> Result<Vec<VideoJob>> {
        let conn = rf_db::pool::get_conn(&self.pool)?;
        video_jobs::find_all_jobs(&conn)
    }

    /// Explicit user/operator deletion.
    pub fn delete(&self, id: JobId) -> Result<bool> {
        let conn = rf_db::pool::get_conn(&self.pool)?;
        video_jobs::delete_job(&conn, id)
    }

    /// Retention sweep over finished jobs.
    pub fn cleanup(&self, older_than_days: u32) -> Result<usize> {
        let conn = rf_db::pool::get_conn(&self.pool)?;
        let deleted = video_jobs::delete_finished_older_than(&conn, older_than_days)?;
        if deleted > 0 {
            tracing::info!(deleted, "removed old finished jobs");
        }
        Ok(deleted)
    }
}
