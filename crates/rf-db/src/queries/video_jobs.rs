//! Conversion job store operations.

use chrono::Utc;
use rusqlite::Connection;
use rf_core::{Error, JobId, Result};

use crate::models::{JobStatus, VideoJob};

const COLS: &str = "id, owner_id, source_ref, input_path, config, status, progress,
    retry_count, error_message, worker_host, created_at, started_at, finished_at";

/// Insert a new job in `pending` state with progress 0 and no retries.
pub fn insert_job(
    conn: &Connection,
    owner_id: &str,
    source_ref: &str,
    input_path: &str,
    config_json: &str,
) -> Result<VideoJob> {
    let id = JobId::new();
    let now = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO video_jobs (id, owner_id, source_ref, input_path, config, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6)",
        rusqlite::params![id.to_string(), owner_id, source_ref, input_path, config_json, &now],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(VideoJob {
        id,
        owner_id: owner_id.to_string(),
        source_ref: source_ref.to_string(),
        input_path: input_path.to_string(),
        config: config_json.to_string(),
        status: JobStatus::Pending,
        progress: 0,
        retry_count: 0,
        error_message: None,
        worker_host: None,
        created_at: now,
        started_at: None,
        finished_at: None,
    })
}

/// Get a job by ID.
pub fn get_job(conn: &Connection, id: JobId) -> Result<Option<VideoJob>> {
    let q = format!("SELECT {COLS} FROM video_jobs WHERE id = ?1");
    let result = conn.query_row(&q, [id.to_string()], VideoJob::from_row);
    match result {
        Ok(j) => Ok(Some(j)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// List pending jobs, oldest-created-first.
pub fn find_pending_jobs(conn: &Connection, limit: i64) -> Result<Vec<VideoJob>> {
    let q = format!(
        "SELECT {COLS} FROM video_jobs WHERE status = 'pending'
         ORDER BY created_at ASC LIMIT ?1"
    );
    collect_jobs(conn, &q, rusqlite::params![limit])
}

/// Atomically claim the oldest pending job for `worker_host`.
///
/// Single conditional update (`pending` -> `processing` with `started_at`
/// and `worker_host`), so two concurrent workers can never claim the same
/// job.
pub fn claim_next_pending(conn: &Connection, worker_host: &str) -> Result<Option<VideoJob>> {
    let now = Utc::now().to_rfc3339();

    let q = format!(
        "UPDATE video_jobs SET status = 'processing', worker_host = ?1, started_at = ?2
         WHERE id = (
             SELECT id FROM video_jobs WHERE status = 'pending'
             ORDER BY created_at ASC LIMIT 1
         )
         RETURNING {COLS}"
    );

    let result = conn.query_row(&q, rusqlite::params![worker_host, &now], VideoJob::from_row);
    match result {
        Ok(j) => Ok(Some(j)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// List all jobs belonging to one owner, newest first.
pub fn find_jobs_for_owner(conn: &Connection, owner_id: &str) -> Result<Vec<VideoJob>> {
    let q = format!(
        "SELECT {COLS} FROM video_jobs WHERE owner_id = ?1 ORDER BY created_at DESC"
    );
    collect_jobs(conn, &q, rusqlite::params![owner_id])
}

/// List every job, newest first.
pub fn find_all_jobs(conn: &Connection) -> Result<Vec<VideoJob>> {
    let q = format!("SELECT {COLS} FROM video_jobs ORDER BY created_at DESC");
    collect_jobs(conn, &q, [])
}

/// List jobs currently executing, oldest-started-first.
pub fn find_processing_jobs(conn: &Connection) -> Result<Vec<VideoJob>> {
    let q = format!(
        "SELECT {COLS} FROM video_jobs WHERE status = 'processing' ORDER BY started_at ASC"
    );
    collect_jobs(conn, &q, [])
}

/// Update a job's status, recording the matching lifecycle timestamp.
///
/// Entering `processing` sets `started_at`; a terminal status sets
/// `finished_at`. The error message is written only when provided.
pub fn update_status(
    conn: &Connection,
    id: JobId,
    status: JobStatus,
    error_message: Option<&str>,
) -> Result<bool> {
    let now = Utc::now().to_rfc3339();

    let n = match (status, error_message) {
        (JobStatus::Processing, _) => conn.execute(
            "UPDATE video_jobs SET status = ?1, started_at = ?2 WHERE id = ?3",
            rusqlite::params![status.as_str(), &now, id.to_string()],
        ),
        (s, Some(msg)) if s.is_finished() => conn.execute(
            "UPDATE video_jobs SET status = ?1, finished_at = ?2, error_message = ?3
             WHERE id = ?4",
            rusqlite::params![s.as_str(), &now, msg, id.to_string()],
        ),
        (s, None) if s.is_finished() => conn.execute(
            "UPDATE video_jobs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            rusqlite::params![s.as_str(), &now, id.to_string()],
        ),
        (s, _) => conn.execute(
            "UPDATE video_jobs SET status = ?1 WHERE id = ?2",
            rusqlite::params![s.as_str(), id.to_string()],
        ),
    }
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(n > 0)
}

/// Update execution progress (0-100).
pub fn update_progress(conn: &Connection, id: JobId, progress: u8) -> Result<bool> {
    let n = conn
        .execute(
            "UPDATE video_jobs SET progress = ?1 WHERE id = ?2",
            rusqlite::params![progress as i64, id.to_string()],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

/// Replace the serialized config blob (derived fields are only ever added).
pub fn update_config(conn: &Connection, id: JobId, config_json: &str) -> Result<bool> {
    let n = conn
        .execute(
            "UPDATE video_jobs SET config = ?1 WHERE id = ?2",
            rusqlite::params![config_json, id.to_string()],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

/// Bump the retry counter after a failed execution attempt.
pub fn increment_retry(conn: &Connection, id: JobId) -> Result<bool> {
    let n = conn
        .execute(
            "UPDATE video_jobs SET retry_count = retry_count + 1 WHERE id = ?1",
            rusqlite::params![id.to_string()],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

/// Delete a job by ID. Returns true if a row was deleted.
pub fn delete_job(conn: &Connection, id: JobId) -> Result<bool> {
    let n = conn
        .execute(
            "DELETE FROM video_jobs WHERE id = ?1",
            [id.to_string()],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

/// Retention sweep: delete completed/failed jobs that finished more than
/// `days_old` days ago. Pending and processing jobs are never touched.
pub fn delete_finished_older_than(conn: &Connection, days_old: u32) -> Result<usize> {
    let cutoff = (Utc::now() - chrono::Duration::days(i64::from(days_old))).to_rfc3339();
    let n = conn
        .execute(
            "DELETE FROM video_jobs
             WHERE status IN ('completed', 'failed') AND finished_at < ?1",
            rusqlite::params![cutoff],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n)
}

fn collect_jobs<P: rusqlite::Params>(
    conn: &Connection,
    query: &str,
    params: P,
) -> Result<Vec<VideoJob>> {
    let mut stmt = conn
        .prepare(query)
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map(params, VideoJob::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::init_memory_pool;

    fn setup() -> r2d2::PooledConnection<r2d2_sqlite::SqliteConnectionManager> {
        let pool = init_memory_pool().unwrap();
        pool.get().unwrap()
    }

    #[test]
    fn create_and_get() {
        let conn = setup();
        let job = insert_job(&conn, "alice", "movie.mkv", "/alice/movie.mkv", "{}").unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.progress, 0);
        assert_eq!(job.retry_count, 0);

        let found = get_job(&conn, job.id).unwrap().unwrap();
        assert_eq!(found.owner_id, "alice");
        assert_eq!(found.input_path, "/alice/movie.mkv");
        assert!(found.started_at.is_none());
        assert!(found.finished_at.is_none());
    }

    #[test]
    fn get_missing_returns_none() {
        let conn = setup();
        assert!(get_job(&conn, JobId::new()).unwrap().is_none());
    }

    #[test]
    fn pending_jobs_oldest_first() {
        let conn = setup();
        let first = insert_job(&conn, "u", "a.mkv", "/a.mkv", "{}").unwrap();
        // Force distinct created_at ordering.
        conn.execute(
            "UPDATE video_jobs SET created_at = '2026-01-01T00:00:00Z' WHERE id = ?1",
            [first.id.to_string()],
        )
        .unwrap();
        let second = insert_job(&conn, "u", "b.mkv", "/b.mkv", "{}").unwrap();

        let pending = find_pending_jobs(&conn, 10).unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].id, first.id);
        assert_eq!(pending[1].id, second.id);

        let limited = find_pending_jobs(&conn, 1).unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].id, first.id);
    }

    #[test]
    fn claim_transitions_to_processing() {
        let conn = setup();
        let job = insert_job(&conn, "u", "a.mkv", "/a.mkv", "{}").unwrap();

        let claimed = claim_next_pending(&conn, "worker-1:42").unwrap().unwrap();
        assert_eq!(claimed.id, job.id);
        assert_eq!(claimed.status, JobStatus::Processing);
        assert_eq!(claimed.worker_host.as_deref(), Some("worker-1:42"));
        assert!(claimed.started_at.is_some());

        // Nothing left to claim.
        assert!(claim_next_pending(&conn, "worker-1:42").unwrap().is_none());
    }

    #[test]
    fn claim_ignores_non_pending() {
        let conn = setup();
        let job = insert_job(&conn, "u", "a.mkv", "/a.mkv", "{}").unwrap();
        update_status(&conn, job.id, JobStatus::Failed, Some("boom")).unwrap();

        assert!(claim_next_pending(&conn, "w").unwrap().is_none());
    }

    #[test]
    fn status_timestamps() {
        let conn = setup();
        let job = insert_job(&conn, "u", "a.mkv", "/a.mkv", "{}").unwrap();

        update_status(&conn, job.id, JobStatus::Processing, None).unwrap();
        let processing = get_job(&conn, job.id).unwrap().unwrap();
        assert!(processing.started_at.is_some());
        assert!(processing.finished_at.is_none());

        update_status(&conn, job.id, JobStatus::Completed, None).unwrap();
        let done = get_job(&conn, job.id).unwrap().unwrap();
        assert!(done.finished_at.is_some());
        assert!(done.error_message.is_none());
    }

    #[test]
    fn failed_records_error_message() {
        let conn = setup();
        let job = insert_job(&conn, "u", "a.mkv", "/a.mkv", "{}").unwrap();

        update_status(&conn, job.id, JobStatus::Failed, Some("encoder exited with code 1")).unwrap();
        let failed = get_job(&conn, job.id).unwrap().unwrap();
        assert_eq!(failed.status, JobStatus::Failed);
        assert_eq!(
            failed.error_message.as_deref(),
            Some("encoder exited with code 1")
        );
        assert!(failed.finished_at.is_some());
    }

    #[test]
    fn progress_and_retry_updates() {
        let conn = setup();
        let job = insert_job(&conn, "u", "a.mkv", "/a.mkv", "{}").unwrap();

        assert!(update_progress(&conn, job.id, 42).unwrap());
        assert!(increment_retry(&conn, job.id).unwrap());
        assert!(increment_retry(&conn, job.id).unwrap());

        let found = get_job(&conn, job.id).unwrap().unwrap();
        assert_eq!(found.progress, 42);
        assert_eq!(found.retry_count, 2);
    }

    #[test]
    fn config_replacement() {
        let conn = setup();
        let job = insert_job(&conn, "u", "a.mkv", "/a.mkv", r#"{"profile":{}}"#).unwrap();

        assert!(update_config(&conn, job.id, r#"{"profile":{},"output_folder":"a_2026"}"#).unwrap());
        let found = get_job(&conn, job.id).unwrap().unwrap();
        assert!(found.config.contains("output_folder"));
    }

    #[test]
    fn owner_listing() {
        let conn = setup();
        insert_job(&conn, "alice", "a.mkv", "/a.mkv", "{}").unwrap();
        insert_job(&conn, "bob", "b.mkv", "/b.mkv", "{}").unwrap();

        let alice = find_jobs_for_owner(&conn, "alice").unwrap();
        assert_eq!(alice.len(), 1);
        assert_eq!(alice[0].owner_id, "alice");

        assert_eq!(find_all_jobs(&conn).unwrap().len(), 2);
    }

    #[test]
    fn delete_by_id() {
        let conn = setup();
        let job = insert_job(&conn, "u", "a.mkv", "/a.mkv", "{}").unwrap();
        assert!(delete_job(&conn, job.id).unwrap());
        assert!(!delete_job(&conn, job.id).unwrap());
    }

    #[test]
    fn retention_sweep_only_touches_finished() {
        let conn = setup();
        let old_done = insert_job(&conn, "u", "a.mkv", "/a.mkv", "{}").unwrap();
        let old_pending = insert_job(&conn, "u", "b.mkv", "/b.mkv", "{}").unwrap();

        update_status(&conn, old_done.id, JobStatus::Completed, None).unwrap();
        conn.execute(
            "UPDATE video_jobs SET finished_at = '2020-01-01T00:00:00Z' WHERE id = ?1",
            [old_done.id.to_string()],
        )
        .unwrap();

        let deleted = delete_finished_older_than(&conn, 7).unwrap();
        assert_eq!(deleted, 1);
        assert!(get_job(&conn, old_done.id).unwrap().is_none());
        assert!(get_job(&conn, old_pending.id).unwrap().is_some());
    }
}
