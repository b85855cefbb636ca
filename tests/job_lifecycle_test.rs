//! End-to-end job lifecycle tests over an in-memory store.
//!
//! These drive the real scheduler cycle and orchestrator wiring without an
//! encoder: the success paths that need ffmpeg are covered by unit tests on
//! the planner and runner, while the lifecycle invariants (claiming, retry
//! ceiling, failure persistence, config round-trip) are exercised here.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use reelforge::orchestrator::{JobExecutor, Orchestrator};
use reelforge::rescan::NoopReindexer;
use reelforge::resolve::LocalFileResolver;
use reelforge::service::JobService;
use reelforge::worker::{run_cycle, CycleOutcome, WorkerIdentity};
use rf_av::ToolRegistry;
use rf_core::config::ToolsConfig;
use rf_db::models::JobStatus;
use rf_db::pool::{init_memory_pool, DbPool};
use rf_db::queries::video_jobs;

struct CountingExecutor {
    calls: AtomicUsize,
}

#[async_trait]
impl JobExecutor for CountingExecutor {
    async fn execute(&self, _job: &rf_db::models::VideoJob) -> rf_core::Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }
}

fn identity() -> WorkerIdentity {
    WorkerIdentity {
        hostname: "ci-host".into(),
        pid: 7,
    }
}

fn orchestrator_rooted_at(pool: &DbPool, root: &std::path::Path) -> Orchestrator {
    Orchestrator::new(
        pool.clone(),
        Arc::new(ToolRegistry::discover(&ToolsConfig::default())),
        Arc::new(LocalFileResolver::new(root)),
        Arc::new(NoopReindexer),
    )
}

const PROFILE: &str = r#"{
    "profile": {
        "formats": ["hls"],
        "renditions": {
            "1080p": {"enabled": true, "videoBitrate": 5000, "audioBitrate": 128},
            "480p": {"enabled": true, "videoBitrate": 1200, "audioBitrate": 96}
        },
        "videoCodec": "libx264",
        "preset": "fast"
    },
    "callerTag": "lifecycle-test"
}"#;

#[test]
fn submitted_profile_round_trips_through_the_store() {
    let pool = init_memory_pool().unwrap();
    let service = JobService::new(pool);

    let job = service
        .submit("alice", "movie.mkv", "/movies/movie.mkv", PROFILE)
        .unwrap();
    let stored = service.get(job.id).unwrap().unwrap();

    // Verbatim storage: nothing dropped, nothing mutated.
    assert_eq!(stored.config, PROFILE);
    assert_eq!(stored.status, JobStatus::Pending);
    assert_eq!(stored.progress, 0);
    assert_eq!(stored.retry_count, 0);
    assert!(stored.started_at.is_none());
    assert!(stored.finished_at.is_none());
}

#[tokio::test]
async fn jobs_are_claimed_oldest_first() {
    let pool = init_memory_pool().unwrap();
    let conn = pool.get().unwrap();
    let first = video_jobs::insert_job(&conn, "u", "a", "/a.mkv", "{}").unwrap();
    conn.execute(
        "UPDATE video_jobs SET created_at = '2026-01-01T00:00:00Z' WHERE id = ?1",
        [first.id.to_string()],
    )
    .unwrap();
    let second = video_jobs::insert_job(&conn, "u", "b", "/b.mkv", "{}").unwrap();
    drop(conn);

    let executor = CountingExecutor {
        calls: AtomicUsize::new(0),
    };

    let outcome = run_cycle(&pool, &executor, &identity(), 3).await.unwrap();
    assert_eq!(outcome, CycleOutcome::Completed(first.id));

    let outcome = run_cycle(&pool, &executor, &identity(), 3).await.unwrap();
    assert_eq!(outcome, CycleOutcome::Completed(second.id));

    let outcome = run_cycle(&pool, &executor, &identity(), 3).await.unwrap();
    assert_eq!(outcome, CycleOutcome::Idle);
    assert_eq!(executor.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn missing_source_file_fails_and_bumps_retry() {
    let tmp = tempfile::tempdir().unwrap();
    let pool = init_memory_pool().unwrap();
    let service = JobService::new(pool.clone());
    let orchestrator = orchestrator_rooted_at(&pool, tmp.path());

    let job = service
        .submit("alice", "gone.mkv", "/movies/gone.mkv", PROFILE)
        .unwrap();

    let outcome = run_cycle(&pool, &orchestrator, &identity(), 3).await.unwrap();
    assert_eq!(outcome, CycleOutcome::Failed(job.id));

    let stored = service.get(job.id).unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Failed);
    assert_eq!(stored.retry_count, 1);
    assert!(stored.finished_at.is_some());
    assert!(stored
        .error_message
        .as_deref()
        .unwrap()
        .contains("not found"));
}

#[tokio::test]
async fn failed_jobs_are_not_requeued_automatically() {
    let tmp = tempfile::tempdir().unwrap();
    let pool = init_memory_pool().unwrap();
    let service = JobService::new(pool.clone());
    let orchestrator = orchestrator_rooted_at(&pool, tmp.path());

    service
        .submit("alice", "gone.mkv", "/movies/gone.mkv", PROFILE)
        .unwrap();
    run_cycle(&pool, &orchestrator, &identity(), 3).await.unwrap();

    // The failed job stays failed: the next cycle finds nothing to claim.
    let outcome = run_cycle(&pool, &orchestrator, &identity(), 3).await.unwrap();
    assert_eq!(outcome, CycleOutcome::Idle);
}

#[tokio::test]
async fn retry_ceiling_skips_execution_entirely() {
    let pool = init_memory_pool().unwrap();
    let conn = pool.get().unwrap();
    let job = video_jobs::insert_job(&conn, "alice", "m", "/m.mkv", PROFILE).unwrap();
    conn.execute(
        "UPDATE video_jobs SET retry_count = 3 WHERE id = ?1",
        [job.id.to_string()],
    )
    .unwrap();
    drop(conn);

    let executor = CountingExecutor {
        calls: AtomicUsize::new(0),
    };
    let outcome = run_cycle(&pool, &executor, &identity(), 3).await.unwrap();

    assert_eq!(outcome, CycleOutcome::MaxRetriesExceeded(job.id));
    assert_eq!(executor.calls.load(Ordering::SeqCst), 0);

    let conn = pool.get().unwrap();
    let stored = video_jobs::get_job(&conn, job.id).unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Failed);
    assert!(stored.error_message.as_deref().unwrap().contains("retry"));
}

#[tokio::test]
async fn derived_fields_are_persisted_before_execution_fails() {
    // A job whose source exists but whose encode fails (ffmpeg absent or
    // broken input) must still leave the derived output layout in its
    // config for diagnostics.
    let tmp = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(tmp.path().join("movies")).unwrap();
    std::fs::write(tmp.path().join("movies/clip.mkv"), b"not a real video").unwrap();

    let pool = init_memory_pool().unwrap();
    let service = JobService::new(pool.clone());
    let orchestrator = orchestrator_rooted_at(&pool, tmp.path());

    let job = service
        .submit("alice", "clip.mkv", "/movies/clip.mkv", PROFILE)
        .unwrap();

    let outcome = run_cycle(&pool, &orchestrator, &identity(), 3).await.unwrap();
    // The bogus input cannot produce verified artifacts whatever ffmpeg's
    // availability, so this attempt fails.
    assert_eq!(outcome, CycleOutcome::Failed(job.id));

    let stored = service.get(job.id).unwrap().unwrap();
    let config = rf_plan::JobConfig::from_json(&stored.config).unwrap();
    assert!(config.output_directory.is_some());
    assert!(config.media_directory.is_some());
    assert_eq!(config.output_base_name.as_deref(), Some("clip"));
    assert!(config
        .output_public_path
        .as_deref()
        .unwrap()
        .starts_with("/movies/clip_"));
    // Caller fields survived every rewrite.
    assert_eq!(config.extra["callerTag"], "lifecycle-test");
}
