//! Conversion orchestrator.
//!
//! Drives one claimed job's single execution attempt: resolves the input,
//! derives and persists the output layout, plans the pipeline, runs it with
//! live progress, then normalizes, re-indexes, and verifies the output.
//! Every failure path persists an error message and bumps the retry
//! counter; there are no partial-success states.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Local;

use rf_av::{probe_source, EncodeRunner, RunnerHooks, SourceInfo, ToolRegistry};
use rf_core::{Error, Result};
use rf_db::models::{JobStatus, VideoJob};
use rf_db::pool::DbPool;
use rf_db::queries::video_jobs;
use rf_plan::{build_pipeline, JobConfig, OutputLayout, Pipeline};

use crate::assets;
use crate::postprocess;
use crate::rescan::Reindexer;
use crate::resolve::{public_output_path, FileResolver};
use crate::verify;

/// Executes one claimed job.  The worker scheduler only depends on this
/// trait so its retry-ceiling behaviour is testable without an encoder.
#[async_trait]
pub trait JobExecutor: Send + Sync {
    /// Run one execution attempt for a job already in `processing`.
    ///
    /// Returns `Ok(true)` on success and `Ok(false)` when the attempt
    /// failed and the failure was persisted.  An `Err` means the store
    /// itself is unavailable.
    async fn execute(&self, job: &VideoJob) -> Result<bool>;
}

/// The production conversion orchestrator.
pub struct Orchestrator {
    pool: DbPool,
    tools: Arc<ToolRegistry>,
    resolver: Arc<dyn FileResolver>,
    reindexer: Arc<dyn Reindexer>,
}

impl Orchestrator {
    pub fn new(
        pool: DbPool,
        tools: Arc<ToolRegistry>,
        resolver: Arc<dyn FileResolver>,
        reindexer: Arc<dyn Reindexer>,
    ) -> Self {
        Self {
            pool,
            tools,
            resolver,
            reindexer,
        }
    }

    /// The fallible body of one execution attempt; any `Err` becomes the
    /// job's persisted failure.
    async fn try_execute(&self, job: &VideoJob) -> Result<()> {
        let mut config = JobConfig::from_json(&job.config)?;

        // Resolve the virtual input and fail fast when it is gone.
        let local_input = self.resolver.resolve(&job.input_path);
        if !local_input.is_file() {
            return Err(Error::not_found("source file", local_input.display()));
        }

        tracing::info!(job_id = %job.id, input = %local_input.display(), "processing job");

        // Derive the timestamp-qualified output layout and persist it into
        // the config before any encoding starts, so a crash mid-run leaves
        // enough state to diagnose and clean up.
        let layout = derive_layout(&local_input);
        let folder_name = layout
            .output_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        config.output_directory = Some(layout.output_dir.to_string_lossy().to_string());
        config.media_directory = Some(layout.media_dir.to_string_lossy().to_string());
        config.output_base_name = Some(layout.base_name.clone());
        config.output_folder = Some(folder_name.clone());
        config.output_timestamp = folder_name
            .strip_prefix(&format!("{}_", layout.base_name))
            .map(|s| s.to_string());
        config.output_public_path = Some(public_output_path(&job.input_path, &folder_name));

        {
            let conn = rf_db::pool::get_conn(&self.pool)?;
            video_jobs::update_config(&conn, job.id, &config.to_json()?)?;
        }

        // Probe the source; a failed probe disables progress reporting and
        // audio mapping but does not block the encode.
        let source = match probe_source(&self.tools, &local_input).await {
            Ok(info) => info,
            Err(e) => {
                tracing::warn!(job_id = %job.id, "source probe failed: {e}");
                SourceInfo {
                    duration_secs: 0.0,
                    has_audio: false,
                    width: None,
                    height: None,
                }
            }
        };

        let pipeline = build_pipeline(&local_input, &config, source.has_audio, &layout);
        let command = match &pipeline {
            Pipeline::Adaptive(plan) => plan.commands.render(),
            Pipeline::Legacy(plan) => {
                tracing::info!(job_id = %job.id, "profile not adaptive; using legacy single-output pipeline");
                plan.commands.render()
            }
        };
        tracing::info!(job_id = %job.id, "executing: {command}");

        let hooks = self.job_hooks(job, &config);
        let runner = EncodeRunner::new(&self.tools);
        let outcome = runner.run(&command, &local_input, &hooks).await?;

        if !outcome.success() {
            return Err(Error::tool(
                "ffmpeg",
                format!(
                    "pipeline exited with code {}\n{}",
                    outcome.exit_code,
                    outcome.stderr_tail.trim_end()
                ),
            ));
        }

        // Post-processing: stable naming, sidecar assets, re-index.
        if let Pipeline::Adaptive(plan) = &pipeline {
            if plan.hls_generated {
                postprocess::normalize_hls_output(&layout.media_dir)?;
            }
        }

        assets::copy_sidecar_assets(
            &self.tools,
            &local_input,
            &layout.media_dir,
            config.subtitles_enabled(),
        )
        .await;

        if let Some(ref public_path) = config.output_public_path {
            self.reindexer.reindex(public_path);
        }

        verify::verify_artifacts(&pipeline, &layout)?;

        let conn = rf_db::pool::get_conn(&self.pool)?;
        video_jobs::update_status(&conn, job.id, JobStatus::Completed, None)?;
        video_jobs::update_progress(&conn, job.id, 100)?;

        Ok(())
    }

    /// Runner hooks that persist the encoder pid and throttled progress
    /// into the job record.
    fn job_hooks(&self, job: &VideoJob, config: &JobConfig) -> RunnerHooks {
        let job_id = job.id;

        let pid_pool = self.pool.clone();
        let pid_config = config.clone();
        let progress_pool = self.pool.clone();

        RunnerHooks::new(
            move |pid| {
                let mut cfg = pid_config.clone();
                cfg.encoder_pid = Some(pid);
                let Ok(json) = cfg.to_json() else { return };
                match pid_pool.get() {
                    Ok(conn) => {
                        if let Err(e) = video_jobs::update_config(&conn, job_id, &json) {
                            tracing::warn!(job_id = %job_id, "failed to persist encoder pid: {e}");
                        }
                    }
                    Err(e) => tracing::warn!(job_id = %job_id, "failed to persist encoder pid: {e}"),
                }
            },
            move |pct| {
                if let Ok(conn) = progress_pool.get() {
                    if let Err(e) = video_jobs::update_progress(&conn, job_id, pct) {
                        tracing::warn!(job_id = %job_id, "failed to persist progress: {e}");
                    }
                }
            },
        )
    }
}

#[async_trait]
impl JobExecutor for Orchestrator {
    async fn execute(&self, job: &VideoJob) -> Result<bool> {
        match self.try_execute(job).await {
            Ok(()) => {
                tracing::info!(job_id = %job.id, "job completed successfully");
                Ok(true)
            }
            Err(e) => {
                let message = e.to_string();
                tracing::error!(job_id = %job.id, "job failed: {message}");

                let conn = rf_db::pool::get_conn(&self.pool)?;
                video_jobs::update_status(&conn, job.id, JobStatus::Failed, Some(&message))?;
                video_jobs::increment_retry(&conn, job.id)?;
                Ok(false)
            }
        }
    }
}

/// Derive the timestamp-qualified output layout for a local source file:
/// `<parent>/<base>_<timestamp>/` with a `<base>/` media subdirectory for
/// manifests and segments.
fn derive_layout(local_input: &Path) -> OutputLayout {
    let base_name = local_input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    let timestamp = Local::now().format("%Y_%m_%d_%H_%M_%S").to_string();
    let folder_name = format!("{base_name}_{timestamp}");

    let parent = local_input.parent().unwrap_or_else(|| Path::new("."));
    let output_dir = parent.join(folder_name);
    let media_dir = output_dir.join(&base_name);

    OutputLayout {
        output_dir,
        media_dir,
        base_name,
    }
}
