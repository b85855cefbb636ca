//! Post-conversion re-index hook.
//!
//! After a successful conversion the hosting platform has to pick up the
//! new output folder.  The hook is a configured shell command, spawned
//! fire-and-forget so indexing latency never blocks the worker loop.

use std::sync::Arc;

use rf_core::config::RescanConfig;
use rf_plan::command::shell_quote;

/// Asks the hosting platform to index a freshly written output path.
pub trait Reindexer: Send + Sync {
    fn reindex(&self, public_path: &str);
}

/// Reindexer that runs a configured shell command.
///
/// A `{path}` placeholder in the command is replaced with the quoted public
/// output path.
pub struct CommandReindexer {
    command: String,
}

impl CommandReindexer {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    fn render(&self, public_path: &str) -> String {
        self.command.replace("{path}", &shell_quote(public_path))
    }
}

impl Reindexer for CommandReindexer {
    fn reindex(&self, public_path: &str) {
        let cmd = self.render(public_path);
        tracing::info!("spawning re-index command: {cmd}");

        let spawned = std::process::Command::new("sh")
            .arg("-c")
            .arg(&cmd)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn();

        match spawned {
            // Deliberately not waited on.
            Ok(_child) => {}
            Err(e) => tracing::warn!("failed to spawn re-index command: {e}"),
        }
    }
}

/// Reindexer used when no command is configured.
pub struct NoopReindexer;

impl Reindexer for NoopReindexer {
    fn reindex(&self, _public_path: &str) {}
}

/// Build the reindexer selected by the config.
pub fn from_config(cfg: &RescanConfig) -> Arc<dyn Reindexer> {
    match cfg.command {
        Some(ref cmd) if !cmd.trim().is_empty() => Arc::new(CommandReindexer::new(cmd.clone())),
        _ => Arc::new(NoopReindexer),
    }
}
