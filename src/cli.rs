use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "reelforge")]
#[command(author, version, about = "Adaptive-bitrate video conversion engine")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the conversion worker loop
    Worker {
        /// Local directory that virtual input paths resolve under
        #[arg(long, default_value = "/")]
        storage_root: PathBuf,
    },

    /// Submit a conversion job
    Submit {
        /// Virtual path of the source file
        input: String,

        /// Identity of the requesting user
        #[arg(long)]
        owner: String,

        /// Display name of the source media (defaults to the file name)
        #[arg(long)]
        source_ref: Option<String>,

        /// Inline JSON job config (encoding profile or legacy parameters)
        #[arg(long, default_value = "{}")]
        profile: String,
    },

    /// List jobs
    Jobs {
        /// Only list jobs belonging to this owner
        #[arg(long)]
        owner: Option<String>,
    },

    /// Show one job in detail
    Show {
        /// Job id
        id: String,
    },

    /// Delete a job
    Delete {
        /// Job id
        id: String,
    },

    /// Delete finished jobs older than the retention age
    Cleanup {
        /// Override the configured retention age in days
        #[arg(long)]
        days: Option<u32>,
    },

    /// Probe a media file and print what planning would see
    Probe {
        /// Local path of the file to probe
        file: PathBuf,
    },

    /// Check that external tools are available
    CheckTools,

    /// Validate the configuration file
    Validate,
}
