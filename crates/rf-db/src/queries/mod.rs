//! Query layer: one module per table.

pub mod video_jobs;
