//! Post-conversion artifact verification.
//!
//! A conversion only counts as completed when every artifact the plan
//! promised actually exists on disk: the DASH manifest, the per-
//! representation init segments, at least one media chunk, and (when HLS
//! was generated) the master plus one variant playlist per rendition.
//! Anything missing fails the job; there is no partial success.

use std::fs;
use std::path::Path;

use rf_core::{Error, Result};
use rf_plan::{AdaptivePlan, LegacyPlan, OutputLayout, Pipeline};

/// Verify that the executed pipeline produced its expected artifacts.
pub fn verify_artifacts(pipeline: &Pipeline, layout: &OutputLayout) -> Result<()> {
    let missing = match pipeline {
        Pipeline::Adaptive(plan) => adaptive_missing(plan, layout),
        Pipeline::Legacy(plan) => legacy_missing(plan),
    };

    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::artifact(format!(
            "missing expected artifacts in output folder: {}",
            missing.join(", ")
        )))
    }
}

fn adaptive_missing(plan: &AdaptivePlan, layout: &OutputLayout) -> Vec<String> {
    let mut missing = Vec::new();

    let manifest = layout.manifest_path();
    if !manifest.is_file() {
        missing.push(display_name(&manifest));
    }

    // One representation per rendition, plus the shared audio stream.
    let expected_reps = plan.variants.len() + usize::from(plan.has_audio);
    let (inits, chunks) = count_segments(&layout.segments_dir());
    if inits < expected_reps {
        missing.push(format!(
            "segments/init-* ({inits} of {expected_reps} representations)"
        ));
    }
    if chunks == 0 {
        missing.push("segments/chunk-*".to_string());
    }

    if plan.hls_generated {
        let master = layout.master_playlist_path();
        if !master.is_file() {
            missing.push(display_name(&master));
        }
        for i in 0..plan.variants.len() {
            let variant = layout.variant_playlist_path(i);
            if !variant.is_file() {
                missing.push(display_name(&variant));
            }
        }
    }

    missing
}

fn legacy_missing(plan: &LegacyPlan) -> Vec<String> {
    let nonempty = fs::metadata(&plan.output_file)
        .map(|m| m.len() > 0)
        .unwrap_or(false);

    if nonempty {
        Vec::new()
    } else {
        vec![display_name(&plan.output_file)]
    }
}

/// Count init and chunk segment files in the segments directory.
fn count_segments(segments_dir: &Path) -> (usize, usize) {
    let Ok(entries) = fs::read_dir(segments_dir) else {
        return (0, 0);
    };

    let mut inits = 0;
    let mut chunks = 0;
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with("init-") {
            inits += 1;
        } else if name.starts_with("chunk-") {
            chunks += 1;
        }
    }
    (inits, chunks)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
