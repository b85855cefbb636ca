//! Source-file probing via ffprobe.
//!
//! Shells out to `ffprobe -v quiet -print_format json -show_format
//! -show_streams` and extracts the facts planning and progress tracking
//! need: container duration and whether an audio track is present.

use std::path::Path;

use serde::Deserialize;

use crate::command::ToolCommand;
use crate::tools::ToolRegistry;

/// Facts about a source file relevant to planning and progress tracking.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceInfo {
    /// Container duration in seconds; 0.0 when the probe could not tell.
    pub duration_secs: f64,
    /// Whether the source carries at least one audio track.
    pub has_audio: bool,
    /// Primary video resolution, when present.
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Probe a source file.
///
/// # Errors
///
/// Returns [`rf_core::Error::Tool`] when ffprobe is missing or exits
/// non-zero, and [`rf_core::Error::Probe`] when its output cannot be
/// parsed.
pub async fn probe_source(tools: &ToolRegistry, path: &Path) -> rf_core::Result<SourceInfo> {
    let ffprobe = tools.require("ffprobe")?;

    let mut cmd = ToolCommand::new(ffprobe.path.clone());
    cmd.args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"]);
    cmd.arg(path.to_string_lossy());

    let output = cmd.execute().await?;
    let ff: FfprobeOutput = serde_json::from_str(&output.stdout)
        .map_err(|e| rf_core::Error::Probe(format!("ffprobe JSON parse error: {e}")))?;

    Ok(parse_probe_output(ff))
}

/// Duration of a source file, or 0.0 when probing fails for any reason.
///
/// Progress reporting is disabled for a zero duration, but the encode still
/// proceeds.
pub async fn duration_or_zero(tools: &ToolRegistry, path: &Path) -> f64 {
    match probe_source(tools, path).await {
        Ok(info) => info.duration_secs,
        Err(e) => {
            tracing::warn!("duration probe failed for {}: {e}", path.display());
            0.0
        }
    }
}

// ---------------------------------------------------------------------------
// JSON structures
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

fn parse_probe_output(output: FfprobeOutput) -> SourceInfo {
    let duration_secs = output
        .format
        .duration
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0);

    let has_audio = output
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    let video = output
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));

    SourceInfo {
        duration_secs,
        has_audio,
        width: video.and_then(|v| v.width),
        height: video.and_then(|v| v.height),
    }
}
