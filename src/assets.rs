//! Sidecar asset handling.
//!
//! A conversion carries its source's poster image and subtitle files into
//! the media directory so players can pick them up next to the manifests.
//! SRT subtitles are converted to WebVTT on the way.  Asset problems are
//! logged, never escalated: a missing poster must not fail an otherwise
//! successful conversion.

use std::fs;
use std::path::Path;

use rf_av::{ToolCommand, ToolRegistry};

/// Poster extensions, probed in order; the first match wins.
const POSTER_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// Copy poster and subtitle assets belonging to `local_input` into
/// `media_dir`.
pub async fn copy_sidecar_assets(
    tools: &ToolRegistry,
    local_input: &Path,
    media_dir: &Path,
    subtitles: bool,
) {
    let Some(base_name) = local_input.file_stem().map(|s| s.to_string_lossy().to_string())
    else {
        return;
    };
    let input_dir = local_input.parent().unwrap_or_else(|| Path::new("."));

    if !media_dir.is_dir() {
        if let Err(e) = fs::create_dir_all(media_dir) {
            tracing::warn!("cannot create media dir {}: {e}", media_dir.display());
            return;
        }
    }

    copy_poster(input_dir, media_dir, &base_name);

    if subtitles {
        copy_subtitles(tools, input_dir, media_dir, &base_name).await;
    }
}

fn copy_poster(input_dir: &Path, media_dir: &Path, base_name: &str) {
    for ext in POSTER_EXTENSIONS {
        let src = input_dir.join(format!("{base_name}.{ext}"));
        if src.is_file() {
            let dst = media_dir.join(format!("{base_name}.{ext}"));
            match fs::copy(&src, &dst) {
                Ok(_) => tracing::info!("copied poster asset: {}", src.display()),
                Err(e) => tracing::warn!("failed to copy poster {}: {e}", src.display()),
            }
            break;
        }
    }
}

async fn copy_subtitles(tools: &ToolRegistry, input_dir: &Path, media_dir: &Path, base_name: &str) {
    let entries = match fs::read_dir(input_dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("cannot scan {} for subtitles: {e}", input_dir.display());
            return;
        }
    };

    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        if !name.starts_with(base_name) {
            continue;
        }

        if name.ends_with(".vtt") {
            let dst = media_dir.join(&name);
            if let Err(e) = fs::copy(entry.path(), &dst) {
                tracing::warn!("failed to copy subtitle {name}: {e}");
            } else {
                tracing::info!("copied VTT subtitle: {name}");
            }
        } else if name.ends_with(".srt") {
            convert_srt_to_vtt(tools, &entry.path(), media_dir).await;
        }
    }
}

/// Convert one SRT file to WebVTT next to the manifests.
async fn convert_srt_to_vtt(tools: &ToolRegistry, srt: &Path, media_dir: &Path) {
    let ffmpeg = match tools.require("ffmpeg") {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::warn!("skipping subtitle conversion: {e}");
            return;
        }
    };

    let Some(stem) = srt.file_stem().map(|s| s.to_string_lossy().to_string()) else {
        return;
    };
    let dst = media_dir.join(format!("{stem}.vtt"));

    let mut cmd = ToolCommand::new(ffmpeg.path.clone());
    cmd.arg("-y")
        .arg("-i")
        .arg(srt.to_string_lossy())
        .arg("-f")
        .arg("webvtt")
        .arg(dst.to_string_lossy());

    match cmd.execute().await {
        Ok(_) => tracing::info!("converted subtitle {} -> {}", srt.display(), dst.display()),
        Err(e) => tracing::warn!("failed to convert subtitle {}: {e}", srt.display()),
    }
}
