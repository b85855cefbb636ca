//! HLS output normalization.
//!
//! The encoder's HLS muxer names variant playlists and segments with a
//! `stream` infix; the public layout serves them under stable `media_<n>`
//! playlists and `segments/`-prefixed URIs.  The mapping is expressed as
//! pure rename/rewrite functions applied to the output directory by a thin
//! filesystem driver, so the naming scheme itself is unit-testable.

use std::fs;
use std::path::Path;

use rf_core::Result;

/// New name for a segment file, if it needs one.
pub fn segment_rename(file_name: &str) -> Option<String> {
    if file_name.contains("stream") {
        Some(file_name.replace("stream", ""))
    } else {
        None
    }
}

/// New name for a playlist file, if it needs one.
pub fn playlist_rename(file_name: &str) -> Option<String> {
    if file_name.starts_with("media_stream") && file_name.ends_with(".m3u8") {
        Some(file_name.replace("media_stream", "media_"))
    } else {
        None
    }
}

/// Rewrite playlist text to the public naming scheme: strip the `stream`
/// infix from playlist and segment references and anchor segment URIs under
/// `segments/`.
pub fn rewrite_playlist(content: &str) -> String {
    let replaced = content
        .replace("media_stream", "media_")
        .replace("chunk-stream", "chunk-")
        .replace("init-stream", "init-")
        .replace("init-%v", "init-")
        .replace("URI=\"init-", "URI=\"segments/init-");

    let ends_with_newline = replaced.ends_with('\n');
    let mut lines: Vec<String> = replaced
        .lines()
        .map(|line| {
            if line.starts_with("chunk-") {
                format!("segments/{line}")
            } else {
                line.to_string()
            }
        })
        .collect();

    if ends_with_newline {
        lines.push(String::new());
    }

    lines.join("\n").replace("segments/segments/", "segments/")
}

/// Apply the rename map and playlist rewrites to a media directory.
pub fn normalize_hls_output(media_dir: &Path) -> Result<()> {
    let segments_dir = media_dir.join("segments");

    if segments_dir.is_dir() {
        for entry in fs::read_dir(&segments_dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(new_name) = segment_rename(&name) {
                fs::rename(entry.path(), segments_dir.join(new_name))?;
            }
        }
    }

    if media_dir.is_dir() {
        for entry in fs::read_dir(media_dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(new_name) = playlist_rename(&name) {
                fs::rename(entry.path(), media_dir.join(new_name))?;
            }
        }

        for entry in fs::read_dir(media_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().is_some_and(|e| e == "m3u8") {
                let content = fs::read_to_string(&path)?;
                let rewritten = rewrite_playlist(&content);
                if rewritten != content {
                    fs::write(&path, rewritten)?;
                }
            }
        }
    }

    Ok(())
}
