//! Legacy single-output encode plan.
//!
//! Older submission callers send a flat parameter set (output type, preset,
//! codec, bitrate index, named scale, movflags) instead of an encoding
//! profile.  The resulting plan is one encode of one file next to the
//! source, with no segmentation.

use std::path::{Path, PathBuf};

use crate::command::{CommandPlan, Invocation};
use crate::profile::JobConfig;

/// Plan for the legacy single-file encode.
#[derive(Debug, Clone)]
pub struct LegacyPlan {
    pub commands: CommandPlan,
    /// The single file the encode produces.
    pub output_file: PathBuf,
}

/// Bitrate index ("1".."7") to ffmpeg bitrate mapping.
fn map_vbitrate(index: &str) -> &'static str {
    match index {
        "1" => "1000k",
        "2" => "2000k",
        "3" => "3000k",
        "4" => "4000k",
        "5" => "5000k",
        "6" => "6000k",
        "7" => "7000k",
        _ => "2000k",
    }
}

/// Named scale to ffmpeg scale filter mapping.
fn map_scale(scale: &str) -> Option<&'static str> {
    match scale {
        "vga" => Some("scale=640:480"),
        "wxga" => Some("scale=1280:720"),
        "hd" => Some("scale=1368:768"),
        "fhd" => Some("scale=1920:1080"),
        "uhd" => Some("scale=3840:2160"),
        "320" => Some("scale=-1:320"),
        "480" => Some("scale=-1:480"),
        "600" => Some("scale=-1:600"),
        "720" => Some("scale=-1:720"),
        "1080" => Some("scale=-1:1080"),
        _ => None,
    }
}

/// Build the legacy plan from the flat parameter set.
pub fn build_legacy_plan(input: &Path, config: &JobConfig) -> LegacyPlan {
    let output_type = config.output_type.as_deref().unwrap_or("mp4");
    let preset = config.preset.as_deref().unwrap_or("slow");
    let codec = config.codec.as_deref();

    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    let output_file = input
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(format!("{stem}.{output_type}"));

    let mut inv = Invocation::new("ffmpeg")
        .arg("-y")
        .arg("-i")
        .arg(input.to_string_lossy());

    if codec == Some("copy") {
        inv = inv.arg("-codec").arg("copy");
    } else if output_type == "webm" {
        // VP8 speed ladder keyed off the requested preset.
        let cpu_used = match preset {
            "faster" => Some("1"),
            "veryfast" => Some("2"),
            "superfast" => Some("4"),
            "ultrafast" => Some("5"),
            _ => None,
        };
        if let Some(level) = cpu_used {
            inv = inv.args(["-vcodec", "libvpx", "-cpu-used", level, "-threads", "16"]);
            if preset == "ultrafast" {
                inv = inv.args(["-deadline", "realtime"]);
            }
        }
    } else {
        match codec {
            Some("x264") => {
                inv = inv.args(["-vcodec", "libx264", "-preset", preset, "-strict", "-2"]);
            }
            Some("x265") => {
                inv = inv.args(["-vcodec", "libx265", "-preset", preset, "-strict", "-2"]);
            }
            Some("vp9") => {
                inv = inv.args(["-vcodec", "libvpx-vp9", "-preset", preset]);
            }
            _ => {
                inv = inv.args(["-preset", preset, "-strict", "-2"]);
            }
        }

        if config.movflags {
            inv = inv.arg("-movflags").arg("+faststart");
        }

        if let Some(ref index) = config.vbitrate {
            inv = inv.arg("-b:v").arg(map_vbitrate(index));
        }

        if let Some(filter) = config.scale.as_deref().and_then(map_scale) {
            inv = inv.arg("-vf").arg(filter);
        }
    }

    inv = inv.arg(output_file.to_string_lossy());

    let mut commands = CommandPlan::new();
    commands.push(inv.nice(config.priority()));

    LegacyPlan {
        commands,
        output_file,
    }
}
