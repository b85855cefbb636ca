//! Adaptive pipeline planning.
//!
//! `(input file, job config, source-has-audio) -> pipeline`: resolves the
//! bitrate ladder, generates the split/scale filter graph, per-rendition
//! codec arguments, and the DASH/HLS packaging directives.  Falls back to
//! the legacy single-output plan when the config cannot drive an adaptive
//! package.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rf_core::{AudioCodec, ContainerFormat, SpeedPreset, VideoCodec};

use crate::command::{CommandPlan, Invocation};
use crate::legacy::{build_legacy_plan, LegacyPlan};
use crate::presets::preset_for;
use crate::profile::{DashOptions, HlsOptions, JobConfig, RenditionRequest};

// ---------------------------------------------------------------------------
// Plan types
// ---------------------------------------------------------------------------

/// Filesystem layout of one conversion's output, derived by the
/// orchestrator before planning.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    /// Timestamp-qualified folder next to the source file.
    pub output_dir: PathBuf,
    /// Media subdirectory holding manifests, playlists, and assets.
    pub media_dir: PathBuf,
    /// Source file stem, used to name manifests.
    pub base_name: String,
}

impl OutputLayout {
    pub fn segments_dir(&self) -> PathBuf {
        self.media_dir.join("segments")
    }

    /// DASH manifest path.
    pub fn manifest_path(&self) -> PathBuf {
        self.media_dir.join(format!("{}.mpd", self.base_name))
    }

    /// HLS master playlist path.
    pub fn master_playlist_path(&self) -> PathBuf {
        self.media_dir.join(format!("{}.m3u8", self.base_name))
    }

    /// HLS variant playlist path for stream index `i`.
    pub fn variant_playlist_path(&self, i: usize) -> PathBuf {
        self.media_dir.join(format!("media_{i}.m3u8"))
    }
}

/// One resolved rung of the bitrate ladder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    /// Rendition key from the profile ("1080p", ...).
    pub key: String,
    /// Display label embedded into stream metadata.
    pub label: String,
    pub width: u32,
    pub height: u32,
    /// Video bitrate in kbit/s.
    pub video_bitrate: u32,
    /// Audio bitrate in kbit/s.
    pub audio_bitrate: u32,
}

/// The executable plan for one job.
#[derive(Debug, Clone)]
pub enum Pipeline {
    Adaptive(AdaptivePlan),
    Legacy(LegacyPlan),
}

/// Adaptive DASH/HLS package plan.
#[derive(Debug, Clone)]
pub struct AdaptivePlan {
    pub commands: CommandPlan,
    /// Ladder sorted by descending height.
    pub variants: Vec<Variant>,
    pub has_audio: bool,
    pub video_codec: VideoCodec,
    /// False when the codec ruled HLS out (DASH is still produced).
    pub hls_generated: bool,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Build the pipeline for one job.
///
/// Planning never fails: a config that cannot drive an adaptive package
/// (no recognized formats, no usable renditions) selects the legacy
/// single-output plan instead.
pub fn build_pipeline(
    input: &Path,
    config: &JobConfig,
    has_audio: bool,
    layout: &OutputLayout,
) -> Pipeline {
    match build_adaptive_plan(input, config, has_audio, layout) {
        Some(plan) => Pipeline::Adaptive(plan),
        None => Pipeline::Legacy(build_legacy_plan(input, config)),
    }
}

fn build_adaptive_plan(
    input: &Path,
    config: &JobConfig,
    has_audio: bool,
    layout: &OutputLayout,
) -> Option<AdaptivePlan> {
    let mut formats = config.requested_formats();
    if formats.is_empty() {
        return None;
    }
    // Any adaptive request packages both formats: once the ladder is
    // encoded, the second packaging is nearly free.
    formats = vec![ContainerFormat::Dash, ContainerFormat::Hls];

    let variants = resolve_enabled_variants(config.requested_renditions());
    if variants.is_empty() {
        return None;
    }

    let video_codec = config.video_codec();
    let audio_codec = config.audio_codec();
    let preset = config.speed_preset();
    let keyframe_interval = config.keyframe_interval();
    let segment_duration = config.segment_duration();

    let wants_dash = formats.contains(&ContainerFormat::Dash);
    let wants_hls = formats.contains(&ContainerFormat::Hls);

    let can_generate_hls = wants_hls && video_codec.hls_compatible();
    if wants_hls && !video_codec.hls_compatible() {
        tracing::warn!(
            codec = %video_codec,
            "codec is not fMP4/HLS-compatible: HLS generation disabled, DASH will be generated"
        );
    }

    let filter = build_filter_graph(&variants);
    let codec_args = video_codec_args(
        &variants,
        &filter.video_labels,
        video_codec,
        preset,
        keyframe_interval,
    );

    let audio_bitrate = shared_audio_bitrate(&variants);
    let dash_options = config
        .profile
        .as_ref()
        .map(|p| p.dash.clone())
        .unwrap_or_default();
    let hls_options = config
        .profile
        .as_ref()
        .map(|p| p.hls.clone())
        .unwrap_or_default();

    let mut commands = CommandPlan::new();
    commands.push(mkdir(&layout.output_dir));
    commands.push(mkdir(&layout.media_dir));
    commands.push(mkdir(&layout.segments_dir()));

    let encode = if wants_dash && can_generate_hls {
        // One DASH invocation with embedded HLS master generation.
        dash_invocation(
            input,
            &filter.graph,
            &codec_args,
            &variants,
            segment_duration,
            &dash_options,
            has_audio,
            &audio_bitrate,
            audio_codec,
            true,
            layout,
        )
    } else if wants_dash || !video_codec.hls_compatible() {
        dash_invocation(
            input,
            &filter.graph,
            &codec_args,
            &variants,
            segment_duration,
            &dash_options,
            has_audio,
            &audio_bitrate,
            audio_codec,
            false,
            layout,
        )
    } else {
        hls_invocation(
            input,
            &filter.graph,
            &codec_args,
            &variants,
            segment_duration,
            &hls_options,
            has_audio,
            &audio_bitrate,
            audio_codec,
            layout,
        )
    };

    commands.push(encode.nice(config.priority()));

    Some(AdaptivePlan {
        commands,
        variants,
        has_audio,
        video_codec,
        hls_generated: can_generate_hls,
    })
}

// ---------------------------------------------------------------------------
// Ladder resolution
// ---------------------------------------------------------------------------

/// Resolve the requested renditions against the preset table.
///
/// Disabled entries and unknown labels are dropped; bitrate floors are
/// applied (1000 kbps video, 128 kbps audio); the result is sorted by
/// descending height so the highest-quality stream is always first.
pub fn resolve_enabled_variants(
    renditions: &BTreeMap<String, RenditionRequest>,
) -> Vec<Variant> {
    let mut variants: Vec<Variant> = renditions
        .iter()
        .filter(|(_, r)| r.enabled)
        .filter_map(|(key, r)| {
            let preset = preset_for(key)?;
            Some(Variant {
                key: key.clone(),
                label: r.label.clone().unwrap_or_else(|| preset.label.to_string()),
                width: preset.width,
                height: preset.height,
                video_bitrate: if r.video_bitrate > 0 { r.video_bitrate } else { 1000 },
                audio_bitrate: if r.audio_bitrate > 0 { r.audio_bitrate } else { 128 },
            })
        })
        .collect();

    variants.sort_by(|a, b| b.height.cmp(&a.height));
    variants
}

/// Shared audio bitrate: the maximum requested among enabled renditions.
fn shared_audio_bitrate(variants: &[Variant]) -> String {
    let max = variants.iter().map(|v| v.audio_bitrate).max().unwrap_or(0);
    if max > 0 {
        format!("{max}k")
    } else {
        "128k".to_string()
    }
}

// ---------------------------------------------------------------------------
// Filter graph
// ---------------------------------------------------------------------------

struct FilterGraph {
    graph: String,
    video_labels: Vec<String>,
}

/// Build the video filter graph: one source stream split N ways, each
/// branch scaled to its target with aspect-ratio preservation and
/// even-dimension rounding (codec macroblock alignment).
fn build_filter_graph(variants: &[Variant]) -> FilterGraph {
    let mut parts = Vec::new();
    let mut video_labels = Vec::new();

    if variants.len() == 1 {
        let v = &variants[0];
        parts.push(format!(
            "[0:v]scale=w={}:h={}:force_original_aspect_ratio=decrease,\
             scale=trunc(iw/2)*2:trunc(ih/2)*2[v0_out]",
            v.width, v.height
        ));
        video_labels.push("[v0_out]".to_string());
    } else {
        let split_outputs: String = (0..variants.len()).map(|i| format!("[v{i}]")).collect();
        parts.push(format!("[0:v]split={}{}", variants.len(), split_outputs));

        for (i, v) in variants.iter().enumerate() {
            parts.push(format!(
                "[v{i}]scale=w={}:h={}:force_original_aspect_ratio=decrease,\
                 scale=trunc(iw/2)*2:trunc(ih/2)*2[v{i}_out]",
                v.width, v.height
            ));
            video_labels.push(format!("[v{i}_out]"));
        }
    }

    FilterGraph {
        graph: parts.join(";"),
        video_labels,
    }
}

// ---------------------------------------------------------------------------
// Codec arguments
// ---------------------------------------------------------------------------

/// Per-rendition video codec arguments.
///
/// Buffer size is fixed at twice the bitrate, a conservative VBV default.
/// Rendition identity is embedded as stream metadata so downstream tooling
/// can recover labels from an encoded stream.
fn video_codec_args(
    variants: &[Variant],
    video_labels: &[String],
    codec: VideoCodec,
    preset: SpeedPreset,
    keyframe_interval: u32,
) -> Vec<String> {
    let mut args = Vec::new();

    for (i, variant) in variants.iter().enumerate() {
        let label = video_labels
            .get(i)
            .cloned()
            .unwrap_or_else(|| format!("[v{i}_out]"));
        let bitrate = format!("{}k", variant.video_bitrate);
        let bufsize = format!("{}k", variant.video_bitrate * 2);

        args.extend([
            "-map".to_string(),
            label,
            format!("-c:v:{i}"),
            codec.encoder().to_string(),
            "-preset".to_string(),
            preset.as_str().to_string(),
            format!("-b:v:{i}"),
            bitrate.clone(),
            format!("-maxrate:v:{i}"),
            bitrate,
            format!("-bufsize:v:{i}"),
            bufsize,
            "-g".to_string(),
            keyframe_interval.to_string(),
            "-keyint_min".to_string(),
            keyframe_interval.to_string(),
            "-sc_threshold".to_string(),
            "0".to_string(),
            format!("-metadata:s:v:{i}"),
            format!("variant_bitrate={}", u64::from(variant.video_bitrate) * 1000),
            format!("-metadata:s:v:{i}"),
            format!("variant_id=stream{i}"),
            format!("-metadata:s:v:{i}"),
            format!("variant_label={}", variant.label),
        ]);
    }

    args
}

/// Variant stream map binding each video rendition (and, if present, the
/// shared audio stream) to a named output playlist.
fn var_stream_map(variants: &[Variant], has_audio: bool, name_prefix: &str) -> String {
    variants
        .iter()
        .enumerate()
        .map(|(i, _)| {
            if has_audio {
                format!("v:{i},a:0,name:{name_prefix}{i}")
            } else {
                format!("v:{i},name:{name_prefix}{i}")
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Packaging invocations
// ---------------------------------------------------------------------------

fn mkdir(dir: &Path) -> Invocation {
    Invocation::new("mkdir").arg("-p").arg(dir.to_string_lossy())
}

#[allow(clippy::too_many_arguments)]
fn dash_invocation(
    input: &Path,
    filter_graph: &str,
    codec_args: &[String],
    variants: &[Variant],
    segment_duration: u32,
    options: &DashOptions,
    has_audio: bool,
    audio_bitrate: &str,
    audio_codec: AudioCodec,
    generate_hls_playlist: bool,
    layout: &OutputLayout,
) -> Invocation {
    let mut inv = Invocation::new("ffmpeg")
        .arg("-y")
        .arg("-i")
        .arg(input.to_string_lossy())
        .arg("-filter_complex")
        .arg(filter_graph)
        .args(codec_args.iter().cloned());

    if has_audio {
        inv = inv.args([
            "-map".to_string(),
            "0:a:0".to_string(),
            "-c:a:0".to_string(),
            audio_codec.encoder().to_string(),
            "-b:a:0".to_string(),
            audio_bitrate.to_string(),
            "-ac".to_string(),
            "2".to_string(),
        ]);
    }

    let adaptation_sets = if has_audio {
        "id=0,streams=v id=1,streams=a"
    } else {
        "id=0,streams=v"
    };

    inv = inv.args([
        "-f".to_string(),
        "dash".to_string(),
        "-seg_duration".to_string(),
        segment_duration.max(1).to_string(),
        "-use_template".to_string(),
        (options.use_template as u8).to_string(),
        "-use_timeline".to_string(),
        (options.use_timeline as u8).to_string(),
        "-init_seg_name".to_string(),
        "segments/init-$RepresentationID$.m4s".to_string(),
        "-media_seg_name".to_string(),
        "segments/chunk-$RepresentationID$-$Number$.m4s".to_string(),
        "-adaptation_sets".to_string(),
        adaptation_sets.to_string(),
    ]);

    if generate_hls_playlist {
        inv = inv.args([
            "-hls_playlist".to_string(),
            "1".to_string(),
            "-hls_master_name".to_string(),
            format!("{}.m3u8", layout.base_name),
            "-hls_time".to_string(),
            segment_duration.max(1).to_string(),
            "-hls_segment_type".to_string(),
            "fmp4".to_string(),
            "-hls_flags".to_string(),
            "independent_segments".to_string(),
            "-var_stream_map".to_string(),
            var_stream_map(variants, has_audio, "media_"),
        ]);
    }

    inv.arg(layout.manifest_path().to_string_lossy())
}

/// Standalone fMP4 HLS packaging.
///
/// Runs from inside the segments directory so segment filenames stay
/// relative; playlists land one level up in the media directory.  The
/// `stream` naming this emits is normalized to the public layout by the
/// post-processing rename pass.
#[allow(clippy::too_many_arguments)]
pub fn hls_invocation(
    input: &Path,
    filter_graph: &str,
    codec_args: &[String],
    variants: &[Variant],
    segment_duration: u32,
    options: &HlsOptions,
    has_audio: bool,
    audio_bitrate: &str,
    audio_codec: AudioCodec,
    layout: &OutputLayout,
) -> Invocation {
    let mut inv = Invocation::new("ffmpeg")
        .workdir(layout.segments_dir())
        .arg("-y")
        .arg("-i")
        .arg(input.to_string_lossy())
        .arg("-filter_complex")
        .arg(filter_graph);

    if has_audio {
        inv = inv.args([
            "-map".to_string(),
            "0:a:0".to_string(),
            "-c:a:0".to_string(),
            audio_codec.encoder().to_string(),
            "-b:a:0".to_string(),
            audio_bitrate.to_string(),
            "-ac:a:0".to_string(),
            "2".to_string(),
        ]);
    }

    inv = inv.args(codec_args.iter().cloned());

    inv = inv.args([
        "-f".to_string(),
        "hls".to_string(),
        "-hls_time".to_string(),
        segment_duration.max(1).to_string(),
        "-hls_playlist_type".to_string(),
        "vod".to_string(),
        "-hls_segment_type".to_string(),
        "fmp4".to_string(),
        "-master_pl_name".to_string(),
        format!("../{}.m3u8", layout.base_name),
        "-hls_segment_filename".to_string(),
        "chunk-stream%v-%d.m4s".to_string(),
        "-hls_fmp4_init_filename".to_string(),
        "init-stream%v.m4s".to_string(),
    ]);

    if options.independent_segments {
        inv = inv.arg("-hls_flags").arg("independent_segments");
    }

    inv = inv
        .arg("-var_stream_map")
        .arg(var_stream_map(variants, has_audio, "stream"));

    inv.arg("../media_stream%v.m3u8")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::JobConfig;

    fn layout() -> OutputLayout {
        OutputLayout {
            output_dir: PathBuf::from("/videos/movie_2026_01_02_03_04_05"),
            media_dir: PathBuf::from("/videos/movie_2026_01_02_03_04_05/movie"),
            base_name: "movie".to_string(),
        }
    }

    fn config(json: &str) -> JobConfig {
        JobConfig::from_json(json).unwrap()
    }

    fn adaptive(pipeline: Pipeline) -> AdaptivePlan {
        match pipeline {
            Pipeline::Adaptive(p) => p,
            Pipeline::Legacy(_) => panic!("expected adaptive plan"),
        }
    }

    const TWO_RENDITION_HLS_ONLY: &str = r#"{
        "profile": {
            "formats": ["hls"],
            "renditions": {
                "1080p": {"enabled": true, "videoBitrate": 5000, "audioBitrate": 128},
                "480p": {"enabled": true, "videoBitrate": 1200, "audioBitrate": 96}
            }
        }
    }"#;

    #[test]
    fn hls_only_request_packages_both_formats() {
        let cfg = config(TWO_RENDITION_HLS_ONLY);
        let plan = adaptive(build_pipeline(
            Path::new("/videos/movie.mkv"),
            &cfg,
            true,
            &layout(),
        ));

        assert_eq!(plan.variants.len(), 2);
        assert_eq!(plan.variants[0].label, "1080p");
        assert_eq!(plan.variants[1].label, "480p");
        assert!(plan.hls_generated);

        let rendered = plan.commands.render();
        assert!(rendered.contains("-f dash"), "dash directives: {rendered}");
        assert!(rendered.contains("movie.mpd"));
        assert!(rendered.contains("-hls_playlist 1"), "hls directives: {rendered}");
        assert!(rendered.contains("movie.m3u8"));
    }

    #[test]
    fn variants_sorted_by_descending_height() {
        let cfg = config(
            r#"{"profile": {"formats": ["dash"], "renditions": {
                "360p": {"videoBitrate": 800},
                "1080p": {"videoBitrate": 5000},
                "720p": {"videoBitrate": 2800},
                "540p": {"videoBitrate": 2000},
                "144p": {"enabled": false, "videoBitrate": 100}
            }}}"#,
        );
        let plan = adaptive(build_pipeline(Path::new("/v/in.mkv"), &cfg, true, &layout()));

        // "540p" is not in the preset table and "144p" is disabled.
        let heights: Vec<u32> = plan.variants.iter().map(|v| v.height).collect();
        assert_eq!(heights, vec![1080, 720, 360]);
        assert!(heights.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn bitrate_floors_apply() {
        let cfg = config(
            r#"{"profile": {"formats": ["dash"], "renditions": {
                "480p": {"videoBitrate": 0, "audioBitrate": 0}
            }}}"#,
        );
        let plan = adaptive(build_pipeline(Path::new("/v/in.mkv"), &cfg, true, &layout()));
        assert_eq!(plan.variants[0].video_bitrate, 1000);
        assert_eq!(plan.variants[0].audio_bitrate, 128);
    }

    #[test]
    fn no_audio_source_emits_no_audio_args() {
        let cfg = config(
            r#"{"profile": {"formats": ["hls"], "renditions": {
                "720p": {"videoBitrate": 2800, "audioBitrate": 128}
            }}}"#,
        );
        let plan = adaptive(build_pipeline(Path::new("/v/in.mkv"), &cfg, false, &layout()));
        assert!(!plan.has_audio);

        let rendered = plan.commands.render();
        assert!(!rendered.contains("-c:a"), "unexpected audio codec arg: {rendered}");
        assert!(!rendered.contains("0:a:0"), "unexpected audio map: {rendered}");
        assert!(!rendered.contains("streams=a"), "unexpected audio adaptation set: {rendered}");
        // Variant map binds video only.
        assert!(rendered.contains("v:0,name:media_0"));
    }

    #[test]
    fn shared_audio_uses_max_requested_bitrate() {
        let cfg = config(TWO_RENDITION_HLS_ONLY);
        let plan = adaptive(build_pipeline(Path::new("/v/in.mkv"), &cfg, true, &layout()));

        let rendered = plan.commands.render();
        assert!(rendered.contains("-b:a:0 128k"), "shared audio bitrate: {rendered}");
        // Exactly one shared audio encode, reused by every variant.
        assert_eq!(rendered.matches("-c:a:0").count(), 1);
        assert!(rendered.contains("v:1,a:0,name:media_1"));
    }

    #[test]
    fn vp9_disables_hls_but_keeps_dash() {
        let cfg = config(
            r#"{"profile": {"formats": ["dash", "hls"], "videoCodec": "libvpx-vp9",
                "renditions": {"720p": {"videoBitrate": 2800}}}}"#,
        );
        let plan = adaptive(build_pipeline(Path::new("/v/in.mkv"), &cfg, true, &layout()));

        assert!(!plan.hls_generated);
        assert_eq!(plan.video_codec, VideoCodec::Vp9);
        let rendered = plan.commands.render();
        assert!(rendered.contains("libvpx-vp9"));
        assert!(rendered.contains("movie.mpd"));
        assert!(!rendered.contains("-hls_playlist"));
    }

    #[test]
    fn unsupported_codec_falls_back_to_default() {
        let cfg = config(
            r#"{"profile": {"formats": ["dash"], "videoCodec": "av1",
                "renditions": {"480p": {"videoBitrate": 1200}}}}"#,
        );
        let plan = adaptive(build_pipeline(Path::new("/v/in.mkv"), &cfg, true, &layout()));
        assert_eq!(plan.video_codec, VideoCodec::H264);
        assert!(plan.commands.render().contains("libx264"));
    }

    #[test]
    fn nonzero_priority_nices_the_encode_only() {
        let cfg = config(
            r#"{"priority": 10, "profile": {"formats": ["dash"],
                "renditions": {"480p": {"videoBitrate": 1200}}}}"#,
        );
        let plan = adaptive(build_pipeline(Path::new("/v/in.mkv"), &cfg, true, &layout()));

        let rendered = plan.commands.render();
        assert!(rendered.starts_with("mkdir -p"), "mkdir steps are not niced: {rendered}");
        assert!(rendered.contains("nice -n 10 ffmpeg"));
    }

    #[test]
    fn codec_args_carry_rate_control_and_metadata() {
        let cfg = config(TWO_RENDITION_HLS_ONLY);
        let plan = adaptive(build_pipeline(Path::new("/v/in.mkv"), &cfg, true, &layout()));

        let rendered = plan.commands.render();
        assert!(rendered.contains("-b:v:0 5000k"));
        assert!(rendered.contains("-bufsize:v:0 10000k"));
        assert!(rendered.contains("-b:v:1 1200k"));
        assert!(rendered.contains("-bufsize:v:1 2400k"));
        assert!(rendered.contains("-g 48"));
        assert!(rendered.contains("-keyint_min 48"));
        assert!(rendered.contains("variant_label=1080p"));
        assert!(rendered.contains("variant_id=stream1"));
        assert!(rendered.contains("variant_bitrate=5000000"));
    }

    #[test]
    fn filter_graph_single_variant_has_no_split() {
        let variants = resolve_enabled_variants(
            &config(r#"{"renditions": {"720p": {"videoBitrate": 2800}}}"#).renditions,
        );
        let graph = build_filter_graph(&variants);
        assert!(!graph.graph.contains("split"));
        assert!(graph.graph.contains("scale=w=1280:h=720"));
        assert_eq!(graph.video_labels, vec!["[v0_out]"]);
    }

    #[test]
    fn filter_graph_splits_once_per_variant() {
        let variants = resolve_enabled_variants(
            &config(
                r#"{"renditions": {
                    "1080p": {"videoBitrate": 5000},
                    "480p": {"videoBitrate": 1200},
                    "240p": {"videoBitrate": 400}
                }}"#,
            )
            .renditions,
        );
        let graph = build_filter_graph(&variants);
        assert!(graph.graph.starts_with("[0:v]split=3[v0][v1][v2]"));
        assert!(graph.graph.contains("force_original_aspect_ratio=decrease"));
        assert!(graph.graph.contains("trunc(iw/2)*2"));
        assert_eq!(graph.video_labels.len(), 3);
    }

    #[test]
    fn var_stream_map_shapes() {
        let variants = resolve_enabled_variants(
            &config(
                r#"{"renditions": {
                    "1080p": {"videoBitrate": 5000},
                    "480p": {"videoBitrate": 1200}
                }}"#,
            )
            .renditions,
        );
        assert_eq!(
            var_stream_map(&variants, true, "media_"),
            "v:0,a:0,name:media_0 v:1,a:0,name:media_1"
        );
        assert_eq!(
            var_stream_map(&variants, false, "stream"),
            "v:0,name:stream0 v:1,name:stream1"
        );
    }

    #[test]
    fn standalone_hls_invocation_runs_from_segments_dir() {
        let variants = resolve_enabled_variants(
            &config(r#"{"renditions": {"720p": {"videoBitrate": 2800}}}"#).renditions,
        );
        let graph = build_filter_graph(&variants);
        let codec_args = video_codec_args(
            &variants,
            &graph.video_labels,
            VideoCodec::H264,
            SpeedPreset::Slow,
            48,
        );
        let inv = hls_invocation(
            Path::new("/v/in.mkv"),
            &graph.graph,
            &codec_args,
            &variants,
            4,
            &HlsOptions::default(),
            true,
            "128k",
            AudioCodec::Aac,
            &layout(),
        );
        let rendered = inv.render();
        assert!(rendered.starts_with("cd /videos/movie_2026_01_02_03_04_05/movie/segments && "));
        assert!(rendered.contains("-master_pl_name ../movie.m3u8"));
        assert!(rendered.contains("-hls_fmp4_init_filename init-stream%v.m4s"));
        assert!(rendered.contains("-hls_flags independent_segments"));
        assert!(rendered.contains("../media_stream%v.m3u8"));
    }

    #[test]
    fn missing_formats_fall_back_to_legacy() {
        let cfg = config(r#"{"type": "mp4", "preset": "fast"}"#);
        let pipeline = build_pipeline(Path::new("/v/in.mkv"), &cfg, true, &layout());
        assert!(matches!(pipeline, Pipeline::Legacy(_)));
    }

    #[test]
    fn missing_renditions_fall_back_to_legacy() {
        let cfg = config(r#"{"profile": {"formats": ["dash", "hls"]}}"#);
        let pipeline = build_pipeline(Path::new("/v/in.mkv"), &cfg, true, &layout());
        assert!(matches!(pipeline, Pipeline::Legacy(_)));
    }

    #[test]
    fn disabled_renditions_only_fall_back_to_legacy() {
        let cfg = config(
            r#"{"profile": {"formats": ["dash"], "renditions": {
                "720p": {"enabled": false, "videoBitrate": 2800}
            }}}"#,
        );
        let pipeline = build_pipeline(Path::new("/v/in.mkv"), &cfg, true, &layout());
        assert!(matches!(pipeline, Pipeline::Legacy(_)));
    }
}
