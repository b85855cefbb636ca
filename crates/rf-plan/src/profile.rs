//! The serialized job configuration blob and the encoding profile inside it.
//!
//! The blob round-trips through the job store: submission callers provide
//! the profile, planning adds derived output fields, and the process runner
//! adds the encoder pid.  Unknown keys are preserved verbatim (`flatten`)
//! so the blob is strictly append-only from the caller's point of view.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use rf_core::{AudioCodec, ContainerFormat, Error, Result, SpeedPreset, VideoCodec};

fn is_false(b: &bool) -> bool {
    !*b
}

// ---------------------------------------------------------------------------
// EncodingProfile
// ---------------------------------------------------------------------------

/// Declarative adaptive-streaming profile produced by the submission UI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EncodingProfile {
    /// Requested container formats ("dash", "hls"); free-form strings,
    /// sanitized during planning.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub formats: Vec<String>,
    /// Renditions keyed by ladder label ("1080p", "720p", ...).
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub renditions: BTreeMap<String, RenditionRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_codec: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_codec: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
    /// Key-frame interval in frames, shared across renditions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyframe_interval: Option<u32>,
    /// Segment duration in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment_duration: Option<u32>,
    /// Process niceness for the encode; 0 means default scheduling.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    /// Whether sidecar subtitles are carried into the output folder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitles: Option<bool>,
    pub dash: DashOptions,
    pub hls: HlsOptions,
    /// Unknown profile keys, preserved for round-tripping.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One requested rendition. Bitrates are in kbit/s; zero means "use floor".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RenditionRequest {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub video_bitrate: u32,
    pub audio_bitrate: u32,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for RenditionRequest {
    fn default() -> Self {
        Self {
            enabled: true,
            label: None,
            video_bitrate: 0,
            audio_bitrate: 0,
            extra: serde_json::Map::new(),
        }
    }
}

/// DASH packaging options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DashOptions {
    pub use_template: bool,
    pub use_timeline: bool,
}

impl Default for DashOptions {
    fn default() -> Self {
        Self {
            use_template: true,
            use_timeline: true,
        }
    }
}

/// HLS packaging options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HlsOptions {
    pub independent_segments: bool,
}

impl Default for HlsOptions {
    fn default() -> Self {
        Self {
            independent_segments: true,
        }
    }
}

// ---------------------------------------------------------------------------
// JobConfig
// ---------------------------------------------------------------------------

/// The full config blob stored on a job record.
///
/// Adaptive submissions carry an [`EncodingProfile`]; older callers supply
/// only the flat legacy parameters (`type`, `preset`, `codec`, `vbitrate`,
/// `scale`, `movflags`).  Derived output fields are written back during
/// planning and never removed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<EncodingProfile>,
    /// Top-level format/rendition fallbacks for callers that send them
    /// outside the profile object.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub selected_formats: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub renditions: BTreeMap<String, RenditionRequest>,

    // Legacy single-output parameters.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub output_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codec: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vbitrate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub movflags: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment_duration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyframe_interval: Option<u32>,

    // Derived at execution time; append-only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_directory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_directory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_base_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_folder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_timestamp: Option<String>,
    /// Externally visible path of the output folder, used for existence
    /// checks and re-indexing by the hosting platform.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_public_path: Option<String>,
    /// Pid of the running encoder process, persisted for out-of-band
    /// cancellation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoder_pid: Option<u32>,

    /// Unknown top-level keys, preserved for round-tripping.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl JobConfig {
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("job config parse error: {e}")))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| Error::Internal(format!("job config serialize error: {e}")))
    }

    /// Requested adaptive formats, sanitized and de-duplicated. Profile
    /// formats win over the top-level fallback.
    pub fn requested_formats(&self) -> Vec<ContainerFormat> {
        let raw = match self.profile {
            Some(ref p) if !p.formats.is_empty() => &p.formats,
            _ => &self.selected_formats,
        };

        let mut formats = Vec::new();
        for s in raw {
            if let Some(f) = ContainerFormat::parse(s) {
                if !formats.contains(&f) {
                    formats.push(f);
                }
            }
        }
        formats
    }

    /// Requested renditions; profile renditions win over the fallback.
    pub fn requested_renditions(&self) -> &BTreeMap<String, RenditionRequest> {
        match self.profile {
            Some(ref p) if !p.renditions.is_empty() => &p.renditions,
            _ => &self.renditions,
        }
    }

    pub fn video_codec(&self) -> VideoCodec {
        let raw = self
            .profile
            .as_ref()
            .and_then(|p| p.video_codec.as_deref())
            .or(self.codec.as_deref())
            .unwrap_or("libx264");
        VideoCodec::parse_or_default(raw)
    }

    pub fn audio_codec(&self) -> AudioCodec {
        let raw = self
            .profile
            .as_ref()
            .and_then(|p| p.audio_codec.as_deref())
            .unwrap_or("aac");
        AudioCodec::parse_or_default(raw)
    }

    pub fn speed_preset(&self) -> SpeedPreset {
        let raw = self
            .profile
            .as_ref()
            .and_then(|p| p.preset.as_deref())
            .or(self.preset.as_deref())
            .unwrap_or("slow");
        SpeedPreset::parse_or_default(raw)
    }

    /// Shared key-frame interval in frames; zero and absent both mean 48.
    pub fn keyframe_interval(&self) -> u32 {
        let v = self
            .profile
            .as_ref()
            .and_then(|p| p.keyframe_interval)
            .or(self.keyframe_interval)
            .unwrap_or(48);
        if v == 0 {
            48
        } else {
            v
        }
    }

    /// Segment duration in seconds; zero and absent both mean 4.
    pub fn segment_duration(&self) -> u32 {
        let v = self
            .profile
            .as_ref()
            .and_then(|p| p.segment_duration)
            .or(self.segment_duration)
            .unwrap_or(4);
        if v == 0 {
            4
        } else {
            v
        }
    }

    /// Process niceness; checked on both the flat field and the profile.
    pub fn priority(&self) -> i32 {
        self.priority
            .or(self.profile.as_ref().and_then(|p| p.priority))
            .unwrap_or(0)
    }

    /// Sidecar subtitles are carried unless the profile opts out.
    pub fn subtitles_enabled(&self) -> bool {
        self.profile
            .as_ref()
            .and_then(|p| p.subtitles)
            .unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_profile_json() -> &'static str {
        r#"{
            "profile": {
                "formats": ["hls"],
                "renditions": {
                    "1080p": {"enabled": true, "videoBitrate": 5000, "audioBitrate": 128},
                    "480p": {"enabled": true, "videoBitrate": 1200, "audioBitrate": 96}
                },
                "videoCodec": "libx264",
                "preset": "fast",
                "segmentDuration": 6,
                "keyframeInterval": 50,
                "customHint": "keep-me"
            },
            "priority": 5,
            "callerTag": "browser-ui"
        }"#
    }

    #[test]
    fn parse_profile_fields() {
        let cfg = JobConfig::from_json(sample_profile_json()).unwrap();
        assert_eq!(cfg.requested_formats(), vec![ContainerFormat::Hls]);
        assert_eq!(cfg.requested_renditions().len(), 2);
        assert_eq!(cfg.video_codec(), VideoCodec::H264);
        assert_eq!(cfg.speed_preset(), SpeedPreset::Fast);
        assert_eq!(cfg.segment_duration(), 6);
        assert_eq!(cfg.keyframe_interval(), 50);
        assert_eq!(cfg.priority(), 5);
        assert!(cfg.subtitles_enabled());
    }

    #[test]
    fn round_trip_is_additive_only() {
        let cfg = JobConfig::from_json(sample_profile_json()).unwrap();
        let json = cfg.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        // Unknown keys survive, both top-level and inside the profile.
        assert_eq!(value["callerTag"], "browser-ui");
        assert_eq!(value["profile"]["customHint"], "keep-me");
        // Caller fields are unchanged.
        assert_eq!(value["profile"]["renditions"]["1080p"]["videoBitrate"], 5000);
        assert_eq!(value["profile"]["formats"][0], "hls");
        assert_eq!(value["priority"], 5);
    }

    #[test]
    fn derived_fields_append() {
        let mut cfg = JobConfig::from_json(sample_profile_json()).unwrap();
        cfg.output_directory = Some("/videos/movie_2026_01_02_03_04_05".into());
        cfg.output_base_name = Some("movie".into());
        cfg.encoder_pid = Some(4242);

        let value: serde_json::Value = serde_json::from_str(&cfg.to_json().unwrap()).unwrap();
        assert_eq!(value["output_directory"], "/videos/movie_2026_01_02_03_04_05");
        assert_eq!(value["encoder_pid"], 4242);
        // Original profile fields still intact after the append.
        assert_eq!(value["profile"]["renditions"]["480p"]["audioBitrate"], 96);
    }

    #[test]
    fn formats_sanitized_and_deduped() {
        let cfg = JobConfig::from_json(
            r#"{"selected_formats": ["HLS", "hls", "dash", "mp4", "avi"]}"#,
        )
        .unwrap();
        assert_eq!(
            cfg.requested_formats(),
            vec![ContainerFormat::Hls, ContainerFormat::Dash]
        );
    }

    #[test]
    fn defaults_without_profile() {
        let cfg = JobConfig::from_json("{}").unwrap();
        assert!(cfg.requested_formats().is_empty());
        assert!(cfg.requested_renditions().is_empty());
        assert_eq!(cfg.video_codec(), VideoCodec::H264);
        assert_eq!(cfg.audio_codec(), AudioCodec::Aac);
        assert_eq!(cfg.speed_preset(), SpeedPreset::Slow);
        assert_eq!(cfg.keyframe_interval(), 48);
        assert_eq!(cfg.segment_duration(), 4);
        assert_eq!(cfg.priority(), 0);
    }

    #[test]
    fn zero_intervals_use_defaults() {
        let cfg = JobConfig::from_json(
            r#"{"profile": {"segmentDuration": 0, "keyframeInterval": 0}}"#,
        )
        .unwrap();
        assert_eq!(cfg.segment_duration(), 4);
        assert_eq!(cfg.keyframe_interval(), 48);
    }

    #[test]
    fn legacy_fields_parse() {
        let cfg = JobConfig::from_json(
            r#"{"type": "webm", "preset": "veryfast", "vbitrate": "3", "movflags": true}"#,
        )
        .unwrap();
        assert_eq!(cfg.output_type.as_deref(), Some("webm"));
        assert_eq!(cfg.vbitrate.as_deref(), Some("3"));
        assert!(cfg.movflags);
    }
}
