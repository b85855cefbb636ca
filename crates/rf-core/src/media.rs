//! Codec and packaging vocabulary for the conversion engine.
//!
//! Values arriving from submission callers are free-form strings; the parse
//! helpers here sanitize them against the supported sets, falling back to
//! the documented defaults rather than failing.

use std::fmt;

// ---------------------------------------------------------------------------
// Container formats
// ---------------------------------------------------------------------------

/// An adaptive streaming packaging scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerFormat {
    /// MPEG-DASH (manifest + fMP4 segments).
    Dash,
    /// HTTP Live Streaming (playlists + fMP4 segments).
    Hls,
}

impl ContainerFormat {
    /// Parse a user-supplied format name. Unknown names are dropped, not
    /// defaulted: a request for "mp4" is a legacy request, not a typo.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "dash" => Some(ContainerFormat::Dash),
            "hls" => Some(ContainerFormat::Hls),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerFormat::Dash => "dash",
            ContainerFormat::Hls => "hls",
        }
    }
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Video codecs
// ---------------------------------------------------------------------------

/// Supported video encoders, named by their ffmpeg encoder ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoCodec {
    H264,
    H265,
    Vp9,
}

impl VideoCodec {
    /// Sanitize a requested codec. Anything outside the supported set falls
    /// back to H.264.
    pub fn parse_or_default(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "libx264" | "h264" | "x264" => VideoCodec::H264,
            "libx265" | "h265" | "hevc" | "x265" => VideoCodec::H265,
            "libvpx-vp9" | "vp9" => VideoCodec::Vp9,
            _ => VideoCodec::H264,
        }
    }

    /// The ffmpeg encoder name.
    pub fn encoder(&self) -> &'static str {
        match self {
            VideoCodec::H264 => "libx264",
            VideoCodec::H265 => "libx265",
            VideoCodec::Vp9 => "libvpx-vp9",
        }
    }

    /// Whether the codec is broadly usable inside fMP4 HLS output.
    ///
    /// VP9 in fMP4 segments is poorly supported by HLS players, so HLS
    /// generation is skipped for it (DASH remains available).
    pub fn hls_compatible(&self) -> bool {
        !matches!(self, VideoCodec::Vp9)
    }
}

impl fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.encoder())
    }
}

// ---------------------------------------------------------------------------
// Audio codecs
// ---------------------------------------------------------------------------

/// Supported audio encoders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCodec {
    Aac,
    Opus,
    Mp3,
}

impl AudioCodec {
    /// Sanitize a requested codec, falling back to AAC.
    pub fn parse_or_default(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "aac" => AudioCodec::Aac,
            "opus" | "libopus" => AudioCodec::Opus,
            "mp3" | "libmp3lame" => AudioCodec::Mp3,
            _ => AudioCodec::Aac,
        }
    }

    /// The ffmpeg encoder name.
    pub fn encoder(&self) -> &'static str {
        match self {
            AudioCodec::Aac => "aac",
            AudioCodec::Opus => "opus",
            AudioCodec::Mp3 => "mp3",
        }
    }
}

impl fmt::Display for AudioCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.encoder())
    }
}

// ---------------------------------------------------------------------------
// Encoder speed presets
// ---------------------------------------------------------------------------

/// The x264/x265 speed/quality trade-off presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedPreset {
    Ultrafast,
    Superfast,
    Veryfast,
    Faster,
    Fast,
    Medium,
    Slow,
    Slower,
    Veryslow,
}

impl SpeedPreset {
    /// Sanitize a requested preset, falling back to `slow`.
    pub fn parse_or_default(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "ultrafast" => SpeedPreset::Ultrafast,
            "superfast" => SpeedPreset::Superfast,
            "veryfast" => SpeedPreset::Veryfast,
            "faster" => SpeedPreset::Faster,
            "fast" => SpeedPreset::Fast,
            "medium" => SpeedPreset::Medium,
            "slow" => SpeedPreset::Slow,
            "slower" => SpeedPreset::Slower,
            "veryslow" => SpeedPreset::Veryslow,
            _ => SpeedPreset::Slow,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SpeedPreset::Ultrafast => "ultrafast",
            SpeedPreset::Superfast => "superfast",
            SpeedPreset::Veryfast => "veryfast",
            SpeedPreset::Faster => "faster",
            SpeedPreset::Fast => "fast",
            SpeedPreset::Medium => "medium",
            SpeedPreset::Slow => "slow",
            SpeedPreset::Slower => "slower",
            SpeedPreset::Veryslow => "veryslow",
        }
    }
}

impl fmt::Display for SpeedPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_format_parse() {
        assert_eq!(ContainerFormat::parse("dash"), Some(ContainerFormat::Dash));
        assert_eq!(ContainerFormat::parse("HLS"), Some(ContainerFormat::Hls));
        assert_eq!(ContainerFormat::parse("mp4"), None);
        assert_eq!(ContainerFormat::parse(""), None);
    }

    #[test]
    fn video_codec_fallback() {
        assert_eq!(VideoCodec::parse_or_default("libx265"), VideoCodec::H265);
        assert_eq!(VideoCodec::parse_or_default("vp9"), VideoCodec::Vp9);
        // Unsupported values fall back to the default instead of failing.
        assert_eq!(VideoCodec::parse_or_default("av1"), VideoCodec::H264);
        assert_eq!(VideoCodec::parse_or_default(""), VideoCodec::H264);
    }

    #[test]
    fn vp9_is_not_hls_compatible() {
        assert!(VideoCodec::H264.hls_compatible());
        assert!(VideoCodec::H265.hls_compatible());
        assert!(!VideoCodec::Vp9.hls_compatible());
    }

    #[test]
    fn audio_codec_fallback() {
        assert_eq!(AudioCodec::parse_or_default("opus"), AudioCodec::Opus);
        assert_eq!(AudioCodec::parse_or_default("flac"), AudioCodec::Aac);
    }

    #[test]
    fn preset_fallback() {
        assert_eq!(SpeedPreset::parse_or_default("veryfast"), SpeedPreset::Veryfast);
        assert_eq!(SpeedPreset::parse_or_default("turbo"), SpeedPreset::Slow);
        assert_eq!(SpeedPreset::parse_or_default("SLOW").as_str(), "slow");
    }
}
