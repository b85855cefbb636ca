//! Core types shared by every reelforge crate: the unified error type,
//! typed identifiers, configuration, and media-codec vocabulary.

pub mod config;
pub mod error;
pub mod ids;
pub mod media;

pub use error::{Error, Result};
pub use ids::JobId;
pub use media::{AudioCodec, ContainerFormat, SpeedPreset, VideoCodec};
