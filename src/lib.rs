//! reelforge: asynchronous transcoding of uploaded video files into
//! adaptive-bitrate streaming packages.
//!
//! The root crate hosts the worker scheduler, the conversion orchestrator,
//! output post-processing, and the submission service.  Planning lives in
//! `rf-plan`, encoder integration in `rf-av`, persistence in `rf-db`.

pub mod assets;
pub mod orchestrator;
pub mod postprocess;
pub mod rescan;
pub mod resolve;
pub mod service;
pub mod verify;
pub mod worker;
