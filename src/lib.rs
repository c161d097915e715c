//! Brailab speech driver core.
//!
//! Turns host speech sequences (text interleaved with index markers) into
//! engine calls on a single background worker, streams the produced audio
//! into an [`orchestrator::AudioSink`] and reports markers and completion in
//! step with playback.

pub mod audio;
pub mod orchestrator;
pub mod telemetry;
pub mod text;

pub use orchestrator::{DriverConfig, DriverError, SequenceItem, SpeechDriver};
