use std::time::Duration;

/// Longest text the engine accepts in a single `start_speak` call.
pub(crate) const MAX_SEGMENT_CHARS: usize = 450;
pub(crate) const DEFAULT_ENGINE_INIT_VALUE: i32 = 1500;
pub(crate) const DEFAULT_READ_BUFFER_BYTES: usize = 64 * 1024;
pub(crate) const DEFAULT_DRAIN_POLL: Duration = Duration::from_micros(500);

pub(crate) const BASE_DIR_ENV: &str = "BRAILAB_DRIVER_DIR";
pub(crate) const ENGINE_LIBRARY_CANDIDATES: &[&str] =
    &["brailab/tts.dll", "brailab/TTS.dll", "tts.dll", "TTS.dll"];
pub(crate) const WRAPPER_LIBRARY: &str = "brailab_wrapper.dll";
