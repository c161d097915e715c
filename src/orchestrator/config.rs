use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::orchestrator::constants::{
    BASE_DIR_ENV, DEFAULT_DRAIN_POLL, DEFAULT_ENGINE_INIT_VALUE, DEFAULT_READ_BUFFER_BYTES,
    MAX_SEGMENT_CHARS,
};
use crate::orchestrator::error::DriverError;

/// PCM layout of the audio the engine produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    pub channels: u16,
    pub sample_rate_hz: u32,
    pub bits_per_sample: u16,
}

impl AudioFormat {
    pub fn bytes_per_second(&self) -> u64 {
        let block_align = u64::from(self.channels) * u64::from(self.bits_per_sample / 8);
        u64::from(self.sample_rate_hz) * block_align.max(1)
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            channels: 1,
            sample_rate_hz: 10_000,
            bits_per_sample: 16,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub base_dir: Option<PathBuf>,
    pub engine_init_value: i32,
    pub max_segment_chars: usize,
    pub read_buffer_bytes: usize,
    pub drain_poll_micros: u64,
    pub use_intonation: bool,
    pub audio: AudioFormat,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            base_dir: None,
            engine_init_value: DEFAULT_ENGINE_INIT_VALUE,
            max_segment_chars: MAX_SEGMENT_CHARS,
            read_buffer_bytes: DEFAULT_READ_BUFFER_BYTES,
            drain_poll_micros: DEFAULT_DRAIN_POLL.as_micros() as u64,
            use_intonation: true,
            audio: AudioFormat::default(),
        }
    }
}

impl DriverConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn drain_poll_interval(&self) -> Duration {
        Duration::from_micros(self.drain_poll_micros)
    }

    /// Explicit `base_dir`, then `$BRAILAB_DRIVER_DIR`, then the directory of the
    /// running executable.
    pub fn resolve_base_dir(&self) -> Result<PathBuf, DriverError> {
        if let Some(dir) = &self.base_dir {
            return Ok(dir.clone());
        }

        if let Ok(dir) = std::env::var(BASE_DIR_ENV) {
            if !dir.is_empty() {
                return Ok(PathBuf::from(dir));
            }
        }

        let exe = std::env::current_exe().map_err(DriverError::BaseDir)?;
        exe.parent()
            .map(PathBuf::from)
            .ok_or_else(|| DriverError::NoParentDir { path: exe.clone() })
    }
}
