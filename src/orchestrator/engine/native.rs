//! 通过 brailab_wrapper 动态库访问原生引擎。

use std::ffi::{c_int, OsStr};
use std::iter;
use std::ptr;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::{debug, error, info};

use super::artifacts::{locate_artifacts, EngineArtifacts};
use super::SpeechDriver;
use crate::orchestrator::config::{AudioFormat, DriverConfig};
use crate::orchestrator::error::{DriverError, EngineFault};
use crate::orchestrator::traits::{AudioSink, SpeechEngine, SpeechListener};
use crate::orchestrator::types::{EngineEvent, Intonation, VoiceParam};

const ITEM_NONE: c_int = 0;
const ITEM_AUDIO: c_int = 1;
const ITEM_DONE: c_int = 2;
const ITEM_ERROR: c_int = 3;

#[repr(C)]
struct BlState {
    _private: [u8; 0],
}

#[link(name = "brailab_wrapper")]
extern "C" {
    fn bl_initW(tts_dll_path: *const u16, init_value: c_int) -> *mut BlState;
    fn bl_free(state: *mut BlState);
    fn bl_stop(state: *mut BlState);
    fn bl_startSpeakW(state: *mut BlState, text: *const u16, no_intonation: c_int) -> c_int;
    fn bl_read(
        state: *mut BlState,
        out_type: *mut c_int,
        out_value: *mut c_int,
        out_audio: *mut u8,
        out_cap: c_int,
    ) -> c_int;
    fn bl_getTempo(state: *mut BlState) -> c_int;
    fn bl_setTempo(state: *mut BlState, tempo: c_int);
    fn bl_getPitch(state: *mut BlState) -> c_int;
    fn bl_setPitch(state: *mut BlState, pitch: c_int);
    fn bl_getVolume(state: *mut BlState) -> c_int;
    fn bl_setVolume(state: *mut BlState, volume: c_int);
    fn bl_getFormat(
        state: *mut BlState,
        sample_rate: *mut c_int,
        channels: *mut c_int,
        bits_per_sample: *mut c_int,
    ) -> c_int;
}

struct Session {
    handle: *mut BlState,
    buffer: Vec<u8>,
}

// The handle is only dereferenced by the wrapper, always under the session lock.
unsafe impl Send for Session {}

impl Session {
    fn live(&self) -> Result<*mut BlState, EngineFault> {
        if self.handle.is_null() {
            Err(EngineFault::Raised("engine session is closed".into()))
        } else {
            Ok(self.handle)
        }
    }
}

/// One `bl_initW` session. Every wrapper call is serialised on `session`.
pub struct NativeEngine {
    session: Mutex<Session>,
    artifacts: EngineArtifacts,
}

impl NativeEngine {
    pub fn open(config: &DriverConfig) -> Result<Self, DriverError> {
        let base = config.resolve_base_dir()?;
        let artifacts = locate_artifacts(&base)?;
        let path = wide_nul(artifacts.engine_library.as_os_str());

        // SAFETY: `path` is NUL-terminated and outlives the call.
        let handle = unsafe { bl_initW(path.as_ptr(), config.engine_init_value) };
        if handle.is_null() {
            return Err(DriverError::SessionInit {
                path: artifacts.engine_library,
            });
        }

        info!(
            target: "speech_driver",
            engine = %artifacts.engine_library.display(),
            "native engine session opened"
        );
        Ok(Self {
            session: Mutex::new(Session {
                handle,
                buffer: vec![0; config.read_buffer_bytes.max(1)],
            }),
            artifacts,
        })
    }

    pub fn artifacts(&self) -> &EngineArtifacts {
        &self.artifacts
    }
}

impl SpeechEngine for NativeEngine {
    fn start_speak(&self, text: &str, intonation: Intonation) -> Result<(), EngineFault> {
        let session = self.session.lock();
        let handle = session.live()?;
        let wide: Vec<u16> = text.encode_utf16().chain(iter::once(0)).collect();

        // SAFETY: live handle, NUL-terminated text, call serialised by the lock.
        let status = unsafe { bl_startSpeakW(handle, wide.as_ptr(), intonation.no_intonation_flag()) };
        if status == 0 {
            Ok(())
        } else {
            Err(EngineFault::StartRejected { status })
        }
    }

    fn read(&self) -> Result<EngineEvent, EngineFault> {
        let mut session = self.session.lock();
        let handle = session.live()?;
        let capacity = c_int::try_from(session.buffer.len()).unwrap_or(c_int::MAX);
        let mut kind: c_int = ITEM_NONE;
        let mut value: c_int = 0;

        // SAFETY: the buffer holds at least `capacity` bytes and stays borrowed
        // for the duration of the call.
        let written = unsafe {
            bl_read(
                handle,
                &mut kind,
                &mut value,
                session.buffer.as_mut_ptr(),
                capacity,
            )
        };

        match kind {
            ITEM_NONE => Ok(EngineEvent::None),
            ITEM_AUDIO => {
                let len = usize::try_from(written)
                    .unwrap_or(0)
                    .min(session.buffer.len());
                Ok(EngineEvent::AudioChunk(Bytes::copy_from_slice(
                    &session.buffer[..len],
                )))
            }
            ITEM_DONE => Ok(EngineEvent::Done),
            ITEM_ERROR => Ok(EngineEvent::Error(value)),
            other => Err(EngineFault::Raised(format!(
                "unknown stream item type {other}"
            ))),
        }
    }

    fn stop(&self) {
        let session = self.session.lock();
        if let Ok(handle) = session.live() {
            // SAFETY: live handle under the session lock.
            unsafe { bl_stop(handle) };
        }
    }

    fn parameter(&self, param: VoiceParam) -> i32 {
        let session = self.session.lock();
        let Ok(handle) = session.live() else {
            return 0;
        };
        // SAFETY: live handle under the session lock.
        unsafe {
            match param {
                VoiceParam::Tempo => bl_getTempo(handle),
                VoiceParam::Pitch => bl_getPitch(handle),
                VoiceParam::Volume => bl_getVolume(handle),
            }
        }
    }

    fn set_parameter(&self, param: VoiceParam, value: i32) {
        let session = self.session.lock();
        let Ok(handle) = session.live() else {
            return;
        };
        // SAFETY: live handle under the session lock.
        unsafe {
            match param {
                VoiceParam::Tempo => bl_setTempo(handle, value),
                VoiceParam::Pitch => bl_setPitch(handle, value),
                VoiceParam::Volume => bl_setVolume(handle, value),
            }
        }
    }

    fn audio_format(&self) -> Option<AudioFormat> {
        let session = self.session.lock();
        let handle = session.live().ok()?;
        let (mut rate, mut channels, mut bits): (c_int, c_int, c_int) = (0, 0, 0);

        // SAFETY: live handle under the session lock; out-pointers are locals.
        let known = unsafe { bl_getFormat(handle, &mut rate, &mut channels, &mut bits) };
        if known == 0 {
            return None;
        }

        Some(AudioFormat {
            channels: u16::try_from(channels).ok()?,
            sample_rate_hz: u32::try_from(rate).ok()?,
            bits_per_sample: u16::try_from(bits).ok()?,
        })
    }

    fn close(&self) -> Result<(), EngineFault> {
        let mut session = self.session.lock();
        let handle = std::mem::replace(&mut session.handle, ptr::null_mut());
        if handle.is_null() {
            return Ok(());
        }

        // SAFETY: the handle came from `bl_initW` and is freed exactly once.
        unsafe { bl_free(handle) };
        debug!(target: "speech_driver", "native engine session released");
        Ok(())
    }
}

impl Drop for NativeEngine {
    fn drop(&mut self) {
        if let Err(fault) = self.close() {
            error!(target: "speech_driver", %fault, "failed to release engine session");
        }
    }
}

impl SpeechDriver {
    /// Opens the native engine found under the configured directory and
    /// starts a driver on top of it.
    pub fn open(
        config: DriverConfig,
        sink: Arc<dyn AudioSink>,
        listener: Arc<dyn SpeechListener>,
    ) -> Result<Self, DriverError> {
        let engine = Arc::new(NativeEngine::open(&config)?);
        Self::new(config, engine, sink, listener)
    }
}

fn wide_nul(value: &OsStr) -> Vec<u16> {
    value
        .to_string_lossy()
        .encode_utf16()
        .chain(iter::once(0))
        .collect()
}
