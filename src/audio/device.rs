use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};

use bytes::Bytes;
use parking_lot::Mutex;
use rodio::buffer::SamplesBuffer;
use rodio::source::EmptyCallback;
use rodio::{OutputStream, Sink};
use tracing::{debug, error, info, trace};

use crate::orchestrator::config::AudioFormat;
use crate::orchestrator::error::SinkError;
use crate::orchestrator::traits::{AudioSink, SinkCallback};

const STREAM_THREAD_NAME: &str = "brailab-audio-device";

/// Audio sink on the default output device.
///
/// `rodio::OutputStream` is `!Send` on some platforms, so it lives on its own
/// thread for the lifetime of the sink; only the `rodio::Sink` is shared.
pub struct DeviceSink {
    sink: Arc<Sink>,
    format: AudioFormat,
    /// Bumped by `stop`; callbacks queued under an older epoch never run.
    epoch: Arc<AtomicU64>,
    release: Mutex<Option<mpsc::Sender<()>>>,
    stream: Mutex<Option<JoinHandle<()>>>,
}

impl DeviceSink {
    /// Opens the default output device for 16-bit PCM in `format`.
    pub fn open(format: AudioFormat) -> Result<Self, SinkError> {
        if format.bits_per_sample != 16 || format.channels == 0 {
            return Err(SinkError::Rejected(format!(
                "unsupported PCM layout: {} channel(s), {} bits",
                format.channels, format.bits_per_sample
            )));
        }

        let (ready_tx, ready_rx) = mpsc::channel::<Result<Arc<Sink>, SinkError>>();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let stream = thread::Builder::new()
            .name(STREAM_THREAD_NAME.to_string())
            .spawn(move || hold_stream(ready_tx, release_rx))
            .map_err(|err| SinkError::Unavailable(err.to_string()))?;

        let sink = match ready_rx.recv() {
            Ok(Ok(sink)) => sink,
            Ok(Err(err)) => {
                let _ = stream.join();
                return Err(err);
            }
            Err(_) => {
                let _ = stream.join();
                return Err(SinkError::Unavailable("audio device thread exited".into()));
            }
        };

        info!(
            target: "audio_sink",
            channels = format.channels,
            sample_rate_hz = format.sample_rate_hz,
            "audio device opened"
        );
        Ok(Self {
            sink,
            format,
            epoch: Arc::new(AtomicU64::new(0)),
            release: Mutex::new(Some(release_tx)),
            stream: Mutex::new(Some(stream)),
        })
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Sources still queued on the device, the playing one included.
    pub fn queued_units(&self) -> usize {
        self.sink.len()
    }

    fn guarded(&self, callback: SinkCallback) -> EmptyCallback<i16> {
        let epoch = Arc::clone(&self.epoch);
        let queued_at = epoch.load(Ordering::SeqCst);
        let callback = Mutex::new(Some(callback));
        EmptyCallback::new(Box::new(move || {
            if epoch.load(Ordering::SeqCst) != queued_at {
                return;
            }
            if let Some(callback) = callback.lock().take() {
                callback();
            }
        }))
    }
}

impl AudioSink for DeviceSink {
    fn feed(&self, chunk: Bytes, on_done: Option<SinkCallback>) -> Result<(), SinkError> {
        let samples = pcm16_samples(&chunk);
        if !samples.is_empty() {
            self.sink.append(SamplesBuffer::new(
                self.format.channels,
                self.format.sample_rate_hz,
                samples,
            ));
        }
        if let Some(callback) = on_done {
            self.sink.append(self.guarded(callback));
        }
        Ok(())
    }

    fn pause(&self, paused: bool) {
        if paused {
            self.sink.pause();
        } else {
            self.sink.play();
        }
    }

    fn stop(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        let discarded = self.sink.len();
        self.sink.stop();
        trace!(target: "audio_sink", discarded, "audio device stopped");
    }

    fn idle(&self) {
        self.sink.sleep_until_end();
    }
}

impl Drop for DeviceSink {
    fn drop(&mut self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.sink.stop();
        drop(self.release.lock().take());

        if let Some(handle) = self.stream.lock().take() {
            if handle.join().is_err() {
                error!(target: "audio_sink", "audio device thread panicked");
            }
        }
    }
}

impl fmt::Debug for DeviceSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceSink")
            .field("format", &self.format)
            .field("queued_units", &self.queued_units())
            .finish()
    }
}

/// Owns the output stream until the release channel closes.
fn hold_stream(ready: mpsc::Sender<Result<Arc<Sink>, SinkError>>, release: mpsc::Receiver<()>) {
    let (stream, handle) = match OutputStream::try_default() {
        Ok(opened) => opened,
        Err(err) => {
            let _ = ready.send(Err(SinkError::Unavailable(err.to_string())));
            return;
        }
    };
    let sink = match Sink::try_new(&handle) {
        Ok(sink) => Arc::new(sink),
        Err(err) => {
            let _ = ready.send(Err(SinkError::Unavailable(err.to_string())));
            return;
        }
    };
    if ready.send(Ok(Arc::clone(&sink))).is_err() {
        return;
    }

    while release.recv().is_ok() {}
    drop(sink);
    drop(stream);
    debug!(target: "audio_sink", "audio device released");
}

/// Little-endian 16-bit PCM bytes to samples. A trailing odd byte is dropped.
fn pcm16_samples(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}
