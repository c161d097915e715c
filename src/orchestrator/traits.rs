use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::debug;

use crate::orchestrator::config::AudioFormat;
use crate::orchestrator::error::{EngineFault, SinkError};
use crate::orchestrator::types::{EngineEvent, Intonation, MarkerId, SpeechNotification, VoiceParam};

/// One live synthesis session.
///
/// `start_speak` and `read` are only ever called from the speech worker.
/// `stop` may arrive from any thread while an utterance is in flight and must be
/// safe there; implementations serialise their own native calls.
pub trait SpeechEngine: Send + Sync {
    fn start_speak(&self, text: &str, intonation: Intonation) -> Result<(), EngineFault>;

    fn read(&self) -> Result<EngineEvent, EngineFault>;

    fn stop(&self);

    fn parameter(&self, param: VoiceParam) -> i32;

    fn set_parameter(&self, param: VoiceParam, value: i32);

    fn audio_format(&self) -> Option<AudioFormat> {
        None
    }

    /// Releases the native session. Calls after the first are no-ops.
    fn close(&self) -> Result<(), EngineFault> {
        Ok(())
    }
}

/// Invoked by the sink once every unit fed before it has played.
pub type SinkCallback = Box<dyn FnOnce() + Send + 'static>;

/// Ordered audio output. Units (including zero-length ones) complete in feed
/// order and their callbacks run on the sink's own thread.
pub trait AudioSink: Send + Sync {
    fn feed(&self, chunk: Bytes, on_done: Option<SinkCallback>) -> Result<(), SinkError>;

    fn pause(&self, paused: bool);

    /// Discards queued audio together with callbacks that have not fired yet.
    fn stop(&self);

    /// Blocks until nothing is queued or playing.
    fn idle(&self);
}

pub trait SpeechListener: Send + Sync {
    fn index_reached(&self, index: MarkerId);

    fn done_speaking(&self);
}

/// Forwards notifications into an unbounded channel for async hosts.
#[derive(Debug, Clone)]
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<SpeechNotification>,
}

impl ChannelListener {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SpeechNotification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn deliver(&self, notification: SpeechNotification) {
        if let Err(err) = self.tx.send(notification) {
            debug!(
                target: "speech_driver",
                %err,
                "notification receiver dropped"
            );
        }
    }
}

impl SpeechListener for ChannelListener {
    fn index_reached(&self, index: MarkerId) {
        self.deliver(SpeechNotification::IndexReached(index));
    }

    fn done_speaking(&self) {
        self.deliver(SpeechNotification::DoneSpeaking);
    }
}
