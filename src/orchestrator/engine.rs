use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::orchestrator::blocks::{build_blocks, lone_marker};
use crate::orchestrator::config::{AudioFormat, DriverConfig};
use crate::orchestrator::error::DriverError;
use crate::orchestrator::runtime::{PendingTask, SpeechRuntime, TaskQueue, TaskWorker};
use crate::orchestrator::settings::{host_percent, native_value};
use crate::orchestrator::traits::{AudioSink, SpeechEngine, SpeechListener};
use crate::orchestrator::types::{MarkerId, PlaybackPhase, SequenceItem, VoiceParam};

/// Speech driver front end. Every call returns without waiting for audio;
/// engine work happens on a single background worker.
pub struct SpeechDriver {
    runtime: Arc<SpeechRuntime>,
    queue: Arc<TaskQueue>,
    worker: Mutex<Option<TaskWorker>>,
    audio: AudioFormat,
    terminated: AtomicBool,
}

impl SpeechDriver {
    pub fn new(
        config: DriverConfig,
        engine: Arc<dyn SpeechEngine>,
        sink: Arc<dyn AudioSink>,
        listener: Arc<dyn SpeechListener>,
    ) -> Result<Self, DriverError> {
        Self::with_queue(config, engine, sink, listener, Arc::new(TaskQueue::new()))
    }

    /// Builds the driver around a caller-owned queue. The engine is closed
    /// again if the worker cannot be started.
    pub fn with_queue(
        config: DriverConfig,
        engine: Arc<dyn SpeechEngine>,
        sink: Arc<dyn AudioSink>,
        listener: Arc<dyn SpeechListener>,
        queue: Arc<TaskQueue>,
    ) -> Result<Self, DriverError> {
        if queue.is_closed() {
            close_engine(engine.as_ref());
            return Err(DriverError::Terminated);
        }

        let worker = match TaskWorker::spawn(Arc::clone(&queue)) {
            Ok(worker) => worker,
            Err(err) => {
                close_engine(engine.as_ref());
                return Err(DriverError::WorkerSpawn(err));
            }
        };

        let runtime = Arc::new(SpeechRuntime::new(&config, engine, sink, listener));
        info!(
            target: "speech_driver",
            max_segment_chars = config.max_segment_chars,
            use_intonation = config.use_intonation,
            "speech driver ready"
        );

        Ok(Self {
            runtime,
            queue,
            worker: Mutex::new(Some(worker)),
            audio: config.audio,
            terminated: AtomicBool::new(false),
        })
    }

    pub fn speak(&self, sequence: &[SequenceItem]) {
        if let Some(id) = lone_marker(sequence) {
            self.notify_when_idle("notify_marker", vec![id]);
            return;
        }

        let plan = build_blocks(sequence);
        if !plan.has_text {
            if plan.marker_ids.is_empty() {
                self.notify_when_idle("notify_done", Vec::new());
            } else {
                self.submit_notify(plan.marker_ids);
            }
            return;
        }

        debug!(
            target: "speech_driver",
            blocks = plan.blocks.len(),
            markers = plan.marker_ids.len(),
            "queueing utterance"
        );
        let runtime = Arc::clone(&self.runtime);
        let ticket = runtime.state.ticket();
        let blocks = plan.blocks;
        self.submit(PendingTask::job("speak_blocks", move || {
            runtime.speak_blocks(ticket, &blocks);
            Ok(())
        }));
    }

    /// Stops the current utterance and forgets everything still queued.
    pub fn cancel(&self) {
        self.runtime.state.cancel();
        self.runtime.engine.stop();
        self.runtime.sink.stop();
        let dropped = self.queue.drain();
        debug!(target: "speech_driver", dropped, "speech cancelled");
    }

    pub fn pause(&self, paused: bool) {
        self.runtime.sink.pause(paused);
    }

    /// Cancels, stops the worker and releases the engine. Later calls do nothing.
    pub fn terminate(&self) {
        if self.terminated.swap(true, Ordering::SeqCst) {
            return;
        }

        self.cancel();
        if let Some(worker) = self.worker.lock().take() {
            worker.shutdown();
        }
        close_engine(self.runtime.engine.as_ref());
        info!(target: "speech_driver", "speech driver terminated");
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    pub fn phase(&self) -> PlaybackPhase {
        self.runtime.state.phase()
    }

    /// Engine format when the engine reports one, the configured one otherwise.
    pub fn audio_format(&self) -> AudioFormat {
        self.runtime.engine.audio_format().unwrap_or(self.audio)
    }

    pub fn rate(&self) -> u8 {
        self.voice_param(VoiceParam::Tempo)
    }

    pub fn set_rate(&self, percent: i32) {
        self.set_voice_param(VoiceParam::Tempo, percent);
    }

    pub fn pitch(&self) -> u8 {
        self.voice_param(VoiceParam::Pitch)
    }

    pub fn set_pitch(&self, percent: i32) {
        self.set_voice_param(VoiceParam::Pitch, percent);
    }

    pub fn volume(&self) -> u8 {
        self.voice_param(VoiceParam::Volume)
    }

    pub fn set_volume(&self, percent: i32) {
        self.set_voice_param(VoiceParam::Volume, percent);
    }

    pub fn use_intonation(&self) -> bool {
        self.runtime.use_intonation()
    }

    /// Takes effect from the next utterance.
    pub fn set_use_intonation(&self, enabled: bool) {
        self.runtime.set_use_intonation(enabled);
    }

    fn voice_param(&self, param: VoiceParam) -> u8 {
        host_percent(param, self.runtime.engine.parameter(param))
    }

    /// Applied on the caller's thread, never queued; the engine serialises its
    /// own calls.
    fn set_voice_param(&self, param: VoiceParam, percent: i32) {
        if self.is_terminated() {
            warn!(
                target: "speech_driver",
                param = param.as_str(),
                "voice setting ignored after terminate"
            );
            return;
        }
        let native = native_value(param, percent);
        self.runtime.engine.set_parameter(param, native);
        debug!(
            target: "speech_driver",
            param = param.as_str(),
            percent,
            native,
            "voice setting applied"
        );
    }

    /// Notifies inline when nothing is speaking or queued; otherwise keeps the
    /// notification behind the in-flight work. The idle check is a snapshot.
    fn notify_when_idle(&self, label: &'static str, ids: Vec<MarkerId>) {
        if self.runtime.state.is_speaking() {
            self.submit_notify_labelled(label, ids);
            return;
        }

        let runtime = Arc::clone(&self.runtime);
        let ticket = runtime.state.ticket();
        let result = self.queue.submit_or_run_inline(label, move || {
            runtime.notify_markers_and_done(ticket, &ids);
            Ok(())
        });
        if let Err(err) = result {
            warn!(target: "speech_driver", %err, "speech request dropped");
        }
    }

    fn submit_notify(&self, ids: Vec<MarkerId>) {
        self.submit_notify_labelled("notify_markers", ids);
    }

    fn submit_notify_labelled(&self, label: &'static str, ids: Vec<MarkerId>) {
        let runtime = Arc::clone(&self.runtime);
        let ticket = runtime.state.ticket();
        self.submit(PendingTask::job(label, move || {
            runtime.notify_markers_and_done(ticket, &ids);
            Ok(())
        }));
    }

    fn submit(&self, task: PendingTask) {
        if let Err(err) = self.queue.submit(task) {
            warn!(target: "speech_driver", %err, "speech request dropped");
        }
    }
}

impl Drop for SpeechDriver {
    fn drop(&mut self) {
        self.terminate();
    }
}

fn close_engine(engine: &dyn SpeechEngine) {
    if let Err(fault) = engine.close() {
        error!(target: "speech_driver", %fault, "failed to release engine session");
    }
}

pub mod artifacts;
#[cfg(feature = "native-engine")]
pub mod native;
