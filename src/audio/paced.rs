use std::collections::VecDeque;
use std::fmt;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use bytes::Bytes;
use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::{debug, error, trace};

use crate::orchestrator::config::AudioFormat;
use crate::orchestrator::error::SinkError;
use crate::orchestrator::traits::{AudioSink, SinkCallback};

const PLAYER_THREAD_NAME: &str = "brailab-audio-sink";

struct Unit {
    len: usize,
    on_done: Option<SinkCallback>,
}

#[derive(Default)]
struct PlayerState {
    units: VecDeque<Unit>,
    playing: bool,
    paused: bool,
    closed: bool,
    /// Bumped by `stop`; a unit started under an older epoch is abandoned.
    epoch: u64,
    played_bytes: u64,
}

impl PlayerState {
    fn is_drained(&self) -> bool {
        self.closed || (self.units.is_empty() && !self.playing)
    }
}

struct Shared {
    state: Mutex<PlayerState>,
    changed: Condvar,
    bytes_per_second: Option<u64>,
}

impl Shared {
    fn unit_duration(&self, len: usize) -> Duration {
        match self.bytes_per_second {
            Some(rate) if rate > 0 && len > 0 => Duration::from_secs_f64(len as f64 / rate as f64),
            _ => Duration::ZERO,
        }
    }
}

/// Software audio sink that "plays" each unit for as long as its bytes last
/// at the configured rate, then runs its callback. Nothing reaches a device;
/// the `device-sink` feature provides `DeviceSink` for real output.
pub struct PacedSink {
    shared: Arc<Shared>,
    player: Mutex<Option<JoinHandle<()>>>,
    player_id: ThreadId,
}

impl PacedSink {
    /// `None` plays every unit instantly.
    pub fn new(bytes_per_second: Option<u64>) -> io::Result<Self> {
        let shared = Arc::new(Shared {
            state: Mutex::new(PlayerState::default()),
            changed: Condvar::new(),
            bytes_per_second,
        });
        let player_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name(PLAYER_THREAD_NAME.to_string())
            .spawn(move || play(player_shared))?;
        let player_id = handle.thread().id();

        Ok(Self {
            shared,
            player: Mutex::new(Some(handle)),
            player_id,
        })
    }

    pub fn with_format(format: AudioFormat) -> io::Result<Self> {
        Self::new(Some(format.bytes_per_second()))
    }

    pub fn unpaced() -> io::Result<Self> {
        Self::new(None)
    }

    pub fn bytes_per_second(&self) -> Option<u64> {
        self.shared.bytes_per_second
    }

    /// Audio bytes that finished playing without being stopped.
    pub fn played_bytes(&self) -> u64 {
        self.shared.state.lock().played_bytes
    }

    pub fn queued_units(&self) -> usize {
        self.shared.state.lock().units.len()
    }

    fn on_player_thread(&self) -> bool {
        thread::current().id() == self.player_id
    }
}

impl AudioSink for PacedSink {
    fn feed(&self, chunk: Bytes, on_done: Option<SinkCallback>) -> Result<(), SinkError> {
        let mut state = self.shared.state.lock();
        if state.closed {
            return Err(SinkError::Closed);
        }
        state.units.push_back(Unit {
            len: chunk.len(),
            on_done,
        });
        drop(state);

        self.shared.changed.notify_all();
        Ok(())
    }

    fn pause(&self, paused: bool) {
        self.shared.state.lock().paused = paused;
        self.shared.changed.notify_all();
    }

    fn stop(&self) {
        let mut state = self.shared.state.lock();
        let discarded = state.units.len();
        state.units.clear();
        state.epoch += 1;
        drop(state);

        self.shared.changed.notify_all();
        trace!(target: "audio_sink", discarded, "sink stopped");
    }

    fn idle(&self) {
        if self.on_player_thread() {
            return;
        }
        let mut state = self.shared.state.lock();
        while !state.is_drained() {
            self.shared.changed.wait(&mut state);
        }
    }
}

impl Drop for PacedSink {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock();
            state.closed = true;
            state.units.clear();
        }
        self.shared.changed.notify_all();

        let Some(handle) = self.player.lock().take() else {
            return;
        };
        if self.on_player_thread() {
            return;
        }
        if handle.join().is_err() {
            error!(target: "audio_sink", "audio sink thread panicked");
        }
    }
}

impl fmt::Debug for PacedSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PacedSink")
            .field("bytes_per_second", &self.shared.bytes_per_second)
            .field("queued_units", &self.queued_units())
            .finish()
    }
}

fn play(shared: Arc<Shared>) {
    debug!(target: "audio_sink", "audio sink started");
    let mut state = shared.state.lock();

    loop {
        if state.closed {
            break;
        }
        if state.paused {
            shared.changed.wait(&mut state);
            continue;
        }
        let Some(unit) = state.units.pop_front() else {
            shared.changed.wait(&mut state);
            continue;
        };

        state.playing = true;
        let epoch = state.epoch;
        let finished = play_unit(&shared, &mut state, shared.unit_duration(unit.len), epoch);

        if finished {
            state.played_bytes += unit.len as u64;
            if let Some(callback) = unit.on_done {
                MutexGuard::unlocked(&mut state, callback);
            }
        }
        state.playing = false;
        shared.changed.notify_all();
    }

    state.playing = false;
    drop(state);
    shared.changed.notify_all();
    debug!(target: "audio_sink", "audio sink stopped");
}

/// Waits out `duration`, not counting time spent paused. Returns `false` when
/// the unit was stopped or the sink closed first.
fn play_unit(
    shared: &Shared,
    state: &mut MutexGuard<'_, PlayerState>,
    duration: Duration,
    epoch: u64,
) -> bool {
    let mut remaining = duration;
    loop {
        if state.closed || state.epoch != epoch {
            return false;
        }
        if remaining.is_zero() {
            return true;
        }
        if state.paused {
            shared.changed.wait(state);
            continue;
        }

        let started = Instant::now();
        shared.changed.wait_for(state, remaining);
        if !state.paused {
            remaining = remaining.saturating_sub(started.elapsed());
        }
    }
}
