use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Host-defined position id reported once the audio before it has played.
pub type MarkerId = i32;

/// One element of a host speech sequence. Order is significant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceItem {
    Text(String),
    IndexMarker(MarkerId),
}

impl SequenceItem {
    pub fn text<S: Into<String>>(text: S) -> Self {
        SequenceItem::Text(text.into())
    }

    pub fn marker(id: MarkerId) -> Self {
        SequenceItem::IndexMarker(id)
    }
}

impl From<&str> for SequenceItem {
    fn from(text: &str) -> Self {
        SequenceItem::Text(text.to_string())
    }
}

impl From<String> for SequenceItem {
    fn from(text: String) -> Self {
        SequenceItem::Text(text)
    }
}

/// A run of engine-safe text and the markers that follow it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Block {
    pub text: String,
    pub markers: Vec<MarkerId>,
}

impl Block {
    pub fn new<S: Into<String>>(text: S, markers: Vec<MarkerId>) -> Self {
        Self {
            text: text.into(),
            markers,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.is_empty() && self.markers.is_empty()
    }
}

/// Output of one engine `read` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    None,
    AudioChunk(Bytes),
    Done,
    Error(i32),
}

/// Whether `start_speak` should use the engine's intonation model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intonation {
    Normal,
    Flat,
}

impl Intonation {
    pub fn from_enabled(enabled: bool) -> Self {
        if enabled {
            Intonation::Normal
        } else {
            Intonation::Flat
        }
    }

    /// Wire value of the wrapper's `noIntonation` argument.
    pub fn no_intonation_flag(self) -> i32 {
        match self {
            Intonation::Normal => 0,
            Intonation::Flat => 1,
        }
    }
}

/// Native voice parameters and their engine ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoiceParam {
    Tempo,
    Pitch,
    Volume,
}

impl VoiceParam {
    pub fn native_range(self) -> (i32, i32) {
        match self {
            VoiceParam::Tempo => (0, 9),
            VoiceParam::Pitch => (-1, 1),
            VoiceParam::Volume => (-2, 2),
        }
    }

    /// Host-facing percent step; values in between carry no meaning for the engine.
    pub fn percent_step(self) -> u8 {
        match self {
            VoiceParam::Tempo => 10,
            VoiceParam::Pitch => 50,
            VoiceParam::Volume => 25,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VoiceParam::Tempo => "tempo",
            VoiceParam::Pitch => "pitch",
            VoiceParam::Volume => "volume",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPhase {
    Idle,
    Speaking,
}

impl PlaybackPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackPhase::Idle => "idle",
            PlaybackPhase::Speaking => "speaking",
        }
    }
}

/// Notification delivered to the host, in utterance order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechNotification {
    IndexReached(MarkerId),
    DoneSpeaking,
}
