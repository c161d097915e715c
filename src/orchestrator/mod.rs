//! 语音驱动编排：分块、后台任务队列、音频泵与索引标记。

mod blocks;
mod constants;
mod engine;
mod runtime;
mod settings;

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use blocks::{build_blocks, lone_marker, BlockPlan};
pub use config::{AudioFormat, DriverConfig};
pub use engine::artifacts::{artifacts_available, locate_artifacts, EngineArtifacts};
#[cfg(feature = "native-engine")]
pub use engine::native::NativeEngine;
pub use engine::SpeechDriver;
pub use error::{DriverError, EngineFault, QueueError, SinkError, SpeakFault};
pub use runtime::{PendingTask, TaskFn, TaskQueue, TaskWorker};
pub use settings::{host_percent, native_value, param_to_percent, percent_to_param, quantize_percent};
pub use traits::{AudioSink, ChannelListener, SinkCallback, SpeechEngine, SpeechListener};
pub use types::{
    Block, EngineEvent, Intonation, MarkerId, PlaybackPhase, SequenceItem, SpeechNotification,
    VoiceParam,
};
