//! 后台语音任务运行时：任务队列、工作线程、音频泵与标记调度。

mod job;
mod markers;
mod pump;
mod queue;
mod state;
mod worker;

pub use queue::{PendingTask, TaskFn, TaskQueue};
pub use worker::TaskWorker;

pub(crate) use job::SpeechRuntime;
