use std::path::PathBuf;

use thiserror::Error;

/// Failures that keep the driver from being constructed or used at all.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("speech engine library not found under {searched}")]
    EngineLibraryMissing { searched: PathBuf },
    #[error("engine wrapper library not found: {path}")]
    WrapperLibraryMissing { path: PathBuf },
    #[error("engine session initialisation failed for {path}")]
    SessionInit { path: PathBuf },
    #[error("failed to resolve driver directory: {0}")]
    BaseDir(#[source] std::io::Error),
    #[error("driver executable has no parent directory: {path}")]
    NoParentDir { path: PathBuf },
    #[error("failed to spawn speech worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),
    #[error("task queue was already shut down")]
    Terminated,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineFault {
    #[error("engine rejected start request with status {status}")]
    StartRejected { status: i32 },
    #[error("engine reported error {code}")]
    Reported { code: i32 },
    #[error("engine call failed: {0}")]
    Raised(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SinkError {
    #[error("audio sink is closed")]
    Closed,
    #[error("audio sink rejected buffer: {0}")]
    Rejected(String),
    #[error("audio output device unavailable: {0}")]
    Unavailable(String),
}

/// Why a segment could not be spoken to completion.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SpeakFault {
    #[error(transparent)]
    Engine(#[from] EngineFault),
    #[error(transparent)]
    Sink(#[from] SinkError),
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("task queue is shut down")]
    Closed,
}
