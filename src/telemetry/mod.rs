//! 观测性初始化：控制台输出与滚动日志文件。

pub mod events;

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

const LOG_FILE_PREFIX: &str = "brailab-driver.log";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the console subscriber. Returns `false` when a global subscriber
/// was already set by the host.
pub fn init_tracing() -> bool {
    let fmt_layer = fmt::layer().with_target(true);
    let subscriber = Registry::default().with(env_filter()).with(fmt_layer);

    tracing::subscriber::set_global_default(subscriber).is_ok()
}

/// Like [`init_tracing`], but writes JSON lines to a daily file under `dir`.
/// Keep the guard alive for as long as logs should be flushed.
pub fn init_file_tracing(dir: &Path) -> Option<WorkerGuard> {
    let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let file_layer = fmt::layer().json().with_ansi(false).with_writer(writer);
    let subscriber = Registry::default().with(env_filter()).with(file_layer);

    match tracing::subscriber::set_global_default(subscriber) {
        Ok(()) => Some(guard),
        Err(_) => None,
    }
}
