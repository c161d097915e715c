use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, error};

use super::queue::{PendingTask, TaskFn, TaskQueue};

const WORKER_THREAD_NAME: &str = "brailab-speech-worker";

/// The single background thread that owns every engine interaction.
#[derive(Debug)]
pub struct TaskWorker {
    queue: Arc<TaskQueue>,
    handle: Option<JoinHandle<()>>,
}

impl TaskWorker {
    pub fn spawn(queue: Arc<TaskQueue>) -> std::io::Result<Self> {
        let worker_queue = Arc::clone(&queue);
        let handle = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || run(worker_queue))?;

        Ok(Self {
            queue,
            handle: Some(handle),
        })
    }

    pub fn queue(&self) -> &Arc<TaskQueue> {
        &self.queue
    }

    /// Queues the shutdown sentinel and waits for the thread to exit.
    pub fn shutdown(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        if let Err(err) = self.queue.submit(PendingTask::Shutdown) {
            debug!(
                target: "speech_worker",
                %err,
                "shutdown sentinel already queued"
            );
        }

        if handle.thread().id() == thread::current().id() {
            error!(
                target: "speech_worker",
                "speech worker asked to join itself; detaching"
            );
            return;
        }

        if handle.join().is_err() {
            error!(target: "speech_worker", "speech worker thread panicked");
        }
    }
}

impl Drop for TaskWorker {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

fn run(queue: Arc<TaskQueue>) {
    debug!(target: "speech_worker", "speech worker started");
    loop {
        match queue.next() {
            PendingTask::Run { label, job } => {
                run_isolated(label, job);
                queue.task_done();
            }
            PendingTask::Shutdown => {
                queue.task_done();
                break;
            }
        }
    }
    debug!(target: "speech_worker", "speech worker stopped");
}

/// Runs one task; errors and panics are logged and never escape.
pub(crate) fn run_isolated(label: &'static str, job: TaskFn) {
    match panic::catch_unwind(AssertUnwindSafe(job)) {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            error!(
                target: "speech_worker",
                task = label,
                error = %format!("{err:#}"),
                "background speech task failed"
            );
        }
        Err(payload) => {
            error!(
                target: "speech_worker",
                task = label,
                panic = panic_message(payload.as_ref()),
                "background speech task panicked"
            );
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
