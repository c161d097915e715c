use std::collections::VecDeque;
use std::fmt;

use parking_lot::{Condvar, Mutex};

use crate::orchestrator::error::QueueError;

use super::worker::run_isolated;

pub type TaskFn = Box<dyn FnOnce() -> anyhow::Result<()> + Send + 'static>;

/// Deferred work for the speech worker.
pub enum PendingTask {
    Run { label: &'static str, job: TaskFn },
    /// Stops the worker. Nothing may be submitted after it.
    Shutdown,
}

impl PendingTask {
    pub fn job<F>(label: &'static str, job: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        PendingTask::Run {
            label,
            job: Box::new(job),
        }
    }

    fn is_shutdown(&self) -> bool {
        matches!(self, PendingTask::Shutdown)
    }
}

impl fmt::Debug for PendingTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PendingTask::Run { label, .. } => f.debug_struct("Run").field("label", label).finish(),
            PendingTask::Shutdown => f.write_str("Shutdown"),
        }
    }
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<PendingTask>,
    /// Queued plus in-flight tasks.
    unfinished: usize,
    closed: bool,
}

/// FIFO of deferred tasks drained by exactly one worker.
#[derive(Default)]
pub struct TaskQueue {
    state: Mutex<QueueState>,
    available: Condvar,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit(&self, task: PendingTask) -> Result<(), QueueError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(QueueError::Closed);
        }
        if task.is_shutdown() {
            state.closed = true;
        }
        state.pending.push_back(task);
        state.unfinished += 1;
        drop(state);

        self.available.notify_one();
        Ok(())
    }

    /// Runs `job` right here when nothing is queued or running, otherwise queues it
    /// behind the in-flight work.
    pub fn submit_or_run_inline<F>(&self, label: &'static str, job: F) -> Result<(), QueueError>
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        let busy = {
            let state = self.state.lock();
            if state.closed {
                return Err(QueueError::Closed);
            }
            state.unfinished != 0
        };

        if busy {
            self.submit(PendingTask::job(label, job))
        } else {
            run_isolated(label, Box::new(job));
            Ok(())
        }
    }

    /// Drops every task that has not started yet. The shutdown sentinel stays.
    pub fn drain(&self) -> usize {
        let mut state = self.state.lock();
        let before = state.pending.len();
        state.pending.retain(PendingTask::is_shutdown);
        let removed = before - state.pending.len();
        state.unfinished -= removed;
        removed
    }

    pub fn is_idle(&self) -> bool {
        self.state.lock().unfinished == 0
    }

    pub fn unfinished(&self) -> usize {
        self.state.lock().unfinished
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Blocks until a task is available.
    pub(crate) fn next(&self) -> PendingTask {
        let mut state = self.state.lock();
        loop {
            if let Some(task) = state.pending.pop_front() {
                return task;
            }
            self.available.wait(&mut state);
        }
    }

    pub(crate) fn task_done(&self) {
        let mut state = self.state.lock();
        state.unfinished = state.unfinished.saturating_sub(1);
    }
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TaskQueue")
            .field("pending", &state.pending.len())
            .field("unfinished", &state.unfinished)
            .field("closed", &state.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn run_next(queue: &TaskQueue) -> bool {
        match queue.next() {
            PendingTask::Run { label, job } => {
                run_isolated(label, job);
                queue.task_done();
                true
            }
            PendingTask::Shutdown => {
                queue.task_done();
                false
            }
        }
    }

    #[test]
    fn tasks_run_in_submission_order() {
        let queue = TaskQueue::new();
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

        for index in 0..3 {
            let order = Arc::clone(&order);
            queue
                .submit(PendingTask::job("ordered", move || {
                    order.lock().push(index);
                    Ok(())
                }))
                .expect("submit succeeds");
        }
        assert_eq!(queue.unfinished(), 3);

        while !queue.is_idle() {
            assert!(run_next(&queue));
        }
        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn inline_submission_runs_immediately_when_idle() {
        let queue = TaskQueue::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        queue
            .submit_or_run_inline("inline", move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .expect("inline succeeds");

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(queue.is_idle());
    }

    #[test]
    fn inline_submission_queues_behind_pending_work() {
        let queue = TaskQueue::new();
        let hits = Arc::new(AtomicUsize::new(0));
        queue
            .submit(PendingTask::job("first", || Ok(())))
            .expect("submit succeeds");

        let counter = Arc::clone(&hits);
        queue
            .submit_or_run_inline("second", move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .expect("queued");

        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(queue.unfinished(), 2);
        assert!(run_next(&queue));
        assert!(run_next(&queue));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drain_discards_pending_but_keeps_shutdown() {
        let queue = TaskQueue::new();
        for _ in 0..4 {
            queue
                .submit(PendingTask::job("noise", || Ok(())))
                .expect("submit succeeds");
        }
        queue.submit(PendingTask::Shutdown).expect("shutdown queued");

        assert_eq!(queue.drain(), 4);
        assert_eq!(queue.unfinished(), 1);
        assert!(!run_next(&queue));
        assert!(queue.is_idle());
    }

    #[test]
    fn submissions_after_shutdown_are_rejected() {
        let queue = TaskQueue::new();
        queue.submit(PendingTask::Shutdown).expect("shutdown queued");
        assert!(queue.is_closed());
        assert_eq!(
            queue.submit(PendingTask::job("late", || Ok(()))).unwrap_err(),
            QueueError::Closed
        );
        assert_eq!(
            queue.submit_or_run_inline("late", || Ok(())).unwrap_err(),
            QueueError::Closed
        );
    }
}
