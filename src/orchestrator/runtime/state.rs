use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::orchestrator::types::PlaybackPhase;

/// Generation number of one speak job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Utterance(u64);

impl Utterance {
    pub(crate) fn id(self) -> u64 {
        self.0
    }
}

/// Number of cancels seen when a request was queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CancelTicket(u64);

/// Shared speaking flag plus the generation it belongs to.
///
/// Writers: the worker when a job begins, `cancel`, and the completion of the
/// utterance (done marker or early exit). Everyone else only reads.
#[derive(Debug, Default)]
pub(crate) struct PlaybackState {
    speaking: AtomicBool,
    generation: AtomicU64,
    cancels: AtomicU64,
}

impl PlaybackState {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn ticket(&self) -> CancelTicket {
        CancelTicket(self.cancels.load(Ordering::SeqCst))
    }

    /// False once a cancel has landed after `ticket` was taken.
    pub(crate) fn is_valid(&self, ticket: CancelTicket) -> bool {
        self.cancels.load(Ordering::SeqCst) == ticket.0
    }

    /// Starts a new generation unless a cancel arrived since `ticket`.
    ///
    /// The ticket is checked again after the flag is raised: a cancel racing
    /// this call either sees the flag and clears it, or is seen here.
    pub(crate) fn begin(&self, ticket: CancelTicket) -> Option<Utterance> {
        if !self.is_valid(ticket) {
            return None;
        }
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.speaking.store(true, Ordering::SeqCst);
        let utterance = Utterance(generation);
        if !self.is_valid(ticket) {
            self.finish(utterance);
            return None;
        }
        Some(utterance)
    }

    pub(crate) fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }

    /// True while `utterance` is the latest job and has not been stopped.
    pub(crate) fn is_current(&self, utterance: Utterance) -> bool {
        self.generation.load(Ordering::SeqCst) == utterance.0 && self.is_speaking()
    }

    /// Clears the flag regardless of generation.
    pub(crate) fn halt(&self) -> bool {
        self.speaking.swap(false, Ordering::SeqCst)
    }

    /// Invalidates every outstanding ticket, then halts.
    pub(crate) fn cancel(&self) -> bool {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        self.halt()
    }

    /// Clears the flag for `utterance` only; returns whether this call did it.
    pub(crate) fn finish(&self, utterance: Utterance) -> bool {
        if self.generation.load(Ordering::SeqCst) != utterance.0 {
            return false;
        }
        self.speaking
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub(crate) fn phase(&self) -> PlaybackPhase {
        if self.is_speaking() {
            PlaybackPhase::Speaking
        } else {
            PlaybackPhase::Idle
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_marks_speaking_with_fresh_generation() {
        let state = PlaybackState::new();
        assert_eq!(state.phase(), PlaybackPhase::Idle);

        let first = state.begin(state.ticket()).expect("fresh ticket");
        assert!(state.is_current(first));
        let second = state.begin(state.ticket()).expect("fresh ticket");
        assert!(!state.is_current(first));
        assert!(state.is_current(second));
        assert_eq!(state.phase(), PlaybackPhase::Speaking);
    }

    #[test]
    fn finish_only_fires_once_for_its_own_generation() {
        let state = PlaybackState::new();
        let stale = state.begin(state.ticket()).expect("fresh ticket");
        let live = state.begin(state.ticket()).expect("fresh ticket");

        assert!(!state.finish(stale));
        assert!(state.is_speaking());
        assert!(state.finish(live));
        assert!(!state.finish(live));
        assert_eq!(state.phase(), PlaybackPhase::Idle);
    }

    #[test]
    fn halt_suppresses_current_generation() {
        let state = PlaybackState::new();
        let utterance = state.begin(state.ticket()).expect("fresh ticket");
        assert!(state.halt());
        assert!(!state.is_current(utterance));
        assert!(!state.finish(utterance));
        assert!(!state.halt());
    }

    #[test]
    fn cancel_invalidates_tickets_taken_before_it() {
        let state = PlaybackState::new();
        let stale = state.ticket();
        assert!(state.is_valid(stale));

        assert!(!state.cancel());
        assert!(!state.is_valid(stale));
        assert_eq!(state.begin(stale), None);
        assert_eq!(state.phase(), PlaybackPhase::Idle);

        let fresh = state.ticket();
        let utterance = state.begin(fresh).expect("fresh ticket");
        assert!(state.is_current(utterance));
    }

    #[test]
    fn completion_does_not_invalidate_tickets() {
        let state = PlaybackState::new();
        let queued = state.ticket();
        let running = state.begin(state.ticket()).expect("fresh ticket");
        assert!(state.finish(running));

        assert!(state.is_valid(queued));
        assert!(state.begin(queued).is_some());
    }

    #[test]
    fn cancel_halts_the_running_generation() {
        let state = PlaybackState::new();
        let utterance = state.begin(state.ticket()).expect("fresh ticket");
        assert!(state.cancel());
        assert!(!state.is_current(utterance));
        assert!(!state.finish(utterance));
    }
}
