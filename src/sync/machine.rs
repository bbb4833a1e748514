/// Outbound-sync lifecycle as an explicit state machine instead of ambient
/// timer handles and boolean flags.
///
/// `Suppressed` means the most recent state change arrived over the broadcast
/// channel: the next elapsed debounce timer consumes it and skips the push,
/// so broadcast-originated state is never echoed back as a local write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    /// A local edit happened; waiting for the quiet period to elapse.
    Debouncing,
    /// A push is in flight. `redirty` records local edits that arrived while
    /// pushing; they get their own debounce cycle once the push settles.
    Pushing { redirty: bool },
    Suppressed,
}

impl SyncPhase {
    pub fn name(self) -> &'static str {
        match self {
            SyncPhase::Idle => "idle",
            SyncPhase::Debouncing => "debouncing",
            SyncPhase::Pushing { .. } => "pushing",
            SyncPhase::Suppressed => "suppressed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEvent {
    LocalEdit,
    DebounceElapsed,
    PushStarted,
    /// The merged dataset matched the held global data; nothing to push.
    PushSkipped,
    PushSucceeded,
    PushFailed,
    BroadcastApplied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    None,
    /// (Re)start the debounce timer.
    Schedule,
    /// Run the outbound reconciliation pass now.
    RunSync,
}

/// Pure transition function; the engine owns the side effects.
pub fn transition(phase: SyncPhase, event: SyncEvent) -> (SyncPhase, Action) {
    use Action::*;
    use SyncEvent::*;
    use SyncPhase::*;

    match (phase, event) {
        (Idle, LocalEdit) | (Debouncing, LocalEdit) => (Debouncing, Schedule),
        // Broadcast-originated state stays suppressed until one timer fires;
        // the edit reaches the remote on the following cycle.
        (Suppressed, LocalEdit) => (Suppressed, Schedule),
        (Pushing { .. }, LocalEdit) => (Pushing { redirty: true }, None),

        (Debouncing, DebounceElapsed) => (Debouncing, RunSync),
        (Suppressed, DebounceElapsed) => (Idle, None),
        // Stray timer; the in-flight push already owns the cycle.
        (Pushing { redirty }, DebounceElapsed) => (Pushing { redirty }, None),
        (Idle, DebounceElapsed) => (Idle, None),

        (Debouncing, PushStarted) => (Pushing { redirty: false }, None),
        (Debouncing, PushSkipped) => (Idle, None),

        (Pushing { redirty: true }, PushSucceeded | PushFailed | PushSkipped) => {
            (Debouncing, Schedule)
        }
        (Pushing { redirty: false }, PushSucceeded | PushFailed | PushSkipped) => (Idle, None),

        (Idle | Debouncing | Suppressed, BroadcastApplied) => (Suppressed, Schedule),
        // The in-flight push captured pre-broadcast state; the post-push
        // comparison reconciles any difference on the next cycle.
        (Pushing { redirty }, BroadcastApplied) => (Pushing { redirty }, None),

        (phase, _) => (phase, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_edit_restarts_debounce() {
        let (p, a) = transition(SyncPhase::Idle, SyncEvent::LocalEdit);
        assert_eq!(p, SyncPhase::Debouncing);
        assert_eq!(a, Action::Schedule);
        let (p, a) = transition(p, SyncEvent::LocalEdit);
        assert_eq!(p, SyncPhase::Debouncing);
        assert_eq!(a, Action::Schedule);
    }

    #[test]
    fn suppressed_consumes_one_elapsed_timer() {
        let (p, a) = transition(SyncPhase::Idle, SyncEvent::BroadcastApplied);
        assert_eq!(p, SyncPhase::Suppressed);
        assert_eq!(a, Action::Schedule);
        let (p, a) = transition(p, SyncEvent::DebounceElapsed);
        assert_eq!(p, SyncPhase::Idle);
        assert_eq!(a, Action::None);
        // A later edit syncs normally again.
        let (p, a) = transition(p, SyncEvent::LocalEdit);
        assert_eq!(p, SyncPhase::Debouncing);
        assert_eq!(a, Action::Schedule);
    }

    #[test]
    fn edits_during_push_get_their_own_cycle() {
        let (p, _) = transition(SyncPhase::Debouncing, SyncEvent::PushStarted);
        assert_eq!(p, SyncPhase::Pushing { redirty: false });
        let (p, _) = transition(p, SyncEvent::LocalEdit);
        assert_eq!(p, SyncPhase::Pushing { redirty: true });
        let (p, a) = transition(p, SyncEvent::PushSucceeded);
        assert_eq!(p, SyncPhase::Debouncing);
        assert_eq!(a, Action::Schedule);
    }

    #[test]
    fn clean_push_returns_to_idle() {
        let (p, a) = transition(
            SyncPhase::Pushing { redirty: false },
            SyncEvent::PushSucceeded,
        );
        assert_eq!(p, SyncPhase::Idle);
        assert_eq!(a, Action::None);
    }

    #[test]
    fn elapsed_timer_while_pushing_is_ignored() {
        let (p, a) = transition(
            SyncPhase::Pushing { redirty: true },
            SyncEvent::DebounceElapsed,
        );
        assert_eq!(p, SyncPhase::Pushing { redirty: true });
        assert_eq!(a, Action::None);
    }
}
