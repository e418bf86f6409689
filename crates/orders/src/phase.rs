//! Order creation state machine.

/// Phase of a single order creation attempt.
///
/// ```text
/// Started ──► Validating ──┬──► Aborted
///                          └──► Persisting ──┬──► Committed
///                                            └──► RolledBack
/// ```
///
/// `Aborted` and `RolledBack` leave nothing in storage; only `Committed`
/// produces a visible order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CreationPhase {
    #[default]
    Started,
    Validating,
    Aborted,
    Persisting,
    Committed,
    RolledBack,
}

impl CreationPhase {
    /// Returns true if `next` may follow this phase.
    pub fn can_transition_to(&self, next: CreationPhase) -> bool {
        use CreationPhase::*;
        matches!(
            (self, next),
            (Started, Validating)
                | (Validating, Aborted)
                | (Validating, Persisting)
                | (Persisting, Committed)
                | (Persisting, RolledBack)
        )
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CreationPhase::Aborted | CreationPhase::Committed | CreationPhase::RolledBack
        )
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CreationPhase::Started => "Started",
            CreationPhase::Validating => "Validating",
            CreationPhase::Aborted => "Aborted",
            CreationPhase::Persisting => "Persisting",
            CreationPhase::Committed => "Committed",
            CreationPhase::RolledBack => "RolledBack",
        }
    }
}

impl std::fmt::Display for CreationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tracks and logs the phases of one attempt.
#[derive(Debug, Default)]
pub(crate) struct PhaseTracker {
    history: Vec<CreationPhase>,
}

impl PhaseTracker {
    pub(crate) fn new() -> Self {
        Self {
            history: vec![CreationPhase::Started],
        }
    }

    pub(crate) fn current(&self) -> CreationPhase {
        self.history.last().copied().unwrap_or_default()
    }

    pub(crate) fn advance(&mut self, next: CreationPhase) {
        let current = self.current();
        debug_assert!(
            current.can_transition_to(next),
            "illegal order phase transition {current} -> {next}"
        );
        tracing::debug!(from = %current, to = %next, "order phase");
        self.history.push(next);
    }

    #[cfg(test)]
    pub(crate) fn history(&self) -> &[CreationPhase] {
        &self.history
    }
}
