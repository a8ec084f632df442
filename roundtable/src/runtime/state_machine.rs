//! The driver's internal state machine.
//!
//! Grounded directly on the teacher's `state_machine.rs`
//! (`OrchestratorState` + `is_legal_transition`): a small enum, an
//! explicit legal-transition table, and a `TransitionRecord` for the
//! driver's own audit trail (distinct from the caller-visible
//! `SessionStatus` on `Session`, though the two are kept in lockstep by
//! the driver).

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Pending,
    Planning,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl DriverState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            DriverState::Completed | DriverState::Failed | DriverState::Cancelled
        )
    }
}

impl std::fmt::Display for DriverState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DriverState::Pending => "pending",
            DriverState::Planning => "planning",
            DriverState::Running => "running",
            DriverState::Completed => "completed",
            DriverState::Failed => "failed",
            DriverState::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// Any non-terminal state may always transition to `Failed` or
/// `Cancelled`; beyond that, only the forward-progress edges below are
/// legal.
pub fn is_legal_transition(from: DriverState, to: DriverState) -> bool {
    if from.is_terminal() {
        return false;
    }
    if matches!(to, DriverState::Failed | DriverState::Cancelled) {
        return true;
    }
    matches!(
        (from, to),
        (DriverState::Pending, DriverState::Planning)
            | (DriverState::Planning, DriverState::Running)
            | (DriverState::Running, DriverState::Running)
            | (DriverState::Running, DriverState::Completed)
    )
}

#[derive(Debug, Clone)]
pub struct IllegalTransition {
    pub from: DriverState,
    pub to: DriverState,
}

impl std::fmt::Display for IllegalTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "illegal transition {} -> {}", self.from, self.to)
    }
}

impl std::error::Error for IllegalTransition {}

#[derive(Debug, Clone)]
pub struct TransitionRecord {
    pub from: DriverState,
    pub to: DriverState,
    pub at: DateTime<Utc>,
}

/// Tracks the driver's current state plus a transition history,
/// rejecting illegal transitions.
#[derive(Debug, Default)]
pub struct DriverStateMachine {
    current: Option<DriverState>,
    history: Vec<TransitionRecord>,
}

impl DriverStateMachine {
    pub fn new() -> Self {
        Self {
            current: Some(DriverState::Pending),
            history: Vec::new(),
        }
    }

    pub fn current(&self) -> DriverState {
        self.current.unwrap_or(DriverState::Pending)
    }

    pub fn transition(&mut self, to: DriverState) -> Result<(), IllegalTransition> {
        let from = self.current();
        if !is_legal_transition(from, to) {
            return Err(IllegalTransition { from, to });
        }
        self.history.push(TransitionRecord {
            from,
            to,
            at: Utc::now(),
        });
        self.current = Some(to);
        Ok(())
    }

    pub fn history(&self) -> &[TransitionRecord] {
        &self.history
    }
}
