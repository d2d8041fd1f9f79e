//! Orchestrator lifecycle state.

use tokio::sync::watch;

use crate::error::{SchedError, SchedResult};

/// Lifecycle of one orchestrator.
///
/// ```text
/// Active <--> Paused
///    \          /
///     v        v
///      Killed ----> Dead
/// ```
///
/// Every state may move to `Dead` once the monitor task has torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// Monitor iterations promote and retire jobs.
    Active,
    /// Monitor iterations are skipped; bookkeeping is frozen.
    Paused,
    /// Hard-stopped without remote cancellation.
    Killed,
    /// Monitor task has exited and the port is closed.
    Dead,
}

impl Lifecycle {
    /// Whether `next` is reachable from this state in one step.
    pub fn can_transition_to(self, next: Lifecycle) -> bool {
        use Lifecycle::*;
        match (self, next) {
            (a, b) if a == b => true,
            (_, Dead) => true,
            (Active, Paused) | (Paused, Active) => true,
            (Active, Killed) | (Paused, Killed) => true,
            _ => false,
        }
    }

    /// Whether the orchestrator can no longer do any work.
    pub fn is_stopped(self) -> bool {
        matches!(self, Lifecycle::Killed | Lifecycle::Dead)
    }

    /// Get a human-readable state name.
    pub fn name(self) -> &'static str {
        match self {
            Lifecycle::Active => "Active",
            Lifecycle::Paused => "Paused",
            Lifecycle::Killed => "Killed",
            Lifecycle::Dead => "Dead",
        }
    }
}

impl std::fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Lifecycle holder shared by the orchestrator and its monitor task.
///
/// All changes go through [`LifecycleCell::transition`]; observers get a
/// `watch` receiver so the monitor wakes up as soon as it is killed.
#[derive(Debug)]
pub(crate) struct LifecycleCell {
    tx: watch::Sender<Lifecycle>,
}

impl LifecycleCell {
    pub(crate) fn new(initial: Lifecycle) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub(crate) fn get(&self) -> Lifecycle {
        *self.tx.borrow()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Lifecycle> {
        self.tx.subscribe()
    }

    /// Move to `next`, returning the previous state.
    pub(crate) fn transition(&self, next: Lifecycle) -> SchedResult<Lifecycle> {
        let mut outcome = Ok(next);
        self.tx.send_if_modified(|current| {
            let previous = *current;
            if !previous.can_transition_to(next) {
                outcome = Err(SchedError::DeadOrchestrator(format!(
                    "cannot move from {previous} to {next}"
                )));
                return false;
            }
            outcome = Ok(previous);
            *current = next;
            previous != next
        });
        outcome
    }

    /// Fail fast when the orchestrator can no longer accept calls.
    pub(crate) fn ensure_alive(&self) -> SchedResult<()> {
        match self.get() {
            Lifecycle::Killed => Err(SchedError::DeadOrchestrator("killed".to_string())),
            Lifecycle::Dead => Err(SchedError::DeadOrchestrator("shut down".to_string())),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_table() {
        use Lifecycle::*;
        assert!(Active.can_transition_to(Paused));
        assert!(Paused.can_transition_to(Active));
        assert!(Paused.can_transition_to(Killed));
        assert!(Killed.can_transition_to(Dead));
        assert!(Active.can_transition_to(Active));
        assert!(!Killed.can_transition_to(Active));
        assert!(!Dead.can_transition_to(Paused));
        assert!(!Dead.can_transition_to(Killed));
    }

    #[test]
    fn test_cell_transition_reports_previous() {
        let cell = LifecycleCell::new(Lifecycle::Active);
        assert_eq!(cell.transition(Lifecycle::Paused).unwrap(), Lifecycle::Active);
        assert_eq!(cell.get(), Lifecycle::Paused);
        assert_eq!(cell.transition(Lifecycle::Paused).unwrap(), Lifecycle::Paused);
    }

    #[test]
    fn test_cell_rejects_revival() {
        let cell = LifecycleCell::new(Lifecycle::Active);
        cell.transition(Lifecycle::Killed).unwrap();
        assert!(cell.transition(Lifecycle::Active).is_err());
        assert_eq!(cell.get(), Lifecycle::Killed);
        assert!(cell.ensure_alive().is_err());
    }

    #[tokio::test]
    async fn test_subscribers_see_kill() {
        let cell = LifecycleCell::new(Lifecycle::Active);
        let mut rx = cell.subscribe();
        cell.transition(Lifecycle::Killed).unwrap();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), Lifecycle::Killed);
    }
}
