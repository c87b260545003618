//! Per-stage lifecycle state machine

use std::sync::Mutex;
use tokio::sync::Notify;
use tracing::trace;

/// Lifecycle state of a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValveState {
    /// Running normally
    Active,
    /// Abruptly stopped; no further traffic is accepted
    Stopping,
    /// Gracefully shut; terminal
    Shut,
}

/// The abrupt-stop / graceful-shutdown state machine every stage carries.
///
/// `stop` is the abrupt, best-effort, non-blocking path; `shut` is the
/// cooperative, exhaustive one. A valve only ever moves forward:
/// `Active → Stopping → Shut`.
#[derive(Debug)]
pub struct Valve {
    state: Mutex<ValveState>,
    shut: Notify,
}

impl Valve {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ValveState::Active),
            shut: Notify::new(),
        }
    }

    /// Current state
    pub fn state(&self) -> ValveState {
        *self.state.lock().expect("valve state lock")
    }

    /// Mark the valve stopped. Never blocks, never fails.
    ///
    /// Returns whether this call performed the transition; later calls are
    /// no-ops. The flag is the exactly-once guard for upward propagation.
    pub fn stop(&self) -> bool {
        let mut state = self.state.lock().expect("valve state lock");
        match *state {
            ValveState::Active => {
                *state = ValveState::Stopping;
                trace!("valve stopped");
                true
            }
            _ => false,
        }
    }

    /// Mark the valve shut and wake anyone waiting in [`Valve::drained`].
    /// Safe to call twice; the second call is a no-op.
    pub async fn shut(&self) {
        {
            let mut state = self.state.lock().expect("valve state lock");
            if *state == ValveState::Shut {
                return;
            }
            *state = ValveState::Shut;
        }
        trace!("valve shut");
        self.shut.notify_waiters();
    }

    /// Wait until the valve reaches [`ValveState::Shut`].
    pub async fn drained(&self) {
        loop {
            let notified = self.shut.notified();
            if self.state() == ValveState::Shut {
                return;
            }
            notified.await;
        }
    }
}

impl Default for Valve {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_transitions_once() {
        let valve = Valve::new();
        assert_eq!(valve.state(), ValveState::Active);

        assert!(valve.stop());
        assert_eq!(valve.state(), ValveState::Stopping);

        // Second stop is a no-op
        assert!(!valve.stop());
        assert_eq!(valve.state(), ValveState::Stopping);
    }

    #[tokio::test]
    async fn test_shut_is_terminal_and_repeatable() {
        let valve = Valve::new();
        valve.shut().await;
        assert_eq!(valve.state(), ValveState::Shut);

        valve.shut().await;
        assert_eq!(valve.state(), ValveState::Shut);

        // Stop after shut stays shut and does not claim the transition
        assert!(!valve.stop());
        assert_eq!(valve.state(), ValveState::Shut);
    }

    #[tokio::test]
    async fn test_stop_then_shut() {
        let valve = Valve::new();
        assert!(valve.stop());
        valve.shut().await;
        assert_eq!(valve.state(), ValveState::Shut);
    }

    #[tokio::test]
    async fn test_drained_wakes_on_shut() {
        let valve = std::sync::Arc::new(Valve::new());

        let waiter = {
            let valve = valve.clone();
            tokio::spawn(async move { valve.drained().await })
        };

        valve.shut().await;
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_drained_returns_immediately_when_shut() {
        let valve = Valve::new();
        valve.shut().await;
        valve.drained().await;
    }
}
