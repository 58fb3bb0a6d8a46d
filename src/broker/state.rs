//! Lifecycle state machine for the broker
//!
//! ```text
//! Uninitialized --init--> Initialized --start--> Started
//!       |                                          |
//!       +------start (chains init)------>          stop
//!                                                  v
//!                      Started <--start-- StoppedButInitialized
//! ```
//!
//! `stop` clears "started" but keeps "initialized", so a later `start`
//! skips the registry-wide init pass.

use std::fmt;

use serde::Serialize;
use tokio::sync::watch;

/// Current position of the broker in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LifecycleState {
    /// Freshly created, registry still open
    Uninitialized,
    /// `init` is running through the registry
    Initializing,
    /// Every controller completed `init`
    Initialized,
    /// `start` is running through the registry
    Starting,
    /// Every controller completed `start`
    Started,
    /// `stop` is running through the registry
    Stopping,
    /// Stopped after a successful start; `init` is not repeated
    StoppedButInitialized,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Uninitialized => "Uninitialized",
            LifecycleState::Initializing => "Initializing",
            LifecycleState::Initialized => "Initialized",
            LifecycleState::Starting => "Starting",
            LifecycleState::Started => "Started",
            LifecycleState::Stopping => "Stopping",
            LifecycleState::StoppedButInitialized => "StoppedButInitialized",
        }
    }

    /// Stable numeric code, exported as the lifecycle gauge value
    pub fn as_i64(&self) -> i64 {
        match self {
            LifecycleState::Uninitialized => 0,
            LifecycleState::Initializing => 1,
            LifecycleState::Initialized => 2,
            LifecycleState::Starting => 3,
            LifecycleState::Started => 4,
            LifecycleState::Stopping => 5,
            LifecycleState::StoppedButInitialized => 6,
        }
    }

    /// True once the registry-wide init pass has completed
    pub fn is_initialized(&self) -> bool {
        matches!(
            self,
            LifecycleState::Initialized
                | LifecycleState::Starting
                | LifecycleState::Started
                | LifecycleState::Stopping
                | LifecycleState::StoppedButInitialized
        )
    }

    pub fn is_started(&self) -> bool {
        *self == LifecycleState::Started
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A lifecycle phase applied uniformly across the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Init,
    Start,
    Stop,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Init => "init",
            Phase::Start => "start",
            Phase::Stop => "stop",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// In-flight state change.
///
/// Moves the state to a transient value on creation. Unless
/// [`commit`](Transition::commit) is called, dropping the guard restores the
/// state held before the phase began, so neither a failing controller nor a
/// dropped future leaves the broker in `Initializing`/`Starting`/`Stopping`.
pub(crate) struct Transition<'a> {
    state: &'a watch::Sender<LifecycleState>,
    restore: LifecycleState,
    committed: bool,
}

impl<'a> Transition<'a> {
    pub(crate) fn begin(state: &'a watch::Sender<LifecycleState>, via: LifecycleState) -> Self {
        let restore = state.send_replace(via);
        Self {
            state,
            restore,
            committed: false,
        }
    }

    pub(crate) fn commit(mut self, to: LifecycleState) {
        self.state.send_replace(to);
        self.committed = true;
    }
}

impl Drop for Transition<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.state.send_replace(self.restore);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialized_flag_survives_stop() {
        assert!(!LifecycleState::Uninitialized.is_initialized());
        assert!(LifecycleState::Initialized.is_initialized());
        assert!(LifecycleState::StoppedButInitialized.is_initialized());
        assert!(!LifecycleState::StoppedButInitialized.is_started());
        assert!(LifecycleState::Started.is_started());
    }

    #[test]
    fn test_transition_commit() {
        let (tx, rx) = watch::channel(LifecycleState::Uninitialized);
        let transition = Transition::begin(&tx, LifecycleState::Initializing);
        assert_eq!(*rx.borrow(), LifecycleState::Initializing);
        transition.commit(LifecycleState::Initialized);
        assert_eq!(*rx.borrow(), LifecycleState::Initialized);
    }

    #[test]
    fn test_transition_restores_on_drop() {
        let (tx, rx) = watch::channel(LifecycleState::Initialized);
        {
            let _transition = Transition::begin(&tx, LifecycleState::Starting);
            assert_eq!(*rx.borrow(), LifecycleState::Starting);
        }
        assert_eq!(*rx.borrow(), LifecycleState::Initialized);
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Init.to_string(), "init");
        assert_eq!(Phase::Stop.to_string(), "stop");
        assert_eq!(LifecycleState::StoppedButInitialized.to_string(), "StoppedButInitialized");
    }
}
