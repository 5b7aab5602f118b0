//! Process lifecycle state
//!
//! Cluster-wide operations such as clearing the distributed cache are skipped
//! while the process is still starting or already stopping.

use std::sync::atomic::{AtomicU8, Ordering};

use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Starting,
    Ready,
    Stopping,
}

impl LifecycleState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => LifecycleState::Ready,
            2 => LifecycleState::Stopping,
            _ => LifecycleState::Starting,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            LifecycleState::Starting => 0,
            LifecycleState::Ready => 1,
            LifecycleState::Stopping => 2,
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleState::Starting => write!(f, "Starting"),
            LifecycleState::Ready => write!(f, "Ready"),
            LifecycleState::Stopping => write!(f, "Stopping"),
        }
    }
}

#[derive(Debug)]
pub struct ProcessLifecycle {
    state: AtomicU8,
}

impl ProcessLifecycle {
    /// New lifecycle in the `Starting` state
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(LifecycleState::Starting.as_u8()),
        }
    }

    /// Lifecycle that is already `Ready`
    pub fn ready() -> Self {
        let lifecycle = Self::new();
        lifecycle.mark_ready();
        lifecycle
    }

    pub fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn is_ready(&self) -> bool {
        self.state() == LifecycleState::Ready
    }

    pub fn mark_ready(&self) {
        self.transition(LifecycleState::Ready);
    }

    pub fn mark_stopping(&self) {
        self.transition(LifecycleState::Stopping);
    }

    fn transition(&self, next: LifecycleState) {
        let previous = LifecycleState::from_u8(self.state.swap(next.as_u8(), Ordering::SeqCst));
        if previous != next {
            info!(from = %previous, to = %next, "Process lifecycle changed");
        }
    }
}

impl Default for ProcessLifecycle {
    fn default() -> Self {
        Self::new()
    }
}
