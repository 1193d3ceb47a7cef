use std::fmt;

use serde::Serialize;

/// Connection state of a pool, as seen by the [`PoolManager`](super::PoolManager).
///
/// `Uninitialized → Connecting → Connected`; `Connected → Disconnected` on a
/// detected failure; `Disconnected → Connecting` on the next acquire (the old
/// handle is closed first); any state `→ Closed` on shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolState {
    Uninitialized,
    Connecting,
    Connected,
    Disconnected,
    Closed,
}

impl PoolState {
    /// Whether the state machine allows moving from `self` to `next`.
    #[must_use]
    pub fn can_transition_to(self, next: PoolState) -> bool {
        use PoolState::{Closed, Connected, Connecting, Disconnected, Uninitialized};
        matches!(
            (self, next),
            (Uninitialized, Connecting)
                | (Connecting, Connected)
                | (Connecting, Uninitialized)
                | (Connected, Disconnected)
                | (Disconnected, Connecting)
                | (Uninitialized | Connecting | Connected | Disconnected, Closed)
        )
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PoolState::Uninitialized => "uninitialized",
            PoolState::Connecting => "connecting",
            PoolState::Connected => "connected",
            PoolState::Disconnected => "disconnected",
            PoolState::Closed => "closed",
        }
    }
}

impl fmt::Display for PoolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::PoolState::*;

    #[test]
    fn closed_is_terminal() {
        for next in [Uninitialized, Connecting, Connected, Disconnected, Closed] {
            assert!(!Closed.can_transition_to(next), "Closed -> {next}");
        }
    }

    #[test]
    fn reconnect_goes_through_connecting() {
        assert!(Connected.can_transition_to(Disconnected));
        assert!(Disconnected.can_transition_to(Connecting));
        assert!(!Disconnected.can_transition_to(Connected));
        assert!(!Uninitialized.can_transition_to(Connected));
    }
}
