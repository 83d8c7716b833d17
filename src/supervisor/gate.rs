//! Post-connect backlog suppression.
//!
//! Some networks replay queued private messages right after registration.
//! The gate drops inbound messages until a grace window has elapsed since
//! connect, then lets everything through for the rest of the connection.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateState {
    Suppressing,
    Forwarding,
}

/// One-way `Suppressing -> Forwarding` gate.
#[derive(Debug, Clone)]
pub struct ForwardingGate {
    opened_at: Instant,
    window: Duration,
    state: GateState,
}

impl ForwardingGate {
    pub fn new(opened_at: Instant, window: Duration) -> Self {
        Self {
            opened_at,
            window,
            state: GateState::Suppressing,
        }
    }

    /// Whether a message observed at `now` should be delivered.
    ///
    /// The first call at or after `opened_at + window` flips the gate open
    /// for good.
    pub fn admit(&mut self, now: Instant) -> bool {
        if self.state == GateState::Forwarding {
            return true;
        }
        if now.saturating_duration_since(self.opened_at) >= self.window {
            self.state = GateState::Forwarding;
            return true;
        }
        false
    }

    pub fn is_forwarding(&self) -> bool {
        self.state == GateState::Forwarding
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}
