//! Debounced hook switch tracking
//!
//! The tracker is the only writer of [`SharedHook`]; everyone else reads
//! snapshots and re-reads rather than caching.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

/// Position of the handset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookState {
    Lifted,
    Replaced,
}

impl HookState {
    pub fn from_lifted(lifted: bool) -> Self {
        if lifted {
            Self::Lifted
        } else {
            Self::Replaced
        }
    }

    pub fn is_lifted(self) -> bool {
        self == Self::Lifted
    }
}

impl std::fmt::Display for HookState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HookState::Lifted => write!(f, "LIFTED"),
            HookState::Replaced => write!(f, "REPLACED"),
        }
    }
}

/// Process-wide handle on the authoritative hook state
#[derive(Debug, Clone, Default)]
pub struct SharedHook(Arc<AtomicBool>);

impl SharedHook {
    pub fn new(state: HookState) -> Self {
        Self(Arc::new(AtomicBool::new(state.is_lifted())))
    }

    pub fn get(&self) -> HookState {
        HookState::from_lifted(self.is_lifted())
    }

    pub fn is_lifted(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub(crate) fn set(&self, state: HookState) {
        self.0.store(state.is_lifted(), Ordering::Release);
    }
}

/// Turns raw hook samples into confirmed transitions
pub struct HookTracker {
    shared: SharedHook,
    confirmed: HookState,
    /// Raw level seen most recently and when it started
    pending: bool,
    pending_since: Instant,
    lifted_level: bool,
    stable_for: Duration,
    lockout: Duration,
    lifted_at: Option<Instant>,
}

impl HookTracker {
    /// Seed from the first raw sample; that level is taken as already stable
    pub fn new(
        shared: SharedHook,
        initial_raw: bool,
        now: Instant,
        lifted_level: bool,
        stable_for: Duration,
        lockout: Duration,
    ) -> Self {
        let confirmed = HookState::from_lifted(initial_raw == lifted_level);
        shared.set(confirmed);
        Self {
            shared,
            confirmed,
            pending: initial_raw,
            pending_since: now,
            lifted_level,
            stable_for,
            lockout,
            lifted_at: confirmed.is_lifted().then_some(now),
        }
    }

    pub fn state(&self) -> HookState {
        self.confirmed
    }

    /// True while dial activity must be ignored after a lift
    pub fn in_lockout(&self, now: Instant) -> bool {
        self.lifted_at
            .is_some_and(|at| now.saturating_duration_since(at) < self.lockout)
    }

    /// Feed one raw sample; returns the new state on a confirmed transition
    pub fn update(&mut self, now: Instant, raw: bool) -> Option<HookState> {
        if raw != self.pending {
            self.pending = raw;
            self.pending_since = now;
            return None;
        }

        let candidate = HookState::from_lifted(raw == self.lifted_level);
        if candidate == self.confirmed
            || now.saturating_duration_since(self.pending_since) < self.stable_for
        {
            return None;
        }

        debug!(from = %self.confirmed, to = %candidate, "hook transition confirmed");
        self.confirmed = candidate;
        self.lifted_at = candidate.is_lifted().then_some(now);
        self.shared.set(candidate);
        Some(candidate)
    }
}
