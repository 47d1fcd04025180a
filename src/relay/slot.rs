use std::{
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
    time::Instant,
};

use crate::core::state::{RelayPhase, RelayStatus};

#[derive(Debug, Clone, Copy)]
enum SlotState {
    Idle,
    Active { session: u64, since: Instant },
    Closing { session: u64, since: Instant },
}

/// Single-occupancy admission token for the camera relay.
#[derive(Debug)]
pub struct RelaySlot {
    state: Mutex<SlotState>,
    sessions: AtomicU64,
}

impl RelaySlot {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(SlotState::Idle),
            sessions: AtomicU64::new(0),
        })
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        // The guarded value is a plain enum; a panic elsewhere cannot leave it torn.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Idle -> Active as one critical section. `None` while any session
    /// holds the slot.
    pub fn try_acquire(self: &Arc<Self>) -> Option<SlotLease> {
        let mut state = self.lock();
        if !matches!(*state, SlotState::Idle) {
            return None;
        }

        let session = self.sessions.fetch_add(1, Ordering::Relaxed) + 1;
        *state = SlotState::Active {
            session,
            since: Instant::now(),
        };

        Some(SlotLease {
            slot: Arc::clone(self),
            session,
            released: false,
        })
    }

    fn begin_closing(&self, session: u64) {
        let mut state = self.lock();
        match *state {
            SlotState::Active {
                session: current,
                since,
            } if current == session => {
                *state = SlotState::Closing { session, since };
            }
            _ => {}
        }
    }

    /// Clears the slot if `session` still owns it. Returns whether anything
    /// changed, so a repeated or stale release is a no-op.
    pub fn release(&self, session: u64) -> bool {
        let mut state = self.lock();
        match *state {
            SlotState::Active {
                session: current, ..
            }
            | SlotState::Closing {
                session: current, ..
            } if current == session => {
                *state = SlotState::Idle;
                true
            }
            _ => false,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(*self.lock(), SlotState::Idle)
    }

    pub fn status(&self) -> RelayStatus {
        let state = *self.lock();
        let sessions_served = self.sessions.load(Ordering::Relaxed);
        let (phase, session, since) = match state {
            SlotState::Idle => (RelayPhase::Idle, None, None),
            SlotState::Active { session, since } => (RelayPhase::Active, Some(session), Some(since)),
            SlotState::Closing { session, since } => {
                (RelayPhase::Closing, Some(session), Some(since))
            }
        };

        RelayStatus {
            state: phase,
            session,
            active_for_secs: since.map(|since| since.elapsed().as_secs()),
            sessions_served,
        }
    }
}

/// Ownership of the slot for one session. Dropping the lease releases it.
#[derive(Debug)]
pub struct SlotLease {
    slot: Arc<RelaySlot>,
    session: u64,
    released: bool,
}

impl SlotLease {
    pub fn session(&self) -> u64 {
        self.session
    }

    pub fn begin_closing(&self) {
        if !self.released {
            self.slot.begin_closing(self.session);
        }
    }

    pub fn release(&mut self) -> bool {
        if self.released {
            return false;
        }
        self.released = true;
        self.slot.release(self.session)
    }
}

impl Drop for SlotLease {
    fn drop(&mut self) {
        self.release();
    }
}
