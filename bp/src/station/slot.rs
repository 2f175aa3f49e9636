//! Per-server batch state
//!
//! A [`BatchSlot`] is owned by exactly one server and describes the batch that
//! server is currently forming, running or emptying. Every field lives under
//! the slot's own lock. Waiters use the register-then-check discipline: the
//! `Notified` future is created and enabled before the predicate is read
//! under the lock, so a broadcast issued after the check is never lost.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use tracing::debug;

use crate::shutdown::RunState;

/// Where a slot is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Idle,
    Loading,
    Running,
    Unloading,
    Closed,
}

/// Why loading stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BoardingEnd {
    /// Every seat taken
    Full,
    /// The boarding window elapsed with seats still free
    TimedOut,
    /// The run stopped before the batch closed; the batch is abandoned
    Shutdown,
}

/// Result of closing the loading phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadingClosed {
    pub end: BoardingEnd,
    pub boarded: usize,
}

/// Outcome of a single boarding attempt on one slot
#[derive(Debug)]
pub enum TryBoard {
    Boarded(Boarding),
    /// Not loading, or loading with no free seat
    Unavailable,
    /// The run has stopped
    Stopped,
}

/// Outcome of waiting to get off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnboardOutcome {
    Unboarded,
    /// The batch never closed before shutdown and will not run
    Abandoned,
}

/// Copy of a slot's fields, for logging and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotView {
    pub phase: Phase,
    pub cycle: u64,
    pub boarded: usize,
    pub unboarded: usize,
}

impl SlotView {
    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Loading
    }

    pub fn is_unloading(&self) -> bool {
        self.phase == Phase::Unloading
    }
}

#[derive(Debug)]
struct SlotState {
    phase: Phase,
    cycle: u64,
    boarded: usize,
    unboarded: usize,
}

/// Rendezvous state for one server
#[derive(Debug)]
pub struct BatchSlot {
    server_id: usize,
    capacity: usize,
    state: Mutex<SlotState>,
    batch_full: Notify,
    unloading_started: Notify,
    run_state: RunState,
}

/// Proof of a seat in one particular cycle of one slot
#[derive(Debug)]
pub struct Boarding {
    slot: Arc<BatchSlot>,
    cycle: u64,
    seat: usize,
}

impl Boarding {
    pub fn server_id(&self) -> usize {
        self.slot.server_id
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// 1-based position in the batch
    pub fn seat(&self) -> usize {
        self.seat
    }

    /// Wait for this batch to unload, then get off
    pub async fn unboard(self) -> UnboardOutcome {
        self.slot.unboard(self.cycle).await
    }
}

impl BatchSlot {
    pub fn new(server_id: usize, capacity: usize, run_state: RunState) -> Self {
        debug!(server_id, capacity, "BatchSlot::new: called");
        Self {
            server_id,
            capacity,
            state: Mutex::new(SlotState {
                phase: Phase::Idle,
                cycle: 0,
                boarded: 0,
                unboarded: 0,
            }),
            batch_full: Notify::new(),
            unloading_started: Notify::new(),
            run_state,
        }
    }

    pub fn server_id(&self) -> usize {
        self.server_id
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub async fn view(&self) -> SlotView {
        let state = self.state.lock().await;
        SlotView {
            phase: state.phase,
            cycle: state.cycle,
            boarded: state.boarded,
            unboarded: state.unboarded,
        }
    }

    /// Reset the counters and open boarding for a new cycle.
    ///
    /// Returns the new cycle number, or `None` (and closes the slot) if the
    /// run has stopped. The caller broadcasts `loading_started`.
    pub(crate) async fn begin_loading(&self) -> Option<u64> {
        debug!(server_id = self.server_id, "BatchSlot::begin_loading: called");
        let mut state = self.state.lock().await;
        if !self.run_state.is_running() {
            debug!(server_id = self.server_id, "BatchSlot::begin_loading: stopped, closing slot");
            state.phase = Phase::Closed;
            return None;
        }
        state.cycle += 1;
        state.boarded = 0;
        state.unboarded = 0;
        state.phase = Phase::Loading;
        Some(state.cycle)
    }

    /// Wait until the batch is full, the deadline passes, or the run stops.
    ///
    /// Loading is closed in the same critical section that decides the
    /// outcome, so no requester can board after the decision:
    /// - full, or timed out with riders: the batch is committed (`Running`)
    /// - timed out empty: back to `Idle`
    /// - stopped: `Closed`, and boarded riders are told to leave
    pub(crate) async fn await_boarding(&self, deadline: Instant) -> LoadingClosed {
        debug!(server_id = self.server_id, "BatchSlot::await_boarding: called");
        loop {
            let notified = self.batch_full.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let mut state = self.state.lock().await;
            if !self.run_state.is_running() {
                debug!(server_id = self.server_id, "BatchSlot::await_boarding: stopped while loading");
                state.phase = Phase::Closed;
                self.unloading_started.notify_waiters();
                return LoadingClosed {
                    end: BoardingEnd::Shutdown,
                    boarded: state.boarded,
                };
            }
            if state.boarded >= self.capacity {
                debug!(server_id = self.server_id, "BatchSlot::await_boarding: full");
                state.phase = Phase::Running;
                return LoadingClosed {
                    end: BoardingEnd::Full,
                    boarded: state.boarded,
                };
            }
            if Instant::now() >= deadline {
                debug!(server_id = self.server_id, boarded = state.boarded, "BatchSlot::await_boarding: deadline passed");
                state.phase = if state.boarded == 0 { Phase::Idle } else { Phase::Running };
                return LoadingClosed {
                    end: BoardingEnd::TimedOut,
                    boarded: state.boarded,
                };
            }
            drop(state);

            // Both a wake-up and an expired deadline fall through to the re-check
            let _ = tokio::time::timeout_at(deadline, notified).await;
        }
    }

    /// Take a seat if this slot is loading and not yet full
    pub(crate) async fn try_board(self: &Arc<Self>) -> TryBoard {
        let mut state = self.state.lock().await;
        if !self.run_state.is_running() {
            return TryBoard::Stopped;
        }
        if state.phase != Phase::Loading || state.boarded >= self.capacity {
            return TryBoard::Unavailable;
        }

        state.boarded += 1;
        let seat = state.boarded;
        debug!(server_id = self.server_id, seat, capacity = self.capacity, "BatchSlot::try_board: boarded");
        if state.boarded == self.capacity {
            self.batch_full.notify_waiters();
        }
        TryBoard::Boarded(Boarding {
            slot: self.clone(),
            cycle: state.cycle,
            seat,
        })
    }

    /// Open the unloading barrier for a committed batch
    pub(crate) async fn begin_unloading(&self) {
        debug!(server_id = self.server_id, "BatchSlot::begin_unloading: called");
        let mut state = self.state.lock().await;
        state.phase = Phase::Unloading;
        self.unloading_started.notify_waiters();
    }

    /// Wait until every rider of the committed batch has got off.
    ///
    /// Riders of a committed batch never abandon it, so this does not give up
    /// on shutdown. Returns the number of riders released.
    pub(crate) async fn await_unboarded(&self) -> usize {
        debug!(server_id = self.server_id, "BatchSlot::await_unboarded: called");
        loop {
            let notified = self.unloading_started.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let mut state = self.state.lock().await;
            if state.unboarded >= state.boarded {
                state.phase = Phase::Idle;
                return state.unboarded;
            }
            drop(state);

            notified.await;
        }
    }

    async fn unboard(&self, cycle: u64) -> UnboardOutcome {
        debug!(server_id = self.server_id, cycle, "BatchSlot::unboard: called");
        loop {
            let notified = self.unloading_started.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let mut state = self.state.lock().await;
            if state.cycle != cycle || state.phase == Phase::Closed {
                return UnboardOutcome::Abandoned;
            }
            match state.phase {
                Phase::Unloading => {
                    state.unboarded += 1;
                    if state.unboarded == state.boarded {
                        self.unloading_started.notify_waiters();
                    }
                    return UnboardOutcome::Unboarded;
                }
                // Boarding never closed and never will
                Phase::Loading if !self.run_state.is_running() => return UnboardOutcome::Abandoned,
                _ => {}
            }
            drop(state);

            notified.await;
        }
    }

    /// Wake every waiter on this slot so it re-checks the running flag
    pub(crate) async fn wake_all(&self) {
        let _state = self.state.lock().await;
        self.batch_full.notify_waiters();
        self.unloading_started.notify_waiters();
    }
}
