//! Deferred signals from the tick context to the main loop.
//!
//! Signals are produced by:
//! - the 1 ms timer (pattern tick every 250 ms, heartbeat every 1000 ms)
//! - the input scanner and auxiliary bus (state change)
//!
//! and consumed by the main loop, which checks and clears each one in a
//! single critical section so a signal raised between the check and the
//! clear is never lost.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Timer tick  │────▶│              │     │              │
//! │ Scanner     │────▶│ SignalFlags  │────▶│  Main Loop   │
//! │ Aux bus     │────▶│  (sticky)    │     │  (consumer)  │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```

use core::cell::Cell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

/// Signal kinds, in the order the main loop services them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Signal {
    /// Pattern timers advanced; refresh flashing destinations.
    PatternTick = 0x01,
    /// An input, the ignition flag or an auxiliary message changed.
    StateChange = 0x02,
    /// Heartbeat period elapsed.
    Heartbeat = 0x04,
}

impl Signal {
    const fn bit(self) -> u8 {
        self as u8
    }
}

/// Sticky signal set. Raising an already pending signal is a no-op.
pub struct SignalFlags {
    pending: Mutex<CriticalSectionRawMutex, Cell<u8>>,
}

impl SignalFlags {
    pub const fn new() -> Self {
        Self {
            pending: Mutex::new(Cell::new(0)),
        }
    }

    /// Safe to call from interrupt context.
    pub fn raise(&self, signal: Signal) {
        self.pending.lock(|p| p.set(p.get() | signal.bit()));
    }

    /// Check-then-clear: returns `true` exactly once per raise.
    pub fn take(&self, signal: Signal) -> bool {
        self.pending.lock(|p| {
            let bits = p.get();
            p.set(bits & !signal.bit());
            bits & signal.bit() != 0
        })
    }

    pub fn is_pending(&self, signal: Signal) -> bool {
        self.pending.lock(|p| p.get() & signal.bit() != 0)
    }

}

impl Default for SignalFlags {
    fn default() -> Self {
        Self::new()
    }
}

/// Signals shared between the timer interrupt and the main loop.
pub static SIGNALS: SignalFlags = SignalFlags::new();

// ── Tick source ───────────────────────────────────────────────
//
// Runs in the timer context. Converts elapsed milliseconds into pattern
// and heartbeat signals and keeps the uptime counter the one-button
// machine measures presses against.

pub struct TickSource {
    pattern_ms: u32,
    heartbeat_ms: u32,
    pattern_acc: u32,
    heartbeat_acc: u32,
    uptime_ms: u32,
}

impl TickSource {
    pub fn new(pattern_ms: u32, heartbeat_ms: u32) -> Self {
        Self {
            pattern_ms: pattern_ms.max(1),
            heartbeat_ms: heartbeat_ms.max(1),
            pattern_acc: 0,
            heartbeat_acc: 0,
            uptime_ms: 0,
        }
    }

    /// Account for `elapsed_ms` and raise any signals that came due.
    pub fn advance(&mut self, elapsed_ms: u32, flags: &SignalFlags) {
        self.uptime_ms = self.uptime_ms.wrapping_add(elapsed_ms);

        self.pattern_acc = self.pattern_acc.saturating_add(elapsed_ms);
        if self.pattern_acc >= self.pattern_ms {
            self.pattern_acc %= self.pattern_ms;
            flags.raise(Signal::PatternTick);
        }

        self.heartbeat_acc = self.heartbeat_acc.saturating_add(elapsed_ms);
        if self.heartbeat_acc >= self.heartbeat_ms {
            self.heartbeat_acc %= self.heartbeat_ms;
            flags.raise(Signal::Heartbeat);
        }
    }

    /// Milliseconds since start; wraps after ~49 days.
    pub fn uptime_ms(&self) -> u32 {
        self.uptime_ms
    }
}
