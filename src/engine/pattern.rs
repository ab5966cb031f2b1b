//! Per-input flashing-pattern timers.
//!
//! Each input owns one timer shared by all of its rules. The timer is
//! armed from the input's first ON rule and advanced by the pattern tick
//! (250 ms by default). While armed, every rule of that input follows the
//! timer's phase, so multiple destinations driven by one input flash in
//! lock step.
//!
//! Phase run lengths equal the configured durations: a countdown that has
//! reached zero flips the phase and reloads in the same tick it is
//! decremented.

use serde::Serialize;

use crate::rules::{InputId, TOTAL_INPUTS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Phase {
    #[default]
    Inactive,
    On,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PatternTimer {
    pub phase: Phase,
    pub countdown: u8,
    pub on_ticks: u8,
    pub off_ticks: u8,
}

impl PatternTimer {
    pub const fn is_armed(&self) -> bool {
        !matches!(self.phase, Phase::Inactive)
    }

    fn advance(&mut self) {
        if self.countdown == 0 {
            (self.phase, self.countdown) = match self.phase {
                Phase::On => (Phase::Off, self.off_ticks),
                Phase::Off => (Phase::On, self.on_ticks),
                Phase::Inactive => return,
            };
        }
        self.countdown = self.countdown.saturating_sub(1);
    }
}

pub struct PatternScheduler {
    timers: [PatternTimer; TOTAL_INPUTS],
}

impl PatternScheduler {
    pub fn new() -> Self {
        Self {
            timers: [PatternTimer::default(); TOTAL_INPUTS],
        }
    }

    /// Start flashing `input`, beginning with a full ON phase.
    pub fn arm(&mut self, input: InputId, on_ticks: u8, off_ticks: u8) {
        self.timers[input.index()] = PatternTimer {
            phase: Phase::On,
            countdown: on_ticks,
            on_ticks,
            off_ticks,
        };
    }

    pub fn disarm(&mut self, input: InputId) {
        self.timers[input.index()] = PatternTimer::default();
    }

    /// Advance every armed timer by one pattern tick.
    pub fn tick(&mut self) {
        for timer in self.timers.iter_mut().filter(|t| t.is_armed()) {
            timer.advance();
        }
    }

    /// Rules of an unarmed input always transmit.
    pub fn is_on_phase(&self, input: InputId) -> bool {
        self.timers[input.index()].phase != Phase::Off
    }

    pub fn is_armed(&self, input: InputId) -> bool {
        self.timers[input.index()].is_armed()
    }

    pub fn timer(&self, input: InputId) -> PatternTimer {
        self.timers[input.index()]
    }

    pub fn armed_count(&self) -> usize {
        self.timers.iter().filter(|t| t.is_armed()).count()
    }
}

impl Default for PatternScheduler {
    fn default() -> Self {
        Self::new()
    }
}
