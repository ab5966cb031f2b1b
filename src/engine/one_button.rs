//! One-button start.
//!
//! A momentary switch replaces the ignition and starter switches:
//!
//! ```text
//!  press (ignition off) ──▶ ignition on immediately
//!     held ≥ starter delay + neutral ──▶ starter on
//!  release (was off)    ──▶ ignition on, starter off
//!  release (was on)     ──▶ everything off
//! ```
//!
//! A quick press (< quick-press threshold) toggles ignition; a long press
//! finalises the same way, so the outcome depends only on the ignition
//! state latched when the press began. Timestamps wrap; elapsed time is
//! always computed with `wrapping_sub`.
//!
//! The pool only tracks latches and reports the rule edit to make; the
//! engine applies it to the active-rule tracker.

use heapless::Vec;
use log::{debug, warn};
use serde::Serialize;

use crate::error::CapacityError;
use crate::rules::InputId;

pub const MAX_ONE_BUTTON_INPUTS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OneButtonAction {
    /// Replace the input's rules with a manual rule carrying these bits.
    SetManual { ignition: bool, starter: bool },
    /// Drop the manual rule and send a clearing frame.
    ClearManual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OneButtonState {
    pub input: InputId,
    pub pressed: bool,
    pub press_start_ms: u32,
    pub ignition_at_press: bool,
    pub ignition_latched: bool,
    pub starter_latched: bool,
    pub ignition_set_this_press: bool,
}

impl OneButtonState {
    fn new(input: InputId) -> Self {
        Self {
            input,
            pressed: false,
            press_start_ms: 0,
            ignition_at_press: false,
            ignition_latched: false,
            starter_latched: false,
            ignition_set_this_press: false,
        }
    }

    fn held(&mut self, now_ms: u32, starter_delay_ms: u32, neutral: bool) -> Option<OneButtonAction> {
        if self.ignition_at_press {
            return None;
        }

        let mut action = None;
        if !self.ignition_set_this_press {
            self.ignition_set_this_press = true;
            self.ignition_latched = true;
            self.starter_latched = false;
            action = Some(OneButtonAction::SetManual { ignition: true, starter: false });
        }

        let elapsed = now_ms.wrapping_sub(self.press_start_ms);
        if elapsed >= starter_delay_ms && !self.starter_latched && neutral {
            self.starter_latched = true;
            self.ignition_latched = true;
            action = Some(OneButtonAction::SetManual { ignition: true, starter: true });
        }
        action
    }

    fn release(&mut self, now_ms: u32, quick_press_ms: u32) -> OneButtonAction {
        let elapsed = now_ms.wrapping_sub(self.press_start_ms);
        self.pressed = false;
        self.starter_latched = false;
        debug!(
            "{} released after {} ms ({})",
            self.input,
            elapsed,
            if elapsed < quick_press_ms { "quick" } else { "long" }
        );

        if self.ignition_at_press {
            self.ignition_latched = false;
            OneButtonAction::ClearManual
        } else {
            self.ignition_latched = true;
            OneButtonAction::SetManual { ignition: true, starter: false }
        }
    }
}

pub struct OneButtonPool {
    states: Vec<OneButtonState, MAX_ONE_BUTTON_INPUTS>,
    quick_press_ms: u32,
    starter_delay_ms: u32,
    overflows: u32,
}

impl OneButtonPool {
    pub fn new(quick_press_ms: u32, starter_delay_ms: u32) -> Self {
        Self {
            states: Vec::new(),
            quick_press_ms,
            starter_delay_ms,
            overflows: 0,
        }
    }

    /// Feed the current level of a one-button input.
    ///
    /// `neutral` is only consulted while the button is held. A press on an
    /// input the full pool cannot track is refused and counted.
    pub fn update(
        &mut self,
        input: InputId,
        pressed: bool,
        now_ms: u32,
        neutral: bool,
    ) -> Result<Option<OneButtonAction>, CapacityError> {
        let pos = match self.states.iter().position(|s| s.input == input) {
            Some(pos) => pos,
            None if !pressed => return Ok(None),
            None => {
                if self.states.push(OneButtonState::new(input)).is_err() {
                    self.overflows = self.overflows.saturating_add(1);
                    warn!("one-button pool full, ignoring {}", input);
                    return Err(CapacityError::OneButtonPool);
                }
                self.states.len() - 1
            }
        };

        let delay = self.starter_delay_ms;
        let quick = self.quick_press_ms;
        let state = &mut self.states[pos];
        Ok(match (pressed, state.pressed) {
            (true, false) => {
                state.pressed = true;
                state.press_start_ms = now_ms;
                state.ignition_at_press = state.ignition_latched;
                state.ignition_set_this_press = false;
                state.held(now_ms, delay, neutral)
            }
            (true, true) => state.held(now_ms, delay, neutral),
            (false, true) => Some(state.release(now_ms, quick)),
            (false, false) => None,
        })
    }

    /// Any one-button input currently latching ignition.
    pub fn any_ignition(&self) -> bool {
        self.states.iter().any(|s| s.ignition_latched)
    }

    pub fn state(&self, input: InputId) -> Option<&OneButtonState> {
        self.states.iter().find(|s| s.input == input)
    }

    pub fn iter(&self) -> core::slice::Iter<'_, OneButtonState> {
        self.states.iter()
    }

    pub fn overflows(&self) -> u32 {
        self.overflows
    }
}
