//! Neutral-safety switch on a GPIO.
//!
//! Wraps any `embedded-hal` 1.0 [`InputPin`]. A pin read error reports
//! "not in neutral" so the starter stays off.

use embedded_hal::digital::InputPin;
use log::warn;

use crate::app::ports::NeutralSafetyPort;

pub struct PinNeutralSafety<P> {
    pin: P,
    active_low: bool,
    read_errors: u32,
}

impl<P: InputPin> PinNeutralSafety<P> {
    /// `active_low`: the switch pulls the pin to ground in park/neutral.
    pub fn new(pin: P, active_low: bool) -> Self {
        Self {
            pin,
            active_low,
            read_errors: 0,
        }
    }

    pub fn read_errors(&self) -> u32 {
        self.read_errors
    }
}

impl<P: InputPin> NeutralSafetyPort for PinNeutralSafety<P> {
    fn neutral_engaged(&mut self) -> bool {
        match self.pin.is_high() {
            Ok(high) => high != self.active_low,
            Err(_) => {
                self.read_errors = self.read_errors.saturating_add(1);
                warn!("neutral-safety pin read failed");
                false
            }
        }
    }
}
