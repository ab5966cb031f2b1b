//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the `log` facade (serial console on the module, `env_logger` in the
//! simulator). A display or telemetry adapter would implement the same
//! trait.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::engine::one_button::OneButtonAction;

/// Adapter that logs every [`AppEvent`].
#[derive(Default)]
pub struct LogEventSink {
    heartbeats: u32,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn heartbeats(&self) -> u32 {
        self.heartbeats
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started { active_inputs, broadcast } => {
                info!("START | inputs_on={} | broadcast={}", active_inputs, broadcast);
            }
            AppEvent::InputChanged { input, on } => {
                info!("INPUT | {} {}", input, if *on { "ON" } else { "OFF" });
            }
            AppEvent::IgnitionChanged(on) => {
                info!("IGN   | {}", if *on { "ON" } else { "OFF" });
            }
            AppEvent::OneButton { input, action } => match action {
                OneButtonAction::SetManual { ignition, starter } => {
                    info!("1BTN  | {} ignition={} starter={}", input, ignition, starter);
                }
                OneButtonAction::ClearManual => info!("1BTN  | {} off", input),
            },
            AppEvent::ManualRuleFailed { input, error } => {
                warn!("1BTN  | {} rejected: {}", input, error);
            }
            AppEvent::SnapshotFull(error) => {
                warn!("TX    | {}", error);
            }
            AppEvent::Broadcast { reason, sent } => {
                log::debug!("TX    | {:?} sent={}", reason, sent);
            }
            AppEvent::Heartbeat(d) => {
                self.heartbeats = self.heartbeats.wrapping_add(1);
                info!(
                    "HB    | up={}ms | rules={} patterns={} | ign={} | tx={} local={} | faults={}",
                    d.uptime_ms,
                    d.active_rules,
                    d.armed_patterns,
                    if d.ignition { "ON" } else { "OFF" },
                    d.frames_sent,
                    d.local_updates,
                    d.fault_count(),
                );
            }
        }
    }
}
