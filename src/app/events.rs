//! Outbound application events.
//!
//! The [`EngineService`](super::service::EngineService) emits these through
//! the [`EventSink`](super::ports::EventSink) port. Adapters on the other
//! side decide what to do with them: log to serial, refresh the display,
//! forward to the configuration tool.

use crate::diagnostics::DiagnosticsSnapshot;
use crate::engine::gate::BroadcastReason;
use crate::engine::one_button::OneButtonAction;
use crate::error::{CapacityError, Error};
use crate::rules::InputId;

/// Structured events emitted by the application core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// The service finished its startup broadcast.
    Started { active_inputs: u8, broadcast: usize },

    /// A debounced input changed level.
    InputChanged { input: InputId, on: bool },

    /// The combined ignition flag changed.
    IgnitionChanged(bool),

    /// A one-button input asked for a rule edit.
    OneButton {
        input: InputId,
        action: OneButtonAction,
    },

    /// A manual-rule edit was refused.
    ManualRuleFailed { input: InputId, error: Error },

    /// Messages were handed to the transport.
    Broadcast { reason: BroadcastReason, sent: usize },

    /// Sent destinations the last-sent snapshot could not remember. They
    /// will be resent on every state change.
    SnapshotFull(CapacityError),

    /// Periodic diagnostics snapshot.
    Heartbeat(DiagnosticsSnapshot),
}
