//! Error taxonomy for capture lifecycle and source failures.
//!
//! Only lifecycle and query-input errors are user-visible. Capture-loop
//! internals (malformed frames, slow subscribers) are absorbed and tracked
//! through counters instead.

use thiserror::Error;

use crate::state::CaptureState;

#[derive(Debug, Error)]
pub enum CaptureError {
    /// Raw capture needs elevated privileges; the start call failed and the
    /// lifecycle state is unchanged.
    #[error("permission denied opening capture on '{interface}': raw capture requires elevated privileges")]
    PermissionDenied { interface: String },

    /// The named interface is missing or cannot be opened.
    #[error("capture interface '{interface}' unavailable: {reason}")]
    InterfaceUnavailable { interface: String, reason: String },

    /// Lifecycle command illegal in the current state.
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: CaptureState,
    },

    /// Capture backend failure after a session was established.
    #[error("capture source error: {0}")]
    Source(String),
}
