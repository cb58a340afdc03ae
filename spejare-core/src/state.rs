//! Capture lifecycle state machine.
//!
//! All four status fields live behind one mutex, so transitions are
//! linearizable and snapshots never observe a half-updated status.

use std::fmt;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::error::CaptureError;
use crate::record::CaptureStatus;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Capturing,
    Paused,
    Stopped,
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CaptureState::Idle => "idle",
            CaptureState::Capturing => "capturing",
            CaptureState::Paused => "paused",
            CaptureState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

struct StatusInner {
    state: CaptureState,
    packets_captured: u64,
    capture_start_time: Option<DateTime<Utc>>,
}

/// Validates and tracks the capture lifecycle.
pub struct StateMachine {
    inner: Mutex<StatusInner>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StatusInner {
                state: CaptureState::Idle,
                packets_captured: 0,
                capture_start_time: None,
            }),
        }
    }

    pub fn state(&self) -> CaptureState {
        self.inner.lock().state
    }

    /// Consistent view of all status fields.
    pub fn snapshot(&self) -> CaptureStatus {
        let inner = self.inner.lock();
        Self::snapshot_locked(&inner)
    }

    fn snapshot_locked(inner: &StatusInner) -> CaptureStatus {
        CaptureStatus {
            is_capturing: inner.state == CaptureState::Capturing,
            packets_captured: inner.packets_captured,
            capture_start_time: inner.capture_start_time,
        }
    }

    /// Idle|Stopped -> Capturing, resetting the counter and stamping the
    /// start time. A no-op when already Capturing. Starting from Paused is
    /// rejected; that session must be resumed or stopped instead.
    pub fn start(&self) -> Result<CaptureStatus, CaptureError> {
        let mut inner = self.inner.lock();
        match inner.state {
            CaptureState::Idle | CaptureState::Stopped => {
                inner.state = CaptureState::Capturing;
                inner.packets_captured = 0;
                inner.capture_start_time = Some(Utc::now());
                Ok(Self::snapshot_locked(&inner))
            }
            CaptureState::Capturing => Ok(Self::snapshot_locked(&inner)),
            CaptureState::Paused => Err(CaptureError::InvalidTransition {
                action: "start",
                state: inner.state,
            }),
        }
    }

    /// Capturing -> Paused.
    pub fn pause(&self) -> Result<CaptureStatus, CaptureError> {
        let mut inner = self.inner.lock();
        if inner.state != CaptureState::Capturing {
            return Err(CaptureError::InvalidTransition {
                action: "pause",
                state: inner.state,
            });
        }
        inner.state = CaptureState::Paused;
        Ok(Self::snapshot_locked(&inner))
    }

    /// Paused -> Capturing.
    pub fn resume(&self) -> Result<CaptureStatus, CaptureError> {
        let mut inner = self.inner.lock();
        if inner.state != CaptureState::Paused {
            return Err(CaptureError::InvalidTransition {
                action: "resume",
                state: inner.state,
            });
        }
        inner.state = CaptureState::Capturing;
        Ok(Self::snapshot_locked(&inner))
    }

    /// Capturing|Paused -> Stopped, clearing the start time but keeping the
    /// final packet count. A no-op from Idle/Stopped.
    pub fn stop(&self) -> CaptureStatus {
        let mut inner = self.inner.lock();
        if matches!(inner.state, CaptureState::Capturing | CaptureState::Paused) {
            inner.state = CaptureState::Stopped;
            inner.capture_start_time = None;
        }
        Self::snapshot_locked(&inner)
    }

    /// Counts one accepted frame. Only effective while Capturing; Paused
    /// suppresses counting along with storage and publishing.
    pub fn record_accepted(&self) {
        let mut inner = self.inner.lock();
        if inner.state == CaptureState::Capturing {
            inner.packets_captured += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle() {
        let sm = StateMachine::new();
        assert_eq!(sm.state(), CaptureState::Idle);
        let status = sm.snapshot();
        assert!(!status.is_capturing);
        assert_eq!(status.packets_captured, 0);
        assert!(status.capture_start_time.is_none());
    }

    #[test]
    fn start_resets_counter_and_stamps_time() {
        let sm = StateMachine::new();
        let status = sm.start().unwrap();
        assert!(status.is_capturing);
        assert_eq!(status.packets_captured, 0);
        assert!(status.capture_start_time.is_some());
    }

    #[test]
    fn start_while_capturing_is_a_noop() {
        let sm = StateMachine::new();
        sm.start().unwrap();
        sm.record_accepted();
        sm.record_accepted();
        let status = sm.start().unwrap();
        assert!(status.is_capturing);
        assert_eq!(status.packets_captured, 2, "no-op start must not reset");
    }

    #[test]
    fn restart_after_stop_resets_counter() {
        let sm = StateMachine::new();
        sm.start().unwrap();
        sm.record_accepted();
        sm.stop();
        let status = sm.start().unwrap();
        assert_eq!(status.packets_captured, 0);
    }

    #[test]
    fn pause_resume_round_trip() {
        let sm = StateMachine::new();
        sm.start().unwrap();
        let paused = sm.pause().unwrap();
        assert!(!paused.is_capturing);
        assert_eq!(sm.state(), CaptureState::Paused);
        let resumed = sm.resume().unwrap();
        assert!(resumed.is_capturing);
        assert_eq!(sm.state(), CaptureState::Capturing);
    }

    #[test]
    fn pause_while_idle_is_invalid() {
        let sm = StateMachine::new();
        let err = sm.pause().unwrap_err();
        assert!(matches!(
            err,
            CaptureError::InvalidTransition {
                action: "pause",
                state: CaptureState::Idle
            }
        ));
        assert_eq!(sm.state(), CaptureState::Idle);
    }

    #[test]
    fn resume_while_capturing_is_invalid() {
        let sm = StateMachine::new();
        sm.start().unwrap();
        let err = sm.resume().unwrap_err();
        assert!(matches!(
            err,
            CaptureError::InvalidTransition {
                action: "resume",
                state: CaptureState::Capturing
            }
        ));
        assert_eq!(sm.state(), CaptureState::Capturing);
    }

    #[test]
    fn start_while_paused_is_invalid() {
        let sm = StateMachine::new();
        sm.start().unwrap();
        sm.pause().unwrap();
        assert!(sm.start().is_err());
        assert_eq!(sm.state(), CaptureState::Paused);
    }

    #[test]
    fn stop_keeps_final_count_and_clears_start_time() {
        let sm = StateMachine::new();
        sm.start().unwrap();
        sm.record_accepted();
        sm.record_accepted();
        sm.record_accepted();
        let status = sm.stop();
        assert!(!status.is_capturing);
        assert_eq!(status.packets_captured, 3);
        assert!(status.capture_start_time.is_none());
    }

    #[test]
    fn stop_from_idle_is_a_noop() {
        let sm = StateMachine::new();
        sm.stop();
        assert_eq!(sm.state(), CaptureState::Idle);
    }

    #[test]
    fn paused_suppresses_counting() {
        let sm = StateMachine::new();
        sm.start().unwrap();
        sm.pause().unwrap();
        sm.record_accepted();
        assert_eq!(sm.snapshot().packets_captured, 0);
    }
}
