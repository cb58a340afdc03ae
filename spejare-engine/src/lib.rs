//! # spejare-engine
//!
//! Wires the capture source, state machine, packet store, and stream broker
//! into one service instance with explicit lifecycle control.

mod engine;

pub use engine::CaptureEngine;
