//! # spejare-core
//!
//! Foundation layer for the spejare capture service: the packet data model,
//! the bounded in-memory packet store, filtered queries, the capture
//! lifecycle state machine, and the live-stream broker.
//!
//! Everything here is transport-agnostic. The capture backend lives in
//! `spejare-capture` and the wiring in `spejare-engine`.

pub mod broker;
pub mod error;
pub mod filter;
pub mod record;
pub mod state;
pub mod store;

pub use broker::{StreamBroker, SubscriberId, Subscription};
pub use error::CaptureError;
pub use filter::QueryFilter;
pub use record::{CaptureStatus, PacketRecord, Protocol, StreamEvent};
pub use state::{CaptureState, StateMachine};
pub use store::{PacketStore, QueryResult};
