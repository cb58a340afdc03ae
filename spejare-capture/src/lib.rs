//! # spejare-capture
//!
//! Capture backend for spejare: the source abstraction the engine drives,
//! the pcap-backed live source, and the frame parser that turns raw frames
//! into `PacketRecord`s.

pub mod live;
pub mod parser;
pub mod source;

pub use live::{list_devices, PcapProvider};
pub use source::{CaptureSource, LinkLayer, SourceProvider};
