//! Packet data model and stream event types.
//!
//! A `PacketRecord` is built once by the frame parser and never mutated
//! afterwards, so it can be shared between the store and every subscriber
//! queue as an `Arc` without further synchronization.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Network protocol of a captured packet.
///
/// `Ip` covers IP traffic whose transport protocol is not one of the
/// recognized ones; `Other` is the catch-all for anything else.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    Tcp,
    Udp,
    Icmp,
    Ip,
    Other,
}

impl Protocol {
    /// Case-insensitive lookup, used when parsing filter input.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "TCP" => Some(Protocol::Tcp),
            "UDP" => Some(Protocol::Udp),
            "ICMP" => Some(Protocol::Icmp),
            "IP" => Some(Protocol::Ip),
            "OTHER" => Some(Protocol::Other),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
            Protocol::Icmp => "ICMP",
            Protocol::Ip => "IP",
            Protocol::Other => "OTHER",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed, captured packet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PacketRecord {
    /// Capture-time instant (host clock, UTC).
    pub timestamp: DateTime<Utc>,

    pub protocol: Protocol,

    /// Textual address, IPv4 or IPv6.
    pub source_ip: String,
    pub destination_ip: String,

    /// Absent for protocols without ports (ICMP, bare IP).
    pub source_port: Option<u16>,
    pub destination_port: Option<u16>,

    /// Wire length in bytes as seen by the capture source.
    pub packet_size: u32,

    /// TTL (IPv4) or hop limit (IPv6).
    pub ttl: Option<u8>,

    /// Short protocol-specific summary, e.g. TCP control bits ("SYN, ACK").
    pub flags: Option<String>,
}

/// Snapshot of the capture lifecycle, exposed at every boundary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CaptureStatus {
    pub is_capturing: bool,
    /// Accepted frames since the last fresh start.
    pub packets_captured: u64,
    /// Set while a capture session is live, absent otherwise.
    pub capture_start_time: Option<DateTime<Utc>>,
}

/// Tagged event delivered to live stream subscribers.
///
/// Serializes as `{"type": "status"|"packet", "data": ...}` so consumers can
/// branch on the discriminator.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum StreamEvent {
    Status(CaptureStatus),
    Packet(Arc<PacketRecord>),
}
