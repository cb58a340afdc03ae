//! Frame parser: raw link-layer frames to `PacketRecord`.
//!
//! Fixed-offset parsing with early returns; anything malformed or non-IP
//! yields `None` and is counted by the caller as a parse drop, never an
//! error. IPv6 extension headers are not walked; unrecognized transports
//! map to the bare `IP` protocol like the original service did.

use std::net::{Ipv4Addr, Ipv6Addr};

use chrono::{DateTime, Utc};

use spejare_core::{PacketRecord, Protocol};

use crate::source::LinkLayer;

const ETHERTYPE_IPV4: u16 = 0x0800;
const ETHERTYPE_IPV6: u16 = 0x86DD;
const ETHERTYPE_VLAN: u16 = 0x8100;

const IPPROTO_ICMP: u8 = 1;
const IPPROTO_TCP: u8 = 6;
const IPPROTO_UDP: u8 = 17;
const IPPROTO_ICMPV6: u8 = 58;

/// Parses one captured frame. `None` means the frame is malformed or not IP.
pub fn parse_frame(link: LinkLayer, data: &[u8], timestamp: DateTime<Utc>) -> Option<PacketRecord> {
    let wire_len = data.len() as u32;
    let network = match link {
        LinkLayer::Ethernet => strip_ethernet(data)?,
        LinkLayer::RawIp => data,
    };
    let first = *network.first()?;
    match first >> 4 {
        4 => parse_ipv4(network, wire_len, timestamp),
        6 => parse_ipv6(network, wire_len, timestamp),
        _ => None,
    }
}

/// Returns the network-layer payload of an Ethernet II frame, handling one
/// optional 802.1Q tag.
fn strip_ethernet(data: &[u8]) -> Option<&[u8]> {
    if data.len() < 14 {
        return None;
    }
    let mut ethertype = u16::from_be_bytes([data[12], data[13]]);
    let mut offset = 14;
    if ethertype == ETHERTYPE_VLAN {
        if data.len() < 18 {
            return None;
        }
        ethertype = u16::from_be_bytes([data[16], data[17]]);
        offset = 18;
    }
    match ethertype {
        ETHERTYPE_IPV4 | ETHERTYPE_IPV6 => Some(&data[offset..]),
        _ => None,
    }
}

fn parse_ipv4(data: &[u8], wire_len: u32, timestamp: DateTime<Utc>) -> Option<PacketRecord> {
    if data.len() < 20 || data[0] >> 4 != 4 {
        return None;
    }
    let ihl = usize::from(data[0] & 0x0F) * 4;
    if ihl < 20 || data.len() < ihl {
        return None;
    }

    let ttl = data[8];
    let ip_proto = data[9];
    let source_ip = Ipv4Addr::new(data[12], data[13], data[14], data[15]).to_string();
    let destination_ip = Ipv4Addr::new(data[16], data[17], data[18], data[19]).to_string();

    let (protocol, source_port, destination_port, flags) =
        parse_transport(ip_proto, &data[ihl..])?;

    Some(PacketRecord {
        timestamp,
        protocol,
        source_ip,
        destination_ip,
        source_port,
        destination_port,
        packet_size: wire_len,
        ttl: Some(ttl),
        flags,
    })
}

fn parse_ipv6(data: &[u8], wire_len: u32, timestamp: DateTime<Utc>) -> Option<PacketRecord> {
    if data.len() < 40 || data[0] >> 4 != 6 {
        return None;
    }
    let next_header = data[6];
    let hop_limit = data[7];
    let source_ip = ipv6_addr(&data[8..24]).to_string();
    let destination_ip = ipv6_addr(&data[24..40]).to_string();

    let (protocol, source_port, destination_port, flags) =
        parse_transport(next_header, &data[40..])?;

    Some(PacketRecord {
        timestamp,
        protocol,
        source_ip,
        destination_ip,
        source_port,
        destination_port,
        packet_size: wire_len,
        ttl: Some(hop_limit),
        flags,
    })
}

type Transport = (Protocol, Option<u16>, Option<u16>, Option<String>);

fn parse_transport(ip_proto: u8, data: &[u8]) -> Option<Transport> {
    match ip_proto {
        IPPROTO_TCP => {
            if data.len() < 14 {
                return None;
            }
            let sport = u16::from_be_bytes([data[0], data[1]]);
            let dport = u16::from_be_bytes([data[2], data[3]]);
            Some((Protocol::Tcp, Some(sport), Some(dport), tcp_flags(data[13])))
        }
        IPPROTO_UDP => {
            if data.len() < 8 {
                return None;
            }
            let sport = u16::from_be_bytes([data[0], data[1]]);
            let dport = u16::from_be_bytes([data[2], data[3]]);
            Some((Protocol::Udp, Some(sport), Some(dport), None))
        }
        IPPROTO_ICMP | IPPROTO_ICMPV6 => Some((Protocol::Icmp, None, None, None)),
        _ => Some((Protocol::Ip, None, None, None)),
    }
}

/// TCP control bits as a short summary, e.g. "SYN, ACK".
fn tcp_flags(bits: u8) -> Option<String> {
    const NAMES: [(u8, &str); 6] = [
        (0x01, "FIN"),
        (0x02, "SYN"),
        (0x04, "RST"),
        (0x08, "PSH"),
        (0x10, "ACK"),
        (0x20, "URG"),
    ];
    let set: Vec<&str> = NAMES
        .iter()
        .filter(|(bit, _)| bits & bit != 0)
        .map(|(_, name)| *name)
        .collect();
    if set.is_empty() {
        None
    } else {
        Some(set.join(", "))
    }
}

fn ipv6_addr(bytes: &[u8]) -> Ipv6Addr {
    let mut octets = [0u8; 16];
    octets.copy_from_slice(bytes);
    Ipv6Addr::from(octets)
}
