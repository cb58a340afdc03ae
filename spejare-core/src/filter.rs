//! Pure predicate evaluation for historical queries.

use crate::record::{PacketRecord, Protocol};

/// Conjunction of optional predicates over a `PacketRecord`.
///
/// Every specified field must match (exact equality); an empty filter
/// matches any record. Protocol names are resolved case-insensitively by the
/// boundary via [`Protocol::from_name`] before they reach this type.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryFilter {
    pub protocol: Option<Protocol>,
    pub source_ip: Option<String>,
    pub destination_ip: Option<String>,
}

impl QueryFilter {
    pub fn is_empty(&self) -> bool {
        self.protocol.is_none() && self.source_ip.is_none() && self.destination_ip.is_none()
    }

    /// Side-effect-free AND over all specified predicates.
    pub fn matches(&self, record: &PacketRecord) -> bool {
        if let Some(protocol) = self.protocol {
            if record.protocol != protocol {
                return false;
            }
        }
        if let Some(source_ip) = &self.source_ip {
            if record.source_ip != *source_ip {
                return false;
            }
        }
        if let Some(destination_ip) = &self.destination_ip {
            if record.destination_ip != *destination_ip {
                return false;
            }
        }
        true
    }
}
