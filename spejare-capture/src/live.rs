//! Live packet source backed by the pcap crate.
//!
//! Opens the configured interface with a bounded read timeout so the capture
//! loop can observe its stop flag even when no traffic arrives.

use pcap::{Active, Capture, Device, Linktype};
use tracing::debug;

use spejare_core::CaptureError;

use crate::source::{CaptureSource, LinkLayer, SourceProvider};

/// Opens live pcap captures on one named interface.
#[derive(Clone, Debug)]
pub struct PcapProvider {
    interface: String,
    promiscuous: bool,
    snaplen: i32,
    poll_timeout_ms: i32,
}

impl PcapProvider {
    pub fn new(interface: &str, promiscuous: bool, snaplen: usize, poll_timeout_ms: u32) -> Self {
        // libpcap takes i32 for both; clamp rather than wrap on oversized
        // values so a huge snaplen cannot turn into a negative one.
        Self {
            interface: interface.to_string(),
            promiscuous,
            snaplen: i32::try_from(snaplen).unwrap_or(i32::MAX),
            poll_timeout_ms: i32::try_from(poll_timeout_ms).unwrap_or(i32::MAX),
        }
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }
}

impl SourceProvider for PcapProvider {
    fn open(&self) -> Result<Box<dyn CaptureSource>, CaptureError> {
        let device = Device::list()
            .map_err(|e| map_open_error(&self.interface, e))?
            .into_iter()
            .find(|d| d.name == self.interface)
            .ok_or_else(|| CaptureError::InterfaceUnavailable {
                interface: self.interface.clone(),
                reason: "no such device".into(),
            })?;

        let cap = Capture::from_device(device)
            .map_err(|e| map_open_error(&self.interface, e))?
            .promisc(self.promiscuous)
            .snaplen(self.snaplen)
            .timeout(self.poll_timeout_ms)
            .open()
            .map_err(|e| map_open_error(&self.interface, e))?;

        let link = match cap.get_datalink() {
            Linktype::RAW => LinkLayer::RawIp,
            other => {
                debug!(datalink = other.0, "treating datalink as ethernet");
                LinkLayer::Ethernet
            }
        };

        Ok(Box::new(PcapSource { cap, link }))
    }
}

struct PcapSource {
    cap: Capture<Active>,
    link: LinkLayer,
}

impl CaptureSource for PcapSource {
    fn link(&self) -> LinkLayer {
        self.link
    }

    fn next_frame(&mut self) -> Result<Option<Vec<u8>>, CaptureError> {
        match self.cap.next_packet() {
            Ok(packet) => Ok(Some(packet.data.to_vec())),
            // No frame in this timeout window; caller re-checks its stop flag.
            Err(pcap::Error::TimeoutExpired) => Ok(None),
            Err(e) => Err(CaptureError::Source(e.to_string())),
        }
    }
}

/// Names of the capture-capable interfaces on this host.
pub fn list_devices() -> Result<Vec<String>, CaptureError> {
    Ok(Device::list()
        .map_err(|e| CaptureError::Source(e.to_string()))?
        .into_iter()
        .map(|d| d.name)
        .collect())
}

/// pcap reports privilege problems as opaque strings, so classification is
/// by message; anything else opening-related means the interface is unusable.
fn map_open_error(interface: &str, e: pcap::Error) -> CaptureError {
    let reason = e.to_string();
    let lower = reason.to_lowercase();
    if lower.contains("permission denied") || lower.contains("operation not permitted") {
        CaptureError::PermissionDenied {
            interface: interface.to_string(),
        }
    } else {
        CaptureError::InterfaceUnavailable {
            interface: interface.to_string(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_limits_clamp_instead_of_wrapping() {
        let provider = PcapProvider::new("eth0", true, usize::MAX, u32::MAX);
        assert_eq!(provider.snaplen, i32::MAX);
        assert_eq!(provider.poll_timeout_ms, i32::MAX);
    }

    #[test]
    fn in_range_limits_pass_through() {
        let provider = PcapProvider::new("eth0", false, 65535, 500);
        assert_eq!(provider.snaplen, 65535);
        assert_eq!(provider.poll_timeout_ms, 500);
    }
}
