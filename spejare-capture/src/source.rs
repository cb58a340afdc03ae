//! Capture source abstraction.
//!
//! The engine drives any `CaptureSource` the same way, which keeps the
//! capture loop testable against scripted sources while production uses the
//! pcap-backed one from [`crate::live`].

use spejare_core::CaptureError;

/// Link-layer framing of a source, needed by the parser to find the network
/// header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkLayer {
    /// Ethernet II framing (DLT_EN10MB).
    Ethernet,
    /// Raw IP, no link header (DLT_RAW).
    RawIp,
}

/// One open capture handle, read by the dedicated capture loop.
pub trait CaptureSource: Send {
    fn link(&self) -> LinkLayer;

    /// Blocks for at most the source's poll timeout. `Ok(None)` means no
    /// frame arrived in the window; the loop uses that to re-check its stop
    /// flag, so implementations must not block indefinitely.
    fn next_frame(&mut self) -> Result<Option<Vec<u8>>, CaptureError>;
}

/// Opens capture handles. Failure maps to `PermissionDenied` or
/// `InterfaceUnavailable` and leaves the lifecycle untouched.
pub trait SourceProvider: Send + Sync {
    fn open(&self) -> Result<Box<dyn CaptureSource>, CaptureError>;
}
