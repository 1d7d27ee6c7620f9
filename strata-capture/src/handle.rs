//! Capture handle abstraction and the pcap-backed implementation
//!
//! The send/receive engine only needs the small [`CaptureHandle`] contract,
//! which keeps it testable against scripted doubles. [`PcapHandle`] is the
//! live implementation over libpcap.

use pcap::{Active, Capture, Inactive};
use tracing::{debug, info};

use strata_core::{Error, Kind, Result};

/// Default snapshot length (maximum bytes per packet)
const DEFAULT_SNAPLEN: i32 = 65535;

/// Default read timeout for the capture loop (milliseconds)
const DEFAULT_TIMEOUT_MS: i32 = 100;

/// Configuration for packet capture
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Maximum bytes to capture per packet
    pub snaplen: i32,
    /// Read timeout in milliseconds
    pub timeout_ms: i32,
    /// Enable promiscuous mode
    pub promiscuous: bool,
    /// Deliver packets as soon as they arrive
    pub immediate_mode: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            snaplen: DEFAULT_SNAPLEN,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            promiscuous: true,
            immediate_mode: true,
        }
    }
}

/// The capture operations the engine depends on.
///
/// `capture` returns `Ok(None)` when the handle's internal read timeout
/// expires with no frame, so callers can keep polling against their own
/// deadline. Closing is the owner's concern (`Drop` for the live handle).
pub trait CaptureHandle {
    /// Bring the handle live; must be called before inject/capture
    fn activate(&mut self) -> Result<()>;

    /// The link-layer kind frames on this handle start with
    fn link_kind(&self) -> Kind;

    /// Install a BPF filter on incoming frames
    fn set_filter(&mut self, bpf: &str) -> Result<()>;

    /// Write one raw frame
    fn inject(&mut self, frame: &[u8]) -> Result<()>;

    /// Read one raw frame, or `None` on an internal timeout
    fn capture(&mut self) -> Result<Option<Vec<u8>>>;
}

enum HandleState {
    Closed,
    Inactive(Capture<Inactive>),
    Active(Capture<Active>),
}

/// Live capture handle over libpcap
pub struct PcapHandle {
    iface: String,
    config: CaptureConfig,
    state: HandleState,
}

impl PcapHandle {
    /// Open the named interface without activating it
    pub fn open(iface: &str) -> Result<Self> {
        Self::open_with_config(iface, CaptureConfig::default())
    }

    /// Open the named interface with a custom configuration
    pub fn open_with_config(iface: &str, config: CaptureConfig) -> Result<Self> {
        let inactive = Capture::from_device(iface)
            .map_err(|e| Error::capture(format!("failed to open '{}': {}", iface, e)))?;

        info!(iface, "opened capture handle");
        Ok(PcapHandle {
            iface: iface.to_string(),
            config,
            state: HandleState::Inactive(inactive),
        })
    }

    /// The interface this handle captures on
    pub fn interface(&self) -> &str {
        &self.iface
    }

    fn active(&mut self) -> Result<&mut Capture<Active>> {
        match &mut self.state {
            HandleState::Active(capture) => Ok(capture),
            _ => Err(Error::capture("capture handle is not active")),
        }
    }
}

impl CaptureHandle for PcapHandle {
    fn activate(&mut self) -> Result<()> {
        let inactive = match std::mem::replace(&mut self.state, HandleState::Closed) {
            HandleState::Inactive(inactive) => inactive,
            other => {
                self.state = other;
                return Err(Error::capture("capture handle already activated"));
            }
        };

        let active = inactive
            .promisc(self.config.promiscuous)
            .snaplen(self.config.snaplen)
            .timeout(self.config.timeout_ms)
            .immediate_mode(self.config.immediate_mode)
            .open()
            .map_err(|e| Error::capture(format!("failed to activate '{}': {}", self.iface, e)))?;

        info!(iface = %self.iface, "capture handle active");
        self.state = HandleState::Active(active);
        Ok(())
    }

    fn link_kind(&self) -> Kind {
        let linktype = match &self.state {
            HandleState::Active(capture) => capture.get_datalink().0,
            _ => return Kind::Eth,
        };
        match linktype {
            1 => Kind::Eth,       // DLT_EN10MB
            105 => Kind::Dot11,   // DLT_IEEE802_11
            127 => Kind::RadioTap, // DLT_IEEE802_11_RADIO
            _ => Kind::Raw,
        }
    }

    fn set_filter(&mut self, bpf: &str) -> Result<()> {
        debug!(bpf, "installing filter");
        self.active()?
            .filter(bpf, true)
            .map_err(|e| Error::capture(format!("invalid filter '{}': {}", bpf, e)))
    }

    fn inject(&mut self, frame: &[u8]) -> Result<()> {
        debug!(len = frame.len(), "injecting frame");
        self.active()?
            .sendpacket(frame)
            .map_err(|e| Error::capture(format!("inject failed: {}", e)))
    }

    fn capture(&mut self) -> Result<Option<Vec<u8>>> {
        match self.active()?.next_packet() {
            Ok(packet) => Ok(Some(packet.data.to_vec())),
            Err(pcap::Error::TimeoutExpired) => Ok(None),
            Err(e) => Err(Error::capture(format!("capture failed: {}", e))),
        }
    }
}
