//! Strata capture layer
//!
//! Wraps libpcap behind the small [`CaptureHandle`] contract the
//! send/receive engine drives, and adds BPF filter builders plus interface
//! enumeration.

pub mod filters;
pub mod handle;
pub mod interface;

// Re-export commonly used types
pub use handle::{CaptureConfig, CaptureHandle, PcapHandle};
pub use interface::{default_interface, get_interface, list_interfaces, InterfaceInfo};
