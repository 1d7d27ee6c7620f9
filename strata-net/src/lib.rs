//! Strata send/receive engine
//!
//! Drives a capture handle with crafted packet chains: [`send_recv`] emits
//! a probe and waits for the frame that answers it, [`next_hop_mac`]
//! resolves the link address probes should be framed to, and [`Route`]
//! carries what the engine needs to know about the outbound path.
//!
//! The engine is synchronous and single-threaded: it blocks on the capture
//! handle against a caller-supplied deadline and never closes the handle it
//! is given. Concurrent probes need separate handles.

pub mod resolve;
pub mod route;
pub mod sendrecv;

// Re-export commonly used items
pub use resolve::next_hop_mac;
pub use route::Route;
pub use sendrecv::send_recv;
