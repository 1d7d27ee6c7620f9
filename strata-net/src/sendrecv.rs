//! Send/receive engine
//!
//! Packs a probe chain, installs a best-effort reply filter, injects the
//! frame once, and drains the capture handle until a frame answers the
//! probe or the deadline passes. A frame that fails to decode is skipped;
//! hard capture errors abort.

use std::net::IpAddr;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use strata_capture::{filters, CaptureHandle};
use strata_core::{Error, Kind, Packet, Result};
use strata_packet::ipv4::Ipv4Packet;
use strata_packet::ipv6::Ipv6Packet;
use strata_packet::layers;

/// Layers whose `answers` relation terminates the receive loop
const INTERESTING: [Kind; 6] = [
    Kind::Arp,
    Kind::Tcp,
    Kind::Udp,
    Kind::Sctp,
    Kind::Icmpv4,
    Kind::Icmpv6,
];

fn innermost_interesting(head: &dyn Packet) -> Option<&dyn Packet> {
    let mut found = None;
    let mut current = Some(head);
    while let Some(layer) = current {
        if INTERESTING.contains(&layer.kind()) {
            found = Some(layer);
        }
        current = layer.payload();
    }
    found
}

fn probe_source_ip(head: &dyn Packet) -> Option<IpAddr> {
    let mut current = Some(head);
    while let Some(layer) = current {
        if let Some(ip) = layer.as_any().downcast_ref::<Ipv4Packet>() {
            return Some(IpAddr::V4(ip.source));
        }
        if let Some(ip) = layer.as_any().downcast_ref::<Ipv6Packet>() {
            return Some(IpAddr::V6(ip.source));
        }
        current = layer.payload();
    }
    None
}

/// Derive a reply filter from the probe chain.
///
/// Best-effort: the protocol term comes from the innermost interesting
/// layer (transport probes over IP also admit the matching ICMP term so
/// error replies pass), narrowed to frames addressed to the probe's source
/// IP when one exists. Anything underivable just widens the capture.
fn derive_filter(probe: &dyn Packet) -> Option<String> {
    let inner = innermost_interesting(probe)?;
    let over_v6 = matches!(probe_source_ip(probe), Some(IpAddr::V6(_)));

    let errors = if over_v6 {
        filters::icmpv6()
    } else {
        filters::icmp()
    };
    let proto = match inner.kind() {
        Kind::Arp => filters::arp(),
        Kind::Tcp => filters::any(&[&filters::tcp(), &errors]),
        Kind::Udp => filters::any(&[&filters::udp(), &errors]),
        Kind::Sctp => filters::any(&[&filters::sctp(), &errors]),
        Kind::Icmpv4 => filters::icmp(),
        Kind::Icmpv6 => filters::icmpv6(),
        _ => return None,
    };

    match probe_source_ip(probe) {
        Some(ip) => Some(filters::all(&[&proto, &filters::dst_host(ip)])),
        None => Some(proto),
    }
}

fn response_matches(response: &dyn Packet, probe_inner: &dyn Packet) -> bool {
    let mut current = Some(response);
    while let Some(layer) = current {
        if INTERESTING.contains(&layer.kind()) && layer.answers(probe_inner) {
            return true;
        }
        current = layer.payload();
    }
    false
}

/// Send a probe chain and return the first captured frame that answers it.
///
/// The chain is linked and packed, a reply filter derived from it is
/// installed on the handle, and the packed frame is injected once. Incoming
/// frames are decoded from the handle's link kind; the first whose
/// interesting layer answers the probe's innermost interesting layer is
/// returned. Reaching the deadline yields `Error::Timeout`.
pub fn send_recv<C: CaptureHandle + ?Sized>(
    handle: &mut C,
    timeout: Duration,
    packets: Vec<Box<dyn Packet>>,
) -> Result<Box<dyn Packet>> {
    let mut probe = layers::link(packets)?;
    let frame = layers::pack(probe.as_mut())?;

    if let Some(filter) = derive_filter(probe.as_ref()) {
        // Filtering is an optimization; a handle that rejects the
        // expression still captures everything
        if let Err(e) = handle.set_filter(&filter) {
            warn!(filter = %filter, "reply filter rejected: {}", e);
        }
    }

    handle.inject(&frame)?;

    let link_kind = handle.link_kind();
    let deadline = Instant::now() + timeout;

    while Instant::now() < deadline {
        let Some(raw) = handle.capture()? else {
            continue;
        };

        let response = match layers::unpack(&raw, link_kind) {
            Ok(packet) => packet,
            Err(e) => {
                debug!("skipping undecodable frame: {}", e);
                continue;
            }
        };

        match innermost_interesting(probe.as_ref()) {
            Some(probe_inner) => {
                if response_matches(response.as_ref(), probe_inner) {
                    return Ok(response);
                }
            }
            // Nothing to match against: the first decodable frame wins
            None => return Ok(response),
        }
    }

    Err(Error::Timeout)
}
