//! Find the route to an IPv4 address using ICMP, UDP or TCP probes.

use std::net::Ipv4Addr;
use std::process::ExitCode;
use std::time::Duration;

use clap::{ArgGroup, Parser};
use rand::Rng;

use strata_capture::{CaptureHandle, PcapHandle};
use strata_core::{Kind, Packet, Result};
use strata_net::{next_hop_mac, send_recv, Route};
use strata_packet::ethernet::EthernetFrame;
use strata_packet::icmpv4::{Icmpv4Packet, Icmpv4Type};
use strata_packet::ipv4::Ipv4Packet;
use strata_packet::layers;
use strata_packet::raw::RawPayload;
use strata_packet::tcp::{TcpFlags, TcpSegment};
use strata_packet::udp::UdpDatagram;

/// Pad the transport up to a 40-byte IP payload
const PROBE_PAYLOAD_LEN: u16 = 40;

const MAX_HOPS: u8 = 64;

#[derive(Parser)]
#[command(about = "Trace the route to an IPv4 address")]
#[command(group(ArgGroup::new("mode").required(true)))]
struct Args {
    /// Address to trace
    addr: Ipv4Addr,

    /// Outbound interface
    #[arg(short, long)]
    iface: String,

    /// Gateway for off-link targets
    #[arg(short, long)]
    gateway: Option<Ipv4Addr>,

    /// Use ICMP echo probes
    #[arg(long, group = "mode")]
    icmp: bool,

    /// Use UDP probes
    #[arg(long, group = "mode")]
    udp: bool,

    /// Use TCP SYN probes
    #[arg(long, group = "mode")]
    tcp: bool,

    /// Per-hop timeout in seconds
    #[arg(short, long, default_value_t = 5)]
    timeout: u64,
}

fn padding(transport_len: u16) -> RawPayload {
    let len = PROBE_PAYLOAD_LEN.saturating_sub(transport_len) as usize;
    RawPayload::from_bytes((0..len).map(|i| 0x40 + (i as u8 & 0x3F)).collect())
}

fn probe_transport(args: &Args, id: u16, seq: u32) -> Result<Box<dyn Packet>> {
    if args.icmp {
        let mut icmp = Icmpv4Packet::new();
        icmp.icmp_type = Icmpv4Type::EchoRequest;
        icmp.id = id;
        icmp.seq = 1;
        return Ok(Box::new(icmp));
    }

    if args.udp {
        let mut udp = UdpDatagram::new();
        udp.source_port = 49152;
        udp.destination_port = 33434;
        udp.set_payload(Box::new(padding(udp.total_len())))?;
        return Ok(Box::new(udp));
    }

    let mut tcp = TcpSegment::new();
    tcp.source_port = 49152;
    tcp.destination_port = 80;
    tcp.flags = TcpFlags::SYN;
    tcp.flags.ece = true;
    tcp.flags.cwr = true;
    tcp.sequence = seq;
    tcp.window_size = 5840;
    tcp.set_payload(Box::new(padding(tcp.total_len())))?;
    Ok(Box::new(tcp))
}

fn run(args: &Args) -> Result<()> {
    let route = Route::from_interface(&args.iface, args.gateway)?;
    let timeout = Duration::from_secs(args.timeout);

    let mut handle = PcapHandle::open(&route.iface)?;
    handle.activate()?;

    let next_hop = next_hop_mac(&mut handle, timeout, &route, args.addr)?;

    let mut rng = rand::thread_rng();
    let id: u16 = rng.gen();
    let seq: u32 = rng.gen();

    for ttl in 1..=MAX_HOPS {
        let mut eth = EthernetFrame::new();
        eth.source = route.hw_addr;
        eth.destination = next_hop;

        let mut ip = Ipv4Packet::new();
        ip.source = route.iface_addr;
        ip.destination = args.addr;
        ip.identification = id.wrapping_add(ttl as u16);
        ip.ttl = ttl;

        let chain: Vec<Box<dyn Packet>> = vec![
            Box::new(eth),
            Box::new(ip),
            probe_transport(args, id, seq)?,
        ];

        match send_recv(&mut handle, timeout, chain) {
            Ok(response) => {
                let Some(hop) = layers::find_layer(response.as_ref(), Kind::Ipv4)
                    .and_then(|l| l.as_any().downcast_ref::<Ipv4Packet>())
                else {
                    println!("{:2}  ?", ttl);
                    continue;
                };
                println!("{:2}  {}", ttl, hop.source);
                if hop.source == args.addr {
                    return Ok(());
                }
            }
            Err(e) => println!("{:2}  {}", ttl, e),
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
