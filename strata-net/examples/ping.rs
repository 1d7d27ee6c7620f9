//! Ping an IPv4 address with ICMP echo requests.

use std::net::Ipv4Addr;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use rand::Rng;

use strata_capture::{CaptureHandle, PcapHandle};
use strata_core::{Kind, Result};
use strata_net::{next_hop_mac, send_recv, Route};
use strata_packet::ethernet::EthernetFrame;
use strata_packet::icmpv4::{Icmpv4Packet, Icmpv4Type};
use strata_packet::ipv4::Ipv4Packet;
use strata_packet::layers;

#[derive(Parser)]
#[command(about = "Ping an IPv4 address with ICMP echo requests")]
struct Args {
    /// Address to ping
    addr: Ipv4Addr,

    /// Outbound interface
    #[arg(short, long)]
    iface: String,

    /// Gateway for off-link targets
    #[arg(short, long)]
    gateway: Option<Ipv4Addr>,

    /// Number of echo requests to send
    #[arg(short, long, default_value_t = 4)]
    count: u16,

    /// Per-probe timeout in seconds
    #[arg(short, long, default_value_t = 5)]
    timeout: u64,
}

fn run(args: &Args) -> Result<()> {
    let route = Route::from_interface(&args.iface, args.gateway)?;
    let timeout = Duration::from_secs(args.timeout);

    let mut handle = PcapHandle::open(&route.iface)?;
    handle.activate()?;

    let next_hop = next_hop_mac(&mut handle, timeout, &route, args.addr)?;
    let id: u16 = rand::thread_rng().gen();

    for seq in 0..args.count {
        let mut eth = EthernetFrame::new();
        eth.source = route.hw_addr;
        eth.destination = next_hop;

        let mut ip = Ipv4Packet::new();
        ip.source = route.iface_addr;
        ip.destination = args.addr;

        let mut icmp = Icmpv4Packet::new();
        icmp.icmp_type = Icmpv4Type::EchoRequest;
        icmp.id = id;
        icmp.seq = seq;

        let chain: Vec<Box<dyn strata_core::Packet>> =
            vec![Box::new(eth), Box::new(ip), Box::new(icmp)];

        match send_recv(&mut handle, timeout, chain) {
            Ok(response) => {
                let from = layers::find_layer(response.as_ref(), Kind::Ipv4)
                    .and_then(|l| l.as_any().downcast_ref::<Ipv4Packet>())
                    .map(|ip| ip.source.to_string())
                    .unwrap_or_else(|| "?".to_string());
                println!("reply from {}: icmp_seq={}", from, seq);
            }
            Err(e) => println!("icmp_seq={}: {}", seq, e),
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
