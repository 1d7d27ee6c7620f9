//! Simple TCP SYN port scanner.

use std::net::Ipv4Addr;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use rand::Rng;

use strata_capture::{CaptureHandle, PcapHandle};
use strata_core::{Kind, Result};
use strata_net::{next_hop_mac, send_recv, Route};
use strata_packet::ethernet::EthernetFrame;
use strata_packet::ipv4::Ipv4Packet;
use strata_packet::layers;
use strata_packet::tcp::{TcpFlags, TcpSegment};

#[derive(Parser)]
#[command(about = "Scan TCP ports with SYN probes")]
struct Args {
    /// Address to scan
    addr: Ipv4Addr,

    /// Outbound interface
    #[arg(short, long)]
    iface: String,

    /// Gateway for off-link targets
    #[arg(short, long)]
    gateway: Option<Ipv4Addr>,

    /// First port to scan
    #[arg(long, default_value_t = 1)]
    start: u16,

    /// Last port to scan
    #[arg(long, default_value_t = 1024)]
    end: u16,

    /// Per-port timeout in seconds
    #[arg(short, long, default_value_t = 1)]
    timeout: u64,
}

fn run(args: &Args) -> Result<()> {
    let route = Route::from_interface(&args.iface, args.gateway)?;
    let timeout = Duration::from_secs(args.timeout);

    let mut handle = PcapHandle::open(&route.iface)?;
    handle.activate()?;

    let next_hop = next_hop_mac(&mut handle, timeout, &route, args.addr)?;
    let mut rng = rand::thread_rng();

    for port in args.start..=args.end {
        let mut eth = EthernetFrame::new();
        eth.source = route.hw_addr;
        eth.destination = next_hop;

        let mut ip = Ipv4Packet::new();
        ip.source = route.iface_addr;
        ip.destination = args.addr;

        let mut tcp = TcpSegment::new();
        tcp.source_port = 49152;
        tcp.destination_port = port;
        tcp.flags = TcpFlags::SYN;
        tcp.sequence = rng.gen();
        tcp.window_size = 5840;

        print!("scanning port {:5}: ", port);

        let chain: Vec<Box<dyn strata_core::Packet>> =
            vec![Box::new(eth), Box::new(ip), Box::new(tcp)];

        match send_recv(&mut handle, timeout, chain) {
            Ok(response) => {
                let reply = layers::find_layer(response.as_ref(), Kind::Tcp)
                    .and_then(|l| l.as_any().downcast_ref::<TcpSegment>());
                match reply {
                    Some(r) if !r.flags.rst => println!("OPEN"),
                    Some(_) => println!("CLOSED"),
                    None => println!("FILTERED"),
                }
            }
            Err(e) => println!("{}", e),
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
