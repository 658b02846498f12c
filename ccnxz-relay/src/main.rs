//! `ccnxz-relay`: a protocol-blind UDP relay sitting between exactly two
//! CCNx 1.0 peers, flipping compressed/plain framing in each direction.
//!
//! Grounded on `original_source/ccnxz_relay.py`'s `_parse_args` (`-p` /
//! `--peers`) and `MyUdpServer` (bind one socket, dispatch by source
//! address).

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::net::UdpSocket;
use tokio::sync::watch;

#[derive(Parser, Debug)]
#[clap(name = "ccnxz-relay", about = "Relay CCNx 1.0 traffic between two peers, flipping compression")]
struct Args {
    /// Local UDP port to listen on.
    #[clap(short = 'p', long)]
    port: u16,

    /// The two peers to relay between, as `host:port host:port`.
    #[clap(long, multiple_values = true, required = true)]
    peers: Vec<SocketAddr>,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    if args.peers.len() != 2 {
        eprintln!("--peers requires exactly two addresses");
        return ExitCode::from(1);
    }

    let socket = match UdpSocket::bind(("0.0.0.0", args.port)).await {
        Ok(socket) => Arc::new(socket),
        Err(e) => {
            eprintln!("failed to bind port {}: {e}", args.port);
            return ExitCode::from(1);
        }
    };

    log::info!("relaying between {} and {} on port {}", args.peers[0], args.peers[1], args.port);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let relay = tokio::spawn(ccnx_transport::relay::run(socket, args.peers[0], args.peers[1], shutdown_rx));

    if tokio::signal::ctrl_c().await.is_ok() {
        log::info!("shutting down");
    }
    let _ = shutdown_tx.send(true);
    let _ = relay.await;

    ExitCode::SUCCESS
}
