//! `ccnxz client`: retrieves one named file from a publisher and streams
//! each data chunk to stdout as the manifest processor delivers it.
//!
//! Grounded on `original_source/CCNxz/CCNxzGenClient.py`'s `loop` (the five
//! queues it wires between socket reader, parser, flow controller and
//! manifest processor) and its `SocketWriterThread` (peer is fixed for the
//! whole session, unlike the server's per-reply destination).

use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;

use clap::Args as ClapArgs;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch};

use ccnx_tlv::Name;
use ccnx_transport::{socket, FlowController, ManifestProcessor};
use ccnx_wire::Message;

use crate::error::Result;

const CHANNEL_CAPACITY: usize = 256;

#[derive(ClapArgs, Debug)]
pub struct ClientArgs {
    /// Local UDP port to listen on for replies.
    #[clap(short = 'p', long)]
    port: u16,
    /// Name of the file to retrieve.
    #[clap(long)]
    name: String,
    /// Publisher address, as `host:port`.
    #[clap(long)]
    peer: SocketAddr,
    /// PEM-encoded RSA public key of the publisher, used to restrict the
    /// first Interest to it.
    #[clap(long)]
    pubkey: std::path::PathBuf,
}

pub async fn run(args: ClientArgs) -> Result<()> {
    let name = Name::from_uri(&args.name)?;
    let pubkey_pem = std::fs::read_to_string(&args.pubkey)?;
    let keyid = ccnx_wire::keyid_from_public_key_pem(&pubkey_pem)?;

    let local_socket = Arc::new(UdpSocket::bind(("0.0.0.0", args.port)).await?);
    log::info!("listening on {}, fetching {} from {}", local_socket.local_addr()?, args.name, args.peer);

    let (to_parser_tx, to_parser_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (net_read_tx, net_read_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (interest_tx, interest_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (reply_tx, reply_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (rtx_tx, rtx_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (data_tx, data_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (final_tx, mut final_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let reader = tokio::spawn(socket::reader_task(local_socket.clone(), to_parser_tx, shutdown_rx.clone()));
    let parser = tokio::spawn(socket::parser_task(to_parser_rx, drop_peer_tx(net_read_tx), shutdown_rx.clone()));
    let writer = tokio::spawn(socket::writer_task(local_socket, args.peer, rtx_rx, data_rx, shutdown_rx.clone()));

    let flow_controller = FlowController::new();
    let flow_controller_handle =
        tokio::spawn(flow_controller.run(interest_rx, reply_tx, net_read_rx, rtx_tx, data_tx, shutdown_rx.clone()));

    let processor = ManifestProcessor::new(name, keyid);
    let processor_handle = tokio::spawn(processor.run(final_tx, reply_rx, interest_tx, shutdown_rx.clone()));

    let mut stdout = std::io::stdout();
    let drain = tokio::spawn(async move {
        while let Some(co) = final_rx.recv().await {
            if let Some(payload) = co.payload {
                let _ = stdout.write_all(&payload);
            }
        }
    });

    if tokio::signal::ctrl_c().await.is_ok() {
        log::info!("shutting down");
    }
    let _ = shutdown_tx.send(true);
    for handle in [reader, parser, writer, flow_controller_handle, processor_handle, drain] {
        let _ = handle.await;
    }

    Ok(())
}

/// Bridges the parser's `(peer, Message)` output into the bare `Message`
/// channel the flow controller reads, discarding the peer — the client only
/// ever talks to one publisher, already fixed by `--peer`.
fn drop_peer_tx(to_flow_controller_tx: mpsc::Sender<Message>) -> mpsc::Sender<(SocketAddr, Message)> {
    let (tx, mut rx) = mpsc::channel::<(SocketAddr, Message)>(CHANNEL_CAPACITY);
    tokio::spawn(async move {
        while let Some((_peer, message)) = rx.recv().await {
            if to_flow_controller_tx.send(message).await.is_err() {
                break;
            }
        }
    });
    tx
}
