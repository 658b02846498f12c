//! UDP socket reader/writer tasks and the parser stage that sits between
//! them and the rest of the pipeline.
//!
//! Grounded on `webrtc_util::conn::conn_udp::Conn for UdpSocket` (an async
//! `Conn` trait wrapping `tokio::net::UdpSocket`) and `stun::agent::Agent`'s
//! channel-driven worker loop: each stage here is a free function spawned
//! as its own task, reading one `mpsc::Receiver` and writing one or more
//! `mpsc::Sender`s, stopped by a shared `tokio::sync::watch` flag.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch};

use ccnx_wire::{parser, ContentObject, Message};

/// Largest datagram this transport will read off the wire in one call.
pub const MAX_DATAGRAM_SIZE: usize = 65535;

/// Reads datagrams off `socket` and forwards `(peer, bytes)` pairs to
/// `to_parser_tx` until `shutdown` fires or the channel closes. A read
/// error is logged and the loop continues — one bad or short-lived peer
/// must not take the reader down.
pub async fn reader_task(
    socket: Arc<UdpSocket>,
    to_parser_tx: mpsc::Sender<(SocketAddr, Vec<u8>)>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            result = socket.recv_from(&mut buf) => {
                match result {
                    Ok((len, peer)) => {
                        let datagram = buf[..len].to_vec();
                        if to_parser_tx.send((peer, datagram)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => log::warn!("socket read error: {e}"),
                }
            }
        }
    }
}

/// Parses each raw datagram into a [`Message`] and forwards it on, dropping
/// (and logging) anything that fails to parse — matches
/// `CCNxzGenServer.ParserThread`'s "a bad datagram dies here" policy.
pub async fn parser_task(
    mut from_reader_rx: mpsc::Receiver<(SocketAddr, Vec<u8>)>,
    to_next_tx: mpsc::Sender<(SocketAddr, Message)>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            maybe_datagram = from_reader_rx.recv() => {
                match maybe_datagram {
                    Some((peer, bytes)) => match parser::parse(&bytes) {
                        Ok(parsed) => {
                            if to_next_tx.send((peer, parsed.message)).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => log::warn!("dropping unparseable datagram from {peer}: {e}"),
                    },
                    None => break,
                }
            }
        }
    }
}

/// Drains two priority channels and writes whatever arrives to `peer` over
/// `socket`. `rtx_rx` is checked first every iteration (`biased`), so
/// retransmissions never wait behind fresh Interests — the equivalent of
/// the reference's `(priority, message)` `PriorityQueue` without needing an
/// actual heap.
pub async fn writer_task(
    socket: Arc<UdpSocket>,
    peer: SocketAddr,
    mut rtx_rx: mpsc::Receiver<Vec<u8>>,
    mut data_rx: mpsc::Receiver<Vec<u8>>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            Some(bytes) = rtx_rx.recv() => {
                if let Err(e) = socket.send_to(&bytes, peer).await {
                    log::warn!("socket write error: {e}");
                }
            }
            Some(bytes) = data_rx.recv() => {
                if let Err(e) = socket.send_to(&bytes, peer).await {
                    log::warn!("socket write error: {e}");
                }
            }
            else => break,
        }
    }
}

/// Publisher-side writer: a single priority channel is enough since a
/// content-object reply has no retransmission notion of its own.
pub async fn reply_writer_task(
    socket: Arc<UdpSocket>,
    mut from_lookup_rx: mpsc::Receiver<(SocketAddr, ContentObject)>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            maybe_reply = from_lookup_rx.recv() => {
                match maybe_reply {
                    Some((peer, co)) => {
                        let wire = Message::ContentObject(co).wire_bytes();
                        if let Err(e) = socket.send_to(&wire, peer).await {
                            log::warn!("socket write error: {e}");
                        }
                    }
                    None => break,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccnx_tlv::Name;
    use ccnx_wire::Interest;
    use std::time::Duration;

    #[tokio::test]
    async fn reader_and_parser_deliver_a_parsed_interest() {
        let server_socket = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
        let client_socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let server_addr = server_socket.local_addr().unwrap();

        let (to_parser_tx, to_parser_rx) = mpsc::channel(8);
        let (to_next_tx, mut to_next_rx) = mpsc::channel(8);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let reader = tokio::spawn(reader_task(server_socket.clone(), to_parser_tx, shutdown_rx.clone()));
        let parser = tokio::spawn(parser_task(to_parser_rx, to_next_tx, shutdown_rx));

        let interest = Interest::new(Name::from_uri("lci:/apple/pie").unwrap(), None, None);
        let wire = Message::Interest(interest.clone()).wire_bytes();
        client_socket.send_to(&wire, server_addr).await.unwrap();

        let (_peer, message) = tokio::time::timeout(Duration::from_secs(2), to_next_rx.recv()).await.unwrap().unwrap();
        assert_eq!(message, Message::Interest(interest));

        shutdown_tx.send(true).unwrap();
        let _ = tokio::time::timeout(Duration::from_secs(1), reader).await;
        let _ = tokio::time::timeout(Duration::from_secs(1), parser).await;
    }

    #[tokio::test]
    async fn writer_prefers_retransmissions_over_fresh_data() {
        let socket = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
        let listener = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let peer = listener.local_addr().unwrap();

        let (rtx_tx, rtx_rx) = mpsc::channel(8);
        let (data_tx, data_rx) = mpsc::channel(8);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        // Queue both before the writer starts draining, so its first
        // `select!` sees both branches ready and `biased` picks rtx.
        data_tx.send(vec![1, 2, 3]).await.unwrap();
        rtx_tx.send(vec![9, 9, 9]).await.unwrap();

        let writer = tokio::spawn(writer_task(socket, peer, rtx_rx, data_rx, shutdown_rx));

        let mut buf = [0u8; 16];
        let (len, _) = tokio::time::timeout(Duration::from_secs(2), listener.recv_from(&mut buf)).await.unwrap().unwrap();
        assert_eq!(&buf[..len], &[9, 9, 9]);

        shutdown_tx.send(true).unwrap();
        let _ = tokio::time::timeout(Duration::from_secs(1), writer).await;
    }
}
