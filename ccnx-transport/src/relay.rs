//! A protocol-blind UDP relay between exactly two peers: whatever arrives
//! compressed is decompressed, whatever arrives plain is compressed, and
//! the result is forwarded to the other peer. The relay never builds a
//! [`ccnx_wire::Message`] value of its own — it only re-frames the bytes it
//! is handed.
//!
//! Grounded on `original_source/ccnxz_relay.py`'s `MyUdpServer` (dispatch by
//! which configured peer a datagram came from) and `CompressionWorker` (the
//! per-peer transform-and-forward loop).

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::watch;

use ccnx_wire::parser;

/// The context id a relay stamps onto packets it compresses. The reference
/// relay never varies this, so neither do we.
const RELAY_CONTEXT_ID: u8 = 1;

/// Runs a relay between `peer_a` and `peer_b`, bound to `socket`, until
/// `shutdown` fires. Every datagram received from one peer is (de)compressed
/// and sent to the other; a datagram from any other source address is
/// dropped with a warning, matching `MyUdpServer.receive`'s `ValueError` on
/// an unrecognised client — logged here instead of raising, since one
/// stray packet shouldn't take the relay down.
pub async fn run(socket: Arc<UdpSocket>, peer_a: SocketAddr, peer_b: SocketAddr, mut shutdown: watch::Receiver<bool>) {
    let mut buf = vec![0u8; crate::socket::MAX_DATAGRAM_SIZE];
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            result = socket.recv_from(&mut buf) => {
                match result {
                    Ok((len, from)) => {
                        let destination = if from == peer_a {
                            Some(peer_b)
                        } else if from == peer_b {
                            Some(peer_a)
                        } else {
                            log::warn!("dropping datagram from unrecognised peer {from}");
                            None
                        };

                        if let Some(to) = destination {
                            match transform(&buf[..len]) {
                                Ok(out) => {
                                    if let Err(e) = socket.send_to(&out, to).await {
                                        log::warn!("relay write error: {e}");
                                    }
                                }
                                Err(e) => log::warn!("dropping unparseable datagram from {from}: {e}"),
                            }
                        }
                    }
                    Err(e) => log::warn!("relay read error: {e}"),
                }
            }
        }
    }
}

/// Parses `datagram` and re-encodes it in the opposite framing: compressed
/// input comes back out plain, plain input comes back out compressed.
fn transform(datagram: &[u8]) -> ccnx_wire::Result<Vec<u8>> {
    let parsed = parser::parse(datagram)?;
    Ok(if parsed.was_compressed {
        parsed.message.wire_bytes()
    } else {
        parsed.message.compressed_wire_bytes(RELAY_CONTEXT_ID)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccnx_tlv::Name;
    use ccnx_wire::{Interest, Message};
    use std::time::Duration;

    #[tokio::test]
    async fn forwards_and_compresses_a_plain_interest_from_peer_a_to_peer_b() {
        let relay_socket = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
        let relay_addr = relay_socket.local_addr().unwrap();

        let socket_a = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr_a = socket_a.local_addr().unwrap();
        let socket_b = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr_b = socket_b.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run(relay_socket, addr_a, addr_b, shutdown_rx));

        let interest = Interest::new(Name::from_uri("lci:/apple/pie").unwrap(), None, None);
        let wire = Message::Interest(interest.clone()).wire_bytes();
        socket_a.send_to(&wire, relay_addr).await.unwrap();

        let mut buf = [0u8; 512];
        let (len, _) = tokio::time::timeout(Duration::from_secs(2), socket_b.recv_from(&mut buf)).await.unwrap().unwrap();

        let parsed = parser::parse(&buf[..len]).unwrap();
        assert!(parsed.was_compressed);
        assert_eq!(parsed.message, Message::Interest(interest));

        shutdown_tx.send(true).unwrap();
        let _ = tokio::time::timeout(Duration::from_secs(1), handle).await;
    }

    #[tokio::test]
    async fn forwards_and_decompresses_a_compressed_interest_from_peer_b_to_peer_a() {
        let relay_socket = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
        let relay_addr = relay_socket.local_addr().unwrap();

        let socket_a = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr_a = socket_a.local_addr().unwrap();
        let socket_b = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr_b = socket_b.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run(relay_socket, addr_a, addr_b, shutdown_rx));

        let interest = Interest::new(Name::from_uri("lci:/apple/pie").unwrap(), None, None);
        let compressed = Message::Interest(interest.clone()).compressed_wire_bytes(2);
        socket_b.send_to(&compressed, relay_addr).await.unwrap();

        let mut buf = [0u8; 512];
        let (len, _) = tokio::time::timeout(Duration::from_secs(2), socket_a.recv_from(&mut buf)).await.unwrap().unwrap();

        let parsed = parser::parse(&buf[..len]).unwrap();
        assert!(!parsed.was_compressed);
        assert_eq!(parsed.message, Message::Interest(interest));

        shutdown_tx.send(true).unwrap();
        let _ = tokio::time::timeout(Duration::from_secs(1), handle).await;
    }
}
