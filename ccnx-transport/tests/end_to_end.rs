//! Drives a 10,000-byte publish/retrieve round trip over loopback UDP: a
//! publisher serves a manifest-chunked file, a consumer walks the manifest
//! tree and reassembles the original bytes, and every datagram either side
//! sends stays at or under 1500 bytes.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch};

use ccnx_manifest::ManifestTree;
use ccnx_tlv::Name;
use ccnx_transport::{store, ContentStore, FlowController, ManifestProcessor};
use ccnx_wire::{Message, Signer};

const MAX_DATAGRAM: usize = 1500;

fn test_signer() -> Signer {
    use pkcs8::EncodePrivateKey;
    use rsa::RsaPrivateKey;

    let mut rng = rand::rngs::OsRng;
    let private_key = RsaPrivateKey::new(&mut rng, 2048).expect("key generation");
    let pem = private_key.to_pkcs8_pem(Default::default()).expect("pkcs8 encode").to_string();
    Signer::from_pkcs8_pem(&pem).expect("signer load")
}

/// Forwards `(peer, Message)` pairs as bare `Message`s, dropping the peer —
/// the shape the flow controller expects from the network side.
async fn drop_peer(mut from_parser_rx: mpsc::Receiver<(SocketAddr, Message)>, to_flow_controller_tx: mpsc::Sender<Message>) {
    while let Some((_peer, message)) = from_parser_rx.recv().await {
        if to_flow_controller_tx.send(message).await.is_err() {
            break;
        }
    }
}

#[tokio::test]
async fn ten_thousand_byte_file_round_trips_over_loopback() {
    let prefix = Name::from_uri("lci:/apple/bananna").unwrap();
    let signer = test_signer();

    let original: Vec<u8> = (0..10_000u32).map(|i| (i % 256) as u8).collect();
    let tree = ManifestTree::new(prefix.clone(), original.clone(), MAX_DATAGRAM);
    let objects = tree.create_tree(&signer).unwrap();

    let expected_data_chunks = objects.iter().filter(|co| co.manifest.is_none()).count();
    for co in &objects {
        let wire_len = Message::ContentObject(co.clone()).wire_bytes().len();
        assert!(wire_len <= MAX_DATAGRAM, "content object {:?} is {wire_len} bytes", co.name);
    }

    let mut content_store = ContentStore::new(signer.keyid().to_vec());
    for co in objects {
        content_store.insert(co);
    }
    let content_store = Arc::new(content_store);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ---- Publisher: reader -> parser -> lookup -> reply_writer ----
    let server_socket = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
    let server_addr = server_socket.local_addr().unwrap();

    let (to_server_parser_tx, to_server_parser_rx) = mpsc::channel(64);
    let (to_lookup_tx, to_lookup_rx) = mpsc::channel(64);
    let (to_server_writer_tx, to_server_writer_rx) = mpsc::channel(64);

    let server_reader = tokio::spawn(ccnx_transport::socket::reader_task(server_socket.clone(), to_server_parser_tx, shutdown_rx.clone()));
    let server_parser = tokio::spawn(ccnx_transport::socket::parser_task(to_server_parser_rx, to_lookup_tx, shutdown_rx.clone()));
    let server_lookup = tokio::spawn(store::lookup_task(to_lookup_rx, content_store, to_server_writer_tx, shutdown_rx.clone()));
    let server_writer = tokio::spawn(ccnx_transport::socket::reply_writer_task(server_socket, to_server_writer_rx, shutdown_rx.clone()));

    // ---- Consumer: reader -> parser -> (drop peer) -> flow controller <-> manifest processor -> writer ----
    let client_socket = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());

    let (to_client_parser_tx, to_client_parser_rx) = mpsc::channel(64);
    let (to_drop_peer_tx, to_drop_peer_rx) = mpsc::channel(64);
    let (net_read_tx, net_read_rx) = mpsc::channel(64);
    let (interest_tx, interest_rx) = mpsc::channel(64);
    let (reply_tx, reply_rx) = mpsc::channel(64);
    let (rtx_tx, rtx_rx) = mpsc::channel(64);
    let (data_tx, data_rx) = mpsc::channel(64);
    let (final_tx, mut final_rx) = mpsc::channel(64);

    let client_reader = tokio::spawn(ccnx_transport::socket::reader_task(client_socket.clone(), to_client_parser_tx, shutdown_rx.clone()));
    let client_parser = tokio::spawn(ccnx_transport::socket::parser_task(to_client_parser_rx, to_drop_peer_tx, shutdown_rx.clone()));

    let client_writer = tokio::spawn(ccnx_transport::socket::writer_task(client_socket, server_addr, rtx_rx, data_rx, shutdown_rx.clone()));

    let flow_controller = FlowController::new();
    let flow_controller_handle =
        tokio::spawn(flow_controller.run(interest_rx, reply_tx, net_read_rx, rtx_tx, data_tx, shutdown_rx.clone()));

    let processor = ManifestProcessor::new(prefix, signer.keyid().to_vec());
    let processor_handle = tokio::spawn(processor.run(final_tx, reply_rx, interest_tx, shutdown_rx.clone()));

    let bridge = tokio::spawn(drop_peer(to_drop_peer_rx, net_read_tx));

    let mut chunks: HashMap<u64, Vec<u8>> = HashMap::new();
    while chunks.len() < expected_data_chunks {
        let co = tokio::time::timeout(Duration::from_secs(10), final_rx.recv())
            .await
            .expect("timed out waiting for data chunks")
            .expect("channel closed early");
        let chunk_number = co.name.chunk_number().expect("data object has a chunk number");
        chunks.insert(chunk_number, co.payload.expect("data object has a payload"));
    }

    let mut numbers: Vec<u64> = chunks.keys().copied().collect();
    numbers.sort_unstable();
    let mut reassembled = Vec::with_capacity(original.len());
    for n in numbers {
        reassembled.extend(chunks.remove(&n).unwrap());
    }
    assert_eq!(reassembled, original);

    shutdown_tx.send(true).unwrap();
    for handle in [
        server_reader,
        server_parser,
        server_lookup,
        server_writer,
        client_reader,
        client_parser,
        client_writer,
        flow_controller_handle,
        processor_handle,
        bridge,
    ] {
        let _ = tokio::time::timeout(Duration::from_secs(2), handle).await;
    }
}
