//! `ccnxz server`: walks a directory, builds a manifest tree per file under
//! `prefix`, and serves the resulting content objects over UDP.
//!
//! Grounded on `original_source/ccnxz_gen.py`'s `_run_server` /
//! `_add_manifest_tree` (recursive directory walk, one tree per file, flatten
//! every node into a name/hash-indexed table) and `CCNxzGenServer.start`
//! (reader → parser → lookup → writer pipeline).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args as ClapArgs;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch};

use ccnx_manifest::ManifestTree;
use ccnx_tlv::Name;
use ccnx_transport::{socket, store, ContentStore};
use ccnx_wire::Signer;

use crate::error::Result;

const CHUNK_SIZE: usize = 1500;
const CHANNEL_CAPACITY: usize = 256;

#[derive(ClapArgs, Debug)]
pub struct ServerArgs {
    /// UDP port to listen on.
    #[clap(short = 'p', long)]
    port: u16,
    /// Content name prefix under which every served file is reachable.
    #[clap(long)]
    prefix: String,
    /// Directory to walk and serve, recursively.
    #[clap(long)]
    dir: PathBuf,
    /// PKCS#8 PEM-encoded RSA private signing key.
    #[clap(long)]
    key: PathBuf,
}

pub async fn run(args: ServerArgs) -> Result<()> {
    let signer = Signer::from_pkcs8_pem_file(&args.key)?;

    let files = walk_dir(&args.dir)?;
    log::info!("serving {} file(s) from {:?} under {}", files.len(), args.dir, args.prefix);

    let mut content_store = ContentStore::new(signer.keyid().to_vec());
    for path in &files {
        let relative = path.strip_prefix(&args.dir).unwrap_or(path);
        let uri = format!("{}/{}", args.prefix.trim_end_matches('/'), relative.display());
        let name = Name::from_uri(&uri)?;
        let data = std::fs::read(path)?;

        let tree = ManifestTree::new(name, data, CHUNK_SIZE);
        let objects = tree.create_tree(&signer)?;
        log::debug!("{uri}: {} object(s)", objects.len());
        for co in objects {
            content_store.insert(co);
        }
    }
    let content_store = Arc::new(content_store);

    let socket = Arc::new(UdpSocket::bind(("0.0.0.0", args.port)).await?);
    log::info!("listening on {}", socket.local_addr()?);

    let (to_parser_tx, to_parser_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (to_lookup_tx, to_lookup_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (to_writer_tx, to_writer_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let reader = tokio::spawn(socket::reader_task(socket.clone(), to_parser_tx, shutdown_rx.clone()));
    let parser = tokio::spawn(socket::parser_task(to_parser_rx, to_lookup_tx, shutdown_rx.clone()));
    let lookup = tokio::spawn(store::lookup_task(to_lookup_rx, content_store, to_writer_tx, shutdown_rx.clone()));
    let writer = tokio::spawn(socket::reply_writer_task(socket, to_writer_rx, shutdown_rx));

    if tokio::signal::ctrl_c().await.is_ok() {
        log::info!("shutting down");
    }
    let _ = shutdown_tx.send(true);
    for handle in [reader, parser, lookup, writer] {
        let _ = handle.await;
    }

    Ok(())
}

/// Recursively collects every regular file under `dir`, matching
/// `os.walk`'s flattened `(dirname, filenames)` traversal. No `walkdir`
/// dependency: this is a thin, one-shot boundary operation, not core logic.
fn walk_dir(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        for entry in std::fs::read_dir(&current)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                stack.push(path);
            } else {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}
