//! Walks a manifest tree by issuing Interests: the chunk-0 manifest first,
//! then every child manifest/data link the replies describe, forwarding
//! finished data chunks to the user.
//!
//! Grounded on `CCNxz/ManifestProcessorThread.py`: `__fetch_first_manifest`
//! and `__receive_manifest` map directly to
//! [`ManifestProcessor::fetch_first_manifest`] and
//! [`ManifestProcessor::receive`].

use tokio::sync::{mpsc, watch};

use ccnx_tlv::Name;
use ccnx_wire::{ContentObject, Interest, Message};

/// Drives the consumer side of a manifest retrieval for one name prefix.
pub struct ManifestProcessor {
    name: Name,
    keyid: Vec<u8>,
}

impl ManifestProcessor {
    /// `keyid` restricts the first (chunk-0) Interest to a specific
    /// publisher; every Interest after that is restricted by content-object
    /// hash instead, taken from the manifest that named it.
    pub fn new(name: Name, keyid: Vec<u8>) -> Self {
        ManifestProcessor { name, keyid }
    }

    /// Runs until `shutdown` fires or a channel closes. `transport_read_rx`
    /// carries parsed replies up from the flow controller;
    /// `transport_write_tx` carries Interests down to it. Finished data
    /// chunks (content objects with no manifest) go to `user_write_tx`.
    pub async fn run(
        self,
        user_write_tx: mpsc::Sender<ContentObject>,
        mut transport_read_rx: mpsc::Receiver<ContentObject>,
        transport_write_tx: mpsc::Sender<Interest>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        if self.fetch_first_manifest(&transport_write_tx).await.is_err() {
            return;
        }

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                maybe_co = transport_read_rx.recv() => {
                    match maybe_co {
                        Some(co) => {
                            if self.receive(co, &user_write_tx, &transport_write_tx).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
            }
        }
    }

    async fn fetch_first_manifest(&self, transport_write_tx: &mpsc::Sender<Interest>) -> Result<(), ()> {
        let chunk_0 = Name::from_name_with_chunk(&self.name, 0);
        let interest = Interest::new(chunk_0, Some(self.keyid.clone()), None);
        transport_write_tx.send(interest).await.map_err(|_| ())
    }

    async fn receive(
        &self,
        co: ContentObject,
        user_write_tx: &mpsc::Sender<ContentObject>,
        transport_write_tx: &mpsc::Sender<Interest>,
    ) -> Result<(), ()> {
        match &co.manifest {
            None => user_write_tx.send(co).await.map_err(|_| ()),
            Some(manifest) => {
                let mut chunk_number = manifest.manifest_links.start_chunk;
                for hash in &manifest.manifest_links.hashes {
                    let name = Name::from_name_with_chunk(&self.name, chunk_number);
                    let interest = Interest::new(name, None, Some(hash.to_vec()));
                    transport_write_tx.send(interest).await.map_err(|_| ())?;
                    chunk_number += 1;
                }

                let mut chunk_number = manifest.data_links.start_chunk;
                for hash in &manifest.data_links.hashes {
                    let name = Name::from_name_with_chunk(&self.name, chunk_number);
                    let interest = Interest::new(name, None, Some(hash.to_vec()));
                    transport_write_tx.send(interest).await.map_err(|_| ())?;
                    chunk_number += 1;
                }
                Ok(())
            }
        }
    }
}
