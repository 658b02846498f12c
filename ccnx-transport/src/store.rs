//! The publisher's object table: every content object it can serve, indexed
//! both by name and by content-object hash, with a KeyId it uses to decide
//! whether an incoming Interest's KeyId restriction even applies to it.
//!
//! Grounded on `CCNxzGenServer.LookupThread`'s `__objects_by_name` /
//! `__objects_by_hash` dictionaries and `__keyid_ok` / `__lookup`.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use ccnx_tlv::Name;
use ccnx_wire::{ContentObject, Interest, Message};

/// A publisher's servable content, keyed for both name-based and
/// hash-restricted lookup.
pub struct ContentStore {
    keyid: Vec<u8>,
    by_name: HashMap<Name, ContentObject>,
    by_hash: HashMap<[u8; 32], ContentObject>,
}

impl ContentStore {
    /// `keyid` is this publisher's own KeyId — an Interest whose
    /// `keyid_restr` doesn't match it is never looked up, matching
    /// `__keyid_ok`.
    pub fn new(keyid: Vec<u8>) -> Self {
        ContentStore { keyid, by_name: HashMap::new(), by_hash: HashMap::new() }
    }

    /// Adds `co` to both indices, keyed on its own content-object hash.
    pub fn insert(&mut self, co: ContentObject) {
        let hash = Message::ContentObject(co.clone()).content_object_hash();
        self.by_name.insert(co.name.clone(), co.clone());
        self.by_hash.insert(hash, co);
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Looks up the content object matching `interest`, honoring a KeyId
    /// restriction first (if present and not ours, no lookup happens at
    /// all), then a hash restriction or, failing that, the name.
    pub fn lookup(&self, interest: &Interest) -> Option<&ContentObject> {
        if !self.keyid_ok(interest) {
            return None;
        }
        if let Some(hash_restr) = &interest.hash_restr {
            let key: [u8; 32] = hash_restr.as_slice().try_into().ok()?;
            self.by_hash.get(&key)
        } else {
            self.by_name.get(&interest.name)
        }
    }

    fn keyid_ok(&self, interest: &Interest) -> bool {
        match &interest.keyid_restr {
            Some(restr) => restr == &self.keyid,
            None => true,
        }
    }
}

/// Matches parsed Interests against `store` and forwards hits to the
/// socket writer — `CCNxzGenServer.LookupThread`. Anything that isn't an
/// Interest, or that finds no match, is silently dropped: an unanswered
/// Interest is exactly how "no such content" is signaled in CCNx.
pub async fn lookup_task(
    mut from_parser_rx: mpsc::Receiver<(SocketAddr, Message)>,
    store: Arc<ContentStore>,
    to_writer_tx: mpsc::Sender<(SocketAddr, ContentObject)>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            maybe_message = from_parser_rx.recv() => {
                match maybe_message {
                    Some((peer, Message::Interest(interest))) => {
                        if let Some(co) = store.lookup(&interest) {
                            if to_writer_tx.send((peer, co.clone())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some((peer, Message::ContentObject(_))) => {
                        log::warn!("publisher received a ContentObject from {peer}, ignoring");
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

    fn co(uri: &str, payload: &[u8]) -> ContentObject {
        ContentObject::new(Name::from_uri(uri).unwrap(), Some(1000), Some(payload.to_vec()), None)
    }

    #[test]
    fn looks_up_by_name_with_no_restrictions() {
        let mut store = ContentStore::new(vec![1, 2, 3]);
        store.insert(co("lci:/apple/pie", b"hello"));

        let interest = Interest::new(Name::from_uri("lci:/apple/pie").unwrap(), None, None);
        let found = store.lookup(&interest).unwrap();
        assert_eq!(found.payload, Some(b"hello".to_vec()));
    }

    #[test]
    fn wrong_keyid_restriction_never_matches() {
        let mut store = ContentStore::new(vec![1, 2, 3]);
        store.insert(co("lci:/apple/pie", b"hello"));

        let interest = Interest::new(Name::from_uri("lci:/apple/pie").unwrap(), Some(vec![9, 9, 9]), None);
        assert!(store.lookup(&interest).is_none());
    }

    #[test]
    fn hash_restriction_takes_precedence_over_name() {
        let mut store = ContentStore::new(vec![1, 2, 3]);
        let object = co("lci:/apple/pie", b"hello");
        let hash = Message::ContentObject(object.clone()).content_object_hash();
        store.insert(object);

        let interest = Interest::new(Name::from_uri("lci:/some/other/name").unwrap(), None, Some(hash.to_vec()));
        let found = store.lookup(&interest).unwrap();
        assert_eq!(found.payload, Some(b"hello".to_vec()));
    }

    #[test]
    fn unknown_name_misses() {
        let store = ContentStore::new(vec![1, 2, 3]);
        let interest = Interest::new(Name::from_uri("lci:/nope").unwrap(), None, None);
        assert!(store.lookup(&interest).is_none());
    }
}
