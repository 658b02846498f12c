//! Interest and ContentObject messages: thin builders over [`ccnx_tlv::Tlv`]
//! that assemble the body-level TLV sequence spec.md describes, plus the
//! fixed header that frames it.
//!
//! A signed message is a *sequence* of top-level body TLVs — `T_OBJECT`
//! followed by `T_VALALG` and `T_VALPAY` as siblings, not children of
//! `T_OBJECT` — mirroring how the reference implementation's `CCNxMessage`
//! keeps `body_tlvs` a flat list that `sign()` appends to, rather than
//! re-nesting the validation TLVs inside the content object.

use ccnx_tlv::{types, FixedHeader, Name, Tlv};

use crate::{Error, Result};

/// A restriction-bearing request for content under a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interest {
    pub name: Name,
    pub keyid_restr: Option<Vec<u8>>,
    pub hash_restr: Option<Vec<u8>>,
}

impl Interest {
    pub fn new(name: Name, keyid_restr: Option<Vec<u8>>, hash_restr: Option<Vec<u8>>) -> Self {
        Interest { name, keyid_restr, hash_restr }
    }

    fn body_tlv(&self) -> Tlv {
        let mut children = vec![self.name.to_tlv()];
        if let Some(k) = &self.keyid_restr {
            children.push(Tlv::bytes(types::message::KEYID_RESTRICTION, k.clone()));
        }
        if let Some(h) = &self.hash_restr {
            children.push(Tlv::bytes(types::message::OBJECT_HASH_RESTRICTION, h.clone()));
        }
        Tlv::container(types::body::INTEREST, children)
    }
}

/// One section of a manifest: a starting chunk number plus the 32-byte
/// content-object hashes that follow it in ascending chunk order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LinkSection {
    pub start_chunk: u64,
    pub hashes: Vec<[u8; 32]>,
}

impl LinkSection {
    pub fn new(start_chunk: u64, hashes: Vec<[u8; 32]>) -> Self {
        LinkSection { start_chunk, hashes }
    }

    fn to_tlv(&self, typ: u16) -> Tlv {
        let mut hash_bytes = Vec::with_capacity(self.hashes.len() * 32);
        for h in &self.hashes {
            hash_bytes.extend_from_slice(h);
        }
        Tlv::container(
            typ,
            vec![
                Tlv::bytes(
                    types::manifest_section::START_CHUNK_NUMBER,
                    ccnx_tlv::number_to_array(self.start_chunk),
                ),
                Tlv::bytes(types::manifest_section::HASH_LIST, hash_bytes),
            ],
        )
    }

    fn from_tlv(tlv: &Tlv) -> Result<Self> {
        let children = tlv
            .as_children()
            .ok_or_else(|| Error::MissingField("manifest section children"))?;
        let mut start_chunk = None;
        let mut hashes = Vec::new();
        for child in children {
            match child.typ() {
                t if t == types::manifest_section::START_CHUNK_NUMBER => {
                    let bytes = child.as_bytes().ok_or(Error::MissingField("start chunk value"))?;
                    start_chunk = Some(ccnx_tlv::array_to_number(bytes)?);
                }
                t if t == types::manifest_section::HASH_LIST => {
                    let bytes = child.as_bytes().ok_or(Error::MissingField("hash list value"))?;
                    for chunk in bytes.chunks_exact(32) {
                        let mut h = [0u8; 32];
                        h.copy_from_slice(chunk);
                        hashes.push(h);
                    }
                }
                _ => {}
            }
        }
        Ok(LinkSection {
            start_chunk: start_chunk.ok_or(Error::MissingField("T_START_CHUNK_NUMBER"))?,
            hashes,
        })
    }
}

/// `T_MANIFEST`'s two sections: pointers to child manifests, pointers to
/// data objects.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Manifest {
    pub manifest_links: LinkSection,
    pub data_links: LinkSection,
}

impl Manifest {
    fn to_tlv(&self) -> Tlv {
        Tlv::container(
            types::message::MANIFEST,
            vec![
                self.manifest_links.to_tlv(types::manifest::MANIFEST_LINKS),
                self.data_links.to_tlv(types::manifest::DATA_LINKS),
            ],
        )
    }

    fn from_tlv(tlv: &Tlv) -> Result<Self> {
        let children = tlv.as_children().ok_or(Error::MissingField("manifest sections"))?;
        let mut manifest_links = None;
        let mut data_links = None;
        for child in children {
            match child.typ() {
                t if t == types::manifest::MANIFEST_LINKS => {
                    manifest_links = Some(LinkSection::from_tlv(child)?)
                }
                t if t == types::manifest::DATA_LINKS => data_links = Some(LinkSection::from_tlv(child)?),
                _ => {}
            }
        }
        Ok(Manifest {
            manifest_links: manifest_links.ok_or(Error::MissingField("T_MANIFEST_LINKS"))?,
            data_links: data_links.ok_or(Error::MissingField("T_DATA_LINKS"))?,
        })
    }
}

/// The RSA-SHA256 validation algorithm/payload pair a signed message
/// carries, exposed on a parsed (or freshly signed) [`ContentObject`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub keyid: Vec<u8>,
    pub public_key_der: Vec<u8>,
    pub signature: Vec<u8>,
}

/// A named, optionally signed reply carrying a payload and/or a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentObject {
    pub name: Name,
    pub expiry_millis: Option<u64>,
    pub payload: Option<Vec<u8>>,
    pub manifest: Option<Manifest>,
    pub validation: Option<Validation>,
}

impl ContentObject {
    pub fn new(name: Name, expiry_millis: Option<u64>, payload: Option<Vec<u8>>, manifest: Option<Manifest>) -> Self {
        ContentObject { name, expiry_millis, payload, manifest, validation: None }
    }

    fn body_tlv(&self) -> Tlv {
        let mut children = vec![self.name.to_tlv()];
        if let Some(e) = self.expiry_millis {
            children.push(Tlv::bytes(types::message::EXPIRY, ccnx_tlv::number_to_array(e)));
        }
        if let Some(p) = &self.payload {
            children.push(Tlv::bytes(types::message::PAYLOAD, p.clone()));
        }
        if let Some(m) = &self.manifest {
            children.push(m.to_tlv());
        }
        Tlv::container(types::body::OBJECT, children)
    }

    pub fn is_signed(&self) -> bool {
        self.validation.is_some()
    }
}

/// The `T_VALALG` container alone, without the `T_VALPAY` signature TLV that
/// depends on it. Exposed so the signer can append it to the signed region
/// before computing the signature it will carry.
pub(crate) fn valalg_tlv(keyid: &[u8], public_key_der: &[u8]) -> Tlv {
    let rsa_sha256 = Tlv::container(
        types::valalg::RSA_SHA256,
        vec![
            Tlv::bytes(types::valalg::KEYID, keyid.to_vec()),
            Tlv::bytes(types::valalg::PUBLIC_KEY, public_key_der.to_vec()),
        ],
    );
    Tlv::container(types::body::VALIDATION_ALG, vec![rsa_sha256])
}

fn validation_tlvs(v: &Validation) -> Vec<Tlv> {
    let valalg = valalg_tlv(&v.keyid, &v.public_key_der);
    let valpay = Tlv::bytes(types::body::VALIDATION_PAYLOAD, v.signature.clone());
    vec![valalg, valpay]
}

/// Either half of the CCNx wire protocol's request/reply pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Interest(Interest),
    ContentObject(ContentObject),
}

impl Message {
    pub(crate) fn body_tlvs(&self) -> Vec<Tlv> {
        match self {
            Message::Interest(i) => vec![i.body_tlv()],
            Message::ContentObject(co) => {
                let mut tlvs = vec![co.body_tlv()];
                if let Some(v) = &co.validation {
                    tlvs.extend(validation_tlvs(v));
                }
                tlvs
            }
        }
    }

    pub(crate) fn packet_type(&self) -> u8 {
        match self {
            Message::Interest(_) => ccnx_tlv::types::packet::INTEREST,
            Message::ContentObject(_) => ccnx_tlv::types::packet::OBJECT,
        }
    }

    pub fn name(&self) -> &Name {
        match self {
            Message::Interest(i) => &i.name,
            Message::ContentObject(co) => &co.name,
        }
    }

    /// Encodes the full uncompressed wire form: 8-byte fixed header (no
    /// header TLVs) followed by the linearized body TLVs.
    pub fn wire_bytes(&self) -> Vec<u8> {
        let mut body = Vec::new();
        for tlv in self.body_tlvs() {
            tlv.encode(&mut body);
        }
        let header_length = FixedHeader::LEN as u8;
        let packet_length = header_length as u16 + body.len() as u16;
        let fh = FixedHeader::new(self.packet_type(), packet_length, header_length);
        let mut out = Vec::with_capacity(packet_length as usize);
        out.extend_from_slice(&fh.pack());
        out.extend_from_slice(&body);
        out
    }

    /// Encodes the dictionary-compressed wire form under `context_id`: the
    /// fixed header compressed to its smallest layout, followed by the
    /// linearized body TLVs run through the trie substitution codec. Used
    /// by relays and transports that want the compact form directly,
    /// without a round trip through [`Self::wire_bytes`].
    pub fn compressed_wire_bytes(&self, context_id: u8) -> Vec<u8> {
        let body_tlvs = self.body_tlvs();
        let compressed_body = ccnx_compress::compress_tlv_stream(&body_tlvs);
        let header_length = FixedHeader::LEN as u8;
        let fh = FixedHeader::new(self.packet_type(), compressed_body.len() as u16, header_length);
        let mut out = ccnx_compress::compress_fixed_header(&fh, context_id);
        out.extend_from_slice(&compressed_body);
        out
    }

    /// SHA-256 over everything after the fixed header — the content-object
    /// hash used as an interest restriction. Defined for any message, but
    /// only meaningful for a (signed) content object.
    pub fn content_object_hash(&self) -> [u8; 32] {
        use sha2::{Digest, Sha256};
        let wire = self.wire_bytes();
        let body = &wire[FixedHeader::LEN..];
        let digest = Sha256::digest(body);
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        out
    }
}
