//! Byte-budget sizing: how many data bytes fit in one chunk, how many
//! manifest/data links fit in one manifest, and how many manifests a tree
//! of a given size needs.
//!
//! Ported from the reference builder's `__chunk_overhead` /
//! `__internal_manifest_size` / `__root_manifest_size` /
//! `__calculate_manifest_count`, following spec.md's description of the
//! per-section overhead (one subtraction of the manifest/data-links header
//! and start-chunk TLV per section, not the reference implementation's
//! apparent double count).

use ccnx_tlv::{types, Name};
use ccnx_wire::Signer;

use crate::Error;

/// Hard-coded cap on how many manifest-link children a manifest may carry,
/// independent of the chunk budget — the reference builder's `__fanount`.
/// Kept as a fixed constant rather than derived, per spec.md's open
/// question: the source hard-codes it and gives no rule for deriving it.
pub const MANIFEST_LINK_FANOUT_CAP: usize = 4;

const HASH_LEN: usize = types::HASH_LEN;
/// 4-byte section header (T_MANIFEST_LINKS or T_DATA_LINKS) plus the 7-byte
/// T_START_CHUNK_NUMBER TLV (4-byte header + up to 3-byte value) that opens
/// every link section.
const SECTION_HEADER_LEN: usize = 4 + 7;
const MIN_LINK_SECTION_LEN: usize = HASH_LEN + 4;

/// `(manifest_fanout, data_fanout)` link capacity for one manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManifestStructure {
    pub manifest_fanout: usize,
    pub data_fanout: usize,
}

/// Fixed per-content-object overhead: 8-byte fixed header, 4-byte
/// `T_OBJECT` header, the base name's encoded length, a 12-byte `T_EXPIRY`
/// TLV (4-byte header + the 8-byte width `number_to_array` produces for a
/// millisecond epoch timestamp), and a 4-byte `T_PAYLOAD` header.
pub fn chunk_overhead(name: &Name) -> usize {
    let fixed_header_len = 8;
    let t_object_header_len = 4;
    let expiry_tlv_len = 12;
    let payload_header_len = 4;
    fixed_header_len + t_object_header_len + name.to_bytes().len() + expiry_tlv_len + payload_header_len
}

/// How many payload bytes fit in one data chunk at budget `chunk_size`,
/// reserving 3 bytes for the trailing `T_CHUNK` segment the name doesn't
/// carry yet.
pub fn data_bytes_per_chunk(chunk_size: usize, name: &Name) -> crate::Result<usize> {
    let overhead = chunk_overhead(name) + 3;
    chunk_size
        .checked_sub(overhead)
        .filter(|n| *n > 0)
        .ok_or(Error::ChunkTooLarge { budget: chunk_size, overhead })
}

/// `ceil(data_len / data_bytes_per_chunk)`, failing with `TooManyChunks`
/// at or beyond 2^24 chunks (the 3-byte chunk-number budget this builder
/// assumes).
pub fn chunk_count(data_len: usize, bytes_per_chunk: usize) -> crate::Result<u64> {
    if data_len == 0 {
        return Ok(0);
    }
    let count = ((data_len - 1) / bytes_per_chunk) as u64 + 1;
    if count >= (1u64 << 24) {
        return Err(Error::TooManyChunks(count));
    }
    Ok(count)
}

/// Capacity of an internal (non-root) manifest at byte budget `available`:
/// subtract this content object's fixed overhead, then pack the manifest
/// link section (capped at [`MANIFEST_LINK_FANOUT_CAP`]), then the data
/// link section with whatever remains.
pub fn internal_manifest_capacity(available: usize, name: &Name) -> crate::Result<ManifestStructure> {
    let overhead = chunk_overhead(name);
    let mut available = available
        .checked_sub(overhead)
        .ok_or(Error::ChunkTooLarge { budget: available, overhead })?;

    available = available.checked_sub(SECTION_HEADER_LEN).unwrap_or(0);
    let manifest_fanout = if available >= MIN_LINK_SECTION_LEN {
        (available / HASH_LEN).min(MANIFEST_LINK_FANOUT_CAP)
    } else {
        0
    };
    available = available.saturating_sub(manifest_fanout * HASH_LEN);

    available = available.checked_sub(SECTION_HEADER_LEN).unwrap_or(0);
    let data_fanout = if available >= MIN_LINK_SECTION_LEN { available / HASH_LEN } else { 0 };

    Ok(ManifestStructure { manifest_fanout, data_fanout })
}

/// Capacity of the root manifest: like [`internal_manifest_capacity`], but
/// first subtracts the validation section's overhead (`T_VALALG` +
/// `T_RSA_SHA256` containers, the 32-byte KeyId TLV, the public key's DER
/// bytes, and the `T_VALPAY` TLV plus the RSA signature itself).
pub fn root_manifest_capacity(chunk_size: usize, name: &Name, signer: &Signer) -> crate::Result<ManifestStructure> {
    let der_len = signer.public_key_der().len();
    let sig_len = signer.sign_bytes(&[0u8; HASH_LEN])?.len();
    // T_VALALG + T_RSA_SHA256 container headers (8), T_KEYID header + 32-byte
    // keyid (36), T_VALPAY header (4).
    let validation_overhead = 8 + 36 + 4 + der_len + sig_len;
    let available = chunk_size
        .checked_sub(validation_overhead)
        .ok_or(Error::ChunkTooLarge { budget: chunk_size, overhead: validation_overhead })?;
    internal_manifest_capacity(available, name)
}

/// Computes `(manifest_count, chunk_count)`: how many data chunks the
/// payload needs and how many manifests it takes to link them all, walking
/// fanout-sized bites out of `chunk_count` starting with the root's data
/// fanout and then the internal structure's for every manifest after it.
pub fn calculate_manifest_count(
    chunk_size: usize,
    data_len: usize,
    name: &Name,
    signer: &Signer,
) -> crate::Result<(u64, u64, ManifestStructure, ManifestStructure)> {
    let per_chunk = data_bytes_per_chunk(chunk_size, name)?;
    let mut remaining = chunk_count(data_len, per_chunk)?;

    let root = root_manifest_capacity(chunk_size, name, signer)?;
    let internal = internal_manifest_capacity(chunk_size, name)?;

    // A root manifest with no data fanout at all is legal — it holds only
    // manifest links and every data chunk hangs off an internal manifest
    // instead. Only a genuine no-progress case (neither root nor internal
    // can ever carry a data link) is an error.
    if root.data_fanout == 0 && internal.data_fanout == 0 {
        return Err(Error::ChunkTooLarge { budget: chunk_size, overhead: chunk_overhead(name) });
    }

    let mut manifest_count = 0u64;
    loop {
        let data_fanout = if manifest_count == 0 { root.data_fanout } else { internal.data_fanout } as u64;
        manifest_count += 1;
        remaining = remaining.saturating_sub(data_fanout);
        if remaining == 0 {
            break;
        }
    }

    Ok((manifest_count, chunk_count(data_len, per_chunk)?, root, internal))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_signer() -> Signer {
        use pkcs8::EncodePrivateKey;
        use rsa::RsaPrivateKey;

        let mut rng = rand::rngs::OsRng;
        let private_key = RsaPrivateKey::new(&mut rng, 2048).expect("key generation");
        let pem = private_key.to_pkcs8_pem(Default::default()).expect("pkcs8 encode").to_string();
        Signer::from_pkcs8_pem(&pem).expect("signer load")
    }

    #[test]
    fn chunk_overhead_matches_manual_count() {
        let name = Name::from_uri("lci:/apple/bananna").unwrap();
        // 8 fixed header + 4 T_OBJECT + 24 name (4 + 9 + 11) + 12 expiry + 4 payload header
        assert_eq!(chunk_overhead(&name), 52);
    }

    #[test]
    fn manifest_count_small_payload_is_one_manifest() {
        let name = Name::from_uri("lci:/apple/bananna").unwrap();
        let signer = test_signer();
        let data_len = 384;
        let (manifest_count, _, root, internal) =
            calculate_manifest_count(1500, data_len, &name, &signer).unwrap();
        assert!(root.manifest_fanout > 0);
        assert!(root.data_fanout > 0);
        assert!(internal.manifest_fanout > 0);
        assert!(internal.data_fanout > 0);
        assert_eq!(manifest_count, 1);
    }

    #[test]
    fn manifest_count_matches_scenario_5() {
        let name = Name::from_uri("lci:/apple/bananna").unwrap();
        let signer = test_signer();
        let (manifest_count, _, _, _) = calculate_manifest_count(700, 10000, &name, &signer).unwrap();
        assert_eq!(manifest_count, 3);
    }

    #[test]
    fn too_many_chunks_is_rejected() {
        let name = Name::from_uri("lci:/x").unwrap();
        let per_chunk = 10usize;
        assert!(matches!(
            chunk_count((1usize << 24) * per_chunk, per_chunk),
            Err(Error::TooManyChunks(_))
        ));
    }
}
