//! Fixed-header compression: picks the smallest of several bit-packed
//! layouts for the 8-byte CCNx fixed header, gated behind a context-id
//! prefix (see [`crate::context_id`]).

use ccnx_tlv::FixedHeader;

use crate::context_id;
use crate::{Error, Result};

const COMPRESSED_BIT: u8 = 0x80;
const PATTERN_MASK: u8 = 0xE0;
const PATTERN_H8_L16_M8: u8 = 0x20;
const PATTERN_H0_L6_M8: u8 = 0x40;
const PATTERN_H5_L9_M0: u8 = 0x60;
const PATTERN_H5_L9_M8: u8 = 0x80;

/// Encodes the uncompressed 8-byte layout with the high bit of byte 0 left
/// clear — the form a decoder recognises without a context id at all.
pub fn encode_uncompressed(fh: &FixedHeader) -> [u8; 8] {
    fh.pack()
}

/// Chooses the smallest compressed layout for `fh` and prefixes it with the
/// framed `context_id`.
pub fn compress(fh: &FixedHeader, context_id: u8) -> Vec<u8> {
    let mut out = context_id::encode(context_id);
    let body = if fh.packet_type <= 7 && fh.reserved == 0 {
        if fh.header_length == 8 && fh.packet_length <= 0x3F {
            Some(compress_h0_l6_m8(fh))
        } else if fh.header_length <= 0x1F && fh.packet_length <= 0x1FF && fh.hop_limit == 0 {
            Some(compress_h5_l9_m0(fh))
        } else if fh.header_length <= 0x1F && fh.packet_length <= 0x1FF {
            Some(compress_h5_l9_m8(fh))
        } else {
            None
        }
    } else {
        None
    };
    out.extend(body.unwrap_or_else(|| compress_h8_l16_m8(fh)));
    out
}

fn compress_h8_l16_m8(fh: &FixedHeader) -> Vec<u8> {
    let mut packed = fh.pack().to_vec();
    packed[0] |= PATTERN_H8_L16_M8;
    packed
}

fn compress_h0_l6_m8(fh: &FixedHeader) -> Vec<u8> {
    let byte0 = PATTERN_H0_L6_M8 | (fh.version << 1) | (fh.packet_type >> 2);
    let byte1 = ((fh.packet_type & 0x3) << 6) | (fh.packet_length as u8 & 0x3F);
    let byte2 = fh.hop_limit;
    vec![byte0, byte1, byte2]
}

fn compress_h5_l9_m0(fh: &FixedHeader) -> Vec<u8> {
    let byte0 = PATTERN_H5_L9_M0 | (fh.version << 1) | (fh.packet_type >> 2);
    let byte1 = ((fh.packet_type & 0x7) << 6) | (fh.header_length << 1) | ((fh.packet_length >> 8) as u8);
    let byte2 = (fh.packet_length & 0xFF) as u8;
    vec![byte0, byte1, byte2]
}

fn compress_h5_l9_m8(fh: &FixedHeader) -> Vec<u8> {
    let byte0 = PATTERN_H5_L9_M8 | (fh.version << 1) | (fh.packet_type >> 2);
    let byte1 = ((fh.packet_type & 0x7) << 6) | (fh.header_length << 1) | ((fh.packet_length >> 8) as u8);
    let byte2 = (fh.packet_length & 0xFF) as u8;
    let byte3 = fh.hop_limit;
    vec![byte0, byte1, byte2, byte3]
}

/// Returns true when `byte0` marks an uncompressed fixed header (high bit
/// clear — no context id precedes it).
pub fn is_uncompressed(byte0: u8) -> bool {
    byte0 & COMPRESSED_BIT == 0
}

/// Decodes a fixed header starting at `input[0]`. `input[0]`'s high bit must
/// already have been checked with [`is_uncompressed`] by the caller to
/// choose this path over a plain 8-byte parse.
pub fn decompress(input: &[u8]) -> Result<(FixedHeader, usize)> {
    let (context_id, id_len) = context_id::decode(input)?;
    let rest = &input[id_len..];
    if rest.is_empty() {
        return Err(Error::MalformedPacket("truncated compressed fixed header".into()));
    }
    let pattern = rest[0] & PATTERN_MASK;
    let (fields, fh_len) = match pattern {
        PATTERN_H0_L6_M8 => (decompress_h0_l6_m8(rest)?, 3),
        PATTERN_H5_L9_M0 => (decompress_h5_l9_m0(rest)?, 3),
        PATTERN_H5_L9_M8 => (decompress_h5_l9_m8(rest)?, 4),
        PATTERN_H8_L16_M8 => (decompress_h8_l16_m8(rest)?, 8),
        _ => return Err(Error::BadCompressedToken(format!("pattern {pattern:#04x}"))),
    };
    let fh = FixedHeader::parse(&fields).map_err(|e| Error::MalformedPacket(e.to_string()))?;
    let _ = context_id;
    Ok((fh, id_len + fh_len))
}

fn need(rest: &[u8], n: usize) -> Result<()> {
    if rest.len() < n {
        Err(Error::MalformedPacket("truncated compressed fixed header".into()))
    } else {
        Ok(())
    }
}

fn decompress_h8_l16_m8(rest: &[u8]) -> Result<[u8; 8]> {
    need(rest, 8)?;
    let mut out = [0u8; 8];
    out.copy_from_slice(&rest[0..8]);
    out[0] &= !PATTERN_H8_L16_M8;
    Ok(out)
}

fn decompress_h0_l6_m8(rest: &[u8]) -> Result<[u8; 8]> {
    need(rest, 3)?;
    let byte0 = rest[0] & !PATTERN_H0_L6_M8;
    let byte1 = rest[1];
    let byte2 = rest[2];
    let version = byte0 >> 1;
    let packet_type = ((byte0 & 0x01) << 2) | (byte1 >> 6);
    let packet_length = (byte1 & 0x3F) as u16;
    let hop_limit = byte2;
    Ok(fixed_header_bytes(version, packet_type, packet_length, hop_limit, 0, 8))
}

fn decompress_h5_l9_m0(rest: &[u8]) -> Result<[u8; 8]> {
    need(rest, 3)?;
    let byte0 = rest[0] & !PATTERN_H5_L9_M0;
    let byte1 = rest[1];
    let byte2 = rest[2];
    let version = byte0 >> 1;
    let packet_type = ((byte0 & 0x01) << 2) | (byte1 >> 6);
    let header_length = (byte1 & 0x3F) >> 1;
    let packet_length = (((byte1 & 0x01) as u16) << 8) | byte2 as u16;
    Ok(fixed_header_bytes(version, packet_type, packet_length, 0, 0, header_length))
}

fn decompress_h5_l9_m8(rest: &[u8]) -> Result<[u8; 8]> {
    need(rest, 4)?;
    let byte0 = rest[0] & !PATTERN_H5_L9_M8;
    let byte1 = rest[1];
    let byte2 = rest[2];
    let byte3 = rest[3];
    let version = (byte0 & 0x1E) >> 1;
    let packet_type = ((byte0 & 0x01) << 2) | (byte1 >> 6);
    let header_length = (byte1 & 0x3F) >> 1;
    let packet_length = (((byte1 & 0x01) as u16) << 8) | byte2 as u16;
    let hop_limit = byte3;
    Ok(fixed_header_bytes(version, packet_type, packet_length, hop_limit, 0, header_length))
}

fn fixed_header_bytes(
    version: u8,
    packet_type: u8,
    packet_length: u16,
    hop_limit: u8,
    reserved: u16,
    header_length: u8,
) -> [u8; 8] {
    [
        version,
        packet_type,
        (packet_length >> 8) as u8,
        (packet_length & 0xFF) as u8,
        hop_limit,
        (reserved >> 8) as u8,
        (reserved & 0xFF) as u8,
        header_length,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccnx_tlv::types::packet;

    #[test]
    fn uncompressed_round_trip_via_highbit() {
        let fh = FixedHeader::new(packet::OBJECT, 45, 8);
        let bytes = encode_uncompressed(&fh);
        assert!(is_uncompressed(bytes[0]));
        assert_eq!(FixedHeader::parse(&bytes).unwrap(), fh);
    }

    #[test]
    fn compact_header_round_trips() {
        let fh = FixedHeader::new(packet::INTEREST, 51, 8);
        let compressed = compress(&fh, 3);
        assert!(!is_uncompressed(compressed[0]));
        let (decoded, consumed) = decompress(&compressed).unwrap();
        assert_eq!(decoded, fh);
        assert_eq!(consumed, compressed.len());
    }

    #[test]
    fn large_header_falls_back_to_h8_l16_m8() {
        let fh = FixedHeader::new(packet::OBJECT, 5000, 40);
        let compressed = compress(&fh, 10);
        let (decoded, consumed) = decompress(&compressed).unwrap();
        assert_eq!(decoded, fh);
        assert_eq!(consumed, compressed.len());
    }
}
