//! Whole-stream TLV compression: the encoder walks a linearized TLV tree and
//! substitutes dictionary keys for common `(type, length)` prefixes; the
//! decoder is the inverse primitive the [`ccnx_wire`] parser drives token by
//! token, since only the parser knows — by type dispatch — whether a given
//! TLV is a container (no value bytes follow) or terminal (`length` value
//! bytes follow, copied verbatim from the wire, never compressed).

use std::collections::VecDeque;

use ccnx_tlv::Tlv;

use crate::dictionary::{
    self, VariableLengthEntry, VariablePattern,
};
use crate::trie::{Step, Walker};
use crate::{Error, Result};

const PATTERN_3_4_MASK: u8 = 0x80;
const PATTERN_3_4: u8 = 0x00;
const PATTERN_4_9_MASK: u8 = 0xE0;
const PATTERN_4_9: u8 = 0xC0;
const PATTERN_15_5_MASK: u8 = 0xF0;
const PATTERN_15_5: u8 = 0xE0;
const PATTERN_16_10_MASK: u8 = 0xFC;
const PATTERN_16_10: u8 = 0xF8;
const PATTERN_16_16: u8 = 0xFF;

#[derive(Debug, Clone)]
enum FlatToken {
    Container { typ: u16, length: u16 },
    Terminal { typ: u16, value: Vec<u8> },
}

impl FlatToken {
    fn typ(&self) -> u16 {
        match self {
            FlatToken::Container { typ, .. } => *typ,
            FlatToken::Terminal { typ, .. } => *typ,
        }
    }

    fn length(&self) -> u16 {
        match self {
            FlatToken::Container { length, .. } => *length,
            FlatToken::Terminal { value, .. } => value.len() as u16,
        }
    }

    fn packed_tl(&self) -> [u8; 4] {
        let typ = self.typ();
        let len = self.length();
        [(typ >> 8) as u8, (typ & 0xFF) as u8, (len >> 8) as u8, (len & 0xFF) as u8]
    }

    fn value(&self) -> Option<&[u8]> {
        match self {
            FlatToken::Terminal { value, .. } => Some(value),
            FlatToken::Container { .. } => None,
        }
    }
}

fn linearize(tlvs: &[Tlv], out: &mut Vec<FlatToken>) {
    for t in tlvs {
        match t {
            Tlv::Container { typ, children } => {
                out.push(FlatToken::Container { typ: *typ, length: t.length() as u16 });
                linearize(children, out);
            }
            Tlv::Bytes { typ, value } => {
                out.push(FlatToken::Terminal { typ: *typ, value: value.clone() });
            }
        }
    }
}

/// Compresses a sibling list of TLVs (e.g. the header TLVs, or the body
/// TLVs of one packet) into the dictionary-substituted wire form.
pub fn compress_tlv_stream(tlvs: &[Tlv]) -> Vec<u8> {
    let mut tokens = VecDeque::new();
    {
        let mut flat = Vec::new();
        linearize(tlvs, &mut flat);
        tokens.extend(flat);
    }

    let mut out = Vec::new();
    while !tokens.is_empty() {
        if let Some(bytes) = try_fixed_length(&mut tokens) {
            out.extend(bytes);
        } else if let Some(bytes) = try_variable_length(&mut tokens) {
            out.extend(bytes);
        } else {
            out.extend(compact_one(&mut tokens));
        }
    }
    out
}

/// Greedy longest-prefix match against the fixed-length dictionary trie.
/// Consumes one or more leading tokens on a match; leaves `tokens` untouched
/// on no match at all.
fn try_fixed_length(tokens: &mut VecDeque<FlatToken>) -> Option<Vec<u8>> {
    let trie = dictionary::fixed_length_trie();
    let mut walker = Walker::new(trie);

    let mut committed = 0usize;
    let mut offset = 0usize;
    let mut best: Option<(usize, &'static dictionary::FixedLengthEntry)> = None;

    loop {
        let Some(tlv) = tokens.get(committed + offset) else { break };
        let mut no_match = false;
        for b in tlv.packed_tl() {
            if walker.next(b) == Step::NoMatch {
                no_match = true;
                break;
            }
        }
        if no_match {
            break;
        }
        offset += 1;
        if let Some(entry) = walker.value() {
            committed += offset;
            offset = 0;
            best = Some((committed, *entry));
        }
        if tlv.value().is_some() {
            break;
        }
    }

    best.map(|(total, entry)| {
        let mut out = vec![entry.compressed_key];
        if entry.value_length > 0 {
            if let Some(v) = tokens[total - 1].value() {
                out.extend_from_slice(v);
            }
        }
        tokens.drain(0..total);
        out
    })
}

fn try_variable_length(tokens: &mut VecDeque<FlatToken>) -> Option<Vec<u8>> {
    let tlv = tokens.front()?;
    let typ = tlv.typ();
    let length = tlv.length();

    let mut encoded = None;
    if length < 0x10 {
        if let Some(e) = dictionary::variable_length_by_type_pattern(typ, VariablePattern::A) {
            encoded = Some(vec![e.key | (length as u8)]);
        }
    }
    if encoded.is_none() && length < 0x200 {
        if let Some(e) = dictionary::variable_length_by_type_pattern(typ, VariablePattern::B) {
            let word = ((e.key as u16) << 8) | length;
            encoded = Some(vec![(word >> 8) as u8, (word & 0xFF) as u8]);
        }
    }

    encoded.map(|mut bytes| {
        if let Some(v) = tlv.value() {
            bytes.extend_from_slice(v);
        }
        tokens.pop_front();
        bytes
    })
}

/// No dictionary entry applies: encode the smallest compaction form that fits.
fn compact_one(tokens: &mut VecDeque<FlatToken>) -> Vec<u8> {
    let tlv = tokens.pop_front().expect("compact_one called on empty stream");
    let typ = tlv.typ();
    let length = tlv.length();

    let mut out = if length < 0x20 && typ < 0x8000 {
        vec![
            PATTERN_15_5 | ((typ >> 11) as u8),
            ((typ & 0x07FF) >> 3) as u8,
            (((typ & 0x7) as u8) << 5) | (length as u8),
        ]
    } else if length < 0x400 {
        vec![
            PATTERN_16_10 | ((typ >> 14) as u8),
            ((typ & 0x3FFF) >> 6) as u8,
            (((typ & 0x3F) as u8) << 2) | ((length >> 8) as u8),
            (length & 0xFF) as u8,
        ]
    } else {
        vec![PATTERN_16_16, (typ >> 8) as u8, (typ & 0xFF) as u8, (length >> 8) as u8, (length & 0xFF) as u8]
    };
    if let Some(v) = tlv.value() {
        out.extend_from_slice(v);
    }
    out
}

/// Decodes the next `(type, length)` token(s) from the front of a
/// compressed stream, advancing `input` past the consumed key bytes only —
/// never past the value bytes, which the caller reads separately once it
/// knows (via type dispatch) whether this TLV is a container or terminal.
///
/// A fixed-length dictionary hit can expand to more than one `(type,
/// length)` pair (a compound entry collapsing several nested containers);
/// callers buffer the extras exactly as [`ccnx_wire`]'s parser does.
pub fn decode_next_tl(input: &mut &[u8]) -> Result<Vec<(u16, u16)>> {
    if input.is_empty() {
        return Err(Error::MalformedPacket("empty compressed TL stream".into()));
    }
    let byte0 = input[0];

    if dictionary::is_fixed_length_key(byte0) {
        let entry = dictionary::fixed_length_by_key(byte0)
            .ok_or_else(|| Error::BadCompressedToken(format!("unknown fixed-length key {byte0:#04x}")))?;
        *input = &input[1..];
        let mut pairs = Vec::new();
        for chunk in entry.token.chunks_exact(4) {
            let typ = u16::from_be_bytes([chunk[0], chunk[1]]);
            let len = u16::from_be_bytes([chunk[2], chunk[3]]);
            pairs.push((typ, len));
        }
        return Ok(pairs);
    }

    if byte0 & PATTERN_3_4_MASK == PATTERN_3_4 {
        need(input, 1)?;
        let key = byte0 & 0xF0;
        let entry = variable_entry_a(key)?;
        let length = (byte0 & 0x0F) as u16;
        *input = &input[1..];
        return Ok(vec![(entry.tlv_type, length)]);
    }

    if byte0 & PATTERN_4_9_MASK == PATTERN_4_9 {
        need(input, 2)?;
        let key = byte0 & 0xFE;
        let entry = variable_entry_b(key)?;
        let length = (((byte0 & 0x01) as u16) << 8) | input[1] as u16;
        *input = &input[2..];
        return Ok(vec![(entry.tlv_type, length)]);
    }

    if byte0 & PATTERN_15_5_MASK == PATTERN_15_5 {
        need(input, 3)?;
        let (b0, b1, b2) = (input[0], input[1], input[2]);
        let typ = (((b0 & 0x0F) as u16) << 11) | ((b1 as u16) << 3) | ((b2 >> 5) as u16);
        let length = (b2 & 0x1F) as u16;
        *input = &input[3..];
        return Ok(vec![(typ, length)]);
    }

    if byte0 & PATTERN_16_10_MASK == PATTERN_16_10 {
        need(input, 4)?;
        let (b0, b1, b2, b3) = (input[0], input[1], input[2], input[3]);
        let typ = (((b0 & 0x03) as u16) << 14) | ((b1 as u16) << 6) | ((b2 >> 2) as u16);
        let length = (((b2 & 0x03) as u16) << 8) | b3 as u16;
        *input = &input[4..];
        return Ok(vec![(typ, length)]);
    }

    if byte0 == PATTERN_16_16 {
        need(input, 5)?;
        let typ = u16::from_be_bytes([input[1], input[2]]);
        let length = u16::from_be_bytes([input[3], input[4]]);
        *input = &input[5..];
        return Ok(vec![(typ, length)]);
    }

    Err(Error::BadCompressedToken(format!("leading byte {byte0:#04x}")))
}

fn need(input: &[u8], n: usize) -> Result<()> {
    if input.len() < n {
        Err(Error::MalformedPacket("truncated compressed TL token".into()))
    } else {
        Ok(())
    }
}

fn variable_entry_a(key: u8) -> Result<&'static VariableLengthEntry> {
    dictionary::variable_length_by_key_a(key)
        .ok_or_else(|| Error::BadCompressedToken(format!("unknown pattern-A key {key:#04x}")))
}

fn variable_entry_b(key: u8) -> Result<&'static VariableLengthEntry> {
    dictionary::variable_length_by_key_b(key)
        .ok_or_else(|| Error::BadCompressedToken(format!("unknown pattern-B key {key:#04x}")))
}

/// A small FIFO of decoded `(type, length)` pairs, refilled from the
/// compressed stream one dictionary hit at a time. Mirrors the reference
/// parser's `__decompressed` buffer: at most one [`decode_next_tl`] call is
/// outstanding at a time, so a compound dictionary entry's extra pairs are
/// available immediately without re-touching the wire.
#[derive(Debug, Default)]
pub struct TlBuffer {
    queue: VecDeque<(u16, u16)>,
}

impl TlBuffer {
    pub fn new() -> Self {
        TlBuffer { queue: VecDeque::new() }
    }

    pub fn next_type_length(&mut self, input: &mut &[u8]) -> Result<(u16, u16)> {
        if self.queue.is_empty() {
            let pairs = decode_next_tl(input)?;
            self.queue.extend(pairs);
        }
        self.queue
            .pop_front()
            .ok_or_else(|| Error::MalformedPacket("decompressor produced no TL pairs".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccnx_tlv::types;

    #[test]
    fn fixed_length_hit_round_trips_through_decode_next_tl() {
        let tlvs = vec![Tlv::bytes(types::body::OBJECT, vec![0xAA; 0x20])];
        let compressed = compress_tlv_stream(&tlvs);
        assert_eq!(compressed[0], 0x82);

        let mut cursor: &[u8] = &compressed;
        let (typ, len) = decode_next_tl(&mut cursor).unwrap();
        assert_eq!(typ, types::body::OBJECT);
        assert_eq!(len, 0x20);
        assert_eq!(cursor.len(), 0x20);
        assert_eq!(cursor, &[0xAA; 0x20][..]);
    }

    #[test]
    fn variable_length_pattern_a_round_trips() {
        let tlvs = vec![Tlv::bytes(types::name_segment::CHUNK, vec![0x00, 0x2A])];
        let compressed = compress_tlv_stream(&tlvs);
        assert_eq!(compressed.len(), 1 + 2);

        let mut cursor: &[u8] = &compressed;
        let (typ, len) = decode_next_tl(&mut cursor).unwrap();
        assert_eq!(typ, types::name_segment::CHUNK);
        assert_eq!(len, 2);
        assert_eq!(cursor, &[0x00, 0x2A][..]);
    }

    #[test]
    fn compaction_used_for_unknown_type() {
        let tlvs = vec![Tlv::bytes(0x7FFE, vec![0; 1])];
        let compressed = compress_tlv_stream(&tlvs);
        // length 1 < 0x20 and type 0x7FFE < 0x8000 -> 3-byte compaction + 1 value byte
        assert_eq!(compressed.len(), 4);

        let mut cursor: &[u8] = &compressed;
        let (typ, len) = decode_next_tl(&mut cursor).unwrap();
        assert_eq!(typ, 0x7FFE);
        assert_eq!(len, 1);
    }

    #[test]
    fn container_followed_by_child_preserves_order() {
        let child = Tlv::bytes(types::name_segment::NAME_SEGMENT, b"hi".to_vec());
        let name = Tlv::container(types::message::NAME, vec![child]);
        let compressed = compress_tlv_stream(&[name]);

        let mut cursor: &[u8] = &compressed;
        let (typ, len) = decode_next_tl(&mut cursor).unwrap();
        assert_eq!(typ, types::message::NAME);
        assert_eq!(len, 4 + 2);
        let (typ2, len2) = decode_next_tl(&mut cursor).unwrap();
        assert_eq!(typ2, types::name_segment::NAME_SEGMENT);
        assert_eq!(len2, 2);
        assert_eq!(cursor, b"hi");
    }
}
