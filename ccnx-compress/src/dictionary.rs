//! Static dictionary tables for the fixed-length and variable-length
//! compressors, built once and shared read-only for the process lifetime.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::trie::Trie;

/// One row of the fixed-length dictionary: a sequence of (T,L) pairs (as
/// raw bytes) that collapses to a single `compressed_key` byte in
/// `0x80..=0xFF`, plus the number of trailing value bytes that follow it.
pub struct FixedLengthEntry {
    pub token: &'static [u8],
    pub compressed_key: u8,
    pub value_length: u16,
}

/// Ported from the reference compressor's static table: common CCNx
/// (type, length) pairs for Interest/ContentObject/validation-algorithm
/// headers and a couple of compound multi-TLV prefixes.
const FIXED_LENGTH_ENTRIES: &[FixedLengthEntry] = &[
    FixedLengthEntry { token: &[0x00, 0x02, 0x00, 0x00], compressed_key: 0x80, value_length: 0x0000 },
    FixedLengthEntry { token: &[0x00, 0x02, 0x00, 0x04], compressed_key: 0x81, value_length: 0x0004 },
    FixedLengthEntry { token: &[0x00, 0x02, 0x00, 0x20], compressed_key: 0x82, value_length: 0x0020 },
    FixedLengthEntry { token: &[0x00, 0x03, 0x00, 0x04], compressed_key: 0x83, value_length: 0x0004 },
    FixedLengthEntry {
        token: &[0x00, 0x03, 0x00, 0x04, 0x00, 0x02, 0x00, 0x00, 0x00, 0x04, 0x00, 0x04],
        compressed_key: 0x84,
        value_length: 0x0004,
    },
    FixedLengthEntry { token: &[0x00, 0x03, 0x00, 0x0C], compressed_key: 0x85, value_length: 0x000C },
    FixedLengthEntry {
        token: &[0x00, 0x03, 0x00, 0x0C, 0x00, 0x04, 0x00, 0x08, 0x00, 0x09, 0x00, 0x04],
        compressed_key: 0x86,
        value_length: 0x0004,
    },
    FixedLengthEntry { token: &[0x00, 0x03, 0x00, 0x12], compressed_key: 0x87, value_length: 0x0012 },
    FixedLengthEntry {
        token: &[0x00, 0x03, 0x00, 0x14, 0x00, 0x04, 0x00, 0x10, 0x00, 0x09, 0x00, 0x04],
        compressed_key: 0x88,
        value_length: 0x0004,
    },
    FixedLengthEntry { token: &[0x00, 0x03, 0x00, 0x20], compressed_key: 0x89, value_length: 0x0020 },
    FixedLengthEntry { token: &[0x00, 0x04, 0x00, 0x04], compressed_key: 0x8B, value_length: 0x0004 },
    FixedLengthEntry { token: &[0x00, 0x04, 0x00, 0x0E], compressed_key: 0x8C, value_length: 0x000E },
    FixedLengthEntry { token: &[0x00, 0x04, 0x00, 0x10], compressed_key: 0x8D, value_length: 0x0010 },
    FixedLengthEntry { token: &[0x00, 0x04, 0x00, 0x14], compressed_key: 0x8E, value_length: 0x0014 },
    FixedLengthEntry { token: &[0x00, 0x05, 0x00, 0x01], compressed_key: 0x8F, value_length: 0x0001 },
    FixedLengthEntry { token: &[0x00, 0x06, 0x00, 0x08], compressed_key: 0x90, value_length: 0x0008 },
    FixedLengthEntry { token: &[0x00, 0x08, 0x00, 0x11], compressed_key: 0x91, value_length: 0x0011 },
    FixedLengthEntry { token: &[0x00, 0x09, 0x00, 0x04], compressed_key: 0x92, value_length: 0x0004 },
    FixedLengthEntry { token: &[0x00, 0x09, 0x00, 0x10], compressed_key: 0x93, value_length: 0x0010 },
    FixedLengthEntry { token: &[0x00, 0x09, 0x00, 0x20], compressed_key: 0x94, value_length: 0x0020 },
    FixedLengthEntry { token: &[0x00, 0x0B, 0x00, 0xA2], compressed_key: 0x95, value_length: 0x00A2 },
    FixedLengthEntry { token: &[0x00, 0x0F, 0x00, 0x08], compressed_key: 0x98, value_length: 0x0008 },
    FixedLengthEntry { token: &[0x00, 0x19, 0x00, 0x01], compressed_key: 0x99, value_length: 0x0001 },
    FixedLengthEntry { token: &[0x00, 0x19, 0x00, 0x02], compressed_key: 0x9A, value_length: 0x0002 },
    FixedLengthEntry { token: &[0x00, 0x19, 0x00, 0x04], compressed_key: 0x9B, value_length: 0x0004 },
];

pub fn fixed_length_trie() -> &'static Trie<&'static FixedLengthEntry> {
    static TRIE: OnceLock<Trie<&'static FixedLengthEntry>> = OnceLock::new();
    TRIE.get_or_init(|| {
        let mut trie = Trie::new();
        for entry in FIXED_LENGTH_ENTRIES {
            trie.insert(entry.token, entry);
        }
        trie
    })
}

pub fn fixed_length_by_key(key: u8) -> Option<&'static FixedLengthEntry> {
    static BY_KEY: OnceLock<HashMap<u8, &'static FixedLengthEntry>> = OnceLock::new();
    BY_KEY
        .get_or_init(|| FIXED_LENGTH_ENTRIES.iter().map(|e| (e.compressed_key, e)).collect())
        .get(&key)
        .copied()
}

pub fn is_fixed_length_key(byte0: u8) -> bool {
    byte0 & 0b1100_0000 == 0b1000_0000
}

/// The variable-length dictionary's two bit patterns: "A" packs a 3-bit
/// type code with a 4-bit length (`len < 16`); "B" packs a 4-bit type code
/// with a 9-bit length (`len < 512`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariablePattern {
    A,
    B,
}

#[derive(Clone, Copy)]
pub struct VariableLengthEntry {
    pub tlv_type: u16,
    pub pattern: VariablePattern,
    pub key: u8,
}

const VARIABLE_LENGTH_ENTRIES: &[VariableLengthEntry] = &[
    VariableLengthEntry { tlv_type: 0x0000, pattern: VariablePattern::A, key: 0x00 },
    VariableLengthEntry { tlv_type: 0x0001, pattern: VariablePattern::A, key: 0x10 },
    VariableLengthEntry { tlv_type: 0x0002, pattern: VariablePattern::A, key: 0x20 },
    VariableLengthEntry { tlv_type: 0x000A, pattern: VariablePattern::A, key: 0x30 },
    VariableLengthEntry { tlv_type: 0x0013, pattern: VariablePattern::A, key: 0x40 },
    VariableLengthEntry { tlv_type: 0x0000, pattern: VariablePattern::B, key: 0xC0 },
    VariableLengthEntry { tlv_type: 0x0001, pattern: VariablePattern::B, key: 0xC2 },
    VariableLengthEntry { tlv_type: 0x0002, pattern: VariablePattern::B, key: 0xC4 },
    VariableLengthEntry { tlv_type: 0x0003, pattern: VariablePattern::B, key: 0xC6 },
    VariableLengthEntry { tlv_type: 0x0004, pattern: VariablePattern::B, key: 0xC8 },
    VariableLengthEntry { tlv_type: 0x0005, pattern: VariablePattern::B, key: 0xCA },
    VariableLengthEntry { tlv_type: 0x0006, pattern: VariablePattern::B, key: 0xCC },
];

pub fn variable_length_by_type_pattern(tlv_type: u16, pattern: VariablePattern) -> Option<&'static VariableLengthEntry> {
    VARIABLE_LENGTH_ENTRIES
        .iter()
        .find(|e| e.tlv_type == tlv_type && e.pattern == pattern)
}

pub fn variable_length_by_key_a(masked_key: u8) -> Option<&'static VariableLengthEntry> {
    VARIABLE_LENGTH_ENTRIES
        .iter()
        .find(|e| e.pattern == VariablePattern::A && e.key == masked_key)
}

pub fn variable_length_by_key_b(masked_key: u8) -> Option<&'static VariableLengthEntry> {
    VARIABLE_LENGTH_ENTRIES
        .iter()
        .find(|e| e.pattern == VariablePattern::B && e.key == masked_key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trie::{Step, Walker};

    #[test]
    fn fixed_length_trie_longest_match() {
        let trie = fixed_length_trie();
        let mut walker = Walker::new(trie);
        for b in [0x00, 0x02, 0x00, 0x00] {
            assert_eq!(walker.next(b), Step::Match);
        }
        assert_eq!(walker.value().unwrap().compressed_key, 0x80);
    }
}
