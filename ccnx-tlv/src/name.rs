//! CCNx names: an ordered list of typed segments under a `T_NAME` container.
//!
//! URI form is `lci:/seg1/seg2/.../segN`; a segment is either a bare byte
//! sequence (`T_NAMESEG`) or `LABEL=value` where `LABEL` is `CHUNK` or
//! `SERIAL` (both carried as big-endian numbers).

use std::hash::{Hash, Hasher};

use crate::tlv::Tlv;
use crate::{number, types, Error, Result};

#[derive(Debug, Clone, Eq)]
pub struct Name {
    segments: Vec<Tlv>,
}

impl Name {
    pub fn new() -> Self {
        Name { segments: Vec::new() }
    }

    pub fn from_segments(segments: Vec<Tlv>) -> Self {
        Name { segments }
    }

    /// Parses `lci:/seg1/seg2` (a leading `lci://` is accepted too). Fails
    /// with `UnknownNameLabel` on an unrecognised `LABEL=value` label.
    pub fn from_uri(uri: &str) -> Result<Self> {
        let rest = uri.strip_prefix("lci:").unwrap_or(uri);
        let rest = rest.trim_start_matches('/');
        let mut name = Name::new();
        if rest.is_empty() {
            return Ok(name);
        }
        for part in rest.split('/') {
            if part.is_empty() {
                continue;
            }
            match part.split_once('=') {
                Some((label, value)) => match label.to_ascii_uppercase().as_str() {
                    "CHUNK" => {
                        let n: u64 = value
                            .parse()
                            .map_err(|_| Error::UnknownNameLabel(format!("CHUNK={value}")))?;
                        name.segments
                            .push(Tlv::bytes(types::name_segment::CHUNK, number::number_to_array(n)));
                    }
                    "SERIAL" => {
                        let n: u64 = value
                            .parse()
                            .map_err(|_| Error::UnknownNameLabel(format!("SERIAL={value}")))?;
                        name.segments.push(Tlv::bytes(
                            types::name_segment::SERIAL,
                            number::number_to_array(n),
                        ));
                    }
                    other => return Err(Error::UnknownNameLabel(other.to_string())),
                },
                None => {
                    name.segments.push(Tlv::bytes(
                        types::name_segment::NAME_SEGMENT,
                        part.as_bytes().to_vec(),
                    ));
                }
            }
        }
        Ok(name)
    }

    /// Builds a new name from `base` with `chunk_number` written as the
    /// trailing `T_CHUNK` segment.
    pub fn from_name_with_chunk(base: &Name, chunk_number: u64) -> Self {
        let mut name = base.clone();
        name.set_chunk_number(chunk_number);
        name
    }

    pub fn append_segment(&mut self, typ: u16, value: Vec<u8>) {
        self.segments.push(Tlv::bytes(typ, value));
    }

    pub fn remove_last(&mut self) -> Result<()> {
        if self.segments.is_empty() {
            return Err(Error::EmptyName);
        }
        self.segments.pop();
        Ok(())
    }

    pub fn get_segment(&self, index: usize) -> Option<&Tlv> {
        self.segments.get(index)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Defined only when the last segment is `T_CHUNK`.
    pub fn chunk_number(&self) -> Option<u64> {
        match self.segments.last() {
            Some(Tlv::Bytes { typ, value }) if *typ == types::name_segment::CHUNK => {
                number::array_to_number(value).ok()
            }
            _ => None,
        }
    }

    /// Replaces a trailing `T_CHUNK` segment if present, else appends one.
    pub fn set_chunk_number(&mut self, chunk_number: u64) {
        if matches!(self.segments.last(), Some(Tlv::Bytes { typ, .. }) if *typ == types::name_segment::CHUNK)
        {
            self.segments.pop();
        }
        self.segments.push(Tlv::bytes(
            types::name_segment::CHUNK,
            number::number_to_array(chunk_number),
        ));
    }

    pub fn to_tlv(&self) -> Tlv {
        Tlv::container(types::message::NAME, self.segments.clone())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_tlv().to_bytes()
    }
}

impl Default for Name {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_bytes().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_from_uri_matches_scenario_1() {
        let name = Name::from_uri("lci:/apple/pie").unwrap();
        let expected: Vec<u8> = vec![
            0x00, 0x00, 0x00, 0x10, 0x00, 0x01, 0x00, 0x05, 0x61, 0x70, 0x70, 0x6c, 0x65, 0x00,
            0x01, 0x00, 0x03, 0x70, 0x69, 0x65,
        ];
        assert_eq!(name.to_bytes(), expected);
    }

    #[test]
    fn chunk_number_round_trips() {
        let mut name = Name::from_uri("lci:/apple/pie").unwrap();
        assert_eq!(name.chunk_number(), None);
        name.set_chunk_number(42);
        assert_eq!(name.chunk_number(), Some(42));
        name.set_chunk_number(43);
        assert_eq!(name.chunk_number(), Some(43));
        assert_eq!(name.len(), 3);
    }

    #[test]
    fn unknown_label_fails() {
        assert!(Name::from_uri("lci:/FOO=bar").is_err());
    }

    #[test]
    fn remove_last_on_empty_fails() {
        let mut name = Name::new();
        assert!(matches!(name.remove_last(), Err(Error::EmptyName)));
    }

    #[test]
    fn equality_is_wire_equality() {
        let a = Name::from_uri("lci:/apple/pie").unwrap();
        let b = Name::from_uri("lci:/apple/pie").unwrap();
        assert_eq!(a, b);
    }
}
