//! Recursive-descent parser for a CCNx 1.0 wire datagram, compressed or not.
//!
//! Mirrors the reference parser's per-context methods (`__parse_message`,
//! `__parse_name`, `__parse_manifest`, `__parse_validation_alg`): each
//! nested level knows exactly which child types it expects and whether
//! they recurse further or are read as a raw value. A declared `length` is
//! honored as a byte budget for ending that level's loop, not as a literal
//! byte-range to slice — the only bytes ever sliced directly out of the
//! wire are a terminal TLV's own value, which the compressor always leaves
//! uncompressed immediately after the (possibly substituted) key bytes.

use ccnx_compress::TlBuffer;
use ccnx_tlv::{array_to_number, types, FixedHeader, Name};

use crate::message::{ContentObject, Interest, LinkSection, Manifest, Message, Validation};
use crate::{Error, Result};

/// The result of parsing one datagram: the message itself, plus whether the
/// wire form it came from was dictionary-compressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPacket {
    pub message: Message,
    pub was_compressed: bool,
}

/// Parses a complete datagram (fixed header + body), compressed or plain.
pub fn parse(wire: &[u8]) -> Result<ParsedPacket> {
    if wire.is_empty() {
        return Err(Error::Tlv(ccnx_tlv::Error::MalformedTlv("empty packet".into())));
    }

    let (fh, header_consumed, was_compressed) = if ccnx_compress::is_uncompressed(wire[0]) {
        let fh = FixedHeader::parse(wire)?;
        (fh, FixedHeader::LEN, false)
    } else {
        let (fh, consumed) = ccnx_compress::decompress_fixed_header(wire)?;
        (fh, consumed, true)
    };

    if wire.len() < header_consumed {
        return Err(Error::Tlv(ccnx_tlv::Error::MalformedTlv("truncated fixed header".into())));
    }
    let header_tlv_len = fh.header_length as usize;
    // Header TLVs are not part of this dialect's wire format; skip over any
    // bytes a peer might have inserted between the fixed header and the
    // body rather than trying to interpret them.
    let body_start = if header_tlv_len > FixedHeader::LEN {
        header_consumed + (header_tlv_len - FixedHeader::LEN)
    } else {
        header_consumed
    };
    if wire.len() < body_start {
        return Err(Error::Tlv(ccnx_tlv::Error::MalformedTlv("truncated header TLVs".into())));
    }
    let body = &wire[body_start..];

    let message = if was_compressed {
        parse_body(&mut Cursor::compressed(body))?
    } else {
        parse_body(&mut Cursor::plain(body))?
    };

    Ok(ParsedPacket { message, was_compressed })
}

/// A source of `(type, length)` tokens plus the raw value bytes that follow
/// a terminal one, abstracting over whether the underlying bytes are plain
/// TLV or dictionary-compressed.
enum Cursor<'a> {
    Plain { input: &'a [u8] },
    Compressed { input: &'a [u8], buf: TlBuffer },
}

impl<'a> Cursor<'a> {
    fn plain(input: &'a [u8]) -> Self {
        Cursor::Plain { input }
    }

    fn compressed(input: &'a [u8]) -> Self {
        Cursor::Compressed { input, buf: TlBuffer::new() }
    }

    fn has_more(&self) -> bool {
        match self {
            Cursor::Plain { input } => !input.is_empty(),
            Cursor::Compressed { input, .. } => !input.is_empty(),
        }
    }

    fn next_tl(&mut self) -> Result<(u16, u16)> {
        match self {
            Cursor::Plain { input } => {
                if input.len() < 4 {
                    return Err(Error::Tlv(ccnx_tlv::Error::MalformedTlv(
                        "fewer than 4 bytes for a TL token".into(),
                    )));
                }
                let typ = u16::from_be_bytes([input[0], input[1]]);
                let len = u16::from_be_bytes([input[2], input[3]]);
                *input = &input[4..];
                Ok((typ, len))
            }
            Cursor::Compressed { input, buf } => Ok(buf.next_type_length(input)?),
        }
    }

    fn take_value(&mut self, len: u16) -> Result<Vec<u8>> {
        let len = len as usize;
        let input = match self {
            Cursor::Plain { input } => input,
            Cursor::Compressed { input, .. } => input,
        };
        if input.len() < len {
            return Err(Error::Tlv(ccnx_tlv::Error::MalformedTlv(format!(
                "value of {len} bytes exceeds remaining {} bytes",
                input.len()
            ))));
        }
        let value = input[..len].to_vec();
        *input = &input[len..];
        Ok(value)
    }
}

fn parse_body(cursor: &mut Cursor) -> Result<Message> {
    let (top_typ, top_len) = cursor.next_tl()?;

    let message = match top_typ {
        t if t == types::body::INTEREST => Message::Interest(parse_interest(cursor, top_len)?),
        t if t == types::body::OBJECT => Message::ContentObject(parse_content_object(cursor, top_len)?),
        other => return Err(Error::UnknownTopTlv(other)),
    };

    if !cursor.has_more() {
        return Ok(message);
    }

    let (valalg_typ, valalg_len) = cursor.next_tl()?;
    if valalg_typ != types::body::VALIDATION_ALG {
        return Err(Error::UnknownTopTlv(valalg_typ));
    }
    let (keyid, public_key_der) = parse_validation_alg(cursor, valalg_len)?;

    let (valpay_typ, valpay_len) = cursor.next_tl()?;
    if valpay_typ != types::body::VALIDATION_PAYLOAD {
        return Err(Error::UnknownTopTlv(valpay_typ));
    }
    let signature = cursor.take_value(valpay_len)?;

    match message {
        Message::ContentObject(mut co) => {
            co.validation = Some(Validation { keyid, public_key_der, signature });
            Ok(Message::ContentObject(co))
        }
        Message::Interest(_) => Err(Error::Key("an interest must not carry a validation section".into())),
    }
}

fn parse_interest(cursor: &mut Cursor, declared_len: u16) -> Result<Interest> {
    let mut name = None;
    let mut keyid_restr = None;
    let mut hash_restr = None;

    let mut consumed = 0u32;
    while consumed < declared_len as u32 {
        let (typ, len) = cursor.next_tl()?;
        consumed += 4 + len as u32;
        match typ {
            t if t == types::message::NAME => name = Some(parse_name(cursor, len)?),
            t if t == types::message::KEYID_RESTRICTION => keyid_restr = Some(cursor.take_value(len)?),
            t if t == types::message::OBJECT_HASH_RESTRICTION => hash_restr = Some(cursor.take_value(len)?),
            _ => {
                cursor.take_value(len)?;
            }
        }
    }

    Ok(Interest {
        name: name.ok_or(Error::MissingField("T_NAME"))?,
        keyid_restr,
        hash_restr,
    })
}

fn parse_content_object(cursor: &mut Cursor, declared_len: u16) -> Result<ContentObject> {
    let mut name = None;
    let mut expiry_millis = None;
    let mut payload = None;
    let mut manifest = None;

    let mut consumed = 0u32;
    while consumed < declared_len as u32 {
        let (typ, len) = cursor.next_tl()?;
        consumed += 4 + len as u32;
        match typ {
            t if t == types::message::NAME => name = Some(parse_name(cursor, len)?),
            t if t == types::message::EXPIRY => {
                expiry_millis = Some(array_to_number(&cursor.take_value(len)?)?)
            }
            t if t == types::message::PAYLOAD => payload = Some(cursor.take_value(len)?),
            t if t == types::message::MANIFEST => manifest = Some(parse_manifest(cursor, len)?),
            _ => {
                cursor.take_value(len)?;
            }
        }
    }

    Ok(ContentObject {
        name: name.ok_or(Error::MissingField("T_NAME"))?,
        expiry_millis,
        payload,
        manifest,
        validation: None,
    })
}

fn parse_name(cursor: &mut Cursor, declared_len: u16) -> Result<Name> {
    let mut name = Name::new();
    let mut consumed = 0u32;
    while consumed < declared_len as u32 {
        let (typ, len) = cursor.next_tl()?;
        consumed += 4 + len as u32;
        let value = cursor.take_value(len)?;
        name.append_segment(typ, value);
    }
    Ok(name)
}

fn parse_manifest(cursor: &mut Cursor, declared_len: u16) -> Result<Manifest> {
    let mut manifest_links = None;
    let mut data_links = None;

    let mut consumed = 0u32;
    while consumed < declared_len as u32 {
        let (typ, len) = cursor.next_tl()?;
        consumed += 4 + len as u32;
        match typ {
            t if t == types::manifest::MANIFEST_LINKS => {
                manifest_links = Some(parse_manifest_section(cursor, len)?)
            }
            t if t == types::manifest::DATA_LINKS => data_links = Some(parse_manifest_section(cursor, len)?),
            _ => {
                cursor.take_value(len)?;
            }
        }
    }

    Ok(Manifest {
        manifest_links: manifest_links.ok_or(Error::MissingField("T_MANIFEST_LINKS"))?,
        data_links: data_links.ok_or(Error::MissingField("T_DATA_LINKS"))?,
    })
}

fn parse_manifest_section(cursor: &mut Cursor, declared_len: u16) -> Result<LinkSection> {
    let mut start_chunk = None;
    let mut hashes = Vec::new();

    let mut consumed = 0u32;
    while consumed < declared_len as u32 {
        let (typ, len) = cursor.next_tl()?;
        consumed += 4 + len as u32;
        match typ {
            t if t == types::manifest_section::START_CHUNK_NUMBER => {
                start_chunk = Some(array_to_number(&cursor.take_value(len)?)?)
            }
            t if t == types::manifest_section::HASH_LIST => {
                let bytes = cursor.take_value(len)?;
                for chunk in bytes.chunks_exact(types::HASH_LEN) {
                    let mut h = [0u8; 32];
                    h.copy_from_slice(chunk);
                    hashes.push(h);
                }
            }
            _ => {
                cursor.take_value(len)?;
            }
        }
    }

    Ok(LinkSection {
        start_chunk: start_chunk.ok_or(Error::MissingField("T_START_CHUNK_NUMBER"))?,
        hashes,
    })
}

/// Parses the one nested algorithm token T_VALALG carries (only RSA-SHA256
/// is recognised), returning `(keyid, public_key_der)`.
fn parse_validation_alg(cursor: &mut Cursor, declared_len: u16) -> Result<(Vec<u8>, Vec<u8>)> {
    let mut consumed = 0u32;
    let mut result = None;
    while consumed < declared_len as u32 {
        let (typ, len) = cursor.next_tl()?;
        consumed += 4 + len as u32;
        if typ == types::valalg::RSA_SHA256 {
            result = Some(parse_rsa_sha256_body(cursor, len)?);
        } else {
            cursor.take_value(len)?;
        }
    }
    result.ok_or_else(|| Error::Key("only RSA-SHA256 validation is supported".into()))
}

fn parse_rsa_sha256_body(cursor: &mut Cursor, declared_len: u16) -> Result<(Vec<u8>, Vec<u8>)> {
    let mut keyid = None;
    let mut public_key_der = None;

    let mut consumed = 0u32;
    while consumed < declared_len as u32 {
        let (typ, len) = cursor.next_tl()?;
        consumed += 4 + len as u32;
        match typ {
            t if t == types::valalg::KEYID => keyid = Some(cursor.take_value(len)?),
            t if t == types::valalg::PUBLIC_KEY => public_key_der = Some(cursor.take_value(len)?),
            _ => {
                cursor.take_value(len)?;
            }
        }
    }

    Ok((
        keyid.ok_or(Error::MissingField("T_KEYID"))?,
        public_key_der.ok_or(Error::MissingField("T_PUBLIC_KEY"))?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Interest as WireInterest;

    #[test]
    fn round_trips_plain_interest() {
        let name = Name::from_uri("lci:/apple/pie").unwrap();
        let interest = WireInterest::new(name, Some(vec![1, 2, 3]), None);
        let wire = Message::Interest(interest.clone()).wire_bytes();

        let parsed = parse(&wire).unwrap();
        assert!(!parsed.was_compressed);
        assert_eq!(parsed.message, Message::Interest(interest));
    }

    #[test]
    fn round_trips_plain_content_object_with_manifest() {
        let name = Name::from_uri("lci:/apple/pie").unwrap();
        let manifest = Manifest {
            manifest_links: LinkSection::new(0, vec![]),
            data_links: LinkSection::new(1, vec![[0x11u8; 32], [0x22u8; 32]]),
        };
        let co = ContentObject::new(name, Some(500), None, Some(manifest));
        let wire = Message::ContentObject(co.clone()).wire_bytes();

        let parsed = parse(&wire).unwrap();
        assert_eq!(parsed.message, Message::ContentObject(co));
    }

    #[test]
    fn round_trips_compressed_interest() {
        let name = Name::from_uri("lci:/apple/pie").unwrap();
        let interest = WireInterest::new(name, None, Some(vec![0xAB; 32]));
        let message = Message::Interest(interest.clone());

        let body_tlvs = message.body_tlvs();
        let compressed_body = ccnx_compress::compress_tlv_stream(&body_tlvs);
        let fh = FixedHeader::new(message.packet_type(), compressed_body.len() as u16, FixedHeader::LEN as u8);
        let mut wire = ccnx_compress::compress_fixed_header(&fh, 1);
        wire.extend_from_slice(&compressed_body);

        let parsed = parse(&wire).unwrap();
        assert!(parsed.was_compressed);
        assert_eq!(parsed.message, Message::Interest(interest));
    }

    #[test]
    fn unknown_top_level_type_is_rejected() {
        let bytes: Vec<u8> = vec![1, 2, 0, 12, 0, 0, 0, 8, 0x09, 0x00, 0, 4, 1, 2, 3, 4];
        assert!(matches!(parse(&bytes), Err(Error::UnknownTopTlv(0x0900))));
    }
}
