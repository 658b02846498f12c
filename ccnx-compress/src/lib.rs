//! Dictionary-based compression codec for the CCNx 1.0 wire format.
//!
//! Re-encodes a parsed packet (fixed header + linearized TLV stream) into a
//! smaller wire form by substituting common `(type, length)` prefixes with a
//! single dictionary byte, and decompresses the substituted stream back into
//! plain `(type, length, value)` TLV bytes a [`ccnx_wire`] parser can read as
//! if it had never been compressed.

pub mod context_id;
pub mod crc;
pub mod dictionary;
mod fixed_header;
mod stream;
mod trie;

pub use fixed_header::{compress as compress_fixed_header, decompress as decompress_fixed_header, is_uncompressed};
pub use stream::{compress_tlv_stream, decode_next_tl, TlBuffer};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("malformed compressed packet: {0}")]
    MalformedPacket(String),

    #[error("unrecognised compressed token: {0}")]
    BadCompressedToken(String),

    #[error("context-id CRC mismatch")]
    BadContextIdCrc,

    #[error(transparent)]
    Tlv(#[from] ccnx_tlv::Error),
}
