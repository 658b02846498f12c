//! CCNx 1.0 message assembly, signing, and parsing.
//!
//! [`message`] models an Interest/ContentObject as a tagged sum over the
//! [`ccnx_tlv::Tlv`] tree; [`signer`] loads an RSA key and appends the
//! validation-algorithm and signature TLVs; [`parser`] turns a wire
//! datagram, compressed or not, back into a [`message::Message`].

pub mod message;
pub mod parser;
pub mod signer;

pub use message::{ContentObject, Interest, LinkSection, Manifest, Message, Validation};
pub use parser::ParsedPacket;
pub use signer::{keyid_from_public_key_pem, verify, Signer};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Tlv(#[from] ccnx_tlv::Error),

    #[error(transparent)]
    Compress(#[from] ccnx_compress::Error),

    #[error("unknown top-level body TLV type {0:#06x}")]
    UnknownTopTlv(u16),

    #[error("message is missing a required {0} TLV")]
    MissingField(&'static str),

    #[error("key error: {0}")]
    Key(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
