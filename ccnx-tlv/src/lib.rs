//! TLV primitives for CCNx 1.0: number encoding, the TLV tree itself, the
//! 8-byte fixed header, names, and the wire type-constant tables every other
//! `ccnx-*` crate builds on.

mod header;
mod name;
mod number;
mod tlv;
pub mod types;

pub use header::FixedHeader;
pub use name::Name;
pub use number::{array_to_number, number_to_array};
pub use tlv::Tlv;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    #[error("malformed TLV: {0}")]
    MalformedTlv(String),

    #[error("bad fixed header: {0}")]
    BadFixedHeader(String),

    #[error("unknown name segment label: {0}")]
    UnknownNameLabel(String),

    #[error("cannot remove the last segment of an empty name")]
    EmptyName,
}
