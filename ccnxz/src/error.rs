//! The CLI's own error type, layered over every crate it touches — the same
//! `#[from]` stacking `ccnx-transport::Error` uses over `ccnx-wire`/`ccnx-tlv`.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Tlv(#[from] ccnx_tlv::Error),
    #[error(transparent)]
    Wire(#[from] ccnx_wire::Error),
    #[error(transparent)]
    Manifest(#[from] ccnx_manifest::Error),
    #[error(transparent)]
    Transport(#[from] ccnx_transport::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
