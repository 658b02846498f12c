//! The request/response transport pipeline around a CCNx 1.0 socket:
//! a publisher-side [`store::ContentStore`] and lookup, a consumer-side
//! [`flow_controller::FlowController`] and [`manifest_processor::ManifestProcessor`],
//! the [`socket`] reader/writer tasks both sides share, and the
//! protocol-blind [`relay`] that sits between two peers.
//!
//! Every worker here is a `tokio` task connected to its neighbors by
//! `tokio::sync::mpsc` channels and stopped by a `tokio::sync::watch`
//! shutdown signal, the same shape `stun::client`'s collector and
//! transaction loops use.

pub mod flow_controller;
pub mod manifest_processor;
pub mod relay;
pub mod socket;
pub mod store;

pub use flow_controller::FlowController;
pub use manifest_processor::ManifestProcessor;
pub use store::ContentStore;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Util(#[from] ccnx_util::Error),

    #[error(transparent)]
    Wire(#[from] ccnx_wire::Error),

    #[error(transparent)]
    Compress(#[from] ccnx_compress::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("channel closed")]
    ChannelClosed,
}
