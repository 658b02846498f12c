//! Builds the signed k-ary manifest tree that chunks a file into content
//! objects: [`sizing`] computes how many links fit in a manifest at a given
//! byte budget, [`tree`] assembles and signs the tree those numbers describe.

mod sizing;
mod tree;

pub use sizing::{ManifestStructure, MANIFEST_LINK_FANOUT_CAP};
pub use tree::ManifestTree;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Wire(#[from] ccnx_wire::Error),

    #[error("chunk budget {budget} is too small to fit even one content object's overhead ({overhead})")]
    ChunkTooLarge { budget: usize, overhead: usize },

    #[error("data requires {0} chunks, at or beyond the 2^24 supported limit")]
    TooManyChunks(u64),
}
