//! Shared error type and small helpers used across the `ccnx-*` crates.
//!
//! This crate carries no protocol logic of its own: it is the equivalent of
//! `webrtc_util`'s role in the teacher crate — a narrow waist every other
//! crate sits on top of.

use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can originate below the protocol layer: I/O, channel
/// shutdown, and anything a leaf crate wants to fold in without inventing
/// its own catch-all variant.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("channel closed")]
    ChannelClosed,

    #[error("operation timed out")]
    Timeout,

    #[error("{0}")]
    Other(String),
}

/// Milliseconds since the Unix epoch, the unit `T_EXPIRY` values are carried
/// in on the wire.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before Unix epoch")
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_millis_is_monotonic_enough() {
        let a = now_millis();
        let b = now_millis();
        assert!(b >= a);
    }
}
