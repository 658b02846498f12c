//! Wire type constants for CCNx 1.0.
//!
//! TLV type numbers are only meaningful within the container that holds
//! them — `T_OBJECT` (a body-level type, 0x0002) and `T_KEYIDREST` (a
//! message-level type, also 0x0002) collide numerically but never appear in
//! the same list. Constants are grouped into the small modules below by the
//! container they live in, mirroring how the parser dispatches on context
//! rather than on one flat global type tag.

/// Packet types carried in the fixed header.
pub mod packet {
    pub const INTEREST: u8 = 1;
    pub const OBJECT: u8 = 2;
}

/// Top-level body TLV types (children of the packet body).
pub mod body {
    pub const INTEREST: u16 = 0x0001;
    pub const OBJECT: u16 = 0x0002;
    pub const VALIDATION_ALG: u16 = 0x0003;
    pub const VALIDATION_PAYLOAD: u16 = 0x0004;
}

/// TLV types nested inside T_INTEREST / T_OBJECT.
pub mod message {
    pub const NAME: u16 = 0x0000;
    pub const KEYID_RESTRICTION: u16 = 0x0002;
    pub const OBJECT_HASH_RESTRICTION: u16 = 0x0003;
    pub const PAYLOAD_TYPE: u16 = 0x0005;
    pub const EXPIRY: u16 = 0x0006;
    pub const PAYLOAD: u16 = 0x0001;
    pub const END_CHUNK: u16 = 0x0019;
    pub const MANIFEST: u16 = 0x0007;
}

/// TLV types nested inside T_NAME: segment types.
pub mod name_segment {
    pub const NAME_SEGMENT: u16 = 0x0001;
    pub const IPID: u16 = 0x0008;
    pub const CHUNK: u16 = 0x000A;
    pub const SERIAL: u16 = 0x0013;
}

/// TLV types nested inside T_VALALG (and its nested algorithm token).
pub mod valalg {
    pub const CRC32C: u16 = 2;
    pub const HMAC_SHA256: u16 = 4;
    pub const RSA_SHA256: u16 = 6;
    pub const EC_SECP256K1: u16 = 7;

    pub const KEYID: u16 = 0x0009;
    pub const PUBLIC_KEY: u16 = 0x000B;
    pub const CERT: u16 = 0x000C;
    pub const KEYNAME: u16 = 0x000E;
    pub const SIGNATURE_TIME: u16 = 0x000F;
}

/// TLV types nested inside T_MANIFEST (the two link sections).
pub mod manifest {
    pub const MANIFEST_LINKS: u16 = 1;
    pub const DATA_LINKS: u16 = 2;
}

/// TLV types nested inside a manifest section (MANIFEST_LINKS / DATA_LINKS).
pub mod manifest_section {
    pub const START_CHUNK_NUMBER: u16 = 1;
    pub const HASH_LIST: u16 = 2;
}

/// Length of a content-object / publisher-key hash, in bytes.
pub const HASH_LEN: usize = 32;
