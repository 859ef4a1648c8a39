//! Errors from the pkt-line codec and the bundle reader/writer.

use thiserror::Error;

/// Errors from [`crate::pktline`] and [`crate::bundle`].
#[derive(Debug, Error)]
pub enum BundleError {
    /// The signature line is not `# v<n> git bundle\n` for a supported `n`.
    #[error("bundle signature line is malformed or names an unsupported version")]
    MalformedHeader,

    /// A capability, prerequisite, or ref line in the advertisement could
    /// not be parsed.
    #[error("bundle advertisement line is malformed: {reason}")]
    MalformedAdvertisement {
        /// Description of the problem.
        reason: String,
    },

    /// The byte stream ended before a flush packet closed the advertisement.
    #[error("pkt-line stream ended before a flush packet")]
    Truncated,

    /// A pkt-line's 4-byte length prefix is not valid hex.
    #[error("pkt-line length prefix is not valid hex")]
    MalformedPktLine,

    /// A payload would require a pkt-line length prefix wider than 4 hex
    /// digits can express.
    #[error("pkt-line payload of {len} bytes exceeds the maximum pkt-line length")]
    PktLineTooLarge {
        /// The oversized payload length.
        len: usize,
    },

    /// The advertisement closed but no `PACK`-prefixed data follows.
    #[error("bundle is missing its packfile")]
    MissingPackfile,

    /// The packfile declares a version this codec does not write or read.
    #[error("unsupported packfile version {version}")]
    UnsupportedPackVersion {
        /// The version found in the packfile header.
        version: u32,
    },

    /// An object header named a type code outside commit/tree/blob/tag.
    #[error("packfile object type code {code} is not a recognized non-delta type")]
    UnknownObjectType {
        /// The raw 3-bit type code.
        code: u8,
    },

    /// The packfile ended mid-object, or an object's decompressed length
    /// did not match its header.
    #[error("packfile is truncated or corrupt: {reason}")]
    CorruptPack {
        /// Description of the problem.
        reason: String,
    },

    /// The trailing checksum does not match the packfile's contents.
    #[error("packfile trailing checksum does not match its contents")]
    ChecksumMismatch,

    /// Zlib (de)compression failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
