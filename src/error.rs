//! Error types for container parsing and building

use thiserror::Error;

use crate::fourcc::FourCc;

/// Result type for repackaging operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure kinds across the Ogg and CAF parsers and builders.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error from the byte source or sink
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The Ogg source ended before a full 27-byte page header could be read.
    ///
    /// Fatal while reading the identification header; treated as end of
    /// stream while extracting audio pages.
    #[error("Ogg stream ended before a complete page header")]
    ShortPageHeader,

    /// The first Ogg page does not start with the `OggS` capture pattern
    #[error("first Ogg page does not start with \"OggS\"")]
    BadIdPageSignature,

    /// The first Ogg page is not flagged beginning-of-stream
    #[error("first Ogg page header type {0:#04x} is not beginning-of-stream")]
    BadIdPageType(u8),

    /// The identification page does not carry a single 19-byte segment
    #[error("identification page segment length {0} is not 19")]
    BadIdPageLength(usize),

    /// The identification packet does not begin with `OpusHead`
    #[error("identification packet does not begin with \"OpusHead\"")]
    BadIdPagePayloadSignature,

    /// The file does not start with the `caff` file header
    #[error("file is not a CAF stream")]
    BadCafSignature,

    /// A required CAF chunk was absent
    #[error("required CAF chunk \"{0}\" not found")]
    ChunkNotFound(FourCc),

    /// A packet-table varint overflowed or ended prematurely
    #[error("malformed packet table varint")]
    BadVarint,

    /// The packet table disagrees with the audio payload length
    #[error("packet table describes {described} bytes but the audio payload has {actual}")]
    PacketTableMismatch { described: u64, actual: u64 },
}
