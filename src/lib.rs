//! Lossless repackaging of Opus audio between Ogg and Apple CAF containers
//!
//! Ogg (RFC 3533 / RFC 7845) is the cross-platform container for Opus
//! streams; CAF is the container Apple platforms expect. This crate
//! rewrites the container around an Opus stream in either direction
//! without touching the codec payload: packets are copied verbatim while
//! page framing, chunk tables, and metadata are rebuilt.
//!
//! The top-level entry points are [`convert_ogg_to_caf`] and
//! [`convert_caf_to_ogg`], which operate on fully buffered byte slices,
//! plus path-taking wrappers that read and persist files. The lower-level
//! pieces — the Ogg page reader and writer, the CAF chunk model, the page
//! CRC, and the packet-table varint codec — are exported for callers that
//! need to inspect or assemble containers directly.

pub mod caf;
pub mod convert;
pub mod crc;
pub mod error;
pub mod fourcc;
pub mod ogg;
pub mod opus;
pub mod varint;

pub use convert::{
    convert_caf_file_to_ogg, convert_caf_to_ogg, convert_caf_to_ogg_with, convert_ogg_file_to_caf,
    convert_ogg_to_caf,
};
pub use error::{Error, Result};
pub use fourcc::FourCc;
pub use ogg::writer::OggWriterOptions;
pub use opus::OpusHead;
