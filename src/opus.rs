//! Opus identification header and packet table-of-contents handling
//!
//! The identification header layout follows RFC 7845 section 5.1; the TOC
//! byte interpretation follows RFC 6716 section 3.1.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

use crate::{Error, Result};

/// Magic at the start of the Opus identification packet.
pub const OPUS_HEAD_MAGIC: &[u8; 8] = b"OpusHead";
/// Magic at the start of the Opus comment packet.
pub const OPUS_TAGS_MAGIC: &[u8; 8] = b"OpusTags";

/// Identification header of an Ogg Opus stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpusHead {
    /// Encapsulation version, 1 in practice.
    pub version: u8,
    /// Output channel count.
    pub channels: u8,
    /// 48 kHz samples the decoder should discard from the start of output.
    pub pre_skip: u16,
    /// Sample rate of the original input, before any Opus resampling.
    pub input_sample_rate: u32,
    /// Output gain in Q7.8 dB.
    pub output_gain: i16,
    /// Channel mapping family; 0 for mono/stereo single-stream.
    pub mapping_family: u8,
}

impl OpusHead {
    /// Wire size of the mapping-family-0 header.
    pub const SIZE: usize = 19;

    /// Parse the 19-byte identification payload.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        if payload.len() < Self::SIZE || &payload[..8] != OPUS_HEAD_MAGIC {
            return Err(Error::BadIdPagePayloadSignature);
        }

        let mut cursor = Cursor::new(&payload[8..]);
        Ok(OpusHead {
            version: cursor.read_u8()?,
            channels: cursor.read_u8()?,
            pre_skip: cursor.read_u16::<LittleEndian>()?,
            input_sample_rate: cursor.read_u32::<LittleEndian>()?,
            output_gain: cursor.read_i16::<LittleEndian>()?,
            mapping_family: cursor.read_u8()?,
        })
    }

    /// Serialize to the 19-byte wire form.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::SIZE);
        out.extend_from_slice(OPUS_HEAD_MAGIC);
        out.push(self.version);
        out.push(self.channels);
        out.extend_from_slice(&self.pre_skip.to_le_bytes());
        out.extend_from_slice(&self.input_sample_rate.to_le_bytes());
        out.extend_from_slice(&self.output_gain.to_le_bytes());
        out.push(self.mapping_family);
        out
    }
}

// Frame durations in hundred-microsecond units, indexed by the low two
// bits of the configuration number.
const SILK_HYBRID_MS10: [u32; 4] = [100, 200, 400, 600];
const CELT_MS10: [u32; 4] = [25, 50, 100, 200];

/// Samples per frame encoded by a packet's TOC byte, at `sample_rate`.
///
/// The configuration number occupies the top five bits of the TOC byte;
/// configurations below 16 are SILK or Hybrid, 16 and above are CELT with
/// its shorter frame durations.
pub fn frame_samples(toc: u8, sample_rate: u32) -> u32 {
    let config = toc >> 3;
    let index = (config & 0x03) as usize;
    let ms10 = if config < 16 {
        SILK_HYBRID_MS10[index]
    } else {
        CELT_MS10[index]
    };
    ms10 * sample_rate / 10_000
}
