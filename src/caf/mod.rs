//! Apple Core Audio Format containers
//!
//! A CAF file is an 8-byte file header followed by a flat list of chunks,
//! each introduced by a FourCC tag and a signed 64-bit length. All
//! multi-byte fields are big-endian; floating point is IEEE-754
//! big-endian. See Apple's Core Audio Format Specification 1.0.

pub mod reader;
pub mod writer;

use crate::fourcc::FourCc;
use crate::{Error, Result};

/// File-type tag at offset 0.
pub const CAF_FILE_MAGIC: FourCc = FourCc(*b"caff");
/// File version written by this crate.
pub const CAF_FILE_VERSION: u16 = 1;

pub const CHUNK_AUDIO_DESCRIPTION: FourCc = FourCc(*b"desc");
pub const CHUNK_CHANNEL_LAYOUT: FourCc = FourCc(*b"chan");
pub const CHUNK_INFORMATION: FourCc = FourCc(*b"info");
pub const CHUNK_AUDIO_DATA: FourCc = FourCc(*b"data");
pub const CHUNK_PACKET_TABLE: FourCc = FourCc(*b"pakt");
pub const CHUNK_MIDI: FourCc = FourCc(*b"midi");

/// Opus payload format tag inside `desc`.
pub const FORMAT_OPUS: FourCc = FourCc(*b"opus");

/// kAudioChannelLayoutTag_Mono
pub const LAYOUT_TAG_MONO: i32 = 6_553_601;
/// kAudioChannelLayoutTag_Stereo
pub const LAYOUT_TAG_STEREO: i32 = 6_619_138;

/// `desc` chunk payload: the stream's audio encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioDescription {
    pub sample_rate: f64,
    pub format_id: FourCc,
    pub format_flags: u32,
    /// Zero for variable-bitrate formats.
    pub bytes_per_packet: u32,
    pub frames_per_packet: u32,
    pub channels_per_packet: u32,
    pub bits_per_channel: u32,
}

/// `chan` chunk payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelLayout {
    pub layout_tag: i32,
    pub bitmap: i32,
    /// Trailing channel descriptions, 20 bytes each, kept verbatim.
    pub descriptions: Vec<u8>,
}

/// `info` chunk payload: ordered key/value strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Information {
    pub entries: Vec<(String, String)>,
}

/// `data` chunk payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioData {
    pub edit_count: u32,
    /// Concatenated packet bytes.
    pub data: Vec<u8>,
}

/// `pakt` chunk payload.
///
/// Packet sizes are decoded from the varint entry stream at parse time;
/// the number-of-packets header field is implied by their count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PacketTable {
    pub number_valid_frames: i64,
    pub priming_frames: i32,
    pub remainder_frames: i32,
    pub packet_sizes: Vec<u32>,
}

/// One chunk, tagged by kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Chunk {
    AudioDescription(AudioDescription),
    ChannelLayout(ChannelLayout),
    Information(Information),
    AudioData(AudioData),
    PacketTable(PacketTable),
    Midi(Vec<u8>),
    Unknown { kind: FourCc, data: Vec<u8> },
}

impl Chunk {
    /// The chunk's wire tag.
    pub fn kind(&self) -> FourCc {
        match self {
            Chunk::AudioDescription(_) => CHUNK_AUDIO_DESCRIPTION,
            Chunk::ChannelLayout(_) => CHUNK_CHANNEL_LAYOUT,
            Chunk::Information(_) => CHUNK_INFORMATION,
            Chunk::AudioData(_) => CHUNK_AUDIO_DATA,
            Chunk::PacketTable(_) => CHUNK_PACKET_TABLE,
            Chunk::Midi(_) => CHUNK_MIDI,
            Chunk::Unknown { kind, .. } => *kind,
        }
    }
}

/// A parsed or assembled CAF file.
#[derive(Debug, Clone, PartialEq)]
pub struct CafFile {
    pub version: u16,
    pub flags: u16,
    pub chunks: Vec<Chunk>,
}

impl CafFile {
    /// The audio description chunk.
    pub fn audio_description(&self) -> Result<&AudioDescription> {
        self.chunks
            .iter()
            .find_map(|c| match c {
                Chunk::AudioDescription(desc) => Some(desc),
                _ => None,
            })
            .ok_or(Error::ChunkNotFound(CHUNK_AUDIO_DESCRIPTION))
    }

    /// The packet table chunk.
    pub fn packet_table(&self) -> Result<&PacketTable> {
        self.chunks
            .iter()
            .find_map(|c| match c {
                Chunk::PacketTable(pakt) => Some(pakt),
                _ => None,
            })
            .ok_or(Error::ChunkNotFound(CHUNK_PACKET_TABLE))
    }

    /// The audio data chunk.
    pub fn audio_data(&self) -> Result<&AudioData> {
        self.chunks
            .iter()
            .find_map(|c| match c {
                Chunk::AudioData(data) => Some(data),
                _ => None,
            })
            .ok_or(Error::ChunkNotFound(CHUNK_AUDIO_DATA))
    }
}
