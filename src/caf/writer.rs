//! CAF chunk serialization and the fixed Opus chunk sequence

use tracing::debug;

use crate::ogg::OpusAudio;
use crate::opus::OpusHead;
use crate::varint;

use super::{
    AudioData, AudioDescription, CafFile, ChannelLayout, Chunk, Information, PacketTable,
    CAF_FILE_MAGIC, CAF_FILE_VERSION, FORMAT_OPUS, LAYOUT_TAG_MONO, LAYOUT_TAG_STEREO,
};

/// Information entry recorded in converted files.
const ENCODER_KEY: &str = "encoder";
const ENCODER_VALUE: &str = "Lavf59.27.100";

/// Bytes per channel description in a `chan` chunk.
const CHANNEL_DESCRIPTION_SIZE: usize = 20;

impl Chunk {
    /// Serialize the chunk payload.
    pub fn encode_payload(&self) -> Vec<u8> {
        match self {
            Chunk::AudioDescription(desc) => {
                let mut out = Vec::with_capacity(32);
                out.extend_from_slice(&desc.sample_rate.to_be_bytes());
                out.extend_from_slice(&desc.format_id.as_bytes());
                out.extend_from_slice(&desc.format_flags.to_be_bytes());
                out.extend_from_slice(&desc.bytes_per_packet.to_be_bytes());
                out.extend_from_slice(&desc.frames_per_packet.to_be_bytes());
                out.extend_from_slice(&desc.channels_per_packet.to_be_bytes());
                out.extend_from_slice(&desc.bits_per_channel.to_be_bytes());
                out
            }
            Chunk::ChannelLayout(chan) => {
                let count = (chan.descriptions.len() / CHANNEL_DESCRIPTION_SIZE) as i32;
                let mut out = Vec::with_capacity(12 + chan.descriptions.len());
                out.extend_from_slice(&chan.layout_tag.to_be_bytes());
                out.extend_from_slice(&chan.bitmap.to_be_bytes());
                out.extend_from_slice(&count.to_be_bytes());
                out.extend_from_slice(&chan.descriptions);
                out
            }
            Chunk::Information(info) => {
                let mut out = Vec::new();
                out.extend_from_slice(&(info.entries.len() as u32).to_be_bytes());
                for (key, value) in &info.entries {
                    out.extend_from_slice(key.as_bytes());
                    out.push(0);
                    out.extend_from_slice(value.as_bytes());
                    out.push(0);
                }
                out
            }
            Chunk::AudioData(data) => {
                let mut out = Vec::with_capacity(4 + data.data.len());
                out.extend_from_slice(&data.edit_count.to_be_bytes());
                out.extend_from_slice(&data.data);
                out
            }
            Chunk::PacketTable(pakt) => {
                let mut out = Vec::with_capacity(24 + pakt.packet_sizes.len());
                out.extend_from_slice(&(pakt.packet_sizes.len() as i64).to_be_bytes());
                out.extend_from_slice(&pakt.number_valid_frames.to_be_bytes());
                out.extend_from_slice(&pakt.priming_frames.to_be_bytes());
                out.extend_from_slice(&pakt.remainder_frames.to_be_bytes());
                for &size in &pakt.packet_sizes {
                    out.extend_from_slice(&varint::encode(size));
                }
                out
            }
            Chunk::Midi(data) => data.clone(),
            Chunk::Unknown { data, .. } => data.clone(),
        }
    }

    /// Serialize the chunk with its 12-byte header.
    pub fn encode(&self) -> Vec<u8> {
        let payload = self.encode_payload();
        let mut out = Vec::with_capacity(12 + payload.len());
        out.extend_from_slice(&self.kind().as_bytes());
        out.extend_from_slice(&(payload.len() as i64).to_be_bytes());
        out.extend_from_slice(&payload);
        out
    }
}

impl CafFile {
    /// Serialize the file header and every chunk.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&CAF_FILE_MAGIC.as_bytes());
        out.extend_from_slice(&self.version.to_be_bytes());
        out.extend_from_slice(&self.flags.to_be_bytes());
        for chunk in &self.chunks {
            out.extend_from_slice(&chunk.encode());
        }
        out
    }
}

/// Assemble the fixed five-chunk CAF layout for an Opus stream.
///
/// Chunk order is `desc`, `chan`, `info`, `data`, `pakt`. The packet
/// table records no priming or remainder frames; the valid frame count is
/// the per-packet frame size times the packet count.
pub fn build_caf(head: &OpusHead, audio: OpusAudio) -> CafFile {
    debug!(
        "building CAF file: {} packets, {} audio bytes, frame size {}",
        audio.packet_sizes.len(),
        audio.data.len(),
        audio.frame_size
    );

    let desc = AudioDescription {
        sample_rate: f64::from(head.input_sample_rate),
        format_id: FORMAT_OPUS,
        format_flags: 0,
        bytes_per_packet: 0,
        frames_per_packet: audio.frame_size,
        channels_per_packet: u32::from(head.channels),
        bits_per_channel: 0,
    };

    let chan = ChannelLayout {
        layout_tag: if head.channels == 2 {
            LAYOUT_TAG_STEREO
        } else {
            LAYOUT_TAG_MONO
        },
        bitmap: 0,
        descriptions: Vec::new(),
    };

    let info = Information {
        entries: vec![(ENCODER_KEY.to_string(), ENCODER_VALUE.to_string())],
    };

    let pakt = PacketTable {
        number_valid_frames: i64::from(audio.frame_size) * audio.packet_sizes.len() as i64,
        priming_frames: 0,
        remainder_frames: 0,
        packet_sizes: audio.packet_sizes,
    };

    let data = AudioData {
        edit_count: 0,
        data: audio.data,
    };

    CafFile {
        version: CAF_FILE_VERSION,
        flags: 0,
        chunks: vec![
            Chunk::AudioDescription(desc),
            Chunk::ChannelLayout(chan),
            Chunk::Information(info),
            Chunk::AudioData(data),
            Chunk::PacketTable(pakt),
        ],
    }
}
