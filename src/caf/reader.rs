//! CAF chunk-list scanning

use byteorder::{BigEndian, ReadBytesExt};
use std::io::Cursor;
use tracing::{debug, trace, warn};

use crate::fourcc::FourCc;
use crate::{varint, Error, Result};

use super::{
    AudioData, AudioDescription, CafFile, ChannelLayout, Chunk, Information, PacketTable,
    CAF_FILE_MAGIC, CAF_FILE_VERSION, CHUNK_AUDIO_DATA, CHUNK_AUDIO_DESCRIPTION,
    CHUNK_CHANNEL_LAYOUT, CHUNK_INFORMATION, CHUNK_MIDI, CHUNK_PACKET_TABLE,
};

impl CafFile {
    /// Parse a fully buffered CAF stream.
    ///
    /// Unknown chunk kinds are preserved verbatim; a file version other
    /// than 1 or nonzero flags are tolerated with a warning. Chunks
    /// required for conversion are only demanded by their accessors.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);

        let magic = FourCc::read(&mut cursor).map_err(|_| Error::BadCafSignature)?;
        if magic != CAF_FILE_MAGIC {
            return Err(Error::BadCafSignature);
        }
        let version = cursor
            .read_u16::<BigEndian>()
            .map_err(|_| Error::BadCafSignature)?;
        let flags = cursor
            .read_u16::<BigEndian>()
            .map_err(|_| Error::BadCafSignature)?;
        if version != CAF_FILE_VERSION || flags != 0 {
            warn!("unexpected CAF file version {version}, flags {flags:#06x}; continuing");
        }

        let mut chunks = Vec::new();
        loop {
            let kind = match FourCc::read(&mut cursor) {
                Ok(kind) => kind,
                Err(_) => break,
            };
            let declared = cursor.read_i64::<BigEndian>()?;

            let start = cursor.position() as usize;
            let remaining = data.len() - start;
            // Only the final data chunk may leave its length unset; a
            // negative length there means it extends to the end of the
            // file. Anywhere else it is malformed.
            let size = if declared < 0 {
                if kind != CHUNK_AUDIO_DATA {
                    return Err(Error::Io(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!("chunk \"{kind}\" declares negative size {declared}"),
                    )));
                }
                remaining
            } else {
                usize::try_from(declared).unwrap_or(usize::MAX)
            };
            if size > remaining {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!("chunk \"{kind}\" overruns the file"),
                )));
            }

            let payload = &data[start..start + size];
            cursor.set_position((start + size) as u64);
            chunks.push(parse_chunk(kind, payload)?);
        }

        debug!("parsed CAF file: {} chunks", chunks.len());
        Ok(CafFile {
            version,
            flags,
            chunks,
        })
    }
}

fn parse_chunk(kind: FourCc, payload: &[u8]) -> Result<Chunk> {
    trace!("chunk \"{kind}\": {} bytes", payload.len());
    Ok(match kind {
        CHUNK_AUDIO_DESCRIPTION => Chunk::AudioDescription(parse_audio_description(payload)?),
        CHUNK_CHANNEL_LAYOUT => Chunk::ChannelLayout(parse_channel_layout(payload)?),
        CHUNK_INFORMATION => Chunk::Information(parse_information(payload)),
        CHUNK_AUDIO_DATA => Chunk::AudioData(parse_audio_data(payload)?),
        CHUNK_PACKET_TABLE => Chunk::PacketTable(parse_packet_table(payload)?),
        CHUNK_MIDI => Chunk::Midi(payload.to_vec()),
        other => Chunk::Unknown {
            kind: other,
            data: payload.to_vec(),
        },
    })
}

fn parse_audio_description(payload: &[u8]) -> Result<AudioDescription> {
    let mut cursor = Cursor::new(payload);
    Ok(AudioDescription {
        sample_rate: cursor.read_f64::<BigEndian>()?,
        format_id: FourCc::read(&mut cursor)?,
        format_flags: cursor.read_u32::<BigEndian>()?,
        bytes_per_packet: cursor.read_u32::<BigEndian>()?,
        frames_per_packet: cursor.read_u32::<BigEndian>()?,
        channels_per_packet: cursor.read_u32::<BigEndian>()?,
        bits_per_channel: cursor.read_u32::<BigEndian>()?,
    })
}

fn parse_channel_layout(payload: &[u8]) -> Result<ChannelLayout> {
    let mut cursor = Cursor::new(payload);
    let layout_tag = cursor.read_i32::<BigEndian>()?;
    let bitmap = cursor.read_i32::<BigEndian>()?;
    let _description_count = cursor.read_i32::<BigEndian>()?;
    let descriptions = payload[cursor.position() as usize..].to_vec();
    Ok(ChannelLayout {
        layout_tag,
        bitmap,
        descriptions,
    })
}

/// Decode the information chunk's key/value pairs.
///
/// Malformed entries are dropped rather than failing the whole file.
fn parse_information(payload: &[u8]) -> Information {
    if payload.len() < 4 {
        warn!("information chunk too short: {} bytes", payload.len());
        return Information::default();
    }
    let count = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);

    let mut entries = Vec::new();
    let mut rest = &payload[4..];
    for _ in 0..count {
        let Some((key, after_key)) = split_cstring(rest) else {
            break;
        };
        let Some((value, after_value)) = split_cstring(after_key) else {
            break;
        };
        rest = after_value;
        entries.push((key, value));
    }

    if entries.len() as u64 != u64::from(count) {
        warn!(
            "information chunk declared {count} entries, decoded {}",
            entries.len()
        );
    }
    Information { entries }
}

fn split_cstring(data: &[u8]) -> Option<(String, &[u8])> {
    let nul = data.iter().position(|&b| b == 0)?;
    let s = String::from_utf8_lossy(&data[..nul]).into_owned();
    Some((s, &data[nul + 1..]))
}

fn parse_audio_data(payload: &[u8]) -> Result<AudioData> {
    let mut cursor = Cursor::new(payload);
    let edit_count = cursor.read_u32::<BigEndian>()?;
    Ok(AudioData {
        edit_count,
        data: payload[4..].to_vec(),
    })
}

fn parse_packet_table(payload: &[u8]) -> Result<PacketTable> {
    let mut cursor = Cursor::new(payload);
    let number_packets = cursor.read_i64::<BigEndian>()?;
    let number_valid_frames = cursor.read_i64::<BigEndian>()?;
    let priming_frames = cursor.read_i32::<BigEndian>()?;
    let remainder_frames = cursor.read_i32::<BigEndian>()?;

    let packet_sizes = varint::decode_all(&payload[24..])?;
    if packet_sizes.len() as i64 != number_packets {
        warn!(
            "packet table declares {number_packets} packets, decoded {}",
            packet_sizes.len()
        );
    }

    Ok(PacketTable {
        number_valid_frames,
        priming_frames,
        remainder_frames,
        packet_sizes,
    })
}
