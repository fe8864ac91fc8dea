//! Ogg page construction for Opus streams

use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, trace};

use crate::crc::ogg_crc32;
use crate::opus::{OpusHead, OPUS_TAGS_MAGIC};
use crate::{Error, Result};

use super::{
    OpusAudio, HEADER_TYPE_BOS, HEADER_TYPE_CONTINUATION, HEADER_TYPE_EOS, MAX_PAGE_PAYLOAD,
    MAX_PAGE_SEGMENTS, OGG_SIGNATURE, PAGE_HEADER_SIZE,
};

/// Vendor string written into the comment header.
const VENDOR: &str = "opus-repack";

/// Options controlling Ogg stream assembly.
#[derive(Debug, Clone, Default)]
pub struct OggWriterOptions {
    /// Logical bitstream serial. Derived from wall-clock milliseconds when
    /// absent; inject a value for byte-reproducible output.
    pub serial: Option<u32>,
    /// Advance the granule position by the raw frame size instead of
    /// converting it to 48 kHz units.
    pub repackage: bool,
}

/// Serialize one page, computing its checksum.
///
/// The checksum is taken over the page with the checksum field zeroed,
/// then spliced in at byte offset 22 little-endian.
fn encode_page(
    header_type: u8,
    granule: i64,
    serial: u32,
    page_index: u32,
    segments: &[u8],
    body: &[u8],
) -> Vec<u8> {
    let mut page = Vec::with_capacity(PAGE_HEADER_SIZE + segments.len() + body.len());
    page.extend_from_slice(OGG_SIGNATURE);
    page.push(0);
    page.push(header_type);
    page.extend_from_slice(&granule.to_le_bytes());
    page.extend_from_slice(&serial.to_le_bytes());
    page.extend_from_slice(&page_index.to_le_bytes());
    page.extend_from_slice(&[0u8; 4]);
    page.push(segments.len() as u8);
    page.extend_from_slice(segments);
    page.extend_from_slice(body);

    let crc = ogg_crc32(&page);
    page[22..26].copy_from_slice(&crc.to_le_bytes());
    page
}

/// Comment header payload: vendor string and an empty user comment list.
fn encode_comment_header() -> Vec<u8> {
    let mut out = Vec::with_capacity(OPUS_TAGS_MAGIC.len() + 8 + VENDOR.len());
    out.extend_from_slice(OPUS_TAGS_MAGIC);
    out.extend_from_slice(&(VENDOR.len() as u32).to_le_bytes());
    out.extend_from_slice(VENDOR.as_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out
}

/// Wall-clock milliseconds, truncated to 32 bits, as a stream serial.
fn wall_clock_serial() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u32)
        .unwrap_or_default()
}

/// Assemble a complete Ogg Opus stream from extracted audio.
///
/// Emits the identification page, the comment page, then audio pages with
/// packets laced into 255-byte segments. A page is flushed before a
/// segment would exceed 255 lacing values or 65025 body bytes; the final
/// page carries the end-of-stream flag.
pub fn build_ogg(
    channels: u8,
    sample_rate: u32,
    audio: &OpusAudio,
    options: &OggWriterOptions,
) -> Result<Vec<u8>> {
    let described: u64 = audio.packet_sizes.iter().map(|&s| u64::from(s)).sum();
    if described != audio.data.len() as u64 {
        return Err(Error::PacketTableMismatch {
            described,
            actual: audio.data.len() as u64,
        });
    }

    let serial = options.serial.unwrap_or_else(wall_clock_serial);
    debug!(
        "building Ogg stream: serial {serial:#010x}, {} packets, frame size {}",
        audio.packet_sizes.len(),
        audio.frame_size
    );

    let mut out = Vec::new();

    // Identification page. The pre-skip field mirrors the per-packet frame
    // size so a stream survives repeated conversion unchanged.
    let head = OpusHead {
        version: 1,
        channels,
        pre_skip: audio.frame_size as u16,
        input_sample_rate: sample_rate,
        output_gain: 0,
        mapping_family: 0,
    };
    let head_payload = head.encode();
    out.extend_from_slice(&encode_page(
        HEADER_TYPE_BOS,
        0,
        serial,
        0,
        &[head_payload.len() as u8],
        &head_payload,
    ));

    // Comment page. A stream with no audio packets ends here; every page
    // must carry at least one lacing value, so no empty audio page is
    // emitted in that case.
    let tags_payload = encode_comment_header();
    let tags_type = if audio.packet_sizes.is_empty() {
        HEADER_TYPE_EOS
    } else {
        0
    };
    out.extend_from_slice(&encode_page(
        tags_type,
        0,
        serial,
        1,
        &[tags_payload.len() as u8],
        &tags_payload,
    ));
    if audio.packet_sizes.is_empty() {
        debug!("emitted 2 pages");
        return Ok(out);
    }

    // Audio pages. Granule positions are expressed in 48 kHz units unless
    // the caller asked for raw repackaging.
    let granule_step = if options.repackage || sample_rate == 0 {
        i64::from(audio.frame_size)
    } else {
        i64::from(audio.frame_size) * i64::from(48_000 / sample_rate)
    };

    let mut page_index = 2u32;
    let mut header_type = HEADER_TYPE_CONTINUATION;
    let mut granule = 0i64;
    let mut segments: Vec<u8> = Vec::new();
    let mut body: Vec<u8> = Vec::new();

    let mut offset = 0usize;
    for &size in &audio.packet_sizes {
        let size = size as usize;
        let mut remaining = &audio.data[offset..offset + size];
        offset += size;

        let full_segments = size / 255;
        for i in 0..=full_segments {
            let seg_len = if i < full_segments { 255 } else { size % 255 };

            if segments.len() == MAX_PAGE_SEGMENTS || body.len() + seg_len > MAX_PAGE_PAYLOAD {
                trace!(
                    "flushing page {page_index}: {} segments, {} bytes",
                    segments.len(),
                    body.len()
                );
                out.extend_from_slice(&encode_page(
                    header_type,
                    granule,
                    serial,
                    page_index,
                    &segments,
                    &body,
                ));
                page_index += 1;
                segments.clear();
                body.clear();
                header_type = 0;
            }

            let (segment, rest) = remaining.split_at(seg_len);
            segments.push(seg_len as u8);
            body.extend_from_slice(segment);
            remaining = rest;
        }

        granule += granule_step;
    }

    // Terminal page with whatever is still buffered.
    out.extend_from_slice(&encode_page(
        HEADER_TYPE_EOS,
        granule,
        serial,
        page_index,
        &segments,
        &body,
    ));

    debug!("emitted {} pages", page_index + 1);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ogg::reader::OggPageReader;

    fn audio_from_packets(packets: &[&[u8]], frame_size: u32) -> OpusAudio {
        OpusAudio {
            packet_sizes: packets.iter().map(|p| p.len() as u32).collect(),
            data: packets.concat(),
            frame_size,
        }
    }

    fn options() -> OggWriterOptions {
        OggWriterOptions {
            serial: Some(0x0102_0304),
            repackage: false,
        }
    }

    /// Walk raw pages of an encoded stream, returning
    /// (header_type, granule, segment_table) triples and checking CRCs.
    fn walk_pages(data: &[u8]) -> Vec<(u8, i64, Vec<u8>)> {
        let mut pages = Vec::new();
        let mut pos = 0;
        while pos < data.len() {
            assert_eq!(&data[pos..pos + 4], OGG_SIGNATURE);
            let header_type = data[pos + 5];
            let granule = i64::from_le_bytes(data[pos + 6..pos + 14].try_into().unwrap());
            let stored_crc = u32::from_le_bytes(data[pos + 22..pos + 26].try_into().unwrap());
            let segments_count = data[pos + 26] as usize;
            let table = data[pos + 27..pos + 27 + segments_count].to_vec();
            let body_len: usize = table.iter().map(|&v| v as usize).sum();
            let page_len = PAGE_HEADER_SIZE + segments_count + body_len;

            let mut zeroed = data[pos..pos + page_len].to_vec();
            zeroed[22..26].fill(0);
            assert_eq!(ogg_crc32(&zeroed), stored_crc, "page at offset {pos}");

            pages.push((header_type, granule, table));
            pos += page_len;
        }
        pages
    }

    #[test]
    fn test_header_pages() {
        let audio = audio_from_packets(&[&[0xF8, 1], &[0xF8, 2]], 960);
        let data = build_ogg(1, 48_000, &audio, &options()).unwrap();

        // Identification page: BOS, version 0, single 19-byte segment.
        assert_eq!(&data[..6], b"OggS\x00\x02");
        assert_eq!(data[26], 1);
        assert_eq!(data[27], 19);
        assert_eq!(&data[28..36], b"OpusHead");

        // Comment page follows immediately.
        let second = 27 + 1 + 19;
        assert_eq!(&data[second..second + 4], b"OggS");
        assert_eq!(data[second + 5], 0x00);
        assert_eq!(&data[second + 28..second + 36], b"OpusTags");
    }

    #[test]
    fn test_two_packets_single_final_page() {
        let audio = audio_from_packets(&[&[0xF8, 1, 2], &[0xF8, 3]], 960);
        let data = build_ogg(1, 48_000, &audio, &options()).unwrap();

        let pages = walk_pages(&data);
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[2].0, HEADER_TYPE_EOS);
        assert_eq!(pages[2].2, vec![3, 2]);
        // Two packets of 960 samples each.
        assert_eq!(pages[2].1, 1920);
    }

    #[test]
    fn test_lacing_multiple_of_255() {
        let packet = vec![0xAB; 510];
        let audio = audio_from_packets(&[&packet], 960);
        let data = build_ogg(1, 48_000, &audio, &options()).unwrap();

        let pages = walk_pages(&data);
        assert_eq!(pages[2].2, vec![255, 255, 0]);
    }

    #[test]
    fn test_zero_length_packet_lacing() {
        let audio = audio_from_packets(&[&[], &[0xF8]], 960);
        let data = build_ogg(1, 48_000, &audio, &options()).unwrap();

        let pages = walk_pages(&data);
        assert_eq!(pages[2].2, vec![0, 1]);
    }

    #[test]
    fn test_empty_stream_ends_on_comment_page() {
        let audio = OpusAudio {
            packet_sizes: Vec::new(),
            data: Vec::new(),
            frame_size: 960,
        };
        let data = build_ogg(1, 48_000, &audio, &options()).unwrap();

        // No zero-segment audio page; the comment page carries EOS.
        let pages = walk_pages(&data);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].0, HEADER_TYPE_EOS);
        for (_, _, table) in &pages {
            assert!(!table.is_empty());
        }
    }

    #[test]
    fn test_page_flush_on_segment_limit() {
        // 256 one-byte packets cannot fit a single page's segment table.
        let packets: Vec<Vec<u8>> = (0..256).map(|i| vec![i as u8]).collect();
        let refs: Vec<&[u8]> = packets.iter().map(|p| p.as_slice()).collect();
        let audio = audio_from_packets(&refs, 120);
        let data = build_ogg(1, 48_000, &audio, &options()).unwrap();

        let pages = walk_pages(&data);
        assert_eq!(pages.len(), 4);

        // First audio page is full and keeps the initial header type; the
        // spill page is plain; the terminal page carries EOS.
        assert_eq!(pages[2].0, HEADER_TYPE_CONTINUATION);
        assert_eq!(pages[2].2.len(), 255);
        assert_eq!(pages[3].0, HEADER_TYPE_EOS);
        assert_eq!(pages[3].2.len(), 1);
    }

    #[test]
    fn test_page_flush_on_payload_limit() {
        // Four 17-kilobyte packets exceed 65025 body bytes.
        let packet = vec![0x5A; 17_000];
        let audio = audio_from_packets(&[&packet, &packet, &packet, &packet], 960);
        let data = build_ogg(2, 48_000, &audio, &options()).unwrap();

        let pages = walk_pages(&data);
        assert!(pages.len() > 3);
        for (_, _, table) in &pages[2..] {
            let body: usize = table.iter().map(|&v| v as usize).sum();
            assert!(body <= MAX_PAGE_PAYLOAD);
            assert!(table.len() <= MAX_PAGE_SEGMENTS);
        }

        // All audio bytes survive, in order.
        let mut reader = OggPageReader::new(&data);
        let head = reader.read_headers().unwrap();
        let roundtrip = reader.read_audio(head.input_sample_rate).unwrap();
        assert_eq!(roundtrip.data, audio.data);
    }

    #[test]
    fn test_injected_serial_is_deterministic() {
        let audio = audio_from_packets(&[&[0xF8, 9, 9]], 960);
        let first = build_ogg(1, 48_000, &audio, &options()).unwrap();
        let second = build_ogg(1, 48_000, &audio, &options()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_mismatched_sizes_rejected() {
        let audio = OpusAudio {
            packet_sizes: vec![4, 4],
            data: vec![0; 7],
            frame_size: 960,
        };
        assert!(matches!(
            build_ogg(1, 48_000, &audio, &options()),
            Err(Error::PacketTableMismatch {
                described: 8,
                actual: 7
            })
        ));
    }

    #[test]
    fn test_repackage_granule_step() {
        let audio = audio_from_packets(&[&[0xF8, 1], &[0xF8, 2]], 320);
        let data = build_ogg(
            1,
            16_000,
            &audio,
            &OggWriterOptions {
                serial: Some(7),
                repackage: true,
            },
        )
        .unwrap();
        let pages = walk_pages(&data);
        assert_eq!(pages.last().unwrap().1, 640);

        // Without repackaging the step scales to 48 kHz units.
        let data = build_ogg(
            1,
            16_000,
            &audio,
            &OggWriterOptions {
                serial: Some(7),
                repackage: false,
            },
        )
        .unwrap();
        let pages = walk_pages(&data);
        assert_eq!(pages.last().unwrap().1, 1920);
    }
}
