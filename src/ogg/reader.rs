//! Ogg page parsing and Opus stream extraction

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};
use tracing::{debug, trace};

use crate::opus::{frame_samples, OpusHead, OPUS_HEAD_MAGIC, OPUS_TAGS_MAGIC};
use crate::{Error, Result};

use super::{OggPage, OggPageHeader, OpusAudio, HEADER_TYPE_BOS, OGG_SIGNATURE, PAGE_HEADER_SIZE};

/// Incremental page reader over a fully buffered Ogg stream.
///
/// Page checksums are not verified; conversion rewrites every CRC on
/// output, so a corrupted source surfaces as malformed framing instead.
pub struct OggPageReader<'a> {
    cursor: Cursor<&'a [u8]>,
    /// Partial packet carried over from a page ending in a run of 255s.
    carry: Vec<u8>,
}

impl<'a> OggPageReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        OggPageReader {
            cursor: Cursor::new(data),
            carry: Vec::new(),
        }
    }

    /// Parse the next page.
    ///
    /// Fails with [`Error::ShortPageHeader`] when fewer than 27 header
    /// bytes remain, which doubles as the end-of-stream signal between
    /// pages. Truncation inside the segment table or body is an IO error.
    pub fn next_page(&mut self) -> Result<OggPage> {
        let mut header = [0u8; PAGE_HEADER_SIZE];
        if self.cursor.read_exact(&mut header).is_err() {
            return Err(Error::ShortPageHeader);
        }

        let signature = [header[0], header[1], header[2], header[3]];
        let version = header[4];
        let header_type = header[5];

        let mut fixed = Cursor::new(&header[6..]);
        let granule_position = fixed.read_i64::<LittleEndian>()?;
        let serial = fixed.read_u32::<LittleEndian>()?;
        let page_index = fixed.read_u32::<LittleEndian>()?;
        let checksum = fixed.read_u32::<LittleEndian>()?;
        let segments_count = fixed.read_u8()?;

        let mut segment_table = vec![0u8; segments_count as usize];
        self.cursor.read_exact(&mut segment_table)?;

        let body_len: usize = segment_table.iter().map(|&v| v as usize).sum();
        let mut body = vec![0u8; body_len];
        self.cursor.read_exact(&mut body)?;

        // Reassemble packets from the lacing values. Continuation is
        // decided by the lacing rule alone: a page ending in a run of
        // 255s left its packet open, regardless of the header flag.
        let mut current = std::mem::take(&mut self.carry);

        let mut packets = Vec::new();
        let mut offset = 0usize;
        for &lacing in &segment_table {
            let end = offset + lacing as usize;
            current.extend_from_slice(&body[offset..end]);
            offset = end;

            if lacing < 255 {
                packets.push(std::mem::take(&mut current));
            }
        }
        self.carry = current;

        trace!(
            "page {page_index}: {} segments, {} completed packets, granule {granule_position}",
            segment_table.len(),
            packets.len()
        );

        Ok(OggPage {
            header: OggPageHeader {
                signature,
                version,
                header_type,
                granule_position,
                serial,
                page_index,
                checksum,
                segment_table,
            },
            packets,
        })
    }

    /// Validate the identification page and decode its `OpusHead` payload.
    pub fn read_headers(&mut self) -> Result<OpusHead> {
        let page = self.next_page()?;

        if page.header.signature != *OGG_SIGNATURE {
            return Err(Error::BadIdPageSignature);
        }
        if page.header.header_type != HEADER_TYPE_BOS {
            return Err(Error::BadIdPageType(page.header.header_type));
        }

        let lacing = page.header.segment_table.first().copied().unwrap_or(0) as usize;
        if page.header.segment_table.len() != 1 || lacing != OpusHead::SIZE {
            return Err(Error::BadIdPageLength(lacing));
        }

        let Some(payload) = page.packets.into_iter().next() else {
            return Err(Error::BadIdPagePayloadSignature);
        };
        if !payload.starts_with(OPUS_HEAD_MAGIC) {
            return Err(Error::BadIdPagePayloadSignature);
        }

        let head = OpusHead::parse(&payload)?;
        debug!(
            "Opus stream: {} channel(s), {} Hz input rate, pre-skip {}",
            head.channels, head.input_sample_rate, head.pre_skip
        );
        Ok(head)
    }

    /// Walk the remaining pages collecting Opus packets.
    ///
    /// The comment page is skipped. The per-packet frame size is derived
    /// from the TOC byte of the first packet on page index 2, the first
    /// audio page of a standard stream.
    pub fn read_audio(&mut self, sample_rate: u32) -> Result<OpusAudio> {
        let mut audio = OpusAudio::default();

        loop {
            let page = match self.next_page() {
                Ok(page) => page,
                Err(Error::ShortPageHeader) => break,
                Err(e) => return Err(e),
            };

            if page
                .packets
                .first()
                .is_some_and(|p| p.starts_with(OPUS_TAGS_MAGIC))
            {
                trace!("skipping comment page {}", page.header.page_index);
                continue;
            }

            if page.header.page_index == 2 {
                if let Some(&toc) = page.packets.first().and_then(|p| p.first()) {
                    audio.frame_size = frame_samples(toc, sample_rate);
                    debug!(
                        "frame size {} samples from TOC byte {toc:#04x}",
                        audio.frame_size
                    );
                }
            }

            for packet in &page.packets {
                audio.packet_sizes.push(packet.len() as u32);
                audio.data.extend_from_slice(packet);
            }
        }

        debug!(
            "extracted {} packets, {} audio bytes",
            audio.packet_sizes.len(),
            audio.data.len()
        );
        Ok(audio)
    }
}
