//! Ogg container framing (RFC 3533)
//!
//! An Ogg stream is a sequence of pages. Each page carries a 27-byte
//! header, a table of up to 255 one-byte lacing values, and a body. A
//! packet occupies one or more consecutive segments: lacing values of 255
//! continue the packet, the first value below 255 terminates it, and a
//! page ending in a run of 255s spills the packet onto the next page.

pub mod reader;
pub mod writer;

/// Capture pattern at the start of every page.
pub const OGG_SIGNATURE: &[u8; 4] = b"OggS";

/// Size of the fixed page header, before the segment table.
pub const PAGE_HEADER_SIZE: usize = 27;

/// Page continues a packet from the previous page.
pub const HEADER_TYPE_CONTINUATION: u8 = 0x01;
/// Page is the first of its logical stream.
pub const HEADER_TYPE_BOS: u8 = 0x02;
/// Page is the last of its logical stream.
pub const HEADER_TYPE_EOS: u8 = 0x04;

/// Most payload bytes a single page may carry (255 segments of 255 bytes).
pub const MAX_PAGE_PAYLOAD: usize = 65_025;
/// Most lacing values a single page may carry.
pub const MAX_PAGE_SEGMENTS: usize = 255;

/// Fixed fields of an Ogg page header.
#[derive(Debug, Clone)]
pub struct OggPageHeader {
    /// Capture pattern as read; `OggS` for a well-formed page.
    pub signature: [u8; 4],
    /// Stream structure version, 0.
    pub version: u8,
    /// Bitmask of the `HEADER_TYPE_*` flags.
    pub header_type: u8,
    /// Cumulative 48 kHz sample position after the last packet completed
    /// in this page.
    pub granule_position: i64,
    /// Identifies the logical bitstream.
    pub serial: u32,
    /// Monotonically increasing page counter, from zero.
    pub page_index: u32,
    /// CRC over the page with this field zeroed.
    pub checksum: u32,
    /// Lacing values for the page body.
    pub segment_table: Vec<u8>,
}

impl OggPageHeader {
    /// Body length implied by the segment table.
    pub fn body_len(&self) -> usize {
        self.segment_table.iter().map(|&v| v as usize).sum()
    }
}

/// A parsed page: its header plus the packets completed within it.
#[derive(Debug, Clone)]
pub struct OggPage {
    pub header: OggPageHeader,
    pub packets: Vec<Vec<u8>>,
}

/// Opus packet payloads and sizes extracted from the audio pages of a
/// stream, plus the frame size derived from the first data packet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpusAudio {
    /// Per-packet byte lengths, in page order.
    pub packet_sizes: Vec<u32>,
    /// Concatenated packet payloads.
    pub data: Vec<u8>,
    /// Samples per packet at the stream's sample rate.
    pub frame_size: u32,
}
