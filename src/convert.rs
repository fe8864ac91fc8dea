//! End-to-end conversions between Ogg and CAF Opus containers
//!
//! Both directions copy the Opus packets verbatim; only container
//! framing, packet tables, and metadata are rewritten. Inputs are fully
//! buffered and outputs are produced in one piece, so a failed conversion
//! never leaves a partial file behind.

use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::caf::writer::build_caf;
use crate::caf::CafFile;
use crate::ogg::reader::OggPageReader;
use crate::ogg::writer::{build_ogg, OggWriterOptions};
use crate::ogg::OpusAudio;
use crate::Result;

/// Repackage an Ogg Opus stream into a CAF file.
pub fn convert_ogg_to_caf(input: &[u8]) -> Result<Vec<u8>> {
    let mut reader = OggPageReader::new(input);
    let head = reader.read_headers()?;
    let audio = reader.read_audio(head.input_sample_rate)?;

    debug!(
        "Ogg -> CAF: {} packets, {} bytes",
        audio.packet_sizes.len(),
        audio.data.len()
    );
    Ok(build_caf(&head, audio).encode())
}

/// Repackage a CAF Opus file into an Ogg stream.
///
/// The stream serial is derived from the wall clock; use
/// [`convert_caf_to_ogg_with`] to inject one for reproducible output.
pub fn convert_caf_to_ogg(input: &[u8]) -> Result<Vec<u8>> {
    convert_caf_to_ogg_with(input, &OggWriterOptions::default())
}

/// Repackage a CAF Opus file into an Ogg stream with explicit writer
/// options.
pub fn convert_caf_to_ogg_with(input: &[u8], options: &OggWriterOptions) -> Result<Vec<u8>> {
    let caf = CafFile::parse(input)?;
    let desc = caf.audio_description()?;
    let pakt = caf.packet_table()?;
    let data = caf.audio_data()?;

    let audio = OpusAudio {
        packet_sizes: pakt.packet_sizes.clone(),
        data: data.data.clone(),
        frame_size: desc.frames_per_packet,
    };

    debug!(
        "CAF -> Ogg: {} packets, {} bytes, {} Hz",
        audio.packet_sizes.len(),
        audio.data.len(),
        desc.sample_rate
    );
    build_ogg(
        desc.channels_per_packet as u8,
        desc.sample_rate as u32,
        &audio,
        options,
    )
}

/// Convert an Ogg Opus file on disk, writing the CAF result to `output`.
///
/// The input is removed after a successful write when `delete_input` is
/// set.
pub fn convert_ogg_file_to_caf(input: &Path, output: &Path, delete_input: bool) -> Result<()> {
    let bytes = fs::read(input)?;
    let caf = convert_ogg_to_caf(&bytes)?;
    fs::write(output, caf)?;
    if delete_input {
        fs::remove_file(input)?;
    }
    info!("converted {} -> {}", input.display(), output.display());
    Ok(())
}

/// Convert a CAF Opus file on disk, writing the Ogg result to `output`.
pub fn convert_caf_file_to_ogg(input: &Path, output: &Path, delete_input: bool) -> Result<()> {
    let bytes = fs::read(input)?;
    let ogg = convert_caf_to_ogg(&bytes)?;
    fs::write(output, ogg)?;
    if delete_input {
        fs::remove_file(input)?;
    }
    info!("converted {} -> {}", input.display(), output.display());
    Ok(())
}
