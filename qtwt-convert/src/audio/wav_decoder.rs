//! RIFF/WAVE decoder for mono 16-bit PCM
//!
//! Walks the sub-chunks after the 12-byte RIFF header, reads the `fmt ` chunk,
//! and stops at the first `data` chunk. Anything other than linear PCM, mono,
//! 16 bits per sample is rejected.

use crate::audio::types::{AudioBuffer, WavFormatDescriptor};
use crate::error::WavFormatError;
use tracing::debug;

const RIFF_HEADER_LEN: usize = 12;
const CHUNK_HEADER_LEN: usize = 8;

/// Linear PCM format tag
pub const WAVE_FORMAT_PCM: u16 = 1;

/// Chunk locations found while scanning a container
#[derive(Debug, Default)]
struct ChunkScan {
    format: Option<WavFormatDescriptor>,
    /// (body offset, declared size)
    data: Option<(usize, usize)>,
}

fn read_u32_le(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// Mono 16-bit PCM WAV decoder
pub struct WavDecoder;

impl WavDecoder {
    /// Decode a WAV byte buffer into an [`AudioBuffer`]
    ///
    /// Checks, in order: RIFF/WAVE magic, `fmt ` present, `data` present, PCM
    /// format tag, one channel, 16 bits per sample. A `data` chunk whose declared
    /// size runs past the end of the buffer is clipped to what is there.
    pub fn decode(bytes: &[u8]) -> Result<AudioBuffer, WavFormatError> {
        if bytes.len() < RIFF_HEADER_LEN || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
            return Err(WavFormatError::NotRiffWave);
        }

        let scan = Self::scan_chunks(bytes);

        let format = scan.format.ok_or(WavFormatError::MissingFormatChunk)?;
        let (data_offset, data_size) = scan.data.ok_or(WavFormatError::MissingDataChunk)?;

        if format.audio_format_tag != WAVE_FORMAT_PCM {
            return Err(WavFormatError::UnsupportedEncoding(format.audio_format_tag));
        }
        if format.channel_count != 1 {
            return Err(WavFormatError::UnsupportedChannelLayout(format.channel_count));
        }
        if format.bits_per_sample != 16 {
            return Err(WavFormatError::UnsupportedBitDepth(format.bits_per_sample));
        }

        let data_end = data_offset.saturating_add(data_size).min(bytes.len());
        if data_end - data_offset < data_size {
            debug!(
                "data chunk declares {} bytes, only {} present (truncated file)",
                data_size,
                data_end - data_offset
            );
        }

        // A trailing odd byte cannot form a sample and is dropped
        let samples: Vec<i16> = bytes[data_offset..data_end]
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();

        debug!(
            "Decoded WAV: {} Hz, {} samples",
            format.sample_rate,
            samples.len()
        );

        Ok(AudioBuffer::new(format.sample_rate, samples))
    }

    /// Walk sub-chunks from offset 12 until `data` or the end of the buffer
    fn scan_chunks(bytes: &[u8]) -> ChunkScan {
        let mut scan = ChunkScan::default();
        let mut offset = RIFF_HEADER_LEN;

        while offset
            .checked_add(CHUNK_HEADER_LEN)
            .is_some_and(|end| end <= bytes.len())
        {
            let id = &bytes[offset..offset + 4];
            let size = read_u32_le(bytes, offset + 4) as usize;
            let body = offset + CHUNK_HEADER_LEN;

            match id {
                b"fmt " => {
                    let body_end = body.saturating_add(size).min(bytes.len());
                    // Too-short fmt bodies carry no usable format
                    if let Some(format) = WavFormatDescriptor::parse(&bytes[body..body_end]) {
                        scan.format = Some(format);
                    }
                }
                b"data" => {
                    scan.data = Some((body, size));
                    break;
                }
                other => {
                    debug!(
                        "Skipping chunk {:?} ({} bytes)",
                        String::from_utf8_lossy(other),
                        size
                    );
                }
            }

            // Odd-sized chunks are followed by one pad byte
            offset = body.saturating_add(size).saturating_add(size & 1);
        }

        scan
    }
}
