//! Canonical RIFF/WAVE encoder for mono 16-bit PCM
//!
//! Output layout (44-byte header):
//!
//! | offset | field                     |
//! |--------|---------------------------|
//! | 0      | `RIFF`                    |
//! | 4      | 36 + data size            |
//! | 8      | `WAVE`                    |
//! | 12     | `fmt ` , size 16          |
//! | 20     | format 1, channels 1      |
//! | 24     | sample rate, byte rate    |
//! | 32     | block align 2, 16 bits    |
//! | 36     | `data`, data size         |
//! | 44     | little-endian i16 samples |

/// Size of the canonical header
pub const WAV_HEADER_LEN: usize = 44;

const CHANNELS: u16 = 1;
const BITS_PER_SAMPLE: u16 = 16;
const BLOCK_ALIGN: u16 = CHANNELS * BITS_PER_SAMPLE / 8;
const FMT_CHUNK_SIZE: u32 = 16;

/// Mono 16-bit PCM WAV encoder
pub struct WavEncoder;

impl WavEncoder {
    /// Serialize samples into a byte-exact WAV container
    ///
    /// Deterministic: the same inputs always produce the same bytes.
    pub fn encode(sample_rate: u32, samples: &[i16]) -> Vec<u8> {
        let data_size = (samples.len() * BLOCK_ALIGN as usize) as u32;
        let riff_size = 36 + data_size;
        let byte_rate = sample_rate * BLOCK_ALIGN as u32;

        let mut wav = Vec::with_capacity(WAV_HEADER_LEN + data_size as usize);

        // RIFF header
        wav.extend_from_slice(b"RIFF");
        wav.extend_from_slice(&riff_size.to_le_bytes());
        wav.extend_from_slice(b"WAVE");

        // fmt chunk
        wav.extend_from_slice(b"fmt ");
        wav.extend_from_slice(&FMT_CHUNK_SIZE.to_le_bytes());
        wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
        wav.extend_from_slice(&CHANNELS.to_le_bytes());
        wav.extend_from_slice(&sample_rate.to_le_bytes());
        wav.extend_from_slice(&byte_rate.to_le_bytes());
        wav.extend_from_slice(&BLOCK_ALIGN.to_le_bytes());
        wav.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

        // data chunk
        wav.extend_from_slice(b"data");
        wav.extend_from_slice(&data_size.to_le_bytes());
        for sample in samples {
            wav.extend_from_slice(&sample.to_le_bytes());
        }

        wav
    }
}
