//! PCM16 decoding for response audio.
//!
//! The bridge delivers character speech as raw signed 16-bit little-endian
//! mono PCM, optionally prefixed by a 44-byte RIFF/WAVE header. Decoding is a
//! pure function over an already-received buffer: no allocation beyond the
//! output vector and no failure mode other than "nothing to play".

pub mod queue;
pub mod resample;

use tracing::debug;

use crate::error::{BridgeError, Result};

/// Size of a canonical PCM RIFF/WAVE header.
pub const WAV_HEADER_LEN: usize = 44;

/// Divisor mapping `i16` onto [-1.0, 1.0).
const PCM16_SCALE: f32 = 32768.0;

/// A decoded mono clip ready to hand to a player.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    /// Mono f32 samples in [-1.0, 1.0).
    pub samples: Vec<f32>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Always 1.
    pub channels: u16,
}

impl DecodedAudio {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
            channels: 1,
        }
    }

    /// Returns the duration of this clip in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Decode PCM16 bytes into `out`, replacing its contents.
///
/// The first `trim_header_bytes` bytes are skipped. A trailing odd byte is
/// dropped. Returns the number of samples written.
pub fn decode_pcm16_into(bytes: &[u8], trim_header_bytes: usize, out: &mut Vec<f32>) -> usize {
    out.clear();
    let body = bytes.get(trim_header_bytes..).unwrap_or_default();
    out.extend(
        body.chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / PCM16_SCALE),
    );
    out.len()
}

/// Decode PCM16 bytes into a mono clip.
///
/// Returns `None` when no whole sample remains after trimming. That is an
/// expected outcome for zero-length payloads, not an error.
pub fn decode_pcm16(
    bytes: &[u8],
    sample_rate: u32,
    trim_header_bytes: usize,
) -> Option<DecodedAudio> {
    let mut samples = Vec::with_capacity(bytes.len().saturating_sub(trim_header_bytes) / 2);
    if decode_pcm16_into(bytes, trim_header_bytes, &mut samples) == 0 {
        debug!(
            bytes = bytes.len(),
            trim_header_bytes, "no samples after trimming, no clip produced"
        );
        return None;
    }
    Some(DecodedAudio::new(samples, sample_rate))
}

/// Parse a sample rate delivered as text.
///
/// # Errors
/// Returns `BridgeError::InvalidSampleRate` for non-numeric or zero rates.
pub fn parse_sample_rate(raw: &str) -> Result<u32> {
    match raw.trim().parse::<u32>() {
        Ok(rate) if rate > 0 => Ok(rate),
        _ => Err(BridgeError::InvalidSampleRate(raw.to_string())),
    }
}

/// Parse the rate, then decode. Mirrors the two-step path used when the rate
/// arrives as a string alongside the bytes.
pub fn process_audio_clip(
    bytes: &[u8],
    sample_rate: &str,
    trim_header_bytes: usize,
) -> Result<Option<DecodedAudio>> {
    let rate = parse_sample_rate(sample_rate)?;
    Ok(decode_pcm16(bytes, rate, trim_header_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn sample_count_is_half_the_byte_count() {
        for len in 0..12usize {
            let bytes = vec![0u8; len];
            let mut out = Vec::new();
            assert_eq!(decode_pcm16_into(&bytes, 0, &mut out), len / 2, "len={len}");
        }
    }

    #[test]
    fn min_sample_is_minus_one() {
        let clip = decode_pcm16(&[0x00, 0x80], 16_000, 0).unwrap();
        assert_eq!(clip.samples.len(), 1);
        assert_relative_eq!(clip.samples[0], -1.0);
    }

    #[test]
    fn max_sample_is_just_below_one() {
        let clip = decode_pcm16(&[0xFF, 0x7F], 16_000, 0).unwrap();
        assert_relative_eq!(clip.samples[0], 32767.0 / 32768.0);
        assert!(clip.samples[0] < 1.0);
    }

    #[test]
    fn odd_trailing_byte_is_dropped() {
        let clip = decode_pcm16(&[0x00, 0x40, 0x7F], 22_050, 0).unwrap();
        assert_eq!(clip.samples.len(), 1);
        assert_relative_eq!(clip.samples[0], 0.5);
    }

    #[test]
    fn trimming_matches_untrimmed_payload() {
        let payload: Vec<u8> = (0..64u8).collect();
        let mut framed = vec![0xAAu8; WAV_HEADER_LEN];
        framed.extend_from_slice(&payload);

        let trimmed = decode_pcm16(&framed, 24_000, WAV_HEADER_LEN).unwrap();
        let plain = decode_pcm16(&payload, 24_000, 0).unwrap();
        assert_eq!(trimmed, plain);
    }

    #[test]
    fn empty_payload_produces_no_clip() {
        assert!(decode_pcm16(&[], 16_000, 0).is_none());
        assert!(decode_pcm16(&[0x01], 16_000, 0).is_none());
        assert!(decode_pcm16(&[0u8; WAV_HEADER_LEN], 16_000, WAV_HEADER_LEN).is_none());
    }

    #[test]
    fn trim_longer_than_buffer_produces_no_clip() {
        assert!(decode_pcm16(&[0u8; 10], 16_000, WAV_HEADER_LEN).is_none());
    }

    #[test]
    fn clip_is_mono_with_given_rate() {
        let clip = decode_pcm16(&[0u8; 32_000], 16_000, 0).unwrap();
        assert_eq!(clip.channels, 1);
        assert_eq!(clip.sample_rate, 16_000);
        assert_relative_eq!(clip.duration_secs(), 1.0);
    }

    #[test]
    fn decode_into_reuses_buffer() {
        let mut out = vec![9.0f32; 100];
        assert_eq!(decode_pcm16_into(&[0x00, 0x00, 0x00, 0x80], 0, &mut out), 2);
        assert_eq!(out, vec![0.0, -1.0]);
    }

    #[test]
    fn sample_rate_parsing() {
        assert_eq!(parse_sample_rate("24000").unwrap(), 24_000);
        assert_eq!(parse_sample_rate(" 16000 ").unwrap(), 16_000);
        assert!(matches!(
            parse_sample_rate("0"),
            Err(BridgeError::InvalidSampleRate(_))
        ));
        assert!(matches!(
            parse_sample_rate("44.1k"),
            Err(BridgeError::InvalidSampleRate(_))
        ));
    }

    #[test]
    fn process_audio_clip_surfaces_rate_errors() {
        assert!(process_audio_clip(&[0, 0], "abc", 0).is_err());
        let clip = process_audio_clip(&[0, 0], "8000", 0).unwrap().unwrap();
        assert_eq!(clip.sample_rate, 8_000);
        assert!(process_audio_clip(&[], "8000", 0).unwrap().is_none());
    }
}
