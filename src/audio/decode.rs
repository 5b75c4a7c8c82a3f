//! Raw PCM → normalized floating-point audio buffer.
//!
//! The speech model returns headerless signed 16-bit little-endian PCM.
//! [`decode_pcm16`] turns those bytes into a [`DecodedAudioBuffer`] holding
//! one `Vec<f32>` per channel, every sample divided by `32768.0` so that the
//! full `i16` range maps onto `[-1.0, 1.0)`.
//!
//! # Example
//!
//! ```rust
//! use productv::audio::decode_pcm16;
//! use productv::config::MalformedPcmPolicy;
//!
//! // Two mono samples: 0x4000 (16384) and 0x8000 (-32768)
//! let raw = [0x00, 0x40, 0x00, 0x80];
//! let buf = decode_pcm16(&raw, 24_000, 1, MalformedPcmPolicy::Truncate).unwrap();
//! assert_eq!(buf.channel(0), Some(&[0.5_f32, -1.0][..]));
//! ```

use thiserror::Error;

use crate::config::MalformedPcmPolicy;

/// Divisor applied to every `i16` sample.
const I16_SCALE: f32 = 32_768.0;

// ---------------------------------------------------------------------------
// DecodeError
// ---------------------------------------------------------------------------

/// Reasons a PCM payload could not be decoded.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The payload does not end on a frame boundary and the policy is
    /// [`MalformedPcmPolicy::Reject`].
    #[error("invalid audio payload: {len} bytes is not a multiple of the {frame_bytes}-byte frame")]
    InvalidAudioPayload { len: usize, frame_bytes: usize },

    /// A channel count of zero was requested.
    #[error("channel count must be at least 1")]
    ZeroChannels,
}

// ---------------------------------------------------------------------------
// DecodedAudioBuffer
// ---------------------------------------------------------------------------

/// De-interleaved, normalized audio ready for playback.
///
/// Immutable once produced; the pipeline shares it behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudioBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl DecodedAudioBuffer {
    /// Build a buffer from per-channel sample vectors.
    ///
    /// All channels are expected to have the same length.
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Number of frames (samples per channel).
    pub fn frame_count(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// Samples of channel `index`, or `None` if out of range.
    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    /// Playback length in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count() as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.frame_count() == 0
    }
}

// ---------------------------------------------------------------------------
// decode_pcm16
// ---------------------------------------------------------------------------

/// Decode signed 16-bit little-endian interleaved PCM.
///
/// * Frame count is `raw.len() / (2 * channels)` (integer division).
/// * A trailing partial frame is dropped under
///   [`MalformedPcmPolicy::Truncate`] and rejected under
///   [`MalformedPcmPolicy::Reject`].
/// * An empty payload yields an empty buffer.
pub fn decode_pcm16(
    raw: &[u8],
    sample_rate: u32,
    channels: u16,
    policy: MalformedPcmPolicy,
) -> Result<DecodedAudioBuffer, DecodeError> {
    if channels == 0 {
        return Err(DecodeError::ZeroChannels);
    }

    let n_channels = channels as usize;
    let frame_bytes = 2 * n_channels;
    let remainder = raw.len() % frame_bytes;

    if remainder != 0 {
        match policy {
            MalformedPcmPolicy::Truncate => {
                log::warn!(
                    "audio: dropping {remainder} trailing byte(s) of a {}-byte payload",
                    raw.len()
                );
            }
            MalformedPcmPolicy::Reject => {
                return Err(DecodeError::InvalidAudioPayload {
                    len: raw.len(),
                    frame_bytes,
                });
            }
        }
    }

    let frame_count = raw.len() / frame_bytes;
    let mut out: Vec<Vec<f32>> = (0..n_channels)
        .map(|_| Vec::with_capacity(frame_count))
        .collect();

    for frame in raw.chunks_exact(frame_bytes) {
        for (channel, bytes) in out.iter_mut().zip(frame.chunks_exact(2)) {
            let sample = i16::from_le_bytes([bytes[0], bytes[1]]);
            channel.push(sample as f32 / I16_SCALE);
        }
    }

    Ok(DecodedAudioBuffer::new(sample_rate, out))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn le_bytes(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    #[test]
    fn mono_samples_are_normalized_in_order() {
        let values = [0_i16, 1, -1, 16_384, -16_384, i16::MAX, i16::MIN, 1234];
        let buf = decode_pcm16(&le_bytes(&values), 24_000, 1, MalformedPcmPolicy::Truncate)
            .unwrap();

        assert_eq!(buf.channel_count(), 1);
        assert_eq!(buf.frame_count(), values.len());
        let ch = buf.channel(0).unwrap();
        for (got, v) in ch.iter().zip(values.iter()) {
            assert_eq!(*got, *v as f32 / 32_768.0);
        }
    }

    #[test]
    fn min_value_maps_to_exactly_minus_one() {
        let buf = decode_pcm16(&le_bytes(&[i16::MIN]), 24_000, 1, MalformedPcmPolicy::Truncate)
            .unwrap();
        assert_eq!(buf.channel(0).unwrap()[0], -1.0);
    }

    #[test]
    fn max_value_stays_below_one() {
        let buf = decode_pcm16(&le_bytes(&[i16::MAX]), 24_000, 1, MalformedPcmPolicy::Truncate)
            .unwrap();
        let s = buf.channel(0).unwrap()[0];
        assert!(s < 1.0 && s > 0.999);
    }

    #[test]
    fn empty_payload_yields_empty_buffer() {
        let buf = decode_pcm16(&[], 24_000, 1, MalformedPcmPolicy::Reject).unwrap();
        assert!(buf.is_empty());
        assert_eq!(buf.frame_count(), 0);
        assert_eq!(buf.channel_count(), 1);
        assert_eq!(buf.duration_secs(), 0.0);
    }

    #[test]
    fn odd_length_is_truncated() {
        let mut raw = le_bytes(&[100, 200, 300]);
        raw.push(0x7f);
        let buf = decode_pcm16(&raw, 24_000, 1, MalformedPcmPolicy::Truncate).unwrap();
        assert_eq!(buf.frame_count(), 3);
        assert_eq!(buf.channel(0).unwrap()[2], 300.0 / 32_768.0);
    }

    #[test]
    fn partial_stereo_frame_is_truncated() {
        // 2 full stereo frames (8 bytes) + 3 stray bytes → floor(11 / 4) = 2
        let mut raw = le_bytes(&[1, 2, 3, 4]);
        raw.extend_from_slice(&[9, 9, 9]);
        let buf = decode_pcm16(&raw, 24_000, 2, MalformedPcmPolicy::Truncate).unwrap();
        assert_eq!(buf.frame_count(), 11 / 4);
    }

    #[test]
    fn reject_policy_fails_on_partial_frame() {
        let raw = [0u8, 1, 2];
        let err = decode_pcm16(&raw, 24_000, 1, MalformedPcmPolicy::Reject).unwrap_err();
        assert_eq!(
            err,
            DecodeError::InvalidAudioPayload {
                len: 3,
                frame_bytes: 2
            }
        );
    }

    #[test]
    fn reject_policy_accepts_whole_frames() {
        let raw = le_bytes(&[5, 6]);
        assert!(decode_pcm16(&raw, 24_000, 1, MalformedPcmPolicy::Reject).is_ok());
    }

    #[test]
    fn stereo_is_deinterleaved() {
        // L R L R
        let raw = le_bytes(&[16_384, -16_384, 8_192, -8_192]);
        let buf = decode_pcm16(&raw, 48_000, 2, MalformedPcmPolicy::Truncate).unwrap();
        assert_eq!(buf.channel(0).unwrap(), &[0.5_f32, 0.25][..]);
        assert_eq!(buf.channel(1).unwrap(), &[-0.5_f32, -0.25][..]);
        assert!(buf.channel(2).is_none());
    }

    #[test]
    fn zero_channels_is_an_error() {
        let err = decode_pcm16(&[0, 0], 24_000, 0, MalformedPcmPolicy::Truncate).unwrap_err();
        assert_eq!(err, DecodeError::ZeroChannels);
    }

    #[test]
    fn duration_matches_sample_rate() {
        let raw = vec![0u8; 24_000 * 2];
        let buf = decode_pcm16(&raw, 24_000, 1, MalformedPcmPolicy::Truncate).unwrap();
        assert!((buf.duration_secs() - 1.0).abs() < 1e-9);
    }
}
