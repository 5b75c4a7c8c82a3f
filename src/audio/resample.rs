//! Sample-rate and channel-layout conversion for playback.
//!
//! The speech model produces **24 kHz mono** audio, but most output devices
//! run at 44.1 or 48 kHz with two channels.  This module provides the two
//! conversion steps applied before a buffer is handed to the output stream:
//!
//! 1. [`resample_linear`]: resample one channel from any rate to any rate.
//! 2. [`interleave_for_device`]: map the buffer's channels onto the device's
//!    channel count and interleave them.

use super::decode::DecodedAudioBuffer;

// ---------------------------------------------------------------------------
// resample_linear
// ---------------------------------------------------------------------------

/// Resample `samples` from `source_rate` Hz to `target_rate` Hz using linear
/// interpolation.
///
/// * Equal rates return a copy of the input (no interpolation).
/// * Empty input or a zero rate returns an empty vector.
///
/// The output length is `ceil(samples.len() * target_rate / source_rate)`.
///
/// # Example
///
/// ```rust
/// use productv::audio::resample_linear;
///
/// // 24 kHz → 48 kHz doubles the length
/// let out = resample_linear(&vec![0.25_f32; 240], 24_000, 48_000);
/// assert_eq!(out.len(), 480);
/// ```
pub fn resample_linear(samples: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    if source_rate == target_rate {
        return samples.to_vec();
    }

    if samples.is_empty() || source_rate == 0 || target_rate == 0 {
        return Vec::new();
    }

    let ratio = target_rate as f64 / source_rate as f64;
    let output_len = (samples.len() as f64 * ratio).ceil() as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_pos = i as f64 / ratio;
        let idx = src_pos as usize;
        let frac = (src_pos - idx as f64) as f32;

        let sample = if idx + 1 < samples.len() {
            samples[idx] * (1.0 - frac) + samples[idx + 1] * frac
        } else if idx < samples.len() {
            samples[idx]
        } else {
            0.0
        };

        output.push(sample);
    }

    output
}

// ---------------------------------------------------------------------------
// interleave_for_device
// ---------------------------------------------------------------------------

/// Convert `buffer` into interleaved samples at `device_rate` with
/// `device_channels` channels.
///
/// * Mono sources are duplicated onto every device channel.
/// * Multi-channel sources map channel `i` to device channel `i`; extra
///   device channels repeat the last source channel, extra source channels
///   are dropped.
/// * `device_channels == 0` yields an empty vector.
pub fn interleave_for_device(
    buffer: &DecodedAudioBuffer,
    device_rate: u32,
    device_channels: u16,
) -> Vec<f32> {
    let n_out = device_channels as usize;
    if n_out == 0 || buffer.channel_count() == 0 {
        return Vec::new();
    }

    let resampled: Vec<Vec<f32>> = (0..buffer.channel_count())
        .filter_map(|i| buffer.channel(i))
        .map(|ch| resample_linear(ch, buffer.sample_rate(), device_rate))
        .collect();

    let frames = resampled.first().map_or(0, Vec::len);
    let last = resampled.len() - 1;
    let mut out = Vec::with_capacity(frames * n_out);

    for frame in 0..frames {
        for out_ch in 0..n_out {
            let src = &resampled[out_ch.min(last)];
            out.push(src.get(frame).copied().unwrap_or(0.0));
        }
    }

    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- resample_linear ---------------------------------------------------

    #[test]
    fn same_rate_is_noop() {
        let input: Vec<f32> = (0..240).map(|i| i as f32 / 240.0).collect();
        let out = resample_linear(&input, 24_000, 24_000);
        assert_eq!(out, input);
    }

    #[test]
    fn empty_input() {
        assert!(resample_linear(&[], 24_000, 48_000).is_empty());
    }

    #[test]
    fn zero_rate_yields_empty() {
        assert!(resample_linear(&[0.1, 0.2], 0, 48_000).is_empty());
    }

    #[test]
    fn upsample_24k_to_48k_length() {
        let out = resample_linear(&vec![0.0_f32; 240], 24_000, 48_000);
        assert_eq!(out.len(), 480);
    }

    #[test]
    fn upsample_24k_to_44100_length() {
        // 1 second at 24 kHz → ~44 100 samples
        let out = resample_linear(&vec![0.0_f32; 24_000], 24_000, 44_100);
        assert!(
            out.len().abs_diff(44_100) <= 1,
            "expected ~44100, got {}",
            out.len()
        );
    }

    #[test]
    fn constant_signal_preserves_amplitude() {
        let out = resample_linear(&vec![0.5_f32; 240], 24_000, 48_000);
        for &s in &out {
            assert!((s - 0.5).abs() < 1e-6, "amplitude drift: {s}");
        }
    }

    #[test]
    fn midpoints_are_interpolated() {
        let out = resample_linear(&[0.0, 1.0], 24_000, 48_000);
        assert_eq!(out.len(), 4);
        assert!((out[1] - 0.5).abs() < 1e-6);
    }

    // ---- interleave_for_device ---------------------------------------------

    #[test]
    fn mono_is_duplicated_to_stereo() {
        let buf = DecodedAudioBuffer::new(48_000, vec![vec![0.1, 0.2, 0.3]]);
        let out = interleave_for_device(&buf, 48_000, 2);
        assert_eq!(out, vec![0.1, 0.1, 0.2, 0.2, 0.3, 0.3]);
    }

    #[test]
    fn stereo_source_to_mono_device_keeps_first_channel() {
        let buf = DecodedAudioBuffer::new(48_000, vec![vec![0.1, 0.2], vec![0.9, 0.8]]);
        let out = interleave_for_device(&buf, 48_000, 1);
        assert_eq!(out, vec![0.1, 0.2]);
    }

    #[test]
    fn zero_device_channels_yields_empty() {
        let buf = DecodedAudioBuffer::new(24_000, vec![vec![0.1]]);
        assert!(interleave_for_device(&buf, 48_000, 0).is_empty());
    }

    #[test]
    fn resamples_while_interleaving() {
        let buf = DecodedAudioBuffer::new(24_000, vec![vec![0.0; 100]]);
        let out = interleave_for_device(&buf, 48_000, 2);
        assert_eq!(out.len(), 200 * 2);
    }
}
