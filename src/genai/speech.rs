//! Speech payload helpers.
//!
//! The speech model returns its audio as a base64 string inside the JSON
//! response, tagged with a MIME type such as
//! `audio/L16;codec=pcm;rate=24000`.

use base64::{engine::general_purpose, Engine as _};

use super::error::GenAiError;

/// Raw voice-over audio between receipt and decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAudioPayload {
    /// Signed 16-bit little-endian PCM.
    pub bytes: Vec<u8>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl RawAudioPayload {
    /// Rate the speech model produces when the MIME type does not say.
    pub const SAMPLE_RATE: u32 = 24_000;
    /// The speech model always produces mono.
    pub const CHANNELS: u16 = 1;
}

/// Decode the base64 transport encoding into raw bytes.
pub fn decode_inline_audio(data: &str) -> Result<Vec<u8>, GenAiError> {
    general_purpose::STANDARD
        .decode(data.trim())
        .map_err(|e| GenAiError::InvalidPayload(format!("audio base64: {e}")))
}

/// Extract `rate=N` from an audio MIME type.
pub fn sample_rate_from_mime(mime: &str) -> Option<u32> {
    mime.split(';')
        .filter_map(|param| param.trim().strip_prefix("rate="))
        .find_map(|rate| rate.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_standard_base64() {
        assert_eq!(decode_inline_audio("AAEC").unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        assert_eq!(decode_inline_audio(" AAEC\n").unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn invalid_base64_is_invalid_payload() {
        assert!(matches!(
            decode_inline_audio("not base64!"),
            Err(GenAiError::InvalidPayload(_))
        ));
    }

    #[test]
    fn empty_string_decodes_to_empty() {
        assert!(decode_inline_audio("").unwrap().is_empty());
    }

    #[test]
    fn rate_is_read_from_mime() {
        assert_eq!(sample_rate_from_mime("audio/L16;codec=pcm;rate=24000"), Some(24_000));
        assert_eq!(sample_rate_from_mime("audio/L16; rate=16000"), Some(16_000));
    }

    #[test]
    fn mime_without_rate() {
        assert_eq!(sample_rate_from_mime("audio/L16"), None);
        assert_eq!(sample_rate_from_mime("audio/L16;rate=abc"), None);
    }
}
