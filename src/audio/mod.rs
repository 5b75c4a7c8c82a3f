//! Audio: voice-over decoding, format conversion and scheduled playback.
//!
//! # Pipeline
//!
//! ```text
//! speech model → base64 PCM s16le 24 kHz mono → decode_pcm16
//!           → DecodedAudioBuffer → interleave_for_device (resample)
//!           → AudioOutput::start_at (cpal output stream)
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use productv::audio::{decode_pcm16, AudioOutput, CpalAudioContext};
//! use productv::config::MalformedPcmPolicy;
//!
//! let pcm: Vec<u8> = vec![0; 48_000]; // 1 s of silence at 24 kHz
//! let buffer = decode_pcm16(&pcm, 24_000, 1, MalformedPcmPolicy::Truncate).unwrap();
//!
//! let ctx = CpalAudioContext::open(24_000).unwrap();
//! ctx.start_at(&buffer, ctx.current_time() + 0.5).unwrap();
//! ```

pub mod decode;
pub mod output;
pub mod resample;

pub use decode::{decode_pcm16, DecodeError, DecodedAudioBuffer};
pub use output::{
    cpal_factory, AudioContextSlot, AudioOutput, CpalAudioContext, OutputError, OutputFactory,
};
pub use resample::{interleave_for_device, resample_linear};
