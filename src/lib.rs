//! ProducTV: generate a short video ad and its voice-over with a generative
//! service, then preview them in sync.
//!
//! * [`genai`]   : video job submit/poll/fetch and speech synthesis.
//! * [`audio`]   : PCM decode and the scheduled output context.
//! * [`pipeline`]: the orchestrator state machine.
//! * [`playback`]: video surface and the synchronized preview.
//! * [`app`]     : the eframe window.
//! * [`config`]  : `settings.toml`.

pub mod app;
pub mod audio;
pub mod config;
pub mod genai;
pub mod pipeline;
pub mod playback;
