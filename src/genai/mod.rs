//! Generative service client for ProducTV.
//!
//! This module provides:
//! * [`GenerationClient`]: async trait over the four remote operations.
//! * [`GeminiClient`]: Generative Language REST implementation.
//! * [`submit_and_await`] / [`PollPolicy`]: bounded video job polling.
//! * [`CredentialStore`] / [`KeySelector`]: the swappable API key and the
//!   key-selection collaborator.
//! * [`GenAiError`] / [`ErrorKind`] / [`classify`]: errors and their
//!   user-facing classification.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use productv::config::AppConfig;
//! use productv::genai::{
//!     submit_and_await, CredentialStore, GeminiClient, GenerationClient, PollPolicy, VideoParams,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let client = GeminiClient::from_config(&config.genai, CredentialStore::from_config(&config.genai));
//!
//!     let video = submit_and_await(
//!         &client,
//!         &config.script.video_prompt,
//!         &VideoParams::from_config(&config.genai),
//!         &PollPolicy::from_config(&config.genai),
//!     )
//!     .await
//!     .unwrap();
//!
//!     let speech = client.synthesize_speech("Hello", "Kore").await.unwrap();
//!     println!("{} video bytes, {} audio bytes", video.len(), speech.bytes.len());
//! }
//! ```

pub mod client;
pub mod credentials;
pub mod error;
pub mod speech;
pub mod video;

#[cfg(test)]
pub mod mock;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use client::{GeminiClient, GenerationClient, VideoBlob, VideoJob, VideoParams};
pub use credentials::{CredentialStore, KeySelector};
pub use error::{classify, classify_message, ErrorKind, GenAiError};
pub use speech::RawAudioPayload;
pub use video::{submit_and_await, PollPolicy};
