//! Preview playback.
//!
//! * [`VideoSurface`] / [`ExternalPlayer`]: present the fetched video.
//! * [`PlaybackCoordinator`]: start the video and schedule the voice-over
//!   [`PlaybackCoordinator::DEFAULT_OFFSET_SECS`] later on the audio clock.

pub mod coordinator;
pub mod video;

#[cfg(test)]
pub mod mock;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use coordinator::{PlaybackCoordinator, PlaybackError};
pub use video::{ExternalPlayer, VideoError, VideoSurface};
