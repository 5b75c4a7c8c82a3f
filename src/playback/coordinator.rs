//! Synchronized preview: video now, voice-over a fixed offset later.

use thiserror::Error;

use crate::audio::{AudioOutput, DecodedAudioBuffer, OutputError};
use crate::config::PlaybackConfig;

use super::video::{VideoError, VideoSurface};

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error(transparent)]
    Video(#[from] VideoError),

    #[error(transparent)]
    Audio(#[from] OutputError),
}

/// Starts the video and schedules the voice-over on the audio clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackCoordinator {
    /// Seconds between video start and voice-over start.
    audio_offset: f64,
}

impl PlaybackCoordinator {
    pub const DEFAULT_OFFSET_SECS: f64 = 3.5;

    pub fn new(audio_offset: f64) -> Self {
        Self {
            audio_offset: audio_offset.max(0.0),
        }
    }

    pub fn from_config(config: &PlaybackConfig) -> Self {
        Self::new(config.audio_offset_secs)
    }

    pub fn audio_offset(&self) -> f64 {
        self.audio_offset
    }

    /// Restart the video from its first frame and schedule `audio` at
    /// `context.current_time() + offset`.
    ///
    /// Returns `Ok(false)` without touching anything when the video surface
    /// has nothing loaded or either audio input is missing.
    pub fn play(
        &self,
        video: Option<&dyn VideoSurface>,
        audio: Option<&DecodedAudioBuffer>,
        context: Option<&dyn AudioOutput>,
    ) -> Result<bool, PlaybackError> {
        let (Some(video), Some(audio), Some(context)) = (video, audio, context) else {
            log::debug!("playback: missing video, voice-over or audio context; ignoring");
            return Ok(false);
        };
        if !video.is_loaded() {
            log::debug!("playback: no video loaded; ignoring");
            return Ok(false);
        }

        video.seek_to_start();
        video.play()?;

        let when = context.current_time() + self.audio_offset;
        context.start_at(audio, when)?;

        log::info!(
            "playback: video started, voice-over ({:.2}s) scheduled at t={when:.3}s",
            audio.duration_secs()
        );
        Ok(true)
    }
}

impl Default for PlaybackCoordinator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_OFFSET_SECS)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genai::VideoBlob;
    use crate::playback::mock::{RecordingOutput, RecordingSurface};

    fn voice_over() -> DecodedAudioBuffer {
        DecodedAudioBuffer::new(24_000, vec![vec![0.1; 48_000]])
    }

    fn surface() -> RecordingSurface {
        RecordingSurface::loaded_with(VideoBlob::new(vec![0u8; 16], "video/mp4"))
    }

    #[test]
    fn schedules_audio_at_now_plus_offset() {
        let video = surface();
        let ctx = RecordingOutput::at(12.0);
        let audio = voice_over();

        let played = PlaybackCoordinator::default()
            .play(Some(&video), Some(&audio), Some(&ctx))
            .unwrap();

        assert!(played);
        assert_eq!(video.calls(), vec!["seek", "play"]);
        assert_eq!(ctx.starts(), vec![(15.5, 48_000)]);
    }

    #[test]
    fn offset_comes_from_config() {
        let coordinator = PlaybackCoordinator::from_config(&PlaybackConfig {
            audio_offset_secs: 1.25,
            ..PlaybackConfig::default()
        });
        let ctx = RecordingOutput::at(0.0);

        coordinator
            .play(Some(&surface()), Some(&voice_over()), Some(&ctx))
            .unwrap();

        assert_eq!(ctx.starts()[0].0, 1.25);
    }

    #[test]
    fn negative_offset_is_clamped() {
        assert_eq!(PlaybackCoordinator::new(-2.0).audio_offset(), 0.0);
    }

    #[test]
    fn missing_input_is_noop() {
        let coordinator = PlaybackCoordinator::default();
        let video = surface();
        let ctx = RecordingOutput::at(0.0);
        let audio = voice_over();

        assert!(!coordinator.play(None, Some(&audio), Some(&ctx)).unwrap());
        assert!(!coordinator.play(Some(&video), None, Some(&ctx)).unwrap());
        assert!(!coordinator.play(Some(&video), Some(&audio), None).unwrap());

        assert!(video.calls().is_empty());
        assert!(ctx.starts().is_empty());
    }

    #[test]
    fn unloaded_surface_is_noop() {
        let video = RecordingSurface::default();
        let ctx = RecordingOutput::at(0.0);

        let played = PlaybackCoordinator::default()
            .play(Some(&video), Some(&voice_over()), Some(&ctx))
            .unwrap();

        assert!(!played);
        assert!(ctx.starts().is_empty());
    }

    #[test]
    fn video_failure_skips_audio() {
        let video = surface().failing_play();
        let ctx = RecordingOutput::at(0.0);

        let result = PlaybackCoordinator::default().play(Some(&video), Some(&voice_over()), Some(&ctx));

        assert!(matches!(result, Err(PlaybackError::Video(_))));
        assert!(ctx.starts().is_empty());
    }
}
