//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// MalformedPcmPolicy
// ---------------------------------------------------------------------------

/// What the PCM decoder does when the payload length is not a whole number
/// of frames.
///
/// | Variant    | Behaviour                                          |
/// |------------|----------------------------------------------------|
/// | Truncate   | Drop the trailing partial frame, never pad         |
/// | Reject     | Fail with `DecodeError::InvalidAudioPayload`       |
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MalformedPcmPolicy {
    #[default]
    Truncate,
    Reject,
}

// ---------------------------------------------------------------------------
// GenAiConfig
// ---------------------------------------------------------------------------

/// Settings for the generative-AI REST service (video + speech).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenAiConfig {
    /// Base URL of the Generative Language API.
    pub base_url: String,
    /// API key stored in settings.  `None` falls back to the `GEMINI_API_KEY`
    /// / `API_KEY` environment variables, then to the key wall.
    pub api_key: Option<String>,
    /// Long-running video model (e.g. `"veo-3.1-fast-generate-preview"`).
    pub video_model: String,
    /// Speech model (e.g. `"gemini-2.5-flash-preview-tts"`).
    pub tts_model: String,
    /// Prebuilt voice name passed to the speech model.
    pub voice: String,
    /// Number of videos requested per job.
    pub number_of_videos: u32,
    /// Target resolution (`"720p"` / `"1080p"`).
    pub resolution: String,
    /// Target aspect ratio (`"16:9"` / `"9:16"`).
    pub aspect_ratio: String,
    /// Seconds between two polls of a running video job.
    pub poll_interval_secs: u64,
    /// Maximum number of polls before giving up with a timeout.
    /// `None` polls until the job completes.
    pub max_poll_attempts: Option<u32>,
    /// Per-request HTTP timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for GenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".into(),
            api_key: None,
            video_model: "veo-3.1-fast-generate-preview".into(),
            tts_model: "gemini-2.5-flash-preview-tts".into(),
            voice: "Kore".into(),
            number_of_videos: 1,
            resolution: "1080p".into(),
            aspect_ratio: "16:9".into(),
            poll_interval_secs: 10,
            // 60 polls × 10 s = 10 minutes, well past the usual 1-2 minutes.
            max_poll_attempts: Some(60),
            timeout_secs: 120,
        }
    }
}

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// Settings for decoding the synthesized voice-over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Rate the output context is opened at.  Matches the speech model's
    /// 24 kHz so the voice-over plays without resampling when the device
    /// allows it.
    pub sample_rate: u32,
    /// Handling of payloads that end in a partial frame.
    pub malformed_policy: MalformedPcmPolicy,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 24_000,
            malformed_policy: MalformedPcmPolicy::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// PlaybackConfig
// ---------------------------------------------------------------------------

/// Settings for the synchronized preview.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Delay between video start and voice-over start, in seconds.  Matches
    /// the intro pacing of the generated clip.
    pub audio_offset_secs: f64,
    /// External program used to present the video.
    pub player_command: String,
    /// Arguments passed before the video file path.
    pub player_args: Vec<String>,
    /// Directory the fetched video is written to.  `None` uses the system
    /// temporary directory.
    #[serde(default)]
    pub video_dir: Option<PathBuf>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            audio_offset_secs: 3.5,
            player_command: "ffplay".into(),
            player_args: vec!["-autoexit".into(), "-loglevel".into(), "error".into()],
            video_dir: None,
        }
    }
}

// ---------------------------------------------------------------------------
// AdScript
// ---------------------------------------------------------------------------

/// The ad being produced: what the video model is asked to render and what
/// the voice-over says.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdScript {
    /// Full prompt sent to the video model.
    pub video_prompt: String,
    /// Text sent to the speech model (may include a delivery direction).
    pub voice_over_text: String,
    /// Short description of the visuals shown in the script panel.
    pub scene_summary: String,
    /// The spoken line as shown in the script panel.
    pub voice_over_display: String,
}

impl Default for AdScript {
    fn default() -> Self {
        Self {
            video_prompt: "A cinematic 8-second advertisement for a productivity app. \
Start: A 35-year-old male entrepreneur in a blue shirt looks stressed and overwhelmed in a \
workspace cluttered with floating physical post-it notes and aggressive digital notification \
pop-ups. \
Transition: He discovers a sleek mobile app on his phone and smiles with relief. \
End: Suddenly, the chaos transforms into a clean, minimalist, and perfectly organized office \
with calm blue lighting and streamlined digital dashboards. \
Atmosphere: Modern, high-end corporate style."
                .into(),
            voice_over_text: "Say confidently: Le chaos, c\u{2019}est terminé.".into(),
            scene_summary: "Digital chaos to perfect organisation. (8s)".into(),
            voice_over_display: "\u{ab} Le chaos, c\u{2019}est terminé. \u{bb}".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// UiConfig
// ---------------------------------------------------------------------------

/// eframe window settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Initial inner window size `(width, height)` in points.
    pub window_size: (f32, f32),
    /// Keep the window above all other windows.
    pub always_on_top: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            window_size: (760.0, 520.0),
            always_on_top: false,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use productv::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Generative service settings.
    pub genai: GenAiConfig,
    /// Voice-over decoding settings.
    pub audio: AudioConfig,
    /// Preview settings.
    pub playback: PlaybackConfig,
    /// Prompt and voice-over text.
    pub script: AdScript,
    /// Window settings.
    pub ui: UiConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = AppConfig::default();
        original.save_to(&path).expect("save");

        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(original.genai.base_url, loaded.genai.base_url);
        assert_eq!(original.genai.api_key, loaded.genai.api_key);
        assert_eq!(original.genai.video_model, loaded.genai.video_model);
        assert_eq!(original.genai.voice, loaded.genai.voice);
        assert_eq!(original.genai.max_poll_attempts, loaded.genai.max_poll_attempts);
        assert_eq!(original.audio.sample_rate, loaded.audio.sample_rate);
        assert_eq!(original.audio.malformed_policy, loaded.audio.malformed_policy);
        assert_eq!(original.playback.player_args, loaded.playback.player_args);
        assert_eq!(original.script.video_prompt, loaded.script.video_prompt);
        assert_eq!(original.script.voice_over_text, loaded.script.voice_over_text);
        assert_eq!(original.ui.window_size, loaded.ui.window_size);
    }

    /// `load_from` on a non-existent path must return `Default` without error.
    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        let default = AppConfig::default();

        assert_eq!(config.genai.tts_model, default.genai.tts_model);
        assert_eq!(config.audio.sample_rate, default.audio.sample_rate);
        assert_eq!(config.playback.player_command, default.playback.player_command);
    }

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.genai.number_of_videos, 1);
        assert_eq!(cfg.genai.resolution, "1080p");
        assert_eq!(cfg.genai.aspect_ratio, "16:9");
        assert_eq!(cfg.genai.voice, "Kore");
        assert_eq!(cfg.genai.poll_interval_secs, 10);
        assert!(cfg.genai.api_key.is_none());
        assert_eq!(cfg.audio.sample_rate, 24_000);
        assert_eq!(cfg.audio.malformed_policy, MalformedPcmPolicy::Truncate);
        assert!((cfg.playback.audio_offset_secs - 3.5).abs() < f64::EPSILON);
    }

    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("modified.toml");

        let mut cfg = AppConfig::default();
        cfg.genai.api_key = Some("AIza-test".into());
        cfg.genai.max_poll_attempts = None;
        cfg.genai.resolution = "720p".into();
        cfg.audio.malformed_policy = MalformedPcmPolicy::Reject;
        cfg.playback.audio_offset_secs = 2.0;
        cfg.playback.player_command = "mpv".into();
        cfg.script.voice_over_text = "Hello".into();

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.genai.api_key.as_deref(), Some("AIza-test"));
        assert_eq!(loaded.genai.max_poll_attempts, None);
        assert_eq!(loaded.genai.resolution, "720p");
        assert_eq!(loaded.audio.malformed_policy, MalformedPcmPolicy::Reject);
        assert!((loaded.playback.audio_offset_secs - 2.0).abs() < f64::EPSILON);
        assert_eq!(loaded.playback.player_command, "mpv");
        assert_eq!(loaded.script.voice_over_text, "Hello");
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "genai = [not toml").expect("write");

        assert!(AppConfig::load_from(&path).is_err());
    }
}
