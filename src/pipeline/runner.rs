//! Pipeline orchestrator: drives permission check → video → voice-over →
//! decode, and serves preview requests.
//!
//! [`PipelineOrchestrator`] owns the [`SharedState`] and responds to
//! [`PipelineCommand`]s received over a `tokio::sync::mpsc` channel.
//!
//! # Pipeline flow
//!
//! ```text
//! PipelineCommand::Generate  (spawned; dropped while a run is in flight)
//!   └─▶ has_selected_api_key                       [CheckingPermission]
//!         └─▶ submit_and_await(prompt)             [GeneratingVideo]
//!               └─▶ synthesize_speech(text)        [GeneratingAudio]
//!                     └─▶ open audio context, decode_pcm16, load video
//!                           └─▶                    [Ready]
//!   any error ──▶ classify ──▶                     [Failed]
//!
//! PipelineCommand::Play       └─▶ PlaybackCoordinator::play
//! PipelineCommand::SelectKey  └─▶ open_select_key, then re-check
//! PipelineCommand::Shutdown   └─▶ cancel the run, release audio + video
//! ```
//!
//! Blocking work (opening the output device, writing the video file) is
//! pushed onto `tokio::task::spawn_blocking`.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::audio::{decode_pcm16, AudioContextSlot, DecodeError, DecodedAudioBuffer, OutputFactory};
use crate::config::{AdScript, AppConfig, MalformedPcmPolicy};
use crate::genai::{
    classify, submit_and_await, ErrorKind, GenAiError, GenerationClient, KeySelector, PollPolicy,
    VideoBlob, VideoParams,
};
use crate::playback::{PlaybackCoordinator, VideoSurface};

use super::state::{ErrorInfo, PermissionState, PipelineState, SharedState};

// ---------------------------------------------------------------------------
// PipelineCommand
// ---------------------------------------------------------------------------

/// Requests from the UI to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineCommand {
    /// Start a run unless one is in flight.
    Generate,
    /// Preview the ready ad.
    Play,
    /// Re-check whether a key is selected.
    CheckPermission,
    /// Store a key typed on the key wall, then re-check.
    SelectKey(String),
    /// Cancel any run and release playback resources.
    Shutdown,
}

// ---------------------------------------------------------------------------
// PipelineError
// ---------------------------------------------------------------------------

/// Errors that can end a run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    GenAi(#[from] GenAiError),

    #[error("voice-over could not be decoded: {0}")]
    Decode(#[from] DecodeError),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::GenAi(e) => classify(e),
            PipelineError::Decode(_) => ErrorKind::GenerationFailed,
        }
    }
}

// ---------------------------------------------------------------------------
// PipelineSettings
// ---------------------------------------------------------------------------

/// The parts of [`AppConfig`] a run needs.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub script: AdScript,
    pub video: VideoParams,
    pub poll: PollPolicy,
    pub voice: String,
    /// Rate the audio context is opened at.
    pub audio_rate: u32,
    pub malformed_policy: MalformedPcmPolicy,
    pub audio_offset_secs: f64,
}

impl PipelineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            script: config.script.clone(),
            video: VideoParams::from_config(&config.genai),
            poll: PollPolicy::from_config(&config.genai),
            voice: config.genai.voice.clone(),
            audio_rate: config.audio.sample_rate,
            malformed_policy: config.audio.malformed_policy,
            audio_offset_secs: config.playback.audio_offset_secs,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

// ---------------------------------------------------------------------------
// PipelineOrchestrator
// ---------------------------------------------------------------------------

/// Drives the ad generation pipeline.
///
/// Create with [`PipelineOrchestrator::new`], attach the optional
/// collaborators, then call [`run`](Self::run) inside a tokio task.  Cheap to
/// clone; clones share state, the audio context and the cancellation token.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use productv::audio::cpal_factory;
/// use productv::config::AppConfig;
/// use productv::genai::{CredentialStore, GeminiClient};
/// use productv::pipeline::{new_shared_state, PipelineOrchestrator, PipelineSettings};
///
/// # async fn example() {
/// let config = AppConfig::default();
/// let keys = CredentialStore::from_config(&config.genai);
/// let client = GeminiClient::from_config(&config.genai, keys.clone());
///
/// let orchestrator = PipelineOrchestrator::new(
///     new_shared_state(config.clone()),
///     Arc::new(client),
///     cpal_factory(),
///     PipelineSettings::from_config(&config),
/// )
/// .with_key_selector(Arc::new(keys));
///
/// let (cmd_tx, cmd_rx) = tokio::sync::mpsc::channel(16);
/// # drop(cmd_tx);
/// orchestrator.run(cmd_rx).await;
/// # }
/// ```
#[derive(Clone)]
pub struct PipelineOrchestrator {
    state: SharedState,
    client: Arc<dyn GenerationClient>,
    keys: Option<Arc<dyn KeySelector>>,
    audio: Arc<AudioContextSlot>,
    surface: Option<Arc<dyn VideoSurface>>,
    playback: PlaybackCoordinator,
    settings: Arc<PipelineSettings>,
    cancel: CancellationToken,
}

impl PipelineOrchestrator {
    /// Create a new orchestrator.
    ///
    /// # Arguments
    ///
    /// * `state`   : shared application state (also read by the UI).
    /// * `client`  : generative service (e.g. `GeminiClient`).
    /// * `audio`   : opens the output context on the first decode.
    /// * `settings`: script, video parameters and polling policy.
    pub fn new(
        state: SharedState,
        client: Arc<dyn GenerationClient>,
        audio: OutputFactory,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            state,
            client,
            keys: None,
            audio: Arc::new(AudioContextSlot::new(audio)),
            surface: None,
            playback: PlaybackCoordinator::new(settings.audio_offset_secs),
            settings: Arc::new(settings),
            cancel: CancellationToken::new(),
        }
    }

    /// Consult `keys` before each run.  Without one a key is assumed present.
    pub fn with_key_selector(mut self, keys: Arc<dyn KeySelector>) -> Self {
        self.keys = Some(keys);
        self
    }

    /// Load finished videos into `surface` for preview.
    pub fn with_video_surface(mut self, surface: Arc<dyn VideoSurface>) -> Self {
        self.surface = Some(surface);
        self
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    // -----------------------------------------------------------------------
    // Main async loop
    // -----------------------------------------------------------------------

    /// Run the orchestrator until `commands` closes or a
    /// [`PipelineCommand::Shutdown`] arrives.
    ///
    /// Runs started here are awaited before returning, then playback
    /// resources are released.
    pub async fn run(self, mut commands: mpsc::Receiver<PipelineCommand>) {
        let mut runs = JoinSet::new();

        while let Some(command) = commands.recv().await {
            match command {
                PipelineCommand::Generate => {
                    let me = self.clone();
                    runs.spawn(async move {
                        me.generate().await;
                    });
                }
                PipelineCommand::Play => {
                    self.play();
                }
                PipelineCommand::CheckPermission => {
                    self.check_permission().await;
                }
                PipelineCommand::SelectKey(key) => {
                    self.select_key(&key).await;
                }
                PipelineCommand::Shutdown => {
                    log::info!("pipeline: shutdown requested");
                    self.cancel.cancel();
                    break;
                }
            }

            while runs.try_join_next().is_some() {}
        }

        while let Some(joined) = runs.join_next().await {
            if let Err(e) = joined {
                log::warn!("pipeline: run task failed: {e}");
            }
        }

        self.shutdown();
        log::info!("pipeline: orchestrator stopped");
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Produce the ad.
    ///
    /// Returns `false` without side effects when a run is already in flight
    /// or the orchestrator has been shut down.
    pub async fn generate(&self) -> bool {
        if !self.try_begin() {
            log::debug!("pipeline: generate ignored, run in flight");
            return false;
        }

        let outcome = tokio::select! {
            res = self.produce() => Some(res),
            _ = self.cancel.cancelled() => None,
        };

        match outcome {
            Some(Ok((video, audio))) => {
                self.load_video(&video).await;
                log::info!(
                    "pipeline: ad ready ({} video bytes, {:.2}s voice-over)",
                    video.len(),
                    audio.duration_secs()
                );
                self.set_pipeline(PipelineState::Ready { video, audio });
            }
            Some(Err(e)) => self.set_error(e),
            None => {
                log::info!("pipeline: run cancelled");
                self.set_pipeline(PipelineState::Idle);
            }
        }
        true
    }

    /// Preview the ready ad.  Returns `false` when nothing was started.
    pub fn play(&self) -> bool {
        let audio = self.state.lock().unwrap().pipeline.audio().cloned();
        let context = self.audio.get();

        match self
            .playback
            .play(self.surface.as_deref(), audio.as_deref(), context.as_deref())
        {
            Ok(played) => played,
            Err(e) => {
                log::warn!("pipeline: playback failed: {e}");
                false
            }
        }
    }

    /// Ask the key selector whether a key is available and publish the
    /// answer.  A failing check counts as no key.
    pub async fn check_permission(&self) -> PermissionState {
        let has_key = match &self.keys {
            None => true,
            Some(keys) => match keys.has_selected_api_key().await {
                Ok(has_key) => has_key,
                Err(e) => {
                    log::warn!("pipeline: key check failed: {e}");
                    false
                }
            },
        };

        let permission = PermissionState::from_has_key(has_key);
        self.state.lock().unwrap().permission = permission;
        permission
    }

    /// Select `key`, then re-check instead of assuming it worked.
    pub async fn select_key(&self, key: &str) -> PermissionState {
        if let Some(keys) = &self.keys {
            if let Err(e) = keys.open_select_key(key).await {
                log::warn!("pipeline: key selection failed: {e}");
            }
        }
        self.check_permission().await
    }

    /// Cancel any in-flight run and release playback resources.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        self.audio.release();
        if let Some(surface) = &self.surface {
            surface.stop();
        }
    }

    // -----------------------------------------------------------------------
    // Run stages
    // -----------------------------------------------------------------------

    /// Busy check and the move to `CheckingPermission` in one critical
    /// section, so two triggers can never both start a run.
    fn try_begin(&self) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        let mut st = self.state.lock().unwrap();
        if st.pipeline.is_busy() {
            return false;
        }
        st.pipeline = PipelineState::CheckingPermission;
        true
    }

    async fn produce(&self) -> Result<(VideoBlob, Arc<DecodedAudioBuffer>), PipelineError> {
        let settings = &self.settings;

        if self.check_permission().await != PermissionState::Granted {
            return Err(GenAiError::MissingCredential.into());
        }

        self.set_pipeline(PipelineState::GeneratingVideo);
        let video = submit_and_await(
            self.client.as_ref(),
            &settings.script.video_prompt,
            &settings.video,
            &settings.poll,
        )
        .await?;
        log::debug!("pipeline: video fetched ({} bytes)", video.len());

        self.set_pipeline(PipelineState::GeneratingAudio);
        let payload = self
            .client
            .synthesize_speech(&settings.script.voice_over_text, &settings.voice)
            .await?;

        self.open_audio_context().await;

        let buffer = decode_pcm16(
            &payload.bytes,
            payload.sample_rate,
            payload.channels,
            settings.malformed_policy,
        )?;

        Ok((video, Arc::new(buffer)))
    }

    /// Open the output context on first use.  Failure only silences the
    /// preview, so it is logged and the run continues.
    async fn open_audio_context(&self) {
        let slot = Arc::clone(&self.audio);
        let rate = self.settings.audio_rate;

        match tokio::task::spawn_blocking(move || slot.get_or_open(rate)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => log::warn!("pipeline: audio output unavailable, preview will not play: {e}"),
            Err(e) => log::warn!("pipeline: audio open task panicked: {e}"),
        }
    }

    async fn load_video(&self, video: &VideoBlob) {
        let Some(surface) = self.surface.clone() else {
            return;
        };
        let video = video.clone();

        match tokio::task::spawn_blocking(move || surface.load(&video)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::warn!("pipeline: video could not be loaded for preview: {e}"),
            Err(e) => log::warn!("pipeline: video load task panicked: {e}"),
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn set_pipeline(&self, state: PipelineState) {
        log::debug!("pipeline: → {}", state.label());
        let mut st = self.state.lock().unwrap();
        st.pipeline = state;
    }

    fn set_error(&self, error: PipelineError) {
        let kind = error.kind();
        log::error!("pipeline error ({kind:?}): {error}");

        let info = ErrorInfo {
            kind,
            message: kind.user_message().to_string(),
            detail: error.to_string(),
        };

        let mut st = self.state.lock().unwrap();
        if kind.resets_permission() {
            st.permission = PermissionState::Missing;
        }
        st.pipeline = PipelineState::Failed(info);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
