//! Pipeline state machine and shared application state.
//!
//! [`PipelineState`] drives the orchestrator's state machine.  The UI reads
//! it via [`SharedState`] to render the matching panel.
//!
//! The finished assets live *inside* the variants: a video and a voice-over
//! exist only in [`PipelineState::Ready`] and an error only in
//! [`PipelineState::Failed`], so a state can never carry both or neither
//! half of a result.
//!
//! [`SharedState`] is a type alias for `Arc<Mutex<AppState>>`, cheap to clone
//! and safe to share across threads.

use std::sync::{Arc, Mutex};

use crate::audio::DecodedAudioBuffer;
use crate::config::AppConfig;
use crate::genai::{ErrorKind, VideoBlob};

// ---------------------------------------------------------------------------
// ErrorInfo
// ---------------------------------------------------------------------------

/// What the error panel shows after a failed run.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    /// User-facing text.
    pub message: String,
    /// The underlying error, for the log and the details expander.
    pub detail: String,
}

// ---------------------------------------------------------------------------
// PipelineState
// ---------------------------------------------------------------------------

/// States of the ad generation pipeline.
///
/// ```text
/// Idle ──generate──▶ CheckingPermission
///                      ──key present──▶ GeneratingVideo
///                                         ──video fetched──▶ GeneratingAudio
///                                                              ──decoded──▶ Ready
/// any in-flight state ──error──▶ Failed
/// Ready / Failed ──generate──▶ CheckingPermission
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PipelineState {
    /// Nothing generated yet.
    #[default]
    Idle,

    /// Asking the key selector whether a key is available.
    CheckingPermission,

    /// Video job submitted; polling until it completes.
    GeneratingVideo,

    /// Speech synthesis and PCM decode.
    GeneratingAudio,

    /// Both assets are available for preview.
    Ready {
        video: VideoBlob,
        audio: Arc<DecodedAudioBuffer>,
    },

    /// The last run failed.  A new run may be started.
    Failed(ErrorInfo),
}

impl PipelineState {
    /// Returns `true` while a run is in flight.
    ///
    /// The UI uses this to disable the generate button; the orchestrator uses
    /// it to drop overlapping generate requests.
    ///
    /// ```
    /// use productv::pipeline::PipelineState;
    ///
    /// assert!(!PipelineState::Idle.is_busy());
    /// assert!(PipelineState::CheckingPermission.is_busy());
    /// assert!(PipelineState::GeneratingVideo.is_busy());
    /// assert!(PipelineState::GeneratingAudio.is_busy());
    /// ```
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            PipelineState::CheckingPermission
                | PipelineState::GeneratingVideo
                | PipelineState::GeneratingAudio
        )
    }

    /// A short label for the status bar.
    pub fn label(&self) -> &'static str {
        match self {
            PipelineState::Idle => "Idle",
            PipelineState::CheckingPermission => "Checking",
            PipelineState::GeneratingVideo => "Video",
            PipelineState::GeneratingAudio => "Voice-over",
            PipelineState::Ready { .. } => "Ready",
            PipelineState::Failed(_) => "Error",
        }
    }

    /// Progress line shown under the generate button.
    pub fn status_message(&self) -> &'static str {
        match self {
            PipelineState::Idle | PipelineState::Failed(_) => "",
            PipelineState::CheckingPermission => "Checking permissions\u{2026}",
            PipelineState::GeneratingVideo => {
                "Generating video with Veo\u{2026} (this takes 1 to 2 minutes)"
            }
            PipelineState::GeneratingAudio => "Producing voice-over\u{2026}",
            PipelineState::Ready { .. } => "Ad generated successfully!",
        }
    }

    pub fn video(&self) -> Option<&VideoBlob> {
        match self {
            PipelineState::Ready { video, .. } => Some(video),
            _ => None,
        }
    }

    pub fn audio(&self) -> Option<&Arc<DecodedAudioBuffer>> {
        match self {
            PipelineState::Ready { audio, .. } => Some(audio),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorInfo> {
        match self {
            PipelineState::Failed(info) => Some(info),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// PermissionState
// ---------------------------------------------------------------------------

/// Whether a usable API key is selected.  Tracked apart from the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PermissionState {
    /// Not checked yet.
    #[default]
    Unknown,
    Granted,
    /// The key wall is shown.
    Missing,
}

impl PermissionState {
    pub fn from_has_key(has_key: bool) -> Self {
        if has_key {
            PermissionState::Granted
        } else {
            PermissionState::Missing
        }
    }
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// Shared application state, the single source of truth for the UI.
///
/// Held behind [`SharedState`].  The orchestrator mutates it; the egui update
/// loop reads it each frame.
pub struct AppState {
    /// Current pipeline state, replaced wholesale on each transition.
    pub pipeline: PipelineState,

    pub permission: PermissionState,

    /// Configuration snapshot the app was started with.
    pub config: AppConfig,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            pipeline: PipelineState::Idle,
            permission: PermissionState::Unknown,
            config,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}

// ---------------------------------------------------------------------------
// SharedState
// ---------------------------------------------------------------------------

/// Thread-safe handle to [`AppState`].
///
/// Lock with `.lock().unwrap()` for a short critical section; do **not** hold
/// the lock across `.await` points.
pub type SharedState = Arc<Mutex<AppState>>;

pub fn new_shared_state(config: AppConfig) -> SharedState {
    Arc::new(Mutex::new(AppState::new(config)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
