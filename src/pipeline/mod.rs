//! Ad pipeline orchestrator for ProducTV.
//!
//! This module sequences the generative calls and exposes the shared state
//! that the UI reads every frame.
//!
//! # Architecture
//!
//! ```text
//! PipelineCommand (mpsc)
//!        │
//!        ▼
//! PipelineOrchestrator::run()  ← async tokio task
//!        │
//!        ├─ Generate         → spawn generate()  (no-op while busy)
//!        │     ├─ KeySelector::has_selected_api_key   → CheckingPermission
//!        │     ├─ submit_and_await(prompt)            → GeneratingVideo
//!        │     ├─ synthesize_speech + decode_pcm16    → GeneratingAudio
//!        │     └─ VideoSurface::load                  → Ready
//!        ├─ Play             → PlaybackCoordinator::play
//!        ├─ SelectKey        → open_select_key + re-check
//!        └─ Shutdown         → cancel, release audio context
//!
//! SharedState (Arc<Mutex<AppState>>) ←─── read by egui update() each frame
//! ```

pub mod runner;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use runner::{PipelineCommand, PipelineError, PipelineOrchestrator, PipelineSettings};
pub use state::{new_shared_state, AppState, ErrorInfo, PermissionState, PipelineState, SharedState};
