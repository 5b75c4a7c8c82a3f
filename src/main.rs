//! Application entry point: ProducTV.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Create [`tokio`] runtime (multi-thread, 2 workers).
//! 4. Build the credential store and the [`GeminiClient`] from config.
//! 5. Create the pipeline command channel.
//! 6. Spawn the pipeline orchestrator on the tokio runtime and queue the
//!    startup key check.
//! 7. Run [`eframe::run_native`]: blocks the main thread until the window
//!    is closed.
//! 8. Wait for the orchestrator to release audio and video.

use std::sync::Arc;

use eframe::egui;
use productv::{
    app::ProducTvApp,
    audio::cpal_factory,
    config::AppConfig,
    genai::{CredentialStore, GeminiClient},
    pipeline::{new_shared_state, PipelineCommand, PipelineOrchestrator, PipelineSettings},
    playback::ExternalPlayer,
};
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Native options builder
// ---------------------------------------------------------------------------

fn native_options(config: &AppConfig) -> eframe::NativeOptions {
    let (width, height) = config.ui.window_size;
    let mut vp = egui::ViewportBuilder::default()
        .with_title("ProducTV")
        .with_inner_size([width, height])
        .with_min_inner_size([480.0, 360.0]);

    if config.ui.always_on_top {
        vp = vp.with_always_on_top();
    }

    eframe::NativeOptions {
        viewport: vp,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> eframe::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("ProducTV starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    // 3. Tokio runtime (2 worker threads: the orchestrator and a run)
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to create tokio runtime");

    // 4. Credentials + generative client
    let credentials = CredentialStore::from_config(&config.genai);
    let client = GeminiClient::from_config(&config.genai, credentials.clone());
    log::info!(
        "Video model: {}, speech model: {}",
        config.genai.video_model,
        config.genai.tts_model
    );

    // 5. Channel setup
    let (command_tx, command_rx) = mpsc::channel::<PipelineCommand>(16);

    // 6. Orchestrator
    let state = new_shared_state(config.clone());
    let orchestrator = PipelineOrchestrator::new(
        Arc::clone(&state),
        Arc::new(client),
        cpal_factory(),
        PipelineSettings::from_config(&config),
    )
    .with_key_selector(Arc::new(credentials))
    .with_video_surface(Arc::new(ExternalPlayer::from_config(&config.playback)));

    let pipeline = rt.spawn(orchestrator.run(command_rx));

    if let Err(e) = command_tx.try_send(PipelineCommand::CheckPermission) {
        log::warn!("Startup key check not queued: {e}");
    }

    // 7. Build the egui app and run it (blocks until the window is closed)
    let app = ProducTvApp::new(state, command_tx.clone(), config.clone());
    let options = native_options(&config);

    let result = eframe::run_native(
        "ProducTV",
        options,
        Box::new(move |_cc| Ok(Box::new(app))),
    );

    // 8. Teardown: the app sends Shutdown on exit; closing the channel covers
    //    the paths where it could not.
    drop(command_tx);
    if let Err(e) = rt.block_on(pipeline) {
        log::warn!("Pipeline task ended abnormally: {e}");
    }

    result
}
