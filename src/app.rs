//! ProducTV studio window: egui/eframe application.
//!
//! # Architecture
//!
//! [`ProducTvApp`] is the top-level [`eframe::App`].  It owns:
//!
//! * `state`     : the [`SharedState`] the orchestrator publishes to; read
//!   every frame.
//! * `command_tx`: sends [`PipelineCommand`]s to the orchestrator.
//!
//! The window never mutates pipeline state itself.  Buttons only send
//! commands; the next frame shows whatever the orchestrator published.
//!
//! # Views
//!
//! | Permission | Pipeline             | Visual                               |
//! |------------|----------------------|--------------------------------------|
//! | `Unknown`  | any                  | Spinner + "Checking API key…"        |
//! | `Missing`  | any                  | Key wall: key field + "Select key"   |
//! | `Granted`  | `Idle`               | Script + "Generate ad"               |
//! | `Granted`  | busy                 | Script + spinner + status message    |
//! | `Granted`  | `Ready`              | Script + "Play ad", green           |
//! | `Granted`  | `Failed`             | Script + error panel, orange        |

use std::time::Duration;

use eframe::egui;
use tokio::sync::mpsc;

use crate::config::AppConfig;
use crate::pipeline::{ErrorInfo, PermissionState, PipelineCommand, PipelineState, SharedState};

const BILLING_DOCS_URL: &str = "https://ai.google.dev/gemini-api/docs/billing";

const ACCENT: egui::Color32 = egui::Color32::from_rgb(68, 136, 255);
const SUCCESS: egui::Color32 = egui::Color32::from_rgb(80, 200, 120);
const WARNING: egui::Color32 = egui::Color32::from_rgb(255, 136, 68);
const DIM: egui::Color32 = egui::Color32::from_rgb(140, 140, 140);

// ---------------------------------------------------------------------------
// ProducTvApp
// ---------------------------------------------------------------------------

/// eframe application for the ad studio.
pub struct ProducTvApp {
    // ── Shared state ─────────────────────────────────────────────────────
    state: SharedState,

    // ── UI state ─────────────────────────────────────────────────────────
    /// Text typed into the key wall.  Cleared once sent.
    key_input: String,
    /// Whether the error details expander is open.
    show_details: bool,
    /// Spinner animation phase (increases each frame).
    spinner_phase: f32,

    // ── Channels ─────────────────────────────────────────────────────────
    command_tx: mpsc::Sender<PipelineCommand>,

    // ── Configuration ────────────────────────────────────────────────────
    config: AppConfig,
}

impl ProducTvApp {
    /// * `state`     : shared state published by the orchestrator.
    /// * `command_tx`: sender end of the pipeline command channel.
    /// * `config`    : loaded application configuration.
    pub fn new(
        state: SharedState,
        command_tx: mpsc::Sender<PipelineCommand>,
        config: AppConfig,
    ) -> Self {
        Self {
            state,
            key_input: String::new(),
            show_details: false,
            spinner_phase: 0.0,
            command_tx,
            config,
        }
    }

    fn send(&self, command: PipelineCommand) {
        if let Err(e) = self.command_tx.try_send(command) {
            log::warn!("ui: pipeline command dropped: {e}");
        }
    }

    /// Snapshot the parts of the shared state this frame needs, releasing
    /// the lock before drawing.
    fn snapshot(&self) -> (PipelineState, PermissionState) {
        let st = self.state.lock().unwrap();
        (st.pipeline.clone(), st.permission)
    }

    // ── Header ───────────────────────────────────────────────────────────

    fn draw_header(&self, ui: &mut egui::Ui, pipeline: &PipelineState) {
        ui.horizontal(|ui| {
            ui.heading(egui::RichText::new("ProducTV").color(ACCENT).strong());
            ui.label(egui::RichText::new("AI ad studio").color(DIM).size(12.0));

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(
                    egui::RichText::new(pipeline.label())
                        .color(state_color(pipeline))
                        .size(12.0),
                );
            });
        });
    }

    // ── Permission views ─────────────────────────────────────────────────

    fn draw_checking_key(&self, ui: &mut egui::Ui) {
        ui.add_space(24.0);
        ui.vertical_centered(|ui| {
            ui.label(
                egui::RichText::new(format!("{} Checking API key\u{2026}", self.spinner_char()))
                    .color(ACCENT)
                    .size(14.0),
            );
        });
    }

    /// Shown instead of the studio while no usable key is selected.  The
    /// failure that sent the user here, if any, is shown above the field.
    fn draw_key_wall(&mut self, ui: &mut egui::Ui, pipeline: &PipelineState) {
        ui.add_space(16.0);
        ui.vertical_centered(|ui| {
            ui.label(egui::RichText::new("API key required").size(18.0).strong());
            ui.add_space(6.0);
            if let Some(error) = key_wall_notice(pipeline) {
                ui.label(egui::RichText::new(&error.message).color(WARNING));
                ui.add_space(4.0);
            }
            ui.label(
                egui::RichText::new(
                    "Veo video generation needs a key from a Google Cloud project \
                     with billing enabled.",
                )
                .color(DIM),
            );
            ui.hyperlink_to("Billing documentation", BILLING_DOCS_URL);
            ui.label(
                egui::RichText::new(
                    "If a 403 error persists, select a key from a project with billing enabled.",
                )
                .color(DIM)
                .size(11.0),
            );
            ui.add_space(12.0);

            let field = ui.add(
                egui::TextEdit::singleline(&mut self.key_input)
                    .password(true)
                    .hint_text("Paste your API key")
                    .desired_width(320.0),
            );
            let submitted = field.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));

            ui.add_space(6.0);
            let can_select = is_plausible_key(&self.key_input);
            let clicked = ui
                .add_enabled(can_select, egui::Button::new("Select key"))
                .clicked();

            if (clicked || submitted) && can_select {
                let key = std::mem::take(&mut self.key_input);
                self.send(PipelineCommand::SelectKey(key.trim().to_string()));
            }
        });
    }

    // ── Studio views ─────────────────────────────────────────────────────

    fn draw_script(&self, ui: &mut egui::Ui) {
        egui::Frame::group(ui.style()).show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.label(egui::RichText::new("Scene").color(DIM).size(11.0));
            ui.label(&self.config.script.scene_summary);
            ui.add_space(4.0);
            ui.label(egui::RichText::new("Voice-over").color(DIM).size(11.0));
            ui.label(egui::RichText::new(&self.config.script.voice_over_display).italics());
        });
    }

    fn draw_controls(&self, ui: &mut egui::Ui, pipeline: &PipelineState) {
        ui.add_space(8.0);
        ui.horizontal(|ui| {
            let label = if matches!(pipeline, PipelineState::Idle) {
                "Generate ad"
            } else {
                "Generate again"
            };
            if ui
                .add_enabled(!pipeline.is_busy(), egui::Button::new(label))
                .clicked()
            {
                self.send(PipelineCommand::Generate);
            }

            if pipeline.is_busy() {
                ui.label(
                    egui::RichText::new(format!(
                        "{} {}",
                        self.spinner_char(),
                        pipeline.status_message()
                    ))
                    .color(ACCENT),
                );
            }
        });
    }

    fn draw_ready(&self, ui: &mut egui::Ui, pipeline: &PipelineState) {
        let (Some(video), Some(audio)) = (pipeline.video(), pipeline.audio()) else {
            return;
        };

        ui.add_space(8.0);
        ui.label(egui::RichText::new(pipeline.status_message()).color(SUCCESS));
        ui.label(
            egui::RichText::new(format!(
                "{:.1} MB video, {:.1} s voice-over starting {:.1} s in",
                video.len() as f64 / 1_048_576.0,
                audio.duration_secs(),
                self.config.playback.audio_offset_secs
            ))
            .color(DIM)
            .size(11.0),
        );
        ui.add_space(4.0);
        if ui.button("\u{25b6} Play ad").clicked() {
            self.send(PipelineCommand::Play);
        }
    }

    fn draw_error(&mut self, ui: &mut egui::Ui, error: &ErrorInfo) {
        ui.add_space(8.0);
        egui::Frame::group(ui.style())
            .stroke(egui::Stroke::new(1.0, WARNING))
            .show(ui, |ui| {
                ui.set_width(ui.available_width());
                ui.label(egui::RichText::new(&error.message).color(WARNING));
                ui.add_space(2.0);
                ui.checkbox(&mut self.show_details, "Details");
                if self.show_details {
                    ui.label(egui::RichText::new(&error.detail).color(DIM).size(11.0));
                }
            });
    }

    // ── Helpers ──────────────────────────────────────────────────────────

    /// A simple rotating ASCII spinner character driven by `spinner_phase`.
    fn spinner_char(&self) -> char {
        let chars = ['|', '/', '-', '\\'];
        let idx = (self.spinner_phase as usize) % chars.len();
        chars[idx]
    }
}

/// Accent colour for the current state.
fn state_color(pipeline: &PipelineState) -> egui::Color32 {
    match pipeline {
        PipelineState::Idle => DIM,
        PipelineState::CheckingPermission
        | PipelineState::GeneratingVideo
        | PipelineState::GeneratingAudio => ACCENT,
        PipelineState::Ready { .. } => SUCCESS,
        PipelineState::Failed(_) => WARNING,
    }
}

/// The failure that sent the user back to the key wall, if any.
fn key_wall_notice(pipeline: &PipelineState) -> Option<&ErrorInfo> {
    pipeline
        .error()
        .filter(|error| error.kind.resets_permission())
}

/// Whether the key wall should enable its submit button.
fn is_plausible_key(input: &str) -> bool {
    let key = input.trim();
    !key.is_empty() && !key.chars().any(char::is_whitespace)
}

// ---------------------------------------------------------------------------
// eframe::App impl
// ---------------------------------------------------------------------------

impl eframe::App for ProducTvApp {
    /// Called every frame by eframe.  Reads the shared state, then renders
    /// the view matching it.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let (pipeline, permission) = self.snapshot();

        // --- Advance spinner animation -------------------------------------
        self.spinner_phase += 0.08;
        if self.spinner_phase >= 4.0 {
            self.spinner_phase = 0.0;
        }

        // --- Keep repainting while the orchestrator may change state -------
        if pipeline.is_busy() || permission == PermissionState::Unknown {
            ctx.request_repaint_after(Duration::from_millis(66));
        } else {
            ctx.request_repaint_after(Duration::from_millis(500));
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            self.draw_header(ui, &pipeline);
            ui.separator();

            match permission {
                PermissionState::Unknown => self.draw_checking_key(ui),
                PermissionState::Missing => self.draw_key_wall(ui, &pipeline),
                PermissionState::Granted => {
                    self.draw_script(ui);
                    self.draw_controls(ui, &pipeline);
                    match &pipeline {
                        PipelineState::Ready { .. } => self.draw_ready(ui, &pipeline),
                        PipelineState::Failed(error) => self.draw_error(ui, error),
                        _ => {}
                    }
                }
            }
        });
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        log::info!("ProducTV window closing");
        self.send(PipelineCommand::Shutdown);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
