//! Scheduled audio playback via `cpal`.
//!
//! [`AudioOutput`] is the playback engine the preview needs: a clock that
//! advances with the hardware and the ability to start a buffer at a given
//! clock time.  [`CpalAudioContext`] implements it on top of the system
//! default output device.  [`AudioContextSlot`] owns one lazily-opened
//! context for the lifetime of the pipeline.
//!
//! `cpal::Stream` is not `Send` on every platform, so the stream lives on a
//! dedicated `audio-output` thread.  The context talks to the callback through
//! an atomic frame counter and a mutex-guarded list of scheduled voices.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc, Mutex, PoisonError};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;

use super::decode::DecodedAudioBuffer;
use super::resample::interleave_for_device;

// ---------------------------------------------------------------------------
// OutputError
// ---------------------------------------------------------------------------

/// Errors that can occur while opening or using the output stream.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("no output device found on the default audio host")]
    NoDevice,

    #[error("failed to query output configs: {0}")]
    SupportedConfigs(#[from] cpal::SupportedStreamConfigsError),

    #[error("failed to query default output config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("audio output thread stopped")]
    ThreadGone,
}

// ---------------------------------------------------------------------------
// AudioOutput trait
// ---------------------------------------------------------------------------

/// A playback engine with its own clock.
///
/// Implementations must be `Send + Sync` so they can be shared between the
/// pipeline task and the UI thread behind an `Arc<dyn AudioOutput>`.
pub trait AudioOutput: Send + Sync {
    /// Seconds elapsed on the output clock since the context was opened.
    fn current_time(&self) -> f64;

    /// Start `buffer` when the output clock reaches `when` seconds.  Times in
    /// the past start immediately.
    fn start_at(&self, buffer: &DecodedAudioBuffer, when: f64) -> Result<(), OutputError>;

    /// Silence every scheduled or playing buffer.
    fn stop_all(&self);
}

// ---------------------------------------------------------------------------
// CpalAudioContext
// ---------------------------------------------------------------------------

/// A buffer queued on the output stream.
struct Voice {
    /// Output frame at which the first sample plays.
    start_frame: u64,
    /// Interleaved samples already converted to the device layout.
    samples: Vec<f32>,
}

/// State shared between the context handle and the cpal callback.
struct Shared {
    frames_played: AtomicU64,
    voices: Mutex<Vec<Voice>>,
}

/// [`AudioOutput`] backed by the default `cpal` output device.
///
/// Dropping the context stops the stream and joins nothing: the
/// `audio-output` thread notices the closed channel and exits on its own.
pub struct CpalAudioContext {
    shared: Arc<Shared>,
    sample_rate: u32,
    channels: u16,
    /// Dropping this sender tells the output thread to release the stream.
    _shutdown: mpsc::Sender<()>,
}

impl CpalAudioContext {
    /// Open the default output device, preferring `preferred_rate` Hz.
    ///
    /// When the device cannot run at `preferred_rate` its default rate is
    /// used instead and buffers are resampled on scheduling.
    pub fn open(preferred_rate: u32) -> Result<Self, OutputError> {
        let shared = Arc::new(Shared {
            frames_played: AtomicU64::new(0),
            voices: Mutex::new(Vec::new()),
        });

        let (ready_tx, ready_rx) = mpsc::channel::<Result<(u32, u16), OutputError>>();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let thread_shared = Arc::clone(&shared);

        std::thread::Builder::new()
            .name("audio-output".into())
            .spawn(move || {
                match build_stream(preferred_rate, thread_shared) {
                    Ok((stream, rate, channels)) => {
                        let _ = ready_tx.send(Ok((rate, channels)));
                        // Blocks until every sender is dropped.
                        let _ = shutdown_rx.recv();
                        drop(stream);
                        log::debug!("audio: output stream released");
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                    }
                }
            })
            .map_err(|_| OutputError::ThreadGone)?;

        let (sample_rate, channels) = ready_rx.recv().map_err(|_| OutputError::ThreadGone)??;

        log::info!("audio: output context opened ({sample_rate} Hz, {channels} ch)");

        Ok(Self {
            shared,
            sample_rate,
            channels,
            _shutdown: shutdown_tx,
        })
    }
}

impl AudioOutput for CpalAudioContext {
    fn current_time(&self) -> f64 {
        self.shared.frames_played.load(Ordering::Acquire) as f64 / self.sample_rate as f64
    }

    fn start_at(&self, buffer: &DecodedAudioBuffer, when: f64) -> Result<(), OutputError> {
        let samples = interleave_for_device(buffer, self.sample_rate, self.channels);
        let start_frame = (when.max(0.0) * self.sample_rate as f64).round() as u64;

        log::debug!(
            "audio: scheduling {:.2}s buffer at t={when:.3}s (frame {start_frame})",
            buffer.duration_secs()
        );

        self.shared
            .voices
            .lock()
            .unwrap()
            .push(Voice {
                start_frame,
                samples,
            });
        Ok(())
    }

    fn stop_all(&self) {
        self.shared.voices.lock().unwrap().clear();
    }
}

/// Pick a stream config, build the stream and start it.  Runs on the
/// `audio-output` thread.
fn build_stream(
    preferred_rate: u32,
    shared: Arc<Shared>,
) -> Result<(cpal::Stream, u32, u16), OutputError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or(OutputError::NoDevice)?;

    let preferred = cpal::SampleRate(preferred_rate);
    let supported = device
        .supported_output_configs()?
        .filter(|range| range.sample_format() == cpal::SampleFormat::F32)
        .find(|range| range.min_sample_rate() <= preferred && preferred <= range.max_sample_rate())
        .map(|range| range.with_sample_rate(preferred));

    let supported = match supported {
        Some(config) => config,
        None => device.default_output_config()?,
    };

    let channels = supported.channels();
    let sample_rate = supported.sample_rate().0;
    let config: cpal::StreamConfig = supported.into();

    let stream = device.build_output_stream(
        &config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            render(&shared, data, channels as usize);
        },
        |err: cpal::StreamError| {
            log::error!("cpal output stream error: {err}");
        },
        None,
    )?;

    stream.play()?;
    Ok((stream, sample_rate, channels))
}

/// Mix every due voice into `data` and advance the clock.
fn render(shared: &Shared, data: &mut [f32], channels: usize) {
    data.fill(0.0);
    let channels = channels.max(1);
    let frames = (data.len() / channels) as u64;
    let block_start = shared.frames_played.load(Ordering::Acquire);

    let mut voices = shared.voices.lock().unwrap_or_else(PoisonError::into_inner);
    for voice in voices.iter() {
        let voice_frames = (voice.samples.len() / channels) as u64;
        for f in 0..frames {
            let abs = block_start + f;
            if abs < voice.start_frame {
                continue;
            }
            let offset = abs - voice.start_frame;
            if offset >= voice_frames {
                break;
            }
            let src = (offset as usize) * channels;
            let dst = (f as usize) * channels;
            for c in 0..channels {
                data[dst + c] += voice.samples[src + c];
            }
        }
    }
    let block_end = block_start + frames;
    voices.retain(|v| v.start_frame + (v.samples.len() / channels) as u64 > block_end);
    drop(voices);

    shared.frames_played.fetch_add(frames, Ordering::Release);
}

// ---------------------------------------------------------------------------
// AudioContextSlot
// ---------------------------------------------------------------------------

/// Opens an [`AudioOutput`] at the requested sample rate.
pub type OutputFactory =
    Arc<dyn Fn(u32) -> Result<Arc<dyn AudioOutput>, OutputError> + Send + Sync>;

/// The default factory: a [`CpalAudioContext`] on the system output device.
pub fn cpal_factory() -> OutputFactory {
    Arc::new(|rate| {
        let ctx = CpalAudioContext::open(rate)?;
        Ok(Arc::new(ctx) as Arc<dyn AudioOutput>)
    })
}

/// Lazily-created audio context shared across pipeline runs.
///
/// Created on first [`get_or_open`](Self::get_or_open), reused afterwards,
/// dropped on [`release`](Self::release).
pub struct AudioContextSlot {
    factory: OutputFactory,
    context: Mutex<Option<Arc<dyn AudioOutput>>>,
}

impl AudioContextSlot {
    pub fn new(factory: OutputFactory) -> Self {
        Self {
            factory,
            context: Mutex::new(None),
        }
    }

    /// Return the open context, opening it at `sample_rate` Hz on first use.
    pub fn get_or_open(&self, sample_rate: u32) -> Result<Arc<dyn AudioOutput>, OutputError> {
        let mut slot = self.context.lock().unwrap();
        if let Some(ctx) = slot.as_ref() {
            return Ok(Arc::clone(ctx));
        }
        let ctx = (self.factory)(sample_rate)?;
        *slot = Some(Arc::clone(&ctx));
        Ok(ctx)
    }

    /// The open context, if any.  Never opens one.
    pub fn get(&self) -> Option<Arc<dyn AudioOutput>> {
        self.context.lock().unwrap().clone()
    }

    /// Stop playback and drop the context.
    pub fn release(&self) {
        if let Some(ctx) = self.context.lock().unwrap().take() {
            ctx.stop_all();
            log::info!("audio: output context released");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
