//! Recording playback surfaces for unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::audio::{AudioOutput, DecodedAudioBuffer, OutputError, OutputFactory};
use crate::genai::VideoBlob;

use super::video::{VideoError, VideoSurface};

/// Audio output with a settable clock that records every scheduled start.
pub struct RecordingOutput {
    now: Mutex<f64>,
    starts: Mutex<Vec<(f64, usize)>>,
    stopped: AtomicUsize,
}

impl RecordingOutput {
    pub fn at(now: f64) -> Self {
        Self {
            now: Mutex::new(now),
            starts: Mutex::new(Vec::new()),
            stopped: AtomicUsize::new(0),
        }
    }

    /// `(when, frame_count)` of every `start_at` call.
    pub fn starts(&self) -> Vec<(f64, usize)> {
        self.starts.lock().unwrap().clone()
    }

    pub fn stop_calls(&self) -> usize {
        self.stopped.load(Ordering::SeqCst)
    }

    /// A factory that always hands out `output`.
    pub fn factory(output: Arc<RecordingOutput>) -> OutputFactory {
        Arc::new(move |_rate| Ok(Arc::clone(&output) as Arc<dyn AudioOutput>))
    }
}

impl AudioOutput for RecordingOutput {
    fn current_time(&self) -> f64 {
        *self.now.lock().unwrap()
    }

    fn start_at(&self, buffer: &DecodedAudioBuffer, when: f64) -> Result<(), OutputError> {
        self.starts.lock().unwrap().push((when, buffer.frame_count()));
        Ok(())
    }

    fn stop_all(&self) {
        self.stopped.fetch_add(1, Ordering::SeqCst);
    }
}

/// Video surface that records calls in order.
#[derive(Default)]
pub struct RecordingSurface {
    loaded: Mutex<Option<VideoBlob>>,
    calls: Mutex<Vec<&'static str>>,
    fail_play: AtomicBool,
}

impl RecordingSurface {
    pub fn loaded_with(video: VideoBlob) -> Self {
        let surface = Self::default();
        *surface.loaded.lock().unwrap() = Some(video);
        surface
    }

    pub fn failing_play(self) -> Self {
        self.fail_play.store(true, Ordering::SeqCst);
        self
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn loaded(&self) -> Option<VideoBlob> {
        self.loaded.lock().unwrap().clone()
    }
}

impl VideoSurface for RecordingSurface {
    fn load(&self, video: &VideoBlob) -> Result<(), VideoError> {
        self.calls.lock().unwrap().push("load");
        *self.loaded.lock().unwrap() = Some(video.clone());
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        self.loaded.lock().unwrap().is_some()
    }

    fn seek_to_start(&self) {
        self.calls.lock().unwrap().push("seek");
    }

    fn play(&self) -> Result<(), VideoError> {
        self.calls.lock().unwrap().push("play");
        if self.fail_play.load(Ordering::SeqCst) {
            return Err(VideoError::NotLoaded);
        }
        Ok(())
    }

    fn stop(&self) {
        self.calls.lock().unwrap().push("stop");
    }
}
