//! Scripted [`GenerationClient`] for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::client::{GenerationClient, VideoBlob, VideoJob, VideoParams};
use super::error::GenAiError;
use super::speech::RawAudioPayload;

/// Replays a fixed script and records every call.
pub struct ScriptedClient {
    done_on_submit: bool,
    submit_delay: Option<Duration>,
    submit_error: Option<GenAiError>,
    poll_results: Mutex<VecDeque<bool>>,
    result_uri: Option<String>,
    job_error: Option<GenAiError>,
    speech: Result<RawAudioPayload, GenAiError>,
    submit_calls: AtomicUsize,
    poll_calls: AtomicUsize,
    speech_calls: AtomicUsize,
    fetched: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub const VIDEO_BYTES: &'static [u8] = b"\x00\x00\x00\x18ftypmp42";

    /// Speech payload: four mono samples (0, 16384, -16384, -32768).
    pub const SPEECH_BYTES: &'static [u8] = &[0x00, 0x00, 0x00, 0x40, 0x00, 0xC0, 0x00, 0x80];

    pub fn new() -> Self {
        Self {
            done_on_submit: false,
            submit_delay: None,
            submit_error: None,
            poll_results: Mutex::new(VecDeque::new()),
            result_uri: None,
            job_error: None,
            speech: Ok(RawAudioPayload {
                bytes: Self::SPEECH_BYTES.to_vec(),
                sample_rate: RawAudioPayload::SAMPLE_RATE,
                channels: RawAudioPayload::CHANNELS,
            }),
            submit_calls: AtomicUsize::new(0),
            poll_calls: AtomicUsize::new(0),
            speech_calls: AtomicUsize::new(0),
            fetched: Mutex::new(Vec::new()),
        }
    }

    /// A client whose whole run succeeds without polling.
    pub fn succeeding() -> Self {
        Self::new().with_done_on_submit().with_result_uri("https://files.example/ad.mp4")
    }

    /// `done` flags returned by successive polls; an exhausted script
    /// reports done.
    pub fn with_poll_results(self, results: Vec<bool>) -> Self {
        *self.poll_results.lock().unwrap() = results.into();
        self
    }

    pub fn with_done_on_submit(mut self) -> Self {
        self.done_on_submit = true;
        self
    }

    pub fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = Some(delay);
        self
    }

    pub fn with_submit_error(mut self, err: GenAiError) -> Self {
        self.submit_error = Some(err);
        self
    }

    pub fn with_result_uri(mut self, uri: &str) -> Self {
        self.result_uri = Some(uri.to_string());
        self
    }

    pub fn with_job_error(mut self, err: GenAiError) -> Self {
        self.job_error = Some(err);
        self
    }

    pub fn with_speech(mut self, result: Result<RawAudioPayload, GenAiError>) -> Self {
        self.speech = result;
        self
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn poll_calls(&self) -> usize {
        self.poll_calls.load(Ordering::SeqCst)
    }

    pub fn speech_calls(&self) -> usize {
        self.speech_calls.load(Ordering::SeqCst)
    }

    pub fn fetched_uris(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }

    fn job(&self, prompt: &str, done: bool) -> VideoJob {
        VideoJob {
            prompt: prompt.to_string(),
            name: "operations/scripted".into(),
            done,
            result_uri: if done { self.result_uri.clone() } else { None },
            error: if done { self.job_error.clone() } else { None },
        }
    }
}

#[async_trait]
impl GenerationClient for ScriptedClient {
    async fn start_video_job(
        &self,
        prompt: &str,
        _params: &VideoParams,
    ) -> Result<VideoJob, GenAiError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.submit_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = &self.submit_error {
            return Err(err.clone());
        }
        Ok(self.job(prompt, self.done_on_submit))
    }

    async fn poll_video_job(&self, job: &VideoJob) -> Result<VideoJob, GenAiError> {
        self.poll_calls.fetch_add(1, Ordering::SeqCst);
        let done = self.poll_results.lock().unwrap().pop_front().unwrap_or(true);
        Ok(self.job(&job.prompt, done))
    }

    async fn fetch_video(&self, uri: &str) -> Result<VideoBlob, GenAiError> {
        self.fetched.lock().unwrap().push(uri.to_string());
        Ok(VideoBlob::new(Self::VIDEO_BYTES.to_vec(), "video/mp4"))
    }

    async fn synthesize_speech(
        &self,
        _text: &str,
        _voice: &str,
    ) -> Result<RawAudioPayload, GenAiError> {
        self.speech_calls.fetch_add(1, Ordering::SeqCst);
        self.speech.clone()
    }
}
