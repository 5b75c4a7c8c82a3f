//! Core `GenerationClient` trait and the `GeminiClient` REST implementation.
//!
//! `GeminiClient` calls the Generative Language API:
//!
//! | Operation            | Endpoint                                              |
//! |----------------------|-------------------------------------------------------|
//! | start video job      | `POST /v1beta/models/{video_model}:predictLongRunning` |
//! | poll video job       | `GET  /v1beta/{operation name}`                       |
//! | fetch video          | `GET  {result uri}&key=…`                             |
//! | synthesize speech    | `POST /v1beta/models/{tts_model}:generateContent`      |
//!
//! The API key is resolved from the [`CredentialStore`] on every call.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::GenAiConfig;

use super::credentials::CredentialStore;
use super::error::GenAiError;
use super::speech::{decode_inline_audio, sample_rate_from_mime, RawAudioPayload};

// ---------------------------------------------------------------------------
// Domain types
// ---------------------------------------------------------------------------

/// Fixed generation parameters sent with every video job.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoParams {
    pub number_of_videos: u32,
    pub resolution: String,
    pub aspect_ratio: String,
}

impl VideoParams {
    pub fn from_config(config: &GenAiConfig) -> Self {
        Self {
            number_of_videos: config.number_of_videos,
            resolution: config.resolution.clone(),
            aspect_ratio: config.aspect_ratio.clone(),
        }
    }
}

impl Default for VideoParams {
    fn default() -> Self {
        Self::from_config(&GenAiConfig::default())
    }
}

/// A long-running video generation job as last seen by the client.
#[derive(Debug, Clone)]
pub struct VideoJob {
    /// Prompt the job was submitted with.
    pub prompt: String,
    /// Opaque operation name used to poll the job.
    pub name: String,
    pub done: bool,
    /// Download locator of the first generated video, once done.
    pub result_uri: Option<String>,
    /// Error reported by a finished job.
    pub error: Option<GenAiError>,
}

/// In-memory video bytes fetched from the result locator.
///
/// Cheap to clone; the bytes are released when the last clone drops.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoBlob {
    bytes: Arc<[u8]>,
    content_type: String,
}

impl VideoBlob {
    pub fn new(bytes: impl Into<Arc<[u8]>>, content_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// File extension matching the content type.
    pub fn extension(&self) -> &'static str {
        match self.content_type.as_str() {
            "video/webm" => "webm",
            "video/quicktime" => "mov",
            _ => "mp4",
        }
    }
}

// ---------------------------------------------------------------------------
// GenerationClient trait
// ---------------------------------------------------------------------------

/// Async interface to the generative service.
///
/// Implementors must be `Send + Sync` so they can be shared across tasks
/// behind an `Arc<dyn GenerationClient>`.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Submit a video job and return its initial state.
    async fn start_video_job(
        &self,
        prompt: &str,
        params: &VideoParams,
    ) -> Result<VideoJob, GenAiError>;

    /// Refresh `job` from the service.
    async fn poll_video_job(&self, job: &VideoJob) -> Result<VideoJob, GenAiError>;

    /// Download the video behind `uri`.
    async fn fetch_video(&self, uri: &str) -> Result<VideoBlob, GenAiError>;

    /// Synthesize `text` with the prebuilt `voice`.
    async fn synthesize_speech(&self, text: &str, voice: &str)
        -> Result<RawAudioPayload, GenAiError>;
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Operation {
    name: String,
    #[serde(default)]
    done: bool,
    response: Option<OperationResponse>,
    error: Option<ApiStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationResponse {
    generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateVideoResponse {
    #[serde(default)]
    generated_samples: Vec<GeneratedSample>,
}

#[derive(Debug, Deserialize)]
struct GeneratedSample {
    video: Option<VideoRef>,
}

#[derive(Debug, Deserialize)]
struct VideoRef {
    uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiStatus {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

impl From<ApiStatus> for GenAiError {
    fn from(s: ApiStatus) -> Self {
        GenAiError::Api {
            code: s.code,
            status: s.status,
            message: s.message,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiStatus,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: Option<String>,
    data: Option<String>,
}

impl Operation {
    fn into_job(self, prompt: &str) -> VideoJob {
        let result_uri = self
            .response
            .and_then(|r| r.generate_video_response)
            .and_then(|r| r.generated_samples.into_iter().next())
            .and_then(|s| s.video)
            .and_then(|v| v.uri);

        VideoJob {
            prompt: prompt.to_string(),
            name: self.name,
            done: self.done,
            result_uri,
            error: self.error.map(GenAiError::from),
        }
    }
}

/// Pull the first inline audio part out of a speech response.
fn extract_audio(response: GenerateContentResponse) -> Result<RawAudioPayload, GenAiError> {
    let inline = response
        .candidates
        .into_iter()
        .filter_map(|c| c.content)
        .flat_map(|c| c.parts)
        .filter_map(|p| p.inline_data)
        .find(|d| d.data.as_deref().is_some_and(|s| !s.is_empty()))
        .ok_or_else(|| GenAiError::GenerationFailed("speech response carried no audio".into()))?;

    let sample_rate = inline
        .mime_type
        .as_deref()
        .and_then(sample_rate_from_mime)
        .unwrap_or(RawAudioPayload::SAMPLE_RATE);

    let bytes = decode_inline_audio(inline.data.as_deref().unwrap_or_default())?;
    Ok(RawAudioPayload {
        bytes,
        sample_rate,
        channels: RawAudioPayload::CHANNELS,
    })
}

/// Turn a response into `T`, or into [`GenAiError::Api`] on non-success.
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, GenAiError> {
    let status = response.status();
    if !status.is_success() {
        return Err(api_error(status, response.text().await.unwrap_or_default()));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| GenAiError::InvalidPayload(e.to_string()))
}

fn api_error(status: reqwest::StatusCode, body: String) -> GenAiError {
    match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => {
            let mut err = envelope.error;
            if err.code == 0 {
                err.code = status.as_u16();
            }
            err.into()
        }
        Err(_) => GenAiError::Api {
            code: status.as_u16(),
            status: String::new(),
            message: if body.is_empty() {
                status.to_string()
            } else {
                body
            },
        },
    }
}

// ---------------------------------------------------------------------------
// Request building
// ---------------------------------------------------------------------------

/// Body of a `predictLongRunning` video job request.
fn video_request_body(prompt: &str, params: &VideoParams) -> serde_json::Value {
    serde_json::json!({
        "instances": [ { "prompt": prompt } ],
        "parameters": {
            "sampleCount": params.number_of_videos,
            "resolution":  params.resolution,
            "aspectRatio": params.aspect_ratio
        }
    })
}

/// Body of a single-speaker `generateContent` speech request.
fn speech_request_body(text: &str, voice: &str) -> serde_json::Value {
    serde_json::json!({
        "contents": [ { "parts": [ { "text": text } ] } ],
        "generationConfig": {
            "responseModalities": ["AUDIO"],
            "speechConfig": {
                "voiceConfig": {
                    "prebuiltVoiceConfig": { "voiceName": voice }
                }
            }
        }
    })
}

/// Result locator with the API key appended, keeping any existing query
/// such as `alt=media`.
fn fetch_url(uri: &str, key: &str) -> Result<reqwest::Url, GenAiError> {
    let mut url = reqwest::Url::parse(uri)
        .map_err(|e| GenAiError::InvalidPayload(format!("bad video locator `{uri}`: {e}")))?;
    url.query_pairs_mut().append_pair("key", key);
    Ok(url)
}

// ---------------------------------------------------------------------------
// GeminiClient
// ---------------------------------------------------------------------------

/// [`GenerationClient`] over the Generative Language REST API.
///
/// All connection details (`base_url`, models) come from the
/// [`GenAiConfig`] passed to [`GeminiClient::from_config`]; the key comes
/// from the [`CredentialStore`] at call time.
pub struct GeminiClient {
    client: reqwest::Client,
    config: GenAiConfig,
    credentials: CredentialStore,
}

impl GeminiClient {
    /// Build a client from application config.
    ///
    /// The HTTP client is pre-configured with the per-request timeout from
    /// `config.timeout_secs`; a default client is used if the builder fails.
    pub fn from_config(config: &GenAiConfig, credentials: CredentialStore) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
            credentials,
        }
    }

    fn api_key(&self) -> Result<String, GenAiError> {
        self.credentials
            .resolve()
            .ok_or(GenAiError::MissingCredential)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1beta/{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl GenerationClient for GeminiClient {
    async fn start_video_job(
        &self,
        prompt: &str,
        params: &VideoParams,
    ) -> Result<VideoJob, GenAiError> {
        let key = self.api_key()?;
        let url = self.url(&format!("models/{}:predictLongRunning", self.config.video_model));

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", key)
            .json(&video_request_body(prompt, params))
            .send()
            .await?;

        let op: Operation = read_json(response).await?;
        log::info!("genai: video job submitted ({})", op.name);
        Ok(op.into_job(prompt))
    }

    async fn poll_video_job(&self, job: &VideoJob) -> Result<VideoJob, GenAiError> {
        let key = self.api_key()?;
        let response = self
            .client
            .get(self.url(&job.name))
            .header("x-goog-api-key", key)
            .send()
            .await?;

        let op: Operation = read_json(response).await?;
        Ok(op.into_job(&job.prompt))
    }

    async fn fetch_video(&self, uri: &str) -> Result<VideoBlob, GenAiError> {
        let key = self.api_key()?;
        let response = self.client.get(fetch_url(uri, &key)?).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(api_error(status, response.text().await.unwrap_or_default()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("video/mp4")
            .to_string();
        let bytes = response.bytes().await?;

        if bytes.is_empty() {
            return Err(GenAiError::GenerationFailed("downloaded video is empty".into()));
        }

        log::info!("genai: fetched video ({} bytes, {content_type})", bytes.len());
        Ok(VideoBlob::new(bytes.to_vec(), content_type))
    }

    async fn synthesize_speech(
        &self,
        text: &str,
        voice: &str,
    ) -> Result<RawAudioPayload, GenAiError> {
        let key = self.api_key()?;
        let url = self.url(&format!("models/{}:generateContent", self.config.tts_model));

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", key)
            .json(&speech_request_body(text, voice))
            .send()
            .await?;

        let parsed: GenerateContentResponse = read_json(response).await?;
        let payload = extract_audio(parsed)?;
        log::info!(
            "genai: speech synthesized ({} bytes @ {} Hz)",
            payload.bytes.len(),
            payload.sample_rate
        );
        Ok(payload)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
