//! Submit a video job and wait for it to finish.
//!
//! [`submit_and_await`] suspends only the calling task between polls
//! (`tokio::time::sleep`), so the UI keeps running while a job renders.
//! The wait is bounded by [`PollPolicy::max_attempts`].

use std::time::Duration;

use crate::config::GenAiConfig;

use super::client::{GenerationClient, VideoBlob, VideoParams};
use super::error::GenAiError;

/// How often and how long to poll a running video job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// `None` polls until the job completes.
    pub max_attempts: Option<u32>,
}

impl PollPolicy {
    pub fn from_config(config: &GenAiConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.poll_interval_secs),
            max_attempts: config.max_poll_attempts,
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from_config(&GenAiConfig::default())
    }
}

/// Submit `prompt`, poll until done, and download the result.
///
/// # Errors
///
/// * [`GenAiError::Timeout`] when `policy.max_attempts` polls pass without
///   completion.
/// * The job's own error when it finishes with one.
/// * [`GenAiError::GenerationFailed`] when it finishes without a locator.
/// * Any error from the underlying client calls.
pub async fn submit_and_await(
    client: &dyn GenerationClient,
    prompt: &str,
    params: &VideoParams,
    policy: &PollPolicy,
) -> Result<VideoBlob, GenAiError> {
    let mut job = client.start_video_job(prompt, params).await?;
    let mut attempts: u32 = 0;

    while !job.done {
        if policy.max_attempts.is_some_and(|max| attempts >= max) {
            return Err(GenAiError::Timeout(format!(
                "video job {} still running after {attempts} polls",
                job.name
            )));
        }

        tokio::time::sleep(policy.interval).await;
        attempts += 1;
        job = client.poll_video_job(&job).await?;
        log::debug!("genai: poll #{attempts} of {} → done={}", job.name, job.done);
    }

    if let Some(err) = job.error {
        return Err(err);
    }

    let uri = job.result_uri.ok_or_else(|| {
        GenAiError::GenerationFailed("video job completed without a result URI".into())
    })?;

    log::info!("genai: video job {} done after {attempts} polls", job.name);
    client.fetch_video(&uri).await
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
