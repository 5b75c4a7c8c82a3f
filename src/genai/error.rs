//! Errors from the generative service and their user-facing classification.
//!
//! [`GenAiError`] is what the client returns.  [`ErrorKind`] is what the
//! pipeline shows: [`classify`] maps one onto the other, preferring the
//! structured HTTP / API status and falling back to [`classify_message`]
//! only when the error carries nothing but text.

use thiserror::Error;

// ---------------------------------------------------------------------------
// GenAiError
// ---------------------------------------------------------------------------

/// Errors that can occur while talking to the generative service.
#[derive(Debug, Clone, Error)]
pub enum GenAiError {
    /// The service answered with an error object or a non-success status.
    #[error("API error {code} {status}: {message}")]
    Api {
        /// HTTP status code (or the `code` field of the error object).
        code: u16,
        /// Canonical status string such as `PERMISSION_DENIED`; may be empty.
        status: String,
        message: String,
    },

    /// The call completed but carried no usable result.
    #[error("generation failed: {0}")]
    GenerationFailed(String),

    /// A response body or inline payload could not be parsed.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// A request or the video job did not finish in time.
    #[error("timed out: {0}")]
    Timeout(String),

    /// Network-level failure.
    #[error("HTTP request failed: {0}")]
    Transport(String),

    /// No API key is available.
    #[error("no API key selected")]
    MissingCredential,
}

impl From<reqwest::Error> for GenAiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GenAiError::Timeout(e.to_string())
        } else if e.is_decode() {
            GenAiError::InvalidPayload(e.to_string())
        } else {
            GenAiError::Transport(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// ErrorKind
// ---------------------------------------------------------------------------

/// User-facing error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Access or billing problem with the selected key.
    PermissionDenied,
    /// The key's project cannot see the requested model.
    EntityNotFound,
    /// No key has been selected yet.
    MissingKey,
    /// The call succeeded but returned nothing usable.
    GenerationFailed,
    /// The job or a request ran past its deadline.
    Timeout,
    /// Network failure.
    Transport,
    /// Anything else.
    Other,
}

impl ErrorKind {
    /// Message shown in the error panel.
    pub fn user_message(&self) -> &'static str {
        match self {
            ErrorKind::PermissionDenied => {
                "Access denied (403). Video generation requires an API key from a Google Cloud \
                 project with billing enabled. Please select a paid key."
            }
            ErrorKind::MissingKey => "No API key selected. Please select a key to continue.",
            ErrorKind::Timeout => {
                "Generation is taking too long. Check your project quota and retry."
            }
            ErrorKind::EntityNotFound
            | ErrorKind::GenerationFailed
            | ErrorKind::Transport
            | ErrorKind::Other => "Generation error. Check your API project and retry.",
        }
    }

    /// Whether this error sends the user back to the key wall.
    pub fn resets_permission(&self) -> bool {
        matches!(
            self,
            ErrorKind::PermissionDenied | ErrorKind::EntityNotFound | ErrorKind::MissingKey
        )
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

const ENTITY_NOT_FOUND: &str = "requested entity was not found";

/// Classify an error, structured fields first.
pub fn classify(err: &GenAiError) -> ErrorKind {
    match err {
        GenAiError::Api {
            code,
            status,
            message,
        } => {
            if *code == 403 || status == "PERMISSION_DENIED" {
                ErrorKind::PermissionDenied
            } else if status == "NOT_FOUND" && message.to_lowercase().contains(ENTITY_NOT_FOUND) {
                ErrorKind::EntityNotFound
            } else {
                classify_message(message).unwrap_or(ErrorKind::Other)
            }
        }
        GenAiError::GenerationFailed(_) | GenAiError::InvalidPayload(_) => {
            ErrorKind::GenerationFailed
        }
        GenAiError::Timeout(_) => ErrorKind::Timeout,
        GenAiError::MissingCredential => ErrorKind::MissingKey,
        GenAiError::Transport(text) => classify_message(text).unwrap_or(ErrorKind::Transport),
    }
}

/// Last-resort classification from free text.
///
/// Recognises the shapes the service is known to produce:
/// `"PERMISSION_DENIED"`, a bare `403`, and
/// `"Requested entity was not found"`.
pub fn classify_message(text: &str) -> Option<ErrorKind> {
    if text.contains("PERMISSION_DENIED") || text.contains("403") {
        return Some(ErrorKind::PermissionDenied);
    }
    let lower = text.to_lowercase();
    if lower.contains(ENTITY_NOT_FOUND) || lower.contains("entity not found") {
        return Some(ErrorKind::EntityNotFound);
    }
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
