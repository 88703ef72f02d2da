//! Error types for the YouTube API client and classification of failed responses.

use reqwest::StatusCode;
use serde::Deserialize;

/// Error reasons YouTube uses to signal that the calling key ran out of quota.
///
/// See: <https://developers.google.com/youtube/v3/docs/errors>
const QUOTA_REASONS: &[&str] = &[
    "quotaExceeded",
    "rateLimitExceeded",
    "userRateLimitExceeded",
    "dailyLimitExceeded",
];

/// Errors produced by [`YouTubeClient`](super::YouTubeClient) calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The key used for the call has exhausted its quota.
    ///
    /// The client recovers from this by rotating to the next key, so callers only ever
    /// observe it wrapped in [`ApiError::CredentialsExhausted`] semantics.
    #[error("API key quota exceeded (status {status})")]
    QuotaExceeded { status: StatusCode, body: String },

    /// Every key in the pool hit its quota within one logical call.
    #[error("all {attempts} API keys have reached their limits")]
    CredentialsExhausted { attempts: usize },

    /// The API answered with a non-success status that is not a quota signal.
    #[error("YouTube API request to {endpoint} failed with status {status}: {body}")]
    Status {
        endpoint: String,
        status: StatusCode,
        reason: Option<String>,
        body: String,
    },

    #[error("send request to YouTube API: {endpoint}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("parse YouTube {endpoint} API response as JSON")]
    Decode {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// A paginated listing still had more pages after the configured page cap.
    #[error("stopped after {max_pages} pages while more results remained")]
    PageLimitExceeded { max_pages: usize },
}

impl ApiError {
    /// The machine-readable error reason reported by YouTube, if any.
    pub fn reason(&self) -> Option<&str> {
        match self {
            ApiError::Status { reason, .. } => reason.as_deref(),
            _ => None,
        }
    }

    /// The HTTP status of the failed call, if the call got that far.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::QuotaExceeded { status, .. } | ApiError::Status { status, .. } => {
                Some(*status)
            }
            ApiError::Transport { source, .. } | ApiError::Decode { source, .. } => {
                source.status()
            }
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    reason: Option<String>,
}

/// Extracts the first `reason` from a YouTube error response body.
pub(crate) fn error_reason(body: &str) -> Option<String> {
    let envelope: ErrorEnvelope = serde_json::from_str(body).ok()?;
    envelope
        .error
        .errors
        .into_iter()
        .find_map(|detail| detail.reason)
}

/// Decides whether a failed response means "this key is out of quota".
///
/// 429 always does. A 403 does unless YouTube names a reason that is not about quota
/// (e.g. `commentsDisabled`), since those would fail the same way with any key.
pub(crate) fn is_quota_failure(status: StatusCode, reason: Option<&str>) -> bool {
    match status {
        StatusCode::TOO_MANY_REQUESTS => true,
        StatusCode::FORBIDDEN => reason.is_none_or(|reason| QUOTA_REASONS.contains(&reason)),
        _ => false,
    }
}
