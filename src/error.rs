use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::ProviderTag;

/// Coarse classification of a provider failure. The health tracker decides
/// which kinds count toward opening a provider's circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Transient,
    RateLimited,
    CapabilityDenied,
    Unauthorized,
    NotFound,
    Status,
    Rejected,
    Malformed,
    AmbiguousEmpty,
}

/// Typed outcome of a failed adapter call.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{provider}: request timed out")]
    Timeout { provider: ProviderTag },

    #[error("{provider}: network error: {message}")]
    Network { provider: ProviderTag, message: String },

    #[error("{provider}: rate limited")]
    RateLimited { provider: ProviderTag },

    /// Plan or tier restriction signalled by the provider.
    #[error("{provider}: capability denied: {message}")]
    CapabilityDenied { provider: ProviderTag, message: String },

    #[error("{provider}: unauthorized: {message}")]
    Unauthorized { provider: ProviderTag, message: String },

    #[error("{provider}: not found")]
    NotFound { provider: ProviderTag },

    #[error("{provider}: HTTP {status}")]
    Status { provider: ProviderTag, status: u16 },

    /// Error payload embedded in a 200 response that maps to no other kind.
    #[error("{provider}: rejected: {message}")]
    Rejected { provider: ProviderTag, message: String },

    #[error("{provider}: malformed response: {message}")]
    Malformed { provider: ProviderTag, message: String },

    /// 200 response without data whose message does not tell "no rows" apart
    /// from "not on your plan".
    #[error("{provider}: empty response: {message}")]
    AmbiguousEmpty { provider: ProviderTag, message: String },
}

impl ProviderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Timeout { .. } | Self::Network { .. } => ErrorKind::Transient,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::CapabilityDenied { .. } => ErrorKind::CapabilityDenied,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Status { .. } => ErrorKind::Status,
            Self::Rejected { .. } => ErrorKind::Rejected,
            Self::Malformed { .. } => ErrorKind::Malformed,
            Self::AmbiguousEmpty { .. } => ErrorKind::AmbiguousEmpty,
        }
    }

    pub fn provider(&self) -> ProviderTag {
        match self {
            Self::Timeout { provider }
            | Self::Network { provider, .. }
            | Self::RateLimited { provider }
            | Self::CapabilityDenied { provider, .. }
            | Self::Unauthorized { provider, .. }
            | Self::NotFound { provider }
            | Self::Status { provider, .. }
            | Self::Rejected { provider, .. }
            | Self::Malformed { provider, .. }
            | Self::AmbiguousEmpty { provider, .. } => *provider,
        }
    }

    /// Only rate limits and transport-level failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Transient | ErrorKind::RateLimited)
    }

    /// Build an error from a non-success HTTP status and its body.
    pub fn from_status(provider: ProviderTag, status: u16, body: &str) -> Self {
        match status {
            429 => Self::RateLimited { provider },
            408 | 504 => Self::Timeout { provider },
            401 => Self::Unauthorized {
                provider,
                message: body_message(body),
            },
            403 => Self::CapabilityDenied {
                provider,
                message: body_message(body),
            },
            404 => Self::NotFound { provider },
            _ => Self::Status { provider, status },
        }
    }
}

/// Pull a human-readable message out of an error body, which is usually JSON
/// with a `message` field but may be plain text.
fn body_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.chars().take(200).collect())
}

pub type FetchResult<T> = Result<T, ProviderError>;
