use http::StatusCode;
use serde::Serialize;

use crate::cache::ReplayCacheError;
use crate::rate_limit::RateLimitError;

/// Startup and configuration errors. Never produced while handling a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("invalid header value for {0}")]
    InvalidHeader(&'static str),
}

/// Client-side solving failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SolveError {
    #[error("puzzle not solved within {attempts} attempts")]
    Exhausted { attempts: u64 },
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

/// Coarse classification of a [`Rejection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectionKind {
    MalformedRequest,
    ProofRejected,
    RateExceeded,
    BackendFailure,
}

/// Why a request was refused by the edge validator or the origin guard.
#[derive(Debug, thiserror::Error)]
pub enum Rejection {
    #[error("missing required proof headers")]
    MissingHeaders,
    #[error("timestamp is not a valid integer")]
    MalformedTimestamp,
    #[error("timestamp too old ({age}s)")]
    StaleTimestamp { age: u64 },
    #[error("timestamp is in the future ({skew}s ahead)")]
    FutureTimestamp { skew: u64 },
    #[error("replay detected")]
    Replay,
    #[error("invalid proof of work")]
    InvalidProof,
    #[error("proof does not meet difficulty of {required} bits")]
    InsufficientDifficulty { required: u32 },
    #[error("rate limit exceeded")]
    RateExceeded,
    #[error("missing trust signature")]
    MissingSignature,
    #[error("invalid trust signature")]
    InvalidSignature,
    #[error("replay cache unavailable: {0}")]
    ReplayStore(#[from] ReplayCacheError),
    #[error("rate limit store unavailable: {0}")]
    RateStore(#[from] RateLimitError),
}

#[derive(Serialize)]
struct RejectionBody<'a> {
    error: &'a str,
}

impl Rejection {
    pub fn kind(&self) -> RejectionKind {
        match self {
            Rejection::MissingHeaders | Rejection::MalformedTimestamp => {
                RejectionKind::MalformedRequest
            }
            Rejection::StaleTimestamp { .. }
            | Rejection::FutureTimestamp { .. }
            | Rejection::Replay
            | Rejection::InvalidProof
            | Rejection::InsufficientDifficulty { .. }
            | Rejection::MissingSignature
            | Rejection::InvalidSignature => RejectionKind::ProofRejected,
            Rejection::RateExceeded => RejectionKind::RateExceeded,
            Rejection::ReplayStore(_) | Rejection::RateStore(_) => RejectionKind::BackendFailure,
        }
    }

    /// HTTP status an adapter should answer with.
    pub fn status(&self) -> StatusCode {
        match self.kind() {
            RejectionKind::MalformedRequest => StatusCode::BAD_REQUEST,
            RejectionKind::ProofRejected => StatusCode::FORBIDDEN,
            RejectionKind::RateExceeded => StatusCode::TOO_MANY_REQUESTS,
            RejectionKind::BackendFailure => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// JSON response body, `{"error": "<reason>"}`.
    pub fn body(&self) -> String {
        let reason = self.to_string();
        serde_json::to_string(&RejectionBody { error: &reason })
            .unwrap_or_else(|_| String::from(r#"{"error":"request rejected"}"#))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(Rejection::MissingHeaders.status(), StatusCode::BAD_REQUEST);
        assert_eq!(Rejection::MalformedTimestamp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            Rejection::StaleTimestamp { age: 90 }.status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(Rejection::Replay.status(), StatusCode::FORBIDDEN);
        assert_eq!(Rejection::InvalidProof.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            Rejection::InsufficientDifficulty { required: 8 }.status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(Rejection::InvalidSignature.status(), StatusCode::FORBIDDEN);
        assert_eq!(Rejection::MissingSignature.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            Rejection::RateExceeded.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            Rejection::from(ReplayCacheError::Other("down".into())).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn body_is_json_with_reason() {
        let body = Rejection::Replay.body();
        let parsed: serde_json::Value = serde_json::from_str(&body).expect("valid json");
        assert_eq!(parsed["error"], "replay detected");
    }
}
