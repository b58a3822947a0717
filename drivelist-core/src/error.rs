use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriveError {
    #[error("no access credential is configured")]
    NoCredential,
    #[error("credential rejected ({status}): {message}")]
    Unauthorized { status: StatusCode, message: String },
    #[error("request quota exceeded: {message}")]
    QuotaExceeded { message: String },
    #[error("access denied: {message}")]
    AccessDenied { message: String },
    #[error("continuation cursor rejected: {message}")]
    InvalidCursor { message: String },
    #[error("container not found: {message}")]
    NotFound { message: String },
    #[error("query rejected: {message}")]
    Malformed { message: String },
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("api returned {status}: {message}")]
    Http { status: StatusCode, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NoCredential,
    Unauthorized,
    QuotaExceeded,
    AccessDenied,
    InvalidCursor,
    NotFound,
    Malformed,
    Transport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Access,
    Transient,
    Request,
}

impl DriveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DriveError::NoCredential => ErrorKind::NoCredential,
            DriveError::Unauthorized { .. } => ErrorKind::Unauthorized,
            DriveError::QuotaExceeded { .. } => ErrorKind::QuotaExceeded,
            DriveError::AccessDenied { .. } => ErrorKind::AccessDenied,
            DriveError::InvalidCursor { .. } => ErrorKind::InvalidCursor,
            DriveError::NotFound { .. } => ErrorKind::NotFound,
            DriveError::Malformed { .. } | DriveError::Url(_) => ErrorKind::Malformed,
            DriveError::Request(_) | DriveError::Http { .. } => ErrorKind::Transport,
        }
    }

    pub fn class(&self) -> ErrorClass {
        self.kind().class()
    }

    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::Transient
    }

    pub(crate) fn from_response(status: StatusCode, body: &str) -> Self {
        let payload = serde_json::from_str::<ErrorEnvelope>(body)
            .ok()
            .map(|envelope| envelope.error)
            .unwrap_or_default();
        let message = payload
            .message
            .clone()
            .unwrap_or_else(|| body.chars().take(500).collect());
        let reason = payload.reason().unwrap_or_default();

        match status {
            StatusCode::UNAUTHORIZED => DriveError::Unauthorized { status, message },
            StatusCode::FORBIDDEN if payload.key_blocked() || reason == "keyInvalid" => {
                DriveError::Unauthorized { status, message }
            }
            StatusCode::FORBIDDEN if is_quota_reason(reason) => {
                DriveError::QuotaExceeded { message }
            }
            StatusCode::FORBIDDEN => DriveError::AccessDenied { message },
            StatusCode::TOO_MANY_REQUESTS => DriveError::QuotaExceeded { message },
            StatusCode::BAD_REQUEST if reason == "keyInvalid" => {
                DriveError::Unauthorized { status, message }
            }
            StatusCode::BAD_REQUEST if payload.names_page_token() || body.contains("pageToken") => {
                DriveError::InvalidCursor { message }
            }
            StatusCode::BAD_REQUEST => DriveError::Malformed { message },
            StatusCode::NOT_FOUND => DriveError::NotFound { message },
            _ => DriveError::Http { status, message },
        }
    }
}

impl ErrorKind {
    pub fn class(self) -> ErrorClass {
        match self {
            ErrorKind::NoCredential
            | ErrorKind::Unauthorized
            | ErrorKind::AccessDenied
            | ErrorKind::NotFound => ErrorClass::Access,
            ErrorKind::QuotaExceeded | ErrorKind::InvalidCursor | ErrorKind::Transport => {
                ErrorClass::Transient
            }
            ErrorKind::Malformed => ErrorClass::Request,
        }
    }
}

fn is_quota_reason(reason: &str) -> bool {
    reason.starts_with("dailyLimitExceeded")
        || matches!(
            reason,
            "userRateLimitExceeded" | "rateLimitExceeded" | "quotaExceeded"
        )
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorPayload,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: Vec<ErrorItem>,
    #[serde(default)]
    details: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorItem {
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    reason: Option<String>,
}

impl ErrorPayload {
    fn reason(&self) -> Option<&str> {
        self.errors.first().and_then(|item| item.reason.as_deref())
    }

    fn key_blocked(&self) -> bool {
        self.details
            .iter()
            .any(|detail| detail.reason.as_deref() == Some("API_KEY_SERVICE_BLOCKED"))
    }

    fn names_page_token(&self) -> bool {
        self.errors
            .iter()
            .any(|item| item.location.as_deref() == Some("pageToken"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(reason: &str) -> String {
        format!(
            r#"{{"error":{{"code":403,"message":"denied","errors":[{{"reason":"{reason}"}}]}}}}"#
        )
    }

    #[test]
    fn forbidden_reasons_map_to_distinct_kinds() {
        let blocked = r#"{"error":{"message":"blocked","details":[{"reason":"API_KEY_SERVICE_BLOCKED"}]}}"#;
        assert_eq!(
            DriveError::from_response(StatusCode::FORBIDDEN, blocked).kind(),
            ErrorKind::Unauthorized
        );
        assert_eq!(
            DriveError::from_response(StatusCode::FORBIDDEN, &body("dailyLimitExceededUnreg"))
                .kind(),
            ErrorKind::QuotaExceeded
        );
        assert_eq!(
            DriveError::from_response(StatusCode::FORBIDDEN, &body("insufficientFilePermissions"))
                .kind(),
            ErrorKind::AccessDenied
        );
    }

    #[test]
    fn bad_request_on_page_token_is_invalid_cursor() {
        let by_location = r#"{"error":{"message":"Invalid Value","errors":[{"reason":"invalid","location":"pageToken"}]}}"#;
        assert_eq!(
            DriveError::from_response(StatusCode::BAD_REQUEST, by_location).kind(),
            ErrorKind::InvalidCursor
        );
        assert_eq!(
            DriveError::from_response(StatusCode::BAD_REQUEST, "bad pageToken").kind(),
            ErrorKind::InvalidCursor
        );
        assert_eq!(
            DriveError::from_response(StatusCode::BAD_REQUEST, "Invalid query").kind(),
            ErrorKind::Malformed
        );
    }

    #[test]
    fn message_prefers_payload_text() {
        let err = DriveError::from_response(StatusCode::NOT_FOUND, &body("notFound"));
        assert!(matches!(err, DriveError::NotFound { ref message } if message == "denied"));
    }

    #[test]
    fn classes_separate_access_from_transient() {
        assert_eq!(DriveError::NoCredential.class(), ErrorClass::Access);
        assert_eq!(
            DriveError::from_response(StatusCode::UNAUTHORIZED, "").class(),
            ErrorClass::Access
        );
        let server = DriveError::from_response(StatusCode::SERVICE_UNAVAILABLE, "down");
        assert_eq!(server.kind(), ErrorKind::Transport);
        assert!(server.is_retryable());
        assert!(!DriveError::from_response(StatusCode::NOT_FOUND, "").is_retryable());
    }
}
