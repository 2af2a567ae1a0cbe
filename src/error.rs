// Error types: what can go wrong while talking to the media service, and
// the flattened `UploadFailure` record the uploader reports and returns.

use serde_json::Value;
use std::error::Error as StdError;
use thiserror::Error;

/// Errors returned by a `MediaService` implementation.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("service rejected upload ({status}): {message}")]
    Api {
        status: u16,
        message: String,
        raw: Option<Value>,
    },

    #[error("malformed service response: {reason}")]
    Decode { reason: String, body: String },
}

impl ServiceError {
    pub fn api(status: u16, message: impl Into<String>, raw: Option<Value>) -> Self {
        Self::Api {
            status,
            message: message.into(),
            raw,
        }
    }

    pub fn decode(reason: impl Into<String>, body: impl Into<String>) -> Self {
        Self::Decode {
            reason: reason.into(),
            body: body.into(),
        }
    }

    /// Short classification used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Api { .. } => "api",
            Self::Decode { .. } => "decode",
        }
    }

    /// HTTP status, when the error carries one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Api { status, .. } => Some(*status),
            Self::Decode { .. } => None,
        }
    }

    /// The message the service itself sent back, if any.
    pub fn service_message(&self) -> Option<&str> {
        match self {
            Self::Api { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Raw response payload for debugging. Non-JSON bodies are wrapped as a
    /// JSON string.
    pub fn raw_response(&self) -> Option<Value> {
        match self {
            Self::Api { raw, .. } => raw.clone(),
            Self::Decode { body, .. } => Some(Value::String(body.clone())),
            Self::Transport(_) => None,
        }
    }
}

/// Everything the uploader knows about a failed upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadFailure {
    pub error_kind: String,
    pub message: String,
    pub status_code: Option<u16>,
    pub raw_response: Option<Value>,
    /// Source chain of the error, outermost first (excluding the error itself).
    pub causes: Vec<String>,
}

impl UploadFailure {
    pub fn from_io(err: &std::io::Error) -> Self {
        Self {
            error_kind: "io".into(),
            message: err.to_string(),
            status_code: None,
            raw_response: None,
            causes: source_chain(err),
        }
    }
}

impl From<&ServiceError> for UploadFailure {
    fn from(err: &ServiceError) -> Self {
        Self {
            error_kind: err.kind().into(),
            message: err.to_string(),
            status_code: err.status_code(),
            raw_response: err.raw_response(),
            causes: source_chain(err),
        }
    }
}

fn source_chain(err: &dyn StdError) -> Vec<String> {
    let mut causes = Vec::new();
    let mut current = err.source();
    while let Some(cause) = current {
        causes.push(cause.to_string());
        current = cause.source();
    }
    causes
}

/// Configuration loading failures.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing credential: set {var} or add `{field}` to {file}")]
    MissingCredential {
        var: &'static str,
        field: &'static str,
        file: String,
    },

    #[error("could not read credentials file {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid credentials file {path}: {source}")]
    ParseFile {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn api_error_exposes_status_message_and_raw() {
        let raw = json!({"message": "Your request contains invalid fileName parameter.", "help": ""});
        let err = ServiceError::api(400, "Your request contains invalid fileName parameter.", Some(raw.clone()));

        assert_eq!(err.kind(), "api");
        assert_eq!(err.status_code(), Some(400));
        assert_eq!(
            err.service_message(),
            Some("Your request contains invalid fileName parameter.")
        );
        assert_eq!(err.raw_response(), Some(raw));
    }

    #[test]
    fn decode_error_wraps_body_as_string() {
        let err = ServiceError::decode("expected value at line 1 column 1", "<html>oops</html>");
        assert_eq!(err.kind(), "decode");
        assert_eq!(err.status_code(), None);
        assert_eq!(err.raw_response(), Some(Value::String("<html>oops</html>".into())));
    }

    #[test]
    fn failure_from_service_error_copies_fields() {
        let err = ServiceError::api(401, "Your account cannot be authenticated.", None);
        let failure = UploadFailure::from(&err);

        assert_eq!(failure.error_kind, "api");
        assert_eq!(failure.status_code, Some(401));
        assert!(failure.message.contains("401"));
        assert!(failure.causes.is_empty());
    }

    #[test]
    fn io_failure_has_io_kind() {
        let err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let failure = UploadFailure::from_io(&err);
        assert_eq!(failure.error_kind, "io");
        assert_eq!(failure.message, "denied");
    }

    #[test]
    fn config_error_keeps_source() {
        let err = ConfigError::ReadFile {
            path: "/nope".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(source_chain(&err), vec!["gone".to_string()]);
    }
}
