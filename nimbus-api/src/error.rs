use serde::{Serialize, Deserialize};
use strum::AsRefStr as StrumAsRefStr;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq,
    StrumAsRefStr,
    Serialize, Deserialize
)]
pub enum ApiErrorKind {
    // raised locally before a request is sent
    ValidationFailed,
    NoWork,

    // derived from the response status
    InvalidRequest,
    Conflict,
    PayloadTooLarge,
    Unauthenticated,
    PermissionDenied,
    NotFound,
    Timeout,
    TooManyRequests,
    Unavailable,
    InternalFailure,
    Unknown,
}

impl ApiErrorKind {
    pub fn from_status(status: u16) -> ApiErrorKind {
        match status {
            400 | 422 => ApiErrorKind::InvalidRequest,
            401 => ApiErrorKind::Unauthenticated,
            403 => ApiErrorKind::PermissionDenied,
            404 | 410 => ApiErrorKind::NotFound,
            408 | 504 => ApiErrorKind::Timeout,
            409 => ApiErrorKind::Conflict,
            413 => ApiErrorKind::PayloadTooLarge,
            429 => ApiErrorKind::TooManyRequests,
            502 | 503 => ApiErrorKind::Unavailable,
            500..=599 => ApiErrorKind::InternalFailure,
            _ => ApiErrorKind::Unknown,
        }
    }
}

impl std::fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self.as_ref(), f)
    }
}

/// largest plain text body that will be passed through as an error message
const MAX_TEXT_MESSAGE: usize = 512;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    kind: ApiErrorKind,
    status: Option<u16>,
    msg: Option<String>,
}

impl ApiError {
    pub fn new() -> Self {
        ApiError {
            kind: ApiErrorKind::Unknown,
            status: None,
            msg: None
        }
    }

    /// builds an error from a failed response. the backend reports failures
    /// as `{ "error": "..." }` or `{ "message": "..." }` but neither is
    /// guaranteed so anything else falls back to a short plain text body.
    pub fn from_body(status: u16, body: &[u8]) -> Self {
        let mut err = ApiError::from(ApiErrorKind::from_status(status))
            .with_status(status);

        if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
            err.msg = message_from_json(&value);
        } else if let Ok(text) = std::str::from_utf8(body) {
            let trimmed = text.trim();

            if !trimmed.is_empty() && trimmed.len() <= MAX_TEXT_MESSAGE {
                err.msg = Some(trimmed.to_owned());
            }
        }

        err
    }

    pub fn with_kind(mut self, kind: ApiErrorKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_message<M>(mut self, msg: M) -> Self
    where
        M: Into<String>
    {
        self.msg = Some(msg.into());
        self
    }

    pub fn kind(&self) -> &ApiErrorKind {
        &self.kind
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn message(&self) -> Option<&str> {
        self.msg.as_deref()
    }
}

fn message_from_json(value: &serde_json::Value) -> Option<String> {
    let object = value.as_object()?;

    for key in ["error", "message"] {
        match object.get(key) {
            Some(serde_json::Value::String(msg)) if !msg.is_empty() => {
                return Some(msg.clone());
            },
            Some(nested @ serde_json::Value::Object(_)) => {
                if let Some(msg) = message_from_json(nested) {
                    return Some(msg);
                }
            },
            _ => {}
        }
    }

    None
}

impl std::default::Default for ApiError {
    fn default() -> Self {
        ApiError::new()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.msg, self.status) {
            (Some(msg), _) => write!(f, "{}", msg),
            (None, Some(status)) => write!(f, "{} ({})", self.kind, status),
            (None, None) => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<ApiErrorKind> for ApiError {
    fn from(kind: ApiErrorKind) -> Self {
        ApiError {
            kind,
            status: None,
            msg: None
        }
    }
}

impl<M> From<(ApiErrorKind, M)> for ApiError
where
    M: Into<String>,
{
    fn from((kind, msg): (ApiErrorKind, M)) -> Self {
        ApiError {
            kind,
            status: None,
            msg: Some(msg.into())
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn error_field() {
        let err = ApiError::from_body(409, br#"{"error":"disk name already in use"}"#);

        assert_eq!(*err.kind(), ApiErrorKind::Conflict);
        assert_eq!(err.status(), Some(409));
        assert_eq!(err.message(), Some("disk name already in use"));
    }

    #[test]
    fn message_field() {
        let err = ApiError::from_body(400, br#"{"message":"quota exceeded"}"#);

        assert_eq!(*err.kind(), ApiErrorKind::InvalidRequest);
        assert_eq!(err.to_string(), "quota exceeded");
    }

    #[test]
    fn error_preferred_over_message() {
        let err = ApiError::from_body(422, br#"{"message":"generic","error":"specific"}"#);

        assert_eq!(err.message(), Some("specific"));
    }

    #[test]
    fn nested_error_object() {
        let err = ApiError::from_body(404, br#"{"error":{"message":"file not found"}}"#);

        assert_eq!(*err.kind(), ApiErrorKind::NotFound);
        assert_eq!(err.message(), Some("file not found"));
    }

    #[test]
    fn unexpected_bodies() {
        let empty = ApiError::from_body(503, b"");
        assert_eq!(*empty.kind(), ApiErrorKind::Unavailable);
        assert_eq!(empty.message(), None);
        assert_eq!(empty.to_string(), "Unavailable (503)");

        let text = ApiError::from_body(500, b"  upstream exploded \n");
        assert_eq!(text.message(), Some("upstream exploded"));

        let wrong_shape = ApiError::from_body(401, br#"{"error": 12}"#);
        assert_eq!(*wrong_shape.kind(), ApiErrorKind::Unauthenticated);
        assert_eq!(wrong_shape.message(), None);
    }
}
