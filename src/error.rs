use nimbus_api::{ApiError, ApiErrorKind};
use nimbus_api::client::error::RequestError;
use strum::AsRefStr as StrumAsRefStr;

type BoxDynError = Box<dyn std::error::Error + Send + Sync>;

/// how a failed operation should be presented. `Validation` never reaches
/// the backend, `Conflict` carries the backend message verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, StrumAsRefStr)]
pub enum ErrorKind {
    Validation,
    Conflict,
    Network,
    NotFound,
    Auth,
    InvalidOperation,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self.as_ref(), f)
    }
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    msg: Option<String>,
    src: Option<BoxDynError>,
}

pub type Result<T = ()> = std::result::Result<T, Error>;

impl Error {
    pub fn new(kind: ErrorKind) -> Error {
        Error {
            kind,
            msg: None,
            src: None,
        }
    }

    pub fn validation<M>(msg: M) -> Error
    where
        M: Into<String>
    {
        Error::new(ErrorKind::Validation).message(msg)
    }

    pub fn conflict<M>(msg: M) -> Error
    where
        M: Into<String>
    {
        Error::new(ErrorKind::Conflict).message(msg)
    }

    pub fn not_found<M>(msg: M) -> Error
    where
        M: Into<String>
    {
        Error::new(ErrorKind::NotFound).message(msg)
    }

    pub fn invalid_operation<M>(msg: M) -> Error
    where
        M: Into<String>
    {
        Error::new(ErrorKind::InvalidOperation).message(msg)
    }

    pub fn message<M>(mut self, msg: M) -> Error
    where
        M: Into<String>
    {
        self.msg = Some(msg.into());
        self
    }

    pub fn source<S>(mut self, src: S) -> Error
    where
        S: Into<BoxDynError>
    {
        self.src = Some(src.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn msg(&self) -> Option<&str> {
        self.msg.as_deref()
    }

    pub fn is_kind(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.kind, self.msg.as_ref(), self.src.as_ref()) {
            (_, Some(msg), _) => write!(f, "{msg}"),
            (kind, None, Some(err)) => write!(f, "{kind}: {err}"),
            (kind, None, None) => write!(f, "{kind}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.src.as_ref().map(|v| & **v as _)
    }
}

impl From<ApiError> for Error {
    fn from(err: ApiError) -> Self {
        let kind = match err.kind() {
            ApiErrorKind::ValidationFailed |
            ApiErrorKind::NoWork => ErrorKind::Validation,
            ApiErrorKind::InvalidRequest |
            ApiErrorKind::Conflict |
            ApiErrorKind::PayloadTooLarge => ErrorKind::Conflict,
            ApiErrorKind::Unauthenticated |
            ApiErrorKind::PermissionDenied => ErrorKind::Auth,
            ApiErrorKind::NotFound => ErrorKind::NotFound,
            ApiErrorKind::Timeout |
            ApiErrorKind::TooManyRequests |
            ApiErrorKind::Unavailable |
            ApiErrorKind::InternalFailure |
            ApiErrorKind::Unknown => ErrorKind::Network,
        };

        let msg = err.to_string();

        Error::new(kind)
            .message(msg)
            .source(err)
    }
}

impl From<RequestError> for Error {
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::Api(err) => Error::from(err),
            RequestError::Io(err) => Error::validation("failed to read the file being uploaded")
                .source(err),
            RequestError::Url(err) => Error::validation("invalid request url")
                .source(err),
            RequestError::Reqwest(err) => {
                if err.is_decode() {
                    Error::new(ErrorKind::Network)
                        .message("unexpected response from server")
                        .source(err)
                } else {
                    Error::new(ErrorKind::Network)
                        .message("failed to reach server")
                        .source(err)
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn backend_messages_pass_through() {
        let api = ApiError::from_body(409, br#"{"error":"Storage quota exceeded"}"#);
        let err = Error::from(RequestError::Api(api));

        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.to_string(), "Storage quota exceeded");
    }

    #[test]
    fn status_classes() {
        let cases = [
            (400, ErrorKind::Conflict),
            (401, ErrorKind::Auth),
            (403, ErrorKind::Auth),
            (404, ErrorKind::NotFound),
            (409, ErrorKind::Conflict),
            (500, ErrorKind::Network),
            (503, ErrorKind::Network),
        ];

        for (status, expected) in cases {
            let err = Error::from(ApiError::from_body(status, b""));

            assert_eq!(err.kind(), expected, "status {}", status);
        }
    }

    #[test]
    fn local_validation() {
        let api = ApiError::from((ApiErrorKind::ValidationFailed, "invalid disk name"));
        let err = Error::from(api);

        assert!(err.is_kind(ErrorKind::Validation));
        assert_eq!(err.msg(), Some("invalid disk name"));
    }
}
