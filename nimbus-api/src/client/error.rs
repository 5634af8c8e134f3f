use crate::ApiError;

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    #[error("invalid request url: {0}")]
    Url(#[from] url::ParseError),

    #[error("failed to read upload source: {0}")]
    Io(#[from] std::io::Error),
}

impl RequestError {
    pub fn as_api(self) -> Result<ApiError, RequestError> {
        match self {
            RequestError::Api(v) => Ok(v),
            other => Err(other)
        }
    }

    /// true for failures where the server never produced a response
    pub fn is_transport(&self) -> bool {
        match self {
            RequestError::Reqwest(err) => err.is_connect() ||
                err.is_timeout() ||
                err.is_request() ||
                err.is_body(),
            _ => false
        }
    }
}
