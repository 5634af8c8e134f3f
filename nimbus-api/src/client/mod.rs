use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;

pub mod error;
pub mod disks;
pub mod files;
pub mod users;
pub mod requests;

use error::RequestError;
use crate::ApiError;

pub struct Info {
    pub url: Url
}

/// async client for the backend REST api. every request carries the bearer
/// token given to the builder.
pub struct ApiClient {
    pub(crate) client: reqwest::Client,
    pub(crate) token: Option<String>,
    pub(crate) info: Info
}

impl ApiClient {
    pub fn builder(url: Url) -> ApiClientBuilder {
        ApiClientBuilder {
            url,
            token: None,
            agent: None,
            timeout: None,
        }
    }

    pub fn url(&self) -> &Url {
        &self.info.url
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    /// appends `segments` to the base url. each segment is percent encoded
    /// on its own so ids can never add path components.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url, RequestError> {
        let mut url = self.info.url.clone();

        url.path_segments_mut()
            .map_err(|_| RequestError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }

    pub(crate) fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, RequestError> {
        let url = self.endpoint(segments)?;

        tracing::debug!("{} {}", method, url);

        let builder = self.client.request(method, url);

        Ok(match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder
        })
    }

    pub(crate) fn get(&self, segments: &[&str]) -> Result<RequestBuilder, RequestError> {
        self.request(Method::GET, segments)
    }

    pub(crate) fn post(&self, segments: &[&str]) -> Result<RequestBuilder, RequestError> {
        self.request(Method::POST, segments)
    }

    pub(crate) fn put(&self, segments: &[&str]) -> Result<RequestBuilder, RequestError> {
        self.request(Method::PUT, segments)
    }

    pub(crate) fn patch(&self, segments: &[&str]) -> Result<RequestBuilder, RequestError> {
        self.request(Method::PATCH, segments)
    }

    pub(crate) fn delete(&self, segments: &[&str]) -> Result<RequestBuilder, RequestError> {
        self.request(Method::DELETE, segments)
    }
}

/// decodes a successful response or turns the body of a failed one into an
/// [`ApiError`]
pub(crate) async fn json_response<T>(res: Response) -> Result<T, RequestError>
where
    T: DeserializeOwned
{
    if res.status().is_success() {
        Ok(res.json().await?)
    } else {
        Err(error_response(res).await)
    }
}

pub(crate) async fn empty_response(res: Response) -> Result<(), RequestError> {
    if res.status().is_success() {
        Ok(())
    } else {
        Err(error_response(res).await)
    }
}

pub(crate) async fn error_response(res: Response) -> RequestError {
    let status = res.status().as_u16();

    match res.bytes().await {
        Ok(body) => {
            let err = ApiError::from_body(status, &body);

            tracing::debug!("request failed: {} {}", status, err);

            RequestError::Api(err)
        },
        Err(err) => RequestError::Reqwest(err)
    }
}

pub struct ApiClientBuilder {
    url: Url,
    token: Option<String>,
    agent: Option<String>,
    timeout: Option<Duration>,
}

impl ApiClientBuilder {
    pub fn token<T>(&mut self, token: T) -> &mut Self
    where
        T: Into<String>
    {
        self.token = Some(token.into());
        self
    }

    pub fn user_agent<U>(&mut self, user_agent: U) -> &mut Self
    where
        U: Into<String>
    {
        self.agent = Some(user_agent.into());
        self
    }

    pub fn timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<ApiClient, RequestError> {
        let user_agent = self.agent.unwrap_or("nimbus-api-client/0.1.0".into());
        let mut url = self.url;

        if url.cannot_be_a_base() {
            return Err(RequestError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase));
        }

        // keeps any path prefix such as "/api" in front of every endpoint
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        let mut builder = reqwest::Client::builder()
            .user_agent(user_agent);

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build()?;

        Ok(ApiClient {
            client,
            token: self.token,
            info: Info {
                url
            }
        })
    }
}
