//! # HTTP Retrieval Utilities
//!
//! An asynchronous API client wrapper around `reqwest`, with exponential
//! backoff retries from `reqwest-retry` and standardized JSON response handling.

use anyhow::{anyhow, Context};
use reqwest::header::{HeaderMap, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, RequestBuilder};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

/// A standardized container for API responses.
///
/// Wraps the deserialized data along with the HTTP status and headers.
#[derive(Debug)]
pub struct ApiResponse<T> {
    /// The successfully deserialized response body, if any.
    pub data: Option<T>,
    /// The raw error body returned by the server if the request failed.
    pub error_body: Option<String>,
    /// The numeric HTTP status code.
    pub status: u16,
    /// Indicates if the status code was in the 2xx range.
    pub success: bool,
    /// The headers returned by the server.
    pub headers: HeaderMap,
}

/// How requests authenticate.
#[derive(Debug, Clone)]
pub enum ApiAuth {
    /// `Authorization: Bearer <token>`.
    Bearer(String),
    /// HTTP basic authentication.
    Basic {
        /// User name, e.g. an account SID.
        username: String,
        /// Password, e.g. an auth token.
        password: String,
    },
}

/// A flexible asynchronous HTTP client.
///
/// Built on top of `reqwest_middleware`, it handles base URLs, authentication
/// and automatic retries of transient failures.
pub struct ApiClient {
    /// The underlying middleware-enabled client.
    inner: ClientWithMiddleware,
    /// The base URL endpoint paths are appended to.
    base_url: Url,
    /// Optional credentials applied to every request.
    auth: Option<ApiAuth>,
}

impl ApiClient {
    /// Creates a new `ApiClient` with a retry policy.
    ///
    /// # Arguments
    /// * `base_url` - Absolute base URL, e.g. "https://sheets.googleapis.com/v4/".
    /// * `auth` - Optional credentials.
    /// * `max_retries` - Retries for transient failures; use `0` for requests
    ///   that must not be repeated.
    pub fn new(base_url: &str, auth: Option<ApiAuth>, max_retries: u32) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid base URL (must be absolute): {base_url}"))?;
        if base_url.cannot_be_a_base() {
            return Err(anyhow!("URL cannot be used as a base: {base_url}"));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent("controllog/1.0")
            .build()
            .context("Failed to build HTTP client")?;

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(max_retries);
        let inner = ClientBuilder::new(http)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            inner,
            base_url,
            auth,
        })
    }

    /// Builds an endpoint URL by appending percent-encoded path segments and
    /// query pairs to the base URL.
    pub fn endpoint(&self, segments: &[&str], query: &[(&str, &str)]) -> anyhow::Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| anyhow!("URL cannot be used as a base: {}", self.base_url))?;
            path.pop_if_empty();
            path.extend(segments);
        }
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// `GET` a JSON document.
    pub async fn get_json<T: DeserializeOwned>(&self, url: Url) -> anyhow::Result<ApiResponse<T>> {
        let req = self.authorized(self.inner.request(Method::GET, url));
        self.execute(req).await
    }

    /// `POST` an url-encoded form and read a JSON reply.
    pub async fn post_form<T: DeserializeOwned>(
        &self,
        url: Url,
        form: &[(&str, &str)],
    ) -> anyhow::Result<ApiResponse<T>> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(form)
            .finish();
        let req = self
            .authorized(self.inner.request(Method::POST, url))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body);
        self.execute(req).await
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            Some(ApiAuth::Bearer(token)) => req.header(AUTHORIZATION, format!("Bearer {token}")),
            Some(ApiAuth::Basic { username, password }) => req.basic_auth(username, Some(password)),
            None => req,
        }
    }

    async fn execute<T: DeserializeOwned>(&self, req: RequestBuilder) -> anyhow::Result<ApiResponse<T>> {
        let response: reqwest::Response = req.send().await?;
        let status = response.status();
        let headers = response.headers().clone();

        if status.is_success() {
            let data = response.json::<T>().await?;
            Ok(ApiResponse {
                data: Some(data),
                error_body: None,
                status: status.as_u16(),
                success: true,
                headers,
            })
        } else {
            // Keep the error body for the caller's log line.
            let error_body = response.text().await.ok();
            Ok(ApiResponse {
                data: None,
                error_body,
                status: status.as_u16(),
                success: false,
                headers,
            })
        }
    }
}
