use reqwest::header::{AUTHORIZATION, COOKIE, SET_COOKIE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use super::common::{ApiErrorResponse, ApiQueryParams, PaginationParams};
use super::error::ApiError;

/// InfluxDB v2 API client
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: String,
    credentials: Credentials,
    retry_config: RetryConfig,
}

/// How requests authenticate against the server
#[derive(Clone)]
enum Credentials {
    /// API token sent as `Authorization: Token <token>`
    Token(String),
    /// Session cookie obtained from `/api/v2/signin`
    Session(String),
}

impl Credentials {
    fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            Credentials::Token(token) => request.header(AUTHORIZATION, format!("Token {}", token)),
            Credentials::Session(cookie) => request.header(COOKIE, cookie),
        }
    }
}

#[derive(Clone, Debug)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub timeout_seconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
            timeout_seconds: 30,
        }
    }
}

fn normalize_base_url(endpoint: &str) -> Result<String, ApiError> {
    let parsed =
        url::Url::parse(endpoint).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", endpoint, e)))?;

    match parsed.scheme() {
        "http" | "https" => Ok(endpoint.trim_end_matches('/').to_string()),
        scheme => Err(ApiError::InvalidUrl(format!(
            "{}: unsupported scheme {}",
            endpoint, scheme
        ))),
    }
}

fn build_http_client(retry_config: &RetryConfig) -> Result<reqwest::Client, ApiError> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(retry_config.timeout_seconds))
        .build()?)
}

impl Client {
    /// Create a token-authenticated client with default configuration
    pub fn new(endpoint: &str, token: &str) -> Result<Self, ApiError> {
        Self::with_config(endpoint, token, RetryConfig::default())
    }

    /// Create a token-authenticated client with custom retry configuration
    pub fn with_config(
        endpoint: &str,
        token: &str,
        retry_config: RetryConfig,
    ) -> Result<Self, ApiError> {
        let base_url = normalize_base_url(endpoint)?;
        let http_client = build_http_client(&retry_config)?;

        Ok(Self::from_parts(
            http_client,
            base_url,
            Credentials::Token(token.to_string()),
            retry_config,
        ))
    }

    /// Sign in with a username and password and keep the session cookie
    pub async fn sign_in(endpoint: &str, username: &str, password: &str) -> Result<Self, ApiError> {
        Self::sign_in_with_config(endpoint, username, password, RetryConfig::default()).await
    }

    /// `POST /api/v2/signin`
    pub async fn sign_in_with_config(
        endpoint: &str,
        username: &str,
        password: &str,
        retry_config: RetryConfig,
    ) -> Result<Self, ApiError> {
        let base_url = normalize_base_url(endpoint)?;
        let http_client = build_http_client(&retry_config)?;

        tracing::debug!(username, "signing in to InfluxDB");

        let response = http_client
            .post(format!("{}/api/v2/signin", base_url))
            .basic_auth(username, Some(password))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let (code, message) = read_error_body(response).await;
            if status == StatusCode::UNAUTHORIZED {
                return Err(ApiError::AuthError(message));
            }
            return Err(ApiError::ApiError {
                status: status.as_u16(),
                code,
                message,
            });
        }

        let cookie = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|value| value.split(';').next())
            .map(str::trim)
            .find(|pair| !pair.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                ApiError::AuthError("sign-in response did not set a session cookie".to_string())
            })?;

        Ok(Self::from_parts(
            http_client,
            base_url,
            Credentials::Session(cookie),
            retry_config,
        ))
    }

    fn from_parts(
        http_client: reqwest::Client,
        base_url: String,
        credentials: Credentials,
        retry_config: RetryConfig,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                http_client,
                base_url,
                credentials,
                retry_config,
            }),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.inner.base_url, path);
        tracing::debug!("{} request to: {}", method, url);

        self.inner
            .credentials
            .apply(self.inner.http_client.request(method, url))
    }

    /// `GET /ping`, answered with 204 by a healthy server
    pub async fn ping(&self) -> Result<(), ApiError> {
        self.get::<()>("/ping").await
    }

    /// Execute a GET request with retry logic
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.execute_with_retry(|| self.request(Method::GET, path).send(), path, true)
            .await
    }

    /// Execute a GET request with query parameters
    pub async fn get_with_params<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &ApiQueryParams,
    ) -> Result<T, ApiError> {
        let full_path = format!("{}{}", path, params.to_query_string());
        self.get(&full_path).await
    }

    /// Fetch every page of an offset-paginated listing
    pub async fn get_all_pages<P, T, F>(
        &self,
        path: &str,
        params: &ApiQueryParams,
        extract: F,
    ) -> Result<Vec<T>, ApiError>
    where
        P: DeserializeOwned,
        T: PartialEq,
        F: Fn(P) -> Vec<T>,
    {
        let mut items = Vec::new();
        let mut page = PaginationParams::first_page();

        loop {
            let query = page.apply(params.clone());
            let batch = extract(self.get_with_params::<P>(path, &query).await?);
            // A server that ignores the offset keeps returning the same page
            let repeated = !batch.is_empty()
                && items.len() >= batch.len()
                && items[items.len() - batch.len()..] == batch[..];
            if repeated {
                tracing::warn!("{} returned the same page twice, stopping pagination", path);
                return Ok(items);
            }

            let done = (batch.len() as u32) < page.limit;
            items.extend(batch);

            if done {
                return Ok(items);
            }
            page = page.next();
        }
    }

    /// Execute a POST request
    ///
    /// Server errors are not retried since the object may already exist.
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.execute_with_retry(
            || self.request(Method::POST, path).json(body).send(),
            path,
            false,
        )
        .await
    }

    /// Execute a PATCH request with retry logic
    pub async fn patch<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.execute_with_retry(
            || self.request(Method::PATCH, path).json(body).send(),
            path,
            true,
        )
        .await
    }

    /// Execute a DELETE request with retry logic
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.execute_with_retry(|| self.request(Method::DELETE, path).send(), path, true)
            .await
    }

    pub fn orgs(&self) -> crate::api::orgs::OrgsApi<'_> {
        crate::api::orgs::OrgsApi::new(self)
    }

    pub fn buckets(&self) -> crate::api::buckets::BucketsApi<'_> {
        crate::api::buckets::BucketsApi::new(self)
    }

    pub fn authorizations(&self) -> crate::api::authorizations::AuthorizationsApi<'_> {
        crate::api::authorizations::AuthorizationsApi::new(self)
    }

    pub fn labels(&self) -> crate::api::labels::LabelsApi<'_> {
        crate::api::labels::LabelsApi::new(self)
    }

    pub fn tasks(&self) -> crate::api::tasks::TasksApi<'_> {
        crate::api::tasks::TasksApi::new(self)
    }

    pub fn users(&self) -> crate::api::users::UsersApi<'_> {
        crate::api::users::UsersApi::new(self)
    }

    /// Execute request with retry logic
    ///
    /// Rate limiting and connection failures are always retried. Server
    /// errors and timeouts are retried only for idempotent requests.
    async fn execute_with_retry<F, Fut, T>(
        &self,
        request_fn: F,
        path: &str,
        idempotent: bool,
    ) -> Result<T, ApiError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
        T: DeserializeOwned,
    {
        let retry = &self.inner.retry_config;
        let mut attempt = 0;
        let mut last_error = None;

        while attempt <= retry.max_retries {
            if attempt > 0 {
                let backoff = backoff_delay(retry, attempt);
                tracing::debug!(
                    "Retrying request to {} after {}ms (attempt {})",
                    path,
                    backoff,
                    attempt
                );
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            match request_fn().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return parse_success_response(response).await;
                    }

                    if status == StatusCode::UNAUTHORIZED {
                        let (_, message) = read_error_body(response).await;
                        return Err(ApiError::AuthError(message));
                    }

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        last_error = Some(ApiError::RateLimited);
                    } else if status.is_server_error() && idempotent {
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else {
                        return Err(handle_error_response(response).await);
                    }
                }
                Err(e) => {
                    if e.is_timeout() && idempotent {
                        last_error = Some(ApiError::Timeout(retry.timeout_seconds));
                    } else if e.is_timeout() {
                        return Err(ApiError::Timeout(retry.timeout_seconds));
                    } else if e.is_connect() || (e.is_request() && idempotent) {
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else {
                        return Err(ApiError::RequestError(e));
                    }
                }
            }

            attempt += 1;
        }

        Err(last_error.unwrap_or(ApiError::ServiceUnavailable))
    }
}

/// Exponential delay before retry `attempt`, capped at `max_backoff_ms`
fn backoff_delay(retry: &RetryConfig, attempt: u32) -> u64 {
    let factor = 2_u64.saturating_pow(attempt.saturating_sub(1));
    std::cmp::min(
        retry.initial_backoff_ms.saturating_mul(factor),
        retry.max_backoff_ms,
    )
}

/// Parse successful response, treating an empty body as JSON `null`
async fn parse_success_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ApiError> {
    let text = response.text().await?;
    let body = if text.trim().is_empty() { "null" } else { &text };

    serde_json::from_str::<T>(body).map_err(|e| {
        tracing::error!("Failed to deserialize response: {}", e);
        ApiError::ParseError(format!("Failed to parse response: {}", e))
    })
}

async fn handle_error_response(response: reqwest::Response) -> ApiError {
    let status = response.status().as_u16();
    let (code, message) = read_error_body(response).await;

    ApiError::ApiError {
        status,
        code,
        message,
    }
}

async fn read_error_body(response: reqwest::Response) -> (Option<String>, String) {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();

    match serde_json::from_str::<ApiErrorResponse>(&text) {
        Ok(ApiErrorResponse {
            code,
            message: Some(message),
        }) => (code, message),
        Ok(ApiErrorResponse { code, message: None }) => (code, text),
        Err(_) if text.trim().is_empty() => (
            None,
            status.canonical_reason().unwrap_or("Unknown error").to_string(),
        ),
        Err(_) => (None, text),
    }
}
