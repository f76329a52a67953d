//! REST client for the GitHub API
//!
//! Each method issues exactly one request and maps the response onto the
//! `ApiFailure` taxonomy:
//!
//! | Response | Failure |
//! |----------|---------|
//! | HTTP 403 with `x-ratelimit-remaining: 0` | `RateLimited` |
//! | Any other HTTP >= 400 (including 429) | `Status` with the raw `Retry-After` |
//! | Client timeout | `Timeout` |
//! | Connection failure | `Transport` |
//! | Undecodable success body | `Decode` |

use crate::api::{ApiFailure, ApiResult, GraphApi, RateStatus, User, PAGE_SIZE};
use crate::config::ApiConfig;
use crate::ConfigError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_LENGTH, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;

const RATE_REMAINING_HEADER: &str = "x-ratelimit-remaining";
const RATE_RESET_HEADER: &str = "x-ratelimit-reset";

/// Builds an HTTP client carrying the access token and API headers
///
/// # Arguments
///
/// * `config` - The API configuration (user agent, timeout)
/// * `token` - The access token sent as a bearer credential
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(RippleError)` - The token is not a valid header value or the client failed to build
pub fn build_http_client(config: &ApiConfig, token: &str) -> crate::Result<Client> {
    let mut auth = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| {
        ConfigError::Validation("access token contains invalid characters".to_string())
    })?;
    auth.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, auth);
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/vnd.github+json"),
    );
    headers.insert(
        "x-github-api-version",
        HeaderValue::from_static("2022-11-28"),
    );

    let client = Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .timeout(config.request_timeout())
        .gzip(true)
        .brotli(true)
        .build()?;

    Ok(client)
}

/// GitHub REST implementation of `GraphApi`
pub struct GithubClient {
    client: Client,
    base_url: String,
}

impl GithubClient {
    /// Creates a client from configuration and an access token
    pub fn new(config: &ApiConfig, token: &str) -> crate::Result<Self> {
        let client = build_http_client(config, token)?;
        Ok(Self::with_client(client, &config.base_url))
    }

    /// Creates a client around an existing reqwest client
    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Path of a listing endpoint; an empty login targets the authenticated account
    fn listing_path(login: &str, relation: &str) -> String {
        if login.is_empty() {
            format!("user/{}", relation)
        } else {
            format!("users/{}/{}", login, relation)
        }
    }

    async fn list(&self, login: &str, relation: &str, page: u32) -> ApiResult<Vec<User>> {
        let url = self.endpoint(&Self::listing_path(login, relation));
        let response = self
            .client
            .get(url)
            .query(&[("per_page", PAGE_SIZE as u32), ("page", page)])
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json::<Vec<User>>().await?)
    }
}

#[async_trait]
impl GraphApi for GithubClient {
    async fn get_user(&self, login: &str) -> ApiResult<User> {
        let path = if login.is_empty() {
            "user".to_string()
        } else {
            format!("users/{}", login)
        };
        let response = self.client.get(self.endpoint(&path)).send().await?;
        let response = check_status(response).await?;
        Ok(response.json::<User>().await?)
    }

    async fn list_following(&self, login: &str, page: u32) -> ApiResult<Vec<User>> {
        self.list(login, "following", page).await
    }

    async fn list_followers(&self, login: &str, page: u32) -> ApiResult<Vec<User>> {
        self.list(login, "followers", page).await
    }

    async fn follow(&self, login: &str) -> ApiResult<()> {
        let url = self.endpoint(&format!("user/following/{}", login));
        let response = self
            .client
            .put(url)
            .header(CONTENT_LENGTH, 0)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn rate_status(&self) -> ApiResult<RateStatus> {
        let response = self.client.get(self.endpoint("rate_limit")).send().await?;
        let response = check_status(response).await?;
        let body = response.json::<RateLimitBody>().await?;
        let core = body.resources.core;
        let reset_at = DateTime::<Utc>::from_timestamp(core.reset, 0)
            .ok_or_else(|| ApiFailure::Decode(format!("invalid reset timestamp {}", core.reset)))?;

        Ok(RateStatus {
            remaining: core.remaining,
            reset_at,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RateLimitBody {
    resources: RateResources,
}

#[derive(Debug, Deserialize)]
struct RateResources {
    core: RateWindow,
}

#[derive(Debug, Deserialize)]
struct RateWindow {
    remaining: u32,
    reset: i64,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Passes responses below 400 through and classifies everything else
async fn check_status(response: Response) -> ApiResult<Response> {
    let status = response.status();
    if status.as_u16() < 400 {
        return Ok(response);
    }

    let headers = response.headers();
    let retry_after = header_str(headers, RETRY_AFTER.as_str()).map(str::to_string);
    let exhausted = header_str(headers, RATE_REMAINING_HEADER) == Some("0");
    let reset_at = header_str(headers, RATE_RESET_HEADER)
        .and_then(|v| v.parse::<i64>().ok())
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));

    if status == StatusCode::FORBIDDEN && exhausted {
        let message = response
            .json::<ErrorBody>()
            .await
            .map(|body| body.message)
            .unwrap_or_else(|_| "API rate limit exceeded".to_string());
        return Err(ApiFailure::RateLimited { message, reset_at });
    }

    Err(ApiFailure::Status {
        status: status.as_u16(),
        retry_after,
    })
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
