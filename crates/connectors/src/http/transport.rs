use crate::error::ClientError;
use reqwest::{Method, RequestBuilder, Response};
use serde::{Deserialize, de::DeserializeOwned};
use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use tracing::debug;

/// Idle connections kept per coordinator.
pub const CONNECTION_LIMIT: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
    None,
    Basic { username: String, password: String },
    Jwt(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    #[serde(default)]
    error_num: i64,
    #[serde(default)]
    error_message: String,
}

/// Turns the endpoint notation used by cluster health (`tcp://`, `ssl://`)
/// into a URL base.
pub fn normalize_endpoint(endpoint: &str) -> Result<String, ClientError> {
    let endpoint = endpoint.trim().trim_end_matches('/');
    let normalized = if let Some(rest) = endpoint.strip_prefix("tcp://") {
        format!("http://{rest}")
    } else if let Some(rest) = endpoint.strip_prefix("ssl://") {
        format!("https://{rest}")
    } else if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        return Err(ClientError::InvalidEndpoint(endpoint.to_string()));
    };
    Ok(normalized)
}

/// Shared HTTP plumbing: one connection pool, round robin over coordinators.
#[derive(Clone)]
pub struct Transport {
    client: reqwest::Client,
    endpoints: Arc<Vec<String>>,
    next: Arc<AtomicUsize>,
    auth: Auth,
}

impl Transport {
    pub fn new(endpoints: &[String], auth: Auth) -> Result<Self, ClientError> {
        let endpoints = endpoints
            .iter()
            .map(|e| normalize_endpoint(e))
            .collect::<Result<Vec<_>, _>>()?;
        if endpoints.is_empty() {
            return Err(ClientError::InvalidEndpoint("no endpoint given".into()));
        }

        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(CONNECTION_LIMIT)
            .tcp_nodelay(true)
            .build()?;

        Ok(Self {
            client,
            endpoints: Arc::new(endpoints),
            next: Arc::new(AtomicUsize::new(0)),
            auth,
        })
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    fn base(&self) -> &str {
        let idx = self.next.fetch_add(1, Ordering::Relaxed) % self.endpoints.len();
        &self.endpoints[idx]
    }

    /// Request against the next coordinator.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base(), path);
        self.authorize(self.client.request(method, url))
    }

    /// Request against a specific server, e.g. a DB server.
    pub fn request_at(
        &self,
        endpoint: &str,
        method: Method,
        path: &str,
    ) -> Result<RequestBuilder, ClientError> {
        let url = format!("{}{}", normalize_endpoint(endpoint)?, path);
        Ok(self.authorize(self.client.request(method, url)))
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            Auth::None => builder,
            Auth::Basic { username, password } => builder.basic_auth(username, Some(password)),
            Auth::Jwt(token) => builder.bearer_auth(token),
        }
    }

    /// Sends the request and turns non-success answers into a [`ClientError`].
    pub async fn execute(
        &self,
        builder: RequestBuilder,
        timeout: Option<Duration>,
    ) -> Result<Response, ClientError> {
        let builder = match timeout {
            Some(t) => builder.timeout(t),
            None => builder,
        };

        let response = builder.send().await.map_err(|e| match timeout {
            Some(t) if e.is_timeout() => ClientError::Timeout(t),
            _ => ClientError::Http(e),
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body: ErrorBody = response.json().await.unwrap_or_default();
        let message = if body.error_message.is_empty() {
            status.to_string()
        } else {
            body.error_message
        };
        debug!(status = status.as_u16(), error_num = body.error_num, %message, "Request failed");
        Err(ClientError::from_status(
            status.as_u16(),
            body.error_num,
            message,
        ))
    }

    pub async fn json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        timeout: Option<Duration>,
    ) -> Result<T, ClientError> {
        let response = self.execute(builder, timeout).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub async fn empty(
        &self,
        builder: RequestBuilder,
        timeout: Option<Duration>,
    ) -> Result<(), ClientError> {
        self.execute(builder, timeout).await.map(|_| ())
    }
}
