//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients per proxy / redirect mode
//! - Request shaping (method, user agent, referer, timeout)
//! - Transport error classification into retryable and terminal classes

use async_trait::async_trait;
use reqwest::{redirect::Policy, Client, Method, Proxy};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use thiserror::Error;
use url::Url;

/// Maximum hops followed when redirects are handled by the transport
const MAX_REDIRECTS: usize = 10;

/// A single HTTP request issued by the pipeline
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: Url,
    pub method: String,
    pub user_agent: String,
    pub referer: Option<String>,
    pub proxy: Option<String>,
    pub timeout: Duration,
    pub follow_redirect: bool,
}

/// Result of a completed HTTP exchange, whatever its status
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// Final URL (differs from the request URL when redirects were followed)
    pub url: Url,
    pub status_code: u16,
    /// Header names are lowercase
    pub headers: HashMap<String, String>,
    pub body: String,
    pub response_time: Duration,
    pub proxy: Option<String>,
    pub method: String,
}

impl FetchResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status_code)
    }
}

/// Transport-level failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Request timed out")]
    Timeout,

    #[error("Connection reset")]
    ConnectionReset,

    #[error("Connection refused")]
    ConnectionRefused,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl FetchError {
    /// Retryable errors are retried and count toward host escalation
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::ConnectionReset | Self::ConnectionRefused
        )
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Timeout => "ETIMEDOUT",
            Self::ConnectionReset => "ECONNRESET",
            Self::ConnectionRefused => "ECONNREFUSED",
            Self::InvalidRequest(_) => "EINVALIDREQUEST",
            Self::Transport(_) => "ETRANSPORT",
        }
    }

    /// Classifies a reqwest error
    pub fn classify(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            return Self::Timeout;
        }
        if is_connection_reset(error) {
            return Self::ConnectionReset;
        }
        if error.is_connect() {
            return Self::ConnectionRefused;
        }
        if error.is_builder() {
            return Self::InvalidRequest(error.to_string());
        }
        Self::Transport(error.to_string())
    }
}

fn is_connection_reset(error: &reqwest::Error) -> bool {
    let mut source = std::error::Error::source(error);
    while let Some(err) = source {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            if matches!(
                io.kind(),
                std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::ConnectionAborted
            ) {
                return true;
            }
        }
        source = err.source();
    }
    false
}

/// Performs HTTP exchanges for the pipeline
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError>;
}

/// Builds an HTTP client for one proxy / redirect combination
pub fn build_http_client(proxy: Option<&str>, follow_redirect: bool) -> Result<Client, reqwest::Error> {
    let policy = if follow_redirect {
        Policy::limited(MAX_REDIRECTS)
    } else {
        Policy::none()
    };

    let mut builder = Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .redirect(policy)
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = proxy {
        builder = builder.proxy(Proxy::all(proxy)?);
    }

    builder.build()
}

/// reqwest-backed fetcher
///
/// Clients are cached per `(proxy, follow_redirect)` so connections are
/// pooled across requests.
#[derive(Default)]
pub struct HttpFetcher {
    clients: Mutex<HashMap<(Option<String>, bool), Client>>,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn client_for(&self, proxy: Option<&str>, follow_redirect: bool) -> Result<Client, FetchError> {
        let key = (proxy.map(str::to_string), follow_redirect);
        let mut clients = self
            .clients
            .lock()
            .map_err(|_| FetchError::Transport("client cache poisoned".to_string()))?;

        if let Some(client) = clients.get(&key) {
            return Ok(client.clone());
        }

        let client = build_http_client(proxy, follow_redirect)
            .map_err(|e| FetchError::InvalidRequest(e.to_string()))?;
        clients.insert(key, client.clone());
        Ok(client)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        let client = self.client_for(request.proxy.as_deref(), request.follow_redirect)?;
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| FetchError::InvalidRequest(e.to_string()))?;

        let mut builder = client
            .request(method.clone(), request.url.clone())
            .timeout(request.timeout)
            .header(reqwest::header::USER_AGENT, &request.user_agent);
        if let Some(referer) = &request.referer {
            builder = builder.header(reqwest::header::REFERER, referer);
        }

        let started = Instant::now();
        let response = builder.send().await.map_err(|e| FetchError::classify(&e))?;

        let url = response.url().clone();
        let status_code = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();

        let body = response.text().await.map_err(|e| FetchError::classify(&e))?;

        Ok(FetchResponse {
            url,
            status_code,
            headers,
            body,
            response_time: started.elapsed(),
            proxy: request.proxy.clone(),
            method: method.to_string(),
        })
    }
}
