//! The HTTP capability the client posts through.

use crate::error::TransportError;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::{
    header::{HeaderMap, CONTENT_TYPE},
    StatusCode,
};
use url::Url;

/// A reusable client that holds a connection pool internally, as per
/// [reqwest::Client].
static CLIENT: Lazy<reqwest::Client> = Lazy::new(reqwest::Client::new);

/// Response metadata. The body is never read.
#[derive(Clone, Debug)]
pub struct HookResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

impl HookResponse {
    pub fn new(status: StatusCode) -> Self {
        HookResponse {
            status,
            headers: HeaderMap::new(),
        }
    }
}

/// Sends a JSON body to a URL.
///
/// Implementations must report failures to complete the exchange as a
/// [TransportError], and any response that did arrive as a [HookResponse]
/// whatever its status.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, url: &Url, body: Vec<u8>) -> Result<HookResponse, TransportError>;
}

/// [Transport] backed by [reqwest]. Timeouts are whatever the inner client
/// is configured with.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        ReqwestTransport { client }
    }
}

/// Shares a process-wide connection pool.
impl Default for ReqwestTransport {
    fn default() -> Self {
        ReqwestTransport::new(CLIENT.clone())
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn post(&self, url: &Url, body: Vec<u8>) -> Result<HookResponse, TransportError> {
        let res = self
            .client
            .post(url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        Ok(HookResponse {
            status: res.status(),
            headers: res.headers().clone(),
        })
    }
}
