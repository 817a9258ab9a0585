//! Mirror fetchers
//!
//! The downloader only needs "give me a body for this URL"; the HTTP client
//! lives behind [`MirrorFetcher`] so tests and alternate transports can swap
//! it out.

use super::filename;
use crate::config::HttpConfig;
use crate::error::FetchError;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_DISPOSITION};
use std::time::Duration;
use url::Url;

/// Media types requested from mirrors
pub const DEFAULT_ACCEPT: &str = "video/mp4, audio/mpeg";

/// A streamed response body
#[async_trait]
pub trait AssetBody: Send {
    /// Next chunk of the body, `None` once exhausted.
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, FetchError>;
}

/// A successful response from one mirror
pub struct FetchedAsset {
    /// Filename advertised by the server, unsanitized
    pub suggested_filename: Option<String>,
    pub body: Box<dyn AssetBody>,
}

impl std::fmt::Debug for FetchedAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchedAsset")
            .field("suggested_filename", &self.suggested_filename)
            .finish_non_exhaustive()
    }
}

/// Source of asset bodies, shared across concurrent downloads
#[async_trait]
pub trait MirrorFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<FetchedAsset, FetchError>;
}

/// [`MirrorFetcher`] over a shared `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(DEFAULT_ACCEPT));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client })
    }

    /// Wrap an already configured client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

struct ResponseBody(reqwest::Response);

#[async_trait]
impl AssetBody for ResponseBody {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, FetchError> {
        Ok(self.0.chunk().await?)
    }
}

#[async_trait]
impl MirrorFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedAsset, FetchError> {
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let suggested_filename = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(filename::from_content_disposition);

        Ok(FetchedAsset {
            suggested_filename,
            body: Box::new(ResponseBody(response)),
        })
    }
}

/// Body backed by chunks already in memory
pub struct MemoryBody {
    chunks: std::collections::VecDeque<Bytes>,
}

impl MemoryBody {
    pub fn new(chunks: impl IntoIterator<Item = Bytes>) -> Self {
        Self {
            chunks: chunks.into_iter().collect(),
        }
    }
}

#[async_trait]
impl AssetBody for MemoryBody {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, FetchError> {
        Ok(self.chunks.pop_front())
    }
}
