use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use guidedoc_logging::guide_debug;
use reqwest::header::CONTENT_TYPE;

use crate::cache::ImageCache;
use crate::fetch::USER_AGENT;
use crate::types::{FailureKind, FetchError};

/// Injected image-retrieval seam for the builder.
///
/// Absence of data means "skip this image", never an error; implementations
/// apply their own timeout, size, and content-type policy and must not fail.
pub trait ImageFetcher {
    fn fetch(&self, url: &str) -> Option<Bytes>;
}

/// Intrinsic pixel width of an encoded image, or `None` when the bytes cannot
/// be decoded for size inspection.
pub fn intrinsic_width_px(data: &[u8]) -> Option<u32> {
    let reader = image::ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .ok()?;
    reader.into_dimensions().ok().map(|(width, _)| width)
}

#[derive(Debug, Clone)]
pub struct ImageSettings {
    pub request_timeout: Duration,
    pub max_bytes: u64,
    pub cache_capacity: usize,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(15),
            max_bytes: 50 * 1024 * 1024,
            cache_capacity: 100,
        }
    }
}

/// Blocking facade over an async HTTP client, driven through the conversion
/// worker's runtime handle. Downloads are validated (content type, size,
/// decodable image data) and served through the injected cache.
pub struct ReqwestImageFetcher {
    client: reqwest::Client,
    runtime: tokio::runtime::Handle,
    cache: Arc<ImageCache>,
    settings: ImageSettings,
}

impl ReqwestImageFetcher {
    pub fn new(
        runtime: tokio::runtime::Handle,
        cache: Arc<ImageCache>,
        settings: ImageSettings,
    ) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self {
            client,
            runtime,
            cache,
            settings,
        })
    }

    async fn download(&self, url: &str) -> Result<Option<Bytes>, reqwest::Error> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Ok(None);
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !content_type.contains("image") && !content_type.contains("octet-stream") {
            return Ok(None);
        }
        if let Some(len) = response.content_length() {
            if len > self.settings.max_bytes {
                return Ok(None);
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if bytes.len() as u64 + chunk.len() as u64 > self.settings.max_bytes {
                return Ok(None);
            }
            bytes.extend_from_slice(&chunk);
        }
        if bytes.is_empty() {
            return Ok(None);
        }
        // Reject bytes no image decoder recognizes before they reach the sink.
        if image::guess_format(&bytes).is_err() {
            return Ok(None);
        }
        Ok(Some(Bytes::from(bytes)))
    }
}

impl ImageFetcher for ReqwestImageFetcher {
    fn fetch(&self, url: &str) -> Option<Bytes> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return None;
        }
        if let Some(hit) = self.cache.get(url) {
            return Some(hit);
        }
        match self.runtime.block_on(self.download(url)) {
            Ok(Some(data)) => {
                self.cache.put(url, data.clone());
                Some(data)
            }
            Ok(None) => None,
            Err(err) => {
                guide_debug!("image download failed for {url}: {err}");
                None
            }
        }
    }
}
