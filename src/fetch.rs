//! Background image fetch boundary.
//!
//! The engine consumes an abstract, cancelable fetch capability: a reference
//! string in, raw bytes or an error out. `HttpImageFetch` is the production
//! implementation over reqwest; tests substitute their own. Decoding is a
//! separate step so that a fetch that races with a newer background request
//! can be discarded before any decode work happens.

#[cfg(test)]
#[path = "fetch_test.rs"]
mod fetch_test;

use async_trait::async_trait;

/// Errors from fetching background image bytes.
///
/// The engine absorbs every variant the same way (no image, logged); the
/// distinction exists for the log line.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Connection, TLS, or protocol failure, including an unusable reference.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The server answered with a non-success status.
    #[error("unexpected status: {0}")]
    Status(u16),
}

/// Capability to fetch the bytes behind a background reference.
///
/// Implementations must be cancel-safe: the engine aborts superseded fetches
/// mid-flight and additionally discards stale completions by re-checking the
/// reference at apply time.
#[async_trait]
pub trait ImageFetch: Send + Sync {
    /// Fetch the raw bytes for `reference`.
    async fn fetch(&self, reference: &str) -> Result<Vec<u8>, FetchError>;
}

/// HTTP(S) fetcher over a shared reqwest client.
#[derive(Debug, Clone, Default)]
pub struct HttpImageFetch {
    client: reqwest::Client,
}

impl HttpImageFetch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ImageFetch for HttpImageFetch {
    async fn fetch(&self, reference: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(reference).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

/// A decoded background image: RGBA8 pixels plus the dimensions the
/// zoom-to-fit math needs.
#[derive(Debug, Clone)]
pub struct BackgroundImage {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA8 rows, `width * height * 4` bytes.
    pub pixels: Vec<u8>,
}

/// Decode fetched bytes into a background image. Undecodable bytes yield
/// `None` (logged); the engine then shows no background, the same outcome as
/// a failed fetch.
#[must_use]
pub fn decode_image(bytes: &[u8]) -> Option<BackgroundImage> {
    match image::load_from_memory(bytes) {
        Ok(decoded) => {
            let rgba = decoded.to_rgba8();
            let (width, height) = (rgba.width(), rgba.height());
            Some(BackgroundImage { width, height, pixels: rgba.into_raw() })
        }
        Err(e) => {
            tracing::warn!(error = %e, len = bytes.len(), "background image decode failed");
            None
        }
    }
}
