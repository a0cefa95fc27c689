//! Image loading capability and its HTTP implementation.
//!
//! # Responsibility
//! - Fetch a transformed resource and report its native size.
//!
//! # Invariants
//! - A successful load always reports a non-zero width and height.

use async_trait::async_trait;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::Cursor;
use std::time::Instant;

/// Materialized resource as seen by the scene layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedImage {
    pub locator: String,
    pub width: u32,
    pub height: u32,
}

/// Resource load failures.
#[derive(Debug)]
pub enum LoadError {
    Request(reqwest::Error),
    Status { locator: String, status: u16 },
    Decode(image::ImageError),
    EmptyImage { locator: String },
    /// Backend-specific failure without a richer type.
    Unavailable(String),
}

impl Display for LoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Request(err) => write!(f, "image request failed: {err}"),
            Self::Status { locator, status } => {
                write!(f, "transformation service returned {status} for `{locator}`")
            }
            Self::Decode(err) => write!(f, "image decode failed: {err}"),
            Self::EmptyImage { locator } => write!(f, "image at `{locator}` has no pixels"),
            Self::Unavailable(message) => write!(f, "image unavailable: {message}"),
        }
    }
}

impl Error for LoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Request(err) => Some(err),
            Self::Decode(err) => Some(err),
            _ => None,
        }
    }
}

/// Fetches and decodes an image resource.
#[async_trait]
pub trait ImageLoader: Send + Sync {
    async fn load(&self, locator: &str) -> Result<LoadedImage, LoadError>;
}

/// Loader that GETs the locator and reads the image header for its size.
#[derive(Debug, Clone, Default)]
pub struct HttpImageLoader {
    client: reqwest::Client,
}

impl HttpImageLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ImageLoader for HttpImageLoader {
    async fn load(&self, locator: &str) -> Result<LoadedImage, LoadError> {
        let started_at = Instant::now();
        let response = self
            .client
            .get(locator)
            .send()
            .await
            .map_err(LoadError::Request)?;

        let status = response.status();
        if !status.is_success() {
            warn!(
                "event=image_load module=scene status=error http_status={} duration_ms={}",
                status.as_u16(),
                started_at.elapsed().as_millis()
            );
            return Err(LoadError::Status {
                locator: locator.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(LoadError::Request)?;
        let (width, height) = decode_dimensions(&bytes)?;
        if width == 0 || height == 0 {
            return Err(LoadError::EmptyImage {
                locator: locator.to_string(),
            });
        }

        info!(
            "event=image_load module=scene status=ok bytes={} width={} height={} duration_ms={}",
            bytes.len(),
            width,
            height,
            started_at.elapsed().as_millis()
        );
        Ok(LoadedImage {
            locator: locator.to_string(),
            width,
            height,
        })
    }
}

/// Reads native dimensions from encoded image bytes without a full decode.
pub fn decode_dimensions(bytes: &[u8]) -> Result<(u32, u32), LoadError> {
    image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|err| LoadError::Decode(image::ImageError::IoError(err)))?
        .into_dimensions()
        .map_err(LoadError::Decode)
}
