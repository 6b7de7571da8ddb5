//! Tile provider abstraction and the HTTP slippy-tile implementation.

use std::future::Future;
use std::time::Duration;

use image::RgbaImage;
use tracing::debug;

use crate::error::{Error, Result};
use crate::tiles::TileAddress;

/// Source of fixed-size square raster tiles addressed by (zoom, x, y).
///
/// Implementations may fail per tile; the stitcher treats each failure as
/// non-fatal and leaves the corresponding region blank.
pub trait TileProvider {
    /// Edge length in pixels of every tile this provider returns.
    fn tile_px(&self) -> u32;

    /// Fetch one tile. The returned image must be `tile_px` × `tile_px`.
    fn fetch_tile(&self, addr: TileAddress) -> impl Future<Output = Result<RgbaImage>> + Send;
}

/// Configuration for [`HttpTileProvider`].
///
/// All state lives here and is passed in at construction; nothing is read
/// from the environment or shared between pipeline runs.
#[derive(Debug, Clone)]
pub struct TileProviderConfig {
    /// URL template with `{z}`, `{x}`, `{y}` and optional `{token}`
    /// placeholders, e.g.
    /// `https://tiles.example.com/{z}/{x}/{y}@2x.png?access_token={token}`.
    pub url_template: String,
    /// Value substituted for `{token}`.
    pub access_token: String,
    /// Tile edge length in pixels (512 for `@2x` tiles).
    pub tile_px: u32,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for TileProviderConfig {
    fn default() -> Self {
        Self {
            url_template: String::new(),
            access_token: String::new(),
            tile_px: 512,
            timeout: Duration::from_secs(20),
        }
    }
}

/// HTTP slippy-tile source backed by a shared `reqwest` client.
///
/// No retries: a failed request surfaces as a per-tile failure, and retry
/// policy belongs to the caller.
#[derive(Debug)]
pub struct HttpTileProvider {
    client: reqwest::Client,
    config: TileProviderConfig,
}

impl HttpTileProvider {
    /// Build a provider from its configuration.
    ///
    /// # Errors
    /// Returns [`Error::ProviderConfig`] if the URL template is missing any
    /// of the `{z}`, `{x}`, `{y}` placeholders or the HTTP client cannot be
    /// constructed.
    pub fn new(config: TileProviderConfig) -> Result<Self> {
        for placeholder in ["{z}", "{x}", "{y}"] {
            if !config.url_template.contains(placeholder) {
                return Err(Error::ProviderConfig(format!(
                    "url template is missing the {placeholder} placeholder"
                )));
            }
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::ProviderConfig(format!("http client: {e}")))?;

        Ok(Self { client, config })
    }

    fn tile_url(&self, addr: TileAddress) -> String {
        self.config
            .url_template
            .replace("{z}", &addr.zoom.to_string())
            .replace("{x}", &addr.x.to_string())
            .replace("{y}", &addr.y.to_string())
            .replace("{token}", &self.config.access_token)
    }

    fn tile_error(addr: TileAddress, reason: impl Into<String>) -> Error {
        Error::TileFetch {
            zoom: addr.zoom,
            x: addr.x,
            y: addr.y,
            reason: reason.into(),
        }
    }
}

impl TileProvider for HttpTileProvider {
    fn tile_px(&self) -> u32 {
        self.config.tile_px
    }

    async fn fetch_tile(&self, addr: TileAddress) -> Result<RgbaImage> {
        let url = self.tile_url(addr);
        debug!(zoom = addr.zoom, x = addr.x, y = addr.y, "fetching tile");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Self::tile_error(addr, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::tile_error(addr, format!("HTTP {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Self::tile_error(addr, e.to_string()))?;

        let image = image::load_from_memory(&bytes)
            .map_err(|e| Self::tile_error(addr, format!("decode: {e}")))?
            .to_rgba8();

        let expected = self.config.tile_px;
        if image.width() != expected || image.height() != expected {
            return Err(Self::tile_error(
                addr,
                format!(
                    "unexpected tile size {}x{}, wanted {expected}x{expected}",
                    image.width(),
                    image.height()
                ),
            ));
        }

        Ok(image)
    }
}
