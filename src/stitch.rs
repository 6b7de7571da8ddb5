//! Fetching and compositing a covering grid of slippy tiles.
//!
//! Tiles are fetched with bounded concurrency and composited
//! left-to-right, top-to-bottom into one raster. Fetching is best-effort:
//! a failed tile leaves its region blank and bumps the failed-tile count
//! instead of aborting the stitch. Each tile writes only its own disjoint
//! pixel rectangle, so completion order does not matter.

use futures::stream::{self, StreamExt};
use image::RgbaImage;
use tracing::{info, warn};

use crate::provider::TileProvider;
use crate::tiles::TileRange;

/// A stitched raster covering a full tile range, plus enough metadata to
/// align geodetic coordinates against its pixel grid.
#[derive(Debug)]
pub struct StitchedRaster {
    pub image: RgbaImage,
    pub range: TileRange,
    pub tile_px: u32,
    /// Number of tiles that failed to fetch and were left blank.
    pub failed_tiles: usize,
}

impl StitchedRaster {
    /// Global-pixel position of this raster's top-left corner.
    #[must_use]
    pub fn origin_pixel(&self) -> (f64, f64) {
        (
            f64::from(self.range.x_min) * f64::from(self.tile_px),
            f64::from(self.range.y_min) * f64::from(self.tile_px),
        )
    }
}

/// Fetch every tile in `range` and composite them into one raster.
///
/// `concurrency` bounds the number of in-flight fetches (minimum 1).
pub async fn fetch_and_stitch<P: TileProvider + Sync>(
    provider: &P,
    range: TileRange,
    concurrency: usize,
) -> StitchedRaster {
    let tile_px = provider.tile_px();
    let mut image = RgbaImage::new(range.tiles_x() * tile_px, range.tiles_y() * tile_px);

    let addresses: Vec<_> = range.addresses().collect();
    let mut fetches = stream::iter(
        addresses
            .into_iter()
            .map(|addr| async move { (addr, provider.fetch_tile(addr).await) }),
    )
    .buffer_unordered(concurrency.max(1));

    let mut failed_tiles = 0;
    while let Some((addr, result)) = fetches.next().await {
        match result {
            Ok(tile) => {
                let px = i64::from((addr.x - range.x_min) * tile_px);
                let py = i64::from((addr.y - range.y_min) * tile_px);
                image::imageops::replace(&mut image, &tile, px, py);
            }
            Err(e) => {
                warn!(zoom = addr.zoom, x = addr.x, y = addr.y, error = %e, "tile skipped");
                failed_tiles += 1;
            }
        }
    }

    info!(
        tiles = range.len(),
        failed = failed_tiles,
        width = image.width(),
        height = image.height(),
        "stitched tile grid"
    );

    StitchedRaster {
        image,
        range,
        tile_px,
        failed_tiles,
    }
}
