//! Shared test fixtures.

use std::collections::HashSet;

use image::{Rgba, RgbaImage};

use crate::error::{Error, Result};
use crate::provider::TileProvider;
use crate::tiles::TileAddress;

/// In-memory tile provider producing solid-color tiles, with an optional
/// set of addresses that fail on fetch.
pub(crate) struct MockTileProvider {
    tile_px: u32,
    failing: HashSet<(u32, u32)>,
}

impl MockTileProvider {
    pub(crate) fn new(tile_px: u32) -> Self {
        Self {
            tile_px,
            failing: HashSet::new(),
        }
    }

    pub(crate) fn failing(mut self, addresses: &[(u32, u32)]) -> Self {
        self.failing.extend(addresses.iter().copied());
        self
    }

    /// Deterministic fill color for the tile at (x, y).
    pub(crate) fn fill_color(x: u32, y: u32) -> Rgba<u8> {
        Rgba([
            (x.wrapping_mul(31) % 255 + 1) as u8,
            (y.wrapping_mul(57) % 255 + 1) as u8,
            ((x + y).wrapping_mul(13) % 255 + 1) as u8,
            255,
        ])
    }
}

impl TileProvider for MockTileProvider {
    fn tile_px(&self) -> u32 {
        self.tile_px
    }

    async fn fetch_tile(&self, addr: TileAddress) -> Result<RgbaImage> {
        if self.failing.contains(&(addr.x, addr.y)) {
            return Err(Error::TileFetch {
                zoom: addr.zoom,
                x: addr.x,
                y: addr.y,
                reason: "simulated failure".to_string(),
            });
        }
        Ok(RgbaImage::from_pixel(
            self.tile_px,
            self.tile_px,
            Self::fill_color(addr.x, addr.y),
        ))
    }
}
