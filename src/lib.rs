#![doc = include_str!("../README.md")]
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`geodetic`]: Reference point, local boundary, and reprojection to lat/lon
//! - [`tiles`]: Slippy-tile math, global pixel plane, zoom selection
//! - [`provider`]: [`TileProvider`] trait and the HTTP implementation
//! - [`stitch`]: Concurrent tile fetching and grid compositing
//! - [`crop`]: Sub-pixel crop of the stitched raster to the bbox footprint
//! - [`homography`]: DLT homography estimation over [`linsys`]
//! - [`warp`]: Inverse-homography perspective rectification
//! - [`pipeline`]: The linear reproject → stitch → crop → rectify flow

// ============================================================================
// Public modules
// ============================================================================

pub mod crop;
pub mod error;
pub mod geodetic;
pub mod homography;
pub mod linsys;
pub mod pipeline;
pub mod provider;
pub mod stitch;
pub mod tiles;
pub mod warp;

#[cfg(test)]
pub(crate) mod test_util;

// ============================================================================
// Errors
// ============================================================================

pub use error::{Error, Result};

// ============================================================================
// Geodetic reprojection
// ============================================================================

pub use geodetic::{
    projected_to_geodetic,
    reproject_boundary,
    GeodeticBBox,
    GeodeticCorner,
    LocalBoundary,
    ReferencePoint,
    ReprojectedBoundary,
};

// ============================================================================
// Tile math
// ============================================================================

pub use tiles::{
    global_pixel,
    optimal_zoom,
    output_dimensions,
    tile_x,
    tile_y,
    GlobalPixel,
    TileAddress,
    TileRange,
};

// ============================================================================
// Tile fetching & stitching
// ============================================================================

pub use provider::{HttpTileProvider, TileProvider, TileProviderConfig};
pub use stitch::{fetch_and_stitch, StitchedRaster};

// ============================================================================
// Cropping
// ============================================================================

pub use crop::{crop_to_bbox, crop_window, CropWindow, CroppedRaster};

// ============================================================================
// Homography & rectification
// ============================================================================

pub use homography::Homography;
pub use linsys::solve_in_place;
pub use warp::{warp_to_rect, CornerQuad};

// ============================================================================
// Pipeline
// ============================================================================
// Primary API: Pipeline::new(provider, config).run(&request).await

pub use pipeline::{Pipeline, PipelineConfig, RectifiedTile, TerrainRequest};
