//! The linear rectification pipeline.
//!
//! Reproject → fetch/stitch → crop → rectify, one logical sequential flow
//! per request. Per-tile fetch failures are absorbed by the stitcher and
//! reported in the result; any other stage error aborts the run. A run can
//! be abandoned at any tile-fetch await point and holds no state shared
//! with other runs.

use image::RgbaImage;
use tracing::info;

use crate::crop::crop_to_bbox;
use crate::error::Result;
use crate::geodetic::{reproject_boundary, LocalBoundary, ReferencePoint, ReprojectedBoundary};
use crate::provider::TileProvider;
use crate::stitch::{fetch_and_stitch, StitchedRaster};
use crate::tiles::{global_pixel, optimal_zoom, output_dimensions, TileRange};
use crate::warp::{warp_to_rect, CornerQuad};

/// One rectification request, as supplied by the host project service.
#[derive(Debug, Clone)]
pub struct TerrainRequest {
    pub reference_point: ReferencePoint,
    /// PROJ descriptor (or `EPSG:nnnn`) for the reference point's CRS.
    pub projection: String,
    pub boundary: LocalBoundary,
}

/// Pipeline configuration. Everything is explicit; nothing is read from
/// process-wide state.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Fixed zoom level; when `None` the zoom is derived from the boundary
    /// size, the output resolution, and the site latitude.
    pub zoom: Option<u8>,
    /// Fixed output dimensions; when `None` they follow the boundary's
    /// meter aspect ratio, capped at `max_output_size`.
    pub output_size: Option<(u32, u32)>,
    /// Long-side cap for derived output dimensions.
    pub max_output_size: u32,
    /// Bound on concurrent in-flight tile fetches.
    pub fetch_concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            zoom: None,
            output_size: None,
            max_output_size: 1280,
            fetch_concurrency: 4,
        }
    }
}

/// Final pipeline output: the rectified raster plus the real-world size it
/// represents, as required by the downstream detection service.
#[derive(Debug)]
pub struct RectifiedTile {
    pub image: RgbaImage,
    /// Boundary width in meters.
    pub width_m: f64,
    /// Boundary height in meters.
    pub height_m: f64,
    /// Zoom level the tiles were fetched at.
    pub zoom: u8,
    /// Tiles that failed to fetch and were left blank before rectification.
    pub failed_tiles: usize,
}

/// The five-stage rectification pipeline over a tile provider.
pub struct Pipeline<P> {
    provider: P,
    config: PipelineConfig,
}

impl<P: TileProvider + Sync> Pipeline<P> {
    #[must_use]
    pub fn new(provider: P, config: PipelineConfig) -> Self {
        Self { provider, config }
    }

    /// Run the full pipeline for one request.
    ///
    /// # Errors
    /// Propagates the first stage error: [`ProjectionFailure`](crate::Error::ProjectionFailure),
    /// [`InvalidCropGeometry`](crate::Error::InvalidCropGeometry), or
    /// [`DegenerateCorrespondence`](crate::Error::DegenerateCorrespondence).
    /// Per-tile fetch failures never abort the run.
    pub async fn run(&self, request: &TerrainRequest) -> Result<RectifiedTile> {
        let boundary = request.boundary;
        let (width_m, height_m) = (boundary.width_m(), boundary.height_m());

        let reprojected =
            reproject_boundary(request.reference_point, &request.projection, boundary)?;

        let output = self
            .config
            .output_size
            .unwrap_or_else(|| output_dimensions(width_m, height_m, self.config.max_output_size));
        let zoom = self.config.zoom.unwrap_or_else(|| {
            optimal_zoom(
                (width_m, height_m),
                output,
                reprojected.bbox.center_lat(),
            )
        });

        let range = TileRange::covering(&reprojected.bbox, zoom);
        info!(
            zoom,
            tiles_x = range.tiles_x(),
            tiles_y = range.tiles_y(),
            out_w = output.0,
            out_h = output.1,
            "starting rectification run"
        );

        let stitched =
            fetch_and_stitch(&self.provider, range, self.config.fetch_concurrency).await;

        let cropped = crop_to_bbox(&stitched, &reprojected.bbox, output)?;

        let corners = corner_pixels(&reprojected, &stitched, cropped.window.width, cropped.window.height, output);
        let image = warp_to_rect(&cropped.image, &corners, output)?;

        info!(
            width = image.width(),
            height = image.height(),
            failed_tiles = stitched.failed_tiles,
            "rectification run complete"
        );

        Ok(RectifiedTile {
            image,
            width_m,
            height_m,
            zoom,
            failed_tiles: stitched.failed_tiles,
        })
    }
}

/// Map the four geodetic corners into the cropped raster's pixel space,
/// reordered NW, NE, SE, SW for the rectifier.
///
/// Each corner's global pixel is taken relative to the bbox's NW global
/// pixel (the crop origin), then scaled from the crop window to the crop
/// output resolution.
fn corner_pixels(
    reprojected: &ReprojectedBoundary,
    stitched: &StitchedRaster,
    window_w: i64,
    window_h: i64,
    output: (u32, u32),
) -> CornerQuad {
    let zoom = stitched.range.zoom;
    let tile_px = stitched.tile_px;
    let bbox = &reprojected.bbox;
    let origin = global_pixel(bbox.west, bbox.north, zoom, tile_px);

    let scale_x = f64::from(output.0) / window_w as f64;
    let scale_y = f64::from(output.1) / window_h as f64;

    let to_px = |i: usize| {
        let c = reprojected.corners[i];
        let gp = global_pixel(c.lon, c.lat, zoom, tile_px);
        ((gp.x - origin.x) * scale_x, (gp.y - origin.y) * scale_y)
    };

    // Reprojected corners arrive SW, NW, NE, SE
    [to_px(1), to_px(2), to_px(3), to_px(0)]
}
