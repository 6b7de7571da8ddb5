//! Precise sub-pixel cropping of the stitched raster to a geodetic bbox.
//!
//! The stitched raster covers whole tiles, so the bbox footprint starts at
//! a fractional pixel offset inside it. The crop window is computed in
//! continuous global-pixel space, rounded to whole pixels, and the window
//! is then resampled to the exact requested output resolution with a
//! quality filter (not nearest-neighbor).

use image::imageops::{self, FilterType};
use image::RgbaImage;
use tracing::debug;

use crate::error::{Error, Result};
use crate::geodetic::GeodeticBBox;
use crate::stitch::StitchedRaster;
use crate::tiles::global_pixel;

/// Pixel window within the stitched raster corresponding to a bbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropWindow {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

/// Raster cropped to a bbox footprint and resampled to a fixed size.
#[derive(Debug)]
pub struct CroppedRaster {
    pub image: RgbaImage,
    /// The window that was cut from the stitched raster, before resampling.
    pub window: CropWindow,
}

/// Compute the (rounded) crop window for `bbox` within a stitched raster.
///
/// # Errors
/// Returns [`Error::InvalidCropGeometry`] if the window has non-positive
/// width or height.
pub fn crop_window(stitched: &StitchedRaster, bbox: &GeodeticBBox) -> Result<CropWindow> {
    let zoom = stitched.range.zoom;
    let nw = global_pixel(bbox.west, bbox.north, zoom, stitched.tile_px);
    let se = global_pixel(bbox.east, bbox.south, zoom, stitched.tile_px);
    let (origin_x, origin_y) = stitched.origin_pixel();

    let window = CropWindow {
        x: (nw.x - origin_x).round() as i64,
        y: (nw.y - origin_y).round() as i64,
        width: (se.x - nw.x).round() as i64,
        height: (se.y - nw.y).round() as i64,
    };

    if window.width <= 0 || window.height <= 0 {
        return Err(Error::InvalidCropGeometry {
            width: window.width,
            height: window.height,
            bbox: *bbox,
        });
    }

    Ok(window)
}

/// Crop a stitched raster to the bbox footprint and resample the window to
/// `output` dimensions (Lanczos3).
///
/// The window lies within the raster whenever every tile fetched
/// successfully; it is clamped to the raster bounds regardless.
///
/// # Errors
/// Returns [`Error::InvalidCropGeometry`] for a non-positive window.
pub fn crop_to_bbox(
    stitched: &StitchedRaster,
    bbox: &GeodeticBBox,
    output: (u32, u32),
) -> Result<CroppedRaster> {
    let window = crop_window(stitched, bbox)?;

    let (img_w, img_h) = (
        i64::from(stitched.image.width()),
        i64::from(stitched.image.height()),
    );
    let x = window.x.clamp(0, img_w - 1);
    let y = window.y.clamp(0, img_h - 1);
    let w = window.width.min(img_w - x).max(1);
    let h = window.height.min(img_h - y).max(1);

    debug!(
        x,
        y,
        w,
        h,
        out_w = output.0,
        out_h = output.1,
        "cropping stitched raster"
    );

    let view = imageops::crop_imm(&stitched.image, x as u32, y as u32, w as u32, h as u32);
    let image = imageops::resize(&view.to_image(), output.0, output.1, FilterType::Lanczos3);

    Ok(CroppedRaster { image, window })
}
