//! Perspective rectification of a cropped raster.
//!
//! The four boundary corners, expressed in the cropped raster's own pixel
//! space, generally form a sheared quadrilateral: the local frame's north
//! is not geodetic north. Rectification estimates the inverse homography
//! (target rectangle → source quadrilateral) and pulls every target pixel
//! from the source by nearest-neighbor sampling. Output rows are
//! independent, so the per-pixel loop runs as a rayon parallel map over
//! rows with the source treated as read-only.

use image::RgbaImage;
use rayon::prelude::*;
use tracing::debug;

use crate::error::Result;
use crate::homography::Homography;

/// Boundary corner positions in source-raster pixel space, ordered
/// NW, NE, SE, SW (clockwise from top-left).
pub type CornerQuad = [(f64, f64); 4];

/// Warp `src` so that the quadrilateral `corners` fills a `output`-sized
/// rectangle.
///
/// Samples landing outside the source are filled with opaque black, never
/// transparency; the consuming system depends on this exact fill policy.
/// The output is always fully opaque.
///
/// # Errors
/// Returns [`Error::DegenerateCorrespondence`](crate::Error::DegenerateCorrespondence)
/// if the corners are collinear/coincident or the estimated transform maps
/// a target pixel to infinity.
pub fn warp_to_rect(src: &RgbaImage, corners: &CornerQuad, output: (u32, u32)) -> Result<RgbaImage> {
    let (out_w, out_h) = output;
    let (w, h) = (f64::from(out_w), f64::from(out_h));

    // Inverse mapping: target-rectangle corners onto the source quad,
    // so each output pixel looks up where it came from
    let rect_corners = [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)];
    let homography = Homography::estimate(&rect_corners, corners)?;

    debug!(
        src_w = src.width(),
        src_h = src.height(),
        out_w,
        out_h,
        "applying perspective transform"
    );

    let src_w = f64::from(src.width());
    let src_h = f64::from(src.height());
    let max_x = src.width() - 1;
    let max_y = src.height() - 1;

    let mut out = RgbaImage::new(out_w, out_h);
    let row_bytes = out_w as usize * 4;

    out.par_chunks_mut(row_bytes)
        .enumerate()
        .try_for_each(|(row, pixels)| -> Result<()> {
            let y = row as f64;
            for col in 0..out_w as usize {
                let (src_x, src_y) = homography.try_apply(col as f64, y)?;

                // Upper bound is width-1/height-1; downstream consumers
                // rely on this exact out-of-bounds policy
                let rgba = if src_x >= 0.0 && src_x < src_w - 1.0 && src_y >= 0.0 && src_y < src_h - 1.0
                {
                    let nx = (src_x.round() as i64).clamp(0, i64::from(max_x)) as u32;
                    let ny = (src_y.round() as i64).clamp(0, i64::from(max_y)) as u32;
                    let p = src.get_pixel(nx, ny);
                    [p[0], p[1], p[2], 255]
                } else {
                    [0, 0, 0, 255]
                };

                pixels[col * 4..col * 4 + 4].copy_from_slice(&rgba);
            }
            Ok(())
        })?;

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use image::Rgba;

    fn gradient_image(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
        })
    }

    #[test]
    fn test_identity_quad_is_lossless_in_interior() {
        let (w, h) = (64u32, 48u32);
        let src = gradient_image(w, h);
        let corners = [
            (0.0, 0.0),
            (f64::from(w), 0.0),
            (f64::from(w), f64::from(h)),
            (0.0, f64::from(h)),
        ];
        let out = warp_to_rect(&src, &corners, (w, h)).unwrap();

        // Nearest-neighbor at integer offsets copies pixels exactly; the
        // final row and column are excluded by the source bound check
        for y in 0..h - 1 {
            for x in 0..w - 1 {
                assert_eq!(out.get_pixel(x, y), src.get_pixel(x, y), "pixel ({x}, {y})");
            }
        }
        assert_eq!(*out.get_pixel(w - 1, h - 1), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_output_is_fully_opaque() {
        let src = gradient_image(32, 32);
        // Quad partly outside the source forces black fill on one side
        let corners = [(-20.0, -20.0), (24.0, -4.0), (28.0, 28.0), (-16.0, 24.0)];
        let out = warp_to_rect(&src, &corners, (40, 40)).unwrap();
        assert!(out.pixels().all(|p| p[3] == 255));
        // At least one out-of-bounds sample became opaque black
        assert!(out.pixels().any(|p| *p == Rgba([0, 0, 0, 255])));
    }

    #[test]
    fn test_quad_content_maps_to_rectangle() {
        // Solid-color quadrant structure: left half red, right half blue
        let src = RgbaImage::from_fn(100, 100, |x, _| {
            if x < 50 {
                Rgba([200, 0, 0, 255])
            } else {
                Rgba([0, 0, 200, 255])
            }
        });
        // Axis-aligned sub-rectangle of the source as the quad
        let corners = [(10.0, 10.0), (90.0, 10.0), (90.0, 90.0), (10.0, 90.0)];
        let out = warp_to_rect(&src, &corners, (80, 80)).unwrap();

        assert_eq!(*out.get_pixel(10, 40), Rgba([200, 0, 0, 255]));
        assert_eq!(*out.get_pixel(70, 40), Rgba([0, 0, 200, 255]));
    }

    #[test]
    fn test_degenerate_corners_rejected() {
        let src = gradient_image(16, 16);
        // All four corners on one line
        let corners = [(0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (3.0, 3.0)];
        let err = warp_to_rect(&src, &corners, (16, 16)).unwrap_err();
        assert!(matches!(err, Error::DegenerateCorrespondence { .. }));
    }
}
