//! Slippy-tile math for the standard Web Mercator pyramid.
//!
//! Tile indices follow the usual XYZ scheme: x grows eastward from -180°,
//! y grows southward from the top of the Mercator square, both in
//! `[0, 2^zoom)`. Pixel positions use the continuous "global pixel" plane
//! at a given zoom, where one tile spans `tile_px` pixels.

use crate::geodetic::GeodeticBBox;

/// Integer tile address in the slippy scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileAddress {
    pub zoom: u8,
    pub x: u32,
    pub y: u32,
}

/// Continuous position in the infinite tile-pixel plane at a given zoom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalPixel {
    pub x: f64,
    pub y: f64,
}

/// Tile X index covering a longitude at a zoom level.
#[must_use]
pub fn tile_x(lon: f64, zoom: u8) -> u32 {
    let n = 2_f64.powi(i32::from(zoom));
    (((lon + 180.0) / 360.0 * n).floor() as i64).clamp(0, n as i64 - 1) as u32
}

/// Tile Y index covering a latitude at a zoom level.
///
/// Northern latitudes map to smaller Y, per the Mercator tiling.
#[must_use]
pub fn tile_y(lat: f64, zoom: u8) -> u32 {
    let n = 2_f64.powi(i32::from(zoom));
    let rad = lat.to_radians();
    let y = (1.0 - (rad.tan() + 1.0 / rad.cos()).ln() / std::f64::consts::PI) / 2.0 * n;
    (y.floor() as i64).clamp(0, n as i64 - 1) as u32
}

/// Continuous global-pixel position of a lon/lat at a zoom, for tiles of
/// `tile_px` edge length.
#[must_use]
pub fn global_pixel(lon: f64, lat: f64, zoom: u8, tile_px: u32) -> GlobalPixel {
    let n = 2_f64.powi(i32::from(zoom));
    let scale = n * f64::from(tile_px);
    let x = (lon + 180.0) / 360.0 * scale;
    let sin = lat.to_radians().sin();
    let y = (0.5 - ((1.0 + sin) / (1.0 - sin)).ln() / (4.0 * std::f64::consts::PI)) * scale;
    GlobalPixel { x, y }
}

/// Rectangular range of tile indices covering a [`GeodeticBBox`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    pub zoom: u8,
    pub x_min: u32,
    pub x_max: u32,
    pub y_min: u32,
    pub y_max: u32,
}

impl TileRange {
    /// Compute the covering tile range for a bbox at a zoom level.
    #[must_use]
    pub fn covering(bbox: &GeodeticBBox, zoom: u8) -> Self {
        Self {
            zoom,
            x_min: tile_x(bbox.west, zoom),
            x_max: tile_x(bbox.east, zoom),
            y_min: tile_y(bbox.north, zoom), // north has the smaller tile-Y
            y_max: tile_y(bbox.south, zoom),
        }
    }

    /// Number of tile columns in the range.
    #[must_use]
    pub fn tiles_x(&self) -> u32 {
        self.x_max - self.x_min + 1
    }

    /// Number of tile rows in the range.
    #[must_use]
    pub fn tiles_y(&self) -> u32 {
        self.y_max - self.y_min + 1
    }

    /// Total tile count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles_x() as usize * self.tiles_y() as usize
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        false // covering() always yields at least one tile
    }

    /// Iterate addresses left-to-right, top-to-bottom.
    pub fn addresses(&self) -> impl Iterator<Item = TileAddress> + '_ {
        let zoom = self.zoom;
        let (x_min, x_max) = (self.x_min, self.x_max);
        (self.y_min..=self.y_max)
            .flat_map(move |y| (x_min..=x_max).map(move |x| TileAddress { zoom, x, y }))
    }
}

/// Optimal zoom level for covering `boundary_m` meters with `output_px`
/// pixels near `center_lat`.
///
/// Picks the zoom whose ground resolution (corrected for Mercator latitude
/// distortion) best matches the finer of the two requested axes, then
/// rounds to the nearest integer level and clamps to `[1, 20]`.
#[must_use]
pub fn optimal_zoom(boundary_m: (f64, f64), output_px: (u32, u32), center_lat: f64) -> u8 {
    let desired_mpp = (boundary_m.0 / f64::from(output_px.0))
        .min(boundary_m.1 / f64::from(output_px.1));

    // Earth circumference over the 256 px base tile
    let base_mpp = 40_075_017.0 / 256.0;
    let cos_lat = center_lat.to_radians().cos();

    let zoom = (base_mpp / desired_mpp / cos_lat).log2();
    (zoom.round() as i32).clamp(1, 20) as u8
}

/// Output pixel dimensions matching a boundary's meter aspect ratio, with
/// the long side capped at `max_size`.
#[must_use]
pub fn output_dimensions(width_m: f64, height_m: f64, max_size: u32) -> (u32, u32) {
    let aspect = width_m / height_m;
    let max = f64::from(max_size);
    let (w, h) = if aspect > 1.0 {
        (max, (max / aspect).round())
    } else {
        ((max * aspect).round(), max)
    };
    (
        (w as u32).clamp(1, max_size),
        (h as u32).clamp(1, max_size),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_zero_covers_origin() {
        assert_eq!(tile_x(0.0, 0), 0);
        assert_eq!(tile_y(0.0, 0), 0);
    }

    #[test]
    fn test_tile_x_quadrants() {
        // At zoom 1 the antimeridian-to-antimeridian span is two tiles
        assert_eq!(tile_x(-179.9, 1), 0);
        assert_eq!(tile_x(179.9, 1), 1);
        assert_eq!(tile_y(85.0, 1), 0);
        assert_eq!(tile_y(-85.0, 1), 1);
    }

    #[test]
    fn test_tile_x_monotonic_in_longitude() {
        let zoom = 10;
        let mut prev = tile_x(-180.0, zoom);
        for step in 1..=360 {
            let lon = -180.0 + f64::from(step);
            let cur = tile_x(lon.min(179.999), zoom);
            assert!(cur >= prev, "tile_x not monotonic at lon {lon}");
            prev = cur;
        }
    }

    #[test]
    fn test_tile_y_decreasing_in_latitude() {
        let zoom = 10;
        let mut prev = tile_y(-85.0, zoom);
        for step in 1..=170 {
            let lat = -85.0 + f64::from(step);
            let cur = tile_y(lat, zoom);
            assert!(cur <= prev, "tile_y not decreasing at lat {lat}");
            prev = cur;
        }
    }

    #[test]
    fn test_global_pixel_matches_tile_index() {
        // The global pixel of a point divided by tile_px lands in the tile
        // returned by tile_x/tile_y
        let (lon, lat, zoom, tile_px) = (15.001, 42.0, 16, 512);
        let gp = global_pixel(lon, lat, zoom, tile_px);
        assert_eq!((gp.x / f64::from(tile_px)).floor() as u32, tile_x(lon, zoom));
        assert_eq!((gp.y / f64::from(tile_px)).floor() as u32, tile_y(lat, zoom));
    }

    #[test]
    fn test_covering_range_is_ordered() {
        let bbox = GeodeticBBox {
            west: 14.998,
            south: 41.998,
            east: 15.002,
            north: 42.002,
        };
        let range = TileRange::covering(&bbox, 16);
        assert!(range.x_max >= range.x_min);
        assert!(range.y_max >= range.y_min);
        assert!(range.len() >= 1);

        let addrs: Vec<_> = range.addresses().collect();
        assert_eq!(addrs.len(), range.len());
        assert_eq!(addrs[0], TileAddress { zoom: 16, x: range.x_min, y: range.y_min });
    }

    #[test]
    fn test_optimal_zoom_for_small_site() {
        // ~200 m boundary rendered at ~1000 px near 42°N wants a deep zoom
        let zoom = optimal_zoom((200.0, 200.0), (1000, 1000), 42.0);
        assert!(zoom >= 16, "zoom: {zoom}");
        assert!(zoom <= 20);
    }

    #[test]
    fn test_output_dimensions_aspect() {
        let (w, h) = output_dimensions(200.0, 100.0, 1280);
        assert_eq!(w, 1280);
        assert_eq!(h, 640);

        let (w, h) = output_dimensions(100.0, 400.0, 1280);
        assert_eq!(h, 1280);
        assert_eq!(w, 320);

        let (w, h) = output_dimensions(50.0, 50.0, 1280);
        assert_eq!((w, h), (1280, 1280));
    }
}
