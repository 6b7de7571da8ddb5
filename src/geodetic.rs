//! Reprojection of a locally-referenced terrain boundary to geodetic space.
//!
//! The host supplies a reference point in some projected CRS (typically a
//! UTM zone), a PROJ descriptor for that CRS, and a rectangular boundary as
//! meter offsets from the reference point. Each corner is projected to
//! WGS84 lat/lon independently: the local frame's "north" need not align
//! with geodetic north, so the four corners generally form a sheared
//! quadrilateral rather than an axis-aligned box. The axis-aligned envelope
//! of those corners drives tile fetching; the shear is removed later by the
//! perspective rectifier.

use proj4rs::proj::Proj;
use proj4rs::transform::transform;
use tracing::debug;

use crate::error::{Error, Result};

/// WGS84 geodetic target for all corner conversions.
const WGS84_PROJ: &str = "+proj=longlat +datum=WGS84 +no_defs";

/// Projected (easting, northing) coordinate pair, supplied once per run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferencePoint {
    pub easting: f64,
    pub northing: f64,
}

impl ReferencePoint {
    #[must_use]
    pub fn new(easting: f64, northing: f64) -> Self {
        Self { easting, northing }
    }
}

/// Rectangular terrain boundary as signed meter offsets from a [`ReferencePoint`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalBoundary {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl LocalBoundary {
    /// Create a boundary, enforcing positive extent on both axes.
    ///
    /// # Errors
    /// Returns [`Error::InvalidBoundary`] unless `east > west` and
    /// `north > south`.
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Result<Self> {
        if east <= west || north <= south {
            return Err(Error::InvalidBoundary {
                west,
                south,
                east,
                north,
            });
        }
        Ok(Self {
            west,
            south,
            east,
            north,
        })
    }

    /// Boundary width in meters.
    #[must_use]
    pub fn width_m(&self) -> f64 {
        self.east - self.west
    }

    /// Boundary height in meters.
    #[must_use]
    pub fn height_m(&self) -> f64 {
        self.north - self.south
    }
}

/// Geodetic (latitude, longitude) pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeodeticCorner {
    pub lat: f64,
    pub lon: f64,
}

/// Axis-aligned geodetic bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeodeticBBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl GeodeticBBox {
    /// Latitude of the box center, used for zoom selection.
    #[must_use]
    pub fn center_lat(&self) -> f64 {
        (self.south + self.north) / 2.0
    }
}

/// Result of reprojecting a [`LocalBoundary`]: the four geodetic corners
/// (ordered SW, NW, NE, SE) and their axis-aligned envelope.
#[derive(Debug, Clone, Copy)]
pub struct ReprojectedBoundary {
    pub corners: [GeodeticCorner; 4],
    pub bbox: GeodeticBBox,
}

/// Resolve a projection descriptor into a [`Proj`].
///
/// Descriptors of the form `EPSG:nnnn` are looked up in the
/// `crs-definitions` database; anything else is treated as a raw PROJ
/// string and handed to `proj4rs` uninterpreted.
fn resolve_descriptor(descriptor: &str) -> Result<Proj> {
    let proj_str = match descriptor.trim().strip_prefix("EPSG:") {
        Some(code) => {
            let code: u16 = code.parse().map_err(|_| Error::ProjectionFailure {
                descriptor: descriptor.to_string(),
                reason: "malformed EPSG code".to_string(),
            })?;
            crs_definitions::from_code(code)
                .map(|def| def.proj4)
                .ok_or_else(|| Error::ProjectionFailure {
                    descriptor: descriptor.to_string(),
                    reason: format!("EPSG:{code} is not in the crs-definitions database"),
                })?
        }
        None => descriptor,
    };

    Proj::from_proj_string(proj_str).map_err(|e| Error::ProjectionFailure {
        descriptor: descriptor.to_string(),
        reason: format!("{e:?}"),
    })
}

/// Convert a projected (easting, northing) to WGS84 lat/lon through a
/// projection descriptor.
///
/// # Errors
/// Returns [`Error::ProjectionFailure`] if the descriptor is rejected or
/// the transform produces non-finite output.
pub fn projected_to_geodetic(
    easting: f64,
    northing: f64,
    descriptor: &str,
) -> Result<GeodeticCorner> {
    let source = resolve_descriptor(descriptor)?;
    let target = Proj::from_proj_string(WGS84_PROJ).map_err(|e| Error::ProjectionFailure {
        descriptor: WGS84_PROJ.to_string(),
        reason: format!("{e:?}"),
    })?;

    let mut point = (easting, northing, 0.0);
    transform(&source, &target, &mut point).map_err(|e| Error::ProjectionFailure {
        descriptor: descriptor.to_string(),
        reason: format!("transform of ({easting}, {northing}) failed: {e:?}"),
    })?;

    // proj4rs reports geographic coordinates in radians
    let lon = point.0.to_degrees();
    let lat = point.1.to_degrees();

    if !lon.is_finite() || !lat.is_finite() {
        return Err(Error::ProjectionFailure {
            descriptor: descriptor.to_string(),
            reason: format!("non-finite result ({lon}, {lat}) for ({easting}, {northing})"),
        });
    }

    Ok(GeodeticCorner { lat, lon })
}

/// Reproject a [`LocalBoundary`] to its four geodetic corners and envelope.
///
/// Corners are ordered SW, NW, NE, SE. Each corner is projected
/// independently; no axis-aligned shortcut is taken.
///
/// # Errors
/// Returns [`Error::ProjectionFailure`] if any corner conversion fails.
pub fn reproject_boundary(
    reference: ReferencePoint,
    descriptor: &str,
    boundary: LocalBoundary,
) -> Result<ReprojectedBoundary> {
    let offsets = [
        (boundary.west, boundary.south), // SW
        (boundary.west, boundary.north), // NW
        (boundary.east, boundary.north), // NE
        (boundary.east, boundary.south), // SE
    ];

    let mut corners = [GeodeticCorner { lat: 0.0, lon: 0.0 }; 4];
    for (slot, (de, dn)) in corners.iter_mut().zip(offsets) {
        *slot = projected_to_geodetic(
            reference.easting + de,
            reference.northing + dn,
            descriptor,
        )?;
    }

    let mut bbox = GeodeticBBox {
        west: f64::MAX,
        south: f64::MAX,
        east: f64::MIN,
        north: f64::MIN,
    };
    for c in &corners {
        bbox.west = bbox.west.min(c.lon);
        bbox.east = bbox.east.max(c.lon);
        bbox.south = bbox.south.min(c.lat);
        bbox.north = bbox.north.max(c.lat);
    }

    debug!(?corners, ?bbox, "reprojected boundary");

    Ok(ReprojectedBoundary { corners, bbox })
}

#[cfg(test)]
mod tests {
    use super::*;

    const UTM33N: &str = "+proj=utm +zone=33 +datum=WGS84 +units=m +no_defs";

    fn reference_boundary() -> (ReferencePoint, LocalBoundary) {
        (
            ReferencePoint::new(500_000.0, 4_649_776.0),
            LocalBoundary::new(-100.0, -100.0, 100.0, 100.0).unwrap(),
        )
    }

    #[test]
    fn test_boundary_rejects_non_positive_extent() {
        assert!(LocalBoundary::new(100.0, -100.0, -100.0, 100.0).is_err());
        assert!(LocalBoundary::new(-100.0, 100.0, 100.0, 100.0).is_err());
        assert!(LocalBoundary::new(0.0, 0.0, 0.0, 10.0).is_err());
    }

    #[test]
    fn test_projected_to_geodetic_utm_zone_center() {
        // Easting 500000 sits on the central meridian of any UTM zone
        let c = projected_to_geodetic(500_000.0, 4_649_776.0, UTM33N).unwrap();
        assert!((c.lon - 15.0).abs() < 1e-6, "lon: {}", c.lon);
        assert!(c.lat > 41.9 && c.lat < 42.1, "lat: {}", c.lat);
    }

    #[test]
    fn test_epsg_descriptor_resolves() {
        let via_epsg = projected_to_geodetic(500_000.0, 4_649_776.0, "EPSG:32633").unwrap();
        let via_proj = projected_to_geodetic(500_000.0, 4_649_776.0, UTM33N).unwrap();
        assert!((via_epsg.lat - via_proj.lat).abs() < 1e-9);
        assert!((via_epsg.lon - via_proj.lon).abs() < 1e-9);
    }

    #[test]
    fn test_bad_descriptor_is_projection_failure() {
        let err = projected_to_geodetic(0.0, 0.0, "EPSG:999999").unwrap_err();
        assert!(matches!(err, Error::ProjectionFailure { .. }));

        let err = projected_to_geodetic(0.0, 0.0, "+proj=nosuchproj").unwrap_err();
        assert!(matches!(err, Error::ProjectionFailure { .. }));
    }

    #[test]
    fn test_corners_span_expected_extent() {
        let (reference, boundary) = reference_boundary();
        let result = reproject_boundary(reference, UTM33N, boundary).unwrap();
        let [sw, nw, ne, se] = result.corners;

        // 200 m is roughly 0.0018 deg of latitude
        assert!((nw.lat - sw.lat) > 0.0015 && (nw.lat - sw.lat) < 0.0022);
        assert!((ne.lon - nw.lon) > 0.0015 && (ne.lon - nw.lon) < 0.0035);
        assert!(se.lat < ne.lat);

        // All four corners are distinct
        let corners = result.corners;
        for i in 0..4 {
            for j in (i + 1)..4 {
                assert!(
                    corners[i] != corners[j],
                    "corners {i} and {j} coincide: {:?}",
                    corners[i]
                );
            }
        }
    }

    #[test]
    fn test_bbox_contains_all_corners() {
        let (reference, boundary) = reference_boundary();
        let result = reproject_boundary(reference, UTM33N, boundary).unwrap();
        for c in &result.corners {
            assert!(c.lon >= result.bbox.west && c.lon <= result.bbox.east);
            assert!(c.lat >= result.bbox.south && c.lat <= result.bbox.north);
        }
        assert!(result.bbox.east > result.bbox.west);
        assert!(result.bbox.north > result.bbox.south);
    }

    #[test]
    fn test_corners_form_simple_quadrilateral() {
        // SW -> NW -> NE -> SE traced in order must not self-intersect.
        // Check that opposite edges (SW-NW vs NE-SE, NW-NE vs SE-SW) do not cross.
        let (reference, boundary) = reference_boundary();
        let result = reproject_boundary(reference, UTM33N, boundary).unwrap();
        let pts: Vec<(f64, f64)> = result.corners.iter().map(|c| (c.lon, c.lat)).collect();

        fn segments_cross(a: (f64, f64), b: (f64, f64), c: (f64, f64), d: (f64, f64)) -> bool {
            fn orient(p: (f64, f64), q: (f64, f64), r: (f64, f64)) -> f64 {
                (q.0 - p.0) * (r.1 - p.1) - (q.1 - p.1) * (r.0 - p.0)
            }
            orient(a, b, c) * orient(a, b, d) < 0.0 && orient(c, d, a) * orient(c, d, b) < 0.0
        }

        assert!(!segments_cross(pts[0], pts[1], pts[2], pts[3]));
        assert!(!segments_cross(pts[1], pts[2], pts[3], pts[0]));
    }
}
