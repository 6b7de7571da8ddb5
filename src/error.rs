//! Error types for the rectification pipeline.

use thiserror::Error;

/// Errors produced by the rectification pipeline.
///
/// Apart from [`Error::TileFetch`], every variant aborts the pipeline run
/// that raised it. Per-tile fetch failures are absorbed by the stitcher and
/// reported in aggregate as a failed-tile count; `TileFetch` only appears
/// in the per-tile `Result` a [`TileProvider`](crate::TileProvider) returns.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid boundary: east ({east}) must exceed west ({west}) and north ({north}) must exceed south ({south})")]
    InvalidBoundary {
        west: f64,
        south: f64,
        east: f64,
        north: f64,
    },

    #[error("projection failed for descriptor {descriptor:?}: {reason}")]
    ProjectionFailure { descriptor: String, reason: String },

    #[error("degenerate correspondence set: {reason}")]
    DegenerateCorrespondence { reason: String },

    #[error("singular linear system: pivot magnitude {pivot:e} below tolerance at row {row}")]
    SingularSystem { row: usize, pivot: f64 },

    #[error("invalid crop geometry: {width}x{height} px window for bbox {bbox:?}")]
    InvalidCropGeometry {
        width: i64,
        height: i64,
        bbox: crate::geodetic::GeodeticBBox,
    },

    #[error("tile {zoom}/{x}/{y} fetch failed: {reason}")]
    TileFetch {
        zoom: u8,
        x: u32,
        y: u32,
        reason: String,
    },

    #[error("tile provider configuration error: {0}")]
    ProviderConfig(String),
}

/// Result alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;
