//! Planar homography estimation via the Direct Linear Transform.
//!
//! Correspondences are linearized into the standard DLT rows, the last
//! coefficient is fixed to 1, and the resulting 8×9 (or 2N×9) system is
//! solved in the least-squares sense through its normal equations. With
//! exactly four exact correspondences this is numerically equivalent to
//! the exact DLT solution; more than four are accepted as a true
//! least-squares fit.

use crate::error::{Error, Result};
use crate::linsys::solve_in_place;

/// Denominators below this magnitude mean the point is mapped to infinity.
const MIN_DENOMINATOR: f64 = 1e-12;

/// 3×3 projective transform as 9 row-major coefficients, `h8` fixed to 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography {
    h: [f64; 9],
}

impl Homography {
    /// The identity transform.
    #[must_use]
    pub fn identity() -> Self {
        Self {
            h: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
        }
    }

    /// Raw coefficients `h0..h8`.
    #[must_use]
    pub fn coefficients(&self) -> &[f64; 9] {
        &self.h
    }

    /// Estimate the homography mapping each `src[i]` onto `dst[i]`.
    ///
    /// Requires at least 4 correspondences; exactly 4 gives the exact DLT
    /// solution, more gives a least-squares fit over all of them.
    ///
    /// # Errors
    /// Returns [`Error::DegenerateCorrespondence`] when fewer than 4 pairs
    /// are given, the point counts differ, or the points are
    /// collinear/coincident (the normal equations go singular).
    pub fn estimate(src: &[(f64, f64)], dst: &[(f64, f64)]) -> Result<Self> {
        if src.len() != dst.len() {
            return Err(Error::DegenerateCorrespondence {
                reason: format!("{} source vs {} destination points", src.len(), dst.len()),
            });
        }
        if src.len() < 4 {
            return Err(Error::DegenerateCorrespondence {
                reason: format!("need at least 4 correspondences, got {}", src.len()),
            });
        }

        // Two DLT rows per correspondence, 9 columns
        let mut rows: Vec<[f64; 9]> = Vec::with_capacity(src.len() * 2);
        for (&(sx, sy), &(dx, dy)) in src.iter().zip(dst) {
            rows.push([-sx, -sy, -1.0, 0.0, 0.0, 0.0, sx * dx, sy * dx, dx]);
            rows.push([0.0, 0.0, 0.0, -sx, -sy, -1.0, sx * dy, sy * dy, dy]);
        }

        // Normal equations with h8 = 1: (AᵗA) h = -Aᵗ a₉ over the first 8 columns
        let mut ata = vec![vec![0.0; 8]; 8];
        let mut atb = vec![0.0; 8];
        for i in 0..8 {
            for j in 0..8 {
                ata[i][j] = rows.iter().map(|r| r[i] * r[j]).sum();
            }
            atb[i] = -rows.iter().map(|r| r[i] * r[8]).sum::<f64>();
        }

        let solved = solve_in_place(&mut ata, &mut atb).map_err(|e| match e {
            Error::SingularSystem { row, pivot } => Error::DegenerateCorrespondence {
                reason: format!(
                    "collinear or coincident points (singular normal equations, pivot {pivot:e} at row {row})"
                ),
            },
            other => other,
        })?;

        let mut h = [0.0; 9];
        h[..8].copy_from_slice(&solved);
        h[8] = 1.0;
        Ok(Self { h })
    }

    /// Apply the transform to a point, erroring on a degenerate denominator.
    ///
    /// # Errors
    /// Returns [`Error::DegenerateCorrespondence`] if `h6·x + h7·y + h8` is
    /// zero or near-zero, which signals a degenerate transform rather than
    /// a recoverable out-of-bounds sample.
    pub fn try_apply(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        let h = &self.h;
        let w = h[6] * x + h[7] * y + h[8];
        if !w.is_finite() || w.abs() < MIN_DENOMINATOR {
            return Err(Error::DegenerateCorrespondence {
                reason: format!("denominator {w:e} at ({x}, {y})"),
            });
        }
        Ok((
            (h[0] * x + h[1] * y + h[2]) / w,
            (h[3] * x + h[4] * y + h[5]) / w,
        ))
    }
}
