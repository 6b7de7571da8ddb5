//! Small dense linear-system solver.
//!
//! Gaussian elimination with partial pivoting, sized for the 8×8 normal
//! equations of the homography estimator but written for any n.

use crate::error::{Error, Result};

/// Pivot magnitudes below this are treated as a singular system.
const PIVOT_EPS: f64 = 1e-10;

/// Solve `a · x = b` in place by Gaussian elimination with partial pivoting.
///
/// Both `a` and `b` are consumed as scratch space; callers must not assume
/// their inputs survive the call.
///
/// # Errors
/// Returns [`Error::SingularSystem`] when the largest available pivot in a
/// column falls below tolerance after row swapping.
pub fn solve_in_place(a: &mut [Vec<f64>], b: &mut [f64]) -> Result<Vec<f64>> {
    let n = a.len();
    debug_assert!(a.iter().all(|row| row.len() == n));
    debug_assert_eq!(b.len(), n);

    // Forward elimination
    for i in 0..n {
        // Partial pivot: row with the largest magnitude in column i
        let mut max_row = i;
        for k in (i + 1)..n {
            if a[k][i].abs() > a[max_row][i].abs() {
                max_row = k;
            }
        }
        a.swap(i, max_row);
        b.swap(i, max_row);

        let pivot = a[i][i];
        if pivot.abs() < PIVOT_EPS {
            return Err(Error::SingularSystem { row: i, pivot });
        }

        for k in (i + 1)..n {
            let factor = a[k][i] / pivot;
            a[k][i] = 0.0;
            for j in (i + 1)..n {
                a[k][j] -= factor * a[i][j];
            }
            b[k] -= factor * b[i];
        }
    }

    // Back substitution
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut acc = b[i];
        for j in (i + 1)..n {
            acc -= a[i][j] * x[j];
        }
        x[i] = acc / a[i][i];
    }

    Ok(x)
}
