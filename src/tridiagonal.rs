//! Tridiagonal and cyclic tridiagonal linear solves.
//!
//! Systems are given as three diagonals plus a right-hand side, all of
//! length `n`. Row `i` reads
//!
//! ```text
//! lower[i] * x[i-1] + diag[i] * x[i] + upper[i] * x[i+1] = rhs[i]
//! ```
//!
//! For the plain solver `lower[0]` and `upper[n-1]` are ignored. For the
//! cyclic solver they are the corner entries: `lower[0]` multiplies
//! `x[n-1]` and `upper[n-1]` multiplies `x[0]`.
use alloc::vec;
use alloc::vec::Vec;
use num_traits::Float;

use crate::error::SplineError;

/// Solve a tridiagonal system with the Thomas algorithm
/// (forward elimination, back substitution).
///
/// No pivoting is done; the spline systems this is used for are
/// diagonally dominant apart from their boundary rows.
///
/// # Errors
/// * If the input lengths differ or are zero
/// * If a pivot vanishes relative to the size of its row
pub fn solve_tridiagonal<T: Float>(
    lower: &[T],
    diag: &[T],
    upper: &[T],
    rhs: &[T],
) -> Result<Vec<T>, SplineError> {
    let n = diag.len();
    check_lengths(n, lower, upper, rhs)?;

    let mut cp = vec![T::zero(); n]; // Modified upper diagonal
    let mut dp = vec![T::zero(); n]; // Modified right-hand side

    let mut denom = diag[0];
    check_pivot(denom, T::zero(), diag[0], upper[0], 0)?;
    cp[0] = upper[0] / denom;
    dp[0] = rhs[0] / denom;

    for i in 1..n {
        denom = diag[i] - lower[i] * cp[i - 1];
        check_pivot(denom, lower[i], diag[i], upper[i], i)?;
        if i < n - 1 {
            cp[i] = upper[i] / denom;
        }
        dp[i] = (rhs[i] - lower[i] * dp[i - 1]) / denom;
    }

    let mut x = dp;
    for i in (0..n - 1).rev() {
        x[i] = x[i] - cp[i] * x[i + 1];
    }

    Ok(x)
}

/// Solve a cyclic tridiagonal system.
///
/// The corner entries are removed by a rank-one (Sherman-Morrison)
/// correction, which takes two plain tridiagonal solves on the same
/// modified matrix. Systems of size 1 and 2 are solved directly.
///
/// # Errors
/// * If the input lengths differ or are zero
/// * If the modified matrix or the correction is singular
pub fn solve_cyclic<T: Float>(
    lower: &[T],
    diag: &[T],
    upper: &[T],
    rhs: &[T],
) -> Result<Vec<T>, SplineError> {
    let n = diag.len();
    check_lengths(n, lower, upper, rhs)?;

    match n {
        1 => {
            // Both neighbors are the unknown itself
            let d = diag[0] + lower[0] + upper[0];
            check_pivot(d, lower[0], diag[0], upper[0], 0)?;
            Ok(vec![rhs[0] / d])
        }
        2 => {
            // Corner and off-diagonal entries land on the same element
            let (a, b) = (diag[0], lower[0] + upper[0]);
            let (c, d) = (lower[1] + upper[1], diag[1]);
            let det = a * d - b * c;
            let scale = a.abs() * d.abs() + b.abs() * c.abs();
            if det == T::zero() || det.abs() <= T::epsilon() * scale || !det.is_finite() {
                return Err(SplineError::SingularSystem { row: 1 });
            }
            Ok(vec![
                (rhs[0] * d - b * rhs[1]) / det,
                (a * rhs[1] - c * rhs[0]) / det,
            ])
        }
        _ => {
            let beta = lower[0]; // Row 0, column n-1
            let alpha = upper[n - 1]; // Row n-1, column 0
            let gamma = -diag[0];

            let mut bb = diag.to_vec();
            bb[0] = diag[0] - gamma;
            bb[n - 1] = diag[n - 1] - alpha * beta / gamma;

            let x = solve_tridiagonal(lower, &bb, upper, rhs)?;

            let mut u = vec![T::zero(); n];
            u[0] = gamma;
            u[n - 1] = alpha;
            let z = solve_tridiagonal(lower, &bb, upper, &u)?;

            let denom = T::one() + z[0] + beta * z[n - 1] / gamma;
            if denom == T::zero() || !denom.is_finite() {
                return Err(SplineError::SingularSystem { row: n - 1 });
            }
            let fact = (x[0] + beta * x[n - 1] / gamma) / denom;

            Ok(x.iter().zip(z.iter()).map(|(&xi, &zi)| xi - fact * zi).collect())
        }
    }
}

fn check_lengths<T>(n: usize, lower: &[T], upper: &[T], rhs: &[T]) -> Result<(), SplineError> {
    if n == 0 {
        return Err(SplineError::ShapeMismatch {
            context: "tridiagonal system",
            expected: 1,
            got: 0,
        });
    }
    for len in [lower.len(), upper.len(), rhs.len()] {
        if len != n {
            return Err(SplineError::ShapeMismatch {
                context: "tridiagonal system",
                expected: n,
                got: len,
            });
        }
    }
    Ok(())
}

/// Reject a pivot that vanishes relative to the entries of its row.
#[inline]
fn check_pivot<T: Float>(pivot: T, a: T, b: T, c: T, row: usize) -> Result<(), SplineError> {
    let scale = a.abs() + b.abs() + c.abs();
    if pivot == T::zero() || !pivot.is_finite() || pivot.abs() <= T::epsilon() * scale {
        return Err(SplineError::SingularSystem { row });
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::*;

    /// Multiply a (possibly cyclic) tridiagonal matrix by a vector
    fn matvec(lower: &[f64], diag: &[f64], upper: &[f64], x: &[f64], cyclic: bool) -> Vec<f64> {
        let n = diag.len();
        (0..n)
            .map(|i| {
                let mut v = diag[i] * x[i];
                if i > 0 {
                    v += lower[i] * x[i - 1];
                } else if cyclic {
                    v += lower[0] * x[n - 1];
                }
                if i < n - 1 {
                    v += upper[i] * x[i + 1];
                } else if cyclic {
                    v += upper[n - 1] * x[0];
                }
                v
            })
            .collect()
    }

    #[test]
    fn test_thomas_random_dominant() {
        let mut rng = rng_fixed_seed();
        for n in [1, 2, 3, 10, 50] {
            let lower = randn::<f64>(&mut rng, n);
            let upper = randn::<f64>(&mut rng, n);
            let diag: Vec<f64> = randn::<f64>(&mut rng, n).iter().map(|d| d + 3.0).collect();
            let x = randn::<f64>(&mut rng, n);
            let rhs = matvec(&lower, &diag, &upper, &x, false);

            let sol = solve_tridiagonal(&lower, &diag, &upper, &rhs).unwrap();
            (0..n).for_each(|i| assert!((sol[i] - x[i]).abs() < 1e-12));
        }
    }

    #[test]
    fn test_cyclic_random_dominant() {
        let mut rng = rng_fixed_seed();
        for n in [1, 2, 3, 4, 17] {
            let lower = randn::<f64>(&mut rng, n);
            let upper = randn::<f64>(&mut rng, n);
            let diag: Vec<f64> = randn::<f64>(&mut rng, n).iter().map(|d| d + 3.0).collect();
            let x = randn::<f64>(&mut rng, n);
            let rhs = matvec(&lower, &diag, &upper, &x, true);

            let sol = solve_cyclic(&lower, &diag, &upper, &rhs).unwrap();
            (0..n).for_each(|i| assert!((sol[i] - x[i]).abs() < 1e-12));
        }
    }

    #[test]
    fn test_singular() {
        let lower = [0.0, 1.0, 1.0];
        let diag = [1.0, 1.0, 1.0];
        let upper = [1.0, 1.0, 0.0];
        let rhs = [1.0, 2.0, 3.0];
        // Second pivot is 1 - 1 * 1 = 0
        assert_eq!(
            solve_tridiagonal(&lower, &diag, &upper, &rhs),
            Err(SplineError::SingularSystem { row: 1 })
        );
        assert!(solve_tridiagonal(&[0.0], &[0.0], &[0.0], &[1.0]).is_err());
    }

    #[test]
    fn test_length_mismatch() {
        let r = solve_tridiagonal(&[0.0, 1.0], &[2.0, 2.0], &[1.0], &[1.0, 1.0]);
        assert!(matches!(r, Err(SplineError::ShapeMismatch { .. })));
        let r = solve_cyclic::<f64>(&[], &[], &[], &[]);
        assert!(matches!(r, Err(SplineError::ShapeMismatch { .. })));
    }
}
