//! Construction of compact cubic spline coefficients.
//!
//! Along one axis, the spline is stored as the function value and first
//! derivative (slope) at each knot, and evaluated with the cubic Hermite
//! basis. The slopes are the solution of a tridiagonal system that makes
//! the interpolant twice continuously differentiable at interior knots:
//!
//! ```text
//! h[i] s[i-1] + 2 (h[i-1] + h[i]) s[i] + h[i-1] s[i+1] = 3 (h[i] d[i-1] + h[i-1] d[i])
//! ```
//!
//! with `h[i] = x[i+1] - x[i]` and `d[i] = (f[i+1] - f[i]) / h[i]`. The
//! first and last rows are replaced by the boundary conditions, and a
//! periodic axis closes the system into a cyclic one.
//!
//! In several dimensions the same 1D operator is swept along each axis
//! in turn (axis 0, then 1, then 2). Sweeping axis `k` differentiates
//! every coefficient slot produced so far, so after the last sweep each
//! node holds the function value and all mixed first partials:
//! `2^ndims` coefficients per node.
use alloc::vec;
use alloc::vec::Vec;
use num_traits::Float;

use crate::boundary::{AxisBoundary, BoundaryKind, Side};
use crate::error::{BoundaryIssue, SplineError};
use crate::grid::GridDescriptor;
use crate::tridiagonal::{solve_cyclic, solve_tridiagonal};

/// Result of a 1D coefficient fit.
#[derive(Clone, Debug, PartialEq)]
pub struct AxisCoefficients<T> {
    /// First derivative at each knot
    pub slopes: Vec<T>,
    /// Whether knot position is a linear function of index along this axis,
    /// which is also when evaluation uses constant-time lookup
    pub linear: bool,
}

/// Fit a cubic spline along one axis.
///
/// `lower_value` and `upper_value` are used only by boundary conditions
/// that take a value ([`BoundaryKind::Slope`] and
/// [`BoundaryKind::SecondDerivative`]) and ignored otherwise.
///
/// On a periodic axis the last sample is taken to equal the first;
/// `values[n - 1]` is not read.
///
/// # Errors
/// * If `values` does not match the grid length
/// * If the axis is too short for the requested boundary conditions
/// * If the system is singular
pub fn build_axis_coefficients<T: Float>(
    grid: &GridDescriptor<T>,
    values: &[T],
    boundary: AxisBoundary,
    lower_value: T,
    upper_value: T,
) -> Result<AxisCoefficients<T>, SplineError> {
    let n = grid.len();
    if values.len() != n {
        return Err(SplineError::ShapeMismatch {
            context: "axis values",
            expected: n,
            got: values.len(),
        });
    }
    boundary.check_len(n)?;

    let slopes = if boundary.is_periodic() {
        periodic_slopes(grid.steps(), values)?
    } else {
        bounded_slopes(grid, values, boundary, [lower_value, upper_value])?
    };

    Ok(AxisCoefficients {
        slopes,
        linear: grid.is_uniform(),
    })
}

/// Cyclic system over the n - 1 distinct knots of a periodic axis.
fn periodic_slopes<T: Float>(h: &[T], f: &[T]) -> Result<Vec<T>, SplineError> {
    let m = h.len();
    let three = T::one() + T::one() + T::one();
    let two = T::one() + T::one();

    // Divided differences, wrapping the last interval back to f[0]
    let d: Vec<T> = (0..m)
        .map(|i| {
            let next = if i + 1 == m { f[0] } else { f[i + 1] };
            (next - f[i]) / h[i]
        })
        .collect();

    let mut lower = vec![T::zero(); m];
    let mut diag = vec![T::zero(); m];
    let mut upper = vec![T::zero(); m];
    let mut rhs = vec![T::zero(); m];
    for i in 0..m {
        let ip = (i + m - 1) % m;
        lower[i] = h[i];
        diag[i] = two * (h[ip] + h[i]);
        upper[i] = h[ip];
        rhs[i] = three * (h[i] * d[ip] + h[ip] * d[i]);
    }

    let mut slopes = solve_cyclic(&lower, &diag, &upper, &rhs)?;
    slopes.push(slopes[0]);
    Ok(slopes)
}

/// One boundary row, in terms of the end slope and its neighbor.
struct EndRow<T> {
    diag: T,
    off: T,
    rhs: T,
}

fn bounded_slopes<T: Float>(
    grid: &GridDescriptor<T>,
    f: &[T],
    boundary: AxisBoundary,
    end_values: [T; 2],
) -> Result<Vec<T>, SplineError> {
    let x = grid.knots();
    let h = grid.steps();
    let n = x.len();
    let two = T::one() + T::one();
    let three = two + T::one();

    let d: Vec<T> = (0..n - 1).map(|i| (f[i + 1] - f[i]) / h[i]).collect();

    let mut lower = vec![T::zero(); n];
    let mut diag = vec![T::zero(); n];
    let mut upper = vec![T::zero(); n];
    let mut rhs = vec![T::zero(); n];
    for i in 1..n - 1 {
        lower[i] = h[i];
        diag[i] = two * (h[i - 1] + h[i]);
        upper[i] = h[i - 1];
        rhs[i] = three * (h[i] * d[i - 1] + h[i - 1] * d[i]);
    }

    let first = end_row(boundary.lower(), end_values[0], Side::Lower, x, f, h, &d)?;
    diag[0] = first.diag;
    upper[0] = first.off;
    rhs[0] = first.rhs;

    // Not-a-knot on both ends of a 3-point axis imposes the same condition
    // twice; close the system with a vanishing third derivative instead,
    // which yields the interpolating parabola.
    let last = if n == 3
        && boundary.lower() == BoundaryKind::NotAKnot
        && boundary.upper() == BoundaryKind::NotAKnot
    {
        EndRow {
            diag: T::one(),
            off: T::one(),
            rhs: two * d[1],
        }
    } else {
        end_row(boundary.upper(), end_values[1], Side::Upper, x, f, h, &d)?
    };
    diag[n - 1] = last.diag;
    lower[n - 1] = last.off;
    rhs[n - 1] = last.rhs;

    solve_tridiagonal(&lower, &diag, &upper, &rhs)
}

/// Build the boundary row for one end of a non-periodic axis.
///
/// Quantities are taken from the end inward: `h0`, `d0` belong to the
/// end interval and `h1`, `d1` to its neighbor.
fn end_row<T: Float>(
    kind: BoundaryKind,
    value: T,
    side: Side,
    x: &[T],
    f: &[T],
    h: &[T],
    d: &[T],
) -> Result<EndRow<T>, SplineError> {
    let n = x.len();
    let two = T::one() + T::one();
    let three = two + T::one();
    let six = three + three;

    // Knot indices from the end inward
    let at = |k: usize| match side {
        Side::Lower => k,
        Side::Upper => n - 1 - k,
    };
    // Interval indices from the end inward
    let iv = |k: usize| match side {
        Side::Lower => k,
        Side::Upper => n - 2 - k,
    };

    let (h0, d0) = (h[iv(0)], d[iv(0)]);

    let slope_row = |v: T| EndRow {
        diag: T::one(),
        off: T::zero(),
        rhs: v,
    };
    let curvature_row = |v: T| {
        // Second derivative of the end cubic at the boundary knot, solved
        // for the end slope; the sign of the value term flips with the
        // orientation of the interval.
        let shift = v * h0 / two;
        let rhs = match side {
            Side::Lower => three * d0 - shift,
            Side::Upper => three * d0 + shift,
        };
        EndRow {
            diag: two,
            off: T::one(),
            rhs,
        }
    };

    let row = match kind {
        BoundaryKind::NotAKnot if n < 3 => slope_row(d0),
        BoundaryKind::NotAKnot => {
            let (h1, d1) = (h[iv(1)], d[iv(1)]);
            let hs = h0 + h1;
            EndRow {
                diag: h1,
                off: hs,
                rhs: ((h0 + two * hs) * h1 * d0 + h0 * h0 * d1) / hs,
            }
        }
        BoundaryKind::Slope => slope_row(value),
        BoundaryKind::ZeroSlope => slope_row(T::zero()),
        BoundaryKind::FirstDividedDifference => slope_row(d0),
        BoundaryKind::SecondDerivative => curvature_row(value),
        BoundaryKind::ZeroSecondDerivative => curvature_row(T::zero()),
        BoundaryKind::SecondDividedDifference => {
            let pts = [at(0), at(1), at(2)];
            let dd2 = divided_difference(x, f, &pts);
            curvature_row(two * dd2)
        }
        BoundaryKind::ThirdDividedDifference => {
            // Third derivative of the end cubic is 6 (s0 + s1 - 2 d0) / h0^2
            let pts = [at(0), at(1), at(2), at(3)];
            let third = six * divided_difference(x, f, &pts);
            EndRow {
                diag: T::one(),
                off: T::one(),
                rhs: two * d0 + third * h0 * h0 / six,
            }
        }
        BoundaryKind::Periodic => {
            return Err(BoundaryIssue::UnpairedPeriodic.into());
        }
    };

    Ok(row)
}

/// Newton divided difference f[x_p0, ..., x_pk] over the given knot indices,
/// which may come in any order.
fn divided_difference<T: Float>(x: &[T], f: &[T], pts: &[usize]) -> T {
    let k = pts.len();
    let mut table: [T; 4] = [T::zero(); 4];
    for (j, &p) in pts.iter().enumerate() {
        table[j] = f[p];
    }
    for level in 1..k {
        for j in 0..k - level {
            table[j] = (table[j + 1] - table[j]) / (x[pts[j + level]] - x[pts[j]]);
        }
    }
    table[0]
}

/// Fit slopes along `axis` for every line of a C-ordered array.
///
/// `end_values[side]`, when present, holds one boundary value per line,
/// indexed in C order over the remaining axes.
pub(crate) fn slopes_along<T: Float>(
    data: &[T],
    dims: &[usize],
    axis: usize,
    grid: &GridDescriptor<T>,
    boundary: AxisBoundary,
    end_values: [Option<&[T]>; 2],
) -> Result<Vec<T>, SplineError> {
    let n = dims[axis];
    let stride: usize = dims[axis + 1..].iter().product();
    let total = data.len();
    let nlines = total / n;

    let mut out = vec![T::zero(); total];
    let mut line = vec![T::zero(); n];
    for l in 0..nlines {
        let base = (l / stride) * n * stride + l % stride;
        for i in 0..n {
            line[i] = data[base + i * stride];
        }

        let mut bv = [T::zero(); 2];
        for (side, values) in end_values.iter().enumerate() {
            if let Some(values) = values {
                bv[side] = *values.get(l).ok_or(SplineError::ShapeMismatch {
                    context: "boundary values",
                    expected: nlines,
                    got: values.len(),
                })?;
            }
        }

        let fit = build_axis_coefficients(grid, &line, boundary, bv[0], bv[1])?;
        for i in 0..n {
            out[base + i * stride] = fit.slopes[i];
        }
    }

    Ok(out)
}

/// Copy the first hyperplane of each periodic axis onto the last,
/// so that stored values agree with the wrapped fit.
pub(crate) fn enforce_periodicity<T: Float>(data: &mut [T], dims: &[usize], periodic: &[bool]) {
    for (axis, _) in periodic.iter().enumerate().filter(|(_, p)| **p) {
        let n = dims[axis];
        let stride: usize = dims[axis + 1..].iter().product();
        let nlines = data.len() / n;
        let mut changed = 0_usize;
        for l in 0..nlines {
            let base = (l / stride) * n * stride + l % stride;
            let last = base + (n - 1) * stride;
            if data[last] != data[base] {
                changed += 1;
                data[last] = data[base];
            }
        }
        if changed > 0 {
            tracing::debug!(
                axis,
                lines = changed,
                "replaced last sample of periodic axis with the first"
            );
        }
    }
}

/// Compute the full coefficient array for a tensor-product spline.
///
/// `values` is the C-ordered sample array. `end_values[k][side]` holds the
/// boundary values for axis `k`, one per node of the remaining axes, and is
/// required exactly when that side's condition takes a value.
///
/// The output holds `2^ndims` coefficients per node, node-major; slot `m`
/// is the mixed derivative taken once along every axis whose bit is set
/// in `m`, and slot 0 is the function value.
pub(crate) fn build_coefficients<T: Float>(
    grids: &[GridDescriptor<T>],
    boundaries: &[AxisBoundary],
    end_values: &[[Option<Vec<T>>; 2]],
    values: &[T],
) -> Result<Vec<T>, SplineError> {
    let ndims = grids.len();
    let dims: Vec<usize> = grids.iter().map(|g| g.len()).collect();
    let nnodes: usize = dims.iter().product();
    if values.len() != nnodes {
        return Err(SplineError::ShapeMismatch {
            context: "spline values",
            expected: nnodes,
            got: values.len(),
        });
    }
    let nslots = 1_usize << ndims;
    let periodic: Vec<bool> = grids.iter().map(|g| g.is_periodic()).collect();

    let mut planes: Vec<Vec<T>> = vec![Vec::new(); nslots];
    planes[0] = values.to_vec();
    enforce_periodicity(&mut planes[0], &dims, &periodic);

    for k in 0..ndims {
        tracing::trace!(axis = k, slots = 1_usize << k, "sweeping axis");

        // Grid of the remaining axes, over which boundary values live
        let rdims: Vec<usize> = (0..ndims).filter(|&a| a != k).map(|a| dims[a]).collect();
        let rperiodic: Vec<bool> = (0..ndims).filter(|&a| a != k).map(|a| periodic[a]).collect();

        for m in 0..(1_usize << k) {
            let mut derived: [Option<Vec<T>>; 2] = [None, None];
            for side in [Side::Lower, Side::Upper] {
                if !boundaries[k].side(side).needs_value() {
                    continue;
                }
                if let Some(base) = &end_values[k][side.index()] {
                    let mut arr = base.clone();
                    enforce_periodicity(&mut arr, &rdims, &rperiodic);
                    derived[side.index()] = Some(differentiate_boundary(arr, &rdims, m, grids)?);
                }
            }
            let bv = [derived[0].as_deref(), derived[1].as_deref()];
            planes[m | (1 << k)] = slopes_along(&planes[m], &dims, k, &grids[k], boundaries[k], bv)?;
        }
    }

    let mut coefs = vec![T::zero(); nnodes * nslots];
    for (m, plane) in planes.iter().enumerate() {
        for (p, &v) in plane.iter().enumerate() {
            coefs[p * nslots + m] = v;
        }
    }
    Ok(coefs)
}

/// Differentiate a boundary value array once along every axis in `mask`.
///
/// All axes in `mask` precede the swept axis, so their position in the
/// reduced grid equals their axis index. A not-a-knot fit is used, or a
/// periodic one when the axis is periodic.
fn differentiate_boundary<T: Float>(
    mut arr: Vec<T>,
    rdims: &[usize],
    mask: usize,
    grids: &[GridDescriptor<T>],
) -> Result<Vec<T>, SplineError> {
    for (a, grid) in grids.iter().enumerate() {
        if mask & (1 << a) == 0 {
            continue;
        }
        let boundary = if grid.is_periodic() {
            AxisBoundary::periodic()
        } else {
            AxisBoundary::not_a_knot()
        };
        arr = slopes_along(&arr, rdims, a, grid, boundary, [None, None])?;
    }
    Ok(arr)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::*;
    use crate::utils::*;

    fn cubic(x: f64) -> f64 {
        1.0 + 2.0 * x - 0.5 * x * x + 0.3 * x * x * x
    }

    fn cubic_slope(x: f64) -> f64 {
        2.0 - x + 0.9 * x * x
    }

    fn cubic_curvature(x: f64) -> f64 {
        -1.0 + 1.8 * x
    }

    /// Every condition that is exact for cubics must reproduce the
    /// derivative of a cubic at every knot, on a non-uniform grid.
    #[test]
    fn test_cubic_slopes_exact() {
        let mut rng = rng_fixed_seed();
        let x = jittered_grid(&mut rng, -1.0, 2.0, 9, 0.2);
        let f: Vec<f64> = x.iter().map(|&v| cubic(v)).collect();
        let grid = GridDescriptor::pack(&x, false).unwrap();
        let (lo, hi) = (x[0], x[x.len() - 1]);

        let cases = [
            (0, 0, 0.0, 0.0),
            (1, 1, cubic_slope(lo), cubic_slope(hi)),
            (2, 2, cubic_curvature(lo), cubic_curvature(hi)),
            (1, 2, cubic_slope(lo), cubic_curvature(hi)),
            (7, 7, 0.0, 0.0),
            (0, 7, 0.0, 0.0),
            (2, 0, cubic_curvature(lo), 0.0),
        ];
        for (l, u, lv, uv) in cases {
            let bc = AxisBoundary::from_codes(l, u).unwrap();
            let fit = build_axis_coefficients(&grid, &f, bc, lv, uv).unwrap();
            for i in 0..x.len() {
                assert!(
                    (fit.slopes[i] - cubic_slope(x[i])).abs() < 1e-10,
                    "codes ({l}, {u}) at knot {i}"
                );
            }
            assert!(!fit.linear);
        }
    }

    /// Conditions that are exact for quadratics
    #[test]
    fn test_quadratic_slopes_exact() {
        let x = linspace(0.0_f64, 3.0, 7);
        let f: Vec<f64> = x.iter().map(|&v| 1.0 - v + 2.0 * v * v).collect();
        let grid = GridDescriptor::pack(&x, false).unwrap();
        let bc = AxisBoundary::from_codes(6, 6).unwrap();
        let fit = build_axis_coefficients(&grid, &f, bc, 0.0, 0.0).unwrap();
        assert!(fit.linear);
        for i in 0..x.len() {
            assert!((fit.slopes[i] - (-1.0 + 4.0 * x[i])).abs() < 1e-10);
        }
    }

    #[test]
    fn test_zero_conditions() {
        let x = linspace(0.0_f64, 1.0, 6);
        let f: Vec<f64> = x.iter().map(|&v| (3.0 * v).sin()).collect();
        let grid = GridDescriptor::pack(&x, false).unwrap();

        let bc = AxisBoundary::from_codes(3, 3).unwrap();
        let fit = build_axis_coefficients(&grid, &f, bc, 9.0, 9.0).unwrap();
        assert_eq!(fit.slopes[0], 0.0);
        assert_eq!(fit.slopes[5], 0.0);

        // Zero second derivative: 2 s0 + s1 = 3 d0
        let bc = AxisBoundary::from_codes(4, 4).unwrap();
        let fit = build_axis_coefficients(&grid, &f, bc, 9.0, 9.0).unwrap();
        let h = x[1] - x[0];
        let d0 = (f[1] - f[0]) / h;
        assert!((2.0 * fit.slopes[0] + fit.slopes[1] - 3.0 * d0).abs() < 1e-12);

        // First divided difference
        let bc = AxisBoundary::from_codes(5, 5).unwrap();
        let fit = build_axis_coefficients(&grid, &f, bc, 0.0, 0.0).unwrap();
        assert!((fit.slopes[0] - d0).abs() < 1e-12);
        assert!((fit.slopes[5] - (f[5] - f[4]) / h).abs() < 1e-12);
    }

    #[test]
    fn test_short_axes() {
        // Straight line through two points
        let grid = GridDescriptor::pack(&[0.0_f64, 2.0], false).unwrap();
        let fit =
            build_axis_coefficients(&grid, &[1.0, 5.0], AxisBoundary::not_a_knot(), 0.0, 0.0)
                .unwrap();
        assert_eq!(fit.slopes, vec![2.0, 2.0]);

        // Parabola through three points
        let x = [0.0_f64, 1.0, 3.0];
        let f: Vec<f64> = x.iter().map(|&v| v * v).collect();
        let grid = GridDescriptor::pack(&x, false).unwrap();
        let fit = build_axis_coefficients(&grid, &f, AxisBoundary::not_a_knot(), 0.0, 0.0)
            .unwrap();
        (0..3).for_each(|i| assert!((fit.slopes[i] - 2.0 * x[i]).abs() < 1e-12));

        // Third divided difference needs four points
        let bc = AxisBoundary::from_codes(7, 0).unwrap();
        assert!(build_axis_coefficients(&grid, &f, bc, 0.0, 0.0).is_err());
    }

    #[test]
    fn test_periodic_slopes() {
        let n = 16;
        let x = linspace(0.0_f64, 2.0 * core::f64::consts::PI, n);
        let f: Vec<f64> = x.iter().map(|&v| v.sin()).collect();
        let grid = GridDescriptor::pack(&x, true).unwrap();
        let fit = build_axis_coefficients(&grid, &f, AxisBoundary::periodic(), 0.0, 0.0).unwrap();
        assert_eq!(fit.slopes[0], fit.slopes[n - 1]);
        (0..n).for_each(|i| assert!((fit.slopes[i] - x[i].cos()).abs() < 2e-3));

        // Two distinct knots per period
        let grid = GridDescriptor::pack(&[0.0_f64, 1.0, 2.0], true).unwrap();
        let fit = build_axis_coefficients(&grid, &[1.0, -1.0, 1.0], AxisBoundary::periodic(), 0.0, 0.0)
            .unwrap();
        (0..3).for_each(|i| assert!(fit.slopes[i].abs() < 1e-12));
    }

    #[test]
    fn test_value_length_mismatch() {
        let grid = GridDescriptor::pack(&[0.0_f64, 1.0, 2.0, 3.0], false).unwrap();
        let r = build_axis_coefficients(&grid, &[0.0; 3], AxisBoundary::not_a_knot(), 0.0, 0.0);
        assert_eq!(
            r,
            Err(SplineError::ShapeMismatch {
                context: "axis values",
                expected: 4,
                got: 3
            })
        );
    }

    #[test]
    fn test_divided_difference_order_free() {
        let x = [0.0_f64, 1.0, 3.0, 4.0];
        let f: Vec<f64> = x.iter().map(|&v| v * v * v).collect();
        // Leading coefficient of the interpolating cubic
        assert!((divided_difference(&x, &f, &[0, 1, 2, 3]) - 1.0).abs() < 1e-12);
        assert!((divided_difference(&x, &f, &[3, 2, 1, 0]) - 1.0).abs() < 1e-12);
        assert!((divided_difference(&x, &f, &[0, 1]) - 1.0).abs() < 1e-12);
    }

    /// The 2D sweep on a bicubic must recover every mixed partial exactly
    #[test]
    fn test_sweep_bicubic() {
        let x = [0.0_f64, 0.5, 1.5, 2.0, 3.0];
        let y = [-1.0_f64, 0.0, 0.25, 1.0];
        let grids = [
            GridDescriptor::pack(&x, false).unwrap(),
            GridDescriptor::pack(&y, false).unwrap(),
        ];
        let g = |x: f64, y: f64| cubic(x) * (2.0 - y + y * y * y);
        let gx = |x: f64, y: f64| cubic_slope(x) * (2.0 - y + y * y * y);
        let gy = |x: f64, y: f64| cubic(x) * (-1.0 + 3.0 * y * y);
        let gxy = |x: f64, y: f64| cubic_slope(x) * (-1.0 + 3.0 * y * y);

        let values: Vec<f64> = meshgrid(vec![&x.to_vec(), &y.to_vec()])
            .iter()
            .map(|p| g(p[0], p[1]))
            .collect();

        // Slope on the lower y boundary, one value per x knot
        let bcy = AxisBoundary::from_codes(1, 0).unwrap();
        let lower_y: Vec<f64> = x.iter().map(|&xi| gy(xi, y[0])).collect();
        let end_values = [[None, None], [Some(lower_y), None]];

        let coefs = build_coefficients(
            &grids,
            &[AxisBoundary::not_a_knot(), bcy],
            &end_values,
            &values,
        )
        .unwrap();

        for i in 0..x.len() {
            for j in 0..y.len() {
                let p = (i * y.len() + j) * 4;
                let expected = [g(x[i], y[j]), gx(x[i], y[j]), gy(x[i], y[j]), gxy(x[i], y[j])];
                (0..4).for_each(|m| assert!((coefs[p + m] - expected[m]).abs() < 1e-9));
            }
        }
    }

    #[test]
    fn test_periodic_sample_replaced() {
        let grids = [GridDescriptor::pack(&[0.0_f64, 1.0, 2.0, 3.0], true).unwrap()];
        let coefs =
            build_coefficients(&grids, &[AxisBoundary::periodic()], &[[None, None]], &[1.0, 2.0, 3.0, 7.0])
                .unwrap();
        assert_eq!(coefs[6], 1.0);
        assert_eq!(coefs[7], coefs[1]);
    }
}
