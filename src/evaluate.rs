//! Evaluation of a built tensor-product spline and its derivatives.
//!
//! Along each axis, the containing interval is located through the axis'
//! [`GridDescriptor`] and the cubic Hermite basis (or its first or second
//! derivative) is evaluated at the normalized coordinate `t` in that
//! interval. In several dimensions, the per-axis basis weights combine as
//! a tensor product over the `2^ndims` corners of the containing cell and
//! the `2^ndims` coefficient slots stored at each corner.
//!
//! ```text
//! f(x) = w00(t) f0 + w01(t) h s0 + w10(t) f1 + w11(t) h s1
//!
//! w00(t) = 2t³ - 3t² + 1      w01(t) = t³ - 2t² + t
//! w10(t) = -2t³ + 3t²         w11(t) = t³ - t²
//! ```
//!
//! Point, cloud, and array queries all go through the same per-axis lookup
//! and the same combination, so they agree exactly for the same points.
use alloc::vec::Vec;
use num_traits::Float;

use crate::error::SplineError;
use crate::grid::GridDescriptor;

/// Highest derivative order tabulated along any axis.
pub const MAX_ORDER: u8 = 2;

/// Hermite basis weights on one axis, like `w[corner][slot]` where
/// `corner` selects the lower/upper knot of the interval and `slot`
/// selects the stored value (0) or slope (1).
///
/// Slope weights include the interval width, so they multiply the
/// stored derivative directly; `order` derivatives are taken with
/// respect to the physical coordinate.
#[inline]
pub fn hermite_weights<T: Float>(t: T, h: T, order: u8) -> [[T; 2]; 2] {
    let one = T::one();
    let two = one + one;
    let three = two + one;
    let four = two + two;
    let six = three + three;
    let t2 = t * t;

    match order {
        0 => {
            let t3 = t2 * t;
            [
                [two * t3 - three * t2 + one, (t3 - two * t2 + t) * h],
                [three * t2 - two * t3, (t3 - t2) * h],
            ]
        }
        1 => {
            let a = six * (t2 - t) / h;
            [
                [a, three * t2 - four * t + one],
                [-a, three * t2 - two * t],
            ]
        }
        2 => {
            let a = (six + six) * t - six;
            let hh = h * h;
            [
                [a / hh, (six * t - four) / h],
                [-a / hh, (six * t - two) / h],
            ]
        }
        _ => [[T::zero(); 2]; 2],
    }
}

/// Interval and basis weights for one query coordinate on one axis.
#[derive(Clone, Copy, Debug)]
pub(crate) struct AxisWeights<T> {
    index: usize,
    w: [[T; 2]; 2],
    clamped: bool,
}

impl<T: Float> AxisWeights<T> {
    fn zero() -> Self {
        Self {
            index: 0,
            w: [[T::zero(); 2]; 2],
            clamped: false,
        }
    }

    #[inline]
    fn at(grid: &GridDescriptor<T>, x: T, order: u8, axis: usize) -> Result<Self, SplineError> {
        let loc = grid.locate(x).map_err(|err| match err {
            SplineError::NonFiniteCoordinate { .. } => SplineError::NonFiniteCoordinate { axis },
            other => other,
        })?;
        Ok(Self {
            index: loc.index,
            w: hermite_weights(loc.t, loc.step, order),
            clamped: loc.clamped,
        })
    }
}

/// Reject derivative orders outside 0..=2.
pub(crate) fn check_orders(orders: &[u8]) -> Result<(), SplineError> {
    match orders.iter().position(|&o| o > MAX_ORDER) {
        Some(axis) => Err(SplineError::InvalidDerivativeOrder {
            axis,
            order: orders[axis],
        }),
        None => Ok(()),
    }
}

/// Evaluator over borrowed grid descriptors and a coefficient array
/// laid out node-major with `2^N` slots per node.
///
/// Operation Complexity
/// * O(4^N) per point after interval lookup, which is O(1) on uniform axes
///   and O(log n) on non-uniform ones.
///
/// Memory Complexity
/// * O(N) per point; array queries additionally store one set of weights
///   per query coordinate on each axis.
pub struct Evaluator<'a, T: Float, const N: usize> {
    grids: &'a [GridDescriptor<T>],
    coefs: &'a [T],
    /// Node stride of each axis in the C-ordered node array
    strides: [usize; N],
}

impl<'a, T: Float, const N: usize> Evaluator<'a, T, N> {
    /// # Errors
    /// * If the number of grids is not `N`
    /// * If the coefficient array does not hold `2^N` entries per node
    pub fn new(grids: &'a [GridDescriptor<T>], coefs: &'a [T]) -> Result<Self, SplineError> {
        if grids.len() != N {
            return Err(SplineError::ShapeMismatch {
                context: "evaluator grids",
                expected: N,
                got: grids.len(),
            });
        }
        let nnodes: usize = grids.iter().map(|g| g.len()).product();
        let expected = nnodes << N;
        if coefs.len() != expected {
            return Err(SplineError::ShapeMismatch {
                context: "coefficient array",
                expected,
                got: coefs.len(),
            });
        }

        let mut strides = [1_usize; N];
        let mut acc = 1;
        for i in (0..N).rev() {
            strides[i] = acc;
            acc *= grids[i].len();
        }

        Ok(Self {
            grids,
            coefs,
            strides,
        })
    }

    /// Evaluate one point. Returns the value and whether any coordinate
    /// was clamped.
    #[inline]
    pub fn eval_one(&self, x: [T; N], orders: [u8; N]) -> Result<(T, bool), SplineError> {
        check_orders(&orders)?;
        let mut weights = [AxisWeights::zero(); N];
        for i in 0..N {
            weights[i] = AxisWeights::at(&self.grids[i], x[i], orders[i], i)?;
        }
        let clamped = weights.iter().any(|w| w.clamped);
        Ok((self.combine(&weights), clamped))
    }

    /// Evaluate a cloud of independent points given as one coordinate
    /// slice per axis. Returns the indices of clamped points.
    ///
    /// # Errors
    /// * If the coordinate slices and output differ in length
    pub fn eval_cloud(
        &self,
        x: [&[T]; N],
        orders: [u8; N],
        out: &mut [T],
    ) -> Result<Vec<usize>, SplineError> {
        let n = out.len();
        if let Some(bad) = x.iter().find(|xx| xx.len() != n) {
            return Err(SplineError::ShapeMismatch {
                context: "cloud coordinates",
                expected: n,
                got: bad.len(),
            });
        }

        let mut clamped = Vec::new();
        let mut tmp = [T::zero(); N];
        for i in 0..n {
            (0..N).for_each(|j| tmp[j] = x[j][i]);
            let (v, c) = self.eval_one(tmp, orders)?;
            out[i] = v;
            if c {
                clamped.push(i);
            }
        }
        Ok(clamped)
    }

    /// Evaluate on the cross product of per-axis coordinate slices,
    /// writing the output in C order (first axis slowest). Interval
    /// lookups are done once per coordinate per axis. Returns the flat
    /// indices of clamped points.
    ///
    /// # Errors
    /// * If the output length is not the product of the slice lengths
    pub fn eval_array(
        &self,
        x: [&[T]; N],
        orders: [u8; N],
        out: &mut [T],
    ) -> Result<Vec<usize>, SplineError> {
        check_orders(&orders)?;
        let total: usize = x.iter().map(|xx| xx.len()).product();
        if out.len() != total {
            return Err(SplineError::ShapeMismatch {
                context: "array query output",
                expected: total,
                got: out.len(),
            });
        }
        if total == 0 {
            return Ok(Vec::new());
        }

        // Per-axis lookups, reused across the cross product
        let mut table: Vec<Vec<AxisWeights<T>>> = Vec::with_capacity(N);
        for i in 0..N {
            let axis = x[i]
                .iter()
                .map(|&v| AxisWeights::at(&self.grids[i], v, orders[i], i))
                .collect::<Result<Vec<_>, _>>()?;
            table.push(axis);
        }

        let mut clamped = Vec::new();
        let mut idx = [0_usize; N];
        let mut weights = [AxisWeights::zero(); N];
        for (k, o) in out.iter_mut().enumerate() {
            for i in 0..N {
                weights[i] = table[i][idx[i]];
            }
            *o = self.combine(&weights);
            if weights.iter().any(|w| w.clamped) {
                clamped.push(k);
            }

            // Advance the odometer, last axis fastest
            for i in (0..N).rev() {
                idx[i] += 1;
                if idx[i] < x[i].len() {
                    break;
                }
                idx[i] = 0;
            }
        }
        Ok(clamped)
    }

    /// Tensor-product sum over cell corners and coefficient slots.
    #[inline]
    fn combine(&self, weights: &[AxisWeights<T>; N]) -> T {
        let nslots = 1_usize << N;
        let mut acc = T::zero();
        for corner in 0..nslots {
            let mut node = 0;
            for a in 0..N {
                node += (weights[a].index + ((corner >> a) & 1)) * self.strides[a];
            }
            let base = node * nslots;
            for slot in 0..nslots {
                let mut w = T::one();
                for a in 0..N {
                    w = w * weights[a].w[(corner >> a) & 1][(slot >> a) & 1];
                }
                acc = acc + w * self.coefs[base + slot];
            }
        }
        acc
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::boundary::AxisBoundary;
    use crate::coefficients::build_coefficients;
    use crate::utils::*;

    /// Weights of each order must be the derivative of the order below
    #[test]
    fn test_weights_are_derivatives() {
        let h = 0.7;
        let eps = 1e-6;
        for &t in &[0.0, 0.1, 0.5, 0.93, 1.0] {
            for order in 0..2 {
                let lo = hermite_weights(t - eps, h, order);
                let hi = hermite_weights(t + eps, h, order);
                let d = hermite_weights(t, h, order + 1);
                for c in 0..2 {
                    for s in 0..2 {
                        let fd = (hi[c][s] - lo[c][s]) / (2.0 * eps * h);
                        assert!((fd - d[c][s]).abs() < 1e-6);
                    }
                }
            }
        }

        // Endpoint interpolation
        let w0 = hermite_weights(0.0, h, 0);
        assert_eq!(w0, [[1.0, 0.0], [0.0, 0.0]]);
        let w1 = hermite_weights(1.0, h, 0);
        assert_eq!(w1, [[0.0, 0.0], [1.0, 0.0]]);
        let d0 = hermite_weights(0.0, h, 1);
        assert_eq!(d0[0][1], 1.0);
        assert_eq!(d0[1][1], 0.0);
    }

    #[test]
    fn test_orders_checked() {
        assert!(check_orders(&[0, 1, 2]).is_ok());
        assert_eq!(
            check_orders(&[0, 3]),
            Err(SplineError::InvalidDerivativeOrder { axis: 1, order: 3 })
        );
    }

    #[test]
    fn test_coefficient_shape_checked() {
        let grids = [GridDescriptor::pack(&[0.0_f64, 1.0, 2.0], false).unwrap()];
        assert!(Evaluator::<f64, 1>::new(&grids, &[0.0; 6]).is_ok());
        assert_eq!(
            Evaluator::<f64, 1>::new(&grids, &[0.0; 5]).err(),
            Some(SplineError::ShapeMismatch {
                context: "coefficient array",
                expected: 6,
                got: 5
            })
        );
        assert!(Evaluator::<f64, 2>::new(&grids, &[0.0; 6]).is_err());
    }

    /// Array, cloud, and point evaluation must agree exactly on a 2D spline,
    /// including points clamped outside the grid
    #[test]
    fn test_query_shapes_agree_2d() {
        let x = linspace(0.0_f64, 2.0, 6);
        let y = geomspace(1.0_f64, 8.0, 5);
        let grids = [
            GridDescriptor::pack(&x, false).unwrap(),
            GridDescriptor::pack(&y, false).unwrap(),
        ];
        let values: Vec<f64> = meshgrid(vec![&x, &y])
            .iter()
            .map(|p| (p[0] * 1.3).sin() * p[1].ln())
            .collect();
        let bcs = [AxisBoundary::not_a_knot(); 2];
        let coefs = build_coefficients(&grids, &bcs, &[[None, None], [None, None]], &values).unwrap();
        let ev = Evaluator::<f64, 2>::new(&grids, &coefs).unwrap();

        let xq = linspace(-0.5, 2.5, 7);
        let yq = linspace(0.5, 9.0, 4);
        let orders = [1, 2];

        let mut out_array = vec![0.0; 28];
        let clamped_array = ev.eval_array([&xq, &yq], orders, &mut out_array).unwrap();

        let pts = meshgrid(vec![&xq, &yq]);
        let xc: Vec<f64> = pts.iter().map(|p| p[0]).collect();
        let yc: Vec<f64> = pts.iter().map(|p| p[1]).collect();
        let mut out_cloud = vec![0.0; 28];
        let clamped_cloud = ev.eval_cloud([&xc, &yc], orders, &mut out_cloud).unwrap();

        assert_eq!(out_array, out_cloud);
        assert_eq!(clamped_array, clamped_cloud);
        for (k, p) in pts.iter().enumerate() {
            let (v, c) = ev.eval_one([p[0], p[1]], orders).unwrap();
            assert_eq!(v, out_array[k]);
            assert_eq!(c, clamped_array.contains(&k));
        }

        // First and last x, and first and last y, are outside
        assert!(clamped_array.contains(&0));
        assert!(!clamped_array.contains(&5));
        assert_eq!(clamped_array.len(), 28 - 5 * 2);
    }

    #[test]
    fn test_non_finite_query() {
        let grids = [GridDescriptor::pack(&[0.0_f64, 1.0, 2.0], false).unwrap()];
        let coefs = [0.0; 6];
        let ev = Evaluator::<f64, 1>::new(&grids, &coefs).unwrap();
        assert_eq!(
            ev.eval_one([f64::NAN], [0]),
            Err(SplineError::NonFiniteCoordinate { axis: 0 })
        );
        let mut out = [0.0; 2];
        assert!(ev.eval_cloud([&[0.5, 1.0, 2.0]], [0], &mut out).is_err());
    }
}
