//! Tensor-product cubic splines on 1D, 2D, and 3D rectilinear grids,
//! with per-axis boundary conditions and evaluation of values and
//! partial derivatives up to second order along each axis.
//!
//! Each axis stores the function value and first derivative at every knot
//! and is evaluated with the cubic Hermite basis. The derivatives come from
//! a tridiagonal solve that makes the interpolant twice continuously
//! differentiable, with the end rows set by the boundary conditions
//! (PSPLINE codes `-1..=7`, see [`BoundaryKind`]).
//!
//! # Performance Scalings
//! Each evaluation point touches the `2^ndims` corners of its grid cell,
//! each carrying `2^ndims` coefficients, for a cost of O(4^ndims) after
//! the interval lookup. Lookup is a single division on uniform axes and a
//! bisection search on non-uniform ones.
//!
//! | Operation                     | RAM                | Cost                               |
//! |-------------------------------|--------------------|------------------------------------|
//! | `Spline::setup`               | O(2^ndims * nodes) | O(2^ndims * nodes)                 |
//! | `interp_point` / `_cloud`     | O(ndims)           | O(4^ndims) + log2(axis len)        |
//! | `interp_array`                | O(sum of axis len) | O(4^ndims) per output point        |
//!
//! # Example: 2D spline with a clamped slope
//! ```rust
//! use splinen::{AxisBoundary, Query, Side, Spline2D};
//!
//! // Define a grid
//! let x = [0.0_f64, 1.0, 2.0, 3.0];
//! let y = [0.0_f64, 0.5, 1.0];
//!
//! // Values at grid points, C order (x slowest)
//! let z: Vec<f64> = x
//!     .iter()
//!     .flat_map(|xi| y.iter().map(move |yj| xi * xi + yj))
//!     .collect();
//!
//! // Zero slope along x at x = 0, one value per y knot
//! let mut spline = Spline2D::builder([&x[..], &y[..]])
//!     .boundary_codes([(1, 0), (0, 0)])
//!     .boundary_value(0, Side::Lower, 0.0)
//!     .build()
//!     .unwrap();
//! spline.setup(&z).unwrap();
//!
//! // Points to interpolate, one slice per axis
//! let xobs = [0.5, 2.5, 4.0];
//! let yobs = [0.25, 0.75, 0.5];
//! let out = spline.interp(Query::Cloud([&xobs[..], &yobs[..]])).unwrap();
//! assert!((out.value[0] - 0.5).abs() < 1e-12);
//!
//! // The last point was outside the grid and evaluated on its edge
//! assert_eq!(out.extrapolated_points(), &[2]);
//!
//! // d2f/dx2 on the cross product of the query coordinates
//! let d = spline.derivative_array([2, 0], [&xobs[..2], &yobs[..2]]).unwrap();
//! assert!(d.value.iter().all(|v| (v - 2.0).abs() < 1e-9));
//! ```
#![cfg_attr(not(feature = "std"), no_std)]
// These "needless" range loops are a significant speedup
#![allow(clippy::needless_range_loop)]

extern crate alloc;

pub mod boundary;
pub mod coefficients;
pub mod error;
pub mod evaluate;
pub mod grid;
pub mod spline;
pub mod tridiagonal;

pub use boundary::{AxisBoundary, BoundaryKind, Side};
pub use coefficients::{build_axis_coefficients, AxisCoefficients};
pub use error::{BoundaryIssue, Evaluated, GridIssue, SplineError, Warning};
pub use evaluate::Evaluator;
pub use grid::{check_bounds, GridDescriptor, GridOptions, Location};
pub use spline::{Query, Spline, Spline1D, Spline2D, Spline3D, SplineBuilder};

#[cfg(feature = "std")]
pub mod utils;

#[cfg(all(test, feature = "std"))]
pub(crate) mod testing;
