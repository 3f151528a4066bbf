//! The spline handle: coordinate axes, boundary conditions and, once
//! [`Spline::setup`] has run, the coefficient array.
//!
//! ```
//! use splinen::{AxisBoundary, Side, Spline1D};
//!
//! let x = [0.0, 1.0, 2.0, 3.0, 4.0];
//! let f: Vec<f64> = x.iter().map(|v| v * v).collect();
//!
//! let mut spline = Spline1D::builder([&x[..]])
//!     .boundary(0, AxisBoundary::from_codes(1, 0).unwrap())
//!     .boundary_value(0, Side::Lower, 0.0)
//!     .build()
//!     .unwrap();
//! spline.setup(&f).unwrap();
//!
//! let y = spline.interp_point([1.5]).unwrap();
//! assert!((y.value - 2.25).abs() < 1e-12);
//! assert!(!y.is_extrapolated());
//! ```
use alloc::vec;
use alloc::vec::Vec;
use num_traits::Float;

use crate::boundary::{AxisBoundary, BoundaryKind, Side};
use crate::coefficients::build_coefficients;
use crate::error::{BoundaryIssue, Evaluated, SplineError};
use crate::evaluate::Evaluator;
use crate::grid::{check_bounds, GridDescriptor, GridOptions};

pub type Spline1D<T> = Spline<T, 1>;
pub type Spline2D<T> = Spline<T, 2>;
pub type Spline3D<T> = Spline<T, 3>;

/// Cardinality of a query, stated by the caller.
#[derive(Clone, Copy, Debug)]
pub enum Query<'a, T, const N: usize> {
    /// One point
    Point([T; N]),
    /// Independent points, one coordinate slice per axis, all the same length
    Cloud([&'a [T]; N]),
    /// Every combination of the per-axis coordinates, output in C order
    Array([&'a [T]; N]),
}

/// Cubic spline on an `N`-dimensional rectilinear grid, for `N` in 1..=3.
///
/// Evaluation borrows the handle immutably, so one ready spline can be
/// shared across threads. `setup` and boundary value updates take
/// `&mut self` and are serialized by the borrow checker.
///
/// With the `serde` feature, a deserialized handle is checked the same
/// way a constructed one is: axes are packaged again, boundary values
/// must fit their conditions, and a ready handle must carry a complete
/// coefficient array.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Spline<T, const N: usize> {
    grids: Vec<GridDescriptor<T>>,
    boundaries: Vec<AxisBoundary>,
    /// Per axis and side, one value per node of the other axes (C order)
    boundary_values: Vec<[Option<Vec<T>>; 2]>,
    /// Empty until setup succeeds
    coefs: Vec<T>,
    ready: bool,
}

/// The serialized fields of a [`Spline`], before validation.
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
#[serde(bound(deserialize = "T: Float + serde::Deserialize<'de>"))]
struct SplineParts<T> {
    grids: Vec<GridDescriptor<T>>,
    boundaries: Vec<AxisBoundary>,
    boundary_values: Vec<[Option<Vec<T>>; 2]>,
    coefs: Vec<T>,
    ready: bool,
}

#[cfg(feature = "serde")]
impl<'de, T, const N: usize> serde::Deserialize<'de> for Spline<T, N>
where
    T: Float + serde::Deserialize<'de>,
{
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let parts = SplineParts::<T>::deserialize(deserializer)?;
        Self::from_parts(parts).map_err(serde::de::Error::custom)
    }
}

impl<T: Float, const N: usize> Spline<T, N> {
    const VALID_DIMS: () = assert!(N >= 1 && N <= 3, "splines are 1, 2 or 3 dimensional");

    /// Package the axes and record the boundary conditions.
    /// Coefficients are not computed until [`Spline::setup`].
    ///
    /// Conditions that take a value must have it supplied through
    /// [`Spline::set_boundary_values`] before setup; use
    /// [`Spline::builder`] to supply everything at once.
    ///
    /// # Errors
    /// * If any axis is invalid
    /// * If any axis is too short for its boundary conditions
    pub fn new(axes: [&[T]; N], boundaries: [AxisBoundary; N]) -> Result<Self, SplineError> {
        Self::assemble(axes, boundaries, &GridOptions::default())
    }

    /// Start a builder with not-a-knot conditions on every axis.
    pub fn builder(axes: [&[T]; N]) -> SplineBuilder<'_, T, N> {
        SplineBuilder::new(axes)
    }

    fn assemble(
        axes: [&[T]; N],
        boundaries: [AxisBoundary; N],
        options: &GridOptions<T>,
    ) -> Result<Self, SplineError> {
        #[allow(clippy::let_unit_value)]
        let () = Self::VALID_DIMS;

        let mut grids = Vec::with_capacity(N);
        for (axis, boundary) in axes.iter().zip(boundaries.iter()) {
            let grid = GridDescriptor::pack_with(axis, boundary.is_periodic(), options)?;
            boundary.check_len(grid.len())?;
            grids.push(grid);
        }

        Ok(Self {
            grids,
            boundaries: boundaries.to_vec(),
            boundary_values: vec![[None, None]; N],
            coefs: Vec::new(),
            ready: false,
        })
    }

    /// Rebuild a handle from deserialized fields, rejecting anything
    /// `new`, `set_boundary_values` and `setup` could not have produced.
    #[cfg(feature = "serde")]
    fn from_parts(parts: SplineParts<T>) -> Result<Self, SplineError> {
        #[allow(clippy::let_unit_value)]
        let () = Self::VALID_DIMS;

        for (context, got) in [
            ("deserialized grids", parts.grids.len()),
            ("deserialized boundaries", parts.boundaries.len()),
            ("deserialized boundary values", parts.boundary_values.len()),
        ] {
            if got != N {
                return Err(SplineError::ShapeMismatch {
                    context,
                    expected: N,
                    got,
                });
            }
        }

        let mut grids = Vec::with_capacity(N);
        let mut boundaries = Vec::with_capacity(N);
        for (grid, boundary) in parts.grids.into_iter().zip(parts.boundaries) {
            let boundary = AxisBoundary::new(boundary.lower(), boundary.upper())?;
            // Periodicity of the axis follows its boundary conditions
            let grid = if grid.is_periodic() == boundary.is_periodic() {
                grid
            } else {
                GridDescriptor::pack_with(grid.knots(), boundary.is_periodic(), &grid.options())?
            };
            boundary.check_len(grid.len())?;
            grids.push(grid);
            boundaries.push(boundary);
        }

        let mut spline = Self {
            grids,
            boundaries,
            boundary_values: vec![[None, None]; N],
            coefs: Vec::new(),
            ready: false,
        };
        for (axis, [lower, upper]) in parts.boundary_values.into_iter().enumerate() {
            for (side, values) in [(Side::Lower, lower), (Side::Upper, upper)] {
                if let Some(values) = values {
                    spline.set_boundary_values(axis, side, values)?;
                }
            }
        }

        // A handle that was not ready carries no coefficients
        if parts.ready {
            spline.check_boundary_values_present()?;
            let nnodes: usize = spline.grids.iter().map(|g| g.len()).product();
            let expected = nnodes << N;
            if parts.coefs.len() != expected {
                return Err(SplineError::ShapeMismatch {
                    context: "coefficient array",
                    expected,
                    got: parts.coefs.len(),
                });
            }
            spline.coefs = parts.coefs;
            spline.ready = true;
        }
        Ok(spline)
    }

    /// Set the boundary values for one side of one axis, one per node of
    /// the remaining axes in C order (a single value in 1D).
    ///
    /// Invalidates any previous setup.
    ///
    /// # Errors
    /// * If `axis` is out of range
    /// * If that side's condition does not take a value
    /// * If the number of values does not match the other axes
    pub fn set_boundary_values(
        &mut self,
        axis: usize,
        side: Side,
        values: Vec<T>,
    ) -> Result<(), SplineError> {
        let expected = self.boundary_len(axis)?;
        if !self.boundaries[axis].side(side).needs_value() {
            return Err(BoundaryIssue::UnexpectedValue { axis, side }.into());
        }
        if values.len() != expected {
            return Err(SplineError::ShapeMismatch {
                context: "boundary values",
                expected,
                got: values.len(),
            });
        }

        self.boundary_values[axis][side.index()] = Some(values);
        self.invalidate();
        Ok(())
    }

    /// Set the same boundary value at every node of one side of one axis.
    pub fn set_boundary_value(&mut self, axis: usize, side: Side, value: T) -> Result<(), SplineError> {
        let n = self.boundary_len(axis)?;
        self.set_boundary_values(axis, side, vec![value; n])
    }

    /// Number of boundary values on either side of `axis`.
    fn boundary_len(&self, axis: usize) -> Result<usize, SplineError> {
        if axis >= N {
            return Err(SplineError::AxisOutOfRange { axis, ndims: N });
        }
        let nnodes: usize = self.grids.iter().map(|g| g.len()).product();
        Ok(nnodes / self.grids[axis].len())
    }

    fn check_boundary_values_present(&self) -> Result<(), SplineError> {
        for (axis, boundary) in self.boundaries.iter().enumerate() {
            for side in [Side::Lower, Side::Upper] {
                let given = self.boundary_values[axis][side.index()].is_some();
                if boundary.side(side).needs_value() && !given {
                    return Err(BoundaryIssue::MissingValue { axis, side }.into());
                }
            }
        }
        Ok(())
    }

    fn invalidate(&mut self) {
        self.ready = false;
        self.coefs.clear();
    }

    /// Compute the coefficients for a C-ordered array of samples
    /// (first axis slowest), replacing any previous state.
    ///
    /// Along periodic axes the last sample is replaced by the first.
    ///
    /// # Errors
    /// * If a required boundary value was never supplied
    /// * If `values` does not match the grid shape
    /// * If a coefficient system is singular
    ///
    /// On error the spline is left not ready.
    pub fn setup(&mut self, values: &[T]) -> Result<(), SplineError> {
        self.invalidate();
        self.check_boundary_values_present()?;

        self.coefs = build_coefficients(
            &self.grids,
            &self.boundaries,
            &self.boundary_values,
            values,
        )?;
        self.ready = true;

        tracing::debug!(
            ndims = N,
            shape = ?self.shape(),
            uniform = ?self.linear_flags(),
            periodic = ?self.periodic_flags(),
            "spline setup complete"
        );
        Ok(())
    }

    fn evaluator(&self) -> Result<Evaluator<'_, T, N>, SplineError> {
        if !self.ready {
            return Err(SplineError::NotReady);
        }
        Evaluator::new(&self.grids, &self.coefs)
    }

    /// Interpolated value at one point.
    pub fn interp_point(&self, x: [T; N]) -> Result<Evaluated<T>, SplineError> {
        self.derivative_point([0; N], x)
    }

    /// Interpolated values at independent points.
    pub fn interp_cloud(&self, x: [&[T]; N]) -> Result<Evaluated<Vec<T>>, SplineError> {
        self.derivative_cloud([0; N], x)
    }

    /// Interpolated values on the cross product of the per-axis coordinates.
    pub fn interp_array(&self, x: [&[T]; N]) -> Result<Evaluated<Vec<T>>, SplineError> {
        self.derivative_array([0; N], x)
    }

    /// Partial derivative at one point; `orders[i]` in 0..=2 is the number
    /// of derivatives taken along axis `i`.
    ///
    /// # Errors
    /// * If the spline is not ready
    /// * If an order exceeds 2
    /// * If a coordinate is not finite
    pub fn derivative_point(&self, orders: [u8; N], x: [T; N]) -> Result<Evaluated<T>, SplineError> {
        let (value, clamped) = self.evaluator()?.eval_one(x, orders)?;
        let clamped = if clamped { vec![0] } else { Vec::new() };
        log_clamped(&clamped);
        Ok(Evaluated::from_flags(value, clamped))
    }

    /// Partial derivative at independent points.
    ///
    /// # Errors
    /// * As [`Spline::derivative_point`]
    /// * If the coordinate slices differ in length
    pub fn derivative_cloud(
        &self,
        orders: [u8; N],
        x: [&[T]; N],
    ) -> Result<Evaluated<Vec<T>>, SplineError> {
        let evaluator = self.evaluator()?;
        let mut out = vec![T::zero(); x[0].len()];
        let clamped = evaluator.eval_cloud(x, orders, &mut out)?;
        log_clamped(&clamped);
        Ok(Evaluated::from_flags(out, clamped))
    }

    /// Partial derivative on the cross product of the per-axis coordinates,
    /// in C order.
    ///
    /// # Errors
    /// * As [`Spline::derivative_point`]
    pub fn derivative_array(
        &self,
        orders: [u8; N],
        x: [&[T]; N],
    ) -> Result<Evaluated<Vec<T>>, SplineError> {
        let evaluator = self.evaluator()?;
        let total: usize = x.iter().map(|xx| xx.len()).product();
        let mut out = vec![T::zero(); total];
        let clamped = evaluator.eval_array(x, orders, &mut out)?;
        log_clamped(&clamped);
        Ok(Evaluated::from_flags(out, clamped))
    }

    /// Interpolate for a query of any cardinality.
    /// A point query returns a single-entry vector.
    pub fn interp(&self, query: Query<'_, T, N>) -> Result<Evaluated<Vec<T>>, SplineError> {
        self.derivative([0; N], query)
    }

    /// Partial derivative for a query of any cardinality.
    pub fn derivative(
        &self,
        orders: [u8; N],
        query: Query<'_, T, N>,
    ) -> Result<Evaluated<Vec<T>>, SplineError> {
        match query {
            Query::Point(x) => {
                let Evaluated { value, warning } = self.derivative_point(orders, x)?;
                Ok(Evaluated {
                    value: vec![value],
                    warning,
                })
            }
            Query::Cloud(x) => self.derivative_cloud(orders, x),
            Query::Array(x) => self.derivative_array(orders, x),
        }
    }

    /// Per axis, whether any of the coordinates lie outside the domain
    /// of a non-periodic axis.
    pub fn check_bounds(&self, x: [&[T]; N]) -> Result<[bool; N], SplineError> {
        let mut out = [false; N];
        check_bounds(&self.grids, &x, &mut out)?;
        Ok(out)
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn ndims(&self) -> usize {
        N
    }

    pub fn grids(&self) -> &[GridDescriptor<T>] {
        &self.grids
    }

    pub fn boundaries(&self) -> &[AxisBoundary] {
        &self.boundaries
    }

    /// Boundary values for one side of one axis, if supplied.
    pub fn boundary_values(&self, axis: usize, side: Side) -> Option<&[T]> {
        self.boundary_values
            .get(axis)
            .and_then(|bv| bv[side.index()].as_deref())
    }

    /// Number of knots along each axis.
    pub fn shape(&self) -> [usize; N] {
        let mut shape = [0; N];
        for (s, g) in shape.iter_mut().zip(self.grids.iter()) {
            *s = g.len();
        }
        shape
    }

    /// Per axis, whether the knots are evenly spaced.
    pub fn linear_flags(&self) -> [bool; N] {
        let mut flags = [false; N];
        for (f, g) in flags.iter_mut().zip(self.grids.iter()) {
            *f = g.is_uniform();
        }
        flags
    }

    fn periodic_flags(&self) -> [bool; N] {
        let mut flags = [false; N];
        for (f, g) in flags.iter_mut().zip(self.grids.iter()) {
            *f = g.is_periodic();
        }
        flags
    }

    /// The coefficient array, `2^N` entries per node in C node order.
    /// `None` before setup.
    pub fn coefficients(&self) -> Option<&[T]> {
        self.ready.then_some(self.coefs.as_slice())
    }

    /// The function value at every node, in C order. `None` before setup.
    pub fn values(&self) -> Option<Vec<T>> {
        self.ready
            .then(|| self.coefs.iter().step_by(1 << N).copied().collect())
    }
}

fn log_clamped(clamped: &[usize]) {
    if !clamped.is_empty() {
        tracing::debug!(count = clamped.len(), "clamped out-of-range query points");
    }
}

/// A boundary value as given to the builder, before the grid shape is known.
#[derive(Clone, Debug)]
enum BoundaryValue<T> {
    Scalar(T),
    Array(Vec<T>),
}

/// Collects axes, boundary conditions, boundary values and options,
/// then validates them together in [`SplineBuilder::build`].
///
/// Errors from individual setters (an axis index out of range, say) are
/// held and reported by `build`.
#[derive(Clone, Debug)]
pub struct SplineBuilder<'a, T, const N: usize> {
    axes: [&'a [T]; N],
    boundaries: [AxisBoundary; N],
    values: Vec<(usize, Side, BoundaryValue<T>)>,
    options: GridOptions<T>,
    error: Option<SplineError>,
}

impl<'a, T: Float, const N: usize> SplineBuilder<'a, T, N> {
    pub fn new(axes: [&'a [T]; N]) -> Self {
        Self {
            axes,
            boundaries: [AxisBoundary::not_a_knot(); N],
            values: Vec::new(),
            options: GridOptions::default(),
            error: None,
        }
    }

    fn fail(&mut self, err: SplineError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    fn axis_ok(&mut self, axis: usize) -> bool {
        if axis < N {
            return true;
        }
        self.fail(SplineError::AxisOutOfRange { axis, ndims: N });
        false
    }

    /// Boundary conditions for one axis.
    pub fn boundary(mut self, axis: usize, boundary: AxisBoundary) -> Self {
        if self.axis_ok(axis) {
            self.boundaries[axis] = boundary;
        }
        self
    }

    /// Boundary conditions for every axis from PSPLINE code pairs.
    pub fn boundary_codes(mut self, codes: [(i32, i32); N]) -> Self {
        for (axis, (lower, upper)) in codes.into_iter().enumerate() {
            match AxisBoundary::from_codes(lower, upper) {
                Ok(b) => self.boundaries[axis] = b,
                Err(e) => self.fail(e),
            }
        }
        self
    }

    /// One boundary value, broadcast over the nodes of the other axes.
    pub fn boundary_value(mut self, axis: usize, side: Side, value: T) -> Self {
        if self.axis_ok(axis) {
            self.values.push((axis, side, BoundaryValue::Scalar(value)));
        }
        self
    }

    /// Boundary values, one per node of the other axes in C order.
    pub fn boundary_values(mut self, axis: usize, side: Side, values: Vec<T>) -> Self {
        if self.axis_ok(axis) {
            self.values.push((axis, side, BoundaryValue::Array(values)));
        }
        self
    }

    /// Relative tolerance for uniform spacing detection and the
    /// out-of-range slack.
    pub fn tolerance(mut self, tolerance: T) -> Self {
        self.options.tolerance = tolerance;
        self
    }

    /// # Errors
    /// * Any error held from a setter
    /// * If any axis is invalid or too short for its conditions
    /// * If a condition that takes a value has none, or one that does not has one
    /// * If a boundary value array does not match the other axes
    pub fn build(self) -> Result<Spline<T, N>, SplineError> {
        if let Some(err) = self.error {
            return Err(err);
        }

        let mut spline = Spline::assemble(self.axes, self.boundaries, &self.options)?;
        for (axis, side, value) in self.values {
            match value {
                BoundaryValue::Scalar(v) => spline.set_boundary_value(axis, side, v)?,
                BoundaryValue::Array(v) => spline.set_boundary_values(axis, side, v)?,
            }
        }
        spline.check_boundary_values_present()?;
        Ok(spline)
    }
}

impl<T, const N: usize> Spline<T, N> {
    /// Boundary condition kinds, lower and upper, per axis.
    pub fn boundary_kinds(&self) -> Vec<[BoundaryKind; 2]> {
        self.boundaries
            .iter()
            .map(|b| [b.lower(), b.upper()])
            .collect()
    }
}
