//! Packaging of one coordinate axis for fast interval lookup.
//!
//! A [`GridDescriptor`] is built once per axis from the strictly increasing
//! knot positions. It records whether the spacing is uniform (within a
//! relative tolerance), in which case the containing interval of a query
//! point is found by a single division, or non-uniform, in which case a
//! bisection search over the stored knots is used. Periodic axes also
//! record their period so that query points can be folded into the domain.
use alloc::vec::Vec;
use num_traits::{Float, NumCast};

use crate::error::{GridIssue, SplineError};

/// Relative tolerance used by [`GridOptions::default`].
pub const DEFAULT_TOLERANCE: f64 = 5.0e-7;

/// Tunables for grid packaging.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridOptions<T> {
    /// Relative tolerance for both uniform-spacing detection and the
    /// out-of-range slack, which is `tolerance * (max - min)`.
    pub tolerance: T,
}

impl<T: Float> Default for GridOptions<T> {
    fn default() -> Self {
        // 5e-7 is representable in every Float type we care about;
        // fall back to epsilon for exotic ones.
        let tolerance = <T as NumCast>::from(DEFAULT_TOLERANCE).unwrap_or_else(T::epsilon);
        Self { tolerance }
    }
}

/// Where a query coordinate falls on an axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Location<T> {
    /// Index of the lower knot of the containing interval
    pub index: usize,
    /// Width of the containing interval
    pub step: T,
    /// Normalized coordinate in the interval, in [0, 1]
    pub t: T,
    /// Whether the coordinate was outside the domain and clamped
    pub clamped: bool,
}

/// A packaged coordinate axis.
///
/// With the `serde` feature, deserialization reads only the knots, the
/// periodic flag and the tolerance, and packages the axis again, so
/// derived fields can not go stale and invalid axes are rejected.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct GridDescriptor<T> {
    /// Knot positions, strictly increasing
    knots: Vec<T>,
    /// Interval widths, size knots.len() - 1
    steps: Vec<T>,
    /// Whether all interval widths agree within tolerance
    uniform: bool,
    /// Whether the axis wraps around
    periodic: bool,
    /// Reciprocal of the mean interval width, used for O(1) lookup
    inv_step: T,
    /// Absolute slack allowed outside [min, max] before flagging
    range_tol: T,
    /// Relative tolerance the axis was packaged with
    tolerance: T,
}

/// The fields of a [`GridDescriptor`] that are read back when deserializing.
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct GridParts<T> {
    knots: Vec<T>,
    periodic: bool,
    tolerance: T,
}

#[cfg(feature = "serde")]
impl<'de, T> serde::Deserialize<'de> for GridDescriptor<T>
where
    T: Float + serde::Deserialize<'de>,
{
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let parts = GridParts::<T>::deserialize(deserializer)?;
        let options = GridOptions {
            tolerance: parts.tolerance,
        };
        Self::pack_with(&parts.knots, parts.periodic, &options).map_err(serde::de::Error::custom)
    }
}

impl<T: Float> GridDescriptor<T> {
    /// Package an axis with the default tolerance.
    ///
    /// # Errors
    /// * If the axis has fewer than 2 entries
    /// * If any entry is not finite
    /// * If the axis is not strictly increasing
    pub fn pack(axis: &[T], periodic: bool) -> Result<Self, SplineError> {
        Self::pack_with(axis, periodic, &GridOptions::default())
    }

    /// Package an axis with explicit options.
    pub fn pack_with(
        axis: &[T],
        periodic: bool,
        options: &GridOptions<T>,
    ) -> Result<Self, SplineError> {
        let n = axis.len();
        if n < 2 {
            return Err(GridIssue::TooShort { len: n, min: 2 }.into());
        }
        if let Some(index) = axis.iter().position(|x| !x.is_finite()) {
            return Err(GridIssue::NonFinite { index }.into());
        }
        if let Some(i) = (1..n).find(|&i| axis[i] <= axis[i - 1]) {
            return Err(GridIssue::NotIncreasing { index: i }.into());
        }

        let steps: Vec<T> = axis.windows(2).map(|w| w[1] - w[0]).collect();
        let range = axis[n - 1] - axis[0];
        let nsteps = <T as NumCast>::from(n - 1).ok_or(SplineError::Unrepresentable)?;
        let mean_step = range / nsteps;

        let tol = options.tolerance.abs();
        let uniform = steps
            .iter()
            .all(|&h| (h - mean_step).abs() <= tol * mean_step);

        tracing::debug!(len = n, uniform, periodic, "packaged grid axis");

        Ok(Self {
            knots: axis.to_vec(),
            steps,
            uniform,
            periodic,
            inv_step: mean_step.recip(),
            range_tol: tol * range,
            tolerance: tol,
        })
    }

    pub fn knots(&self) -> &[T] {
        &self.knots
    }

    /// Interval widths, one fewer than the number of knots.
    pub fn steps(&self) -> &[T] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.knots.len()
    }

    /// Always false; a packaged axis has at least two knots.
    pub fn is_empty(&self) -> bool {
        self.knots.is_empty()
    }

    pub fn is_uniform(&self) -> bool {
        self.uniform
    }

    pub fn is_periodic(&self) -> bool {
        self.periodic
    }

    /// Options that reproduce this axis' packaging.
    pub fn options(&self) -> GridOptions<T> {
        GridOptions {
            tolerance: self.tolerance,
        }
    }

    pub fn min(&self) -> T {
        self.knots[0]
    }

    pub fn max(&self) -> T {
        self.knots[self.knots.len() - 1]
    }

    /// Wrap length of the axis, `max - min`.
    pub fn period(&self) -> T {
        self.max() - self.min()
    }

    /// Whether `x` lies in the domain, allowing the range tolerance.
    pub fn contains(&self, x: T) -> bool {
        x >= self.min() - self.range_tol && x <= self.max() + self.range_tol
    }

    /// Locate the interval containing `x`.
    ///
    /// Periodic axes fold `x` into `[min, max)` first. On other axes,
    /// coordinates outside the domain (beyond the range tolerance) are
    /// clamped to the nearest end and flagged.
    ///
    /// # Errors
    /// * If `x` is not finite. The descriptor does not know its own axis
    ///   index, so the error reports axis 0; callers that do know it
    ///   relabel the error.
    #[inline]
    pub fn locate(&self, x: T) -> Result<Location<T>, SplineError> {
        if !x.is_finite() {
            return Err(SplineError::NonFiniteCoordinate { axis: 0 });
        }

        let (lo, hi) = (self.min(), self.max());
        let mut clamped = false;
        let x = if self.periodic {
            let period = hi - lo;
            let mut r = (x - lo) % period;
            if r < T::zero() {
                r = r + period;
            }
            // Rounding in the addition above can land exactly on the period
            if r >= period {
                r = T::zero();
            }
            lo + r
        } else if x < lo {
            clamped = x < lo - self.range_tol;
            lo
        } else if x > hi {
            clamped = x > hi + self.range_tol;
            hi
        } else {
            x
        };

        let index = self.index(x)?;
        let step = self.steps[index];
        let t = ((x - self.knots[index]) / step).max(T::zero()).min(T::one());

        Ok(Location {
            index,
            step,
            t,
            clamped,
        })
    }

    /// Index of the lower knot of the interval containing `x`,
    /// which must already be inside [min, max].
    #[inline]
    fn index(&self, x: T) -> Result<usize, SplineError> {
        let imax = self.knots.len() - 2;
        if self.uniform {
            // Nominal location; spacing is only uniform within tolerance,
            // so nudge until the knots actually bracket `x`.
            let floc = ((x - self.knots[0]) * self.inv_step).floor();
            let iloc = <isize as NumCast>::from(floc).ok_or(SplineError::Unrepresentable)?;
            let mut i = (iloc.max(0) as usize).min(imax);
            while i > 0 && x < self.knots[i] {
                i -= 1;
            }
            while i < imax && x >= self.knots[i + 1] {
                i += 1;
            }
            Ok(i)
        } else {
            let i = self.knots.partition_point(|k| *k <= x);
            Ok(i.saturating_sub(1).min(imax))
        }
    }
}

/// Check whether a set of query points are inside each axis of a grid.
///
/// Output entry `i` is set to `true` if any coordinate on axis `i` is
/// outside the domain of a non-periodic axis (beyond the range tolerance).
///
/// # Errors
/// * If the number of query axes or the output length does not match the grid
pub fn check_bounds<T: Float>(
    grids: &[GridDescriptor<T>],
    obs: &[&[T]],
    out: &mut [bool],
) -> Result<(), SplineError> {
    let ndims = grids.len();
    if obs.len() != ndims {
        return Err(SplineError::ShapeMismatch {
            context: "check_bounds observation axes",
            expected: ndims,
            got: obs.len(),
        });
    }
    if out.len() != ndims {
        return Err(SplineError::ShapeMismatch {
            context: "check_bounds output",
            expected: ndims,
            got: out.len(),
        });
    }
    for i in 0..ndims {
        let grid = &grids[i];
        out[i] = !grid.is_periodic() && obs[i].iter().any(|&x| !grid.contains(x));
    }
    Ok(())
}
