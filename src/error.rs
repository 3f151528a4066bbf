//! Error and warning types shared by grid packaging, coefficient
//! construction and evaluation.
//!
//! Hard failures are reported through [`SplineError`]. Evaluation that
//! succeeds but had to clamp query points onto the grid is not an error;
//! it returns an [`Evaluated`] carrying a [`Warning`].
use alloc::vec::Vec;
use thiserror::Error;

use crate::boundary::{BoundaryKind, Side};

/// Failures from spline construction, setup and evaluation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SplineError {
    /// A coordinate axis is too short, not strictly increasing, or not finite.
    #[error("invalid grid: {0}")]
    InvalidGrid(GridIssue),

    /// Illegal boundary condition selection or a missing boundary value.
    #[error("invalid boundary condition: {0}")]
    InvalidBoundaryCondition(BoundaryIssue),

    /// An input array does not have the length implied by the grid.
    #[error("shape mismatch in {context}: expected {expected}, got {got}")]
    ShapeMismatch {
        context: &'static str,
        expected: usize,
        got: usize,
    },

    /// The coefficient system could not be solved.
    #[error("singular coefficient system (pivot {row})")]
    SingularSystem { row: usize },

    /// Evaluation was attempted before a successful `setup`.
    #[error("spline coefficients have not been set up")]
    NotReady,

    /// Only derivative orders 0, 1 and 2 are tabulated.
    #[error("derivative order {order} on axis {axis} is not supported (max 2)")]
    InvalidDerivativeOrder { axis: usize, order: u8 },

    /// Axis index past the dimensionality of the spline.
    #[error("axis {axis} out of range for a {ndims}-dimensional spline")]
    AxisOutOfRange { axis: usize, ndims: usize },

    /// A query coordinate was NaN or infinite.
    #[error("non-finite query coordinate on axis {axis}")]
    NonFiniteCoordinate { axis: usize },

    /// A numeric conversion could not be represented in the target type.
    #[error("unrepresentable number")]
    Unrepresentable,
}

/// Detail for [`SplineError::InvalidGrid`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridIssue {
    #[error("axis has {len} points, at least {min} required")]
    TooShort { len: usize, min: usize },

    #[error("axis is not strictly increasing at index {index}")]
    NotIncreasing { index: usize },

    #[error("axis value at index {index} is not finite")]
    NonFinite { index: usize },
}

/// Detail for [`SplineError::InvalidBoundaryCondition`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryIssue {
    #[error("unknown boundary condition code {0}")]
    UnknownCode(i32),

    #[error("periodic boundary conditions must be applied to both sides of an axis")]
    UnpairedPeriodic,

    #[error("boundary condition on axis {axis} ({side:?}) requires a value")]
    MissingValue { axis: usize, side: Side },

    #[error("boundary condition on axis {axis} ({side:?}) does not take a value")]
    UnexpectedValue { axis: usize, side: Side },

    #[error("{kind:?} needs at least {min} points, axis has {len}")]
    TooFewPoints {
        kind: BoundaryKind,
        len: usize,
        min: usize,
    },
}

impl From<GridIssue> for SplineError {
    fn from(value: GridIssue) -> Self {
        SplineError::InvalidGrid(value)
    }
}

impl From<BoundaryIssue> for SplineError {
    fn from(value: BoundaryIssue) -> Self {
        SplineError::InvalidBoundaryCondition(value)
    }
}

/// Non-fatal conditions raised during evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// These query points were outside the grid on at least one
    /// non-periodic axis and were evaluated at the clamped location.
    ///
    /// Indices refer to the query order; for array queries they are
    /// C-order flat indices into the output.
    Extrapolated { points: Vec<usize> },
}

/// A successfully computed evaluation, possibly with a warning attached.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluated<V> {
    pub value: V,
    pub warning: Option<Warning>,
}

impl<V> Evaluated<V> {
    pub(crate) fn from_flags(value: V, clamped: Vec<usize>) -> Self {
        let warning = if clamped.is_empty() {
            None
        } else {
            Some(Warning::Extrapolated { points: clamped })
        };
        Self { value, warning }
    }

    /// Whether any query point was clamped onto the grid.
    pub fn is_extrapolated(&self) -> bool {
        matches!(self.warning, Some(Warning::Extrapolated { .. }))
    }

    /// Indices of clamped query points, empty if none.
    pub fn extrapolated_points(&self) -> &[usize] {
        match &self.warning {
            Some(Warning::Extrapolated { points }) => points,
            None => &[],
        }
    }

    /// Discard the warning and keep the value.
    pub fn into_value(self) -> V {
        self.value
    }
}
