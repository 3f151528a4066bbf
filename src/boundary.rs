//! Boundary conditions for each axis of a spline.
//!
//! Each axis carries one [`BoundaryKind`] per side. The numeric codes
//! follow PSPLINE (`0` not-a-knot, `-1` periodic, `1..=7` explicit or
//! estimated end derivatives) and are accepted via [`BoundaryKind::from_code`]
//! for compatibility, but the rest of the crate only deals in the enum.
use crate::error::{BoundaryIssue, SplineError};

/// Which end of an axis a boundary condition applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Side {
    /// The minimum end of the axis
    Lower,
    /// The maximum end of the axis
    Upper,
}

impl Side {
    pub(crate) const fn index(self) -> usize {
        match self {
            Side::Lower => 0,
            Side::Upper => 1,
        }
    }
}

/// A one-sided boundary condition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BoundaryKind {
    /// Third derivative continuous across the first/last interior knot
    #[default]
    NotAKnot,
    /// Wrap around to the other end of the axis
    Periodic,
    /// Match a given first derivative
    Slope,
    /// Match a given second derivative
    SecondDerivative,
    /// First derivative is zero
    ZeroSlope,
    /// Second derivative is zero
    ZeroSecondDerivative,
    /// First derivative matches the first divided difference of the end samples
    FirstDividedDifference,
    /// Second derivative matches the second divided difference of the end samples
    SecondDividedDifference,
    /// Third derivative matches the third divided difference of the end samples
    ThirdDividedDifference,
}

impl BoundaryKind {
    /// Parse a PSPLINE boundary condition code.
    pub fn from_code(code: i32) -> Result<Self, SplineError> {
        let kind = match code {
            -1 => BoundaryKind::Periodic,
            0 => BoundaryKind::NotAKnot,
            1 => BoundaryKind::Slope,
            2 => BoundaryKind::SecondDerivative,
            3 => BoundaryKind::ZeroSlope,
            4 => BoundaryKind::ZeroSecondDerivative,
            5 => BoundaryKind::FirstDividedDifference,
            6 => BoundaryKind::SecondDividedDifference,
            7 => BoundaryKind::ThirdDividedDifference,
            _ => return Err(BoundaryIssue::UnknownCode(code).into()),
        };
        Ok(kind)
    }

    /// The PSPLINE code for this condition.
    pub const fn code(self) -> i32 {
        match self {
            BoundaryKind::Periodic => -1,
            BoundaryKind::NotAKnot => 0,
            BoundaryKind::Slope => 1,
            BoundaryKind::SecondDerivative => 2,
            BoundaryKind::ZeroSlope => 3,
            BoundaryKind::ZeroSecondDerivative => 4,
            BoundaryKind::FirstDividedDifference => 5,
            BoundaryKind::SecondDividedDifference => 6,
            BoundaryKind::ThirdDividedDifference => 7,
        }
    }

    /// Whether the caller must supply a boundary value for this condition.
    pub const fn needs_value(self) -> bool {
        matches!(self, BoundaryKind::Slope | BoundaryKind::SecondDerivative)
    }

    /// Smallest axis length on which this condition can be imposed.
    pub(crate) const fn min_points(self) -> usize {
        match self {
            BoundaryKind::Periodic | BoundaryKind::SecondDividedDifference => 3,
            BoundaryKind::ThirdDividedDifference => 4,
            _ => 2,
        }
    }
}

impl TryFrom<i32> for BoundaryKind {
    type Error = SplineError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        BoundaryKind::from_code(value)
    }
}

/// The pair of boundary conditions on one axis.
///
/// Periodic conditions come as a pair; the constructor rejects a
/// periodic side matched with a non-periodic one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AxisBoundary {
    lower: BoundaryKind,
    upper: BoundaryKind,
}

impl AxisBoundary {
    /// # Errors
    /// * If exactly one side is periodic
    pub fn new(lower: BoundaryKind, upper: BoundaryKind) -> Result<Self, SplineError> {
        let lower_periodic = lower == BoundaryKind::Periodic;
        let upper_periodic = upper == BoundaryKind::Periodic;
        if lower_periodic != upper_periodic {
            return Err(BoundaryIssue::UnpairedPeriodic.into());
        }
        Ok(Self { lower, upper })
    }

    /// Build from a pair of PSPLINE codes.
    pub fn from_codes(lower: i32, upper: i32) -> Result<Self, SplineError> {
        Self::new(BoundaryKind::from_code(lower)?, BoundaryKind::from_code(upper)?)
    }

    /// Not-a-knot on both sides.
    pub const fn not_a_knot() -> Self {
        Self {
            lower: BoundaryKind::NotAKnot,
            upper: BoundaryKind::NotAKnot,
        }
    }

    /// Periodic on both sides.
    pub const fn periodic() -> Self {
        Self {
            lower: BoundaryKind::Periodic,
            upper: BoundaryKind::Periodic,
        }
    }

    pub const fn lower(&self) -> BoundaryKind {
        self.lower
    }

    pub const fn upper(&self) -> BoundaryKind {
        self.upper
    }

    pub const fn side(&self, side: Side) -> BoundaryKind {
        match side {
            Side::Lower => self.lower,
            Side::Upper => self.upper,
        }
    }

    pub fn is_periodic(&self) -> bool {
        self.lower == BoundaryKind::Periodic
    }

    /// Check that an axis of `len` points can carry these conditions.
    pub(crate) fn check_len(&self, len: usize) -> Result<(), SplineError> {
        for kind in [self.lower, self.upper] {
            let min = kind.min_points();
            if len < min {
                return Err(BoundaryIssue::TooFewPoints { kind, len, min }.into());
            }
        }
        Ok(())
    }
}
