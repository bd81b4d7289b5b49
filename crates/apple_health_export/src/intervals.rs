//! Interval primitive with four inclusion policies.
//!
//! Bounds are one homogeneous comparable type — the generic parameter
//! enforces this statically, so the only runtime construction failures are
//! non-comparable values (e.g. NaN) and `lower >= upper`.

use std::cmp::Ordering;

use crate::error::{EtlError, EtlResult};

/// Which bounds an interval includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalKind {
    /// `[a, b]`
    Closed,
    /// `(a, b)`
    Open,
    /// `[a, b)`
    HalfOpenLeft,
    /// `(a, b]`
    HalfOpenRight,
}

/// An immutable span between two comparable boundary values, `a < b`.
#[derive(Debug, Clone, PartialEq)]
pub struct Interval<T> {
    lower: T,
    upper: T,
    kind: IntervalKind,
}

impl<T: PartialOrd> Interval<T> {
    pub fn new(lower: T, upper: T, kind: IntervalKind) -> EtlResult<Self> {
        match lower.partial_cmp(&upper) {
            Some(Ordering::Less) => Ok(Interval { lower, upper, kind }),
            Some(_) => Err(EtlError::Range(
                "lower_end must be < upper_end".to_string(),
            )),
            None => Err(EtlError::TypeMismatch(
                "interval bounds are not comparable".to_string(),
            )),
        }
    }

    pub fn closed(lower: T, upper: T) -> EtlResult<Self> {
        Self::new(lower, upper, IntervalKind::Closed)
    }

    pub fn open(lower: T, upper: T) -> EtlResult<Self> {
        Self::new(lower, upper, IntervalKind::Open)
    }

    pub fn half_open_left(lower: T, upper: T) -> EtlResult<Self> {
        Self::new(lower, upper, IntervalKind::HalfOpenLeft)
    }

    pub fn half_open_right(lower: T, upper: T) -> EtlResult<Self> {
        Self::new(lower, upper, IntervalKind::HalfOpenRight)
    }

    pub fn lower_end(&self) -> &T {
        &self.lower
    }

    pub fn upper_end(&self) -> &T {
        &self.upper
    }

    pub fn kind(&self) -> IntervalKind {
        self.kind
    }

    /// Membership test under this interval's inclusion policy.
    pub fn contains(&self, x: &T) -> bool {
        let above_lower = match self.kind {
            IntervalKind::Closed | IntervalKind::HalfOpenLeft => self.lower <= *x,
            IntervalKind::Open | IntervalKind::HalfOpenRight => self.lower < *x,
        };
        let below_upper = match self.kind {
            IntervalKind::Closed | IntervalKind::HalfOpenRight => *x <= self.upper,
            IntervalKind::Open | IntervalKind::HalfOpenLeft => *x < self.upper,
        };
        above_lower && below_upper
    }

    /// Lexicographic ordering on `(lower_end, upper_end)`.
    ///
    /// Defined only between intervals of the same variant; ordering a
    /// closed interval against a half-open one is a category error, not a
    /// value comparison, so it fails instead of guessing.
    pub fn try_cmp(&self, other: &Self) -> EtlResult<Ordering> {
        if self.kind != other.kind {
            return Err(EtlError::TypeMismatch(format!(
                "cannot compare {:?} interval with {:?} interval",
                self.kind, other.kind
            )));
        }
        let by_lower = self
            .lower
            .partial_cmp(&other.lower)
            .ok_or_else(|| EtlError::TypeMismatch("interval bounds are not comparable".into()))?;
        if by_lower != Ordering::Equal {
            return Ok(by_lower);
        }
        self.upper
            .partial_cmp(&other.upper)
            .ok_or_else(|| EtlError::TypeMismatch("interval bounds are not comparable".into()))
    }
}
