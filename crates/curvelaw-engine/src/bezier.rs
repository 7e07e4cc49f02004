//! Cubic Bezier control points and De Casteljau subdivision.
//!
//! A candidate trajectory is the cubic curve
//! `g(t) = (1-t)^3 P0 + 3(1-t)^2 t P1 + 3(1-t) t^2 P2 + t^3 P3`
//! over `t in [0, 1]`. The curve interpolates its endpoints exactly and
//! lies inside the convex hull of its control polygon; subdivision via
//! [`ControlPoints::de_casteljau_split`] shrinks that polygon onto the
//! curve, which is what makes hull tests conclusive in the limit.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state_vector::StateVector;

// ---------------------------------------------------------------------------
// GeometryError
// ---------------------------------------------------------------------------

/// Rejected constructions. These are caller mistakes, not verdicts.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GeometryError {
    /// The four control points must share one dimension.
    #[error("control point dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

// ---------------------------------------------------------------------------
// ControlPoints
// ---------------------------------------------------------------------------

/// The four control points of a cubic Bezier trajectory.
///
/// Immutable once constructed; all four points share one dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlPoints {
    p0: StateVector,
    p1: StateVector,
    p2: StateVector,
    p3: StateVector,
}

impl ControlPoints {
    /// Construct from four points of equal dimension.
    pub fn new(
        p0: StateVector,
        p1: StateVector,
        p2: StateVector,
        p3: StateVector,
    ) -> Result<Self, GeometryError> {
        let expected = p0.dim();
        for point in [&p1, &p2, &p3] {
            if point.dim() != expected {
                return Err(GeometryError::DimensionMismatch {
                    expected,
                    actual: point.dim(),
                });
            }
        }
        Ok(Self { p0, p1, p2, p3 })
    }

    /// The straight-line trajectory from `a` to `b` expressed as a cubic:
    /// interior points sit at one third and two thirds of the chord.
    pub fn linear(a: &StateVector, b: &StateVector) -> Self {
        debug_assert_eq!(a.dim(), b.dim());
        Self {
            p0: a.clone(),
            p1: a.lerp(b, 1.0 / 3.0),
            p2: a.lerp(b, 2.0 / 3.0),
            p3: b.clone(),
        }
    }

    /// Shared dimension of the control points.
    pub fn dim(&self) -> usize {
        self.p0.dim()
    }

    /// First control point (the current state).
    pub fn p0(&self) -> &StateVector {
        &self.p0
    }

    /// Second control point.
    pub fn p1(&self) -> &StateVector {
        &self.p1
    }

    /// Third control point.
    pub fn p2(&self) -> &StateVector {
        &self.p2
    }

    /// Fourth control point (the proposed state).
    pub fn p3(&self) -> &StateVector {
        &self.p3
    }

    /// The control polygon in order.
    pub fn points(&self) -> [&StateVector; 4] {
        [&self.p0, &self.p1, &self.p2, &self.p3]
    }

    /// A copy with control point `index` replaced.
    ///
    /// Used by repair estimation to probe how the curve moves under a
    /// control-point nudge. `index` must be in `0..4` and `point` must
    /// match the curve dimension.
    pub fn with_point(&self, index: usize, point: StateVector) -> Self {
        debug_assert!(index < 4);
        debug_assert_eq!(point.dim(), self.dim());
        let mut copy = self.clone();
        match index {
            0 => copy.p0 = point,
            1 => copy.p1 = point,
            2 => copy.p2 = point,
            _ => copy.p3 = point,
        }
        copy
    }

    /// Evaluate the curve at `t`.
    pub fn evaluate(&self, t: f64) -> StateVector {
        let u = 1.0 - t;
        let b0 = u * u * u;
        let b1 = 3.0 * u * u * t;
        let b2 = 3.0 * u * t * t;
        let b3 = t * t * t;
        let components = (0..self.dim())
            .map(|i| b0 * self.p0[i] + b1 * self.p1[i] + b2 * self.p2[i] + b3 * self.p3[i])
            .collect();
        StateVector::new(components)
    }

    /// The curve derivative at `t`:
    /// `3[(1-t)^2 (P1-P0) + 2(1-t)t (P2-P1) + t^2 (P3-P2)]`.
    pub fn derivative(&self, t: f64) -> StateVector {
        let u = 1.0 - t;
        let w0 = 3.0 * u * u;
        let w1 = 6.0 * u * t;
        let w2 = 3.0 * t * t;
        let components = (0..self.dim())
            .map(|i| {
                w0 * (self.p1[i] - self.p0[i])
                    + w1 * (self.p2[i] - self.p1[i])
                    + w2 * (self.p3[i] - self.p2[i])
            })
            .collect();
        StateVector::new(components)
    }

    /// Split at parameter `s` by the triangular De Casteljau scheme.
    ///
    /// The left half covers `[0, s]` of the original parameter range and
    /// the right half `[s, 1]`: `left.evaluate(u) == self.evaluate(s * u)`
    /// and `right.evaluate(u) == self.evaluate(s + (1 - s) * u)`, with
    /// `left.p3 == right.p0 == self.evaluate(s)`.
    pub fn de_casteljau_split(&self, s: f64) -> (Self, Self) {
        let p01 = self.p0.lerp(&self.p1, s);
        let p12 = self.p1.lerp(&self.p2, s);
        let p23 = self.p2.lerp(&self.p3, s);
        let p012 = p01.lerp(&p12, s);
        let p123 = p12.lerp(&p23, s);
        let p0123 = p012.lerp(&p123, s);
        let left = Self {
            p0: self.p0.clone(),
            p1: p01,
            p2: p012,
            p3: p0123.clone(),
        };
        let right = Self {
            p0: p0123,
            p1: p123,
            p2: p23,
            p3: self.p3.clone(),
        };
        (left, right)
    }
}

// ---------------------------------------------------------------------------
// Bernstein basis
// ---------------------------------------------------------------------------

/// The Bernstein basis polynomial `C(n,i) t^i (1-t)^(n-i)`.
///
/// Out-of-range `i > n` yields zero. For `t in [0, 1]` the degree-n basis
/// is a partition of unity: every value is nonnegative and the n+1 values
/// sum to one.
pub fn bernstein(i: usize, n: usize, t: f64) -> f64 {
    if i > n {
        return 0.0;
    }
    binomial(n, i) as f64 * t.powi(i as i32) * (1.0 - t).powi((n - i) as i32)
}

/// Binomial coefficient by the multiplicative formula.
fn binomial(n: usize, k: usize) -> u64 {
    let k = k.min(n - k);
    let mut result: u64 = 1;
    for step in 0..k {
        result = result * (n - step) as u64 / (step + 1) as u64;
    }
    result
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_curve() -> ControlPoints {
        ControlPoints::new(
            StateVector::from([0.0, 0.0]),
            StateVector::from([1.0, 3.0]),
            StateVector::from([2.0, -1.0]),
            StateVector::from([3.0, 0.0]),
        )
        .unwrap()
    }

    #[test]
    fn new_rejects_mixed_dimensions() {
        let err = ControlPoints::new(
            StateVector::from([0.0, 0.0]),
            StateVector::from([1.0]),
            StateVector::from([2.0, 2.0]),
            StateVector::from([3.0, 3.0]),
        )
        .unwrap_err();
        assert_eq!(
            err,
            GeometryError::DimensionMismatch {
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn endpoints_interpolate_exactly() {
        let cp = sample_curve();
        assert_eq!(cp.evaluate(0.0), *cp.p0());
        assert_eq!(cp.evaluate(1.0), *cp.p3());
    }

    #[test]
    fn linear_midpoint_is_chord_midpoint() {
        let a = StateVector::from([1.0, 1.0]);
        let b = StateVector::from([3.0, 5.0]);
        let cp = ControlPoints::linear(&a, &b);
        let mid = cp.evaluate(0.5);
        assert!(mid.approx_eq(&StateVector::from([2.0, 3.0]), 1e-12));
    }

    #[test]
    fn endpoint_derivatives_match_control_legs() {
        let cp = sample_curve();
        let at_start = cp.derivative(0.0);
        let at_end = cp.derivative(1.0);
        let start_leg = cp.p1().sub(cp.p0()).scale(3.0);
        let end_leg = cp.p3().sub(cp.p2()).scale(3.0);
        assert!(at_start.approx_eq(&start_leg, 1e-12));
        assert!(at_end.approx_eq(&end_leg, 1e-12));
    }

    #[test]
    fn split_reparametrizes_both_halves() {
        let cp = sample_curve();
        for s in [0.25, 0.5, 0.75] {
            let (left, right) = cp.de_casteljau_split(s);
            assert_eq!(left.p0(), cp.p0());
            assert_eq!(right.p3(), cp.p3());
            assert!(left.p3().approx_eq(&cp.evaluate(s), 1e-12));
            assert!(right.p0().approx_eq(&cp.evaluate(s), 1e-12));
            for step in 0..=8 {
                let u = f64::from(step) / 8.0;
                assert!(left.evaluate(u).approx_eq(&cp.evaluate(s * u), 1e-8));
                assert!(right
                    .evaluate(u)
                    .approx_eq(&cp.evaluate(s + (1.0 - s) * u), 1e-8));
            }
        }
    }

    #[test]
    fn bernstein_partition_of_unity() {
        for step in 0..=10 {
            let t = f64::from(step) / 10.0;
            let mut sum = 0.0;
            for i in 0..=3 {
                let b = bernstein(i, 3, t);
                assert!(b >= 0.0, "negative basis value at t={t}");
                sum += b;
            }
            assert!((sum - 1.0).abs() < 1e-12, "sum {sum} at t={t}");
        }
    }

    #[test]
    fn bernstein_out_of_range_is_zero() {
        assert_eq!(bernstein(4, 3, 0.5), 0.0);
    }

    #[test]
    fn with_point_replaces_one_point() {
        let cp = sample_curve();
        let moved = cp.with_point(2, StateVector::from([2.0, 7.0]));
        assert_eq!(moved.p2(), &StateVector::from([2.0, 7.0]));
        assert_eq!(moved.p0(), cp.p0());
        assert_eq!(moved.p3(), cp.p3());
    }

    #[test]
    fn serde_round_trip() {
        let cp = sample_curve();
        let json = serde_json::to_string(&cp).unwrap();
        let decoded: ControlPoints = serde_json::from_str(&json).unwrap();
        assert_eq!(cp, decoded);
    }
}
