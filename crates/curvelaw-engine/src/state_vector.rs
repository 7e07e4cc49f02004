//! Fixed-dimension state vectors.
//!
//! A [`StateVector`] is the double-valued encoding of an object's state:
//! one coordinate per registered field. Values are immutable; arithmetic
//! produces new vectors. Dimension agreement is a caller precondition on
//! the componentwise operations and is checked in debug builds.

use std::fmt;
use std::ops::Index;

use serde::{Deserialize, Serialize};

/// An ordered sequence of doubles; the point type of the lawful region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StateVector(Vec<f64>);

impl StateVector {
    /// Construct from components.
    pub fn new(components: Vec<f64>) -> Self {
        Self(components)
    }

    /// The zero vector of a given dimension.
    pub fn zeros(dim: usize) -> Self {
        Self(vec![0.0; dim])
    }

    /// Number of coordinates.
    pub fn dim(&self) -> usize {
        self.0.len()
    }

    /// True for the zero-dimensional vector.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The coordinate at `index`, if in range.
    pub fn get(&self, index: usize) -> Option<f64> {
        self.0.get(index).copied()
    }

    /// Borrow the coordinates.
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Iterate over coordinates.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.iter().copied()
    }

    /// Componentwise sum.
    pub fn add(&self, other: &Self) -> Self {
        debug_assert_eq!(self.dim(), other.dim());
        Self(
            self.0
                .iter()
                .zip(other.0.iter())
                .map(|(a, b)| a + b)
                .collect(),
        )
    }

    /// Componentwise difference.
    pub fn sub(&self, other: &Self) -> Self {
        debug_assert_eq!(self.dim(), other.dim());
        Self(
            self.0
                .iter()
                .zip(other.0.iter())
                .map(|(a, b)| a - b)
                .collect(),
        )
    }

    /// Scalar multiple.
    pub fn scale(&self, factor: f64) -> Self {
        Self(self.0.iter().map(|a| a * factor).collect())
    }

    /// Componentwise linear interpolation toward `other` at parameter `t`.
    pub fn lerp(&self, other: &Self, t: f64) -> Self {
        debug_assert_eq!(self.dim(), other.dim());
        Self(
            self.0
                .iter()
                .zip(other.0.iter())
                .map(|(a, b)| a + (b - a) * t)
                .collect(),
        )
    }

    /// True when every coordinate agrees within `epsilon`.
    pub fn approx_eq(&self, other: &Self, epsilon: f64) -> bool {
        self.dim() == other.dim()
            && self
                .0
                .iter()
                .zip(other.0.iter())
                .all(|(a, b)| (a - b).abs() <= epsilon)
    }
}

impl Index<usize> for StateVector {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}

impl From<Vec<f64>> for StateVector {
    fn from(components: Vec<f64>) -> Self {
        Self(components)
    }
}

impl From<&[f64]> for StateVector {
    fn from(components: &[f64]) -> Self {
        Self(components.to_vec())
    }
}

impl<const N: usize> From<[f64; N]> for StateVector {
    fn from(components: [f64; N]) -> Self {
        Self(components.to_vec())
    }
}

impl fmt::Display for StateVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{value}")?;
        }
        write!(f, ")")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_is_componentwise() {
        let a = StateVector::from([1.0, 2.0]);
        let b = StateVector::from([3.0, 5.0]);
        assert_eq!(a.add(&b), StateVector::from([4.0, 7.0]));
        assert_eq!(b.sub(&a), StateVector::from([2.0, 3.0]));
        assert_eq!(a.scale(2.0), StateVector::from([2.0, 4.0]));
    }

    #[test]
    fn lerp_hits_endpoints_and_midpoint() {
        let a = StateVector::from([0.0, 10.0]);
        let b = StateVector::from([4.0, 0.0]);
        assert_eq!(a.lerp(&b, 0.0), a);
        assert_eq!(a.lerp(&b, 1.0), b);
        assert_eq!(a.lerp(&b, 0.5), StateVector::from([2.0, 5.0]));
    }

    #[test]
    fn approx_eq_respects_epsilon_and_dimension() {
        let a = StateVector::from([1.0]);
        let near = StateVector::from([1.0 + 1e-12]);
        let far = StateVector::from([1.1]);
        assert!(a.approx_eq(&near, 1e-9));
        assert!(!a.approx_eq(&far, 1e-9));
        assert!(!a.approx_eq(&StateVector::from([1.0, 1.0]), 1e-9));
    }

    #[test]
    fn zero_dimension_is_supported() {
        let empty = StateVector::zeros(0);
        assert!(empty.is_empty());
        assert_eq!(empty.add(&empty), empty);
    }

    #[test]
    fn display_renders_tuple() {
        assert_eq!(StateVector::from([1.0, 2.5]).to_string(), "(1, 2.5)");
    }

    #[test]
    fn serde_round_trip() {
        let v = StateVector::from([1.0, -2.25, 0.0]);
        let json = serde_json::to_string(&v).unwrap();
        let decoded: StateVector = serde_json::from_str(&json).unwrap();
        assert_eq!(v, decoded);
    }
}
