//! Laws: named predicates over state space.
//!
//! A law carries a membership predicate for its region and, optionally, a
//! continuous measure of how lawful a state is. When a measure is present
//! it must be nonnegative exactly where the predicate holds; the verifier
//! uses it to estimate repair directions for rejected trajectories.

use std::fmt;
use std::sync::Arc;

use crate::state_vector::StateVector;

/// Membership predicate of a law's region.
pub type LawPredicate = Arc<dyn Fn(&StateVector) -> bool + Send + Sync>;

/// Continuous lawfulness measure; nonnegative iff the predicate holds.
pub type LawMeasure = Arc<dyn Fn(&StateVector) -> f64 + Send + Sync>;

/// A named predicate over state vectors, with an optional measure.
#[derive(Clone)]
pub struct Law {
    name: String,
    predicate: LawPredicate,
    measure: Option<LawMeasure>,
}

impl Law {
    /// A law from a bare predicate.
    pub fn new(
        name: impl Into<String>,
        predicate: impl Fn(&StateVector) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            predicate: Arc::new(predicate),
            measure: None,
        }
    }

    /// A law with a continuous measure alongside the predicate.
    pub fn with_measure(
        name: impl Into<String>,
        predicate: impl Fn(&StateVector) -> bool + Send + Sync + 'static,
        measure: impl Fn(&StateVector) -> f64 + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            predicate: Arc::new(predicate),
            measure: Some(Arc::new(measure)),
        }
    }

    /// The half-space law `coeffs . x >= offset`, measured by its margin.
    ///
    /// Half-space regions are convex, so hull acceptance is exact for
    /// them: a trajectory whose control polygon satisfies the law lies
    /// entirely inside the region.
    pub fn half_space(name: impl Into<String>, coeffs: Vec<f64>, offset: f64) -> Self {
        let margin = move |state: &StateVector| -> f64 {
            coeffs
                .iter()
                .zip(state.iter())
                .map(|(c, x)| c * x)
                .sum::<f64>()
                - offset
        };
        let predicate = margin.clone();
        Self {
            name: name.into(),
            predicate: Arc::new(move |state| predicate(state) >= 0.0),
            measure: Some(Arc::new(margin)),
        }
    }

    /// The law's name, as recorded in witnesses and ledger entries.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether `state` is inside this law's region.
    pub fn holds(&self, state: &StateVector) -> bool {
        (self.predicate)(state)
    }

    /// The measure at `state`, when one is attached.
    pub fn measure_at(&self, state: &StateVector) -> Option<f64> {
        self.measure.as_ref().map(|measure| measure(state))
    }

    /// Whether a measure is attached.
    pub fn has_measure(&self) -> bool {
        self.measure.is_some()
    }
}

impl fmt::Debug for Law {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Law")
            .field("name", &self.name)
            .field("has_measure", &self.measure.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
