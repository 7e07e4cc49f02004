//! Interval verification of cubic trajectories against a law set.
//!
//! The verifier certifies that an entire curve lies inside the lawful
//! region (the intersection of every law's region) by recursive interval
//! subdivision over the control polygon:
//!
//! 1. a segment whose four control points all satisfy every law is
//!    accepted by the convex-hull containment property (exact for convex
//!    regions, asymptotically tight otherwise);
//! 2. a control point that violates a law is a conservative signal only;
//!    the violation counts iff the original curve itself violates the law
//!    at the corresponding global parameter;
//! 3. everything else splits at the midpoint, left half processed first,
//!    so the first confirmed violation is the earliest the subdivision
//!    can reach.
//!
//! The traversal is bounded by an explicit budget (maximum depth and a
//! minimum parameter interval); exhausting the budget without a clean
//! acceptance yields a conservative rejection with a synthetic witness.

use serde::{Deserialize, Serialize};

use crate::bezier::{bernstein, ControlPoints};
use crate::law::Law;
use crate::state_vector::StateVector;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Law index reported on synthetic witnesses (budget exhaustion, unknown
/// forge). Never maps to a position in the law list.
pub const SYNTHETIC_LAW_INDEX: i32 = -1;

/// Finite-difference step for repair gradient estimation.
const REPAIR_EPSILON: f64 = 1e-6;

/// Step length applied along the negative repair gradient.
const REPAIR_STEP: f64 = 0.1;

// ---------------------------------------------------------------------------
// VerifyBudget
// ---------------------------------------------------------------------------

/// Resource bound for one verification run.
///
/// `max_depth` caps the subdivision tree; `tolerance` is the smallest
/// parameter interval worth splitting. A segment that exhausts either
/// bound without resolving is rejected conservatively.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VerifyBudget {
    /// Maximum subdivision depth.
    pub max_depth: u32,
    /// Minimum global parameter interval a segment may cover.
    pub tolerance: f64,
}

impl Default for VerifyBudget {
    fn default() -> Self {
        Self {
            max_depth: 20,
            tolerance: 1e-10,
        }
    }
}

impl VerifyBudget {
    /// Deep-subdivision profile for tightly wound trajectories.
    pub fn high_precision() -> Self {
        Self {
            max_depth: 40,
            tolerance: 1e-15,
        }
    }
}

// ---------------------------------------------------------------------------
// Witness and Verdict
// ---------------------------------------------------------------------------

/// A first-violation certificate: which law failed, when, where, and an
/// optional advisory nudge that would reduce the violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Witness {
    /// Index of the violated law in the law list, or
    /// [`SYNTHETIC_LAW_INDEX`] for synthetic rejections.
    pub law_index: i32,
    /// Name of the violated law.
    pub law_name: String,
    /// Global curve parameter of the violation, in `[0, 1]`.
    pub time: f64,
    /// The violating state on the curve.
    pub state: StateVector,
    /// Advisory control-point nudge, when the law has a measure.
    pub repair: Option<StateVector>,
    /// Human-readable description. Wording is not part of the contract.
    pub reason: String,
}

impl Witness {
    /// A witness not tied to any law in the list: budget exhaustion or a
    /// rejection raised outside the engine.
    pub fn synthetic(reason: impl Into<String>, state: StateVector) -> Self {
        let reason = reason.into();
        Self {
            law_index: SYNTHETIC_LAW_INDEX,
            law_name: reason.clone(),
            time: 0.0,
            state,
            repair: None,
            reason,
        }
    }
}

/// Outcome of verifying one proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Verdict {
    /// The entire trajectory is lawful; the proposal may be promoted.
    Commit,
    /// The trajectory leaves the lawful region; the witness locates the
    /// earliest violation the subdivision could certify.
    Reject(Witness),
}

impl Verdict {
    /// True for [`Verdict::Commit`].
    pub fn is_commit(&self) -> bool {
        matches!(self, Self::Commit)
    }

    /// True for [`Verdict::Reject`].
    pub fn is_reject(&self) -> bool {
        !self.is_commit()
    }

    /// The witness of a rejection.
    pub fn witness(&self) -> Option<&Witness> {
        match self {
            Self::Commit => None,
            Self::Reject(witness) => Some(witness),
        }
    }
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Verify that `cp` stays inside every law's region over `t in [0, 1]`.
///
/// Deterministic: identical inputs yield identical verdicts. The witness
/// of a rejection reports the earliest subdivision-reachable violation;
/// ties between laws at one probe break in law-list order.
pub fn verify(cp: &ControlPoints, laws: &[Law], budget: &VerifyBudget) -> Verdict {
    // (segment, global interval start, global interval end, depth)
    let mut stack: Vec<(ControlPoints, f64, f64, u32)> = vec![(cp.clone(), 0.0, 1.0, 0)];

    while let Some((segment, a, b, depth)) = stack.pop() {
        if depth > budget.max_depth || (b - a) <= budget.tolerance {
            // Budget exhausted: one midpoint probe, then give up
            // conservatively rather than claim lawfulness.
            let t_mid = 0.5 * (a + b);
            let state = segment.evaluate(0.5);
            for (index, law) in laws.iter().enumerate() {
                if !law.holds(&state) {
                    return Verdict::Reject(Witness {
                        law_index: index as i32,
                        law_name: law.name().to_string(),
                        time: t_mid,
                        state,
                        repair: None,
                        reason: format!("law '{}' violated at t={t_mid}", law.name()),
                    });
                }
            }
            return Verdict::Reject(Witness::synthetic("depth exceeded", state));
        }

        // Hull quick-reject: a control point outside a region does not
        // prove the curve leaves it, so every hit is re-checked against
        // the original curve at the matching global parameter.
        let mut hull_clean = true;
        for (k, point) in segment.points().iter().enumerate() {
            for (index, law) in laws.iter().enumerate() {
                if law.holds(point) {
                    continue;
                }
                hull_clean = false;
                let t_global = a + (k as f64 / 3.0) * (b - a);
                let on_curve = cp.evaluate(t_global);
                if !law.holds(&on_curve) {
                    let repair = estimate_repair(cp, law, t_global, &on_curve);
                    return Verdict::Reject(Witness {
                        law_index: index as i32,
                        law_name: law.name().to_string(),
                        time: t_global,
                        state: on_curve,
                        repair,
                        reason: format!("law '{}' violated at t={t_global}", law.name()),
                    });
                }
            }
        }

        // Hull quick-accept: the whole control polygon is lawful.
        if hull_clean {
            continue;
        }

        // Subdivide; push right first so the left (earlier) half is
        // processed next.
        let mid = 0.5 * (a + b);
        let (left, right) = segment.de_casteljau_split(0.5);
        stack.push((right, mid, b, depth + 1));
        stack.push((left, a, mid, depth + 1));
    }

    Verdict::Commit
}

// ---------------------------------------------------------------------------
// Repair estimation
// ---------------------------------------------------------------------------

/// Estimate an advisory nudge of the most influential control point.
///
/// The shortfall `max(0, -measure(g(t*)))` is differentiated by one-sided
/// finite differences with respect to the control point carrying the
/// largest Bernstein weight at `t*`; the nudge is one step along the
/// negative gradient. Returns `None` for laws without a measure.
fn estimate_repair(
    cp: &ControlPoints,
    law: &Law,
    t_star: f64,
    violating: &StateVector,
) -> Option<StateVector> {
    let base = shortfall(law, violating)?;

    let mut heaviest = 0;
    let mut heaviest_weight = f64::NEG_INFINITY;
    for k in 0..4 {
        let weight = bernstein(k, 3, t_star);
        if weight > heaviest_weight {
            heaviest_weight = weight;
            heaviest = k;
        }
    }

    let anchor = cp.points()[heaviest].clone();
    let mut gradient = Vec::with_capacity(anchor.dim());
    for dim in 0..anchor.dim() {
        let mut nudged = anchor.as_slice().to_vec();
        nudged[dim] += REPAIR_EPSILON;
        let probe = cp.with_point(heaviest, StateVector::new(nudged));
        let probed_state = probe.evaluate(t_star);
        let probed = shortfall(law, &probed_state)?;
        gradient.push((probed - base) / REPAIR_EPSILON);
    }

    Some(StateVector::new(gradient).scale(-REPAIR_STEP))
}

/// How far `state` falls outside the law's region, by its measure.
fn shortfall(law: &Law, state: &StateVector) -> Option<f64> {
    law.measure_at(state).map(|m| (-m).max(0.0))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
