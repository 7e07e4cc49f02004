//! Integration tests for the `bezier` module.
//!
//! Covers the geometric invariants the verifier leans on: Bernstein
//! partition of unity, De Casteljau reparametrisation, endpoint
//! interpolation and derivatives, and the chord midpoint of linear
//! trajectories.

#![forbid(unsafe_code)]

use curvelaw_engine::{bernstein, ControlPoints, GeometryError, StateVector};

fn wavy() -> ControlPoints {
    ControlPoints::new(
        StateVector::from([0.0, 0.0, 1.0]),
        StateVector::from([1.0, 3.0, -2.0]),
        StateVector::from([2.0, -1.0, 4.0]),
        StateVector::from([3.0, 0.0, 0.5]),
    )
    .expect("equal dimensions")
}

// ---------------------------------------------------------------------------
// Bernstein basis
// ---------------------------------------------------------------------------

#[test]
fn bernstein_partition_of_unity_across_degrees() {
    for n in 0..=5 {
        for step in 0..=20 {
            let t = f64::from(step) / 20.0;
            let mut sum = 0.0;
            for i in 0..=n {
                let value = bernstein(i, n, t);
                assert!(value >= 0.0, "b({i},{n},{t}) = {value} is negative");
                sum += value;
            }
            assert!(
                (sum - 1.0).abs() < 1e-12,
                "degree {n} basis sums to {sum} at t={t}"
            );
        }
    }
}

#[test]
fn cubic_bernstein_peaks_at_control_point_abscissae() {
    // b_k,3 is maximal near t = k/3; probing the four quarters is enough
    // to pin the heaviest index the repair estimator picks.
    for (k, t) in [(0usize, 0.0), (1, 1.0 / 3.0), (2, 2.0 / 3.0), (3, 1.0)] {
        let here = bernstein(k, 3, t);
        for other in 0..=3 {
            assert!(here >= bernstein(other, 3, t) - 1e-12, "k={k} t={t}");
        }
    }
}

// ---------------------------------------------------------------------------
// Curve evaluation
// ---------------------------------------------------------------------------

#[test]
fn endpoints_interpolate_exactly() {
    let cp = wavy();
    assert_eq!(cp.evaluate(0.0), *cp.p0());
    assert_eq!(cp.evaluate(1.0), *cp.p3());
}

#[test]
fn endpoint_derivatives_are_scaled_control_legs() {
    let cp = wavy();
    assert!(cp
        .derivative(0.0)
        .approx_eq(&cp.p1().sub(cp.p0()).scale(3.0), 1e-12));
    assert!(cp
        .derivative(1.0)
        .approx_eq(&cp.p3().sub(cp.p2()).scale(3.0), 1e-12));
}

#[test]
fn linear_trajectory_midpoint_is_chord_midpoint() {
    let a = StateVector::from([1.0, -4.0]);
    let b = StateVector::from([9.0, 6.0]);
    let cp = ControlPoints::linear(&a, &b);
    assert!(cp
        .evaluate(0.5)
        .approx_eq(&a.add(&b).scale(0.5), 1e-12));
}

#[test]
fn linear_trajectory_traces_the_chord() {
    let a = StateVector::from([0.0, 2.0]);
    let b = StateVector::from([4.0, -2.0]);
    let cp = ControlPoints::linear(&a, &b);
    for step in 0..=16 {
        let t = f64::from(step) / 16.0;
        assert!(cp.evaluate(t).approx_eq(&a.lerp(&b, t), 1e-12), "t={t}");
    }
}

// ---------------------------------------------------------------------------
// De Casteljau split
// ---------------------------------------------------------------------------

#[test]
fn split_preserves_endpoints_and_meets_at_the_split_point() {
    let cp = wavy();
    for s in [0.1, 0.25, 0.5, 0.9] {
        let (left, right) = cp.de_casteljau_split(s);
        assert_eq!(left.p0(), cp.p0());
        assert_eq!(right.p3(), cp.p3());
        let meeting = cp.evaluate(s);
        assert!(left.p3().approx_eq(&meeting, 1e-12));
        assert!(right.p0().approx_eq(&meeting, 1e-12));
    }
}

#[test]
fn split_halves_reparametrise_the_original() {
    let cp = wavy();
    for s in [0.3, 0.5, 0.7] {
        let (left, right) = cp.de_casteljau_split(s);
        for step in 0..=32 {
            let u = f64::from(step) / 32.0;
            assert!(
                left.evaluate(u).approx_eq(&cp.evaluate(s * u), 1e-8),
                "left half diverges at s={s}, u={u}"
            );
            assert!(
                right
                    .evaluate(u)
                    .approx_eq(&cp.evaluate(s + (1.0 - s) * u), 1e-8),
                "right half diverges at s={s}, u={u}"
            );
        }
    }
}

#[test]
fn repeated_splitting_shrinks_the_polygon_onto_the_curve() {
    let mut segment = wavy();
    for _ in 0..20 {
        segment = segment.de_casteljau_split(0.5).0;
    }
    // After twenty halvings the polygon spans a 2^-20 slice of the
    // curve; all four points must be nearly coincident with it.
    let anchor = segment.p0();
    for point in segment.points() {
        assert!(point.approx_eq(anchor, 1e-4));
    }
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

#[test]
fn mixed_dimension_construction_is_refused() {
    let err = ControlPoints::new(
        StateVector::from([0.0]),
        StateVector::from([0.0]),
        StateVector::from([0.0, 0.0]),
        StateVector::from([0.0]),
    )
    .unwrap_err();
    assert_eq!(
        err,
        GeometryError::DimensionMismatch {
            expected: 1,
            actual: 2
        }
    );
}

#[test]
fn control_points_serde_round_trip() {
    let cp = wavy();
    let json = serde_json::to_string(&cp).unwrap();
    let decoded: ControlPoints = serde_json::from_str(&json).unwrap();
    assert_eq!(cp, decoded);
}
