//! # curvelaw-engine
//!
//! Certifies proposed state transitions of multi-dimensional objects
//! against declarative laws. The candidate path between the current and
//! proposed states is a cubic Bezier trajectory; a proposal is accepted
//! only when the entire continuous trajectory stays inside the lawful
//! region, and otherwise rejected with a witness locating the first
//! violation. Every outcome lands in a deterministic, hash-chained
//! proposal ledger.
//!
//! The pieces, leaves first:
//!
//! - [`DecimalValue`]: exact fixed-point scalar for field values.
//! - [`StateVector`]: the double-valued encoding of an object's state.
//! - [`ControlPoints`]: cubic Bezier geometry with De Casteljau
//!   subdivision.
//! - [`Law`]: a named predicate over state space, optionally measured.
//! - [`verify`]: interval verification of a trajectory against a law
//!   set, producing a [`Verdict`].
//! - [`FieldCell`]: transactional typed cells with begin/commit/rollback.
//! - [`Rule`]: named conjunctions over field snapshots, lowered to laws.
//! - [`Blueprint`]: forge orchestration over the fields and rules.
//! - [`Ledger`]: append-only, thread-safe record of every proposal.

#![forbid(unsafe_code)]

pub mod bezier;
pub mod blueprint;
pub mod decimal;
pub mod field_cell;
pub mod law;
pub mod ledger;
pub mod rule;
pub mod state_vector;
pub mod verifier;

pub use bezier::{bernstein, ControlPoints, GeometryError};
pub use blueprint::{Blueprint, BlueprintError, ForgeAction, ForgeBody, ForgeScope};
pub use decimal::{DecimalParseError, DecimalValue};
pub use field_cell::{FieldCell, FieldKind, FieldSpec, FieldValue};
pub use law::Law;
pub use ledger::{Ledger, LedgerEntry, LEDGER_HASH_DOMAIN};
pub use rule::{Condition, FieldLayout, FieldSnapshot, Rule};
pub use state_vector::StateVector;
pub use verifier::{verify, Verdict, VerifyBudget, Witness, SYNTHETIC_LAW_INDEX};
