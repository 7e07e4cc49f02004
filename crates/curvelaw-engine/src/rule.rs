//! Rules: named conjunctions of conditions over field snapshots.
//!
//! Conditions never read mutable field state directly; they evaluate
//! against an explicit [`FieldSnapshot`], a decoded view of the fields at
//! one point in state space. That indirection is what lets a rule be
//! lowered to a [`Law`] over state vectors: the layout decodes any
//! hypothetical point on a trajectory into a snapshot and the rule
//! evaluates there.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::decimal::DecimalValue;
use crate::field_cell::{FieldCell, FieldSpec, FieldValue};
use crate::law::Law;
use crate::state_vector::StateVector;

// ---------------------------------------------------------------------------
// FieldSnapshot
// ---------------------------------------------------------------------------

/// A decoded view of every field at one point in state space.
///
/// Entries follow field declaration order. A labelled field whose
/// coordinate fell outside its state-path carries no value, so label
/// conditions fail closed on unlawful intermediate states.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSnapshot {
    entries: Vec<(String, Option<FieldValue>)>,
}

impl FieldSnapshot {
    /// Snapshot the visible values of `cells`: proposals where pending,
    /// committed values otherwise.
    pub fn of_read(cells: &[FieldCell]) -> Self {
        Self {
            entries: cells
                .iter()
                .map(|cell| (cell.name().to_string(), Some(cell.read().clone())))
                .collect(),
        }
    }

    /// Snapshot the committed values of `cells`.
    pub fn of_committed(cells: &[FieldCell]) -> Self {
        Self {
            entries: cells
                .iter()
                .map(|cell| (cell.name().to_string(), Some(cell.committed().clone())))
                .collect(),
        }
    }

    /// The value of a field, when present.
    pub fn value(&self, name: &str) -> Option<&FieldValue> {
        self.entries
            .iter()
            .find(|(entry_name, _)| entry_name == name)
            .and_then(|(_, value)| value.as_ref())
    }

    /// Numeric reading of a decimal, integer, or float field.
    pub fn number(&self, name: &str) -> Option<f64> {
        match self.value(name)? {
            FieldValue::Decimal(value) => Some(value.to_f64()),
            FieldValue::Int(value) => Some(*value as f64),
            FieldValue::Float(value) => Some(*value),
            FieldValue::Bool(_) | FieldValue::Label(_) => None,
        }
    }

    /// Exact decimal reading of a decimal field.
    pub fn decimal(&self, name: &str) -> Option<DecimalValue> {
        match self.value(name)? {
            FieldValue::Decimal(value) => Some(*value),
            _ => None,
        }
    }

    /// Boolean reading of a flag field.
    pub fn flag(&self, name: &str) -> Option<bool> {
        match self.value(name)? {
            FieldValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Label reading of a state-path field.
    pub fn label(&self, name: &str) -> Option<&str> {
        match self.value(name)? {
            FieldValue::Label(value) => Some(value.as_str()),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Condition and Rule
// ---------------------------------------------------------------------------

/// Check applied to a snapshot by a condition.
pub type ConditionCheck = Arc<dyn Fn(&FieldSnapshot) -> bool + Send + Sync>;

/// One labelled boolean condition of a rule.
#[derive(Clone)]
pub struct Condition {
    label: String,
    check: ConditionCheck,
}

impl Condition {
    /// A condition from a label and a snapshot check.
    pub fn new(
        label: impl Into<String>,
        check: impl Fn(&FieldSnapshot) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            label: label.into(),
            check: Arc::new(check),
        }
    }

    /// The condition's label, used in violation reports.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Evaluate against a snapshot.
    pub fn holds(&self, snapshot: &FieldSnapshot) -> bool {
        (self.check)(snapshot)
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Condition")
            .field("label", &self.label)
            .finish()
    }
}

/// A named conjunction of conditions over the current field values.
#[derive(Debug, Clone)]
pub struct Rule {
    name: String,
    conditions: Vec<Condition>,
}

impl Rule {
    /// An empty rule; conjoin conditions with [`Rule::when`].
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            conditions: Vec::new(),
        }
    }

    /// Conjoin a labelled condition.
    pub fn when(
        mut self,
        label: impl Into<String>,
        check: impl Fn(&FieldSnapshot) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.conditions.push(Condition::new(label, check));
        self
    }

    /// The rule's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The conditions in declaration order.
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// True when every condition holds. An empty rule holds vacuously.
    pub fn eval(&self, snapshot: &FieldSnapshot) -> bool {
        self.conditions
            .iter()
            .all(|condition| condition.holds(snapshot))
    }

    /// The first condition that fails, in declaration order.
    pub fn first_failing(&self, snapshot: &FieldSnapshot) -> Option<&Condition> {
        self.conditions
            .iter()
            .find(|condition| !condition.holds(snapshot))
    }

    /// Lower this rule to a law over state vectors.
    ///
    /// The law decodes a state through `layout` and evaluates the rule
    /// on the decoded snapshot, which is what makes field rules
    /// checkable along an entire trajectory.
    pub fn lower(&self, layout: &FieldLayout) -> Law {
        let rule = self.clone();
        let layout = layout.clone();
        Law::new(self.name.clone(), move |state: &StateVector| {
            rule.eval(&layout.decode_state(state))
        })
    }
}

// ---------------------------------------------------------------------------
// FieldLayout
// ---------------------------------------------------------------------------

/// The ordered field shapes of a registered blueprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldLayout {
    specs: Vec<FieldSpec>,
}

impl FieldLayout {
    /// A layout from ordered field specs.
    pub fn from_specs(specs: Vec<FieldSpec>) -> Self {
        Self { specs }
    }

    /// State-vector dimension this layout decodes.
    pub fn dim(&self) -> usize {
        self.specs.len()
    }

    /// The specs in dimension order.
    pub fn specs(&self) -> &[FieldSpec] {
        &self.specs
    }

    /// Decode a state vector into a field snapshot.
    pub fn decode_state(&self, state: &StateVector) -> FieldSnapshot {
        debug_assert_eq!(state.dim(), self.dim());
        FieldSnapshot {
            entries: self
                .specs
                .iter()
                .enumerate()
                .map(|(index, spec)| {
                    let coordinate = state.get(index).unwrap_or(f64::NAN);
                    (spec.name.clone(), spec.decode(coordinate))
                })
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
