//! Transactional field cells: one typed dimension of an object's state.
//!
//! Each cell holds a committed value and, while a proposal is being
//! forged, a proposed value beside it. Commit promotes the proposal;
//! rollback discards it; the committed value is never touched by a
//! failed proposal. The cell also owns the numeric encoding of its value
//! into a state-vector coordinate and the decoding back.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::decimal::DecimalValue;

// ---------------------------------------------------------------------------
// FieldValue and FieldKind
// ---------------------------------------------------------------------------

/// A typed field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// Exact decimal amount.
    Decimal(DecimalValue),
    /// Boolean flag.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Raw double.
    Float(f64),
    /// Label from an ordered state-path.
    Label(String),
}

impl FieldValue {
    /// The kind tag of this value.
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Decimal(_) => FieldKind::Decimal,
            Self::Bool(_) => FieldKind::Bool,
            Self::Int(_) => FieldKind::Int,
            Self::Float(_) => FieldKind::Float,
            Self::Label(_) => FieldKind::Label,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decimal(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Label(value) => write!(f, "{value}"),
        }
    }
}

/// Kind tag of a field, fixed at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    Decimal,
    Bool,
    Int,
    Float,
    Label,
}

// ---------------------------------------------------------------------------
// FieldSpec
// ---------------------------------------------------------------------------

/// Shape of one field: its name, kind, and state-path if labelled.
///
/// Specs are the decode side of the typed encoding: a hypothetical state
/// vector is turned back into field values through the layout of specs,
/// which is how rules get evaluated along a trajectory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name, unique within a blueprint.
    pub name: String,
    /// Kind fixed at registration.
    pub kind: FieldKind,
    /// Ordered state-path for labelled fields.
    pub path: Option<Vec<String>>,
}

impl FieldSpec {
    /// Decode one state-vector coordinate back into a field value.
    ///
    /// Numeric kinds round where the type demands it; a boolean decodes
    /// across the 0.5 threshold; a label decodes by rounded index into
    /// the state-path, and an out-of-range index yields `None`.
    pub fn decode(&self, coordinate: f64) -> Option<FieldValue> {
        match self.kind {
            FieldKind::Decimal => Some(FieldValue::Decimal(DecimalValue::from_f64(coordinate))),
            FieldKind::Bool => Some(FieldValue::Bool(coordinate > 0.5)),
            FieldKind::Int => Some(FieldValue::Int(coordinate.round() as i64)),
            FieldKind::Float => Some(FieldValue::Float(coordinate)),
            FieldKind::Label => {
                let path = self.path.as_ref()?;
                let index = coordinate.round();
                // The comparison is written to also throw out NaN.
                if !(index >= 0.0 && index < path.len() as f64) {
                    return None;
                }
                Some(FieldValue::Label(path[index as usize].clone()))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// FieldCell
// ---------------------------------------------------------------------------

/// One transactional dimension of a blueprint's state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldCell {
    name: String,
    index: usize,
    committed: FieldValue,
    proposed: Option<FieldValue>,
    forging: bool,
    state_path: Option<Vec<String>>,
}

impl FieldCell {
    /// A plain cell at dimension `index`.
    pub fn new(name: impl Into<String>, index: usize, initial: FieldValue) -> Self {
        Self {
            name: name.into(),
            index,
            committed: initial,
            proposed: None,
            forging: false,
            state_path: None,
        }
    }

    /// A labelled cell with an ordered state-path.
    pub fn with_path(
        name: impl Into<String>,
        index: usize,
        path: Vec<String>,
        initial: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            index,
            committed: FieldValue::Label(initial.into()),
            proposed: None,
            forging: false,
            state_path: Some(path),
        }
    }

    /// Field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dimension index in the state vector.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The ordered state-path for labelled cells.
    pub fn state_path(&self) -> Option<&[String]> {
        self.state_path.as_deref()
    }

    /// Whether a forge has this cell open.
    pub fn is_forging(&self) -> bool {
        self.forging
    }

    /// Whether a proposal is pending.
    pub fn has_proposal(&self) -> bool {
        self.proposed.is_some()
    }

    /// The shape of this cell.
    pub fn spec(&self) -> FieldSpec {
        FieldSpec {
            name: self.name.clone(),
            kind: self.committed.kind(),
            path: self.state_path.clone(),
        }
    }

    /// Open the cell for a proposal. Idempotent; any stale proposal is
    /// dropped.
    pub fn begin_forge(&mut self) {
        self.forging = true;
        self.proposed = None;
    }

    /// Store `value`: as the proposal while forging, directly into the
    /// committed slot otherwise.
    pub fn write(&mut self, value: FieldValue) {
        if self.forging {
            self.proposed = Some(value);
        } else {
            self.committed = value;
        }
    }

    /// Propose a transition to `label`. The cell does not police the
    /// path; a path-validity rule does.
    pub fn move_to(&mut self, label: impl Into<String>) {
        self.write(FieldValue::Label(label.into()));
    }

    /// The visible value: the proposal while one is pending, the
    /// committed value otherwise.
    pub fn read(&self) -> &FieldValue {
        match (&self.proposed, self.forging) {
            (Some(proposal), true) => proposal,
            _ => &self.committed,
        }
    }

    /// Promote the proposal, if any, and close the cell.
    pub fn commit(&mut self) {
        if let Some(proposal) = self.proposed.take() {
            self.committed = proposal;
        }
        self.forging = false;
    }

    /// Discard the proposal and close the cell. The committed value is
    /// untouched.
    pub fn rollback(&mut self) {
        self.proposed = None;
        self.forging = false;
    }

    /// Committed value as a state-vector coordinate.
    pub fn current_state_value(&self) -> f64 {
        self.encode(&self.committed)
    }

    /// Visible value as a state-vector coordinate. Without an active
    /// proposal this equals the committed encoding.
    pub fn proposed_state_value(&self) -> f64 {
        self.encode(self.read())
    }

    /// The committed value.
    pub fn committed(&self) -> &FieldValue {
        &self.committed
    }

    fn encode(&self, value: &FieldValue) -> f64 {
        match value {
            FieldValue::Decimal(value) => value.to_f64(),
            FieldValue::Bool(value) => {
                if *value {
                    1.0
                } else {
                    0.0
                }
            }
            FieldValue::Int(value) => *value as f64,
            FieldValue::Float(value) => *value,
            // A label outside the path (or without one) encodes to -1,
            // a definite out-of-range coordinate for path rules to see.
            FieldValue::Label(label) => self
                .state_path
                .as_ref()
                .and_then(|path| path.iter().position(|step| step == label))
                .map_or(-1.0, |position| position as f64),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn status_cell() -> FieldCell {
        FieldCell::with_path(
            "status",
            0,
            vec![
                "draft".to_string(),
                "submitted".to_string(),
                "approved".to_string(),
                "paid".to_string(),
            ],
            "draft",
        )
    }

    #[test]
    fn write_outside_forge_hits_committed_directly() {
        let mut cell = FieldCell::new("amount", 0, FieldValue::Int(1));
        cell.write(FieldValue::Int(2));
        assert_eq!(cell.committed(), &FieldValue::Int(2));
        assert!(!cell.has_proposal());
    }

    #[test]
    fn forge_write_read_commit() {
        let mut cell = FieldCell::new("amount", 0, FieldValue::Int(1));
        cell.begin_forge();
        assert_eq!(cell.read(), &FieldValue::Int(1));
        cell.write(FieldValue::Int(5));
        assert_eq!(cell.read(), &FieldValue::Int(5));
        assert_eq!(cell.committed(), &FieldValue::Int(1));
        cell.commit();
        assert_eq!(cell.committed(), &FieldValue::Int(5));
        assert!(!cell.is_forging());
        assert!(!cell.has_proposal());
    }

    #[test]
    fn rollback_discards_the_proposal() {
        let mut cell = FieldCell::new("amount", 0, FieldValue::Int(1));
        cell.begin_forge();
        cell.write(FieldValue::Int(5));
        cell.rollback();
        assert_eq!(cell.committed(), &FieldValue::Int(1));
        assert_eq!(cell.read(), &FieldValue::Int(1));
        assert!(!cell.is_forging());
    }

    #[test]
    fn begin_forge_is_idempotent_and_clears_stale_proposals() {
        let mut cell = FieldCell::new("amount", 0, FieldValue::Int(1));
        cell.begin_forge();
        cell.write(FieldValue::Int(9));
        cell.begin_forge();
        assert!(cell.is_forging());
        assert!(!cell.has_proposal());
        assert_eq!(cell.read(), &FieldValue::Int(1));
    }

    #[test]
    fn commit_without_proposal_keeps_committed() {
        let mut cell = FieldCell::new("flag", 0, FieldValue::Bool(true));
        cell.begin_forge();
        cell.commit();
        assert_eq!(cell.committed(), &FieldValue::Bool(true));
    }

    #[test]
    fn numeric_encodings() {
        let decimal = FieldCell::new(
            "amount",
            0,
            FieldValue::Decimal(DecimalValue::from_int(100)),
        );
        assert_eq!(decimal.current_state_value(), 100.0);
        let int = FieldCell::new("count", 1, FieldValue::Int(-3));
        assert_eq!(int.current_state_value(), -3.0);
        let float = FieldCell::new("x", 2, FieldValue::Float(2.5));
        assert_eq!(float.current_state_value(), 2.5);
        let truthy = FieldCell::new("on", 3, FieldValue::Bool(true));
        assert_eq!(truthy.current_state_value(), 1.0);
        let falsy = FieldCell::new("off", 4, FieldValue::Bool(false));
        assert_eq!(falsy.current_state_value(), 0.0);
    }

    #[test]
    fn label_encodes_to_path_index() {
        let mut cell = status_cell();
        assert_eq!(cell.current_state_value(), 0.0);
        cell.begin_forge();
        cell.move_to("approved");
        assert_eq!(cell.proposed_state_value(), 2.0);
        assert_eq!(cell.current_state_value(), 0.0);
    }

    #[test]
    fn label_outside_path_encodes_out_of_range() {
        let mut cell = status_cell();
        cell.begin_forge();
        cell.move_to("shredded");
        assert_eq!(cell.proposed_state_value(), -1.0);
    }

    #[test]
    fn proposed_equals_committed_without_proposal() {
        let cell = status_cell();
        assert_eq!(cell.proposed_state_value(), cell.current_state_value());
    }

    #[test]
    fn spec_decodes_the_encoding_back() {
        let cell = status_cell();
        let spec = cell.spec();
        assert_eq!(
            spec.decode(2.0),
            Some(FieldValue::Label("approved".to_string()))
        );
        assert_eq!(spec.decode(2.4), Some(FieldValue::Label("approved".to_string())));
        assert_eq!(spec.decode(-1.0), None);
        assert_eq!(spec.decode(17.0), None);

        let flag = FieldCell::new("on", 0, FieldValue::Bool(true)).spec();
        assert_eq!(flag.decode(0.2), Some(FieldValue::Bool(false)));
        assert_eq!(flag.decode(0.8), Some(FieldValue::Bool(true)));

        let amount = FieldCell::new(
            "amount",
            0,
            FieldValue::Decimal(DecimalValue::from_int(100)),
        )
        .spec();
        assert_eq!(
            amount.decode(100.0),
            Some(FieldValue::Decimal(DecimalValue::from_int(100)))
        );
    }
}
