//! Blueprint runtime: forge orchestration over transactional fields.
//!
//! A blueprint owns an ordered set of field cells, a rule list, and a
//! table of named forges. Raising a forge opens a transaction on every
//! cell, runs the forge body against a scope that collects writes and
//! actions, builds the candidate trajectory from the committed and
//! proposed encodings, verifies it against the lowered rules, then
//! commits or rolls back all cells and appends the outcome to the
//! ledger. Rejection leaves every field exactly as it was before the
//! call.

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::bezier::{ControlPoints, GeometryError};
use crate::field_cell::{FieldCell, FieldValue};
use crate::law::Law;
use crate::ledger::Ledger;
use crate::rule::{FieldLayout, FieldSnapshot, Rule};
use crate::state_vector::StateVector;
use crate::verifier::{verify, Verdict, VerifyBudget, Witness};

// ---------------------------------------------------------------------------
// BlueprintError
// ---------------------------------------------------------------------------

/// Misuse of the blueprint surface. Domain failures never appear here;
/// they are verdicts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlueprintError {
    /// Fields, rules, and forges are fixed once the blueprint registers.
    AlreadyRegistered { blueprint: String },
    /// Field names are unique within a blueprint.
    DuplicateField { name: String },
    /// No field with this name is registered.
    UnknownField { name: String },
    /// A labelled field needs at least one path step.
    EmptyStatePath { name: String },
}

impl fmt::Display for BlueprintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyRegistered { blueprint } => {
                write!(f, "blueprint '{blueprint}' is already registered")
            }
            Self::DuplicateField { name } => write!(f, "duplicate field '{name}'"),
            Self::UnknownField { name } => write!(f, "no field named '{name}'"),
            Self::EmptyStatePath { name } => {
                write!(f, "state-path of field '{name}' is empty")
            }
        }
    }
}

impl Error for BlueprintError {}

// ---------------------------------------------------------------------------
// ForgeAction and ForgeScope
// ---------------------------------------------------------------------------

/// One action emitted by a forge body, in emission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ForgeAction {
    /// Ask for the proposal to be verified and committed.
    Commit,
    /// Reject the proposal outright.
    Reject { reason: String },
    /// Reject iff the named predicate held when the body evaluated it.
    RejectWhen {
        condition: String,
        held: bool,
        reason: String,
    },
}

/// The view a forge body gets of its blueprint: proposal writes plus an
/// ordered action list.
pub struct ForgeScope<'a> {
    cells: &'a mut [FieldCell],
    actions: Vec<ForgeAction>,
}

impl<'a> ForgeScope<'a> {
    fn new(cells: &'a mut [FieldCell]) -> Self {
        Self {
            cells,
            actions: Vec::new(),
        }
    }

    /// The visible value of a field: its pending proposal, else the
    /// committed value.
    pub fn read(&self, name: &str) -> Option<FieldValue> {
        self.cells
            .iter()
            .find(|cell| cell.name() == name)
            .map(|cell| cell.read().clone())
    }

    /// A decoded snapshot of every visible field value.
    pub fn snapshot(&self) -> FieldSnapshot {
        FieldSnapshot::of_read(self.cells)
    }

    /// Propose `value` for the named field. An unknown name rejects the
    /// whole proposal so the attempt still reaches the ledger.
    pub fn write(&mut self, name: &str, value: FieldValue) {
        match self.cells.iter_mut().find(|cell| cell.name() == name) {
            Some(cell) => cell.write(value),
            None => self.actions.push(ForgeAction::Reject {
                reason: format!("no field named '{name}'"),
            }),
        }
    }

    /// Propose a state-path transition for the named field.
    pub fn move_to(&mut self, name: &str, label: &str) {
        self.write(name, FieldValue::Label(label.to_string()));
    }

    /// Emit a commit action.
    pub fn commit(&mut self) {
        self.actions.push(ForgeAction::Commit);
    }

    /// Emit an unconditional rejection.
    pub fn reject(&mut self, reason: impl Into<String>) {
        self.actions.push(ForgeAction::Reject {
            reason: reason.into(),
        });
    }

    /// Emit a conditional rejection; `held` is the predicate's value at
    /// emission time.
    pub fn reject_when(&mut self, condition: impl Into<String>, held: bool, reason: impl Into<String>) {
        self.actions.push(ForgeAction::RejectWhen {
            condition: condition.into(),
            held,
            reason: reason.into(),
        });
    }

    fn into_actions(self) -> Vec<ForgeAction> {
        self.actions
    }
}

/// A forge body: runs against the scope, emitting writes and actions.
pub type ForgeBody = Box<dyn Fn(&mut ForgeScope<'_>) + Send + Sync>;

// ---------------------------------------------------------------------------
// Blueprint
// ---------------------------------------------------------------------------

/// A typed object definition: fields, rules, and forges, wired to a
/// shared ledger and a verification budget.
pub struct Blueprint {
    type_name: String,
    cells: Vec<FieldCell>,
    rules: Vec<Rule>,
    forges: BTreeMap<String, ForgeBody>,
    ledger: Arc<Ledger>,
    budget: VerifyBudget,
    registered: bool,
}

impl fmt::Debug for Blueprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blueprint")
            .field("type_name", &self.type_name)
            .field("fields", &self.cells.len())
            .field("rules", &self.rules.len())
            .field("forges", &self.forges.len())
            .field("registered", &self.registered)
            .finish()
    }
}

impl Blueprint {
    /// An empty blueprint recording into `ledger`.
    pub fn new(type_name: impl Into<String>, ledger: Arc<Ledger>) -> Self {
        Self {
            type_name: type_name.into(),
            cells: Vec::new(),
            rules: Vec::new(),
            forges: BTreeMap::new(),
            ledger,
            budget: VerifyBudget::default(),
            registered: false,
        }
    }

    /// Replace the verification budget.
    pub fn with_budget(mut self, budget: VerifyBudget) -> Self {
        self.budget = budget;
        self
    }

    /// Declare a typed field. Declaration order fixes the dimension
    /// index.
    pub fn add_field(
        &mut self,
        name: impl Into<String>,
        initial: FieldValue,
    ) -> Result<(), BlueprintError> {
        let name = name.into();
        self.check_open(&name)?;
        let index = self.cells.len();
        self.cells.push(FieldCell::new(name, index, initial));
        Ok(())
    }

    /// Declare a labelled field with an ordered state-path.
    pub fn add_path_field(
        &mut self,
        name: impl Into<String>,
        path: Vec<String>,
        initial: impl Into<String>,
    ) -> Result<(), BlueprintError> {
        let name = name.into();
        self.check_open(&name)?;
        if path.is_empty() {
            return Err(BlueprintError::EmptyStatePath { name });
        }
        let index = self.cells.len();
        self.cells
            .push(FieldCell::with_path(name, index, path, initial));
        Ok(())
    }

    /// Declare a rule.
    pub fn add_rule(&mut self, rule: Rule) -> Result<(), BlueprintError> {
        if self.registered {
            return Err(BlueprintError::AlreadyRegistered {
                blueprint: self.type_name.clone(),
            });
        }
        self.rules.push(rule);
        Ok(())
    }

    /// Define a named forge.
    pub fn define_forge(
        &mut self,
        name: impl Into<String>,
        body: impl Fn(&mut ForgeScope<'_>) + Send + Sync + 'static,
    ) -> Result<(), BlueprintError> {
        if self.registered {
            return Err(BlueprintError::AlreadyRegistered {
                blueprint: self.type_name.clone(),
            });
        }
        self.forges.insert(name.into(), Box::new(body));
        Ok(())
    }

    /// Fix the field ordering and dimension. Idempotent; raised
    /// implicitly by the first forge.
    pub fn register(&mut self) {
        self.registered = true;
    }

    /// Whether registration has happened.
    pub fn is_registered(&self) -> bool {
        self.registered
    }

    /// State-vector dimension.
    pub fn dim(&self) -> usize {
        self.cells.len()
    }

    /// The blueprint's type name, recorded on ledger entries.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The cell of the named field.
    pub fn field(&self, name: &str) -> Option<&FieldCell> {
        self.cells.iter().find(|cell| cell.name() == name)
    }

    /// The committed value of the named field.
    pub fn current_value(&self, name: &str) -> Option<FieldValue> {
        self.field(name).map(|cell| cell.committed().clone())
    }

    /// Write a committed value outside any forge.
    pub fn write_field(
        &mut self,
        name: &str,
        value: FieldValue,
    ) -> Result<(), BlueprintError> {
        match self.cells.iter_mut().find(|cell| cell.name() == name) {
            Some(cell) => {
                cell.write(value);
                Ok(())
            }
            None => Err(BlueprintError::UnknownField {
                name: name.to_string(),
            }),
        }
    }

    /// The ordered field shapes.
    pub fn layout(&self) -> FieldLayout {
        FieldLayout::from_specs(self.cells.iter().map(FieldCell::spec).collect())
    }

    /// Committed encodings as a state vector.
    pub fn current_state(&self) -> StateVector {
        StateVector::new(
            self.cells
                .iter()
                .map(FieldCell::current_state_value)
                .collect(),
        )
    }

    /// Visible encodings (proposals where pending) as a state vector.
    pub fn proposed_state(&self) -> StateVector {
        StateVector::new(
            self.cells
                .iter()
                .map(FieldCell::proposed_state_value)
                .collect(),
        )
    }

    /// Whether every rule holds on the committed state.
    pub fn is_lawful(&self) -> bool {
        let snapshot = FieldSnapshot::of_committed(&self.cells);
        self.rules.iter().all(|rule| rule.eval(&snapshot))
    }

    /// Failing `rule: condition` labels on the committed state.
    pub fn violations(&self) -> Vec<String> {
        let snapshot = FieldSnapshot::of_committed(&self.cells);
        let mut failing = Vec::new();
        for rule in &self.rules {
            for condition in rule.conditions() {
                if !condition.holds(&snapshot) {
                    failing.push(format!("{}: {}", rule.name(), condition.label()));
                }
            }
        }
        failing
    }

    /// Raise the named forge and verify the resulting proposal.
    ///
    /// On rejection of any kind every field is left exactly as it was
    /// before the call; the attempt is recorded in the ledger either
    /// way.
    pub fn forge(&mut self, name: &str) -> Verdict {
        self.register();

        if !self.forges.contains_key(name) {
            let current = self.current_state();
            return self.reject_in_place(
                format!("no forge named '{name}'"),
                current,
                Some(name),
            );
        }

        for cell in &mut self.cells {
            cell.begin_forge();
        }
        let actions = {
            let mut scope = ForgeScope::new(&mut self.cells);
            if let Some(body) = self.forges.get(name) {
                body(&mut scope);
            }
            scope.into_actions()
        };

        // Explicit rejection short-circuits before any geometry is built.
        for action in &actions {
            let rejection = match action {
                ForgeAction::Reject { reason } => Some(reason.clone()),
                ForgeAction::RejectWhen {
                    condition,
                    held: true,
                    reason,
                } => Some(format!("{reason} ({condition})")),
                _ => None,
            };
            if let Some(reason) = rejection {
                self.rollback_all();
                let current = self.current_state();
                return self.reject_in_place(reason, current, Some(name));
            }
        }

        let p0 = self.current_state();
        let p3 = self.proposed_state();
        let cp = ControlPoints::linear(&p0, &p3);

        // End-state pre-check: rules must hold where the trajectory
        // lands before the curve itself is worth verifying.
        let end_snapshot = FieldSnapshot::of_read(&self.cells);
        let end_state_failure = self.rules.iter().enumerate().find_map(|(index, rule)| {
            rule.first_failing(&end_snapshot).map(|condition| {
                (
                    index,
                    rule.name().to_string(),
                    condition.label().to_string(),
                )
            })
        });
        if let Some((index, rule_name, condition_label)) = end_state_failure {
            let witness = Witness {
                law_index: index as i32,
                law_name: rule_name.clone(),
                time: 1.0,
                state: p3,
                repair: None,
                reason: format!(
                    "rule '{rule_name}' failed at the proposed state: {condition_label}"
                ),
            };
            self.rollback_all();
            let verdict = Verdict::Reject(witness);
            self.ledger.append(
                cp,
                self.law_names(),
                verdict.clone(),
                Some(name),
                Some(&self.type_name),
            );
            return verdict;
        }

        let laws = self.lowered_laws();
        let verdict = verify(&cp, &laws, &self.budget);
        match &verdict {
            Verdict::Commit => self.commit_all(),
            Verdict::Reject(_) => self.rollback_all(),
        }
        self.ledger.append(
            cp,
            self.law_names(),
            verdict.clone(),
            Some(name),
            Some(&self.type_name),
        );
        verdict
    }

    /// Verify a caller-supplied trajectory against the lowered rules.
    ///
    /// Bypasses the proposal machinery: no forge body runs. On commit
    /// the end state is decoded through the field layout and written
    /// back to the cells; on rejection nothing changes. Either way the
    /// attempt is recorded under `name`.
    pub fn forge_along(
        &mut self,
        name: &str,
        control_points: ControlPoints,
    ) -> Result<Verdict, GeometryError> {
        self.register();
        if control_points.dim() != self.dim() {
            return Err(GeometryError::DimensionMismatch {
                expected: self.dim(),
                actual: control_points.dim(),
            });
        }

        let laws = self.lowered_laws();
        let verdict = verify(&control_points, &laws, &self.budget);
        if verdict.is_commit() {
            let layout = self.layout();
            let end = control_points.p3().clone();
            for (index, cell) in self.cells.iter_mut().enumerate() {
                let coordinate = end.get(index).unwrap_or(f64::NAN);
                if let Some(value) = layout.specs()[index].decode(coordinate) {
                    cell.write(value);
                }
            }
        }
        self.ledger.append(
            control_points,
            self.law_names(),
            verdict.clone(),
            Some(name),
            Some(&self.type_name),
        );
        Ok(verdict)
    }

    /// Lower every rule to a law, in rule order.
    pub fn lowered_laws(&self) -> Vec<Law> {
        let layout = self.layout();
        self.rules.iter().map(|rule| rule.lower(&layout)).collect()
    }

    fn law_names(&self) -> Vec<String> {
        self.rules.iter().map(|rule| rule.name().to_string()).collect()
    }

    fn commit_all(&mut self) {
        for cell in &mut self.cells {
            cell.commit();
        }
    }

    fn rollback_all(&mut self) {
        for cell in &mut self.cells {
            cell.rollback();
        }
    }

    fn check_open(&self, name: &str) -> Result<(), BlueprintError> {
        if self.registered {
            return Err(BlueprintError::AlreadyRegistered {
                blueprint: self.type_name.clone(),
            });
        }
        if self.cells.iter().any(|cell| cell.name() == name) {
            return Err(BlueprintError::DuplicateField {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Record a rejection that never produced a real trajectory: the
    /// degenerate curve at the current state plus a synthetic witness.
    fn reject_in_place(
        &self,
        reason: String,
        current: StateVector,
        forge_name: Option<&str>,
    ) -> Verdict {
        let cp = ControlPoints::linear(&current, &current);
        let verdict = Verdict::Reject(Witness::synthetic(reason, current));
        self.ledger.append(
            cp,
            self.law_names(),
            verdict.clone(),
            forge_name,
            Some(&self.type_name),
        );
        verdict
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
