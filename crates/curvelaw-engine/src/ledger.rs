//! Append-only proposal ledger with deterministic content hashes.
//!
//! Every verified proposal, accepted or rejected, is appended here.
//! Entries are never mutated or removed; the sequence index is monotonic
//! and the law version never decreases. One mutex guards the entry list,
//! the law version, and the sequence counter, so distinct blueprints may
//! share a ledger and serialise only at this boundary.
//!
//! The entry hash is SHA-256 over a domain-separated canonical preimage:
//! control-point components as little-endian IEEE-754 bytes, then the
//! law version (little-endian), the law names as concatenated UTF-8, the
//! verdict tag byte, and the sequence index (little-endian). Timestamps
//! stay outside the preimage so identical appends hash identically
//! across runs; two consecutive appends of the same content still differ
//! because their sequence indices differ.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::bezier::ControlPoints;
use crate::verifier::Verdict;

/// Domain separation tag for ledger entry hashes.
pub const LEDGER_HASH_DOMAIN: &[u8] = b"CurvelawEngine.LedgerEntry.v1";

// ---------------------------------------------------------------------------
// LedgerEntry
// ---------------------------------------------------------------------------

/// One recorded proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Lowercase hex SHA-256 of the canonical preimage.
    pub hash: String,
    /// The verified trajectory, copied at append time.
    pub control_points: ControlPoints,
    /// Law version in force when the proposal ran.
    pub law_version: u64,
    /// Names of the laws the proposal was verified against.
    pub law_names: Vec<String>,
    /// The verdict, including any witness.
    pub verdict: Verdict,
    /// Wall-clock append time; not part of the hash.
    pub recorded_at: DateTime<Utc>,
    /// Forge that raised the proposal, when known.
    pub forge_name: Option<String>,
    /// Type name of the proposing blueprint, when known.
    pub blueprint_type: Option<String>,
    /// Monotonic position in the ledger.
    pub sequence: u64,
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct LedgerState {
    entries: Vec<LedgerEntry>,
    law_version: u64,
    next_sequence: u64,
}

/// Append-only, thread-safe proposal record.
#[derive(Debug)]
pub struct Ledger {
    state: Mutex<LedgerState>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    /// An empty ledger at law version 1.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LedgerState {
                entries: Vec::new(),
                law_version: 1,
                next_sequence: 0,
            }),
        }
    }

    /// An empty ledger ready to share across blueprints.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Record one proposal. Infallible; returns the stored entry.
    pub fn append(
        &self,
        control_points: ControlPoints,
        law_names: Vec<String>,
        verdict: Verdict,
        forge_name: Option<&str>,
        blueprint_type: Option<&str>,
    ) -> LedgerEntry {
        let mut state = self.lock();
        let sequence = state.next_sequence;
        let hash = entry_hash(
            &control_points,
            state.law_version,
            &law_names,
            &verdict,
            sequence,
        );
        let entry = LedgerEntry {
            hash,
            control_points,
            law_version: state.law_version,
            law_names,
            verdict,
            recorded_at: Utc::now(),
            forge_name: forge_name.map(str::to_string),
            blueprint_type: blueprint_type.map(str::to_string),
            sequence,
        };
        state.next_sequence += 1;
        state.entries.push(entry.clone());
        entry
    }

    /// Number of recorded entries.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// True before the first append.
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// The entry at `index`, if recorded.
    pub fn entry(&self, index: usize) -> Option<LedgerEntry> {
        self.lock().entries.get(index).cloned()
    }

    /// The most recent entry.
    pub fn last(&self) -> Option<LedgerEntry> {
        self.lock().entries.last().cloned()
    }

    /// A copy of every entry, in append order.
    pub fn all_entries(&self) -> Vec<LedgerEntry> {
        self.lock().entries.clone()
    }

    /// Entries raised by the named forge.
    pub fn entries_for_forge(&self, forge_name: &str) -> Vec<LedgerEntry> {
        self.lock()
            .entries
            .iter()
            .filter(|entry| entry.forge_name.as_deref() == Some(forge_name))
            .cloned()
            .collect()
    }

    /// Accepted proposals.
    pub fn commits(&self) -> Vec<LedgerEntry> {
        self.lock()
            .entries
            .iter()
            .filter(|entry| entry.verdict.is_commit())
            .cloned()
            .collect()
    }

    /// Rejected proposals.
    pub fn rejections(&self) -> Vec<LedgerEntry> {
        self.lock()
            .entries
            .iter()
            .filter(|entry| entry.verdict.is_reject())
            .cloned()
            .collect()
    }

    /// The law version stamped on the next append.
    pub fn law_version(&self) -> u64 {
        self.lock().law_version
    }

    /// Raise the law version; returns the new one. The only mutation
    /// besides append.
    pub fn bump_law_version(&self) -> u64 {
        let mut state = self.lock();
        state.law_version += 1;
        state.law_version
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// ---------------------------------------------------------------------------
// Hashing
// ---------------------------------------------------------------------------

fn verdict_tag(verdict: &Verdict) -> u8 {
    match verdict {
        Verdict::Commit => 0,
        Verdict::Reject(_) => 1,
    }
}

fn entry_hash(
    control_points: &ControlPoints,
    law_version: u64,
    law_names: &[String],
    verdict: &Verdict,
    sequence: u64,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(LEDGER_HASH_DOMAIN);
    for point in control_points.points() {
        for component in point.iter() {
            hasher.update(component.to_le_bytes());
        }
    }
    hasher.update(law_version.to_le_bytes());
    for name in law_names {
        hasher.update(name.as_bytes());
    }
    hasher.update([verdict_tag(verdict)]);
    hasher.update(sequence.to_le_bytes());
    to_hex(&hasher.finalize())
}

fn to_hex(bytes: &[u8]) -> String {
    let mut rendered = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        rendered.push_str(&format!("{byte:02x}"));
    }
    rendered
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_vector::StateVector;

    fn sample_cp() -> ControlPoints {
        ControlPoints::linear(
            &StateVector::from([1.0, 1.0]),
            &StateVector::from([3.0, 3.0]),
        )
    }

    fn sample_names() -> Vec<String> {
        vec!["x positive".to_string(), "y positive".to_string()]
    }

    #[test]
    fn append_assigns_monotonic_sequences() {
        let ledger = Ledger::new();
        let first = ledger.append(sample_cp(), sample_names(), Verdict::Commit, None, None);
        let second = ledger.append(sample_cp(), sample_names(), Verdict::Commit, None, None);
        assert_eq!(first.sequence, 0);
        assert_eq!(second.sequence, 1);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn identical_consecutive_appends_hash_differently() {
        let ledger = Ledger::new();
        let first = ledger.append(sample_cp(), sample_names(), Verdict::Commit, None, None);
        let second = ledger.append(sample_cp(), sample_names(), Verdict::Commit, None, None);
        assert_ne!(first.hash, second.hash);
    }

    #[test]
    fn hash_is_a_pure_function_of_content_and_sequence() {
        let a = Ledger::new();
        let b = Ledger::new();
        let from_a = a.append(sample_cp(), sample_names(), Verdict::Commit, None, None);
        let from_b = b.append(sample_cp(), sample_names(), Verdict::Commit, None, None);
        assert_eq!(from_a.hash, from_b.hash);
        assert_eq!(from_a.hash.len(), 64);
        assert!(from_a.hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn hash_depends_on_law_version() {
        let a = Ledger::new();
        let b = Ledger::new();
        b.bump_law_version();
        let from_a = a.append(sample_cp(), sample_names(), Verdict::Commit, None, None);
        let from_b = b.append(sample_cp(), sample_names(), Verdict::Commit, None, None);
        assert_ne!(from_a.hash, from_b.hash);
    }

    #[test]
    fn law_version_is_monotonic_and_stamped() {
        let ledger = Ledger::new();
        assert_eq!(ledger.law_version(), 1);
        let before = ledger.append(sample_cp(), sample_names(), Verdict::Commit, None, None);
        assert_eq!(ledger.bump_law_version(), 2);
        let after = ledger.append(sample_cp(), sample_names(), Verdict::Commit, None, None);
        assert_eq!(before.law_version, 1);
        assert_eq!(after.law_version, 2);
    }

    #[test]
    fn filters_by_forge_and_verdict() {
        let ledger = Ledger::new();
        ledger.append(
            sample_cp(),
            sample_names(),
            Verdict::Commit,
            Some("submit"),
            Some("invoice"),
        );
        ledger.append(
            sample_cp(),
            sample_names(),
            Verdict::Reject(crate::verifier::Witness::synthetic(
                "no forge named 'shred'",
                StateVector::from([1.0, 1.0]),
            )),
            Some("shred"),
            Some("invoice"),
        );
        assert_eq!(ledger.entries_for_forge("submit").len(), 1);
        assert_eq!(ledger.entries_for_forge("shred").len(), 1);
        assert_eq!(ledger.entries_for_forge("missing").len(), 0);
        assert_eq!(ledger.commits().len(), 1);
        assert_eq!(ledger.rejections().len(), 1);
    }

    #[test]
    fn entry_copies_are_stable() {
        let ledger = Ledger::new();
        ledger.append(sample_cp(), sample_names(), Verdict::Commit, None, None);
        let first = ledger.entry(0).unwrap();
        let last = ledger.last().unwrap();
        assert_eq!(first, last);
        assert_eq!(ledger.entry(7), None);
    }

    #[test]
    fn entry_serde_round_trip() {
        let ledger = Ledger::new();
        let entry = ledger.append(
            sample_cp(),
            sample_names(),
            Verdict::Commit,
            Some("submit"),
            Some("invoice"),
        );
        let json = serde_json::to_string(&entry).unwrap();
        let decoded: LedgerEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(entry, decoded);
    }
}
