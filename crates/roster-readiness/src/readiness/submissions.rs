//! Form and signature tracking. Submissions carry only a free-text name, so every
//! record goes through the [`IdentityMatcher`] before it counts for anyone.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{Soldier, SoldierId, SubmissionKind, SubmissionRecord};
use super::identity::{normalize_name, IdentityMatcher, NameMatch};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SubmissionStatus {
    pub submitted: bool,
    pub first_submitted_at: Option<DateTime<Utc>>,
    pub submissions: u32,
}

/// One record in timestamp order, with how its name resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionEntry {
    pub submitter_name: String,
    pub submitted_at: DateTime<Utc>,
    pub outcome: NameMatch,
    /// An earlier record already carried the same normalized name.
    pub duplicate: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedSubmission {
    pub submitter_name: String,
    pub submitted_at: DateTime<Utc>,
    pub candidates: Vec<SoldierId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionLedger {
    kind: SubmissionKind,
    statuses: HashMap<SoldierId, SubmissionStatus>,
    entries: Vec<SubmissionEntry>,
    unmatched: Vec<UnresolvedSubmission>,
    ambiguous: Vec<UnresolvedSubmission>,
}

impl SubmissionLedger {
    /// Fold the records of `kind`; records of other kinds are ignored.
    pub fn build(kind: SubmissionKind, records: &[SubmissionRecord], matcher: &IdentityMatcher) -> Self {
        let mut ordered: Vec<&SubmissionRecord> =
            records.iter().filter(|record| record.kind == kind).collect();
        ordered.sort_by_key(|record| record.submitted_at);

        let mut seen_names = HashSet::new();
        let mut statuses: HashMap<SoldierId, SubmissionStatus> = HashMap::new();
        let mut entries = Vec::with_capacity(ordered.len());
        let mut unmatched = Vec::new();
        let mut ambiguous = Vec::new();

        for record in ordered {
            let duplicate = !seen_names.insert(normalize_name(&record.submitter_name));
            let outcome = matcher.match_name(&record.submitter_name);

            match &outcome {
                NameMatch::Matched(soldier) => {
                    let status = statuses.entry(soldier.clone()).or_default();
                    status.submitted = true;
                    status.first_submitted_at.get_or_insert(record.submitted_at);
                    status.submissions += 1;
                }
                NameMatch::Unmatched => unmatched.push(UnresolvedSubmission {
                    submitter_name: record.submitter_name.clone(),
                    submitted_at: record.submitted_at,
                    candidates: Vec::new(),
                }),
                NameMatch::Ambiguous(candidates) => ambiguous.push(UnresolvedSubmission {
                    submitter_name: record.submitter_name.clone(),
                    submitted_at: record.submitted_at,
                    candidates: candidates.clone(),
                }),
            }

            entries.push(SubmissionEntry {
                submitter_name: record.submitter_name.clone(),
                submitted_at: record.submitted_at,
                outcome,
                duplicate,
            });
        }

        Self {
            kind,
            statuses,
            entries,
            unmatched,
            ambiguous,
        }
    }

    pub fn kind(&self) -> &SubmissionKind {
        &self.kind
    }

    pub fn status_for(&self, soldier: &SoldierId) -> SubmissionStatus {
        self.statuses.get(soldier).copied().unwrap_or_default()
    }

    /// Active soldiers with no matched submission, ordered by name.
    pub fn missing<'a>(&self, roster: &'a [Soldier]) -> Vec<&'a Soldier> {
        let mut missing: Vec<&Soldier> = roster
            .iter()
            .filter(|soldier| soldier.active)
            .filter(|soldier| !self.status_for(&soldier.id).submitted)
            .collect();
        missing.sort_by(|a, b| {
            normalize_name(&a.full_name)
                .cmp(&normalize_name(&b.full_name))
                .then_with(|| a.id.cmp(&b.id))
        });
        missing
    }

    pub fn entries(&self) -> &[SubmissionEntry] {
        &self.entries
    }

    pub fn duplicates(&self) -> usize {
        self.entries.iter().filter(|entry| entry.duplicate).count()
    }

    pub fn unmatched(&self) -> &[UnresolvedSubmission] {
        &self.unmatched
    }

    pub fn ambiguous(&self) -> &[UnresolvedSubmission] {
        &self.ambiguous
    }
}
