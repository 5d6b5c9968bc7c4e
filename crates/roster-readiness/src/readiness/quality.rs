//! Anomalies that do not stop a report but should reach whoever maintains the roster.

use std::collections::HashSet;

use serde::Serialize;
use tracing::warn;

use super::domain::{AttendanceStatus, EventId, SoldierId, SubmissionKind};
use super::identity::IdentityMatcher;
use super::snapshot::RosterSnapshot;
use super::submissions::SubmissionLedger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceSource {
    ExpectedSet,
    Attendance,
    SafetyScore,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "finding", rename_all = "snake_case")]
pub enum DataQualityFinding {
    DuplicateRosterName {
        normalized_name: String,
        soldiers: Vec<SoldierId>,
    },
    MissingRotationGroup {
        soldier_id: SoldierId,
    },
    EmptyExpectedSet {
        event_id: EventId,
    },
    UnmatchedSubmission {
        kind: SubmissionKind,
        submitter_name: String,
    },
    AmbiguousSubmission {
        kind: SubmissionKind,
        submitter_name: String,
        candidates: Vec<SoldierId>,
    },
    /// Counted as an unexcused absence until someone supplies the reason.
    AbsenceWithoutReason {
        event_id: EventId,
        soldier_id: SoldierId,
    },
    UnknownRosterReference {
        soldier_id: SoldierId,
        source: ReferenceSource,
        #[serde(skip_serializing_if = "Option::is_none")]
        event_id: Option<EventId>,
    },
}

impl DataQualityFinding {
    pub fn describe(&self) -> String {
        match self {
            Self::DuplicateRosterName {
                normalized_name,
                soldiers,
            } => format!(
                "{} roster entries share the name '{normalized_name}'",
                soldiers.len()
            ),
            Self::MissingRotationGroup { soldier_id } => {
                format!("soldier {soldier_id} has no rotation group")
            }
            Self::EmptyExpectedSet { event_id } => {
                format!("event {event_id} expects nobody")
            }
            Self::UnmatchedSubmission {
                kind,
                submitter_name,
            } => format!("{kind} from '{submitter_name}' matches no soldier"),
            Self::AmbiguousSubmission {
                kind,
                submitter_name,
                candidates,
            } => format!(
                "{kind} from '{submitter_name}' matches {} soldiers",
                candidates.len()
            ),
            Self::AbsenceWithoutReason {
                event_id,
                soldier_id,
            } => format!("absence of soldier {soldier_id} at event {event_id} has no reason"),
            Self::UnknownRosterReference {
                soldier_id,
                source,
                event_id,
            } => match event_id {
                Some(event_id) => {
                    format!("{source:?} at event {event_id} references unknown soldier {soldier_id}")
                }
                None => format!("{source:?} references unknown soldier {soldier_id}"),
            },
        }
    }
}

/// Scan the snapshot and the already-built ledgers. Each finding is also logged.
pub fn review_data_quality(
    snapshot: &RosterSnapshot,
    matcher: &IdentityMatcher,
    ledgers: &[SubmissionLedger],
) -> Vec<DataQualityFinding> {
    let mut findings: Vec<DataQualityFinding> = matcher
        .conflicts()
        .into_iter()
        .map(|conflict| DataQualityFinding::DuplicateRosterName {
            normalized_name: conflict.normalized_name,
            soldiers: conflict.soldiers,
        })
        .collect();

    findings.extend(
        snapshot
            .soldiers
            .iter()
            .filter(|soldier| soldier.active && soldier.rotation_group.is_none())
            .map(|soldier| DataQualityFinding::MissingRotationGroup {
                soldier_id: soldier.id.clone(),
            }),
    );

    findings.extend(
        snapshot
            .events
            .iter()
            .filter(|event| event.expected.is_empty())
            .map(|event| DataQualityFinding::EmptyExpectedSet {
                event_id: event.id.clone(),
            }),
    );

    for ledger in ledgers {
        findings.extend(ledger.unmatched().iter().map(|entry| {
            DataQualityFinding::UnmatchedSubmission {
                kind: ledger.kind().clone(),
                submitter_name: entry.submitter_name.clone(),
            }
        }));
        findings.extend(ledger.ambiguous().iter().map(|entry| {
            DataQualityFinding::AmbiguousSubmission {
                kind: ledger.kind().clone(),
                submitter_name: entry.submitter_name.clone(),
                candidates: entry.candidates.clone(),
            }
        }));
    }

    findings.extend(
        snapshot
            .attendance
            .iter()
            .filter(|record| {
                record.status == AttendanceStatus::Absent && record.absence_reason.is_none()
            })
            .map(|record| DataQualityFinding::AbsenceWithoutReason {
                event_id: record.event_id.clone(),
                soldier_id: record.soldier_id.clone(),
            }),
    );

    findings.extend(unknown_references(snapshot));

    for finding in &findings {
        warn!(finding = %finding.describe(), "data quality");
    }
    findings
}

fn unknown_references(snapshot: &RosterSnapshot) -> Vec<DataQualityFinding> {
    let known: HashSet<&SoldierId> = snapshot.soldiers.iter().map(|soldier| &soldier.id).collect();

    let expected = snapshot.events.iter().flat_map(|event| {
        event
            .expected
            .iter()
            .map(move |soldier| (ReferenceSource::ExpectedSet, Some(&event.id), soldier))
    });
    let attendance = snapshot.attendance.iter().map(|record| {
        (
            ReferenceSource::Attendance,
            Some(&record.event_id),
            &record.soldier_id,
        )
    });
    let scores = snapshot
        .scores
        .iter()
        .map(|score| (ReferenceSource::SafetyScore, None, &score.soldier_id));

    let mut reported = HashSet::new();
    expected
        .chain(attendance)
        .chain(scores)
        .filter(|(_, _, soldier)| !known.contains(soldier))
        .filter(|reference| reported.insert(*reference))
        .map(
            |(source, event_id, soldier_id)| DataQualityFinding::UnknownRosterReference {
                soldier_id: soldier_id.clone(),
                source,
                event_id: event_id.cloned(),
            },
        )
        .collect()
}
