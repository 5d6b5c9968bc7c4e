//! Attendance status resolution.
//!
//! Every consumer of attendance (aggregates, trend series, the audit table) goes through
//! [`resolve`] so the four-way status vocabulary is decided in exactly one place.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use super::domain::{
    AbsenceReason, AttendanceRecord, AttendanceStatus, Event, EventId, ReadinessError, SoldierId,
};

/// Status of one soldier at one event as reported downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub status: AttendanceStatus,
    /// Stored status before make-up substitution; `None` when no record exists.
    pub recorded_status: Option<AttendanceStatus>,
    pub absence_reason: Option<AbsenceReason>,
    pub made_up: bool,
    pub expected: bool,
}

impl Resolution {
    pub fn has_record(&self) -> bool {
        self.recorded_status.is_some()
    }
}

pub fn resolve(soldier: &SoldierId, event: &Event, record: Option<&AttendanceRecord>) -> Resolution {
    let expected = event.expects(soldier);

    match record {
        Some(record) => {
            let made_up =
                record.status == AttendanceStatus::Absent && record.make_up_completed;
            let status = if made_up {
                AttendanceStatus::Attended
            } else {
                record.status
            };

            Resolution {
                status,
                recorded_status: Some(record.status),
                absence_reason: record.absence_reason.clone(),
                made_up,
                expected,
            }
        }
        None => Resolution {
            status: if expected {
                AttendanceStatus::NotUpdated
            } else {
                AttendanceStatus::NotInRotation
            },
            recorded_status: None,
            absence_reason: None,
            made_up: false,
            expected,
        },
    }
}

impl AttendanceRecord {
    /// Administrative update of a record that has not been filled in yet.
    pub fn mark(
        &mut self,
        status: AttendanceStatus,
        reason: Option<AbsenceReason>,
    ) -> Result<(), ReadinessError> {
        if self.status != AttendanceStatus::NotUpdated || status == AttendanceStatus::NotUpdated {
            return Err(ReadinessError::InvalidAttendanceTransition {
                event_id: self.event_id.clone(),
                soldier_id: self.soldier_id.clone(),
                from: self.status,
                to: status,
            });
        }

        match (status, reason.is_some()) {
            (AttendanceStatus::Absent, false) => {
                return Err(self.reason_mismatch("an absence requires a reason"));
            }
            (AttendanceStatus::Absent, true) => {}
            (_, true) => return Err(self.reason_mismatch("only absences carry a reason")),
            (_, false) => {}
        }

        self.status = status;
        self.absence_reason = reason;
        Ok(())
    }

    /// Credit a completed make-up activity. The original reason is kept for audits.
    pub fn complete_make_up(&mut self) -> Result<(), ReadinessError> {
        if self.status != AttendanceStatus::Absent {
            return Err(ReadinessError::InvalidAttendanceTransition {
                event_id: self.event_id.clone(),
                soldier_id: self.soldier_id.clone(),
                from: self.status,
                to: AttendanceStatus::Attended,
            });
        }

        self.make_up_completed = true;
        Ok(())
    }

    fn reason_mismatch(&self, detail: &'static str) -> ReadinessError {
        ReadinessError::AbsenceReasonMismatch {
            event_id: self.event_id.clone(),
            soldier_id: self.soldier_id.clone(),
            detail,
        }
    }
}

/// Attendance records indexed by event then soldier; at most one per pair.
#[derive(Debug, Clone, Default)]
pub struct AttendanceBook {
    by_event: HashMap<EventId, HashMap<SoldierId, AttendanceRecord>>,
}

impl AttendanceBook {
    pub fn from_records<I>(records: I) -> Result<Self, ReadinessError>
    where
        I: IntoIterator<Item = AttendanceRecord>,
    {
        let mut book = Self::default();
        for record in records {
            book.insert(record)?;
        }
        Ok(book)
    }

    pub fn insert(&mut self, record: AttendanceRecord) -> Result<(), ReadinessError> {
        let per_event = self.by_event.entry(record.event_id.clone()).or_default();
        if per_event.contains_key(&record.soldier_id) {
            return Err(ReadinessError::DuplicateAttendanceRecord {
                event_id: record.event_id,
                soldier_id: record.soldier_id,
            });
        }
        per_event.insert(record.soldier_id.clone(), record);
        Ok(())
    }

    pub fn record(&self, event: &EventId, soldier: &SoldierId) -> Option<&AttendanceRecord> {
        self.by_event.get(event).and_then(|records| records.get(soldier))
    }

    pub fn record_mut(
        &mut self,
        event: &EventId,
        soldier: &SoldierId,
    ) -> Option<&mut AttendanceRecord> {
        self.by_event
            .get_mut(event)
            .and_then(|records| records.get_mut(soldier))
    }

    pub fn resolve(&self, soldier: &SoldierId, event: &Event) -> Resolution {
        resolve(soldier, event, self.record(&event.id, soldier))
    }

    /// Soldiers with a stored record for the event.
    pub fn recorded_soldiers(&self, event: &EventId) -> BTreeSet<&SoldierId> {
        self.by_event
            .get(event)
            .map(|records| records.keys().collect())
            .unwrap_or_default()
    }

    /// Expected soldiers plus anyone with a record, ordered by id.
    pub fn participants<'a>(&'a self, event: &'a Event) -> BTreeSet<&'a SoldierId> {
        let mut participants = self.recorded_soldiers(&event.id);
        participants.extend(event.expected.iter());
        participants
    }

    pub fn is_relevant(&self, soldier: &SoldierId, event: &Event) -> bool {
        event.expects(soldier) || self.record(&event.id, soldier).is_some()
    }

    pub fn len(&self) -> usize {
        self.by_event.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn records(&self) -> impl Iterator<Item = &AttendanceRecord> {
        self.by_event.values().flat_map(HashMap::values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn event() -> Event {
        Event::new(
            "evt-1",
            "Weekly driving drill",
            "drill",
            NaiveDate::from_ymd_opt(2025, 3, 10).expect("valid date"),
        )
        .with_expected(["s-1", "s-2"])
        .completed()
    }

    #[test]
    fn missing_record_defaults_by_expectation() {
        let book = AttendanceBook::default();
        let event = event();

        let expected = book.resolve(&SoldierId::from("s-1"), &event);
        assert_eq!(expected.status, AttendanceStatus::NotUpdated);
        assert!(expected.expected);
        assert!(!expected.has_record());

        let outsider = book.resolve(&SoldierId::from("s-9"), &event);
        assert_eq!(outsider.status, AttendanceStatus::NotInRotation);
        assert!(!outsider.expected);
    }

    #[test]
    fn stored_status_is_authoritative_even_when_not_expected() {
        let book =
            AttendanceBook::from_records([AttendanceRecord::attended("evt-1", "s-9")]).expect("book");
        let resolution = book.resolve(&SoldierId::from("s-9"), &event());
        assert_eq!(resolution.status, AttendanceStatus::Attended);
        assert!(!resolution.expected);
    }

    #[test]
    fn make_up_reports_attended_and_keeps_reason() {
        let mut record = AttendanceRecord::absent("evt-1", "s-1", "routine_leave");
        record.complete_make_up().expect("absent records accept make-up");
        let book = AttendanceBook::from_records([record]).expect("book");

        let resolution = book.resolve(&SoldierId::from("s-1"), &event());
        assert_eq!(resolution.status, AttendanceStatus::Attended);
        assert_eq!(resolution.recorded_status, Some(AttendanceStatus::Absent));
        assert!(resolution.made_up);
        assert_eq!(
            resolution.absence_reason,
            Some(AbsenceReason::from("routine_leave"))
        );
    }

    #[test]
    fn duplicate_records_are_rejected() {
        let result = AttendanceBook::from_records([
            AttendanceRecord::attended("evt-1", "s-1"),
            AttendanceRecord::absent("evt-1", "s-1", "course"),
        ]);
        assert!(matches!(
            result,
            Err(ReadinessError::DuplicateAttendanceRecord { .. })
        ));
    }

    #[test]
    fn mark_only_moves_out_of_not_updated() {
        let mut record = AttendanceRecord::new("evt-1", "s-1");
        record
            .mark(AttendanceStatus::Absent, Some(AbsenceReason::from("course")))
            .expect("not_updated -> absent");
        assert_eq!(record.status, AttendanceStatus::Absent);

        let err = record
            .mark(AttendanceStatus::Attended, None)
            .expect_err("absent cannot be re-marked");
        assert!(matches!(
            err,
            ReadinessError::InvalidAttendanceTransition {
                from: AttendanceStatus::Absent,
                to: AttendanceStatus::Attended,
                ..
            }
        ));
    }

    #[test]
    fn mark_validates_reason_presence() {
        let mut record = AttendanceRecord::new("evt-1", "s-1");
        assert!(matches!(
            record.mark(AttendanceStatus::Absent, None),
            Err(ReadinessError::AbsenceReasonMismatch { .. })
        ));
        assert!(matches!(
            record.mark(
                AttendanceStatus::Attended,
                Some(AbsenceReason::from("course"))
            ),
            Err(ReadinessError::AbsenceReasonMismatch { .. })
        ));
        assert_eq!(record.status, AttendanceStatus::NotUpdated);
    }

    #[test]
    fn make_up_requires_an_absence() {
        let mut record = AttendanceRecord::attended("evt-1", "s-1");
        assert!(record.complete_make_up().is_err());
        assert!(!record.make_up_completed);
    }

    #[test]
    fn participants_merge_expected_and_recorded() {
        let book =
            AttendanceBook::from_records([AttendanceRecord::attended("evt-1", "s-7")]).expect("book");
        let event = event();
        let participants: Vec<&str> = book
            .participants(&event)
            .into_iter()
            .map(|id| id.0.as_str())
            .collect();
        assert_eq!(participants, vec!["s-1", "s-2", "s-7"]);
    }
}
