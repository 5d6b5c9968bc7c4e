use serde::{Deserialize, Serialize};

use super::attendance::AttendanceBook;
use super::catalog::AbsenceCatalog;
use super::domain::{
    AttendanceRecord, Event, EventId, MonthlySafetyScore, ReadinessError, Soldier,
    SubmissionRecord,
};
use super::events::copy_forward_expected;

/// Everything the engine reads, captured at one point in time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RosterSnapshot {
    pub soldiers: Vec<Soldier>,
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub attendance: Vec<AttendanceRecord>,
    #[serde(default)]
    pub submissions: Vec<SubmissionRecord>,
    #[serde(default)]
    pub scores: Vec<MonthlySafetyScore>,
    /// Falls back to [`AbsenceCatalog::standard`].
    #[serde(default)]
    pub catalog: Option<AbsenceCatalog>,
}

impl RosterSnapshot {
    pub fn attendance_book(&self) -> Result<AttendanceBook, ReadinessError> {
        AttendanceBook::from_records(self.attendance.iter().cloned())
    }

    pub fn catalog(&self) -> AbsenceCatalog {
        self.catalog.clone().unwrap_or_else(AbsenceCatalog::standard)
    }

    /// Refill `event`'s expected set from the same-category event held `offset_days`
    /// earlier. Returns the source event, if one was found.
    pub fn copy_forward_expected(
        &mut self,
        event: &EventId,
        offset_days: i64,
    ) -> Result<Option<EventId>, ReadinessError> {
        let index = self
            .events
            .iter()
            .position(|candidate| &candidate.id == event)
            .ok_or_else(|| ReadinessError::UnknownEvent(event.clone()))?;

        let mut target = self.events[index].clone();
        let source = copy_forward_expected(&self.events, &mut target, offset_days);
        self.events[index] = target;
        Ok(source)
    }
}
