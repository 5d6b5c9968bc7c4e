use chrono::Duration;

use super::domain::{Event, EventId, EventStatus, ReadinessError};

pub const DEFAULT_COPY_FORWARD_DAYS: i64 = 14;

impl Event {
    /// Move the event forward. Completed events are final and nothing moves back.
    pub fn advance(&mut self, next: EventStatus) -> Result<(), ReadinessError> {
        let allowed = matches!(
            (self.status, next),
            (EventStatus::Pending, EventStatus::InProgress)
                | (EventStatus::Pending, EventStatus::Completed)
                | (EventStatus::InProgress, EventStatus::Completed)
        );
        if !allowed {
            return Err(ReadinessError::InvalidEventTransition {
                event_id: self.id.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

/// Replace `target`'s expected set with the one from the same-category event held
/// `offset_days` earlier. Returns the source event id, or `None` when there is none.
///
/// Several candidates on that date resolve to the lowest event id.
pub fn copy_forward_expected(
    events: &[Event],
    target: &mut Event,
    offset_days: i64,
) -> Option<EventId> {
    let source_date = target.date.checked_sub_signed(Duration::days(offset_days))?;
    let source = events
        .iter()
        .filter(|event| event.id != target.id)
        .filter(|event| event.category == target.category && event.date == source_date)
        .min_by(|a, b| a.id.cmp(&b.id))?;

    target.expected = source.expected.clone();
    Some(source.id.clone())
}
