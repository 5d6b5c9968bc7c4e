use std::collections::BTreeMap;

use serde::Serialize;

use super::super::attendance::{AttendanceBook, Resolution};
use super::super::catalog::AbsenceCatalog;
use super::super::domain::{
    AbsenceReason, AttendanceStatus, Event, EventCategory, ReadinessError, Soldier, SoldierId,
};

/// Attendance counts for one soldier or a whole unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ComplianceStats {
    pub attended: u32,
    /// Countable absences only.
    pub absent: u32,
    pub non_countable_absent: u32,
    pub not_in_rotation: u32,
    pub not_updated: u32,
}

impl ComplianceStats {
    /// `attended / (attended + absent)` as a percentage; 100 with nothing to judge.
    pub fn percentage(&self) -> f64 {
        let denominator = self.attended + self.absent;
        if denominator == 0 {
            return 100.0;
        }
        (f64::from(self.attended) / f64::from(denominator) * 100.0).clamp(0.0, 100.0)
    }

    pub fn judged(&self) -> u32 {
        self.attended + self.absent
    }

    pub fn merge(&mut self, other: &ComplianceStats) {
        self.attended += other.attended;
        self.absent += other.absent;
        self.non_countable_absent += other.non_countable_absent;
        self.not_in_rotation += other.not_in_rotation;
        self.not_updated += other.not_updated;
    }

    fn tally(
        &mut self,
        resolution: &Resolution,
        catalog: &AbsenceCatalog,
    ) -> Result<(), ReadinessError> {
        match resolution.status {
            AttendanceStatus::Attended => self.attended += 1,
            AttendanceStatus::Absent => {
                if catalog.countability(resolution.absence_reason.as_ref())? {
                    self.absent += 1;
                } else {
                    self.non_countable_absent += 1;
                }
            }
            AttendanceStatus::NotInRotation => self.not_in_rotation += 1,
            AttendanceStatus::NotUpdated => self.not_updated += 1,
        }
        Ok(())
    }
}

/// Restricts which completed events feed an aggregate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub category: Option<EventCategory>,
}

impl EventFilter {
    pub fn category(category: impl Into<String>) -> Self {
        Self {
            category: Some(EventCategory(category.into())),
        }
    }

    pub fn matches(&self, event: &Event) -> bool {
        self.category
            .as_ref()
            .map(|category| &event.category == category)
            .unwrap_or(true)
    }
}

/// Completed events where the soldier was expected or has a record.
pub fn relevant_events<'a>(
    soldier: &SoldierId,
    events: &'a [Event],
    book: &AttendanceBook,
) -> Vec<&'a Event> {
    events
        .iter()
        .filter(|event| event.is_completed())
        .filter(|event| book.is_relevant(soldier, event))
        .collect()
}

fn ensure_completed(event: &Event) -> Result<(), ReadinessError> {
    if event.is_completed() {
        Ok(())
    } else {
        Err(ReadinessError::EventNotCompleted {
            event_id: event.id.clone(),
            status: event.status,
        })
    }
}

/// Fold the soldier's statuses across `events`. Events the soldier is unrelated to are
/// skipped; any event that is not completed is rejected.
pub fn aggregate_soldier<'a, I>(
    soldier: &SoldierId,
    events: I,
    book: &AttendanceBook,
    catalog: &AbsenceCatalog,
) -> Result<ComplianceStats, ReadinessError>
where
    I: IntoIterator<Item = &'a Event>,
{
    let mut stats = ComplianceStats::default();
    for event in events {
        ensure_completed(event)?;
        if !book.is_relevant(soldier, event) {
            continue;
        }
        stats.tally(&book.resolve(soldier, event), catalog)?;
    }
    Ok(stats)
}

/// Fold every participant (expected or recorded) of each event, whether or not they are
/// still on the roster. Agrees row for row with the comprehensive table.
pub fn aggregate_events<'a, I>(
    events: I,
    book: &AttendanceBook,
    catalog: &AbsenceCatalog,
) -> Result<ComplianceStats, ReadinessError>
where
    I: IntoIterator<Item = &'a Event>,
{
    let mut stats = ComplianceStats::default();
    for event in events {
        ensure_completed(event)?;
        for soldier in book.participants(event) {
            stats.tally(&book.resolve(soldier, event), catalog)?;
        }
    }
    Ok(stats)
}

#[derive(Debug, Clone, Serialize)]
pub struct SoldierCompliance {
    pub soldier_id: SoldierId,
    pub full_name: String,
    pub stats: ComplianceStats,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnitCompliance {
    pub totals: ComplianceStats,
    pub percentage: f64,
    pub events_counted: usize,
    pub soldiers: Vec<SoldierCompliance>,
}

/// Unit totals over the completed events matching `filter`, plus a per-soldier listing
/// for the active roster. Non-completed events are ignored here; they are not part of
/// any period yet.
pub fn aggregate_unit(
    roster: &[Soldier],
    events: &[Event],
    book: &AttendanceBook,
    catalog: &AbsenceCatalog,
    filter: &EventFilter,
) -> Result<UnitCompliance, ReadinessError> {
    let counted: Vec<&Event> = events
        .iter()
        .filter(|event| event.is_completed() && filter.matches(event))
        .collect();

    let totals = aggregate_events(counted.iter().copied(), book, catalog)?;
    let mut soldiers = Vec::new();
    for soldier in roster.iter().filter(|soldier| soldier.active) {
        let stats = aggregate_soldier(&soldier.id, counted.iter().copied(), book, catalog)?;
        soldiers.push(SoldierCompliance {
            soldier_id: soldier.id.clone(),
            full_name: soldier.full_name.clone(),
            stats,
            percentage: stats.percentage(),
        });
    }

    Ok(UnitCompliance {
        percentage: totals.percentage(),
        totals,
        events_counted: counted.len(),
        soldiers,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReasonCount {
    pub reason: AbsenceReason,
    pub label: String,
    pub countable: bool,
    pub count: u32,
}

/// Absences per catalog reason across completed events, made-up absences excluded.
/// Absences recorded without a reason are not listed.
pub fn absence_breakdown(
    events: &[Event],
    book: &AttendanceBook,
    catalog: &AbsenceCatalog,
) -> Result<Vec<ReasonCount>, ReadinessError> {
    let mut counts: BTreeMap<AbsenceReason, u32> = BTreeMap::new();
    for event in events.iter().filter(|event| event.is_completed()) {
        for soldier in book.recorded_soldiers(&event.id) {
            let resolution = book.resolve(soldier, event);
            if resolution.status != AttendanceStatus::Absent {
                continue;
            }
            if let Some(reason) = resolution.absence_reason {
                *counts.entry(reason).or_default() += 1;
            }
        }
    }

    counts
        .into_iter()
        .map(|(reason, count)| {
            let entry = catalog.entry(&reason)?;
            Ok(ReasonCount {
                label: entry.label.clone(),
                countable: entry.countable,
                reason,
                count,
            })
        })
        .collect()
}
