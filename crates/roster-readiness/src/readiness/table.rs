use std::cmp::Ordering;
use std::collections::HashMap;
use std::io::Write;

use chrono::NaiveDate;
use serde::Serialize;

use super::attendance::AttendanceBook;
use super::domain::{
    AbsenceReason, AttendanceStatus, Event, EventCategory, EventId, Soldier, SoldierId,
};
use super::identity::normalize_name;

/// One soldier at one completed event, flattened for audits and spreadsheets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComprehensiveRow {
    pub event_date: NaiveDate,
    pub event_id: EventId,
    pub event_title: String,
    pub event_category: EventCategory,
    pub soldier_id: SoldierId,
    pub soldier_name: String,
    pub personal_number: String,
    pub status: AttendanceStatus,
    pub status_label: &'static str,
    pub absence_reason: Option<AbsenceReason>,
    pub made_up: bool,
    pub expected: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ComprehensiveTable {
    rows: Vec<ComprehensiveRow>,
}

impl ComprehensiveTable {
    /// Rows for every (completed event, soldier) pair where the soldier was expected or
    /// has a record, newest event first, then by soldier name.
    pub fn build(roster: &[Soldier], events: &[Event], book: &AttendanceBook) -> Self {
        let by_id: HashMap<&SoldierId, &Soldier> =
            roster.iter().map(|soldier| (&soldier.id, soldier)).collect();

        let mut rows = Vec::new();
        for event in events.iter().filter(|event| event.is_completed()) {
            for soldier_id in book.participants(event) {
                let resolution = book.resolve(soldier_id, event);
                let soldier = by_id.get(soldier_id);

                rows.push(ComprehensiveRow {
                    event_date: event.date,
                    event_id: event.id.clone(),
                    event_title: event.title.clone(),
                    event_category: event.category.clone(),
                    soldier_id: soldier_id.clone(),
                    soldier_name: soldier
                        .map(|soldier| soldier.full_name.clone())
                        .unwrap_or_else(|| soldier_id.0.clone()),
                    personal_number: soldier
                        .map(|soldier| soldier.personal_number.clone())
                        .unwrap_or_default(),
                    status: resolution.status,
                    status_label: resolution.status.label(),
                    absence_reason: resolution.absence_reason,
                    made_up: resolution.made_up,
                    expected: resolution.expected,
                });
            }
        }

        rows.sort_by(compare_rows);
        Self { rows }
    }

    pub fn rows(&self) -> &[ComprehensiveRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<ComprehensiveRow> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Spreadsheet export with a header row, one line per row.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut out = csv::Writer::from_writer(writer);
        out.write_record(CSV_HEADER)?;
        for row in &self.rows {
            out.write_record([
                row.event_date.to_string(),
                row.event_id.to_string(),
                row.event_title.clone(),
                row.event_category.0.clone(),
                row.soldier_id.to_string(),
                row.soldier_name.clone(),
                row.personal_number.clone(),
                row.status_label.to_string(),
                row.absence_reason
                    .as_ref()
                    .map(|reason| reason.to_string())
                    .unwrap_or_default(),
                yes_no(row.made_up).to_string(),
                yes_no(row.expected).to_string(),
            ])?;
        }
        out.flush()?;
        Ok(())
    }
}

const CSV_HEADER: [&str; 11] = [
    "event_date",
    "event_id",
    "event_title",
    "event_category",
    "soldier_id",
    "soldier_name",
    "personal_number",
    "status",
    "absence_reason",
    "made_up",
    "expected",
];

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

fn compare_rows(a: &ComprehensiveRow, b: &ComprehensiveRow) -> Ordering {
    b.event_date
        .cmp(&a.event_date)
        .then_with(|| a.event_id.cmp(&b.event_id))
        .then_with(|| normalize_name(&a.soldier_name).cmp(&normalize_name(&b.soldier_name)))
        .then_with(|| a.soldier_id.cmp(&b.soldier_id))
}
