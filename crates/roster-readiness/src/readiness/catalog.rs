use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{AbsenceReason, ReadinessError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbsenceReasonEntry {
    pub code: AbsenceReason,
    pub label: String,
    /// Countable absences stay in the attendance denominator.
    pub countable: bool,
}

const STANDARD_REASONS: &[(&str, &str, bool)] = &[
    ("course", "Course attendance", false),
    ("routine_leave", "Routine leave", true),
    ("extended_leave", "Extended leave", false),
    ("unauthorized_absence", "Unauthorized absence", true),
    ("awol", "AWOL", false),
    ("incarceration", "Incarceration", false),
    ("medical_leave", "Medical leave", false),
];

/// Closed set of absence reasons and whether each one counts against attendance.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<AbsenceReasonEntry>", into = "Vec<AbsenceReasonEntry>")]
pub struct AbsenceCatalog {
    entries: BTreeMap<AbsenceReason, AbsenceReasonEntry>,
}

impl AbsenceCatalog {
    pub fn standard() -> Self {
        STANDARD_REASONS
            .iter()
            .fold(Self::default(), |catalog, (code, label, countable)| {
                catalog.with_reason(*code, *label, *countable)
            })
    }

    pub fn with_reason(mut self, code: &str, label: &str, countable: bool) -> Self {
        self.register(AbsenceReasonEntry {
            code: AbsenceReason::from(code),
            label: label.to_string(),
            countable,
        });
        self
    }

    /// Adds or replaces an entry.
    pub fn register(&mut self, entry: AbsenceReasonEntry) {
        self.entries.insert(entry.code.clone(), entry);
    }

    pub fn entry(&self, reason: &AbsenceReason) -> Result<&AbsenceReasonEntry, ReadinessError> {
        self.entries
            .get(reason)
            .ok_or_else(|| ReadinessError::UnknownAbsenceReason(reason.0.clone()))
    }

    pub fn is_countable(&self, reason: &AbsenceReason) -> Result<bool, ReadinessError> {
        self.entry(reason).map(|entry| entry.countable)
    }

    /// Countability of an absence; an absence without a reason is treated as unexcused
    /// and surfaced as a data-quality finding by the report.
    pub fn countability(&self, reason: Option<&AbsenceReason>) -> Result<bool, ReadinessError> {
        match reason {
            Some(reason) => self.is_countable(reason),
            None => Ok(true),
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &AbsenceReasonEntry> {
        self.entries.values()
    }
}

impl From<Vec<AbsenceReasonEntry>> for AbsenceCatalog {
    fn from(entries: Vec<AbsenceReasonEntry>) -> Self {
        let mut catalog = Self::default();
        for entry in entries {
            catalog.register(entry);
        }
        catalog
    }
}

impl From<AbsenceCatalog> for Vec<AbsenceReasonEntry> {
    fn from(catalog: AbsenceCatalog) -> Self {
        catalog.entries.into_values().collect()
    }
}
