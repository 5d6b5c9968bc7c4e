use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Stable roster identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SoldierId(pub String);

impl fmt::Display for SoldierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SoldierId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub String);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationWeek {
    A,
    B,
}

impl RotationWeek {
    pub const fn label(self) -> &'static str {
        match self {
            Self::A => "Week A",
            Self::B => "Week B",
        }
    }

    pub const fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

/// Which of the two configured weekdays a group reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryDay {
    First,
    Second,
}

/// One of the four fixed rotation cohorts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RotationGroup {
    pub week: RotationWeek,
    pub entry: EntryDay,
}

impl RotationGroup {
    pub const fn new(week: RotationWeek, entry: EntryDay) -> Self {
        Self { week, entry }
    }

    pub const fn ordered() -> [Self; 4] {
        [
            Self::new(RotationWeek::A, EntryDay::First),
            Self::new(RotationWeek::A, EntryDay::Second),
            Self::new(RotationWeek::B, EntryDay::First),
            Self::new(RotationWeek::B, EntryDay::Second),
        ]
    }

    pub const fn label(self) -> &'static str {
        match (self.week, self.entry) {
            (RotationWeek::A, EntryDay::First) => "A / entry day 1",
            (RotationWeek::A, EntryDay::Second) => "A / entry day 2",
            (RotationWeek::B, EntryDay::First) => "B / entry day 1",
            (RotationWeek::B, EntryDay::Second) => "B / entry day 2",
        }
    }
}

/// Standing eligibility tier derived from monthly safety scores.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SafetyStatus {
    #[default]
    Ok,
    Warning,
    Critical,
    Suspended,
}

impl SafetyStatus {
    pub const fn ordered() -> [Self; 4] {
        [Self::Ok, Self::Warning, Self::Critical, Self::Suspended]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Warning => "Warning",
            Self::Critical => "Critical",
            Self::Suspended => "Suspended",
        }
    }

    /// Follow-up owed by the unit for this tier.
    pub const fn required_action(self) -> Option<&'static str> {
        match self {
            Self::Ok => None,
            Self::Warning => Some("debrief conversation"),
            Self::Critical => Some("control test"),
            Self::Suspended => Some("driving suspended pending review"),
        }
    }
}

impl fmt::Display for SafetyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Roster entry. The safety fields mirror the last [`EscalationUpdate`] applied and
/// cannot be written any other way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Soldier {
    pub id: SoldierId,
    pub full_name: String,
    #[serde(default)]
    pub personal_number: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub rotation_group: Option<RotationGroup>,
    #[serde(default)]
    current_safety_score: Option<u8>,
    #[serde(default)]
    consecutive_low_months: u8,
    #[serde(default)]
    safety_status: SafetyStatus,
}

fn default_active() -> bool {
    true
}

impl Soldier {
    pub fn new(
        id: impl Into<String>,
        full_name: impl Into<String>,
        personal_number: impl Into<String>,
    ) -> Self {
        Self {
            id: SoldierId(id.into()),
            full_name: full_name.into(),
            personal_number: personal_number.into(),
            active: true,
            rotation_group: None,
            current_safety_score: None,
            consecutive_low_months: 0,
            safety_status: SafetyStatus::Ok,
        }
    }

    pub fn with_rotation_group(mut self, group: RotationGroup) -> Self {
        self.rotation_group = Some(group);
        self
    }

    /// Soft delete; historical records keep referencing the id.
    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn current_safety_score(&self) -> Option<u8> {
        self.current_safety_score
    }

    pub fn consecutive_low_months(&self) -> u8 {
        self.consecutive_low_months
    }

    pub fn safety_status(&self) -> SafetyStatus {
        self.safety_status
    }

    /// Refresh the cached safety fields. Updates addressed to another soldier are ignored.
    pub fn apply_escalation(&mut self, update: &EscalationUpdate) -> bool {
        if update.soldier_id != self.id {
            return false;
        }

        self.current_safety_score = update.current_safety_score;
        self.consecutive_low_months = update.consecutive_low_months;
        self.safety_status = update.safety_status;
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Pending,
    InProgress,
    Completed,
}

impl EventStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventCategory(pub String);

impl From<&str> for EventCategory {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Scheduled occurrence with its curated roster of expected soldiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub title: String,
    pub category: EventCategory,
    pub date: NaiveDate,
    pub status: EventStatus,
    #[serde(default)]
    pub expected: BTreeSet<SoldierId>,
}

impl Event {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        category: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self {
            id: EventId(id.into()),
            title: title.into(),
            category: EventCategory(category.into()),
            date,
            status: EventStatus::Pending,
            expected: BTreeSet::new(),
        }
    }

    pub fn with_expected<I, S>(mut self, soldiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expected = soldiers
            .into_iter()
            .map(|id| SoldierId(id.into()))
            .collect();
        self
    }

    pub fn completed(mut self) -> Self {
        self.status = EventStatus::Completed;
        self
    }

    pub fn is_completed(&self) -> bool {
        self.status == EventStatus::Completed
    }

    pub fn expects(&self, soldier: &SoldierId) -> bool {
        self.expected.contains(soldier)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Attended,
    Absent,
    NotInRotation,
    NotUpdated,
}

impl AttendanceStatus {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::Attended,
            Self::Absent,
            Self::NotInRotation,
            Self::NotUpdated,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Attended => "Attended",
            Self::Absent => "Absent",
            Self::NotInRotation => "Not In Rotation",
            Self::NotUpdated => "Not Updated",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Catalog code for an absence, e.g. `course` or `awol`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AbsenceReason(pub String);

impl AbsenceReason {
    pub fn code(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AbsenceReason {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for AbsenceReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stored outcome for one (event, soldier) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub event_id: EventId,
    pub soldier_id: SoldierId,
    pub status: AttendanceStatus,
    #[serde(default)]
    pub absence_reason: Option<AbsenceReason>,
    #[serde(default)]
    pub make_up_completed: bool,
}

impl AttendanceRecord {
    /// Fresh record awaiting an administrative update.
    pub fn new(event_id: impl Into<String>, soldier_id: impl Into<String>) -> Self {
        Self {
            event_id: EventId(event_id.into()),
            soldier_id: SoldierId(soldier_id.into()),
            status: AttendanceStatus::NotUpdated,
            absence_reason: None,
            make_up_completed: false,
        }
    }

    pub fn attended(event_id: impl Into<String>, soldier_id: impl Into<String>) -> Self {
        Self {
            status: AttendanceStatus::Attended,
            ..Self::new(event_id, soldier_id)
        }
    }

    pub fn absent(
        event_id: impl Into<String>,
        soldier_id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            status: AttendanceStatus::Absent,
            absence_reason: Some(AbsenceReason(reason.into())),
            ..Self::new(event_id, soldier_id)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionKind(pub String);

impl SubmissionKind {
    pub fn trip_exit() -> Self {
        Self("trip_exit".to_string())
    }

    pub fn procedure_signature() -> Self {
        Self("procedure_signature".to_string())
    }
}

impl From<&str> for SubmissionKind {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for SubmissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Form or signature captured by name only; no roster foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub kind: SubmissionKind,
    pub submitter_name: String,
    pub submitted_at: DateTime<Utc>,
}

/// Calendar month, serialized as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self, ReadinessError> {
        if !(1..=12).contains(&month) {
            return Err(ReadinessError::InvalidMonth(format!("{year:04}-{month:02}")));
        }
        Ok(Self { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(self) -> i32 {
        self.year
    }

    pub fn month(self) -> u32 {
        self.month
    }

    pub fn pred(self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    /// `count` consecutive months ending with `self`, oldest first.
    pub fn window(self, count: usize) -> Vec<Self> {
        let mut months = Vec::with_capacity(count);
        let mut cursor = self;
        for _ in 0..count {
            months.push(cursor);
            cursor = cursor.pred();
        }
        months.reverse();
        months
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = ReadinessError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let invalid = || ReadinessError::InvalidMonth(raw.to_string());
        let (year, month) = trimmed.split_once('-').ok_or_else(invalid)?;
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        Self::new(year, month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Imported telemetry summary for one soldier and month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlySafetyScore {
    pub soldier_id: SoldierId,
    pub month: YearMonth,
    pub score: u8,
    #[serde(default)]
    pub violations: u32,
    #[serde(default)]
    pub harsh_events: u32,
}

impl MonthlySafetyScore {
    pub fn new(soldier_id: impl Into<String>, month: YearMonth, score: u8) -> Self {
        Self {
            soldier_id: SoldierId(soldier_id.into()),
            month,
            score,
            violations: 0,
            harsh_events: 0,
        }
    }

    pub fn validate(&self) -> Result<(), ReadinessError> {
        if self.score > 100 {
            return Err(ReadinessError::ScoreOutOfRange {
                soldier_id: self.soldier_id.clone(),
                month: self.month,
                score: self.score,
            });
        }
        Ok(())
    }
}

/// Materialized safety fields to persist on the soldier.
///
/// `consecutive_low_months` always reflects the score history. When
/// `held_by_suspension` is set the status stays `suspended` even though that count
/// alone would give a lower tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationUpdate {
    pub soldier_id: SoldierId,
    pub current_safety_score: Option<u8>,
    pub consecutive_low_months: u8,
    pub safety_status: SafetyStatus,
    #[serde(default)]
    pub held_by_suspension: bool,
}

impl EscalationUpdate {
    /// Standing for a soldier whose score history was emptied.
    pub fn cleared(soldier_id: SoldierId) -> Self {
        Self {
            soldier_id,
            current_safety_score: None,
            consecutive_low_months: 0,
            safety_status: SafetyStatus::Ok,
            held_by_suspension: false,
        }
    }
}

/// Caller errors; every other anomaly defaults or becomes a data-quality finding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReadinessError {
    #[error("soldier {0} has no safety score history")]
    NoScoreHistory(SoldierId),
    #[error("event {event_id} is {status}; only completed events can be aggregated")]
    EventNotCompleted {
        event_id: EventId,
        status: EventStatus,
    },
    #[error("absence reason '{0}' is not in the catalog")]
    UnknownAbsenceReason(String),
    #[error("event {event_id} cannot move from {from} to {to}")]
    InvalidEventTransition {
        event_id: EventId,
        from: EventStatus,
        to: EventStatus,
    },
    #[error("attendance for soldier {soldier_id} at event {event_id} cannot move from {from} to {to}")]
    InvalidAttendanceTransition {
        event_id: EventId,
        soldier_id: SoldierId,
        from: AttendanceStatus,
        to: AttendanceStatus,
    },
    #[error("attendance for soldier {soldier_id} at event {event_id}: {detail}")]
    AbsenceReasonMismatch {
        event_id: EventId,
        soldier_id: SoldierId,
        detail: &'static str,
    },
    #[error("duplicate attendance record for soldier {soldier_id} at event {event_id}")]
    DuplicateAttendanceRecord {
        event_id: EventId,
        soldier_id: SoldierId,
    },
    #[error("score {score} for soldier {soldier_id} in {month} is outside 0-100")]
    ScoreOutOfRange {
        soldier_id: SoldierId,
        month: YearMonth,
        score: u8,
    },
    #[error("invalid month '{0}', expected YYYY-MM")]
    InvalidMonth(String),
    #[error("event {0} is not in the snapshot")]
    UnknownEvent(EventId),
}
