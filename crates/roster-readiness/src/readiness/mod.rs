//! Roster readiness: rotation, attendance compliance, form tracking and the monthly
//! safety escalation for a unit of drivers.

pub mod attendance;
pub mod catalog;
pub mod compliance;
pub mod domain;
pub mod escalation;
pub mod events;
pub mod identity;
pub mod quality;
pub mod report;
pub mod rotation;
pub mod snapshot;
pub mod submissions;
pub mod table;

pub use attendance::{resolve, AttendanceBook, Resolution};
pub use catalog::{AbsenceCatalog, AbsenceReasonEntry};
pub use compliance::{
    absence_breakdown, aggregate_events, aggregate_soldier, aggregate_unit, monthly_trend,
    relevant_events, soldier_trend, ComplianceStats, EventFilter, ReasonCount, SoldierCompliance,
    TrendPoint, UnitCompliance,
};
pub use domain::{
    AbsenceReason, AttendanceRecord, AttendanceStatus, EntryDay, EscalationUpdate, Event,
    EventCategory, EventId, EventStatus, MonthlySafetyScore, ReadinessError, RotationGroup,
    RotationWeek, SafetyStatus, Soldier, SoldierId, SubmissionKind, SubmissionRecord, YearMonth,
};
pub use escalation::{
    escalation_router, evaluate_standing, EscalationOutcome, EscalationPolicy, EscalationService,
    EscalationServiceError, RepositoryError, SafetyScoreRepository,
};
pub use events::{copy_forward_expected, DEFAULT_COPY_FORWARD_DAYS};
pub use identity::{normalize_name, IdentityMatcher, NameConflict, NameMatch};
pub use quality::{review_data_quality, DataQualityFinding, ReferenceSource};
pub use report::views::ReadinessReportSummary;
pub use report::{ReadinessReport, ReportSettings};
pub use rotation::{ActiveRotation, ParityRule, RotationCalendar, RotationSettings, WeekParity};
pub use snapshot::RosterSnapshot;
pub use submissions::{SubmissionLedger, SubmissionStatus};
pub use table::{ComprehensiveRow, ComprehensiveTable};
