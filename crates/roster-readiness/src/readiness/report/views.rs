use chrono::NaiveDate;
use serde::Serialize;

use super::super::catalog::AbsenceCatalog;
use super::super::compliance::{ComplianceStats, ReasonCount, SoldierCompliance, TrendPoint};
use super::super::domain::{SafetyStatus, SoldierId, SubmissionKind};
use super::super::quality::DataQualityFinding;
use super::super::table::ComprehensiveRow;

#[derive(Debug, Clone, Serialize)]
pub struct RosterEntryView {
    pub soldier_id: SoldierId,
    pub full_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RotationView {
    pub date: NaiveDate,
    pub iso_year: i32,
    pub week_number: u32,
    pub week_label: &'static str,
    pub active_groups: Vec<&'static str>,
    pub on_rotation: Vec<RosterEntryView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnitComplianceView {
    pub percentage: f64,
    pub events_counted: usize,
    pub totals: ComplianceStats,
    pub soldiers: Vec<SoldierCompliance>,
    pub absences: Vec<ReasonCount>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionSummaryView {
    pub kind: SubmissionKind,
    pub submitted: usize,
    pub missing: Vec<RosterEntryView>,
    pub duplicates: usize,
    pub unmatched: usize,
    pub ambiguous: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SafetyTierEntry {
    pub status: SafetyStatus,
    pub status_label: &'static str,
    pub soldiers: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StandingEntry {
    pub soldier_id: SoldierId,
    pub full_name: String,
    pub safety_status: SafetyStatus,
    pub status_label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_action: Option<&'static str>,
    pub current_safety_score: Option<u8>,
    pub consecutive_low_months: u8,
    pub held_by_suspension: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FindingView {
    pub description: String,
    #[serde(flatten)]
    pub finding: DataQualityFinding,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReadinessReportSummary {
    pub as_of: NaiveDate,
    pub rotation: RotationView,
    pub compliance: UnitComplianceView,
    pub trend: Vec<TrendPoint>,
    pub submissions: Vec<SubmissionSummaryView>,
    pub safety_tiers: Vec<SafetyTierEntry>,
    /// Soldiers with score history, most severe first.
    pub standings: Vec<StandingEntry>,
    pub table: Vec<ComprehensiveRow>,
    pub findings: Vec<FindingView>,
    pub catalog: AbsenceCatalog,
}
