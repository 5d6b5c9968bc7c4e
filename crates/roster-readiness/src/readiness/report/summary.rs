use std::collections::HashMap;

use chrono::NaiveDate;

use super::super::catalog::AbsenceCatalog;
use super::super::compliance::{
    absence_breakdown, aggregate_unit, monthly_trend, EventFilter, ReasonCount, TrendPoint,
    UnitCompliance, DEFAULT_TREND_MONTHS,
};
use super::super::domain::{
    ReadinessError, SafetyStatus, Soldier, SoldierId, SubmissionKind,
};
use super::super::escalation::{
    evaluate_standing, settle, EscalationOutcome, EscalationPolicy, RecomputeTrigger,
};
use super::super::identity::{normalize_name, IdentityMatcher};
use super::super::quality::{review_data_quality, DataQualityFinding};
use super::super::rotation::{ActiveRotation, RotationCalendar, RotationSettings};
use super::super::snapshot::RosterSnapshot;
use super::super::submissions::SubmissionLedger;
use super::super::table::ComprehensiveTable;
use super::views::{
    FindingView, ReadinessReportSummary, RosterEntryView, RotationView, SafetyTierEntry,
    StandingEntry, SubmissionSummaryView, UnitComplianceView,
};

#[derive(Debug, Clone)]
pub struct ReportSettings {
    pub rotation: RotationSettings,
    pub policy: EscalationPolicy,
    pub trend_months: usize,
    pub filter: EventFilter,
    pub submission_kinds: Vec<SubmissionKind>,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            rotation: RotationSettings::default(),
            policy: EscalationPolicy::default(),
            trend_months: DEFAULT_TREND_MONTHS,
            filter: EventFilter::default(),
            submission_kinds: vec![
                SubmissionKind::trip_exit(),
                SubmissionKind::procedure_signature(),
            ],
        }
    }
}

/// Every component run once over a snapshot.
#[derive(Debug, Clone)]
pub struct ReadinessReport {
    pub as_of: NaiveDate,
    /// Snapshot roster with the safety fields refreshed from the score history.
    pub roster: Vec<Soldier>,
    pub rotation: ActiveRotation,
    pub on_rotation: Vec<SoldierId>,
    pub unit: UnitCompliance,
    pub trend: Vec<TrendPoint>,
    pub absences: Vec<ReasonCount>,
    pub ledgers: Vec<SubmissionLedger>,
    pub standings: Vec<EscalationOutcome>,
    pub table: ComprehensiveTable,
    pub findings: Vec<DataQualityFinding>,
    pub catalog: AbsenceCatalog,
}

impl ReadinessReport {
    pub fn build(
        snapshot: &RosterSnapshot,
        today: NaiveDate,
        settings: &ReportSettings,
    ) -> Result<Self, ReadinessError> {
        let book = snapshot.attendance_book()?;
        let catalog = snapshot.catalog();
        let matcher = IdentityMatcher::from_roster(&snapshot.soldiers);
        let calendar = RotationCalendar::new(settings.rotation);

        let rotation = calendar.active_groups(today);
        let on_rotation = calendar
            .on_rotation(&snapshot.soldiers, today)
            .into_iter()
            .map(|soldier| soldier.id.clone())
            .collect();

        let unit = aggregate_unit(
            &snapshot.soldiers,
            &snapshot.events,
            &book,
            &catalog,
            &settings.filter,
        )?;
        let trend = monthly_trend(
            &snapshot.events,
            &book,
            &catalog,
            &settings.filter,
            today,
            settings.trend_months,
        )?;
        let absences = absence_breakdown(&snapshot.events, &book, &catalog)?;

        let ledgers: Vec<SubmissionLedger> = settings
            .submission_kinds
            .iter()
            .map(|kind| SubmissionLedger::build(kind.clone(), &snapshot.submissions, &matcher))
            .collect();

        let mut roster = snapshot.soldiers.clone();
        let mut standings = Vec::new();
        for soldier in roster.iter_mut() {
            let computed = match evaluate_standing(&soldier.id, &snapshot.scores, &settings.policy)
            {
                Ok(update) => update,
                Err(ReadinessError::NoScoreHistory(_)) => continue,
                Err(error) => return Err(error),
            };
            let outcome = settle(
                computed,
                Some(soldier.safety_status()),
                RecomputeTrigger::Refresh,
                &settings.policy,
            );
            soldier.apply_escalation(&outcome.update);
            standings.push(outcome);
        }

        let table = ComprehensiveTable::build(&snapshot.soldiers, &snapshot.events, &book);
        let findings = review_data_quality(snapshot, &matcher, &ledgers);

        Ok(Self {
            as_of: today,
            roster,
            rotation,
            on_rotation,
            unit,
            trend,
            absences,
            ledgers,
            standings,
            table,
            findings,
            catalog,
        })
    }

    pub fn summary(&self) -> ReadinessReportSummary {
        let names: HashMap<&SoldierId, &str> = self
            .roster
            .iter()
            .map(|soldier| (&soldier.id, soldier.full_name.as_str()))
            .collect();
        let entry = |id: &SoldierId| RosterEntryView {
            soldier_id: id.clone(),
            full_name: names
                .get(id)
                .map(|name| name.to_string())
                .unwrap_or_else(|| id.0.clone()),
        };

        let rotation = RotationView {
            date: self.rotation.date,
            iso_year: self.rotation.iso_year,
            week_number: self.rotation.week_number,
            week_label: self.rotation.week_label,
            active_groups: self.rotation.groups.iter().map(|group| group.label()).collect(),
            on_rotation: self.on_rotation.iter().map(entry).collect(),
        };

        let compliance = UnitComplianceView {
            percentage: self.unit.percentage,
            events_counted: self.unit.events_counted,
            totals: self.unit.totals,
            soldiers: self.unit.soldiers.clone(),
            absences: self.absences.clone(),
        };

        let submissions = self
            .ledgers
            .iter()
            .map(|ledger| {
                let missing: Vec<RosterEntryView> = ledger
                    .missing(&self.roster)
                    .into_iter()
                    .map(|soldier| entry(&soldier.id))
                    .collect();
                let submitted = self
                    .roster
                    .iter()
                    .filter(|soldier| soldier.active)
                    .filter(|soldier| ledger.status_for(&soldier.id).submitted)
                    .count();
                SubmissionSummaryView {
                    kind: ledger.kind().clone(),
                    submitted,
                    missing,
                    duplicates: ledger.duplicates(),
                    unmatched: ledger.unmatched().len(),
                    ambiguous: ledger.ambiguous().len(),
                }
            })
            .collect();

        let safety_tiers = SafetyStatus::ordered()
            .into_iter()
            .map(|status| SafetyTierEntry {
                status,
                status_label: status.label(),
                soldiers: self
                    .roster
                    .iter()
                    .filter(|soldier| soldier.active && soldier.safety_status() == status)
                    .count(),
            })
            .collect();

        let mut standings: Vec<StandingEntry> = self
            .standings
            .iter()
            .map(|outcome| {
                let update = &outcome.update;
                StandingEntry {
                    full_name: entry(&update.soldier_id).full_name,
                    soldier_id: update.soldier_id.clone(),
                    safety_status: update.safety_status,
                    status_label: update.safety_status.label(),
                    required_action: update.safety_status.required_action(),
                    current_safety_score: update.current_safety_score,
                    consecutive_low_months: update.consecutive_low_months,
                    held_by_suspension: update.held_by_suspension,
                }
            })
            .collect();
        standings.sort_by(|a, b| {
            b.safety_status
                .cmp(&a.safety_status)
                .then_with(|| normalize_name(&a.full_name).cmp(&normalize_name(&b.full_name)))
                .then_with(|| a.soldier_id.cmp(&b.soldier_id))
        });

        let findings = self
            .findings
            .iter()
            .map(|finding| FindingView {
                description: finding.describe(),
                finding: finding.clone(),
            })
            .collect();

        ReadinessReportSummary {
            as_of: self.as_of,
            rotation,
            compliance,
            trend: self.trend.clone(),
            submissions,
            safety_tiers,
            standings,
            table: self.table.rows().to_vec(),
            findings,
            catalog: self.catalog.clone(),
        }
    }
}
