use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::super::domain::{
    EscalationUpdate, MonthlySafetyScore, ReadinessError, SafetyStatus, SoldierId, YearMonth,
};

pub const DEFAULT_LOW_SCORE_THRESHOLD: u8 = 75;
pub const DEFAULT_LOOKBACK_MONTHS: usize = 3;

/// Dials for the monthly safety escalation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationPolicy {
    /// Scores strictly below this are low months.
    pub low_score_threshold: u8,
    pub lookback_months: usize,
    /// Keep a suspension in place when new scores arrive until a review reinstates.
    pub sticky_suspension: bool,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self {
            low_score_threshold: DEFAULT_LOW_SCORE_THRESHOLD,
            lookback_months: DEFAULT_LOOKBACK_MONTHS,
            sticky_suspension: true,
        }
    }
}

/// Why a standing is being recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecomputeTrigger {
    ScoreRecorded,
    ScoreRemoved,
    Refresh,
    Review,
}

impl RecomputeTrigger {
    /// Deletions correct history and reviews are the human reinstatement; both may lift
    /// a suspension.
    fn may_lift_suspension(self) -> bool {
        matches!(self, Self::ScoreRemoved | Self::Review)
    }
}

pub fn status_for_low_months(low_months: u8) -> SafetyStatus {
    match low_months {
        0 => SafetyStatus::Ok,
        1 => SafetyStatus::Warning,
        2 => SafetyStatus::Critical,
        _ => SafetyStatus::Suspended,
    }
}

/// Standing from the most recent `lookback_months` scores of `soldier`.
///
/// Rows for other soldiers are ignored; when a month appears twice the later row wins,
/// matching upsert semantics. Any row of this soldier above 100 is rejected.
pub fn evaluate_standing(
    soldier: &SoldierId,
    scores: &[MonthlySafetyScore],
    policy: &EscalationPolicy,
) -> Result<EscalationUpdate, ReadinessError> {
    let mut by_month: BTreeMap<YearMonth, &MonthlySafetyScore> = BTreeMap::new();
    for score in scores.iter().filter(|score| &score.soldier_id == soldier) {
        score.validate()?;
        by_month.insert(score.month, score);
    }

    let recent: Vec<&MonthlySafetyScore> = by_month
        .values()
        .rev()
        .take(policy.lookback_months)
        .copied()
        .collect();

    let latest = recent
        .first()
        .ok_or_else(|| ReadinessError::NoScoreHistory(soldier.clone()))?;

    let low_months = recent
        .iter()
        .filter(|score| score.score < policy.low_score_threshold)
        .count();
    let low_months = u8::try_from(low_months).unwrap_or(u8::MAX);

    Ok(EscalationUpdate {
        soldier_id: soldier.clone(),
        current_safety_score: Some(latest.score),
        consecutive_low_months: low_months,
        safety_status: status_for_low_months(low_months),
        held_by_suspension: false,
    })
}

/// Result of one recomputation, with enough context to audit the change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EscalationOutcome {
    pub update: EscalationUpdate,
    pub previous_status: Option<SafetyStatus>,
    pub trigger: RecomputeTrigger,
}

impl EscalationOutcome {
    pub fn changed(&self) -> bool {
        self.previous_status != Some(self.update.safety_status)
    }
}

/// Combine a fresh evaluation with the soldier's previous standing.
pub fn settle(
    computed: EscalationUpdate,
    previous: Option<SafetyStatus>,
    trigger: RecomputeTrigger,
    policy: &EscalationPolicy,
) -> EscalationOutcome {
    let hold = policy.sticky_suspension
        && previous == Some(SafetyStatus::Suspended)
        && computed.safety_status != SafetyStatus::Suspended
        && !trigger.may_lift_suspension();

    let update = if hold {
        EscalationUpdate {
            safety_status: SafetyStatus::Suspended,
            held_by_suspension: true,
            ..computed
        }
    } else {
        computed
    };

    EscalationOutcome {
        update,
        previous_status: previous,
        trigger,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn month(year: i32, month: u32) -> YearMonth {
        YearMonth::new(year, month).expect("valid month")
    }

    fn history(values: &[(u32, u8)]) -> Vec<MonthlySafetyScore> {
        values
            .iter()
            .map(|(m, score)| MonthlySafetyScore::new("s-1", month(2025, *m), *score))
            .collect()
    }

    fn evaluate(values: &[(u32, u8)]) -> EscalationUpdate {
        evaluate_standing(
            &SoldierId::from("s-1"),
            &history(values),
            &EscalationPolicy::default(),
        )
        .expect("history present")
    }

    #[test]
    fn two_low_months_are_critical() {
        let update = evaluate(&[(1, 60), (2, 60), (3, 80)]);
        assert_eq!(update.consecutive_low_months, 2);
        assert_eq!(update.safety_status, SafetyStatus::Critical);
        assert_eq!(update.current_safety_score, Some(80));
    }

    #[test]
    fn low_month_count_maps_to_tiers() {
        assert_eq!(evaluate(&[(1, 90), (2, 90), (3, 90)]).safety_status, SafetyStatus::Ok);
        assert_eq!(evaluate(&[(1, 90), (2, 90), (3, 74)]).safety_status, SafetyStatus::Warning);
        assert_eq!(evaluate(&[(1, 70), (2, 70), (3, 70)]).safety_status, SafetyStatus::Suspended);
        assert_eq!(evaluate(&[(3, 75)]).safety_status, SafetyStatus::Ok);
    }

    #[test]
    fn only_the_three_most_recent_months_count() {
        let update = evaluate(&[(1, 10), (2, 10), (3, 90), (4, 90), (5, 60)]);
        assert_eq!(update.consecutive_low_months, 1);
        assert_eq!(update.safety_status, SafetyStatus::Warning);
        assert_eq!(update.current_safety_score, Some(60));
    }

    #[test]
    fn deleting_a_low_month_lowers_the_tier() {
        let before = evaluate(&[(1, 60), (2, 60), (3, 80)]);
        let after = evaluate(&[(2, 60), (3, 80)]);
        assert_eq!(before.safety_status, SafetyStatus::Critical);
        assert_eq!(after.safety_status, SafetyStatus::Warning);
    }

    #[test]
    fn evaluation_is_idempotent() {
        let scores = history(&[(1, 60), (2, 90), (3, 50)]);
        let soldier = SoldierId::from("s-1");
        let policy = EscalationPolicy::default();
        let first = evaluate_standing(&soldier, &scores, &policy).expect("first");
        let second = evaluate_standing(&soldier, &scores, &policy).expect("second");
        assert_eq!(first, second);
    }

    #[test]
    fn out_of_range_history_is_rejected() {
        match evaluate_standing(
            &SoldierId::from("s-1"),
            &history(&[(2, 60), (3, 150)]),
            &EscalationPolicy::default(),
        ) {
            Err(ReadinessError::ScoreOutOfRange { score, month: at, .. }) => {
                assert_eq!(score, 150);
                assert_eq!(at, month(2025, 3));
            }
            other => panic!("expected out of range error, got {other:?}"),
        }
    }

    #[test]
    fn empty_history_is_a_caller_error() {
        let scores = vec![MonthlySafetyScore::new("other", month(2025, 1), 50)];
        match evaluate_standing(
            &SoldierId::from("s-1"),
            &scores,
            &EscalationPolicy::default(),
        ) {
            Err(ReadinessError::NoScoreHistory(id)) => assert_eq!(id, SoldierId::from("s-1")),
            other => panic!("expected missing history, got {other:?}"),
        }
    }

    #[test]
    fn suspension_holds_on_new_scores_but_not_on_review() {
        let policy = EscalationPolicy::default();
        let computed = evaluate(&[(2, 60), (3, 60), (4, 95)]);
        assert_eq!(computed.safety_status, SafetyStatus::Critical);

        let held = settle(
            computed.clone(),
            Some(SafetyStatus::Suspended),
            RecomputeTrigger::ScoreRecorded,
            &policy,
        );
        assert_eq!(held.update.safety_status, SafetyStatus::Suspended);
        assert!(held.update.held_by_suspension);
        assert!(!held.changed());

        let reviewed = settle(
            computed,
            Some(SafetyStatus::Suspended),
            RecomputeTrigger::Review,
            &policy,
        );
        assert_eq!(reviewed.update.safety_status, SafetyStatus::Critical);
        assert!(reviewed.changed());
    }
}
